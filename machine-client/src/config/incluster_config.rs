use std::env;
use thiserror::Error;

const SERVICE_HOSTENV: &str = "KUBERNETES_SERVICE_HOST";
const SERVICE_PORTENV: &str = "KUBERNETES_SERVICE_PORT";

// Mounted credential files
const SERVICE_TOKENFILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
const SERVICE_CERTFILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/ca.crt";
const SERVICE_DEFAULT_NS: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Errors from loading in-cluster config
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to read the default namespace for the service account
    #[error("failed to read the default namespace: {0}")]
    ReadDefaultNamespace(#[source] std::io::Error),

    /// Failed to read the in-cluster environment variables
    #[error("failed to read an incluster environment variable: {0}")]
    ReadEnvironmentVariable(#[source] env::VarError),

    /// Failed to read a certificate bundle
    #[error("failed to read a certificate bundle: {0}")]
    ReadCertificateBundle(#[source] std::io::Error),

    /// Failed to read the service account token
    #[error("failed to read the service account token: {0}")]
    ReadToken(#[source] std::io::Error),

    /// Failed to parse cluster port value
    #[error("failed to parse cluster port: {0}")]
    ParseClusterPort(#[source] std::num::ParseIntError),

    /// Failed to parse cluster url
    #[error("failed to parse cluster url: {0}")]
    ParseClusterUrl(#[source] http::uri::InvalidUri),

    /// Failed to parse PEM-encoded certificates
    #[error("failed to parse PEM-encoded certificates: {0}")]
    ParseCertificates(#[source] pem::PemError),
}

/// Returns the URI of the apiserver from the `KUBERNETES_SERVICE_HOST` and
/// `KUBERNETES_SERVICE_PORT` environment variables.
pub(super) fn try_kube_from_env() -> Result<http::Uri, Error> {
    let host = env::var(SERVICE_HOSTENV).map_err(Error::ReadEnvironmentVariable)?;
    let port = env::var(SERVICE_PORTENV)
        .map_err(Error::ReadEnvironmentVariable)?
        .parse::<u16>()
        .map_err(Error::ParseClusterPort)?;
    kube_server(&host, port)
}

fn kube_server(host: &str, port: u16) -> Result<http::Uri, Error> {
    // IPv6 literals need brackets inside an authority
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]")
    } else {
        host.to_owned()
    };
    format!("https://{host}:{port}")
        .parse::<http::Uri>()
        .map_err(Error::ParseClusterUrl)
}

pub(super) fn kube_dns() -> http::Uri {
    http::Uri::from_static("https://kubernetes.default.svc/")
}

pub(super) fn load_token() -> Result<String, Error> {
    std::fs::read_to_string(SERVICE_TOKENFILE)
        .map(|t| t.trim().to_owned())
        .map_err(Error::ReadToken)
}

/// Returns certification from specified path in cluster.
pub(super) fn load_cert() -> Result<Vec<Vec<u8>>, Error> {
    let certs = std::fs::read(SERVICE_CERTFILE).map_err(Error::ReadCertificateBundle)?;
    super::certs(&certs).map_err(Error::ParseCertificates)
}

/// Returns the default namespace from specified path in cluster.
pub(super) fn load_default_ns() -> Result<String, Error> {
    std::fs::read_to_string(SERVICE_DEFAULT_NS)
        .map(|ns| ns.trim().to_owned())
        .map_err(Error::ReadDefaultNamespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_uri_from_ipv4_host() {
        let uri = kube_server("10.96.0.1", 443).unwrap();
        assert_eq!(uri, "https://10.96.0.1:443/");
    }

    #[test]
    fn server_uri_from_ipv6_host() {
        let uri = kube_server("fd00::1", 6443).unwrap();
        assert_eq!(uri.host(), Some("[fd00::1]"));
        assert_eq!(uri.port_u16(), Some(6443));
    }

    #[test]
    fn dns_uri_is_https() {
        assert_eq!(kube_dns().scheme_str(), Some("https"));
    }
}
