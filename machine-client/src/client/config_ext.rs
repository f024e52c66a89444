use http::{header::USER_AGENT, HeaderMap, HeaderValue};
#[cfg(feature = "rustls-tls")]
use hyper_util::client::legacy::connect::HttpConnector;
use secrecy::ExposeSecret;

#[cfg(feature = "rustls-tls")] use super::tls;
use super::{
    auth::{Auth, Error as AuthError},
    middleware::{AddAuthorizationLayer, BaseUriLayer, ExtraHeadersLayer},
};
use crate::{Config, Error, Result};

/// The pieces of the default stack, for assembling a custom one
///
/// [`Client::new`](crate::Client::new) shows them combined. Implemented for [`Config`] only.
pub trait ConfigExt: private::Sealed {
    /// Resolve request paths against `cluster_url`
    fn base_uri_layer(&self) -> BaseUriLayer;

    /// `Authorization` header from basic or bearer credentials, `None` without any
    fn auth_layer(&self) -> Result<Option<AddAuthorizationLayer>>;

    /// `User-Agent` and impersonation headers
    fn extra_headers_layer(&self) -> Result<ExtraHeadersLayer>;

    /// TLS settings: trusted roots, client identity and certificate checking
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls-tls")))]
    #[cfg(feature = "rustls-tls")]
    fn rustls_client_config(&self) -> Result<rustls::ClientConfig>;

    /// HTTPS connector over a plain [`HttpConnector`]
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls-tls")))]
    #[cfg(feature = "rustls-tls")]
    fn rustls_https_connector(&self) -> Result<hyper_rustls::HttpsConnector<HttpConnector>>;

    /// HTTPS connector over any inner connector
    ///
    /// ```rust
    /// # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
    /// # use machine_client::{client::{Body, ConfigExt}, Config};
    /// # use hyper_util::{client::legacy::connect::HttpConnector, rt::TokioExecutor};
    /// let config = Config::infer().await?;
    /// let mut http = HttpConnector::new();
    /// http.enforce_http(false);
    /// let https = config.rustls_https_connector_with_connector(http)?;
    /// let hyper_client: hyper_util::client::legacy::Client<_, Body> =
    ///     hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build(https);
    /// # Ok(())
    /// # }
    /// ```
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls-tls")))]
    #[cfg(feature = "rustls-tls")]
    fn rustls_https_connector_with_connector<H>(&self, connector: H) -> Result<hyper_rustls::HttpsConnector<H>>;
}

mod private {
    pub trait Sealed {}
    impl Sealed for super::Config {}
}

impl ConfigExt for Config {
    fn base_uri_layer(&self) -> BaseUriLayer {
        BaseUriLayer::new(self.cluster_url.clone())
    }

    fn auth_layer(&self) -> Result<Option<AddAuthorizationLayer>> {
        let layer = match Auth::try_from(&self.auth_info).map_err(Error::Auth)? {
            Auth::None => return Ok(None),
            Auth::Basic(user, pass) => AddAuthorizationLayer::basic(&user, pass.expose_secret()),
            Auth::Bearer(token) => AddAuthorizationLayer::bearer(token.expose_secret()),
        };
        Ok(Some(layer.as_sensitive(true)))
    }

    fn extra_headers_layer(&self) -> Result<ExtraHeadersLayer> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let users = self.auth_info.impersonate.iter().map(|u| (IMPERSONATE_USER, u));
        let groups = self.auth_info.impersonate_groups.iter().flatten().map(|g| (IMPERSONATE_GROUP, g));
        for (name, value) in users.chain(groups) {
            let value = HeaderValue::from_str(value).map_err(|e| Error::Auth(AuthError::InvalidImpersonation(e)))?;
            headers.append(name, value);
        }
        Ok(ExtraHeadersLayer::new(headers))
    }

    #[cfg(feature = "rustls-tls")]
    fn rustls_client_config(&self) -> Result<rustls::ClientConfig> {
        let identity = self.identity_pem.as_deref();
        let roots = self.root_cert.as_deref();
        tls::rustls_tls::rustls_client_config(identity, roots, self.accept_invalid_certs).map_err(Error::RustlsTls)
    }

    #[cfg(feature = "rustls-tls")]
    fn rustls_https_connector(&self) -> Result<hyper_rustls::HttpsConnector<HttpConnector>> {
        let mut http = HttpConnector::new();
        http.enforce_http(false);
        self.rustls_https_connector_with_connector(http)
    }

    #[cfg(feature = "rustls-tls")]
    fn rustls_https_connector_with_connector<H>(&self, connector: H) -> Result<hyper_rustls::HttpsConnector<H>> {
        let tls = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(self.rustls_client_config()?)
            .https_or_http();
        let tls = match &self.tls_server_name {
            Some(server_name) => tls.with_server_name(server_name.clone()),
            None => tls,
        };
        Ok(tls.enable_http1().wrap_connector(connector))
    }
}

const USER_AGENT_VALUE: &str = concat!("machine-client/", env!("CARGO_PKG_VERSION"));
const IMPERSONATE_USER: &str = "impersonate-user";
const IMPERSONATE_GROUP: &str = "impersonate-group";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthInfo;

    fn config(auth_info: AuthInfo) -> Config {
        Config {
            auth_info,
            ..Config::new(http::Uri::from_static("https://api.seed.example.com"))
        }
    }

    #[test]
    fn user_agent_and_impersonation_headers() {
        let cfg = config(AuthInfo {
            impersonate: Some("system:serviceaccount:shoot:mcm".into()),
            impersonate_groups: Some(vec!["system:masters".into(), "ops".into()]),
            ..Default::default()
        });
        let layer = cfg.extra_headers_layer().unwrap();
        let headers = &layer.headers;
        assert_eq!(headers.len(), 4);
        assert_eq!(headers["impersonate-user"], "system:serviceaccount:shoot:mcm");
        let groups: Vec<_> = headers.get_all("impersonate-group").iter().collect();
        assert_eq!(groups, ["system:masters", "ops"]);
        assert!(headers[USER_AGENT].to_str().unwrap().starts_with("machine-client/"));
    }

    #[test]
    fn invalid_impersonation_is_an_auth_error() {
        let cfg = config(AuthInfo {
            impersonate: Some("bad\nuser".into()),
            ..Default::default()
        });
        assert!(matches!(
            cfg.extra_headers_layer(),
            Err(Error::Auth(AuthError::InvalidImpersonation(_)))
        ));
    }

    #[test]
    fn no_auth_layer_without_credentials() {
        assert!(config(AuthInfo::default()).auth_layer().unwrap().is_none());
    }
}
