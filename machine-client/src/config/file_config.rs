//! The kubeconfig file format, reduced to what selecting a cluster and a user needs
use std::{
    fs,
    path::{Path, PathBuf},
};

use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use super::{KubeconfigError, LoadDataError};

/// A parsed kubeconfig
///
/// Read from the paths in `KUBECONFIG`, else from `~/.kube/config`. Only the
/// sections used to reach the apiserver are kept; everything else in the file
/// is ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Kubeconfig {
    /// Apiservers by name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub clusters: Vec<Named<Cluster>>,
    /// Credentials by name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub users: Vec<Named<AuthInfo>>,
    /// Pairs of cluster and user by name
    #[serde(default, deserialize_with = "null_as_empty")]
    pub contexts: Vec<Named<Context>>,
    /// Context used unless another one is requested
    #[serde(rename = "current-context")]
    pub current_context: Option<String>,
}

/// One entry of the `clusters`, `users` or `contexts` lists
///
/// On disk the payload sits under a key named after the list, e.g.
/// `{name: seed, cluster: {...}}`.
#[derive(Clone, Debug, Deserialize)]
pub struct Named<T> {
    /// Name referenced by contexts and options
    pub name: String,
    /// The entry itself
    #[serde(alias = "cluster", alias = "user", alias = "context")]
    pub item: Option<T>,
}

/// Where the apiserver lives and how to trust it
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Cluster {
    /// Url of the apiserver, e.g. `https://api.seed.example.com:6443`
    pub server: Option<String>,
    /// Do not verify the serving certificate
    pub insecure_skip_tls_verify: Option<bool>,
    /// Path of a PEM bundle with the certificate authority
    pub certificate_authority: Option<String>,
    /// Base64 PEM bundle; takes precedence over `certificate_authority`
    pub certificate_authority_data: Option<String>,
    /// Name to verify the serving certificate against, when not the url host
    pub tls_server_name: Option<String>,
}

/// Static credentials of a user
///
/// Exec and auth-provider plugins are not supported and are skipped when parsing.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AuthInfo {
    /// Basic auth user name
    pub username: Option<String>,
    /// Basic auth password
    #[serde(default, deserialize_with = "secret")]
    pub password: Option<SecretString>,

    /// Bearer token
    #[serde(default, deserialize_with = "secret")]
    pub token: Option<SecretString>,
    /// File holding a bearer token; `token` wins when both are set
    #[serde(rename = "tokenFile")]
    pub token_file: Option<String>,

    /// Path of the client certificate
    #[serde(rename = "client-certificate")]
    pub client_certificate: Option<String>,
    /// Base64 client certificate; takes precedence over `client_certificate`
    #[serde(rename = "client-certificate-data")]
    pub client_certificate_data: Option<String>,
    /// Path of the client key
    #[serde(rename = "client-key")]
    pub client_key: Option<String>,
    /// Base64 client key; takes precedence over `client_key`
    #[serde(rename = "client-key-data", default, deserialize_with = "secret")]
    pub client_key_data: Option<SecretString>,

    /// User to impersonate
    #[serde(rename = "as")]
    pub impersonate: Option<String>,
    /// Groups to impersonate
    #[serde(rename = "as-groups")]
    pub impersonate_groups: Option<Vec<String>>,
}

/// A cluster and user pair, optionally with a namespace
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Context {
    /// Name of a [`Cluster`] entry
    pub cluster: String,
    /// Name of an [`AuthInfo`] entry
    pub user: String,
    /// Namespace for clients that do not name one
    pub namespace: Option<String>,
}

fn secret<'de, D: Deserializer<'de>>(d: D) -> Result<Option<SecretString>, D::Error> {
    Ok(Option::<String>::deserialize(d)?.map(SecretString::from))
}

fn null_as_empty<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

impl Kubeconfig {
    /// Parse a kubeconfig document; blank input gives an empty kubeconfig
    pub fn from_yaml(text: &str) -> Result<Self, KubeconfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(KubeconfigError::Parse)
    }

    /// Read one kubeconfig file
    ///
    /// Relative certificate, key and token file paths are resolved against the file's directory.
    pub fn read_from<P: AsRef<Path>>(path: P) -> Result<Self, KubeconfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| KubeconfigError::ReadConfig(e, path.into()))?;
        let mut config = Self::from_yaml(&text)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        Ok(config)
    }

    /// Read the kubeconfig named by `KUBECONFIG`, else `~/.kube/config`
    pub fn read() -> Result<Self, KubeconfigError> {
        match Self::from_env()? {
            Some(config) => Ok(config),
            None => Self::read_from(default_kube_path().ok_or(KubeconfigError::FindPath)?),
        }
    }

    /// Read and merge every file listed in `KUBECONFIG`
    ///
    /// `None` when the variable is unset or lists no paths.
    pub fn from_env() -> Result<Option<Self>, KubeconfigError> {
        let Some(value) = std::env::var_os("KUBECONFIG") else {
            return Ok(None);
        };
        let mut merged = None;
        for path in std::env::split_paths(&value).filter(|p| !p.as_os_str().is_empty()) {
            let next = Self::read_from(&path)?;
            merged = Some(match merged {
                Some(config) => Self::merge(config, next),
                None => next,
            });
        }
        Ok(merged)
    }

    /// Add the entries of a later file
    ///
    /// Whatever is already set wins: a later entry whose name is taken is dropped whole.
    #[must_use]
    pub fn merge(mut self, later: Kubeconfig) -> Self {
        absorb(&mut self.clusters, later.clusters);
        absorb(&mut self.users, later.users);
        absorb(&mut self.contexts, later.contexts);
        self.current_context = self.current_context.or(later.current_context);
        self
    }

    fn resolve_paths(&mut self, dir: &Path) {
        let resolve = |field: &mut Option<String>| {
            if let Some(p) = field.as_deref().map(Path::new).filter(|p| p.is_relative()) {
                if let Some(abs) = dir.join(p).to_str() {
                    *field = Some(abs.to_owned());
                }
            }
        };
        for cluster in self.clusters.iter_mut().filter_map(|c| c.item.as_mut()) {
            resolve(&mut cluster.certificate_authority);
        }
        for user in self.users.iter_mut().filter_map(|u| u.item.as_mut()) {
            resolve(&mut user.client_certificate);
            resolve(&mut user.client_key);
            resolve(&mut user.token_file);
        }
    }
}

fn absorb<T>(into: &mut Vec<Named<T>>, from: Vec<Named<T>>) {
    for entry in from {
        if !into.iter().any(|e| e.name == entry.name) {
            into.push(entry);
        }
    }
}

/// Payload of the entry called `name`
pub(crate) fn find<'a, T>(entries: &'a [Named<T>], name: &str) -> Option<&'a T> {
    entries.iter().find(|e| e.name == name).and_then(|e| e.item.as_ref())
}

impl Cluster {
    pub(crate) fn load_certificate_authority(&self) -> Result<Option<Vec<u8>>, KubeconfigError> {
        let (data, file) = (
            self.certificate_authority_data.as_deref(),
            self.certificate_authority.as_deref(),
        );
        if data.is_none() && file.is_none() {
            return Ok(None);
        }
        inline_or_file(data, file)
            .map(Some)
            .map_err(KubeconfigError::LoadCertificateAuthority)
    }
}

impl AuthInfo {
    /// Client key followed by client certificate, both PEM
    ///
    /// `None` when the user carries no client certificate at all.
    pub(crate) fn identity_pem(&self) -> Result<Option<Vec<u8>>, KubeconfigError> {
        let cert_data = self.client_certificate_data.as_deref();
        if cert_data.is_none() && self.client_certificate.is_none() {
            return Ok(None);
        }
        let cert = inline_or_file(cert_data, self.client_certificate.as_deref())
            .map_err(KubeconfigError::LoadClientCertificate)?;
        let key_data = self.client_key_data.as_ref().map(|k| k.expose_secret());
        let mut pem = inline_or_file(key_data, self.client_key.as_deref())
            .map_err(KubeconfigError::LoadClientKey)?;
        pem.extend(cert);
        Ok(Some(pem))
    }
}

// Inline base64 wins over a path. PEM blobs are concatenated later, so each ends with a newline.
fn inline_or_file(data: Option<&str>, file: Option<&str>) -> Result<Vec<u8>, LoadDataError> {
    let mut bytes = match (data, file) {
        (Some(b64), _) => base64::engine::general_purpose::STANDARD
            .decode(b64)
            .map_err(LoadDataError::DecodeBase64)?,
        (None, Some(path)) => fs::read(path).map_err(|e| LoadDataError::ReadFile(e, path.into()))?,
        (None, None) => return Err(LoadDataError::NoBase64DataOrFile),
    };
    if bytes.last().is_some_and(|b| *b != b'\n') {
        bytes.push(b'\n');
    }
    Ok(bytes)
}

fn default_kube_path() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(".kube").join("config"))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED_AWS: &str = r#"
apiVersion: v1
kind: Config
preferences: {}
clusters:
- name: seed-aws
  cluster:
    server: https://api.seed-aws.example.com
    certificate-authority-data: aGVsbG8K
    extensions:
    - name: client.authentication.k8s.io/exec
      extension: {}
contexts:
- name: seed-aws
  context:
    cluster: seed-aws
    user: mcm
current-context: seed-aws
users:
- name: mcm
  user:
    token: first-token
"#;

    const SEED_GCP: &str = r#"
clusters:
- name: seed-gcp
  cluster:
    server: https://api.seed-gcp.example.com
contexts:
- name: seed-gcp
  context:
    cluster: seed-gcp
    user: mcm
current-context: seed-gcp
users:
- name: mcm
  user:
    username: mcm
    token: second-token
- name: operator
  user:
    token: operator-token
"#;

    #[test]
    fn parses_entries_and_skips_unknown_sections() {
        let cfg = Kubeconfig::from_yaml(SEED_AWS).unwrap();
        assert_eq!(cfg.current_context.as_deref(), Some("seed-aws"));
        let cluster = find(&cfg.clusters, "seed-aws").unwrap();
        assert_eq!(cluster.server.as_deref(), Some("https://api.seed-aws.example.com"));
        assert_eq!(find(&cfg.contexts, "seed-aws").unwrap().user, "mcm");
        assert!(find(&cfg.users, "mcm").unwrap().token.is_some());
        assert!(find(&cfg.users, "nobody").is_none());
    }

    #[test]
    fn earlier_file_wins_on_merge() {
        let merged = Kubeconfig::from_yaml(SEED_AWS)
            .unwrap()
            .merge(Kubeconfig::from_yaml(SEED_GCP).unwrap());
        assert_eq!(merged.current_context.as_deref(), Some("seed-aws"));
        let names: Vec<_> = merged.clusters.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["seed-aws", "seed-gcp"]);

        let mcm = find(&merged.users, "mcm").unwrap();
        assert_eq!(mcm.token.as_ref().unwrap().expose_secret(), "first-token");
        // the whole entry is dropped, not just conflicting fields
        assert!(mcm.username.is_none());
        assert!(find(&merged.users, "operator").is_some());
    }

    #[test]
    fn blank_and_null_sections_are_empty() {
        let cfg = Kubeconfig::from_yaml("  \n").unwrap();
        assert!(cfg.clusters.is_empty() && cfg.current_context.is_none());

        let cfg = Kubeconfig::from_yaml("clusters: null\nusers: null\ncontexts: null\n").unwrap();
        assert!(cfg.clusters.is_empty());
        assert!(cfg.users.is_empty());
        assert!(cfg.contexts.is_empty());
    }

    #[test]
    fn read_from_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config");
        std::fs::write(
            &path,
            r#"
clusters:
- cluster:
    certificate-authority: certs/ca.crt
    server: https://seed.example.com
  name: seed
users:
- name: mcm
  user:
    tokenFile: /abs/token
"#,
        )
        .unwrap();

        let cfg = Kubeconfig::read_from(&path).unwrap();
        let cluster = find(&cfg.clusters, "seed").unwrap();
        let expected = dir.path().join("certs/ca.crt");
        assert_eq!(cluster.certificate_authority.as_deref(), expected.to_str());
        let user = find(&cfg.users, "mcm").unwrap();
        assert_eq!(user.token_file.as_deref(), Some("/abs/token"));
    }

    #[test]
    fn secrets_stay_out_of_debug_output() {
        let user: AuthInfo = serde_yaml::from_str("username: user\npassword: hunter2\n").unwrap();
        let printed = format!("{user:?}");
        assert!(printed.contains("REDACTED"));
        assert!(!printed.contains("hunter2"));

        let user: AuthInfo = serde_yaml::from_str("username: user\npassword:\n").unwrap();
        assert!(user.password.is_none());
    }

    #[test]
    fn identity_pem_is_key_then_cert() {
        let enc = |s: &str| base64::engine::general_purpose::STANDARD.encode(s);
        let info = AuthInfo {
            client_certificate_data: Some(enc("CERT")),
            client_key_data: Some(SecretString::from(enc("KEY"))),
            ..Default::default()
        };
        assert_eq!(info.identity_pem().unwrap().unwrap(), b"KEY\nCERT\n");
        assert!(AuthInfo::default().identity_pem().unwrap().is_none());

        let missing_key = AuthInfo {
            client_certificate_data: Some(enc("CERT")),
            ..Default::default()
        };
        assert!(matches!(
            missing_key.identity_pem(),
            Err(KubeconfigError::LoadClientKey(LoadDataError::NoBase64DataOrFile))
        ));
    }
}
