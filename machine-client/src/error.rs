//! Error handling in [`machine_client`][crate]
use thiserror::Error;

pub use machine_core::ErrorResponse;

use crate::config::{InClusterError, InferConfigError, KubeconfigError};

/// Possible errors when working with [`machine_client`][crate]
#[derive(Error, Debug)]
pub enum Error {
    /// The API server rejected the request
    ///
    /// Carries the `Status` body the server sent, or one synthesized from the
    /// HTTP status line when the body was not a `Status`.
    /// A `410 Gone` on watch means the requested `resourceVersion` is too old.
    #[error("ApiError: {0} ({0:?})")]
    Api(#[source] ErrorResponse),

    /// The connection to the apiserver failed
    #[error("HyperError: {0}")]
    HyperError(#[source] hyper::Error),

    /// A layer of the service stack failed
    #[error("ServiceError: {0}")]
    Service(#[source] tower::BoxError),

    /// The answer was not UTF-8
    #[error("UTF-8 Error: {0}")]
    FromUtf8(#[source] std::string::FromUtf8Error),

    /// A watch line grew past the codec limit, which is unbounded
    #[error("Error finding newline character")]
    LinesCodecMaxLineLengthExceeded,

    /// Reading a watch stream failed
    #[error("Error reading events stream: {0}")]
    ReadEvents(#[source] std::io::Error),

    /// The `http` crate rejected request parts
    #[error("HttpError: {0}")]
    HttpError(#[source] http::Error),

    /// A URI did not parse
    #[error("InvalidUri: {0}")]
    InvalidUri(#[source] http::uri::InvalidUri),

    /// Response body could not be decoded into the requested type
    #[error("Error deserializing response: {0}")]
    SerdeError(#[source] serde_json::Error),

    /// The typed call could not be turned into a request; nothing was sent
    #[error("Failed to build request: {0}")]
    BuildRequest(#[source] machine_core::request::Error),

    /// Neither in-cluster nor kubeconfig configuration was usable
    #[error("Failed to infer configuration: {0}")]
    InferConfig(#[source] InferConfigError),

    /// The in-cluster service account configuration was unusable
    #[error("Failed to load in-cluster configuration: {0}")]
    InClusterConfig(#[source] InClusterError),

    /// The kubeconfig was unusable
    #[error("Failed to load kubeconfig: {0}")]
    Kubeconfig(#[source] KubeconfigError),

    /// Credentials could not be turned into headers
    #[error("auth error: {0}")]
    Auth(#[source] crate::client::AuthError),

    /// TLS setup failed
    #[cfg(feature = "rustls-tls")]
    #[cfg_attr(docsrs, doc(cfg(feature = "rustls-tls")))]
    #[error("rustls tls error: {0}")]
    RustlsTls(#[source] crate::client::RustlsTlsError),

    /// `https` cluster URL, but built without `rustls-tls`
    #[error("TLS required but no TLS stack selected")]
    TlsRequired,
}

impl Error {
    /// The API status behind this error, if the server answered with one
    pub fn api_response(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Api(resp) => Some(resp),
            _ => None,
        }
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::HttpError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::SerdeError(err)
    }
}
