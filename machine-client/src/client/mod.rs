//! HTTP client for the apiserver serving `machine.sapcloud.io`
//!
//! The [`Client`] owns the transport stack and decodes responses. It knows nothing
//! about machines; typed access lives in [`Machines`][crate::Machines].
use either::{Either, Left, Right};
use futures::{future::BoxFuture, Stream, StreamExt, TryStreamExt};
use http::{self, Request, Response, StatusCode};
use http_body_util::BodyExt;
pub use machine_core::response::Status;
use serde::de::DeserializeOwned;
use serde_json::{self, Value};
use tokio_util::{
    codec::{FramedRead, LinesCodec, LinesCodecError},
    io::StreamReader,
};
use tower::{buffer::Buffer, util::BoxService, BoxError, Service, ServiceBuilder, ServiceExt};

use crate::{error::ErrorResponse, Config, Error, Result};
use machine_core::WatchEvent;

mod auth;
mod body;
mod builder;
mod config_ext;
pub mod middleware;
#[cfg(feature = "rustls-tls")] mod tls;

pub use auth::Error as AuthError;
pub use body::Body;
pub use builder::{ClientBuilder, DynBody, GenericService};
pub use config_ext::ConfigExt;
#[cfg(feature = "rustls-tls")] pub use tls::rustls_tls::Error as RustlsTlsError;

/// Connection to the apiserver
///
/// Build one with [`Client::try_default`] (environment), [`Client::try_from`] (a
/// [`Config`]) or [`Client::new`] (any [`tower`] service). Clones share the
/// connection pool.
#[derive(Clone)]
pub struct Client {
    inner: Buffer<Request<Body>, BoxFuture<'static, Result<Response<Body>, BoxError>>>,
    default_ns: String,
}

impl Client {
    /// Wrap a custom service stack
    ///
    /// The layers of the default stack are available through
    /// [`ConfigExt`](crate::client::ConfigExt).
    ///
    /// ```rust
    /// # async fn doc() -> Result<(), Box<dyn std::error::Error>> {
    /// use machine_client::{client::ConfigExt, Client, Config};
    /// use tower::{BoxError, ServiceBuilder};
    /// use hyper_util::rt::TokioExecutor;
    ///
    /// let config = Config::infer().await?;
    /// let service = ServiceBuilder::new()
    ///     .layer(config.base_uri_layer())
    ///     .option_layer(config.auth_layer()?)
    ///     .map_err(BoxError::from)
    ///     .service(hyper_util::client::legacy::Client::builder(TokioExecutor::new()).build_http());
    /// let client = Client::new(service, config.default_namespace);
    /// # Ok(())
    /// # }
    /// ```
    pub fn new<S, B, T>(service: S, default_namespace: T) -> Self
    where
        S: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = bytes::Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
        T: Into<String>,
    {
        let erased = ServiceBuilder::new()
            .map_response(|res: Response<B>| res.map(Body::wrap_body))
            .map_err(Into::into)
            .service(service);
        Self {
            inner: Buffer::new(BoxService::new(erased), 1024),
            default_ns: default_namespace.into(),
        }
    }

    /// Client for the [`Config::infer`]red environment
    ///
    /// In-cluster service account first, then the local kubeconfig.
    pub async fn try_default() -> Result<Self> {
        let config = Config::infer().await.map_err(Error::InferConfig)?;
        Self::try_from(config)
    }

    /// Namespace used by [`Machines::default_namespaced`](crate::Machines::default_namespaced)
    pub fn default_namespace(&self) -> &str {
        &self.default_ns
    }

    /// Send a request through the stack and hand back the raw response
    pub async fn send(&self, request: Request<Body>) -> Result<Response<Body>> {
        let mut svc = self.inner.clone();
        let ready = svc.ready().await.map_err(Error::Service)?;
        ready.call(request).await.map_err(unbox_error)
    }

    /// Send a request and decode the JSON answer into `T`
    pub async fn request<T>(&self, request: Request<Vec<u8>>) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let text = self.request_text(request).await?;
        decode(&text)
    }

    /// Send a request and return the body as text
    ///
    /// Statuses of 400 and above fail with [`Error::Api`].
    pub async fn request_text(&self, request: Request<Vec<u8>>) -> Result<String> {
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        let text = read_text(res.into_body()).await?;
        handle_api_errors(&text, status)?;
        Ok(text)
    }

    /// Send a request whose answer is either a `T` or a [`Status`]
    ///
    /// Deletes answer with the deleted object, or with a `Status` when nothing is left to show.
    pub async fn request_status<T>(&self, request: Request<Vec<u8>>) -> Result<Either<T, Status>>
    where
        T: DeserializeOwned,
    {
        let text = self.request_text(request).await?;
        let untyped: Value = serde_json::from_str(&text).map_err(Error::SerdeError)?;
        if untyped.get("kind").and_then(Value::as_str) == Some("Status") {
            tracing::trace!("Status from {text}");
            decode(&text).map(Right)
        } else {
            decode(&text).map(Left)
        }
    }

    /// Send a watch request and stream its [`WatchEvent`]s
    ///
    /// A non-2xx answer to the watch request itself fails here. Once streaming, a
    /// server side `ERROR` event arrives as `Ok(WatchEvent::Error(_))`, while a bare
    /// `Status` line is yielded as `Err(Error::Api)`. The stream ends when the server
    /// closes the connection.
    pub async fn request_events<T>(
        &self,
        request: Request<Vec<u8>>,
    ) -> Result<impl Stream<Item = Result<WatchEvent<T>>>>
    where
        T: Clone + DeserializeOwned,
    {
        let res = self.send(request.map(Body::from)).await?;
        let status = res.status();
        tracing::trace!(headers = ?res.headers(), "watch answered with {status}");
        if status.is_client_error() || status.is_server_error() {
            let text = read_text(res.into_body()).await?;
            return Err(api_error(&text, status));
        }

        let bytes = res.into_body().into_data_stream().map_err(into_io_error);
        let lines = FramedRead::new(StreamReader::new(bytes), LinesCodec::new());
        Ok(lines.filter_map(|line| futures::future::ready(watch_event(line))))
    }
}

fn unbox_error(err: BoxError) -> Error {
    // middleware errors are ours, transport errors come from hyper
    match err.downcast::<Error>() {
        Ok(err) => *err,
        Err(err) => match err.downcast::<hyper::Error>() {
            Ok(err) => Error::HyperError(*err),
            Err(err) => Error::Service(err),
        },
    }
}

async fn read_text(body: Body) -> Result<String> {
    let bytes = body.collect_bytes().await?;
    String::from_utf8(bytes.to_vec()).map_err(Error::FromUtf8)
}

fn decode<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|err| {
        tracing::warn!("undecodable answer {text}: {err}");
        Error::SerdeError(err)
    })
}

// Read timeouts and truncated chunks end a watch quietly; the caller re-watches.
fn into_io_error(err: Error) -> std::io::Error {
    use std::io::{Error as IoError, ErrorKind};
    if is_timeout(&err) {
        IoError::new(ErrorKind::TimedOut, err)
    } else if err.to_string().contains("unexpected EOF during chunk") {
        IoError::new(ErrorKind::UnexpectedEof, err)
    } else {
        IoError::other(err)
    }
}

fn watch_event<T: DeserializeOwned>(line: Result<String, LinesCodecError>) -> Option<Result<WatchEvent<T>>> {
    let line = match line {
        Ok(line) => line,
        Err(LinesCodecError::Io(err)) => {
            return match err.kind() {
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::UnexpectedEof => {
                    tracing::warn!("watch stream ended: {err}");
                    None
                }
                _ => Some(Err(Error::ReadEvents(err))),
            };
        }
        Err(LinesCodecError::MaxLineLengthExceeded) => {
            return Some(Err(Error::LinesCodecMaxLineLengthExceeded));
        }
    };
    match serde_json::from_str::<WatchEvent<T>>(&line) {
        Ok(event) => Some(Ok(event)),
        // half a line left in the buffer at close
        Err(err) if err.is_eof() => None,
        Err(err) => Some(Err(serde_json::from_str::<ErrorResponse>(&line)
            .map(Error::Api)
            .unwrap_or(Error::SerdeError(err)))),
    }
}

// Walk the source chain for the read timeout raised by `hyper_timeout`.
fn is_timeout(err: &Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::TimedOut {
                return true;
            }
        }
        source = e.source();
    }
    false
}

/// Turn failed HTTP statuses into [`Error::Api`]
///
/// The apiserver normally answers with a `Status` object. When the body is
/// something else (a proxy error page, an empty body), an [`ErrorResponse`]
/// is synthesized from the status line and carries the raw body as message.
fn handle_api_errors(text: &str, status: StatusCode) -> Result<()> {
    if status.is_client_error() || status.is_server_error() {
        Err(api_error(text, status))
    } else {
        Ok(())
    }
}

fn api_error(text: &str, status: StatusCode) -> Error {
    let response = serde_json::from_str::<ErrorResponse>(text).unwrap_or_else(|_| {
        tracing::warn!("answer to failed request is not a Status: {text}");
        ErrorResponse::from_status_code(status, text)
    });
    tracing::debug!(?response, "request failed");
    Error::Api(response)
}

impl TryFrom<Config> for Client {
    type Error = Error;

    /// Builds a default [`Client`] from a [`Config`], see [`ClientBuilder`] if more customization is required
    fn try_from(config: Config) -> Result<Self> {
        Ok(ClientBuilder::try_from(config)?.build())
    }
}
