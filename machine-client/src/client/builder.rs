use bytes::Bytes;
use http::{Request, Response};
use hyper::body::Incoming;
use hyper_timeout::TimeoutConnector;
use hyper_util::{client::legacy::connect::HttpConnector, rt::TokioExecutor};
use std::time::Duration;
use tower::{util::BoxService, BoxError, Layer, Service, ServiceBuilder};
use tower_http::{
    classify::{ServerErrorsFailureClass, SharedClassifier, ServerErrorsAsFailures},
    map_response_body::MapResponseBodyLayer,
    trace::TraceLayer,
};
use tracing::Span;

use super::body::Body;
use crate::{client::ConfigExt, Client, Config, Error, Result};

/// HTTP body of a dynamic backing type.
///
/// The suggested implementation type is [`crate::client::Body`].
pub type DynBody = dyn http_body::Body<Data = Bytes, Error = BoxError> + Send + Unpin;

/// Type-erased service stack produced by [`ClientBuilder::try_from`]
pub type GenericService = BoxService<Request<Body>, Response<Box<DynBody>>, BoxError>;

/// Assembles the [`tower`] stack behind a [`Client`]
///
/// Start from [`ClientBuilder::try_from`] to get the default stack for a
/// [`Config`], then wrap it in extra layers before calling [`build`](Self::build).
pub struct ClientBuilder<Svc> {
    service: Svc,
    default_ns: String,
}

impl<Svc> ClientBuilder<Svc> {
    /// Start from an arbitrary service
    pub fn new(service: Svc, default_namespace: impl Into<String>) -> Self
    where
        Svc: Service<Request<Body>>,
    {
        Self {
            service,
            default_ns: default_namespace.into(),
        }
    }

    /// Wrap the current stack in `layer`
    pub fn with_layer<L: Layer<Svc>>(self, layer: &L) -> ClientBuilder<L::Service> {
        ClientBuilder {
            service: layer.layer(self.service),
            default_ns: self.default_ns,
        }
    }

    /// Finish into a [`Client`]
    pub fn build<B>(self) -> Client
    where
        Svc: Service<Request<Body>, Response = Response<B>> + Send + 'static,
        Svc::Future: Send + 'static,
        Svc::Error: Into<BoxError>,
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Client::new(self.service, self.default_ns)
    }
}

impl TryFrom<Config> for ClientBuilder<GenericService> {
    type Error = Error;

    /// The default stack, from the outside in: base uri, credentials, extra
    /// headers, tracing, then hyper over a connector with timeouts (and TLS).
    fn try_from(config: Config) -> Result<Self> {
        let hyper = hyper_util::client::legacy::Builder::new(TokioExecutor::new())
            .build::<_, Body>(connector(&config)?);

        let stack = ServiceBuilder::new()
            .layer(config.base_uri_layer())
            .option_layer(config.auth_layer()?)
            .layer(config.extra_headers_layer()?)
            .layer(trace_layer())
            .map_err(BoxError::from)
            .service(hyper);

        // erase the body type so every stack fits `GenericService`
        let erased = MapResponseBodyLayer::new(|body| {
            Box::new(http_body_util::BodyExt::map_err(body, BoxError::from)) as Box<DynBody>
        })
        .layer(stack);

        Ok(ClientBuilder::new(BoxService::new(erased), config.default_namespace))
    }
}

#[cfg(feature = "rustls-tls")]
type Transport = hyper_rustls::HttpsConnector<HttpConnector>;
#[cfg(not(feature = "rustls-tls"))]
type Transport = HttpConnector;

fn connector(config: &Config) -> Result<TimeoutConnector<Transport>> {
    let mut http = HttpConnector::new();
    http.enforce_http(false);

    #[cfg(feature = "rustls-tls")]
    let transport = config.rustls_https_connector_with_connector(http)?;
    #[cfg(not(feature = "rustls-tls"))]
    let transport = match config.cluster_url.scheme() {
        Some(scheme) if *scheme == http::uri::Scheme::HTTPS => return Err(Error::TlsRequired),
        _ => http,
    };

    let mut timeouts = TimeoutConnector::new(transport);
    timeouts.set_connect_timeout(config.connect_timeout);
    timeouts.set_read_timeout(config.read_timeout);
    timeouts.set_write_timeout(config.write_timeout);
    Ok(timeouts)
}

type Trace = TraceLayer<
    SharedClassifier<ServerErrorsAsFailures>,
    fn(&Request<Body>) -> Span,
    fn(&Request<Body>, &Span),
    fn(&Response<Incoming>, Duration, &Span),
    (),
    (),
    fn(ServerErrorsFailureClass, Duration, &Span),
>;

// One span per call, named after the verb the typed client put into the request extensions.
// Field names follow the OpenTelemetry HTTP conventions.
fn trace_layer() -> Trace {
    TraceLayer::new_for_http()
        .make_span_with(request_span as fn(&Request<Body>) -> Span)
        .on_request(sent as fn(&Request<Body>, &Span))
        .on_response(answered as fn(&Response<Incoming>, Duration, &Span))
        .on_body_chunk(())
        .on_eos(())
        .on_failure(failed as fn(ServerErrorsFailureClass, Duration, &Span))
}

fn request_span(req: &Request<Body>) -> Span {
    let verb = req.extensions().get::<&'static str>().copied().unwrap_or("HTTP");
    tracing::debug_span!(
        "HTTP",
        http.method = %req.method(),
        http.url = %req.uri(),
        http.status_code = tracing::field::Empty,
        otel.name = verb,
        otel.kind = "client",
        otel.status_code = tracing::field::Empty,
    )
}

fn sent(_: &Request<Body>, _: &Span) {
    tracing::debug!("requesting");
}

fn answered(res: &Response<Incoming>, latency: Duration, span: &Span) {
    let status = res.status();
    span.record("http.status_code", status.as_u16());
    if status.is_client_error() || status.is_server_error() {
        span.record("otel.status_code", "ERROR");
    }
    tracing::debug!(?latency, "answered with {status}");
}

fn failed(class: ServerErrorsFailureClass, _: Duration, span: &Span) {
    span.record("otel.status_code", "ERROR");
    match class {
        ServerErrorsFailureClass::StatusCode(status) => {
            span.record("http.status_code", status.as_u16());
            tracing::error!("failed with status {status}");
        }
        ServerErrorsFailureClass::Error(err) => tracing::error!("failed with error {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(not(feature = "rustls-tls"))]
    #[test]
    fn https_requires_tls_stack() {
        let config = Config::new(http::Uri::from_static("https://api.seed.example.com"));
        assert!(matches!(
            ClientBuilder::try_from(config).map(|_| ()),
            Err(Error::TlsRequired)
        ));
    }

    #[tokio::test]
    async fn default_stack_keeps_namespace() {
        let mut config = Config::new(http::Uri::from_static("http://127.0.0.1:8001"));
        config.default_namespace = "shoot--dev--cluster".into();
        let client = ClientBuilder::try_from(config).unwrap().build();
        assert_eq!(client.default_namespace(), "shoot--dev--cluster");
    }

    #[test]
    fn span_is_named_after_the_verb() {
        let mut req = Request::get("/apis/machine.sapcloud.io/v1alpha1/machines")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert("list");
        // without a subscriber the span is disabled, building it must still work
        let _span = request_span(&req);
        assert_eq!(req.extensions().get::<&'static str>(), Some(&"list"));
    }
}
