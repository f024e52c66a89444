use std::task::{Context, Poll};

use http::{uri::PathAndQuery, Request, Uri};
use tower::{Layer, Service};

/// Resolves request paths against the cluster URL
///
/// The typed client only builds paths like `/apis/machine.sapcloud.io/...`.
/// Any path prefix on the cluster URL (e.g. a proxy serving many clusters) is kept.
#[derive(Debug, Clone)]
pub struct BaseUriLayer {
    base: Uri,
}

impl BaseUriLayer {
    /// Resolve every request against `base`
    pub fn new(base: Uri) -> Self {
        Self { base }
    }
}

impl<S> Layer<S> for BaseUriLayer {
    type Service = BaseUri<S>;

    fn layer(&self, inner: S) -> BaseUri<S> {
        BaseUri {
            base: self.base.clone(),
            inner,
        }
    }
}

/// Service produced by [`BaseUriLayer`]
#[derive(Debug, Clone)]
pub struct BaseUri<S> {
    base: Uri,
    inner: S,
}

impl<S, B> Service<Request<B>> for BaseUri<S>
where
    S: Service<Request<B>>,
{
    type Error = S::Error;
    type Future = S::Future;
    type Response = S::Response;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), S::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<B>) -> S::Future {
        let resolved = resolve(&self.base, req.uri());
        *req.uri_mut() = resolved;
        self.inner.call(req)
    }
}

fn resolve(base: &Uri, relative: &Uri) -> Uri {
    let prefix = base.path().trim_end_matches('/');
    let tail = relative.path_and_query().map_or("/", PathAndQuery::as_str);

    let mut parts = base.clone().into_parts();
    let joined = format!("{prefix}{tail}")
        .parse::<PathAndQuery>()
        .map_err(http::Error::from)
        .and_then(|pq| {
            parts.path_and_query = Some(pq);
            Uri::from_parts(parts).map_err(http::Error::from)
        });
    joined.unwrap_or_else(|err| {
        tracing::warn!(%base, %relative, "keeping unresolved uri: {err}");
        relative.clone()
    })
}
