use std::{
    sync::Arc,
    task::{Context, Poll},
};

use http::{HeaderMap, Request};
use tower::{Layer, Service};

/// Adds fixed headers (`User-Agent`, impersonation) to every request
///
/// Repeated names are all sent, which is how several impersonated groups travel.
#[derive(Clone, Debug)]
pub struct ExtraHeadersLayer {
    pub(crate) headers: Arc<HeaderMap>,
}

impl ExtraHeadersLayer {
    /// Send `headers` with every request
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            headers: Arc::new(headers),
        }
    }
}

impl<S> Layer<S> for ExtraHeadersLayer {
    type Service = ExtraHeaders<S>;

    fn layer(&self, inner: S) -> ExtraHeaders<S> {
        ExtraHeaders {
            headers: Arc::clone(&self.headers),
            inner,
        }
    }
}

/// Service produced by [`ExtraHeadersLayer`]
#[derive(Clone, Debug)]
pub struct ExtraHeaders<S> {
    headers: Arc<HeaderMap>,
    inner: S,
}

impl<S, B> Service<Request<B>> for ExtraHeaders<S>
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
        let target = req.headers_mut();
        for (name, value) in self.headers.iter() {
            target.append(name, value.clone());
        }
        self.inner.call(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderValue, Response};
    use tower::ServiceExt;
    use tower_test::mock;

    #[tokio::test]
    async fn every_value_of_a_repeated_header_is_sent() {
        let mut headers = HeaderMap::new();
        headers.append("impersonate-group", HeaderValue::from_static("a"));
        headers.append("impersonate-group", HeaderValue::from_static("b"));
        let (svc, mut handle) = mock::pair::<Request<()>, Response<()>>();
        let svc = ExtraHeadersLayer::new(headers).layer(svc);

        let server = tokio::spawn(async move {
            let (req, send) = handle.next_request().await.expect("service not called");
            let groups: Vec<_> = req.headers().get_all("impersonate-group").iter().collect();
            assert_eq!(groups, ["a", "b"]);
            send.send_response(Response::new(()));
        });

        svc.oneshot(Request::new(())).await.unwrap();
        server.await.unwrap();
    }
}
