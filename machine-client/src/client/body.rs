use std::{
    fmt,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::{combinators::UnsyncBoxBody, BodyExt};
use tower::BoxError;

/// Body of requests sent to, and responses received from, the apiserver
///
/// Requests carry a buffered JSON or patch document. Responses are streamed as
/// they arrive, which is what lets a watch be consumed line by line.
pub struct Body(Payload);

enum Payload {
    // taken on first poll
    Buffered(Option<Bytes>),
    Streamed(UnsyncBoxBody<Bytes, BoxError>),
}

impl Body {
    /// A body without content, e.g. for `GET`
    pub fn empty() -> Self {
        Self(Payload::Buffered(None))
    }

    // Response bodies of any service stack end up here.
    pub(crate) fn wrap_body<B>(body: B) -> Self
    where
        B: HttpBody<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self(Payload::Streamed(body.map_err(Into::into).boxed_unsync()))
    }

    /// Read the remaining body into memory
    pub async fn collect_bytes(self) -> Result<Bytes, crate::Error> {
        Ok(self.collect().await?.to_bytes())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self(Payload::Buffered(Some(bytes).filter(|b| !b.is_empty())))
    }
}

impl From<Vec<u8>> for Body {
    fn from(vec: Vec<u8>) -> Self {
        Bytes::from(vec).into()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Payload::Buffered(None) => f.write_str("Body(empty)"),
            Payload::Buffered(Some(b)) => write!(f, "Body({} bytes)", b.len()),
            Payload::Streamed(_) => f.write_str("Body(streamed)"),
        }
    }
}

impl HttpBody for Body {
    type Data = Bytes;
    type Error = crate::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, crate::Error>>> {
        match &mut self.get_mut().0 {
            Payload::Buffered(bytes) => Poll::Ready(bytes.take().map(|b| Ok(Frame::data(b)))),
            Payload::Streamed(inner) => Pin::new(inner)
                .poll_frame(cx)
                .map(|frame| frame.map(|res| res.map_err(crate::Error::Service))),
        }
    }

    fn size_hint(&self) -> SizeHint {
        match &self.0 {
            Payload::Buffered(bytes) => SizeHint::with_exact(bytes.as_ref().map_or(0, |b| b.len() as u64)),
            Payload::Streamed(inner) => inner.size_hint(),
        }
    }

    fn is_end_stream(&self) -> bool {
        match &self.0 {
            Payload::Buffered(bytes) => bytes.is_none(),
            Payload::Streamed(inner) => inner.is_end_stream(),
        }
    }
}
