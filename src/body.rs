use core::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_core::stream::Stream;

/// In-memory body that can only be polled once with [Stream::poll_next].
/// Used for json and resource responses where the full payload is already
/// buffered.
#[derive(Debug)]
pub struct Full(Option<Bytes>);

impl Full {
    pub const fn new(bytes: Bytes) -> Self {
        Self(Some(bytes))
    }

    /// remaining byte length of the body.
    pub fn len(&self) -> u64 {
        self.0.as_ref().map(|b| b.len() as u64).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Bytes> for Full {
    fn from(bytes: Bytes) -> Self {
        Self::new(bytes)
    }
}

impl Stream for Full {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().0.take().map(Ok))
    }

    // use the buffered length as both lower bound and upper bound.
    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.0 {
            Some(ref b) => (b.len(), Some(b.len())),
            None => (0, Some(0)),
        }
    }
}
