use core::{
    pin::Pin,
    task::{ready, Context, Poll},
};

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use futures_core::stream::Stream;
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

pin_project! {
    /// body stream adapting any [AsyncRead] type, yielding chunks of at most
    /// chunk_size bytes.
    ///
    /// without a size budget the stream reads until end of input and hints an
    /// unknown length, leaving transfer framing to the protocol layer. with a
    /// budget it yields exactly that many bytes at most, matching whatever
    /// content-length was promised to the peer.
    pub struct ReadStream<R> {
        #[pin]
        reader: R,
        chunk_size: usize,
        buf: BytesMut,
        remaining: Option<u64>,
        eof: bool,
    }
}

impl<R> ReadStream<R>
where
    R: AsyncRead,
{
    pub(crate) fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size,
            buf: BytesMut::new(),
            remaining: None,
            eof: false,
        }
    }

    pub(crate) fn sized(reader: R, chunk_size: usize, len: u64) -> Self {
        Self {
            reader,
            chunk_size,
            buf: BytesMut::new(),
            remaining: Some(len),
            eof: false,
        }
    }
}

impl<R> Stream for ReadStream<R>
where
    R: AsyncRead,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.eof || matches!(*this.remaining, Some(0)) {
            return Poll::Ready(None);
        }

        this.buf.reserve(*this.chunk_size);

        let dst = &mut this.buf.spare_capacity_mut()[..*this.chunk_size];
        let mut read_buf = ReadBuf::uninit(dst);

        ready!(this.reader.as_mut().poll_read(cx, &mut read_buf))?;

        let n = read_buf.filled().len();

        if n == 0 {
            *this.eof = true;
            return Poll::Ready(None);
        }

        // poll_read initialized exactly n bytes of the spare capacity.
        unsafe { this.buf.advance_mut(n) };

        let mut chunk = this.buf.split_to(n);

        if let Some(remaining) = this.remaining.as_mut() {
            let n = n as u64;
            if *remaining <= n {
                chunk.truncate(*remaining as usize);
                *remaining = 0;
            } else {
                *remaining -= n;
            }
        }

        Poll::Ready(Some(Ok(chunk.freeze())))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            Some(len) => (len as usize, Some(len as usize)),
            None => (0, None),
        }
    }
}
