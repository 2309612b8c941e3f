use core::{
    future::Future,
    pin::Pin,
    task::{ready, Context, Poll},
};

use std::io;

use bytes::{Bytes, BytesMut};
use futures_core::stream::Stream;
use pin_project_lite::pin_project;

use super::runtime::ChunkRead;

pin_project! {
    /// file backed body stream. yields at most the byte length observed when
    /// the file was opened, which is also what the content-length header
    /// promised to the peer.
    pub struct ChunkReader<F>
    where
        F: ChunkRead,
    {
        chunk_size: usize,
        size: u64,
        #[pin]
        on_flight: F::Future
    }
}

impl<F> core::fmt::Debug for ChunkReader<F>
where
    F: ChunkRead,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ChunkReader")
            .field("chunk_size", &self.chunk_size)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl<F> ChunkReader<F>
where
    F: ChunkRead,
{
    pub(crate) fn new(file: F, size: u64, chunk_size: usize) -> Self {
        Self {
            chunk_size,
            size,
            on_flight: file.next(BytesMut::with_capacity(chunk_size)),
        }
    }
}

impl<F> Stream for ChunkReader<F>
where
    F: ChunkRead,
{
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.size == 0 {
            return Poll::Ready(None);
        }

        Poll::Ready(ready!(this.on_flight.as_mut().poll(cx))?.map(|(file, mut bytes, n)| {
            let mut chunk = bytes.split_to(n);

            let n = n as u64;

            if *this.size <= n {
                if *this.size < n {
                    // someone appended to the file while it's being read.
                    // only self.size bytes were promised to the peer. drop
                    // the extra part.
                    chunk.truncate(*this.size as usize);
                }
                *this.size = 0;
                return Ok(chunk.freeze());
            }

            *this.size -= n;

            bytes.reserve(*this.chunk_size);
            this.on_flight.set(file.next(bytes));

            Ok(chunk.freeze())
        }))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let size = self.size as usize;
        (size, Some(size))
    }
}
