//! async file system abstraction for opening and chunk reading files.

use core::future::Future;

use std::{io, path::PathBuf};

use bytes::BytesMut;

/// async file system. the sender is generic over it so non tokio (or in
/// memory) file systems can be plugged in.
pub trait AsyncFs: Clone {
    type File: ChunkRead;
    type OpenFuture: Future<Output = io::Result<Self::File>>;

    fn open(&self, path: PathBuf) -> Self::OpenFuture;
}

/// metadata of an opened file.
pub trait Meta {
    /// total byte length of the file at open time.
    fn len(&self) -> u64;
}

/// chunked read of file type. the file moves through the future and is
/// handed back together with the filled buffer on completion.
pub trait ChunkRead: Meta + Sized {
    type Future: Future<Output = io::Result<Option<(Self, BytesMut, usize)>>>;

    /// read the next chunk into buf. None signals end of file.
    fn next(self, buf: BytesMut) -> Self::Future;
}

#[cfg(feature = "tokio")]
pub use tokio_impl::{TokioFile, TokioFs};

#[cfg(feature = "tokio")]
mod tokio_impl {
    use core::pin::Pin;

    use tokio::{fs::File, io::AsyncReadExt};

    use super::*;

    type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

    /// tokio based file system. file metadata is collected on the blocking
    /// thread pool at open time.
    #[derive(Clone)]
    pub struct TokioFs;

    impl AsyncFs for TokioFs {
        type File = TokioFile;
        type OpenFuture = BoxFuture<io::Result<Self::File>>;

        fn open(&self, path: PathBuf) -> Self::OpenFuture {
            Box::pin(async {
                tokio::task::spawn_blocking(move || {
                    let file = std::fs::File::open(path)?;
                    let len = file.metadata()?.len();
                    Ok(TokioFile {
                        file: file.into(),
                        len,
                    })
                })
                .await
                .map_err(io::Error::other)?
            })
        }
    }

    pub struct TokioFile {
        file: File,
        len: u64,
    }

    impl Meta for TokioFile {
        fn len(&self) -> u64 {
            self.len
        }
    }

    impl ChunkRead for TokioFile {
        type Future = BoxFuture<io::Result<Option<(Self, BytesMut, usize)>>>;

        fn next(mut self, mut buf: BytesMut) -> Self::Future {
            Box::pin(async {
                let n = self.file.read_buf(&mut buf).await?;

                if n == 0 {
                    Ok(None)
                } else {
                    Ok(Some((self, buf, n)))
                }
            })
        }
    }
}
