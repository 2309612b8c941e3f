//! response entity construction for http crate type.
//!
//! adapts files, async readers, bundled resources and json values into
//! [Response] values with streaming bodies, setting content-length,
//! content-type and content-disposition headers appropriately. actual
//! protocol framing is left to the http stack consuming the body stream:
//! bodies with an exact [Stream::size_hint] are length delimited, bodies
//! with an unknown hint are meant for chunked transfer.

mod body;
mod chunk;
mod error;
mod json;
mod resource;
#[cfg(feature = "tokio")]
mod stream;

pub mod runtime;

pub use body::Full;
pub use chunk::ChunkReader;
pub use error::SendError;
pub use json::Charset;
pub use resource::Resources;
#[cfg(feature = "tokio")]
pub use stream::ReadStream;

use core::fmt::{self, Write};

use std::path::PathBuf;

use bytes::BytesMut;
use futures_core::stream::Stream;
use http::{
    header::{HeaderValue, CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE},
    Response, StatusCode,
};
use percent_encoding::{percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::ser::Serialize;

use runtime::{AsyncFs, Meta};

const DEFAULT_CHUNK_SIZE: usize = 4096;

const OCTET_STREAM: &str = "application/octet-stream";

/// how a named body should be presented by the receiving peer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Disposition {
    /// display in place. no content-disposition header is written.
    Inline,
    /// offer as download under the body's file name. writes
    /// `content-disposition: attachment; filename="..."`.
    Attachment,
}

/// builder for responses with a fixed status code. every send_* operation
/// produces a [Response] carrying that status and a body stream adapted from
/// the given source.
pub struct Sender<FS> {
    status: StatusCode,
    chunk_size: usize,
    fs: FS,
}

#[cfg(feature = "tokio")]
impl Sender<runtime::TokioFs> {
    /// construct a sender backed by the tokio file system.
    pub fn new(status: StatusCode) -> Self {
        Self::with_fs(status, runtime::TokioFs)
    }
}

impl<FS> Sender<FS> {
    /// construct a sender with a custom [AsyncFs] implementation.
    pub fn with_fs(status: StatusCode, fs: FS) -> Self {
        Self {
            status,
            chunk_size: DEFAULT_CHUNK_SIZE,
            fs,
        }
    }

    /// set the chunk size of streamed bodies. clamped to at least one byte
    /// so a streamed body can always make progress.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// wrap an arbitrary bytes stream as a chunked response body. no
    /// content-length or content-type is written.
    pub fn chunked<S>(&self, stream: S) -> Response<S>
    where
        S: Stream,
    {
        self.response(stream)
    }

    /// serialize value into a fixed length utf-8 json body.
    pub fn send_json<T>(&self, value: &T) -> Result<Response<Full>, SendError>
    where
        T: Serialize + ?Sized,
    {
        self.send_json_with_charset(value, Charset::Utf8)
    }

    /// serialize value into a fixed length json body with an explicit
    /// charset. the content-type carries a matching charset parameter.
    pub fn send_json_with_charset<T>(&self, value: &T, charset: Charset) -> Result<Response<Full>, SendError>
    where
        T: Serialize + ?Sized,
    {
        let body = Full::new(json::to_bytes(value, charset)?);
        let len = body.len();

        let mut res = self.response(body);
        let headers = res.headers_mut();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        headers.insert(
            CONTENT_TYPE,
            format_header(32, format_args!("application/json;charset={}", charset.label())),
        );

        Ok(res)
    }

    /// look name up in the resource registry and send its bytes as a fixed
    /// length body. content-type is guessed from the resource name and the
    /// last path segment becomes the attachment file name.
    pub fn send_resource(
        &self,
        resources: &Resources,
        name: &str,
        disposition: Disposition,
    ) -> Result<Response<Full>, SendError> {
        let body = Full::new(resources.get(name).ok_or(SendError::ResourceNotFound)?);
        let len = body.len();

        let mut res = self.response(body);
        let headers = res.headers_mut();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
        headers.insert(CONTENT_TYPE, content_type_for(name));

        if let Disposition::Attachment = disposition {
            let file_name = name.rsplit('/').next().unwrap_or(name);
            headers.insert(CONTENT_DISPOSITION, content_disposition(file_name));
        }

        Ok(res)
    }

    fn response<B>(&self, body: B) -> Response<B> {
        let mut res = Response::new(body);
        *res.status_mut() = self.status;
        res
    }
}

#[cfg(feature = "tokio")]
impl<FS> Sender<FS> {
    /// wrap reader in a chunked body. no content-length is written since the
    /// input length is unknown.
    pub fn send_read<R>(&self, reader: R) -> Response<ReadStream<R>>
    where
        R: tokio::io::AsyncRead,
    {
        self.response(ReadStream::new(reader, self.chunk_size))
    }

    /// wrap reader in a length delimited body. the stream never yields more
    /// than len bytes even if the reader has more.
    pub fn send_read_sized<R>(&self, reader: R, len: u64) -> Response<ReadStream<R>>
    where
        R: tokio::io::AsyncRead,
    {
        let mut res = self.response(ReadStream::sized(reader, self.chunk_size, len));
        res.headers_mut().insert(CONTENT_LENGTH, HeaderValue::from(len));
        res
    }
}

impl<FS> Sender<FS>
where
    FS: AsyncFs,
{
    /// open the file at path and stream it as a length delimited body. the
    /// file name of the path drives content-type and attachment naming.
    pub async fn send_path(
        &self,
        path: impl Into<PathBuf>,
        disposition: Disposition,
    ) -> Result<Response<ChunkReader<FS::File>>, SendError> {
        let path = path.into();
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        self.send_path_inner(path, disposition, name).await
    }

    /// like [Sender::send_path] with the header file name overridden.
    pub async fn send_path_with_name(
        &self,
        path: impl Into<PathBuf>,
        disposition: Disposition,
        name: &str,
    ) -> Result<Response<ChunkReader<FS::File>>, SendError> {
        self.send_path_inner(path.into(), disposition, Some(name.to_owned())).await
    }

    async fn send_path_inner(
        &self,
        path: PathBuf,
        disposition: Disposition,
        name: Option<String>,
    ) -> Result<Response<ChunkReader<FS::File>>, SendError> {
        let file = self.fs.open(path).await?;
        let size = file.len();

        let mut res = self.response(ChunkReader::new(file, size, self.chunk_size));
        let headers = res.headers_mut();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(size));

        if let Some(name) = name.as_deref() {
            headers.insert(CONTENT_TYPE, content_type_for(name));
            if let Disposition::Attachment = disposition {
                headers.insert(CONTENT_DISPOSITION, content_disposition(name));
            }
        }

        Ok(res)
    }
}

// format a header value straight into shared bytes. callers only produce
// valid header value characters.
fn format_header(cap: usize, args: fmt::Arguments<'_>) -> HeaderValue {
    struct BytesMutWriter(BytesMut);

    impl Write for BytesMutWriter {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            self.0.extend_from_slice(s.as_bytes());
            Ok(())
        }
    }

    let mut buf = BytesMutWriter(BytesMut::with_capacity(cap));
    buf.write_fmt(args).unwrap();
    HeaderValue::from_maybe_shared(buf.0.freeze()).unwrap()
}

fn content_type_for(name: &str) -> HeaderValue {
    mime_guess::from_path(name)
        .first_raw()
        .map(HeaderValue::from_static)
        .unwrap_or_else(|| HeaderValue::from_static(OCTET_STREAM))
}

// RFC 5987 attr-char. every other byte of the ext-value is percent-encoded.
const ATTR_CHAR: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'!')
    .remove(b'#')
    .remove(b'$')
    .remove(b'&')
    .remove(b'+')
    .remove(b'-')
    .remove(b'.')
    .remove(b'^')
    .remove(b'_')
    .remove(b'`')
    .remove(b'|')
    .remove(b'~');

fn content_disposition(name: &str) -> HeaderValue {
    let fallback = quoted_fallback(name);

    if name.is_ascii() {
        format_header(fallback.len() + 24, format_args!("attachment; filename=\"{fallback}\""))
    } else {
        let encoded = percent_encode(name.as_bytes(), ATTR_CHAR);
        format_header(
            name.len() * 3 + 48,
            format_args!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}"),
        )
    }
}

// quoted-string safe subset of name: non-ascii and control characters are
// dropped, quote and backslash are escaped.
fn quoted_fallback(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if !c.is_ascii() || c.is_ascii_control() {
            continue;
        }
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod test {
    use core::future::poll_fn;

    use std::pin::pin;

    use bytes::Bytes;
    use futures_core::stream::Stream;

    use super::*;

    async fn collect<S, E>(stream: S) -> Vec<u8>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Debug,
    {
        let mut stream = pin!(stream);
        let mut res = Vec::new();
        while let Some(chunk) = poll_fn(|cx| stream.as_mut().poll_next(cx)).await {
            res.extend_from_slice(&chunk.unwrap());
        }
        res
    }

    fn header<'a>(res: &'a Response<impl Sized>, name: http::header::HeaderName) -> Option<&'a str> {
        res.headers().get(name).map(|v| v.to_str().unwrap())
    }

    #[tokio::test]
    async fn path_inline() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "hello, world!").unwrap();

        let res = Sender::new(StatusCode::OK)
            .send_path(&path, Disposition::Inline)
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(header(&res, CONTENT_LENGTH), Some("13"));
        assert_eq!(header(&res, CONTENT_TYPE), Some("text/plain"));
        assert!(res.headers().get(CONTENT_DISPOSITION).is_none());

        assert_eq!(collect(res.into_body()).await, b"hello, world!");
    }

    #[tokio::test]
    async fn path_attachment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "a,b\n1,2\n").unwrap();

        let res = Sender::new(StatusCode::OK)
            .send_path(&path, Disposition::Attachment)
            .await
            .unwrap();

        assert_eq!(header(&res, CONTENT_TYPE), Some("text/csv"));
        assert_eq!(
            header(&res, CONTENT_DISPOSITION),
            Some("attachment; filename=\"report.csv\"")
        );
    }

    #[tokio::test]
    async fn path_with_name_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tmp-upload-321");
        std::fs::write(&path, "%PDF-").unwrap();

        let res = Sender::new(StatusCode::OK)
            .send_path_with_name(&path, Disposition::Attachment, "invoice.pdf")
            .await
            .unwrap();

        assert_eq!(header(&res, CONTENT_TYPE), Some("application/pdf"));
        assert_eq!(
            header(&res, CONTENT_DISPOSITION),
            Some("attachment; filename=\"invoice.pdf\"")
        );
    }

    #[tokio::test]
    async fn path_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = Sender::new(StatusCode::OK)
            .send_path(dir.path().join("absent"), Disposition::Inline)
            .await
            .unwrap_err();

        assert!(matches!(err, SendError::Io(_)));
    }

    #[tokio::test]
    async fn read_chunked() {
        let res = Sender::new(StatusCode::OK).send_read(&b"streamed"[..]);

        assert!(res.headers().get(CONTENT_LENGTH).is_none());
        assert_eq!(res.body().size_hint(), (0, None));

        assert_eq!(collect(res.into_body()).await, b"streamed");
    }

    #[tokio::test]
    async fn read_sized() {
        let res = Sender::new(StatusCode::OK).send_read_sized(&b"hello, world!"[..], 5);

        assert_eq!(header(&res, CONTENT_LENGTH), Some("5"));
        assert_eq!(res.body().size_hint(), (5, Some(5)));

        assert_eq!(collect(res.into_body()).await, b"hello");
    }

    #[tokio::test]
    async fn resource() {
        let resources = Resources::new().insert("/assets/app.css", &b"body {}"[..]);
        let sender = Sender::new(StatusCode::OK);

        let res = sender
            .send_resource(&resources, "assets/app.css", Disposition::Attachment)
            .unwrap();

        assert_eq!(header(&res, CONTENT_LENGTH), Some("7"));
        assert_eq!(header(&res, CONTENT_TYPE), Some("text/css"));
        assert_eq!(
            header(&res, CONTENT_DISPOSITION),
            Some("attachment; filename=\"app.css\"")
        );
        assert_eq!(collect(res.into_body()).await, b"body {}");

        let err = sender
            .send_resource(&resources, "assets/missing.css", Disposition::Inline)
            .unwrap_err();
        assert!(matches!(err, SendError::ResourceNotFound));
    }

    #[tokio::test]
    async fn json() {
        let value = serde_json::json!({ "a": 1 });

        let res = Sender::new(StatusCode::CREATED).send_json(&value).unwrap();

        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(header(&res, CONTENT_LENGTH), Some("7"));
        assert_eq!(header(&res, CONTENT_TYPE), Some("application/json;charset=utf-8"));

        assert_eq!(collect(res.into_body()).await, br#"{"a":1}"#);
    }

    #[tokio::test]
    async fn json_utf16() {
        let value = serde_json::json!("hi");

        let res = Sender::new(StatusCode::OK)
            .send_json_with_charset(&value, Charset::Utf16Le)
            .unwrap();

        assert_eq!(header(&res, CONTENT_LENGTH), Some("8"));
        assert_eq!(header(&res, CONTENT_TYPE), Some("application/json;charset=utf-16le"));
    }

    #[test]
    fn json_serialize_error() {
        struct Refuse;

        impl Serialize for Refuse {
            fn serialize<S>(&self, _: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                Err(serde::ser::Error::custom("refused"))
            }
        }

        let err = Sender::new(StatusCode::OK).send_json(&Refuse).unwrap_err();
        assert!(matches!(err, SendError::Json(_)));
    }

    #[tokio::test]
    async fn zero_chunk_size_clamped() {
        let res = Sender::new(StatusCode::OK)
            .chunk_size(0)
            .send_read_sized(&b"hi"[..], 2);

        assert_eq!(header(&res, CONTENT_LENGTH), Some("2"));
        assert_eq!(collect(res.into_body()).await, b"hi");
    }

    #[tokio::test]
    async fn chunked_passthrough() {
        let res = Sender::new(StatusCode::OK).chunked(Full::new(Bytes::from_static(b"raw")));

        assert!(res.headers().get(CONTENT_LENGTH).is_none());
        assert!(res.headers().get(CONTENT_TYPE).is_none());

        assert_eq!(collect(res.into_body()).await, b"raw");
    }

    #[test]
    fn disposition_escaping() {
        assert_eq!(
            content_disposition(r#"he"llo.txt"#).to_str().unwrap(),
            r#"attachment; filename="he\"llo.txt""#
        );

        assert_eq!(
            content_disposition("naïve file.txt").to_str().unwrap(),
            "attachment; filename=\"nave file.txt\"; filename*=UTF-8''na%C3%AFve%20file.txt"
        );
    }

    #[test]
    fn unknown_extension_falls_back_to_binary() {
        assert_eq!(content_type_for("data.qqqz").to_str().unwrap(), OCTET_STREAM);
    }
}
