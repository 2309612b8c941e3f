use bytes::{BufMut, Bytes, BytesMut};
use serde::ser::Serialize;

use super::error::SendError;

/// charset of a serialized json body. determines both the byte encoding and
/// the charset parameter of the content-type header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Charset {
    Utf8,
    Utf16Le,
    Utf16Be,
}

impl Charset {
    /// IANA charset label used in the content-type parameter.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf16Le => "utf-16le",
            Self::Utf16Be => "utf-16be",
        }
    }
}

pub(crate) fn to_bytes<T>(value: &T, charset: Charset) -> Result<Bytes, SendError>
where
    T: Serialize + ?Sized,
{
    match charset {
        Charset::Utf8 => {
            let mut buf = BytesMut::new();
            serde_json::to_writer((&mut buf).writer(), value)?;
            Ok(buf.freeze())
        }
        // serde_json only emits utf-8. utf-16 bodies are transcoded from the
        // utf-8 output code unit by code unit.
        Charset::Utf16Le | Charset::Utf16Be => {
            let utf8 = serde_json::to_string(value)?;
            let mut buf = BytesMut::with_capacity(utf8.len() * 2);
            for unit in utf8.encode_utf16() {
                match charset {
                    Charset::Utf16Le => buf.put_u16_le(unit),
                    _ => buf.put_u16(unit),
                }
            }
            Ok(buf.freeze())
        }
    }
}
