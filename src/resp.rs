use bytes::{Buf, BytesMut};

/// Maximum accepted bulk payload: 512MB.
const MAX_BULK_LEN: i64 = 512 * 1024 * 1024;
/// Maximum accepted array element count.
const MAX_ARRAY_LEN: i64 = 1024 * 1024;

/// A wire protocol value, used uniformly for requests and replies.
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// +OK\r\n
    SimpleString(String),
    /// -ERR message\r\n
    Error(String),
    /// :1000\r\n
    Integer(i64),
    /// $5\r\nhello\r\n
    Bulk(String),
    /// *2\r\n...
    Array(Vec<RespValue>),
    /// Same leading marker as Array, distinct semantic tag (SMEMBERS replies).
    Set(Vec<RespValue>),
    /// $-1\r\n
    Null,
    /// Serializes to nothing: the reply was already pushed out of band.
    Void,
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn simple(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    pub fn bulk(s: impl Into<String>) -> Self {
        RespValue::Bulk(s.into())
    }

    pub fn array(items: Vec<RespValue>) -> Self {
        RespValue::Array(items)
    }

    pub fn set(items: Vec<RespValue>) -> Self {
        RespValue::Set(items)
    }

    /// The string payload of a Bulk (or SimpleString) value, for argument
    /// extraction out of a request array.
    pub fn as_bulk(&self) -> Option<&str> {
        match self {
            RespValue::Bulk(s) => Some(s),
            RespValue::SimpleString(s) => Some(s),
            _ => None,
        }
    }

    /// Serialize this value to wire bytes.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.write_to(&mut buf);
        buf
    }

    /// Write wire bytes into the given buffer.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            RespValue::SimpleString(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Error(s) => {
                buf.push(b'-');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Bulk(s) => {
                buf.push(b'$');
                buf.extend_from_slice(s.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RespValue::Array(items) | RespValue::Set(items) => {
                buf.push(b'*');
                buf.extend_from_slice(items.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for item in items {
                    item.write_to(buf);
                }
            }
            RespValue::Null => {
                buf.extend_from_slice(b"$-1\r\n");
            }
            RespValue::Void => {}
        }
    }
}

/// Incremental frame parser for the request side of the protocol.
///
/// Requests are arrays of bulk strings, so only `*` and `$` frames are
/// accepted. Call `parse()` repeatedly as data arrives: `Ok(Some(value))`
/// when a complete frame was consumed, `Ok(None)` when the buffer does not
/// yet hold one (nothing is consumed in that case).
pub struct RespParser;

impl RespParser {
    pub fn parse(buf: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        if buf.is_empty() {
            return Ok(None);
        }

        match buf[0] {
            b'*' => Self::parse_array(buf),
            b'$' => Self::parse_bulk(buf),
            other => Err(RespError::UnknownType(other)),
        }
    }

    fn parse_bulk(buf: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        let crlf = match find_crlf(buf, 1) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let len = parse_length(&buf[1..crlf])?;

        if len == -1 {
            buf.advance(crlf + 2);
            return Ok(Some(RespValue::Null));
        }
        if !(0..=MAX_BULK_LEN).contains(&len) {
            return Err(RespError::InvalidLength(len.to_string()));
        }

        let len = len as usize;
        let total = crlf + 2 + len + 2;
        if buf.len() < total {
            return Ok(None);
        }

        if buf[crlf + 2 + len] != b'\r' || buf[crlf + 2 + len + 1] != b'\n' {
            return Err(RespError::MissingCrlf);
        }

        let payload = String::from_utf8_lossy(&buf[crlf + 2..crlf + 2 + len]).into_owned();
        buf.advance(total);
        Ok(Some(RespValue::Bulk(payload)))
    }

    fn parse_array(buf: &mut BytesMut) -> Result<Option<RespValue>, RespError> {
        let crlf = match find_crlf(buf, 1) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let count = parse_length(&buf[1..crlf])?;
        if !(0..=MAX_ARRAY_LEN).contains(&count) {
            return Err(RespError::InvalidLength(count.to_string()));
        }

        // Elements may be incomplete; keep a copy so the buffer can be
        // restored untouched when more data is needed.
        let saved = buf.clone();
        buf.advance(crlf + 2);

        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match Self::parse(buf) {
                Ok(Some(value)) => items.push(value),
                Ok(None) => {
                    *buf = saved;
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(Some(RespValue::Array(items)))
    }
}

fn parse_length(digits: &[u8]) -> Result<i64, RespError> {
    let s = std::str::from_utf8(digits)
        .map_err(|_| RespError::InvalidLength(String::from_utf8_lossy(digits).into_owned()))?;
    s.parse()
        .map_err(|_| RespError::InvalidLength(s.to_string()))
}

/// Find the first \r\n at or after `start`.
fn find_crlf(buf: &[u8], start: usize) -> Option<usize> {
    if buf.len() < start + 2 {
        return None;
    }
    (start..buf.len() - 1).find(|&i| buf[i] == b'\r' && buf[i + 1] == b'\n')
}

#[derive(Debug, thiserror::Error)]
pub enum RespError {
    #[error("unknown frame type byte '{}'", *.0 as char)]
    UnknownType(u8),

    #[error("invalid length: {0}")]
    InvalidLength(String),

    #[error("missing CRLF after bulk payload")]
    MissingCrlf,
}
