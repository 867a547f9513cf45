//! `Content-Length` framing.
//!
//! ```text
//! Content-Length: <n>\r\n
//! \r\n
//! <n bytes of UTF-8 JSON>
//! ```

use std::io;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const HEADER_END: &[u8] = b"\r\n\r\n";
const CONTENT_LENGTH: &str = "content-length";

/// Largest accepted body, in bytes.
pub const MAX_FRAME: usize = 64 * 1024 * 1024;
/// Largest accepted header block, in bytes.
const MAX_HEADER: usize = 8 * 1024;

/// Frame a payload with its header.
pub fn frame(payload: &str) -> String {
    format!("Content-Length: {}\r\n\r\n{}", payload.len(), payload)
}

/// Strip an optional header from a payload that arrived in one piece.
///
/// Returns `None` for a bare header, which some clients send as a separate
/// message ahead of the body.
pub fn unframe(message: &str) -> Option<&str> {
    if !message.starts_with("Content-Length:") {
        return Some(message);
    }
    let (_, body) = message.split_once("\r\n\r\n")?;
    (!body.trim().is_empty()).then_some(body)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct LspCodec {
    /// Body length once the header has been read.
    pending: Option<usize>,
}

impl LspCodec {
    pub fn new() -> Self {
        Self::default()
    }
}

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

fn parse_header(header: &[u8]) -> io::Result<usize> {
    let header = std::str::from_utf8(header).map_err(|_| invalid("header is not UTF-8"))?;
    let mut length = None;
    for line in header.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case(CONTENT_LENGTH) {
            let value = value.trim();
            length = Some(value.parse::<usize>().map_err(|_| invalid(format!("bad Content-Length '{}'", value)))?);
        }
    }
    match length {
        Some(length) if length > MAX_FRAME => Err(invalid(format!(
            "Content-Length {} exceeds the {} byte limit",
            length, MAX_FRAME
        ))),
        Some(length) => Ok(length),
        None => Err(invalid("missing Content-Length header")),
    }
}

impl Decoder for LspCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, io::Error> {
        let length = match self.pending {
            Some(length) => length,
            None => {
                let Some(end) = src.windows(HEADER_END.len()).position(|w| w == HEADER_END) else {
                    if src.len() > MAX_HEADER {
                        return Err(invalid("header too long"));
                    }
                    return Ok(None);
                };
                let length = parse_header(&src[..end])?;
                src.advance(end + HEADER_END.len());
                self.pending = Some(length);
                length
            }
        };

        if src.len() < length {
            src.reserve(length - src.len());
            return Ok(None);
        }

        self.pending = None;
        let body = src.split_to(length);
        String::from_utf8(body.to_vec())
            .map(Some)
            .map_err(|_| invalid("body is not UTF-8"))
    }
}

impl Encoder<String> for LspCodec {
    type Error = io::Error;

    fn encode(&mut self, payload: String, dst: &mut BytesMut) -> Result<(), io::Error> {
        let header = format!("Content-Length: {}\r\n\r\n", payload.len());
        dst.reserve(header.len() + payload.len());
        dst.put_slice(header.as_bytes());
        dst.put_slice(payload.as_bytes());
        Ok(())
    }
}
