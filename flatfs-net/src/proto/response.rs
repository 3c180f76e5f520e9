//! Response framing.
//!
//! ```text
//! STATUS_CODE STATUS_PHRASE\r\n
//! Length:BYTE_COUNT\r\n
//! \r\n
//! <BYTE_COUNT bytes of body>
//! ```
//!
//! Bodies are arbitrary bytes and may contain `\r\n` themselves, so the
//! reader trusts the length header and never scans the body for terminators.
use std::io::{ErrorKind, Read, Write};

use super::status::Status;
use crate::error::ProtocolError;

const HEADER_END: &[u8] = b"\r\n\r\n";
const LENGTH_PREFIX: &str = "Length:";
/// A header can never legitimately get this long.
const MAX_HEADER_LEN: usize = 256;
const READ_CHUNK: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: Status, body: Vec<u8>) -> Self {
        Response { status, body }
    }

    pub fn ok(body: Vec<u8>) -> Self {
        Response::new(Status::Ok, body)
    }

    /// A response with nothing but a status line and a zero length header.
    pub fn empty(status: Status) -> Self {
        Response::new(status, Vec::new())
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut frame = format!(
            "{}\r\n{}{}\r\n\r\n",
            self.status,
            LENGTH_PREFIX,
            self.body.len()
        )
        .into_bytes();
        frame.extend_from_slice(&self.body);
        frame
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&self.encode())?;
        writer.flush()
    }
}

/// Client side decoder. Bytes read past the end of one response stay buffered
/// for the next one.
pub struct ResponseReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: Read> ResponseReader<R> {
    pub fn new(inner: R) -> Self {
        ResponseReader {
            inner,
            buf: Vec::new(),
        }
    }

    /// Blocks until one full response has arrived.
    pub fn read_response(&mut self) -> Result<Response, ProtocolError> {
        let header_end = loop {
            if let Some(pos) = find(&self.buf, HEADER_END) {
                break pos;
            }
            if self.buf.len() > MAX_HEADER_LEN {
                return Err(ProtocolError::MalformedHeader(
                    "no header terminator".to_string(),
                ));
            }
            if self.fill()? == 0 {
                return Err(if self.buf.is_empty() {
                    ProtocolError::Closed
                } else {
                    ProtocolError::UnexpectedEof
                });
            }
        };

        let (status, length) = parse_header(&self.buf[..header_end])?;
        let body_start = header_end + HEADER_END.len();
        let body_end = body_start + length;
        while self.buf.len() < body_end {
            if self.fill()? == 0 {
                return Err(ProtocolError::UnexpectedEof);
            }
        }

        let body = self.buf[body_start..body_end].to_vec();
        self.buf.drain(..body_end);
        Ok(Response::new(status, body))
    }

    fn fill(&mut self) -> Result<usize, ProtocolError> {
        let mut chunk = [0; READ_CHUNK];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_header(header: &[u8]) -> Result<(Status, usize), ProtocolError> {
    let malformed = |what: &str| ProtocolError::MalformedHeader(what.to_string());

    let header = std::str::from_utf8(header).map_err(|_| malformed("not utf-8"))?;
    let (status_line, length_line) = header
        .split_once("\r\n")
        .ok_or_else(|| malformed("missing length line"))?;

    let code = status_line
        .split(' ')
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| malformed(status_line))?;
    let status = Status::from_code(code).ok_or(ProtocolError::UnknownStatus(code))?;

    let length = length_line
        .strip_prefix(LENGTH_PREFIX)
        .and_then(|len| len.trim().parse::<usize>().ok())
        .ok_or_else(|| malformed(length_line))?;

    Ok((status, length))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// Hands out at most `step` bytes per read to exercise partial reads.
    struct Trickle {
        data: Vec<u8>,
        pos: usize,
        step: usize,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn encodes_status_length_and_body() {
        let response = Response::ok(b"a\r\nb".to_vec());
        assert_eq!(response.encode(), b"200 OK\r\nLength:4\r\n\r\na\r\nb".to_vec());
        assert_eq!(
            Response::empty(Status::NotEmpty).encode(),
            b"507 Directory is not empty\r\nLength:0\r\n\r\n".to_vec()
        );
    }

    #[test]
    fn body_with_terminators_round_trips() {
        let body = b"\r\n\r\nline one\r\n\r\nline two\r\n".to_vec();
        let response = Response::ok(body.clone());

        let mut reader = ResponseReader::new(Cursor::new(response.encode()));
        let decoded = reader.read_response().unwrap();
        assert_eq!(decoded.status, Status::Ok);
        assert_eq!(decoded.body, body);
    }

    #[test]
    fn reads_across_tiny_chunks() {
        let response = Response::ok((0..=255u8).collect());
        let mut reader = ResponseReader::new(Trickle {
            data: response.encode(),
            pos: 0,
            step: 3,
        });
        assert_eq!(reader.read_response().unwrap(), response);
    }

    #[test]
    fn back_to_back_responses_keep_their_boundaries() {
        let first = Response::ok(b"one\r\n\r\n".to_vec());
        let second = Response::empty(Status::NotFound);
        let third = Response::ok(b"three".to_vec());
        let mut wire = first.encode();
        wire.extend(second.encode());
        wire.extend(third.encode());

        let mut reader = ResponseReader::new(Cursor::new(wire));
        assert_eq!(reader.read_response().unwrap(), first);
        assert_eq!(reader.read_response().unwrap(), second);
        assert_eq!(reader.read_response().unwrap(), third);
        assert!(matches!(reader.read_response(), Err(ProtocolError::Closed)));
    }

    #[test]
    fn truncated_body_is_an_error() {
        let mut wire = Response::ok(b"abcdef".to_vec()).encode();
        wire.truncate(wire.len() - 2);
        let mut reader = ResponseReader::new(Cursor::new(wire));
        assert!(matches!(
            reader.read_response(),
            Err(ProtocolError::UnexpectedEof)
        ));
    }

    #[test]
    fn rejects_bad_headers() {
        let cases: [&[u8]; 4] = [
            b"OK\r\nLength:0\r\n\r\n",
            b"200 OK\r\nSize:0\r\n\r\n",
            b"200 OK\r\n\r\n",
            b"200 OK\r\nLength:many\r\n\r\n",
        ];
        for case in cases {
            let mut reader = ResponseReader::new(Cursor::new(case.to_vec()));
            assert!(
                matches!(reader.read_response(), Err(ProtocolError::MalformedHeader(_))),
                "accepted {:?}",
                String::from_utf8_lossy(case)
            );
        }

        let mut reader = ResponseReader::new(Cursor::new(b"299 Odd\r\nLength:0\r\n\r\n".to_vec()));
        assert!(matches!(
            reader.read_response(),
            Err(ProtocolError::UnknownStatus(299))
        ));
    }

    #[test]
    fn runaway_header_is_rejected() {
        let mut reader = ResponseReader::new(Cursor::new(vec![b'x'; 4 * MAX_HEADER_LEN]));
        assert!(matches!(
            reader.read_response(),
            Err(ProtocolError::MalformedHeader(_))
        ));
    }
}
