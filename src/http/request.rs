//! HTTP/1.1 request parsing using the [`httparse`] crate.

use bytes::Bytes;
use thiserror::Error;

use super::{Headers, Method};

/// Errors that can occur while parsing an HTTP/1.1 request.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request is incomplete, more data needed")]
    Incomplete,

    #[error("HTTP parse error: {0}")]
    Parse(#[from] httparse::Error),

    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid Content-Length header: {value:?}")]
    InvalidContentLength { value: String },

    #[error("unsupported Transfer-Encoding: {value:?}")]
    UnsupportedTransferEncoding { value: String },

    #[error("both Transfer-Encoding and Content-Length are set")]
    ConflictingFraming,

    #[error("malformed chunked body")]
    InvalidChunk,
}

/// How the body of a request is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFraming {
    /// Exactly this many bytes follow the headers (zero without `Content-Length`).
    Length(usize),
    /// `Transfer-Encoding: chunked`; decode with [`decode_chunked`].
    Chunked,
}

/// A parsed HTTP/1.1 request.
///
/// Created by [`Request::parse`] from a raw byte buffer. A length-framed body
/// holds at most `Content-Length` bytes, so pipelined requests sharing the
/// buffer are never folded into it. A chunked body starts out empty and is
/// filled in once [`decode_chunked`] has the whole of it.
///
/// # Examples
///
/// ```
/// use taskd::http::request::{BodyFraming, Request};
///
/// let raw = b"PUT /api/tasks/3?x=1 HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}";
/// let (request, offset) = Request::parse(raw).unwrap();
///
/// assert_eq!(request.method().as_str(), "PUT");
/// assert_eq!(request.path(), "/api/tasks/3");
/// assert_eq!(request.framing(), BodyFraming::Length(2));
/// assert!(request.has_json_body());
/// assert_eq!(&raw[offset..], b"{}");
/// ```
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    /// HTTP minor version: 0 for HTTP/1.0, 1 for HTTP/1.1.
    version: u8,
    headers: Headers,
    framing: BodyFraming,
    body: Bytes,
}

impl Request {
    /// Maximum number of headers we support per request.
    const MAX_HEADERS: usize = 64;

    /// Parse a raw HTTP/1.1 request from a byte slice.
    ///
    /// Returns the parsed `Request` and the byte offset at which the body begins
    /// in `buf` (i.e. immediately after the `\r\n\r\n` header terminator). The
    /// body may be shorter than `Content-Length` if `buf` does not hold all of
    /// it yet; callers compare against [`framing`](Self::framing).
    ///
    /// # Errors
    ///
    /// - [`RequestError::Incomplete`]: more data is needed to complete the request headers.
    /// - [`RequestError::Parse`]: the data is malformed and cannot be parsed.
    /// - [`RequestError::MissingField`]: a required field (method, path, version) is absent.
    /// - [`RequestError::InvalidContentLength`]: `Content-Length` is not a number.
    /// - [`RequestError::UnsupportedTransferEncoding`]: a transfer coding other than `chunked`.
    /// - [`RequestError::ConflictingFraming`]: both `Transfer-Encoding` and `Content-Length`.
    pub fn parse(buf: &[u8]) -> Result<(Self, usize), RequestError> {
        let mut headers = [httparse::EMPTY_HEADER; Self::MAX_HEADERS];
        let mut raw_req = httparse::Request::new(&mut headers);

        let body_offset = match raw_req.parse(buf)? {
            httparse::Status::Complete(offset) => offset,
            httparse::Status::Partial => return Err(RequestError::Incomplete),
        };

        let method = Method::from(
            raw_req
                .method
                .ok_or(RequestError::MissingField { field: "method" })?,
        );

        let raw_path = raw_req
            .path
            .ok_or(RequestError::MissingField { field: "path" })?;

        let path = raw_path
            .split_once('?')
            .map_or(raw_path, |(path, _)| path)
            .to_owned();

        let version = raw_req
            .version
            .ok_or(RequestError::MissingField { field: "version" })?;

        let mut header_map = Headers::with_capacity(raw_req.headers.len());
        for header in raw_req.headers.iter() {
            if let Ok(value) = std::str::from_utf8(header.value) {
                header_map.insert(header.name, value);
            }
        }

        let framing = Self::framing_of(&header_map)?;
        let body = match framing {
            BodyFraming::Length(declared) => {
                let available = buf.len() - body_offset;
                let body_end = body_offset + declared.min(available);
                Bytes::copy_from_slice(&buf[body_offset..body_end])
            }
            BodyFraming::Chunked => Bytes::new(),
        };

        Ok((
            Self {
                method,
                path,
                version,
                headers: header_map,
                framing,
                body,
            },
            body_offset,
        ))
    }

    fn framing_of(headers: &Headers) -> Result<BodyFraming, RequestError> {
        let content_length = headers.get("content-length");

        if let Some(value) = headers.get("transfer-encoding") {
            let mut codings = value
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty() && !c.eq_ignore_ascii_case("identity"));
            match (codings.next(), codings.next()) {
                (None, _) => {}
                (Some(coding), None) if coding.eq_ignore_ascii_case("chunked") => {
                    if content_length.is_some() {
                        return Err(RequestError::ConflictingFraming);
                    }
                    return Ok(BodyFraming::Chunked);
                }
                _ => {
                    return Err(RequestError::UnsupportedTransferEncoding {
                        value: value.to_owned(),
                    });
                }
            }
        }

        let declared = match content_length {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| RequestError::InvalidContentLength {
                    value: value.to_owned(),
                })?,
            None => 0,
        };
        Ok(BodyFraming::Length(declared))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request path (without the query string).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the HTTP minor version number (0 = HTTP/1.0, 1 = HTTP/1.1).
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Installs a body decoded by [`decode_chunked`].
    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    pub fn framing(&self) -> BodyFraming {
        self.framing
    }

    /// Returns `true` if the connection should be kept alive after this request.
    ///
    /// HTTP/1.1 defaults to keep-alive. HTTP/1.0 defaults to close unless
    /// `Connection: keep-alive` is explicitly set.
    pub fn is_keep_alive(&self) -> bool {
        match self.headers.get("connection") {
            Some(conn) => conn.eq_ignore_ascii_case("keep-alive"),
            None => self.version == 1,
        }
    }

    /// Returns `true` when the request declares an `application/json` body.
    ///
    /// Media type parameters such as `; charset=utf-8` are ignored.
    pub fn has_json_body(&self) -> bool {
        self.headers
            .get("content-type")
            .and_then(|value| value.split(';').next())
            .is_some_and(|media| media.trim().eq_ignore_ascii_case("application/json"))
    }
}

/// Decodes a `Transfer-Encoding: chunked` body from the start of `buf`.
///
/// Returns the body and the number of bytes it occupied on the wire
/// (trailers included), or `None` while the terminating chunk has not
/// arrived yet. Chunk extensions and trailer fields are skipped.
///
/// # Errors
///
/// [`RequestError::InvalidChunk`] if a chunk size line is malformed or a
/// chunk is not followed by `\r\n`.
pub fn decode_chunked(buf: &[u8]) -> Result<Option<(Bytes, usize)>, RequestError> {
    let mut body = Vec::new();
    let mut pos = 0;

    loop {
        let (data_start, size) = match httparse::parse_chunk_size(&buf[pos..]) {
            Ok(httparse::Status::Complete((used, size))) => (pos + used, size),
            Ok(httparse::Status::Partial) => return Ok(None),
            Err(_) => return Err(RequestError::InvalidChunk),
        };

        if size == 0 {
            return Ok(skip_trailers(buf, data_start).map(|end| (Bytes::from(body), end)));
        }

        let data_end = usize::try_from(size)
            .ok()
            .and_then(|size| data_start.checked_add(size))
            .ok_or(RequestError::InvalidChunk)?;
        let chunk_end = data_end.checked_add(2).ok_or(RequestError::InvalidChunk)?;
        let Some(terminator) = buf.get(data_end..chunk_end) else {
            return Ok(None);
        };
        if terminator != b"\r\n" {
            return Err(RequestError::InvalidChunk);
        }

        body.extend_from_slice(&buf[data_start..data_end]);
        pos = chunk_end;
    }
}

// Walks trailer lines after the last chunk; returns the offset just past the
// empty line that ends the message.
fn skip_trailers(buf: &[u8], mut pos: usize) -> Option<usize> {
    loop {
        let line_len = buf[pos..].windows(2).position(|w| w == b"\r\n")?;
        pos += line_len + 2;
        if line_len == 0 {
            return Some(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_get() {
        let raw = b"GET /api/tasks HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.method(), &Method::Get);
        assert_eq!(req.path(), "/api/tasks");
        assert_eq!(req.version(), 1);
        assert_eq!(req.headers().get("host"), Some("localhost"));
        assert!(req.body().is_empty());
        assert_eq!(offset, raw.len());
    }

    #[test]
    fn query_string_is_dropped_from_path() {
        let raw = b"GET /api/tasks?done=true HTTP/1.1\r\nHost: localhost\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.path(), "/api/tasks");
    }

    #[test]
    fn incomplete_headers() {
        let raw = b"POST /api/tasks HTTP/1.1\r\nHost:";
        assert!(matches!(Request::parse(raw), Err(RequestError::Incomplete)));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let raw = b"\x00\x01\x02 nonsense\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(RequestError::Parse(_))));
    }

    #[test]
    fn body_stops_at_content_length() {
        let raw = b"POST /api/tasks HTTP/1.1\r\nContent-Length: 5\r\n\r\nhelloGET / HTTP/1.1\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.framing(), BodyFraming::Length(5));
        assert_eq!(req.body().as_ref(), b"hello");
        assert_eq!(&raw[offset..offset + 5], b"hello");
    }

    #[test]
    fn partial_body_is_truncated_to_what_arrived() {
        let raw = b"POST /api/tasks HTTP/1.1\r\nContent-Length: 10\r\n\r\nhel";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.framing(), BodyFraming::Length(10));
        assert_eq!(req.body().as_ref(), b"hel");
    }

    #[test]
    fn bad_content_length_is_rejected() {
        let raw = b"POST /api/tasks HTTP/1.1\r\nContent-Length: lots\r\n\r\n";
        assert!(matches!(
            Request::parse(raw),
            Err(RequestError::InvalidContentLength { .. })
        ));
    }

    #[test]
    fn chunked_requests_start_with_an_empty_body() {
        let raw = b"POST /api/tasks HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nabcd\r\n0\r\n\r\n";
        let (req, offset) = Request::parse(raw).unwrap();
        assert_eq!(req.framing(), BodyFraming::Chunked);
        assert!(req.body().is_empty());
        assert_eq!(&raw[offset..offset + 3], b"4\r\n");
    }

    #[test]
    fn unknown_transfer_codings_are_rejected() {
        let raw = b"POST /api/tasks HTTP/1.1\r\nTransfer-Encoding: gzip, chunked\r\n\r\n";
        assert!(matches!(
            Request::parse(raw),
            Err(RequestError::UnsupportedTransferEncoding { .. })
        ));

        let raw = b"POST /api/tasks HTTP/1.1\r\nTransfer-Encoding: identity\r\nContent-Length: 2\r\n\r\n{}";
        let (req, _) = Request::parse(raw).unwrap();
        assert_eq!(req.framing(), BodyFraming::Length(2));
    }

    #[test]
    fn chunked_with_content_length_is_rejected() {
        let raw = b"POST /api/tasks HTTP/1.1\r\nTransfer-Encoding: chunked\r\nContent-Length: 4\r\n\r\n";
        assert!(matches!(Request::parse(raw), Err(RequestError::ConflictingFraming)));
    }

    #[test]
    fn decode_chunked_joins_chunks() {
        let wire = b"5\r\n{\"tit\r\n0a;ext=1\r\nle\":\"abc\"}\r\n0\r\n\r\nGET / HTTP/1.1\r\n\r\n";
        let (body, used) = decode_chunked(wire).unwrap().unwrap();
        assert_eq!(body.as_ref(), br#"{"title":"abc"}"#);
        assert_eq!(&wire[used..], b"GET / HTTP/1.1\r\n\r\n");
    }

    #[test]
    fn decode_chunked_skips_trailers() {
        let wire = b"2\r\nhi\r\n0\r\nX-Checksum: 1\r\n\r\n";
        let (body, used) = decode_chunked(wire).unwrap().unwrap();
        assert_eq!(body.as_ref(), b"hi");
        assert_eq!(used, wire.len());
    }

    #[test]
    fn decode_chunked_waits_for_the_last_chunk() {
        assert!(decode_chunked(b"").unwrap().is_none());
        assert!(decode_chunked(b"5\r\nhel").unwrap().is_none());
        assert!(decode_chunked(b"2\r\nhi\r\n0\r\n").unwrap().is_none());
    }

    #[test]
    fn decode_chunked_rejects_garbage() {
        assert!(matches!(decode_chunked(b"zz\r\n"), Err(RequestError::InvalidChunk)));
        assert!(matches!(
            decode_chunked(b"2\r\nhiXX0\r\n\r\n"),
            Err(RequestError::InvalidChunk)
        ));
    }

    #[test]
    fn json_content_type_detection() {
        let raw = b"PUT /api/tasks/1 HTTP/1.1\r\nContent-Type: application/json; charset=utf-8\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert!(req.has_json_body());

        let raw = b"PUT /api/tasks/1 HTTP/1.1\r\nContent-Type: text/plain\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert!(!req.has_json_body());

        let raw = b"PUT /api/tasks/1 HTTP/1.1\r\n\r\n";
        let (req, _) = Request::parse(raw).unwrap();
        assert!(!req.has_json_body());
    }

    #[test]
    fn keep_alive_rules() {
        let (req, _) = Request::parse(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        assert!(req.is_keep_alive());

        let (req, _) = Request::parse(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n").unwrap();
        assert!(!req.is_keep_alive());

        let (req, _) = Request::parse(b"GET / HTTP/1.0\r\n\r\n").unwrap();
        assert!(!req.is_keep_alive());
    }
}
