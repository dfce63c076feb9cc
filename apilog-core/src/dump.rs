//! Wire-format dumps of HTTP requests and responses.
//!
//! Dumps look like what goes over an HTTP/1.x connection: a start line, one
//! `Name: value` line per header with the name in canonical MIME case, a blank
//! line, and optionally the body. They exist only for logging and are never
//! sent anywhere.

use std::fmt;

use bytes::Bytes;
use reqwest::{Request, Response, ResponseBuilderExt};

use crate::error::DumpError;

const CRLF: &[u8] = b"\r\n";
const DELIMITER: &str = "=====";

/// Which side of an exchange a logged block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// Outgoing request
    Request,
    /// Incoming response
    Response,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request => f.write_str("REQUEST"),
            Self::Response => f.write_str("RESPONSE"),
        }
    }
}

/// Wrap a dump in a labelled, delimited block ready for a text sink.
pub fn format_block(kind: BlockKind, dump: &[u8]) -> String {
    format!(
        "{}\n{}\n{}\n{}\n",
        kind,
        DELIMITER,
        String::from_utf8_lossy(dump),
        DELIMITER
    )
}

/// Canonical MIME form of a header name: `content-type` becomes `Content-Type`.
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        upper = c == '-';
    }
    out
}

fn write_headers(buf: &mut Vec<u8>, headers: &http::HeaderMap) {
    for (name, value) in headers {
        buf.extend_from_slice(canonical_header_name(name.as_str()).as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(value.as_bytes());
        buf.extend_from_slice(CRLF);
    }
}

/// Dump an outgoing request. The body is included only when `include_body`
/// is set, and only buffered bodies can be included.
pub fn dump_request(request: &Request, include_body: bool) -> Result<Vec<u8>, DumpError> {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut buf = Vec::new();
    buf.extend_from_slice(
        format!("{} {} {:?}", request.method(), target, request.version()).as_bytes(),
    );
    buf.extend_from_slice(CRLF);

    // Explicit Host header overrides the URL authority
    if let Some(host) = request.headers().get(http::header::HOST) {
        buf.extend_from_slice(b"Host: ");
        buf.extend_from_slice(host.as_bytes());
        buf.extend_from_slice(CRLF);
    } else if let Some(host) = url.host_str() {
        let host = match url.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        };
        buf.extend_from_slice(format!("Host: {}", host).as_bytes());
        buf.extend_from_slice(CRLF);
    }

    let mut headers = request.headers().clone();
    headers.remove(http::header::HOST);
    write_headers(&mut buf, &headers);
    buf.extend_from_slice(CRLF);

    if include_body {
        if let Some(body) = request.body() {
            let bytes = body.as_bytes().ok_or(DumpError::StreamingBody {
                direction: "request",
            })?;
            buf.extend_from_slice(bytes);
        }
    }

    Ok(buf)
}

fn response_head(response: &Response) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(format!("{:?} {}", response.version(), response.status()).as_bytes());
    buf.extend_from_slice(CRLF);
    write_headers(&mut buf, response.headers());
    buf.extend_from_slice(CRLF);
    buf
}

/// Dump an incoming response.
///
/// Without `include_body` the response is handed back untouched. With it the
/// body is read to the end and an equivalent response (status, version,
/// headers, URL, buffered body) is returned in its place.
pub async fn dump_response(
    response: Response,
    include_body: bool,
) -> Result<(Vec<u8>, Response), DumpError> {
    let mut dump = response_head(&response);
    if !include_body {
        return Ok((dump, response));
    }

    let status = response.status();
    let version = response.version();
    let url = response.url().clone();
    let headers = response.headers().clone();

    let body: Bytes = response.bytes().await.map_err(|e| DumpError::BodyRead {
        direction: "response",
        reason: e.to_string(),
    })?;
    dump.extend_from_slice(&body);

    let mut builder = http::Response::builder()
        .status(status)
        .version(version)
        .url(url);
    if let Some(map) = builder.headers_mut() {
        *map = headers;
    }
    let rebuilt = builder.body(body).map_err(|e| DumpError::Rebuild {
        reason: e.to_string(),
    })?;

    Ok((dump, Response::from(rebuilt)))
}
