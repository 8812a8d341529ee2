//! Output targets for report writers.
//!
//! Writers only see [`RenderSink`]; whether bytes end up in the HTTP
//! response ([`ClientSink`]) or in memory for mailing ([`BufferSink`]) is
//! chosen by the caller.

use std::io::{self, Write};

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::warn;

pub trait RenderSink: Write + Send {
    fn set_content_type(&mut self, content_type: &str);

    fn content_type(&self) -> Option<&str>;

    fn set_header(&mut self, name: &str, value: &str);

    /// True once any body bytes were written.
    fn is_committed(&self) -> bool;

    fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.write_all(s.as_bytes())
    }
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct BufferSink {
    content_type: Option<String>,
    headers: Vec<(String, String)>,
    buf: Vec<u8>,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.buf).into_owned()
    }
}

impl Write for BufferSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RenderSink for BufferSink {
    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn is_committed(&self) -> bool {
        !self.buf.is_empty()
    }
}

/// Sink backing the client response.
#[derive(Debug)]
pub struct ClientSink {
    status: StatusCode,
    inner: BufferSink,
}

impl Default for ClientSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientSink {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            inner: BufferSink::new(),
        }
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Forwards a buffered rendering: body, content type and headers.
    pub fn absorb(&mut self, buffered: BufferSink) -> io::Result<()> {
        if let Some(ct) = buffered.content_type() {
            self.inner.set_content_type(ct);
        }
        for (name, value) in buffered.headers() {
            self.inner.set_header(name, value);
        }
        self.inner.write_all(buffered.as_bytes())
    }

    pub fn headers(&self) -> &[(String, String)] {
        self.inner.headers()
    }

    pub fn body_text(&self) -> String {
        self.inner.as_text()
    }
}

impl Write for ClientSink {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.inner.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl RenderSink for ClientSink {
    fn set_content_type(&mut self, content_type: &str) {
        self.inner.set_content_type(content_type);
    }

    fn content_type(&self) -> Option<&str> {
        self.inner.content_type()
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.inner.set_header(name, value);
    }

    fn is_committed(&self) -> bool {
        self.inner.is_committed()
    }
}

impl IntoResponse for ClientSink {
    fn into_response(self) -> Response {
        let content_type = self
            .inner
            .content_type()
            .unwrap_or("text/html; charset=UTF-8")
            .to_string();
        let headers = self.inner.headers().to_vec();

        let mut response = (self.status, Body::from(self.inner.into_bytes())).into_response();
        let map = response.headers_mut();
        match HeaderValue::from_str(&content_type) {
            Ok(v) => {
                map.insert(header::CONTENT_TYPE, v);
            }
            Err(e) => warn!("Invalid content type {:?}: {}", content_type, e),
        }
        for (name, value) in headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(n), Ok(v)) => {
                    map.insert(n, v);
                }
                _ => warn!("Dropping invalid response header {}: {}", name, value),
            }
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sink_tracks_commit_and_headers() {
        let mut sink = BufferSink::new();
        assert!(!sink.is_committed());
        sink.set_header("Content-Disposition", "attachment; filename=a.csv");
        sink.set_header("content-disposition", "attachment; filename=b.csv");
        sink.write_str("x,y\n").unwrap();
        assert!(sink.is_committed());
        assert_eq!(sink.headers().len(), 1);
        assert_eq!(sink.as_text(), "x,y\n");
    }

    #[tokio::test]
    async fn client_sink_becomes_response() {
        let mut buffered = BufferSink::new();
        buffered.set_content_type("text/csv; charset=UTF-8");
        buffered.set_header("Content-Disposition", "attachment; filename=r.csv");
        buffered.write_str("a,b\n").unwrap();

        let mut client = ClientSink::new();
        client.absorb(buffered).unwrap();
        let response = client.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv; charset=UTF-8");
        assert_eq!(
            response.headers()["content-disposition"],
            "attachment; filename=r.csv"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"a,b\n");
    }
}
