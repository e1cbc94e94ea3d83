use std::fmt;
use std::io::Read;

use reqwest::blocking::{multipart, Client};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Post,
    Put,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(value: Method) -> Self {
        match value {
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
        }
    }
}

/// One file field of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Vec<u8>),
    /// Encoded by the transport, which also sets the boundary content type.
    Multipart(Vec<FilePart>),
}

/// A fully buffered outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    /// Appends a file field, turning the body into a multipart form.
    pub fn file_part(
        mut self,
        field: impl Into<String>,
        file_name: impl Into<String>,
        content: Vec<u8>,
    ) -> Self {
        let part = FilePart {
            field: field.into(),
            file_name: file_name.into(),
            content,
        };
        match &mut self.body {
            RequestBody::Multipart(parts) => parts.push(part),
            body => *body = RequestBody::Multipart(vec![part]),
        }
        self
    }

    /// First value of a header, compared case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Status and body of a completed exchange, whatever the status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed")]
    Request(#[source] reqwest::Error),
    #[error("failed to read response body")]
    Body(#[from] std::io::Error),
}

/// Sends one request and returns the response, never retrying.
///
/// Non-2xx statuses are a successful exchange at this layer; only failures
/// to talk to the server at all are errors.
pub trait Transport: fmt::Debug {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Blocking transport backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Client without an overall timeout; uploads can be slow.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(None)
            .build()
            .map_err(TransportError::Request)?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        trace!("{} {}", request.method.as_str(), request.url);
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder = match &request.body {
            RequestBody::Empty => builder.body(Vec::new()),
            RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
            RequestBody::Multipart(parts) => {
                builder.multipart(create_multipart(parts).map_err(TransportError::Request)?)
            }
        };

        let mut response = builder.send().map_err(TransportError::Request)?;
        let status = response.status().as_u16();
        let mut body = Vec::new();
        response.read_to_end(&mut body)?;
        trace!("response status {} ({} bytes)", status, body.len());

        Ok(HttpResponse { status, body })
    }
}

fn create_multipart(parts: &[FilePart]) -> Result<multipart::Form, reqwest::Error> {
    let mut form = multipart::Form::new();
    for part in parts {
        let file = multipart::Part::bytes(part.content.clone())
            .file_name(part.file_name.clone())
            .mime_str("application/octet-stream")?;
        form = form.part(part.field.clone(), file);
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::with_client(Client::builder().no_proxy().build().unwrap())
    }

    /// Accepts one connection, captures the raw request and replies with `reply`.
    fn serve_once(reply: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut captured = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap();
                }
                captured.push_str(&line);
            }
            captured.push_str("\r\n");

            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).unwrap();
            captured.push_str(&String::from_utf8_lossy(&body));

            stream.write_all(reply.as_bytes()).unwrap();
            stream.flush().unwrap();
            captured
        });

        (format!("http://{addr}"), handle)
    }

    const OK_REPLY: &str = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"id\":\"x\"}\n";

    #[test]
    fn sends_method_headers_and_body() {
        let (base, server) = serve_once(OK_REPLY);

        let request = HttpRequest::new(Method::Post, format!("{base}/token"))
            .header("Authorization", "Bearer abc")
            .body(b"payload".to_vec());
        let response = transport().send(&request).expect("request should succeed");

        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{\"id\":\"x\"}\n");

        let captured = server.join().unwrap();
        assert!(captured.starts_with("POST /token HTTP/1.1"));
        assert!(captured.to_ascii_lowercase().contains("authorization: bearer abc"));
        assert!(captured.ends_with("payload"));
    }

    #[test]
    fn file_parts_are_sent_as_multipart_form() {
        let (base, server) = serve_once(OK_REPLY);

        let request = HttpRequest::new(Method::Put, format!("{base}/upload/items/x"))
            .file_part("file", "ext.zip", b"PK\x03\x04zip-bytes".to_vec());
        transport().send(&request).expect("request should succeed");

        let captured = server.join().unwrap();
        assert!(captured.starts_with("PUT /upload/items/x HTTP/1.1"));

        let lower = captured.to_ascii_lowercase();
        let boundary = lower
            .lines()
            .find_map(|line| line.strip_prefix("content-type: multipart/form-data; boundary="))
            .expect("multipart content type")
            .trim()
            .to_string();
        assert!(lower.contains(&format!("--{boundary}\r\n")));
        assert!(captured.contains("name=\"file\"; filename=\"ext.zip\""));
        assert!(lower.contains("content-type: application/octet-stream"));
        assert!(captured.contains("zip-bytes"));
        assert!(lower.contains(&format!("--{boundary}--")));
    }

    #[test]
    fn error_statuses_are_returned_as_responses() {
        let (base, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\nContent-Length: 6\r\nConnection: close\r\n\r\ndenied",
        );

        let request = HttpRequest::new(Method::Post, format!("{base}/token"));
        let response = transport().send(&request).expect("exchange should complete");

        assert_eq!(response.status, 401);
        assert_eq!(response.body, b"denied");
        server.join().unwrap();
    }

    #[test]
    fn unreachable_host_is_a_request_error() {
        // Bind then drop to get a port nothing listens on.
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let request = HttpRequest::new(Method::Post, format!("http://127.0.0.1:{port}/"));
        let err = transport().send(&request).expect_err("must fail");
        assert!(matches!(err, TransportError::Request(_)));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = HttpRequest::new(Method::Post, "http://localhost/")
            .header("Content-Type", "text/plain");
        assert_eq!(request.header_value("content-type"), Some("text/plain"));
        assert_eq!(request.header_value("authorization"), None);
    }

    #[test]
    fn file_parts_accumulate_into_one_form() {
        let request = HttpRequest::new(Method::Put, "http://localhost/")
            .body(b"replaced".to_vec())
            .file_part("a", "a.zip", vec![1])
            .file_part("b", "b.zip", vec![2]);
        match request.body {
            RequestBody::Multipart(parts) => {
                let fields: Vec<_> = parts.iter().map(|p| p.field.as_str()).collect();
                assert_eq!(fields, ["a", "b"]);
            }
            other => panic!("expected multipart body, got {other:?}"),
        }
    }
}
