//! Loopback HTTP stub for exercising the Google API clients in tests.
//!
//! The stub answers one canned response per connection, in order, and records
//! every request it saw. It speaks just enough HTTP/1.1 for `reqwest`.

use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

/// A canned response served by [`StubServer`].
#[derive(Debug, Clone)]
pub struct StubResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body, sent as `application/json`.
    pub body: String,
}

impl StubResponse {
    /// A response with the given status and JSON body.
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// A request captured by [`StubServer`].
#[derive(Debug, Clone, Default)]
pub struct RecordedRequest {
    /// Request method, e.g. `PUT`.
    pub method: String,
    /// Request target including the query string.
    pub path: String,
    /// Headers with lowercased names.
    pub headers: Vec<(String, String)>,
    /// Raw request body.
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Returns the first header value with the given (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns the body as UTF-8 text (lossy).
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// A single-threaded HTTP server bound to `127.0.0.1` on a random port.
#[derive(Debug)]
pub struct StubServer {
    addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubServer {
    /// Starts serving `responses`, one per incoming connection.
    ///
    /// The serving thread exits after the last response has been written.
    pub fn start(responses: Vec<StubResponse>) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);

        thread::spawn(move || {
            let mut responses = responses.into_iter();
            for stream in listener.incoming() {
                let Some(response) = responses.next() else {
                    return;
                };
                let Ok(stream) = stream else {
                    return;
                };
                let Ok(request) = read_request(&stream) else {
                    continue;
                };
                // Record before replying so callers see the request as soon
                // as their call returns.
                recorded
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(request);
                let _ = write_response(stream, &response);
            }
        });

        Ok(Self { addr, requests })
    }

    /// Base URL of the stub, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

fn read_request(stream: &TcpStream) -> io::Result<RecordedRequest> {
    let mut reader = BufReader::new(stream);
    let mut request = RecordedRequest::default();

    let mut line = String::new();
    reader.read_line(&mut line)?;
    let mut parts = line.split_whitespace();
    request.method = parts.next().unwrap_or_default().to_string();
    request.path = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            break;
        }
        if let Some((name, value)) = trimmed.split_once(':') {
            let name = name.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if name == "content-length" {
                content_length = value.parse().unwrap_or(0);
            }
            request.headers.push((name, value));
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    request.body = body;
    Ok(request)
}

fn write_response(mut stream: TcpStream, response: &StubResponse) -> io::Result<()> {
    let reply = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        reason(response.status),
        response.body.len(),
        response.body
    );
    stream.write_all(reply.as_bytes())?;
    stream.flush()
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
