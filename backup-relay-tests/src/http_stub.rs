//! One-shot HTTP server for exercising the real HTTP client
//!
//! Answers the first request on a random local port with a canned response,
//! then records the raw request text and shuts down.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct HttpStub {
    url: String,
    handle: Option<JoinHandle<()>>,
    requests: mpsc::Receiver<String>,
}

impl HttpStub {
    /// Serve one response with the given status, content type and body
    pub fn serve_once(status: u16, content_type: &str, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind stub server");
        let port = listener.local_addr().expect("No local address").port();
        let (tx, rx) = mpsc::channel();
        let response = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\
             Connection: close\r\n\r\n{}",
            status,
            reason(status),
            content_type,
            body.len(),
            body
        );

        let handle = thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

            let mut reader = BufReader::new(stream.try_clone().expect("Failed to clone stream"));
            let mut request = String::new();
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
                let end_of_headers = line == "\r\n";
                request.push_str(&line);
                if end_of_headers {
                    break;
                }
            }
            let mut body = vec![0u8; content_length];
            if reader.read_exact(&mut body).is_ok() {
                request.push_str(&String::from_utf8_lossy(&body));
            }

            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
            let _ = tx.send(request);
        });

        Self {
            url: format!("http://127.0.0.1:{}", port),
            handle: Some(handle),
            requests: rx,
        }
    }

    /// Base URL, without trailing slash
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw text of the request received, if any
    pub fn received_request(&self) -> Option<String> {
        self.requests.recv_timeout(Duration::from_secs(5)).ok()
    }
}

impl Drop for HttpStub {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.is_finished() {
                let _ = handle.join();
            }
        }
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    }
}
