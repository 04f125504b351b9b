//! Shared test-only helpers: an in-process mock HTTP endpoint for exercising
//! the uploader without a real network dependency (see `SPEC_FULL.md` §0.4),
//! grounded on the `TcpListener`-based harness in the
//! `open-telemetry-otel-arrow` pack repo's `tests/common/mod.rs`, adapted to
//! a single blocking accept since the uploader is `reqwest::blocking`.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread;

/// A single request captured by [`spawn_mock_server`]: the raw multipart
/// body bytes.
pub type CapturedBody = Vec<u8>;

/// Starts a single-shot mock HTTP server on an ephemeral port that accepts
/// one connection, reads exactly one request body (using its
/// `Content-Length` header), writes back `status_line`, and returns the
/// captured body to the caller through the returned join handle.
///
/// Returns the server's base URL (`http://127.0.0.1:<port>`) and a handle
/// that yields the request body once the single expected request has been
/// served.
pub fn spawn_mock_server(status_line: &'static str) -> (String, thread::JoinHandle<CapturedBody>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept connection");
        let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
        let mut content_length = 0usize;
        let mut line = String::new();
        loop {
            line.clear();
            reader.read_line(&mut line).expect("read header line");
            if line == "\r\n" || line.is_empty() {
                break;
            }
            if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).expect("read request body");
        let mut stream = stream;
        stream
            .write_all(status_line.as_bytes())
            .expect("write response");
        body
    });
    (format!("http://{addr}"), handle)
}

/// Starts a mock server that serves `responses.len()` sequential requests,
/// one status line per request, in order. Used to exercise retry paths.
/// Returns the base URL and a handle yielding each request's captured body.
pub fn spawn_sequenced_mock_server(
    responses: Vec<&'static str>,
) -> (String, thread::JoinHandle<Vec<CapturedBody>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    let handle = thread::spawn(move || {
        let mut bodies = Vec::with_capacity(responses.len());
        for status_line in responses {
            let (stream, _) = listener.accept().expect("accept connection");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut content_length = 0usize;
            let mut line = String::new();
            loop {
                line.clear();
                reader.read_line(&mut line).expect("read header line");
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("read request body");
            let mut stream = stream;
            stream
                .write_all(status_line.as_bytes())
                .expect("write response");
            bodies.push(body);
        }
        bodies
    });
    (format!("http://{addr}"), handle)
}

/// Recursively counts regular files under `dir` (not directories, not the
/// lock file itself unless explicitly matched), used by integration tests
/// asserting on folder contents after a save or upload cycle.
pub fn count_files(dir: &std::path::Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    let mut total = 0;
    for entry in entries.flatten() {
        if let Ok(file_type) = entry.file_type() {
            if file_type.is_dir() {
                total += count_files(&entry.path());
            } else if file_type.is_file() {
                total += 1;
            }
        }
    }
    total
}
