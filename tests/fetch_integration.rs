//! End-to-end fetch tests against a loopback mock of the PocketBase
//! HTTP API.

use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::process::Command;
use std::thread;

fn shorts_bin() -> &'static str {
    env!("CARGO_BIN_EXE_shorts")
}

struct MockResponse {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

fn json_response(body: Value) -> MockResponse {
    MockResponse {
        status: 200,
        content_type: "application/json",
        body: body.to_string().into_bytes(),
    }
}

fn jpeg_response() -> MockResponse {
    MockResponse {
        status: 200,
        content_type: "image/jpeg",
        body: b"not really a jpeg".to_vec(),
    }
}

fn error_response(status: u16) -> MockResponse {
    MockResponse {
        status,
        content_type: "application/json",
        body: b"{}".to_vec(),
    }
}

/// Serve HTTP on a loopback port, answering every request through
/// `respond`. The listener thread lives for the rest of the test
/// process.
fn serve<F>(respond: F) -> SocketAddr
where
    F: Fn(&str) -> MockResponse + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind mock server");
    let addr = listener.local_addr().expect("mock server addr");
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { continue };
            handle_connection(stream, &respond);
        }
    });
    addr
}

fn handle_connection<F: Fn(&str) -> MockResponse>(mut stream: TcpStream, respond: &F) {
    let mut reader = BufReader::new(match stream.try_clone() {
        Ok(clone) => clone,
        Err(_) => return,
    });
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    // Drain headers; the client only sends bodyless GET requests.
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) if line == "\r\n" => break,
            Ok(_) => {}
            Err(_) => return,
        }
    }

    let path = request_line.split_whitespace().nth(1).unwrap_or("/");
    let response = respond(path);
    let reason = if response.status == 200 { "OK" } else { "Error" };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        reason,
        response.content_type,
        response.body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&response.body);
}

fn photo_listing(ids: &[&str]) -> Value {
    let items: Vec<Value> = ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "collectionId": "photos01",
                "collectionName": "photos",
                "photo": format!("{id}_original.jpg"),
            })
        })
        .collect();
    json!({
        "page": 1,
        "perPage": 50,
        "totalItems": items.len(),
        "items": items,
    })
}

/// Extract the trailing result JSON from fetch's stdout.
fn result_json(stdout: &str) -> Value {
    let start = stdout.find('{').expect("result JSON in stdout");
    serde_json::from_str(&stdout[start..]).expect("parse result JSON")
}

#[test]
fn fetch_downloads_listed_photos_and_skips_failures() {
    let addr = serve(|path| {
        if path.starts_with("/api/collections/photos/records") {
            json_response(photo_listing(&["alpha", "broken", "gamma"]))
        } else if path.contains("/broken/") {
            error_response(404)
        } else if path.starts_with("/api/files/") {
            jpeg_response()
        } else {
            error_response(404)
        }
    });
    let temp = tempfile::tempdir().expect("create temp dir");
    let staging = temp.path().join("staging");

    let output = Command::new(shorts_bin())
        .arg("fetch")
        .arg("group01")
        .arg("--base-url")
        .arg(format!("http://{addr}"))
        .arg("--temp-dir")
        .arg(&staging)
        .output()
        .expect("run fetch");
    assert!(output.status.success());

    let result = result_json(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(result["group_id"], "group01");
    assert_eq!(result["count"], 2);
    assert_eq!(result["files"], json!(["alpha.jpg", "gamma.jpg"]));

    assert!(staging.join("alpha.jpg").is_file());
    assert!(staging.join("gamma.jpg").is_file());
    assert!(!staging.join("broken.jpg").exists());
}

#[test]
fn fetch_of_an_empty_group_exits_successfully() {
    let addr = serve(|path| {
        if path.starts_with("/api/collections/photos/records") {
            json_response(photo_listing(&[]))
        } else {
            error_response(404)
        }
    });
    let temp = tempfile::tempdir().expect("create temp dir");

    let output = Command::new(shorts_bin())
        .arg("fetch")
        .arg("group01")
        .arg("--base-url")
        .arg(format!("http://{addr}"))
        .arg("--temp-dir")
        .arg(temp.path().join("staging"))
        .output()
        .expect("run fetch");
    assert!(output.status.success());

    let result = result_json(&String::from_utf8_lossy(&output.stdout));
    assert_eq!(result["count"], 0);
    assert_eq!(result["files"], json!([]));
}

#[test]
fn fetch_fails_when_the_listing_call_fails() {
    let addr = serve(|_path| error_response(500));
    let temp = tempfile::tempdir().expect("create temp dir");

    let status = Command::new(shorts_bin())
        .arg("fetch")
        .arg("group01")
        .arg("--base-url")
        .arg(format!("http://{addr}"))
        .arg("--temp-dir")
        .arg(temp.path().join("staging"))
        .status()
        .expect("run fetch");

    assert!(!status.success());
}

#[test]
fn fetch_requires_a_group_id() {
    let status = Command::new(shorts_bin())
        .arg("fetch")
        .status()
        .expect("run fetch");
    assert!(!status.success());
}

#[test]
fn fetch_rejects_an_empty_group_id() {
    let status = Command::new(shorts_bin())
        .arg("fetch")
        .arg("")
        .status()
        .expect("run fetch");
    assert!(!status.success());
}
