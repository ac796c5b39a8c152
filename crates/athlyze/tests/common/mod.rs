//! In-process Athlyze backend for integration tests.
//!
//! Serves the measurement endpoints from an in-memory collection (listing
//! pages of `PAGE_SIZE`), a token endpoint at `/token`, and records every
//! request it receives. Individual responses can be scripted per route.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex as TokioMutex;

pub const PAGE_SIZE: usize = 2;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl CapturedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).expect("json body")
    }
}

#[derive(Debug, Default)]
pub struct BackendState {
    pub entries: Vec<Value>,
    pub next_id: i64,
    /// Responses returned instead of the default handling, keyed by
    /// `"<METHOD> <path>"`.
    pub scripted: HashMap<String, VecDeque<(u16, String)>>,
    pub requests: Vec<CapturedRequest>,
}

pub struct MockBackend {
    pub base_url: String,
    pub token_url: String,
    pub state: Arc<TokioMutex<BackendState>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockBackend {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        let state = Arc::new(TokioMutex::new(BackendState::default()));
        let state_clone = Arc::clone(&state);

        let handle = tokio::spawn(async move {
            loop {
                let (mut stream, _) = match listener.accept().await {
                    Ok(value) => value,
                    Err(_) => break,
                };
                let Some(request) = read_http_request(&mut stream).await else {
                    continue;
                };
                let (status, body) = {
                    let mut state = state_clone.lock().await;
                    state.requests.push(request.clone());
                    respond(&mut state, &request)
                };
                let _ = write_http_response(&mut stream, status, &body).await;
            }
        });

        Self {
            base_url: format!("http://{}/api/v1/", addr),
            token_url: format!("http://{}/token", addr),
            state,
            handle,
        }
    }

    pub async fn script(&self, route: &str, status: u16, body: &str) {
        self.state
            .lock()
            .await
            .scripted
            .entry(route.to_string())
            .or_default()
            .push_back((status, body.to_string()));
    }

    pub async fn seed(&self, date: &str, weight: f64) -> i64 {
        let mut state = self.state.lock().await;
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push(json!({
            "id": id,
            "date": date,
            "weight": weight,
            "fat": 0.0,
            "water": 0.0,
            "muscle": 0.0
        }));
        id
    }

    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn entries(&self) -> Vec<Value> {
        self.state.lock().await.entries.clone()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn page(entries: &[Value], total: usize) -> String {
    json!({
        "count": total,
        "next": null,
        "previous": null,
        "results": entries
    })
    .to_string()
}

fn respond(state: &mut BackendState, request: &CapturedRequest) -> (u16, String) {
    let route = format!("{} {}", request.method, request.path);
    if let Some(reply) = state.scripted.get_mut(&route).and_then(VecDeque::pop_front) {
        return reply;
    }

    let path = request.path.trim_start_matches("/api/v1/");
    let segments: Vec<&str> = path.split('/').collect();
    match (request.method.as_str(), segments.as_slice()) {
        ("GET", ["measurements"]) => {
            let shown: Vec<Value> = state.entries.iter().take(PAGE_SIZE).cloned().collect();
            (200, page(&shown, state.entries.len()))
        }
        ("GET", ["measurements", "get-by-date"]) => {
            let date = request.query.get("date").cloned().unwrap_or_default();
            let matching: Vec<Value> = state
                .entries
                .iter()
                .filter(|e| e["date"] == date.as_str())
                .cloned()
                .collect();
            let total = matching.len();
            (200, page(&matching, total))
        }
        ("POST", ["measurements"]) => {
            let mut entry = request.json();
            state.next_id += 1;
            entry["id"] = json!(state.next_id);
            state.entries.push(entry.clone());
            (201, entry.to_string())
        }
        ("PUT", ["measurements", id]) => {
            let id: i64 = id.parse().unwrap_or(-1);
            let mut body = request.json();
            body["id"] = json!(id);
            match state.entries.iter_mut().find(|e| e["id"] == id) {
                Some(existing) => {
                    *existing = body.clone();
                    (200, body.to_string())
                }
                None => (404, r#"{"detail":"Not found."}"#.to_string()),
            }
        }
        ("DELETE", ["measurements", id]) => {
            let id: i64 = id.parse().unwrap_or(-1);
            let before = state.entries.len();
            state.entries.retain(|e| e["id"] != id);
            if state.entries.len() < before {
                (204, String::new())
            } else {
                (404, r#"{"detail":"Not found."}"#.to_string())
            }
        }
        _ => (404, r#"{"detail":"Not found."}"#.to_string()),
    }
}

/// Form-style decoding: `+` is a space, everything else percent-decoded.
fn form_decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

fn parse_query(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=')?;
            Some((form_decode(key), form_decode(value)))
        })
        .collect()
}

fn header_end_offset(buffer: &[u8]) -> Option<usize> {
    buffer.windows(4).position(|window| window == b"\r\n\r\n")
}

async fn read_http_request(stream: &mut tokio::net::TcpStream) -> Option<CapturedRequest> {
    let mut buffer = Vec::new();
    loop {
        let mut chunk = [0_u8; 2048];
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if header_end_offset(&buffer).is_some() {
            break;
        }
    }

    let header_end = header_end_offset(&buffer)?;
    let head = String::from_utf8_lossy(&buffer[..header_end]).to_string();
    let mut lines = head.lines();
    let request_line = lines.next()?.to_string();
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let target = parts.next()?.to_string();
    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), parse_query(query)),
        None => (target, HashMap::new()),
    };

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let mut chunk = [0_u8; 2048];
        let read = stream.read(&mut chunk).await.ok()?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
    }

    Some(CapturedRequest {
        method,
        path,
        query,
        headers,
        body: String::from_utf8_lossy(&body).to_string(),
    })
}

fn status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Error",
    }
}

async fn write_http_response(
    stream: &mut tokio::net::TcpStream,
    status: u16,
    body: &str,
) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        status_text(status),
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}
