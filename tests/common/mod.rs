//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::StatusCode;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;
use tokio_tungstenite::WebSocketStream;

use telemetry_signer::ingress::{Transport, TransportError};

fn status_line(status: u16) -> &'static str {
    match status {
        200 => "200 OK",
        202 => "202 Accepted",
        400 => "400 Bad Request",
        404 => "404 Not Found",
        500 => "500 Internal Server Error",
        503 => "503 Service Unavailable",
        _ => "200 OK",
    }
}

/// Read one HTTP/1.1 request and return its body.
async fn read_request_body<S: AsyncRead + Unpin>(socket: &mut S) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let content_length = headers
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(String::from_utf8_lossy(&buf[header_end..]).into_owned())
}

/// Start a programmable HTTP backend. The handler receives the request body
/// and returns `(status, body)`.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request_body(&mut socket).await else {
                            return;
                        };
                        let (status, body) = f(request).await;
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line(status),
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock node answering JSON-RPC calls by method name.
pub async fn start_json_rpc_backend<F>(answer: F) -> SocketAddr
where
    F: Fn(&str) -> serde_json::Value + Send + Sync + 'static,
{
    let answer = Arc::new(answer);
    start_programmable_backend(move |body| {
        let answer = answer.clone();
        async move {
            let request: serde_json::Value = match serde_json::from_str(&body) {
                Ok(v) => v,
                Err(_) => return (400, "{}".to_string()),
            };
            let method = request["method"].as_str().unwrap_or_default().to_string();
            let response = serde_json::json!({
                "jsonrpc": "2.0",
                "id": request["id"].clone(),
                "result": answer(&method),
            });
            (200, response.to_string())
        }
    })
    .await
}

/// HTTPS backend with a fresh self-signed certificate.
pub struct TlsBackend {
    pub addr: SocketAddr,
    /// SHA-256 of the certificate DER, lowercase and ':' separated.
    pub fingerprint: String,
    /// Bodies of requests that completed the handshake.
    pub bodies: Arc<Mutex<Vec<String>>>,
    /// Handshakes that failed.
    pub rejected: Arc<AtomicUsize>,
}

/// Start an HTTPS backend answering every request with `status`.
pub async fn start_tls_backend(status: u16) -> TlsBackend {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let cert_der: CertificateDer<'static> = certified.cert.der().clone();
    let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    let fingerprint = Sha256::digest(cert_der.as_ref())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":");

    let config = rustls::ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert_der], key_der)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let rejected = Arc::new(AtomicUsize::new(0));

    let (task_bodies, task_rejected) = (bodies.clone(), rejected.clone());
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            let bodies = task_bodies.clone();
            let rejected = task_rejected.clone();
            tokio::spawn(async move {
                let mut tls = match acceptor.accept(socket).await {
                    Ok(tls) => tls,
                    Err(_) => {
                        rejected.fetch_add(1, Ordering::SeqCst);
                        return;
                    }
                };
                let Some(body) = read_request_body(&mut tls).await else {
                    return;
                };
                bodies.lock().push(body);
                let response = format!(
                    "HTTP/1.1 {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    status_line(status)
                );
                let _ = tls.write_all(response.as_bytes()).await;
                let _ = tls.shutdown().await;
            });
        }
    });

    TlsBackend {
        addr,
        fingerprint,
        bodies,
        rejected,
    }
}

/// Start a mock node websocket. Every accepted connection is counted,
/// upgraded and handed to `handler`.
pub async fn start_websocket_backend<F, Fut>(handler: F) -> (SocketAddr, Arc<AtomicUsize>)
where
    F: Fn(WebSocketStream<TcpStream>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(handler);

    let counter = connections.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            let handler = handler.clone();
            tokio::spawn(async move {
                if let Ok(ws) = tokio_tungstenite::accept_async(socket).await {
                    handler(ws).await;
                }
            });
        }
    });

    (addr, connections)
}

/// Transport that records every body and answers with a settable status.
pub struct RecordingTransport {
    status: Mutex<Option<u16>>,
    pub requests: Mutex<Vec<(String, String)>>,
}

impl RecordingTransport {
    /// `None` simulates a network failure.
    pub fn new(status: Option<u16>) -> Arc<Self> {
        Arc::new(Self {
            status: Mutex::new(status),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn set_status(&self, status: Option<u16>) {
        *self.status.lock() = status;
    }

    pub fn count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn post_json(&self, url: &str, body: String) -> Result<StatusCode, TransportError> {
        self.requests.lock().push((url.to_string(), body));
        match *self.status.lock() {
            Some(code) => StatusCode::from_u16(code).map_err(|e| TransportError::Other(e.to_string())),
            None => Err(TransportError::Other("connection reset".into())),
        }
    }
}
