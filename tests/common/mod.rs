//! Minimal loopback HTTP server for exercising the network code paths.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned response for every request path starting with `prefix`
#[derive(Clone)]
pub struct Route {
    pub prefix: String,
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl Route {
    pub fn new(prefix: &str, status: &'static str, content_type: &'static str, body: &[u8]) -> Self {
        Self {
            prefix: prefix.to_string(),
            status,
            content_type,
            body: body.to_vec(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A running server and the request paths it has seen
pub struct TestServer {
    pub addr: SocketAddr,
    pub hits: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Number of requests whose path starts with `prefix`
    pub fn hits_for(&self, prefix: &str) -> usize {
        self.hits
            .lock()
            .unwrap()
            .iter()
            .filter(|path| path.starts_with(prefix))
            .count()
    }
}

pub async fn spawn_server(routes: Vec<Route>) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(Mutex::new(Vec::new()));
    let routes = Arc::new(routes);

    let server_hits = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let routes = routes.clone();
            let hits = server_hits.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while read < buf.len() {
                    let n = socket.read(&mut buf[read..]).await.unwrap_or(0);
                    if n == 0 {
                        break;
                    }
                    read += n;
                    if buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }

                let request = String::from_utf8_lossy(&buf[..read]).to_string();
                let path = request.split_whitespace().nth(1).unwrap_or("/").to_string();
                hits.lock().unwrap().push(path.clone());

                let route = routes.iter().find(|r| path.starts_with(&r.prefix)).cloned();
                let route = route.unwrap_or_else(|| Route::new("/", "404 Not Found", "text/plain", b""));
                if !route.delay.is_zero() {
                    tokio::time::sleep(route.delay).await;
                }

                let mut response = format!(
                    "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    route.status,
                    route.content_type,
                    route.body.len()
                )
                .into_bytes();
                response.extend_from_slice(&route.body);
                let _ = socket.write_all(&response).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    TestServer { addr, hits }
}

/// HTTP client that never routes loopback traffic through a proxy
pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
