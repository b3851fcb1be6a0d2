//! Minimal scripted HTTP server.
//!
//! Serves one scripted response per request over real sockets, which is
//! all the validation worker's probing logic needs. Responses are played
//! in order; once the script is exhausted every further request gets a
//! plain 200.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// One scripted HTTP response.
#[derive(Debug, Clone)]
pub struct ScriptedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl ScriptedResponse {
    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A loopback HTTP server replaying a response script.
pub struct TestServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
    accept_loop: JoinHandle<()>,
}

impl TestServer {
    /// Binds a loopback port and starts serving the script.
    pub async fn start(script: Vec<ScriptedResponse>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let hits = Arc::new(AtomicUsize::new(0));
        let script = Arc::new(Mutex::new(VecDeque::from(script)));

        let loop_hits = Arc::clone(&hits);
        let accept_loop = tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let hits = Arc::clone(&loop_hits);
                let script = Arc::clone(&script);
                tokio::spawn(async move {
                    let mut buffer = [0u8; 4096];
                    let mut request = Vec::new();
                    // Read until the header terminator; probe requests
                    // carry no body.
                    loop {
                        match stream.read(&mut buffer).await {
                            Ok(0) => return,
                            Ok(n) => {
                                request.extend_from_slice(&buffer[..n]);
                                if request.windows(4).any(|w| w == b"\r\n\r\n") {
                                    break;
                                }
                            }
                            Err(_) => return,
                        }
                    }

                    hits.fetch_add(1, Ordering::AcqRel);
                    let response = script
                        .lock()
                        .unwrap()
                        .pop_front()
                        .unwrap_or_else(|| ScriptedResponse::status(200));

                    let mut payload = format!(
                        "HTTP/1.1 {} docloom-test\r\ncontent-length: 0\r\nconnection: close\r\n",
                        response.status
                    );
                    for (name, value) in &response.headers {
                        payload.push_str(&format!("{name}: {value}\r\n"));
                    }
                    payload.push_str("\r\n");

                    let _ = stream.write_all(payload.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Ok(Self {
            addr,
            hits,
            accept_loop,
        })
    }

    /// URL of a path on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Number of requests served.
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Acquire)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}
