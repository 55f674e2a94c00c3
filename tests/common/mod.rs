//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use caching_proxy::config::ProxyConfig;
use caching_proxy::{ProxyServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// A raw TCP origin that records what it receives.
#[allow(dead_code)]
pub struct MockOrigin {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<Vec<u8>>>>,
}

#[allow(dead_code)]
impl MockOrigin {
    /// Start an origin that answers every connection with `response` and closes.
    pub async fn start(response: &'static [u8]) -> Self {
        Self::start_with(move |_| response.to_vec()).await
    }

    /// Start an origin whose response depends on the connection index (0-based).
    pub async fn start_with<F>(respond: F) -> Self
    where
        F: Fn(usize) -> Vec<u8> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let seen = connections.clone();
        let log = requests.clone();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let index = seen.fetch_add(1, Ordering::SeqCst);
                let request = read_request(&mut socket).await;
                log.lock().unwrap().push(request);

                let _ = socket.write_all(&respond(index)).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            addr,
            connections,
            requests,
        }
    }

    /// Value to send as the Host header to reach this origin.
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.requests.lock().unwrap().clone()
    }
}

/// Read one request: headers up to CRLFCRLF, then Content-Length bytes of body.
async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut received = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        if let Some(head_end) = find(&received, b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&received[..head_end]).to_ascii_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if received.len() >= head_end + 4 + body_len {
                return received;
            }
        }
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return received,
            Ok(n) => received.extend_from_slice(&buf[..n]),
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// A proxy running on an ephemeral port with its own cache directory.
#[allow(dead_code)]
pub struct TestProxy {
    pub addr: SocketAddr,
    pub cache_dir: tempfile::TempDir,
    shutdown: Shutdown,
    handle: JoinHandle<()>,
}

#[allow(dead_code)]
impl TestProxy {
    pub async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    /// Start with test defaults, after `tweak` adjusts the config.
    pub async fn start_with(tweak: impl FnOnce(&mut ProxyConfig)) -> Self {
        let cache_dir = tempfile::tempdir().unwrap();

        let mut config = ProxyConfig::default();
        config.listener.bind_address = "127.0.0.1:0".into();
        config.cache.directory = cache_dir.path().to_string_lossy().into_owned();
        config.timeouts.connect_secs = 2;
        config.timeouts.request_secs = 5;
        config.timeouts.client_read_secs = 5;
        tweak(&mut config);

        let server = ProxyServer::bind(&config).await.unwrap();
        let addr = server.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let stop = shutdown.subscribe();
        let handle = tokio::spawn(async move {
            server.run(stop).await.unwrap();
        });

        Self {
            addr,
            cache_dir,
            shutdown,
            handle,
        }
    }

    /// Send raw bytes as one request and collect everything until close.
    pub async fn send(&self, raw: &[u8]) -> Vec<u8> {
        let mut stream = TcpStream::connect(self.addr).await.unwrap();
        stream.write_all(raw).await.unwrap();
        let mut response = Vec::new();
        tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
            .await
            .expect("proxy did not close the connection")
            .unwrap();
        response
    }

    pub fn cache_file(&self, key: &str) -> std::path::PathBuf {
        self.cache_dir.path().join(key)
    }

    pub fn cached_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = std::fs::read_dir(self.cache_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        keys.sort();
        keys
    }

    /// Trigger shutdown and wait for the accept loop to exit.
    pub async fn stop(self) {
        self.shutdown.trigger("test finished");
        tokio::time::timeout(Duration::from_secs(5), self.handle)
            .await
            .expect("proxy did not stop")
            .unwrap();
    }
}
