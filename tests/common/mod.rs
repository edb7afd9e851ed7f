//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use api_gateway::config::{GatewayConfig, ServiceTargetConfig};
use api_gateway::http::HttpServer;
use api_gateway::lifecycle::Shutdown;

/// Read one request head from the socket and return the request path.
async fn read_request_path(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    let head = String::from_utf8_lossy(&buf);
    let request_line = head.lines().next()?;
    request_line.split_whitespace().nth(1).map(String::from)
}

async fn write_response(socket: &mut tokio::net::TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Backend that answers every request with `{name}:{path}`.
#[allow(dead_code)]
pub async fn start_echo_backend(addr: SocketAddr, name: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if let Some(path) = read_request_path(&mut socket).await {
                            let body = format!("{name}:{path}");
                            write_response(&mut socket, "200 OK", &body).await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Backend that answers every request with a fixed JSON body.
#[allow(dead_code)]
pub async fn start_health_backend(addr: SocketAddr, body: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if read_request_path(&mut socket).await.is_some() {
                            write_response(&mut socket, "200 OK", body).await;
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Backend that sends a response head plus a few body bytes, then
/// stalls without ever finishing the body.
#[allow(dead_code)]
pub async fn start_stalling_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        if read_request_path(&mut socket).await.is_some() {
                            let head = "HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nContent-Length: 4096\r\n\r\npartial";
                            let _ = socket.write_all(head.as_bytes()).await;
                            let _ = socket.flush().await;
                            tokio::time::sleep(Duration::from_secs(30)).await;
                            drop(socket);
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Backend that accepts connections and never responds.
#[allow(dead_code)]
pub async fn start_silent_backend(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        // Hold the connection open without answering.
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        drop(socket);
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// One service target pointing at a backend address.
pub fn service(name: &str, prefix: &str, addr: SocketAddr) -> ServiceTargetConfig {
    ServiceTargetConfig {
        name: name.into(),
        base_url: format!("http://{addr}"),
        path_prefix: prefix.into(),
        rewrite_prefix: String::new(),
        timeout_ms: 2000,
    }
}

/// Start the gateway on `proxy_addr` and return its shutdown handle.
pub async fn start_gateway(mut config: GatewayConfig, proxy_addr: SocketAddr) -> Shutdown {
    config.listener.bind_address = proxy_addr.to_string();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let server = HttpServer::new(config).expect("gateway should build");
    let listener = TcpListener::bind(proxy_addr).await.unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Give the acceptor a moment to come up.
    tokio::time::sleep(Duration::from_millis(200)).await;
    shutdown
}

/// Non-pooled client so connection reuse cannot leak between tests.
#[allow(dead_code)]
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
