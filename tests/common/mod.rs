//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

/// Start a mock backend on an ephemeral port, returning its address. Every
/// connection gets a fixed 200 response.
pub async fn start_mock_backend(response: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    serve_fixed(listener, response);
    addr
}

/// Start a mock backend on a specific address (for bringing a backend up at
/// an address the proxy already knows).
#[allow(dead_code)]
pub async fn start_mock_backend_at(addr: SocketAddr, response: &'static str) {
    let listener = TcpListener::bind(addr).await.unwrap();
    serve_fixed(listener, response);
}

/// Reserve an address with nothing listening on it: bind an ephemeral port
/// and immediately release it.
#[allow(dead_code)]
pub async fn reserve_dead_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn serve_fixed(listener: TcpListener, response: &'static str) {
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let response_str = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            response.len(),
                            response
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}
