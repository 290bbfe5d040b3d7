//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::time::Duration;

use socket_policy_server::{Server, ServerConfig};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Generous bound for any single network step in tests.
pub const STEP: Duration = Duration::from_secs(5);

/// Default config bound to an ephemeral loopback port.
pub fn loopback_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.host = "127.0.0.1".into();
    config.listener.port = 0;
    config
}

/// Start a server with `configure` applied to the loopback config.
pub async fn start_server(configure: impl FnOnce(&mut ServerConfig)) -> Server {
    let mut config = loopback_config();
    configure(&mut config);
    Server::start(config).await.expect("server should start")
}

pub async fn connect(addr: SocketAddr) -> TcpStream {
    tokio::time::timeout(STEP, TcpStream::connect(addr))
        .await
        .expect("connect timed out")
        .expect("connect failed")
}

/// Write `payload` and read exactly `len` bytes back.
pub async fn send_and_read(stream: &mut TcpStream, payload: &[u8], len: usize) -> Vec<u8> {
    stream.write_all(payload).await.expect("write failed");
    let mut buf = vec![0; len];
    tokio::time::timeout(STEP, stream.read_exact(&mut buf))
        .await
        .expect("read timed out")
        .expect("read failed");
    buf
}

/// Half-close and collect whatever the server sends before closing.
pub async fn finish(mut stream: TcpStream) -> Vec<u8> {
    stream.shutdown().await.expect("shutdown failed");
    let mut rest = Vec::new();
    tokio::time::timeout(STEP, stream.read_to_end(&mut rest))
        .await
        .expect("server did not close")
        .expect("read failed");
    rest
}
