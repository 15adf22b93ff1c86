// ────────────────────────────────
// src/server/listener.rs
// Encapsulates low‑level TCP bind so the probe and test servers share it.
// ────────────────────────────────
use anyhow::{Context, Result};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// Pause after a failed accept. Errors such as EMFILE clear once open
/// connections finish, so the loop waits instead of spinning.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn bind_tcp(addr: SocketAddr) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    Ok(listener)
}

/// Retry `accept` until it yields a connection. Accept errors are logged and
/// never end the server.
pub async fn accept_with_backoff<F, Fut, T>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(accepted) => return accepted,
            Err(err) => {
                tracing::warn!(%err, "accept error, retrying in {:?}", ACCEPT_BACKOFF);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}
