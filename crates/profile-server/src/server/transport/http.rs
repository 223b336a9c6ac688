use anyhow::Context;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// A bound HTTP listener for the gateway, ready to serve.
pub struct HttpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl HttpTransport {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot listen on http address {addr}"))?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self, router: Router, shutdown: CancellationToken) -> anyhow::Result<()> {
        let addr = self.local_addr;
        tracing::info!(%addr, "HTTP gateway serving");
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                shutdown.cancelled().await;
                tracing::info!(%addr, "HTTP gateway draining");
            })
            .await
            .context("http server failed")
    }
}
