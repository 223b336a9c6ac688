use crate::server::{service::handler::UserHandler, store::UserStore};
use anyhow::Context;
use profile_core::proto::{FILE_DESCRIPTOR_SET, user_service_server::UserServiceServer};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::{codec::CompressionEncoding, transport::Server};
use tonic_reflection::server::Builder;
use tower_http::cors::CorsLayer;

/// A bound gRPC listener, ready to serve.
pub struct GrpcTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl GrpcTransport {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("cannot listen on grpc address {addr}"))?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves until `shutdown` fires, then stops accepting and waits for
    /// in-flight calls. The health service flips to `NOT_SERVING` first so
    /// load balancers stop routing here.
    pub async fn serve<S: UserStore>(
        self,
        handler: UserHandler<S>,
        shutdown: CancellationToken,
    ) -> anyhow::Result<()> {
        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<UserServiceServer<UserHandler<S>>>()
            .await;

        let reflection = Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()?;

        let addr = self.local_addr;
        let drain = async move {
            shutdown.cancelled().await;
            health_reporter
                .set_not_serving::<UserServiceServer<UserHandler<S>>>()
                .await;
            tracing::info!(%addr, "gRPC listener draining");
        };

        tracing::info!(%addr, "gRPC listener serving");
        Server::builder()
            .accept_http1(true)
            .http2_adaptive_window(Some(true))
            .layer(CorsLayer::permissive())
            .add_service(health_service)
            .add_service(reflection)
            .add_service(build_user_service(handler))
            .serve_with_incoming_shutdown(TcpListenerStream::new(self.listener), drain)
            .await
            .context("grpc server failed")?;

        Ok(())
    }
}

fn build_user_service<S: UserStore>(handler: UserHandler<S>) -> UserServiceServer<UserHandler<S>> {
    UserServiceServer::new(handler)
        .send_compressed(CompressionEncoding::Zstd)
        .send_compressed(CompressionEncoding::Gzip)
        .send_compressed(CompressionEncoding::Deflate)
        .accept_compressed(CompressionEncoding::Zstd)
        .accept_compressed(CompressionEncoding::Gzip)
        .accept_compressed(CompressionEncoding::Deflate)
}
