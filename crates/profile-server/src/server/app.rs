//! Composition root.
//!
//! Builds the storage handle, the resource service and both transports by
//! direct construction, in dependency order, and hands the transports to the
//! [`Lifecycle`]. The storage handle outlives every transport: it is closed
//! only after the drain has finished.

use crate::server::{
    config::{ServerConfig, StoreKind},
    gateway,
    lifecycle::{Lifecycle, Phase, ShutdownHandle, signal::Signals},
    service::{handler::UserHandler, resource::ProfileService},
    store::{UserStore, memory::MemoryStore, postgres::PgStore},
    transport::{grpc::GrpcTransport, http::HttpTransport},
};
use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};

/// A started service: both listeners bound and serving.
pub struct App<S> {
    lifecycle: Lifecycle,
    store: Arc<S>,
    grpc_addr: SocketAddr,
    http_addr: SocketAddr,
}

impl<S: UserStore> App<S> {
    /// Binds both listeners and starts serving them.
    ///
    /// # Errors
    ///
    /// Fails if either address cannot be bound. Nothing is served in that
    /// case.
    pub async fn start(store: Arc<S>, config: &ServerConfig) -> anyhow::Result<Self> {
        let mut lifecycle = Lifecycle::new(config.drain_timeout);
        lifecycle.starting();

        let grpc = GrpcTransport::bind(config.grpc_addr).await?;
        let http = HttpTransport::bind(config.http_addr).await?;
        let grpc_addr = grpc.local_addr();
        let http_addr = http.local_addr();

        let service = ProfileService::new(Arc::clone(&store));
        let handler = UserHandler::new(service.clone(), config.log_payload);
        let router = gateway::router(service, config.log_payload);

        lifecycle.spawn("grpc", grpc.serve(handler, lifecycle.token()));
        lifecycle.spawn("http", http.serve(router, lifecycle.token()));
        lifecycle.running();

        tracing::info!(%grpc_addr, %http_addr, "Profile service started");
        Ok(Self {
            lifecycle,
            store,
            grpc_addr,
            http_addr,
        })
    }

    pub const fn grpc_addr(&self) -> SocketAddr {
        self.grpc_addr
    }

    pub const fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    pub fn phase(&self) -> Phase {
        self.lifecycle.phase()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.lifecycle.handle()
    }

    /// Blocks until a shutdown was requested and every transport drained,
    /// then closes the store.
    pub async fn wait(self) -> anyhow::Result<()> {
        let result = self.lifecycle.wait().await;
        self.store.close().await;
        result
    }
}

/// Opens the configured store and runs the service until a termination
/// signal arrives.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    match config.store {
        StoreKind::Memory => serve(Arc::new(MemoryStore::new()), &config).await,
        StoreKind::Postgres => {
            let database = config
                .database
                .as_ref()
                .context("postgres store selected without database settings")?;
            let store = PgStore::connect(database).await?;
            serve(Arc::new(store), &config).await
        }
    }
}

async fn serve<S: UserStore>(store: Arc<S>, config: &ServerConfig) -> anyhow::Result<()> {
    let signals = Signals::install().context("cannot install signal handlers")?;

    let app = match App::start(Arc::clone(&store), config).await {
        Ok(app) => app,
        Err(err) => {
            store.close().await;
            return Err(err);
        }
    };

    tokio::spawn(signals.forward(app.shutdown_handle()));
    app.wait().await
}
