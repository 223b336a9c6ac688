use clap::Parser;
use profile_server::server::{
    app,
    config::{CliArgs, ServerConfig},
    telemetry::init_telemetry,
};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    if cfg!(debug_assertions) {
        tracing::info!("Starting profile service with full config: {config:#?}");
    } else {
        tracing::info!(
            grpc = %config.grpc_addr,
            http = %config.http_addr,
            store = ?config.store,
            "Starting profile service"
        );
    }

    let result = app::run(config).await;
    match &result {
        Ok(()) => tracing::info!("Service shut down successfully"),
        Err(err) => tracing::error!("Service stopped with an error: {err:#}"),
    }
    providers.shutdown();
    result
}
