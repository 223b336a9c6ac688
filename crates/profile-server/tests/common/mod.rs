#![allow(dead_code)]

use core::time::Duration;
use profile_server::server::{
    app::App,
    config::{ServerConfig, StoreKind},
    store::memory::MemoryStore,
};
use std::sync::Arc;

pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub fn local_config() -> ServerConfig {
    ServerConfig {
        grpc_addr: "127.0.0.1:0".parse().unwrap(),
        http_addr: "127.0.0.1:0".parse().unwrap(),
        store: StoreKind::Memory,
        database: None,
        drain_timeout: DRAIN_TIMEOUT,
        log_payload: true,
    }
}

pub async fn start() -> (App<MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let app = App::start(Arc::clone(&store), &local_config())
        .await
        .expect("app starts on ephemeral ports");
    (app, store)
}
