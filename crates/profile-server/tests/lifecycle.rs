mod common;

use core::time::Duration;
use profile_core::{
    proto::{CreateRequest, User as ProtoUser, user_service_client::UserServiceClient},
    types::{FieldMask, User, UserId},
};
use profile_server::server::{
    app::App,
    lifecycle::Phase,
    service::page::PageWindow,
    store::{StoreResult, UserStore, memory::MemoryStore},
};
use std::sync::Arc;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::Notify,
    time::timeout,
};

const INSERT_DELAY: Duration = Duration::from_millis(500);

/// Memory store whose inserts stall, so a Create is still running when the
/// drain starts.
#[derive(Default)]
struct SlowInsertStore {
    inner: MemoryStore,
    entered: Notify,
}

impl UserStore for SlowInsertStore {
    async fn insert(&self, user: &User) -> StoreResult<UserId> {
        self.entered.notify_one();
        tokio::time::sleep(INSERT_DELAY).await;
        self.inner.insert(user).await
    }

    async fn find_by_id(&self, id: UserId, projection: &FieldMask) -> StoreResult<User> {
        self.inner.find_by_id(id, projection).await
    }

    async fn find_all(&self, window: PageWindow, projection: &FieldMask) -> StoreResult<Vec<User>> {
        self.inner.find_all(window, projection).await
    }

    async fn count(&self) -> StoreResult<i64> {
        self.inner.count().await
    }

    async fn update(&self, user: &User, whitelist: &FieldMask) -> StoreResult<u64> {
        self.inner.update(user, whitelist).await
    }

    async fn delete(&self, id: UserId) -> StoreResult<u64> {
        self.inner.delete(id).await
    }

    async fn close(&self) {
        self.inner.close().await;
    }
}

async fn start_slow() -> (App<SlowInsertStore>, Arc<SlowInsertStore>) {
    let store = Arc::new(SlowInsertStore::default());
    let app = App::start(Arc::clone(&store), &common::local_config())
        .await
        .expect("app starts on ephemeral ports");
    (app, store)
}

#[tokio::test]
async fn idle_transports_drain_within_the_deadline() {
    let (app, _store) = common::start().await;
    assert_eq!(app.phase(), Phase::Running);

    let grpc_addr = app.grpc_addr();
    let http_addr = app.http_addr();
    TcpStream::connect(grpc_addr).await.unwrap();
    TcpStream::connect(http_addr).await.unwrap();

    let handle = app.shutdown_handle();
    assert!(handle.shutdown("test"));
    assert!(!handle.shutdown("again"));

    timeout(common::DRAIN_TIMEOUT + Duration::from_secs(1), app.wait())
        .await
        .expect("drain finishes before the deadline")
        .expect("both transports report completion");

    assert!(TcpStream::connect(grpc_addr).await.is_err());
    assert!(TcpStream::connect(http_addr).await.is_err());
}

#[tokio::test]
async fn bind_failure_is_fatal() {
    let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let mut config = common::local_config();
    config.http_addr = occupied.local_addr().unwrap();

    let err = App::start(Arc::new(MemoryStore::new()), &config)
        .await
        .err()
        .expect("second bind fails");
    assert!(format!("{err:#}").contains("http address"));
}

#[tokio::test]
async fn in_flight_grpc_call_completes_during_drain() {
    let (app, store) = start_slow().await;
    let mut client = UserServiceClient::connect(format!("http://{}", app.grpc_addr()))
        .await
        .unwrap();

    let call = tokio::spawn(async move {
        client
            .create(CreateRequest {
                user: Some(ProtoUser {
                    id: 0,
                    name: "slow".into(),
                    email: "slow@example.com".into(),
                }),
            })
            .await
            .map(|reply| reply.into_inner().id)
    });

    store.entered.notified().await;
    assert!(app.shutdown_handle().shutdown("test"));

    let id = call.await.unwrap().expect("in-flight create succeeds");
    assert_eq!(id, 1);

    timeout(common::DRAIN_TIMEOUT + Duration::from_secs(1), app.wait())
        .await
        .expect("drain finishes before the deadline")
        .expect("both transports report completion");
    assert_eq!(store.inner.len(), 1);
}

#[tokio::test]
async fn in_flight_http_request_completes_during_drain() {
    let (app, store) = start_slow().await;
    let mut stream = TcpStream::connect(app.http_addr()).await.unwrap();

    let body = r#"{"user":{"name":"slow","email":"slow@example.com"}}"#;
    let request = format!(
        "POST /v1/users HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    store.entered.notified().await;
    assert!(app.shutdown_handle().shutdown("test"));

    let mut response = String::new();
    timeout(Duration::from_secs(5), stream.read_to_string(&mut response))
        .await
        .expect("response arrives while draining")
        .unwrap();
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with(r#"{"id":1}"#), "{response}");

    timeout(common::DRAIN_TIMEOUT + Duration::from_secs(1), app.wait())
        .await
        .expect("drain finishes before the deadline")
        .expect("both transports report completion");
    assert_eq!(store.inner.len(), 1);
}
