//! Locket service behaviour over a real gRPC connection

mod common;

use std::time::Duration;

use common::TestServer;
use latchkey_api::grpc::TypeCode;
use latchkey_api::{LockType, Resource};
use latchkey_client::{ClientError, LockRunner};
use latchkey_common::LatchkeyError;
use latchkey_consistency::LockDb;
use tokio::sync::{broadcast, oneshot};

fn lock(key: &str, owner: &str) -> Resource {
    Resource::new(key, owner, "", LockType::Lock)
}

fn locket_error(err: ClientError) -> LatchkeyError {
    err.locket_error()
        .cloned()
        .unwrap_or_else(|| panic!("expected a locket error, got {err}"))
}

#[tokio::test]
async fn test_unrenewed_lock_passes_to_next_owner() {
    let server = TestServer::start().await;
    let client = server.client().await;

    client.lock(lock("db-leader", "node-a"), 1).await.unwrap();

    let err = client
        .lock(lock("db-leader", "node-b"), 1)
        .await
        .unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::LockCollision);

    tokio::time::sleep(Duration::from_millis(2100)).await;

    client.lock(lock("db-leader", "node-b"), 1).await.unwrap();
    let held = client.fetch("db-leader").await.unwrap();
    assert_eq!(held.owner, "node-b");

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_fetch_all_after_release() {
    let server = TestServer::start().await;
    let client = server.client().await;

    for key in ["a", "b", "c"] {
        client.lock(lock(key, "node-a"), 30).await.unwrap();
    }
    client
        .lock(
            Resource::new("cell-1", "rep-1", "", LockType::Presence),
            30,
        )
        .await
        .unwrap();
    client.release(lock("b", "node-a")).await.unwrap();

    let mut keys: Vec<String> = client
        .fetch_all(LockType::Lock)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.key)
        .collect();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "c".to_string()]);

    let presences = client.fetch_all(LockType::Presence).await.unwrap();
    assert_eq!(presences.len(), 1);
    assert_eq!(presences[0].type_code, TypeCode::Presence as i32);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_business_errors_round_trip() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let err = client.lock(lock("db-leader", "node-a"), 0).await.unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::InvalidTtl);

    let err = client.lock(lock("db-leader", ""), 10).await.unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::InvalidOwner);

    let mut bad_type = lock("db-leader", "node-a");
    bad_type.r#type = "presence".to_string();
    let err = client.lock(bad_type, 10).await.unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::InvalidType);

    let err = client.release(lock("absent", "node-a")).await.unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::ResourceNotFound);

    let err = client.fetch("absent").await.unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::ResourceNotFound);

    client.lock(lock("db-leader", "node-a"), 10).await.unwrap();
    let err = client.release(lock("db-leader", "node-b")).await.unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::LockCollision);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_type_code_only_resource_is_normalized() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let mut resource = lock("cell-7", "rep-7");
    resource.r#type = String::new();
    resource.type_code = TypeCode::Presence as i32;
    client.lock(resource, 10).await.unwrap();

    let fetched = client.fetch("cell-7").await.unwrap();
    assert_eq!(fetched.r#type, "presence");
    assert_eq!(fetched.type_code, TypeCode::Presence as i32);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_renewal_increments_index() {
    let server = TestServer::start().await;
    let client = server.client().await;

    client.lock(lock("db-leader", "node-a"), 10).await.unwrap();
    let first = server.db.fetch("db-leader").await.unwrap();
    client.lock(lock("db-leader", "node-a"), 10).await.unwrap();
    let second = server.db.fetch("db-leader").await.unwrap();

    assert_eq!(second.modified_index, first.modified_index + 1);
    assert_eq!(second.modified_id, first.modified_id);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_lock_runner_holds_and_releases() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let (ready_tx, ready_rx) = oneshot::channel();
    let (stop_tx, stop_rx) = broadcast::channel(1);
    let runner = LockRunner::new(
        client.clone(),
        lock("db-leader", "node-a"),
        5,
        Duration::from_millis(100),
    );
    let handle = tokio::spawn(runner.run(ready_tx, stop_rx));

    tokio::time::timeout(Duration::from_secs(5), ready_rx)
        .await
        .unwrap()
        .unwrap();

    let err = client
        .lock(lock("db-leader", "node-b"), 5)
        .await
        .unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::LockCollision);

    stop_tx.send(()).unwrap();
    handle.await.unwrap().unwrap();

    let err = client.fetch("db-leader").await.unwrap_err();
    assert_eq!(locket_error(err), LatchkeyError::ResourceNotFound);

    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_lock_runner_waits_for_holder() {
    let server = TestServer::start().await;
    let client = server.client().await;

    client.lock(lock("db-leader", "node-b"), 1).await.unwrap();

    let (ready_tx, mut ready_rx) = oneshot::channel();
    let (_stop_tx, stop_rx) = broadcast::channel(1);
    let runner = LockRunner::new(
        client.clone(),
        lock("db-leader", "node-a"),
        5,
        Duration::from_millis(100),
    );
    let handle = tokio::spawn(runner.run(ready_tx, stop_rx));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(ready_rx.try_recv().is_err());

    tokio::time::timeout(Duration::from_secs(5), ready_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(client.fetch("db-leader").await.unwrap().owner, "node-a");

    handle.abort();
    drop(client);
    server.stop().await;
}

#[tokio::test]
async fn test_lock_runner_reports_lost_lock() {
    let server = TestServer::start().await;
    let client = server.client().await;

    let (ready_tx, ready_rx) = oneshot::channel();
    let (_stop_tx, stop_rx) = broadcast::channel(1);
    let runner = LockRunner::new(
        client.clone(),
        lock("db-leader", "node-a"),
        5,
        Duration::from_millis(100),
    );
    let handle = tokio::spawn(runner.run(ready_tx, stop_rx));

    tokio::time::timeout(Duration::from_secs(5), ready_rx)
        .await
        .unwrap()
        .unwrap();

    // Another owner takes over between two renewals; the in-memory store
    // never yields, so the runner cannot renew in between
    server.db.release(&lock("db-leader", "node-a")).await.unwrap();
    server.db.lock(&lock("db-leader", "node-b"), 30).await.unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .unwrap()
        .unwrap();
    match result {
        Err(ClientError::LockLost { key, source }) => {
            assert_eq!(key, "db-leader");
            assert_eq!(source.locket_error(), Some(&LatchkeyError::LockCollision));
        }
        other => panic!("expected LockLost, got {other:?}"),
    }

    drop(client);
    server.stop().await;
}
