use super::*;
use tempfile::TempDir;

fn keys() -> QueueKeys {
    QueueKeys::new("sqlite-test")
}

#[tokio::test]
async fn test_backend_id() {
    let backend = SqliteBackend::in_memory().await.unwrap();
    assert_eq!(backend.id(), "sqlite");
    assert_eq!(backend.poll_interval(), Some(DEFAULT_POLL_INTERVAL));
}

#[tokio::test]
async fn test_enqueue_claim_resolve() {
    let backend = SqliteBackend::in_memory().await.unwrap();
    let keys = keys();
    let uid = Uid::from("u1");

    backend.enqueue(&keys, &uid, b"Hello World".to_vec()).await.unwrap();
    assert_eq!(
        backend.counts(&keys).await.unwrap(),
        QueueCounts { ready: 1, checked_out: 0, items: 1 }
    );

    let (claimed, payload) = backend.claim(&keys, 42).await.unwrap().unwrap();
    assert_eq!(claimed, uid);
    assert_eq!(payload, b"Hello World");
    assert_eq!(
        backend.counts(&keys).await.unwrap(),
        QueueCounts { ready: 0, checked_out: 1, items: 1 }
    );

    assert!(backend.resolve(&keys, &uid).await.unwrap());
    assert!(!backend.resolve(&keys, &uid).await.unwrap());
    assert_eq!(backend.counts(&keys).await.unwrap(), QueueCounts::default());
}

#[tokio::test]
async fn test_claim_order_and_release() {
    let backend = SqliteBackend::in_memory().await.unwrap();
    let keys = keys();
    for name in ["a", "b", "c"] {
        backend.enqueue(&keys, &Uid::from(name), name.as_bytes().to_vec()).await.unwrap();
    }

    let (a, _) = backend.claim(&keys, 1).await.unwrap().unwrap();
    assert_eq!(a.as_str(), "a");
    assert!(backend.release(&keys, &a).await.unwrap());
    assert!(!backend.release(&keys, &a).await.unwrap());

    let mut order = Vec::new();
    while let Some((uid, payload)) = backend.claim(&keys, 2).await.unwrap() {
        assert_eq!(payload, uid.as_str().as_bytes());
        order.push(uid.into_string());
    }
    assert_eq!(order, vec!["b", "c", "a"]);
}

#[tokio::test]
async fn test_stale_checkouts() {
    let backend = SqliteBackend::in_memory().await.unwrap();
    let keys = keys();
    for (score, name) in [(10, "old"), (20, "mid"), (30, "new")] {
        backend.enqueue(&keys, &Uid::from(name), vec![]).await.unwrap();
        backend.claim(&keys, score).await.unwrap();
    }

    let stale = backend.stale_checkouts(&keys, 20, 100).await.unwrap();
    assert_eq!(stale, vec![Uid::from("old"), Uid::from("mid")]);

    let limited = backend.stale_checkouts(&keys, 30, 2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("queue.db");
    let keys = keys();

    {
        let backend = SqliteBackend::open(&path).await.unwrap();
        backend.enqueue(&keys, &Uid::from("durable"), b"kept".to_vec()).await.unwrap();
    }

    let backend = SqliteBackend::open(&path).await.unwrap();
    let (uid, payload) = backend.claim(&keys, 0).await.unwrap().unwrap();
    assert_eq!(uid.as_str(), "durable");
    assert_eq!(payload, b"kept");
}

#[tokio::test]
async fn test_open_with_pragmas() {
    let temp_dir = TempDir::new().unwrap();
    let mut pragmas = BTreeMap::new();
    pragmas.insert("journal_mode".to_string(), "WAL".to_string());
    pragmas.insert("synchronous".to_string(), "NORMAL".to_string());

    let backend = SqliteBackend::open_with_pragmas(temp_dir.path().join("q.db"), pragmas)
        .await
        .unwrap();

    let mode: String = backend
        .conn
        .call(|conn| Ok(conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?))
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_claim_skips_orphaned_uid() {
    let backend = SqliteBackend::in_memory().await.unwrap();
    let keys = keys();
    backend.enqueue(&keys, &Uid::from("orphan"), vec![]).await.unwrap();
    backend.enqueue(&keys, &Uid::from("live"), vec![7]).await.unwrap();

    backend
        .conn
        .call(|conn| {
            conn.execute("DELETE FROM items WHERE uid = 'orphan'", [])?;
            Ok(())
        })
        .await
        .unwrap();

    let (uid, payload) = backend.claim(&keys, 0).await.unwrap().unwrap();
    assert_eq!(uid.as_str(), "live");
    assert_eq!(payload, vec![7]);
    assert!(backend.counts(&keys).await.unwrap().is_consistent());
}

#[tokio::test]
async fn test_with_poll_interval() {
    let backend = SqliteBackend::in_memory()
        .await
        .unwrap()
        .with_poll_interval(Duration::from_millis(20));
    assert_eq!(backend.poll_interval(), Some(Duration::from_millis(20)));
}
