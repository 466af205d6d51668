use chatrag_core::filter::SearchFilter;
use chatrag_core::key::canonical_key;
use chatrag_core::traits::{DenseIndex, SparseStore};
use chatrag_core::types::{DenseEntry, Payload, SourceKind, StoredEntry};
use chatrag_vector::{open_db, LanceDenseIndex, LanceSparseStore};
use tempfile::TempDir;

fn payload(domain_id: i64, text: &str, author_id: i64, timestamp: f64) -> Payload {
    Payload { domain_id, text: text.to_string(), author_id, chat_id: 7, timestamp }
}

fn stored(domain_id: i64, text: &str, author_id: i64, timestamp: f64) -> StoredEntry {
    StoredEntry {
        key: canonical_key(domain_id),
        payload: payload(domain_id, text, author_id, timestamp),
    }
}

fn dense(domain_id: i64, vector: [f32; 3], author_id: i64) -> DenseEntry {
    DenseEntry {
        key: canonical_key(domain_id),
        vector: vector.to_vec(),
        payload: payload(domain_id, "text", author_id, domain_id as f64),
    }
}

#[tokio::test]
async fn sparse_store_upsert_scan_retrieve() {
    let tmp = TempDir::new().expect("tmp");
    let conn = open_db(tmp.path().to_str().expect("utf8")).await.expect("db");
    let store = LanceSparseStore::open(&conn, "bm25_test").await.expect("store");

    store
        .upsert(&[stored(1, "привет мир", 10, 100.0), stored(2, "привет друг", 20, 200.0)])
        .await
        .expect("upsert");
    // same key twice: overwrite, not duplicate
    store.upsert(&[stored(1, "привет всем", 10, 100.0)]).await.expect("re-upsert");
    assert_eq!(store.count().await.expect("count"), 2);

    let all = store.scan(&SearchFilter::default(), 100).await.expect("scan");
    assert_eq!(all.len(), 2);
    let one = all.iter().find(|e| e.payload.domain_id == 1).expect("entry 1");
    assert_eq!(one.payload.text, "привет всем");

    let by_author = store.scan(&SearchFilter::author(20), 100).await.expect("scan author");
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].payload.domain_id, 2);

    let since = SearchFilter::between(Some(150.0), None);
    let by_time = store.scan(&since, 100).await.expect("scan time");
    assert_eq!(by_time.iter().map(|e| e.payload.domain_id).collect::<Vec<_>>(), vec![2]);

    let limited = store.scan(&SearchFilter::default(), 1).await.expect("scan limit");
    assert_eq!(limited.len(), 1);

    let keys = [canonical_key(2), canonical_key(99), canonical_key(1)];
    let got = store.retrieve(&keys).await.expect("retrieve");
    assert_eq!(got.iter().map(|e| e.payload.domain_id).collect::<Vec<_>>(), vec![2, 1]);
}

#[tokio::test]
async fn dense_index_ranks_by_cosine_and_filters() {
    let tmp = TempDir::new().expect("tmp");
    let conn = open_db(tmp.path().to_str().expect("utf8")).await.expect("db");
    let index = LanceDenseIndex::open(&conn, "embeddings_test", 3).await.expect("index");

    index
        .upsert(&[
            dense(1, [1.0, 0.0, 0.0], 10),
            dense(2, [0.7, 0.7, 0.0], 10),
            dense(3, [0.0, 0.0, 1.0], 20),
        ])
        .await
        .expect("upsert");
    index.upsert(&[dense(3, [0.0, 1.0, 0.0], 20)]).await.expect("re-upsert");
    assert_eq!(index.count().await.expect("count"), 3);

    let hits = index.query(&[1.0, 0.0, 0.0], &SearchFilter::default(), 2).await.expect("query");
    assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![1, 2]);
    assert!(hits[0].score >= hits[1].score);
    assert!((hits[0].score - 1.0).abs() < 1e-3);
    assert!(hits.iter().all(|h| h.source == SourceKind::Dense));

    let filtered =
        index.query(&[1.0, 0.0, 0.0], &SearchFilter::author(20), 5).await.expect("filtered");
    assert_eq!(filtered.iter().map(|h| h.id).collect::<Vec<_>>(), vec![3]);
}

#[tokio::test]
async fn dense_index_rejects_wrong_dimension() {
    let tmp = TempDir::new().expect("tmp");
    let conn = open_db(tmp.path().to_str().expect("utf8")).await.expect("db");
    let index = LanceDenseIndex::open(&conn, "embeddings_dim", 3).await.expect("index");

    let bad = DenseEntry {
        key: canonical_key(1),
        vector: vec![1.0, 0.0],
        payload: payload(1, "x", 1, 1.0),
    };
    assert!(index.upsert(&[bad]).await.is_err());
    assert!(index.query(&[1.0], &SearchFilter::default(), 1).await.is_err());
}

#[tokio::test]
async fn reopening_keeps_rows() {
    let tmp = TempDir::new().expect("tmp");
    let uri = tmp.path().to_str().expect("utf8").to_string();
    {
        let conn = open_db(&uri).await.expect("db");
        let store = LanceSparseStore::open(&conn, "bm25_reopen").await.expect("store");
        store.upsert(&[stored(5, "сохранено", 1, 1.0)]).await.expect("upsert");
    }
    let conn = open_db(&uri).await.expect("db again");
    let store = LanceSparseStore::open(&conn, "bm25_reopen").await.expect("store again");
    let all = store.scan(&SearchFilter::default(), 10).await.expect("scan");
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].payload.text, "сохранено");
}
