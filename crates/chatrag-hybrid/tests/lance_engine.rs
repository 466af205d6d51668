use chatrag_core::config::Settings;
use chatrag_core::types::Record;
use chatrag_hybrid::{open_engine, SearchOptions};
use tempfile::TempDir;

fn settings(dir: &TempDir) -> Settings {
    let mut s = Settings::default();
    s.storage.uri = dir.path().join("lancedb").to_string_lossy().into_owned();
    s.embedding.fake = true;
    s
}

fn record(domain_id: i64, text: &str) -> Record {
    Record {
        domain_id,
        text: text.to_string(),
        author_id: 1,
        chat_id: 1,
        timestamp: domain_id as f64,
    }
}

#[tokio::test]
async fn ingest_search_and_reopen() {
    let tmp = TempDir::new().expect("tmp");
    let settings = settings(&tmp);
    {
        let engine = open_engine(&settings).await.expect("engine");
        let batch = [record(1, "привет мир"), record(2, "привет друг")];
        engine.ingest_batch(&batch).await.expect("ingest");
        engine.ingest(&record(2, "привет друг")).await.expect("replay");

        let hits = engine.search("мир", &SearchOptions::new(1, 50)).await.expect("search");
        assert_eq!(hits.iter().map(|h| h.id).collect::<Vec<_>>(), vec![1]);
        assert_eq!(engine.sparse().count().await.expect("count"), 2);
        assert_eq!(engine.dense().count().await.expect("count"), 2);
    }

    // a fresh process sees the rows through the initial reload
    let engine = open_engine(&settings).await.expect("reopen");
    assert_eq!(engine.lexical().len(), 2);
    let hits = engine.search("друг", &SearchOptions::new(1, 50)).await.expect("search");
    assert_eq!(hits[0].id, 2);
    let texts = engine.get_texts(&[1, 2]).await.expect("texts");
    assert_eq!(texts, vec![(1, "привет мир".to_string()), (2, "привет друг".to_string())]);
}
