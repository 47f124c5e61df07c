use std::io;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use docchat_core::types::{Chunk, FileType};
use docchat_core::Error;
use docchat_embed::{Embedder, EmbeddingGateway, TaskType};
use docchat_vector::VectorStore;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

/// One axis per vocabulary word; a text's vector counts its words.
struct KeywordEmbedder {
    vocab: Vec<&'static str>,
}

impl Embedder for KeywordEmbedder {
    fn model_id(&self) -> &str { "keyword" }
    fn dim(&self) -> usize { self.vocab.len() }
    fn embed(&self, text: &str, _task: TaskType) -> anyhow::Result<Vec<f32>> {
        let mut v = vec![0.0; self.vocab.len()];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            if let Some(i) = self.vocab.iter().position(|&w| w.eq_ignore_ascii_case(word)) {
                v[i] += 1.0;
            }
        }
        Ok(v)
    }
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn model_id(&self) -> &str { "failing" }
    fn dim(&self) -> usize { 5 }
    fn embed(&self, _text: &str, _task: TaskType) -> anyhow::Result<Vec<f32>> {
        anyhow::bail!("quota exceeded")
    }
}

const VOCAB: [&str; 5] = ["the", "cat", "sat", "dog", "ran"];

fn keyword_store() -> VectorStore {
    let embedder = Arc::new(KeywordEmbedder { vocab: VOCAB.to_vec() });
    VectorStore::new(EmbeddingGateway::new(embedder, 100))
}

fn chunk(text: &str, source: &str, i: usize) -> Chunk {
    Chunk::new(text.to_string(), source, i, FileType::Txt, Utc::now())
}

fn cat_and_dog() -> Vec<Chunk> {
    vec![chunk("The cat sat.", "a.txt", 0), chunk("The dog ran.", "a.txt", 1)]
}

#[test]
fn cat_query_finds_cat_chunk() {
    let mut store = keyword_store();
    assert_eq!(store.add_documents(cat_and_dog()).unwrap(), 2);

    let results = store.search("cat", 1).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].text, "The cat sat.");
    assert_eq!(results[0].source(), "a.txt");
}

#[test]
fn results_are_bounded_and_ordered() {
    let mut store = keyword_store();
    store
        .add_documents(vec![
            chunk("cat cat cat", "x.txt", 0),
            chunk("dog", "x.txt", 1),
            chunk("cat sat", "x.txt", 2),
            chunk("ran ran", "x.txt", 3),
        ])
        .unwrap();

    let results = store.search("cat sat", 10).unwrap();
    assert_eq!(results.len(), 4, "k larger than the store is capped");
    for pair in results.windows(2) {
        assert!(pair[0].similarity >= pair[1].similarity);
    }
    for r in &results {
        assert!(r.similarity > 0.0 && r.similarity <= 1.0);
    }
    assert_eq!(results[0].text, "cat sat");
    assert!((results[0].similarity - 1.0).abs() < 1e-6, "exact match has distance 0");

    assert_eq!(store.search("cat", 2).unwrap().len(), 2);
}

#[test]
fn similarity_uses_squared_distance() {
    let embedder = Arc::new(KeywordEmbedder { vocab: vec!["a", "b"] });
    let mut store = VectorStore::new(EmbeddingGateway::new(embedder, 10));
    store
        .insert(vec![vec![0.0, 0.0], vec![3.0, 4.0]], vec![chunk("origin", "p.txt", 0), chunk("far", "p.txt", 1)])
        .unwrap();

    let results = store.search_vector(&[0.0, 0.0], 2).unwrap();
    assert_eq!(results[0].text, "origin");
    assert!((results[0].similarity - 1.0).abs() < 1e-6);
    assert!((results[1].similarity - 1.0 / 26.0).abs() < 1e-6);
}

#[test]
fn empty_store_search_skips_embedding() {
    let store = VectorStore::new(EmbeddingGateway::new(Arc::new(FailingEmbedder), 10));
    assert!(store.search("anything", 5).unwrap().is_empty());
}

#[test]
fn embedding_failure_leaves_store_unchanged() {
    let mut store = VectorStore::new(EmbeddingGateway::new(Arc::new(FailingEmbedder), 10));
    match store.add_documents(cat_and_dog()) {
        Err(Error::Embedding(msg)) => assert!(msg.contains("quota exceeded"), "{msg}"),
        other => panic!("expected embedding error, got {other:?}"),
    }
    assert_eq!(store.stats().total_chunks, 0);
}

#[test]
fn insert_rejects_bad_input_without_side_effects() {
    let mut store = keyword_store();
    assert!(matches!(store.insert(vec![], vec![]), Err(Error::EmptyEmbeddings)));
    assert!(matches!(
        store.insert(vec![vec![0.0; 5]], cat_and_dog()),
        Err(Error::LengthMismatch { vectors: 1, chunks: 2 })
    ));
    assert!(matches!(
        store.insert(vec![vec![0.0; 5], vec![0.0; 3]], cat_and_dog()),
        Err(Error::DimensionMismatch { expected: 5, actual: 3 })
    ));
    assert!(store.is_empty());
}

#[test]
fn rebuild_replaces_previous_contents() {
    let mut store = keyword_store();
    store.add_documents(cat_and_dog()).unwrap();

    assert_eq!(store.rebuild(vec![chunk("dog dog", "b.txt", 0)]).unwrap(), 1);
    assert_eq!(store.len(), 1);
    assert_eq!(store.entries()[0].metadata.source, "b.txt");

    assert!(matches!(store.rebuild(Vec::new()), Err(Error::NoContent)));
    assert_eq!(store.len(), 1, "empty rebuild keeps the old contents");
}

#[test]
fn clear_resets_stats() {
    let mut store = keyword_store();
    store.add_documents(cat_and_dog()).unwrap();
    store.clear();
    store.clear();
    let stats = store.stats();
    assert_eq!((stats.total_chunks, stats.index_size, stats.dimension), (0, 0, 5));
    assert!(store.search("cat", 3).unwrap().is_empty());
}

#[test]
fn persist_and_restore_round_trip() {
    let tmp = TempDir::new().unwrap();
    let prefix = tmp.path().join("nested/dir/store");

    let mut store = keyword_store();
    store.add_documents(cat_and_dog()).unwrap();
    store.persist(&prefix).unwrap();
    assert!(docchat_vector::persist::index_path(&prefix).exists());
    assert!(docchat_vector::persist::bundle_path(&prefix).exists());

    let mut restored = keyword_store();
    restored.restore(&prefix).unwrap();
    assert_eq!(restored.stats(), store.stats());
    assert_eq!(restored.entries(), store.entries());
    assert_eq!(restored.search("dog", 1).unwrap()[0].text, "The dog ran.");
}

#[test]
fn restore_with_missing_file_keeps_state() {
    let tmp = TempDir::new().unwrap();
    let prefix = tmp.path().join("store");

    let mut saved = keyword_store();
    saved.add_documents(cat_and_dog()).unwrap();
    saved.persist(&prefix).unwrap();
    std::fs::remove_file(docchat_vector::persist::bundle_path(&prefix)).unwrap();

    let mut store = keyword_store();
    store.add_documents(vec![chunk("dog dog", "b.txt", 0)]).unwrap();
    assert!(matches!(store.restore(&prefix), Err(Error::NotFound(_))));
    assert_eq!(store.len(), 1);
    assert_eq!(store.entries()[0].text, "dog dog");
}

#[test]
fn restore_rejects_mismatched_pair() {
    let tmp = TempDir::new().unwrap();
    let two = tmp.path().join("two");
    let one = tmp.path().join("one");

    let mut store = keyword_store();
    store.add_documents(cat_and_dog()).unwrap();
    store.persist(&two).unwrap();
    store.clear();
    store.add_documents(vec![chunk("cat", "c.txt", 0)]).unwrap();
    store.persist(&one).unwrap();

    // vectors from one save, texts from another
    std::fs::copy(docchat_vector::persist::bundle_path(&two), docchat_vector::persist::bundle_path(&one)).unwrap();
    let mut fresh = keyword_store();
    assert!(matches!(fresh.restore(&one), Err(Error::Persist(_))));
    assert!(fresh.is_empty());
}

#[test]
fn restore_rejects_other_dimension() {
    let tmp = TempDir::new().unwrap();
    let prefix = tmp.path().join("store");
    let mut store = keyword_store();
    store.add_documents(cat_and_dog()).unwrap();
    store.persist(&prefix).unwrap();

    let small = Arc::new(KeywordEmbedder { vocab: vec!["cat", "dog"] });
    let mut other = VectorStore::new(EmbeddingGateway::new(small, 10));
    assert!(matches!(other.restore(&prefix), Err(Error::DimensionMismatch { expected: 2, actual: 5 })));
}

#[test]
fn restore_rejects_damaged_index_header() {
    let tmp = TempDir::new().unwrap();
    let empty = tmp.path().join("empty");
    let full = tmp.path().join("full");
    keyword_store().persist(&empty).unwrap();
    let mut saved = keyword_store();
    saved.add_documents(cat_and_dog()).unwrap();
    saved.persist(&full).unwrap();

    let patch = |prefix: &std::path::Path, edit: &dyn Fn(&mut Vec<u8>)| {
        let path = docchat_vector::persist::index_path(prefix);
        let mut bytes = std::fs::read(&path).unwrap();
        edit(&mut bytes);
        std::fs::write(&path, bytes).unwrap();
    };
    let assert_rejected = |prefix: &std::path::Path| {
        let mut store = keyword_store();
        store.add_documents(vec![chunk("dog dog", "b.txt", 0)]).unwrap();
        match store.restore(prefix) {
            Err(Error::Persist(_)) => {}
            other => panic!("expected a corrupt artifact error, got {other:?}"),
        }
        assert_eq!(store.len(), 1);
        assert_eq!(store.entries()[0].text, "dog dog");
    };

    // huge dimension with one promised row
    patch(&empty, &|b: &mut Vec<u8>| {
        b[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        b[12..20].copy_from_slice(&1u64.to_le_bytes());
    });
    assert_rejected(&empty);

    // huge row count
    patch(&full, &|b: &mut Vec<u8>| b[12..20].copy_from_slice(&u64::MAX.to_le_bytes()));
    assert_rejected(&full);

    // header intact, rows cut short
    saved.persist(&full).unwrap();
    patch(&full, &|b: &mut Vec<u8>| b.truncate(b.len() - 4));
    assert_rejected(&full);

    // header itself cut short
    patch(&full, &|b: &mut Vec<u8>| b.truncate(6));
    assert_rejected(&full);
}

/// Accepts documents, refuses queries.
struct QueryFailingEmbedder;

impl Embedder for QueryFailingEmbedder {
    fn model_id(&self) -> &str { "query-failing" }
    fn dim(&self) -> usize { 5 }
    fn embed(&self, _text: &str, task: TaskType) -> anyhow::Result<Vec<f32>> {
        anyhow::ensure!(task == TaskType::RetrievalDocument, "query embedding unavailable");
        Ok(vec![1.0; 5])
    }
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;
    fn make_writer(&'a self) -> Self::Writer { self.clone() }
}

#[test]
fn query_embedding_failure_is_logged_and_returned() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt().with_writer(logs.clone()).with_ansi(false).finish();

    let mut store = VectorStore::new(EmbeddingGateway::new(Arc::new(QueryFailingEmbedder), 10));
    store.add_documents(cat_and_dog()).unwrap();
    let result = tracing::subscriber::with_default(subscriber, || store.search("cat", 1));

    match result {
        Err(Error::Embedding(msg)) => assert!(msg.contains("query embedding unavailable"), "{msg}"),
        other => panic!("expected embedding error, got {other:?}"),
    }
    assert_eq!(store.len(), 2);
    let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(output.contains("WARN"), "{output}");
    assert!(output.contains("query embedding unavailable"), "{output}");
}
