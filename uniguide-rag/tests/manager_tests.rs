//! Tests for the index load-or-build lifecycle.

use async_trait::async_trait;
use uniguide_rag::{
    EmbeddingProvider, HashingEmbeddingProvider, IndexManager, IndexOrigin, KnowledgeBase,
    RagError, RecursiveChunker, SourceDocument, Tags,
};

struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> uniguide_rag::Result<Vec<f32>> {
        Err(RagError::Embedding { provider: "test".into(), message: "service unavailable".into() })
    }

    fn dimensions(&self) -> usize {
        384
    }

    fn model_id(&self) -> &str {
        "failing"
    }
}

fn knowledge(fee: &str) -> KnowledgeBase {
    let tags = Tags::from([("university".to_string(), "NUST".to_string())]);
    KnowledgeBase::new(vec![
        SourceDocument::new("nust-fees", format!("NUST tuition is PKR {fee} per semester."), tags),
        SourceDocument::new("qau-general", "QAU is in Islamabad.", Tags::new()),
    ])
}

fn chunker() -> RecursiveChunker {
    RecursiveChunker::new(600, 80)
}

#[tokio::test]
async fn builds_once_then_loads() {
    let dir = tempfile::tempdir().unwrap();
    let manager = IndexManager::new(dir.path().join("index.json"));
    let embedder = HashingEmbeddingProvider::default();
    let kb = knowledge("171,000");

    let (built, origin) = manager.build_or_load(&kb, &chunker(), &embedder).await.unwrap();
    assert_eq!(origin, IndexOrigin::Built);
    assert!(manager.path().exists());

    let (loaded, origin) = manager.build_or_load(&kb, &chunker(), &embedder).await.unwrap();
    assert_eq!(origin, IndexOrigin::Loaded);
    assert_eq!(loaded.len(), built.len());
    assert_eq!(loaded.fingerprint(), built.fingerprint());
}

#[tokio::test]
async fn changed_knowledge_triggers_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let manager = IndexManager::new(dir.path().join("index.json"));
    let embedder = HashingEmbeddingProvider::default();

    manager.build_or_load(&knowledge("171,000"), &chunker(), &embedder).await.unwrap();
    let (index, origin) =
        manager.build_or_load(&knowledge("190,000"), &chunker(), &embedder).await.unwrap();

    assert!(matches!(origin, IndexOrigin::Rebuilt { .. }), "{origin}");
    assert!(index.entries()[0].chunk.text.contains("190,000"));

    // The rebuilt index was persisted and is now current.
    let (_, origin) =
        manager.build_or_load(&knowledge("190,000"), &chunker(), &embedder).await.unwrap();
    assert_eq!(origin, IndexOrigin::Loaded);
}

#[tokio::test]
async fn changed_chunking_triggers_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let manager = IndexManager::new(dir.path().join("index.json"));
    let embedder = HashingEmbeddingProvider::default();
    let kb = knowledge("171,000");

    manager.build_or_load(&kb, &chunker(), &embedder).await.unwrap();
    let (_, origin) =
        manager.build_or_load(&kb, &RecursiveChunker::new(20, 5), &embedder).await.unwrap();
    assert!(matches!(origin, IndexOrigin::Rebuilt { .. }));
}

#[tokio::test]
async fn stale_index_is_reused_when_allowed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let embedder = HashingEmbeddingProvider::default();

    IndexManager::new(&path).build_or_load(&knowledge("171,000"), &chunker(), &embedder).await.unwrap();
    let (index, origin) = IndexManager::new(&path)
        .reuse_stale(true)
        .build_or_load(&knowledge("190,000"), &chunker(), &embedder)
        .await
        .unwrap();

    assert_eq!(origin, IndexOrigin::Loaded);
    assert!(index.entries()[0].chunk.text.contains("171,000"));
}

#[tokio::test]
async fn dimension_change_rebuilds_even_when_reusing_stale() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let kb = knowledge("171,000");

    IndexManager::new(&path)
        .build_or_load(&kb, &chunker(), &HashingEmbeddingProvider::new(384))
        .await
        .unwrap();
    let (index, origin) = IndexManager::new(&path)
        .reuse_stale(true)
        .build_or_load(&kb, &chunker(), &HashingEmbeddingProvider::new(128))
        .await
        .unwrap();

    assert!(matches!(origin, IndexOrigin::Rebuilt { .. }));
    assert_eq!(index.dimensions(), 128);
}

#[tokio::test]
async fn corrupt_file_triggers_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    std::fs::write(&path, "not json at all").unwrap();

    let manager = IndexManager::new(&path);
    let embedder = HashingEmbeddingProvider::default();
    let (index, origin) =
        manager.build_or_load(&knowledge("171,000"), &chunker(), &embedder).await.unwrap();

    assert!(matches!(origin, IndexOrigin::Rebuilt { .. }));
    assert_eq!(index.len(), 2);
    assert!(uniguide_rag::persist::load(&path).await.is_ok());
}

#[tokio::test]
async fn forced_rebuild_ignores_valid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");
    let embedder = HashingEmbeddingProvider::default();
    let kb = knowledge("171,000");

    IndexManager::new(&path).build_or_load(&kb, &chunker(), &embedder).await.unwrap();
    let (_, origin) = IndexManager::new(&path)
        .force_rebuild(true)
        .build_or_load(&kb, &chunker(), &embedder)
        .await
        .unwrap();
    assert_eq!(origin, IndexOrigin::Rebuilt { reason: "rebuild forced".into() });
}

#[tokio::test]
async fn embedding_failure_fails_startup_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("index.json");

    let result =
        IndexManager::new(&path).build_or_load(&knowledge("171,000"), &chunker(), &FailingEmbedder).await;

    assert!(matches!(result, Err(RagError::Embedding { .. })));
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}
