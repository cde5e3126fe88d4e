//! Tests for index search and persistence.

use async_trait::async_trait;
use proptest::prelude::*;
use uniguide_rag::manager::chunk_all;
use uniguide_rag::persist::{self, INDEX_FORMAT_VERSION};
use uniguide_rag::{
    Chunk, EmbeddingIndex, EmbeddingProvider, HashingEmbeddingProvider, KnowledgeBase, RagError,
    RecursiveChunker, Tags,
};

/// Embeds every text to the same vector, so every search is a full tie.
struct ConstantEmbedder;

#[async_trait]
impl EmbeddingProvider for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> uniguide_rag::Result<Vec<f32>> {
        Ok(vec![1.0, 1.0, 1.0, 1.0])
    }

    fn dimensions(&self) -> usize {
        4
    }

    fn model_id(&self) -> &str {
        "constant"
    }
}

fn chunk(n: usize) -> Chunk {
    Chunk {
        id: format!("doc_{n}"),
        document_id: "doc".into(),
        text: format!("chunk number {n}"),
        tags: Tags::new(),
        sequence_index: n,
    }
}

async fn bundled_index() -> (EmbeddingIndex, HashingEmbeddingProvider) {
    let knowledge = KnowledgeBase::bundled().unwrap();
    let chunks = chunk_all(&knowledge, &RecursiveChunker::new(600, 80));
    let embedder = HashingEmbeddingProvider::default();
    let index = EmbeddingIndex::build(chunks, &embedder, "fingerprint").await.unwrap();
    (index, embedder)
}

const SAMPLE_QUESTIONS: &[&str] = &[
    "What is the minimum CGPA for PhD at COMSATS?",
    "NUST NET entry test weightage",
    "UET Lahore ECAT merit",
    "QAU hostel fee",
    "Tell me about LUMS",
];

#[tokio::test]
async fn persisted_index_answers_like_the_freshly_built_one() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("knowledge_index.json");
    let (index, embedder) = bundled_index().await;

    persist::persist(&index, &path).await.unwrap();
    let loaded = persist::load(&path).await.unwrap();

    assert_eq!(loaded.len(), index.len());
    assert_eq!(loaded.model_id(), index.model_id());
    assert_eq!(loaded.dimensions(), index.dimensions());
    assert_eq!(loaded.fingerprint(), "fingerprint");

    for question in SAMPLE_QUESTIONS {
        let query = embedder.embed(question).await.unwrap();
        let before = index.search(&query, 5).unwrap();
        let after = loaded.search(&query, 5).unwrap();
        let ids = |r: &[uniguide_rag::SearchResult]| r.iter().map(|s| s.chunk.id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&before), ids(&after), "question {question:?}");
        for (b, a) in before.iter().zip(&after) {
            assert!((b.score - a.score).abs() < 1e-6);
            assert_eq!(b.chunk, a.chunk);
        }
    }
}

#[tokio::test]
async fn persist_leaves_no_temporary_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("knowledge_index.json");
    let (index, _) = bundled_index().await;

    persist::persist(&index, &path).await.unwrap();
    // Overwrite in place.
    persist::persist(&index, &path).await.unwrap();

    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["knowledge_index.json".to_string()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_persists_to_one_path_all_succeed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("knowledge_index.json");
    let (index, _) = bundled_index().await;
    let index = std::sync::Arc::new(index);

    let writers: Vec<_> = (0..8)
        .map(|_| {
            let index = std::sync::Arc::clone(&index);
            let path = path.clone();
            tokio::spawn(async move { persist::persist(&index, &path).await })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap().unwrap();
    }

    let loaded = persist::load(&path).await.unwrap();
    assert_eq!(loaded.len(), index.len());
    let names: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["knowledge_index.json".to_string()]);
}

#[tokio::test]
async fn load_rejects_corrupt_missing_and_foreign_files() {
    let dir = tempfile::tempdir().unwrap();

    let missing = dir.path().join("absent.json");
    assert!(matches!(persist::load(&missing).await, Err(RagError::IndexLoad { .. })));

    let corrupt = dir.path().join("corrupt.json");
    std::fs::write(&corrupt, b"{\"format_version\": 1, \"entries\": [").unwrap();
    assert!(matches!(persist::load(&corrupt).await, Err(RagError::IndexLoad { .. })));

    let future = dir.path().join("future.json");
    let body = serde_json::json!({
        "format_version": INDEX_FORMAT_VERSION + 1,
        "model_id": "m",
        "dimensions": 4,
        "fingerprint": "f",
        "entries": [],
    });
    std::fs::write(&future, body.to_string()).unwrap();
    let err = persist::load(&future).await.unwrap_err();
    assert!(err.to_string().contains("unsupported format version"), "{err}");
}

#[tokio::test]
async fn search_is_deterministic() {
    let (index, embedder) = bundled_index().await;
    let query = embedder.embed("scholarships for PhD students").await.unwrap();
    assert_eq!(index.search(&query, 5).unwrap(), index.search(&query, 5).unwrap());
}

#[tokio::test]
async fn ties_keep_insertion_order() {
    let chunks: Vec<Chunk> = (0..6).map(chunk).collect();
    let index = EmbeddingIndex::build(chunks, &ConstantEmbedder, "f").await.unwrap();

    let results = index.search(&[1.0, 1.0, 1.0, 1.0], 4).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
    assert_eq!(ids, vec!["doc_0", "doc_1", "doc_2", "doc_3"]);
}

#[tokio::test]
async fn query_of_wrong_width_is_rejected() {
    let index = EmbeddingIndex::build(vec![chunk(0)], &ConstantEmbedder, "f").await.unwrap();
    assert!(matches!(index.search(&[1.0, 0.0], 1), Err(RagError::Embedding { .. })));
}

/// **Result-count law**: `search` returns `min(k, n)` results in
/// descending score order.
mod prop_search_bounds {
    use super::*;

    fn arb_embedding() -> impl Strategy<Value = Vec<f32>> {
        proptest::collection::vec(-1.0f32..1.0f32, 8)
    }

    struct TableEmbedder(Vec<Vec<f32>>);

    #[async_trait]
    impl EmbeddingProvider for TableEmbedder {
        async fn embed(&self, text: &str) -> uniguide_rag::Result<Vec<f32>> {
            let n: usize = text.rsplit(' ').next().and_then(|s| s.parse().ok()).unwrap_or(0);
            Ok(self.0[n].clone())
        }

        fn dimensions(&self) -> usize {
            8
        }

        fn model_id(&self) -> &str {
            "table"
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn returns_min_k_n_in_descending_order(
            embeddings in proptest::collection::vec(arb_embedding(), 0..20),
            query in arb_embedding(),
            k in 0usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let n = embeddings.len();
            let chunks: Vec<Chunk> = (0..n).map(chunk).collect();
            let embedder = TableEmbedder(embeddings);
            let index = rt.block_on(EmbeddingIndex::build(chunks, &embedder, "f")).unwrap();

            let results = index.search(&query, k).unwrap();
            prop_assert_eq!(results.len(), k.min(n));
            for pair in results.windows(2) {
                prop_assert!(pair[0].score >= pair[1].score);
            }
        }
    }
}
