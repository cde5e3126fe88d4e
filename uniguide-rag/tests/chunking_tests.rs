//! Property tests for document chunking.

use proptest::prelude::*;
use uniguide_rag::chunking::reassemble;
use uniguide_rag::{Chunker, RecursiveChunker, SourceDocument, Tags};

/// Text mixing words, sentence ends, paragraph breaks and multi-byte characters.
fn arb_text() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            4 => "[a-zA-Z0-9]{1,12}",
            3 => Just(" ".to_string()),
            1 => Just(". ".to_string()),
            1 => Just("? ".to_string()),
            1 => Just("\n".to_string()),
            1 => Just("\n\n".to_string()),
            1 => "[éüßçñ漢字]{1,3}",
        ],
        0..200,
    )
    .prop_map(|parts| parts.concat())
}

fn arb_tags() -> impl Strategy<Value = Tags> {
    proptest::collection::btree_map("[a-z]{2,8}", "[A-Za-z ]{1,12}", 0..4)
}

/// `(chunk_size, chunk_overlap)` with `overlap < size`.
fn arb_params() -> impl Strategy<Value = (usize, usize)> {
    (1usize..120).prop_flat_map(|size| (Just(size), 0..size))
}

/// **Round-trip law**: concatenating the chunks and removing each
/// successor's overlap prefix reproduces the document exactly, and no chunk
/// exceeds the configured size.
mod prop_round_trip {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn reassembly_recovers_document(text in arb_text(), (size, overlap) in arb_params()) {
            let doc = SourceDocument::new("doc", text.clone(), Tags::new());
            let chunks = RecursiveChunker::new(size, overlap).chunk(&doc);

            prop_assert_eq!(chunks.is_empty(), text.is_empty());
            for chunk in &chunks {
                prop_assert!(chunk.text.chars().count() <= size);
                prop_assert!(!chunk.text.is_empty());
            }
            let rebuilt = reassemble(chunks.iter().map(|c| c.text.as_str()), overlap);
            prop_assert_eq!(rebuilt, text);
        }
    }
}

/// **Overlap law**: consecutive chunks share exactly `chunk_overlap`
/// characters.
mod prop_overlap {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn consecutive_chunks_share_overlap(text in arb_text(), (size, overlap) in arb_params()) {
            let doc = SourceDocument::new("doc", text, Tags::new());
            let chunks = RecursiveChunker::new(size, overlap).chunk(&doc);

            for pair in chunks.windows(2) {
                let left: Vec<char> = pair[0].text.chars().collect();
                let right: Vec<char> = pair[1].text.chars().collect();
                prop_assert!(left.len() >= overlap);
                prop_assert_eq!(&left[left.len() - overlap..], &right[..overlap]);
            }
        }
    }
}

/// **Metadata law**: every chunk carries its document's id and tags and a
/// sequence index matching its position.
mod prop_metadata {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn chunks_inherit_document_tags(
            text in arb_text(),
            tags in arb_tags(),
            (size, overlap) in arb_params(),
        ) {
            let doc = SourceDocument::new("nust-fees", text, tags.clone());
            let chunks = RecursiveChunker::new(size, overlap).chunk(&doc);

            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(&chunk.tags, &tags);
                prop_assert_eq!(chunk.document_id.as_str(), "nust-fees");
                prop_assert_eq!(chunk.sequence_index, i);
                prop_assert_eq!(chunk.id.clone(), format!("nust-fees_{i}"));
            }
        }
    }
}

#[test]
fn fifty_char_document_is_one_chunk() {
    let text = "QAU MPhil requires 16 years of education, 2.5 CGPA";
    assert_eq!(text.chars().count(), 50);

    let doc = SourceDocument::new("qau-mphil", text, Tags::new());
    let chunks = RecursiveChunker::new(600, 80).chunk(&doc);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].text, text);
}

#[test]
fn bundled_knowledge_base_chunks_within_bounds() {
    let knowledge = uniguide_rag::KnowledgeBase::bundled().unwrap();
    let chunker = RecursiveChunker::new(600, 80);
    let chunks = uniguide_rag::manager::chunk_all(&knowledge, &chunker);

    assert!(chunks.len() >= knowledge.len());
    assert!(chunks.iter().all(|c| c.text.chars().count() <= 600));
    assert!(chunks.iter().any(|c| c.document_id == "comsats-phd-admissions"));
}
