//! Document chunking.
//!
//! [`RecursiveChunker`] cuts a document into overlapping windows of at most
//! `chunk_size` characters. Each cut is placed at the most natural boundary
//! available inside the window: a paragraph break, then a sentence end, then
//! whitespace, and only as a last resort mid-word.
//!
//! Windows overlap by exactly `chunk_overlap` characters, so the document is
//! recovered losslessly with [`reassemble`].

use crate::config::RagConfig;
use crate::document::{Chunk, SourceDocument};

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty content.
    fn chunk(&self, document: &SourceDocument) -> Vec<Chunk>;
}

/// Splits text at paragraph → sentence → whitespace boundaries with overlap.
///
/// All lengths are counted in characters, never bytes, so multi-byte text is
/// never split inside a code point.
///
/// # Example
///
/// ```rust,ignore
/// use uniguide_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(600, 80);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// `chunk_size` is raised to at least 1 and `chunk_overlap` is clamped
    /// below `chunk_size`; use [`RagConfig::builder`] to reject such values
    /// instead.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self { chunk_size, chunk_overlap: chunk_overlap.min(chunk_size - 1) }
    }

    /// Create a chunker from the chunking parameters of a [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Maximum chunk length in characters.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &SourceDocument) -> Vec<Chunk> {
        split_windows(&document.content, self.chunk_size, self.chunk_overlap)
            .into_iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                id: format!("{}_{i}", document.id),
                document_id: document.id.clone(),
                text,
                tags: document.tags.clone(),
                sequence_index: i,
            })
            .collect()
    }
}

/// Split `text` into windows of at most `size` characters, each sharing
/// exactly `overlap` characters with its successor.
///
/// Requires `overlap < size`.
fn split_windows(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len == 0 {
        return Vec::new();
    }
    if len <= size {
        return vec![text.to_string()];
    }

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let hard_end = start + size;
        if hard_end >= len {
            windows.push(chars[start..].iter().collect());
            break;
        }

        // Cut strictly after `start + overlap` so the next window advances.
        let end = find_cut(&chars, start + overlap, hard_end);
        windows.push(chars[start..end].iter().collect());
        start = end - overlap;
    }

    windows
}

/// Pick the cut position in `(lo, hi]`, preferring the last paragraph break,
/// then the last sentence end, then the last whitespace, then `hi`.
///
/// A cut at `p` ends the window just after `chars[p - 1]`.
fn find_cut(chars: &[char], lo: usize, hi: usize) -> usize {
    let is_paragraph = |p: usize| p >= 2 && chars[p - 2] == '\n' && chars[p - 1] == '\n';
    let is_sentence = |p: usize| {
        chars[p - 1] == '\n' || (p >= 2 && matches!(chars[p - 2], '.' | '!' | '?') && chars[p - 1] == ' ')
    };
    let is_space = |p: usize| chars[p - 1].is_whitespace();

    let candidates = || (lo + 1..=hi).rev();
    candidates()
        .find(|&p| is_paragraph(p))
        .or_else(|| candidates().find(|&p| is_sentence(p)))
        .or_else(|| candidates().find(|&p| is_space(p)))
        .unwrap_or(hi)
}

/// Rebuild the original text from consecutive chunk texts by dropping the
/// first `overlap` characters of every chunk after the first.
pub fn reassemble<'a>(texts: impl IntoIterator<Item = &'a str>, overlap: usize) -> String {
    let mut out = String::new();
    for (i, text) in texts.into_iter().enumerate() {
        if i == 0 {
            out.push_str(text);
        } else {
            out.extend(text.chars().skip(overlap));
        }
    }
    out
}
