use anyhow::Result;
use text_splitter::{ChunkConfig, TextSplitter};

pub const DEFAULT_CHUNK_SIZE: usize = 1000; // characters
pub const DEFAULT_CHUNK_OVERLAP: usize = 200; // characters

/// Splits `text` into overlapping windows of at most `chunk_size` characters.
///
/// Breaks on the largest semantic boundary that fits (paragraphs, line breaks,
/// sentences, words) before falling back to hard character cuts. Empty or
/// whitespace-only text yields no chunks.
pub fn split(text: &str, chunk_size: usize, overlap: usize) -> Result<Vec<String>> {
    let splitter = TextSplitter::new(ChunkConfig::new(chunk_size).with_overlap(overlap)?);
    Ok(splitter.chunks(text).map(|s| s.to_string()).collect())
}
