use crate::models::IngestionOptions;
use std::ops::Range;

/// Window size and overlap, both counted in whitespace-separated tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl ChunkingConfig {
    /// Distance between consecutive window starts. Never zero, so chunking always advances
    /// even when the overlap is not smaller than the size.
    pub fn step(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

impl From<&IngestionOptions> for ChunkingConfig {
    fn from(value: &IngestionOptions) -> Self {
        Self {
            chunk_size: value.chunk_size,
            chunk_overlap: value.chunk_overlap,
        }
    }
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token ranges of every window over `token_count` tokens.
///
/// Windows start at `0, step, 2*step, ...` while the start is inside the sequence and
/// hold up to `chunk_size` tokens. No window is ever empty.
pub fn chunk_windows(
    token_count: usize,
    config: ChunkingConfig,
) -> impl Iterator<Item = Range<usize>> {
    let size = config.chunk_size;
    (0..token_count)
        .step_by(config.step())
        .map(move |start| start..(start + size).min(token_count))
        .filter(|window| !window.is_empty())
}

pub fn chunk_text(text: &str, config: ChunkingConfig) -> Vec<String> {
    let normalized = normalize_whitespace(text);
    if normalized.is_empty() {
        return Vec::new();
    }

    let tokens: Vec<&str> = normalized.split(' ').collect();
    chunk_windows(tokens.len(), config)
        .map(|window| tokens[window].join(" "))
        .collect()
}
