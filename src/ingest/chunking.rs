//! Deterministic fixed-window chunking of extracted text.

use thiserror::Error;

/// Default chunk window, in characters, when no override is configured.
pub const DEFAULT_CHUNK_WINDOW: usize = 1000;

/// Errors raised while chunking extracted text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// The configured window size was zero.
    #[error("chunk window must be at least one character")]
    InvalidWindow,
}

/// Split `content` into consecutive windows of at most `window` characters.
///
/// Windows are counted in characters, not bytes, so multibyte text never splits
/// inside a code point. Empty input yields no chunks; concatenating the output
/// reproduces the input exactly.
pub fn chunk_text(content: &str, window: usize) -> Result<Vec<String>, ChunkingError> {
    if window == 0 {
        return Err(ChunkingError::InvalidWindow);
    }
    if content.is_empty() {
        return Ok(Vec::new());
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0usize;

    for ch in content.chars() {
        current.push(ch);
        count += 1;
        if count == window {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    Ok(chunks)
}
