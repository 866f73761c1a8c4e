//! Fixed-size overlapping text chunking.
//!
//! Boundaries are character-offset based, not sentence aware; the overlap
//! exists purely to soften information loss at arbitrary cut points.

use crate::core::errors::RagError;

#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    size: usize,
    overlap: usize,
}

impl Chunker {
    /// Create a chunker.
    ///
    /// Rejects `size == 0` and `overlap >= size` eagerly: the cursor advances
    /// by `size - overlap` each step, so either misconfiguration would make
    /// chunking loop forever.
    pub fn new(size: usize, overlap: usize) -> Result<Self, RagError> {
        if size == 0 {
            return Err(RagError::Config("chunk size must be positive".to_string()));
        }
        if overlap >= size {
            return Err(RagError::Config(format!(
                "chunk overlap ({overlap}) must be smaller than chunk size ({size})"
            )));
        }
        Ok(Self { size, overlap })
    }

    /// Split `text` into trimmed, overlapping chunks.
    ///
    /// Whitespace-only spans are dropped; text shorter than the chunk size
    /// yields at most one chunk.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let total = chars.len();
        let step = self.size - self.overlap;

        let mut chunks = Vec::new();
        let mut start = 0;

        while start < total {
            let end = (start + self.size).min(total);
            let span: String = chars[start..end].iter().collect();
            let trimmed = span.trim();
            if !trimmed.is_empty() {
                chunks.push(trimmed.to_string());
            }
            start += step;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlapping_chunks_at_fixed_offsets() {
        // 19 chars, size 10, overlap 4: cursor positions 0, 6, 12, 18.
        let chunker = Chunker::new(10, 4).unwrap();
        let chunks = chunker.chunk("AAAA BBBB CCCC DDDD");
        assert_eq!(chunks, vec!["AAAA BBBB", "BBB CCCC D", "CC DDDD", "D"]);
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(Chunker::new(10, 10), Err(RagError::Config(_))));
        assert!(matches!(Chunker::new(10, 15), Err(RagError::Config(_))));
        assert!(matches!(Chunker::new(0, 0), Err(RagError::Config(_))));
    }

    #[test]
    fn short_text_yields_single_chunk() {
        let chunker = Chunker::new(100, 10).unwrap();
        assert_eq!(chunker.chunk("tiny"), vec!["tiny"]);
    }

    #[test]
    fn whitespace_only_spans_are_dropped() {
        let chunker = Chunker::new(4, 0).unwrap();
        // "ab" + 6 spaces + "cd": the middle span trims to nothing.
        let chunks = chunker.chunk("ab        cd");
        assert_eq!(chunks, vec!["ab", "cd"]);
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        let chunker = Chunker::new(10, 2).unwrap();
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\t  ").is_empty());
    }

    #[test]
    fn every_character_is_covered_by_some_chunk() {
        // With no whitespace nothing trims away, so the chunks must tile the
        // text: successive chunks share exactly `overlap` characters.
        let text: String = ('a'..='z').cycle().take(103).collect();
        let chunker = Chunker::new(10, 4).unwrap();
        let chunks = chunker.chunk(&text);

        let mut reconstructed = chunks[0].clone();
        for chunk in &chunks[1..] {
            let keep = chunk.len().min(4);
            reconstructed.push_str(&chunk[keep..]);
        }
        assert!(text.starts_with(&reconstructed));
        assert!(text.len() - reconstructed.len() < 10);

        // The final chunk must reach the end of the text.
        assert!(text.ends_with(chunks.last().unwrap()));
    }

    #[test]
    fn zero_overlap_partitions_text() {
        let chunker = Chunker::new(5, 0).unwrap();
        let chunks = chunker.chunk("abcdefghij");
        assert_eq!(chunks, vec!["abcde", "fghij"]);
    }
}
