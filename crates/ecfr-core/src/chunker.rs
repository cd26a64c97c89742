//! Sentence-aware sliding-window chunking.
//!
//! Sentences are accumulated greedily until the next one would push the
//! buffer past `chunk_size` characters. The closed chunk's trailing
//! `chunk_overlap / 10` words seed the next buffer. Sentences are never cut,
//! so a single sentence longer than `chunk_size` becomes its own chunk.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::PipelineConfig;
use crate::types::{Chunk, SectionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self { chunk_size: 512, chunk_overlap: 128 }
    }
}

impl Chunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size: chunk_size.max(1), chunk_overlap }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize { self.chunk_size }

    pub fn chunk_overlap(&self) -> usize { self.chunk_overlap }

    /// Number of trailing words carried into the next chunk.
    pub fn overlap_words(&self) -> usize { self.chunk_overlap / 10 }

    /// Chunks for every section, in section order.
    pub fn chunk_corpus(&self, sections: &[SectionRecord]) -> Vec<Chunk> {
        let chunks: Vec<Chunk> = sections.iter().flat_map(|s| self.chunk_section(s)).collect();
        tracing::info!("Extracted {} text chunks from {} sections", chunks.len(), sections.len());
        chunks
    }

    pub fn chunk_section(&self, section: &SectionRecord) -> Vec<Chunk> {
        self.split_text(&section.content)
            .into_iter()
            .map(|text| Chunk::from_section(section, text))
            .collect()
    }

    /// Core windowing over raw text; returned strings are trimmed and non-empty.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut buffer = String::new();
        let mut buffer_len = 0usize;

        for sentence in split_sentences(text) {
            let sentence_len = sentence.chars().count();
            if !buffer.is_empty() && buffer_len + 1 + sentence_len > self.chunk_size {
                let seed = self.overlap_seed(&buffer, sentence_len);
                chunks.push(std::mem::replace(&mut buffer, seed));
                buffer_len = buffer.chars().count();
            }
            if !buffer.is_empty() {
                buffer.push(' ');
                buffer_len += 1;
            }
            buffer.push_str(sentence);
            buffer_len += sentence_len;
        }

        if !buffer.trim().is_empty() {
            chunks.push(buffer);
        }
        chunks
    }

    /// Trailing words of `closed`, shortened from the front until the seed and
    /// the incoming sentence fit in one chunk.
    fn overlap_seed(&self, closed: &str, sentence_len: usize) -> String {
        let words: Vec<&str> = closed.split_whitespace().collect();
        let take = self.overlap_words().min(words.len());
        let mut tail = &words[words.len() - take..];
        while !tail.is_empty() && joined_len(tail) + 1 + sentence_len > self.chunk_size {
            tail = &tail[1..];
        }
        tail.join(" ")
    }
}

/// UAX #29 sentence segmentation; whitespace-only pieces are dropped.
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split_sentence_bounds()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn joined_len(words: &[&str]) -> usize {
    words.iter().map(|w| w.chars().count()).sum::<usize>() + words.len().saturating_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_len_counts_separators() {
        assert_eq!(joined_len(&[]), 0);
        assert_eq!(joined_len(&["ab"]), 2);
        assert_eq!(joined_len(&["ab", "cde"]), 6);
    }

    #[test]
    fn overlap_seed_shrinks_to_fit() {
        let chunker = Chunker::new(20, 30);
        // 3 overlap words requested, but only "five" fits next to a 14-char sentence.
        let seed = chunker.overlap_seed("one two three four five", 14);
        assert_eq!(seed, "five");
        assert_eq!(chunker.overlap_seed("one two", 19), "");
    }

    #[test]
    fn sentences_split_on_terminal_punctuation() {
        let s = split_sentences("First rule applies. Second rule? Third!\n\nFourth");
        assert_eq!(s, vec!["First rule applies.", "Second rule?", "Third!", "Fourth"]);
    }
}
