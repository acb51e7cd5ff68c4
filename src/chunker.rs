//! Boundary-aware splitting of article bodies into bounded chunks.
//!
//! The chunker works on whitespace-separated words so that joining the
//! chunks of an article with single spaces gives back the original text
//! with its whitespace normalized. Boundaries are chosen in this order of
//! preference:
//!
//! 1. paragraph ends (blank lines), once the chunk is at least half full
//! 2. sentence ends (`.`, `!`, `?`, possibly followed by closing quotes or brackets)
//! 3. word boundaries, only for a sentence that alone exceeds the limit
//! 4. character boundaries, only for a single word longer than a character limit

use crate::models::ArticleChunk;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph break pattern is valid"));

const CLOSERS: &[char] = &['"', '\'', '”', '’', ')', ']', '»'];

/// Unit in which chunk sizes are measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkUnit {
    /// Whitespace-separated words, a cheap stand-in for model tokens.
    Words,
    /// Unicode scalar values.
    Chars,
}

/// Maximum size of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLimit {
    pub unit: ChunkUnit,
    pub max: usize,
}

impl ChunkLimit {
    pub const fn words(max: usize) -> Self {
        Self {
            unit: ChunkUnit::Words,
            max,
        }
    }

    pub const fn chars(max: usize) -> Self {
        Self {
            unit: ChunkUnit::Chars,
            max,
        }
    }

    /// Size of `text` in this limit's unit.
    pub fn measure(&self, text: &str) -> usize {
        match self.unit {
            ChunkUnit::Words => text.split_whitespace().count(),
            ChunkUnit::Chars => text.chars().count(),
        }
    }

    /// Size added by the space that joins two pieces.
    fn separator(&self) -> usize {
        match self.unit {
            ChunkUnit::Words => 0,
            ChunkUnit::Chars => 1,
        }
    }
}

/// Collapse every run of whitespace into a single space and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug)]
struct Piece {
    text: String,
    len: usize,
    ends_paragraph: bool,
}

/// Splits text into [`ArticleChunk`]s no larger than a [`ChunkLimit`].
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    limit: ChunkLimit,
}

impl Chunker {
    /// A limit of zero is treated as one.
    pub fn new(limit: ChunkLimit) -> Self {
        Self {
            limit: ChunkLimit {
                unit: limit.unit,
                max: limit.max.max(1),
            },
        }
    }

    /// Split `text` into ordered chunks tagged with `article_ref`.
    #[instrument(level = "debug", skip(self, text), fields(bytes = text.len()))]
    pub fn chunk(&self, article_ref: &str, text: &str) -> Vec<ArticleChunk> {
        let chunks: Vec<ArticleChunk> = self
            .pack(self.pieces(text))
            .into_iter()
            .enumerate()
            .map(|(chunk_index, text)| ArticleChunk {
                article_ref: article_ref.to_string(),
                chunk_index,
                text,
            })
            .collect();
        debug!(count = chunks.len(), "Chunked article text");
        chunks
    }

    /// Break text into sentence pieces, each already within the limit.
    fn pieces(&self, text: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();
        for paragraph in PARAGRAPH_BREAK.split(text) {
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            let mut sentence: Vec<&str> = Vec::new();
            for (i, word) in words.iter().copied().enumerate() {
                sentence.push(word);
                let last_in_paragraph = i + 1 == words.len();
                if last_in_paragraph || ends_sentence(word) {
                    self.push_sentence(&mut pieces, &sentence, last_in_paragraph);
                    sentence.clear();
                }
            }
        }
        pieces
    }

    fn push_sentence(&self, pieces: &mut Vec<Piece>, words: &[&str], ends_paragraph: bool) {
        let text = words.join(" ");
        let len = self.limit.measure(&text);
        if len <= self.limit.max {
            pieces.push(Piece {
                text,
                len,
                ends_paragraph,
            });
            return;
        }

        // Oversized sentence: fall back to word boundaries.
        let start = pieces.len();
        let mut current: Vec<&str> = Vec::new();
        let mut current_len = 0;
        for &word in words {
            let word_len = self.limit.measure(word);
            if word_len > self.limit.max {
                self.flush_words(pieces, &mut current, &mut current_len);
                self.push_hard_split(pieces, word);
                continue;
            }
            let joined = if current.is_empty() {
                word_len
            } else {
                current_len + self.limit.separator() + word_len
            };
            if joined > self.limit.max {
                self.flush_words(pieces, &mut current, &mut current_len);
                current_len = word_len;
            } else {
                current_len = joined;
            }
            current.push(word);
        }
        self.flush_words(pieces, &mut current, &mut current_len);
        if ends_paragraph && pieces.len() > start {
            if let Some(last) = pieces.last_mut() {
                last.ends_paragraph = true;
            }
        }
    }

    fn flush_words(&self, pieces: &mut Vec<Piece>, current: &mut Vec<&str>, current_len: &mut usize) {
        if current.is_empty() {
            return;
        }
        pieces.push(Piece {
            text: current.join(" "),
            len: *current_len,
            ends_paragraph: false,
        });
        current.clear();
        *current_len = 0;
    }

    /// Split a single word at character boundaries.
    fn push_hard_split(&self, pieces: &mut Vec<Piece>, word: &str) {
        let chars: Vec<char> = word.chars().collect();
        for part in chars.chunks(self.limit.max) {
            let text: String = part.iter().collect();
            pieces.push(Piece {
                len: self.limit.measure(&text),
                text,
                ends_paragraph: false,
            });
        }
    }

    /// Greedily pack pieces into chunks.
    fn pack(&self, pieces: Vec<Piece>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0;

        for piece in pieces {
            if !current.is_empty() {
                let joined = current_len + self.limit.separator() + piece.len;
                if joined <= self.limit.max {
                    current.push(' ');
                    current.push_str(&piece.text);
                    current_len = joined;
                } else {
                    chunks.push(std::mem::take(&mut current));
                    current = piece.text;
                    current_len = piece.len;
                }
            } else {
                current = piece.text;
                current_len = piece.len;
            }

            if piece.ends_paragraph && current_len * 2 >= self.limit.max {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
        chunks
    }
}

fn ends_sentence(word: &str) -> bool {
    word.trim_end_matches(CLOSERS)
        .ends_with(['.', '!', '?'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(chunks: &[ArticleChunk]) -> Vec<&str> {
        chunks.iter().map(|c| c.text.as_str()).collect()
    }

    fn sentence(n_words: usize, tag: usize) -> String {
        let mut words: Vec<String> = (0..n_words - 1).map(|i| format!("w{tag}_{i}")).collect();
        words.push(format!("end{tag}."));
        words.join(" ")
    }

    fn sample_article() -> String {
        let mut paragraphs = Vec::new();
        for p in 0..7 {
            let sentences: Vec<String> = (0..(p % 4 + 2))
                .map(|s| sentence(5 + (p * 7 + s * 3) % 23, p * 10 + s))
                .collect();
            paragraphs.push(sentences.join("  "));
        }
        paragraphs.join("\n\n\t \n")
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        let chunker = Chunker::new(ChunkLimit::words(10));
        assert!(chunker.chunk("a", "").is_empty());
        assert!(chunker.chunk("a", "  \n\n \t ").is_empty());
    }

    #[test]
    fn test_thousand_words_into_four_chunks() {
        let text: Vec<String> = (0..100).map(|i| sentence(10, i)).collect();
        let text = text.join(" ");
        assert_eq!(text.split_whitespace().count(), 1000);

        let chunks = Chunker::new(ChunkLimit::words(250)).chunk("https://a.example/x", &text);
        assert_eq!(chunks.len(), 4);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i);
            assert_eq!(chunk.article_ref, "https://a.example/x");
            assert!(chunk.text.split_whitespace().count() <= 250);
            assert!(chunk.text.ends_with('.'));
        }
    }

    #[test]
    fn test_round_trip_is_whitespace_normalized_original() {
        let text = sample_article();
        for limit in [
            ChunkLimit::words(12),
            ChunkLimit::words(40),
            ChunkLimit::chars(90),
            ChunkLimit::chars(400),
        ] {
            let chunks = Chunker::new(limit).chunk("a", &text);
            assert_eq!(texts(&chunks).join(" "), normalize_whitespace(&text), "{limit:?}");
        }
    }

    #[test]
    fn test_every_chunk_within_limit() {
        let text = sample_article();
        for limit in [ChunkLimit::words(7), ChunkLimit::words(33), ChunkLimit::chars(60)] {
            for chunk in Chunker::new(limit).chunk("a", &text) {
                assert!(limit.measure(&chunk.text) <= limit.max, "{limit:?}: {}", chunk.text);
            }
        }
    }

    #[test]
    fn test_prefers_sentence_boundaries() {
        let text = "One two three. Four five six. Seven eight nine.";
        let chunks = Chunker::new(ChunkLimit::words(7)).chunk("a", text);
        assert_eq!(
            texts(&chunks),
            vec!["One two three. Four five six.", "Seven eight nine."]
        );
    }

    #[test]
    fn test_prefers_paragraph_boundaries_when_half_full() {
        let text = "A b c d e f.\n\nG h i. J k l.";
        let chunks = Chunker::new(ChunkLimit::words(10)).chunk("a", text);
        assert_eq!(texts(&chunks), vec!["A b c d e f.", "G h i. J k l."]);
    }

    #[test]
    fn test_small_paragraphs_are_merged() {
        let text = "Short one.\n\nShort two.\n\nShort three.";
        let chunks = Chunker::new(ChunkLimit::words(10)).chunk("a", text);
        assert_eq!(texts(&chunks), vec!["Short one. Short two. Short three."]);
    }

    #[test]
    fn test_closing_quotes_end_sentences() {
        let text = "He said \"stop.\" Then left (quietly.) Done now";
        let chunks = Chunker::new(ChunkLimit::words(4)).chunk("a", text);
        assert_eq!(
            texts(&chunks),
            vec!["He said \"stop.\"", "Then left (quietly.)", "Done now"]
        );
    }

    #[test]
    fn test_oversized_sentence_splits_on_words() {
        let text = "a b c d e f g h i j k";
        let chunks = Chunker::new(ChunkLimit::words(4)).chunk("a", text);
        assert_eq!(texts(&chunks), vec!["a b c d", "e f g h", "i j k"]);
    }

    #[test]
    fn test_oversized_word_splits_on_chars() {
        let text = "tiny supercalifragilistic word.";
        let chunks = Chunker::new(ChunkLimit::chars(8)).chunk("a", text);
        assert_eq!(
            texts(&chunks),
            vec!["tiny", "supercal", "ifragili", "stic", "word."]
        );
        assert!(chunks.iter().all(|c| c.text.chars().count() <= 8));
    }

    #[test]
    fn test_multibyte_chars_measured_by_scalar() {
        let text = "Café déjà vu. Ça va très bien.";
        let chunks = Chunker::new(ChunkLimit::chars(14)).chunk("a", text);
        assert_eq!(texts(&chunks), vec!["Café déjà vu.", "Ça va très", "bien."]);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let chunker = Chunker::new(ChunkLimit::words(0));
        assert_eq!(chunker.chunk("a", "x y").len(), 2);
    }
}
