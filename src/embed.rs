//! Text embeddings for ranking stored summaries against a question.
//!
//! [`HashingEmbedder`] is a feature-hashed bag of words: every lowercase
//! token is hashed into one of `dims` buckets with a hashed sign, and the
//! vector is L2-normalized so a dot product is a cosine similarity. It has
//! no model files and is deterministic, which keeps `ask` usable offline.

use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w+\b").expect("token regex is valid"));

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "did", "do", "does", "for", "from", "has",
    "have", "how", "in", "is", "it", "its", "of", "on", "or", "that", "the", "this", "to", "was",
    "were", "what", "when", "where", "which", "who", "why", "will", "with",
];

/// Maps text to a fixed-size vector.
pub trait Embedder {
    fn dims(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims: dims.max(1) }
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, &b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

impl Embedder for HashingEmbedder {
    fn dims(&self) -> usize {
        self.dims
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        let lowered = text.to_lowercase();
        for token in TOKEN.find_iter(&lowered).map(|m| m.as_str()) {
            if STOPWORDS.contains(&token) {
                continue;
            }
            let hash = fnv1a(token.as_bytes());
            let bucket = (hash % self.dims as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

/// Cosine similarity; 0.0 when either vector is all zeros or lengths differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_size_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let v = embedder.embed("Central bank raises interest rates");
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let v = HashingEmbedder::new(16).embed("the of and");
        assert!(v.iter().all(|x| *x == 0.0));
        assert_eq!(cosine_similarity(&v, &v), 0.0);
    }

    #[test]
    fn test_identical_text_scores_one() {
        let embedder = HashingEmbedder::new(256);
        let a = embedder.embed("Rates rise again");
        let b = embedder.embed("RATES rise, again!");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_related_text_scores_higher() {
        let embedder = HashingEmbedder::new(512);
        let question = embedder.embed("What did the central bank do with interest rates?");
        let related = embedder.embed("Central bank holds interest rates steady amid inflation");
        let unrelated = embedder.embed("Local team wins championship after overtime thriller");
        assert!(cosine_similarity(&question, &related) > cosine_similarity(&question, &unrelated));
    }

    #[test]
    fn test_mismatched_lengths() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    }
}
