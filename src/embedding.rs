//! Embedding seam for the semantic index.
//!
//! The index only requires `embed(text) -> fixed-length vector` with the
//! guarantee that identical input yields identical output. Index and
//! query vectors are never comparable across different embedders, so the
//! index persists the embedder's `id()` and checks it on load.

use std::hash::Hasher;

use twox_hash::XxHash64;

/// Default dimensionality of the feature-hashing embedder.
pub const DEFAULT_DIMENSION: usize = 256;

/// Deterministic text-to-vector embedding.
pub trait Embedder: Send + Sync {
    /// Identifies the embedding function and its parameters. Persisted
    /// with the index; a mismatch on load means the index is unusable.
    fn id(&self) -> String;

    fn dimension(&self) -> usize;

    /// Embed one text. Must be deterministic for identical input.
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Feature-hashing embedder: word unigrams and bigrams hashed into a
/// fixed-size L2-normalized vector.
///
/// Fully offline and deterministic. Captures lexical overlap (shared
/// words and word pairs score high cosine similarity) rather than learned
/// semantics; a model-backed [`Embedder`] can replace it behind the same
/// trait without touching the index.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        assert!(dimension > 0, "embedding dimension must be positive");
        Self { dimension }
    }

    fn bump(&self, vector: &mut [f32], token: &str) {
        let mut hasher = XxHash64::with_seed(0);
        hasher.write(token.as_bytes());
        let h = hasher.finish();

        let idx = (h % self.dimension as u64) as usize;
        // Sign from an independent bit keeps the expected dot product of
        // unrelated texts near zero.
        let sign = if h & (1 << 63) == 0 { 1.0 } else { -1.0 };
        vector[idx] += sign;
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> String {
        format!("hash-v1:d{}", self.dimension)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimension];

        let words: Vec<String> = text
            .split_whitespace()
            .map(|w| {
                w.trim_matches(|c: char| !c.is_alphanumeric())
                    .to_lowercase()
            })
            .filter(|w| !w.is_empty())
            .collect();

        for word in &words {
            self.bump(&mut vector, word);
        }
        for pair in words.windows(2) {
            self.bump(&mut vector, &format!("{} {}", pair[0], pair[1]));
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }

        vector
    }
}

/// Cosine similarity between two vectors of equal length.
///
/// Vectors from [`HashEmbedder`] are unit-length, so this reduces to a
/// dot product, but the general form keeps the contract embedder-agnostic.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_identical_input() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("machine learning uses data");
        let b = embedder.embed("machine learning uses data");
        assert_eq!(a, b);
    }

    #[test]
    fn output_has_fixed_dimension() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.embed("short").len(), 64);
        assert_eq!(embedder.embed(&"long text ".repeat(100)).len(), 64);
    }

    #[test]
    fn vectors_are_unit_length() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed("some text to embed here");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn empty_text_embeds_to_zero_vector() {
        let embedder = HashEmbedder::default();
        let v = embedder.embed("");
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn similar_texts_score_higher_than_unrelated() {
        let embedder = HashEmbedder::default();
        let q = embedder.embed("what does machine learning use");
        let related = embedder.embed("machine learning uses training data");
        let unrelated = embedder.embed("boil the pasta in salted water");

        assert!(
            cosine_similarity(&q, &related) > cosine_similarity(&q, &unrelated)
        );
    }

    #[test]
    fn embedding_ignores_case_and_punctuation() {
        let embedder = HashEmbedder::default();
        let a = embedder.embed("Machine Learning!");
        let b = embedder.embed("machine learning");
        assert_eq!(a, b);
    }

    #[test]
    fn id_encodes_dimension() {
        assert_eq!(HashEmbedder::new(128).id(), "hash-v1:d128");
    }

    #[test]
    fn cosine_identical_is_one() {
        let v = vec![0.6, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_is_zero() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        let a = vec![0.0, 0.0];
        let b = vec![1.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }
}
