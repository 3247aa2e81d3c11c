//! Lexical embeddings and cosine similarity
//!
//! A deliberately cheap proxy for semantic search: whitespace-tokenized
//! term frequencies plus a precomputed magnitude. No model, no network.
//! Similarity is cosine restricted to the shared vocabulary, guarded so
//! disjoint vocabularies score exactly 0 rather than NaN.

use std::collections::HashMap;

use super::chunker::Chunk;

/// Sparse bag-of-words vector. Derived data, always regenerable from the
/// text it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub terms: HashMap<String, f32>,
    pub magnitude: f32,
}

impl Embedding {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Build an embedding from raw text.
pub fn embed(text: &str) -> Embedding {
    let mut terms: HashMap<String, f32> = HashMap::new();
    for word in text.to_lowercase().split_whitespace() {
        *terms.entry(word.to_string()).or_insert(0.0) += 1.0;
    }
    finish(terms)
}

/// Build an embedding from a chunk, folding in its extracted metadata:
/// function/class names and the purpose tag are weighted into the
/// vocabulary so structural queries match even when the raw text is terse.
pub fn embed_chunk(chunk: &Chunk) -> Embedding {
    let mut terms: HashMap<String, f32> = HashMap::new();
    for word in chunk.content.to_lowercase().split_whitespace() {
        *terms.entry(word.to_string()).or_insert(0.0) += 1.0;
    }
    for name in chunk.functions.iter().chain(chunk.classes.iter()) {
        *terms.entry(name.to_lowercase()).or_insert(0.0) += 2.0;
    }
    if let Some(purpose) = chunk.purpose {
        *terms.entry(purpose.to_string()).or_insert(0.0) += 3.0;
    }
    finish(terms)
}

fn finish(terms: HashMap<String, f32>) -> Embedding {
    let magnitude = terms.values().map(|f| f * f).sum::<f32>().sqrt();
    Embedding { terms, magnitude }
}

/// Cosine similarity over the intersection of the two vocabularies.
/// Exactly 0.0 when there is no shared term or either vector is empty.
pub fn similarity(a: &Embedding, b: &Embedding) -> f32 {
    if a.magnitude == 0.0 || b.magnitude == 0.0 {
        return 0.0;
    }

    let (small, large) = if a.terms.len() <= b.terms.len() {
        (a, b)
    } else {
        (b, a)
    };

    let mut dot = 0.0;
    for (term, freq) in &small.terms {
        if let Some(other) = large.terms.get(term) {
            dot += freq * other;
        }
    }

    if dot == 0.0 {
        return 0.0;
    }
    dot / (a.magnitude * b.magnitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_scores_one() {
        let a = embed("open the file reader");
        let sim = similarity(&a, &a);
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_disjoint_vocabulary_scores_zero() {
        let a = embed("alpha beta gamma");
        let b = embed("delta epsilon zeta");
        assert_eq!(similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_empty_text_scores_zero_not_nan() {
        let a = embed("");
        let b = embed("something");
        let sim = similarity(&a, &b);
        assert_eq!(sim, 0.0);
        assert!(!sim.is_nan());
    }

    #[test]
    fn test_overlap_ranks_higher() {
        let query = embed("parse json response");
        let close = embed("fn parse json response body");
        let far = embed("draw pixel buffer");
        assert!(similarity(&query, &close) > similarity(&query, &far));
    }

    #[test]
    fn test_tokenization_is_case_insensitive() {
        let a = embed("Parse JSON");
        let b = embed("parse json");
        assert!((similarity(&a, &b) - 1.0).abs() < 1e-5);
    }
}
