//! TF-IDF relevance index over a document's chunk sequence.
//!
//! Fits a vocabulary and smoothed inverse-document-frequency weighting
//! across the chunks, keeps one L2-normalized sparse weight vector per
//! chunk, and answers top-K queries by cosine similarity. Query terms
//! outside the fitted vocabulary contribute zero weight and are silently
//! dropped — a known precision limitation of lexical retrieval, accepted
//! for its simplicity and lack of any network dependency.
//!
//! Weighting matches the scikit-learn `TfidfVectorizer` defaults the
//! original prototype used: word tokens of two or more alphanumeric
//! characters, raw term counts, `idf = ln((1+n)/(1+df)) + 1`, and L2
//! normalization of each vector.

use std::collections::HashMap;

use crate::error::ChatError;
use crate::models::Chunk;

/// Chunk index paired with its cosine similarity against a query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredChunk {
    pub index: usize,
    pub score: f64,
}

/// Fitted term-weighting model plus per-chunk weight vectors.
///
/// An index is only ever built from a complete chunk sequence and is
/// replaced together with it; it holds no chunk text of its own.
#[derive(Debug, Clone)]
pub struct RelevanceIndex {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    /// One sparse `(term_id, weight)` vector per chunk, term ids ascending,
    /// L2-normalized.
    chunk_vectors: Vec<Vec<(usize, f64)>>,
}

impl RelevanceIndex {
    /// Fit the vocabulary and IDF weights over `chunks` and vectorize each one.
    ///
    /// Fails with [`ChatError::InsufficientData`] when `chunks` is empty.
    pub fn fit(chunks: &[Chunk]) -> Result<Self, ChatError> {
        if chunks.is_empty() {
            return Err(ChatError::InsufficientData);
        }

        let token_lists: Vec<Vec<String>> =
            chunks.iter().map(|c| tokenize(&c.text)).collect();

        // Vocabulary ids in first-seen order; document frequency per term.
        let mut vocabulary: HashMap<String, usize> = HashMap::new();
        let mut doc_freq: Vec<usize> = Vec::new();
        for tokens in &token_lists {
            let mut seen_ids: Vec<usize> = Vec::new();
            for token in tokens {
                let next_id = vocabulary.len();
                let id = *vocabulary.entry(token.clone()).or_insert(next_id);
                if id == doc_freq.len() {
                    doc_freq.push(0);
                }
                if !seen_ids.contains(&id) {
                    seen_ids.push(id);
                    doc_freq[id] += 1;
                }
            }
        }

        let n = chunks.len() as f64;
        let idf: Vec<f64> = doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        let chunk_vectors = token_lists
            .iter()
            .map(|tokens| vectorize(tokens, &vocabulary, &idf))
            .collect();

        Ok(Self {
            vocabulary,
            idf,
            chunk_vectors,
        })
    }

    /// Score every chunk against `query` and return the top `k`, ordered by
    /// descending similarity with ties broken by lower chunk index. If `k`
    /// exceeds the chunk count, all chunks are returned.
    pub fn query(&self, query: &str, k: usize) -> Vec<ScoredChunk> {
        let query_vec = vectorize(&tokenize(query), &self.vocabulary, &self.idf);

        let mut scored: Vec<ScoredChunk> = self
            .chunk_vectors
            .iter()
            .enumerate()
            .map(|(index, chunk_vec)| ScoredChunk {
                index,
                score: sparse_dot(&query_vec, chunk_vec),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        scored.truncate(k);
        scored
    }

    /// Number of chunks the index was fitted over.
    pub fn len(&self) -> usize {
        self.chunk_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_vectors.is_empty()
    }
}

/// Lowercased word tokens of two or more alphanumeric/underscore chars.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| t.chars().count() >= 2)
        .map(|t| t.to_lowercase())
        .collect()
}

/// Build an L2-normalized sparse TF-IDF vector for `tokens` under an
/// existing vocabulary. Unknown tokens are dropped.
fn vectorize(
    tokens: &[String],
    vocabulary: &HashMap<String, usize>,
    idf: &[f64],
) -> Vec<(usize, f64)> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for token in tokens {
        if let Some(&id) = vocabulary.get(token) {
            *counts.entry(id).or_insert(0) += 1;
        }
    }

    let mut weights: Vec<(usize, f64)> = counts
        .into_iter()
        .map(|(id, tf)| (id, tf as f64 * idf[id]))
        .collect();
    weights.sort_by_key(|&(id, _)| id);

    let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
    if norm > 0.0 {
        for (_, w) in &mut weights {
            *w /= norm;
        }
    }
    weights
}

/// Dot product of two sparse vectors with ascending term ids. Both sides
/// are unit-length, so this is the cosine similarity.
fn sparse_dot(a: &[(usize, f64)], b: &[(usize, f64)]) -> f64 {
    let mut sum = 0.0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<Chunk> {
        texts
            .iter()
            .enumerate()
            .map(|(index, t)| Chunk {
                index,
                text: t.to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_chunks_cannot_be_fitted() {
        let err = RelevanceIndex::fit(&[]).unwrap_err();
        assert!(matches!(err, ChatError::InsufficientData));
    }

    #[test]
    fn returns_at_most_k_results() {
        let index = RelevanceIndex::fit(&chunks(&[
            "rust systems programming",
            "python scripting",
            "gardening tips for spring",
            "rust borrow checker",
        ]))
        .unwrap();
        assert_eq!(index.query("rust", 3).len(), 3);
        assert_eq!(index.query("rust", 10).len(), 4);
    }

    #[test]
    fn scores_are_non_increasing() {
        let index = RelevanceIndex::fit(&chunks(&[
            "fees are due in march",
            "registration opens in february",
            "fees fees fees",
        ]))
        .unwrap();
        let results = index.query("when are fees due", 3);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[test]
    fn most_relevant_chunk_ranks_first() {
        let index = RelevanceIndex::fit(&chunks(&[
            "the library closes at midnight",
            "hostel fees are due by march",
            "sports day is in april",
        ]))
        .unwrap();
        let results = index.query("when are hostel fees due", 2);
        assert_eq!(results[0].index, 1);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn ties_break_on_lower_chunk_index() {
        // Identical chunks score identically; order must follow the document.
        let index =
            RelevanceIndex::fit(&chunks(&["same words here", "same words here"])).unwrap();
        let results = index.query("same words", 2);
        assert_eq!(results[0].index, 0);
        assert_eq!(results[1].index, 1);
    }

    #[test]
    fn single_chunk_index_always_returns_it() {
        let index = RelevanceIndex::fit(&chunks(&["only one chunk"])).unwrap();
        let results = index.query("completely unrelated query", 3);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].index, 0);
    }

    #[test]
    fn out_of_vocabulary_terms_are_dropped() {
        let index = RelevanceIndex::fit(&chunks(&[
            "alpha beta gamma",
            "delta epsilon zeta",
        ]))
        .unwrap();
        let with_oov = index.query("alpha zzzyx", 2);
        let without = index.query("alpha", 2);
        assert_eq!(with_oov[0].index, without[0].index);
        assert!((with_oov[0].score - without[0].score).abs() < 1e-9);
    }

    #[test]
    fn fully_unknown_query_scores_zero_in_document_order() {
        let index = RelevanceIndex::fit(&chunks(&["aa bb", "cc dd", "ee ff"])).unwrap();
        let results = index.query("zzz", 3);
        let indices: Vec<usize> = results.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(results.iter().all(|s| s.score == 0.0));
    }

    #[test]
    fn rebuilding_is_idempotent() {
        let c = chunks(&["fees due march", "registration february", "exams in may"]);
        let a = RelevanceIndex::fit(&c).unwrap();
        let b = RelevanceIndex::fit(&c).unwrap();
        let qa = a.query("when are exams", 3);
        let qb = b.query("when are exams", 3);
        assert_eq!(qa.len(), qb.len());
        for (x, y) in qa.iter().zip(qb.iter()) {
            assert_eq!(x.index, y.index);
            assert!((x.score - y.score).abs() < 1e-12);
        }
    }

    #[test]
    fn single_char_tokens_are_ignored() {
        // "a" and "i" never enter the vocabulary, matching the tokenizer's
        // two-character minimum.
        let index = RelevanceIndex::fit(&chunks(&["a big cat", "i saw it"])).unwrap();
        let results = index.query("a i", 2);
        assert!(results.iter().all(|s| s.score == 0.0));
    }
}
