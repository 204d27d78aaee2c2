//! TF-IDF vocabulary and feature construction.
//!
//! The vocabulary is fit once on training data (question bodies, all
//! training candidate sentences, and the sentence-split ideal answers)
//! and then used to build the policy's inputs at every decision point:
//! four state blocks (whole candidate set, current candidate, remaining
//! candidates, partial summary) over offset dimensions, plus a separate
//! question vector.

use rustc_hash::FxHashMap;

/// Lowercased alphanumeric word tokens. Shared by the TF-IDF
/// vocabulary and the ROUGE scorer so both see the same token stream.
pub fn word_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.extend(ch.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// A sparse vector: parallel `indices`/`values` arrays sorted by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-zero dimensions.
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    /// L2 norm.
    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    fn l2_normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for v in &mut self.values {
                *v /= norm;
            }
        }
    }

    /// Append another sparse vector with all indices shifted by
    /// `offset`. The caller guarantees `offset` is past every index
    /// already present, keeping the result sorted.
    fn extend_offset(&mut self, other: &SparseVector, offset: usize) {
        self.indices.extend(other.indices.iter().map(|i| i + offset));
        self.values.extend_from_slice(&other.values);
    }
}

/// A fixed vocabulary with smoothed inverse document frequencies.
#[derive(Debug, Clone)]
pub struct TfidfVocabulary {
    vocab: FxHashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVocabulary {
    /// Fit the vocabulary on an iterator of documents.
    ///
    /// Terms are indexed in sorted order so the fitted vocabulary is
    /// deterministic for a given document set (checkpoints rely on
    /// stable feature dimensions across runs).
    pub fn fit<I, S>(documents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut doc_freq: FxHashMap<String, usize> = FxHashMap::default();
        let mut n_docs = 0usize;
        for doc in documents {
            n_docs += 1;
            let mut seen: Vec<String> = word_tokens(doc.as_ref());
            seen.sort_unstable();
            seen.dedup();
            for token in seen {
                *doc_freq.entry(token).or_insert(0) += 1;
            }
        }

        let mut terms: Vec<(String, usize)> = doc_freq.into_iter().collect();
        terms.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let mut vocab = FxHashMap::default();
        let mut idf = Vec::with_capacity(terms.len());
        for (i, (term, df)) in terms.into_iter().enumerate() {
            vocab.insert(term, i);
            // Smoothed idf: ln((1 + n) / (1 + df)) + 1.
            idf.push(((1.0 + n_docs as f64) / (1.0 + df as f64)).ln() + 1.0);
        }

        Self { vocab, idf }
    }

    /// Number of vocabulary dimensions.
    pub fn size(&self) -> usize {
        self.idf.len()
    }

    /// L2-normalized tf-idf representation of a text. Out-of-vocabulary
    /// tokens vanish; an empty or fully out-of-vocabulary text yields
    /// the zero vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let mut counts: FxHashMap<usize, f64> = FxHashMap::default();
        for token in word_tokens(text) {
            if let Some(&idx) = self.vocab.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut entries: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        entries.sort_unstable_by_key(|&(idx, _)| idx);

        let mut vector = SparseVector {
            indices: entries.iter().map(|&(i, _)| i).collect(),
            values: entries.iter().map(|&(_, v)| v).collect(),
        };
        vector.l2_normalize();
        vector
    }
}

/// Builds the policy's decision-point inputs from an episode's
/// candidate list and in-progress summary.
pub struct FeatureBuilder<'a> {
    vocab: &'a TfidfVocabulary,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(vocab: &'a TfidfVocabulary) -> Self {
        Self { vocab }
    }

    /// Dimensionality of the state vector (four vocabulary-sized
    /// blocks).
    pub fn state_dim(&self) -> usize {
        4 * self.vocab.size()
    }

    /// Dimensionality of the question vector.
    pub fn question_dim(&self) -> usize {
        self.vocab.size()
    }

    /// The state vector for one decision point: whole candidate set,
    /// current candidate, remaining candidates, and current partial
    /// summary, each in its own vocabulary-sized block. Recomputed in
    /// full at every step.
    pub fn state_features(
        &self,
        candidates: &[String],
        cursor: usize,
        summary: &[usize],
    ) -> SparseVector {
        let v = self.vocab.size();

        let all_text = candidates.join(" ");
        let current = candidates.get(cursor).map(String::as_str).unwrap_or("");
        let remaining = if cursor + 1 < candidates.len() {
            candidates[cursor + 1..].join(" ")
        } else {
            String::new()
        };
        let summary_text = summary
            .iter()
            .filter_map(|&i| candidates.get(i).map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ");

        let mut state = SparseVector::new();
        state.extend_offset(&self.vocab.transform(&all_text), 0);
        state.extend_offset(&self.vocab.transform(current), v);
        state.extend_offset(&self.vocab.transform(&remaining), 2 * v);
        state.extend_offset(&self.vocab.transform(&summary_text), 3 * v);
        state
    }

    /// The question-body vector.
    pub fn question_features(&self, body: &str) -> SparseVector {
        self.vocab.transform(body)
    }
}

// =============================================================================
// Tests
// =============================================================================
