//! ROUGE-L scoring.
//!
//! The reward signal: longest-common-subsequence F1 between a proposed
//! summary and a reference answer, over lowercased word tokens. The
//! scorer is an explicitly constructed service passed by reference to
//! whichever component needs it; it holds no state.

use crate::features::word_tokens;

/// Token-level ROUGE-L scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RougeScorer;

impl RougeScorer {
    pub fn new() -> Self {
        Self
    }

    /// ROUGE-L F1 between a candidate text and one reference.
    ///
    /// `p = lcs/|cand|`, `r = lcs/|ref|`, `f = 2pr/(p+r)`. Degenerate
    /// inputs (either side empty after tokenization, or a zero
    /// denominator) score 0 rather than erroring.
    pub fn rouge_l_f1(&self, candidate: &str, reference: &str) -> f64 {
        let cand = word_tokens(candidate);
        let refr = word_tokens(reference);
        if cand.is_empty() || refr.is_empty() {
            return 0.0;
        }

        let lcs = lcs_length(&cand, &refr) as f64;
        let precision = lcs / cand.len() as f64;
        let recall = lcs / refr.len() as f64;
        if precision + recall == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / (precision + recall)
    }

    /// Score a summary (ordered selected sentences, joined with single
    /// spaces) against each reference independently and return the
    /// maximum: matching any acceptable reference is rewarded.
    ///
    /// An empty selection scores exactly 0 with no metric computation.
    pub fn best_reference_score<S: AsRef<str>>(
        &self,
        summary_sentences: &[S],
        references: &[String],
    ) -> f64 {
        if summary_sentences.is_empty() {
            return 0.0;
        }
        let joined = summary_sentences
            .iter()
            .map(|s| s.as_ref())
            .collect::<Vec<_>>()
            .join(" ");
        references
            .iter()
            .map(|r| self.rouge_l_f1(&joined, r))
            .fold(0.0, f64::max)
    }
}

/// Longest common subsequence length, O(n*m) time with two rows.
fn lcs_length(a: &[String], b: &[String]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ai in a {
        for (j, bj) in b.iter().enumerate() {
            curr[j + 1] = if ai == bj {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_scores_one() {
        let scorer = RougeScorer::new();
        let f = scorer.rouge_l_f1("EGFR is a receptor.", "EGFR is a receptor.");
        assert!((f - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_disjoint_scores_zero() {
        let scorer = RougeScorer::new();
        assert_eq!(scorer.rouge_l_f1("alpha beta", "gamma delta"), 0.0);
    }

    #[test]
    fn test_hand_computed_partial_match() {
        // candidate "a b c" vs reference "a c": lcs = 2,
        // p = 2/3, r = 1, f = 2 * (2/3) / (5/3) = 0.8.
        let scorer = RougeScorer::new();
        let f = scorer.rouge_l_f1("A. B. C.", "A. C.");
        assert!((f - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_subsequence_not_substring() {
        // "a x b" vs "a b": lcs = 2 even though "a b" is not contiguous.
        let scorer = RougeScorer::new();
        let f = scorer.rouge_l_f1("a x b", "a b");
        let p = 2.0 / 3.0;
        let r = 1.0;
        assert!((f - 2.0 * p * r / (p + r)).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_inputs_score_zero() {
        let scorer = RougeScorer::new();
        assert_eq!(scorer.rouge_l_f1("", "a reference"), 0.0);
        assert_eq!(scorer.rouge_l_f1("a candidate", ""), 0.0);
        assert_eq!(scorer.rouge_l_f1("...", "a reference"), 0.0);
    }

    #[test]
    fn test_empty_summary_scores_zero() {
        let scorer = RougeScorer::new();
        let refs = vec!["anything".to_string()];
        let none: [&str; 0] = [];
        assert_eq!(scorer.best_reference_score(&none, &refs), 0.0);
    }

    #[test]
    fn test_best_reference_takes_maximum() {
        let scorer = RougeScorer::new();
        let refs = vec![
            "gamma delta".to_string(),
            "EGFR is a receptor".to_string(),
        ];
        let f = scorer.best_reference_score(&["EGFR is a receptor."], &refs);
        assert!((f - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_sentences_joined_with_spaces() {
        let scorer = RougeScorer::new();
        let refs = vec!["A. C.".to_string()];
        let f = scorer.best_reference_score(&["A.", "C."], &refs);
        assert!((f - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_reward_in_unit_interval() {
        let scorer = RougeScorer::new();
        let f = scorer.rouge_l_f1("one two three four", "two four six");
        assert!((0.0..=1.0).contains(&f));
    }
}
