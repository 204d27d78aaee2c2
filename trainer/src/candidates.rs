//! Candidate sentence extraction.
//!
//! Splits a question's snippets into an ordered list of candidate
//! sentences. Ordering is stable: snippets are processed in corpus
//! order and sentences are numbered consecutively across snippets, so
//! a candidate's index is its presentation position. No deduplication
//! of overlapping snippets is performed.

use crate::corpus::Question;

/// One sentence extracted from a question's snippets, eligible for
/// inclusion in the produced summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Document id of the owning question.
    pub question_id: String,
    /// Position of this sentence among all of the question's
    /// candidates (index order == presentation order).
    pub index: usize,
    pub text: String,
}

/// Split free text into sentences.
///
/// Rule-based: a run of terminators (`.`, `!`, `?`) followed by
/// optional closing quotes/brackets ends a sentence when the next
/// non-whitespace character opens a new one (uppercase letter, digit,
/// or opening quote/bracket) or the text ends. Lowercase continuations
/// ("e.g. something") do not split.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut start = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if is_terminator(chars[i]) {
            // Consume the full terminator run ("...", "?!").
            while i + 1 < chars.len() && is_terminator(chars[i + 1]) {
                i += 1;
            }
            // Trailing closers stay with the sentence.
            while i + 1 < chars.len() && is_closer(chars[i + 1]) {
                i += 1;
            }
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if j >= chars.len() || is_opener(chars[j]) {
                push_sentence(&chars[start..=i], &mut sentences);
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }

    if start < chars.len() {
        push_sentence(&chars[start..], &mut sentences);
    }
    sentences
}

fn push_sentence(chars: &[char], out: &mut Vec<String>) {
    let s: String = chars.iter().collect();
    let trimmed = s.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

fn is_opener(c: char) -> bool {
    c.is_uppercase()
        || c.is_numeric()
        || matches!(c, '"' | '\'' | '(' | '[' | '\u{201c}' | '\u{2018}')
}

/// Yield all candidate sentences for a question.
///
/// The sequence is lazy, finite, and restartable: each call recomputes
/// it from the question's snippets, so repeated calls observe
/// identical candidates.
pub fn candidate_sentences(question: &Question) -> impl Iterator<Item = Candidate> + '_ {
    question
        .snippets
        .iter()
        .flat_map(|snippet| split_sentences(&snippet.text))
        .enumerate()
        .map(move |(index, text)| Candidate {
            question_id: question.id.clone(),
            index,
            text,
        })
}

// =============================================================================
// Tests
// =============================================================================
