//! BioASQ corpus loading.
//!
//! Reads the training JSON (a top-level `questions` array) and
//! normalizes it into typed records. A question without a `snippets`
//! field is a data-quality anomaly: it is reported with a warning and
//! skipped. Structurally malformed questions (missing `id`, `body`,
//! `type` or `ideal_answer`) abort the load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The four BioASQ question types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionType {
    Summary,
    Factoid,
    YesNo,
    List,
}

/// One retrieved snippet attached to a question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snippet {
    pub text: String,
}

/// A loaded question with its reference answers and snippets.
#[derive(Debug, Clone)]
pub struct Question {
    /// Document identifier from the corpus (opaque string).
    pub id: String,
    pub qtype: QuestionType,
    /// Free-text question body.
    pub body: String,
    /// Ideal answers, normalized to a list even when the corpus stores
    /// a single string.
    pub ideal_answers: Vec<String>,
    pub snippets: Vec<Snippet>,
}

/// The corpus JSON stores `ideal_answer` as either one string or a
/// list of strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum IdealAnswer {
    One(String),
    Many(Vec<String>),
}

impl IdealAnswer {
    fn into_vec(self) -> Vec<String> {
        match self {
            IdealAnswer::One(s) => vec![s],
            IdealAnswer::Many(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    id: String,
    #[serde(rename = "type")]
    qtype: QuestionType,
    body: String,
    ideal_answer: IdealAnswer,
    snippets: Option<Vec<Snippet>>,
}

#[derive(Debug, Deserialize)]
struct RawCorpus {
    questions: Vec<RawQuestion>,
}

/// An in-memory corpus. Question ids used by the environment are
/// positions into this loaded (filtered) list.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    questions: Vec<Question>,
}

impl Corpus {
    /// Load a corpus from a BioASQ-style JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read corpus file: {}", path.display()))?;
        Self::from_json_str(&content)
            .with_context(|| format!("failed to parse corpus file: {}", path.display()))
    }

    /// Parse a corpus from a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let raw: RawCorpus =
            serde_json::from_str(content).context("malformed corpus JSON")?;

        let mut questions = Vec::with_capacity(raw.questions.len());
        for q in raw.questions {
            let snippets = match q.snippets {
                Some(s) => s,
                None => {
                    eprintln!("Warning: no snippets in question '{}', skipping", q.body);
                    continue;
                }
            };
            questions.push(Question {
                id: q.id,
                qtype: q.qtype,
                body: q.body,
                ideal_answers: q.ideal_answer.into_vec(),
                snippets,
            });
        }

        Ok(Self { questions })
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn get(&self, qid: usize) -> Option<&Question> {
        self.questions.get(qid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "questions": [
                {
                    "id": "55046d5ff8aee20f27000007",
                    "type": "summary",
                    "body": "What is the role of EGFR ligands?",
                    "ideal_answer": "EGFR ligands activate the receptor.",
                    "snippets": [
                        {"text": "EGF is an EGFR ligand. It binds the receptor."},
                        {"text": "Amphiregulin also binds EGFR."}
                    ]
                },
                {
                    "id": "513f2b52bee46bd34c000009",
                    "type": "yesno",
                    "body": "Is RET involved in Hirschsprung disease?",
                    "ideal_answer": ["Yes.", "Yes, RET mutations contribute to risk."],
                    "snippets": [{"text": "RET mutations contribute to risk."}]
                },
                {
                    "id": "530cf4fe960c95ad0c000004",
                    "type": "factoid",
                    "body": "A question with no snippets.",
                    "ideal_answer": "Unanswerable."
                }
            ]
        }"#
    }

    #[test]
    fn test_load_and_filter() {
        let corpus = Corpus::from_json_str(sample_json()).unwrap();
        // The snippet-less question is skipped, not fatal.
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.get(0).unwrap().qtype, QuestionType::Summary);
        assert_eq!(corpus.get(1).unwrap().qtype, QuestionType::YesNo);
        assert!(corpus.get(2).is_none());
    }

    #[test]
    fn test_ideal_answer_normalization() {
        let corpus = Corpus::from_json_str(sample_json()).unwrap();
        assert_eq!(
            corpus.get(0).unwrap().ideal_answers,
            vec!["EGFR ligands activate the receptor.".to_string()]
        );
        assert_eq!(corpus.get(1).unwrap().ideal_answers.len(), 2);
    }

    #[test]
    fn test_missing_body_is_fatal() {
        let json = r#"{
            "questions": [
                {"id": "x", "type": "list", "ideal_answer": "a", "snippets": []}
            ]
        }"#;
        assert!(Corpus::from_json_str(json).is_err());
    }

    #[test]
    fn test_unknown_question_type_is_fatal() {
        let json = r#"{
            "questions": [
                {"id": "x", "type": "essay", "body": "b", "ideal_answer": "a", "snippets": []}
            ]
        }"#;
        assert!(Corpus::from_json_str(json).is_err());
    }

    #[test]
    fn test_empty_snippet_list_is_kept() {
        // Present-but-empty snippets are legal; the environment reports
        // an immediately-done episode for them.
        let json = r#"{
            "questions": [
                {"id": "x", "type": "list", "body": "b", "ideal_answer": "a", "snippets": []}
            ]
        }"#;
        let corpus = Corpus::from_json_str(json).unwrap();
        assert_eq!(corpus.len(), 1);
        assert!(corpus.get(0).unwrap().snippets.is_empty());
    }
}
