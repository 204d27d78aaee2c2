//! Offline ROUGE export.
//!
//! Writes a CSV of per-sentence ROUGE-L scores for every candidate in
//! the corpus, scored against the best-matching ideal answer of its
//! question. Used for offline analysis; not part of the training loop.

use crate::candidates::candidate_sentences;
use crate::corpus::Corpus;
use crate::rouge::RougeScorer;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `qid,pubmedid,sentid,L,sentence text` rows, one per candidate
/// sentence, flushing before returning.
pub fn export_rouge_csv(corpus: &Corpus, scorer: &RougeScorer, out: &Path) -> Result<()> {
    let file = File::create(out)
        .with_context(|| format!("failed to create output file {}", out.display()))?;
    let mut writer = BufWriter::new(file);
    writeln!(writer, "qid,pubmedid,sentid,L,sentence text")?;

    for (qi, question) in corpus.iter().enumerate() {
        for candidate in candidate_sentences(question) {
            let score = question
                .ideal_answers
                .iter()
                .map(|r| scorer.rouge_l_f1(&candidate.text, r))
                .fold(0.0, f64::max);
            writeln!(
                writer,
                "{},{},{},{},\"{}\"",
                qi,
                candidate.question_id,
                candidate.index,
                score,
                candidate.text.replace('"', "\"\"")
            )?;
        }
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush output file {}", out.display()))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_export_rows() {
        let corpus = Corpus::from_json_str(
            r#"{
                "questions": [
                    {
                        "id": "pm-1",
                        "type": "summary",
                        "body": "b",
                        "ideal_answer": ["A. C.", "B."],
                        "snippets": [
                            {"text": "A. B."},
                            {"text": "C."}
                        ]
                    }
                ]
            }"#,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rouge.csv");
        export_rouge_csv(&corpus, &RougeScorer::new(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "qid,pubmedid,sentid,L,sentence text");
        assert_eq!(lines.len(), 4); // header + 3 candidate sentences

        // "B." matches the second reference exactly.
        assert_eq!(lines[2], "0,pm-1,1,1,\"B.\"");

        // Sentence ids are consecutive across snippets.
        let sentids: Vec<&str> = lines[1..]
            .iter()
            .map(|l| l.split(',').nth(2).unwrap())
            .collect();
        assert_eq!(sentids, vec!["0", "1", "2"]);
    }

    #[test]
    fn test_export_quotes_embedded_quotes() {
        let corpus = Corpus::from_json_str(
            r#"{
                "questions": [
                    {
                        "id": "pm-2",
                        "type": "summary",
                        "body": "b",
                        "ideal_answer": "x",
                        "snippets": [{"text": "He said \"stop\"."}]
                    }
                ]
            }"#,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rouge.csv");
        export_rouge_csv(&corpus, &RougeScorer::new(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"He said \"\"stop\"\".\""));
    }
}
