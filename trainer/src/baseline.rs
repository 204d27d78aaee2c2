//! First-N baseline policy.
//!
//! A deterministic reference point for training runs: include the
//! first N candidate sentences, where N depends on the question type,
//! skip the rest. Evaluated over the same held-out split the trainer
//! logs, so the two numbers are directly comparable.

use crate::corpus::{Corpus, QuestionType};
use crate::env::{EnvConfig, SummaryEnv, ACTION_INCLUDE, ACTION_SKIP};
use crate::rouge::RougeScorer;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// How many leading sentences the baseline keeps, per question type.
pub fn answer_count(qtype: QuestionType) -> usize {
    match qtype {
        QuestionType::Summary => 6,
        QuestionType::Factoid => 2,
        QuestionType::YesNo => 2,
        QuestionType::List => 3,
    }
}

/// Outcome of one baseline evaluation pass.
#[derive(Debug, Clone, Serialize)]
pub struct BaselineReport {
    /// Questions that contributed a score (those with candidates).
    pub n_questions: usize,
    pub mean_reward: f64,
}

/// Run the first-N baseline over the given question ids.
///
/// Questions with no candidates are skipped, mirroring the trainer's
/// evaluation pass.
pub fn run_baseline(
    corpus: &Corpus,
    scorer: &RougeScorer,
    env_cfg: EnvConfig,
    indices: &[usize],
) -> Result<BaselineReport> {
    let mut env = SummaryEnv::new(corpus, scorer, env_cfg);
    let mut scores = Vec::new();

    for &qid in indices {
        let mut obs = env.reset(qid)?;
        if obs.done {
            continue;
        }
        let question = corpus
            .get(qid)
            .context("question disappeared between reset and scoring")?;
        let n = answer_count(question.qtype);

        while !obs.done {
            let action = if obs.next_candidate < n {
                ACTION_INCLUDE
            } else {
                ACTION_SKIP
            };
            obs = env.step(action)?;
        }
        scores.push(obs.reward);
    }

    let mean_reward = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };
    Ok(BaselineReport {
        n_questions: scores.len(),
        mean_reward,
    })
}

/// Recover the held-out question ids from an existing evaluation log,
/// so the baseline scores exactly the split a training run evaluated.
pub fn test_indices_from_eval_log(path: &Path) -> Result<Vec<usize>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read evaluation log {}", path.display()))?;

    let mut indices = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        if line_no == 0 || line.trim().is_empty() {
            continue;
        }
        let qid_field = line
            .split(',')
            .nth(2)
            .with_context(|| format!("malformed log row {}: '{}'", line_no + 1, line))?;
        let qid: usize = qid_field
            .trim()
            .parse()
            .with_context(|| format!("bad QID in log row {}: '{}'", line_no + 1, qid_field))?;
        indices.push(qid);
    }
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

// =============================================================================
// Tests
// =============================================================================
