//! Episode environment for summarization as a sequential decision
//! process.
//!
//! One episode walks one question's candidate sentences in order. Each
//! step takes a binary action (skip/include) on the sentence under the
//! cursor and advances; the reward is ROUGE-L F1 of the selected
//! summary against the question's ideal answers, realized only on the
//! terminal step.

use crate::candidates::candidate_sentences;
use crate::corpus::Corpus;
use crate::rouge::RougeScorer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Skip the sentence under the cursor.
pub const ACTION_SKIP: usize = 0;
/// Include the sentence under the cursor in the summary.
pub const ACTION_INCLUDE: usize = 1;

/// Contract violations and lookup failures raised by the environment.
/// These fail loudly; they are never clamped or silently recovered.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    #[error("question id {qid} out of range (corpus holds {len} questions)")]
    NotFound { qid: usize, len: usize },

    #[error("invalid action {0}: expected 0 (skip) or 1 (include)")]
    InvalidAction(usize),

    #[error("invalid environment state: {0}")]
    InvalidState(&'static str),
}

/// Environment configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Per-episode cap on the candidate list. Scope-limiting policy,
    /// not a correctness requirement.
    pub max_candidates: usize,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self { max_candidates: 30 }
    }
}

/// What the policy observes after `reset` or `step`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub done: bool,
    /// Terminal-only: 0.0 on reset and on every non-terminal step.
    pub reward: f64,
    /// Selected candidate indices, in selection order.
    pub summary: Vec<usize>,
    /// Cursor position: index of the candidate the next step decides.
    pub next_candidate: usize,
}

struct EpisodeState {
    qid: usize,
    candidates: Vec<String>,
    summary: Vec<usize>,
    cursor: usize,
    done: bool,
}

/// Finite-horizon state machine over one question's candidate list.
///
/// `Ready` (after reset) -> `InProgress` -> `Terminal` (cursor reaches
/// the candidate count); no transition out of `Terminal`.
pub struct SummaryEnv<'a> {
    corpus: &'a Corpus,
    scorer: &'a RougeScorer,
    cfg: EnvConfig,
    episode: Option<EpisodeState>,
}

impl<'a> SummaryEnv<'a> {
    pub fn new(corpus: &'a Corpus, scorer: &'a RougeScorer, cfg: EnvConfig) -> Self {
        Self {
            corpus,
            scorer,
            cfg,
            episode: None,
        }
    }

    /// Start an episode on the question at corpus position `qid`.
    ///
    /// Recomputes the candidate list (capped at
    /// `EnvConfig::max_candidates`), clears the summary, and rewinds
    /// the cursor. Resetting twice to the same id yields identical
    /// observations and candidates.
    pub fn reset(&mut self, qid: usize) -> Result<Observation, EnvError> {
        let question = self.corpus.get(qid).ok_or(EnvError::NotFound {
            qid,
            len: self.corpus.len(),
        })?;

        let candidates: Vec<String> = candidate_sentences(question)
            .take(self.cfg.max_candidates)
            .map(|c| c.text)
            .collect();
        let done = candidates.is_empty();

        self.episode = Some(EpisodeState {
            qid,
            candidates,
            summary: Vec::new(),
            cursor: 0,
            done,
        });

        Ok(Observation {
            done,
            reward: 0.0,
            summary: Vec::new(),
            next_candidate: 0,
        })
    }

    /// Decide on the candidate under the cursor and advance.
    ///
    /// Errors: `InvalidState` if no episode has been started or the
    /// episode is already terminal; `InvalidAction` if `action` is not
    /// 0 or 1.
    pub fn step(&mut self, action: usize) -> Result<Observation, EnvError> {
        let episode = self
            .episode
            .as_mut()
            .ok_or(EnvError::InvalidState("step called before reset"))?;

        if action != ACTION_SKIP && action != ACTION_INCLUDE {
            return Err(EnvError::InvalidAction(action));
        }
        if episode.done {
            return Err(EnvError::InvalidState("episode is already terminal"));
        }

        if action == ACTION_INCLUDE {
            episode.summary.push(episode.cursor);
        }
        episode.cursor += 1;

        let done = episode.cursor >= episode.candidates.len();
        let mut reward = 0.0;
        if done {
            episode.done = true;
            let question = self
                .corpus
                .get(episode.qid)
                .ok_or(EnvError::InvalidState("episode question vanished"))?;
            let selected: Vec<&str> = episode
                .summary
                .iter()
                .map(|&i| episode.candidates[i].as_str())
                .collect();
            reward = self
                .scorer
                .best_reference_score(&selected, &question.ideal_answers);
        }

        Ok(Observation {
            done,
            reward,
            summary: episode.summary.clone(),
            next_candidate: episode.cursor,
        })
    }

    /// The active episode's (capped) candidate list; empty before the
    /// first reset.
    pub fn candidates(&self) -> &[String] {
        self.episode.as_ref().map_or(&[], |e| e.candidates.as_slice())
    }
}

// =============================================================================
// Tests
// =============================================================================
