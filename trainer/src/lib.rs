//! REINFORCE-based extractive summarization for BioASQ question answering.
//!
//! This crate frames snippet summarization as a sequential decision
//! process: for each question, an environment walks an ordered list of
//! candidate sentences, a stochastic binary policy decides per sentence
//! whether it belongs in the summary, and the terminal ROUGE-L F1 score
//! against the question's ideal answers is the episode reward used for
//! the policy-gradient update.

pub mod baseline;
pub mod candidates;
pub mod corpus;
pub mod env;
pub mod export;
pub mod features;
pub mod logs;
pub mod policy;
pub mod rouge;
pub mod trainer;
