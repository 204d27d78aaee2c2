//! Stochastic binary policy network and REINFORCE update machinery.
//!
//! A single hidden layer maps the concatenated (state, question)
//! vectors to one logit; `sigmoid(logit)` is the probability of action
//! 0 (skip). During training, actions are sampled with exploration
//! noise that decays with the episode count, and the gradient of the
//! sigmoid cross-entropy pseudo-loss is recorded per decision. At
//! episode end the optimizer applies exactly one update: the
//! reward-weighted mean of the episode's recorded gradients, through
//! Adam.

use crate::features::SparseVector;
use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Exploration noise for a given episode count:
/// `noise * 3000 / (3000 + episode)`. Strictly decreasing, equal to
/// `noise` at episode 0, asymptotically 0 — so the perturbed action
/// probabilities never collapse to exactly 0 or 1.
pub fn exploration_noise(noise: f64, episode: usize) -> f64 {
    noise * 3000.0 / (3000.0 + episode as f64)
}

/// Sample an action from the noise-perturbed two-point distribution:
/// `P(skip) = (p + eps) / (1 + 2*eps)`.
pub fn sample_action(fwd: &ForwardPass, eps: f64, rng: &mut impl Rng) -> usize {
    let p_skip = (fwd.p + eps) / (1.0 + 2.0 * eps);
    if rng.gen::<f64>() < p_skip {
        0
    } else {
        1
    }
}

/// Greedy action with no exploration: include iff `p < 0.5`.
pub fn greedy_action(fwd: &ForwardPass) -> usize {
    if fwd.p < 0.5 {
        1
    } else {
        0
    }
}

/// Intermediate activations of one forward pass, retained for the
/// gradient computation.
#[derive(Debug, Clone)]
pub struct ForwardPass {
    /// Hidden pre-activations.
    pub z: Vec<f64>,
    /// Hidden activations (ReLU).
    pub h: Vec<f64>,
    /// Scalar pre-activation of the output unit.
    pub logit: f64,
    /// `sigmoid(logit)`: probability of action 0 (skip).
    pub p: f64,
}

/// Per-episode gradient accumulator: running sums over decision steps.
/// The reward-weighted mean `reward * sum / steps` is what the
/// optimizer applies, identical to averaging stored per-step gradients.
#[derive(Debug, Clone)]
pub struct GradientBuffer {
    d_w1: Vec<f64>,
    d_b1: Vec<f64>,
    d_w2: Vec<f64>,
    d_b2: f64,
    steps: usize,
}

impl GradientBuffer {
    fn zeros(input_dim: usize, hidden: usize) -> Self {
        Self {
            d_w1: vec![0.0; hidden * input_dim],
            d_b1: vec![0.0; hidden],
            d_w2: vec![0.0; hidden],
            d_b2: 0.0,
            steps: 0,
        }
    }

    /// Number of decisions recorded this episode.
    pub fn steps(&self) -> usize {
        self.steps
    }
}

/// Adam moment estimates, persisted with the parameters so resumed
/// training continues the same trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AdamState {
    m_w1: Vec<f64>,
    v_w1: Vec<f64>,
    m_b1: Vec<f64>,
    v_b1: Vec<f64>,
    m_w2: Vec<f64>,
    v_w2: Vec<f64>,
    m_b2: f64,
    v_b2: f64,
    t: u64,
}

impl AdamState {
    fn zeros(input_dim: usize, hidden: usize) -> Self {
        Self {
            m_w1: vec![0.0; hidden * input_dim],
            v_w1: vec![0.0; hidden * input_dim],
            m_b1: vec![0.0; hidden],
            v_b1: vec![0.0; hidden],
            m_w2: vec![0.0; hidden],
            v_w2: vec![0.0; hidden],
            m_b2: 0.0,
            v_b2: 0.0,
            t: 0,
        }
    }
}

const ADAM_LR: f64 = 1e-3;
const ADAM_BETA1: f64 = 0.9;
const ADAM_BETA2: f64 = 0.999;
const ADAM_EPS: f64 = 1e-8;

/// The trainable policy. Parameters are owned here exclusively and
/// mutated only through `apply_episode`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyNetwork {
    state_dim: usize,
    question_dim: usize,
    hidden: usize,
    /// Hidden-layer weights, row-major: `w1[j * input_dim + i]`.
    w1: Vec<f64>,
    b1: Vec<f64>,
    w2: Vec<f64>,
    b2: f64,
    adam: AdamState,
    episodes_trained: usize,
}

impl PolicyNetwork {
    /// Randomly initialized network (He-uniform weights, zero biases).
    pub fn new(state_dim: usize, question_dim: usize, hidden: usize, rng: &mut impl Rng) -> Self {
        let input_dim = state_dim + question_dim;
        let w1_limit = (6.0 / input_dim.max(1) as f64).sqrt();
        let w2_limit = (6.0 / hidden.max(1) as f64).sqrt();

        let w1 = (0..hidden * input_dim)
            .map(|_| rng.gen_range(-w1_limit..w1_limit))
            .collect();
        let w2 = (0..hidden)
            .map(|_| rng.gen_range(-w2_limit..w2_limit))
            .collect();

        Self {
            state_dim,
            question_dim,
            hidden,
            w1,
            b1: vec![0.0; hidden],
            w2,
            b2: 0.0,
            adam: AdamState::zeros(input_dim, hidden),
            episodes_trained: 0,
        }
    }

    pub fn state_dim(&self) -> usize {
        self.state_dim
    }

    pub fn question_dim(&self) -> usize {
        self.question_dim
    }

    fn input_dim(&self) -> usize {
        self.state_dim + self.question_dim
    }

    /// Completed training episodes applied to these parameters.
    pub fn episodes_trained(&self) -> usize {
        self.episodes_trained
    }

    /// One forward pass over the sparse concatenated input.
    pub fn forward(&self, state: &SparseVector, question: &SparseVector) -> ForwardPass {
        let input_dim = self.input_dim();
        let mut z = Vec::with_capacity(self.hidden);
        for j in 0..self.hidden {
            let row = &self.w1[j * input_dim..(j + 1) * input_dim];
            let mut zj = self.b1[j];
            for (i, v) in state.iter() {
                zj += row[i] * v;
            }
            for (i, v) in question.iter() {
                zj += row[self.state_dim + i] * v;
            }
            z.push(zj);
        }

        let h: Vec<f64> = z.iter().map(|&zj| zj.max(0.0)).collect();
        let logit = self.b2
            + self
                .w2
                .iter()
                .zip(h.iter())
                .map(|(w, hj)| w * hj)
                .sum::<f64>();
        let p = sigmoid(logit);

        ForwardPass { z, h, logit, p }
    }

    /// A fresh, zeroed gradient buffer shaped like these parameters.
    pub fn gradient_buffer(&self) -> GradientBuffer {
        GradientBuffer::zeros(self.input_dim(), self.hidden)
    }

    /// Record the gradient of the sigmoid cross-entropy pseudo-loss
    /// for one sampled decision, without applying it.
    ///
    /// Label convention follows the sampling one: `y = 1 - action`, so
    /// `dL/dlogit = p - y`, backpropagated by hand through the ReLU
    /// layer. The input is sparse, so only touched `w1` columns
    /// receive contributions.
    pub fn accumulate_gradient(
        &self,
        buffer: &mut GradientBuffer,
        state: &SparseVector,
        question: &SparseVector,
        fwd: &ForwardPass,
        action: usize,
    ) {
        let input_dim = self.input_dim();
        let y = 1.0 - action as f64;
        let dlogit = fwd.p - y;

        buffer.d_b2 += dlogit;
        for j in 0..self.hidden {
            buffer.d_w2[j] += dlogit * fwd.h[j];
            if fwd.z[j] > 0.0 {
                let dz = dlogit * self.w2[j];
                buffer.d_b1[j] += dz;
                let row = &mut buffer.d_w1[j * input_dim..(j + 1) * input_dim];
                for (i, v) in state.iter() {
                    row[i] += dz * v;
                }
                for (i, v) in question.iter() {
                    row[self.state_dim + i] += dz * v;
                }
            }
        }
        buffer.steps += 1;
    }

    /// Apply the single end-of-episode update: Adam over the
    /// reward-weighted mean of the episode's recorded gradients. A
    /// no-decision episode is a no-op.
    pub fn apply_episode(&mut self, buffer: &GradientBuffer, reward: f64) {
        if buffer.steps == 0 {
            return;
        }
        let scale = reward / buffer.steps as f64;

        self.adam.t += 1;
        let t = self.adam.t as f64;
        // Bias-corrected step size, applied once per parameter group.
        let lr_t = ADAM_LR * (1.0 - ADAM_BETA2.powf(t)).sqrt() / (1.0 - ADAM_BETA1.powf(t));

        adam_update_slice(
            &mut self.w1,
            &mut self.adam.m_w1,
            &mut self.adam.v_w1,
            &buffer.d_w1,
            scale,
            lr_t,
        );
        adam_update_slice(
            &mut self.b1,
            &mut self.adam.m_b1,
            &mut self.adam.v_b1,
            &buffer.d_b1,
            scale,
            lr_t,
        );
        adam_update_slice(
            &mut self.w2,
            &mut self.adam.m_w2,
            &mut self.adam.v_w2,
            &buffer.d_w2,
            scale,
            lr_t,
        );

        let g = scale * buffer.d_b2;
        self.adam.m_b2 = ADAM_BETA1 * self.adam.m_b2 + (1.0 - ADAM_BETA1) * g;
        self.adam.v_b2 = ADAM_BETA2 * self.adam.v_b2 + (1.0 - ADAM_BETA2) * g * g;
        self.b2 -= lr_t * self.adam.m_b2 / (self.adam.v_b2.sqrt() + ADAM_EPS);

        self.episodes_trained += 1;
    }

    /// Persist parameters, optimizer state, and the episode counter.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create checkpoint directory {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string(self).context("failed to serialize checkpoint")?;
        fs::write(path, json)
            .with_context(|| format!("failed to write checkpoint {}", path.display()))
    }

    /// Restore a checkpoint written by [`PolicyNetwork::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read checkpoint {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("malformed checkpoint {}", path.display()))
    }
}

fn adam_update_slice(
    params: &mut [f64],
    m: &mut [f64],
    v: &mut [f64],
    grad_sum: &[f64],
    scale: f64,
    lr_t: f64,
) {
    for i in 0..params.len() {
        let g = scale * grad_sum[i];
        m[i] = ADAM_BETA1 * m[i] + (1.0 - ADAM_BETA1) * g;
        v[i] = ADAM_BETA2 * v[i] + (1.0 - ADAM_BETA2) * g * g;
        params[i] -= lr_t * m[i] / (v[i].sqrt() + ADAM_EPS);
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

// =============================================================================
// Tests
// =============================================================================
