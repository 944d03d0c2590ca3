//! Linear softmax policy trained with REINFORCE.
//!
//! The policy scores every action from the observation's features concatenated
//! with a per-slot *memory trace*, an exponential moving average of past features:
//!
//! ```text
//! input   = features ++ memory
//! logits  = W · input + b
//! π(a)    = softmax(logits)[a]
//! memory' = decay · memory + (1 - decay) · features
//! ```
//!
//! # Training
//!
//! [`Agent::train_on_batch`] performs one gradient ascent step on
//!
//! ```text
//! J = mean(advantage · log π(a)) + entropy_coef · mean(H(π))
//! ```
//!
//! over every `[slot, time]` sample of the trajectory batch. Returns are discounted
//! per slot and cut at `done`, so a return never leaks across an episode boundary.
//! The advantage is the return minus the batch mean, optionally scaled to unit
//! variance.
//!
//! Reported statistics: `loss` (the negated objective), `mean_return`, `entropy`,
//! `grad_norm` and `num_samples`.
//!
//! # Memory Across Episode Boundaries
//!
//! [`MemoryReset::Zero`] clears a slot's trace when its episode ends, so the next
//! episode starts from the same memory as the very first one.
//! [`MemoryReset::Carry`] keeps the trace.
//!
//! # Current Limitations
//!
//! - A single linear layer; no hidden units
//! - Plain SGD with a fixed learning rate
//! - Returns are truncated at the end of the horizon instead of bootstrapped

use std::marker::PhantomData;

use omega_env::{DiscreteAction, FeatureObservation};
use omega_stats::TrainingStats;
use rand::Rng as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    ActMetadata, ActOutput, Agent, AgentError, AgentTrajectoryBatch, Batch, Key, Stacked, weights,
};

const MIN_PROB: f32 = 1e-8;
const ADVANTAGE_EPS: f32 = 1e-6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryReset {
    #[default]
    Zero,
    Carry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyGradientConfig {
    pub learning_rate: f32,
    pub discount: f32,
    pub entropy_coef: f32,
    pub memory_decay: f32,
    pub memory_reset: MemoryReset,
    pub normalize_advantages: bool,
    /// Standard deviation of the initial weights.
    pub init_scale: f32,
}

impl Default for PolicyGradientConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.05,
            discount: 0.95,
            entropy_coef: 0.01,
            memory_decay: 0.8,
            memory_reset: MemoryReset::Zero,
            normalize_advantages: true,
            init_scale: 0.01,
        }
    }
}

impl PolicyGradientConfig {
    pub fn validate(&self) -> Result<(), AgentError> {
        let checks = [
            ("learning_rate", self.learning_rate, self.learning_rate > 0.0),
            ("discount", self.discount, (0.0..=1.0).contains(&self.discount)),
            ("entropy_coef", self.entropy_coef, self.entropy_coef >= 0.0),
            (
                "memory_decay",
                self.memory_decay,
                (0.0..=1.0).contains(&self.memory_decay),
            ),
            ("init_scale", self.init_scale, self.init_scale >= 0.0),
        ];
        for (field, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(AgentError::InvalidConfig { field, value });
            }
        }
        Ok(())
    }
}

/// Learned parameters, stored row-major as `[num_actions, 2 * feature_len]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyParams {
    pub feature_len: usize,
    pub num_actions: usize,
    pub weights: Vec<f32>,
    pub bias: Vec<f32>,
}

impl PolicyParams {
    #[must_use]
    pub fn zeros(feature_len: usize, num_actions: usize) -> Self {
        Self {
            feature_len,
            num_actions,
            weights: vec![0.0; num_actions * 2 * feature_len],
            bias: vec![0.0; num_actions],
        }
    }

    #[must_use]
    pub fn input_len(&self) -> usize {
        2 * self.feature_len
    }

    fn check_shape(&self) -> Result<(), AgentError> {
        if self.feature_len == 0 || self.num_actions == 0 {
            return Err(AgentError::ParamsMismatch {
                message: "policy needs at least one feature and one action".to_owned(),
            });
        }
        if self.weights.len() != self.num_actions * self.input_len() {
            return Err(AgentError::ParamsMismatch {
                message: format!(
                    "{} weights for {} actions and {} inputs",
                    self.weights.len(),
                    self.num_actions,
                    self.input_len()
                ),
            });
        }
        if self.bias.len() != self.num_actions {
            return Err(AgentError::ParamsMismatch {
                message: format!("{} biases for {} actions", self.bias.len(), self.num_actions),
            });
        }
        if !weights::all_finite(&self.weights) || !weights::all_finite(&self.bias) {
            return Err(AgentError::ParamsMismatch {
                message: "non-finite parameter".to_owned(),
            });
        }
        Ok(())
    }

    fn logits(&self, input: &[f32]) -> Vec<f32> {
        self.weights
            .chunks(self.input_len())
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f32>() + b)
            .collect()
    }
}

/// Per-slot record of how an action was chosen.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolicyMetadata {
    pub log_prob: f32,
    pub entropy: f32,
}

#[derive(Debug, Clone)]
pub struct PolicyGradientAgent<O, A> {
    config: PolicyGradientConfig,
    params: PolicyParams,
    _marker: PhantomData<fn(O) -> A>,
}

impl<O, A> PolicyGradientAgent<O, A>
where
    A: DiscreteAction,
{
    /// Creates an agent with randomly initialized weights for observations of
    /// `feature_len` features.
    pub fn new(
        config: PolicyGradientConfig,
        feature_len: usize,
        key: Key,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        let mut params = PolicyParams::zeros(feature_len, A::COUNT);
        let mut rng = key.rng();
        params.weights = weights::normal(&mut rng, config.init_scale, params.weights.len())
            .ok_or(AgentError::InvalidConfig {
                field: "init_scale",
                value: config.init_scale,
            })?;
        params.check_shape()?;
        Ok(Self {
            config,
            params,
            _marker: PhantomData,
        })
    }

    /// Restores an agent from saved parameters.
    pub fn from_params(
        config: PolicyGradientConfig,
        params: PolicyParams,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        params.check_shape()?;
        if params.num_actions != A::COUNT {
            return Err(AgentError::ParamsMismatch {
                message: format!(
                    "parameters cover {} actions, the action space has {}",
                    params.num_actions,
                    A::COUNT
                ),
            });
        }
        Ok(Self {
            config,
            params,
            _marker: PhantomData,
        })
    }
}

impl<O, A> PolicyGradientAgent<O, A> {
    #[must_use]
    pub fn config(&self) -> &PolicyGradientConfig {
        &self.config
    }

    #[must_use]
    pub fn params(&self) -> &PolicyParams {
        &self.params
    }

    #[must_use]
    pub fn into_params(self) -> PolicyParams {
        self.params
    }

    fn input(&self, features: &[f32], memory: &[f32]) -> Result<Vec<f32>, AgentError> {
        let expected = self.params.feature_len;
        for actual in [features.len(), memory.len()] {
            if actual != expected {
                return Err(AgentError::FeatureSizeMismatch { expected, actual });
            }
        }
        let mut input = Vec::with_capacity(self.params.input_len());
        input.extend_from_slice(features);
        input.extend_from_slice(memory);
        Ok(input)
    }

    /// Action probabilities for one slot.
    pub fn probabilities(
        &self,
        features: &[f32],
        memory: &[f32],
    ) -> Result<Vec<f32>, AgentError> {
        let input = self.input(features, memory)?;
        Ok(softmax(&self.params.logits(&input)))
    }

    fn trace(&self, memory: &[f32], features: &[f32]) -> Vec<f32> {
        let decay = self.config.memory_decay;
        memory
            .iter()
            .zip(features)
            .map(|(m, f)| decay * m + (1.0 - decay) * f)
            .collect()
    }
}

impl<O, A> Agent for PolicyGradientAgent<O, A>
where
    O: FeatureObservation + Clone,
    A: DiscreteAction,
{
    type Observation = O;
    type Action = A;
    type Memory = Vec<f32>;
    type Metadata = PolicyMetadata;

    fn init_memory_batch(&self, num_slots: usize) -> Batch<Vec<f32>> {
        vec![vec![0.0; self.params.feature_len]; num_slots].into()
    }

    fn act_on_batch(
        &self,
        key: Key,
        states: &Batch<O>,
        memory: &Batch<Vec<f32>>,
    ) -> Result<ActOutput<A, Vec<f32>, PolicyMetadata>, AgentError> {
        AgentError::check_batch_size(states.len(), memory.len())?;
        let keys = key.split_n(states.len());

        let mut actions = Vec::with_capacity(states.len());
        let mut extra = Vec::with_capacity(states.len());
        let mut memory_after = Vec::with_capacity(states.len());
        for ((state, slot_memory), slot_key) in states.iter().zip(memory.iter()).zip(keys) {
            let features = state.features();
            let probs = self.probabilities(features, slot_memory)?;
            let index = sample_index(&probs, slot_key.rng().random());
            let action = A::from_index(index).ok_or(AgentError::UnknownAction { index })?;
            actions.push(action);
            extra.push(PolicyMetadata {
                log_prob: probs[index].max(MIN_PROB).ln(),
                entropy: entropy(&probs),
            });
            memory_after.push(self.trace(slot_memory, features));
        }

        Ok(ActOutput {
            actions: actions.into(),
            metadata: ActMetadata {
                memory_state_after: Some(memory_after.into()),
                extra: extra.into(),
            },
        })
    }

    fn update_memory_batch(
        &self,
        prev_memory: &Batch<Vec<f32>>,
        memory_state_after: Option<&Batch<Vec<f32>>>,
        _actions: &Batch<A>,
        done: &Batch<bool>,
    ) -> Result<Batch<Vec<f32>>, AgentError> {
        let after = memory_state_after.ok_or(AgentError::MissingMemoryState)?;
        AgentError::check_batch_size(prev_memory.len(), after.len())?;
        AgentError::check_batch_size(prev_memory.len(), done.len())?;
        let next = after
            .iter()
            .zip(done.iter())
            .map(|(memory, &done)| match (done, self.config.memory_reset) {
                (true, MemoryReset::Zero) => vec![0.0; self.params.feature_len],
                (true, MemoryReset::Carry) | (false, _) => memory.clone(),
            })
            .collect();
        Ok(next)
    }

    #[expect(clippy::cast_precision_loss)]
    fn train_on_batch(
        &mut self,
        trajectories: &AgentTrajectoryBatch<Self>,
    ) -> Result<TrainingStats, AgentError> {
        let num_samples = trajectories.num_slots() * trajectories.num_steps();
        let mut stats = TrainingStats::new();
        stats.insert("num_samples", num_samples as f32);
        if num_samples == 0 {
            return Ok(stats);
        }
        let n = num_samples as f32;

        let returns = discounted_returns(
            &trajectories.rewards,
            &trajectories.done,
            self.config.discount,
        );
        let mean_return = returns.iter().sum::<f32>() / n;
        let mut advantages = returns.iter().map(|g| g - mean_return).collect::<Vec<_>>();
        if self.config.normalize_advantages {
            let std = (advantages.iter().map(|a| a * a).sum::<f32>() / n).sqrt();
            for a in &mut advantages {
                *a /= std + ADVANTAGE_EPS;
            }
        }

        let input_len = self.params.input_len();
        let entropy_coef = self.config.entropy_coef;
        let mut grad_w = vec![0.0; self.params.weights.len()];
        let mut grad_b = vec![0.0; self.params.bias.len()];
        let mut policy_objective = 0.0;
        let mut entropy_sum = 0.0;

        let slots = trajectories
            .current_state
            .slots()
            .zip(trajectories.memory_before.slots())
            .zip(trajectories.actions.slots());
        let samples = slots.flat_map(|((states, memories), actions)| {
            states.iter().zip(memories).zip(actions)
        });
        for (((state, memory), &action), advantage) in samples.zip(&advantages) {
            let input = self.input(state.features(), memory)?;
            let probs = softmax(&self.params.logits(&input));
            let chosen: usize = action.into();
            let h = entropy(&probs);
            policy_objective += advantage * probs[chosen].max(MIN_PROB).ln();
            entropy_sum += h;

            for (k, &p) in probs.iter().enumerate() {
                let indicator = if k == chosen { 1.0 } else { 0.0 };
                let dz = advantage * (indicator - p)
                    - entropy_coef * p * (p.max(MIN_PROB).ln() + h);
                grad_b[k] += dz;
                let row = &mut grad_w[k * input_len..(k + 1) * input_len];
                weights::add_scaled(row, &input, dz);
            }
        }
        for g in grad_w.iter_mut().chain(&mut grad_b) {
            *g /= n;
        }
        let grad_norm = weights::l2_norm(&grad_w).hypot(weights::l2_norm(&grad_b));

        let mut params = self.params.clone();
        weights::add_scaled(&mut params.weights, &grad_w, self.config.learning_rate);
        weights::add_scaled(&mut params.bias, &grad_b, self.config.learning_rate);
        if !weights::all_finite(&params.weights) || !weights::all_finite(&params.bias) {
            return Err(AgentError::NonFiniteUpdate);
        }
        self.params = params;

        let entropy = entropy_sum / n;
        let loss = -(policy_objective / n + entropy_coef * entropy);
        debug!(num_samples, loss, mean_return, entropy, grad_norm, "Policy updated");
        stats.insert("loss", loss);
        stats.insert("mean_return", mean_return);
        stats.insert("entropy", entropy);
        stats.insert("grad_norm", grad_norm);
        Ok(stats)
    }
}

fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps = logits.iter().map(|z| (z - max).exp()).collect::<Vec<_>>();
    let sum = exps.iter().sum::<f32>();
    exps.into_iter().map(|e| e / sum).collect()
}

fn entropy(probs: &[f32]) -> f32 {
    -probs.iter().map(|p| p * p.max(MIN_PROB).ln()).sum::<f32>()
}

/// Inverse-CDF sampling with `u` in `[0, 1)`.
fn sample_index(probs: &[f32], u: f32) -> usize {
    let mut cumulative = 0.0;
    for (i, p) in probs.iter().enumerate() {
        cumulative += p;
        if u < cumulative {
            return i;
        }
    }
    probs.len().saturating_sub(1)
}

/// Per-slot discounted returns, cut at `done`, in the same slot-major order as
/// the trajectory.
fn discounted_returns(rewards: &Stacked<f32>, done: &Stacked<bool>, discount: f32) -> Vec<f32> {
    let mut returns = Vec::with_capacity(rewards.num_slots() * rewards.num_steps());
    for (rewards, done) in rewards.slots().zip(done.slots()) {
        let mut series = vec![0.0; rewards.len()];
        let mut g = 0.0;
        for t in (0..rewards.len()).rev() {
            if done[t] {
                g = 0.0;
            }
            g = rewards[t] + discount * g;
            series[t] = g;
        }
        returns.extend(series);
    }
    returns
}

#[cfg(test)]
mod tests {
    use omega_env::dungeon::DungeonAction;

    use super::*;
    use crate::{TrajectoryBatch, Transition};

    #[derive(Debug, Clone, PartialEq)]
    struct Obs(Vec<f32>);

    impl FeatureObservation for Obs {
        fn features(&self) -> &[f32] {
            &self.0
        }
    }

    type TestAgent = PolicyGradientAgent<Obs, DungeonAction>;

    fn uniform_agent(config: PolicyGradientConfig) -> TestAgent {
        let config = PolicyGradientConfig {
            init_scale: 0.0,
            ..config
        };
        TestAgent::new(config, 1, Key::new(0)).unwrap()
    }

    fn states(n: usize) -> Batch<Obs> {
        vec![Obs(vec![1.0]); n].into()
    }

    #[test]
    fn test_softmax_and_sampling() {
        let probs = softmax(&[0.0, 0.0, 1000.0]);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert_eq!(sample_index(&probs, 0.5), 2);
        assert_eq!(sample_index(&[0.25; 4], 0.3), 1);
        assert_eq!(sample_index(&[0.25; 4], 0.999_999_9), 3);
    }

    #[test]
    fn test_returns_cut_at_done() {
        let rewards = [1.0, 1.0, 1.0].map(|r| Batch::from(vec![r]));
        let done = [false, true, false].map(|d| Batch::from(vec![d]));
        let rewards = Stacked::stack(1, &rewards).unwrap();
        let done = Stacked::stack(1, &done).unwrap();
        let returns = discounted_returns(&rewards, &done, 0.5);
        assert_eq!(returns, [1.5, 1.0, 1.0]);
    }

    #[test]
    fn test_config_validation() {
        assert!(PolicyGradientConfig::default().validate().is_ok());
        let bad = PolicyGradientConfig {
            discount: 1.5,
            ..PolicyGradientConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(AgentError::InvalidConfig {
                field: "discount",
                ..
            })
        ));
        let bad = PolicyGradientConfig {
            learning_rate: f32::NAN,
            ..PolicyGradientConfig::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_config_fills_defaults() {
        let config: PolicyGradientConfig =
            serde_json::from_str(r#"{"learning_rate": 0.5, "memory_reset": "carry"}"#).unwrap();
        assert_eq!(config.learning_rate, 0.5);
        assert_eq!(config.memory_reset, MemoryReset::Carry);
        assert_eq!(config.discount, PolicyGradientConfig::default().discount);
    }

    #[test]
    fn test_act_records_metadata_and_trace() {
        let agent = uniform_agent(PolicyGradientConfig {
            memory_decay: 0.5,
            ..PolicyGradientConfig::default()
        });
        let memory = agent.init_memory_batch(3);
        let out = agent.act_on_batch(Key::new(1), &states(3), &memory).unwrap();
        assert_eq!(out.actions.len(), 3);
        for meta in out.metadata.extra.iter() {
            assert!((meta.log_prob - 0.2_f32.ln()).abs() < 1e-5);
            assert!((meta.entropy - 5.0_f32.ln()).abs() < 1e-5);
        }
        let after = out.metadata.memory_state_after.unwrap();
        assert!(after.iter().all(|m| m == &[0.5]));
    }

    #[test]
    fn test_act_is_reproducible() {
        let agent = TestAgent::new(PolicyGradientConfig::default(), 1, Key::new(4)).unwrap();
        let memory = agent.init_memory_batch(8);
        let a = agent.act_on_batch(Key::new(2), &states(8), &memory).unwrap();
        let b = agent.act_on_batch(Key::new(2), &states(8), &memory).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_act_rejects_wrong_feature_len() {
        let agent = uniform_agent(PolicyGradientConfig::default());
        let memory = agent.init_memory_batch(1);
        let states: Batch<Obs> = vec![Obs(vec![1.0, 2.0])].into();
        assert!(matches!(
            agent.act_on_batch(Key::new(0), &states, &memory),
            Err(AgentError::FeatureSizeMismatch {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_memory_reset_policies() {
        let prev: Batch<Vec<f32>> = vec![vec![0.0], vec![0.0]].into();
        let after: Batch<Vec<f32>> = vec![vec![0.7], vec![0.9]].into();
        let actions: Batch<DungeonAction> = vec![DungeonAction::Wait; 2].into();
        let done: Batch<bool> = vec![false, true].into();

        let zero = uniform_agent(PolicyGradientConfig::default());
        let next = zero
            .update_memory_batch(&prev, Some(&after), &actions, &done)
            .unwrap();
        assert_eq!(next.as_slice(), [vec![0.7], vec![0.0]]);

        let carry = uniform_agent(PolicyGradientConfig {
            memory_reset: MemoryReset::Carry,
            ..PolicyGradientConfig::default()
        });
        let next = carry
            .update_memory_batch(&prev, Some(&after), &actions, &done)
            .unwrap();
        assert_eq!(next.as_slice(), [vec![0.7], vec![0.9]]);

        assert!(matches!(
            zero.update_memory_batch(&prev, None, &actions, &done),
            Err(AgentError::MissingMemoryState)
        ));
    }

    #[test]
    fn test_training_prefers_rewarded_action() {
        // slot 0 always goes north and is rewarded, slot 1 always waits
        let mut agent = uniform_agent(PolicyGradientConfig {
            learning_rate: 1.0,
            discount: 0.0,
            entropy_coef: 0.0,
            ..PolicyGradientConfig::default()
        });
        let memory = agent.init_memory_batch(2);
        let transitions = (0..4)
            .map(|_| Transition {
                memory_before: memory.clone(),
                current_state: states(2),
                actions: vec![DungeonAction::North, DungeonAction::Wait].into(),
                act_metadata: ActMetadata {
                    memory_state_after: None,
                    extra: vec![
                        PolicyMetadata {
                            log_prob: 0.0,
                            entropy: 0.0
                        };
                        2
                    ]
                    .into(),
                },
                rewards: vec![1.0, 0.0].into(),
                done: vec![false, false].into(),
                next_state: states(2),
            })
            .collect::<Vec<_>>();
        let batch = TrajectoryBatch::stack(2, &transitions).unwrap();

        let before = agent.probabilities(&[1.0], &[0.0]).unwrap();
        let stats = agent.train_on_batch(&batch).unwrap();
        let after = agent.probabilities(&[1.0], &[0.0]).unwrap();

        let north = usize::from(DungeonAction::North);
        let wait = usize::from(DungeonAction::Wait);
        assert!(after[north] > before[north]);
        assert!(after[wait] < before[wait]);
        assert_eq!(stats.get("num_samples"), Some(8.0));
        assert!((stats.get("mean_return").unwrap() - 0.5).abs() < 1e-6);
        assert!(stats.get("grad_norm").unwrap() > 0.0);
    }

    #[test]
    fn test_training_on_empty_horizon_is_noop() {
        let mut agent = TestAgent::new(PolicyGradientConfig::default(), 1, Key::new(5)).unwrap();
        let before = agent.params().clone();
        let batch = TrajectoryBatch::<Obs, DungeonAction, Vec<f32>, PolicyMetadata>::stack(3, &[])
            .unwrap();
        let stats = agent.train_on_batch(&batch).unwrap();
        assert_eq!(stats.get("num_samples"), Some(0.0));
        assert_eq!(stats.get("loss"), None);
        assert_eq!(agent.params(), &before);
    }

    #[test]
    fn test_params_roundtrip_through_json() {
        let agent = TestAgent::new(PolicyGradientConfig::default(), 3, Key::new(6)).unwrap();
        let json = serde_json::to_string(agent.params()).unwrap();
        let params: PolicyParams = serde_json::from_str(&json).unwrap();
        let restored = TestAgent::from_params(PolicyGradientConfig::default(), params).unwrap();
        assert_eq!(restored.params(), agent.params());
    }

    #[test]
    fn test_from_params_rejects_other_action_space() {
        let params = PolicyParams::zeros(2, 3);
        assert!(matches!(
            TestAgent::from_params(PolicyGradientConfig::default(), params),
            Err(AgentError::ParamsMismatch { .. })
        ));
    }
}
