use std::path::Path;

use anyhow::{Context, ensure};
use omega_agent::PolicyGradientConfig;
use omega_env::dungeon::{DungeonConfig, DungeonEnv, DungeonSeed};
use omega_training::TrainerConfig;
use rand::Rng as _;
use serde::{Deserialize, Serialize};

use crate::util;

/// Everything a `train` or `rollout` run is configured with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub trainer: TrainerConfig,
    pub dungeon: DungeonConfig,
    pub agent: PolicyGradientConfig,
    pub training_steps: usize,
    /// Log a progress summary every this many training steps.
    pub log_every: usize,
    /// Completed episodes and training updates kept for rolling statistics.
    pub stats_window: usize,
    /// Base seed; a random one is drawn when absent.
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            trainer: TrainerConfig::default(),
            dungeon: DungeonConfig::default(),
            agent: PolicyGradientConfig::default(),
            training_steps: 200,
            log_every: 10,
            stats_window: 100,
            seed: None,
        }
    }
}

impl RunConfig {
    /// Reads the config file, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => util::read_json_file("run config", path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.trainer
            .validate()
            .context("Invalid trainer configuration")?;
        self.dungeon
            .validate()
            .context("Invalid dungeon configuration")?;
        self.agent.validate().context("Invalid agent configuration")?;
        ensure!(self.log_every > 0, "log_every must be positive");
        ensure!(self.stats_window > 0, "stats_window must be positive");
        Ok(())
    }

    pub fn seed_or_random(&self) -> u64 {
        self.seed.unwrap_or_else(|| rand::rng().random())
    }

    /// Builds slot `i`'s dungeon from the run seed.
    pub fn dungeon_factory(
        &self,
        seed: u64,
    ) -> impl Fn(usize) -> DungeonEnv + Send + Sync + use<> {
        let config = self.dungeon.clone();
        let base = DungeonSeed::from_u128(u128::from(seed));
        move |slot| DungeonEnv::new(config.clone(), base.for_slot(slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        RunConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_file_keeps_nested_defaults() {
        let config: RunConfig =
            serde_json::from_str(r#"{"trainer": {"num_envs": 2, "num_workers": 1}, "seed": 9}"#)
                .unwrap();
        assert_eq!(config.trainer.num_envs, 2);
        assert_eq!(
            config.trainer.num_collection_steps,
            TrainerConfig::default().num_collection_steps
        );
        assert_eq!(config.dungeon, DungeonConfig::default());
        assert_eq!(config.seed_or_random(), 9);
        config.validate().unwrap();
    }

    #[test]
    fn test_rejects_zero_log_interval() {
        let config = RunConfig {
            log_every: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_nested_errors_are_reported() {
        let mut config = RunConfig::default();
        config.trainer.num_workers = 0;
        let err = config.validate().unwrap_err();
        assert!(format!("{err:#}").contains("worker"));
    }
}
