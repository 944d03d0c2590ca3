use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum ConfigError {
    #[display("at least one environment is required")]
    NoEnvironments,
    #[display("at least one environment worker is required")]
    NoWorkers,
    #[display("{num_workers} workers cannot share {num_envs} environments")]
    TooManyWorkers { num_workers: usize, num_envs: usize },
    #[display("num_collection_steps must be positive")]
    NoCollectionSteps,
}

/// How the trainer lays out and steps its environments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Number of environment slots (`N`).
    pub num_envs: usize,
    /// Steps collected per training step (`h`).
    pub num_collection_steps: usize,
    /// Threads the environments are spread over.
    pub num_workers: usize,
    /// Take one more action from the terminal observation before resetting.
    pub allow_to_act_in_terminal_state_once: bool,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            num_envs: 16,
            num_collection_steps: 32,
            num_workers: 4,
            allow_to_act_in_terminal_state_once: false,
        }
    }
}

impl TrainerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_envs == 0 {
            return Err(ConfigError::NoEnvironments);
        }
        if self.num_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.num_workers > self.num_envs {
            return Err(ConfigError::TooManyWorkers {
                num_workers: self.num_workers,
                num_envs: self.num_envs,
            });
        }
        if self.num_collection_steps == 0 {
            return Err(ConfigError::NoCollectionSteps);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert_eq!(TrainerConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_layouts() {
        let base = TrainerConfig::default();
        let cases = [
            (
                TrainerConfig {
                    num_envs: 0,
                    ..base.clone()
                },
                ConfigError::NoEnvironments,
            ),
            (
                TrainerConfig {
                    num_workers: 0,
                    ..base.clone()
                },
                ConfigError::NoWorkers,
            ),
            (
                TrainerConfig {
                    num_envs: 2,
                    num_workers: 3,
                    ..base.clone()
                },
                ConfigError::TooManyWorkers {
                    num_workers: 3,
                    num_envs: 2,
                },
            ),
            (
                TrainerConfig {
                    num_collection_steps: 0,
                    ..base
                },
                ConfigError::NoCollectionSteps,
            ),
        ];
        for (config, expected) in cases {
            assert_eq!(config.validate(), Err(expected));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrainerConfig = serde_json::from_str(r#"{"num_envs": 8}"#).unwrap();
        assert_eq!(config.num_envs, 8);
        assert_eq!(
            config.num_collection_steps,
            TrainerConfig::default().num_collection_steps
        );
    }
}
