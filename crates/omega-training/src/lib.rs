//! On-policy training loop.
//!
//! A [`Trainer`] alternates two stages per [`Trainer::run_training_step`]:
//!
//! 1. **Day**: `h` synchronous steps across all `N` environment slots. Each step
//!    asks the agent for actions, steps the environments, records per-slot
//!    statistics under the slot's episode index, updates the agent's memory and
//!    appends the step to the trajectory buffer. At the end of the day the buffer
//!    is stacked into one `[slot, time]` trajectory batch.
//! 2. **Night**: a [`Night`] strategy consumes the batch. [`OnPolicyNight`] trains
//!    the agent on it; [`NoopNight`] discards it.
//!
//! # Episode Bookkeeping
//!
//! Slot `i` starts in episode `i`. When a slot reports `done`, its final
//! transition is recorded under the old index and the slot takes the next unused
//! one (see [`EpisodeIndexAllocator`]). Because environments auto-reset, the
//! slot's next observation already belongs to the new episode.
//!
//! # Determinism
//!
//! The trainer owns a [`Key`](omega_agent::Key) and splits it once per day step,
//! so with deterministic environments a run is reproducible from its initial key.
//!
//! # Errors
//!
//! Environment, agent and stacking failures are returned from
//! `run_training_step` as [`TrainError`], unchanged and without retry.
//!
//! # Example
//!
//! ```
//! use omega_agent::{Key, RandomAgent};
//! use omega_env::dungeon::{DungeonConfig, DungeonEnv, DungeonSeed};
//! use omega_stats::RunStats;
//! use omega_training::{NoopNight, Trainer, TrainerConfig};
//!
//! let config = TrainerConfig {
//!     num_envs: 4,
//!     num_collection_steps: 8,
//!     num_workers: 2,
//!     allow_to_act_in_terminal_state_once: false,
//! };
//! let dungeon = DungeonConfig::default();
//! let seed = DungeonSeed::from_u128(1);
//! let factory = move |slot| DungeonEnv::new(dungeon.clone(), seed.for_slot(slot));
//!
//! let mut trainer =
//!     Trainer::new(RandomAgent::new(), factory, &config, NoopNight, Key::new(0)).unwrap();
//! let mut stats = RunStats::new(100);
//! trainer.run_training_step(Some(&mut stats)).unwrap();
//! assert_eq!(stats.total_steps(), 4 * 8);
//! ```

use omega_agent::{AgentError, StackError};
use omega_env::EnvError;

pub use self::{
    config::{ConfigError, TrainerConfig},
    episode::EpisodeIndexAllocator,
    night::{Night, NoopNight, OnPolicyNight},
    trainer::Trainer,
};

pub mod config;
pub mod episode;
pub mod night;
pub mod trainer;

#[derive(Debug, derive_more::Display, derive_more::Error, derive_more::From)]
pub enum TrainError {
    #[display("invalid trainer configuration")]
    Config(ConfigError),
    #[display("environment batch failed")]
    Env(EnvError),
    #[display("agent failed")]
    Agent(AgentError),
    #[display("failed to stack trajectories")]
    Stack(StackError),
    #[display("{what} covers {actual} slots, expected {expected}")]
    #[from(skip)]
    BatchSize {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

impl TrainError {
    pub(crate) fn check_batch_size(
        what: &'static str,
        expected: usize,
        actual: usize,
    ) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::BatchSize {
                what,
                expected,
                actual,
            })
        }
    }
}
