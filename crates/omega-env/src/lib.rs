//! Environment contracts and batched stepping for omega.
//!
//! The trainer never talks to a single game directly. It drives an [`EnvBatch`]:
//! a fixed number of independent environment *slots* that are reset once and then
//! stepped together, one action per slot, with a barrier at every step.
//!
//! # Layers
//!
//! ```text
//! Environment (one game)
//!     ↓ wrapped by
//! StayInTerminalState (optional) → AutoReset
//!     ↓ owned by
//! EnvBatch (SerialEnvBatch / WorkerEnvStepper)
//!     ↓ driven by
//! Trainer (omega-training)
//! ```
//!
//! Auto-reset is what makes the batch contract simple: a slot whose episode ends
//! reports `done = true` and already returns the first observation of its next
//! episode, so the caller never handles a missing observation.
//!
//! # Slot Isolation
//!
//! Every environment owns its own random generator, seeded per slot. Stepping or
//! resetting slot `i` never draws randomness on behalf of slot `j`, and a failing
//! slot is reported with its index instead of silently dropping out of the batch.
//!
//! # Example
//!
//! ```
//! use omega_env::{
//!     EnvBatch as _, SerialEnvBatch,
//!     dungeon::{DungeonAction, DungeonConfig, DungeonEnv, DungeonSeed},
//! };
//!
//! let config = DungeonConfig::default();
//! let seed = DungeonSeed::from_u128(7);
//! let mut batch = SerialEnvBatch::auto_reset(4, false, |slot| {
//!     DungeonEnv::new(config.clone(), seed.for_slot(slot))
//! });
//!
//! let observations = batch.reset().unwrap();
//! assert_eq!(observations.len(), 4);
//!
//! let result = batch.step(&[DungeonAction::Wait; 4]).unwrap();
//! assert_eq!(result.len(), 4);
//! ```

pub use self::{
    batch::{EnvBatch, SerialEnvBatch, StepBatch},
    env::{DiscreteAction, Environment, FeatureObservation, Step},
    stepper::WorkerEnvStepper,
    wrappers::{AutoReset, StayInTerminalState, wrap},
};

pub mod batch;
pub mod dungeon;
pub mod env;
pub mod stepper;
pub mod wrappers;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum EnvError {
    #[display("expected {expected} actions, got {actual}")]
    ActionCountMismatch { expected: usize, actual: usize },
    #[display("invalid slot layout: {num_slots} slots across {num_workers} workers")]
    InvalidLayout { num_slots: usize, num_workers: usize },
    #[display("environment fault: {message}")]
    Fault { message: String },
    #[display("environment in slot {slot} failed")]
    Slot { slot: usize, source: Box<EnvError> },
    #[display("failed to spawn environment worker {worker}")]
    Spawn {
        worker: usize,
        source: std::io::Error,
    },
    #[display("environment worker {worker} panicked: {message}")]
    WorkerPanicked { worker: usize, message: String },
    #[display("environment worker {worker} disconnected")]
    WorkerDisconnected { worker: usize },
}

impl EnvError {
    /// Attaches the slot index to an error raised by a single environment.
    #[must_use]
    pub fn in_slot(self, slot: usize) -> Self {
        Self::Slot {
            slot,
            source: Box::new(self),
        }
    }
}
