//! Agent contract and data types shared between agents and the trainer.
//!
//! An agent is a policy with recurrent per-slot memory. The trainer drives it
//! through four operations (see [`Agent`]):
//!
//! 1. `init_memory_batch` - one memory entry per environment slot
//! 2. `act_on_batch` - actions and metadata for the current observations
//! 3. `update_memory_batch` - memory carried into the next step
//! 4. `train_on_batch` - parameter update from a full trajectory batch
//!
//! # Data Representations
//!
//! Batches on the agent side are [`Batch`]es: immutable, shared per-slot vectors
//! that are cheap to keep in a trajectory. The environment side works on plain
//! vectors. [`batch::to_host`] and [`batch::to_device`] convert between the two and
//! are called at exactly two places per step (actions out, results in), so the
//! conversion cost is paid once per step rather than on every access.
//!
//! A day stage's transitions are stacked once, at the end of the horizon, into a
//! [`TrajectoryBatch`] whose fields are `[slot, time]` arrays ([`Stacked`]).
//!
//! # Randomness
//!
//! Agents never use ambient randomness. Every call that samples receives an
//! explicit [`Key`], split from the caller's key, which makes a whole day stage
//! reproducible from one initial key.
//!
//! # Agents
//!
//! - [`RandomAgent`] - uniform random actions, no memory, no training
//! - [`PolicyGradientAgent`] - linear softmax policy with a memory trace, trained
//!   with REINFORCE

pub use self::{
    agent::{ActMetadata, ActOutput, Agent, AgentTrajectoryBatch, AgentTransition},
    batch::Batch,
    key::Key,
    policy_gradient::{
        MemoryReset, PolicyGradientAgent, PolicyGradientConfig, PolicyMetadata, PolicyParams,
    },
    random::RandomAgent,
    trajectory::{StackError, Stacked, StackedMetadata, TrajectoryBatch, Transition},
};

pub mod agent;
pub mod batch;
pub mod key;
pub mod policy_gradient;
pub mod random;
pub mod trajectory;
pub mod weights;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum AgentError {
    #[display("batch size mismatch: expected {expected} slots, got {actual}")]
    BatchSizeMismatch { expected: usize, actual: usize },
    #[display("observation has {actual} features, expected {expected}")]
    FeatureSizeMismatch { expected: usize, actual: usize },
    #[display("no action with index {index}")]
    UnknownAction { index: usize },
    #[display("memory update requires the memory state computed by act_on_batch")]
    MissingMemoryState,
    #[display("invalid agent configuration: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f32 },
    #[display("parameters do not match the agent: {message}")]
    ParamsMismatch { message: String },
    #[display("parameter update produced non-finite values")]
    NonFiniteUpdate,
}

impl AgentError {
    pub(crate) fn check_batch_size(expected: usize, actual: usize) -> Result<(), Self> {
        if expected == actual {
            Ok(())
        } else {
            Err(Self::BatchSizeMismatch { expected, actual })
        }
    }
}
