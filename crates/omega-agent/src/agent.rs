use omega_stats::TrainingStats;

use crate::{AgentError, Batch, Key, TrajectoryBatch, Transition};

/// Per-step output of [`Agent::act_on_batch`] besides the actions.
#[derive(Debug, Clone, PartialEq)]
pub struct ActMetadata<M, X> {
    /// Memory the agent computed while acting, if it computes one.
    ///
    /// When present, the trainer hands it to [`Agent::update_memory_batch`].
    pub memory_state_after: Option<Batch<M>>,
    /// Agent-specific per-slot data, kept in the trajectory for training.
    pub extra: Batch<X>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActOutput<A, M, X> {
    pub actions: Batch<A>,
    pub metadata: ActMetadata<M, X>,
}

pub type AgentTransition<G> = Transition<
    <G as Agent>::Observation,
    <G as Agent>::Action,
    <G as Agent>::Memory,
    <G as Agent>::Metadata,
>;

pub type AgentTrajectoryBatch<G> = TrajectoryBatch<
    <G as Agent>::Observation,
    <G as Agent>::Action,
    <G as Agent>::Memory,
    <G as Agent>::Metadata,
>;

/// A trainable policy with recurrent per-slot memory.
///
/// All batches are indexed by environment slot and have the trainer's slot count.
/// Acting is a pure function of the inputs and the key; only
/// [`train_on_batch`](Agent::train_on_batch) changes the agent.
pub trait Agent {
    type Observation: Clone;
    type Action: Clone;
    type Memory: Clone;
    type Metadata: Clone;

    /// Initial memory for `num_slots` slots.
    fn init_memory_batch(&self, num_slots: usize) -> Batch<Self::Memory>;

    /// Chooses one action per slot.
    fn act_on_batch(
        &self,
        key: Key,
        states: &Batch<Self::Observation>,
        memory: &Batch<Self::Memory>,
    ) -> Result<ActOutput<Self::Action, Self::Memory, Self::Metadata>, AgentError>;

    /// Computes the memory to act with on the next step.
    ///
    /// `done[i]` marks slots whose episode just ended; their memory should start
    /// the next episode. `memory_state_after` is what `act_on_batch` returned, if
    /// anything.
    fn update_memory_batch(
        &self,
        prev_memory: &Batch<Self::Memory>,
        memory_state_after: Option<&Batch<Self::Memory>>,
        actions: &Batch<Self::Action>,
        done: &Batch<bool>,
    ) -> Result<Batch<Self::Memory>, AgentError>;

    /// Updates parameters from one day stage's trajectories.
    fn train_on_batch(
        &mut self,
        trajectories: &AgentTrajectoryBatch<Self>,
    ) -> Result<TrainingStats, AgentError>;
}
