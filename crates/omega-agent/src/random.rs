use std::marker::PhantomData;

use omega_env::DiscreteAction;
use omega_stats::TrainingStats;
use rand::Rng as _;

use crate::{ActMetadata, ActOutput, Agent, AgentError, AgentTrajectoryBatch, Batch, Key};

/// Picks uniformly random actions. Has no memory and never learns.
#[derive(Debug)]
pub struct RandomAgent<O, A> {
    _marker: PhantomData<fn(O) -> A>,
}

impl<O, A> RandomAgent<O, A> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<O, A> Default for RandomAgent<O, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O, A> Agent for RandomAgent<O, A>
where
    O: Clone,
    A: DiscreteAction,
{
    type Observation = O;
    type Action = A;
    type Memory = ();
    type Metadata = ();

    fn init_memory_batch(&self, num_slots: usize) -> Batch<()> {
        vec![(); num_slots].into()
    }

    fn act_on_batch(
        &self,
        key: Key,
        states: &Batch<O>,
        memory: &Batch<()>,
    ) -> Result<ActOutput<A, (), ()>, AgentError> {
        AgentError::check_batch_size(states.len(), memory.len())?;
        let mut rng = key.rng();
        let actions = (0..states.len())
            .map(|_| {
                let index = rng.random_range(0..A::COUNT);
                A::from_index(index).ok_or(AgentError::UnknownAction { index })
            })
            .collect::<Result<Batch<_>, _>>()?;
        Ok(ActOutput {
            actions,
            metadata: ActMetadata {
                memory_state_after: None,
                extra: vec![(); states.len()].into(),
            },
        })
    }

    fn update_memory_batch(
        &self,
        prev_memory: &Batch<()>,
        _memory_state_after: Option<&Batch<()>>,
        _actions: &Batch<A>,
        done: &Batch<bool>,
    ) -> Result<Batch<()>, AgentError> {
        AgentError::check_batch_size(prev_memory.len(), done.len())?;
        Ok(prev_memory.clone())
    }

    fn train_on_batch(
        &mut self,
        _trajectories: &AgentTrajectoryBatch<Self>,
    ) -> Result<TrainingStats, AgentError> {
        Ok(TrainingStats::new())
    }
}
