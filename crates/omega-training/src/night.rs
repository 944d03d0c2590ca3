//! Night stage strategies: what happens to a day's trajectories.

use omega_agent::{Agent, AgentTrajectoryBatch};
use omega_stats::{StatsSink, TrainingStats};
use tracing::{debug, trace};

use crate::TrainError;

/// Consumes the trajectory batch of one day stage.
pub trait Night<A>
where
    A: Agent,
{
    fn run_night(
        &mut self,
        agent: &mut A,
        stats: Option<&mut dyn StatsSink<A::Action>>,
        trajectories: AgentTrajectoryBatch<A>,
    ) -> Result<(), TrainError>;
}

/// Discards the trajectories. Used for evaluation runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNight;

impl<A> Night<A> for NoopNight
where
    A: Agent,
{
    fn run_night(
        &mut self,
        _agent: &mut A,
        _stats: Option<&mut dyn StatsSink<A::Action>>,
        trajectories: AgentTrajectoryBatch<A>,
    ) -> Result<(), TrainError> {
        trace!(
            num_steps = trajectories.num_steps(),
            "discarding trajectories"
        );
        Ok(())
    }
}

/// Trains the agent on the day's trajectories and reports the result.
#[derive(Debug, Clone, Default)]
pub struct OnPolicyNight {
    last_training_stats: Option<TrainingStats>,
}

impl OnPolicyNight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics of the most recent update.
    #[must_use]
    pub fn last_training_stats(&self) -> Option<&TrainingStats> {
        self.last_training_stats.as_ref()
    }
}

impl<A> Night<A> for OnPolicyNight
where
    A: Agent,
{
    fn run_night(
        &mut self,
        agent: &mut A,
        stats: Option<&mut dyn StatsSink<A::Action>>,
        trajectories: AgentTrajectoryBatch<A>,
    ) -> Result<(), TrainError> {
        let training_stats = agent.train_on_batch(&trajectories)?;
        debug!(
            num_slots = trajectories.num_slots(),
            num_steps = trajectories.num_steps(),
            stats = ?training_stats,
            "trained on trajectories"
        );
        if let Some(stats) = stats {
            stats.add_rolling_stats(&training_stats);
        }
        self.last_training_stats = Some(training_stats);
        Ok(())
    }
}
