use omega_agent::{
    ActOutput, Agent, AgentTrajectoryBatch, Batch, Key, TrajectoryBatch, Transition,
    batch::{to_device, to_host},
};
use omega_env::{EnvBatch, Environment, StepBatch, WorkerEnvStepper};
use omega_stats::{EpisodeIndex, StatsSink};
use tracing::{debug, info, warn};

use crate::{ConfigError, EpisodeIndexAllocator, Night, TrainError, TrainerConfig};

/// Drives an agent through day (collection) and night (training) stages.
///
/// The trainer is the only writer of the current observation batch, the current
/// memory batch and the episode index table; all three persist across training
/// steps.
#[derive(Debug)]
pub struct Trainer<A, E, N>
where
    A: Agent,
{
    agent: A,
    env_batch: E,
    night: N,
    num_collection_steps: usize,
    key: Key,
    episodes: EpisodeIndexAllocator,
    current_state: Batch<A::Observation>,
    memory: Batch<A::Memory>,
}

impl<A, N> Trainer<A, WorkerEnvStepper<A::Observation, A::Action>, N>
where
    A: Agent,
    A::Observation: Send + 'static,
    A::Action: Send + 'static,
    N: Night<A>,
{
    /// Builds the environments on worker threads and resets them.
    ///
    /// `env_factory` is called once per slot with the slot index. Every environment
    /// is wrapped with auto-reset, preceded by the stay-in-terminal-state wrapper
    /// when `config.allow_to_act_in_terminal_state_once` is set.
    pub fn new<Env, F>(
        agent: A,
        env_factory: F,
        config: &TrainerConfig,
        night: N,
        key: Key,
    ) -> Result<Self, TrainError>
    where
        Env: Environment<Observation = A::Observation, Action = A::Action> + 'static,
        F: Fn(usize) -> Env + Send + Sync + 'static,
    {
        config.validate()?;
        let env_batch = WorkerEnvStepper::new(
            env_factory,
            config.num_envs,
            config.num_workers,
            config.allow_to_act_in_terminal_state_once,
        )?;
        Self::from_env_batch(agent, env_batch, config.num_collection_steps, night, key)
    }
}

impl<A, E, N> Trainer<A, E, N>
where
    A: Agent,
    E: EnvBatch<Observation = A::Observation, Action = A::Action>,
    N: Night<A>,
{
    /// Creates a trainer over an existing environment batch and resets it.
    ///
    /// A horizon of zero is accepted; every training step then hands the night
    /// stage an empty trajectory batch.
    pub fn from_env_batch(
        agent: A,
        mut env_batch: E,
        num_collection_steps: usize,
        night: N,
        key: Key,
    ) -> Result<Self, TrainError> {
        let num_envs = env_batch.num_slots();
        if num_envs == 0 {
            return Err(ConfigError::NoEnvironments.into());
        }
        if num_collection_steps == 0 {
            warn!("num_collection_steps is zero, training steps will collect nothing");
        }

        let observations = env_batch.reset()?;
        TrainError::check_batch_size("reset observation batch", num_envs, observations.len())?;
        let memory = agent.init_memory_batch(num_envs);
        TrainError::check_batch_size("initial memory batch", num_envs, memory.len())?;

        info!(num_envs, num_collection_steps, "trainer ready");
        Ok(Self {
            agent,
            env_batch,
            night,
            num_collection_steps,
            key,
            episodes: EpisodeIndexAllocator::new(num_envs),
            current_state: to_device(observations),
            memory,
        })
    }

    /// Collects one horizon of experience, then runs the night stage on it.
    ///
    /// When `stats` is given, every slot's transition of every step is recorded
    /// under its episode index, and the night stage may report training
    /// statistics to it.
    pub fn run_training_step(
        &mut self,
        mut stats: Option<&mut dyn StatsSink<A::Action>>,
    ) -> Result<(), TrainError> {
        let trajectories = self.collect_trajectories(&mut stats)?;
        self.night.run_night(&mut self.agent, stats, trajectories)
    }

    fn collect_trajectories(
        &mut self,
        stats: &mut Option<&mut dyn StatsSink<A::Action>>,
    ) -> Result<AgentTrajectoryBatch<A>, TrainError> {
        let num_envs = self.num_envs();
        let mut transitions = Vec::with_capacity(self.num_collection_steps);

        for _ in 0..self.num_collection_steps {
            let (key, act_key) = self.key.split();
            self.key = key;

            let ActOutput { actions, metadata } =
                self.agent
                    .act_on_batch(act_key, &self.current_state, &self.memory)?;
            TrainError::check_batch_size("action batch", num_envs, actions.len())?;

            let StepBatch {
                rewards,
                done,
                next_state,
            } = self.env_batch.step(&to_host(&actions))?;
            TrainError::check_batch_size("reward batch", num_envs, rewards.len())?;
            TrainError::check_batch_size("done batch", num_envs, done.len())?;
            TrainError::check_batch_size("next state batch", num_envs, next_state.len())?;
            let (rewards, done, next_state) =
                (to_device(rewards), to_device(done), to_device(next_state));

            for slot in 0..num_envs {
                if let Some(stats) = stats.as_mut() {
                    let episode_index = self.episodes.current(slot);
                    stats.add_transition(episode_index, &actions[slot], rewards[slot], done[slot]);
                }
                if done[slot] {
                    self.episodes.complete(slot);
                }
            }

            let transition = Transition {
                memory_before: self.memory.clone(),
                current_state: self.current_state.clone(),
                actions,
                act_metadata: metadata,
                rewards,
                done,
                next_state,
            };
            let memory = self.agent.update_memory_batch(
                &transition.memory_before,
                transition.act_metadata.memory_state_after.as_ref(),
                &transition.actions,
                &transition.done,
            )?;
            TrainError::check_batch_size("updated memory batch", num_envs, memory.len())?;
            self.memory = memory;
            self.current_state = transition.next_state.clone();
            transitions.push(transition);
        }

        let trajectories = TrajectoryBatch::stack(num_envs, &transitions)?;
        debug!(
            num_steps = trajectories.num_steps(),
            next_episode_index = %self.episodes.next_episode_index(),
            "collected trajectories"
        );
        Ok(trajectories)
    }
}

impl<A, E, N> Trainer<A, E, N>
where
    A: Agent,
{
    #[must_use]
    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut A {
        &mut self.agent
    }

    #[must_use]
    pub fn into_agent(self) -> A {
        self.agent
    }

    #[must_use]
    pub fn env_batch(&self) -> &E {
        &self.env_batch
    }

    #[must_use]
    pub fn night(&self) -> &N {
        &self.night
    }

    #[must_use]
    pub fn num_collection_steps(&self) -> usize {
        self.num_collection_steps
    }

    #[must_use]
    pub fn num_envs(&self) -> usize {
        self.episodes.num_slots()
    }

    /// Episode index of every slot's running episode.
    #[must_use]
    pub fn episode_indices(&self) -> &[EpisodeIndex] {
        self.episodes.current_indices()
    }

    #[must_use]
    pub fn next_episode_index(&self) -> EpisodeIndex {
        self.episodes.next_episode_index()
    }

    /// Key the next day step will split from.
    #[must_use]
    pub fn key(&self) -> Key {
        self.key
    }
}
