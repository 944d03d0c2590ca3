use crate::EnvError;

/// Outcome of a single environment step.
#[derive(Debug, Clone, PartialEq)]
pub struct Step<O> {
    pub observation: O,
    pub reward: f32,
    pub done: bool,
}

/// A single stateful game instance.
///
/// `done` is the only termination signal. What `observation` holds after a
/// terminal step is up to the environment; wrap it in [`AutoReset`] to get the
/// batch contract, where it is always the start of the next episode.
///
/// [`AutoReset`]: crate::AutoReset
pub trait Environment {
    type Observation;
    type Action;

    /// Starts a new episode and returns its first observation.
    fn reset(&mut self) -> Result<Self::Observation, EnvError>;

    /// Advances the episode by one action.
    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>, EnvError>;
}

/// A finite action set whose members can be numbered `0..COUNT`.
///
/// The `Into<usize>` conversion yields the action index; [`Self::from_index`]
/// is its inverse.
pub trait DiscreteAction: Copy + Into<usize> + Send + 'static {
    const COUNT: usize;

    fn from_index(index: usize) -> Option<Self>;
}

/// An observation with a flat feature view, as consumed by linear policies.
pub trait FeatureObservation {
    fn features(&self) -> &[f32];
}

impl<E> Environment for Box<E>
where
    E: Environment + ?Sized,
{
    type Observation = E::Observation;
    type Action = E::Action;

    fn reset(&mut self) -> Result<Self::Observation, EnvError> {
        (**self).reset()
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>, EnvError> {
        (**self).step(action)
    }
}
