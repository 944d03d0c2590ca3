//! Environment wrappers implementing the batch contract's episode semantics.
//!
//! - [`AutoReset`] restarts an episode as soon as it terminates, returning the new
//!   episode's first observation in place of the terminal one.
//! - [`StayInTerminalState`] holds a terminated episode in its terminal observation
//!   for exactly one more action, so an agent gets to act (and learn) from the
//!   terminal state before auto-reset engages.
//!
//! Wrappers compose as `AutoReset(StayInTerminalState(env))`; see [`wrap`].

use crate::{EnvError, Environment, Step};

/// Restarts the wrapped environment whenever a step reports `done`.
#[derive(Debug, Clone)]
pub struct AutoReset<E> {
    env: E,
}

impl<E> AutoReset<E> {
    #[must_use]
    pub fn new(env: E) -> Self {
        Self { env }
    }
}

impl<E> Environment for AutoReset<E>
where
    E: Environment,
{
    type Observation = E::Observation;
    type Action = E::Action;

    fn reset(&mut self) -> Result<Self::Observation, EnvError> {
        self.env.reset()
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>, EnvError> {
        let mut step = self.env.step(action)?;
        if step.done {
            step.observation = self.env.reset()?;
        }
        Ok(step)
    }
}

/// Delays termination by one step, keeping the terminal observation.
///
/// When the wrapped environment terminates, this wrapper reports the terminal
/// observation with the step's reward and `done = false`. The next action, whatever
/// it is, is not forwarded: the same observation is reported again with zero reward
/// and `done = true`.
pub struct StayInTerminalState<E>
where
    E: Environment,
{
    env: E,
    terminal: Option<E::Observation>,
}

impl<E> StayInTerminalState<E>
where
    E: Environment,
{
    #[must_use]
    pub fn new(env: E) -> Self {
        Self {
            env,
            terminal: None,
        }
    }

    /// Returns `true` if the wrapped episode has terminated and is waiting for its
    /// last action.
    #[must_use]
    pub fn is_in_terminal_state(&self) -> bool {
        self.terminal.is_some()
    }
}

impl<E> Environment for StayInTerminalState<E>
where
    E: Environment,
    E::Observation: Clone,
{
    type Observation = E::Observation;
    type Action = E::Action;

    fn reset(&mut self) -> Result<Self::Observation, EnvError> {
        self.terminal = None;
        self.env.reset()
    }

    fn step(&mut self, action: Self::Action) -> Result<Step<Self::Observation>, EnvError> {
        if let Some(observation) = self.terminal.take() {
            return Ok(Step {
                observation,
                reward: 0.0,
                done: true,
            });
        }
        let step = self.env.step(action)?;
        if step.done {
            self.terminal = Some(step.observation.clone());
            return Ok(Step {
                done: false,
                ..step
            });
        }
        Ok(step)
    }
}

/// A type-erased environment after wrapping.
pub type Wrapped<O, A> = AutoReset<Box<dyn Environment<Observation = O, Action = A>>>;

/// Applies the standard wrapper stack to an environment.
///
/// With `allow_to_act_in_terminal_state_once` the result is
/// `AutoReset(StayInTerminalState(env))`, otherwise `AutoReset(env)`.
pub fn wrap<E>(
    env: E,
    allow_to_act_in_terminal_state_once: bool,
) -> Wrapped<E::Observation, E::Action>
where
    E: Environment + 'static,
    E::Observation: Clone,
{
    let env: Box<dyn Environment<Observation = E::Observation, Action = E::Action>> =
        if allow_to_act_in_terminal_state_once {
            Box::new(StayInTerminalState::new(env))
        } else {
            Box::new(env)
        };
    AutoReset::new(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts steps; terminates every `episode_length` steps.
    #[derive(Debug)]
    struct Countdown {
        episode_length: u32,
        episode: u32,
        t: u32,
        forwarded_actions: u32,
    }

    impl Countdown {
        fn new(episode_length: u32) -> Self {
            Self {
                episode_length,
                episode: 0,
                t: 0,
                forwarded_actions: 0,
            }
        }
    }

    impl Environment for Countdown {
        /// `(episode, t)`
        type Observation = (u32, u32);
        type Action = ();

        fn reset(&mut self) -> Result<Self::Observation, EnvError> {
            self.episode += 1;
            self.t = 0;
            Ok((self.episode, self.t))
        }

        fn step(&mut self, (): ()) -> Result<Step<Self::Observation>, EnvError> {
            self.forwarded_actions += 1;
            self.t += 1;
            Ok(Step {
                observation: (self.episode, self.t),
                reward: 1.0,
                done: self.t == self.episode_length,
            })
        }
    }

    #[test]
    fn test_auto_reset_replaces_terminal_observation() {
        let mut env = AutoReset::new(Countdown::new(2));
        assert_eq!(env.reset().unwrap(), (1, 0));

        let step = env.step(()).unwrap();
        assert_eq!(step.observation, (1, 1));
        assert!(!step.done);

        let step = env.step(()).unwrap();
        assert!(step.done);
        assert_eq!(step.reward, 1.0);
        assert_eq!(step.observation, (2, 0));
    }

    #[test]
    fn test_stay_in_terminal_state_once() {
        let mut env = StayInTerminalState::new(Countdown::new(1));
        env.reset().unwrap();

        let step = env.step(()).unwrap();
        assert_eq!(step.observation, (1, 1));
        assert_eq!(step.reward, 1.0);
        assert!(!step.done);
        assert!(env.is_in_terminal_state());

        let step = env.step(()).unwrap();
        assert_eq!(step.observation, (1, 1));
        assert_eq!(step.reward, 0.0);
        assert!(step.done);
        assert!(!env.is_in_terminal_state());
        assert_eq!(env.env.forwarded_actions, 1);
    }

    #[test]
    fn test_wrapped_stack_resets_after_extra_action() {
        let mut env = wrap(Countdown::new(1), true);
        env.reset().unwrap();

        let terminal = env.step(()).unwrap();
        assert!(!terminal.done);
        assert_eq!(terminal.observation, (1, 1));

        let extra = env.step(()).unwrap();
        assert!(extra.done);
        assert_eq!(extra.observation, (2, 0));
    }

    #[test]
    fn test_wrapped_stack_without_terminal_action() {
        let mut env = wrap(Countdown::new(1), false);
        env.reset().unwrap();
        let step = env.step(()).unwrap();
        assert!(step.done);
        assert_eq!(step.observation, (2, 0));
    }
}
