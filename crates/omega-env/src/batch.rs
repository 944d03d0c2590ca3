use crate::{EnvError, Environment, Step, wrappers};

/// Per-slot results of one batched step, in slot order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepBatch<O> {
    pub rewards: Vec<f32>,
    pub done: Vec<bool>,
    pub next_state: Vec<O>,
}

impl<O> StepBatch<O> {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rewards: Vec::with_capacity(capacity),
            done: Vec::with_capacity(capacity),
            next_state: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, step: Step<O>) {
        let Step {
            observation,
            reward,
            done,
        } = step;
        self.rewards.push(reward);
        self.done.push(done);
        self.next_state.push(observation);
    }

    /// Appends another batch's slots after this batch's slots.
    pub fn append(&mut self, other: &mut Self) {
        self.rewards.append(&mut other.rewards);
        self.done.append(&mut other.done);
        self.next_state.append(&mut other.next_state);
    }

    /// Number of slots, taken from the rewards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }
}

impl<O> FromIterator<Step<O>> for StepBatch<O> {
    fn from_iter<T: IntoIterator<Item = Step<O>>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut batch = Self::with_capacity(iter.size_hint().0);
        for step in iter {
            batch.push(step);
        }
        batch
    }
}

/// A fixed-size batch of independent environments stepped in lockstep.
///
/// Implementations must apply auto-reset semantics: a slot reporting `done` has
/// already started its next episode, and its `next_state` is that episode's first
/// observation. `step` returns only once every slot has been stepped.
pub trait EnvBatch {
    type Observation;
    type Action;

    fn num_slots(&self) -> usize;

    /// Resets every slot and returns the initial observations in slot order.
    fn reset(&mut self) -> Result<Vec<Self::Observation>, EnvError>;

    /// Steps every slot with the action at the same position.
    fn step(&mut self, actions: &[Self::Action]) -> Result<StepBatch<Self::Observation>, EnvError>;
}

/// Steps all slots on the calling thread.
///
/// Useful for tests and for environments cheap enough that worker threads do not
/// pay for themselves.
#[derive(Debug, Clone)]
pub struct SerialEnvBatch<E> {
    envs: Vec<E>,
}

impl<E> SerialEnvBatch<E>
where
    E: Environment,
{
    /// Wraps already-constructed environments, one per slot.
    ///
    /// The environments are used as-is; they must already implement auto-reset.
    #[must_use]
    pub fn new(envs: Vec<E>) -> Self {
        Self { envs }
    }
}

impl<O, A> SerialEnvBatch<wrappers::Wrapped<O, A>> {
    /// Builds `num_slots` environments from a factory and applies the standard
    /// wrapper stack to each.
    pub fn auto_reset<E, F>(
        num_slots: usize,
        allow_to_act_in_terminal_state_once: bool,
        factory: F,
    ) -> Self
    where
        E: Environment<Observation = O, Action = A> + 'static,
        O: Clone,
        F: Fn(usize) -> E,
    {
        let envs = (0..num_slots)
            .map(|slot| wrappers::wrap(factory(slot), allow_to_act_in_terminal_state_once))
            .collect();
        Self::new(envs)
    }
}

impl<E> EnvBatch for SerialEnvBatch<E>
where
    E: Environment,
    E::Action: Clone,
{
    type Observation = E::Observation;
    type Action = E::Action;

    fn num_slots(&self) -> usize {
        self.envs.len()
    }

    fn reset(&mut self) -> Result<Vec<Self::Observation>, EnvError> {
        self.envs
            .iter_mut()
            .enumerate()
            .map(|(slot, env)| env.reset().map_err(|e| e.in_slot(slot)))
            .collect()
    }

    fn step(&mut self, actions: &[Self::Action]) -> Result<StepBatch<Self::Observation>, EnvError> {
        if actions.len() != self.envs.len() {
            return Err(EnvError::ActionCountMismatch {
                expected: self.envs.len(),
                actual: actions.len(),
            });
        }
        self.envs
            .iter_mut()
            .zip(actions)
            .enumerate()
            .map(|(slot, (env, action))| env.step(action.clone()).map_err(|e| e.in_slot(slot)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reports its slot and step count; terminates every third step.
    struct Probe {
        slot: usize,
        t: usize,
    }

    impl Environment for Probe {
        type Observation = (usize, usize);
        type Action = usize;

        fn reset(&mut self) -> Result<Self::Observation, EnvError> {
            self.t = 0;
            Ok((self.slot, self.t))
        }

        fn step(&mut self, action: usize) -> Result<Step<Self::Observation>, EnvError> {
            if action == usize::MAX {
                return Err(EnvError::Fault {
                    message: "bad action".to_owned(),
                });
            }
            self.t += 1;
            #[expect(clippy::cast_precision_loss)]
            let reward = action as f32;
            Ok(Step {
                observation: (self.slot, self.t),
                reward,
                done: self.t % 3 == 0,
            })
        }
    }

    fn probes(n: usize) -> SerialEnvBatch<wrappers::Wrapped<(usize, usize), usize>> {
        SerialEnvBatch::auto_reset(n, false, |slot| Probe { slot, t: 0 })
    }

    #[test]
    fn test_slot_order_is_preserved() {
        let mut batch = probes(3);
        assert_eq!(batch.reset().unwrap(), [(0, 0), (1, 0), (2, 0)]);
        let result = batch.step(&[10, 20, 30]).unwrap();
        assert_eq!(result.rewards, [10.0, 20.0, 30.0]);
        assert_eq!(result.next_state, [(0, 1), (1, 1), (2, 1)]);
        assert_eq!(result.done, [false, false, false]);
    }

    #[test]
    fn test_auto_reset_in_batch() {
        let mut batch = probes(2);
        batch.reset().unwrap();
        batch.step(&[0, 0]).unwrap();
        batch.step(&[0, 0]).unwrap();
        let result = batch.step(&[0, 0]).unwrap();
        assert_eq!(result.done, [true, true]);
        assert_eq!(result.next_state, [(0, 0), (1, 0)]);
    }

    #[test]
    fn test_action_count_mismatch() {
        let mut batch = probes(2);
        batch.reset().unwrap();
        let err = batch.step(&[0]).unwrap_err();
        assert!(matches!(
            err,
            EnvError::ActionCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_fault_reports_slot() {
        let mut batch = probes(3);
        batch.reset().unwrap();
        let err = batch.step(&[0, usize::MAX, 0]).unwrap_err();
        assert!(matches!(err, EnvError::Slot { slot: 1, .. }));
    }

    #[test]
    fn test_append() {
        let mut a: StepBatch<u8> = [Step {
            observation: 1,
            reward: 1.0,
            done: false,
        }]
        .into_iter()
        .collect();
        let mut b: StepBatch<u8> = [Step {
            observation: 2,
            reward: 2.0,
            done: true,
        }]
        .into_iter()
        .collect();
        a.append(&mut b);
        assert_eq!(a.next_state, [1, 2]);
        assert_eq!(a.done, [false, true]);
        assert!(b.is_empty());
    }
}
