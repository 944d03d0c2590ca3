use crate::{ActMetadata, Batch};

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum StackError {
    #[display("step {step} has {actual} slots, expected {expected}")]
    RaggedStep {
        step: usize,
        expected: usize,
        actual: usize,
    },
    #[display("memory_state_after is present in {present} of {steps} steps")]
    InconsistentMemoryState { present: usize, steps: usize },
}

/// `[slot, time]` array built from per-step batches.
///
/// Storage is slot-major: the `h` entries of slot 0 come first, then slot 1, and
/// so on, so [`Stacked::slot`] is a contiguous time series.
#[derive(Debug, Clone, PartialEq)]
pub struct Stacked<T> {
    num_slots: usize,
    num_steps: usize,
    data: Vec<T>,
}

impl<T> Stacked<T> {
    /// Stacks per-step batches along the time axis.
    ///
    /// Every batch must have `num_slots` entries. An empty `steps` yields a
    /// `[num_slots, 0]` array.
    pub fn stack(num_slots: usize, steps: &[Batch<T>]) -> Result<Self, StackError>
    where
        T: Clone,
    {
        for (step, batch) in steps.iter().enumerate() {
            if batch.len() != num_slots {
                return Err(StackError::RaggedStep {
                    step,
                    expected: num_slots,
                    actual: batch.len(),
                });
            }
        }
        let data = (0..num_slots)
            .flat_map(|slot| steps.iter().map(move |batch| batch[slot].clone()))
            .collect();
        Ok(Self {
            num_slots,
            num_steps: steps.len(),
            data,
        })
    }

    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.num_slots
    }

    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.num_steps
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.num_slots, self.num_steps)
    }

    #[must_use]
    pub fn get(&self, slot: usize, step: usize) -> Option<&T> {
        if slot >= self.num_slots || step >= self.num_steps {
            return None;
        }
        self.data.get(slot * self.num_steps + step)
    }

    /// Time series of one slot.
    ///
    /// # Panics
    ///
    /// Panics if `slot >= num_slots`.
    #[must_use]
    pub fn slot(&self, slot: usize) -> &[T] {
        assert!(slot < self.num_slots, "slot {slot} out of range");
        &self.data[slot * self.num_steps..(slot + 1) * self.num_steps]
    }

    pub fn slots(&self) -> impl Iterator<Item = &[T]> {
        (0..self.num_slots).map(|slot| self.slot(slot))
    }

    /// Values of every slot at one time step, in slot order.
    ///
    /// # Panics
    ///
    /// Panics if `step >= num_steps`.
    pub fn step(&self, step: usize) -> impl Iterator<Item = &T> {
        assert!(step < self.num_steps, "step {step} out of range");
        self.data.iter().skip(step).step_by(self.num_steps)
    }
}

/// One day-stage step, as seen by the agent.
#[derive(Debug, Clone)]
pub struct Transition<O, A, M, X> {
    /// Memory the agent acted with.
    pub memory_before: Batch<M>,
    pub current_state: Batch<O>,
    pub actions: Batch<A>,
    pub act_metadata: ActMetadata<M, X>,
    pub rewards: Batch<f32>,
    pub done: Batch<bool>,
    pub next_state: Batch<O>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StackedMetadata<M, X> {
    /// Present only if every step of the horizon produced it.
    pub memory_state_after: Option<Stacked<M>>,
    pub extra: Stacked<X>,
}

/// The transitions of one day stage, stacked into `[slot, time]` arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct TrajectoryBatch<O, A, M, X> {
    pub memory_before: Stacked<M>,
    pub current_state: Stacked<O>,
    pub actions: Stacked<A>,
    pub act_metadata: StackedMetadata<M, X>,
    pub rewards: Stacked<f32>,
    pub done: Stacked<bool>,
    pub next_state: Stacked<O>,
}

impl<O, A, M, X> TrajectoryBatch<O, A, M, X>
where
    O: Clone,
    A: Clone,
    M: Clone,
    X: Clone,
{
    /// Stacks the day stage's transitions, in time order.
    pub fn stack(
        num_slots: usize,
        transitions: &[Transition<O, A, M, X>],
    ) -> Result<Self, StackError> {
        fn field<T, U, F>(num_slots: usize, ts: &[T], f: F) -> Result<Stacked<U>, StackError>
        where
            U: Clone,
            F: Fn(&T) -> Batch<U>,
        {
            let steps = ts.iter().map(f).collect::<Vec<_>>();
            Stacked::stack(num_slots, &steps)
        }

        let present = transitions
            .iter()
            .filter(|t| t.act_metadata.memory_state_after.is_some())
            .count();
        let memory_state_after = if present == 0 {
            None
        } else if present == transitions.len() {
            let steps = transitions
                .iter()
                .filter_map(|t| t.act_metadata.memory_state_after.clone())
                .collect::<Vec<_>>();
            Some(Stacked::stack(num_slots, &steps)?)
        } else {
            return Err(StackError::InconsistentMemoryState {
                present,
                steps: transitions.len(),
            });
        };

        Ok(Self {
            memory_before: field(num_slots, transitions, |t| t.memory_before.clone())?,
            current_state: field(num_slots, transitions, |t| t.current_state.clone())?,
            actions: field(num_slots, transitions, |t| t.actions.clone())?,
            act_metadata: StackedMetadata {
                memory_state_after,
                extra: field(num_slots, transitions, |t| t.act_metadata.extra.clone())?,
            },
            rewards: field(num_slots, transitions, |t| t.rewards.clone())?,
            done: field(num_slots, transitions, |t| t.done.clone())?,
            next_state: field(num_slots, transitions, |t| t.next_state.clone())?,
        })
    }
}

impl<O, A, M, X> TrajectoryBatch<O, A, M, X> {
    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.rewards.num_slots()
    }

    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.rewards.num_steps()
    }
}
