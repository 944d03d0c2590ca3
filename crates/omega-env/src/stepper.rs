//! Thread-backed environment batch.
//!
//! [`WorkerEnvStepper`] partitions the slots into contiguous chunks and gives each
//! chunk to a dedicated worker thread. Environments are constructed *inside* their
//! worker from a shared factory, so they never cross threads and need not be
//! `Send`; only actions and observations do.
//!
//! # Protocol
//!
//! Each worker owns a command receiver and a reply sender. A batched call sends one
//! command to every worker, then waits for every reply in worker order. Replies are
//! always drained completely, even when an earlier worker failed, so the channels
//! never fall out of step with each other.
//!
//! A panic inside an environment is caught in the worker and reported as
//! [`EnvError::WorkerPanicked`]; a worker that went away is reported as
//! [`EnvError::WorkerDisconnected`]. Workers shut down when the stepper is dropped.

use std::{
    any::Any,
    ops::Range,
    panic::{self, AssertUnwindSafe},
    sync::{
        Arc,
        mpsc::{self, Receiver, Sender},
    },
    thread::{self, JoinHandle},
};

use crate::{EnvBatch, EnvError, Environment, StepBatch, wrappers};

enum Command<A> {
    Reset,
    Step(Vec<A>),
}

enum Reply<O> {
    Reset(Vec<O>),
    Step(StepBatch<O>),
}

struct Worker<O, A> {
    slots: Range<usize>,
    commands: Sender<Command<A>>,
    replies: Receiver<Result<Reply<O>, EnvError>>,
    handle: JoinHandle<()>,
}

/// Environment batch stepped in parallel by a pool of worker threads.
pub struct WorkerEnvStepper<O, A> {
    num_slots: usize,
    workers: Vec<Worker<O, A>>,
}

impl<O, A> std::fmt::Debug for WorkerEnvStepper<O, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerEnvStepper")
            .field("num_slots", &self.num_slots)
            .field("num_workers", &self.workers.len())
            .finish()
    }
}

/// Splits `num_slots` into `num_workers` contiguous, near-equal chunks.
///
/// The first `num_slots % num_workers` chunks get one extra slot.
fn partition(num_slots: usize, num_workers: usize) -> Vec<Range<usize>> {
    let base = num_slots / num_workers;
    let extra = num_slots % num_workers;
    let mut start = 0;
    (0..num_workers)
        .map(|worker| {
            let len = base + usize::from(worker < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

impl<O, A> WorkerEnvStepper<O, A>
where
    O: Send + 'static,
    A: Send + 'static,
{
    /// Spawns `num_workers` threads hosting `num_slots` environments.
    ///
    /// `factory` is called once per slot, with the slot index, on the thread that
    /// owns that slot. Each environment gets the standard wrapper stack (see
    /// [`wrappers::wrap`]).
    pub fn new<E, F>(
        factory: F,
        num_slots: usize,
        num_workers: usize,
        allow_to_act_in_terminal_state_once: bool,
    ) -> Result<Self, EnvError>
    where
        E: Environment<Observation = O, Action = A> + 'static,
        O: Clone,
        F: Fn(usize) -> E + Send + Sync + 'static,
    {
        if num_slots == 0 || num_workers == 0 || num_workers > num_slots {
            return Err(EnvError::InvalidLayout {
                num_slots,
                num_workers,
            });
        }

        let factory = Arc::new(factory);
        let mut workers = Vec::with_capacity(num_workers);
        for (worker, slots) in partition(num_slots, num_workers).into_iter().enumerate() {
            let (command_tx, command_rx) = mpsc::channel();
            let (reply_tx, reply_rx) = mpsc::channel();
            let factory = Arc::clone(&factory);
            let worker_slots = slots.clone();
            let handle = thread::Builder::new()
                .name(format!("env-worker-{worker}"))
                .spawn(move || {
                    let make_env = |slot| {
                        wrappers::wrap((*factory)(slot), allow_to_act_in_terminal_state_once)
                    };
                    run_worker(worker, worker_slots, make_env, &command_rx, &reply_tx);
                })
                .map_err(|source| EnvError::Spawn { worker, source })?;
            workers.push(Worker {
                slots,
                commands: command_tx,
                replies: reply_rx,
                handle,
            });
        }

        tracing::info!(num_slots, num_workers, "started environment workers");
        Ok(Self { num_slots, workers })
    }

    #[must_use]
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Sends one command per worker, then collects every reply in worker order.
    fn broadcast<C>(&self, mut command: C) -> Result<Vec<Reply<O>>, EnvError>
    where
        C: FnMut(&Range<usize>) -> Command<A>,
    {
        let mut first_error = None;
        let mut sent = Vec::with_capacity(self.workers.len());
        for (index, worker) in self.workers.iter().enumerate() {
            let ok = worker.commands.send(command(&worker.slots)).is_ok();
            if !ok && first_error.is_none() {
                first_error = Some(EnvError::WorkerDisconnected { worker: index });
            }
            sent.push(ok);
        }

        let mut replies = Vec::with_capacity(self.workers.len());
        for (index, (worker, sent)) in self.workers.iter().zip(sent).enumerate() {
            if !sent {
                continue;
            }
            match worker.replies.recv() {
                Ok(Ok(reply)) => replies.push(reply),
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                }
                Err(_) => {
                    first_error.get_or_insert(EnvError::WorkerDisconnected { worker: index });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(replies),
        }
    }
}

impl<O, A> EnvBatch for WorkerEnvStepper<O, A>
where
    O: Send + 'static,
    A: Clone + Send + 'static,
{
    type Observation = O;
    type Action = A;

    fn num_slots(&self) -> usize {
        self.num_slots
    }

    fn reset(&mut self) -> Result<Vec<O>, EnvError> {
        let mut observations = Vec::with_capacity(self.num_slots);
        for reply in self.broadcast(|_| Command::Reset)? {
            match reply {
                Reply::Reset(mut chunk) => observations.append(&mut chunk),
                Reply::Step(_) => unreachable!("worker answered reset with a step"),
            }
        }
        Ok(observations)
    }

    fn step(&mut self, actions: &[A]) -> Result<StepBatch<O>, EnvError> {
        if actions.len() != self.num_slots {
            return Err(EnvError::ActionCountMismatch {
                expected: self.num_slots,
                actual: actions.len(),
            });
        }
        let mut batch = StepBatch::with_capacity(self.num_slots);
        for reply in self.broadcast(|slots| Command::Step(actions[slots.clone()].to_vec()))? {
            match reply {
                Reply::Step(mut chunk) => batch.append(&mut chunk),
                Reply::Reset(_) => unreachable!("worker answered step with a reset"),
            }
        }
        Ok(batch)
    }
}

impl<O, A> Drop for WorkerEnvStepper<O, A> {
    fn drop(&mut self) {
        // Closing every command channel first lets all workers exit concurrently.
        let handles = self
            .workers
            .drain(..)
            .map(|worker| {
                drop(worker.commands);
                worker.handle
            })
            .collect::<Vec<_>>();
        for handle in handles {
            if handle.join().is_err() {
                tracing::warn!("environment worker exited with a panic");
            }
        }
        tracing::debug!("environment workers stopped");
    }
}

fn run_worker<E, M>(
    worker: usize,
    slots: Range<usize>,
    make_env: M,
    commands: &Receiver<Command<E::Action>>,
    replies: &Sender<Result<Reply<E::Observation>, EnvError>>,
) where
    E: Environment,
    M: Fn(usize) -> E,
{
    let envs = panic::catch_unwind(AssertUnwindSafe(|| {
        slots.clone().map(&make_env).collect::<Vec<_>>()
    }));
    let mut envs = match envs {
        Ok(envs) => envs,
        Err(payload) => {
            let message = panic_message(&*payload);
            tracing::error!(worker, %message, "environment construction panicked");
            for _ in commands {
                let error = EnvError::WorkerPanicked {
                    worker,
                    message: message.clone(),
                };
                if replies.send(Err(error)).is_err() {
                    break;
                }
            }
            return;
        }
    };

    for command in commands {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            handle_command(&mut envs, slots.start, command)
        }))
        .unwrap_or_else(|payload| {
            Err(EnvError::WorkerPanicked {
                worker,
                message: panic_message(&*payload),
            })
        });
        if replies.send(result).is_err() {
            break;
        }
    }
}

fn handle_command<E>(
    envs: &mut [E],
    first_slot: usize,
    command: Command<E::Action>,
) -> Result<Reply<E::Observation>, EnvError>
where
    E: Environment,
{
    match command {
        Command::Reset => envs
            .iter_mut()
            .enumerate()
            .map(|(i, env)| env.reset().map_err(|e| e.in_slot(first_slot + i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Reply::Reset),
        Command::Step(actions) => envs
            .iter_mut()
            .zip(actions)
            .enumerate()
            .map(|(i, (env, action))| env.step(action).map_err(|e| e.in_slot(first_slot + i)))
            .collect::<Result<StepBatch<_>, _>>()
            .map(Reply::Step),
    }
}

#[cfg(test)]
mod tests {
    use std::thread::ThreadId;

    use super::*;
    use crate::Step;

    /// Reports its slot, its step count and the thread it runs on.
    struct Probe {
        slot: usize,
        t: usize,
        panic_on: Option<usize>,
    }

    impl Environment for Probe {
        type Observation = (usize, usize, ThreadId);
        type Action = usize;

        fn reset(&mut self) -> Result<Self::Observation, EnvError> {
            self.t = 0;
            Ok((self.slot, self.t, thread::current().id()))
        }

        fn step(&mut self, action: usize) -> Result<Step<Self::Observation>, EnvError> {
            assert_ne!(Some(action), self.panic_on, "probe exploded");
            self.t += 1;
            #[expect(clippy::cast_precision_loss)]
            let reward = (self.slot * 100 + action) as f32;
            Ok(Step {
                observation: (self.slot, self.t, thread::current().id()),
                reward,
                done: self.t % 2 == 0,
            })
        }
    }

    fn stepper(
        num_slots: usize,
        num_workers: usize,
    ) -> WorkerEnvStepper<(usize, usize, ThreadId), usize> {
        WorkerEnvStepper::new(
            |slot| Probe {
                slot,
                t: 0,
                panic_on: Some(99),
            },
            num_slots,
            num_workers,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_partition() {
        assert_eq!(partition(5, 2), [0..3, 3..5]);
        assert_eq!(partition(4, 4), [0..1, 1..2, 2..3, 3..4]);
        assert_eq!(partition(7, 3), [0..3, 3..5, 5..7]);
    }

    #[test]
    fn test_invalid_layout() {
        let make = |slot| Probe {
            slot,
            t: 0,
            panic_on: None,
        };
        assert!(matches!(
            WorkerEnvStepper::new(make, 0, 1, false),
            Err(EnvError::InvalidLayout { .. })
        ));
        assert!(matches!(
            WorkerEnvStepper::new(make, 2, 3, false),
            Err(EnvError::InvalidLayout { .. })
        ));
        assert!(matches!(
            WorkerEnvStepper::new(make, 2, 0, false),
            Err(EnvError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn test_reset_and_step_preserve_slot_order() {
        let mut stepper = stepper(5, 2);
        let observations = stepper.reset().unwrap();
        let slots = observations.iter().map(|o| o.0).collect::<Vec<_>>();
        assert_eq!(slots, [0, 1, 2, 3, 4]);

        let result = stepper.step(&[1, 2, 3, 4, 5]).unwrap();
        assert_eq!(result.rewards, [1.0, 102.0, 203.0, 304.0, 405.0]);
        assert_eq!(result.done, [false; 5]);

        let result = stepper.step(&[0; 5]).unwrap();
        assert_eq!(result.done, [true; 5]);
        assert!(result.next_state.iter().all(|o| o.1 == 0));
    }

    #[test]
    fn test_slots_run_on_their_worker_thread() {
        let mut stepper = stepper(4, 2);
        let observations = stepper.reset().unwrap();
        assert_eq!(observations[0].2, observations[1].2);
        assert_eq!(observations[2].2, observations[3].2);
        assert_ne!(observations[1].2, observations[2].2);
        assert_ne!(observations[0].2, thread::current().id());
    }

    #[test]
    fn test_panic_is_reported_and_other_workers_stay_in_step() {
        let mut stepper = stepper(4, 2);
        stepper.reset().unwrap();

        let err = stepper.step(&[0, 0, 99, 0]).unwrap_err();
        assert!(matches!(err, EnvError::WorkerPanicked { worker: 1, .. }));

        // The healthy worker's reply was drained, so the next call lines up.
        let result = stepper.step(&[1, 1, 1, 1]).unwrap();
        assert_eq!(result.len(), 4);
        assert_eq!(result.rewards[0], 1.0);
    }

    #[test]
    fn test_action_count_mismatch() {
        let mut stepper = stepper(3, 3);
        stepper.reset().unwrap();
        assert!(matches!(
            stepper.step(&[0, 0]),
            Err(EnvError::ActionCountMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }
}
