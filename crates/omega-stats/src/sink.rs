use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::EpisodeIndex;

/// Named scalar statistics produced by one parameter update ("night" stage).
///
/// Keys are metric names such as `loss` or `entropy`. Ordering is by name so
/// that logs and serialized summaries are stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainingStats(BTreeMap<String, f32>);

impl TrainingStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<K>(&mut self, name: K, value: f32)
    where
        K: Into<String>,
    {
        self.0.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f32> {
        self.0.get(name).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<K> FromIterator<(K, f32)> for TrainingStats
where
    K: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, f32)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Recording interface the trainer reports to.
///
/// `A` is the action type of the environment being played. Implementations own
/// their own lifecycle; the trainer only ever appends.
pub trait StatsSink<A: ?Sized> {
    /// Records one slot's transition for one step.
    ///
    /// The final transition of an episode (`done == true`) is recorded under the
    /// index the episode started with.
    fn add_transition(&mut self, episode_index: EpisodeIndex, action: &A, reward: f32, done: bool);

    /// Records the statistics returned by one parameter update.
    fn add_rolling_stats(&mut self, training_stats: &TrainingStats);
}
