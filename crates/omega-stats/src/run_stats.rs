use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{EpisodeIndex, RollingWindow, StatsSink, Summary, TrainingStats};

#[derive(Debug, Clone, Copy, Default)]
struct EpisodeProgress {
    reward_sum: f32,
    length: usize,
}

/// Default stats accumulator for a training or evaluation run.
///
/// Transitions are accumulated per [`EpisodeIndex`] until the episode reports
/// `done`; the finished episode's return and length then enter a rolling window
/// of recent episodes. Training statistics are kept in per-metric rolling
/// windows of the same capacity.
///
/// Actions are counted by their index, so any action type convertible into
/// `usize` can be recorded.
#[derive(Debug, Clone)]
pub struct RunStats {
    window: usize,
    running: BTreeMap<EpisodeIndex, EpisodeProgress>,
    episode_returns: RollingWindow,
    episode_lengths: RollingWindow,
    completed_episodes: u64,
    total_steps: u64,
    action_counts: Vec<u64>,
    rolling: BTreeMap<String, RollingWindow>,
}

/// Snapshot of a [`RunStats`] accumulator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    pub total_steps: u64,
    pub completed_episodes: u64,
    pub running_episodes: usize,
    /// Returns of the most recent completed episodes.
    pub episode_return: Option<Summary>,
    /// Lengths of the most recent completed episodes.
    pub episode_length: Option<Summary>,
    /// Fraction of all recorded steps that took each action index.
    pub action_frequencies: Vec<f32>,
    /// Mean of each training metric over the rolling window.
    pub rolling: BTreeMap<String, f32>,
}

impl RunStats {
    /// Creates an accumulator keeping the last `window` episodes and updates.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    #[must_use]
    pub fn new(window: usize) -> Self {
        Self {
            window,
            running: BTreeMap::new(),
            episode_returns: RollingWindow::new(window),
            episode_lengths: RollingWindow::new(window),
            completed_episodes: 0,
            total_steps: 0,
            action_counts: vec![],
            rolling: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    #[must_use]
    pub fn completed_episodes(&self) -> u64 {
        self.completed_episodes
    }

    /// Returns the reward accumulated so far by a running episode.
    #[must_use]
    pub fn running_return(&self, episode_index: EpisodeIndex) -> Option<f32> {
        self.running.get(&episode_index).map(|p| p.reward_sum)
    }

    /// Returns the rolling window of a training metric, if it was ever reported.
    #[must_use]
    pub fn rolling(&self, name: &str) -> Option<&RollingWindow> {
        self.rolling.get(name)
    }

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn summary(&self) -> StatsSummary {
        let total = self.total_steps.max(1) as f32;
        StatsSummary {
            total_steps: self.total_steps,
            completed_episodes: self.completed_episodes,
            running_episodes: self.running.len(),
            episode_return: Summary::new(self.episode_returns.values()),
            episode_length: Summary::new(self.episode_lengths.values()),
            action_frequencies: self
                .action_counts
                .iter()
                .map(|&c| c as f32 / total)
                .collect(),
            rolling: self
                .rolling
                .iter()
                .filter_map(|(name, window)| Some((name.clone(), window.mean()?)))
                .collect(),
        }
    }

    #[expect(clippy::cast_precision_loss)]
    fn record(&mut self, episode_index: EpisodeIndex, action: usize, reward: f32, done: bool) {
        self.total_steps += 1;
        if self.action_counts.len() <= action {
            self.action_counts.resize(action + 1, 0);
        }
        self.action_counts[action] += 1;

        let progress = self.running.entry(episode_index).or_default();
        progress.reward_sum += reward;
        progress.length += 1;

        if done {
            let progress = self.running.remove(&episode_index).unwrap_or_default();
            self.episode_returns.push(progress.reward_sum);
            self.episode_lengths.push(progress.length as f32);
            self.completed_episodes += 1;
        }
    }
}

impl<A> StatsSink<A> for RunStats
where
    A: Copy + Into<usize>,
{
    fn add_transition(&mut self, episode_index: EpisodeIndex, action: &A, reward: f32, done: bool) {
        self.record(episode_index, (*action).into(), reward, done);
    }

    fn add_rolling_stats(&mut self, training_stats: &TrainingStats) {
        for (name, value) in training_stats.iter() {
            self.rolling
                .entry(name.to_owned())
                .or_insert_with(|| RollingWindow::new(self.window))
                .push(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transition(stats: &mut RunStats, episode: u64, action: usize, reward: f32, done: bool) {
        stats.add_transition(EpisodeIndex::new(episode), &action, reward, done);
    }

    #[test]
    fn test_interleaved_episodes() {
        let mut stats = RunStats::new(10);
        transition(&mut stats, 0, 0, 1.0, false);
        transition(&mut stats, 1, 1, 2.0, false);
        transition(&mut stats, 0, 0, 1.0, true);
        transition(&mut stats, 1, 1, 2.0, false);

        assert_eq!(stats.completed_episodes(), 1);
        assert_eq!(stats.running_return(EpisodeIndex::new(0)), None);
        assert_eq!(stats.running_return(EpisodeIndex::new(1)), Some(4.0));

        let summary = stats.summary();
        assert_eq!(summary.total_steps, 4);
        assert_eq!(summary.running_episodes, 1);
        assert_eq!(summary.episode_return.unwrap().mean, 2.0);
        assert_eq!(summary.episode_length.unwrap().mean, 2.0);
        assert_eq!(summary.action_frequencies, [0.5, 0.5]);
    }

    #[test]
    fn test_nan_reward_does_not_break_summary() {
        let mut stats = RunStats::new(10);
        transition(&mut stats, 0, 0, 1.0, true);
        transition(&mut stats, 1, 0, f32::NAN, true);
        let summary = stats.summary();
        let returns = summary.episode_return.unwrap();
        assert_eq!(returns.count, 2);
        assert_eq!(returns.min, 1.0);
        assert!(returns.max.is_nan());
        assert_eq!(summary.episode_length.unwrap().median, 1.0);
    }

    #[test]
    fn test_single_step_episodes() {
        let mut stats = RunStats::new(10);
        for episode in 0..5 {
            transition(&mut stats, episode, 0, -1.0, true);
        }
        let summary = stats.summary();
        assert_eq!(summary.completed_episodes, 5);
        assert_eq!(summary.running_episodes, 0);
        assert_eq!(summary.episode_length.unwrap().max, 1.0);
    }

    #[test]
    fn test_rolling_stats_window() {
        let mut stats = RunStats::new(2);
        for loss in [4.0, 2.0, 1.0] {
            let training_stats: TrainingStats = [("loss", loss)].into_iter().collect();
            StatsSink::<usize>::add_rolling_stats(&mut stats, &training_stats);
        }
        assert_eq!(stats.rolling("loss").unwrap().len(), 2);
        assert_eq!(stats.summary().rolling["loss"], 1.5);
    }

    #[test]
    fn test_empty_summary() {
        let summary = RunStats::new(4).summary();
        assert_eq!(summary.total_steps, 0);
        assert!(summary.episode_return.is_none());
        assert!(summary.action_frequencies.is_empty());
        assert!(summary.rolling.is_empty());
    }
}
