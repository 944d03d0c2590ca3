//! Statistics collection for omega training runs.
//!
//! This crate defines the narrow recording interface the trainer reports to, and a
//! concrete accumulator that turns per-step scalars into per-episode and rolling
//! summaries.
//!
//! - **Episode indices**: [`EpisodeIndex`] identifies one episode's lifetime
//! - **Recording interface**: [`StatsSink`] receives per-slot transitions and
//!   per-night training statistics
//! - **Accumulation**: [`RunStats`] keeps running episodes, a window of completed
//!   episodes and rolling training statistics
//! - **Summaries**: [`Summary`] computes min/max/mean/median/std-dev for a dataset
//!
//! # Modules
//!
//! - [`episode`]: Episode index newtype
//! - [`sink`]: Stats sink trait and training statistics map
//! - [`rolling`]: Fixed-capacity rolling window
//! - [`run_stats`]: The default stats accumulator
//! - [`summary`]: Descriptive statistics
//!
//! # Examples
//!
//! ```
//! use omega_stats::{EpisodeIndex, RunStats, StatsSink, TrainingStats};
//!
//! let mut stats = RunStats::new(100);
//! stats.add_transition(EpisodeIndex::new(0), &2_usize, 1.0, false);
//! stats.add_transition(EpisodeIndex::new(0), &1_usize, 0.5, true);
//!
//! let mut training_stats = TrainingStats::new();
//! training_stats.insert("loss", 0.25);
//! StatsSink::<usize>::add_rolling_stats(&mut stats, &training_stats);
//!
//! let summary = stats.summary();
//! assert_eq!(summary.completed_episodes, 1);
//! assert_eq!(summary.episode_return.unwrap().mean, 1.5);
//! assert_eq!(summary.rolling["loss"], 0.25);
//! ```

pub use self::{
    episode::EpisodeIndex,
    rolling::RollingWindow,
    run_stats::{RunStats, StatsSummary},
    sink::{StatsSink, TrainingStats},
    summary::Summary,
};

pub mod episode;
pub mod rolling;
pub mod run_stats;
pub mod sink;
pub mod summary;
