use serde::{Deserialize, Serialize};

/// Identifier of one episode's lifetime.
///
/// Episode indices are allocated by the trainer: the slots active at startup get
/// `0..N`, and every completed episode hands its slot the next unused index.
/// Indices are never reused, so they can key per-episode statistics.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
    derive_more::Into,
)]
#[display("#{_0}")]
pub struct EpisodeIndex(u64);

impl EpisodeIndex {
    #[must_use]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the index that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}
