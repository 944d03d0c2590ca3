//! A small roguelike used to exercise the training pipeline.
//!
//! Each episode is one procedurally generated dungeon level:
//!
//! - The player starts on a random floor tile with `max_hp` hit points
//! - Gold (`$`) is worth `+1` and disappears when picked up
//! - Traps (`^`) cost one hit point and `-1` reward every time they are entered
//! - Stairs (`>`) end the episode with `+10`
//! - Every turn costs `-0.01`
//!
//! The episode also ends when the player runs out of hit points or turns.
//!
//! # Observations
//!
//! The agent sees a square window centered on the player (radius `view_radius`),
//! one-hot encoded per tile kind, followed by the remaining hit-point fraction and
//! the elapsed turn fraction. Tiles outside the map read as walls.
//!
//! # Determinism
//!
//! Level generation draws only from the environment's own [`Pcg32`](rand_pcg::Pcg32),
//! seeded from a [`DungeonSeed`]. Two environments built from the same seed play
//! the same sequence of levels for the same actions.

pub use self::{
    game::{DungeonAction, DungeonEnv, DungeonObservation},
    level::{Level, Position, Tile},
    seed::DungeonSeed,
};

use serde::{Deserialize, Serialize};

mod game;
mod level;
mod seed;

/// Dungeon generation and episode parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DungeonConfig {
    /// Map width including the outer wall
    pub width: usize,
    /// Map height including the outer wall
    pub height: usize,
    /// Number of interior wall tiles scattered over the map
    pub wall_count: usize,
    pub gold_count: usize,
    pub trap_count: usize,
    pub max_hp: u32,
    /// Turn limit per episode
    pub max_turns: u32,
    /// Radius of the observed window around the player
    pub view_radius: usize,
}

impl Default for DungeonConfig {
    fn default() -> Self {
        Self {
            width: 12,
            height: 8,
            wall_count: 8,
            gold_count: 5,
            trap_count: 3,
            max_hp: 3,
            max_turns: 100,
            view_radius: 2,
        }
    }
}

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum DungeonConfigError {
    #[display("dungeon must be at least 3x3, got {width}x{height}")]
    TooSmall { width: usize, height: usize },
    #[display("{required} interior tiles required, but only {available} available")]
    Overcrowded { required: usize, available: usize },
    #[display("max_hp and max_turns must be positive")]
    ZeroLimit,
}

impl DungeonConfig {
    /// Checks that a level can always be generated from this configuration.
    pub fn validate(&self) -> Result<(), DungeonConfigError> {
        let Self {
            width,
            height,
            wall_count,
            gold_count,
            trap_count,
            max_hp,
            max_turns,
            view_radius: _,
        } = *self;
        if width < 3 || height < 3 {
            return Err(DungeonConfigError::TooSmall { width, height });
        }
        // walls + gold + traps + stairs + player start
        let required = wall_count + gold_count + trap_count + 2;
        let available = (width - 2) * (height - 2);
        if required > available {
            return Err(DungeonConfigError::Overcrowded {
                required,
                available,
            });
        }
        if max_hp == 0 || max_turns == 0 {
            return Err(DungeonConfigError::ZeroLimit);
        }
        Ok(())
    }

    /// Length of the observation feature vector.
    #[must_use]
    pub fn observation_len(&self) -> usize {
        let side = 2 * self.view_radius + 1;
        side * side * Tile::LEN + 2
    }
}
