use rand::SeedableRng as _;
use rand_pcg::Pcg32;

use crate::{DiscreteAction, EnvError, Environment, FeatureObservation, Step};

use super::{DungeonConfig, DungeonSeed, Level, Position, Tile};

const STEP_REWARD: f32 = -0.01;
const GOLD_REWARD: f32 = 1.0;
const TRAP_REWARD: f32 = -1.0;
const STAIRS_REWARD: f32 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DungeonAction {
    North,
    East,
    South,
    West,
    Wait,
}

impl DungeonAction {
    pub const ALL: [Self; 5] = [Self::North, Self::East, Self::South, Self::West, Self::Wait];

    const fn delta(self) -> (isize, isize) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
            Self::Wait => (0, 0),
        }
    }
}

impl From<DungeonAction> for usize {
    fn from(action: DungeonAction) -> Self {
        action as usize
    }
}

impl DiscreteAction for DungeonAction {
    const COUNT: usize = Self::ALL.len();

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// What the agent sees: the window around the player plus its vital signs.
#[derive(Debug, Clone, PartialEq)]
pub struct DungeonObservation {
    features: Vec<f32>,
}

impl FeatureObservation for DungeonObservation {
    fn features(&self) -> &[f32] {
        &self.features
    }
}

/// One dungeon game, playing a fresh level every episode.
#[derive(Debug, Clone)]
pub struct DungeonEnv {
    config: DungeonConfig,
    rng: Pcg32,
    level: Level,
    player: Position,
    hp: u32,
    turn: u32,
}

impl DungeonEnv {
    /// Creates a game and generates its first level.
    ///
    /// `config` should have passed [`DungeonConfig::validate`].
    #[must_use]
    pub fn new(config: DungeonConfig, seed: DungeonSeed) -> Self {
        let mut rng = Pcg32::from_seed(seed.to_bytes());
        let level = Level::generate(&config, &mut rng);
        Self {
            player: level.start(),
            hp: config.max_hp,
            turn: 0,
            config,
            rng,
            level,
        }
    }

    #[must_use]
    pub fn level(&self) -> &Level {
        &self.level
    }

    #[must_use]
    pub fn player(&self) -> Position {
        self.player
    }

    #[must_use]
    pub fn hp(&self) -> u32 {
        self.hp
    }

    #[must_use]
    pub fn turn(&self) -> u32 {
        self.turn
    }

    #[expect(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
    fn observe(&self) -> DungeonObservation {
        let radius = self.config.view_radius as isize;
        let mut features = vec![0.0; self.config.observation_len()];
        let mut cell = 0;
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                let tile = self
                    .player
                    .offset(dx, dy)
                    .map_or(Tile::Wall, |pos| self.level.tile(pos));
                features[cell * Tile::LEN + tile.index()] = 1.0;
                cell += 1;
            }
        }
        let vitals = cell * Tile::LEN;
        features[vitals] = self.hp as f32 / self.config.max_hp as f32;
        features[vitals + 1] = self.turn as f32 / self.config.max_turns as f32;
        DungeonObservation { features }
    }
}

impl Environment for DungeonEnv {
    type Observation = DungeonObservation;
    type Action = DungeonAction;

    fn reset(&mut self) -> Result<DungeonObservation, EnvError> {
        self.level = Level::generate(&self.config, &mut self.rng);
        self.player = self.level.start();
        self.hp = self.config.max_hp;
        self.turn = 0;
        Ok(self.observe())
    }

    fn step(&mut self, action: DungeonAction) -> Result<Step<DungeonObservation>, EnvError> {
        if self.hp == 0 || self.turn >= self.config.max_turns {
            return Err(EnvError::Fault {
                message: "step called on a finished dungeon episode".to_owned(),
            });
        }

        self.turn += 1;
        let mut reward = STEP_REWARD;
        let mut done = false;

        let (dx, dy) = action.delta();
        let target = self
            .player
            .offset(dx, dy)
            .filter(|&pos| pos != self.player && self.level.tile(pos).is_walkable());
        if let Some(target) = target {
            self.player = target;
            match self.level.tile(target) {
                Tile::Gold => {
                    reward += GOLD_REWARD;
                    self.level.set_tile(target, Tile::Floor);
                }
                Tile::Trap => {
                    reward += TRAP_REWARD;
                    self.hp -= 1;
                }
                Tile::Stairs => {
                    reward += STAIRS_REWARD;
                    done = true;
                }
                Tile::Floor | Tile::Wall => {}
            }
        }

        if self.hp == 0 || self.turn >= self.config.max_turns {
            done = true;
        }

        Ok(Step {
            observation: self.observe(),
            reward,
            done,
        })
    }
}
