use std::fmt::{self, Write as _};

use rand::{Rng, seq::SliceRandom as _};

use super::DungeonConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::IsVariant)]
pub enum Tile {
    Floor,
    Wall,
    Gold,
    Trap,
    Stairs,
}

impl Tile {
    pub const LEN: usize = 5;

    /// Position of this tile kind in one-hot encodings.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Tile::Floor => 0,
            Tile::Wall => 1,
            Tile::Gold => 2,
            Tile::Trap => 3,
            Tile::Stairs => 4,
        }
    }

    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Tile::Wall)
    }

    const fn glyph(self) -> char {
        match self {
            Tile::Floor => '.',
            Tile::Wall => '#',
            Tile::Gold => '$',
            Tile::Trap => '^',
            Tile::Stairs => '>',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    #[must_use]
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Moves by `(dx, dy)`, or returns `None` when leaving the non-negative quadrant.
    #[must_use]
    pub fn offset(self, dx: isize, dy: isize) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add_signed(dx)?,
            y: self.y.checked_add_signed(dy)?,
        })
    }
}

/// One generated dungeon level.
///
/// The outer ring is always wall. Interior walls, gold, traps, the stairs and the
/// player's start are placed on distinct interior tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Level {
    width: usize,
    height: usize,
    tiles: Vec<Tile>,
    start: Position,
}

impl Level {
    /// Generates a level.
    ///
    /// The configuration must have passed [`DungeonConfig::validate`]; otherwise
    /// placements that do not fit are silently dropped.
    pub fn generate<R>(config: &DungeonConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let DungeonConfig {
            width,
            height,
            wall_count,
            gold_count,
            trap_count,
            ..
        } = *config;

        let mut tiles = vec![Tile::Wall; width * height];
        let mut interior = Vec::with_capacity(width.saturating_sub(2) * height.saturating_sub(2));
        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                tiles[y * width + x] = Tile::Floor;
                interior.push(Position::new(x, y));
            }
        }
        interior.shuffle(rng);

        let mut free = interior.into_iter();
        let start = free.next().unwrap_or(Position::new(0, 0));
        let placements = [
            (Tile::Stairs, 1),
            (Tile::Wall, wall_count),
            (Tile::Gold, gold_count),
            (Tile::Trap, trap_count),
        ];
        for (tile, count) in placements {
            for pos in free.by_ref().take(count) {
                tiles[pos.y * width + pos.x] = tile;
            }
        }

        Self {
            width,
            height,
            tiles,
            start,
        }
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn start(&self) -> Position {
        self.start
    }

    /// Returns the tile at `pos`; positions outside the map read as walls.
    #[must_use]
    pub fn tile(&self, pos: Position) -> Tile {
        if pos.x >= self.width || pos.y >= self.height {
            return Tile::Wall;
        }
        self.tiles[pos.y * self.width + pos.x]
    }

    /// Replaces the tile at `pos`. Positions outside the map are ignored.
    pub fn set_tile(&mut self, pos: Position, tile: Tile) {
        if pos.x < self.width && pos.y < self.height {
            self.tiles[pos.y * self.width + pos.x] = tile;
        }
    }

    #[must_use]
    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|t| **t == tile).count()
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.tiles.chunks(self.width) {
            for tile in row {
                f.write_char(tile.glyph())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn generate(seed: u64) -> Level {
        let mut rng = Pcg32::seed_from_u64(seed);
        Level::generate(&DungeonConfig::default(), &mut rng)
    }

    #[test]
    fn test_outer_ring_is_wall() {
        let level = generate(1);
        for x in 0..level.width() {
            assert!(level.tile(Position::new(x, 0)).is_wall());
            assert!(level.tile(Position::new(x, level.height() - 1)).is_wall());
        }
        for y in 0..level.height() {
            assert!(level.tile(Position::new(0, y)).is_wall());
            assert!(level.tile(Position::new(level.width() - 1, y)).is_wall());
        }
    }

    #[test]
    fn test_placement_counts() {
        let config = DungeonConfig::default();
        let level = generate(2);
        assert_eq!(level.count(Tile::Stairs), 1);
        assert_eq!(level.count(Tile::Gold), config.gold_count);
        assert_eq!(level.count(Tile::Trap), config.trap_count);
        let outer = 2 * config.width + 2 * (config.height - 2);
        assert_eq!(level.count(Tile::Wall), outer + config.wall_count);
        assert_eq!(level.tile(level.start()), Tile::Floor);
    }

    #[test]
    fn test_same_seed_same_level() {
        assert_eq!(generate(3), generate(3));
        assert_ne!(generate(3), generate(4));
    }

    #[test]
    fn test_outside_reads_as_wall() {
        let level = generate(5);
        assert_eq!(level.tile(Position::new(100, 1)), Tile::Wall);
    }

    #[test]
    fn test_display_shape() {
        let level = generate(6);
        let text = level.to_string();
        assert_eq!(text.lines().count(), level.height());
        assert!(text.lines().all(|l| l.chars().count() == level.width()));
        assert_eq!(text.matches('>').count(), 1);
    }
}
