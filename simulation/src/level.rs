//! Level layouts: the walkability grid plus player and spawner placement.

use glam::Vec2;
use prophecy_world::{GridError, WalkabilityGrid};
use thiserror::Error;

/// Glyph marking the player's start node.
pub const PLAYER_GLYPH: char = 'P';

/// Glyph marking an enemy spawner node.
pub const SPAWNER_GLYPH: char = 'S';

const ARENA_LAYOUT: [&str; 32] = [
    "########################################",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#...................3..................#",
    "#..................333.................#",
    "#.........##........3.......##.........#",
    "#.........#..................#.........#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#...................S..................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#.........#..................#.........#",
    "#.........##................##.........#",
    "#......................................#",
    "#......................................#",
    "#.......P..............................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "#......................................#",
    "########################################",
];

/// Reasons a text layout could not become a level.
#[derive(Debug, Error, PartialEq)]
pub enum LevelError {
    /// The layout contains no player glyph.
    #[error("layout has no player start marked with '{PLAYER_GLYPH}'")]
    MissingPlayer,
    /// The layout contains more than one player glyph.
    #[error("layout marks {0} player starts; exactly one is required")]
    MultiplePlayers(usize),
    /// The remaining glyphs do not form a valid grid.
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Everything a level generator hands to the simulation.
#[derive(Clone, Debug)]
pub struct Level {
    grid: WalkabilityGrid,
    player_spawn: Vec2,
    spawners: Vec<Vec2>,
}

impl Level {
    /// Creates a level from already-built parts.
    #[must_use]
    pub fn new(grid: WalkabilityGrid, player_spawn: Vec2, spawners: Vec<Vec2>) -> Self {
        Self {
            grid,
            player_spawn,
            spawners,
        }
    }

    /// Parses a text layout.
    ///
    /// Besides the grid glyphs, `P` marks the player start and `S` marks
    /// spawners; both stand on walkable nodes. Blank lines are ignored.
    pub fn parse(text: &str, cell_size: f32) -> Result<Self, LevelError> {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.is_empty())
            .collect();
        let rows = lines.len();

        let mut players = Vec::new();
        let mut spawner_cells = Vec::new();
        let mut cleaned = Vec::with_capacity(rows);
        for (line_index, line) in lines.iter().enumerate() {
            let y = rows - 1 - line_index;
            let mut row = String::with_capacity(line.len());
            for (x, glyph) in line.chars().enumerate() {
                match glyph {
                    PLAYER_GLYPH => {
                        players.push((x, y));
                        row.push('.');
                    }
                    SPAWNER_GLYPH => {
                        spawner_cells.push((x, y));
                        row.push('.');
                    }
                    other => row.push(other),
                }
            }
            cleaned.push(row);
        }

        let grid = WalkabilityGrid::from_rows(&cleaned, cell_size, Vec2::ZERO)?;
        let player = match players.as_slice() {
            [] => return Err(LevelError::MissingPlayer),
            [single] => *single,
            many => return Err(LevelError::MultiplePlayers(many.len())),
        };

        let centre = |(x, y): (usize, usize)| {
            grid.origin() + Vec2::new(x as f32 + 0.5, y as f32 + 0.5) * grid.cell_size()
        };
        let player_spawn = centre(player);
        let spawners = spawner_cells.into_iter().map(centre).collect();

        Ok(Self {
            grid,
            player_spawn,
            spawners,
        })
    }

    /// Built-in walled arena with a central spawner.
    pub fn arena() -> Result<Self, LevelError> {
        Self::parse(&ARENA_LAYOUT.join("\n"), 1.0)
    }

    /// Walkability grid.
    #[must_use]
    pub fn grid(&self) -> &WalkabilityGrid {
        &self.grid
    }

    /// Player start position.
    #[must_use]
    pub fn player_spawn(&self) -> Vec2 {
        self.player_spawn
    }

    /// Spawner positions.
    #[must_use]
    pub fn spawners(&self) -> &[Vec2] {
        &self.spawners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_become_walkable_positions() {
        let level = Level::parse("S..\n.P.\n..#\n", 1.0).expect("valid layout");

        assert_eq!(level.player_spawn(), Vec2::new(1.5, 1.5));
        assert_eq!(level.spawners(), &[Vec2::new(0.5, 2.5)]);
        assert!(level.grid().node_at(level.player_spawn()).walkable());
        assert_eq!(level.grid().walkable_count(), 8);
    }

    #[test]
    fn missing_player_is_rejected() {
        assert_eq!(
            Level::parse("...\n...", 1.0).unwrap_err(),
            LevelError::MissingPlayer
        );
    }

    #[test]
    fn duplicate_players_are_rejected() {
        assert_eq!(
            Level::parse("P.P", 1.0).unwrap_err(),
            LevelError::MultiplePlayers(2)
        );
    }

    #[test]
    fn grid_errors_are_forwarded() {
        assert!(matches!(
            Level::parse("P..\n.x.", 1.0),
            Err(LevelError::Grid(GridError::UnknownGlyph { .. }))
        ));
    }

    #[test]
    fn built_in_arena_is_valid() {
        let level = Level::arena().expect("arena parses");
        assert_eq!(level.grid().columns(), 40);
        assert_eq!(level.grid().rows(), 32);
        assert_eq!(level.player_spawn(), Vec2::new(8.5, 5.5));
        assert_eq!(level.spawners(), &[Vec2::new(20.5, 15.5)]);
    }
}
