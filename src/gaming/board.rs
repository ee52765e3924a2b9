//! 5×5 Mines board and its random generator
//!
//! Bomb positions are drawn uniformly without replacement from the 25 cells.
//! The generator owns a seedable ChaCha stream so games can be replayed in
//! tests; in production it is seeded from OS entropy.

use parking_lot::Mutex;
use rand::seq::index;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use super::tile::{Tile, TileKind};
use crate::error::{Error, Result};

/// Board edge length
pub const BOARD_SIZE: usize = 5;

/// Number of cells on the board
pub const TILE_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// Fewest bombs a board may carry
pub const MIN_MINES: u8 = 3;

/// Most bombs a board may carry (leaves one gem)
pub const MAX_MINES: u8 = 24;

/// Row/column coordinate on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// Build a position, rejecting anything off the board
    pub fn new(row: usize, col: usize) -> Result<Self> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(Error::InvalidMove(format!(
                "tile ({}, {}) is outside the {}x{} board",
                row, col, BOARD_SIZE, BOARD_SIZE
            )));
        }
        Ok(Self {
            row: row as u8,
            col: col as u8,
        })
    }

    fn from_index(index: usize) -> Self {
        Self {
            row: (index / BOARD_SIZE) as u8,
            col: (index % BOARD_SIZE) as u8,
        }
    }

    /// Row-major index into the tile array
    pub fn index(&self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }
}

/// Fixed row-major grid of tiles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    tiles: [Tile; TILE_COUNT],
    mine_count: u8,
}

impl Board {
    /// Build a board with bombs at the given row-major indices
    pub fn with_bombs(bomb_indices: &[usize]) -> Result<Self> {
        let mut tiles = [Tile::gem(); TILE_COUNT];
        for &index in bomb_indices {
            let tile = tiles.get_mut(index).ok_or_else(|| {
                Error::InvalidConfiguration(format!("bomb index {} is off the board", index))
            })?;
            if tile.is_bomb() {
                return Err(Error::InvalidConfiguration(format!(
                    "bomb index {} listed twice",
                    index
                )));
            }
            *tile = Tile::bomb();
        }

        let mine_count = bomb_indices.len() as u8;
        validate_mine_count(mine_count)?;

        Ok(Self { tiles, mine_count })
    }

    pub fn mine_count(&self) -> u8 {
        self.mine_count
    }

    /// Number of gem tiles on the board
    pub fn safe_tiles(&self) -> u8 {
        TILE_COUNT as u8 - self.mine_count
    }

    pub fn tile(&self, position: Position) -> &Tile {
        &self.tiles[position.index()]
    }

    /// Reveal a tile, failing without side effects if it is already face up
    pub(crate) fn reveal(&mut self, position: Position) -> Result<TileKind> {
        let tile = &mut self.tiles[position.index()];
        if !tile.reveal() {
            return Err(Error::InvalidMove(format!(
                "tile ({}, {}) is already revealed",
                position.row, position.col
            )));
        }
        Ok(tile.kind())
    }

    /// Turn every tile face up for the final board
    pub(crate) fn reveal_all(&mut self) {
        for tile in self.tiles.iter_mut() {
            tile.reveal();
        }
    }

    pub fn revealed_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_revealed()).count()
    }

    /// Iterate tiles with their positions in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (Position, &Tile)> {
        self.tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| (Position::from_index(i), tile))
    }

    /// Rows of tiles, top to bottom
    pub fn rows(&self) -> impl Iterator<Item = &[Tile]> {
        self.tiles.chunks(BOARD_SIZE)
    }
}

pub(crate) fn validate_mine_count(mine_count: u8) -> Result<()> {
    if !(MIN_MINES..=MAX_MINES).contains(&mine_count) {
        return Err(Error::InvalidConfiguration(format!(
            "number of mines must be between {} and {}, got {}",
            MIN_MINES, MAX_MINES, mine_count
        )));
    }
    Ok(())
}

/// Random board source shared by all sessions
pub struct BoardGenerator {
    rng: Mutex<ChaCha20Rng>,
}

impl BoardGenerator {
    /// Seed from OS entropy
    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::from_entropy()),
        }
    }

    /// Deterministic generator for replays and tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(ChaCha20Rng::seed_from_u64(seed)),
        }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// Generate a board with `mine_count` bombs placed uniformly at random
    pub fn generate(&self, mine_count: u8) -> Result<Board> {
        validate_mine_count(mine_count)?;

        let bombs = {
            let mut rng = self.rng.lock();
            index::sample(&mut *rng, TILE_COUNT, mine_count as usize).into_vec()
        };

        Board::with_bombs(&bombs)
    }
}

impl std::fmt::Debug for BoardGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_places_exact_bomb_count() {
        let generator = BoardGenerator::seeded(7);
        for mines in MIN_MINES..=MAX_MINES {
            let board = generator.generate(mines).unwrap();
            let bombs = board.iter().filter(|(_, t)| t.is_bomb()).count();
            assert_eq!(bombs, mines as usize);
            assert_eq!(board.iter().count(), TILE_COUNT);
            assert_eq!(board.safe_tiles() as usize, TILE_COUNT - mines as usize);
            assert_eq!(board.revealed_count(), 0);
        }
    }

    #[test]
    fn test_generate_rejects_out_of_range() {
        let generator = BoardGenerator::seeded(1);
        for mines in [0u8, 1, 2, 25, 30] {
            assert!(matches!(
                generator.generate(mines),
                Err(Error::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn test_same_seed_same_board() {
        let a = BoardGenerator::seeded(42).generate(5).unwrap();
        let b = BoardGenerator::seeded(42).generate(5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_bomb_placement_is_roughly_uniform() {
        let generator = BoardGenerator::seeded(2024);
        let rounds = 20_000;
        let mut hits = [0u32; TILE_COUNT];
        for _ in 0..rounds {
            let board = generator.generate(5).unwrap();
            for (pos, tile) in board.iter() {
                if tile.is_bomb() {
                    hits[pos.index()] += 1;
                }
            }
        }

        // Each cell should be a bomb 5/25 of the time
        let expected = rounds as f64 * 5.0 / TILE_COUNT as f64;
        for count in hits {
            let deviation = (count as f64 - expected).abs() / expected;
            assert!(deviation < 0.08, "cell hit {} times, expected ~{}", count, expected);
        }
    }

    #[test]
    fn test_reveal_twice_is_rejected() {
        let mut board = Board::with_bombs(&[0, 1, 2]).unwrap();
        let pos = Position::new(4, 4).unwrap();
        assert_eq!(board.reveal(pos).unwrap(), TileKind::Gem);
        assert!(matches!(board.reveal(pos), Err(Error::InvalidMove(_))));
        assert_eq!(board.revealed_count(), 1);
    }

    #[test]
    fn test_position_bounds() {
        assert!(Position::new(0, 0).is_ok());
        assert_eq!(Position::new(4, 3).unwrap().index(), 23);
        assert!(matches!(Position::new(5, 0), Err(Error::InvalidMove(_))));
        assert!(matches!(Position::new(0, 5), Err(Error::InvalidMove(_))));
    }

    #[test]
    fn test_with_bombs_rejects_duplicates() {
        assert!(Board::with_bombs(&[3, 3, 4]).is_err());
        assert!(Board::with_bombs(&[3, 4, 99]).is_err());
        assert!(Board::with_bombs(&[3, 4]).is_err());
    }
}
