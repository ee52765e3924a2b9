use serde::{Deserialize, Serialize};

/// What lies under a tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    Gem,
    Bomb,
}

/// A single cell of the board
///
/// `kind` is fixed at generation; `revealed` only ever goes from false to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    kind: TileKind,
    revealed: bool,
}

impl Tile {
    pub fn gem() -> Self {
        Self {
            kind: TileKind::Gem,
            revealed: false,
        }
    }

    pub fn bomb() -> Self {
        Self {
            kind: TileKind::Bomb,
            revealed: false,
        }
    }

    pub fn kind(&self) -> TileKind {
        self.kind
    }

    pub fn is_bomb(&self) -> bool {
        self.kind == TileKind::Bomb
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    /// Flip the tile face up. Returns false if it already was.
    pub(crate) fn reveal(&mut self) -> bool {
        if self.revealed {
            return false;
        }
        self.revealed = true;
        true
    }
}
