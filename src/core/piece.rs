//! The active piece wrapper.
//!
//! A piece carries its live block plus two fixed copies: the unshifted
//! canonical block (for 4x4 preview rendering) and the shifted spawn
//! position, so a swapped-in held piece is restored to its original
//! orientation rather than however it was last rotated.

use rand::Rng;

use crate::core::block::{Block, PieceGrid};

#[derive(Clone, Copy, Debug)]
pub struct Piece {
    /// The live block, moved and rotated by play.
    pub block: Block,
    /// Canonical shape, origin-anchored.
    origin: Block,
    /// Spawn position: canonical shape shifted to the spawn column.
    spawn: Block,
}

impl Piece {
    /// A random piece spawned at column `spawn_col`.
    pub fn random(rng: &mut impl Rng, spawn_col: i8) -> Piece {
        let origin = Block::random(rng);
        let spawn = origin.shifted_right(spawn_col);
        Piece { block: spawn, origin, spawn }
    }

    /// Restore the live block to its spawn position and orientation.
    pub fn respawn(&mut self) {
        self.block = self.spawn;
    }

    /// 4x4 preview of the canonical shape.
    pub fn grid(&self) -> PieceGrid {
        self.origin.grid()
    }
}
