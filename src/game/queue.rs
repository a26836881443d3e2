//! Fixed-capacity ring of upcoming pieces.

use crate::core::block::PieceGrid;
use crate::core::Piece;

/// Circular buffer of upcoming pieces with a read cursor. Taking the
/// next piece writes a fresh one into the vacated slot, so the queue is
/// always full.
pub struct PieceQueue {
    slots: Vec<Piece>,
    cursor: usize,
}

impl PieceQueue {
    pub fn new(pieces: Vec<Piece>) -> PieceQueue {
        debug_assert!(!pieces.is_empty());
        PieceQueue { slots: pieces, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Take the piece at the cursor, leaving `refill` in its place.
    pub fn exchange(&mut self, refill: Piece) -> Piece {
        let piece = std::mem::replace(&mut self.slots[self.cursor], refill);
        self.cursor = (self.cursor + 1) % self.slots.len();
        piece
    }

    /// Preview grids in upcoming order.
    pub fn grids(&self) -> Vec<PieceGrid> {
        (0..self.slots.len())
            .map(|i| self.slots[(self.cursor + i) % self.slots.len()].grid())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn piece() -> Piece {
        Piece::random(&mut rand::thread_rng(), 3)
    }

    #[test]
    fn test_exchange_cycles_in_order() {
        let pieces: Vec<Piece> = (0..3).map(|_| piece()).collect();
        let first_grid = pieces[0].grid();
        let second_grid = pieces[1].grid();
        let mut q = PieceQueue::new(pieces);

        let got = q.exchange(piece());
        assert_eq!(got.grid(), first_grid);
        let got = q.exchange(piece());
        assert_eq!(got.grid(), second_grid);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn test_grids_start_at_cursor() {
        let pieces: Vec<Piece> = (0..3).map(|_| piece()).collect();
        let second_grid = pieces[1].grid();
        let mut q = PieceQueue::new(pieces);
        q.exchange(piece());
        assert_eq!(q.grids()[0], second_grid);
        assert_eq!(q.grids().len(), 3);
    }
}
