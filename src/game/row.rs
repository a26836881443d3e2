//! A single playfield row.

use rand::Rng;

use crate::core::Color;

/// Bomb cells placed into a fresh stone row. Two draws may land on the
/// same column, so a stone row carries one or two bombs.
const BOMBS_PER_STONE_ROW: usize = 2;

/// An ordered run of colors, one per board column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row(Vec<Color>);

impl Row {
    /// An all-empty row.
    pub fn empty(width: usize) -> Row {
        Row(vec![Color::EMPTY; width])
    }

    /// A garbage row: all stone, with 1-2 bomb cells at random columns.
    pub fn stone(width: usize, rng: &mut impl Rng) -> Row {
        let mut cells = vec![Color::STONE; width];
        for _ in 0..BOMBS_PER_STONE_ROW {
            cells[rng.gen_range(0..width)] = Color::BOMB;
        }
        Row(cells)
    }

    pub fn width(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, x: usize) -> Color {
        self.0[x]
    }

    pub fn set(&mut self, x: usize, color: Color) {
        self.0[x] = color;
    }

    pub fn cells(&self) -> &[Color] {
        &self.0
    }

    /// Every cell empty.
    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|c| c.is_empty())
    }

    /// Every cell committed active: the row can be cleared.
    pub fn is_full(&self) -> bool {
        self.0.iter().all(|c| c.is_active())
    }

    /// Contains at least one stone cell.
    pub fn is_stone(&self) -> bool {
        self.0.iter().any(|c| c.is_stone())
    }

    /// Contains at least one committed active cell.
    pub fn has_active(&self) -> bool {
        self.0.iter().any(|c| c.is_active())
    }
}
