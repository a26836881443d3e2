//! Cell color codes.
//!
//! A color is more than a hue: the code also encodes the reserved cell
//! kinds. `0` is an empty cell, `1..=6` are the active piece colors,
//! `-99` is a stone (garbage) cell and `-98` a bomb embedded in a stone
//! row. The negation of an active color is its "ghost" shade, used only
//! when rendering the drop preview — ghost codes are never committed to
//! a row.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of active piece colors.
pub const COLOR_COUNT: i8 = 6;

const STONE_CODE: i8 = -99;
const BOMB_CODE: i8 = -98;

/// A single cell's color code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(i8);

impl Color {
    /// The empty cell.
    pub const EMPTY: Color = Color(0);
    /// A stone (garbage) cell.
    pub const STONE: Color = Color(STONE_CODE);
    /// A bomb cell inside a stone row.
    pub const BOMB: Color = Color(BOMB_CODE);

    /// An active piece color, `1..=6`.
    pub fn active(code: i8) -> Color {
        debug_assert!((1..=COLOR_COUNT).contains(&code));
        Color(code)
    }

    /// A uniformly random active color.
    pub fn random(rng: &mut impl Rng) -> Color {
        Color(rng.gen_range(1..=COLOR_COUNT))
    }

    /// Raw code, as sent over the wire.
    pub fn code(self) -> i8 {
        self.0
    }

    /// The ghost shade of this color (negated code).
    pub fn ghost(self) -> Color {
        Color(-self.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_stone(self) -> bool {
        self.0 == STONE_CODE
    }

    pub fn is_bomb(self) -> bool {
        self.0 == BOMB_CODE
    }

    /// A committed piece cell (positive code).
    pub fn is_active(self) -> bool {
        self.0 > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_codes() {
        assert!(Color::EMPTY.is_empty());
        assert!(Color::STONE.is_stone());
        assert!(Color::BOMB.is_bomb());
        assert!(!Color::STONE.is_active());
        assert!(!Color::BOMB.is_active());
    }

    #[test]
    fn test_ghost_is_not_active() {
        let c = Color::active(3);
        assert!(c.is_active());
        assert!(!c.ghost().is_active());
        assert_eq!(c.ghost().code(), -3);
    }

    #[test]
    fn test_random_color_in_range() {
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            let c = Color::random(&mut rng);
            assert!(c.is_active());
            assert!(c.code() <= COLOR_COUNT);
        }
    }
}
