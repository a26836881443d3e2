//! A single colored cell of a block.

use serde::{Deserialize, Serialize};

use crate::core::color::Color;

/// One cell of a block: grid position plus color.
///
/// Coordinates grow rightwards (`x`) and downwards (`y`). Transforms
/// return new values; a dot may sit transiently out of bounds while a
/// rotation is being nudged back onto the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dot {
    pub x: i8,
    pub y: i8,
    pub color: Color,
}

impl Dot {
    pub fn new(x: i8, y: i8, color: Color) -> Dot {
        Dot { x, y, color }
    }

    pub fn left(self) -> Dot {
        Dot { x: self.x - 1, ..self }
    }

    pub fn right(self) -> Dot {
        Dot { x: self.x + 1, ..self }
    }

    pub fn down(self) -> Dot {
        Dot { y: self.y + 1, ..self }
    }

    pub fn up(self) -> Dot {
        Dot { y: self.y - 1, ..self }
    }

    /// Rotate 90 degrees counter-clockwise about `origin`.
    pub fn rotated(self, origin: Dot) -> Dot {
        Dot {
            x: self.y - origin.y + origin.x,
            y: origin.x + origin.y - self.x,
            color: self.color,
        }
    }

    pub fn overlaps(self, other: Dot) -> bool {
        self.x == other.x && self.y == other.y
    }
}
