//! Four-cell blocks and their transforms.
//!
//! There are six canonical shapes, one per active color. Rotation pivots
//! about the block's centroid; the centroid is computed on cell midpoints
//! so that every shape keeps a stable pivot across all four orientations.

use rand::Rng;

use crate::core::color::Color;
use crate::core::dot::Dot;

/// Number of cells in a block.
pub const BLOCK_DOTS: usize = 4;

/// A 4x4 color-code grid used to render next/hold previews.
pub type PieceGrid = [[i8; BLOCK_DOTS]; BLOCK_DOTS];

/// Cell offsets of the six canonical shapes, in spawn orientation.
/// Shape `i` carries active color `i + 1`.
const SHAPES: [[(i8, i8); BLOCK_DOTS]; 6] = [
    [(0, 0), (1, 0), (2, 0), (3, 0)],
    [(0, 0), (0, 1), (1, 1), (2, 1)],
    [(2, 0), (0, 1), (1, 1), (2, 1)],
    [(1, 0), (0, 1), (1, 1), (2, 1)],
    [(0, 0), (1, 0), (1, 1), (2, 1)],
    [(1, 0), (2, 0), (0, 1), (1, 1)],
];

/// A block: exactly four dots sharing one color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block([Dot; BLOCK_DOTS]);

impl Block {
    /// The canonical block for a shape index in `0..6`.
    pub fn shape(index: usize) -> Block {
        let color = Color::active(index as i8 + 1);
        Block(SHAPES[index].map(|(x, y)| Dot::new(x, y, color)))
    }

    /// A uniformly random shape.
    pub fn random(rng: &mut impl Rng) -> Block {
        Block::shape(rng.gen_range(0..SHAPES.len()))
    }

    pub fn dots(&self) -> &[Dot; BLOCK_DOTS] {
        &self.0
    }

    pub fn color(&self) -> Color {
        self.0[0].color
    }

    pub fn left(self) -> Block {
        Block(self.0.map(Dot::left))
    }

    pub fn right(self) -> Block {
        Block(self.0.map(Dot::right))
    }

    pub fn down(self) -> Block {
        Block(self.0.map(Dot::down))
    }

    pub fn up(self) -> Block {
        Block(self.0.map(Dot::up))
    }

    /// Shift right by `n` columns.
    pub fn shifted_right(self, n: i8) -> Block {
        let mut b = self;
        for _ in 0..n {
            b = b.right();
        }
        b
    }

    /// The pivot cell. Midpoints (`2x + 1`) are summed before halving so
    /// the pivot does not drift as the block rotates.
    fn center(&self) -> Dot {
        let (mut x, mut y) = (0i32, 0i32);
        for d in &self.0 {
            x += d.x as i32 * 2 + 1;
            y += d.y as i32 * 2 + 1;
        }
        let n = BLOCK_DOTS as i32;
        Dot::new((x / 2 / n) as i8, (y / 2 / n) as i8, self.color())
    }

    /// Rotate 90 degrees counter-clockwise about the centroid.
    pub fn rotated(self) -> Block {
        let center = self.center();
        Block(self.0.map(|d| d.rotated(center)))
    }

    pub fn min_x(&self) -> i8 {
        self.0.iter().map(|d| d.x).min().unwrap_or(0)
    }

    pub fn max_x(&self) -> i8 {
        self.0.iter().map(|d| d.x).max().unwrap_or(0)
    }

    pub fn min_y(&self) -> i8 {
        self.0.iter().map(|d| d.y).min().unwrap_or(0)
    }

    pub fn max_y(&self) -> i8 {
        self.0.iter().map(|d| d.y).max().unwrap_or(0)
    }

    /// Render onto a 4x4 preview grid. Only meaningful for blocks in
    /// spawn orientation; out-of-range cells are skipped.
    pub fn grid(&self) -> PieceGrid {
        let mut grid = PieceGrid::default();
        for d in &self.0 {
            if (0..BLOCK_DOTS as i8).contains(&d.x) && (0..BLOCK_DOTS as i8).contains(&d.y) {
                grid[d.y as usize][d.x as usize] = self.color().code();
            }
        }
        grid
    }
}
