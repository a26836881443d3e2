//! Geometric primitives for the falling-block simulation.
//!
//! Everything here is a small value type: cell colors, cells, 4-cell
//! blocks and the piece wrapper that remembers its spawn orientation.

pub mod block;
pub mod color;
pub mod dot;
pub mod piece;

pub use block::{Block, PieceGrid, BLOCK_DOTS};
pub use color::Color;
pub use dot::Dot;
pub use piece::Piece;
