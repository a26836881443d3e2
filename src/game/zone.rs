//! The playfield grid.
//!
//! A zone is an ordered sequence of rows, front = topmost. The row count
//! is invariant across every operation: any removed row is replaced 1:1
//! by a fresh row at the opposite end, so gravity, line clears and
//! garbage exchange all preserve the board height. Drift here is a
//! programming defect and is caught by debug assertions, not handled.
//!
//! Collision checks test committed cells only. The drop preview (ghost)
//! is painted on a rendered snapshot and never written into a row.

use std::collections::VecDeque;

use rand::Rng;

use crate::core::{Block, Color, Dot};
use crate::game::events::ZoneGrid;
use crate::game::row::Row;

pub struct Zone {
    rows: VecDeque<Row>,
    width: usize,
    height: usize,
}

impl Zone {
    pub fn new(height: usize, width: usize) -> Zone {
        let rows = (0..height).map(|_| Row::empty(width)).collect();
        Zone { rows, width, height }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    fn cell(&self, x: i8, y: i8) -> Color {
        self.rows[y as usize].get(x as usize)
    }

    fn in_bounds(&self, x: i8, y: i8) -> bool {
        (0..self.width as i8).contains(&x) && (0..self.height as i8).contains(&y)
    }

    fn check_height(&self) {
        debug_assert_eq!(self.rows.len(), self.height, "zone row count drifted");
    }

    /// Every cell of the block is in bounds and lands on an empty cell.
    pub fn can_place(&self, block: &Block) -> bool {
        block
            .dots()
            .iter()
            .all(|d| self.in_bounds(d.x, d.y) && self.cell(d.x, d.y).is_empty())
    }

    /// The block can move one row down.
    pub fn can_descend(&self, block: &Block) -> bool {
        block.dots().iter().all(|d| {
            d.y + 1 < self.height as i8
                && self.in_bounds(d.x, d.y + 1)
                && self.cell(d.x, d.y + 1).is_empty()
        })
    }

    pub fn can_move_left(&self, block: &Block) -> bool {
        block
            .dots()
            .iter()
            .all(|d| d.x > 0 && self.cell(d.x - 1, d.y).is_empty())
    }

    pub fn can_move_right(&self, block: &Block) -> bool {
        block
            .dots()
            .iter()
            .all(|d| d.x + 1 < self.width as i8 && self.cell(d.x + 1, d.y).is_empty())
    }

    /// The block translated down as far as it will go.
    pub fn dropped(&self, block: Block) -> Block {
        let mut b = block;
        while self.can_descend(&b) {
            b = b.down();
        }
        b
    }

    /// Rotate about the centroid, then nudge back into bounds (down off
    /// the top, up off the bottom, right off the left edge, left off the
    /// right edge). If the nudged block overlaps a committed cell the
    /// rotation is rejected; there are no alternate kick offsets.
    pub fn try_rotate(&self, block: &Block) -> Option<Block> {
        let mut b = block.rotated();
        while b.min_y() < 0 {
            b = b.down();
        }
        while b.max_y() > self.height as i8 - 1 {
            b = b.up();
        }
        while b.min_x() < 0 {
            b = b.right();
        }
        while b.max_x() > self.width as i8 - 1 {
            b = b.left();
        }
        if b.dots().iter().all(|d| self.cell(d.x, d.y).is_empty()) {
            Some(b)
        } else {
            None
        }
    }

    /// Commit the block's cells into their rows. Irreversible.
    pub fn lock(&mut self, block: &Block) {
        for d in block.dots() {
            debug_assert!(self.in_bounds(d.x, d.y));
            self.rows[d.y as usize].set(d.x as usize, d.color);
        }
    }

    /// Remove every clearable row, scanning from the top and stopping at
    /// the first stone row. Each removed row is replaced by an empty row
    /// at the top. Returns the number of cleared rows.
    pub fn clear_lines(&mut self) -> usize {
        let mut cleared = 0;
        let mut i = 0;
        while i < self.rows.len() {
            if self.rows[i].is_stone() {
                break;
            }
            if self.rows[i].is_full() {
                self.rows.remove(i);
                self.rows.push_front(Row::empty(self.width));
                cleared += 1;
            }
            i += 1;
        }
        self.check_height();
        cleared
    }

    /// Maximum bomb-chain depth reachable from the cell directly below
    /// `d`: the bomb there (if any) plus its laterally contiguous bombs,
    /// then recursively whatever lies beneath those.
    fn chain_depth(&self, d: Dot) -> usize {
        if d.y + 1 >= self.height as i8 || !self.in_bounds(d.x, d.y) {
            return 0;
        }
        if !self.cell(d.x, d.y + 1).is_bomb() {
            return 0;
        }
        let y = d.y + 1;
        let mut bombs = vec![Dot::new(d.x, y, Color::BOMB)];
        let mut x = d.x;
        while x > 0 && self.cell(x - 1, y).is_bomb() {
            x -= 1;
            bombs.push(Dot::new(x, y, Color::BOMB));
        }
        x = d.x;
        while x + 1 < self.width as i8 && self.cell(x + 1, y).is_bomb() {
            x += 1;
            bombs.push(Dot::new(x, y, Color::BOMB));
        }
        1 + bombs.iter().map(|b| self.chain_depth(*b)).max().unwrap_or(0)
    }

    /// Chase bomb chains under a just-locked block and strip the stone
    /// rows the chain reached. Returns the chain depth, which is also
    /// the number of stone rows removed (topmost stone rows first, each
    /// replaced by an empty row at the top).
    pub fn check_hit_bombs(&mut self, block: &Block) -> usize {
        let depth = block
            .dots()
            .iter()
            .map(|d| self.chain_depth(*d))
            .max()
            .unwrap_or(0);
        if depth > 0 {
            self.remove_hit_stone_rows(depth);
        }
        depth
    }

    fn remove_hit_stone_rows(&mut self, n: usize) {
        let mut removed = 0;
        let mut i = 0;
        while i < self.rows.len() && removed < n {
            if self.rows[i].is_stone() {
                self.rows.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
        for _ in 0..removed {
            self.rows.push_front(Row::empty(self.width));
        }
        self.check_height();
    }

    /// The top `n` rows are entirely empty, so `n` garbage rows can be
    /// absorbed without topping out. Monotonic in `n`.
    pub fn can_fill_stone_lines(&self, n: usize) -> bool {
        self.rows.iter().take(n).all(Row::is_empty) && n <= self.height
    }

    /// Push the stack up by `n`: remove `n` rows from the top, append
    /// `n` fresh stone rows at the bottom.
    pub fn add_stone_lines(&mut self, n: usize, rng: &mut impl Rng) {
        for _ in 0..n {
            self.rows.pop_front();
            self.rows.push_back(Row::stone(self.width, rng));
        }
        self.check_height();
    }

    /// Strip all trailing stone rows and backfill with empty rows at the
    /// top. Used as the KO penalty-undo and for garbage reset.
    pub fn remove_stone_lines(&mut self) {
        let mut stripped = 0;
        while self.rows.back().is_some_and(Row::is_stone) {
            self.rows.pop_back();
            stripped += 1;
        }
        for _ in 0..stripped {
            self.rows.push_front(Row::empty(self.width));
        }
        self.check_height();
    }

    /// Test hook: write a committed cell directly.
    #[cfg(test)]
    pub fn set_cell(&mut self, x: usize, y: usize, color: Color) {
        self.rows[y].set(x, color);
    }

    /// The very top row holds a committed active cell.
    pub fn is_ko(&self) -> bool {
        self.rows.front().is_some_and(Row::has_active)
    }

    /// Every row empty.
    pub fn is_clear(&self) -> bool {
        self.rows.iter().all(Row::is_empty)
    }

    /// Committed cells only, as wire color codes.
    pub fn snapshot(&self) -> ZoneGrid {
        self.rows
            .iter()
            .map(|r| r.cells().iter().map(|c| c.code()).collect())
            .collect()
    }

    /// Snapshot with the drop preview (ghost shades) and the active
    /// block painted over it. Rows are never mutated by rendering.
    pub fn render(&self, block: &Block) -> ZoneGrid {
        let mut grid = self.snapshot();
        let ghost = self.dropped(*block);
        for d in ghost.dots() {
            if self.in_bounds(d.x, d.y) {
                grid[d.y as usize][d.x as usize] = d.color.ghost().code();
            }
        }
        for d in block.dots() {
            if self.in_bounds(d.x, d.y) {
                grid[d.y as usize][d.x as usize] = d.color.code();
            }
        }
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Block;

    fn fill_row(zone: &mut Zone, y: usize, color: Color) {
        for x in 0..zone.width() {
            zone.rows[y].set(x, color);
        }
    }

    fn stone_row_at(zone: &mut Zone, y: usize) {
        fill_row(zone, y, Color::STONE);
    }

    #[test]
    fn test_new_zone_is_clear() {
        let z = Zone::new(20, 10);
        assert!(z.is_clear());
        assert!(!z.is_ko());
        assert_eq!(z.snapshot().len(), 20);
    }

    #[test]
    fn test_descend_stops_at_floor_and_stack() {
        let mut z = Zone::new(20, 10);
        let b = Block::shape(0); // horizontal I at y = 0
        let dropped = z.dropped(b);
        assert_eq!(dropped.max_y(), 19);
        assert!(!z.can_descend(&dropped));

        z.lock(&dropped);
        let second = z.dropped(b);
        assert_eq!(second.max_y(), 18);
    }

    #[test]
    fn test_clear_lines_counts_and_refills() {
        let mut z = Zone::new(20, 10);
        fill_row(&mut z, 18, Color::active(2));
        fill_row(&mut z, 19, Color::active(3));
        assert_eq!(z.clear_lines(), 2);
        assert!(z.is_clear());
        assert_eq!(z.height(), z.snapshot().len());
    }

    #[test]
    fn test_clear_stops_at_stone_row() {
        let mut z = Zone::new(20, 10);
        fill_row(&mut z, 17, Color::active(1));
        stone_row_at(&mut z, 18);
        fill_row(&mut z, 19, Color::active(1)); // below the stone row
        assert_eq!(z.clear_lines(), 1);
        // The full row below the stone row must survive.
        assert!(z.rows[19].is_full());
    }

    #[test]
    fn test_can_fill_stone_lines_monotonic() {
        let mut z = Zone::new(20, 10);
        fill_row(&mut z, 5, Color::active(1));
        for n in 0..=20 {
            if z.can_fill_stone_lines(n) {
                for m in 0..n {
                    assert!(z.can_fill_stone_lines(m), "monotonicity broken at {m} < {n}");
                }
            }
        }
        assert!(z.can_fill_stone_lines(5));
        assert!(!z.can_fill_stone_lines(6));
    }

    #[test]
    fn test_add_stone_lines_pushes_stack_up() {
        let mut rng = rand::thread_rng();
        let mut z = Zone::new(20, 10);
        fill_row(&mut z, 19, Color::active(4));
        z.add_stone_lines(3, &mut rng);
        assert_eq!(z.snapshot().len(), 20);
        // The old bottom row moved up by three.
        assert!(z.rows[16].is_full());
        for y in 17..20 {
            assert!(z.rows[y].is_stone());
        }
    }

    #[test]
    fn test_remove_stone_lines_strips_trailing_garbage() {
        let mut rng = rand::thread_rng();
        let mut z = Zone::new(20, 10);
        fill_row(&mut z, 19, Color::active(1));
        z.add_stone_lines(2, &mut rng);
        z.remove_stone_lines();
        assert_eq!(z.snapshot().len(), 20);
        assert!(z.rows[19].is_full());
        assert!(!z.rows.iter().any(|r| r.is_stone()));
    }

    #[test]
    fn test_is_ko_on_top_row_active() {
        let mut z = Zone::new(20, 10);
        z.rows[0].set(4, Color::active(5));
        assert!(z.is_ko());
        // Stone in the top row is not a KO by itself.
        let mut z2 = Zone::new(20, 10);
        z2.rows[0].set(4, Color::STONE);
        assert!(!z2.is_ko());
    }

    #[test]
    fn test_rotation_rejected_on_overlap() {
        let mut z = Zone::new(20, 10);
        // Wall of committed cells right where the rotation would land.
        for y in 0..4 {
            fill_row(&mut z, y, Color::active(1));
        }
        let b = Block::shape(0);
        assert!(z.try_rotate(&b).is_none());
    }

    #[test]
    fn test_rotation_nudged_in_from_the_wall() {
        let z = Zone::new(20, 10);
        // A vertical I against the right wall rotates into a horizontal
        // I nudged left of the boundary.
        let b = z.try_rotate(&Block::shape(0).shifted_right(6)).unwrap();
        let b = b.down().down();
        let rotated = z.try_rotate(&b).expect("in-bounds rotation must succeed");
        assert!(rotated.max_x() <= 9);
        assert!(rotated.min_x() >= 0);
    }

    #[test]
    fn test_bomb_chain_depth_single_row() {
        let mut z = Zone::new(20, 10);
        stone_row_at(&mut z, 19);
        z.rows[19].set(2, Color::BOMB);
        // Land a horizontal I directly on the stone row.
        let b = z.dropped(Block::shape(0));
        z.lock(&b);
        assert_eq!(z.check_hit_bombs(&b), 1);
        assert!(!z.rows.iter().any(|r| r.is_stone()));
        assert_eq!(z.snapshot().len(), 20);
    }

    #[test]
    fn test_bomb_chain_depth_stacked_aligned() {
        let mut z = Zone::new(20, 10);
        for y in 17..20 {
            stone_row_at(&mut z, y);
            z.rows[y].set(2, Color::BOMB);
        }
        let b = z.dropped(Block::shape(0));
        z.lock(&b);
        assert_eq!(z.check_hit_bombs(&b), 3);
        assert!(!z.rows.iter().any(|r| r.is_stone()));
        assert_eq!(z.snapshot().len(), 20);
    }

    #[test]
    fn test_bomb_chain_stops_where_bombs_misalign() {
        let mut z = Zone::new(20, 10);
        stone_row_at(&mut z, 18);
        z.rows[18].set(2, Color::BOMB);
        stone_row_at(&mut z, 19);
        z.rows[19].set(8, Color::BOMB); // not beneath or beside the chain
        let b = z.dropped(Block::shape(0));
        z.lock(&b);
        assert_eq!(z.check_hit_bombs(&b), 1);
        assert_eq!(z.rows.iter().filter(|r| r.is_stone()).count(), 1);
    }

    #[test]
    fn test_render_paints_ghost_below_active() {
        let z = Zone::new(20, 10);
        let b = Block::shape(0);
        let grid = z.render(&b);
        // Active cells at the top.
        for x in 0..4 {
            assert_eq!(grid[0][x], 1);
        }
        // Ghost at the floor, in the negated shade.
        for x in 0..4 {
            assert_eq!(grid[19][x], -1);
        }
        // Rendering never touches committed state.
        assert!(z.is_clear());
    }
}
