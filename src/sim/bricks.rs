//! Brick grid
//!
//! Bricks are never removed, only hidden, so a (row, column) slot always
//! refers to the same brick for the life of a level. Some layouts leave slots
//! empty to open channels into the cavity.

use serde::{Deserialize, Serialize};

use super::collision::Aabb;
use crate::consts::*;
use crate::vector::Vector2D;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brick {
    pub row: usize,
    pub col: usize,
    /// Top-left corner
    pub pos: Vector2D,
    pub width: f32,
    pub height: f32,
    pub visible: bool,
    /// 0xRRGGBB
    pub color: u32,
    pub hits: u32,
}

impl Brick {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos.x, self.pos.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrickGrid {
    pub rows: usize,
    pub cols: usize,
    /// Top-left of slot (0, 0)
    pub origin: Vector2D,
    /// Distance between neighbouring slot origins
    pub spacing: Vector2D,
    pub bricks: Vec<Brick>,
    /// Slot (row * cols + col) -> index into `bricks`
    slots: Vec<Option<usize>>,
}

/// Rows for a level: one more per level up to the cap
pub fn rows_for_level(level: u32) -> usize {
    (BRICK_BASE_ROWS + level.saturating_sub(1) as usize).min(BRICK_MAX_ROWS)
}

/// Whether a slot holds a brick in this level's layout
///
/// Layouts cycle every three levels: a solid wall, a wall with scattered
/// holes, and a wall with a central channel.
fn slot_filled(level: u32, row: usize, col: usize, cols: usize) -> bool {
    match level % 3 {
        1 => true,
        2 => (row + col) % 4 != 3,
        _ => {
            let channel = col == cols / 2 || col + 1 == cols / 2;
            !(channel && row % 2 == 1)
        }
    }
}

impl BrickGrid {
    /// Build the grid for `level`, coloring rows from `palette`
    pub fn generate(level: u32, palette: &[u32]) -> Self {
        let rows = rows_for_level(level);
        let cols = BRICK_COLUMNS;
        let origin = Vector2D::new(BRICK_OFFSET_LEFT, BRICK_OFFSET_TOP);
        let spacing = Vector2D::new(BRICK_WIDTH + BRICK_PADDING, BRICK_HEIGHT + BRICK_PADDING);

        let mut bricks = Vec::with_capacity(rows * cols);
        let mut slots = vec![None; rows * cols];

        for row in 0..rows {
            let color = palette
                .get(row % palette.len().max(1))
                .copied()
                .unwrap_or(0xFFFFFF);
            for col in 0..cols {
                if !slot_filled(level, row, col, cols) {
                    continue;
                }
                slots[row * cols + col] = Some(bricks.len());
                bricks.push(Brick {
                    row,
                    col,
                    pos: Vector2D::new(
                        origin.x + col as f32 * spacing.x,
                        origin.y + row as f32 * spacing.y,
                    ),
                    width: BRICK_WIDTH,
                    height: BRICK_HEIGHT,
                    visible: true,
                    color,
                    hits: 0,
                });
            }
        }

        log::debug!("Level {level}: {rows}x{cols} grid, {} bricks", bricks.len());

        Self {
            rows,
            cols,
            origin,
            spacing,
            bricks,
            slots,
        }
    }

    /// Top edge of the brick field (the cavity floor)
    pub fn top(&self) -> f32 {
        self.origin.y
    }

    pub fn index_at(&self, row: isize, col: isize) -> Option<usize> {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return None;
        }
        self.slots[row as usize * self.cols + col as usize]
    }

    /// Brick whose slot contains `point`
    pub fn index_at_point(&self, point: Vector2D) -> Option<usize> {
        let col = ((point.x - self.origin.x) / self.spacing.x).floor();
        let row = ((point.y - self.origin.y) / self.spacing.y).floor();
        self.index_at(row as isize, col as isize)
    }

    /// Next brick from `index` one grid step along `(dx, dy)` (each -1, 0 or 1)
    pub fn step(&self, index: usize, dx: i32, dy: i32) -> Option<usize> {
        if dx == 0 && dy == 0 {
            return None;
        }
        let center = self.bricks.get(index)?.bounds().center();
        let next = Vector2D::new(
            center.x + dx as f32 * self.spacing.x,
            center.y + dy as f32 * self.spacing.y,
        );
        self.index_at_point(next)
    }

    pub fn visible(&self) -> impl Iterator<Item = &Brick> {
        self.bricks.iter().filter(|b| b.visible)
    }

    pub fn visible_count(&self) -> usize {
        self.visible().count()
    }

    pub fn is_cleared(&self) -> bool {
        self.bricks.iter().all(|b| !b.visible)
    }
}
