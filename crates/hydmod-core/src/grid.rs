use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};

/// Regular raster geometry: `rows × cols` cells of size `dx × dy`.
///
/// Row 0 is the northern edge, column 0 the western edge.  All per-cell
/// fields in the crate are row-major with `idx = row * cols + col`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub rows: usize,
    pub cols: usize,
    /// Cell width (east–west spacing).
    pub dx: f64,
    /// Cell height (north–south spacing).
    pub dy: f64,
}

impl Grid {
    pub fn new(rows: usize, cols: usize, dx: f64, dy: f64) -> Self {
        Self { rows, cols, dx, dy }
    }

    /// Square cells of side `cell_size`.
    pub fn square(rows: usize, cols: usize, cell_size: f64) -> Self {
        Self::new(rows, cols, cell_size, cell_size)
    }

    /// Number of cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize) {
        (idx / self.cols, idx % self.cols)
    }

    /// Offset `(row, col)` by `(dr, dc)`; `None` when the result leaves the
    /// grid.  Edges never wrap.
    #[inline]
    pub fn offset(&self, row: usize, col: usize, dr: isize, dc: isize) -> Option<(usize, usize)> {
        let nr = row as isize + dr;
        let nc = col as isize + dc;
        if nr < 0 || nc < 0 || nr >= self.rows as isize || nc >= self.cols as isize {
            None
        } else {
            Some((nr as usize, nc as usize))
        }
    }

    /// True for cells on the outer ring of the grid.
    #[inline]
    pub fn is_border(&self, row: usize, col: usize) -> bool {
        row == 0 || col == 0 || row + 1 == self.rows || col + 1 == self.cols
    }

    /// Reject empty grids and non-positive or non-finite spacing.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(HydroError::config(
                "grid",
                format!("grid must have at least one cell, got {}×{}", self.rows, self.cols),
            ));
        }
        for (name, v) in [("dx", self.dx), ("dy", self.dy)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(HydroError::config("grid", format!("{name} must be positive, got {v}")));
            }
        }
        Ok(())
    }

    /// Check that a per-cell field matches this grid.
    pub fn check_field(&self, context: &str, field: &[f64]) -> Result<()> {
        if field.len() != self.len() {
            return Err(HydroError::shape(context, self.len(), field.len()));
        }
        Ok(())
    }
}
