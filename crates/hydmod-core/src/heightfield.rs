use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};
use crate::grid::Grid;

/// Elevation model for a run, row-major, in the caller's length unit.
///
/// Cells equal to `nodata` (if set) or non-finite are treated as outside
/// the watershed: they neither send nor receive lateral flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeightField {
    /// Row-major elevation values.
    pub data: Vec<f64>,
    pub grid: Grid,
    /// Sentinel marking cells without data.
    #[serde(default)]
    pub nodata: Option<f64>,
}

impl HeightField {
    /// Create a new HeightField filled with the given value.
    pub fn new(grid: Grid, fill: f64) -> Self {
        Self {
            data: vec![fill; grid.len()],
            grid,
            nodata: None,
        }
    }

    /// Create a flat HeightField with square cells.
    pub fn flat(rows: usize, cols: usize, cell_size: f64) -> Self {
        Self::new(Grid::square(rows, cols, cell_size), 0.0)
    }

    /// Build from nested rows.  All rows must share the same length.
    pub fn from_rows(rows: &[Vec<f64>], dx: f64, dy: f64) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        if let Some((r, bad)) = rows.iter().enumerate().find(|(_, row)| row.len() != n_cols) {
            return Err(HydroError::config(
                "elevation",
                format!("row {r} has {} columns, expected {n_cols}", bad.len()),
            ));
        }
        let grid = Grid::new(n_rows, n_cols, dx, dy);
        grid.validate()?;
        Ok(Self {
            data: rows.iter().flatten().copied().collect(),
            grid,
            nodata: None,
        })
    }

    /// Attach a no-data sentinel.
    pub fn with_nodata(mut self, nodata: f64) -> Self {
        self.nodata = Some(nodata);
        self
    }

    /// Small 3×3 valley draining south, unit cells.  Handy for smoke runs.
    pub fn demo_valley() -> Self {
        let rows = vec![
            vec![10.0, 9.0, 10.0],
            vec![9.0, 8.0, 9.0],
            vec![8.0, 7.0, 8.0],
        ];
        Self {
            data: rows.into_iter().flatten().collect(),
            grid: Grid::square(3, 3, 1.0),
            nodata: None,
        }
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.grid.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.grid.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[self.grid.index(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, val: f64) {
        let i = self.grid.index(row, col);
        self.data[i] = val;
    }

    /// True when the cell carries no usable elevation.
    #[inline]
    pub fn is_nodata(&self, row: usize, col: usize) -> bool {
        let z = self.get(row, col);
        !z.is_finite() || self.nodata.is_some_and(|nd| z == nd)
    }

    /// Elevation at `(row, col)`, or `None` for no-data cells.
    #[inline]
    pub fn elevation(&self, row: usize, col: usize) -> Option<f64> {
        if self.is_nodata(row, col) {
            None
        } else {
            Some(self.get(row, col))
        }
    }

    /// Check the data length against the grid and the grid itself.
    pub fn validate(&self) -> Result<()> {
        self.grid.validate()?;
        self.grid.check_field("elevation", &self.data)
    }

    pub fn min_elevation(&self) -> f64 {
        self.valid_values().fold(f64::INFINITY, f64::min)
    }

    pub fn max_elevation(&self) -> f64 {
        self.valid_values().fold(f64::NEG_INFINITY, f64::max)
    }

    fn valid_values(&self) -> impl Iterator<Item = f64> + '_ {
        self.data
            .iter()
            .copied()
            .filter(move |&z| z.is_finite() && self.nodata.map_or(true, |nd| z != nd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_is_row_major() {
        let hf = HeightField::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]], 5.0, 5.0).unwrap();
        assert_eq!(hf.rows(), 2);
        assert_eq!(hf.cols(), 2);
        assert_eq!(hf.get(0, 1), 2.0);
        assert_eq!(hf.get(1, 0), 3.0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = HeightField::from_rows(&[vec![1.0, 2.0], vec![3.0]], 1.0, 1.0).unwrap_err();
        assert!(matches!(err, HydroError::Configuration { .. }));
    }

    #[test]
    fn nodata_cells_are_excluded_from_extremes() {
        let hf = HeightField::from_rows(&[vec![-9999.0, 2.0], vec![3.0, 7.0]], 1.0, 1.0)
            .unwrap()
            .with_nodata(-9999.0);
        assert!(hf.is_nodata(0, 0));
        assert_eq!(hf.elevation(0, 0), None);
        assert_eq!(hf.elevation(1, 1), Some(7.0));
        assert_eq!(hf.min_elevation(), 2.0);
        assert_eq!(hf.max_elevation(), 7.0);
    }

    #[test]
    fn nan_is_always_nodata() {
        let mut hf = HeightField::flat(2, 2, 1.0);
        hf.set(1, 1, f64::NAN);
        assert!(hf.is_nodata(1, 1));
        assert!(!hf.is_nodata(0, 0));
    }

    #[test]
    fn demo_valley_drains_south() {
        let hf = HeightField::demo_valley();
        assert!(hf.validate().is_ok());
        assert!(hf.get(2, 1) < hf.get(1, 1));
        assert_eq!(hf.min_elevation(), 7.0);
    }
}
