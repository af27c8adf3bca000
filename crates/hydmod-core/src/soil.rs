//! Static soil and land parameters.
use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};
use crate::grid::Grid;
use crate::routing::FlowNetwork;

/// Parameters of a single cell.
///
/// Porosity, field capacity and wilting point are volumetric fractions;
/// `ksat`/`ksub` are depth per day; `depth` is the soil column depth in the
/// storage unit; `slope` is rise over run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSoil {
    pub porosity: f64,
    pub field_capacity: f64,
    pub wilting_point: f64,
    pub ksat: f64,
    pub ksub: f64,
    pub depth: f64,
    #[serde(default)]
    pub slope: f64,
}

impl CellSoil {
    /// Maximum storage, `porosity × depth`.
    #[inline]
    pub fn capacity(&self) -> f64 {
        self.porosity * self.depth
    }

    /// Field capacity expressed as a storage depth.
    #[inline]
    pub fn fc_depth(&self) -> f64 {
        self.field_capacity * self.depth
    }

    /// Wilting point expressed as a storage depth.
    #[inline]
    pub fn wp_depth(&self) -> f64 {
        self.wilting_point * self.depth
    }
}

/// Row-major parameter grids.
///
/// An empty `slope` means "derive from the elevation model" and is filled
/// in by [`SoilGrid::with_derived_slope`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SoilGrid {
    pub porosity: Vec<f64>,
    pub field_capacity: Vec<f64>,
    pub wilting_point: Vec<f64>,
    pub ksat: Vec<f64>,
    pub ksub: Vec<f64>,
    pub depth: Vec<f64>,
    #[serde(default)]
    pub slope: Vec<f64>,
}

impl SoilGrid {
    /// Same parameters in every one of `n` cells.
    pub fn uniform(n: usize, cell: CellSoil) -> Self {
        Self {
            porosity: vec![cell.porosity; n],
            field_capacity: vec![cell.field_capacity; n],
            wilting_point: vec![cell.wilting_point; n],
            ksat: vec![cell.ksat; n],
            ksub: vec![cell.ksub; n],
            depth: vec![cell.depth; n],
            slope: vec![cell.slope; n],
        }
    }

    #[inline]
    pub fn cell(&self, idx: usize) -> CellSoil {
        CellSoil {
            porosity: self.porosity[idx],
            field_capacity: self.field_capacity[idx],
            wilting_point: self.wilting_point[idx],
            ksat: self.ksat[idx],
            ksub: self.ksub[idx],
            depth: self.depth[idx],
            slope: self.slope[idx],
        }
    }

    /// Replace the slope grid with steepest-descent slopes from `network`
    /// when none was supplied.
    pub fn with_derived_slope(mut self, network: &FlowNetwork) -> Self {
        if self.slope.is_empty() {
            self.slope = network.slope_field();
        }
        self
    }

    /// Check every grid against `grid` and reject negative or non-finite
    /// values in active cells.  Cells outside `active` (no-data) may hold
    /// any sentinel.  The field-capacity/porosity relationship is checked
    /// during the run, where the failing cell can be reported.
    pub fn validate(&self, grid: &Grid, active: &[bool]) -> Result<()> {
        let fields: [(&str, &[f64]); 7] = [
            ("soil.porosity", &self.porosity),
            ("soil.field_capacity", &self.field_capacity),
            ("soil.wilting_point", &self.wilting_point),
            ("soil.ksat", &self.ksat),
            ("soil.ksub", &self.ksub),
            ("soil.depth", &self.depth),
            ("soil.slope", &self.slope),
        ];
        for (name, values) in fields {
            grid.check_field(name, values)?;
            if let Some((i, v)) = values
                .iter()
                .enumerate()
                .find(|&(i, v)| active[i] && (!v.is_finite() || *v < 0.0))
            {
                let (r, c) = grid.coords(i);
                return Err(HydroError::config(
                    name,
                    format!("value {v} at cell ({r}, {c}) must be finite and >= 0"),
                ));
            }
        }
        if let Some(i) = (0..self.depth.len()).find(|&i| active[i] && self.depth[i] <= 0.0) {
            let (r, c) = grid.coords(i);
            return Err(HydroError::config(
                "soil.depth",
                format!("depth at cell ({r}, {c}) must be positive"),
            ));
        }
        Ok(())
    }
}
