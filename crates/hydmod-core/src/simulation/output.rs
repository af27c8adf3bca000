//! Run outputs: per-day audit records and, with full retention, the
//! per-cell daily history of every state variable and flux.
use serde::{Deserialize, Serialize};

use crate::grid::Grid;
use super::{CellFluxes, CellState, RunStatus};

/// Grid-wide totals for one day, used for the mass-balance audit.
///
/// Totals cover active cells only.  `residual` is
/// `Δstorage − (precipitation − losses)` where losses are actual ET,
/// runoff, boundary loss and either percolation (no baseflow store) or
/// baseflow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DayBalance {
    pub day: usize,
    pub precipitation: f64,
    pub snowfall: f64,
    pub rain: f64,
    pub actual_melt: f64,
    pub actual_et: f64,
    pub lateral_outflow: f64,
    pub lateral_inflow: f64,
    pub boundary_loss: f64,
    pub edge_loss: f64,
    pub pit_loss: f64,
    pub percolation: f64,
    pub baseflow: f64,
    pub runoff: f64,
    pub snow_storage: f64,
    pub soil_storage: f64,
    pub aquifer_storage: f64,
    pub residual: f64,
    pub within_tolerance: bool,
}

impl DayBalance {
    #[inline]
    pub fn total_storage(&self) -> f64 {
        self.snow_storage + self.soil_storage + self.aquifer_storage
    }
}

/// Selects one recorded field of [`History`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variable {
    SoilStorage,
    SnowStorage,
    WaterTableHeight,
    AquiferStorage,
    LateralInflow,
    LateralOutflow,
    ActualEt,
    ActualMelt,
    Percolation,
    Baseflow,
    Runoff,
}

impl Variable {
    pub const ALL: [Variable; 11] = [
        Variable::SoilStorage,
        Variable::SnowStorage,
        Variable::WaterTableHeight,
        Variable::AquiferStorage,
        Variable::LateralInflow,
        Variable::LateralOutflow,
        Variable::ActualEt,
        Variable::ActualMelt,
        Variable::Percolation,
        Variable::Baseflow,
        Variable::Runoff,
    ];
}

/// Day-major (`day * cells + cell`) history of every recorded field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct History {
    pub cells: usize,
    pub days: usize,
    pub soil_storage: Vec<f64>,
    pub snow_storage: Vec<f64>,
    pub water_table_height: Vec<f64>,
    pub aquifer_storage: Vec<f64>,
    pub lateral_inflow: Vec<f64>,
    pub lateral_outflow: Vec<f64>,
    pub actual_et: Vec<f64>,
    pub actual_melt: Vec<f64>,
    pub percolation: Vec<f64>,
    pub baseflow: Vec<f64>,
    pub runoff: Vec<f64>,
}

impl History {
    pub fn with_capacity(cells: usize, days: usize) -> Self {
        let n = cells * days;
        let v = || Vec::with_capacity(n);
        Self {
            cells,
            days: 0,
            soil_storage: v(),
            snow_storage: v(),
            water_table_height: v(),
            aquifer_storage: v(),
            lateral_inflow: v(),
            lateral_outflow: v(),
            actual_et: v(),
            actual_melt: v(),
            percolation: v(),
            baseflow: v(),
            runoff: v(),
        }
    }

    /// Append one day.  Slices are in cell order.
    pub fn push(&mut self, state: &[CellState], fluxes: &[CellFluxes]) {
        for (s, f) in state.iter().zip(fluxes) {
            self.soil_storage.push(s.soil);
            self.snow_storage.push(s.snow);
            self.water_table_height.push(s.water_table_height);
            self.aquifer_storage.push(s.aquifer);
            self.lateral_inflow.push(f.lateral_inflow);
            self.lateral_outflow.push(f.lateral_outflow);
            self.actual_et.push(f.actual_et);
            self.actual_melt.push(f.actual_melt);
            self.percolation.push(f.percolation);
            self.baseflow.push(f.baseflow);
            self.runoff.push(f.runoff);
        }
        self.days += 1;
    }

    pub fn field(&self, var: Variable) -> &[f64] {
        match var {
            Variable::SoilStorage => &self.soil_storage,
            Variable::SnowStorage => &self.snow_storage,
            Variable::WaterTableHeight => &self.water_table_height,
            Variable::AquiferStorage => &self.aquifer_storage,
            Variable::LateralInflow => &self.lateral_inflow,
            Variable::LateralOutflow => &self.lateral_outflow,
            Variable::ActualEt => &self.actual_et,
            Variable::ActualMelt => &self.actual_melt,
            Variable::Percolation => &self.percolation,
            Variable::Baseflow => &self.baseflow,
            Variable::Runoff => &self.runoff,
        }
    }

    /// Grid snapshot of `var` on `day`.
    pub fn day_field(&self, var: Variable, day: usize) -> &[f64] {
        let start = day * self.cells;
        &self.field(var)[start..start + self.cells]
    }

    /// Time series of `var` at one cell.
    pub fn cell_series(&self, var: Variable, cell: usize) -> Vec<f64> {
        self.field(var)
            .iter()
            .skip(cell)
            .step_by(self.cells.max(1))
            .copied()
            .collect()
    }
}

/// Everything a finished (or stopped) run hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub grid: Grid,
    pub status: RunStatus,
    pub days_completed: usize,
    pub final_state: Vec<CellState>,
    pub balances: Vec<DayBalance>,
    /// Present with `Retention::Full`.
    pub history: Option<History>,
}

impl SimulationOutput {
    /// Boundary loss summed over the run.
    pub fn total_boundary_loss(&self) -> f64 {
        self.balances.iter().map(|b| b.boundary_loss).sum()
    }

    /// Largest absolute daily conservation residual.
    pub fn max_residual(&self) -> f64 {
        self.balances
            .iter()
            .map(|b| b.residual.abs())
            .fold(0.0, f64::max)
    }
}
