//! Groundwater exchange: water-table height, Darcy lateral flow,
//! percolation, and the optional linear-reservoir baseflow store.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{HydroError, Result};

/// Field capacity at or above porosity leaves no drainable pore space, so
/// the water-table interpolation is undefined.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
#[error("field capacity {field_capacity} >= porosity {porosity}")]
pub struct DegenerateSoil {
    pub field_capacity: f64,
    pub porosity: f64,
}

/// Height of the saturated column above the impervious base.
///
/// `theta` is volumetric water content (storage / depth).
///   theta < fc          → 0
///   theta ≥ por         → depth
///   otherwise           → depth × (theta − fc) / (por − fc)
pub fn water_table_height(
    por: f64,
    fc: f64,
    theta: f64,
    depth: f64,
) -> std::result::Result<f64, DegenerateSoil> {
    if fc >= por {
        return Err(DegenerateSoil {
            field_capacity: fc,
            porosity: por,
        });
    }
    let hwt = if theta < fc {
        0.0
    } else if theta >= por {
        depth
    } else {
        depth * (theta - fc) / (por - fc)
    };
    Ok(hwt)
}

/// Darcy lateral outflow, `ksat × slope × hwt × unit_factor`.
///
/// `unit_factor` reconciles the length units of ksat, slope and hwt with
/// the storage depth unit (for example flow width over flow length).
#[inline]
pub fn lateral_flow_darcy(ksat: f64, slope: f64, hwt: f64, unit_factor: f64) -> f64 {
    ksat * slope * hwt * unit_factor
}

/// Deep percolation: `ksub` whenever a water table exists.
#[inline]
pub fn percolation(ksub: f64, hwt: f64) -> f64 {
    if hwt > 0.0 {
        ksub
    } else {
        0.0
    }
}

/// Nonlinear reservoir `baseflow = alpha × storage^beta` fed by percolation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearReservoir {
    /// Recession coefficient, per day.
    pub alpha: f64,
    /// Storage exponent; 1.0 gives a linear reservoir.
    #[serde(default = "default_beta")]
    pub beta: f64,
}

fn default_beta() -> f64 {
    1.0
}

impl Default for LinearReservoir {
    fn default() -> Self {
        Self {
            alpha: 0.02,
            beta: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReservoirStep {
    pub storage: f64,
    pub baseflow: f64,
}

impl LinearReservoir {
    /// Advance the store by one day.  Baseflow is computed from the previous
    /// day's storage and never exceeds it.
    pub fn step(&self, storage_prev: f64, recharge: f64) -> ReservoirStep {
        let prev = storage_prev.max(0.0);
        let baseflow = (self.alpha * prev.powf(self.beta)).clamp(0.0, prev);
        ReservoirStep {
            storage: prev + recharge - baseflow,
            baseflow,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.alpha.is_finite() || self.alpha < 0.0 {
            return Err(HydroError::config(
                "baseflow",
                format!("alpha must be >= 0, got {}", self.alpha),
            ));
        }
        if !self.beta.is_finite() || self.beta <= 0.0 {
            return Err(HydroError::config(
                "baseflow",
                format!("beta must be positive, got {}", self.beta),
            ));
        }
        Ok(())
    }
}
