//! Snowpack accumulation and melt.
//!
//! Per cell and strictly in time order:
//!   storage_t     = max(storage_{t-1} + snow_t − potential_t, 0)
//!   actual_melt_t = min(potential_t, storage_{t-1} + snow_t)
//!
//! Cells are independent within a day; days are not.
pub mod melt;

use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};
pub use melt::{EnergyFluxes, MeltModel};

/// Which daily temperature drives phase partitioning and degree-day melt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureIndex {
    #[default]
    Mean,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowParams {
    /// At or above this temperature all precipitation is rain.
    pub train: f64,
    /// At or below this temperature all precipitation is snow.
    pub tsnow: f64,
    pub temperature: TemperatureIndex,
    pub melt: MeltModel,
}

impl Default for SnowParams {
    fn default() -> Self {
        Self {
            train: 3.0,
            tsnow: 0.0,
            temperature: TemperatureIndex::Mean,
            melt: MeltModel::default(),
        }
    }
}

impl SnowParams {
    pub fn validate(&self) -> Result<()> {
        if !self.train.is_finite() || !self.tsnow.is_finite() {
            return Err(HydroError::config("snow", "phase thresholds must be finite"));
        }
        if self.train <= self.tsnow {
            return Err(HydroError::config(
                "snow",
                format!("train ({}) must be greater than tsnow ({})", self.train, self.tsnow),
            ));
        }
        self.melt.validate()
    }
}

/// Split precipitation into `(snow, rain)`.
///
/// Linear ramp between `tsnow` (all snow) and `train` (all rain).
pub fn partition_precipitation(precip: f64, temp: f64, train: f64, tsnow: f64) -> (f64, f64) {
    let snow_fraction = if temp >= train {
        0.0
    } else if temp <= tsnow {
        1.0
    } else {
        (train - temp) / (train - tsnow)
    };
    let snow = precip * snow_fraction;
    (snow, precip - snow)
}

/// Snowpack state after one day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowStep {
    pub storage: f64,
    pub actual_melt: f64,
}

/// Advance the snowpack by one day.
#[inline]
pub fn snow_step(storage_prev: f64, snowfall: f64, melt_potential: f64) -> SnowStep {
    let available = storage_prev + snowfall;
    let actual_melt = melt_potential.min(available).max(0.0);
    SnowStep {
        storage: (available - melt_potential).max(0.0),
        actual_melt,
    }
}

/// Full snow-model output for one cell-day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnowDay {
    pub snowfall: f64,
    pub rain: f64,
    pub actual_melt: f64,
    pub storage: f64,
}

impl SnowDay {
    /// Water reaching the soil surface: rain plus actual melt.
    #[inline]
    pub fn water_input(&self) -> f64 {
        self.rain + self.actual_melt
    }
}

/// Partition, compute potential melt, and advance the pack for one cell-day.
pub fn snow_day(
    params: &SnowParams,
    storage_prev: f64,
    precip: f64,
    temp: f64,
    fluxes: Option<&EnergyFluxes>,
) -> SnowDay {
    let (snowfall, rain) = partition_precipitation(precip, temp, params.train, params.tsnow);
    let potential = params.melt.potential_melt(temp, fluxes);
    let step = snow_step(storage_prev, snowfall, potential);
    SnowDay {
        snowfall,
        rain,
        actual_melt: step.actual_melt,
        storage: step.storage,
    }
}
