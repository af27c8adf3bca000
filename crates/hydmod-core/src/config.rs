use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};
use crate::groundwater::LinearReservoir;
use crate::snow::SnowParams;

/// Starting soil storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum InitialStorage {
    /// Same absolute depth in every cell (clipped to capacity).
    Depth(f64),
    /// Fraction of each cell's `porosity × depth`.
    FractionOfCapacity(f64),
}

impl InitialStorage {
    /// Starting storage for a cell with the given capacity.
    pub fn resolve(&self, capacity: f64) -> f64 {
        match *self {
            InitialStorage::Depth(d) => d.min(capacity),
            InitialStorage::FractionOfCapacity(f) => f * capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InitialConditions {
    pub soil_storage: InitialStorage,
    pub snow: f64,
    pub aquifer: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            soil_storage: InitialStorage::Depth(0.0),
            snow: 0.0,
            aquifer: 0.0,
        }
    }
}

/// How much per-day history the orchestrator keeps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Every field for every day (`days × cells` values per field).
    #[default]
    Full,
    /// Only the current state and the per-day audit records.
    Rolling,
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub snow: SnowParams,
    /// Multiplier applied to `ksat × slope × hwt`; see
    /// [`crate::groundwater::lateral_flow_darcy`].
    pub lateral_unit_factor: f64,
    /// Baseflow store fed by percolation.  Disabled when `None`.
    pub baseflow: Option<LinearReservoir>,
    pub initial: InitialConditions,
    pub retention: Retention,
    /// Allowed daily conservation residual, relative to the day's gross
    /// water turnover.
    pub audit_tolerance: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            snow: SnowParams::default(),
            lateral_unit_factor: 1.0,
            baseflow: None,
            initial: InitialConditions::default(),
            retention: Retention::Full,
            audit_tolerance: 1e-9,
        }
    }
}

impl SimulationConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)
            .map_err(|e| HydroError::config("config", e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.snow.validate()?;
        if !self.lateral_unit_factor.is_finite() || self.lateral_unit_factor < 0.0 {
            return Err(HydroError::config(
                "lateral_unit_factor",
                format!("must be finite and >= 0, got {}", self.lateral_unit_factor),
            ));
        }
        if let Some(res) = &self.baseflow {
            res.validate()?;
        }
        let init = &self.initial;
        let soil_ok = match init.soil_storage {
            InitialStorage::Depth(d) => d.is_finite() && d >= 0.0,
            InitialStorage::FractionOfCapacity(f) => (0.0..=1.0).contains(&f),
        };
        if !soil_ok {
            return Err(HydroError::config(
                "initial.soil_storage",
                format!("invalid initial storage {:?}", init.soil_storage),
            ));
        }
        for (name, v) in [("initial.snow", init.snow), ("initial.aquifer", init.aquifer)] {
            if !v.is_finite() || v < 0.0 {
                return Err(HydroError::config(name, format!("must be finite and >= 0, got {v}")));
            }
        }
        if !self.audit_tolerance.is_finite() || self.audit_tolerance <= 0.0 {
            return Err(HydroError::config("audit_tolerance", "must be positive"));
        }
        Ok(())
    }
}
