//! Daily driving data, per cell and per day.
//!
//! All series are day-major (`day * cells + cell`) and already converted to
//! the run's units.  Optional series are left empty when not supplied.
use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};
use crate::snow::{EnergyFluxes, SnowParams, TemperatureIndex};

/// Gridded forcing for a whole run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forcing {
    pub days: usize,
    pub cells: usize,
    pub precip: Vec<f64>,
    /// Potential evapotranspiration.
    pub pet: Vec<f64>,
    #[serde(default)]
    pub tavg: Vec<f64>,
    #[serde(default)]
    pub tmin: Vec<f64>,
    #[serde(default)]
    pub tmax: Vec<f64>,
    /// Energy fluxes for the energy-balance melt model.
    #[serde(default)]
    pub energy: Vec<EnergyFluxes>,
}

/// One station's daily record, broadcast over the grid by
/// [`Forcing::uniform`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailySeries {
    pub precip: Vec<f64>,
    pub pet: Vec<f64>,
    #[serde(default)]
    pub tavg: Vec<f64>,
    #[serde(default)]
    pub tmin: Vec<f64>,
    #[serde(default)]
    pub tmax: Vec<f64>,
    #[serde(default)]
    pub energy: Vec<EnergyFluxes>,
}

fn broadcast<T: Copy>(series: &[T], cells: usize) -> Vec<T> {
    series
        .iter()
        .flat_map(|&v| std::iter::repeat(v).take(cells))
        .collect()
}

impl Forcing {
    /// Repeat a single station series over `cells` cells.
    pub fn uniform(cells: usize, series: &DailySeries) -> Self {
        Self {
            days: series.precip.len(),
            cells,
            precip: broadcast(&series.precip, cells),
            pet: broadcast(&series.pet, cells),
            tavg: broadcast(&series.tavg, cells),
            tmin: broadcast(&series.tmin, cells),
            tmax: broadcast(&series.tmax, cells),
            energy: broadcast(&series.energy, cells),
        }
    }

    #[inline]
    fn at(&self, day: usize, cell: usize) -> usize {
        day * self.cells + cell
    }

    #[inline]
    pub fn precip(&self, day: usize, cell: usize) -> f64 {
        self.precip[self.at(day, cell)]
    }

    #[inline]
    pub fn pet(&self, day: usize, cell: usize) -> f64 {
        self.pet[self.at(day, cell)]
    }

    /// Driving temperature for the chosen index.  The mean falls back to
    /// the min/max midpoint when no mean series is supplied.
    #[inline]
    pub fn temperature(&self, day: usize, cell: usize, index: TemperatureIndex) -> f64 {
        let i = self.at(day, cell);
        match index {
            TemperatureIndex::Mean if !self.tavg.is_empty() => self.tavg[i],
            TemperatureIndex::Mean => 0.5 * (self.tmin[i] + self.tmax[i]),
            TemperatureIndex::Min => self.tmin[i],
            TemperatureIndex::Max => self.tmax[i],
        }
    }

    #[inline]
    pub fn fluxes(&self, day: usize, cell: usize) -> Option<&EnergyFluxes> {
        self.energy.get(self.at(day, cell))
    }

    /// Check lengths, presence of the series the snow model needs, and
    /// reject non-finite values and negative water inputs.
    pub fn validate(&self, cells: usize, snow: &SnowParams) -> Result<()> {
        if self.cells != cells {
            return Err(HydroError::config(
                "forcing",
                format!("forcing has {} cells, grid has {cells}", self.cells),
            ));
        }
        if self.days == 0 {
            return Err(HydroError::config("forcing", "forcing covers zero days"));
        }
        let n = self.days * self.cells;

        check_series("forcing.precip", &self.precip, n, true)?;
        check_series("forcing.pet", &self.pet, n, true)?;
        for (name, series) in [
            ("forcing.tavg", &self.tavg),
            ("forcing.tmin", &self.tmin),
            ("forcing.tmax", &self.tmax),
        ] {
            if !series.is_empty() {
                check_series(name, series, n, false)?;
            }
        }

        let has_mean = !self.tavg.is_empty() || (!self.tmin.is_empty() && !self.tmax.is_empty());
        let missing = match snow.temperature {
            TemperatureIndex::Mean if !has_mean => Some("tavg (or both tmin and tmax)"),
            TemperatureIndex::Min if self.tmin.is_empty() => Some("tmin"),
            TemperatureIndex::Max if self.tmax.is_empty() => Some("tmax"),
            _ => None,
        };
        if let Some(series) = missing {
            return Err(HydroError::config(
                "forcing",
                format!("temperature index {:?} requires {series}", snow.temperature),
            ));
        }

        if snow.melt.needs_energy_fluxes() {
            if self.energy.len() != n {
                return Err(HydroError::shape("forcing.energy", n, self.energy.len()));
            }
            if self.energy.iter().any(|f| !f.total().is_finite()) {
                return Err(HydroError::config("forcing.energy", "energy fluxes contain NaN"));
            }
        }
        Ok(())
    }
}

fn check_series(name: &str, values: &[f64], expected: usize, non_negative: bool) -> Result<()> {
    if values.len() != expected {
        return Err(HydroError::shape(name, expected, values.len()));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(HydroError::config(name, "series contains NaN or infinite values"));
    }
    if non_negative && values.iter().any(|&v| v < 0.0) {
        return Err(HydroError::config(name, "series contains negative values"));
    }
    Ok(())
}
