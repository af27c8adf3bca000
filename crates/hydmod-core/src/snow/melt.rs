//! Melt-potential sub-models.
//!
//! Potential melt is the depth of snow water the day's energy could melt if
//! snow were unlimited.  The snowpack recurrence caps it at available snow.
use serde::{Deserialize, Serialize};

use crate::error::{HydroError, Result};

/// Latent heat of fusion of ice, kJ/kg.
pub const LATENT_HEAT_FUSION: f64 = 335.0;
/// Density of liquid water, kg/m³.
pub const DENSITY_WATER: f64 = 1000.0;

/// Daily surface energy-flux components, kJ/m²/day.
///
/// Supplied by the radiation collaborator; positive values add energy to
/// the snowpack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EnergyFluxes {
    pub shortwave: f64,
    pub longwave: f64,
    pub sensible: f64,
    pub latent: f64,
    pub ground: f64,
}

impl EnergyFluxes {
    #[inline]
    pub fn total(&self) -> f64 {
        self.shortwave + self.longwave + self.sensible + self.latent + self.ground
    }
}

/// Interchangeable melt-potential models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum MeltModel {
    /// `k × (T − tbase)`, clipped at zero.  `k` is depth per degree per day
    /// in the run's depth unit.
    DegreeDay { k: f64, tbase: f64 },
    /// Net energy over `LATENT_HEAT_FUSION × DENSITY_WATER`, clipped at zero.
    /// That ratio yields metres of water; `depth_factor` converts metres to
    /// the run's depth unit (1000 for millimetres).
    EnergyBalance { depth_factor: f64 },
}

impl Default for MeltModel {
    fn default() -> Self {
        MeltModel::DegreeDay { k: 1.0, tbase: 0.0 }
    }
}

impl MeltModel {
    /// Whether daily energy fluxes must be supplied with the forcing.
    pub fn needs_energy_fluxes(&self) -> bool {
        matches!(self, MeltModel::EnergyBalance { .. })
    }

    /// Potential melt for one cell-day.
    ///
    /// The energy-balance model treats missing fluxes as zero net energy.
    pub fn potential_melt(&self, temp: f64, fluxes: Option<&EnergyFluxes>) -> f64 {
        match *self {
            MeltModel::DegreeDay { k, tbase } => degree_day_melt(temp, k, tbase),
            MeltModel::EnergyBalance { depth_factor } => {
                fluxes.map_or(0.0, energy_balance_melt) * depth_factor
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match *self {
            MeltModel::DegreeDay { k, tbase } => {
                if !k.is_finite() || k < 0.0 {
                    return Err(HydroError::config("snow.melt", format!("k must be >= 0, got {k}")));
                }
                if !tbase.is_finite() {
                    return Err(HydroError::config("snow.melt", "tbase must be finite"));
                }
            }
            MeltModel::EnergyBalance { depth_factor } => {
                if !depth_factor.is_finite() || depth_factor <= 0.0 {
                    return Err(HydroError::config(
                        "snow.melt",
                        format!("depth_factor must be positive, got {depth_factor}"),
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Degree-day (temperature index) melt.
#[inline]
pub fn degree_day_melt(temp: f64, k: f64, tbase: f64) -> f64 {
    (k * (temp - tbase)).max(0.0)
}

/// Energy-balance melt in metres of water.
#[inline]
pub fn energy_balance_melt(fluxes: &EnergyFluxes) -> f64 {
    (fluxes.total() / (LATENT_HEAT_FUSION * DENSITY_WATER)).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn degree_day_is_clipped_below_base() {
        assert_eq!(degree_day_melt(-3.0, 2.0, 0.0), 0.0);
        assert_eq!(degree_day_melt(0.0, 2.0, 0.0), 0.0);
        assert_abs_diff_eq!(degree_day_melt(5.0, 2.0, 1.0), 8.0, epsilon = 1e-12);
    }

    #[test]
    fn energy_balance_converts_flux_to_depth() {
        // 3350 kJ/m² melts 10 kg/m² = 0.01 m of water.
        let f = EnergyFluxes {
            shortwave: 2000.0,
            longwave: 1000.0,
            sensible: 200.0,
            latent: 100.0,
            ground: 50.0,
        };
        assert_abs_diff_eq!(energy_balance_melt(&f), 0.01, epsilon = 1e-12);
        let mm = MeltModel::EnergyBalance { depth_factor: 1000.0 };
        assert_abs_diff_eq!(mm.potential_melt(-10.0, Some(&f)), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn negative_energy_gives_no_melt() {
        let f = EnergyFluxes {
            longwave: -5000.0,
            shortwave: 1000.0,
            ..Default::default()
        };
        assert_eq!(energy_balance_melt(&f), 0.0);
    }

    #[test]
    fn missing_fluxes_mean_no_energy() {
        let m = MeltModel::EnergyBalance { depth_factor: 1.0 };
        assert!(m.needs_energy_fluxes());
        assert_eq!(m.potential_melt(20.0, None), 0.0);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(MeltModel::DegreeDay { k: -1.0, tbase: 0.0 }.validate().is_err());
        assert!(MeltModel::EnergyBalance { depth_factor: 0.0 }.validate().is_err());
        assert!(MeltModel::default().validate().is_ok());
    }

    #[test]
    fn melt_model_deserialises_from_tagged_json() {
        let m: MeltModel =
            serde_json::from_str(r#"{"model":"degree_day","k":4.0,"tbase":0.5}"#).unwrap();
        assert_eq!(m, MeltModel::DegreeDay { k: 4.0, tbase: 0.5 });
    }
}
