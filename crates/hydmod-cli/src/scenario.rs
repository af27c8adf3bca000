//! JSON scenario files: elevation, soil, forcing and run settings in one
//! document.

use anyhow::{bail, Context, Result};
use hydmod_core::{
    CellSoil, DailySeries, Forcing, HeightField, InitialStorage, SimulationConfig, SoilGrid,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SoilInput {
    Gridded(SoilGrid),
    Uniform(CellSoil),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ForcingInput {
    /// Full day-major grids.  Listed first: a gridded document would also
    /// parse as a station record.
    Gridded(Forcing),
    /// One station record applied to every cell.
    Station(DailySeries),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Elevation rows, north to south.
    pub elevation: Vec<Vec<f64>>,
    #[serde(default = "unit")]
    pub dx: f64,
    #[serde(default = "unit")]
    pub dy: f64,
    #[serde(default)]
    pub nodata: Option<f64>,
    pub soil: SoilInput,
    pub forcing: ForcingInput,
    #[serde(default)]
    pub config: SimulationConfig,
}

fn unit() -> f64 {
    1.0
}

/// Everything `Simulation::new` needs.
pub struct Inputs {
    pub elevation: HeightField,
    pub soil: SoilGrid,
    pub forcing: Forcing,
    pub config: SimulationConfig,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    /// The built-in 3×3 valley with a snowy spring.
    pub fn demo(days: usize) -> Self {
        let hf = HeightField::demo_valley();
        let rows = (0..hf.rows())
            .map(|r| (0..hf.cols()).map(|c| hf.get(r, c)).collect())
            .collect();

        // Cold first third, then a steady warm-up.
        let tavg: Vec<f64> = (0..days)
            .map(|d| -6.0 + 14.0 * d as f64 / days.max(1) as f64)
            .collect();
        let precip = (0..days).map(|d| if d % 3 == 0 { 15.0 } else { 2.0 }).collect();
        let pet = tavg.iter().map(|&t| (0.25 * t).max(0.0)).collect();

        let mut config = SimulationConfig::default();
        config.lateral_unit_factor = 0.01;
        config.initial.soil_storage = InitialStorage::FractionOfCapacity(0.6);

        Self {
            elevation: rows,
            dx: 1.0,
            dy: 1.0,
            nodata: None,
            soil: SoilInput::Uniform(CellSoil {
                porosity: 0.45,
                field_capacity: 0.3,
                wilting_point: 0.12,
                ksat: 40.0,
                ksub: 0.5,
                depth: 1000.0,
                slope: 0.0,
            }),
            forcing: ForcingInput::Station(DailySeries {
                precip,
                pet,
                tavg,
                ..Default::default()
            }),
            config,
        }
    }

    pub fn into_inputs(self) -> Result<Inputs> {
        if self.elevation.is_empty() {
            bail!("scenario has no elevation rows");
        }
        let mut elevation = HeightField::from_rows(&self.elevation, self.dx, self.dy)
            .context("building elevation grid")?;
        if let Some(nd) = self.nodata {
            elevation = elevation.with_nodata(nd);
        }
        let cells = elevation.grid.len();

        let soil = match self.soil {
            SoilInput::Gridded(g) => g,
            SoilInput::Uniform(cell) => {
                let mut g = SoilGrid::uniform(cells, cell);
                // A zero uniform slope means "derive from the elevation model".
                if cell.slope == 0.0 {
                    g.slope.clear();
                }
                g
            }
        };
        let forcing = match self.forcing {
            ForcingInput::Gridded(f) => f,
            ForcingInput::Station(s) => Forcing::uniform(cells, &s),
        };

        Ok(Inputs {
            elevation,
            soil,
            forcing,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hydmod_core::Simulation;

    #[test]
    fn demo_scenario_runs_to_completion() {
        let inputs = Scenario::demo(30).into_inputs().unwrap();
        let out = Simulation::new(&inputs.elevation, inputs.soil, inputs.forcing, inputs.config)
            .unwrap()
            .run()
            .unwrap();
        assert_eq!(out.days_completed, 30);
        assert!(out.balances.iter().all(|b| b.within_tolerance));
    }

    #[test]
    fn station_and_uniform_soil_parse() {
        let json = r#"{
            "elevation": [[3.0, 2.0], [2.0, 1.0]],
            "dx": 10.0, "dy": 10.0,
            "soil": { "porosity": 0.4, "field_capacity": 0.25, "wilting_point": 0.1,
                      "ksat": 5.0, "ksub": 0.1, "depth": 800.0, "slope": 0.02 },
            "forcing": { "precip": [1.0, 2.0], "pet": [0.5, 0.5], "tavg": [4.0, 6.0] },
            "config": { "lateral_unit_factor": 0.1 }
        }"#;
        let sc: Scenario = serde_json::from_str(json).unwrap();
        assert!(matches!(sc.soil, SoilInput::Uniform(_)));
        assert!(matches!(sc.forcing, ForcingInput::Station(_)));
        let inputs = sc.into_inputs().unwrap();
        assert_eq!(inputs.forcing.cells, 4);
        assert_eq!(inputs.forcing.days, 2);
        assert_eq!(inputs.soil.slope, vec![0.02; 4]);
        assert_eq!(inputs.config.lateral_unit_factor, 0.1);
    }

    #[test]
    fn gridded_forcing_is_preferred() {
        let json = r#"{
            "elevation": [[1.0]],
            "soil": { "porosity": 0.4, "field_capacity": 0.25, "wilting_point": 0.1,
                      "ksat": 5.0, "ksub": 0.1, "depth": 800.0 },
            "forcing": { "days": 1, "cells": 1, "precip": [1.0], "pet": [0.0], "tavg": [5.0] }
        }"#;
        let sc: Scenario = serde_json::from_str(json).unwrap();
        assert!(matches!(sc.forcing, ForcingInput::Gridded(_)));
    }
}
