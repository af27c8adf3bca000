//! Daily time-loop orchestrator.
//!
//! Owns all mutable state.  Each day runs, in order:
//!   1. snow model and balance steps 1–3 for every cell
//!   2. routing barrier: all outflows routed at once
//!   3. balance steps 4–6 and the optional baseflow store for every cell
//!   4. mass-balance audit
//!
//! Interior pits send no lateral flow; only outlets lose water across the
//! boundary.
//!
//! Cells within a phase are independent and run on rayon's pool when the
//! `threading` feature is enabled.  Days are strictly sequential.  Any cell
//! failure aborts the whole run.
pub mod output;

use serde::{Deserialize, Serialize};

use crate::balance::{apply_lateral, finish_day, lateral_demand, LateralDemand};
use crate::config::{Retention, SimulationConfig};
use crate::error::{HydroError, Result};
use crate::forcing::Forcing;
use crate::groundwater::DegenerateSoil;
use crate::heightfield::HeightField;
use crate::routing::{route_flow, FlowNetwork, RoutedFlow};
use crate::snow::{snow_day, SnowDay};
use crate::soil::SoilGrid;
pub use output::{DayBalance, History, SimulationOutput, Variable};

const TARGET: &str = "hydmod::simulation";

/// State of one cell at the end of a day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CellState {
    pub snow: f64,
    pub soil: f64,
    /// Water table that drove the day's lateral outflow.
    pub water_table_height: f64,
    pub aquifer: f64,
}

impl CellState {
    #[inline]
    pub fn total_water(&self) -> f64 {
        self.snow + self.soil + self.aquifer
    }
}

/// Fluxes of one cell over one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CellFluxes {
    pub snowfall: f64,
    pub rain: f64,
    pub actual_melt: f64,
    pub lateral_outflow: f64,
    pub lateral_inflow: f64,
    pub actual_et: f64,
    pub percolation: f64,
    pub baseflow: f64,
    pub runoff: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Complete,
    Aborted { day: usize, row: usize, col: usize },
}

/// Snow and pre-barrier balance for one active cell.
#[derive(Debug, Clone, Copy)]
struct Demand {
    snow: SnowDay,
    lateral: LateralDemand,
}

/// Map `f` over cell indices, in parallel with the `threading` feature.
/// Results are always returned in cell order.
fn map_cells<T, F>(n: usize, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    #[cfg(feature = "threading")]
    {
        use rayon::prelude::*;
        (0..n).into_par_iter().map(f).collect()
    }
    #[cfg(not(feature = "threading"))]
    {
        (0..n).map(f).collect()
    }
}

/// Gridded water-balance run.
pub struct Simulation {
    network: FlowNetwork,
    soil: SoilGrid,
    forcing: Forcing,
    config: SimulationConfig,
    state: Vec<CellState>,
    previous: Vec<CellState>,
    last_fluxes: Vec<CellFluxes>,
    day: usize,
    status: RunStatus,
    balances: Vec<DayBalance>,
    history: Option<History>,
}

impl Simulation {
    /// Validate every input against the elevation grid and build the flow
    /// network.  Nothing runs until [`Simulation::step_day`] or
    /// [`Simulation::run`].
    ///
    /// An empty `soil.slope` is replaced by steepest-descent slopes derived
    /// from `elevation`.
    pub fn new(
        elevation: &HeightField,
        soil: SoilGrid,
        forcing: Forcing,
        config: SimulationConfig,
    ) -> Result<Self> {
        elevation.validate()?;
        config.validate()?;
        let grid = elevation.grid;

        let network = FlowNetwork::from_heightfield(elevation);
        let soil = soil.with_derived_slope(&network);
        soil.validate(&grid, network.active_mask())?;
        forcing.validate(grid.len(), &config.snow)?;

        let active = network.active_mask();
        let state: Vec<CellState> = (0..grid.len())
            .map(|i| {
                if !active[i] {
                    return CellState::default();
                }
                CellState {
                    snow: config.initial.snow,
                    soil: config.initial.soil_storage.resolve(soil.cell(i).capacity()),
                    water_table_height: 0.0,
                    aquifer: if config.baseflow.is_some() {
                        config.initial.aquifer
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        let days = forcing.days;
        let history = match config.retention {
            Retention::Full => Some(History::with_capacity(grid.len(), days)),
            Retention::Rolling => None,
        };

        tracing::info!(
            target: TARGET,
            rows = grid.rows,
            cols = grid.cols,
            days = forcing.days,
            active_cells = active.iter().filter(|&&a| a).count(),
            sinks = network.sink_count(),
            baseflow = config.baseflow.is_some(),
            "simulation.ready"
        );

        Ok(Self {
            network,
            soil,
            forcing,
            config,
            previous: state.clone(),
            state,
            last_fluxes: vec![CellFluxes::default(); grid.len()],
            day: 0,
            status: RunStatus::Running,
            balances: Vec::with_capacity(days),
            history,
        })
    }

    pub fn network(&self) -> &FlowNetwork {
        &self.network
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Number of days completed so far.
    pub fn day(&self) -> usize {
        self.day
    }

    pub fn days(&self) -> usize {
        self.forcing.days
    }

    /// State at the end of the last completed day.
    pub fn state(&self) -> &[CellState] {
        &self.state
    }

    /// State one day earlier than [`Simulation::state`].
    pub fn previous_state(&self) -> &[CellState] {
        &self.previous
    }

    /// Fluxes of the last completed day.
    pub fn last_fluxes(&self) -> &[CellFluxes] {
        &self.last_fluxes
    }

    pub fn balances(&self) -> &[DayBalance] {
        &self.balances
    }

    /// Advance one day.  Fails without touching state if the run is
    /// already terminal; on a cell failure the run becomes `Aborted`.
    pub fn step_day(&mut self) -> Result<DayBalance> {
        match self.status {
            RunStatus::Complete => return Err(HydroError::RunFinished { days: self.day }),
            RunStatus::Aborted { day, row, col } => {
                return Err(HydroError::RunAborted { day, row, col })
            }
            RunStatus::Running => {}
        }

        let day = self.day;
        let grid = *self.network.grid();
        let n = grid.len();

        // ── Phase 1: snow, infiltration, water table, Darcy outflow ─────────
        let demands = {
            let network = &self.network;
            let soil = &self.soil;
            let forcing = &self.forcing;
            let config = &self.config;
            let state = &self.state;
            map_cells(n, |i| -> std::result::Result<Option<Demand>, DegenerateSoil> {
                let (r, c) = grid.coords(i);
                if !network.is_active(r, c) {
                    return Ok(None);
                }
                let temp = forcing.temperature(day, i, config.snow.temperature);
                let snow = snow_day(
                    &config.snow,
                    state[i].snow,
                    forcing.precip(day, i),
                    temp,
                    forcing.fluxes(day, i),
                );
                let mut lateral = lateral_demand(
                    &soil.cell(i),
                    state[i].soil,
                    snow.water_input(),
                    config.lateral_unit_factor,
                )?;
                // Interior pits have nowhere to send water.
                if !network.drains(r, c) {
                    lateral.outflow = 0.0;
                }
                Ok(Some(Demand { snow, lateral }))
            })
        };
        let demands = self.collect_or_abort(demands)?;

        // ── Phase 2: routing barrier ────────────────────────────────────────
        let outflow: Vec<f64> = demands
            .iter()
            .map(|d| d.map_or(0.0, |d| d.lateral.outflow))
            .collect();
        let routed = route_flow(&self.network, &outflow)?;

        // ── Phase 3: ET, percolation, runoff, baseflow ──────────────────────
        let finished = {
            let soil = &self.soil;
            let forcing = &self.forcing;
            let config = &self.config;
            let state = &self.state;
            let routed = &routed;
            let demands = &demands;
            map_cells(
                n,
                |i| -> std::result::Result<(CellState, CellFluxes), DegenerateSoil> {
                    let Some(d) = demands[i] else {
                        return Ok((CellState::default(), CellFluxes::default()));
                    };
                    let cell = soil.cell(i);
                    let storage =
                        apply_lateral(d.lateral.storage, routed.inflow[i], d.lateral.outflow);
                    let end = finish_day(&cell, storage, forcing.pet(day, i))?;

                    let (aquifer, baseflow) = match &config.baseflow {
                        Some(res) => {
                            let step = res.step(state[i].aquifer, end.percolation);
                            (step.storage, step.baseflow)
                        }
                        None => (0.0, 0.0),
                    };

                    Ok((
                        CellState {
                            snow: d.snow.storage,
                            soil: end.storage,
                            water_table_height: d.lateral.water_table_height,
                            aquifer,
                        },
                        CellFluxes {
                            snowfall: d.snow.snowfall,
                            rain: d.snow.rain,
                            actual_melt: d.snow.actual_melt,
                            lateral_outflow: d.lateral.outflow,
                            lateral_inflow: routed.inflow[i],
                            actual_et: end.actual_et,
                            percolation: end.percolation,
                            baseflow,
                            runoff: end.runoff,
                        },
                    ))
                },
            )
        };
        let finished = self.collect_or_abort(finished)?;
        let (next, fluxes): (Vec<CellState>, Vec<CellFluxes>) = finished.into_iter().unzip();

        // ── Phase 4: audit and commit ───────────────────────────────────────
        let balance = self.audit(day, &next, &fluxes, &routed);

        if let Some(history) = self.history.as_mut() {
            history.push(&next, &fluxes);
        }
        self.previous = std::mem::replace(&mut self.state, next);
        self.last_fluxes = fluxes;
        self.balances.push(balance);
        self.day += 1;
        if self.day == self.forcing.days {
            self.status = RunStatus::Complete;
        }

        tracing::debug!(
            target: TARGET,
            day,
            precipitation = balance.precipitation,
            actual_et = balance.actual_et,
            runoff = balance.runoff,
            boundary_loss = balance.boundary_loss,
            storage = balance.total_storage(),
            residual = balance.residual,
            "simulation.day"
        );
        Ok(balance)
    }

    /// Run every remaining day and hand back the outputs.
    pub fn run(mut self) -> Result<SimulationOutput> {
        let started = std::time::Instant::now();
        while self.status == RunStatus::Running {
            self.step_day()?;
        }
        let output = self.into_output();
        tracing::info!(
            target: TARGET,
            days = output.days_completed,
            boundary_loss = output.total_boundary_loss(),
            max_residual = output.max_residual(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "simulation.complete"
        );
        Ok(output)
    }

    /// Stop here and return what has been produced so far.
    pub fn into_output(self) -> SimulationOutput {
        SimulationOutput {
            grid: *self.network.grid(),
            status: self.status,
            days_completed: self.day,
            final_state: self.state,
            balances: self.balances,
            history: self.history,
        }
    }

    /// Unwrap per-cell results, aborting the run at the first failing cell
    /// in row-major order.
    fn collect_or_abort<T>(
        &mut self,
        results: Vec<std::result::Result<T, DegenerateSoil>>,
    ) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(results.len());
        for (i, res) in results.into_iter().enumerate() {
            match res {
                Ok(v) => out.push(v),
                Err(e) => {
                    let (row, col) = self.network.grid().coords(i);
                    let day = self.day;
                    self.status = RunStatus::Aborted { day, row, col };
                    tracing::error!(target: TARGET, day, row, col, error = %e, "simulation.aborted");
                    return Err(HydroError::NumericDegeneracy {
                        day,
                        row,
                        col,
                        field_capacity: e.field_capacity,
                        porosity: e.porosity,
                    });
                }
            }
        }
        Ok(out)
    }

    fn audit(
        &self,
        day: usize,
        next: &[CellState],
        fluxes: &[CellFluxes],
        routed: &RoutedFlow,
    ) -> DayBalance {
        let mut b = DayBalance {
            day,
            boundary_loss: routed.boundary_loss,
            edge_loss: routed.edge_loss,
            pit_loss: routed.pit_loss,
            ..Default::default()
        };
        let mut before = 0.0;
        for (i, ((prev, s), f)) in self.state.iter().zip(next).zip(fluxes).enumerate() {
            let (r, c) = self.network.grid().coords(i);
            if !self.network.is_active(r, c) {
                continue;
            }
            before += prev.total_water();
            b.precipitation += self.forcing.precip(day, i);
            b.snowfall += f.snowfall;
            b.rain += f.rain;
            b.actual_melt += f.actual_melt;
            b.actual_et += f.actual_et;
            b.lateral_outflow += f.lateral_outflow;
            b.lateral_inflow += f.lateral_inflow;
            b.percolation += f.percolation;
            b.baseflow += f.baseflow;
            b.runoff += f.runoff;
            b.snow_storage += s.snow;
            b.soil_storage += s.soil;
            b.aquifer_storage += s.aquifer;
        }

        let deep_loss = if self.config.baseflow.is_some() {
            b.baseflow
        } else {
            b.percolation
        };
        let losses = b.actual_et + b.runoff + b.boundary_loss + deep_loss;
        b.residual = (b.total_storage() - before) - (b.precipitation - losses);

        let scale = (before + b.precipitation).max(1.0);
        b.within_tolerance = b.residual.abs() <= self.config.audit_tolerance * scale;
        if !b.within_tolerance {
            tracing::warn!(
                target: TARGET,
                day,
                residual = b.residual,
                tolerance = self.config.audit_tolerance * scale,
                "simulation.mass_balance"
            );
        }
        b
    }
}
