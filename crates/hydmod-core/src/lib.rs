//! Gridded daily water-balance model.
//!
//! A rectangular elevation grid is turned into a slope-proportional flow
//! network.  Each day every cell runs a snow model and a vertical soil
//! water balance, and saturated lateral flow is passed one hop downslope.
//! Water leaving through sinks is reported as boundary loss.
pub mod balance;
pub mod config;
pub mod error;
pub mod forcing;
pub mod grid;
pub mod groundwater;
pub mod heightfield;
pub mod routing;
pub mod simulation;
pub mod snow;
pub mod soil;

pub use config::{InitialConditions, InitialStorage, Retention, SimulationConfig};
pub use error::{HydroError, Result};
pub use forcing::{DailySeries, Forcing};
pub use grid::Grid;
pub use groundwater::LinearReservoir;
pub use heightfield::HeightField;
pub use routing::{route_flow, Direction, FlowNetwork, RoutedFlow};
pub use simulation::{
    CellFluxes, CellState, DayBalance, History, RunStatus, Simulation, SimulationOutput, Variable,
};
pub use snow::{EnergyFluxes, MeltModel, SnowParams, TemperatureIndex};
pub use soil::{CellSoil, SoilGrid};
