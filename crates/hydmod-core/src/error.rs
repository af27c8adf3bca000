//! Error taxonomy for the simulation engine.
//!
//! Configuration problems are caught before the daily loop starts; numeric
//! degeneracies abort the run at the first failing day and cell.  Flow that
//! leaves the grid is not an error and never appears here.

use thiserror::Error;

/// Errors raised while building or running a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HydroError {
    /// Shape mismatch or invalid value detected before the run starts.
    #[error("configuration error in {context}: {message}")]
    Configuration { context: String, message: String },

    /// Soil parameters that make the water-table height undefined.
    #[error(
        "numeric degeneracy on day {day} at cell ({row}, {col}): \
         field capacity {field_capacity} >= porosity {porosity}"
    )]
    NumericDegeneracy {
        day: usize,
        row: usize,
        col: usize,
        field_capacity: f64,
        porosity: f64,
    },

    /// `step_day` was called after the last forcing day.
    #[error("simulation already complete after {days} days")]
    RunFinished { days: usize },

    /// `step_day` was called after a failure aborted the run.
    #[error("simulation aborted on day {day} at cell ({row}, {col})")]
    RunAborted { day: usize, row: usize, col: usize },
}

impl HydroError {
    /// Build a configuration error.
    pub fn config(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Build a configuration error for a field whose length does not match
    /// the grid.
    pub fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::Configuration {
            context: context.into(),
            message: format!("expected {expected} values, got {actual}"),
        }
    }

    /// Day and cell coordinates a run-time failure is attached to, if any.
    pub fn location(&self) -> Option<(usize, usize, usize)> {
        match *self {
            Self::NumericDegeneracy { day, row, col, .. } => Some((day, row, col)),
            Self::RunAborted { day, row, col } => Some((day, row, col)),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, HydroError>;
