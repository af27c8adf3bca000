//! Per-cell vertical water balance.
//!
//! One cell-day runs six steps in a fixed order:
//!   1. infiltrate rain + melt
//!   2. water-table height from current storage
//!   3. Darcy lateral outflow, routed, net exchange applied
//!   4. ET reduced by soil moisture
//!   5. percolation when a water table exists
//!   6. saturation-excess runoff and clipping to capacity
//!
//! Steps 1–3 stop at the routing barrier (`lateral_demand`); the
//! orchestrator routes every cell's outflow before `apply_lateral` and
//! `finish_day` complete the day.  Every removal is limited to the water in
//! storage, so storage never goes negative and each flux is the amount that
//! actually moved.
use crate::groundwater::{lateral_flow_darcy, percolation, water_table_height, DegenerateSoil};
use crate::soil::CellSoil;

/// ET reduction factor for a storage depth.
///
///   storage ≥ 0.8·fc → 1
///   storage ≤ wp     → 0
///   otherwise        → 1 − (0.8·fc − storage) / (0.8·fc − wp)
///
/// `fc_depth` and `wp_depth` are in storage units.  When `wp_depth` is at
/// or above `0.8 × fc_depth` the ramp is empty and the factor is a step.
pub fn et_reduction(storage: f64, fc_depth: f64, wp_depth: f64) -> f64 {
    let full = 0.8 * fc_depth;
    if storage >= full {
        1.0
    } else if storage <= wp_depth {
        0.0
    } else {
        1.0 - (full - storage) / (full - wp_depth)
    }
}

/// Step 1.
#[inline]
pub fn infiltrate(storage: f64, water_input: f64) -> f64 {
    storage + water_input
}

/// State at the routing barrier (end of step 3, before exchange).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LateralDemand {
    /// Storage after infiltration.
    pub storage: f64,
    pub water_table_height: f64,
    /// Darcy outflow, limited to `storage`.
    pub outflow: f64,
}

/// Steps 1–3 up to the barrier.
pub fn lateral_demand(
    soil: &CellSoil,
    storage_prev: f64,
    water_input: f64,
    unit_factor: f64,
) -> Result<LateralDemand, DegenerateSoil> {
    let storage = infiltrate(storage_prev, water_input);
    let hwt = water_table_height(
        soil.porosity,
        soil.field_capacity,
        storage / soil.depth,
        soil.depth,
    )?;
    let darcy = lateral_flow_darcy(soil.ksat, soil.slope, hwt, unit_factor);
    Ok(LateralDemand {
        storage,
        water_table_height: hwt,
        outflow: darcy.clamp(0.0, storage.max(0.0)),
    })
}

/// Net lateral exchange after routing.
#[inline]
pub fn apply_lateral(storage: f64, inflow: f64, outflow: f64) -> f64 {
    storage + inflow - outflow
}

/// Fluxes of steps 4–6 and the final storage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayEnd {
    pub storage: f64,
    pub actual_et: f64,
    pub percolation: f64,
    pub runoff: f64,
}

/// Steps 4–6.  The water table for percolation is recomputed from the
/// post-ET storage.
pub fn finish_day(soil: &CellSoil, storage: f64, pet: f64) -> Result<DayEnd, DegenerateSoil> {
    let mut storage = storage.max(0.0);

    let theta = et_reduction(storage, soil.fc_depth(), soil.wp_depth());
    let actual_et = (pet * theta).clamp(0.0, storage);
    storage -= actual_et;

    let hwt = water_table_height(
        soil.porosity,
        soil.field_capacity,
        storage / soil.depth,
        soil.depth,
    )?;
    let perc = percolation(soil.ksub, hwt).clamp(0.0, storage);
    storage -= perc;

    let capacity = soil.capacity();
    let runoff = (storage - capacity).max(0.0);
    storage = storage.min(capacity);

    Ok(DayEnd {
        storage,
        actual_et,
        percolation: perc,
        runoff,
    })
}
