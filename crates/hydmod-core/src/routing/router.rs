//! Single-hop lateral flow redistribution.
//!
//! Every cell's outflow for the timestep is handed to its downhill
//! neighbours according to the flow network.  Water moves exactly one cell
//! per call; there is no same-step cascading.  Outflow from sink cells has
//! no receiver inside the grid and is reported as boundary loss.
use serde::{Deserialize, Serialize};

use crate::error::Result;
use super::direction::Direction;
use super::network::FlowNetwork;

/// Result of routing one outflow field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutedFlow {
    /// Lateral inflow received by each cell, row-major.
    pub inflow: Vec<f64>,
    /// Outflow that found no in-grid receiver, row-major.
    pub unrouted: Vec<f64>,
    /// Sum of `unrouted`.
    pub boundary_loss: f64,
    /// Part of `boundary_loss` from outlets: sinks on the grid border or
    /// beside no-data cells.
    pub edge_loss: f64,
    /// Part of `boundary_loss` from interior pits.
    pub pit_loss: f64,
}

impl RoutedFlow {
    pub fn total_inflow(&self) -> f64 {
        self.inflow.iter().sum()
    }
}

/// Route `outflow` one hop through `network`.
///
/// `inflow[cell] = Σ_d proportion(neighbour_d, opposite(d)) × outflow[neighbour_d]`.
/// Guarantees `Σ inflow + boundary_loss == Σ outflow` up to rounding.
pub fn route_flow(network: &FlowNetwork, outflow: &[f64]) -> Result<RoutedFlow> {
    let grid = *network.grid();
    grid.check_field("lateral outflow", outflow)?;

    let n = grid.len();
    let mut inflow = vec![0.0f64; n];
    let mut unrouted = vec![0.0f64; n];
    let mut edge_loss = 0.0f64;
    let mut pit_loss = 0.0f64;

    for r in 0..grid.rows {
        for c in 0..grid.cols {
            let i = grid.index(r, c);
            let mut received = 0.0;
            for d in Direction::ALL {
                if let Some((nr, nc)) = network.neighbour(r, c, d) {
                    let q = outflow[grid.index(nr, nc)];
                    if q != 0.0 {
                        received += network.proportion(nr, nc, d.opposite()) * q;
                    }
                }
            }
            inflow[i] = received;

            // A cell either distributes everything it sends or nothing.
            if outflow[i] != 0.0 && network.proportions(r, c).iter().all(|&p| p == 0.0) {
                unrouted[i] = outflow[i];
                if network.is_outlet(r, c) {
                    edge_loss += outflow[i];
                } else {
                    pit_loss += outflow[i];
                }
            }
        }
    }

    Ok(RoutedFlow {
        inflow,
        unrouted,
        boundary_loss: edge_loss + pit_loss,
        edge_loss,
        pit_loss,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::heightfield::HeightField;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn network(rows: &[Vec<f64>]) -> FlowNetwork {
        FlowNetwork::from_heightfield(&HeightField::from_rows(rows, 1.0, 1.0).unwrap())
    }

    #[test]
    fn two_cell_slope_moves_everything_downhill() {
        let net = network(&[vec![10.0, 9.0]]);
        let routed = route_flow(&net, &[4.0, 0.0]).unwrap();
        assert_eq!(routed.inflow, vec![0.0, 4.0]);
        assert_eq!(routed.boundary_loss, 0.0);
    }

    #[test]
    fn routing_is_single_hop() {
        // Three-cell chain: water from the top reaches only the middle cell.
        let net = network(&[vec![3.0, 2.0, 1.0]]);
        let routed = route_flow(&net, &[1.0, 0.0, 0.0]).unwrap();
        assert_eq!(routed.inflow, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn outlet_outflow_is_edge_loss() {
        let net = FlowNetwork::from_heightfield(&HeightField::demo_valley());
        let mut out = vec![0.0; 9];
        out[7] = 2.5; // (2, 1), the outlet
        let routed = route_flow(&net, &out).unwrap();
        assert_eq!(routed.total_inflow(), 0.0);
        assert_eq!(routed.unrouted[7], 2.5);
        assert_eq!(routed.edge_loss, 2.5);
        assert_eq!(routed.pit_loss, 0.0);
        assert_eq!(routed.boundary_loss, 2.5);
    }

    #[test]
    fn interior_pit_outflow_is_pit_loss() {
        let net = network(&[
            vec![5.0, 5.0, 5.0],
            vec![5.0, 1.0, 5.0],
            vec![5.0, 5.0, 5.0],
        ]);
        let mut out = vec![1.0; 9];
        out[4] = 3.0;
        let routed = route_flow(&net, &out).unwrap();
        assert_abs_diff_eq!(routed.inflow[4], 8.0, epsilon = 1e-12);
        assert_eq!(routed.pit_loss, 3.0);
        assert_eq!(routed.edge_loss, 0.0);
    }

    #[test]
    fn sink_beside_nodata_counts_as_edge_loss() {
        let hf = HeightField::from_rows(
            &[
                vec![5.0, 5.0, 5.0, 5.0],
                vec![5.0, 1.0, -9999.0, 5.0],
                vec![5.0, 5.0, 5.0, 5.0],
            ],
            1.0,
            1.0,
        )
        .unwrap()
        .with_nodata(-9999.0);
        let net = FlowNetwork::from_heightfield(&hf);
        let mut out = vec![0.0; 12];
        out[5] = 1.5;
        let routed = route_flow(&net, &out).unwrap();
        assert_eq!(routed.edge_loss, 1.5);
        assert_eq!(routed.pit_loss, 0.0);
    }

    #[test]
    fn wrong_length_is_a_configuration_error() {
        let net = network(&[vec![1.0, 0.0]]);
        assert!(route_flow(&net, &[1.0]).is_err());
    }

    #[test]
    fn mass_is_conserved_for_random_fields() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..25 {
            let rows = rng.gen_range(1..10);
            let cols = rng.gen_range(1..10);
            let mut hf = HeightField::new(Grid::square(rows, cols, 10.0), 0.0);
            for v in hf.data.iter_mut() {
                *v = rng.gen_range(0..5) as f64;
            }
            let net = FlowNetwork::from_heightfield(&hf);
            let out: Vec<f64> = (0..rows * cols).map(|_| rng.gen_range(0.0..5.0)).collect();
            let routed = route_flow(&net, &out).unwrap();

            let sent: f64 = out.iter().sum();
            let accounted = routed.total_inflow() + routed.boundary_loss;
            assert!(
                (sent - accounted).abs() <= 1e-9 * sent.max(1.0),
                "routing lost mass: sent {sent}, accounted {accounted}"
            );
            assert_abs_diff_eq!(
                routed.boundary_loss,
                routed.edge_loss + routed.pit_loss,
                epsilon = 1e-12
            );
        }
    }
}
