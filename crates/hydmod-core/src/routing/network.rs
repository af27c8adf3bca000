//! Slope-proportional 8-direction flow network.
//!
//! Each cell splits its outgoing lateral flow among its downhill neighbours
//! in proportion to `drop / distance`.  Built once per run from the
//! elevation model and read-only afterwards.
use crate::grid::Grid;
use crate::heightfield::HeightField;
use super::direction::Direction;

/// Per-cell flow proportions keyed by `(row, col)` and `Direction`.
#[derive(Debug, Clone)]
pub struct FlowNetwork {
    grid: Grid,
    /// Row-major; each entry sums to 1.0 or is all zeros.
    proportions: Vec<[f64; 8]>,
    /// False for no-data cells.
    active: Vec<bool>,
    /// Largest downhill gradient (drop / distance), 0 for sinks.
    steepest: Vec<f64>,
    /// Sinks on the edge of the modelled area: the grid border or next to
    /// a no-data cell.
    outlet: Vec<bool>,
}

impl FlowNetwork {
    /// Compute flow proportions for every cell of `hf`.
    ///
    /// Uphill and level neighbours get no flow.  Off-grid and no-data
    /// neighbours count as a zero drop, so flow is never directed off the
    /// grid; a cell without a downhill neighbour is a sink with all-zero
    /// proportions.  Sinks on the grid border or beside a no-data cell are
    /// outlets; every other sink is an interior pit.
    pub fn from_heightfield(hf: &HeightField) -> Self {
        let grid = hf.grid;
        let n = grid.len();
        let mut proportions = vec![[0.0f64; 8]; n];
        let mut active = vec![false; n];
        let mut steepest = vec![0.0f64; n];
        let mut outlet = vec![false; n];

        for r in 0..grid.rows {
            for c in 0..grid.cols {
                let i = grid.index(r, c);
                let Some(z0) = hf.elevation(r, c) else {
                    continue;
                };
                active[i] = true;

                let mut drops = [0.0f64; 8];
                let mut on_edge = grid.is_border(r, c);
                for d in Direction::ALL {
                    let (dr, dc) = d.offset();
                    let Some((nr, nc)) = grid.offset(r, c, dr, dc) else {
                        continue;
                    };
                    let Some(z1) = hf.elevation(nr, nc) else {
                        on_edge = true;
                        continue;
                    };
                    drops[d.index()] = ((z0 - z1) / d.distance(&grid)).max(0.0);
                }

                let total: f64 = drops.iter().sum();
                if total > 0.0 {
                    let row = &mut proportions[i];
                    for (p, &drop) in row.iter_mut().zip(drops.iter()) {
                        *p = drop / total;
                    }
                    steepest[i] = drops.iter().cloned().fold(0.0, f64::max);
                } else {
                    outlet[i] = on_edge;
                }
            }
        }

        Self {
            grid,
            proportions,
            active,
            steepest,
            outlet,
        }
    }

    #[inline]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// All 8 proportions of a cell, canonical order.
    #[inline]
    pub fn proportions(&self, row: usize, col: usize) -> [f64; 8] {
        self.proportions[self.grid.index(row, col)]
    }

    #[inline]
    pub fn proportion(&self, row: usize, col: usize, dir: Direction) -> f64 {
        self.proportions[self.grid.index(row, col)][dir.index()]
    }

    /// Neighbour of `(row, col)` in `dir`, if it lies on the grid.
    #[inline]
    pub fn neighbour(&self, row: usize, col: usize, dir: Direction) -> Option<(usize, usize)> {
        let (dr, dc) = dir.offset();
        self.grid.offset(row, col, dr, dc)
    }

    #[inline]
    pub fn is_active(&self, row: usize, col: usize) -> bool {
        self.active[self.grid.index(row, col)]
    }

    /// Active cell with no downhill neighbour.
    #[inline]
    pub fn is_sink(&self, row: usize, col: usize) -> bool {
        let i = self.grid.index(row, col);
        self.active[i] && self.steepest[i] == 0.0
    }

    /// Sink through which water leaves the modelled area.
    #[inline]
    pub fn is_outlet(&self, row: usize, col: usize) -> bool {
        self.outlet[self.grid.index(row, col)]
    }

    /// Whether the cell can shed lateral flow: it has a downhill neighbour
    /// or is an outlet.  Interior pits hold their water.
    #[inline]
    pub fn drains(&self, row: usize, col: usize) -> bool {
        let i = self.grid.index(row, col);
        self.active[i] && (self.steepest[i] > 0.0 || self.outlet[i])
    }

    /// Steepest downhill gradient (rise/run) out of the cell.
    #[inline]
    pub fn steepest_slope(&self, row: usize, col: usize) -> f64 {
        self.steepest[self.grid.index(row, col)]
    }

    /// Row-major activity mask.
    pub fn active_mask(&self) -> &[bool] {
        &self.active
    }

    /// Row-major steepest-descent slope field.
    pub fn slope_field(&self) -> Vec<f64> {
        self.steepest.clone()
    }

    /// Number of active sinks; edge outlets included.
    pub fn sink_count(&self) -> usize {
        (0..self.grid.len())
            .filter(|&i| self.active[i] && self.steepest[i] == 0.0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn field(rows: &[Vec<f64>]) -> HeightField {
        HeightField::from_rows(rows, 1.0, 1.0).unwrap()
    }

    #[test]
    fn ramp_sends_everything_east_weighted_by_distance() {
        // Elevation falls to the east; the interior cell has three downhill
        // neighbours: NE, E, SE.
        let hf = field(&[
            vec![3.0, 2.0, 1.0],
            vec![3.0, 2.0, 1.0],
            vec![3.0, 2.0, 1.0],
        ]);
        let net = FlowNetwork::from_heightfield(&hf);
        let p = net.proportions(1, 1);
        let diag = 1.0 / 2f64.sqrt();
        let total = 1.0 + 2.0 * diag;
        assert_abs_diff_eq!(p[Direction::E.index()], 1.0 / total, epsilon = 1e-12);
        assert_abs_diff_eq!(p[Direction::NE.index()], diag / total, epsilon = 1e-12);
        assert_abs_diff_eq!(p[Direction::SE.index()], diag / total, epsilon = 1e-12);
        assert_eq!(p[Direction::W.index()], 0.0);
        assert_eq!(p[Direction::N.index()], 0.0);
    }

    #[test]
    fn pit_has_all_zero_proportions() {
        let hf = field(&[
            vec![5.0, 5.0, 5.0],
            vec![5.0, 1.0, 5.0],
            vec![5.0, 5.0, 5.0],
        ]);
        let net = FlowNetwork::from_heightfield(&hf);
        assert!(net.is_sink(1, 1));
        assert!(!net.is_outlet(1, 1));
        assert!(!net.drains(1, 1));
        assert_eq!(net.proportions(1, 1), [0.0; 8]);
        // Rim cells all drain toward the pit.
        assert_abs_diff_eq!(net.proportion(0, 1, Direction::S), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(net.proportion(0, 0, Direction::SE), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn flat_grid_is_all_sinks() {
        let hf = HeightField::flat(3, 3, 10.0);
        let net = FlowNetwork::from_heightfield(&hf);
        for r in 0..3 {
            for c in 0..3 {
                assert_eq!(net.proportions(r, c), [0.0; 8], "cell ({r},{c})");
                assert!(net.is_sink(r, c));
                assert_eq!(net.is_outlet(r, c), (r, c) != (1, 1), "cell ({r},{c})");
            }
        }
        assert_eq!(net.sink_count(), 9);
    }

    #[test]
    fn edge_outlet_does_not_route_off_grid() {
        // Bottom-centre of the demo valley is the lowest cell; it has no
        // in-grid downhill neighbour.
        let net = FlowNetwork::from_heightfield(&HeightField::demo_valley());
        assert!(net.is_sink(2, 1));
        assert!(net.is_outlet(2, 1));
        assert_eq!(net.proportions(2, 1), [0.0; 8]);
        assert!(!net.is_sink(1, 1));
        assert!(net.drains(1, 1));
    }

    #[test]
    fn sink_beside_nodata_is_an_outlet() {
        // (1, 1) is the lowest valid cell; its east neighbour is no-data.
        let hf = field(&[
            vec![5.0, 5.0, 5.0, 5.0],
            vec![5.0, 1.0, -9999.0, 5.0],
            vec![5.0, 5.0, 5.0, 5.0],
        ])
        .with_nodata(-9999.0);
        let net = FlowNetwork::from_heightfield(&hf);
        assert!(net.is_sink(1, 1));
        assert!(net.is_outlet(1, 1), "a watershed edge is an outlet");
        assert!(net.drains(1, 1));
    }

    #[test]
    fn nodata_cells_are_inactive_and_receive_nothing() {
        let hf = field(&[vec![5.0, -9999.0], vec![4.0, 3.0]]).with_nodata(-9999.0);
        let net = FlowNetwork::from_heightfield(&hf);
        assert!(!net.is_active(0, 1));
        assert!(!net.is_sink(0, 1));
        assert_eq!(net.proportion(1, 1, Direction::N), 0.0);
        // (0,0) drains S and SE only, never toward the no-data cell.
        assert_eq!(net.proportion(0, 0, Direction::E), 0.0);
        let sum: f64 = net.proportions(0, 0).iter().sum();
        assert_abs_diff_eq!(sum, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn steepest_slope_uses_diagonal_distance() {
        let hf = field(&[vec![2.0, 2.0], vec![2.0, 0.0]]);
        let net = FlowNetwork::from_heightfield(&hf);
        assert_abs_diff_eq!(net.steepest_slope(0, 0), 2.0 / 2f64.sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(net.steepest_slope(0, 1), 2.0, epsilon = 1e-12);
        assert_eq!(net.steepest_slope(1, 1), 0.0);
    }

    #[test]
    fn random_terrain_rows_sum_to_zero_or_one() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let rows = rng.gen_range(1..12);
            let cols = rng.gen_range(1..12);
            let mut hf = HeightField::new(Grid::new(rows, cols, 30.0, 25.0), 0.0);
            for v in hf.data.iter_mut() {
                // Coarse values so level neighbours actually occur.
                *v = rng.gen_range(0..6) as f64 * 10.0;
            }
            let net = FlowNetwork::from_heightfield(&hf);
            for r in 0..rows {
                for c in 0..cols {
                    let p = net.proportions(r, c);
                    assert!(p.iter().all(|&x| x >= 0.0), "negative proportion at ({r},{c})");
                    let sum: f64 = p.iter().sum();
                    let z = hf.get(r, c);
                    let has_lower = Direction::ALL.iter().any(|&d| {
                        net.neighbour(r, c, d).is_some_and(|(nr, nc)| hf.get(nr, nc) < z)
                    });
                    if has_lower {
                        assert!((sum - 1.0).abs() < 1e-9, "({r},{c}) sums to {sum}");
                    } else {
                        assert_eq!(sum, 0.0, "pit ({r},{c}) must have zero proportions");
                    }
                }
            }
        }
    }
}
