// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Enzyme placement across the grid and the kinetic flux bounds it
//! implies.
//!
//! A total cellular concentration is split over sub-compartments
//! (uniformly, along a centre-oriented gradient, or at random), and each
//! enzyme-catalysed reaction gets a per-cell upper bound of
//! `sum(k_cat * [E])` over its catalysing enzymes. The bounds are emitted
//! as overrides for the assembler.

use indexmap::IndexMap;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::assemble::BoundOverrides;
use crate::common::{namespaced, CellId, Result};
use crate::config_err;
use crate::grid::GridSpec;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum EnzymeDistribution {
    Uniform,
    /// Layer-by-layer change from the perimeter toward the centre; must
    /// lie in `[-1.0, 1.0]`. Positive concentrates the enzyme inward,
    /// negative outward, zero is uniform.
    Gradient(f64),
    /// Seeded so that a distribution is reproducible run to run.
    Random { seed: u64 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DistributionScope {
    AllCells,
    /// Restrict the enzyme to the outermost layer; interior cells get
    /// zero concentration.
    PerimeterOnly,
}

/// Split `total_concentration` over the grid. The returned map covers
/// every cell (with zeros outside the scope) and sums to the total.
pub fn distribute(
    grid: &GridSpec,
    total_concentration: f64,
    distribution: EnzymeDistribution,
    scope: DistributionScope,
) -> Result<IndexMap<CellId, f64>> {
    grid.validate()?;
    if !(total_concentration.is_finite() && total_concentration >= 0.0) {
        return config_err!(
            NegativeCoefficient,
            format!("total enzyme concentration is {total_concentration}")
        );
    }
    if let EnzymeDistribution::Gradient(gradient) = distribution {
        if !(-1.0..=1.0).contains(&gradient) {
            return config_err!(
                BadGradient,
                format!("gradient must lie between -1.0 and 1.0, got {gradient}")
            );
        }
    }

    let in_scope = |cell: CellId| match scope {
        DistributionScope::AllCells => true,
        DistributionScope::PerimeterOnly => grid.is_perimeter(cell),
    };

    let shares: IndexMap<CellId, f64> = match distribution {
        EnzymeDistribution::Uniform => grid
            .cells()
            .map(|cell| (cell, if in_scope(cell) { 1.0 } else { 0.0 }))
            .collect(),
        EnzymeDistribution::Gradient(gradient) => {
            let start = if gradient > 0.0 {
                1.0
            } else {
                grid.rows.min(grid.cols) as f64 / 2.0
            };
            grid.cells()
                .map(|cell| {
                    let share = if in_scope(cell) {
                        start + gradient * layer_depth(grid, cell) as f64
                    } else {
                        0.0
                    };
                    (cell, share)
                })
                .collect()
        }
        EnzymeDistribution::Random { seed } => {
            let mut rng = StdRng::seed_from_u64(seed);
            grid.cells()
                .map(|cell| {
                    let sample = rng.random_range(0..=100u32) as f64;
                    (cell, if in_scope(cell) { sample } else { 0.0 })
                })
                .collect()
        }
    };

    let total_share: f64 = shares.values().sum();
    if total_share == 0.0 {
        // all sampled shares were zero; fall back to an even split over
        // the scoped cells
        let scoped = shares.keys().filter(|&&cell| in_scope(cell)).count() as f64;
        return Ok(shares
            .keys()
            .map(|&cell| {
                let share = if in_scope(cell) {
                    total_concentration / scoped
                } else {
                    0.0
                };
                (cell, share)
            })
            .collect());
    }

    Ok(shares
        .into_iter()
        .map(|(cell, share)| (cell, total_concentration * share / total_share))
        .collect())
}

/// How many layers deep a cell sits: 0 on the perimeter, 1 one layer in,
/// and so on.
fn layer_depth(grid: &GridSpec, cell: CellId) -> usize {
    cell.row
        .min(cell.col)
        .min(grid.rows - 1 - cell.row)
        .min(grid.cols - 1 - cell.col)
}

/// Upper bounds `sum(k_cat * [E])` for every catalysed reaction in every
/// cell, as assembler overrides. `associations` maps a base reaction id
/// to its catalysing enzymes and their rate constants; `concentrations`
/// maps an enzyme id to its per-cell concentration (from `distribute`).
pub fn kinetic_bounds(
    grid: &GridSpec,
    associations: &IndexMap<String, IndexMap<String, f64>>,
    concentrations: &IndexMap<String, IndexMap<CellId, f64>>,
) -> Result<BoundOverrides> {
    let mut overrides = BoundOverrides::new();
    for cell in grid.cells() {
        for (reaction, enzymes) in associations {
            let mut upper = 0.0;
            for (enzyme, &k_cat) in enzymes {
                let per_cell = match concentrations.get(enzyme) {
                    Some(per_cell) => per_cell,
                    None => {
                        return config_err!(
                            DoesNotExist,
                            format!("enzyme '{enzyme}' has no distribution")
                        )
                    }
                };
                upper += k_cat * per_cell.get(&cell).copied().unwrap_or(0.0);
            }
            overrides.insert(namespaced(reaction, cell), (0.0, upper));
        }
    }
    Ok(overrides)
}
