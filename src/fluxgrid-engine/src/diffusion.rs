// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Diffusive coupling between adjacent sub-compartments.
//!
//! For every ordered pair of adjacent cells and every diffusible
//! metabolite, one transport pseudo-reaction is created that moves the
//! metabolite out of the origin cell and into the destination cell. Each
//! unordered pair therefore gets two opposed non-negative columns, which
//! is equivalent to a single reversible column with symmetric bounds.

use indexmap::IndexMap;

use crate::common::{link_ident, CellId, Result};
use crate::config_err;
use crate::datamodel::Model;
use crate::grid::GridSpec;

/// Per-metabolite diffusion coefficients. Metabolites absent from the
/// table are non-diffusible; no transport columns are created for them.
pub type DiffusionTable = IndexMap<String, f64>;

/// Maps a diffusion coefficient and the grid spacing to a flux bound.
///
/// Implementations must be monotonic in the coefficient and must not
/// depend on link direction; the coupler calls this once per ordered
/// pair with identical arguments for both directions.
pub trait TransportBound {
    fn flux_bound(&self, coefficient: f64, spacing: f64) -> f64;
}

/// Default policy: `scale * D / spacing^2`, the coefficient of the
/// second-order finite-difference discretisation of Fick's first law,
/// with `scale` converting concentration units to flux units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FickianBound {
    pub scale: f64,
}

impl Default for FickianBound {
    fn default() -> Self {
        FickianBound { scale: 1.0 }
    }
}

impl TransportBound for FickianBound {
    fn flux_bound(&self, coefficient: f64, spacing: f64) -> f64 {
        self.scale * coefficient / (spacing * spacing)
    }
}

/// One transport pseudo-reaction: `metabolite` moves from `from` to `to`
/// with flux in `[0, bound]`.
#[derive(Clone, Debug, PartialEq)]
pub struct DiffusionLink {
    pub metabolite: String,
    pub from: CellId,
    pub to: CellId,
    pub bound: f64,
}

impl DiffusionLink {
    pub fn ident(&self) -> String {
        link_ident(&self.metabolite, self.from, self.to)
    }
}

/// Check the coefficient table against the base model: coefficients must
/// be non-negative and finite, and must name base-model metabolites.
pub fn validate_table(table: &DiffusionTable, model: &Model) -> Result<()> {
    let known = model.metabolite_ids();
    for (met, &coefficient) in table {
        if !known.contains(met.as_str()) {
            return config_err!(
                UnknownMetabolite,
                format!("diffusion coefficient for '{met}' which is not in the model")
            );
        }
        if !(coefficient.is_finite() && coefficient >= 0.0) {
            return config_err!(
                NegativeCoefficient,
                format!("diffusion coefficient for '{met}' is {coefficient}")
            );
        }
    }
    Ok(())
}

/// Produce one link per (ordered adjacent pair, diffusible metabolite),
/// in grid order then table order. Order is part of the contract:
/// unchanged inputs must yield an identical link list.
pub fn build_links(
    grid: &GridSpec,
    table: &DiffusionTable,
    model: &Model,
    policy: &dyn TransportBound,
) -> Result<Vec<DiffusionLink>> {
    validate_table(table, model)?;

    let mut links = Vec::with_capacity(grid.links().len() * table.len());
    for (from, to) in grid.links() {
        for (met, &coefficient) in table {
            links.push(DiffusionLink {
                metabolite: met.clone(),
                from,
                to,
                bound: policy.flux_bound(coefficient, grid.spacing),
            });
        }
    }
    Ok(links)
}
