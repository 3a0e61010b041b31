// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Flux solutions and their demultiplexing back onto the grid.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::assemble::CombinedLp;
use crate::common::{parse_ident, CellId, ParsedIdent, Result};

/// The raw solution of one solve: one flux per column of the combined
/// LP, in column order, plus the scalar objective value. Immutable after
/// creation; a re-solve produces a fresh value.
#[derive(Clone, Debug, PartialEq)]
pub struct FluxSolution {
    pub offsets: HashMap<String, usize>,
    // column identifiers in column order; offsets indexes into both
    idents: Vec<String>,
    // one large allocation
    pub data: Box<[f64]>,
    pub objective_value: f64,
}

impl FluxSolution {
    pub(crate) fn new(lp: &CombinedLp, data: Box<[f64]>, objective_value: f64) -> Self {
        let idents: Vec<String> = lp.columns.iter().map(|c| c.ident.clone()).collect();
        let offsets = idents
            .iter()
            .enumerate()
            .map(|(i, ident)| (ident.clone(), i))
            .collect();
        FluxSolution {
            offsets,
            idents,
            data,
            objective_value,
        }
    }

    pub fn flux(&self, ident: &str) -> Option<f64> {
        self.offsets.get(ident).map(|&off| self.data[off])
    }

    /// (identifier, flux) pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.idents
            .iter()
            .zip(self.data.iter())
            .map(|(ident, &flux)| (ident.as_str(), flux))
    }

    /// Split the combined flux vector back into per-cell, per-reaction
    /// values, transport fluxes, and environment-level fluxes. Reaction
    /// keys are the base model's original identifiers.
    pub fn demux(&self) -> Result<SpatialResults> {
        let mut cells: IndexMap<CellId, IndexMap<String, f64>> = IndexMap::new();
        let mut transport = Vec::new();
        let mut environment = IndexMap::new();

        for (ident, flux) in self.iter() {
            match parse_ident(ident)? {
                ParsedIdent::Compartment { base, cell } => {
                    cells.entry(cell).or_default().insert(base, flux);
                }
                ParsedIdent::Transport {
                    metabolite,
                    from,
                    to,
                } => {
                    transport.push(TransportFlux {
                        metabolite,
                        from,
                        to,
                        flux,
                    });
                }
                ParsedIdent::Environment { base } => {
                    environment.insert(base, flux);
                }
            }
        }

        Ok(SpatialResults {
            objective_value: self.objective_value,
            cells,
            transport,
            environment,
        })
    }
}

/// The flux carried by one transport column, `from` toward `to`.
#[derive(Clone, Debug, PartialEq)]
pub struct TransportFlux {
    pub metabolite: String,
    pub from: CellId,
    pub to: CellId,
    pub flux: f64,
}

/// A flux solution rearranged for inspection: grid cell -> original
/// reaction name -> flux, plus transport and environment listings.
#[derive(Clone, Debug, PartialEq)]
pub struct SpatialResults {
    pub objective_value: f64,
    pub cells: IndexMap<CellId, IndexMap<String, f64>>,
    pub transport: Vec<TransportFlux>,
    pub environment: IndexMap<String, f64>,
}

impl SpatialResults {
    pub fn flux(&self, cell: CellId, reaction: &str) -> Option<f64> {
        self.cells.get(&cell).and_then(|m| m.get(reaction)).copied()
    }

    /// Net movement of `metabolite` from `a` toward `b`: the forward
    /// column's flux minus the reverse column's.
    pub fn net_transport(&self, metabolite: &str, a: CellId, b: CellId) -> f64 {
        self.transport
            .iter()
            .filter(|t| t.metabolite == metabolite)
            .map(|t| {
                if t.from == a && t.to == b {
                    t.flux
                } else if t.from == b && t.to == a {
                    -t.flux
                } else {
                    0.0
                }
            })
            .sum()
    }
}
