// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The 2D lattice of sub-compartments: dimensions, adjacency, spacing.

use serde::{Deserialize, Serialize};

use crate::common::{CellId, Result};
use crate::config_err;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Adjacency {
    #[serde(rename = "4-connected")]
    FourConnected,
    #[serde(rename = "8-connected")]
    EightConnected,
}

impl Adjacency {
    /// Neighbour offsets in deterministic (row, col) order.
    fn offsets(&self) -> &'static [(isize, isize)] {
        match self {
            Adjacency::FourConnected => &[(-1, 0), (0, -1), (0, 1), (1, 0)],
            Adjacency::EightConnected => &[
                (-1, -1),
                (-1, 0),
                (-1, 1),
                (0, -1),
                (0, 1),
                (1, -1),
                (1, 0),
                (1, 1),
            ],
        }
    }
}

impl Default for Adjacency {
    fn default() -> Self {
        Adjacency::FourConnected
    }
}

/// The grid geometry: an R x C index space plus the physical spacing
/// between neighbouring sub-compartment centres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub adjacency: Adjacency,
    #[serde(default = "default_spacing")]
    pub spacing: f64,
}

fn default_spacing() -> f64 {
    1.0
}

impl GridSpec {
    pub fn new(rows: usize, cols: usize) -> Self {
        GridSpec {
            rows,
            cols,
            adjacency: Adjacency::FourConnected,
            spacing: 1.0,
        }
    }

    pub fn with_adjacency(mut self, adjacency: Adjacency) -> Self {
        self.adjacency = adjacency;
        self
    }

    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 || self.cols == 0 {
            return config_err!(
                BadGrid,
                format!("grid must be non-degenerate, got {}x{}", self.rows, self.cols)
            );
        }
        if !(self.spacing.is_finite() && self.spacing > 0.0) {
            return config_err!(BadGrid, format!("spacing must be > 0, got {}", self.spacing));
        }
        Ok(())
    }

    pub fn cell_count(&self) -> usize {
        self.rows * self.cols
    }

    /// All cells in row-major order; every stage iterates the grid this
    /// way so the assembled system is deterministic.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        let cols = self.cols;
        (0..self.rows).flat_map(move |r| (0..cols).map(move |c| CellId::new(r, c)))
    }

    pub fn contains(&self, cell: CellId) -> bool {
        cell.row < self.rows && cell.col < self.cols
    }

    /// In-bounds neighbours of `cell` under the configured adjacency.
    pub fn neighbors(&self, cell: CellId) -> Vec<CellId> {
        self.adjacency
            .offsets()
            .iter()
            .filter_map(|&(dr, dc)| {
                let row = cell.row.checked_add_signed(dr)?;
                let col = cell.col.checked_add_signed(dc)?;
                let n = CellId::new(row, col);
                self.contains(n).then_some(n)
            })
            .collect()
    }

    /// All ordered adjacent pairs, row-major by origin cell. Each
    /// unordered pair appears exactly twice, once per direction.
    pub fn links(&self) -> Vec<(CellId, CellId)> {
        let mut links = Vec::new();
        for cell in self.cells() {
            for neighbor in self.neighbors(cell) {
                links.push((cell, neighbor));
            }
        }
        links
    }

    /// True when the cell lies on the outermost layer of the grid.
    pub fn is_perimeter(&self, cell: CellId) -> bool {
        cell.row == 0 || cell.col == 0 || cell.row == self.rows - 1 || cell.col == self.cols - 1
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.cols as f64 / self.rows as f64
    }

    /// Number of perimeter cells divided by the total cell count.
    pub fn perimeter_to_area(&self) -> f64 {
        if self.rows == 1 || self.cols == 1 {
            1.0
        } else {
            (2 * (self.rows + self.cols) - 4) as f64 / self.cell_count() as f64
        }
    }
}
