// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Assembly of the combined linear program.
//!
//! Merges every compartment model and every diffusion link into a single
//! sparse constraint system: one row per metabolite (steady-state mass
//! balance, `S v = 0`), one column per reaction or transport link, one
//! bound interval and objective coefficient per column. The matrix grows
//! with `rows x cols x (reactions + links)`, so only nonzero entries are
//! stored, as (row, column, coefficient) triplets in column order.

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::common::{CellId, Result};
use crate::diffusion::DiffusionLink;
use crate::{assembly_err, config_err};
use crate::replicate::Replicated;

/// How each compartment's local objective contributes to the global one.
///
/// The default sums every compartment with equal weight: the solver
/// maximises total system-wide objective flux, which is what couples the
/// compartments (per-cell optima would be independent problems).
#[derive(Clone, Debug, PartialEq)]
pub enum ObjectiveWeights {
    Uniform,
    /// Per-cell weights; cells absent from the map keep weight 1.0.
    PerCell(IndexMap<CellId, f64>),
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        ObjectiveWeights::Uniform
    }
}

impl ObjectiveWeights {
    fn weight_for(&self, cell: CellId) -> f64 {
        match self {
            ObjectiveWeights::Uniform => 1.0,
            ObjectiveWeights::PerCell(map) => map.get(&cell).copied().unwrap_or(1.0),
        }
    }

    fn validate(&self, compartment_cells: &[CellId]) -> Result<()> {
        if let ObjectiveWeights::PerCell(map) = self {
            for (cell, &weight) in map {
                if !compartment_cells.contains(cell) {
                    return config_err!(
                        DoesNotExist,
                        format!("objective weight for cell {cell} outside the grid")
                    );
                }
                if !(weight.is_finite() && weight >= 0.0) {
                    return config_err!(
                        BadObjectiveWeight,
                        format!("weight for cell {cell} is {weight}")
                    );
                }
            }
        }
        Ok(())
    }
}

/// Per-column bound overrides keyed by namespaced identifier, applied
/// after merging. An override may invert a column's bounds; that is a
/// solve-time fact (infeasibility), not a configuration error.
pub type BoundOverrides = IndexMap<String, (f64, f64)>;

/// One column of the combined LP.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    pub ident: String,
    pub lower: f64,
    pub upper: f64,
    pub objective: f64,
}

/// The combined constraint system, ready for the solver boundary.
/// Construction is deterministic: unchanged inputs yield an identical
/// value.
#[derive(Clone, Debug, PartialEq)]
pub struct CombinedLp {
    /// Metabolite identifiers; one steady-state mass-balance row each.
    pub rows: Vec<String>,
    pub columns: Vec<Column>,
    /// Nonzero coefficients as (row, column, coefficient).
    pub entries: Vec<(usize, usize, f64)>,
}

impl CombinedLp {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, ident: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.ident == ident)
    }

    /// Net production of each metabolite under `fluxes` (indexed like
    /// `columns`). All zeros at a steady state.
    pub fn row_activity(&self, fluxes: &[f64]) -> Vec<f64> {
        let mut activity = vec![0.0; self.rows.len()];
        for &(row, col, coeff) in &self.entries {
            activity[row] += coeff * fluxes[col];
        }
        activity
    }
}

/// Merge the replicated system and the diffusion links into one LP.
pub fn assemble(
    replicated: &Replicated,
    links: &[DiffusionLink],
    weights: &ObjectiveWeights,
    overrides: &BoundOverrides,
) -> Result<CombinedLp> {
    let cells: Vec<CellId> = replicated.compartments.iter().map(|c| c.cell).collect();
    weights.validate(&cells)?;

    let mut rows: Vec<String> = Vec::new();
    let mut row_index: HashMap<&str, usize> = HashMap::new();
    for met in &replicated.environment_metabolites {
        row_index.insert(met, rows.len());
        rows.push(met.clone());
    }
    for compartment in &replicated.compartments {
        for met in &compartment.metabolites {
            row_index.insert(met, rows.len());
            rows.push(met.clone());
        }
    }

    let mut columns: Vec<Column> = Vec::new();
    let mut entries: Vec<(usize, usize, f64)> = Vec::new();

    let mut push_reaction = |rxn: &crate::datamodel::Reaction,
                             weight: f64,
                             columns: &mut Vec<Column>,
                             entries: &mut Vec<(usize, usize, f64)>|
     -> Result<()> {
        let col = columns.len();
        for (met, &coeff) in &rxn.stoichiometry {
            match row_index.get(met.as_str()) {
                Some(&row) => entries.push((row, col, coeff)),
                None => {
                    return assembly_err!(
                        DanglingReference,
                        format!("column '{}' references missing row '{}'", rxn.id, met)
                    )
                }
            }
        }
        columns.push(Column {
            ident: rxn.id.clone(),
            lower: rxn.lower_bound,
            upper: rxn.upper_bound,
            objective: weight * rxn.objective_coefficient,
        });
        Ok(())
    };

    for rxn in &replicated.environment_reactions {
        push_reaction(rxn, 1.0, &mut columns, &mut entries)?;
    }
    for compartment in &replicated.compartments {
        let weight = weights.weight_for(compartment.cell);
        for rxn in &compartment.reactions {
            push_reaction(rxn, weight, &mut columns, &mut entries)?;
        }
    }

    // transport columns: -1 in the origin row, +1 in the destination row,
    // so every link contributes zero net mass to the combined system
    for link in links {
        let col = columns.len();
        let from_met = crate::common::namespaced(&link.metabolite, link.from);
        let to_met = crate::common::namespaced(&link.metabolite, link.to);
        let (from_row, to_row) = match (
            row_index.get(from_met.as_str()),
            row_index.get(to_met.as_str()),
        ) {
            (Some(&a), Some(&b)) => (a, b),
            _ => {
                return assembly_err!(
                    DanglingReference,
                    format!("transport '{}' references a missing compartment row", link.ident())
                )
            }
        };
        entries.push((from_row, col, -1.0));
        entries.push((to_row, col, 1.0));
        columns.push(Column {
            ident: link.ident(),
            lower: 0.0,
            upper: link.bound,
            objective: 0.0,
        });
    }

    if rows.is_empty() || columns.is_empty() {
        return assembly_err!(
            EmptySystem,
            format!("{} rows, {} columns", rows.len(), columns.len())
        );
    }

    let mut lp = CombinedLp {
        rows,
        columns,
        entries,
    };

    for (ident, &(lower, upper)) in overrides {
        if lower.is_nan() || upper.is_nan() {
            return config_err!(BadBounds, format!("override for '{ident}' is NaN"));
        }
        match lp.column_index(ident) {
            Some(col) => {
                lp.columns[col].lower = lower;
                lp.columns[col].upper = upper;
            }
            None => {
                return config_err!(
                    DoesNotExist,
                    format!("bound override for unknown column '{ident}'")
                )
            }
        }
    }

    Ok(lp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{CellId, ErrorCode, ErrorKind};
    use crate::datamodel::{Metabolite, Model, Reaction};
    use crate::diffusion::{build_links, DiffusionTable, FickianBound};
    use crate::grid::GridSpec;
    use crate::replicate::{replicate, CompartmentModel};

    fn toy_model() -> Model {
        let mut model = Model::new("toy");
        model.add_metabolite(Metabolite::new("M"));
        model.add_reaction(
            Reaction::new("src")
                .with_coefficient("M", 1.0)
                .with_bounds(0.0, 10.0),
        );
        model.add_reaction(
            Reaction::new("sink")
                .with_coefficient("M", -1.0)
                .with_bounds(0.0, 10.0)
                .with_objective(1.0),
        );
        model
    }

    fn toy_lp(grid: &GridSpec, diffusion: f64) -> CombinedLp {
        let model = toy_model();
        let replicated = replicate(&model, None, grid).unwrap();
        let table: DiffusionTable = [("M".to_string(), diffusion)].into_iter().collect();
        let links = build_links(grid, &table, &model, &FickianBound::default()).unwrap();
        assemble(
            &replicated,
            &links,
            &ObjectiveWeights::Uniform,
            &BoundOverrides::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_dimensions() {
        let lp = toy_lp(&GridSpec::new(2, 1), 1.0);
        // 2 metabolite rows; 4 reaction columns + 2 transport columns
        assert_eq!(lp.n_rows(), 2);
        assert_eq!(lp.n_cols(), 6);
    }

    #[test]
    fn test_original_bounds_and_objective_preserved() {
        let lp = toy_lp(&GridSpec::new(2, 1), 1.0);
        for cell in ["0,0", "1,0"] {
            let col = &lp.columns[lp.column_index(&format!("sink@{cell}")).unwrap()];
            assert_eq!((col.lower, col.upper), (0.0, 10.0));
            assert_eq!(col.objective, 1.0);
            let col = &lp.columns[lp.column_index(&format!("src@{cell}")).unwrap()];
            assert_eq!(col.objective, 0.0);
        }
    }

    #[test]
    fn test_transport_signs_opposed() {
        let lp = toy_lp(&GridSpec::new(2, 1), 1.0);
        let col = lp.column_index("M@0,0->1,0").unwrap();
        let coeffs: Vec<(usize, f64)> = lp
            .entries
            .iter()
            .filter(|&&(_, c, _)| c == col)
            .map(|&(r, _, v)| (r, v))
            .collect();
        assert_eq!(coeffs.len(), 2);
        let from_row = lp.rows.iter().position(|m| m == "M@0,0").unwrap();
        let to_row = lp.rows.iter().position(|m| m == "M@1,0").unwrap();
        assert!(coeffs.contains(&(from_row, -1.0)));
        assert!(coeffs.contains(&(to_row, 1.0)));
    }

    #[test]
    fn test_assembly_idempotent() {
        let grid = GridSpec::new(3, 4);
        let a = toy_lp(&grid, 0.7);
        let b = toy_lp(&grid, 0.7);
        assert_eq!(a, b);
    }

    #[test]
    fn test_per_cell_weights() {
        let grid = GridSpec::new(2, 1);
        let model = toy_model();
        let replicated = replicate(&model, None, &grid).unwrap();
        let weights = ObjectiveWeights::PerCell(
            [(CellId::new(1, 0), 0.5)].into_iter().collect(),
        );
        let lp = assemble(&replicated, &[], &weights, &BoundOverrides::new()).unwrap();
        let top = &lp.columns[lp.column_index("sink@0,0").unwrap()];
        let bottom = &lp.columns[lp.column_index("sink@1,0").unwrap()];
        assert_eq!(top.objective, 1.0);
        assert_eq!(bottom.objective, 0.5);
    }

    #[test]
    fn test_bad_weight_rejected() {
        let grid = GridSpec::new(1, 1);
        let replicated = replicate(&toy_model(), None, &grid).unwrap();
        for bad in [f64::NAN, -1.0] {
            let weights =
                ObjectiveWeights::PerCell([(CellId::new(0, 0), bad)].into_iter().collect());
            let err = assemble(&replicated, &[], &weights, &BoundOverrides::new()).unwrap_err();
            assert_eq!(err.code, ErrorCode::BadObjectiveWeight);
        }

        let weights = ObjectiveWeights::PerCell([(CellId::new(5, 5), 1.0)].into_iter().collect());
        let err = assemble(&replicated, &[], &weights, &BoundOverrides::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::DoesNotExist);
    }

    #[test]
    fn test_bound_override() {
        let grid = GridSpec::new(2, 1);
        let model = toy_model();
        let replicated = replicate(&model, None, &grid).unwrap();
        let overrides: BoundOverrides =
            [("src@1,0".to_string(), (0.0, 0.0))].into_iter().collect();
        let lp = assemble(
            &replicated,
            &[],
            &ObjectiveWeights::Uniform,
            &overrides,
        )
        .unwrap();
        let col = &lp.columns[lp.column_index("src@1,0").unwrap()];
        assert_eq!((col.lower, col.upper), (0.0, 0.0));
    }

    #[test]
    fn test_override_unknown_column() {
        let replicated = replicate(&toy_model(), None, &GridSpec::new(1, 1)).unwrap();
        let overrides: BoundOverrides =
            [("ghost@0,0".to_string(), (0.0, 1.0))].into_iter().collect();
        let err = assemble(&replicated, &[], &ObjectiveWeights::Uniform, &overrides).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert_eq!(err.code, ErrorCode::DoesNotExist);
    }

    #[test]
    fn test_dangling_reference_is_assembly_error() {
        // a compartment hand-built with a reaction naming a row that was
        // never created; replication can't produce this, assembly must
        // still catch it
        let replicated = Replicated {
            environment_metabolites: vec![],
            environment_reactions: vec![],
            compartments: vec![CompartmentModel {
                cell: CellId::new(0, 0),
                metabolites: vec!["M@0,0".to_string()],
                reactions: vec![Reaction::new("r@0,0").with_coefficient("ghost@0,0", 1.0)],
            }],
        };
        let err = assemble(
            &replicated,
            &[],
            &ObjectiveWeights::Uniform,
            &BoundOverrides::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Assembly);
        assert_eq!(err.code, ErrorCode::DanglingReference);
    }

    #[test]
    fn test_empty_system_rejected() {
        let replicated = Replicated {
            environment_metabolites: vec![],
            environment_reactions: vec![],
            compartments: vec![],
        };
        let err = assemble(
            &replicated,
            &[],
            &ObjectiveWeights::Uniform,
            &BoundOverrides::new(),
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Assembly);
        assert_eq!(err.code, ErrorCode::EmptySystem);
    }

    #[test]
    fn test_row_activity() {
        let lp = toy_lp(&GridSpec::new(1, 1), 1.0);
        // src runs at 4, sink at 4: M balances
        let mut fluxes = vec![0.0; lp.n_cols()];
        fluxes[lp.column_index("src@0,0").unwrap()] = 4.0;
        fluxes[lp.column_index("sink@0,0").unwrap()] = 4.0;
        assert_eq!(lp.row_activity(&fluxes), vec![0.0]);
    }
}
