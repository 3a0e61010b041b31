// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Model replication: one tagged copy of the base network per grid cell.
//!
//! Every reaction and metabolite identifier is rewritten to embed its cell
//! coordinates, which flattens what would otherwise be an object graph of
//! linked model copies into disjoint string-keyed records. Environment
//! metabolites and reactions stay global: one pool shared by all cells.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::common::{namespaced, CellId, Result};
use crate::config_err;
use crate::datamodel::{Environment, Model, Reaction, UptakeScope};
use crate::grid::GridSpec;

/// One grid cell's copy of the network; identifiers already namespaced.
#[derive(Clone, Debug, PartialEq)]
pub struct CompartmentModel {
    pub cell: CellId,
    pub metabolites: Vec<String>,
    pub reactions: Vec<Reaction>,
}

/// The replicated system: per-cell compartment models plus the global
/// environment pool (empty when no environment was configured).
#[derive(Clone, Debug, PartialEq)]
pub struct Replicated {
    pub environment_metabolites: Vec<String>,
    pub environment_reactions: Vec<Reaction>,
    pub compartments: Vec<CompartmentModel>,
}

/// Produce R x C tagged copies of `model`. Stoichiometry, bounds, and
/// objective coefficients are copied unchanged; only identifiers are
/// rewritten. Uptake reactions from the environment are instantiated per
/// cell according to the environment's `UptakeScope`.
pub fn replicate(
    model: &Model,
    environment: Option<&Environment>,
    grid: &GridSpec,
) -> Result<Replicated> {
    grid.validate()?;
    model.validate()?;
    if let Some(env) = environment {
        env.validate(model)?;
    }

    let base_mets = model.metabolite_ids();
    let env_mets: HashSet<&str> = environment
        .map(|env| env.metabolites.iter().map(|m| m.id.as_str()).collect())
        .unwrap_or_default();

    // a well-formed base model cannot collide after namespacing, but an
    // upstream bug would silently merge mass-balance rows, so check
    let mut seen_mets: HashSet<String> = env_mets.iter().map(|m| m.to_string()).collect();
    let mut seen_rxns: HashSet<String> = HashSet::new();
    if let Some(env) = environment {
        for rxn in &env.reactions {
            seen_rxns.insert(rxn.id.clone());
        }
    }

    let mut compartments = Vec::with_capacity(grid.cell_count());
    for cell in grid.cells() {
        let mut metabolites = Vec::with_capacity(model.metabolites.len());
        for met in &model.metabolites {
            let id = namespaced(&met.id, cell);
            if !seen_mets.insert(id.clone()) {
                return config_err!(NamespaceCollision, id);
            }
            metabolites.push(id);
        }

        let mut reactions = Vec::with_capacity(model.reactions.len());
        for rxn in &model.reactions {
            let copy = namespace_reaction(rxn, cell, &base_mets);
            if !seen_rxns.insert(copy.id.clone()) {
                return config_err!(NamespaceCollision, copy.id);
            }
            reactions.push(copy);
        }

        if let Some(env) = environment {
            let eligible = match env.uptake_scope {
                UptakeScope::AllCells => true,
                UptakeScope::PerimeterOnly => grid.is_perimeter(cell),
            };
            if eligible {
                for rxn in &env.uptake_reactions {
                    let copy = namespace_reaction(rxn, cell, &base_mets);
                    if !seen_rxns.insert(copy.id.clone()) {
                        return config_err!(NamespaceCollision, copy.id);
                    }
                    reactions.push(copy);
                }
            }
        }

        compartments.push(CompartmentModel {
            cell,
            metabolites,
            reactions,
        });
    }

    Ok(Replicated {
        environment_metabolites: environment
            .map(|env| env.metabolites.iter().map(|m| m.id.clone()).collect())
            .unwrap_or_default(),
        environment_reactions: environment
            .map(|env| env.reactions.clone())
            .unwrap_or_default(),
        compartments,
    })
}

/// Copy a reaction into `cell`'s namespace. Stoichiometry keys naming
/// base-model metabolites are rewritten; keys naming environment
/// metabolites are left global.
fn namespace_reaction(rxn: &Reaction, cell: CellId, base_mets: &HashSet<&str>) -> Reaction {
    let stoichiometry: IndexMap<String, f64> = rxn
        .stoichiometry
        .iter()
        .map(|(met, &coeff)| {
            let key = if base_mets.contains(met.as_str()) {
                namespaced(met, cell)
            } else {
                met.clone()
            };
            (key, coeff)
        })
        .collect();

    Reaction {
        id: namespaced(&rxn.id, cell),
        stoichiometry,
        lower_bound: rxn.lower_bound,
        upper_bound: rxn.upper_bound,
        objective_coefficient: rxn.objective_coefficient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ErrorCode;
    use crate::datamodel::Metabolite;

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

    fn toy_environment(scope: UptakeScope) -> Environment {
        Environment {
            metabolites: vec![Metabolite::new("Ae")],
            reactions: vec![Reaction::new("rE")
                .with_coefficient("Ae", 1.0)
                .with_bounds(0.0, 10.0)],
            uptake_reactions: vec![Reaction::new("tA")
                .with_coefficient("Ae", -1.0)
                .with_coefficient("M", 1.0)
                .with_bounds(0.0, 5.0)],
            uptake_scope: scope,
        }
    }

    #[test]
    fn test_replication_counts_and_ids() {
        let grid = GridSpec::new(2, 3);
        let replicated = replicate(&toy_model(), None, &grid).unwrap();
        assert_eq!(replicated.compartments.len(), 6);
        assert!(replicated.environment_reactions.is_empty());

        let first = &replicated.compartments[0];
        assert_eq!(first.cell, CellId::new(0, 0));
        assert_eq!(first.metabolites, vec!["M@0,0".to_string()]);
        assert_eq!(first.reactions[0].id, "src@0,0");
        assert_eq!(first.reactions[1].id, "sink@0,0");

        let last = &replicated.compartments[5];
        assert_eq!(last.cell, CellId::new(1, 2));
        assert_eq!(last.reactions[1].id, "sink@1,2");
    }

    #[test]
    fn test_stoichiometry_and_bounds_preserved() {
        let grid = GridSpec::new(1, 2);
        let replicated = replicate(&toy_model(), None, &grid).unwrap();
        let sink = &replicated.compartments[1].reactions[1];
        assert_eq!(sink.stoichiometry.get("M@0,1"), Some(&-1.0));
        assert_eq!(sink.lower_bound, 0.0);
        assert_eq!(sink.upper_bound, 10.0);
        assert_eq!(sink.objective_coefficient, 1.0);
    }

    #[test]
    fn test_invalid_base_model_rejected() {
        let mut model = toy_model();
        model.add_reaction(Reaction::new("bad").with_coefficient("ghost", 1.0));
        let err = replicate(&model, None, &GridSpec::new(1, 1)).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnknownMetabolite);
    }

    #[test]
    fn test_degenerate_grid_rejected() {
        let err = replicate(&toy_model(), None, &GridSpec::new(0, 4)).unwrap_err();
        assert_eq!(err.code, ErrorCode::BadGrid);
    }

    #[test]
    fn test_uptake_perimeter_only() {
        let grid = GridSpec::new(3, 3);
        let env = toy_environment(UptakeScope::PerimeterOnly);
        let replicated = replicate(&toy_model(), Some(&env), &grid).unwrap();

        assert_eq!(replicated.environment_metabolites, vec!["Ae".to_string()]);
        assert_eq!(replicated.environment_reactions.len(), 1);

        for compartment in &replicated.compartments {
            let has_uptake = compartment
                .reactions
                .iter()
                .any(|r| r.id.starts_with("tA@"));
            assert_eq!(has_uptake, grid.is_perimeter(compartment.cell));
        }

        // uptake stoichiometry keeps the environment pool global
        let corner = &replicated.compartments[0];
        let uptake = corner.reactions.iter().find(|r| r.id == "tA@0,0").unwrap();
        assert_eq!(uptake.stoichiometry.get("Ae"), Some(&-1.0));
        assert_eq!(uptake.stoichiometry.get("M@0,0"), Some(&1.0));
    }

    #[test]
    fn test_uptake_all_cells() {
        let grid = GridSpec::new(3, 3);
        let env = toy_environment(UptakeScope::AllCells);
        let replicated = replicate(&toy_model(), Some(&env), &grid).unwrap();
        assert!(replicated
            .compartments
            .iter()
            .all(|c| c.reactions.iter().any(|r| r.id.starts_with("tA@"))));
    }
}
