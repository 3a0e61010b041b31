// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The base (single-compartment) constraint-based model: the input that
//! replication fans out across the grid.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::common::{is_valid_base_ident, Result};
use crate::config_err;

/// COBRA's conventional default bounds for reactions that don't specify any.
pub const DEFAULT_LOWER_BOUND: f64 = -1000.0;
pub const DEFAULT_UPPER_BOUND: f64 = 1000.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metabolite {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub compartment: Option<String>,
}

impl Metabolite {
    pub fn new(id: &str) -> Self {
        Metabolite {
            id: id.to_string(),
            name: None,
            compartment: None,
        }
    }
}

/// A reaction: signed stoichiometric coefficients over metabolites, flux
/// bounds, and the coefficient this reaction contributes to the objective.
///
/// Stoichiometry keys preserve insertion order so that downstream matrix
/// construction is deterministic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub stoichiometry: IndexMap<String, f64>,
    pub lower_bound: f64,
    pub upper_bound: f64,
    #[serde(default)]
    pub objective_coefficient: f64,
}

impl Reaction {
    pub fn new(id: &str) -> Self {
        Reaction {
            id: id.to_string(),
            stoichiometry: IndexMap::new(),
            lower_bound: DEFAULT_LOWER_BOUND,
            upper_bound: DEFAULT_UPPER_BOUND,
            objective_coefficient: 0.0,
        }
    }

    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = lower;
        self.upper_bound = upper;
        self
    }

    pub fn with_objective(mut self, coefficient: f64) -> Self {
        self.objective_coefficient = coefficient;
        self
    }

    /// Add a signed stoichiometric coefficient; positive produces, negative
    /// consumes.
    pub fn with_coefficient(mut self, metabolite: &str, coefficient: f64) -> Self {
        self.stoichiometry
            .insert(metabolite.to_string(), coefficient);
        self
    }

    pub fn is_reversible(&self) -> bool {
        self.lower_bound < 0.0 && self.upper_bound > 0.0
    }
}

/// A genome-scale metabolic model, read-only once handed to the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    pub metabolites: Vec<Metabolite>,
    pub reactions: Vec<Reaction>,
}

impl Model {
    pub fn new(id: &str) -> Self {
        Model {
            id: id.to_string(),
            metabolites: Vec::new(),
            reactions: Vec::new(),
        }
    }

    pub fn add_metabolite(&mut self, metabolite: Metabolite) {
        self.metabolites.push(metabolite);
    }

    pub fn add_reaction(&mut self, reaction: Reaction) {
        self.reactions.push(reaction);
    }

    pub fn get_reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.id == id)
    }

    pub fn metabolite_ids(&self) -> HashSet<&str> {
        self.metabolites.iter().map(|m| m.id.as_str()).collect()
    }

    /// Check the model's structural invariants: unique identifiers free of
    /// the reserved namespace separator, stoichiometry that only references
    /// declared metabolites, and ordered finite bounds.
    pub fn validate(&self) -> Result<()> {
        let mut met_ids: HashSet<&str> = HashSet::with_capacity(self.metabolites.len());
        for met in &self.metabolites {
            if !is_valid_base_ident(&met.id) {
                return config_err!(ReservedIdentifier, format!("metabolite '{}'", met.id));
            }
            if !met_ids.insert(&met.id) {
                return config_err!(DuplicateMetabolite, met.id.clone());
            }
        }

        let mut rxn_ids: HashSet<&str> = HashSet::with_capacity(self.reactions.len());
        for rxn in &self.reactions {
            if !is_valid_base_ident(&rxn.id) {
                return config_err!(ReservedIdentifier, format!("reaction '{}'", rxn.id));
            }
            if !rxn_ids.insert(&rxn.id) {
                return config_err!(DuplicateReaction, rxn.id.clone());
            }
            check_bounds(&rxn.id, rxn.lower_bound, rxn.upper_bound)?;
            for met in rxn.stoichiometry.keys() {
                if !met_ids.contains(met.as_str()) {
                    return config_err!(
                        UnknownMetabolite,
                        format!("reaction '{}' references '{}'", rxn.id, met)
                    );
                }
            }
        }

        Ok(())
    }
}

/// Which cells receive uptake (environment-to-compartment transport)
/// columns.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UptakeScope {
    AllCells,
    /// Only cells on the outermost layer of the grid; nutrients enter
    /// through the boundary and must diffuse inward from there.
    PerimeterOnly,
}

/// The extracellular space shared by every sub-compartment. Its
/// metabolites and reactions are kept as one global pool rather than
/// replicated per cell; uptake reactions bridge the pool and a cell's
/// local metabolites.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub metabolites: Vec<Metabolite>,
    pub reactions: Vec<Reaction>,
    /// Transport reactions whose stoichiometry mixes environment
    /// metabolites (kept global) and base-model metabolites (namespaced
    /// per instantiating cell).
    pub uptake_reactions: Vec<Reaction>,
    pub uptake_scope: UptakeScope,
}

impl Environment {
    /// Validate against the base model the environment will be merged
    /// with: identifiers must not collide with the base model's, and
    /// uptake stoichiometry may only reference environment or base-model
    /// metabolites.
    pub fn validate(&self, base: &Model) -> Result<()> {
        let base_mets = base.metabolite_ids();
        let base_rxns: HashSet<&str> = base.reactions.iter().map(|r| r.id.as_str()).collect();

        let mut env_mets: HashSet<&str> = HashSet::with_capacity(self.metabolites.len());
        for met in &self.metabolites {
            if !is_valid_base_ident(&met.id) {
                return config_err!(ReservedIdentifier, format!("metabolite '{}'", met.id));
            }
            if base_mets.contains(met.id.as_str()) || !env_mets.insert(&met.id) {
                return config_err!(DuplicateMetabolite, met.id.clone());
            }
        }

        let mut env_rxns: HashSet<&str> = HashSet::new();
        for rxn in self.reactions.iter().chain(self.uptake_reactions.iter()) {
            if !is_valid_base_ident(&rxn.id) {
                return config_err!(ReservedIdentifier, format!("reaction '{}'", rxn.id));
            }
            if base_rxns.contains(rxn.id.as_str()) || !env_rxns.insert(&rxn.id) {
                return config_err!(DuplicateReaction, rxn.id.clone());
            }
            check_bounds(&rxn.id, rxn.lower_bound, rxn.upper_bound)?;
        }

        for rxn in &self.reactions {
            for met in rxn.stoichiometry.keys() {
                if !env_mets.contains(met.as_str()) {
                    return config_err!(
                        UnknownMetabolite,
                        format!("environment reaction '{}' references '{}'", rxn.id, met)
                    );
                }
            }
        }

        for rxn in &self.uptake_reactions {
            for met in rxn.stoichiometry.keys() {
                if !env_mets.contains(met.as_str()) && !base_mets.contains(met.as_str()) {
                    return config_err!(
                        UnknownMetabolite,
                        format!("uptake reaction '{}' references '{}'", rxn.id, met)
                    );
                }
            }
        }

        Ok(())
    }
}

fn check_bounds(id: &str, lower: f64, upper: f64) -> Result<()> {
    if lower.is_nan() || upper.is_nan() {
        return config_err!(BadBounds, format!("reaction '{id}': bound is NaN"));
    }
    if lower > upper {
        return config_err!(
            BadBounds,
            format!("reaction '{id}': lower bound {lower} > upper bound {upper}")
        );
    }
    Ok(())
}
