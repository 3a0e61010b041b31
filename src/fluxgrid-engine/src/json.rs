// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! COBRA-style JSON model IO.
//!
//! Mirror structs decouple the on-disk schema (which carries fields like
//! `gene_reaction_rule` we don't model) from the in-memory [`Model`].

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::common::{Error, ErrorCode, ErrorKind, Result};
use crate::datamodel::{Metabolite, Model, Reaction, DEFAULT_LOWER_BOUND, DEFAULT_UPPER_BOUND};

#[derive(Serialize, Deserialize)]
struct JsonModel {
    #[serde(default)]
    id: Option<String>,
    metabolites: Vec<JsonMetabolite>,
    reactions: Vec<JsonReaction>,
}

#[derive(Serialize, Deserialize)]
struct JsonMetabolite {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    compartment: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct JsonReaction {
    id: String,
    metabolites: IndexMap<String, f64>,
    #[serde(default)]
    lower_bound: Option<f64>,
    #[serde(default)]
    upper_bound: Option<f64>,
    #[serde(default)]
    objective_coefficient: Option<f64>,
}

impl From<JsonMetabolite> for Metabolite {
    fn from(m: JsonMetabolite) -> Self {
        Metabolite {
            id: m.id,
            name: m.name,
            compartment: m.compartment,
        }
    }
}

impl From<JsonReaction> for Reaction {
    fn from(r: JsonReaction) -> Self {
        Reaction {
            id: r.id,
            stoichiometry: r.metabolites,
            lower_bound: r.lower_bound.unwrap_or(DEFAULT_LOWER_BOUND),
            upper_bound: r.upper_bound.unwrap_or(DEFAULT_UPPER_BOUND),
            objective_coefficient: r.objective_coefficient.unwrap_or(0.0),
        }
    }
}

impl From<JsonModel> for Model {
    fn from(m: JsonModel) -> Self {
        Model {
            id: m.id.unwrap_or_else(|| "model".to_string()),
            metabolites: m.metabolites.into_iter().map(Metabolite::from).collect(),
            reactions: m.reactions.into_iter().map(Reaction::from).collect(),
        }
    }
}

/// Parse a COBRA-style JSON document into a validated [`Model`].
pub fn model_from_str(contents: &str) -> Result<Model> {
    let json_model: JsonModel = serde_json::from_str(contents).map_err(|err| {
        Error::new(
            ErrorKind::Io,
            ErrorCode::JsonDeserialization,
            Some(err.to_string()),
        )
    })?;
    let model = Model::from(json_model);
    model.validate()?;
    Ok(model)
}

/// Read and parse a COBRA-style JSON model file.
pub fn model_from_path<P: AsRef<Path>>(path: P) -> Result<Model> {
    let contents = fs::read_to_string(&path).map_err(|err| {
        Error::new(
            ErrorKind::Io,
            ErrorCode::DoesNotExist,
            Some(format!("{}: {err}", path.as_ref().display())),
        )
    })?;
    model_from_str(&contents)
}
