// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

#![forbid(unsafe_code)]

pub mod common;

mod assemble;
pub mod datamodel;
mod diffusion;
pub mod enzyme;
mod grid;
pub mod json;
mod replicate;
mod results;
mod solve;

pub use self::assemble::{assemble, BoundOverrides, Column, CombinedLp, ObjectiveWeights};
pub use self::common::{CellId, Error, ErrorCode, ErrorKind, Result};
pub use self::diffusion::{
    build_links, DiffusionLink, DiffusionTable, FickianBound, TransportBound,
};
pub use self::grid::{Adjacency, GridSpec};
pub use self::replicate::{replicate, CompartmentModel, Replicated};
pub use self::results::{FluxSolution, SpatialResults, TransportFlux};
pub use self::solve::{solve, Direction, Outcome};

use crate::datamodel::{Environment, Model};

/// The full pipeline, configured once and run to a solved LP: replicate
/// the base model over the grid, couple adjacent cells with diffusion
/// links, assemble one combined LP, and solve it.
pub struct SpatialFba {
    pub model: Model,
    pub environment: Option<Environment>,
    pub grid: GridSpec,
    pub diffusion: DiffusionTable,
    pub policy: Box<dyn TransportBound>,
    pub weights: ObjectiveWeights,
    pub direction: Direction,
    pub bound_overrides: BoundOverrides,
}

impl SpatialFba {
    pub fn new(model: Model, grid: GridSpec) -> Self {
        SpatialFba {
            model,
            environment: None,
            grid,
            diffusion: DiffusionTable::new(),
            policy: Box::new(FickianBound::default()),
            weights: ObjectiveWeights::Uniform,
            direction: Direction::Maximize,
            bound_overrides: BoundOverrides::new(),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    pub fn with_diffusion(mut self, metabolite: &str, coefficient: f64) -> Self {
        self.diffusion.insert(metabolite.to_string(), coefficient);
        self
    }

    pub fn with_policy(mut self, policy: Box<dyn TransportBound>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    /// Override the bounds of a single namespaced column in the final LP.
    pub fn set_bound(&mut self, ident: &str, lower: f64, upper: f64) {
        self.bound_overrides
            .insert(ident.to_string(), (lower, upper));
    }

    /// Build the combined LP without solving it.
    pub fn assemble(&self) -> Result<CombinedLp> {
        let replicated = replicate(&self.model, self.environment.as_ref(), &self.grid)?;
        let links = build_links(&self.grid, &self.diffusion, &self.model, self.policy.as_ref())?;
        assemble(&replicated, &links, &self.weights, &self.bound_overrides)
    }

    /// Assemble and solve, then split the raw solution back into
    /// per-cell, transport, and environment views.
    pub fn solve(&self) -> Result<Outcome> {
        let lp = self.assemble()?;
        solve(&lp, self.direction)
    }

    pub fn solve_spatial(&self) -> Result<Option<SpatialResults>> {
        match self.solve()? {
            Outcome::Optimal(solution) => Ok(Some(solution.demux()?)),
            _ => Ok(None),
        }
    }
}
