// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! The solver boundary.
//!
//! The combined LP is handed to a generic backend (`good_lp` over the
//! pure-Rust `microlp` simplex); the outcome comes back as a value, never
//! an `Err`. Infeasibility is an expected, meaningful result — diffusion
//! too slow to supply a required flux — not a defect, so callers always
//! get to inspect which terminal state the solve reached.

use good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError, Solution,
    SolverModel, Variable,
};
use serde::{Deserialize, Serialize};

use crate::assemble::CombinedLp;
use crate::common::Result;
use crate::results::FluxSolution;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Maximize,
    Minimize,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Maximize
    }
}

/// Terminal state of one solve.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Optimal(FluxSolution),
    /// No flux vector satisfies all bounds and mass balance.
    Infeasible,
    /// The objective can be improved without limit.
    Unbounded,
    /// Numerical or solver-internal failure.
    SolverError(String),
}

impl Outcome {
    pub fn is_optimal(&self) -> bool {
        matches!(self, Outcome::Optimal(_))
    }

    pub fn solution(&self) -> Option<&FluxSolution> {
        match self {
            Outcome::Optimal(solution) => Some(solution),
            _ => None,
        }
    }
}

/// Submit the combined LP and retrieve the flux vector and objective
/// value. `Err` is reserved for malformed systems; every solver outcome,
/// including failure to find a solution, is an `Ok(Outcome)`.
pub fn solve(lp: &CombinedLp, direction: Direction) -> Result<Outcome> {
    // inverted bounds (possible via overrides) admit no flux at all;
    // report that without involving the backend
    if lp.columns.iter().any(|c| c.lower > c.upper) {
        return Ok(Outcome::Infeasible);
    }

    let mut problem = ProblemVariables::new();
    let vars: Vec<Variable> = lp
        .columns
        .iter()
        .map(|c| problem.add(variable().min(c.lower).max(c.upper)))
        .collect();

    let objective: Expression = lp
        .columns
        .iter()
        .zip(vars.iter())
        .filter(|(c, _)| c.objective != 0.0)
        .map(|(c, &v)| c.objective * v)
        .sum();

    let mut model = match direction {
        Direction::Maximize => problem.maximise(objective.clone()),
        Direction::Minimize => problem.minimise(objective.clone()),
    }
    .using(default_solver);

    let mut balances: Vec<Expression> = (0..lp.n_rows()).map(|_| Expression::default()).collect();
    for &(row, col, coeff) in &lp.entries {
        balances[row] += coeff * vars[col];
    }
    for balance in balances {
        model = model.with(constraint::eq(balance, 0.0));
    }

    match model.solve() {
        Ok(solution) => {
            let data: Box<[f64]> = vars.iter().map(|&v| solution.value(v)).collect();
            let objective_value = objective.eval_with(&solution);
            Ok(Outcome::Optimal(FluxSolution::new(lp, data, objective_value)))
        }
        Err(ResolutionError::Infeasible) => Ok(Outcome::Infeasible),
        Err(ResolutionError::Unbounded) => Ok(Outcome::Unbounded),
        Err(err) => Ok(Outcome::SolverError(err.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assemble::{assemble, BoundOverrides, ObjectiveWeights};
    use crate::datamodel::{Metabolite, Model, Reaction};
    use crate::grid::GridSpec;
    use crate::replicate::replicate;
    use float_cmp::assert_approx_eq;

    fn toy_lp() -> CombinedLp {
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
        let replicated = replicate(&model, None, &GridSpec::new(1, 1)).unwrap();
        assemble(
            &replicated,
            &[],
            &ObjectiveWeights::Uniform,
            &BoundOverrides::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_optimal() {
        let outcome = solve(&toy_lp(), Direction::Maximize).unwrap();
        let solution = outcome.solution().expect("expected an optimal solution");
        assert_approx_eq!(f64, solution.objective_value, 10.0, epsilon = 1e-9);
        assert_approx_eq!(f64, solution.flux("sink@0,0").unwrap(), 10.0, epsilon = 1e-9);
        assert_approx_eq!(f64, solution.flux("src@0,0").unwrap(), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_minimize() {
        let outcome = solve(&toy_lp(), Direction::Minimize).unwrap();
        let solution = outcome.solution().unwrap();
        assert_approx_eq!(f64, solution.objective_value, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_inverted_bounds_infeasible() {
        let mut lp = toy_lp();
        let col = lp.column_index("sink@0,0").unwrap();
        lp.columns[col].lower = 5.0;
        lp.columns[col].upper = 1.0;
        assert_eq!(solve(&lp, Direction::Maximize).unwrap(), Outcome::Infeasible);
    }

    #[test]
    fn test_infeasible_mass_balance() {
        // force the sink shut while requiring the source to run: M piles
        // up with nowhere to go
        let mut lp = toy_lp();
        let sink = lp.column_index("sink@0,0").unwrap();
        lp.columns[sink].lower = 0.0;
        lp.columns[sink].upper = 0.0;
        let src = lp.column_index("src@0,0").unwrap();
        lp.columns[src].lower = 1.0;
        assert_eq!(solve(&lp, Direction::Maximize).unwrap(), Outcome::Infeasible);
    }

    #[test]
    fn test_unbounded() {
        let mut lp = toy_lp();
        for col in lp.columns.iter_mut() {
            col.upper = f64::INFINITY;
        }
        assert_eq!(solve(&lp, Direction::Maximize).unwrap(), Outcome::Unbounded);
    }
}
