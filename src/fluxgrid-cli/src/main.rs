// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fs::File;
use std::io::Write;
use std::result::Result as StdResult;

use indexmap::IndexMap;
use pico_args::Arguments;
use serde::Deserialize;

use fluxgrid_engine::datamodel::{Environment, Model};
use fluxgrid_engine::{
    json, CellId, Direction, Error, ErrorCode, ErrorKind, FickianBound, GridSpec,
    ObjectiveWeights, Outcome, Result, SpatialFba, SpatialResults,
};

const VERSION: &str = "1.0";
const EXIT_FAILURE: i32 = 1;

macro_rules! die(
    ($($arg:tt)*) => { {
        eprintln!($($arg)*);
        std::process::exit(EXIT_FAILURE)
    } }
);

fn usage() -> ! {
    let argv0 = std::env::args()
        .next()
        .unwrap_or_else(|| "fluxgrid".to_string());
    die!(
        concat!(
            "fluxgrid {}: Solve spatially discretised flux balance problems.\n\
         \n\
         USAGE:\n",
            "    {} [SUBCOMMAND] [OPTION...] SCENARIO\n",
            "\n\
         OPTIONS:\n",
            "    -h, --help       show this message\n",
            "    --output FILE    path to write output to (default stdout)\n",
            "    --spatial        group fluxes by grid cell\n",
            "\n\
         SUBCOMMANDS:\n",
            "    solve            Solve a scenario and print its fluxes\n",
            "    describe         Print the assembled problem's dimensions\n",
        ),
        VERSION,
        argv0
    );
}

#[derive(Clone, Default, Debug)]
struct Args {
    path: Option<String>,
    output: Option<String>,
    is_describe: bool,
    is_spatial: bool,
}

fn parse_args() -> StdResult<Args, Box<dyn std::error::Error>> {
    let mut parsed = Arguments::from_env();
    if parsed.contains(["-h", "--help"]) {
        usage();
    }

    let subcommand = parsed.subcommand()?;
    if subcommand.is_none() {
        eprintln!("error: subcommand required");
        usage();
    }

    let mut args: Args = Default::default();

    let subcommand = subcommand.unwrap();
    if subcommand == "describe" {
        args.is_describe = true;
    } else if subcommand != "solve" {
        eprintln!("error: unknown subcommand {subcommand}");
        usage();
    }

    args.output = parsed.value_from_str("--output").ok();
    args.is_spatial = parsed.contains("--spatial");

    let free_arguments = parsed.finish();
    if free_arguments.is_empty() {
        eprintln!("error: scenario path required");
        usage();
    }

    args.path = free_arguments[0].to_str().map(|s| s.to_owned());

    Ok(args)
}

/// The scenario document: the base model (inline or by path), the grid,
/// the diffusible metabolites, and any tweaks to objective or bounds.
#[derive(Deserialize)]
struct Scenario {
    model: Option<Model>,
    model_path: Option<String>,
    environment: Option<Environment>,
    grid: GridSpec,
    #[serde(default)]
    diffusion: IndexMap<String, f64>,
    #[serde(default)]
    direction: Direction,
    #[serde(default)]
    fickian_scale: Option<f64>,
    /// Per-cell objective weights keyed by "row,col".
    #[serde(default)]
    weights: IndexMap<String, f64>,
    /// Overrides keyed by namespaced column identifier.
    #[serde(default)]
    bounds: IndexMap<String, (f64, f64)>,
}

fn parse_cell(key: &str) -> Result<CellId> {
    let bad = || {
        Error::new(
            ErrorKind::Configuration,
            ErrorCode::BadIdentifier,
            Some(format!("expected a \"row,col\" cell key, got '{key}'")),
        )
    };
    let (row, col) = key.split_once(',').ok_or_else(bad)?;
    Ok(CellId::new(
        row.trim().parse().map_err(|_| bad())?,
        col.trim().parse().map_err(|_| bad())?,
    ))
}

fn build_pipeline(scenario: Scenario) -> Result<SpatialFba> {
    let model = match (scenario.model, &scenario.model_path) {
        (Some(model), None) => model,
        (None, Some(path)) => json::model_from_path(path)?,
        _ => {
            return Err(Error::new(
                ErrorKind::Configuration,
                ErrorCode::Generic,
                Some("a scenario needs exactly one of 'model' or 'model_path'".to_string()),
            ));
        }
    };

    let mut pipeline = SpatialFba::new(model, scenario.grid);
    pipeline.environment = scenario.environment;
    pipeline.direction = scenario.direction;
    for (met, coefficient) in scenario.diffusion {
        pipeline.diffusion.insert(met, coefficient);
    }
    if let Some(scale) = scenario.fickian_scale {
        pipeline.policy = Box::new(FickianBound { scale });
    }
    if !scenario.weights.is_empty() {
        let mut per_cell = IndexMap::new();
        for (key, weight) in &scenario.weights {
            per_cell.insert(parse_cell(key)?, *weight);
        }
        pipeline.weights = ObjectiveWeights::PerCell(per_cell);
    }
    for (ident, (lower, upper)) in scenario.bounds {
        pipeline.set_bound(&ident, lower, upper);
    }
    Ok(pipeline)
}

fn write_spatial(output: &mut dyn Write, spatial: &SpatialResults) -> std::io::Result<()> {
    writeln!(output, "objective\t{}", spatial.objective_value)?;
    for (cell, fluxes) in &spatial.cells {
        writeln!(output, "\n[cell {cell}]")?;
        for (reaction, flux) in fluxes {
            writeln!(output, "{reaction}\t{flux}")?;
        }
    }
    if !spatial.environment.is_empty() {
        writeln!(output, "\n[environment]")?;
        for (reaction, flux) in &spatial.environment {
            writeln!(output, "{reaction}\t{flux}")?;
        }
    }
    if !spatial.transport.is_empty() {
        writeln!(output, "\n[transport]")?;
        for t in &spatial.transport {
            writeln!(output, "{}\t{}->{}\t{}", t.metabolite, t.from, t.to, t.flux)?;
        }
    }
    Ok(())
}

fn main() {
    let args = match parse_args() {
        Ok(args) => args,
        Err(err) => {
            eprintln!("error: {err}");
            usage();
        }
    };

    let scenario_path = args.path.unwrap_or_else(|| "/dev/stdin".to_string());
    let contents = match std::fs::read_to_string(&scenario_path) {
        Ok(contents) => contents,
        Err(err) => die!("scenario '{}' error: {}", scenario_path, err),
    };
    let scenario: Scenario = match serde_json::from_str(&contents) {
        Ok(scenario) => scenario,
        Err(err) => die!("scenario '{}' error: {}", scenario_path, err),
    };

    let pipeline = match build_pipeline(scenario) {
        Ok(pipeline) => pipeline,
        Err(err) => die!("scenario '{}' error: {}", scenario_path, err),
    };

    let mut output: Box<dyn Write> = match args.output {
        Some(path) => match File::create(&path) {
            Ok(file) => Box::new(file),
            Err(err) => die!("output '{}' error: {}", path, err),
        },
        None => Box::new(std::io::stdout()),
    };

    if args.is_describe {
        let lp = match pipeline.assemble() {
            Ok(lp) => lp,
            Err(err) => die!("assembly error: {}", err),
        };
        let nonzeros = lp.entries.len();
        writeln!(
            output,
            "rows\t{}\ncolumns\t{}\nnonzeros\t{}",
            lp.n_rows(),
            lp.n_cols(),
            nonzeros
        )
        .unwrap();
        return;
    }

    let outcome = match pipeline.solve() {
        Ok(outcome) => outcome,
        Err(err) => die!("solve error: {}", err),
    };

    let solution = match outcome {
        Outcome::Optimal(solution) => solution,
        Outcome::Infeasible => die!("status\tinfeasible"),
        Outcome::Unbounded => die!("status\tunbounded"),
        Outcome::SolverError(details) => die!("solver error: {}", details),
    };

    if args.is_spatial {
        let spatial = match solution.demux() {
            Ok(spatial) => spatial,
            Err(err) => die!("solve error: {}", err),
        };
        write_spatial(&mut output, &spatial).unwrap();
    } else {
        writeln!(output, "objective\t{}", solution.objective_value).unwrap();
        for (ident, flux) in solution.iter() {
            writeln!(output, "{ident}\t{flux}").unwrap();
        }
    }
}
