// Copyright 2026 The Fluxgrid Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

use std::fmt;
use std::{error, result};

use lazy_static::lazy_static;
use regex::Regex;

/// Separator between a base identifier and the coordinates of the
/// sub-compartment it was replicated into. Base identifiers must not
/// contain it.
pub const NAMESPACE_SEP: char = '@';

/// Separator between the two endpoints of a transport column identifier.
pub const LINK_ARROW: &str = "->";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoError, // will never be produced
    DoesNotExist,
    DuplicateMetabolite,
    DuplicateReaction,
    UnknownMetabolite,
    DanglingReference,
    BadBounds,
    BadGrid,
    BadIdentifier,
    ReservedIdentifier,
    NamespaceCollision,
    NegativeCoefficient,
    BadObjectiveWeight,
    BadGradient,
    EmptySystem,
    JsonDeserialization,
    Generic,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use ErrorCode::*;
        let name = match self {
            NoError => "no_error",
            DoesNotExist => "does_not_exist",
            DuplicateMetabolite => "duplicate_metabolite",
            DuplicateReaction => "duplicate_reaction",
            UnknownMetabolite => "unknown_metabolite",
            DanglingReference => "dangling_reference",
            BadBounds => "bad_bounds",
            BadGrid => "bad_grid",
            BadIdentifier => "bad_identifier",
            ReservedIdentifier => "reserved_identifier",
            NamespaceCollision => "namespace_collision",
            NegativeCoefficient => "negative_coefficient",
            BadObjectiveWeight => "bad_objective_weight",
            BadGradient => "bad_gradient",
            EmptySystem => "empty_system",
            JsonDeserialization => "json_deserialization",
            Generic => "generic",
        };

        write!(f, "{name}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input; the caller must fix the model, grid, or
    /// coefficient table before retrying.
    Configuration,
    /// Structural inconsistency discovered while merging; indicates a bug
    /// in replication or coupling, not user data.
    Assembly,
    /// Failure at the optimization boundary.
    Solver,
    Io,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    pub kind: ErrorKind,
    pub code: ErrorCode,
    pub details: Option<String>,
}

impl Error {
    pub fn new(kind: ErrorKind, code: ErrorCode, details: Option<String>) -> Self {
        Error {
            kind,
            code,
            details,
        }
    }

    pub fn get_details(&self) -> Option<String> {
        self.details.clone()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.kind {
            ErrorKind::Configuration => "ConfigurationError",
            ErrorKind::Assembly => "AssemblyError",
            ErrorKind::Solver => "SolverError",
            ErrorKind::Io => "IoError",
        };
        match self.details {
            Some(ref details) => write!(f, "{}{{{}: {}}}", kind, self.code, details),
            None => write!(f, "{}{{{}}}", kind, self.code),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = result::Result<T, Error>;

/// Coordinates of one sub-compartment on the grid, row-major.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub row: usize,
    pub col: usize,
}

impl CellId {
    pub fn new(row: usize, col: usize) -> Self {
        CellId { row, col }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{},{}", self.row, self.col)
    }
}

/// True if `name` can be namespaced without ambiguity: non-empty and free
/// of the reserved separator.
pub fn is_valid_base_ident(name: &str) -> bool {
    !name.is_empty() && !name.contains(NAMESPACE_SEP)
}

/// Rewrite a base identifier to embed the coordinates of a sub-compartment.
pub fn namespaced(base: &str, cell: CellId) -> String {
    format!("{base}{NAMESPACE_SEP}{cell}")
}

/// Identifier of the transport column moving `metabolite` out of `from`
/// and into `to`.
pub fn link_ident(metabolite: &str, from: CellId, to: CellId) -> String {
    format!("{metabolite}{NAMESPACE_SEP}{from}{LINK_ARROW}{to}")
}

/// A combined-system identifier classified back into the scheme that
/// produced it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParsedIdent {
    /// A replicated reaction or metabolite: `base@row,col`.
    Compartment { base: String, cell: CellId },
    /// A transport column: `metabolite@r,c->r,c`.
    Transport {
        metabolite: String,
        from: CellId,
        to: CellId,
    },
    /// An identifier that was never namespaced (environment level).
    Environment { base: String },
}

lazy_static! {
    static ref COMPARTMENT_RE: Regex =
        Regex::new(r"^(?P<base>[^@]+)@(?P<r>\d+),(?P<c>\d+)$").unwrap();
    static ref TRANSPORT_RE: Regex =
        Regex::new(r"^(?P<met>[^@]+)@(?P<r1>\d+),(?P<c1>\d+)->(?P<r2>\d+),(?P<c2>\d+)$").unwrap();
}

/// Classify a combined-system identifier. Returns a `ConfigurationError`
/// with code `BadIdentifier` when the identifier contains the namespace
/// separator but matches neither pattern, which indicates an assembly bug
/// upstream.
pub fn parse_ident(ident: &str) -> Result<ParsedIdent> {
    if !ident.contains(NAMESPACE_SEP) {
        if ident.is_empty() {
            return Err(Error::new(
                ErrorKind::Configuration,
                ErrorCode::BadIdentifier,
                Some("empty identifier".to_string()),
            ));
        }
        return Ok(ParsedIdent::Environment {
            base: ident.to_string(),
        });
    }

    if let Some(caps) = TRANSPORT_RE.captures(ident) {
        return Ok(ParsedIdent::Transport {
            metabolite: caps["met"].to_string(),
            from: CellId::new(parse_coord(&caps["r1"])?, parse_coord(&caps["c1"])?),
            to: CellId::new(parse_coord(&caps["r2"])?, parse_coord(&caps["c2"])?),
        });
    }

    if let Some(caps) = COMPARTMENT_RE.captures(ident) {
        return Ok(ParsedIdent::Compartment {
            base: caps["base"].to_string(),
            cell: CellId::new(parse_coord(&caps["r"])?, parse_coord(&caps["c"])?),
        });
    }

    Err(Error::new(
        ErrorKind::Configuration,
        ErrorCode::BadIdentifier,
        Some(format!("'{ident}' does not match the namespacing scheme")),
    ))
}

fn parse_coord(digits: &str) -> Result<usize> {
    digits.parse::<usize>().map_err(|_| {
        Error::new(
            ErrorKind::Configuration,
            ErrorCode::BadIdentifier,
            Some(format!("coordinate '{digits}' out of range")),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaced_roundtrip() {
        let cell = CellId::new(3, 14);
        let ident = namespaced("rBcBio", cell);
        assert_eq!(ident, "rBcBio@3,14");
        assert_eq!(
            parse_ident(&ident).unwrap(),
            ParsedIdent::Compartment {
                base: "rBcBio".to_string(),
                cell,
            }
        );
    }

    #[test]
    fn test_link_ident_roundtrip() {
        let from = CellId::new(0, 0);
        let to = CellId::new(0, 1);
        let ident = link_ident("glc_c", from, to);
        assert_eq!(ident, "glc_c@0,0->0,1");
        assert_eq!(
            parse_ident(&ident).unwrap(),
            ParsedIdent::Transport {
                metabolite: "glc_c".to_string(),
                from,
                to,
            }
        );
    }

    #[test]
    fn test_environment_ident() {
        assert_eq!(
            parse_ident("rE").unwrap(),
            ParsedIdent::Environment {
                base: "rE".to_string()
            }
        );
    }

    #[test]
    fn test_base_ident_may_contain_underscores_and_commas() {
        // only the separator is reserved; COBRA ids use underscores freely
        let ident = namespaced("EX_glc__D_e", CellId::new(1, 2));
        match parse_ident(&ident).unwrap() {
            ParsedIdent::Compartment { base, cell } => {
                assert_eq!(base, "EX_glc__D_e");
                assert_eq!(cell, CellId::new(1, 2));
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_idents_rejected() {
        for ident in ["x@", "x@1", "x@a,b", "x@1,2->", "@1,2", ""] {
            let err = parse_ident(ident).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Configuration);
            assert_eq!(err.code, ErrorCode::BadIdentifier);
        }
    }

    #[test]
    fn test_reserved_separator() {
        assert!(is_valid_base_ident("rAcBc"));
        assert!(!is_valid_base_ident("rAc@Bc"));
        assert!(!is_valid_base_ident(""));
    }

    #[test]
    fn test_error_display() {
        let err = Error::new(
            ErrorKind::Configuration,
            ErrorCode::NegativeCoefficient,
            Some("D[glc] = -1".to_string()),
        );
        assert_eq!(
            format!("{err}"),
            "ConfigurationError{negative_coefficient: D[glc] = -1}"
        );
        let err = Error::new(ErrorKind::Assembly, ErrorCode::DanglingReference, None);
        assert_eq!(format!("{err}"), "AssemblyError{dangling_reference}");
    }
}
