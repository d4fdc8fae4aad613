//! Solver backend contract
//!
//! A [`Problem`] records variables, constraint rows and the objective without touching
//! any numeric library. On solve it hands a [`LinearProgram`] snapshot to its
//! [`LinearSolver`], which translates it for the underlying engine. Engine specific
//! types never leave the backend modules.
use std::fmt::{Arguments, Debug};

use log::Level;
use thiserror::Error;

use crate::optimize::constraint::ConstraintRow;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::Problem;
use crate::optimize::variable::{VariableName, VariableType};
use crate::optimize::OptimizationStatus;

pub mod clarabel;
#[cfg(feature = "microlp")]
pub mod microlp;

/// Creates problems bound to a solver backend
pub trait Solver {
    /// Create a new, empty problem
    fn create_problem(&self) -> Problem;
}

/// A numeric LP engine
pub trait LinearSolver: Debug {
    /// Whether integer and binary columns are supported
    fn integer_variable_capable(&self) -> bool;

    /// Diagnostics sink used by problems created from this solver
    fn diagnostics(&self) -> &Diagnostics;

    /// Solve a linear program
    ///
    /// An infeasible or unbounded program is not an error, it is reported through the
    /// status of the returned solution. Errors are reserved for programs the backend
    /// cannot accept at all.
    fn solve(&self, program: &LinearProgram) -> Result<BackendSolution, SolverError>;
}

impl<T: LinearSolver + Clone + 'static> Solver for T {
    fn create_problem(&self) -> Problem {
        Problem::new(Box::new(self.clone()))
    }
}

/// A column of a [`LinearProgram`]
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: VariableName,
    /// Lower bound, may be negative infinity
    pub lower: f64,
    /// Upper bound, may be positive infinity
    pub upper: f64,
    pub variable_type: VariableType,
    /// Objective coefficient
    pub objective: f64,
}

/// Backend neutral snapshot of a problem
#[derive(Debug, Clone, PartialEq)]
pub struct LinearProgram {
    pub columns: Vec<Column>,
    pub rows: Vec<ConstraintRow>,
    pub sense: ObjectiveSense,
}

impl LinearProgram {
    pub fn has_integer_columns(&self) -> bool {
        self.columns
            .iter()
            .any(|c| c.variable_type != VariableType::Continuous)
    }

    /// Objective value (without offset) of the given column values
    pub fn objective_value(&self, values: &[f64]) -> f64 {
        self.columns
            .iter()
            .zip(values)
            .map(|(c, v)| c.objective * v)
            .sum()
    }
}

/// Raw outcome of a backend solve
#[derive(Debug, Clone, PartialEq)]
pub struct BackendSolution {
    pub status: OptimizationStatus,
    /// Status text as reported by the backend
    pub status_message: String,
    /// Column values, in column order. Empty when no solution is available.
    pub values: Vec<f64>,
}

/// Errors raised by solver backends
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    /// The backend can't handle variables of this type
    #[error("The {solver} solver does not support {variable_type} variables")]
    UnsupportedVariableType {
        solver: &'static str,
        variable_type: VariableType,
    },
    /// The backend rejected the problem
    #[error("Solver backend error: {0}")]
    Backend(String),
}

/// Where problems and backends send their diagnostic output
///
/// Each solver carries one of these and hands it to every problem it creates, so
/// different solvers can log to different targets without any global state.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    target: String,
    level: Level,
    verbose: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Diagnostics {
            target: "metnet::solver".to_string(),
            level: Level::Debug,
            verbose: false,
        }
    }
}

impl Diagnostics {
    /// Diagnostics sent to the given log target
    pub fn new(target: &str) -> Self {
        Diagnostics {
            target: target.to_string(),
            ..Diagnostics::default()
        }
    }

    /// Level used for solve summaries
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Let the backend print its own iteration log
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    /// Log a solve summary
    pub fn log(&self, args: Arguments<'_>) {
        log::log!(target: self.target.as_str(), self.level, "{}", args);
    }

    /// Log model building details
    pub fn trace(&self, args: Arguments<'_>) {
        log::log!(target: self.target.as_str(), Level::Trace, "{}", args);
    }
}
