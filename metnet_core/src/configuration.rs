//! Crate wide default values used when a caller does not provide them explicitly
use std::sync::{LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::optimize::solvers::clarabel::ClarabelSolver;
#[cfg(feature = "microlp")]
use crate::optimize::solvers::microlp::MicrolpSolver;
use crate::optimize::solvers::Solver;

pub static CONFIGURATION: LazyLock<RwLock<Configuration>> =
    LazyLock::new(|| RwLock::new(Configuration::default()));

/// Default values shared by the model and the analysis functions
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Lower flux bound of reversible reactions without an explicit bound
    pub lower_bound: f64,
    /// Upper flux bound of reactions without an explicit bound
    pub upper_bound: f64,
    /// Feasibility tolerance handed to the solver backends
    pub tolerance: f64,
    /// Factor applied to flux bounds in the sparse mode LP of fastcore
    pub scaling: f64,
    /// Backend used by [`default_solver`]
    pub solver: SolverChoice,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration {
            lower_bound: -1000.,
            upper_bound: 1000.,
            tolerance: 1e-8,
            scaling: 1e5,
            solver: SolverChoice::Clarabel,
        }
    }
}

/// Enum used to specify the default solver to use
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolverChoice {
    /// Use the Clarabel interior point solver
    Clarabel,
    /// Use the microlp simplex solver, requires the microlp feature to be enabled
    Microlp,
}

/// Get a read guard on the configuration, ignoring lock poisoning since the
/// configuration holds plain values only
pub fn read() -> RwLockReadGuard<'static, Configuration> {
    CONFIGURATION.read().unwrap_or_else(PoisonError::into_inner)
}

/// Get a write guard on the configuration
pub fn write() -> RwLockWriteGuard<'static, Configuration> {
    CONFIGURATION.write().unwrap_or_else(PoisonError::into_inner)
}

/// Create the solver selected in the configuration
///
/// Falls back to Clarabel when microlp is selected but the feature is disabled.
pub fn default_solver() -> Box<dyn Solver> {
    let (choice, tolerance) = {
        let config = read();
        (config.solver, config.tolerance)
    };
    match choice {
        #[cfg(feature = "microlp")]
        SolverChoice::Microlp => Box::new(MicrolpSolver::default()),
        _ => Box::new(ClarabelSolver::with_tolerance(tolerance)),
    }
}
