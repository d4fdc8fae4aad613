//! Implements a solver interface for Clarabel
//!
//! Clarabel solves conic programs of the form
//!
//! ```text
//! minimize    1/2 x'Px + q'x
//! subject to  Ax + s = b,  s in K
//! ```
//!
//! A linear program maps onto this with `P = 0`. Equality rows (including fixed columns)
//! go into the zero cone, all inequalities into the nonnegative cone as `a'x <= b`. Column
//! bounds become rows, infinite bounds are left out.
use clarabel::algebra::CscMatrix;
use clarabel::solver::*;
use nalgebra_sparse::CooMatrix;

use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{BackendSolution, Diagnostics, LinearProgram, LinearSolver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::OptimizationStatus;

/// Interior point LP backend using Clarabel
///
/// Clarabel only handles continuous variables. Note that interior point methods return a
/// point in the relative interior of the optimal face, which is not necessarily a vertex
/// when the optimum is not unique.
#[derive(Clone, Debug)]
pub struct ClarabelSolver {
    /// Feasibility and optimality gap tolerance
    tolerance: f64,
    /// Maximum number of interior point iterations
    max_iter: u32,
    diagnostics: Diagnostics,
}

/// Interior point iterations before Clarabel gives up
const MAX_ITER: u32 = 200;

impl Default for ClarabelSolver {
    /// Solver using the tolerance of the crate [configuration](crate::configuration)
    fn default() -> Self {
        let tolerance = crate::configuration::read().tolerance;
        ClarabelSolver::with_tolerance(tolerance)
    }
}

impl ClarabelSolver {
    /// Create a solver with the given feasibility and gap tolerance
    pub fn with_tolerance(tolerance: f64) -> Self {
        ClarabelSolver {
            tolerance,
            max_iter: MAX_ITER,
            diagnostics: Diagnostics::new("metnet::solver::clarabel"),
        }
    }

    /// Limit the number of interior point iterations
    ///
    /// A solve that runs out of iterations ends with
    /// [`OptimizationStatus::SolverHalted`] and no values.
    pub fn with_max_iter(mut self, max_iter: u32) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Replace the diagnostics sink handed to problems
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    fn settings(&self) -> DefaultSettings<f64> {
        DefaultSettings {
            verbose: self.diagnostics.verbose(),
            max_iter: self.max_iter,
            tol_feas: self.tolerance,
            tol_gap_abs: self.tolerance,
            tol_gap_rel: self.tolerance,
            ..DefaultSettings::default()
        }
    }
}

/// Rows of one cone, collected as triplets before assembling the constraint matrix
#[derive(Default)]
struct ConeRows {
    entries: Vec<(usize, usize, f64)>,
    rhs: Vec<f64>,
}

impl ConeRows {
    fn push<I: IntoIterator<Item = (usize, f64)>>(&mut self, terms: I, rhs: f64) {
        let row = self.rhs.len();
        self.entries
            .extend(terms.into_iter().map(|(col, coef)| (row, col, coef)));
        self.rhs.push(rhs);
    }

    fn len(&self) -> usize {
        self.rhs.len()
    }
}

/// Translate a program into Clarabel's `(A, b, cones)`
fn conic_form(program: &LinearProgram) -> (CscMatrix<f64>, Vec<f64>, Vec<SupportedConeT<f64>>) {
    let mut equalities = ConeRows::default();
    let mut inequalities = ConeRows::default();

    for (index, column) in program.columns.iter().enumerate() {
        if column.lower == column.upper {
            equalities.push([(index, 1.)], column.lower);
            continue;
        }
        if column.lower.is_finite() {
            inequalities.push([(index, -1.)], -column.lower);
        }
        if column.upper.is_finite() {
            inequalities.push([(index, 1.)], column.upper);
        }
    }

    for row in &program.rows {
        match row.sense {
            RowSense::Equal => equalities.push(row.terms.iter().copied(), row.rhs),
            RowSense::LessEqual => inequalities.push(row.terms.iter().copied(), row.rhs),
            RowSense::GreaterEqual => inequalities.push(
                row.terms.iter().map(|(col, coef)| (*col, -coef)),
                -row.rhs,
            ),
        }
    }

    let n = program.columns.len();
    let n_eq = equalities.len();
    let m = n_eq + inequalities.len();
    let mut coo = CooMatrix::new(m, n);
    for (row, col, coef) in &equalities.entries {
        coo.push(*row, *col, *coef);
    }
    for (row, col, coef) in &inequalities.entries {
        coo.push(n_eq + row, *col, *coef);
    }
    let (colptr, rowval, nzval) = nalgebra_sparse::CscMatrix::from(&coo).disassemble();
    let a = CscMatrix::new(m, n, colptr, rowval, nzval);

    let mut b = equalities.rhs;
    b.extend(inequalities.rhs);

    let mut cones = Vec::new();
    if n_eq > 0 {
        cones.push(ZeroConeT(n_eq));
    }
    if m > n_eq {
        cones.push(NonnegativeConeT(m - n_eq));
    }
    (a, b, cones)
}

fn convert_status(status: SolverStatus) -> OptimizationStatus {
    match status {
        SolverStatus::Solved => OptimizationStatus::Optimal,
        SolverStatus::AlmostSolved => OptimizationStatus::AlmostOptimal,
        SolverStatus::PrimalInfeasible | SolverStatus::AlmostPrimalInfeasible => {
            OptimizationStatus::Infeasible
        }
        SolverStatus::DualInfeasible | SolverStatus::AlmostDualInfeasible => {
            OptimizationStatus::Unbounded
        }
        SolverStatus::NumericalError => OptimizationStatus::NumericalError,
        SolverStatus::MaxIterations | SolverStatus::MaxTime | SolverStatus::InsufficientProgress => {
            OptimizationStatus::SolverHalted
        }
        _ => OptimizationStatus::Unoptimized,
    }
}

impl LinearSolver for ClarabelSolver {
    fn integer_variable_capable(&self) -> bool {
        false
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn solve(&self, program: &LinearProgram) -> Result<BackendSolution, SolverError> {
        if let Some(column) = program
            .columns
            .iter()
            .find(|c| c.variable_type != VariableType::Continuous)
        {
            return Err(SolverError::UnsupportedVariableType {
                solver: "Clarabel",
                variable_type: column.variable_type,
            });
        }
        let n = program.columns.len();
        if n == 0 {
            return Ok(BackendSolution {
                status: OptimizationStatus::Optimal,
                status_message: "Solved".to_string(),
                values: Vec::new(),
            });
        }

        let direction = match program.sense {
            ObjectiveSense::Minimize => 1.,
            ObjectiveSense::Maximize => -1.,
        };
        let q: Vec<f64> = program
            .columns
            .iter()
            .map(|c| direction * c.objective)
            .collect();
        let p = CscMatrix::new(n, n, vec![0; n + 1], Vec::new(), Vec::new());
        let (a, b, cones) = conic_form(program);
        self.diagnostics.trace(format_args!(
            "Clarabel problem with {} columns, {} rows in {} cones",
            n,
            b.len(),
            cones.len()
        ));

        let mut solver = DefaultSolver::new(&p, &q, &a, &b, &cones, self.settings());
        solver.solve();

        let status = convert_status(solver.solution.status);
        let values = if status.is_success() {
            solver.solution.x.clone()
        } else {
            Vec::new()
        };
        Ok(BackendSolution {
            status,
            status_message: format!("{:?}", solver.solution.status),
            values,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimize::constraint::ConstraintRow;
    use crate::optimize::solvers::Column;

    fn column(name: &str, lower: f64, upper: f64, objective: f64) -> Column {
        Column {
            name: name.into(),
            lower,
            upper,
            variable_type: VariableType::Continuous,
            objective,
        }
    }

    #[test]
    fn conic_form_layout() {
        let program = LinearProgram {
            columns: vec![
                column("x", 0., 10., 1.),
                column("y", f64::NEG_INFINITY, f64::INFINITY, 0.),
                column("z", 2., 2., 0.),
            ],
            rows: vec![
                ConstraintRow {
                    terms: vec![(0, 1.), (1, 1.)],
                    sense: RowSense::GreaterEqual,
                    rhs: 3.,
                },
                ConstraintRow {
                    terms: vec![(1, 1.), (2, -1.)],
                    sense: RowSense::Equal,
                    rhs: 0.,
                },
            ],
            sense: ObjectiveSense::Minimize,
        };
        let (a, b, cones) = conic_form(&program);
        // two equalities (z fixed, y - z = 0), three inequalities (bounds of x, the >= row)
        assert_eq!(a.m, 5);
        assert_eq!(a.n, 3);
        assert_eq!(b, vec![2., 0., -0., 10., -3.]);
        assert_eq!(cones.len(), 2);
    }

    #[test]
    fn solve_small_lp() {
        let solution = ClarabelSolver::default().solve(&small_lp()).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
        assert!((solution.values[0] - 8.).abs() < 1e-5);
        assert!(solution.values[1].abs() < 1e-5);
    }

    fn small_lp() -> LinearProgram {
        LinearProgram {
            columns: vec![column("x", 0., 10., 1.), column("y", 0., 10., 1.)],
            rows: vec![ConstraintRow {
                terms: vec![(0, 1.), (1, 2.)],
                sense: RowSense::LessEqual,
                rhs: 8.,
            }],
            sense: ObjectiveSense::Maximize,
        }
    }

    #[test]
    fn default_tolerance_from_configuration() {
        let tolerance = crate::configuration::read().tolerance;
        assert_eq!(ClarabelSolver::default().tolerance(), tolerance);
        assert_eq!(ClarabelSolver::with_tolerance(1e-6).tolerance(), 1e-6);
        assert_eq!(ClarabelSolver::default().settings().tol_feas, tolerance);
    }

    #[test]
    fn iteration_limit_halts() {
        let solution = ClarabelSolver::default()
            .with_max_iter(1)
            .solve(&small_lp())
            .unwrap();
        assert_eq!(solution.status, OptimizationStatus::SolverHalted);
        assert!(solution.values.is_empty());

        let solution = ClarabelSolver::default()
            .with_max_iter(50)
            .solve(&small_lp())
            .unwrap();
        assert_eq!(solution.status, OptimizationStatus::Optimal);
    }

    #[test]
    fn infeasible_lp() {
        let program = LinearProgram {
            columns: vec![column("x", 0., 1., 1.)],
            rows: vec![ConstraintRow {
                terms: vec![(0, 1.)],
                sense: RowSense::GreaterEqual,
                rhs: 2.,
            }],
            sense: ObjectiveSense::Minimize,
        };
        let solution = ClarabelSolver::default().solve(&program).unwrap();
        assert_eq!(solution.status, OptimizationStatus::Infeasible);
        assert!(solution.values.is_empty());
    }
}
