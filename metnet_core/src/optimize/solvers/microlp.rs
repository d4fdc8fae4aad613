//! Implements a solver interface for microlp
//!
//! microlp is a pure Rust simplex (and branch and bound) solver. Unlike Clarabel it returns
//! vertex solutions and supports integer and binary columns.
use microlp::{ComparisonOp, LinearExpr, OptimizationDirection};

use crate::optimize::constraint::RowSense;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::solvers::{BackendSolution, Diagnostics, LinearProgram, LinearSolver, SolverError};
use crate::optimize::variable::VariableType;
use crate::optimize::OptimizationStatus;

/// Simplex LP/MILP backend using microlp
#[derive(Clone, Debug)]
pub struct MicrolpSolver {
    diagnostics: Diagnostics,
}

impl Default for MicrolpSolver {
    fn default() -> Self {
        MicrolpSolver {
            diagnostics: Diagnostics::new("metnet::solver::microlp"),
        }
    }
}

impl MicrolpSolver {
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

/// Integer bounds for an integer column, microlp only takes `i32`
fn integer_bounds(lower: f64, upper: f64) -> (i32, i32) {
    let clamp = |v: f64| v.clamp(i32::MIN as f64, i32::MAX as f64);
    (clamp(lower.ceil()) as i32, clamp(upper.floor()) as i32)
}

impl LinearSolver for MicrolpSolver {
    fn integer_variable_capable(&self) -> bool {
        true
    }

    fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    fn solve(&self, program: &LinearProgram) -> Result<BackendSolution, SolverError> {
        let direction = match program.sense {
            ObjectiveSense::Minimize => OptimizationDirection::Minimize,
            ObjectiveSense::Maximize => OptimizationDirection::Maximize,
        };
        let mut problem = microlp::Problem::new(direction);
        let variables: Vec<microlp::Variable> = program
            .columns
            .iter()
            .map(|column| match column.variable_type {
                VariableType::Continuous => {
                    problem.add_var(column.objective, (column.lower, column.upper))
                }
                VariableType::Integer => problem.add_integer_var(
                    column.objective,
                    integer_bounds(column.lower, column.upper),
                ),
                VariableType::Binary => problem.add_binary_var(column.objective),
            })
            .collect();

        for row in &program.rows {
            let mut expression = LinearExpr::empty();
            for (column, coefficient) in &row.terms {
                expression.add(variables[*column], *coefficient);
            }
            let op = match row.sense {
                RowSense::LessEqual => ComparisonOp::Le,
                RowSense::Equal => ComparisonOp::Eq,
                RowSense::GreaterEqual => ComparisonOp::Ge,
            };
            problem.add_constraint(expression, op, row.rhs);
        }

        self.diagnostics.trace(format_args!(
            "microlp problem with {} columns and {} rows",
            variables.len(),
            program.rows.len()
        ));
        match problem.solve() {
            Ok(solution) => Ok(BackendSolution {
                status: OptimizationStatus::Optimal,
                status_message: "optimal".to_string(),
                values: variables.iter().map(|v| solution[*v]).collect(),
            }),
            Err(microlp::Error::Infeasible) => Ok(BackendSolution {
                status: OptimizationStatus::Infeasible,
                status_message: microlp::Error::Infeasible.to_string(),
                values: Vec::new(),
            }),
            Err(microlp::Error::Unbounded) => Ok(BackendSolution {
                status: OptimizationStatus::Unbounded,
                status_message: microlp::Error::Unbounded.to_string(),
                values: Vec::new(),
            }),
            Err(err) => Err(SolverError::Backend(err.to_string())),
        }
    }
}
