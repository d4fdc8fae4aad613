//! Provides struct representing an optimization problem
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use thiserror::Error;

use crate::optimize::constraint::{ConstraintRow, Relation, RelationSense, RowSense};
use crate::optimize::expression::{Expression, SetLengthMismatch};
use crate::optimize::objective::{Objective, ObjectiveSense};
use crate::optimize::solvers::{Column, Diagnostics, LinearProgram, LinearSolver, SolverError};
use crate::optimize::variable::{Variable, VariableName, VariableSet, VariableType};
use crate::optimize::OptimizationStatus;

/// An optimization problem
///
/// Problems are created by a [`crate::optimize::solvers::Solver`] and keep their variables,
/// constraints and objective in a backend neutral form until [`Problem::solve`] is called.
#[derive(Debug)]
pub struct Problem {
    /// Backend used to solve the problem
    backend: Box<dyn LinearSolver>,
    /// Where diagnostic output goes
    diagnostics: Diagnostics,
    /// Variables of the optimization problem, the position is the column index
    variables: Arc<IndexMap<VariableName, Variable>>,
    /// Constraint rows of the optimization problem
    rows: Vec<ConstraintRow>,
    /// Objective to optimize
    objective: Objective,
    /// Number of times the problem was solved, used to retire old results
    generation: Arc<AtomicU64>,
    /// Result of the latest solve
    result: Option<ProblemResult>,
}

impl Problem {
    // region Creation Functions
    /// Create a new optimization problem solved by `backend`
    pub fn new(backend: Box<dyn LinearSolver>) -> Self {
        let diagnostics = backend.diagnostics().clone();
        Self {
            backend,
            diagnostics,
            variables: Arc::new(IndexMap::new()),
            rows: Vec::new(),
            objective: Objective::new(ObjectiveSense::Minimize),
            generation: Arc::new(AtomicU64::new(0)),
            result: None,
        }
    }
    // endregion Creation Functions

    // region Adding Variables
    /// Define continuous variables sharing the same bounds
    ///
    /// `None` bounds are unbounded.
    ///
    /// # Examples
    /// ```rust
    /// use metnet_core::optimize::solvers::Solver;
    /// use metnet_core::optimize::solvers::clarabel::ClarabelSolver;
    /// let mut problem = ClarabelSolver::default().create_problem();
    /// problem.define(["x", "y"], Some(0.), Some(10.)).unwrap();
    /// problem.define([("v", "rxn_1")], None, None).unwrap();
    /// ```
    pub fn define<I, N>(
        &mut self,
        names: I,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Result<(), ProblemError>
    where
        I: IntoIterator<Item = N>,
        N: Into<VariableName>,
    {
        self.define_typed(names, lower, upper, VariableType::Continuous)
    }

    /// Define variables sharing the same bounds and type
    pub fn define_typed<I, N>(
        &mut self,
        names: I,
        lower: Option<f64>,
        upper: Option<f64>,
        variable_type: VariableType,
    ) -> Result<(), ProblemError>
    where
        I: IntoIterator<Item = N>,
        N: Into<VariableName>,
    {
        for name in names {
            self.add_variable(Variable {
                name: name.into(),
                lower_bound: lower,
                upper_bound: upper,
                variable_type,
            })?;
        }
        Ok(())
    }

    /// Add a variable to the optimization problem
    pub fn add_variable(&mut self, variable: Variable) -> Result<(), ProblemError> {
        self.validate_variable(&variable)?;
        self.diagnostics.trace(format_args!(
            "Defining {} as column {}",
            variable,
            self.variables.len()
        ));
        Arc::make_mut(&mut self.variables).insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Whether a variable with this name has been defined
    pub fn has_variable(&self, name: &VariableName) -> bool {
        self.variables.contains_key(name)
    }

    /// Number of defined variables
    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }
    // endregion Adding Variables

    // region Accessing Variables
    /// Unit expression of a defined variable
    pub fn var(&self, name: impl Into<VariableName>) -> Result<Expression, ProblemError> {
        let name = name.into();
        if !self.has_variable(&name) {
            return Err(ProblemError::UndefinedVariable(name));
        }
        Ok(Expression::variable(name))
    }

    /// Unit expression of a set of defined variables
    pub fn set<I, N>(&self, names: I) -> Result<Expression, ProblemError>
    where
        I: IntoIterator<Item = N>,
        N: Into<VariableName>,
    {
        let set = VariableSet::new(names);
        if let Some(missing) = set.iter().find(|n| !self.has_variable(n)) {
            return Err(ProblemError::UndefinedVariable(missing.clone()));
        }
        Ok(Expression::set(set))
    }
    // endregion Accessing Variables

    // region Adding Constraints
    /// Add linear constraints to the problem
    ///
    /// A relation containing variable sets adds one row per set member. Relations without
    /// variables are checked right away: a true relation is ignored, a false one is an
    /// error. None of the relations is added if any of them is invalid.
    pub fn add_linear_constraints<I>(&mut self, relations: I) -> Result<(), ProblemError>
    where
        I: IntoIterator<Item = Relation>,
    {
        let mut new_rows = Vec::new();
        for relation in relations {
            let sense = match relation.sense() {
                RelationSense::LessEqual => RowSense::LessEqual,
                RelationSense::Equal => RowSense::Equal,
                RelationSense::GreaterEqual => RowSense::GreaterEqual,
                RelationSense::StrictlyLess | RelationSense::StrictlyGreater => {
                    return Err(ProblemError::InvalidRelation(relation.to_string()));
                }
            };
            match relation.evaluate_constant() {
                Some(true) => continue,
                Some(false) => {
                    return Err(ProblemError::InfeasibleConstantConstraint(
                        relation.to_string(),
                    ))
                }
                None => {}
            }

            let rhs = -relation.expression().offset();
            for value_set in relation.expression().value_sets()? {
                if value_set.is_empty() {
                    // Every variable cancelled within this row
                    if !relation.sense().holds(-rhs) {
                        return Err(ProblemError::InfeasibleConstantConstraint(
                            relation.to_string(),
                        ));
                    }
                    continue;
                }
                let terms = value_set
                    .into_iter()
                    .map(|(name, coefficient)| Ok((self.column_index(&name)?, coefficient)))
                    .collect::<Result<Vec<_>, ProblemError>>()?;
                new_rows.push(ConstraintRow { terms, sense, rhs });
            }
        }
        self.diagnostics
            .trace(format_args!("Adding {} constraint rows", new_rows.len()));
        self.rows.extend(new_rows);
        Ok(())
    }

    /// Number of constraint rows
    pub fn num_constraints(&self) -> usize {
        self.rows.len()
    }
    // endregion Adding Constraints

    // region Objective
    /// Set the linear objective, replacing the previous objective entirely
    pub fn set_linear_objective(
        &mut self,
        expression: impl Into<Expression>,
    ) -> Result<(), ProblemError> {
        let expression = expression.into();
        for name in expression.values().keys() {
            self.column_index(name)?;
        }
        self.objective.set_expression(expression);
        Ok(())
    }

    /// Set whether the objective is maximized or minimized
    pub fn set_objective_sense(&mut self, sense: ObjectiveSense) {
        self.objective.set_sense(sense);
    }
    // endregion Objective

    // region Solving
    /// Solve the problem, optionally changing the objective sense first
    ///
    /// The returned result replaces the previous one, any earlier [`ProblemResult`] of this
    /// problem becomes stale.
    pub fn solve(&mut self, sense: Option<ObjectiveSense>) -> Result<ProblemResult, ProblemError> {
        if let Some(sense) = sense {
            self.set_objective_sense(sense);
        }
        let program = self.linear_program();
        self.diagnostics.trace(format_args!(
            "Solving problem with {} columns and {} rows ({:?})",
            program.columns.len(),
            program.rows.len(),
            program.sense
        ));
        let solution = self.backend.solve(&program)?;
        let objective_value = if solution.status.is_success() {
            Some(program.objective_value(&solution.values) + self.objective.expression().offset())
        } else {
            None
        };
        self.diagnostics.log(format_args!(
            "Solve finished with status {} ({})",
            solution.status, solution.status_message
        ));

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let result = ProblemResult {
            generation,
            current: Arc::clone(&self.generation),
            status: solution.status,
            status_message: solution.status_message,
            objective_value,
            values: Arc::new(solution.values),
            variables: Arc::clone(&self.variables),
        };
        self.result = Some(result.clone());
        Ok(result)
    }

    /// Result of the latest solve
    pub fn result(&self) -> Option<&ProblemResult> {
        self.result.as_ref()
    }

    /// Snapshot of the problem in the form handed to the backend
    pub fn linear_program(&self) -> LinearProgram {
        let objective = self.objective.expression().values();
        let columns = self
            .variables
            .values()
            .map(|variable| {
                let (lower, upper) = variable.resolved_bounds();
                Column {
                    name: variable.name.clone(),
                    lower,
                    upper,
                    variable_type: variable.variable_type,
                    objective: objective.get(&variable.name).copied().unwrap_or(0.),
                }
            })
            .collect();
        LinearProgram {
            columns,
            rows: self.rows.clone(),
            sense: self.objective.sense(),
        }
    }
    // endregion Solving

    // region Validation Functions
    /// Check that a variable to be added is valid to add to this problem
    fn validate_variable(&self, variable: &Variable) -> Result<(), ProblemError> {
        if self.has_variable(&variable.name) {
            return Err(ProblemError::VariableAlreadyDefined(variable.name.clone()));
        }
        let (lb, ub) = variable.resolved_bounds();
        if lb > ub || lb.is_nan() || ub.is_nan() {
            return Err(ProblemError::InvalidVariableBounds(variable.name.clone()));
        }
        Ok(())
    }

    fn column_index(&self, name: &VariableName) -> Result<usize, ProblemError> {
        self.variables
            .get_index_of(name)
            .ok_or_else(|| ProblemError::UndefinedVariable(name.clone()))
    }
    // endregion Validation Functions
}

/// Outcome of solving a [`Problem`]
///
/// A result is only valid until its problem is solved again, after that every accessor
/// returns [`ProblemError::StaleResult`].
#[derive(Debug, Clone)]
pub struct ProblemResult {
    generation: u64,
    current: Arc<AtomicU64>,
    status: OptimizationStatus,
    status_message: String,
    objective_value: Option<f64>,
    values: Arc<Vec<f64>>,
    variables: Arc<IndexMap<VariableName, Variable>>,
}

impl ProblemResult {
    fn check_valid(&self) -> Result<(), ProblemError> {
        if self.current.load(Ordering::SeqCst) != self.generation {
            return Err(ProblemError::StaleResult);
        }
        Ok(())
    }

    /// Whether an optimal (or almost optimal) solution was found
    pub fn success(&self) -> Result<bool, ProblemError> {
        self.check_valid()?;
        Ok(self.status.is_success())
    }

    /// Status of the solve
    pub fn optimization_status(&self) -> Result<OptimizationStatus, ProblemError> {
        self.check_valid()?;
        Ok(self.status)
    }

    /// Status text reported by the solver
    pub fn status(&self) -> Result<&str, ProblemError> {
        self.check_valid()?;
        Ok(&self.status_message)
    }

    /// Value of the objective at the solution, None without a solution
    pub fn objective_value(&self) -> Result<Option<f64>, ProblemError> {
        self.check_valid()?;
        Ok(self.objective_value)
    }

    /// Value of a variable or of an expression at the solution
    ///
    /// Set terms evaluate to their coefficient times the sum of the set members.
    pub fn get_value(&self, query: impl Into<Expression>) -> Result<f64, ProblemError> {
        self.check_valid()?;
        if self.values.is_empty() && !self.variables.is_empty() {
            return Err(ProblemError::SolutionUnavailable(self.status_message.clone()));
        }
        let expression = query.into();
        let mut value = expression.offset();
        for (name, coefficient) in expression.values() {
            let index = self
                .variables
                .get_index_of(&name)
                .ok_or(ProblemError::UndefinedVariable(name))?;
            value += coefficient * self.values[index];
        }
        Ok(value)
    }
}

/// Errors associated with the Problem
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    /// A variable was referenced before being defined
    #[error("Undefined variable: {0}")]
    UndefinedVariable(VariableName),
    /// A variable was defined twice
    #[error("Tried to define variable {0} which already exists")]
    VariableAlreadyDefined(VariableName),
    /// Variable defined with lower bound above the upper bound
    #[error("Tried to define variable {0} with lower_bound > upper_bound")]
    InvalidVariableBounds(VariableName),
    /// Strict inequalities can't be expressed in a linear program
    #[error("Strict relations are invalid in LP problems: {0}")]
    InvalidRelation(String),
    /// A relation without variables which is always false was added
    #[error("Unsatisfiable constant relation added: {0}")]
    InfeasibleConstantConstraint(String),
    /// Sets of different sizes in one relation
    #[error(transparent)]
    SetLengthMismatch(#[from] SetLengthMismatch),
    /// The problem has been solved again since the result was created
    #[error("Result is no longer valid, the problem has been solved again")]
    StaleResult,
    /// Values were requested from a solve that produced no solution
    #[error("No solution available: {0}")]
    SolutionUnavailable(String),
    /// Error reported by the solver backend
    #[error(transparent)]
    Solver(#[from] SolverError),
}
