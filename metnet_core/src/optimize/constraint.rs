//! Provides the relation type used to add linear constraints to a problem
use std::fmt::{Display, Formatter};

use crate::optimize::expression::Expression;

/// Sense of a [`Relation`]
///
/// The strict senses can be represented, but linear programs have no strict inequalities,
/// so [`crate::optimize::problem::Problem::add_linear_constraints`] rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationSense {
    LessEqual,
    Equal,
    GreaterEqual,
    StrictlyLess,
    StrictlyGreater,
}

impl RelationSense {
    /// Whether this is one of the strict senses
    pub fn is_strict(&self) -> bool {
        matches!(
            self,
            RelationSense::StrictlyLess | RelationSense::StrictlyGreater
        )
    }

    /// Evaluate `value ⋈ 0`
    pub fn holds(&self, value: f64) -> bool {
        match self {
            RelationSense::LessEqual => value <= 0.,
            RelationSense::Equal => value == 0.,
            RelationSense::GreaterEqual => value >= 0.,
            RelationSense::StrictlyLess => value < 0.,
            RelationSense::StrictlyGreater => value > 0.,
        }
    }
}

impl Display for RelationSense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            RelationSense::LessEqual => "<=",
            RelationSense::Equal => "==",
            RelationSense::GreaterEqual => ">=",
            RelationSense::StrictlyLess => "<",
            RelationSense::StrictlyGreater => ">",
        };
        write!(f, "{}", symbol)
    }
}

/// A comparison between an expression and zero
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    expression: Expression,
    sense: RelationSense,
}

impl Relation {
    /// Create the relation `expression ⋈ 0`
    pub fn new(expression: Expression, sense: RelationSense) -> Self {
        Relation { expression, sense }
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn sense(&self) -> RelationSense {
        self.sense
    }

    /// Truth value of a relation without variables, None if variables are involved
    pub fn evaluate_constant(&self) -> Option<bool> {
        if self.expression.is_constant() {
            Some(self.sense.holds(self.expression.offset()))
        } else {
            None
        }
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} 0", self.expression, self.sense)
    }
}

/// Sense of a constraint row handed to a solver backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowSense {
    LessEqual,
    Equal,
    GreaterEqual,
}

/// A single linear constraint row, `sum(coefficient * column) ⋈ rhs`
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    /// Pairs of column index and coefficient
    pub terms: Vec<(usize, f64)>,
    pub sense: RowSense,
    pub rhs: f64,
}

impl Display for ConstraintRow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let terms: Vec<String> = self
            .terms
            .iter()
            .map(|(col, coef)| format!("{}*x{}", coef, col))
            .collect();
        let sense = match self.sense {
            RowSense::LessEqual => "<=",
            RowSense::Equal => "=",
            RowSense::GreaterEqual => ">=",
        };
        write!(f, "{} {} {}", terms.join(" + "), sense, self.rhs)
    }
}
