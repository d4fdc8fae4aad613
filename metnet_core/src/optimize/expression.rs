//! Linear expressions over problem variables and variable sets
//!
//! Expressions are immutable values, every operation returns a new expression. The
//! operations are available as free functions ([`add`], [`negate`], [`scale`],
//! [`compare`]), as methods, and through the `std::ops` operators.
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::iter::Sum;
use std::ops::{Add, Mul, Neg, Sub};

use thiserror::Error;

use crate::optimize::constraint::{Relation, RelationSense};
use crate::optimize::variable::{VariableName, VariableSet};

/// Key of a term in an [`Expression`]
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Term {
    /// A single variable
    Variable(VariableName),
    /// A set of variables, expanded element wise when added as a constraint
    Set(VariableSet),
}

impl Display for Term {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Term::Variable(name) => write!(f, "{}", name),
            Term::Set(set) => write!(f, "{}", set),
        }
    }
}

/// One row of an expanded expression, pairs of variable and coefficient
pub type ValueSet = Vec<(VariableName, f64)>;

/// A linear expression, a sum of coefficient * term plus a constant offset
///
/// Terms with a zero coefficient are never stored, so two expressions are equal exactly
/// when they represent the same linear function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Expression {
    terms: BTreeMap<Term, f64>,
    offset: f64,
}

impl Expression {
    /// The zero expression
    pub fn new() -> Self {
        Self::default()
    }

    /// Expression without variables
    pub fn constant(value: f64) -> Self {
        Expression {
            terms: BTreeMap::new(),
            offset: value,
        }
    }

    /// Unit expression of a single variable
    pub fn variable(name: impl Into<VariableName>) -> Self {
        Self::from_term(Term::Variable(name.into()), 1.)
    }

    /// Unit expression of a variable set
    pub fn set(set: VariableSet) -> Self {
        Self::from_term(Term::Set(set), 1.)
    }

    fn from_term(term: Term, coefficient: f64) -> Self {
        let mut expr = Expression::new();
        expr.insert_term(term, coefficient);
        expr
    }

    /// Add `coefficient` to the coefficient of `term`, dropping the term if it cancels
    fn insert_term(&mut self, term: Term, coefficient: f64) {
        let value = self.terms.get(&term).copied().unwrap_or(0.) + coefficient;
        if value == 0. {
            self.terms.remove(&term);
        } else {
            self.terms.insert(term, value);
        }
    }

    /// Iterate over the terms of the expression with their coefficients
    pub fn terms(&self) -> impl Iterator<Item = (&Term, f64)> {
        self.terms.iter().map(|(t, c)| (t, *c))
    }

    /// Coefficient of a term, zero if the term is absent
    pub fn coefficient(&self, term: &Term) -> f64 {
        self.terms.get(term).copied().unwrap_or(0.)
    }

    /// Constant part of the expression
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// True when the expression contains no variables
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// Return a new expression that is the sum of `self` and `other`
    pub fn plus(&self, other: &Expression) -> Expression {
        let mut result = self.clone();
        for (term, coefficient) in &other.terms {
            result.insert_term(term.clone(), *coefficient);
        }
        result.offset += other.offset;
        result
    }

    /// Return a new expression that is `self` minus `other`
    pub fn minus(&self, other: &Expression) -> Expression {
        self.plus(&other.negate())
    }

    /// Return the additive inverse of the expression
    pub fn negate(&self) -> Expression {
        self.scale(-1.)
    }

    /// Return the expression multiplied by `factor`
    pub fn scale(&self, factor: f64) -> Expression {
        if factor == 0. {
            return Expression::new();
        }
        Expression {
            terms: self
                .terms
                .iter()
                .map(|(t, c)| (t.clone(), c * factor))
                .collect(),
            offset: self.offset * factor,
        }
    }

    /// Build the relation `self - rhs ⋈ 0`
    pub fn compare(&self, rhs: &Expression, sense: RelationSense) -> Relation {
        Relation::new(self.minus(rhs), sense)
    }

    pub fn less_equal(&self, rhs: &Expression) -> Relation {
        self.compare(rhs, RelationSense::LessEqual)
    }

    pub fn greater_equal(&self, rhs: &Expression) -> Relation {
        self.compare(rhs, RelationSense::GreaterEqual)
    }

    pub fn equal(&self, rhs: &Expression) -> Relation {
        self.compare(rhs, RelationSense::Equal)
    }

    pub fn less_than(&self, rhs: &Expression) -> Relation {
        self.compare(rhs, RelationSense::StrictlyLess)
    }

    pub fn greater_than(&self, rhs: &Expression) -> Relation {
        self.compare(rhs, RelationSense::StrictlyGreater)
    }

    /// Coefficient of every variable, with set terms spread over their members
    pub fn values(&self) -> BTreeMap<VariableName, f64> {
        let mut values = BTreeMap::new();
        for (term, coefficient) in &self.terms {
            match term {
                Term::Variable(name) => {
                    *values.entry(name.clone()).or_insert(0.) += coefficient;
                }
                Term::Set(set) => {
                    for name in set {
                        *values.entry(name.clone()).or_insert(0.) += coefficient;
                    }
                }
            }
        }
        values.retain(|_, c| *c != 0.);
        values
    }

    /// Expand the expression into rows suitable for a batched constraint call
    ///
    /// Without set terms a single row is produced. Otherwise all non empty sets must have
    /// the same length `n`, and row `i` holds the `i`-th member of every set together with
    /// all the single variable terms. Repeated variables within a row are summed. Empty
    /// sets contribute nothing, so an expression made of empty sets only gives no rows.
    pub fn value_sets(&self) -> Result<Vec<ValueSet>, SetLengthMismatch> {
        let mut length: Option<usize> = None;
        let mut empty_sets = false;
        let mut variables = false;
        for term in self.terms.keys() {
            match term {
                Term::Variable(_) => variables = true,
                Term::Set(set) if set.is_empty() => empty_sets = true,
                Term::Set(set) => match length {
                    None => length = Some(set.len()),
                    Some(n) if n != set.len() => {
                        return Err(SetLengthMismatch {
                            expected: n,
                            found: set.len(),
                        })
                    }
                    Some(_) => {}
                },
            }
        }

        let rows = match length {
            Some(n) => n,
            None if empty_sets && !variables => 0,
            None => 1,
        };
        Ok((0..rows)
            .map(|index| {
                let mut row: BTreeMap<&VariableName, f64> = BTreeMap::new();
                for (term, coefficient) in &self.terms {
                    let name = match term {
                        Term::Variable(name) => Some(name),
                        Term::Set(set) => set.get(index),
                    };
                    if let Some(name) = name {
                        *row.entry(name).or_insert(0.) += coefficient;
                    }
                }
                row.into_iter()
                    .filter(|(_, c)| *c != 0.)
                    .map(|(n, c)| (n.clone(), c))
                    .collect()
            })
            .collect())
    }
}

/// Sets of different lengths were combined in one expression
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Variable sets of different length in one expression ({expected} and {found})")]
pub struct SetLengthMismatch {
    pub expected: usize,
    pub found: usize,
}

// region Free functions
/// Sum of two expressions
pub fn add(a: &Expression, b: &Expression) -> Expression {
    a.plus(b)
}

/// Additive inverse of an expression
pub fn negate(a: &Expression) -> Expression {
    a.negate()
}

/// Expression multiplied by a scalar
pub fn scale(factor: f64, a: &Expression) -> Expression {
    a.scale(factor)
}

/// Relation `a ⋈ 0`
pub fn compare(a: &Expression, sense: RelationSense) -> Relation {
    Relation::new(a.clone(), sense)
}
// endregion Free functions

// region Operators
impl From<VariableName> for Expression {
    fn from(name: VariableName) -> Self {
        Expression::variable(name)
    }
}

impl From<&VariableName> for Expression {
    fn from(name: &VariableName) -> Self {
        Expression::variable(name.clone())
    }
}

impl From<&str> for Expression {
    fn from(name: &str) -> Self {
        Expression::variable(name)
    }
}

impl From<(&str, &str)> for Expression {
    fn from(name: (&str, &str)) -> Self {
        Expression::variable(name)
    }
}

impl From<(&str, &String)> for Expression {
    fn from(name: (&str, &String)) -> Self {
        Expression::variable(name)
    }
}

impl From<f64> for Expression {
    fn from(value: f64) -> Self {
        Expression::constant(value)
    }
}

impl From<&Expression> for Expression {
    fn from(expr: &Expression) -> Self {
        expr.clone()
    }
}

impl Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::plus(&self, &rhs)
    }
}

impl Add<&Expression> for &Expression {
    type Output = Expression;

    fn add(self, rhs: &Expression) -> Expression {
        Expression::plus(self, rhs)
    }
}

impl Add<f64> for Expression {
    type Output = Expression;

    fn add(self, rhs: f64) -> Expression {
        Expression::plus(&self, &Expression::constant(rhs))
    }
}

impl Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        self.minus(&rhs)
    }
}

impl Sub<&Expression> for &Expression {
    type Output = Expression;

    fn sub(self, rhs: &Expression) -> Expression {
        self.minus(rhs)
    }
}

impl Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self.negate()
    }
}

impl Neg for &Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self.negate()
    }
}

impl Mul<f64> for Expression {
    type Output = Expression;

    fn mul(self, rhs: f64) -> Expression {
        self.scale(rhs)
    }
}

impl Mul<f64> for &Expression {
    type Output = Expression;

    fn mul(self, rhs: f64) -> Expression {
        self.scale(rhs)
    }
}

impl Mul<Expression> for f64 {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        rhs.scale(self)
    }
}

impl Mul<&Expression> for f64 {
    type Output = Expression;

    fn mul(self, rhs: &Expression) -> Expression {
        rhs.scale(self)
    }
}

impl Sum for Expression {
    fn sum<I: Iterator<Item = Expression>>(iter: I) -> Self {
        iter.fold(Expression::new(), |acc, e| Expression::plus(&acc, &e))
    }
}
// endregion Operators

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<String> = self
            .terms
            .iter()
            .map(|(t, c)| format!("{}*{}", c, t))
            .collect();
        if self.offset != 0. || parts.is_empty() {
            parts.push(format!("{}", self.offset));
        }
        write!(f, "{}", parts.join(" + "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn x() -> Expression {
        Expression::variable("x")
    }

    fn y() -> Expression {
        Expression::variable("y")
    }

    #[test]
    fn addition_commutes() {
        let a = 2. * x() + 3.;
        let b = y() - 4. * x();
        assert_eq!(&a + &b, &b + &a);
        assert_eq!(add(&a, &b), add(&b, &a));
    }

    #[test]
    fn scaling_distributes() {
        let a = 2. * x() + 1.;
        let b = y() * -3.;
        let k = 2.5;
        assert_eq!(scale(k, &(&a + &b)), scale(k, &a) + scale(k, &b));
    }

    #[test]
    fn multiply_by_zero() {
        let a = 2. * x() + y() + 7.;
        assert_eq!(a * 0., Expression::new());
    }

    #[test]
    fn cancelled_terms_are_dropped() {
        let a = x() + y();
        let b = a.minus(&y());
        assert_eq!(b, x());
        assert_eq!(b.terms().count(), 1);
        assert_eq!(b.coefficient(&Term::Variable("y".into())), 0.);
    }

    #[test]
    fn negate_and_offset() {
        let a = negate(&(x() + 2.));
        assert_eq!(a.offset(), -2.);
        assert_eq!(a.coefficient(&Term::Variable("x".into())), -1.);
        assert!(Expression::constant(3.).is_constant());
    }

    #[test]
    fn value_sets_without_sets() {
        let a = 2. * x() + y() + 1.;
        let rows = a.value_sets().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows[0],
            vec![(VariableName::from("x"), 2.), (VariableName::from("y"), 1.)]
        );
    }

    #[test]
    fn value_sets_expand_sets_element_wise() {
        let z = Expression::set(VariableSet::new([("z", "a"), ("z", "b")]));
        let v = Expression::set(VariableSet::new([("v", "a"), ("v", "b")]));
        let rows = (z - v + x()).value_sets().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[1],
            vec![
                (VariableName::from("x"), 1.),
                (VariableName::new("v", "b"), -1.),
                (VariableName::new("z", "b"), 1.),
            ]
        );
    }

    #[test]
    fn value_sets_length_mismatch() {
        let a = Expression::set(VariableSet::new(["a", "b"]));
        let b = Expression::set(VariableSet::new(["c"]));
        assert_eq!(
            (a + b).value_sets(),
            Err(SetLengthMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn value_sets_skip_empty_sets() {
        let empty = || Expression::set(VariableSet::new(Vec::<&str>::new()));
        let rows = (x() + empty()).value_sets().unwrap();
        assert_eq!(rows, vec![vec![(VariableName::from("x"), 1.)]]);

        let pair = Expression::set(VariableSet::new(["a", "b"]));
        assert_eq!((pair + empty()).value_sets().unwrap().len(), 2);
        assert!((empty() + 2. * empty()).value_sets().unwrap().is_empty());
    }

    #[test]
    fn namespaced_names_convert_to_expressions() {
        let id = String::from("a");
        assert_eq!(
            Expression::from(("v", "a")),
            Expression::variable(VariableName::new("v", "a"))
        );
        assert_eq!(Expression::from(("v", &id)), Expression::from(("v", "a")));
    }

    #[test]
    fn values_spread_sets() {
        let a = 2. * Expression::set(VariableSet::new(["a", "b"])) + Expression::variable("a");
        let values = a.values();
        assert_eq!(values[&VariableName::from("a")], 3.);
        assert_eq!(values[&VariableName::from("b")], 2.);
    }

    #[test]
    fn relation_moves_everything_left() {
        let relation = x().less_equal(&(y() + 3.));
        assert_eq!(relation.sense(), RelationSense::LessEqual);
        assert_eq!(relation.expression(), &(x() - y() - Expression::constant(3.)));
    }

    #[test]
    fn sum_of_expressions() {
        let total: Expression = ["a", "b", "a"].iter().map(|n| Expression::variable(*n)).sum();
        assert_eq!(total.coefficient(&Term::Variable("a".into())), 2.);
    }
}
