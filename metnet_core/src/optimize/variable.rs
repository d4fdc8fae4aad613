//! Module providing representation of optimization problem variables
use std::fmt::{Display, Formatter};

use derive_builder::Builder;

/// Name of a variable in an optimization problem
///
/// A name is either atomic (`"x"`), or a compound key made of a namespace and an id
/// (`("v", "rxn_1")`), which is how the analysis functions keep e.g. flux variables
/// and slack variables of the same reaction apart.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariableName {
    namespace: Option<String>,
    id: String,
}

impl VariableName {
    /// Create a compound variable name
    pub fn new(namespace: &str, id: &str) -> Self {
        VariableName {
            namespace: Some(namespace.to_string()),
            id: id.to_string(),
        }
    }

    /// Create an atomic variable name
    pub fn atomic(id: &str) -> Self {
        VariableName {
            namespace: None,
            id: id.to_string(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for VariableName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{}:{}", namespace, self.id),
            None => write!(f, "{}", self.id),
        }
    }
}

impl From<&str> for VariableName {
    fn from(id: &str) -> Self {
        VariableName::atomic(id)
    }
}

impl From<String> for VariableName {
    fn from(id: String) -> Self {
        VariableName {
            namespace: None,
            id,
        }
    }
}

impl From<&VariableName> for VariableName {
    fn from(name: &VariableName) -> Self {
        name.clone()
    }
}

impl From<(&str, &str)> for VariableName {
    fn from((namespace, id): (&str, &str)) -> Self {
        VariableName::new(namespace, id)
    }
}

impl From<(&str, &String)> for VariableName {
    fn from((namespace, id): (&str, &String)) -> Self {
        VariableName::new(namespace, id)
    }
}

/// An ordered tuple of variables, used to add a whole batch of constraints at once
///
/// Expressions containing a set expand to one constraint row per member of the set,
/// see [`crate::optimize::expression::Expression::value_sets`].
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct VariableSet(Vec<VariableName>);

impl VariableSet {
    pub fn new<I, N>(names: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<VariableName>,
    {
        VariableSet(names.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, VariableName> {
        self.0.iter()
    }

    pub fn get(&self, index: usize) -> Option<&VariableName> {
        self.0.get(index)
    }
}

impl<'a> IntoIterator for &'a VariableSet {
    type Item = &'a VariableName;
    type IntoIter = std::slice::Iter<'a, VariableName>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Display for VariableSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let names: Vec<String> = self.0.iter().map(|n| n.to_string()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Definition of a variable in an optimization problem
///
/// # Examples
/// ```rust
/// use metnet_core::optimize::variable::{VariableBuilder, VariableName, VariableType};
/// let flux = VariableBuilder::default()
///     .name(VariableName::new("v", "rxn_1"))
///     .lower_bound(Some(0.))
///     .upper_bound(Some(1000.))
///     .build()
///     .unwrap();
/// assert_eq!(flux.variable_type, VariableType::Continuous);
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct Variable {
    /// Name used to reference the variable
    #[builder(setter(into))]
    pub name: VariableName,
    /// Lower bound, None for negative infinity
    #[builder(default = "None")]
    pub lower_bound: Option<f64>,
    /// Upper bound, None for positive infinity
    #[builder(default = "None")]
    pub upper_bound: Option<f64>,
    /// Type of the variable
    #[builder(default = "VariableType::Continuous")]
    pub variable_type: VariableType,
}

impl Variable {
    /// Bounds of the variable with missing bounds replaced by infinities
    ///
    /// Binary variables are always bounded by [0, 1].
    pub fn resolved_bounds(&self) -> (f64, f64) {
        match self.variable_type {
            VariableType::Binary => (0., 1.),
            _ => (
                self.lower_bound.unwrap_or(f64::NEG_INFINITY),
                self.upper_bound.unwrap_or(f64::INFINITY),
            ),
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.variable_type)
    }
}

/// Represents the type of variable in an optimization problem
///
/// # Notes:
/// Not all variable types are supported for all solvers, currently Clarabel only supports
/// Continuous variables, while microlp supports all types
#[derive(Debug, PartialEq, Clone, Copy, Hash, Eq, Default)]
pub enum VariableType {
    /// Continuous variable
    #[default]
    Continuous,
    /// Integer variable
    Integer,
    /// Binary Variable
    Binary,
}

impl Display for VariableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableType::Continuous => write!(f, "CONTINUOUS"),
            VariableType::Integer => write!(f, "INTEGER"),
            VariableType::Binary => write!(f, "BINARY"),
        }
    }
}
