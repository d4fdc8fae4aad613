//! Module for representing and parsing chemical formulas
//!
//! A [`Formula`] maps elements (atoms, radicals or parenthesised sub formulas) to integer
//! counts. Sub formulas are kept as their own element, `C2(CH)3` is `{C: 2, (CH): 3}`,
//! and [`Formula::flattened`] expands them into plain atom counts.
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use thiserror::Error;

use crate::formula::lexer::LexerError;
use crate::formula::parser::ParseError;

pub mod lexer;
pub mod parser;
pub mod token;

/// A chemical element, identified by its symbol
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Atom(String);

impl Atom {
    pub fn new(symbol: &str) -> Self {
        Atom(symbol.to_string())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

/// A generic radical, `R` or a numbered `R1`, `R2`, ...
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Radical(String);

impl Radical {
    pub fn new(symbol: &str) -> Self {
        Radical(symbol.to_string())
    }

    pub fn symbol(&self) -> &str {
        &self.0
    }
}

/// Element of a formula
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FormulaElement {
    Atom(Atom),
    Radical(Radical),
    /// Parenthesised sub formula
    Group(Formula),
}

impl From<Atom> for FormulaElement {
    fn from(atom: Atom) -> Self {
        FormulaElement::Atom(atom)
    }
}

impl From<Radical> for FormulaElement {
    fn from(radical: Radical) -> Self {
        FormulaElement::Radical(radical)
    }
}

impl From<Formula> for FormulaElement {
    fn from(formula: Formula) -> Self {
        FormulaElement::Group(formula)
    }
}

/// A chemical formula
///
/// Elements with a zero count are never stored, so merging a formula with its negation
/// gives the empty formula.
///
/// # Examples
/// ```rust
/// use metnet_core::formula::{Atom, Formula};
/// let water: Formula = "H2O".parse().unwrap();
/// assert_eq!(water, Formula::from_items([(Atom::new("H"), 2), (Atom::new("O"), 1)]));
/// assert_eq!(water.scale(2).unwrap().to_string(), "H4O2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Formula {
    items: BTreeMap<FormulaElement, i64>,
}

impl Formula {
    /// The empty formula
    pub fn new() -> Self {
        Formula::default()
    }

    /// Formula from `(element, count)` pairs
    ///
    /// A repeated element keeps the count of its last pair.
    pub fn from_items<I, E>(items: I) -> Self
    where
        I: IntoIterator<Item = (E, i64)>,
        E: Into<FormulaElement>,
    {
        let mut formula = Formula::new();
        for (element, count) in items {
            let element = element.into();
            if count == 0 {
                formula.items.remove(&element);
            } else {
                formula.items.insert(element, count);
            }
        }
        formula
    }

    /// Parse a formula string such as `C2H6O2(CH)2` or `C2H4NO2(R1)`
    pub fn parse(source: &str) -> Result<Formula, FormulaParseError> {
        let tokens = lexer::Lexer::new(source).lex()?;
        let mut parser = parser::FormulaParser::new(tokens);
        Ok(parser.parse()?)
    }

    /// Add `count` to the count of `element`, dropping it if the count becomes zero
    pub(crate) fn insert(
        &mut self,
        element: FormulaElement,
        count: i64,
    ) -> Result<(), FormulaError> {
        let value = self
            .count(&element)
            .checked_add(count)
            .ok_or(FormulaError::CountOverflow)?;
        if value == 0 {
            self.items.remove(&element);
        } else {
            self.items.insert(element, value);
        }
        Ok(())
    }

    pub fn items(&self) -> impl Iterator<Item = (&FormulaElement, i64)> {
        self.items.iter().map(|(e, c)| (e, *c))
    }

    /// Count of an element, zero when absent
    pub fn count(&self, element: &FormulaElement) -> i64 {
        self.items.get(element).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of the element counts of both formulas
    pub fn merge(&self, other: &Formula) -> Result<Formula, FormulaError> {
        let mut result = self.clone();
        for (element, count) in &other.items {
            result.insert(element.clone(), *count)?;
        }
        Ok(result)
    }

    /// Every count multiplied by `factor`
    pub fn scale(&self, factor: i64) -> Result<Formula, FormulaError> {
        if factor == 0 {
            return Ok(Formula::new());
        }
        let items = self
            .items
            .iter()
            .map(|(e, c)| {
                c.checked_mul(factor)
                    .map(|count| (e.clone(), count))
                    .ok_or(FormulaError::CountOverflow)
            })
            .collect::<Result<_, _>>()?;
        Ok(Formula { items })
    }

    /// The formula as a single group repeated `count` times, `(H2O)4` for water and 4
    pub fn repeat(&self, count: i64) -> Formula {
        Formula::from_items([(FormulaElement::Group(self.clone()), count)])
    }

    /// Formula with all groups expanded into their atoms and radicals
    pub fn flattened(&self) -> Result<Formula, FormulaError> {
        let mut result = Formula::new();
        for (element, count) in &self.items {
            match element {
                FormulaElement::Group(group) => {
                    for (inner, inner_count) in group.flattened()?.items {
                        let total = inner_count
                            .checked_mul(*count)
                            .ok_or(FormulaError::CountOverflow)?;
                        result.insert(inner, total)?;
                    }
                }
                other => result.insert(other.clone(), *count)?,
            }
        }
        Ok(result)
    }

    /// Elements missing on either side of `lhs -> rhs`
    ///
    /// Returns `(missing_left, missing_right)`: what would have to be added to the left
    /// side, and what would have to be added to the right side to balance the two.
    pub fn balance(lhs: &Formula, rhs: &Formula) -> Result<(Formula, Formula), FormulaError> {
        let difference = lhs.flattened()?.merge(&rhs.flattened()?.scale(-1)?)?;
        let mut missing_left = Formula::new();
        let mut missing_right = Formula::new();
        for (element, count) in difference.items {
            if count < 0 {
                let count = count.checked_neg().ok_or(FormulaError::CountOverflow)?;
                missing_left.items.insert(element, count);
            } else {
                missing_right.items.insert(element, count);
            }
        }
        Ok((missing_left, missing_right))
    }
}

impl FromStr for Formula {
    type Err = FormulaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Formula::parse(s)
    }
}

fn write_count(f: &mut Formatter<'_>, count: i64) -> std::fmt::Result {
    if count != 1 {
        write!(f, "{}", count)?;
    }
    Ok(())
}

impl Display for Formula {
    /// Hill order: carbon, then hydrogen, then the other atoms alphabetically (all atoms
    /// alphabetically when there is no carbon), followed by radicals and groups
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut atoms: Vec<(&Atom, i64)> = Vec::new();
        let mut rest: Vec<(&FormulaElement, i64)> = Vec::new();
        for (element, count) in &self.items {
            match element {
                FormulaElement::Atom(atom) => atoms.push((atom, *count)),
                other => rest.push((other, *count)),
            }
        }
        if atoms.iter().any(|(a, _)| a.symbol() == "C") {
            let rank = |a: &Atom| match a.symbol() {
                "C" => 0,
                "H" => 1,
                _ => 2,
            };
            atoms.sort_by(|(a, _), (b, _)| rank(a).cmp(&rank(b)).then(a.cmp(b)));
        }
        for (atom, count) in atoms {
            write!(f, "{}", atom.symbol())?;
            write_count(f, count)?;
        }
        for (element, count) in rest {
            match element {
                FormulaElement::Radical(radical) if radical.symbol() == "R" => {
                    write!(f, "R")?
                }
                FormulaElement::Radical(radical) => write!(f, "({})", radical.symbol())?,
                FormulaElement::Group(group) => write!(f, "({})", group)?,
                FormulaElement::Atom(_) => {}
            }
            write_count(f, count)?;
        }
        Ok(())
    }
}

/// Enum representing possible lex and parse errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum FormulaParseError {
    /// Lexing Error
    #[error("Error occurred during lexing of the formula: {0}")]
    LexingError(#[from] LexerError),
    /// Parsing Error
    #[error("Error occurred during parsing of the formula: {0}")]
    ParsingError(#[from] ParseError),
}

/// Errors raised when working with formulas of a model
#[derive(Debug, Error, PartialEq, Clone)]
pub enum FormulaError {
    /// The formula of a compound could not be parsed
    #[error("Invalid formula for compound {compound}: {source}")]
    InvalidCompoundFormula {
        compound: String,
        source: FormulaParseError,
    },
    /// An element count doesn't fit in an `i64`
    #[error("Element count overflow in formula")]
    CountOverflow,
}
