//! This module provides a struct for representing reactions
use std::fmt::{Display, Formatter};

use derive_builder::Builder;
use indexmap::IndexMap;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::configuration;
use crate::metabolic_model::compound::Compound;

/// Represents a reaction in the metabolic model
///
/// # Examples
/// ```rust
/// use metnet_core::metabolic_model::reaction::{Reaction, ReactionBuilder};
/// let transport = ReactionBuilder::default()
///     .id("glc_t")
///     .reversible(true)
///     .build()
///     .unwrap()
///     .with_compound("glc_e", -1.)
///     .with_compound("glc_c", 1.);
/// assert_eq!(transport.limits(), (-1000., 1000.));
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reaction {
    /// Used to identify the reaction
    #[builder(setter(into))]
    pub id: String,
    /// Human-readable reaction name
    #[builder(default = "None")]
    pub name: Option<String>,
    /// Compound stoichiometry of the reaction, negative for substrates
    #[builder(default = "IndexMap::new()")]
    pub compounds: IndexMap<Compound, f64>,
    /// Whether the reaction can run in both directions
    #[builder(default = "false")]
    pub reversible: bool,
    /// Lower flux bound, None for the default of the configuration
    #[builder(default = "None")]
    pub lower_bound: Option<f64>,
    /// Upper flux bound, None for the default of the configuration
    #[builder(default = "None")]
    pub upper_bound: Option<f64>,
}

impl Reaction {
    /// Create a reaction without compounds and with default bounds
    pub fn new(id: &str, reversible: bool) -> Self {
        Reaction {
            id: id.to_string(),
            name: None,
            compounds: IndexMap::new(),
            reversible,
            lower_bound: None,
            upper_bound: None,
        }
    }

    /// Add a compound with the given stoichiometric coefficient
    pub fn with_compound(mut self, compound: impl Into<Compound>, coefficient: f64) -> Self {
        *self.compounds.entry(compound.into()).or_insert(0.) += coefficient;
        self
    }

    /// Set explicit flux bounds
    pub fn with_bounds(mut self, lower: f64, upper: f64) -> Self {
        self.lower_bound = Some(lower);
        self.upper_bound = Some(upper);
        self
    }

    /// Flux bounds of the reaction
    ///
    /// Missing bounds come from the configuration, irreversible reactions default to a
    /// lower bound of zero.
    pub fn limits(&self) -> (f64, f64) {
        let config = configuration::read();
        let lower = self.lower_bound.unwrap_or(if self.reversible {
            config.lower_bound
        } else {
            0.
        });
        let upper = self.upper_bound.unwrap_or(config.upper_bound);
        (lower, upper)
    }

    /// Stoichiometric coefficient of a compound, zero if it does not take part
    pub fn coefficient(&self, compound: &Compound) -> f64 {
        self.compounds.get(compound).copied().unwrap_or(0.)
    }

    /// Whether the reaction only consumes or only produces compounds
    ///
    /// Such reactions move compounds across the boundary of the system.
    pub fn is_exchange(&self) -> bool {
        let mut coefficients = self.compounds.values().filter(|c| **c != 0.);
        match coefficients.next() {
            Some(first) => {
                let sign = first.signum();
                coefficients.all(|c| c.signum() == sign)
            }
            None => false,
        }
    }
}

/// Format one side of a reaction equation
fn format_side<'a, I: Iterator<Item = (&'a Compound, f64)>>(side: I) -> String {
    let parts: Vec<String> = side
        .map(|(compound, coefficient)| {
            if coefficient == 1. {
                format!("|{}|", compound)
            } else {
                format!("({}) |{}|", coefficient, compound)
            }
        })
        .collect();
    parts.join(" + ")
}

impl Display for Reaction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let left = format_side(
            self.compounds
                .iter()
                .filter(|(_, c)| **c < 0.)
                .map(|(compound, c)| (compound, -c)),
        );
        let right = format_side(
            self.compounds
                .iter()
                .filter(|(_, c)| **c > 0.)
                .map(|(compound, c)| (compound, *c)),
        );
        let arrow = if self.reversible { "<=>" } else { "=>" };
        write!(f, "{} {} {}", left, arrow, right)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_limits() {
        let irreversible = Reaction::new("r1", false);
        assert_eq!(irreversible.limits(), (0., 1000.));
        let reversible = Reaction::new("r2", true);
        assert_eq!(reversible.limits(), (-1000., 1000.));
        let bounded = Reaction::new("r3", true).with_bounds(-5., 10.);
        assert_eq!(bounded.limits(), (-5., 10.));
    }

    #[test]
    fn builder() {
        let reaction = ReactionBuilder::default()
            .id("rxn_1")
            .name(Some("Test reaction".to_string()))
            .upper_bound(Some(20.))
            .build()
            .unwrap()
            .with_compound("A", -1.)
            .with_compound("B", 2.);
        assert!(!reaction.reversible);
        assert_eq!(reaction.limits(), (0., 20.));
        assert_eq!(reaction.coefficient(&Compound::new("B")), 2.);
        assert_eq!(reaction.coefficient(&Compound::new("C")), 0.);
        assert_eq!(format!("{}", reaction), "|A| => (2) |B|");
    }

    #[test]
    fn exchange_reactions() {
        let uptake = Reaction::new("ex_a", true).with_compound("A", 1.);
        assert!(uptake.is_exchange());
        let conversion = Reaction::new("a_b", false)
            .with_compound("A", -1.)
            .with_compound("B", 1.);
        assert!(!conversion.is_exchange());
        assert!(!Reaction::new("empty", false).is_exchange());
    }
}
