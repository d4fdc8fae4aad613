//! This module provides the MetabolicModel struct, the network read by the analysis functions
use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::metabolic_model::compound::Compound;
use crate::metabolic_model::reaction::Reaction;

/// Represents a metabolic network
///
/// The analysis functions never change a model. Probing the reverse direction of reactions
/// is done on a [`MetabolicModel::flipped`] copy, which negates the stoichiometry and
/// bounds of the listed reactions in every derived view ([`MetabolicModel::matrix`],
/// [`MetabolicModel::limits`], [`MetabolicModel::stoichiometry`]).
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetabolicModel {
    /// Id associated with the model
    pub id: Option<String>,
    /// Map of reaction ids to reactions, in insertion order
    reactions: IndexMap<String, Reaction>,
    /// Reactions whose direction is reversed in this view
    #[cfg_attr(feature = "serde", serde(default))]
    flipped: BTreeSet<String>,
}

impl MetabolicModel {
    pub fn new_empty() -> Self {
        MetabolicModel::default()
    }

    /// Create a model from reactions
    ///
    /// # Examples
    /// ```rust
    /// use metnet_core::metabolic_model::model::MetabolicModel;
    /// use metnet_core::metabolic_model::reaction::Reaction;
    /// let model = MetabolicModel::from_reactions([
    ///     Reaction::new("uptake", false).with_compound("A", 1.),
    ///     Reaction::new("a_to_b", true).with_compound("A", -1.).with_compound("B", 1.),
    /// ])
    /// .unwrap();
    /// assert_eq!(model.reactions().count(), 2);
    /// ```
    pub fn from_reactions<I>(reactions: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = Reaction>,
    {
        let mut model = MetabolicModel::new_empty();
        for reaction in reactions {
            model.add_reaction(reaction)?;
        }
        Ok(model)
    }

    /// Add a reaction to the model
    pub fn add_reaction(&mut self, reaction: Reaction) -> Result<(), ModelError> {
        if self.reactions.contains_key(&reaction.id) {
            return Err(ModelError::DuplicateReaction(reaction.id));
        }
        self.reactions.insert(reaction.id.clone(), reaction);
        Ok(())
    }

    /// Remove a reaction from the model, returning it if present
    pub fn remove_reaction(&mut self, id: &str) -> Option<Reaction> {
        self.flipped.remove(id);
        self.reactions.shift_remove(id)
    }

    /// The reaction as it was added, without any flipping applied
    pub fn reaction(&self, id: &str) -> Option<&Reaction> {
        self.reactions.get(id)
    }

    pub fn has_reaction(&self, id: &str) -> bool {
        self.reactions.contains_key(id)
    }

    /// Ids of all reactions in model order
    pub fn reactions(&self) -> impl Iterator<Item = &str> {
        self.reactions.keys().map(String::as_str)
    }

    /// All compounds taking part in a reaction, in order of first appearance
    pub fn compounds(&self) -> IndexSet<Compound> {
        self.reactions
            .values()
            .flat_map(|r| r.compounds.keys())
            .cloned()
            .collect()
    }

    /// Stoichiometry of a reaction in this view
    pub fn stoichiometry(&self, id: &str) -> Vec<(Compound, f64)> {
        let sign = self.direction(id);
        self.reactions
            .get(id)
            .map(|reaction| {
                reaction
                    .compounds
                    .iter()
                    .filter(|(_, c)| **c != 0.)
                    .map(|(compound, c)| (compound.clone(), sign * c))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Stoichiometric matrix by row, compound to the reactions it takes part in
    pub fn matrix(&self) -> IndexMap<Compound, Vec<(String, f64)>> {
        let mut matrix: IndexMap<Compound, Vec<(String, f64)>> = IndexMap::new();
        for id in self.reactions.keys() {
            for (compound, coefficient) in self.stoichiometry(id) {
                matrix
                    .entry(compound)
                    .or_default()
                    .push((id.clone(), coefficient));
            }
        }
        matrix
    }

    /// Flux bounds of a reaction in this view, None for unknown reactions
    pub fn limits(&self, id: &str) -> Option<(f64, f64)> {
        let (lower, upper) = self.reactions.get(id)?.limits();
        if self.flipped.contains(id) {
            Some((-upper, -lower))
        } else {
            Some((lower, upper))
        }
    }

    /// Flux bounds of every reaction in this view, in model order
    pub fn reaction_limits(&self) -> impl Iterator<Item = (&str, (f64, f64))> {
        self.reactions.keys().filter_map(move |id| {
            let limits = self.limits(id)?;
            Some((id.as_str(), limits))
        })
    }

    pub fn is_reversible(&self, id: &str) -> bool {
        self.reactions.get(id).is_some_and(|r| r.reversible)
    }

    /// Ids of all reversible reactions
    pub fn reversible(&self) -> BTreeSet<String> {
        self.reactions
            .values()
            .filter(|r| r.reversible)
            .map(|r| r.id.clone())
            .collect()
    }

    /// Ids of all reactions that only consume or only produce compounds
    pub fn exchange_reactions(&self) -> BTreeSet<String> {
        self.reactions
            .values()
            .filter(|r| r.is_exchange())
            .map(|r| r.id.clone())
            .collect()
    }

    /// Whether the direction of a reaction is reversed in this view
    pub fn is_flipped(&self, id: &str) -> bool {
        self.flipped.contains(id)
    }

    /// Copy of the model with the direction of the given reactions reversed
    ///
    /// Flipping an already flipped reaction restores its original direction. Unknown ids
    /// are ignored.
    pub fn flipped<I, S>(&self, reactions: I) -> MetabolicModel
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut model = self.clone();
        for id in reactions {
            let id = id.as_ref();
            if !model.reactions.contains_key(id) {
                continue;
            }
            if !model.flipped.remove(id) {
                model.flipped.insert(id.to_string());
            }
        }
        model
    }

    /// Copy of the model restricted to the given reactions
    pub fn subset<I, S>(&self, reactions: I) -> MetabolicModel
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keep: BTreeSet<String> = reactions
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        MetabolicModel {
            id: self.id.clone(),
            reactions: self
                .reactions
                .iter()
                .filter(|(id, _)| keep.contains(*id))
                .map(|(id, r)| (id.clone(), r.clone()))
                .collect(),
            flipped: self.flipped.intersection(&keep).cloned().collect(),
        }
    }

    fn direction(&self, id: &str) -> f64 {
        if self.flipped.contains(id) {
            -1.
        } else {
            1.
        }
    }
}

/// Errors raised when building a model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Reaction {0} is already part of the model")]
    DuplicateReaction(String),
}
