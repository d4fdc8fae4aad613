//! Constraint based analyses of metabolic models
//!
//! Every analysis builds fresh problems through the [`crate::optimize::solvers::Solver`] it
//! is given, so the same solver can be shared between calls.

pub mod fastcore;
pub mod flux_balance;
pub mod formula_check;
pub mod mass_consistency;

use indexmap::IndexMap;

use crate::metabolic_model::model::MetabolicModel;
use crate::optimize::expression::Expression;
use crate::optimize::problem::{Problem, ProblemError, ProblemResult};
use crate::optimize::variable::VariableName;

/// Name of the flux variable of a reaction
pub(crate) fn flux_variable(reaction: &str) -> VariableName {
    VariableName::new("v", reaction)
}

/// Define one flux variable per reaction, with bounds derived from the model limits
pub(crate) fn define_fluxes<F>(
    problem: &mut Problem,
    model: &MetabolicModel,
    bounds: F,
) -> Result<(), ProblemError>
where
    F: Fn(&str, (f64, f64)) -> (f64, f64),
{
    for (id, limits) in model.reaction_limits() {
        let (lower, upper) = bounds(id, limits);
        problem.define([flux_variable(id)], Some(lower), Some(upper))?;
    }
    Ok(())
}

/// Add the steady state constraint `S v = 0`, one row per compound
pub(crate) fn add_mass_balance(
    problem: &mut Problem,
    model: &MetabolicModel,
) -> Result<(), ProblemError> {
    let relations = model
        .matrix()
        .into_values()
        .map(|row| {
            row.iter()
                .map(|(reaction, coefficient)| {
                    Expression::variable(flux_variable(reaction)).scale(*coefficient)
                })
                .sum::<Expression>()
                .equal(&Expression::new())
        })
        .collect::<Vec<_>>();
    problem.add_linear_constraints(relations)
}

/// Flux of every reaction of the model in a solved problem
pub(crate) fn collect_fluxes(
    result: &ProblemResult,
    model: &MetabolicModel,
) -> Result<IndexMap<String, f64>, ProblemError> {
    model
        .reactions()
        .map(|id| Ok((id.to_string(), result.get_value(flux_variable(id))?)))
        .collect()
}

#[cfg(test)]
pub(crate) mod test_models {
    use crate::metabolic_model::model::MetabolicModel;
    use crate::metabolic_model::reaction::Reaction;

    /// Six reaction network of Vlassis et al. (2014)
    ///
    /// rxn_2 is the only flux inconsistent reaction, B is a dead end.
    pub fn vlassis() -> MetabolicModel {
        MetabolicModel::from_reactions([
            Reaction::new("rxn_1", false).with_compound("A", 2.),
            Reaction::new("rxn_2", true)
                .with_compound("A", -1.)
                .with_compound("B", 1.),
            Reaction::new("rxn_3", false)
                .with_compound("A", -1.)
                .with_compound("D", 1.),
            Reaction::new("rxn_4", false)
                .with_compound("A", -1.)
                .with_compound("C", 1.),
            Reaction::new("rxn_5", false)
                .with_compound("C", -1.)
                .with_compound("D", 1.),
            Reaction::new("rxn_6", false).with_compound("D", -1.),
        ])
        .unwrap()
    }
}
