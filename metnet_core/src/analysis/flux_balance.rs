//! Flux Balance Analysis
use std::collections::BTreeSet;

use indexmap::IndexMap;
use log::{debug, info};
use thiserror::Error;

use crate::analysis::fastcore::support;
use crate::analysis::{add_mass_balance, collect_fluxes, define_fluxes, flux_variable};
use crate::metabolic_model::model::MetabolicModel;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::ProblemError;
use crate::optimize::solvers::Solver;

/// Maximize the flux of `reaction` at steady state
///
/// Returns the flux of every reaction of the model, in model order. Each call builds a
/// fresh problem.
///
/// # Examples
/// ```rust
/// use metnet_core::analysis::flux_balance::flux_balance;
/// use metnet_core::metabolic_model::model::MetabolicModel;
/// use metnet_core::metabolic_model::reaction::Reaction;
/// use metnet_core::optimize::solvers::clarabel::ClarabelSolver;
/// let model = MetabolicModel::from_reactions([
///     Reaction::new("uptake", false).with_compound("A", 1.).with_bounds(0., 10.),
///     Reaction::new("biomass", false).with_compound("A", -1.),
/// ])
/// .unwrap();
/// let fluxes = flux_balance(&model, "biomass", &ClarabelSolver::default()).unwrap();
/// assert!((fluxes["biomass"] - 10.).abs() < 1e-5);
/// ```
pub fn flux_balance(
    model: &MetabolicModel,
    reaction: &str,
    solver: &dyn Solver,
) -> Result<IndexMap<String, f64>, FluxBalanceError> {
    if !model.has_reaction(reaction) {
        return Err(FluxBalanceError::UnknownReaction(reaction.to_string()));
    }
    let mut problem = solver.create_problem();
    define_fluxes(&mut problem, model, |_, limits| limits)?;
    problem.set_linear_objective(flux_variable(reaction))?;
    add_mass_balance(&mut problem, model)?;

    let result = problem.solve(Some(ObjectiveSense::Maximize))?;
    if !result.success()? {
        return Err(FluxBalanceError::NonOptimalSolution {
            status: result.status()?.to_string(),
        });
    }
    Ok(collect_fluxes(&result, model)?)
}

/// Find the reactions of `subset` that can't carry flux, one flux balance at a time
///
/// Each unresolved reaction is maximized in turn (lexicographic order), and every reaction
/// carrying at least `epsilon` in the solution is marked consistent. Reversible reactions
/// that can't carry flux forward are retried in the reverse direction. Much slower than
/// [`crate::analysis::fastcore::fastcc`], but useful to cross check it.
pub fn naive_consistency_check(
    model: &MetabolicModel,
    subset: &BTreeSet<String>,
    epsilon: f64,
    solver: &dyn Solver,
) -> Result<BTreeSet<String>, FluxBalanceError> {
    let mut remaining = subset.clone();
    let mut inconsistent = BTreeSet::new();
    while let Some(reaction) = remaining.pop_first() {
        info!("{} left, checking {}", remaining.len() + 1, reaction);
        let active = support(&flux_balance(model, &reaction, solver)?, epsilon);
        remaining.retain(|r| !active.contains(r));
        if active.contains(&reaction) {
            continue;
        }
        if model.is_reversible(&reaction) {
            let reversed = model.flipped([&reaction]);
            let active = support(&flux_balance(&reversed, &reaction, solver)?, epsilon);
            remaining.retain(|r| !active.contains(r));
            if active.contains(&reaction) {
                continue;
            }
        }
        debug!("{} is not consistent", reaction);
        inconsistent.insert(reaction);
    }
    Ok(inconsistent)
}

/// Errors raised by flux balance analysis
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FluxBalanceError {
    /// The solver did not find an optimal solution
    #[error("Non-optimal solution: {status}")]
    NonOptimalSolution { status: String },
    /// The objective reaction is not part of the model
    #[error("Reaction {0} is not part of the model")]
    UnknownReaction(String),
    #[error(transparent)]
    Problem(#[from] ProblemError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_models::vlassis;
    use crate::metabolic_model::reaction::Reaction;
    use crate::optimize::solvers::clarabel::ClarabelSolver;

    fn chain() -> MetabolicModel {
        MetabolicModel::from_reactions([
            Reaction::new("ex_a", true)
                .with_compound("A", 1.)
                .with_bounds(-10., 10.),
            Reaction::new("a_b", false)
                .with_compound("A", -1.)
                .with_compound("B", 1.),
            Reaction::new("biomass", false).with_compound("B", -1.),
        ])
        .unwrap()
    }

    #[test]
    fn maximize_biomass() {
        let fluxes = flux_balance(&chain(), "biomass", &ClarabelSolver::default()).unwrap();
        assert_eq!(
            fluxes.keys().collect::<Vec<_>>(),
            vec!["ex_a", "a_b", "biomass"]
        );
        for flux in fluxes.values() {
            assert!((flux - 10.).abs() < 1e-5);
        }
    }

    #[test]
    fn flipped_reaction_is_maximized_in_reverse() {
        let model = chain().flipped(["ex_a"]);
        // Uptake is now negative flux of the flipped exchange, so maximizing it means no
        // uptake at all
        let fluxes = flux_balance(&model, "ex_a", &ClarabelSolver::default()).unwrap();
        assert!(fluxes["ex_a"].abs() < 1e-5);
    }

    #[test]
    fn unknown_reaction() {
        assert_eq!(
            flux_balance(&chain(), "missing", &ClarabelSolver::default()),
            Err(FluxBalanceError::UnknownReaction("missing".to_string()))
        );
    }

    #[test]
    fn infeasible_model() {
        let mut model = chain();
        model
            .add_reaction(
                Reaction::new("forced", false)
                    .with_compound("C", 1.)
                    .with_bounds(5., 10.),
            )
            .unwrap();
        let result = flux_balance(&model, "biomass", &ClarabelSolver::default());
        assert!(matches!(
            result,
            Err(FluxBalanceError::NonOptimalSolution { .. })
        ));
    }

    #[test]
    fn naive_check_finds_dead_end() {
        let model = vlassis();
        let subset: BTreeSet<String> = model.reactions().map(String::from).collect();
        let inconsistent =
            naive_consistency_check(&model, &subset, 0.001, &ClarabelSolver::default()).unwrap();
        assert_eq!(inconsistent, BTreeSet::from(["rxn_2".to_string()]));
    }
}
