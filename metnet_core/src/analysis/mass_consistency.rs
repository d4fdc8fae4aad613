//! Mass consistency analysis of metabolic models
//!
//! A stoichiometric matrix `S` is mass consistent if `S'm = 0` has a solution with every
//! `m_i > 0`, i.e. a positive mass can be assigned to each compound such that every
//! reaction preserves mass. Exchange reactions can't preserve mass and are left out of the
//! balance, as are pseudo compounds (e.g. photons) flagged as allowed to have zero mass.
//!
//! Compounds are compared without their compartment, `A[c]` and `A[e]` share one mass.
use std::collections::{BTreeMap, BTreeSet};

use derive_builder::Builder;
use indexmap::{IndexMap, IndexSet};
use thiserror::Error;

use crate::metabolic_model::compound::Compound;
use crate::metabolic_model::model::MetabolicModel;
use crate::optimize::expression::Expression;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{Problem, ProblemError, ProblemResult};
use crate::optimize::solvers::Solver;
use crate::optimize::variable::VariableName;

/// Options shared by the mass consistency checks
///
/// # Examples
/// ```rust
/// use metnet_core::analysis::mass_consistency::MassConsistencyOptionsBuilder;
/// use metnet_core::metabolic_model::compound::Compound;
/// let options = MassConsistencyOptionsBuilder::default()
///     .exchange(["ex_glc".to_string()].into())
///     .zeromass([Compound::new("photon")].into())
///     .build()
///     .unwrap();
/// assert!(options.weights.is_empty());
/// ```
#[derive(Builder, Debug, Clone, Default, PartialEq)]
pub struct MassConsistencyOptions {
    /// Reactions left out of the mass balance
    #[builder(default)]
    pub exchange: BTreeSet<String>,
    /// Compounds allowed to have zero mass
    #[builder(default)]
    pub zeromass: BTreeSet<Compound>,
    /// Weight of the residual of each reaction, 1 when absent
    #[builder(default)]
    pub weights: BTreeMap<String, f64>,
}

impl MassConsistencyOptions {
    fn is_zeromass(&self, compound: &Compound) -> bool {
        self.zeromass.contains(compound) || self.zeromass.contains(&compound.in_compartment(None))
    }

    fn weight(&self, reaction: &str) -> f64 {
        self.weights.get(reaction).copied().unwrap_or(1.)
    }
}

/// Outcome of [`check_reaction_consistency`]
#[derive(Debug, Clone, PartialEq)]
pub struct ReactionConsistency {
    /// Mass residual of each non-exchange reaction
    pub residuals: IndexMap<String, f64>,
    /// Mass assigned to each compound
    pub masses: IndexMap<Compound, f64>,
}

fn non_localized_compounds(model: &MetabolicModel) -> IndexSet<Compound> {
    model
        .compounds()
        .iter()
        .map(|c| c.in_compartment(None))
        .collect()
}

fn mass_variable(compound: &Compound) -> VariableName {
    VariableName::new("m", &compound.id)
}

/// `Σ S[c, r] m_c` of a reaction
fn mass_balance(model: &MetabolicModel, reaction: &str) -> Expression {
    model
        .stoichiometry(reaction)
        .iter()
        .map(|(compound, coefficient)| {
            Expression::variable(mass_variable(&compound.in_compartment(None))).scale(*coefficient)
        })
        .sum()
}

/// Reactions taking part in the mass balance
fn balanced_reactions<'a>(
    model: &'a MetabolicModel,
    options: &'a MassConsistencyOptions,
) -> impl Iterator<Item = &'a str> {
    model
        .reactions()
        .filter(move |r| !options.exchange.contains(*r))
}

/// Define mass variables with a lower bound of 1, or 0 for zero mass compounds
fn define_masses(
    problem: &mut Problem,
    compounds: &IndexSet<Compound>,
    options: &MassConsistencyOptions,
) -> Result<(), ProblemError> {
    for compound in compounds {
        let lower = if options.is_zeromass(compound) { 0. } else { 1. };
        problem.define([mass_variable(compound)], Some(lower), None)?;
    }
    Ok(())
}

fn collect_masses(
    result: &ProblemResult,
    compounds: &IndexSet<Compound>,
) -> Result<IndexMap<Compound, f64>, ProblemError> {
    compounds
        .iter()
        .map(|c| Ok((c.clone(), result.get_value(mass_variable(c))?)))
        .collect()
}

fn ensure_optimal(result: &ProblemResult) -> Result<(), MassConsistencyError> {
    if !result.success()? {
        return Err(MassConsistencyError::NonOptimalSolution {
            status: result.status()?.to_string(),
        });
    }
    Ok(())
}

/// Try to assign a mass of at least one to every compound
///
/// Returns whether such an assignment exists, which proves the model mass consistent.
pub fn is_consistent(
    model: &MetabolicModel,
    options: &MassConsistencyOptions,
    solver: &dyn Solver,
) -> Result<bool, MassConsistencyError> {
    let mut problem = solver.create_problem();
    let compounds = non_localized_compounds(model);
    define_masses(&mut problem, &compounds, options)?;
    problem.set_linear_objective(
        compounds
            .iter()
            .map(|c| Expression::variable(mass_variable(c)))
            .sum::<Expression>(),
    )?;

    let relations = balanced_reactions(model, options)
        .map(|r| mass_balance(model, r).equal(&Expression::new()))
        .collect::<Vec<_>>();
    problem.add_linear_constraints(relations)?;

    let result = problem.solve(Some(ObjectiveSense::Minimize))?;
    Ok(result.success()?)
}

/// Find the reactions that break mass consistency by minimizing the mass residuals
///
/// Every compound gets a mass of at least one and every non-exchange reaction a residual
/// `r` included in its mass balance, `Σ S m + r = 0`. The weighted L1 norm of the
/// residuals is minimized, so the reactions left with a non zero residual are the likely
/// culprits.
pub fn check_reaction_consistency(
    model: &MetabolicModel,
    options: &MassConsistencyOptions,
    solver: &dyn Solver,
) -> Result<ReactionConsistency, MassConsistencyError> {
    let mut problem = solver.create_problem();
    let compounds = non_localized_compounds(model);
    define_masses(&mut problem, &compounds, options)?;

    let reactions: Vec<&str> = balanced_reactions(model, options).collect();
    problem.define(reactions.iter().map(|r| ("z", *r)), Some(0.), None)?;
    problem.define(reactions.iter().map(|r| ("r", *r)), None, None)?;
    problem.set_linear_objective(
        reactions
            .iter()
            .map(|r| Expression::variable(("z", *r)).scale(options.weight(r)))
            .sum::<Expression>(),
    )?;

    let residual = problem.set(reactions.iter().map(|r| ("r", *r)))?;
    let slack = problem.set(reactions.iter().map(|r| ("z", *r)))?;
    let mut relations = vec![
        slack.greater_equal(&residual),
        residual.greater_equal(&slack.negate()),
    ];
    relations.extend(reactions.iter().map(|r| {
        (mass_balance(model, r) + Expression::variable(("r", *r))).equal(&Expression::new())
    }));
    problem.add_linear_constraints(relations)?;

    let result = problem.solve(Some(ObjectiveSense::Minimize))?;
    ensure_optimal(&result)?;

    let residuals = reactions
        .iter()
        .map(|r| Ok((r.to_string(), result.get_value(("r", *r))?)))
        .collect::<Result<IndexMap<_, _>, ProblemError>>()?;
    Ok(ReactionConsistency {
        residuals,
        masses: collect_masses(&result, &compounds)?,
    })
}

/// Assign a mass to every compound, maximizing the number of compounds with positive mass
///
/// Maximizing the count needs integer variables, so the linear relaxation of Thiele et al.
/// is used instead: `z_c ∈ [0, 1]`, `m_c ≥ z_c` and `Σ z_c` is maximized.
pub fn check_compound_consistency(
    model: &MetabolicModel,
    options: &MassConsistencyOptions,
    solver: &dyn Solver,
) -> Result<IndexMap<Compound, f64>, MassConsistencyError> {
    let mut problem = solver.create_problem();
    let compounds = non_localized_compounds(model);
    problem.define(compounds.iter().map(mass_variable), Some(0.), None)?;
    problem.define(
        compounds.iter().map(|c| ("z", c.id.as_str())),
        Some(0.),
        Some(1.),
    )?;
    let z = problem.set(compounds.iter().map(|c| ("z", c.id.as_str())))?;
    let m = problem.set(compounds.iter().map(mass_variable))?;
    problem.set_linear_objective(z.clone())?;

    let mut relations = vec![m.greater_equal(&z)];
    relations.extend(
        balanced_reactions(model, options).map(|r| mass_balance(model, r).equal(&Expression::new())),
    );
    problem.add_linear_constraints(relations)?;

    let result = problem.solve(Some(ObjectiveSense::Maximize))?;
    ensure_optimal(&result)?;
    Ok(collect_masses(&result, &compounds)?)
}

/// Errors raised by the mass consistency checks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MassConsistencyError {
    /// The solver did not find an optimal solution
    #[error("Non-optimal solution: {status}")]
    NonOptimalSolution { status: String },
    #[error(transparent)]
    Problem(#[from] ProblemError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metabolic_model::reaction::Reaction;
    use crate::optimize::solvers::clarabel::ClarabelSolver;

    /// `A + B <=> AB` with uptake of A and B, balanced by construction
    fn balanced() -> MetabolicModel {
        MetabolicModel::from_reactions([
            Reaction::new("bind", true)
                .with_compound(Compound::new("A").in_compartment(Some("c")), -1.)
                .with_compound(Compound::new("B").in_compartment(Some("c")), -1.)
                .with_compound(Compound::new("AB").in_compartment(Some("c")), 1.),
            Reaction::new("transport", true)
                .with_compound(Compound::new("A").in_compartment(Some("e")), -1.)
                .with_compound(Compound::new("A").in_compartment(Some("c")), 1.),
            Reaction::new("ex_a", true)
                .with_compound(Compound::new("A").in_compartment(Some("e")), 1.),
            Reaction::new("ex_b", true)
                .with_compound(Compound::new("B").in_compartment(Some("c")), 1.),
        ])
        .unwrap()
    }

    fn exchange() -> MassConsistencyOptions {
        MassConsistencyOptionsBuilder::default()
            .exchange(["ex_a".to_string(), "ex_b".to_string()].into())
            .build()
            .unwrap()
    }

    /// `A => 2 A` can't preserve mass unless A is massless
    fn unbalanced() -> MetabolicModel {
        MetabolicModel::from_reactions([
            Reaction::new("double", false).with_compound("A", 1.),
            Reaction::new("convert", false)
                .with_compound("A", -1.)
                .with_compound("B", 1.),
        ])
        .unwrap()
    }

    #[test]
    fn balanced_model_is_consistent() {
        let solver = ClarabelSolver::default();
        assert!(is_consistent(&balanced(), &exchange(), &solver).unwrap());

        let check = check_reaction_consistency(&balanced(), &exchange(), &solver).unwrap();
        assert_eq!(
            check.residuals.keys().collect::<Vec<_>>(),
            vec!["bind", "transport"]
        );
        for residual in check.residuals.values() {
            assert!(residual.abs() < 1e-4);
        }
        for mass in check.masses.values() {
            assert!(*mass >= 1. - 1e-6);
        }
        let mass = |id: &str| check.masses[&Compound::new(id)];
        assert!((mass("AB") - mass("A") - mass("B")).abs() < 1e-4 * mass("AB"));
    }

    #[test]
    fn exchange_reactions_must_be_excluded() {
        let solver = ClarabelSolver::default();
        let options = MassConsistencyOptions::default();
        assert!(!is_consistent(&balanced(), &options, &solver).unwrap());
    }

    #[test]
    fn zeromass_compounds() {
        let solver = ClarabelSolver::default();
        let model = unbalanced();
        assert!(!is_consistent(&model, &MassConsistencyOptions::default(), &solver).unwrap());

        let options = MassConsistencyOptionsBuilder::default()
            .zeromass([Compound::new("A"), Compound::new("B")].into())
            .build()
            .unwrap();
        assert!(is_consistent(&model, &options, &solver).unwrap());
    }

    #[test]
    fn residual_points_at_unbalanced_reaction() {
        let solver = ClarabelSolver::default();
        let check =
            check_reaction_consistency(&unbalanced(), &MassConsistencyOptions::default(), &solver)
                .unwrap();
        assert_eq!(
            check.residuals.keys().collect::<Vec<_>>(),
            vec!["double", "convert"]
        );
        assert!((check.residuals["double"] + 1.).abs() < 1e-5);
        assert!(check.residuals["convert"].abs() < 1e-5);
        for mass in check.masses.values() {
            assert!((mass - 1.).abs() < 1e-5);
        }
    }

    #[test]
    fn compound_consistency_of_unbalanced_model() {
        let solver = ClarabelSolver::default();
        let masses =
            check_compound_consistency(&unbalanced(), &MassConsistencyOptions::default(), &solver)
                .unwrap();
        assert_eq!(masses.len(), 2);
        for mass in masses.values() {
            assert!(mass.abs() < 1e-5);
        }
    }
}
