//! FastCore family of algorithms
//!
//! Implements the flux consistency check FASTCC and the context specific reconstruction
//! FASTCORE of Vlassis, Pacheco and Sauter (2014), "Fast reconstruction of compact
//! context-specific metabolic network models", together with their building blocks, the
//! LP7 and LP10 programs.
//!
//! A reaction is flux consistent when it can carry a non zero flux at steady state. Both
//! algorithms work on a copy of the model and try the reverse direction of reversible
//! reactions by flipping them, the caller's model is never modified.
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use derive_builder::Builder;
use indexmap::IndexMap;
use log::{debug, info};
use thiserror::Error;

use crate::analysis::{add_mass_balance, collect_fluxes, define_fluxes, flux_variable};
use crate::metabolic_model::model::MetabolicModel;
use crate::optimize::expression::Expression;
use crate::optimize::objective::ObjectiveSense;
use crate::optimize::problem::{ProblemError, ProblemResult};
use crate::optimize::solvers::Solver;

/// Fraction of epsilon a flux must reach to count as active
const SUPPORT_FRACTION: f64 = 0.999;

/// Fraction of the least scaled core flux `ε · scaling` a flux of LP10 must reach to
/// belong to a sparse mode
///
/// Reactions with tiny stoichiometric coefficients carry a flux far below `ε` in a mode
/// and must still count, so this is close to the solver noise rather than to `ε`.
const MODE_FRACTION: f64 = 1e-7;

/// Parameters of LP10 and FASTCORE
///
/// # Examples
/// ```rust
/// use metnet_core::analysis::fastcore::FastcoreOptionsBuilder;
/// let options = FastcoreOptionsBuilder::default()
///     .epsilon(0.001)
///     .scaling(1e3)
///     .build()
///     .unwrap();
/// assert_eq!(options.weight("rxn_1"), 1.);
/// ```
#[derive(Builder, Debug, Clone, PartialEq)]
pub struct FastcoreOptions {
    /// Minimum flux of an active reaction
    pub epsilon: f64,
    /// Factor applied to the flux bounds in LP10
    #[builder(default = "crate::configuration::read().scaling")]
    pub scaling: f64,
    /// Penalty weight of non core reactions in LP10, 1 when absent
    #[builder(default)]
    pub weights: BTreeMap<String, f64>,
}

impl FastcoreOptions {
    /// Options with the given epsilon and default scaling and weights
    pub fn new(epsilon: f64) -> Self {
        FastcoreOptions {
            epsilon,
            scaling: crate::configuration::read().scaling,
            weights: BTreeMap::new(),
        }
    }

    pub fn weight(&self, reaction: &str) -> f64 {
        self.weights.get(reaction).copied().unwrap_or(1.)
    }

    fn threshold(&self) -> f64 {
        SUPPORT_FRACTION * self.epsilon
    }

    fn mode_threshold(&self) -> f64 {
        MODE_FRACTION * self.epsilon * self.scaling
    }
}

/// Reactions with an absolute flux of at least `threshold`
pub fn support(fluxes: &IndexMap<String, f64>, threshold: f64) -> BTreeSet<String> {
    fluxes
        .iter()
        .filter(|(_, v)| v.abs() >= threshold)
        .map(|(id, _)| id.clone())
        .collect()
}

/// Reactions with a forward flux of at least `threshold`
pub fn support_positive(fluxes: &IndexMap<String, f64>, threshold: f64) -> BTreeSet<String> {
    fluxes
        .iter()
        .filter(|(_, v)| **v >= threshold)
        .map(|(id, _)| id.clone())
        .collect()
}

fn ensure_optimal(result: &ProblemResult) -> Result<(), FastcoreError> {
    if !result.success()? {
        return Err(FastcoreError::NonOptimalSolution {
            status: result.status()?.to_string(),
        });
    }
    Ok(())
}

/// Model reactions of `reactions`, in their order
fn known<'a>(model: &MetabolicModel, reactions: &'a BTreeSet<String>) -> Vec<&'a str> {
    reactions
        .iter()
        .map(String::as_str)
        .filter(|r| model.has_reaction(r))
        .collect()
}

/// Maximize the number of reactions of `subset` carrying at least `epsilon` flux (LP7)
///
/// Each reaction of the subset gets a variable `z ∈ [0, ε]` bounded by its flux, and
/// `Σ z` is maximized. Returns the flux of every model reaction.
pub fn lp7(
    model: &MetabolicModel,
    subset: &BTreeSet<String>,
    epsilon: f64,
    solver: &dyn Solver,
) -> Result<IndexMap<String, f64>, FastcoreError> {
    let mut problem = solver.create_problem();
    define_fluxes(&mut problem, model, |_, limits| limits)?;

    let subset = known(model, subset);
    problem.define(subset.iter().map(|r| ("z", *r)), Some(0.), Some(epsilon))?;
    let z = problem.set(subset.iter().map(|r| ("z", *r)))?;
    let v = problem.set(subset.iter().map(|r| flux_variable(r)))?;
    problem.add_linear_constraints([z.less_equal(&v)])?;
    problem.set_linear_objective(z)?;
    add_mass_balance(&mut problem, model)?;

    let result = problem.solve(Some(ObjectiveSense::Maximize))?;
    ensure_optimal(&result)?;
    Ok(collect_fluxes(&result, model)?)
}

/// Find a flux mode activating `core` with the least flux through `non_core` (LP10)
///
/// Core reactions are forced to carry at least `ε` forward, and the weighted L1 norm of
/// the non core fluxes is minimized. All flux bounds are multiplied by the scaling factor
/// to keep the program away from the solver tolerance, the returned fluxes are the scaled
/// ones. An empty core gives an empty result.
pub fn lp10(
    model: &MetabolicModel,
    core: &BTreeSet<String>,
    non_core: &BTreeSet<String>,
    options: &FastcoreOptions,
    solver: &dyn Solver,
) -> Result<IndexMap<String, f64>, FastcoreError> {
    if core.is_empty() {
        return Ok(IndexMap::new());
    }

    let mut problem = solver.create_problem();
    define_fluxes(&mut problem, model, |id, (lower, upper)| {
        let lower = if core.contains(id) {
            lower.max(options.epsilon)
        } else {
            lower
        };
        (lower * options.scaling, upper * options.scaling)
    })?;

    let non_core = known(model, non_core);
    problem.define(non_core.iter().map(|r| ("z", *r)), Some(0.), None)?;
    problem.set_linear_objective(
        non_core
            .iter()
            .map(|r| Expression::variable(("z", *r)).scale(options.weight(r)))
            .sum::<Expression>(),
    )?;
    let z = problem.set(non_core.iter().map(|r| ("z", *r)))?;
    let v = problem.set(non_core.iter().map(|r| flux_variable(r)))?;
    problem.add_linear_constraints([z.greater_equal(&v), z.greater_equal(&v.negate())])?;
    add_mass_balance(&mut problem, model)?;

    let result = problem.solve(Some(ObjectiveSense::Minimize))?;
    ensure_optimal(&result)?;
    Ok(collect_fluxes(&result, model)?)
}

/// Find a sparse flux mode activating as many of the `core` reactions as possible
///
/// LP7 selects the core reactions that can carry flux forward, LP10 then activates them
/// with as little flux as possible through `non_core`. Returns the support of the mode,
/// empty when no core reaction can be activated. As the LP10 fluxes are scaled, a
/// reaction is part of the mode once its flux reaches a small fraction of the least core
/// flux `ε · scaling`, which keeps reactions with tiny coefficients in the mode.
pub fn find_sparse_mode(
    model: &MetabolicModel,
    core: &BTreeSet<String>,
    non_core: &BTreeSet<String>,
    options: &FastcoreOptions,
    solver: &dyn Solver,
) -> Result<BTreeSet<String>, FastcoreError> {
    if core.is_empty() {
        return Ok(BTreeSet::new());
    }

    let fluxes = lp7(model, core, options.epsilon, solver)?;
    let active: BTreeSet<String> = support_positive(&fluxes, options.threshold())
        .intersection(core)
        .cloned()
        .collect();
    if active.is_empty() {
        return Ok(active);
    }

    let fluxes = lp10(model, &active, non_core, options, solver)?;
    Ok(support(&fluxes, options.mode_threshold()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FastccState {
    Start,
    Reversible,
    Finished,
}

/// Iterator over the flux inconsistent reactions of a model (FASTCC)
///
/// Inconsistent irreversible reactions are yielded first, the reversible ones as they are
/// resolved. A solver failure is yielded once as an error and ends the iteration.
pub struct Fastcc<'a> {
    model: MetabolicModel,
    reversible: BTreeSet<String>,
    epsilon: f64,
    solver: &'a dyn Solver,
    state: FastccState,
    /// Inconsistent reactions found but not yielded yet
    pending: VecDeque<String>,
    consistent: BTreeSet<String>,
    /// Reversible reactions left to resolve
    subset: BTreeSet<String>,
    flipped: bool,
    singleton: bool,
}

impl<'a> Fastcc<'a> {
    pub fn new(model: &MetabolicModel, epsilon: f64, solver: &'a dyn Solver) -> Self {
        Fastcc {
            model: model.clone(),
            reversible: model.reversible(),
            epsilon,
            solver,
            state: FastccState::Start,
            pending: VecDeque::new(),
            consistent: BTreeSet::new(),
            subset: BTreeSet::new(),
            flipped: false,
            singleton: false,
        }
    }

    fn threshold(&self) -> f64 {
        SUPPORT_FRACTION * self.epsilon
    }

    /// Check all irreversible reactions with a single LP7
    fn start(&mut self) -> Result<(), FastcoreError> {
        let irreversible: BTreeSet<String> = self
            .model
            .reactions()
            .filter(|r| !self.reversible.contains(*r))
            .map(String::from)
            .collect();
        let fluxes = lp7(&self.model, &irreversible, self.epsilon, self.solver)?;
        self.consistent = support(&fluxes, self.threshold());

        let inconsistent: Vec<String> = irreversible
            .difference(&self.consistent)
            .cloned()
            .collect();
        info!(
            "{} of {} irreversible reactions are inconsistent",
            inconsistent.len(),
            irreversible.len()
        );
        self.pending.extend(inconsistent);

        self.subset = self
            .reversible
            .difference(&self.consistent)
            .cloned()
            .collect();
        self.state = FastccState::Reversible;
        Ok(())
    }

    /// Resolve reversible reactions, all at once or one by one once that stalls
    fn step(&mut self) -> Result<(), FastcoreError> {
        if self.subset.is_empty() {
            self.state = FastccState::Finished;
            return Ok(());
        }
        debug!("{} reversible reactions left", self.subset.len());

        let current: BTreeSet<String> = match (self.singleton, self.subset.first()) {
            (true, Some(first)) => BTreeSet::from([first.clone()]),
            _ => self.subset.clone(),
        };
        let fluxes = lp7(&self.model, &current, self.epsilon, self.solver)?;
        self.consistent.extend(support(&fluxes, self.threshold()));

        if !self.subset.is_disjoint(&self.consistent) {
            self.subset.retain(|r| !self.consistent.contains(r));
            self.flipped = false;
            return Ok(());
        }

        let reversible: BTreeSet<String> = current
            .intersection(&self.reversible)
            .cloned()
            .collect();
        if self.flipped || reversible.is_empty() {
            self.flipped = false;
            if self.singleton {
                self.subset.retain(|r| !current.contains(r));
                debug!("Inconsistent: {:?}", current);
                self.pending.extend(current);
            } else {
                self.singleton = true;
            }
        } else {
            self.model = self.model.flipped(&reversible);
            self.flipped = true;
        }
        Ok(())
    }
}

impl Iterator for Fastcc<'_> {
    type Item = Result<String, FastcoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(reaction) = self.pending.pop_front() {
                return Some(Ok(reaction));
            }
            let step = match self.state {
                FastccState::Start => self.start(),
                FastccState::Reversible => self.step(),
                FastccState::Finished => return None,
            };
            if let Err(error) = step {
                self.state = FastccState::Finished;
                self.pending.clear();
                return Some(Err(error));
            }
        }
    }
}

/// Lazily yield the flux inconsistent reactions of a model
///
/// # Examples
/// ```rust
/// use metnet_core::analysis::fastcore::fastcc;
/// use metnet_core::metabolic_model::model::MetabolicModel;
/// use metnet_core::metabolic_model::reaction::Reaction;
/// use metnet_core::optimize::solvers::clarabel::ClarabelSolver;
/// let model = MetabolicModel::from_reactions([
///     Reaction::new("uptake", false).with_compound("A", 1.),
///     Reaction::new("sink", false).with_compound("A", -1.),
///     Reaction::new("dead_end", true).with_compound("A", -1.).with_compound("B", 1.),
/// ])
/// .unwrap();
/// let solver = ClarabelSolver::default();
/// let inconsistent: Vec<String> = fastcc(&model, 0.001, &solver)
///     .collect::<Result<_, _>>()
///     .unwrap();
/// assert_eq!(inconsistent, vec!["dead_end".to_string()]);
/// ```
pub fn fastcc<'a>(model: &MetabolicModel, epsilon: f64, solver: &'a dyn Solver) -> Fastcc<'a> {
    Fastcc::new(model, epsilon, solver)
}

/// Whether every reaction of the model is flux consistent
///
/// Stops at the first inconsistent reaction.
pub fn fastcc_is_consistent(
    model: &MetabolicModel,
    epsilon: f64,
    solver: &dyn Solver,
) -> Result<bool, FastcoreError> {
    match fastcc(model, epsilon, solver).next() {
        None => Ok(true),
        Some(reaction) => reaction.map(|_| false),
    }
}

/// The flux consistent reactions of a model
pub fn fastcc_consistent_subset(
    model: &MetabolicModel,
    epsilon: f64,
    solver: &dyn Solver,
) -> Result<BTreeSet<String>, FastcoreError> {
    let inconsistent = fastcc(model, epsilon, solver).collect::<Result<BTreeSet<_>, _>>()?;
    Ok(model
        .reactions()
        .filter(|r| !inconsistent.contains(*r))
        .map(String::from)
        .collect())
}

/// Find a small flux consistent subnetwork containing every `core` reaction (FASTCORE)
///
/// The irreversible core reactions are activated first in a single sparse mode. The rest of
/// the core is then added in batches, flipping reversible reactions to try the reverse
/// direction, and one reaction at a time once batches stop making progress. Flux through
/// non core reactions is penalized, so the induced subnetwork stays small.
pub fn fastcore(
    model: &MetabolicModel,
    core: &BTreeSet<String>,
    options: &FastcoreOptions,
    solver: &dyn Solver,
) -> Result<BTreeSet<String>, FastcoreError> {
    let reversible = model.reversible();
    let mut penalty: BTreeSet<String> = model
        .reactions()
        .filter(|r| !core.contains(*r))
        .map(String::from)
        .collect();

    let irreversible: BTreeSet<String> = core.difference(&reversible).cloned().collect();
    let mode = find_sparse_mode(model, &irreversible, &penalty, options, solver)?;
    let missing: BTreeSet<String> = irreversible.difference(&mode).cloned().collect();
    if !missing.is_empty() {
        return Err(FastcoreError::InconsistentIrreversibleCore(missing));
    }
    info!(
        "{} irreversible core reactions activated by a mode of {} reactions",
        irreversible.len(),
        mode.len()
    );

    let mut consistent = mode;
    let mut subset: BTreeSet<String> = core.difference(&consistent).cloned().collect();
    let mut model = model.clone();
    let mut flipped = false;
    let mut singleton = false;
    while !subset.is_empty() {
        debug!("{} core reactions left", subset.len());
        penalty.retain(|r| !consistent.contains(r));

        let current: BTreeSet<String> = match (singleton, subset.first()) {
            (true, Some(first)) => BTreeSet::from([first.clone()]),
            _ => subset.clone(),
        };
        let mode = find_sparse_mode(&model, &current, &penalty, options, solver)?;
        consistent.extend(mode);

        if !subset.is_disjoint(&consistent) {
            subset.retain(|r| !consistent.contains(r));
            flipped = false;
            continue;
        }

        let current_reversible: BTreeSet<String> =
            current.intersection(&reversible).cloned().collect();
        if flipped || current_reversible.is_empty() {
            flipped = false;
            if singleton {
                return Err(FastcoreError::GlobalNetworkInconsistent(current));
            }
            singleton = true;
        } else {
            model = model.flipped(&current_reversible);
            flipped = true;
        }
    }

    info!("Induced subnetwork has {} reactions", consistent.len());
    Ok(consistent)
}

/// Errors raised by the FastCore family
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FastcoreError {
    /// The solver did not find an optimal solution
    #[error("Non-optimal solution: {status}")]
    NonOptimalSolution { status: String },
    /// Irreversible core reactions that can't carry flux
    #[error("Inconsistent irreversible core reactions: {0:?}")]
    InconsistentIrreversibleCore(BTreeSet<String>),
    /// Core reactions that can't carry flux in either direction
    #[error("Global network is not consistent: {0:?}")]
    GlobalNetworkInconsistent(BTreeSet<String>),
    #[error(transparent)]
    Problem(#[from] ProblemError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::test_models::vlassis;
    use crate::metabolic_model::reaction::Reaction;
    use crate::optimize::solvers::clarabel::ClarabelSolver;

    const EPSILON: f64 = 0.001;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn set(reactions: &[&str]) -> BTreeSet<String> {
        reactions.iter().map(|r| r.to_string()).collect()
    }

    fn options() -> FastcoreOptions {
        FastcoreOptionsBuilder::default()
            .epsilon(EPSILON)
            .scaling(1e3)
            .build()
            .unwrap()
    }

    fn weighted(reaction: &str, weight: f64) -> FastcoreOptions {
        FastcoreOptionsBuilder::default()
            .epsilon(EPSILON)
            .scaling(1e3)
            .weights([(reaction.to_string(), weight)].into())
            .build()
            .unwrap()
    }

    fn all_but(model: &MetabolicModel, excluded: &[&str]) -> BTreeSet<String> {
        model
            .reactions()
            .filter(|r| !excluded.contains(r))
            .map(String::from)
            .collect()
    }

    #[test]
    fn support_thresholds() {
        let fluxes: IndexMap<String, f64> = [
            ("a".to_string(), 1.),
            ("b".to_string(), -1.),
            ("c".to_string(), 1e-6),
        ]
        .into();
        assert_eq!(support(&fluxes, 0.5), set(&["a", "b"]));
        assert_eq!(support_positive(&fluxes, 0.5), set(&["a"]));
    }

    #[test]
    fn default_options() {
        let options = FastcoreOptionsBuilder::default()
            .epsilon(EPSILON)
            .build()
            .unwrap();
        assert_eq!(options, FastcoreOptions::new(EPSILON));
        assert!(FastcoreOptionsBuilder::default().build().is_err());
    }

    #[test]
    fn lp7_activates_all_consistent_reactions() {
        let model = vlassis();
        let fluxes = lp7(&model, &all_but(&model, &[]), EPSILON, &ClarabelSolver::default())
            .unwrap();
        assert_eq!(fluxes.len(), 6);
        assert_eq!(
            support_positive(&fluxes, 0.999 * EPSILON),
            set(&["rxn_1", "rxn_3", "rxn_4", "rxn_5", "rxn_6"])
        );
    }

    #[test]
    fn lp7_activates_single_reaction() {
        let model = vlassis();
        let fluxes = lp7(&model, &set(&["rxn_5"]), EPSILON, &ClarabelSolver::default()).unwrap();
        let active = support_positive(&fluxes, 0.999 * EPSILON);
        // rxn_3 may carry flux alongside, an interior point solution usually has it
        assert!(active.is_superset(&set(&["rxn_1", "rxn_4", "rxn_5", "rxn_6"])));
        assert!(!active.contains("rxn_2"));
    }

    #[cfg(feature = "microlp")]
    #[test]
    fn lp7_activates_single_reaction_at_vertex() {
        use crate::optimize::solvers::microlp::MicrolpSolver;

        let model = vlassis();
        let fluxes = lp7(&model, &set(&["rxn_5"]), EPSILON, &MicrolpSolver::default()).unwrap();
        assert_eq!(
            support_positive(&fluxes, 0.999 * EPSILON),
            set(&["rxn_1", "rxn_4", "rxn_5", "rxn_6"])
        );
    }

    #[test]
    fn lp10_minimizes_non_core_flux() {
        let model = vlassis();
        let fluxes = lp10(
            &model,
            &set(&["rxn_6"]),
            &set(&["rxn_1", "rxn_3", "rxn_4", "rxn_5"]),
            &options(),
            &ClarabelSolver::default(),
        )
        .unwrap();
        assert_eq!(
            support(&fluxes, 0.999 * EPSILON),
            set(&["rxn_1", "rxn_3", "rxn_6"])
        );
    }

    #[test]
    fn lp10_weighted() {
        let model = vlassis();
        let solver = ClarabelSolver::default();
        let core = set(&["rxn_6"]);
        let non_core = set(&["rxn_1", "rxn_3", "rxn_4", "rxn_5"]);

        let fluxes = lp10(&model, &core, &non_core, &weighted("rxn_3", 1.), &solver).unwrap();
        assert_eq!(
            support(&fluxes, 0.999 * EPSILON),
            set(&["rxn_1", "rxn_3", "rxn_6"])
        );

        let fluxes = lp10(&model, &core, &non_core, &weighted("rxn_3", 3.), &solver).unwrap();
        assert_eq!(
            support(&fluxes, 0.999 * EPSILON),
            set(&["rxn_1", "rxn_4", "rxn_5", "rxn_6"])
        );
    }

    #[test]
    fn lp10_empty_core() {
        let model = vlassis();
        let fluxes = lp10(
            &model,
            &BTreeSet::new(),
            &all_but(&model, &[]),
            &options(),
            &ClarabelSolver::default(),
        )
        .unwrap();
        assert!(fluxes.is_empty());
    }

    #[test]
    fn sparse_mode_of_single_reactions() {
        let model = vlassis();
        let solver = ClarabelSolver::default();
        let expected: [(&str, &[&str]); 6] = [
            ("rxn_1", &["rxn_1", "rxn_3", "rxn_6"]),
            ("rxn_2", &[]),
            ("rxn_3", &["rxn_1", "rxn_3", "rxn_6"]),
            ("rxn_4", &["rxn_1", "rxn_4", "rxn_5", "rxn_6"]),
            ("rxn_5", &["rxn_1", "rxn_4", "rxn_5", "rxn_6"]),
            ("rxn_6", &["rxn_1", "rxn_3", "rxn_6"]),
        ];
        for (reaction, mode) in expected {
            let found = find_sparse_mode(
                &model,
                &set(&[reaction]),
                &all_but(&model, &[reaction]),
                &options(),
                &solver,
            )
            .unwrap();
            assert_eq!(found, set(mode), "sparse mode of {}", reaction);
        }
    }

    #[test]
    fn sparse_mode_weighted() {
        let model = vlassis();
        let solver = ClarabelSolver::default();
        let core = set(&["rxn_1"]);
        let non_core = all_but(&model, &["rxn_1"]);

        let mode = find_sparse_mode(&model, &core, &non_core, &weighted("rxn_3", 1.), &solver);
        assert_eq!(mode.unwrap(), set(&["rxn_1", "rxn_3", "rxn_6"]));

        let mode = find_sparse_mode(&model, &core, &non_core, &weighted("rxn_3", 3.), &solver);
        assert_eq!(mode.unwrap(), set(&["rxn_1", "rxn_4", "rxn_5", "rxn_6"]));
    }

    #[test]
    fn sparse_mode_of_empty_core() {
        let model = vlassis();
        let mode = find_sparse_mode(
            &model,
            &BTreeSet::new(),
            &all_but(&model, &[]),
            &options(),
            &ClarabelSolver::default(),
        )
        .unwrap();
        assert!(mode.is_empty());
    }

    #[test]
    fn fastcc_finds_inconsistent_reaction() {
        init();
        let model = vlassis();
        let solver = ClarabelSolver::default();
        let inconsistent = fastcc(&model, EPSILON, &solver)
            .collect::<Result<Vec<_>, _>>()
            .unwrap();
        assert_eq!(inconsistent, vec!["rxn_2".to_string()]);
    }

    #[test]
    fn fastcc_is_consistent_after_removal() {
        let mut model = vlassis();
        let solver = ClarabelSolver::default();
        assert!(!fastcc_is_consistent(&model, EPSILON, &solver).unwrap());

        model.remove_reaction("rxn_2");
        assert!(fastcc_is_consistent(&model, EPSILON, &solver).unwrap());
    }

    #[test]
    fn fastcc_consistent_subset_is_stable() {
        let model = vlassis();
        let solver = ClarabelSolver::default();
        let consistent = fastcc_consistent_subset(&model, EPSILON, &solver).unwrap();
        assert_eq!(
            consistent,
            set(&["rxn_1", "rxn_3", "rxn_4", "rxn_5", "rxn_6"])
        );

        let induced = model.subset(&consistent);
        assert_eq!(
            fastcc_consistent_subset(&induced, EPSILON, &solver).unwrap(),
            consistent
        );
    }

    #[test]
    fn fastcc_stops_after_error() {
        let mut model = vlassis();
        // Forced production of a compound nobody consumes makes every LP infeasible
        model
            .add_reaction(
                Reaction::new("forced", false)
                    .with_compound("X", 1.)
                    .with_bounds(1., 10.),
            )
            .unwrap();
        let solver = ClarabelSolver::default();
        let mut iteration = fastcc(&model, EPSILON, &solver);
        assert!(matches!(
            iteration.next(),
            Some(Err(FastcoreError::NonOptimalSolution { .. }))
        ));
        assert!(iteration.next().is_none());
    }

    #[test]
    fn fastcore_global_inconsistent() {
        init();
        let mut model = vlassis();
        model
            .add_reaction(Reaction::new("rxn_7", true).with_compound("E", -1.))
            .unwrap();
        let result = fastcore(
            &model,
            &set(&["rxn_7"]),
            &options(),
            &ClarabelSolver::default(),
        );
        assert_eq!(
            result,
            Err(FastcoreError::GlobalNetworkInconsistent(set(&["rxn_7"])))
        );
    }

    #[test]
    fn fastcore_inconsistent_irreversible_core() {
        let mut model = vlassis();
        model
            .add_reaction(Reaction::new("rxn_7", false).with_compound("E", -1.))
            .unwrap();
        let result = fastcore(
            &model,
            &set(&["rxn_6", "rxn_7"]),
            &options(),
            &ClarabelSolver::default(),
        );
        assert_eq!(
            result,
            Err(FastcoreError::InconsistentIrreversibleCore(set(&["rxn_7"])))
        );
    }

    #[test]
    fn fastcore_irreversible_core() {
        let model = vlassis();
        let induced = fastcore(
            &model,
            &set(&["rxn_4"]),
            &options(),
            &ClarabelSolver::default(),
        )
        .unwrap();
        assert_eq!(induced, set(&["rxn_1", "rxn_4", "rxn_5", "rxn_6"]));
    }

    /// Every reaction is reversible and the core can only be activated in reverse
    fn flipping_model() -> MetabolicModel {
        MetabolicModel::from_reactions([
            Reaction::new("rxn_1", true).with_compound("A", -1.),
            Reaction::new("rxn_2", true)
                .with_compound("A", -1.)
                .with_compound("B", 1.),
            Reaction::new("rxn_3", true)
                .with_compound("C", -1.)
                .with_compound("B", 1.),
            Reaction::new("rxn_4", true).with_compound("C", -1.),
        ])
        .unwrap()
    }

    #[test]
    fn fastcore_flips_reversible_core() {
        init();
        let model = flipping_model();
        let induced = fastcore(
            &model,
            &set(&["rxn_2", "rxn_3"]),
            &options(),
            &ClarabelSolver::default(),
        )
        .unwrap();
        assert_eq!(induced, set(&["rxn_1", "rxn_2", "rxn_3", "rxn_4"]));
        // The caller's model keeps its orientation
        assert!(!model.is_flipped("rxn_2"));
    }

    /// `rxn_2` consumes a millionth of the `A` made by `rxn_1`
    fn tiny_coefficients() -> MetabolicModel {
        MetabolicModel::from_reactions([
            Reaction::new("rxn_1", false).with_compound("A", 1.),
            Reaction::new("rxn_2", false).with_compound("A", -1e-6),
        ])
        .unwrap()
    }

    #[test]
    fn fastcc_tiny_coefficients_are_consistent() {
        init();
        let solver = ClarabelSolver::default();
        assert!(fastcc_is_consistent(&tiny_coefficients(), EPSILON, &solver).unwrap());
    }

    #[test]
    fn sparse_mode_keeps_tiny_fluxes() {
        init();
        let solver = ClarabelSolver::default();
        let model = tiny_coefficients();
        for epsilon in [0.001, 0.1] {
            let options = FastcoreOptions::new(epsilon);
            let mode =
                find_sparse_mode(&model, &set(&["rxn_2"]), &set(&["rxn_1"]), &options, &solver)
                    .unwrap();
            assert_eq!(mode, set(&["rxn_1", "rxn_2"]));
        }
    }

    #[test]
    fn fastcore_keeps_tiny_coefficient_reactions() {
        init();
        let solver = ClarabelSolver::default();
        let model = tiny_coefficients();
        for epsilon in [0.001, 0.1] {
            let induced =
                fastcore(&model, &set(&["rxn_2"]), &FastcoreOptions::new(epsilon), &solver)
                    .unwrap();
            assert_eq!(induced, set(&["rxn_1", "rxn_2"]));
        }
    }
}
