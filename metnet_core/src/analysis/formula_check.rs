//! Check the elemental balance of reactions from compound formulas
use indexmap::IndexMap;
use log::debug;

use crate::formula::{Formula, FormulaError};
use crate::metabolic_model::model::MetabolicModel;

/// A reaction whose two sides don't contain the same elements
#[derive(Debug, Clone, PartialEq)]
pub struct FormulaImbalance {
    pub reaction: String,
    /// Elements to add to the left side to balance the reaction
    pub missing_left: Formula,
    /// Elements to add to the right side to balance the reaction
    pub missing_right: Formula,
}

/// Parse the formula of each compound
///
/// Compounds are keyed by id only, formulas don't depend on the compartment.
///
/// # Examples
/// ```rust
/// use metnet_core::analysis::formula_check::parse_compound_formulas;
/// let formulas = parse_compound_formulas([("h2o", "H2O"), ("o2", "O2")]).unwrap();
/// assert_eq!(formulas["h2o"].to_string(), "H2O");
/// ```
pub fn parse_compound_formulas<'a, I>(formulas: I) -> Result<IndexMap<String, Formula>, FormulaError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    formulas
        .into_iter()
        .map(|(compound, formula)| {
            Formula::parse(formula)
                .map(|f| (compound.to_string(), f))
                .map_err(|source| FormulaError::InvalidCompoundFormula {
                    compound: compound.to_string(),
                    source,
                })
        })
        .collect()
}

/// Report every reaction of the model that is not elementally balanced
///
/// Reactions with a compound lacking a formula, or with a non integer coefficient, can't
/// be checked and are skipped. Fails with [`FormulaError::CountOverflow`] when a side of a
/// reaction holds more atoms than an `i64` can count.
pub fn check_formula_balance(
    model: &MetabolicModel,
    formulas: &IndexMap<String, Formula>,
) -> Result<Vec<FormulaImbalance>, FormulaError> {
    let mut imbalances = Vec::new();
    'reactions: for reaction in model.reactions() {
        let mut left = Formula::new();
        let mut right = Formula::new();
        for (compound, coefficient) in model.stoichiometry(reaction) {
            let Some(formula) = formulas.get(&compound.id) else {
                debug!("Skipping {}, no formula for {}", reaction, compound);
                continue 'reactions;
            };
            if coefficient.fract() != 0. {
                debug!("Skipping {}, non integer coefficient of {}", reaction, compound);
                continue 'reactions;
            }
            // Saturates outside the i64 range, the scaling below then overflows
            let count = coefficient as i64;
            if count < 0 {
                left = left.merge(&formula.scale(count)?.scale(-1)?)?;
            } else {
                right = right.merge(&formula.scale(count)?)?;
            }
        }

        let (missing_left, missing_right) = Formula::balance(&left, &right)?;
        if !missing_left.is_empty() || !missing_right.is_empty() {
            imbalances.push(FormulaImbalance {
                reaction: reaction.to_string(),
                missing_left,
                missing_right,
            });
        }
    }
    Ok(imbalances)
}
