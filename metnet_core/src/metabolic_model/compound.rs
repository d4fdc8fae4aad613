//! This module provides the compound struct, a metabolite in a given compartment

use std::fmt::{Display, Formatter};

use derive_builder::Builder;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents a compound, optionally localized in a compartment
///
/// Two compounds are the same when both the id and the compartment match, so `A[c]` and
/// `A[e]` are different compounds of a model.
#[derive(Builder, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Compound {
    /// Used to identify the compound
    #[builder(setter(into))]
    pub id: String,
    /// Which compartment the compound is in
    #[builder(setter(into, strip_option), default = "None")]
    pub compartment: Option<String>,
}

impl Compound {
    /// Create a compound without compartment
    pub fn new(id: &str) -> Self {
        Compound {
            id: id.to_string(),
            compartment: None,
        }
    }

    /// Return the same compound localized in another compartment
    ///
    /// `in_compartment(None)` collapses the localization, which is how mass consistency
    /// treats `A[c]` and `A[e]` as one compound.
    pub fn in_compartment(&self, compartment: Option<&str>) -> Compound {
        Compound {
            id: self.id.clone(),
            compartment: compartment.map(str::to_string),
        }
    }
}

impl From<&str> for Compound {
    fn from(id: &str) -> Self {
        Compound::new(id)
    }
}

impl Display for Compound {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.compartment {
            Some(compartment) => write!(f, "{}[{}]", self.id, compartment),
            None => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compartments() {
        let cytosol = CompoundBuilder::default()
            .id("glc")
            .compartment("c")
            .build()
            .unwrap();
        let extracellular = cytosol.in_compartment(Some("e"));
        assert_ne!(cytosol, extracellular);
        assert_eq!(cytosol.in_compartment(None), extracellular.in_compartment(None));
        assert_eq!(cytosol.in_compartment(None), Compound::from("glc"));
        assert_eq!(format!("{}", cytosol), "glc[c]");
        assert_eq!(format!("{}", Compound::new("atp")), "atp");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serialize() {
        let compound = Compound::new("A").in_compartment(Some("c"));
        let json = serde_json::to_string(&compound).unwrap();
        assert_eq!(json, r#"{"id":"A","compartment":"c"}"#);
        let back: Compound = serde_json::from_str(&json).unwrap();
        assert_eq!(back, compound);
    }
}
