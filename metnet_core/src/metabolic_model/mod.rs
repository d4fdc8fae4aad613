//! Module providing the MetabolicModel struct for representing a metabolic network.

pub mod compound;
pub mod model;
pub mod reaction;
