//! Core rust implementation of metnet, a crate for constraint based analysis of metabolic
//! networks: flux balance, mass consistency and the FastCore family of algorithms.

pub mod analysis;
pub mod configuration;
pub mod formula;
pub mod metabolic_model;
pub mod optimize;
