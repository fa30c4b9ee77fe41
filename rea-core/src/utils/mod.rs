//! Numerical utilities shared by the REA stages.

pub mod stats;
