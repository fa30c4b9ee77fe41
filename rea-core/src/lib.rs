//! Core data types for Reliability Ensemble Averaging (REA).
//!
//! This crate holds everything the numerical stages operate on: calendar-aligned
//! [`timeseries`] with a missing marker, per-period vectors ([`periodic`]), sites and
//! gridded model fields ([`spatial`]), coordinate normalization ([`grid_transform`]),
//! point [`interpolate`]ion, the per-site [`timeseries_collection`], run
//! [`parameters`] and the shared error type.

pub mod errors;
pub mod grid_transform;
pub mod interpolate;
pub mod parameters;
pub mod periodic;
pub mod spatial;
pub mod timeseries;
pub mod timeseries_collection;
pub mod utils;
