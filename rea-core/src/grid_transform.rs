//! Coordinate normalization for gridded fields
//!
//! Model output arrives with a variety of coordinate names (`latitude`, `nav_lat`,
//! `time_counter`, ...) and sometimes in a non-canonical storage order. Every field
//! passes through [`normalize_coordinates`] before interpolation, which renames
//! coordinates using an explicit table and reorders storage to `(time, lat, lon)`.
//! Names outside the table are an error rather than a guess.

use crate::errors::{ReaError, ReaResult};
use crate::spatial::{GriddedField, CANONICAL_DIMS};
use log::debug;

/// Accepted spellings for each canonical coordinate
const RENAME_TABLE: [(&str, &[&str]); 3] = [
    ("time", &["time", "t", "times", "time_counter"]),
    ("lat", &["lat", "latitude", "nav_lat", "rlat", "y"]),
    ("lon", &["lon", "longitude", "nav_lon", "rlon", "x"]),
];

/// Canonical name for a coordinate name, matched case-insensitively
pub fn canonical_name(name: &str) -> ReaResult<&'static str> {
    let lowered = name.trim().to_ascii_lowercase();
    RENAME_TABLE
        .iter()
        .find(|(_, aliases)| aliases.contains(&lowered.as_str()))
        .map(|(canonical, _)| *canonical)
        .ok_or_else(|| ReaError::UnknownCoordinate {
            name: name.to_string(),
        })
}

/// Rename the coordinates of `field` and reorder its storage to `(time, lat, lon)`
///
/// # Errors
///
/// * [`ReaError::UnknownCoordinate`] if a name is not in the rename table
/// * [`ReaError::MissingCoordinate`] if two names map onto the same coordinate
/// * [`ReaError::LengthMismatch`] if a coordinate vector does not match its axis
pub fn normalize_coordinates(field: GriddedField) -> ReaResult<GriddedField> {
    let canonical = field
        .dims()
        .iter()
        .map(|d| canonical_name(d))
        .collect::<ReaResult<Vec<_>>>()?;

    // Storage position of each canonical coordinate
    let mut order = [0usize; 3];
    for (slot, target) in CANONICAL_DIMS.iter().enumerate() {
        order[slot] = canonical
            .iter()
            .position(|c| c == target)
            .ok_or_else(|| ReaError::MissingCoordinate {
                name: target.to_string(),
            })?;
    }

    for (name, target) in field.dims().iter().zip(&canonical) {
        if name != target {
            debug!("renaming coordinate '{}' to '{}'", name, target);
        }
    }
    if order != [0, 1, 2] {
        debug!("reordering grid storage {:?} to (time, lat, lon)", order);
    }

    let GriddedField {
        axis,
        lat,
        lon,
        data,
        ..
    } = field;
    let data = data.permuted_axes(order).as_standard_layout().to_owned();

    for (got, expected) in data
        .shape()
        .iter()
        .zip([axis.len(), lat.len(), lon.len()])
    {
        if *got != expected {
            return Err(ReaError::LengthMismatch {
                expected,
                got: *got,
            });
        }
    }

    Ok(GriddedField {
        dims: CANONICAL_DIMS.map(str::to_string),
        axis,
        lat,
        lon,
        data,
    })
}
