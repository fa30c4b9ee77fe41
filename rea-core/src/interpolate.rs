//! Interpolation of gridded fields onto site coordinates
//!
//! The same [`Interpolator`] must be used for every model of a run so that
//! differences between models are not an artefact of the interpolation method.

use crate::errors::{ReaError, ReaResult};
use crate::spatial::GriddedField;
use crate::timeseries::{is_missing, FloatValue, Timeseries, MISSING};
use log::debug;
use ndarray::Array1;

/// Extract a point timeseries from a gridded field
pub trait Interpolator: Send + Sync {
    /// Interpolate every time slice of `field` to `(lat, lon)`
    ///
    /// `field` must be normalized to `(time, lat, lon)` storage.
    fn interp_to_point(
        &self,
        field: &GriddedField,
        lat: FloatValue,
        lon: FloatValue,
    ) -> ReaResult<Timeseries>;
}

/// Bilinear interpolation between the four surrounding grid nodes
///
/// Coordinates may be ascending or descending. Longitudes are matched modulo 360
/// so that a `[0, 360)` grid accepts sites given in `[-180, 180)`. If any node
/// that carries weight is missing, the interpolated value is missing.
#[derive(Debug, Clone, Copy, Default)]
pub struct BilinearInterpolator;

/// A coordinate bracket: lower index, upper index and the weight of the upper node
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bracket {
    lower: usize,
    upper: usize,
    weight: FloatValue,
}

impl Bracket {
    fn nodes(&self) -> [(usize, FloatValue); 2] {
        [(self.lower, 1.0 - self.weight), (self.upper, self.weight)]
    }
}

fn bracket(coords: &[FloatValue], x: FloatValue) -> Option<Bracket> {
    match coords {
        [] => None,
        [only] => (*only == x).then_some(Bracket {
            lower: 0,
            upper: 0,
            weight: 0.0,
        }),
        _ => coords.windows(2).enumerate().find_map(|(i, pair)| {
            let (a, b) = (pair[0], pair[1]);
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            if x < lo || x > hi {
                return None;
            }
            let weight = if b == a { 0.0 } else { (x - a) / (b - a) };
            Some(Bracket {
                lower: i,
                upper: i + 1,
                weight,
            })
        }),
    }
}

fn bracket_longitude(coords: &[FloatValue], lon: FloatValue) -> Option<Bracket> {
    [lon, lon + 360.0, lon - 360.0]
        .into_iter()
        .find_map(|candidate| bracket(coords, candidate))
}

impl Interpolator for BilinearInterpolator {
    fn interp_to_point(
        &self,
        field: &GriddedField,
        lat: FloatValue,
        lon: FloatValue,
    ) -> ReaResult<Timeseries> {
        if !field.is_normalized() {
            return Err(ReaError::Error(format!(
                "field with coordinates {:?} must be normalized before interpolation",
                field.dims()
            )));
        }
        let (Some(by), Some(bx)) = (bracket(field.lat(), lat), bracket_longitude(field.lon(), lon))
        else {
            debug!("point ({}, {}) lies outside the grid extent", lat, lon);
            return Err(ReaError::OutsideGrid { lat, lon });
        };

        let data = field.data();
        let values: Array1<FloatValue> = (0..data.shape()[0])
            .map(|t| {
                let mut total = 0.0;
                for (iy, wy) in by.nodes() {
                    for (ix, wx) in bx.nodes() {
                        let w = wy * wx;
                        if w == 0.0 {
                            continue;
                        }
                        let v = data[[t, iy, ix]];
                        if is_missing(v) {
                            return MISSING;
                        }
                        total += w * v;
                    }
                }
                total
            })
            .collect();

        Timeseries::new(values, field.shared_axis())
    }
}
