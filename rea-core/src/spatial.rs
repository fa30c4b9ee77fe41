//! Spatial types: observation sites and gridded model fields
//!
//! - [`Site`]: a named station with a latitude/longitude
//! - [`SiteTable`]: the ordered set of sites of a run, names unique
//! - [`GriddedField`]: a `(time, lat, lon)` array of model output
//!
//! # Examples
//!
//! ```rust
//! use rea_core::spatial::{Site, SiteTable};
//!
//! let table = SiteTable::new(vec![
//!     Site::new("Valencia", 39.47, -0.38),
//!     Site::new("Madrid", 40.42, -3.70),
//! ])
//! .unwrap();
//! assert_eq!(table.len(), 2);
//! assert_eq!(table.get("Madrid").unwrap().lat, 40.42);
//! ```

use crate::errors::{ReaError, ReaResult};
use crate::timeseries::{FloatValue, TimeAxis, TimeRange};
use ndarray::{s, Array3};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A named observation site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    /// Latitude in degrees north
    pub lat: FloatValue,
    /// Longitude in degrees east
    pub lon: FloatValue,
}

impl Site {
    pub fn new(name: impl Into<String>, lat: FloatValue, lon: FloatValue) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }
}

/// Ordered collection of sites with unique names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteTable {
    sites: Vec<Site>,
}

impl SiteTable {
    /// Build a table, rejecting duplicate names
    pub fn new(sites: Vec<Site>) -> ReaResult<Self> {
        let mut table = Self::default();
        for site in sites {
            table.push(site)?;
        }
        Ok(table)
    }

    pub fn push(&mut self, site: Site) -> ReaResult<()> {
        if self.get(&site.name).is_some() {
            return Err(ReaError::DuplicateSite { name: site.name });
        }
        self.sites.push(site);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Site> {
        self.sites.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter()
    }

    pub fn as_slice(&self) -> &[Site] {
        &self.sites
    }
}

/// Canonical coordinate names of a gridded field, in storage order
pub const CANONICAL_DIMS: [&str; 3] = ["time", "lat", "lon"];

/// Model output on a regular latitude/longitude grid
///
/// Values are stored as `(time, lat, lon)` once the field has been normalized
/// (see [`crate::grid_transform::normalize_coordinates`]). Before that, `dims`
/// holds the coordinate names as delivered by the data source, in storage order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GriddedField {
    pub(crate) dims: [String; 3],
    pub(crate) axis: Arc<TimeAxis>,
    pub(crate) lat: Vec<FloatValue>,
    pub(crate) lon: Vec<FloatValue>,
    pub(crate) data: Array3<FloatValue>,
}

impl GriddedField {
    /// Create a field from raw parts
    ///
    /// `dims` names the three storage axes of `data`. The lengths of `axis`, `lat`
    /// and `lon` are checked against the matching storage axis once the names are
    /// normalized; here they are only checked as a multiset against the shape.
    pub fn new(
        data: Array3<FloatValue>,
        dims: [&str; 3],
        axis: TimeAxis,
        lat: Vec<FloatValue>,
        lon: Vec<FloatValue>,
    ) -> ReaResult<Self> {
        let mut expected = [axis.len(), lat.len(), lon.len()];
        let mut got = [data.shape()[0], data.shape()[1], data.shape()[2]];
        expected.sort_unstable();
        got.sort_unstable();
        if expected != got {
            return Err(ReaError::LengthMismatch {
                expected: expected.iter().product(),
                got: got.iter().product(),
            });
        }
        Ok(Self {
            dims: dims.map(str::to_string),
            axis: Arc::new(axis),
            lat,
            lon,
            data,
        })
    }

    /// Coordinate names in storage order
    pub fn dims(&self) -> [&str; 3] {
        [
            self.dims[0].as_str(),
            self.dims[1].as_str(),
            self.dims[2].as_str(),
        ]
    }

    pub fn is_normalized(&self) -> bool {
        self.dims() == CANONICAL_DIMS
    }

    pub fn axis(&self) -> &TimeAxis {
        &self.axis
    }

    pub fn shared_axis(&self) -> Arc<TimeAxis> {
        Arc::clone(&self.axis)
    }

    pub fn lat(&self) -> &[FloatValue] {
        &self.lat
    }

    pub fn lon(&self) -> &[FloatValue] {
        &self.lon
    }

    pub fn data(&self) -> &Array3<FloatValue> {
        &self.data
    }

    /// The time slices whose stamp lies in `range`
    ///
    /// The field must be normalized.
    pub fn select_time(&self, range: &TimeRange) -> ReaResult<GriddedField> {
        if !self.is_normalized() {
            return Err(ReaError::Error(format!(
                "cannot select time slices of an unnormalized field {:?}",
                self.dims
            )));
        }
        let (first, axis) = self.axis.select(range);
        let data = self
            .data
            .slice(s![first..first + axis.len(), .., ..])
            .to_owned();
        Ok(GriddedField {
            dims: self.dims.clone(),
            axis: Arc::new(axis),
            lat: self.lat.clone(),
            lon: self.lon.clone(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeseries::Calendar;
    use chrono::NaiveDate;

    fn axis(len: usize) -> TimeAxis {
        TimeAxis::new(
            Calendar::Monthly,
            NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
            len,
        )
        .unwrap()
    }

    #[test]
    fn duplicate_site_rejected() {
        let result = SiteTable::new(vec![Site::new("A", 0.0, 0.0), Site::new("A", 1.0, 1.0)]);
        assert_eq!(
            result,
            Err(ReaError::DuplicateSite {
                name: "A".to_string()
            })
        );
    }

    #[test]
    fn table_keeps_insertion_order() {
        let table = SiteTable::new(vec![Site::new("B", 0.0, 0.0), Site::new("A", 1.0, 1.0)])
            .unwrap();
        let names: Vec<&str> = table.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn field_shape_checked() {
        let data = Array3::<f64>::zeros((3, 2, 4));
        let ok = GriddedField::new(
            data.clone(),
            ["time", "lat", "lon"],
            axis(3),
            vec![0.0, 1.0],
            vec![0.0, 1.0, 2.0, 3.0],
        );
        assert!(ok.unwrap().is_normalized());

        let bad = GriddedField::new(
            data,
            ["time", "lat", "lon"],
            axis(5),
            vec![0.0, 1.0],
            vec![0.0, 1.0, 2.0, 3.0],
        );
        assert!(matches!(bad, Err(ReaError::LengthMismatch { .. })));
    }

    #[test]
    fn select_time_slices() {
        let data = Array3::from_shape_fn((24, 1, 2), |(t, _, j)| (t * 10 + j) as f64);
        let field = GriddedField::new(
            data,
            ["time", "lat", "lon"],
            axis(24),
            vec![0.0],
            vec![0.0, 1.0],
        )
        .unwrap();
        let range = TimeRange::new(
            NaiveDate::from_ymd_opt(2001, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2001, 4, 1).unwrap(),
        );
        let selected = field.select_time(&range).unwrap();
        assert_eq!(selected.data().shape(), &[3, 1, 2]);
        assert_eq!(selected.data()[[0, 0, 1]], 121.0);
        assert_eq!(
            selected.axis().date_at(0),
            NaiveDate::from_ymd_opt(2001, 1, 1)
        );
    }

    #[test]
    fn raw_dims_are_not_normalized() {
        let field = GriddedField::new(
            Array3::<f64>::zeros((1, 1, 1)),
            ["time_counter", "nav_lat", "nav_lon"],
            axis(1),
            vec![0.0],
            vec![0.0],
        )
        .unwrap();
        assert!(!field.is_normalized());
        assert_eq!(field.dims(), ["time_counter", "nav_lat", "nav_lon"]);
    }
}
