use crate::errors::{ReaError, ReaResult};
use crate::timeseries::Timeseries;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, PartialOrd, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum SourceKind {
    /// Station observations
    Observed,
    /// A model's run over the observed reference period
    Model,
    /// The same model's run over the future scenario period
    Projection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeseriesItem {
    pub timeseries: Timeseries,
    pub name: String,
    pub source: SourceKind,
}

/// A model's historical run paired with its projection
#[derive(Debug, Clone, Copy)]
pub struct EnsembleMember<'a> {
    pub name: &'a str,
    pub historical: &'a Timeseries,
    pub projection: &'a Timeseries,
}

/// The point timeseries available for one site.
///
/// Items are addressed by name and source; a model and its projection share a name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeseriesCollection {
    items: Vec<TimeseriesItem>,
}

impl TimeseriesCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a new timeseries to the collection
    ///
    /// Fails if an item with the same name and source already exists.
    pub fn add_timeseries(
        &mut self,
        name: impl Into<String>,
        timeseries: Timeseries,
        source: SourceKind,
    ) -> ReaResult<()> {
        let name = name.into();
        if self.get(&name, source).is_some() {
            return Err(ReaError::DuplicateSeries {
                name: format!("{:?}|{}", source, name),
            });
        }
        self.items.push(TimeseriesItem {
            timeseries,
            name,
            source,
        });
        Ok(())
    }

    pub fn get(&self, name: &str, source: SourceKind) -> Option<&TimeseriesItem> {
        self.items
            .iter()
            .find(|x| x.source == source && x.name == name)
    }

    /// Remove every item with the given name, whatever its source
    pub fn remove_named(&mut self, name: &str) {
        self.items.retain(|x| x.name != name);
    }

    /// The observed series, if present
    pub fn observed(&self) -> Option<&Timeseries> {
        self.items
            .iter()
            .find(|x| x.source == SourceKind::Observed)
            .map(|x| &x.timeseries)
    }

    /// Models that have both a historical run and a projection, in insertion order
    pub fn members(&self) -> Vec<EnsembleMember<'_>> {
        self.iter()
            .filter(|x| x.source == SourceKind::Model)
            .filter_map(|model| {
                self.get(&model.name, SourceKind::Projection)
                    .map(|projection| EnsembleMember {
                        name: &model.name,
                        historical: &model.timeseries,
                        projection: &projection.timeseries,
                    })
            })
            .collect()
    }

    /// Names of model or projection items that lack their counterpart
    pub fn unpaired_names(&self) -> Vec<&str> {
        self.iter()
            .filter(|x| match x.source {
                SourceKind::Model => self.get(&x.name, SourceKind::Projection).is_none(),
                SourceKind::Projection => self.get(&x.name, SourceKind::Model).is_none(),
                SourceKind::Observed => false,
            })
            .map(|x| x.name.as_str())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TimeseriesItem> {
        self.items.iter()
    }
}

impl IntoIterator for TimeseriesCollection {
    type Item = TimeseriesItem;
    type IntoIter = std::vec::IntoIter<Self::Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
