//! Orchestration of a REA run
//!
//! [`ReaDriver`] loads and normalizes each model's grids once, then for every site:
//!
//! 1. resamples the raw observations to period means on the reference-period axis;
//!    periods without observations are missing
//! 2. interpolates every model's historical and projection grid to the site
//! 3. runs the [`ReaEngine`] on the resulting point series
//! 4. appends the site's rows to the output tables
//!
//! Sites are independent. With `parameters.parallel` they are processed on the rayon
//! thread pool; the per-site partial tables are merged in site-table order so the
//! output does not depend on scheduling.

use crate::config::RunConfig;
use crate::sources::{GridSource, OutputSink, StationRecord, StationSource};
use crate::tables::{MonthIssue, ReaTables, RunSummary, SkipRecord};
use log::{debug, info, warn};
use rayon::prelude::*;
use rea_components::engine::{ReaEngine, SiteReaResult};
use rea_core::errors::{ReaError, ReaResult};
use rea_core::grid_transform::normalize_coordinates;
use rea_core::interpolate::{BilinearInterpolator, Interpolator};
use rea_core::spatial::{GriddedField, Site, SiteTable};
use rea_core::timeseries::{Calendar, TimeAxis, TimeRange, Timeseries};
use rea_core::timeseries_collection::{SourceKind, TimeseriesCollection};
use std::path::Path;
use std::sync::Arc;

/// Normalized grids of one ensemble member
#[derive(Debug, Clone)]
struct ModelGrids {
    name: String,
    historical: GriddedField,
    projection: GriddedField,
}

/// Partial output of one site
#[derive(Debug, Default)]
struct SiteOutcome {
    tables: ReaTables,
    summary: RunSummary,
}

pub struct ReaDriver {
    config: RunConfig,
    engine: ReaEngine,
    interpolator: Box<dyn Interpolator>,
}

impl ReaDriver {
    /// Create a driver using bilinear interpolation
    pub fn new(config: RunConfig) -> ReaResult<Self> {
        config.validate()?;
        let engine = ReaEngine::from_parameters(config.parameters.clone())?;
        Ok(Self {
            config,
            engine,
            interpolator: Box::new(BilinearInterpolator),
        })
    }

    /// Replace the interpolator used for every model
    pub fn with_interpolator(mut self, interpolator: impl Interpolator + 'static) -> Self {
        self.interpolator = Box::new(interpolator);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run REA for every station and write the tables to `sink`
    ///
    /// # Errors
    ///
    /// Only failures of the station source, a duplicated site name, or a failing
    /// sink abort the run. Everything else is listed in the returned summary.
    pub fn run(
        &self,
        grids: &dyn GridSource,
        stations: &dyn StationSource,
        sink: &mut dyn OutputSink,
    ) -> ReaResult<RunSummary> {
        let (tables, summary) = self.compute(grids, stations)?;
        sink.write_tables(&tables)?;
        Ok(summary)
    }

    /// Run REA for every station and return the tables
    pub fn compute(
        &self,
        grids: &dyn GridSource,
        stations: &dyn StationSource,
    ) -> ReaResult<(ReaTables, RunSummary)> {
        let records = stations.stations()?;
        SiteTable::new(records.iter().map(|r| r.site.clone()).collect())?;
        info!(
            "REA run for '{}': {} sites, {} models",
            self.config.variable,
            records.len(),
            self.config.models.len()
        );

        let mut summary = RunSummary::default();
        let models = self.load_models(grids, &mut summary.skips);

        let outcomes = if self.config.parameters.parallel {
            self.process_parallel(&records, &models)
        } else {
            self.process_sequential(&records, &models)
        };

        let mut tables = ReaTables::new();
        for outcome in outcomes {
            tables.extend(outcome.tables);
            summary.extend(outcome.summary);
        }
        info!(
            "REA run finished: {} sites processed, {} skips, {} period issues",
            summary.processed.len(),
            summary.skips.len(),
            summary.issues.len()
        );
        Ok((tables, summary))
    }

    /// Load and normalize the grids of every configured model
    ///
    /// A model whose grids cannot be loaded is left out of every site.
    fn load_models(
        &self,
        grids: &dyn GridSource,
        skips: &mut Vec<SkipRecord>,
    ) -> Vec<ModelGrids> {
        let load = |path: &Path, range: &TimeRange| {
            grids
                .load_grid(path, &self.config.variable, range)
                .and_then(normalize_coordinates)
        };

        let mut models = Vec::with_capacity(self.config.models.len());
        for model in &self.config.models {
            let loaded = load(&model.historical, &self.config.reference_period).and_then(|h| {
                load(&model.projection, &self.config.projection_period).map(|p| (h, p))
            });
            match loaded {
                Ok((historical, projection)) => {
                    debug!("loaded grids of model '{}'", model.name);
                    models.push(ModelGrids {
                        name: model.name.clone(),
                        historical,
                        projection,
                    })
                }
                Err(e) => {
                    warn!("model '{}' excluded from the run: {}", model.name, e);
                    skips.push(SkipRecord {
                        site: None,
                        model: Some(model.name.clone()),
                        reason: e,
                    });
                }
            }
        }
        models
    }

    fn process_parallel(
        &self,
        records: &[StationRecord],
        models: &[ModelGrids],
    ) -> Vec<SiteOutcome> {
        records
            .par_iter()
            .map(|record| self.process_site(record, models))
            .collect()
    }

    fn process_sequential(
        &self,
        records: &[StationRecord],
        models: &[ModelGrids],
    ) -> Vec<SiteOutcome> {
        records
            .iter()
            .map(|record| self.process_site(record, models))
            .collect()
    }

    fn process_site(&self, record: &StationRecord, models: &[ModelGrids]) -> SiteOutcome {
        let name = record.site.name.clone();
        let mut outcome = SiteOutcome::default();
        match self.compute_site(record, models, &mut outcome.summary.skips) {
            Ok(result) => {
                debug!("site '{}' done with {} models", name, result.models.len());
                outcome
                    .summary
                    .issues
                    .extend(result.issues.iter().map(|issue| MonthIssue {
                        site: name.clone(),
                        period: result.calendar.period_label(issue.period),
                        kind: issue.kind,
                    }));
                for excluded in &result.excluded {
                    let model = match excluded {
                        ReaError::GridMismatch { model, .. } => Some(model.clone()),
                        _ => None,
                    };
                    outcome.summary.skips.push(SkipRecord {
                        site: Some(name.clone()),
                        model,
                        reason: excluded.clone(),
                    });
                }
                outcome.tables.push_site(&result);
                outcome.summary.processed.push(name);
            }
            Err(e) => {
                warn!("skipping site '{}': {}", name, e);
                outcome.summary.skips.push(SkipRecord {
                    site: Some(name),
                    model: None,
                    reason: e,
                });
            }
        }
        outcome
    }

    /// Point series of one site, then the engine
    ///
    /// Models that cannot be interpolated to the site are pushed to `skips`.
    fn compute_site(
        &self,
        record: &StationRecord,
        models: &[ModelGrids],
        skips: &mut Vec<SkipRecord>,
    ) -> ReaResult<SiteReaResult> {
        let site = &record.site;
        let calendar = self.config.parameters.calendar();
        if record.samples.is_empty() {
            return Err(ReaError::MissingObservations {
                site: site.name.clone(),
            });
        }
        let reference_axis = TimeAxis::spanning(calendar, &self.config.reference_period)?;
        let observed = Timeseries::resample_mean(&record.samples, calendar)?
            .reindex(Arc::new(reference_axis))?;

        let mut inputs = TimeseriesCollection::new();
        inputs.add_timeseries("observed", observed, SourceKind::Observed)?;
        for model in models {
            let point = |field: &GriddedField, range: &TimeRange| {
                self.point_series(site, field, range, calendar)
            };
            let series = point(&model.historical, &self.config.reference_period).and_then(|h| {
                point(&model.projection, &self.config.projection_period).map(|p| (h, p))
            });
            match series {
                Ok((historical, projection)) => {
                    inputs.add_timeseries(model.name.as_str(), historical, SourceKind::Model)?;
                    inputs.add_timeseries(model.name.as_str(), projection, SourceKind::Projection)?;
                }
                Err(e) => {
                    let reason = ReaError::GridMismatch {
                        site: site.name.clone(),
                        model: model.name.clone(),
                        reason: e.to_string(),
                    };
                    warn!("{}", reason);
                    skips.push(SkipRecord {
                        site: Some(site.name.clone()),
                        model: Some(model.name.clone()),
                        reason,
                    });
                }
            }
        }

        self.engine.compute_site(&site.name, &inputs)
    }

    /// Interpolate `field` to `site` on the run calendar, restricted to `range`
    ///
    /// Monthly grids are averaged to years in annual mode; a year with a missing
    /// month is missing.
    fn point_series(
        &self,
        site: &Site,
        field: &GriddedField,
        range: &TimeRange,
        calendar: Calendar,
    ) -> ReaResult<Timeseries> {
        let series = self
            .interpolator
            .interp_to_point(field, site.lat, site.lon)?
            .select(range);
        let to_annual = series.calendar() == Calendar::Monthly && calendar == Calendar::Annual;
        if to_annual && !series.is_empty() {
            let samples: Vec<_> = series.iter().collect();
            return Timeseries::resample_mean(&samples, calendar);
        }
        Ok(series)
    }
}
