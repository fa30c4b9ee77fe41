mod bias;
mod climatology;
pub mod ensemble;
pub mod reliability;
mod variability;

pub use bias::BiasCalculator;
pub use climatology::climatology;
pub use ensemble::{EnsembleAggregator, EnsembleProjection};
pub use reliability::{Reliabilities, ReliabilityCombiner};
pub use variability::VariabilityEstimator;
