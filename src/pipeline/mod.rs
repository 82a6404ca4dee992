pub mod context;
pub mod domain;
pub mod orchestration;
pub mod steps;

#[cfg(test)]
pub(crate) mod test_support;

pub use domain::{CalculationRequest, CalculationResult, ClusterStats, CropType, LaiMap};
pub use orchestration::{LaiPipeline, ProcessingStep};
