pub mod processing_pipeline;
pub mod processing_step;

pub use processing_pipeline::LaiPipeline;
pub use processing_step::ProcessingStep;
