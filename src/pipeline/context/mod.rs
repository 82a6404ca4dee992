pub mod image_context;
pub mod metrics;
pub mod state;

pub use image_context::ImageContext;
pub use metrics::{StageMetrics, StepKind};
pub use state::{
    LoadedState, ProcessingState, ReceivedState, RenderedState, ScoredState, SegmentedState,
};
