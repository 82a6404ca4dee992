use crate::error::PipelineError;
use crate::pipeline::context::{ImageContext, StepKind};

/// One stage of the chain. A step consumes the context in state `In` and
/// hands back the context in state `Out`.
pub trait ProcessingStep<In, Out>: Send + Sync {
    fn process(&self, context: ImageContext<In>) -> Result<ImageContext<Out>, PipelineError>;
    fn name(&self) -> &'static str;
    fn kind(&self) -> StepKind;
}
