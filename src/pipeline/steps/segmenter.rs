use crate::config::SegmentationConfig;
use crate::error::PipelineError;
use crate::pipeline::context::{ImageContext, LoadedState, SegmentedState, StepKind};
use crate::pipeline::domain::clustering::{self, KMeansParams};
use crate::pipeline::domain::hsv::HsvImage;
use crate::pipeline::orchestration::ProcessingStep;

/// Converts the RGB grid to HSV and clusters its pixels.
#[derive(Debug, Clone)]
pub struct ColorSegmenter {
    params: KMeansParams,
    keep_backdrop: bool,
}

impl ColorSegmenter {
    pub fn new(config: &SegmentationConfig) -> Self {
        Self {
            params: KMeansParams::from(config),
            keep_backdrop: false,
        }
    }

    /// Keep the RGB grid alive for an overlay renderer.
    pub fn with_backdrop(mut self, keep: bool) -> Self {
        self.keep_backdrop = keep;
        self
    }
}

impl ProcessingStep<LoadedState, SegmentedState> for ColorSegmenter {
    fn process(
        &self,
        context: ImageContext<LoadedState>,
    ) -> Result<ImageContext<SegmentedState>, PipelineError> {
        let hsv = HsvImage::from_rgb(context.rgb())?;
        let assignment = clustering::segment(&hsv, &self.params)?;
        tracing::debug!(
            "Segmented into {} non-empty clusters (inertia {:.1})",
            assignment.non_empty_clusters(),
            assignment.inertia()
        );
        Ok(context.into_segmented(hsv, assignment, self.keep_backdrop))
    }

    fn name(&self) -> &'static str {
        "color_segmenter"
    }

    fn kind(&self) -> StepKind {
        StepKind::Segment
    }
}
