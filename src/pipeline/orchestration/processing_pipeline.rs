use std::time::Instant;

use crate::config::{Configuration, LAI_MAX};
use crate::error::PipelineError;
use crate::pipeline::context::{ImageContext, ProcessingState, ReceivedState};
use crate::pipeline::domain::calculation::{CalculationRequest, CalculationResult};
use crate::pipeline::domain::crop_type::CropType;
use crate::pipeline::domain::palette::LAI_PALETTE;
use crate::pipeline::orchestration::processing_step::ProcessingStep;
use crate::pipeline::steps::{ColorSegmenter, HeatmapRenderer, ImageLoader, LaiScorer};

/// Loader → segmenter → scorer → renderer. Holds only configuration, so one
/// instance can serve any number of concurrent calls.
#[derive(Debug, Clone)]
pub struct LaiPipeline {
    loader: ImageLoader,
    segmenter: ColorSegmenter,
    scorer: LaiScorer,
    renderer: HeatmapRenderer,
}

impl Default for LaiPipeline {
    fn default() -> Self {
        Self::from_config(&Configuration::default())
    }
}

impl LaiPipeline {
    pub fn new(config: &Configuration) -> Result<Self, PipelineError> {
        config.validate().map_err(PipelineError::InvalidConfig)?;
        Ok(Self::from_config(config))
    }

    fn from_config(config: &Configuration) -> Self {
        // The palette always spans the full LAI scale, whatever the clamp.
        let renderer = HeatmapRenderer::new(LAI_PALETTE, LAI_MAX, config.rendering.clone());
        Self {
            loader: ImageLoader::new(config.limits.clone()),
            segmenter: ColorSegmenter::new(&config.segmentation)
                .with_backdrop(renderer.overlay_enabled()),
            scorer: LaiScorer::new(config.scoring.clone()),
            renderer,
        }
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    /// Runs the whole chain on `image_bytes`. Either a complete result comes
    /// back or an error, never anything in between.
    pub fn compute(
        &self,
        image_bytes: Vec<u8>,
        crop_type: CropType,
    ) -> Result<CalculationResult, PipelineError> {
        self.compute_request(CalculationRequest::new(image_bytes, crop_type))
    }

    pub fn compute_request(
        &self,
        request: CalculationRequest,
    ) -> Result<CalculationResult, PipelineError> {
        let span = tracing::debug_span!("lai_pipeline", id = %request.id, crop = %request.crop_type);
        let _guard = span.enter();

        let context = ImageContext::new(request);
        let context = run_step(&self.loader, context)?;
        let context = run_step(&self.segmenter, context)?;
        let context = run_step(&self.scorer, context)?;
        let context = run_step(&self.renderer, context)?;
        let result = context.into_result();

        tracing::info!(
            "Computed average LAI {:.3} for {}x{} image in {:?}",
            result.average_lai(),
            result.dimensions().0,
            result.dimensions().1,
            result.metrics().total().unwrap_or_default()
        );
        Ok(result)
    }
}

fn run_step<In, Out, S>(step: &S, context: ImageContext<In>) -> Result<ImageContext<Out>, PipelineError>
where
    In: ProcessingState,
    Out: ProcessingState,
    S: ProcessingStep<In, Out>,
{
    tracing::debug!("Processing step: {} ({} -> {})", step.name(), In::state_name(), Out::state_name());
    let started = Instant::now();
    let mut next = step.process(context).inspect_err(|e| {
        tracing::debug!("Step {} failed: {}", step.name(), e);
    })?;
    next.record_duration(step.kind(), started.elapsed());
    Ok(next)
}
