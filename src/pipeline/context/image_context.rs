use image::RgbImage;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::pipeline::context::metrics::{StageMetrics, StepKind};
use crate::pipeline::context::state::{
    LoadedState, ReceivedState, RenderedState, ScoredState, SegmentedState,
};
use crate::pipeline::domain::calculation::{CalculationRequest, CalculationResult};
use crate::pipeline::domain::clustering::ClusterAssignment;
use crate::pipeline::domain::crop_type::CropType;
use crate::pipeline::domain::hsv::HsvImage;
use crate::pipeline::domain::lai_map::{ClusterStats, LaiMap};

// ImageContext with compile-time state tracking. Every transition consumes
// the context, so the buffers of the finished stage are freed right there.
pub struct ImageContext<S> {
    id: Uuid,
    crop_type: CropType,
    metrics: StageMetrics,
    processing_start: Instant,
    state: S,
}

impl<S> ImageContext<S> {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn crop_type(&self) -> CropType {
        self.crop_type
    }

    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    pub(crate) fn record_duration(&mut self, step: StepKind, duration: Duration) {
        self.metrics.record_duration(step, duration);
    }

    fn with_state<T>(self, state: T) -> ImageContext<T> {
        ImageContext {
            id: self.id,
            crop_type: self.crop_type,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state,
        }
    }
}

impl ImageContext<ReceivedState> {
    pub fn new(request: CalculationRequest) -> Self {
        Self {
            id: request.id,
            crop_type: request.crop_type,
            metrics: StageMetrics::new(),
            processing_start: Instant::now(),
            state: ReceivedState {
                bytes: request.image,
            },
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.state.bytes
    }

    pub fn into_loaded(self, rgb: RgbImage) -> ImageContext<LoadedState> {
        self.with_state(LoadedState { rgb })
    }
}

impl ImageContext<LoadedState> {
    pub fn rgb(&self) -> &RgbImage {
        &self.state.rgb
    }

    /// Drops the RGB grid unless `keep_backdrop` asks for it to be carried
    /// to the renderer.
    pub fn into_segmented(
        self,
        hsv: HsvImage,
        assignment: ClusterAssignment,
        keep_backdrop: bool,
    ) -> ImageContext<SegmentedState> {
        let backdrop = keep_backdrop.then_some(self.state.rgb);
        ImageContext {
            id: self.id,
            crop_type: self.crop_type,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: SegmentedState {
                hsv,
                assignment,
                backdrop,
            },
        }
    }
}

impl ImageContext<SegmentedState> {
    pub fn hsv(&self) -> &HsvImage {
        &self.state.hsv
    }

    pub fn assignment(&self) -> &ClusterAssignment {
        &self.state.assignment
    }

    pub fn has_backdrop(&self) -> bool {
        self.state.backdrop.is_some()
    }

    pub fn into_scored(self, lai_map: LaiMap, clusters: Vec<ClusterStats>) -> ImageContext<ScoredState> {
        let backdrop = self.state.backdrop;
        ImageContext {
            id: self.id,
            crop_type: self.crop_type,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: ScoredState {
                lai_map,
                clusters,
                backdrop,
            },
        }
    }
}

impl ImageContext<ScoredState> {
    pub fn lai_map(&self) -> &LaiMap {
        &self.state.lai_map
    }

    pub fn clusters(&self) -> &[ClusterStats] {
        &self.state.clusters
    }

    pub fn backdrop(&self) -> Option<&RgbImage> {
        self.state.backdrop.as_ref()
    }

    pub fn into_rendered(self, heatmap: Vec<u8>, average_lai: f64) -> ImageContext<RenderedState> {
        let ScoredState {
            lai_map, clusters, ..
        } = self.state;
        let (width, height) = (lai_map.width(), lai_map.height());
        ImageContext {
            id: self.id,
            crop_type: self.crop_type,
            metrics: self.metrics,
            processing_start: self.processing_start,
            state: RenderedState {
                heatmap,
                average_lai,
                width,
                height,
                clusters,
            },
        }
    }
}

impl ImageContext<RenderedState> {
    pub fn heatmap(&self) -> &[u8] {
        &self.state.heatmap
    }

    pub fn into_result(mut self) -> CalculationResult {
        self.metrics.finalize(self.processing_start);
        let RenderedState {
            heatmap,
            average_lai,
            width,
            height,
            clusters,
        } = self.state;
        CalculationResult::new(
            self.id,
            self.crop_type,
            average_lai,
            heatmap,
            width,
            height,
            clusters,
            self.metrics,
        )
    }
}
