use image::RgbImage;

use crate::pipeline::domain::clustering::ClusterAssignment;
use crate::pipeline::domain::hsv::HsvImage;
use crate::pipeline::domain::lai_map::{ClusterStats, LaiMap};

// Markers to track the state of the image processing pipeline. Each state
// owns only the buffers the next stage needs; everything else is dropped on
// the transition.
pub struct ReceivedState {
    pub(super) bytes: Vec<u8>,
}

pub struct LoadedState {
    pub(super) rgb: RgbImage,
}

pub struct SegmentedState {
    pub(super) hsv: HsvImage,
    pub(super) assignment: ClusterAssignment,
    pub(super) backdrop: Option<RgbImage>,
}

pub struct ScoredState {
    pub(super) lai_map: LaiMap,
    pub(super) clusters: Vec<ClusterStats>,
    pub(super) backdrop: Option<RgbImage>,
}

pub struct RenderedState {
    pub(super) heatmap: Vec<u8>,
    pub(super) average_lai: f64,
    pub(super) width: u32,
    pub(super) height: u32,
    pub(super) clusters: Vec<ClusterStats>,
}

pub trait ProcessingState: 'static {
    fn state_name() -> &'static str;
}

impl ProcessingState for ReceivedState {
    fn state_name() -> &'static str {
        "Received"
    }
}

impl ProcessingState for LoadedState {
    fn state_name() -> &'static str {
        "Loaded"
    }
}

impl ProcessingState for SegmentedState {
    fn state_name() -> &'static str {
        "Segmented"
    }
}

impl ProcessingState for ScoredState {
    fn state_name() -> &'static str {
        "Scored"
    }
}

impl ProcessingState for RenderedState {
    fn state_name() -> &'static str {
        "Rendered"
    }
}
