use uuid::Uuid;

use crate::pipeline::context::metrics::StageMetrics;
use crate::pipeline::domain::crop_type::CropType;
use crate::pipeline::domain::lai_map::ClusterStats;

/// Input of one calculation. The id names the heatmap file and, downstream,
/// the stored record.
#[derive(Debug, Clone)]
pub struct CalculationRequest {
    pub id: Uuid,
    pub image: Vec<u8>,
    pub crop_type: CropType,
}

impl CalculationRequest {
    pub fn new(image: Vec<u8>, crop_type: CropType) -> Self {
        Self {
            id: Uuid::new_v4(),
            image,
            crop_type,
        }
    }
}

/// Complete output of one calculation. Only ever built whole.
#[derive(Debug, Clone)]
pub struct CalculationResult {
    id: Uuid,
    crop_type: CropType,
    average_lai: f64,
    heatmap: Vec<u8>,
    heatmap_filename: String,
    width: u32,
    height: u32,
    clusters: Vec<ClusterStats>,
    metrics: StageMetrics,
}

impl CalculationResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        id: Uuid,
        crop_type: CropType,
        average_lai: f64,
        heatmap: Vec<u8>,
        width: u32,
        height: u32,
        clusters: Vec<ClusterStats>,
        metrics: StageMetrics,
    ) -> Self {
        Self {
            id,
            crop_type,
            average_lai,
            heatmap,
            heatmap_filename: heatmap_filename(id),
            width,
            height,
            clusters,
            metrics,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn crop_type(&self) -> CropType {
        self.crop_type
    }

    pub fn average_lai(&self) -> f64 {
        self.average_lai
    }

    pub fn heatmap(&self) -> &[u8] {
        &self.heatmap
    }

    pub fn heatmap_filename(&self) -> &str {
        &self.heatmap_filename
    }

    /// Dimensions of the decoded (possibly downscaled) image and heatmap.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn clusters(&self) -> &[ClusterStats] {
        &self.clusters
    }

    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }

    /// `(average_lai, heatmap_bytes, heatmap_filename)`.
    pub fn into_parts(self) -> (f64, Vec<u8>, String) {
        (self.average_lai, self.heatmap, self.heatmap_filename)
    }
}

pub fn heatmap_filename(id: Uuid) -> String {
    format!("lai_heatmap_{}.png", id.simple())
}
