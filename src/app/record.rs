use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::pipeline::{CalculationResult, CropType};

/// Everything the persistence side keeps about one calculation. Plain data,
/// built only from a finished result.
#[derive(Debug, Clone)]
pub struct LaiRecord {
    pub id: Uuid,
    pub name: String,
    pub image: Vec<u8>,
    pub image_filename: Option<String>,
    pub crop_type: CropType,
    pub lai_avg: f64,
    pub lai_heatmap: Vec<u8>,
    pub lai_heatmap_filename: String,
    pub calculated_at: DateTime<Utc>,
}

impl LaiRecord {
    pub fn from_result(image: Vec<u8>, image_filename: Option<String>, result: CalculationResult) -> Self {
        let id = result.id();
        let crop_type = result.crop_type();
        let (lai_avg, lai_heatmap, lai_heatmap_filename) = result.into_parts();
        Self {
            id,
            name: format!("LAI-{}", id.simple()),
            image,
            image_filename,
            crop_type,
            lai_avg,
            lai_heatmap,
            lai_heatmap_filename,
            calculated_at: Utc::now(),
        }
    }
}
