use crate::config::ScoringConfig;
use crate::error::PipelineError;
use crate::pipeline::context::{ImageContext, ScoredState, SegmentedState, StepKind};
use crate::pipeline::domain::lai_map::{self, LaiMap};
use crate::pipeline::orchestration::ProcessingStep;

/// Turns cluster color statistics into a per-pixel LAI map.
#[derive(Debug, Clone)]
pub struct LaiScorer {
    config: ScoringConfig,
}

impl LaiScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStep<SegmentedState, ScoredState> for LaiScorer {
    fn process(
        &self,
        context: ImageContext<SegmentedState>,
    ) -> Result<ImageContext<ScoredState>, PipelineError> {
        // The crop type is carried along but does not change the score.
        let clusters = lai_map::cluster_stats(context.hsv(), context.assignment(), &self.config);
        for cluster in &clusters {
            tracing::debug!(
                "Cluster {}: {} px, hsv ({:.1}, {:.1}, {:.1}), greenness {:.3}, LAI {:.3}",
                cluster.label,
                cluster.pixel_count,
                cluster.mean_hue,
                cluster.mean_saturation,
                cluster.mean_value,
                cluster.greenness,
                cluster.lai
            );
        }
        let map = LaiMap::from_clusters(context.assignment(), &clusters)?;
        Ok(context.into_scored(map, clusters))
    }

    fn name(&self) -> &'static str {
        "lai_scorer"
    }

    fn kind(&self) -> StepKind {
        StepKind::Score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentationConfig;
    use crate::pipeline::context::ReceivedState;
    use crate::pipeline::domain::{CalculationRequest, CropType};
    use crate::pipeline::steps::ColorSegmenter;
    use crate::pipeline::test_support::{field_with_soil, solid};

    fn scored(rgb: image::RgbImage, crop: CropType) -> ImageContext<ScoredState> {
        let ctx = ImageContext::<ReceivedState>::new(CalculationRequest::new(Vec::new(), crop))
            .into_loaded(rgb);
        let ctx = ColorSegmenter::new(&SegmentationConfig::default())
            .process(ctx)
            .unwrap();
        LaiScorer::new(ScoringConfig::default()).process(ctx).unwrap()
    }

    #[test]
    fn uniform_green_gets_one_value_everywhere() {
        let ctx = scored(solid(10, 10, [0, 128, 0]), CropType::Wheat);
        let map = ctx.lai_map();
        // hsv (60, 255, 128): greenness 1 - |1/3 - 0.17| * 3
        let expected = 0.5 + 4.5 * (1.0 - (60.0f32 / 180.0 - 0.17).abs() * 3.0) * (128.0 / 255.0);
        assert_eq!(ctx.clusters().len(), 1);
        assert!(map.defined_values().all(|v| (v - expected).abs() < 1e-5));
        assert!((map.average().unwrap() - expected as f64).abs() < 1e-5);
    }

    #[test]
    fn values_stay_in_range() {
        let ctx = scored(field_with_soil(40, 30), CropType::Mixed);
        assert!(ctx.lai_map().defined_values().all(|v| (0.0..=6.0).contains(&v)));
        assert_eq!(ctx.lai_map().defined_values().count(), 1200);
    }

    #[test]
    fn crop_type_does_not_change_the_map() {
        let wheat = scored(field_with_soil(20, 20), CropType::Wheat);
        let corn = scored(field_with_soil(20, 20), CropType::Corn);
        assert_eq!(wheat.lai_map().values(), corn.lai_map().values());
    }

    #[test]
    fn greener_cluster_scores_higher() {
        let ctx = scored(field_with_soil(20, 20), CropType::Mixed);
        // Left half is canopy, right half soil.
        let canopy = ctx.lai_map().get(0, 0).unwrap();
        let soil = ctx.lai_map().get(19, 19).unwrap();
        assert!(canopy > soil, "canopy {} soil {}", canopy, soil);
    }
}
