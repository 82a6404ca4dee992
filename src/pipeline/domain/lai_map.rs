use serde::Serialize;

use crate::config::ScoringConfig;
use crate::error::PipelineError;
use crate::pipeline::domain::buffer;
use crate::pipeline::domain::clustering::ClusterAssignment;
use crate::pipeline::domain::hsv::HsvImage;

/// Mean color statistics of one non-empty cluster and the LAI derived from
/// them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterStats {
    pub label: u8,
    pub pixel_count: usize,
    pub mean_hue: f32,
    pub mean_saturation: f32,
    pub mean_value: f32,
    pub greenness: f32,
    pub lai: f32,
}

/// Triangular score peaking at `reference_hue` and reaching zero
/// `1 / hue_falloff` away from it.
pub fn greenness(normalized_hue: f32, config: &ScoringConfig) -> f32 {
    (1.0 - (normalized_hue - config.reference_hue).abs() * config.hue_falloff).max(0.0)
}

/// LAI of a cluster from its mean HSV values (hue on the 0..180 scale,
/// saturation and value on 0..255).
pub fn cluster_lai(mean_hue: f32, mean_saturation: f32, mean_value: f32, config: &ScoringConfig) -> f32 {
    let hue = mean_hue / config.hue_scale;
    let saturation = mean_saturation / 255.0;
    let value = mean_value / 255.0;
    let lai = config.base + config.weight * greenness(hue, config) * saturation * value;
    lai.clamp(config.min_lai, config.max_lai)
}

/// Per-cluster means over member pixels. Empty clusters are skipped.
pub fn cluster_stats(
    hsv: &HsvImage,
    assignment: &ClusterAssignment,
    config: &ScoringConfig,
) -> Vec<ClusterStats> {
    let k = assignment.cluster_count();
    let mut sums = vec![[0u64; 3]; k];
    let mut counts = vec![0usize; k];
    for (px, &label) in hsv.pixels().iter().zip(assignment.labels()) {
        let label = label as usize;
        sums[label][0] += px[0] as u64;
        sums[label][1] += px[1] as u64;
        sums[label][2] += px[2] as u64;
        counts[label] += 1;
    }

    sums.iter()
        .zip(&counts)
        .enumerate()
        .filter(|(_, (_, count))| **count > 0)
        .map(|(label, (sum, &count))| {
            let n = count as f64;
            let mean_hue = (sum[0] as f64 / n) as f32;
            let mean_saturation = (sum[1] as f64 / n) as f32;
            let mean_value = (sum[2] as f64 / n) as f32;
            ClusterStats {
                label: label as u8,
                pixel_count: count,
                mean_hue,
                mean_saturation,
                mean_value,
                greenness: greenness(mean_hue / config.hue_scale, config),
                lai: cluster_lai(mean_hue, mean_saturation, mean_value, config),
            }
        })
        .collect()
}

/// Per-pixel LAI, row-major. Pixels without a value hold NaN.
#[derive(Debug, Clone)]
pub struct LaiMap {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl LaiMap {
    /// Paints every pixel with the LAI of its cluster.
    pub fn from_clusters(
        assignment: &ClusterAssignment,
        stats: &[ClusterStats],
    ) -> Result<Self, PipelineError> {
        let mut by_label = vec![f32::NAN; assignment.cluster_count()];
        for s in stats {
            by_label[s.label as usize] = s.lai;
        }

        let mut values = buffer::try_with_capacity(assignment.labels().len(), "scoring")?;
        values.extend(assignment.labels().iter().map(|&l| by_label[l as usize]));

        Ok(Self {
            width: assignment.width(),
            height: assignment.height(),
            values,
        })
    }

    pub fn from_values(width: u32, height: u32, values: Vec<f32>) -> Option<Self> {
        (values.len() == width as usize * height as usize).then_some(Self {
            width,
            height,
            values,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.values
            .get(y as usize * self.width as usize + x as usize)
            .copied()
            .filter(|v| !v.is_nan())
    }

    /// Raw row-major values, NaN marking undefined pixels.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn defined_values(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied().filter(|v| !v.is_nan())
    }

    /// Mean over defined pixels; `None` when no pixel is defined.
    pub fn average(&self) -> Option<f64> {
        let (sum, count) = self
            .defined_values()
            .fold((0.0f64, 0usize), |(sum, count), v| (sum + v as f64, count + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::domain::clustering::{KMeansParams, segment};
    use image::{Rgb, RgbImage};

    #[test]
    fn greenness_peaks_at_reference_hue() {
        let config = ScoringConfig::default();
        assert!((greenness(0.17, &config) - 1.0).abs() < 1e-6);
        assert_eq!(greenness(0.17 + 1.0 / 3.0 + 0.01, &config), 0.0);
        assert_eq!(greenness(0.0 + 0.9, &config), 0.0);
        assert!((greenness(0.27, &config) - 0.7).abs() < 1e-5);
    }

    #[test]
    fn lai_follows_formula() {
        let config = ScoringConfig::default();
        // Hue 30.6 / 180 = 0.17, full saturation and value.
        let lai = cluster_lai(30.6, 255.0, 255.0, &config);
        assert!((lai - (0.5 + config.weight)).abs() < 1e-4);

        // Blue hue, far from green.
        let lai = cluster_lai(110.0, 150.0, 100.0, &config);
        assert!((lai - 0.5).abs() < 1e-6);
    }

    #[test]
    fn lai_is_clamped() {
        let config = ScoringConfig {
            weight: 50.0,
            ..ScoringConfig::default()
        };
        assert_eq!(cluster_lai(30.6, 255.0, 255.0, &config), 6.0);

        let config = ScoringConfig {
            base: -2.0,
            ..ScoringConfig::default()
        };
        assert_eq!(cluster_lai(120.0, 0.0, 0.0, &config), 0.0);
    }

    #[test]
    fn empty_clusters_are_skipped_and_average_ignores_undefined() {
        let config = ScoringConfig::default();
        let rgb = RgbImage::from_fn(4, 4, |x, _| {
            if x < 2 { Rgb([0, 128, 0]) } else { Rgb([120, 80, 40]) }
        });
        let hsv = HsvImage::from_rgb(&rgb).unwrap();
        let assignment = segment(
            &hsv,
            &KMeansParams {
                k: 4,
                n_init: 1,
                max_iterations: 10,
                tolerance: 0.0,
                seed: 42,
            },
        )
        .unwrap();

        let stats = cluster_stats(&hsv, &assignment, &config);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats.iter().map(|s| s.pixel_count).sum::<usize>(), 16);

        let map = LaiMap::from_clusters(&assignment, &stats).unwrap();
        let expected = (stats[0].lai as f64 + stats[1].lai as f64) / 2.0;
        assert!((map.average().unwrap() - expected).abs() < 1e-6);

        let partial = LaiMap::from_values(2, 1, vec![2.0, f32::NAN]).unwrap();
        assert_eq!(partial.average(), Some(2.0));
        assert_eq!(partial.get(1, 0), None);
        assert_eq!(partial.defined_values().count(), 1);
    }

    #[test]
    fn all_undefined_map_has_no_average() {
        let map = LaiMap::from_values(1, 1, vec![f32::NAN]).unwrap();
        assert_eq!(map.average(), None);
        assert!(LaiMap::from_values(2, 2, vec![0.0]).is_none());
    }
}
