use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::AppError;

pub const MAX_INPUT_BYTES: usize = 5 * 1024 * 1024;
pub const LEGACY_MAX_INPUT_BYTES: usize = 10 * 1024 * 1024;
pub const MAX_DIMENSION: u32 = 1024;
pub const DECODE_ALLOC_LIMIT: u64 = 256 * 1024 * 1024;

pub const CLUSTER_COUNT: usize = 4;
pub const LEGACY_CLUSTER_COUNT: usize = 5;
pub const CLUSTER_SEED: u64 = 42;
pub const CLUSTER_RESTARTS: usize = 3;
pub const LEGACY_CLUSTER_RESTARTS: usize = 10;
pub const MAX_ITERATIONS: usize = 300;
pub const TOLERANCE: f64 = 1e-4;

pub const LAI_WEIGHT: f32 = 4.5;
pub const LEGACY_LAI_WEIGHT: f32 = 5.0;
pub const LAI_BASE: f32 = 0.5;
pub const LAI_MIN: f32 = 0.0;
pub const LAI_MAX: f32 = 6.0;
pub const HUE_SCALE: f32 = 180.0;
pub const REFERENCE_HUE: f32 = 0.17;
pub const HUE_FALLOFF: f32 = 3.0;

pub const CALCULATION_TIMEOUT_MS: u64 = 30_000;
pub const MAX_CONCURRENT_CALCULATIONS: usize = 4;

const ENV_PREFIX: &str = "LAI";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub limits: InputLimits,
    pub segmentation: SegmentationConfig,
    pub scoring: ScoringConfig,
    pub rendering: RenderConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    pub max_input_bytes: usize,
    /// Longest side kept after decoding. `None` keeps the native resolution.
    pub max_dimension: Option<u32>,
    pub decode_alloc_limit: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub cluster_count: usize,
    pub seed: u64,
    /// Independent k-means runs; the one with the lowest inertia is kept.
    pub n_init: usize,
    pub max_iterations: usize,
    /// Relative to the mean per-channel variance of the HSV colors.
    pub tolerance: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weight: f32,
    pub base: f32,
    pub min_lai: f32,
    pub max_lai: f32,
    pub hue_scale: f32,
    pub reference_hue: f32,
    pub hue_falloff: f32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub legend: bool,
    /// Blend the palette over the photograph instead of drawing it flat.
    pub overlay_alpha: Option<f32>,
    /// LAI isolines every 0.5; only drawn together with the overlay.
    pub contours: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub timeout_ms: Option<u64>,
    pub max_concurrent: usize,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            limits: InputLimits::default(),
            segmentation: SegmentationConfig::default(),
            scoring: ScoringConfig::default(),
            rendering: RenderConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_input_bytes: MAX_INPUT_BYTES,
            max_dimension: Some(MAX_DIMENSION),
            decode_alloc_limit: DECODE_ALLOC_LIMIT,
        }
    }
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            cluster_count: CLUSTER_COUNT,
            seed: CLUSTER_SEED,
            n_init: CLUSTER_RESTARTS,
            max_iterations: MAX_ITERATIONS,
            tolerance: TOLERANCE,
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight: LAI_WEIGHT,
            base: LAI_BASE,
            min_lai: LAI_MIN,
            max_lai: LAI_MAX,
            hue_scale: HUE_SCALE,
            reference_hue: REFERENCE_HUE,
            hue_falloff: HUE_FALLOFF,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            timeout_ms: Some(CALCULATION_TIMEOUT_MS),
            max_concurrent: MAX_CONCURRENT_CALCULATIONS,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Configuration {
    /// The first-generation heuristic: five clusters, heavier weight, ten
    /// restarts, no downscaling and a 10 MiB ceiling.
    pub fn legacy() -> Self {
        Self {
            limits: InputLimits {
                max_input_bytes: LEGACY_MAX_INPUT_BYTES,
                max_dimension: None,
                ..InputLimits::default()
            },
            segmentation: SegmentationConfig {
                cluster_count: LEGACY_CLUSTER_COUNT,
                n_init: LEGACY_CLUSTER_RESTARTS,
                ..SegmentationConfig::default()
            },
            scoring: ScoringConfig {
                weight: LEGACY_LAI_WEIGHT,
                ..ScoringConfig::default()
            },
            ..Self::default()
        }
    }

    /// Loads defaults, then the optional file, then `LAI__*` environment
    /// variables (`LAI__SEGMENTATION__CLUSTER_COUNT=5`).
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let configuration: Configuration = settings.try_deserialize()?;
        configuration
            .validate()
            .map_err(crate::error::PipelineError::InvalidConfig)?;
        Ok(configuration)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.limits.max_input_bytes == 0 {
            return Err("Input byte ceiling must be greater than 0".to_string());
        }

        if self.limits.max_dimension == Some(0) {
            return Err("Maximum dimension must be greater than 0".to_string());
        }

        let segmentation = &self.segmentation;
        if segmentation.cluster_count == 0 || segmentation.cluster_count > u8::MAX as usize {
            return Err("Cluster count must be between 1 and 255".to_string());
        }

        if segmentation.n_init == 0 {
            return Err("Clustering restarts must be greater than 0".to_string());
        }

        if segmentation.max_iterations == 0 {
            return Err("Clustering iterations must be greater than 0".to_string());
        }

        if !(segmentation.tolerance >= 0.0) {
            return Err("Clustering tolerance must not be negative".to_string());
        }

        let scoring = &self.scoring;
        if !(0.0..=100.0).contains(&scoring.weight) {
            return Err("LAI weight must be between 0.0 and 100.0".to_string());
        }

        if !(scoring.min_lai >= LAI_MIN && scoring.max_lai <= LAI_MAX) {
            return Err(format!("LAI range must stay within {LAI_MIN}..={LAI_MAX}"));
        }

        if !(scoring.min_lai < scoring.max_lai) {
            return Err("LAI range must have min below max".to_string());
        }

        if !(scoring.hue_scale > 0.0) {
            return Err("Hue scale must be greater than 0".to_string());
        }

        if let Some(alpha) = self.rendering.overlay_alpha {
            if !(0.0..=1.0).contains(&alpha) {
                return Err("Overlay alpha must be between 0.0 and 1.0".to_string());
            }
        }

        if self.service.max_concurrent == 0 {
            return Err("Concurrency limit must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        assert!(Configuration::default().validate().is_ok());
        assert!(Configuration::legacy().validate().is_ok());
    }

    #[test]
    fn legacy_profile_differs_from_reference() {
        let legacy = Configuration::legacy();
        assert_eq!(legacy.segmentation.cluster_count, 5);
        assert_eq!(legacy.segmentation.n_init, 10);
        assert_eq!(legacy.scoring.weight, 5.0);
        assert_eq!(legacy.limits.max_dimension, None);
        assert_eq!(legacy.limits.max_input_bytes, 10 * 1024 * 1024);

        let reference = Configuration::default();
        assert_eq!(reference.segmentation.cluster_count, 4);
        assert_eq!(reference.limits.max_dimension, Some(1024));
        assert_eq!(reference.limits.max_input_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn rejects_bad_values() {
        let mut cfg = Configuration::default();
        cfg.segmentation.cluster_count = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Configuration::default();
        cfg.segmentation.cluster_count = 300;
        assert!(cfg.validate().is_err());

        let mut cfg = Configuration::default();
        cfg.rendering.overlay_alpha = Some(1.5);
        assert!(cfg.validate().is_err());

        let mut cfg = Configuration::default();
        cfg.service.max_concurrent = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = Configuration::default();
        cfg.scoring.max_lai = 50.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Configuration::default();
        cfg.scoring.min_lai = -1.0;
        assert!(cfg.validate().is_err());

        let mut cfg = Configuration::default();
        cfg.scoring.min_lai = 4.0;
        cfg.scoring.max_lai = 2.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn narrower_lai_range_is_accepted() {
        let mut cfg = Configuration::default();
        cfg.scoring.min_lai = 1.0;
        cfg.scoring.max_lai = 5.0;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn loads_partial_file_over_defaults() {
        let dir = std::env::temp_dir().join(format!("lai-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lai.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[segmentation]\ncluster_count = 6\n\n[rendering]\nlegend = true").unwrap();
        drop(file);

        let cfg = Configuration::load(Some(&path)).unwrap();
        assert_eq!(cfg.segmentation.cluster_count, 6);
        assert_eq!(cfg.segmentation.seed, CLUSTER_SEED);
        assert!(cfg.rendering.legend);
        assert_eq!(cfg.scoring.weight, LAI_WEIGHT);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn invalid_file_values_are_rejected() {
        let dir = std::env::temp_dir().join(format!("lai-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("lai.toml");
        std::fs::write(&path, "[service]\nmax_concurrent = 0\n").unwrap();

        let err = Configuration::load(Some(&path)).unwrap_err();
        assert!(matches!(
            err,
            AppError::Pipeline(crate::error::PipelineError::InvalidConfig(_))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
