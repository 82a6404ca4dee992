use image::imageops::FilterType;
use image::{DynamicImage, ImageError, ImageReader, Limits, RgbImage};
use std::io::Cursor;

use crate::config::InputLimits;
use crate::error::PipelineError;
use crate::pipeline::context::{ImageContext, LoadedState, ReceivedState, StepKind};
use crate::pipeline::orchestration::ProcessingStep;

/// Decodes the uploaded bytes into a bounded RGB grid.
#[derive(Debug, Clone)]
pub struct ImageLoader {
    limits: InputLimits,
}

impl ImageLoader {
    pub fn new(limits: InputLimits) -> Self {
        Self { limits }
    }

    /// Size checks happen before any decoding is attempted.
    pub fn check_payload(&self, bytes: &[u8]) -> Result<(), PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        if bytes.len() > self.limits.max_input_bytes {
            return Err(PipelineError::OversizeInput {
                size: bytes.len(),
                limit: self.limits.max_input_bytes,
            });
        }
        Ok(())
    }

    pub fn load(&self, bytes: &[u8]) -> Result<RgbImage, PipelineError> {
        self.check_payload(bytes)?;

        let mut reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(ImageError::IoError)?;
        let mut limits = Limits::default();
        limits.max_alloc = Some(self.limits.decode_alloc_limit);
        reader.limits(limits);

        let image = reader.decode().map_err(|e| match e {
            ImageError::Limits(limit) => PipelineError::exhausted("decoding", limit.to_string()),
            other => PipelineError::Decode(other),
        })?;

        Ok(self.downscale(image).into_rgb8())
    }

    fn downscale(&self, image: DynamicImage) -> DynamicImage {
        let Some(max) = self.limits.max_dimension else {
            return image;
        };
        let (width, height) = (image.width(), image.height());
        if width <= max && height <= max {
            return image;
        }

        // `resize` keeps the aspect ratio and fits inside max × max.
        let resized = image.resize(max, max, FilterType::Lanczos3);
        tracing::debug!(
            "Downscaled {}x{} image to {}x{}",
            width,
            height,
            resized.width(),
            resized.height()
        );
        resized
    }
}

impl ProcessingStep<ReceivedState, LoadedState> for ImageLoader {
    fn process(
        &self,
        context: ImageContext<ReceivedState>,
    ) -> Result<ImageContext<LoadedState>, PipelineError> {
        let rgb = self.load(context.bytes())?;
        Ok(context.into_loaded(rgb))
    }

    fn name(&self) -> &'static str {
        "image_loader"
    }

    fn kind(&self) -> StepKind {
        StepKind::Load
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::{encode_jpeg, encode_png, solid};
    use image::{Rgb, Rgba, RgbaImage};

    fn loader() -> ImageLoader {
        ImageLoader::new(InputLimits::default())
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(loader().load(&[]), Err(PipelineError::EmptyInput)));
    }

    #[test]
    fn oversize_input_is_rejected_before_decoding() {
        let loader = ImageLoader::new(InputLimits {
            max_input_bytes: 16,
            ..InputLimits::default()
        });
        // Not an image at all: a decode attempt would fail differently.
        let err = loader.load(&[0xAB; 17]).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::OversizeInput {
                size: 17,
                limit: 16
            }
        ));
    }

    #[test]
    fn garbage_fails_to_decode() {
        let err = loader().load(b"definitely not an image, just text").unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn truncated_png_fails_to_decode() {
        let png = encode_png(&solid(16, 16, [0, 128, 0]));
        let err = loader().load(&png[..png.len() / 2]).unwrap_err();
        assert!(matches!(err, PipelineError::Decode(_)));
    }

    #[test]
    fn decodes_png_and_jpeg() {
        let image = solid(20, 10, [0, 128, 0]);
        let png = loader().load(&encode_png(&image)).unwrap();
        assert_eq!(png.dimensions(), (20, 10));
        assert_eq!(png.get_pixel(3, 3), &Rgb([0, 128, 0]));

        let jpeg = loader().load(&encode_jpeg(&image)).unwrap();
        assert_eq!(jpeg.dimensions(), (20, 10));
    }

    #[test]
    fn alpha_is_dropped() {
        let rgba = RgbaImage::from_pixel(4, 4, Rgba([10, 200, 30, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(rgba)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        let rgb = loader().load(&bytes).unwrap();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([10, 200, 30]));
    }

    #[test]
    fn large_images_are_downscaled_proportionally() {
        let loader = ImageLoader::new(InputLimits {
            max_dimension: Some(64),
            ..InputLimits::default()
        });
        let rgb = loader.load(&encode_png(&solid(256, 128, [0, 128, 0]))).unwrap();
        assert_eq!(rgb.dimensions(), (64, 32));

        let small = loader.load(&encode_png(&solid(40, 20, [0, 128, 0]))).unwrap();
        assert_eq!(small.dimensions(), (40, 20));
    }

    #[test]
    fn no_cap_keeps_native_resolution() {
        let loader = ImageLoader::new(InputLimits {
            max_dimension: None,
            ..InputLimits::default()
        });
        let rgb = loader.load(&encode_png(&solid(300, 20, [0, 128, 0]))).unwrap();
        assert_eq!(rgb.dimensions(), (300, 20));
    }

    #[test]
    fn decoder_allocation_limit_is_resource_exhaustion() {
        let loader = ImageLoader::new(InputLimits {
            decode_alloc_limit: 64,
            ..InputLimits::default()
        });
        let err = loader.load(&encode_png(&solid(64, 64, [0, 128, 0]))).unwrap_err();
        assert!(matches!(err, PipelineError::ResourceExhausted { .. }));
    }
}
