use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, GrayImage, ImageEncoder, Luma, Rgb, RgbImage};
use imageproc::contours::find_contours;
use imageproc::drawing::{draw_filled_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

use crate::config::RenderConfig;
use crate::error::PipelineError;
use crate::pipeline::context::{ImageContext, RenderedState, ScoredState, StepKind};
use crate::pipeline::domain::buffer;
use crate::pipeline::domain::lai_map::LaiMap;
use crate::pipeline::domain::palette::{PALETTE_SIZE, Palette};
use crate::pipeline::orchestration::ProcessingStep;

const LEGEND_MARGIN: u32 = 2;
const MIN_SWATCH: u32 = 2;
const CONTOUR_STEP: f32 = 0.5;
const CONTOUR_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Paints the LAI map with the palette and encodes it as PNG.
#[derive(Debug, Clone)]
pub struct HeatmapRenderer {
    palette: Palette,
    max_lai: f32,
    config: RenderConfig,
}

impl HeatmapRenderer {
    pub fn new(palette: Palette, max_lai: f32, config: RenderConfig) -> Self {
        Self {
            palette,
            max_lai,
            config,
        }
    }

    pub fn overlay_enabled(&self) -> bool {
        self.config.overlay_alpha.is_some()
    }

    pub fn paint(&self, map: &LaiMap, backdrop: Option<&RgbImage>) -> Result<RgbImage, PipelineError> {
        if map.is_empty() || map.width() == 0 || map.height() == 0 {
            return Err(PipelineError::Render("LAI map has no pixels".to_string()));
        }

        let mut raw = buffer::try_with_capacity(map.values().len() * 3, "rendering")?;
        for &value in map.values() {
            raw.extend_from_slice(&self.palette.color_for(value, self.max_lai).0);
        }
        let mut image = RgbImage::from_raw(map.width(), map.height(), raw)
            .ok_or_else(|| PipelineError::Render("heatmap buffer does not match map size".to_string()))?;

        if let (Some(alpha), Some(backdrop)) = (self.config.overlay_alpha, backdrop) {
            blend(&mut image, backdrop, alpha);
        }

        // Isolines are not palette colors, so they only go on overlays.
        if self.config.contours && self.overlay_enabled() {
            self.draw_contours(&mut image, map);
        }

        if self.config.legend {
            self.draw_legend(&mut image);
        }

        Ok(image)
    }

    pub fn encode(&self, image: &RgbImage) -> Result<Vec<u8>, PipelineError> {
        let mut bytes = Vec::new();
        PngEncoder::new_with_quality(&mut bytes, CompressionType::Best, FilterType::Adaptive)
            .write_image(image.as_raw(), image.width(), image.height(), ExtendedColorType::Rgb8)
            .map_err(|e| PipelineError::Render(e.to_string()))?;
        if bytes.is_empty() {
            return Err(PipelineError::Render("encoder produced no output".to_string()));
        }
        Ok(bytes)
    }

    /// One square per palette entry, low to high, in the bottom-left corner.
    /// Skipped when the image is too small to hold it.
    fn draw_legend(&self, image: &mut RgbImage) {
        let (width, height) = image.dimensions();
        let swatch = (width.min(height) / 24).max(MIN_SWATCH);
        let legend_width = swatch * PALETTE_SIZE as u32 + 2 * LEGEND_MARGIN;
        if legend_width > width || swatch + 2 * LEGEND_MARGIN > height {
            tracing::debug!("Image {}x{} too small for a legend", width, height);
            return;
        }

        let top = height - LEGEND_MARGIN - swatch;
        for (i, color) in self.palette.colors().iter().enumerate() {
            let left = LEGEND_MARGIN + i as u32 * swatch;
            let rect = Rect::at(left as i32, top as i32).of_size(swatch, swatch);
            draw_filled_rect_mut(image, rect, *color);
        }
    }

    /// Outlines the regions at or above each multiple of `CONTOUR_STEP`.
    fn draw_contours(&self, image: &mut RgbImage, map: &LaiMap) {
        let (width, height) = (map.width(), map.height());
        let mut level = CONTOUR_STEP;
        while level < self.max_lai {
            let mask = GrayImage::from_fn(width, height, |x, y| match map.get(x, y) {
                Some(v) if v >= level => Luma([255]),
                _ => Luma([0]),
            });
            level += CONTOUR_STEP;

            let covered = mask.pixels().filter(|px| px[0] > 0).count();
            if covered == 0 || covered == width as usize * height as usize {
                continue;
            }

            for contour in find_contours::<i32>(&mask) {
                let points = &contour.points;
                for (i, start) in points.iter().enumerate() {
                    let end = points[(i + 1) % points.len()];
                    draw_line_segment_mut(
                        image,
                        (start.x as f32, start.y as f32),
                        (end.x as f32, end.y as f32),
                        CONTOUR_COLOR,
                    );
                }
            }
        }
    }
}

fn blend(image: &mut RgbImage, backdrop: &RgbImage, alpha: f32) {
    if image.dimensions() != backdrop.dimensions() {
        tracing::warn!("Overlay backdrop size differs from the LAI map, drawing flat heatmap");
        return;
    }
    for (px, under) in image.pixels_mut().zip(backdrop.pixels()) {
        let mixed: [u8; 3] = std::array::from_fn(|c| {
            (alpha * px[c] as f32 + (1.0 - alpha) * under[c] as f32).round() as u8
        });
        *px = Rgb(mixed);
    }
}

impl ProcessingStep<ScoredState, RenderedState> for HeatmapRenderer {
    fn process(
        &self,
        context: ImageContext<ScoredState>,
    ) -> Result<ImageContext<RenderedState>, PipelineError> {
        let average = context
            .lai_map()
            .average()
            .ok_or_else(|| PipelineError::Render("LAI map has no defined values".to_string()))?;
        let image = self.paint(context.lai_map(), context.backdrop())?;
        let heatmap = self.encode(&image)?;
        drop(image);
        Ok(context.into_rendered(heatmap, average))
    }

    fn name(&self) -> &'static str {
        "heatmap_renderer"
    }

    fn kind(&self) -> StepKind {
        StepKind::Render
    }
}
