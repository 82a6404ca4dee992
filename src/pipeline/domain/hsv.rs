use image::RgbImage;

use crate::error::PipelineError;
use crate::pipeline::domain::buffer;

/// Hue is stored as degrees / 2 so it fits a byte.
pub const HUE_LEVELS: u16 = 180;

/// 8-bit HSV grid with the same shape as the RGB grid it was derived from.
/// Hue in `0..=179`, saturation and value in `0..=255`.
#[derive(Debug, Clone)]
pub struct HsvImage {
    width: u32,
    height: u32,
    data: Vec<[u8; 3]>,
}

impl HsvImage {
    pub fn from_rgb(rgb: &RgbImage) -> Result<Self, PipelineError> {
        let (width, height) = rgb.dimensions();
        let mut data = buffer::try_with_capacity(rgb.len() / 3, "converting to HSV")?;
        data.extend(rgb.pixels().map(|px| rgb_to_hsv(px.0)));
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.data
    }

    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }
}

/// Converts one RGB pixel the way 8-bit OpenCV does: `V = max`,
/// `S = 255 * (max - min) / max`, `H = hue_degrees / 2`, all rounded.
pub fn rgb_to_hsv([r, g, b]: [u8; 3]) -> [u8; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = (max - min) as f32;

    let s = if max == 0 {
        0.0
    } else {
        255.0 * delta / max as f32
    };

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let degrees = if delta == 0.0 {
        0.0
    } else if max as f32 == r {
        60.0 * (g - b) / delta
    } else if max as f32 == g {
        120.0 + 60.0 * (b - r) / delta
    } else {
        240.0 + 60.0 * (r - g) / delta
    };
    let degrees = if degrees < 0.0 { degrees + 360.0 } else { degrees };

    // 359.x degrees rounds up to 180, which is the same hue as 0.
    let h = (degrees / 2.0).round() as u16 % HUE_LEVELS;

    [h as u8, s.round() as u8, max]
}
