use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

pub fn solid(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Left half canopy, right half bare soil, two shades each in a checker.
pub fn field_with_soil(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let shade = (x + y) % 2 == 0;
        match (x < width / 2, shade) {
            (true, true) => Rgb([100, 180, 30]),
            (true, false) => Rgb([90, 170, 40]),
            (false, true) => Rgb([110, 95, 85]),
            (false, false) => Rgb([100, 90, 80]),
        }
    })
}

/// Canopy and soil with a deterministic per-pixel jitter, so clustering has
/// many distinct colors to work with.
pub fn noisy_field(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let jitter = ((x.wrapping_mul(31) ^ y.wrapping_mul(17)) % 23) as u8;
        if (x / 8 + y / 8) % 3 == 0 {
            Rgb([120 + jitter, 90 + jitter / 2, 60])
        } else {
            Rgb([40 + jitter, 150 + jitter, 30 + jitter / 3])
        }
    })
}

pub fn encode_png(image: &RgbImage) -> Vec<u8> {
    encode(image, ImageFormat::Png)
}

pub fn encode_jpeg(image: &RgbImage) -> Vec<u8> {
    encode(image, ImageFormat::Jpeg)
}

fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("in-memory encode");
    bytes
}
