use image::Rgb;

/// Dark brown (bare soil) through dense green canopy.
pub const LAI_PALETTE: Palette = Palette::new([
    Rgb([102, 51, 26]),
    Rgb([153, 102, 51]),
    Rgb([204, 179, 77]),
    Rgb([102, 204, 102]),
    Rgb([51, 153, 51]),
    Rgb([0, 102, 0]),
]);

pub const PALETTE_SIZE: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb<u8>; PALETTE_SIZE],
}

impl Palette {
    pub const fn new(colors: [Rgb<u8>; PALETTE_SIZE]) -> Self {
        Self { colors }
    }

    pub fn colors(&self) -> &[Rgb<u8>; PALETTE_SIZE] {
        &self.colors
    }

    /// `floor(clip(v, 0, max) * (size - 1) / max)`. NaN maps to the first
    /// entry.
    pub fn index_for(&self, value: f32, max_lai: f32) -> usize {
        if value.is_nan() || !(max_lai > 0.0) {
            return 0;
        }
        let clipped = value.clamp(0.0, max_lai);
        let index = (clipped * (PALETTE_SIZE - 1) as f32 / max_lai).floor() as usize;
        index.min(PALETTE_SIZE - 1)
    }

    pub fn color_for(&self, value: f32, max_lai: f32) -> Rgb<u8> {
        self.colors[self.index_for(value, max_lai)]
    }

    pub fn contains(&self, color: &Rgb<u8>) -> bool {
        self.colors.contains(color)
    }
}
