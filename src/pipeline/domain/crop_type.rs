use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Crop grown in the photographed field. Stored with every calculation;
/// the color heuristic does not use it yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropType {
    Wheat,
    Corn,
    Sunflower,
    #[default]
    Mixed,
}

impl CropType {
    pub const ALL: [CropType; 4] = [
        CropType::Wheat,
        CropType::Corn,
        CropType::Sunflower,
        CropType::Mixed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CropType::Wheat => "wheat",
            CropType::Corn => "corn",
            CropType::Sunflower => "sunflower",
            CropType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for CropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCropType(pub String);

impl fmt::Display for UnknownCropType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown crop type '{}'", self.0)
    }
}

impl std::error::Error for UnknownCropType {}

impl FromStr for CropType {
    type Err = UnknownCropType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        CropType::ALL
            .into_iter()
            .find(|crop| crop.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownCropType(trimmed.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Wheat".parse::<CropType>(), Ok(CropType::Wheat));
        assert_eq!(" corn ".parse::<CropType>(), Ok(CropType::Corn));
        assert_eq!("SUNFLOWER".parse::<CropType>(), Ok(CropType::Sunflower));
        assert_eq!("mixed".parse::<CropType>(), Ok(CropType::Mixed));
        assert!("rice".parse::<CropType>().is_err());
    }

    #[test]
    fn default_is_mixed() {
        assert_eq!(CropType::default(), CropType::Mixed);
        assert_eq!(CropType::default().to_string(), "mixed");
    }
}
