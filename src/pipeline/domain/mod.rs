pub mod buffer;
pub mod calculation;
pub mod clustering;
pub mod crop_type;
pub mod hsv;
pub mod lai_map;
pub mod palette;

pub use calculation::{CalculationRequest, CalculationResult};
pub use clustering::{ClusterAssignment, KMeansParams};
pub use crop_type::CropType;
pub use hsv::HsvImage;
pub use lai_map::{ClusterStats, LaiMap};
pub use palette::{LAI_PALETTE, Palette};
