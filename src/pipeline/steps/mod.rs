pub mod loader;
pub mod renderer;
pub mod scorer;
pub mod segmenter;

pub use loader::ImageLoader;
pub use renderer::HeatmapRenderer;
pub use scorer::LaiScorer;
pub use segmenter::ColorSegmenter;
