// Watermark derivation for incremental measurement fetches

pub mod manager;
pub mod watermark;

pub use manager::WatermarkStore;
pub use watermark::Watermark;
