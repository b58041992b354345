pub mod difference_engine;
pub mod latency;
pub mod luma_frame;
pub mod overlay;
pub mod synthetic;
pub mod threshold;
pub mod tile;
pub mod tile_grid;
