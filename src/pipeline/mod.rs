pub mod builder;
pub mod defaults;
pub mod emission;
pub mod segmenter;
pub mod traits;
