pub mod dataset_builder;
pub mod droid;
pub mod image_search;
pub mod image_store;

pub use dataset_builder::*;
pub use droid::*;
pub use image_search::*;
pub use image_store::*;
