//! Image and geometry utilities shared by the pipeline stages.

pub mod image;
pub mod transform;

pub use transform::rectify_oriented_box;
