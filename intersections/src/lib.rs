pub mod nema8;
pub mod registry;

pub use registry::{IntersectionEntry, all, find};
