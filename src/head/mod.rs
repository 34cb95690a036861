pub mod source;
pub mod tracker;
pub mod worker;

pub use tracker::{HeadTracker, OrientationSample, ViolationKind};
