pub mod controller;
pub mod player;
pub mod surface;
pub mod watcher;

pub use controller::{MediaController, Presentation};
pub use surface::{MediaSurface, PopupGeometry};
