pub mod camera;
pub mod explorer;
pub mod legend;
pub mod mesh;
pub mod neighbors;
pub mod palette;
pub mod paper;
pub mod picking;
pub mod pointer;
pub mod selection;
pub mod spatial;

pub use explorer::*;
