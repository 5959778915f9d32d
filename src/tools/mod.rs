//! Image preprocessing tools, one per pipeline step.

mod displace;
mod palette;
mod resize;
mod stretch;

use thiserror::Error;

use crate::raster::RasterError;

pub use displace::{Displacement, NormalMapOptions, combine_elevation, normal_map};
pub use palette::{KMeansParams, Palette, PaletteOptions, dominant_colours, recolour};
pub use resize::{ResizeOptions, downscale};
pub use stretch::{contrast_stretch, side_by_side};

/// Errors shared by the image tools.
#[derive(Error, Debug)]
pub enum ToolError {
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("downscale factor must be at least 1, got {0}")]
    InvalidFactor(u32),
    #[error("{width}x{height} image is too small for a 1/{factor} downscale")]
    TooSmall { width: u32, height: u32, factor: u32 },
    #[error("images differ in size: {a:?} vs {b:?}")]
    ShapeMismatch { a: (u32, u32), b: (u32, u32) },
    #[error("expected at least {expected} channels, got {actual}")]
    Channels { expected: usize, actual: usize },
    #[error("cluster count must be at least 1")]
    NoClusters,
}
