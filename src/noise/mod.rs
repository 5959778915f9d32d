//! Procedural noise fields: cellular (Worley) and coherent (Perlin) noise.
//!
//! Every generator returns a [`Field`](crate::field::Field) normalized into
//! [0, 1].

mod batch;
mod perlin;
mod worley;

use thiserror::Error;

use crate::field::FieldError;

pub use batch::{BatchConfig, batch_file_name, batch_rng, run_worley_batch};
pub use perlin::{
    PerlinParams, TileablePerlin, perlin_noise, perlin_noise_2d, perlin_noise_3d,
};
pub use worley::{SeedPoints, worley_field, worley_noise, worley_noise_2d, worley_noise_3d};

/// Errors raised while generating noise fields.
#[derive(Error, Debug)]
pub enum NoiseError {
    #[error("frequency must be a positive cell size, got {0}")]
    InvalidFrequency(usize),
    #[error("shape {shape:?} holds no whole cells of size {frequency}")]
    NoSeedPoints { shape: Vec<usize>, frequency: usize },
    #[error("expected a {expected}D shape, got {actual}D")]
    DimensionMismatch { expected: &'static str, actual: usize },
    #[error("scale must be positive and finite, got {0}")]
    InvalidScale(f64),
    #[error("octaves must be at least 1")]
    NoOctaves,
    #[error(transparent)]
    Field(#[from] FieldError),
    #[error("failed to write {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: crate::export::ExportError,
    },
}
