//! Cellular (Worley) noise over a jittered seed grid.

use rand::Rng;
use tracing::debug;

use super::NoiseError;
use crate::field::{Field, FieldError, checked_volume};
use crate::spatial::KdTree;

/// One seed point per whole grid cell.
#[derive(Debug, Clone)]
pub struct SeedPoints<const D: usize> {
    points: Vec<[f64; D]>,
}

impl<const D: usize> SeedPoints<D> {
    /// Scatter one uniformly placed point inside every `frequency`-sized cell
    /// of `shape`.
    ///
    /// Cells are counted with integer division, so a trailing remainder along
    /// any axis gets no seed of its own. Shapes that are a multiple of
    /// `frequency` tile without seams.
    pub fn jittered<R: Rng + ?Sized>(
        shape: [usize; D],
        frequency: usize,
        rng: &mut R,
    ) -> Result<Self, NoiseError> {
        if frequency == 0 {
            return Err(NoiseError::InvalidFrequency(frequency));
        }

        let grid: [usize; D] = std::array::from_fn(|axis| shape[axis] / frequency);
        let cell_count = checked_volume(&grid).ok_or_else(|| FieldError::VolumeOverflow {
            shape: shape.to_vec(),
        })?;
        if cell_count == 0 {
            return Err(NoiseError::NoSeedPoints {
                shape: shape.to_vec(),
                frequency,
            });
        }

        let size = frequency as f64;
        let mut points = Vec::with_capacity(cell_count);
        let mut cell = [0usize; D];

        for _ in 0..cell_count {
            points.push(std::array::from_fn(|axis| {
                (cell[axis] as f64 + rng.r#gen::<f64>()) * size
            }));

            for axis in (0..D).rev() {
                cell[axis] += 1;
                if cell[axis] < grid[axis] {
                    break;
                }
                cell[axis] = 0;
            }
        }

        Ok(SeedPoints { points })
    }

    /// Use an explicit point set, e.g. for hand-placed seeds.
    pub fn from_points(points: Vec<[f64; D]>) -> Result<Self, NoiseError> {
        if points.is_empty() {
            return Err(NoiseError::NoSeedPoints {
                shape: Vec::new(),
                frequency: 0,
            });
        }
        Ok(SeedPoints { points })
    }

    pub fn points(&self) -> &[[f64; D]] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Distance from every integer coordinate of `shape` to its nearest seed,
/// min-max normalized into [0, 1]. Not inverted.
pub fn worley_field<const D: usize>(
    shape: [usize; D],
    seeds: &SeedPoints<D>,
) -> Result<Field, NoiseError> {
    let tree = KdTree::build(seeds.points.clone());

    let mut field = Field::from_fn(&shape, |coords| {
        let target: [f64; D] = std::array::from_fn(|axis| coords[axis] as f64);
        // SeedPoints is never empty, so a nearest point always exists
        tree.nearest(&target).map_or(0.0, |n| n.distance)
    })?;

    field.normalize();
    Ok(field)
}

/// 2D Worley noise: dark at seed points, bright between them.
pub fn worley_noise_2d<R: Rng + ?Sized>(
    shape: [usize; 2],
    frequency: usize,
    rng: &mut R,
) -> Result<Field, NoiseError> {
    let seeds = SeedPoints::jittered(shape, frequency, rng)?;
    debug!(?shape, frequency, seeds = seeds.len(), "worley 2d");
    worley_field(shape, &seeds)
}

/// 3D Worley noise, inverted: bright at seed points, dark between them.
///
/// Only the volume is inverted; the 2D variant stays plain distance.
pub fn worley_noise_3d<R: Rng + ?Sized>(
    shape: [usize; 3],
    frequency: usize,
    rng: &mut R,
) -> Result<Field, NoiseError> {
    let seeds = SeedPoints::jittered(shape, frequency, rng)?;
    debug!(?shape, frequency, seeds = seeds.len(), "worley 3d");
    let mut field = worley_field(shape, &seeds)?;
    field.invert();
    Ok(field)
}

/// Dispatch on the dimensionality of `shape`.
pub fn worley_noise<R: Rng + ?Sized>(
    shape: &[usize],
    frequency: usize,
    rng: &mut R,
) -> Result<Field, NoiseError> {
    match *shape {
        [w, h] => worley_noise_2d([w, h], frequency, rng),
        [w, h, d] => worley_noise_3d([w, h, d], frequency, rng),
        _ => Err(NoiseError::DimensionMismatch {
            expected: "2 or 3",
            actual: shape.len(),
        }),
    }
}
