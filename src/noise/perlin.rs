//! Tileable multi-octave Perlin noise.
//!
//! Lattice coordinates wrap modulo an explicit per-axis repeat period, so a
//! field sampled over exactly one period repeats edge to edge without a seam.

use tracing::debug;

use super::NoiseError;
use crate::field::Field;

// Ken Perlin's reference permutation
const PERMUTATION: [u8; 256] = [
    151, 160, 137, 91, 90, 15, 131, 13, 201, 95, 96, 53, 194, 233, 7, 225, 140, 36, 103, 30, 69,
    142, 8, 99, 37, 240, 21, 10, 23, 190, 6, 148, 247, 120, 234, 75, 0, 26, 197, 62, 94, 252, 219,
    203, 117, 35, 11, 32, 57, 177, 33, 88, 237, 149, 56, 87, 174, 20, 125, 136, 171, 168, 68, 175,
    74, 165, 71, 134, 139, 48, 27, 166, 77, 146, 158, 231, 83, 111, 229, 122, 60, 211, 133, 230,
    220, 105, 92, 41, 55, 46, 245, 40, 244, 102, 143, 54, 65, 25, 63, 161, 1, 216, 80, 73, 209, 76,
    132, 187, 208, 89, 18, 169, 200, 196, 135, 130, 116, 188, 159, 86, 164, 100, 109, 198, 173,
    186, 3, 64, 52, 217, 226, 250, 124, 123, 5, 202, 38, 147, 118, 126, 255, 82, 85, 212, 207, 206,
    59, 227, 47, 16, 58, 17, 182, 189, 28, 42, 223, 183, 170, 213, 119, 248, 152, 2, 44, 154, 163,
    70, 221, 153, 101, 155, 167, 43, 172, 9, 129, 22, 39, 253, 19, 98, 108, 110, 79, 113, 224, 232,
    178, 185, 112, 104, 218, 246, 97, 228, 251, 34, 242, 193, 238, 210, 144, 12, 191, 179, 162,
    241, 81, 51, 145, 235, 249, 14, 239, 107, 49, 192, 214, 31, 181, 199, 106, 157, 184, 84, 204,
    176, 115, 121, 50, 45, 127, 4, 150, 254, 138, 236, 205, 93, 222, 114, 67, 29, 24, 72, 243, 141,
    128, 195, 78, 66, 215, 61, 156, 180,
];

/// Octave layering parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerlinParams {
    /// Number of layers summed together
    pub octaves: u32,
    /// Amplitude multiplier applied per octave
    pub persistence: f64,
    /// Frequency multiplier applied per octave
    pub lacunarity: f64,
    /// Offset into the permutation table, selects a different noise pattern
    pub base: u8,
}

impl Default for PerlinParams {
    fn default() -> Self {
        PerlinParams {
            octaves: 1,
            persistence: 0.5,
            lacunarity: 2.0,
            base: 0,
        }
    }
}

/// Perlin noise that repeats every `repeat[axis]` lattice units.
#[derive(Debug, Clone)]
pub struct TileablePerlin<const D: usize> {
    repeat: [u32; D],
    params: PerlinParams,
}

impl<const D: usize> TileablePerlin<D> {
    pub fn new(repeat: [u32; D], params: PerlinParams) -> Result<Self, NoiseError> {
        if params.octaves == 0 {
            return Err(NoiseError::NoOctaves);
        }
        Ok(TileablePerlin {
            repeat: repeat.map(|r| r.max(1)),
            params,
        })
    }

    pub fn repeat(&self) -> [u32; D] {
        self.repeat
    }

    /// Sum the octaves of `lattice`, weighted and divided by the total
    /// amplitude.
    fn fractal(&self, p: [f64; D], lattice: impl Fn([f64; D], [u32; D]) -> f64) -> f64 {
        let mut total = 0.0;
        let mut amplitude = 1.0;
        let mut frequency = 1.0;
        let mut max_amplitude = 0.0;

        for _ in 0..self.params.octaves {
            // Each octave repeats over a proportionally longer lattice
            let repeat = self.repeat.map(|r| ((r as f64 * frequency) as u32).max(1));
            total += amplitude * lattice(p.map(|v| v * frequency), repeat);
            max_amplitude += amplitude;
            amplitude *= self.params.persistence;
            frequency *= self.params.lacunarity;
        }

        if max_amplitude == 0.0 {
            0.0
        } else {
            total / max_amplitude
        }
    }
}

impl TileablePerlin<2> {
    pub fn sample(&self, p: [f64; 2]) -> f64 {
        let base = self.params.base as usize;
        self.fractal(p, |p, repeat| noise2(p, repeat, base))
    }
}

impl TileablePerlin<3> {
    pub fn sample(&self, p: [f64; 3]) -> f64 {
        let base = self.params.base as usize;
        self.fractal(p, |p, repeat| noise3(p, repeat, base))
    }
}

/// Lattice cell of `v` wrapped into the period, and its wrapped successor
fn wrap_cell(v: f64, repeat: u32) -> (usize, usize) {
    let r = repeat as i64;
    let i = (v.floor() as i64).rem_euclid(r);
    let ii = (i + 1).rem_euclid(r);
    (i as usize, ii as usize)
}

fn perm(i: usize) -> usize {
    PERMUTATION[i & 255] as usize
}

fn fade(t: f64) -> f64 {
    t * t * t * (t * (t * 6.0 - 15.0) + 10.0)
}

fn lerp(t: f64, a: f64, b: f64) -> f64 {
    a + t * (b - a)
}

fn grad2(hash: usize, x: f64, y: f64) -> f64 {
    grad3(hash, x, y, 0.0)
}

fn grad3(hash: usize, x: f64, y: f64, z: f64) -> f64 {
    match hash & 15 {
        0 | 12 => x + y,
        1 | 14 => y - x,
        2 => x - y,
        3 => -x - y,
        4 => x + z,
        5 => z - x,
        6 => x - z,
        7 => -x - z,
        8 => y + z,
        9 | 13 => z - y,
        10 => y - z,
        _ => -y - z,
    }
}

fn noise2([x, y]: [f64; 2], [rx, ry]: [u32; 2], base: usize) -> f64 {
    let (i, ii) = wrap_cell(x, rx);
    let (j, jj) = wrap_cell(y, ry);
    let (i, ii) = (i + base, ii + base);

    let x = x - x.floor();
    let y = y - y.floor();
    let fx = fade(x);
    let fy = fade(y);

    let a = perm(i);
    let b = perm(ii);
    let aa = perm(a + j);
    let ab = perm(a + jj);
    let ba = perm(b + j);
    let bb = perm(b + jj);

    lerp(
        fy,
        lerp(fx, grad2(aa, x, y), grad2(ba, x - 1.0, y)),
        lerp(fx, grad2(ab, x, y - 1.0), grad2(bb, x - 1.0, y - 1.0)),
    )
}

fn noise3([x, y, z]: [f64; 3], [rx, ry, rz]: [u32; 3], base: usize) -> f64 {
    let (i, ii) = wrap_cell(x, rx);
    let (j, jj) = wrap_cell(y, ry);
    let (k, kk) = wrap_cell(z, rz);
    let (i, ii) = (i + base, ii + base);

    let x = x - x.floor();
    let y = y - y.floor();
    let z = z - z.floor();
    let fx = fade(x);
    let fy = fade(y);
    let fz = fade(z);

    let a = perm(i);
    let b = perm(ii);
    let aa = perm(a + j);
    let ab = perm(a + jj);
    let ba = perm(b + j);
    let bb = perm(b + jj);

    lerp(
        fz,
        lerp(
            fy,
            lerp(fx, grad3(perm(aa + k), x, y, z), grad3(perm(ba + k), x - 1.0, y, z)),
            lerp(
                fx,
                grad3(perm(ab + k), x, y - 1.0, z),
                grad3(perm(bb + k), x - 1.0, y - 1.0, z),
            ),
        ),
        lerp(
            fy,
            lerp(
                fx,
                grad3(perm(aa + kk), x, y, z - 1.0),
                grad3(perm(ba + kk), x - 1.0, y, z - 1.0),
            ),
            lerp(
                fx,
                grad3(perm(ab + kk), x, y - 1.0, z - 1.0),
                grad3(perm(bb + kk), x - 1.0, y - 1.0, z - 1.0),
            ),
        ),
    )
}

/// Lattice period per axis for a volume sampled every `1 / scale` units.
///
/// Rounded to whole lattice cells so the volume boundary lands exactly on a
/// period boundary.
fn lattice_periods(shape: [usize; 3], scale: f64) -> [u32; 3] {
    shape.map(|extent| ((extent as f64 / scale).round() as u32).max(1))
}

/// 3D Perlin volume sampled at `coord / scale`, tiling at its own boundary.
pub fn perlin_noise_3d(
    shape: [usize; 3],
    scale: f64,
    params: PerlinParams,
) -> Result<Field, NoiseError> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(NoiseError::InvalidScale(scale));
    }

    let periods = lattice_periods(shape, scale);
    let noise = TileablePerlin::new(periods, params)?;
    debug!(?shape, scale, ?periods, ?params, "perlin 3d");

    // Stretch each axis slightly so `shape` maps onto a whole period
    let step: [f64; 3] = std::array::from_fn(|a| periods[a] as f64 / shape[a].max(1) as f64);

    let mut field = Field::from_fn(&shape, |c| {
        noise.sample([
            c[0] as f64 * step[0],
            c[1] as f64 * step[1],
            c[2] as f64 * step[2],
        ])
    })?;
    field.normalize();
    Ok(field)
}

/// 2D Perlin image of `[height, width]`, one lattice cell per pixel,
/// repeating every `width` x `height` pixels.
pub fn perlin_noise_2d(shape: [usize; 2], params: PerlinParams) -> Result<Field, NoiseError> {
    let [height, width] = shape;
    let noise = TileablePerlin::new([width as u32, height as u32], params)?;
    debug!(?shape, ?params, "perlin 2d");

    // Sample at pixel centres; lattice corners are always zero
    let mut field = Field::from_fn(&shape, |c| {
        noise.sample([c[1] as f64 + 0.5, c[0] as f64 + 0.5])
    })?;
    field.normalize();
    Ok(field)
}

/// Dispatch on the dimensionality of `shape`. `scale` only applies to
/// volumes.
pub fn perlin_noise(
    shape: &[usize],
    scale: f64,
    params: PerlinParams,
) -> Result<Field, NoiseError> {
    match *shape {
        [h, w] => perlin_noise_2d([h, w], params),
        [x, y, z] => perlin_noise_3d([x, y, z], scale, params),
        _ => Err(NoiseError::DimensionMismatch {
            expected: "2 or 3",
            actual: shape.len(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn octaves(octaves: u32) -> PerlinParams {
        PerlinParams {
            octaves,
            ..Default::default()
        }
    }

    #[test]
    fn test_lattice_points_are_zero() {
        let noise = TileablePerlin::new([8, 8, 8], octaves(1)).unwrap();
        assert_eq!(noise.sample([3.0, 5.0, 1.0]), 0.0);

        let noise = TileablePerlin::new([8, 8], octaves(1)).unwrap();
        assert_eq!(noise.sample([2.0, 7.0]), 0.0);
    }

    #[test]
    fn test_3d_tiles_on_every_axis() {
        let noise = TileablePerlin::new([16, 8, 4], octaves(4)).unwrap();
        for &(y, z) in &[(0.3, 0.7), (2.5, 1.25), (7.9, 3.1)] {
            let a = noise.sample([0.0 + 0.37, y, z]);
            let b = noise.sample([16.0 + 0.37, y, z]);
            assert!((a - b).abs() < 1e-9, "x seam: {a} vs {b}");
        }
        let a = noise.sample([1.3, 0.2, 0.9]);
        assert!((a - noise.sample([1.3, 8.2, 0.9])).abs() < 1e-9);
        assert!((a - noise.sample([1.3, 0.2, 4.9])).abs() < 1e-9);
        assert!((a - noise.sample([1.3 - 16.0, 0.2, 0.9])).abs() < 1e-9);
    }

    #[test]
    fn test_2d_tiles_on_both_axes() {
        let noise = TileablePerlin::new([32, 16], octaves(6)).unwrap();
        for i in 0..20 {
            let x = i as f64 * 1.37;
            let y = i as f64 * 0.71;
            let a = noise.sample([x, y]);
            assert!((a - noise.sample([x + 32.0, y])).abs() < 1e-9);
            assert!((a - noise.sample([x, y + 16.0])).abs() < 1e-9);
        }
    }

    #[test]
    fn test_single_octave_range() {
        let noise = TileablePerlin::new([8, 8, 8], octaves(1)).unwrap();
        for i in 0..512 {
            let p = [i as f64 * 0.13, i as f64 * 0.29, i as f64 * 0.07];
            let v = noise.sample(p);
            assert!(v.is_finite() && v.abs() <= 1.5, "out of range: {v}");
        }
    }

    #[test]
    fn test_base_changes_pattern() {
        let a = TileablePerlin::new([8, 8], octaves(1)).unwrap();
        let b = TileablePerlin::new(
            [8, 8],
            PerlinParams {
                base: 17,
                ..octaves(1)
            },
        )
        .unwrap();
        let differs = (0..64).any(|i| {
            let p = [i as f64 * 0.31 + 0.1, i as f64 * 0.17 + 0.2];
            (a.sample(p) - b.sample(p)).abs() > 1e-6
        });
        assert!(differs);
    }

    #[test]
    fn test_zero_octaves_rejected() {
        assert!(matches!(
            TileablePerlin::new([4, 4], octaves(0)),
            Err(NoiseError::NoOctaves)
        ));
    }

    #[test]
    fn test_perlin_3d_field() {
        let field = perlin_noise_3d([16, 16, 8], 4.0, octaves(3)).unwrap();
        assert_eq!(field.shape(), &[16, 16, 8]);
        let (min, max) = field.min_max();
        assert_eq!(min, 0.0);
        assert_eq!(max, 1.0);
    }

    #[test]
    fn test_perlin_3d_field_boundary_is_a_period() {
        let shape = [24, 12, 12];
        let periods = lattice_periods(shape, 4.0);
        assert_eq!(periods, [6, 3, 3]);

        // Scales that do not divide the shape still land on whole periods
        assert_eq!(lattice_periods([10, 10, 10], 4.0), [3, 3, 3]);
        assert_eq!(lattice_periods([2, 2, 2], 100.0), [1, 1, 1]);

        // Coordinate `shape[0]` maps to lattice `periods[0]`, which wraps to 0
        let noise = TileablePerlin::new(periods, octaves(2)).unwrap();
        let a = noise.sample([0.0, 1.25, 0.5]);
        let b = noise.sample([periods[0] as f64, 1.25, 0.5]);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_perlin_3d_invalid_scale() {
        assert!(matches!(
            perlin_noise_3d([4, 4, 4], 0.0, octaves(1)),
            Err(NoiseError::InvalidScale(_))
        ));
        assert!(matches!(
            perlin_noise_3d([4, 4, 4], f64::NAN, octaves(1)),
            Err(NoiseError::InvalidScale(_))
        ));
    }

    #[test]
    fn test_perlin_2d_field() {
        let field = perlin_noise_2d([32, 64], octaves(6)).unwrap();
        assert_eq!(field.shape(), &[32, 64]);
        assert!(field.values().iter().all(|v| (0.0..=1.0).contains(v)));

        // Not the degenerate all-zero image a lattice-aligned sampling gives
        let (min, max) = field.min_max();
        assert!(max - min > 0.5);

        let again = perlin_noise_2d([32, 64], octaves(6)).unwrap();
        assert_eq!(field, again);
    }

    #[test]
    fn test_perlin_dispatch() {
        assert_eq!(perlin_noise(&[8, 8], 1.0, octaves(1)).unwrap().ndim(), 2);
        assert_eq!(perlin_noise(&[8, 8, 8], 2.0, octaves(1)).unwrap().ndim(), 3);
        assert!(perlin_noise(&[8, 8, 8, 8], 2.0, octaves(1)).is_err());
    }
}
