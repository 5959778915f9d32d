//! Elevation merging into a displacement map, and tangent-space normal maps
//! derived from it.

use glam::Vec3;
use tracing::debug;

use super::ToolError;
use crate::blur::{Axis, Border, gaussian_blur, sobel};
use crate::field::{min_max, normalize_in_place};
use crate::raster::Raster;

/// Gain applied after the log curve that lifts low land out of the sea
const LOG_GAIN: f64 = 1.5;

/// Merged elevation, ready to be written as an 8-bit height map
#[derive(Debug, Clone, PartialEq)]
pub struct Displacement {
    /// Single-channel displacement in [0, 1], after the log curve
    pub map: Raster,
    /// Normalized merged elevation before the log curve; normal maps are
    /// derived from this
    pub heights: Raster,
    /// Normalized value (before the log curve) that elevation 0 maps to
    pub sea_level: f64,
}

/// Merge bathymetry and topography into one displacement map.
///
/// Land pixels (`topo > 0`) keep their topography value, every other pixel
/// takes `bath - 1` so the sea floor sits below all land. The merged field is
/// normalized and passed through `ln(d + 1) * 1.5`, clamped to [0, 1].
///
/// # Arguments
/// * `bath` - Bathymetry image, channel 0 used
/// * `topo` - Topography image of the same size, channel 0 used
pub fn combine_elevation(bath: &Raster, topo: &Raster) -> Result<Displacement, ToolError> {
    let (bw, bh) = (bath.width(), bath.height());
    let (tw, th) = (topo.width(), topo.height());
    if (bw, bh) != (tw, th) {
        return Err(ToolError::ShapeMismatch {
            a: (bw, bh),
            b: (tw, th),
        });
    }

    let bath = bath.channel(0)?;
    let topo = topo.channel(0)?;

    let mut merged: Vec<f64> = bath
        .data()
        .iter()
        .zip(topo.data())
        .map(|(&b, &t)| if t > 0.0 { t as f64 } else { b as f64 - 1.0 })
        .collect();

    let (min, max) = min_max(&merged);
    let sea_level = if max > min { -min / (max - min) } else { 0.0 };
    debug!(min, max, sea_level, "merged elevation range");

    normalize_in_place(&mut merged);
    let heights = merged.iter().map(|&d| d as f32).collect();
    let data = merged
        .iter()
        .map(|&d| ((d + 1.0).ln() * LOG_GAIN).clamp(0.0, 1.0) as f32)
        .collect();

    Ok(Displacement {
        map: Raster::from_data(bw, bh, 1, data)?,
        heights: Raster::from_data(bw, bh, 1, heights)?,
        sea_level,
    })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalMapOptions {
    /// Bump strength; the flat-surface z component is `1 / strength`
    pub strength: f32,
    /// Gaussian smoothing of the height map before differentiation
    pub sigma: f32,
}

impl Default for NormalMapOptions {
    fn default() -> Self {
        NormalMapOptions {
            strength: 0.5,
            sigma: 1.0,
        }
    }
}

/// Map a unit normal from [-1, 1] into [0, 1] per component; a zero vector
/// encodes as straight up
fn encode_normal(n: Vec3) -> [f32; 3] {
    let n = n.try_normalize().unwrap_or(Vec3::Z);
    ((n + Vec3::ONE) * 0.5).to_array()
}

/// Build an RGB tangent-space normal map from channel 0 of a height map.
///
/// Gradients are Sobel derivatives of the smoothed heights, with mirrored
/// edges.
pub fn normal_map(heights: &Raster, options: &NormalMapOptions) -> Result<Raster, ToolError> {
    let heights = heights.channel(0)?;
    let smoothed = gaussian_blur(&heights, options.sigma, Border::Reflect);
    let dx = sobel(&smoothed, Axis::X, Border::Reflect);
    let dy = sobel(&smoothed, Axis::Y, Border::Reflect);

    let z = if options.strength > 0.0 { 1.0 / options.strength } else { f32::MAX };
    let data = dx
        .data()
        .iter()
        .zip(dy.data())
        .flat_map(|(&gx, &gy)| encode_normal(Vec3::new(gx, gy, z)))
        .collect();

    Ok(Raster::from_data(heights.width(), heights.height(), 3, data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(width: u32, height: u32, left: f32, right: f32) -> Raster {
        Raster::from_fn(width, height, |x, _| if x < width / 2 { left } else { right }).unwrap()
    }

    #[test]
    fn test_land_above_sea_level() {
        let bath = Raster::from_fn(8, 4, |_, _| 0.5).unwrap();
        let topo = split(8, 4, 0.0, 0.8);

        let result = combine_elevation(&bath, &topo).unwrap();
        // merged: sea -0.5, land 0.8 (widened from f32)
        let land = 0.8f32 as f64;
        assert!((result.sea_level - 0.5 / (land + 0.5)).abs() < 1e-12);

        let sea_out = ((result.sea_level + 1.0).ln() * LOG_GAIN) as f32;
        for y in 0..4 {
            for x in 0..8 {
                let v = result.map.get(x, y, 0).unwrap();
                if x < 4 {
                    assert!(v < sea_out);
                } else {
                    assert!(v > sea_out);
                }
            }
        }
        assert_eq!(result.map.get(0, 0, 0), Some(0.0));
        assert_eq!(result.map.get(7, 0, 0), Some(1.0));
    }

    #[test]
    fn test_heights_skip_log_curve() {
        let bath = Raster::from_fn(3, 1, |_, _| 0.5).unwrap();
        let topo = Raster::from_fn(3, 1, |x, _| x as f32 * 0.5).unwrap();
        let result = combine_elevation(&bath, &topo).unwrap();

        // merged: -0.5, 0.5, 1.0
        let heights: Vec<f32> = (0..3).map(|x| result.heights.get(x, 0, 0).unwrap()).collect();
        for (h, expected) in heights.iter().zip([0.0, 2.0 / 3.0, 1.0]) {
            assert!((h - expected).abs() < 1e-6);
        }

        let curved = result.map.get(1, 0, 0).unwrap();
        let expected = ((2.0f64 / 3.0 + 1.0).ln() * LOG_GAIN) as f32;
        assert!((curved - expected).abs() < 1e-6);
        assert!(curved > heights[1]);
    }

    #[test]
    fn test_land_keeps_topography_order() {
        let bath = Raster::from_fn(4, 1, |_, _| 0.2).unwrap();
        let topo = Raster::from_fn(4, 1, |x, _| x as f32 * 0.1).unwrap();
        let map = combine_elevation(&bath, &topo).unwrap().map;
        let row: Vec<f32> = (0..4).map(|x| map.get(x, 0, 0).unwrap()).collect();
        assert!(row.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_constant_input_is_guarded() {
        let bath = Raster::from_fn(4, 4, |_, _| 0.3).unwrap();
        let topo = Raster::from_fn(4, 4, |_, _| 0.0).unwrap();
        let result = combine_elevation(&bath, &topo).unwrap();
        assert_eq!(result.sea_level, 0.0);
        assert!(result.map.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_shape_mismatch() {
        let bath = Raster::from_fn(4, 4, |_, _| 0.3).unwrap();
        let topo = Raster::from_fn(4, 3, |_, _| 0.3).unwrap();
        assert!(matches!(
            combine_elevation(&bath, &topo),
            Err(ToolError::ShapeMismatch { a: (4, 4), b: (4, 3) })
        ));
    }

    #[test]
    fn test_flat_heights_point_up() {
        let flat = Raster::from_fn(5, 5, |_, _| 0.4).unwrap();
        let normals = normal_map(&flat, &NormalMapOptions::default()).unwrap();
        assert_eq!(normals.channels(), 3);
        for px in normals.to_bytes().chunks_exact(3) {
            assert_eq!(px, [128, 128, 255]);
        }
    }

    #[test]
    fn test_slope_tilts_normals() {
        let ramp = Raster::from_fn(8, 8, |x, _| x as f32 / 8.0).unwrap();
        let normals = normal_map(&ramp, &NormalMapOptions::default()).unwrap();
        let px = normals.pixel(4, 4).unwrap();
        assert!(px[0] > 0.5);
        assert!((px[1] - 0.5).abs() < 1e-6);
        assert!(px[2] < 1.0);

        let strong = normal_map(
            &ramp,
            &NormalMapOptions {
                strength: 4.0,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(strong.pixel(4, 4).unwrap()[0] > px[0]);
    }

    #[test]
    fn test_encode_normal() {
        assert_eq!(encode_normal(Vec3::Z), [0.5, 0.5, 1.0]);
        assert_eq!(encode_normal(Vec3::ZERO), [0.5, 0.5, 1.0]);
        assert_eq!(encode_normal(-Vec3::X), [0.0, 0.5, 0.5]);
    }
}
