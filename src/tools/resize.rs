//! Integer-factor downscaling of elevation maps, with optional smoothing.

use tracing::debug;

use super::ToolError;
use crate::blur::{Border, SMOOTH_3X3, convolve3x3};
use crate::raster::Raster;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeOptions {
    /// Output is `1 / factor` of the input on both axes
    pub factor: u32,
    /// Keep only the first channel and smooth it before resampling
    pub smooth: bool,
}

impl Default for ResizeOptions {
    fn default() -> Self {
        ResizeOptions {
            factor: 100,
            smooth: false,
        }
    }
}

/// Downscale `raster` to `(width / factor, height / factor)` with a
/// Lanczos-3 filter.
///
/// In smoothing mode the first channel is convolved with a 3x3 Gaussian that
/// wraps around the edges (elevation maps are longitude-periodic) before
/// resampling, and the output is single-channel.
pub fn downscale(raster: &Raster, options: &ResizeOptions) -> Result<Raster, ToolError> {
    let factor = options.factor;
    if factor == 0 {
        return Err(ToolError::InvalidFactor(factor));
    }

    let width = raster.width() / factor;
    let height = raster.height() / factor;
    if width == 0 || height == 0 {
        return Err(ToolError::TooSmall {
            width: raster.width(),
            height: raster.height(),
            factor,
        });
    }

    debug!(
        from = ?(raster.width(), raster.height()),
        to = ?(width, height),
        smooth = options.smooth,
        "downscale"
    );

    if options.smooth {
        let elevation = raster.channel(0)?;
        let smoothed = convolve3x3(&elevation, &SMOOTH_3X3, Border::Wrap);
        Ok(smoothed.resize(width, height)?)
    } else {
        Ok(raster.resize(width, height)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(width: u32, height: u32) -> Raster {
        let data = (0..width * height)
            .flat_map(|i| {
                let t = i as f32 / (width * height) as f32;
                [t, 1.0 - t, 0.5]
            })
            .collect();
        Raster::from_data(width, height, 3, data).unwrap()
    }

    #[test]
    fn test_dimensions_floor() {
        let out = downscale(&rgb(103, 51), &ResizeOptions { factor: 10, smooth: false }).unwrap();
        assert_eq!((out.width(), out.height()), (10, 5));
        assert_eq!(out.channels(), 3);
    }

    #[test]
    fn test_smooth_keeps_first_channel() {
        let out = downscale(&rgb(40, 20), &ResizeOptions { factor: 4, smooth: true }).unwrap();
        assert_eq!((out.width(), out.height()), (10, 5));
        assert_eq!(out.channels(), 1);
    }

    #[test]
    fn test_factor_one_keeps_size() {
        let input = rgb(8, 6);
        let out = downscale(&input, &ResizeOptions { factor: 1, smooth: false }).unwrap();
        assert_eq!((out.width(), out.height()), (8, 6));
    }

    #[test]
    fn test_invalid_factors() {
        let input = rgb(8, 6);
        assert!(matches!(
            downscale(&input, &ResizeOptions { factor: 0, smooth: false }),
            Err(ToolError::InvalidFactor(0))
        ));
        assert!(matches!(
            downscale(&input, &ResizeOptions { factor: 7, smooth: false }),
            Err(ToolError::TooSmall { .. })
        ));
    }

    #[test]
    fn test_flat_image_stays_flat() {
        let flat = Raster::from_fn(32, 32, |_, _| 0.6).unwrap();
        let out = downscale(&flat, &ResizeOptions { factor: 4, smooth: true }).unwrap();
        let expected = (0.6f32 * 255.0) as u8;
        assert!(out.to_bytes().iter().all(|&b| b.abs_diff(expected) <= 2));
    }
}
