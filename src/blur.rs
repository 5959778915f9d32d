//! Convolution kernels for raster smoothing and gradients.
//!
//! All filters work channel by channel and never mix samples across
//! channels.

use crate::raster::Raster;

/// Normalized 3x3 Gaussian smoothing kernel
pub const SMOOTH_3X3: [[f32; 3]; 3] = [
    [1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
    [2.0 / 16.0, 4.0 / 16.0, 2.0 / 16.0],
    [1.0 / 16.0, 2.0 / 16.0, 1.0 / 16.0],
];

/// Gaussian kernels are cut off at this many standard deviations
pub const GAUSSIAN_TRUNCATE: f32 = 4.0;

/// How samples beyond the raster edge are resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// Opposite edge, for textures that tile
    Wrap,
    /// Mirror about the edge, repeating the edge sample (`d c b a | a b c d`)
    Reflect,
}

impl Border {
    fn resolve(self, i: isize, n: usize) -> usize {
        let n = n as isize;
        match self {
            Border::Wrap => i.rem_euclid(n) as usize,
            Border::Reflect => {
                let m = i.rem_euclid(2 * n);
                if m < n { m as usize } else { (2 * n - 1 - m) as usize }
            }
        }
    }
}

/// Image axis a one-dimensional filter runs along
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Along a row (left to right)
    X,
    /// Along a column (top to bottom)
    Y,
}

impl Axis {
    fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}

/// Correlate every channel with `weights` along one axis. The middle weight
/// sits on the output sample.
pub fn correlate1d(raster: &Raster, weights: &[f32], axis: Axis, border: Border) -> Raster {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let channels = raster.channels();
    let src = raster.data();
    let half = (weights.len() / 2) as isize;

    let mut result = raster.clone();
    let dst = result.data_mut();

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0;
                for (i, w) in weights.iter().enumerate() {
                    let d = i as isize - half;
                    let (sx, sy) = match axis {
                        Axis::X => (border.resolve(x as isize + d, width), y),
                        Axis::Y => (x, border.resolve(y as isize + d, height)),
                    };
                    sum += w * src[(sy * width + sx) * channels + c];
                }
                dst[(y * width + x) * channels + c] = sum;
            }
        }
    }

    result
}

/// Convolve every channel with a 3x3 kernel (kernel flipped, as in a true
/// convolution)
pub fn convolve3x3(raster: &Raster, kernel: &[[f32; 3]; 3], border: Border) -> Raster {
    let width = raster.width() as usize;
    let height = raster.height() as usize;
    let channels = raster.channels();
    let src = raster.data();

    let mut result = raster.clone();
    let dst = result.data_mut();

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0;
                for (ky, row) in kernel.iter().enumerate() {
                    for (kx, k) in row.iter().enumerate() {
                        let sy = border.resolve(y as isize + 1 - ky as isize, height);
                        let sx = border.resolve(x as isize + 1 - kx as isize, width);
                        sum += k * src[(sy * width + sx) * channels + c];
                    }
                }
                dst[(y * width + x) * channels + c] = sum;
            }
        }
    }

    result
}

/// Sampled, normalized Gaussian of radius `round(truncate * sigma)`
pub fn gaussian_kernel(sigma: f32, truncate: f32) -> Vec<f32> {
    let radius = (truncate * sigma + 0.5) as isize;
    let denom = 2.0 * sigma * sigma;

    let mut kernel: Vec<f32> = (-radius..=radius)
        .map(|x| (-((x * x) as f32) / denom).exp())
        .collect();

    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// Separable Gaussian blur over both image axes. A non-positive sigma leaves
/// the raster unchanged.
pub fn gaussian_blur(raster: &Raster, sigma: f32, border: Border) -> Raster {
    if sigma <= 0.0 {
        return raster.clone();
    }
    let kernel = gaussian_kernel(sigma, GAUSSIAN_TRUNCATE);
    let blurred = correlate1d(raster, &kernel, Axis::Y, border);
    correlate1d(&blurred, &kernel, Axis::X, border)
}

/// Sobel derivative along `axis`, smoothed across the other axis
pub fn sobel(raster: &Raster, axis: Axis, border: Border) -> Raster {
    let derivative = correlate1d(raster, &[-1.0, 0.0, 1.0], axis, border);
    correlate1d(&derivative, &[1.0, 2.0, 1.0], axis.other(), border)
}
