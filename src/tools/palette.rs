//! Dominant colour extraction with k-means, and palette recolouring.

use glam::Vec3;
use rand::Rng;
use tracing::debug;

use super::ToolError;
use crate::blur::{Border, gaussian_blur};
use crate::raster::Raster;

/// Parameters of the k-means clustering
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KMeansParams {
    /// Number of colours to find
    pub clusters: usize,
    /// Upper bound on Lloyd iterations
    pub max_iterations: usize,
    /// Convergence threshold on the squared centre shift, relative to the
    /// mean per-channel variance of the pixels
    pub tolerance: f32,
}

impl Default for KMeansParams {
    fn default() -> Self {
        KMeansParams {
            clusters: 8,
            max_iterations: 300,
            tolerance: 1e-4,
        }
    }
}

/// Full recolouring pipeline settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaletteOptions {
    /// Input is shrunk by this factor before clustering
    pub downscale: u32,
    /// Spatial Gaussian smoothing applied before clustering
    pub sigma: f32,
    /// Output keeps every `stride`-th pixel of the smoothed image
    pub stride: u32,
    pub kmeans: KMeansParams,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        PaletteOptions {
            downscale: 4,
            sigma: 1.0,
            stride: 4,
            kmeans: KMeansParams::default(),
        }
    }
}

/// A set of integer RGB colours
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colours: Vec<[u8; 3]>,
}

impl Palette {
    pub fn colours(&self) -> &[[u8; 3]] {
        &self.colours
    }

    /// Palette entry closest to `colour` (0-255 scale)
    pub fn nearest(&self, colour: Vec3) -> [u8; 3] {
        self.colours
            .iter()
            .copied()
            .min_by(|a, b| {
                let da = to_vec3(*a).distance_squared(colour);
                let db = to_vec3(*b).distance_squared(colour);
                da.total_cmp(&db)
            })
            .unwrap_or([0, 0, 0])
    }
}

fn to_vec3(c: [u8; 3]) -> Vec3 {
    Vec3::new(c[0] as f32, c[1] as f32, c[2] as f32)
}

fn nearest_index(centres: &[Vec3], p: Vec3) -> (usize, f32) {
    centres
        .iter()
        .enumerate()
        .map(|(i, c)| (i, c.distance_squared(p)))
        .fold((0, f32::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++ seeding: each new centre is drawn with probability
/// proportional to its squared distance from the closest existing centre
fn seed_centres<R: Rng + ?Sized>(pixels: &[Vec3], k: usize, rng: &mut R) -> Vec<Vec3> {
    let mut centres = Vec::with_capacity(k);
    centres.push(pixels[rng.gen_range(0..pixels.len())]);

    let mut weights: Vec<f32> = pixels.iter().map(|p| p.distance_squared(centres[0])).collect();

    while centres.len() < k {
        let total: f32 = weights.iter().sum();
        let index = if total > 0.0 {
            let mut target = rng.r#gen::<f32>() * total;
            weights
                .iter()
                .position(|&w| {
                    target -= w;
                    target <= 0.0
                })
                .unwrap_or(pixels.len() - 1)
        } else {
            // Every pixel already coincides with a centre
            rng.gen_range(0..pixels.len())
        };

        let centre = pixels[index];
        centres.push(centre);
        for (w, p) in weights.iter_mut().zip(pixels) {
            *w = w.min(p.distance_squared(centre));
        }
    }

    centres
}

/// Cluster `pixels` (0-255 RGB) and return the truncated cluster centres.
pub fn dominant_colours<R: Rng + ?Sized>(
    pixels: &[Vec3],
    params: &KMeansParams,
    rng: &mut R,
) -> Result<Palette, ToolError> {
    if params.clusters == 0 {
        return Err(ToolError::NoClusters);
    }
    if pixels.is_empty() {
        return Ok(Palette { colours: Vec::new() });
    }

    let n = pixels.len() as f32;
    let mean = pixels.iter().copied().sum::<Vec3>() / n;
    let variance = pixels
        .iter()
        .map(|&p| (p - mean) * (p - mean))
        .sum::<Vec3>()
        / n;
    let threshold = params.tolerance * (variance.x + variance.y + variance.z) / 3.0;

    let mut centres = seed_centres(pixels, params.clusters, rng);
    let mut sums = vec![Vec3::ZERO; centres.len()];
    let mut counts = vec![0usize; centres.len()];

    for iteration in 0..params.max_iterations {
        sums.fill(Vec3::ZERO);
        counts.fill(0);

        for &p in pixels {
            let (i, _) = nearest_index(&centres, p);
            sums[i] += p;
            counts[i] += 1;
        }

        let mut shift = 0.0;
        for ((centre, sum), &count) in centres.iter_mut().zip(&sums).zip(&counts) {
            // Empty clusters keep their previous centre
            if count == 0 {
                continue;
            }
            let updated = *sum / count as f32;
            shift += centre.distance_squared(updated);
            *centre = updated;
        }

        if shift <= threshold {
            debug!(iteration, shift, "k-means converged");
            break;
        }
    }

    let colours = centres
        .iter()
        .map(|c| [c.x, c.y, c.z].map(|v| v.clamp(0.0, 255.0) as u8))
        .collect();
    Ok(Palette { colours })
}

/// Find the dominant colours of an RGB(A) raster and repaint a subsampled
/// copy of it using only those colours.
///
/// Returns the palette and the recoloured raster, which is `1 / (downscale *
/// stride)` of the input size.
pub fn recolour<R: Rng + ?Sized>(
    raster: &Raster,
    options: &PaletteOptions,
    rng: &mut R,
) -> Result<(Palette, Raster), ToolError> {
    if raster.channels() < 3 {
        return Err(ToolError::Channels {
            expected: 3,
            actual: raster.channels(),
        });
    }
    if options.downscale == 0 || options.stride == 0 {
        return Err(ToolError::InvalidFactor(options.downscale.min(options.stride)));
    }

    let too_small = || ToolError::TooSmall {
        width: raster.width(),
        height: raster.height(),
        factor: options.downscale * options.stride,
    };

    let (w, h) = (
        raster.width() / options.downscale,
        raster.height() / options.downscale,
    );
    if w == 0 || h == 0 {
        return Err(too_small());
    }

    let rgb = Raster::from_data(
        raster.width(),
        raster.height(),
        3,
        raster
            .data()
            .chunks_exact(raster.channels())
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect(),
    )?;
    let small = rgb.resize(w, h)?;
    let smoothed = gaussian_blur(&small, options.sigma, Border::Reflect);

    let pixels: Vec<Vec3> = smoothed
        .data()
        .chunks_exact(3)
        .map(|px| Vec3::new(px[0], px[1], px[2]) * 255.0)
        .collect();
    let palette = dominant_colours(&pixels, &options.kmeans, rng)?;

    let out_w = w / options.stride;
    let out_h = h / options.stride;
    if out_w == 0 || out_h == 0 {
        return Err(too_small());
    }

    let mut out = Raster::new(out_w, out_h, 3)?;
    for y in 0..out_h {
        for x in 0..out_w {
            let Some(px) = smoothed.pixel(x * options.stride, y * options.stride) else {
                continue;
            };
            let colour = palette.nearest(Vec3::new(px[0], px[1], px[2]) * 255.0);
            for (c, &v) in colour.iter().enumerate() {
                out.set(x, y, c, v as f32 / 255.0);
            }
        }
    }

    Ok((palette, out))
}
