//! Linear contrast stretching.

use super::ToolError;
use crate::field::min_max;
use crate::raster::Raster;

/// Stretch the raster so its smallest sample maps to 0 and its largest to 1.
///
/// The range is taken over all channels together, so colour balance is
/// kept. A constant raster becomes all zeros.
pub fn contrast_stretch(raster: &Raster) -> Raster {
    let (min, max) = min_max(raster.data());
    let range = max - min;
    if range <= 0.0 || !range.is_finite() {
        return raster.clone().map(|_| 0.0);
    }
    raster
        .clone()
        .map(|v| ((v as f64 - min) / range).clamp(0.0, 1.0) as f32)
}

/// Original and stretched images next to each other, for a quick visual
/// comparison.
pub fn side_by_side(original: &Raster, stretched: &Raster) -> Result<Raster, ToolError> {
    if original.height() != stretched.height() {
        return Err(ToolError::ShapeMismatch {
            a: (original.width(), original.height()),
            b: (stretched.width(), stretched.height()),
        });
    }
    Ok(original.concat_horizontal(stretched)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_to_zero_max_to_full() {
        let raster = Raster::from_fn(4, 2, |x, y| 0.2 + 0.05 * (x + 4 * y) as f32).unwrap();
        let stretched = contrast_stretch(&raster);
        let bytes = stretched.to_bytes();
        assert_eq!(bytes[0], 0);
        assert_eq!(bytes[7], 255);
        assert!(bytes.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_range_is_joint_across_channels() {
        let raster = Raster::from_data(2, 1, 2, vec![0.25, 0.5, 0.75, 0.5]).unwrap();
        let stretched = contrast_stretch(&raster);
        assert_eq!(stretched.data(), &[0.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_constant_becomes_zero() {
        let flat = Raster::from_fn(3, 3, |_, _| 0.7).unwrap();
        let stretched = contrast_stretch(&flat);
        assert!(stretched.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_side_by_side() {
        let a = Raster::from_fn(3, 2, |_, _| 0.0).unwrap();
        let b = Raster::from_fn(2, 2, |_, _| 1.0).unwrap();
        let both = side_by_side(&a, &b).unwrap();
        assert_eq!((both.width(), both.height()), (5, 2));
        assert_eq!(both.get(2, 1, 0), Some(0.0));
        assert_eq!(both.get(3, 1, 0), Some(1.0));

        let short = Raster::from_fn(2, 1, |_, _| 1.0).unwrap();
        assert!(matches!(side_by_side(&a, &short), Err(ToolError::ShapeMismatch { .. })));
    }
}
