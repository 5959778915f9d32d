//! Owned N-dimensional scalar fields.
//!
//! A [`Field`] is a contiguous row-major buffer (last axis fastest), which is
//! also the layout written to raw `.bin` files.

use thiserror::Error;

/// Errors raised when constructing a field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("field shape must have at least one axis")]
    EmptyShape,
    #[error("field axis {axis} has zero length")]
    ZeroLengthAxis { axis: usize },
    #[error("data length {actual} does not match shape volume {expected}")]
    DataLength { expected: usize, actual: usize },
    #[error("shape {shape:?} holds more samples than fit in memory")]
    VolumeOverflow { shape: Vec<usize> },
}

/// A scalar field of arbitrary dimensionality.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Field {
    /// Create a field filled with zeros
    pub fn zeros(shape: &[usize]) -> Result<Self, FieldError> {
        let len = validate_shape(shape)?;
        Ok(Field {
            shape: shape.to_vec(),
            data: vec![0.0; len],
        })
    }

    /// Create a field by evaluating `f` at every integer coordinate, in
    /// row-major order.
    pub fn from_fn(
        shape: &[usize],
        mut f: impl FnMut(&[usize]) -> f64,
    ) -> Result<Self, FieldError> {
        let len = validate_shape(shape)?;
        let mut data = Vec::with_capacity(len);
        let mut coords = vec![0; shape.len()];

        for _ in 0..len {
            data.push(f(&coords));

            // Odometer increment, last axis fastest
            for axis in (0..shape.len()).rev() {
                coords[axis] += 1;
                if coords[axis] < shape[axis] {
                    break;
                }
                coords[axis] = 0;
            }
        }

        Ok(Field {
            shape: shape.to_vec(),
            data,
        })
    }

    /// Wrap an existing buffer
    pub fn from_data(shape: &[usize], data: Vec<f64>) -> Result<Self, FieldError> {
        let expected = validate_shape(shape)?;
        if data.len() != expected {
            return Err(FieldError::DataLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Field {
            shape: shape.to_vec(),
            data,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.data
    }

    pub fn into_values(self) -> Vec<f64> {
        self.data
    }

    /// Flat offset of `coords`, or `None` when out of bounds or of the wrong
    /// dimensionality.
    pub fn index_of(&self, coords: &[usize]) -> Option<usize> {
        if coords.len() != self.shape.len() {
            return None;
        }
        let mut index = 0;
        for (&c, &extent) in coords.iter().zip(&self.shape) {
            if c >= extent {
                return None;
            }
            index = index * extent + c;
        }
        Some(index)
    }

    /// Get the value at the given coordinates
    pub fn get(&self, coords: &[usize]) -> Option<f64> {
        self.index_of(coords).map(|i| self.data[i])
    }

    /// Set the value at the given coordinates. Returns `false` when out of
    /// bounds.
    pub fn set(&mut self, coords: &[usize], value: f64) -> bool {
        match self.index_of(coords) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// Smallest and largest sample
    pub fn min_max(&self) -> (f64, f64) {
        min_max(&self.data)
    }

    /// Rescale all samples into [0, 1].
    ///
    /// A constant field has no range to stretch and becomes all zeros.
    pub fn normalize(&mut self) {
        normalize_in_place(&mut self.data);
    }

    /// Replace every sample `v` with `1 - v`
    pub fn invert(&mut self) {
        for value in &mut self.data {
            *value = 1.0 - *value;
        }
    }
}

fn validate_shape(shape: &[usize]) -> Result<usize, FieldError> {
    if shape.is_empty() {
        return Err(FieldError::EmptyShape);
    }
    if let Some(axis) = shape.iter().position(|&extent| extent == 0) {
        return Err(FieldError::ZeroLengthAxis { axis });
    }
    checked_volume(shape).ok_or_else(|| FieldError::VolumeOverflow {
        shape: shape.to_vec(),
    })
}

/// Product of all extents, or `None` if it overflows `usize`
pub fn checked_volume(shape: &[usize]) -> Option<usize> {
    shape.iter().try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
}

/// Smallest and largest value of a slice. An empty slice yields `(0, 0)`.
pub fn min_max<T: Copy + Into<f64>>(values: &[T]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    values.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        let v = v.into();
        (lo.min(v), hi.max(v))
    })
}

/// Min-max normalize a buffer into [0, 1]; constant buffers become zeros.
pub fn normalize_in_place(values: &mut [f64]) {
    let (min, max) = min_max(values);
    let range = max - min;

    if range <= 0.0 || !range.is_finite() {
        values.fill(0.0);
        return;
    }

    for value in values.iter_mut() {
        *value = (*value - min) / range;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_is_row_major() {
        let field = Field::from_fn(&[2, 3], |c| (c[0] * 10 + c[1]) as f64).unwrap();
        assert_eq!(field.values(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(field.get(&[1, 2]), Some(12.0));
        assert_eq!(field.get(&[2, 0]), None);
        assert_eq!(field.get(&[0]), None);
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert_eq!(Field::zeros(&[]), Err(FieldError::EmptyShape));
        assert_eq!(
            Field::zeros(&[4, 0, 4]),
            Err(FieldError::ZeroLengthAxis { axis: 1 })
        );
        assert_eq!(
            Field::from_data(&[2, 2], vec![0.0; 3]),
            Err(FieldError::DataLength { expected: 4, actual: 3 })
        );
    }

    #[test]
    fn test_normalize_range() {
        let mut field = Field::from_data(&[4], vec![-2.0, 0.0, 2.0, 6.0]).unwrap();
        field.normalize();
        assert_eq!(field.values(), &[0.0, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let mut field = Field::from_data(&[5], vec![0.0, 0.1, 0.5, 0.9, 1.0]).unwrap();
        let before = field.clone();
        field.normalize();
        assert_eq!(field, before);
    }

    #[test]
    fn test_normalize_constant_field() {
        let mut field = Field::from_data(&[2, 2], vec![3.5; 4]).unwrap();
        field.normalize();
        assert!(field.values().iter().all(|&v| v == 0.0));

        let mut single = Field::from_data(&[1, 1], vec![42.0]).unwrap();
        single.normalize();
        assert_eq!(single.values(), &[0.0]);
    }

    #[test]
    fn test_invert() {
        let mut field = Field::from_data(&[3], vec![0.0, 0.25, 1.0]).unwrap();
        field.invert();
        assert_eq!(field.values(), &[1.0, 0.75, 0.0]);
    }

    #[test]
    fn test_set() {
        let mut field = Field::zeros(&[2, 2, 2]).unwrap();
        assert!(field.set(&[1, 0, 1], 5.0));
        assert!(!field.set(&[2, 0, 0], 5.0));
        assert_eq!(field.get(&[1, 0, 1]), Some(5.0));
        assert_eq!(field.index_of(&[1, 0, 1]), Some(5));
    }

    #[test]
    fn test_volume_overflow_rejected() {
        let huge = [usize::MAX / 2, 3];
        let expected = FieldError::VolumeOverflow {
            shape: huge.to_vec(),
        };
        assert_eq!(Field::zeros(&huge), Err(expected.clone()));
        assert_eq!(Field::from_fn(&huge, |_| 0.0), Err(expected.clone()));
        assert_eq!(Field::from_data(&huge, Vec::new()), Err(expected));

        assert_eq!(checked_volume(&[4, 5, 6]), Some(120));
        assert_eq!(checked_volume(&huge), None);
    }
}
