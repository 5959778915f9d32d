//! Writers for generated fields: headerless raw sample dumps and 8-bit PNGs.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::field::Field;
use crate::raster::{Raster, RasterError};

/// Errors that can occur while exporting a field.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error("PNG export needs a 2D field, got shape {0:?}")]
    NotAnImage(Vec<usize>),
}

/// Sample width of a raw dump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// 32-bit float
    F32,
    /// 64-bit float
    #[default]
    F64,
}

impl SampleFormat {
    pub fn bytes_per_sample(self) -> u64 {
        match self {
            SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }
}

/// Exports the given field as a flat, headerless array of samples
///
/// Samples are written row-major (last axis fastest) in native byte order.
/// Readers must know the shape and sample format out of band.
///
/// # Returns
/// * `Result<u64>` - Number of bytes written
pub fn export_field_raw(
    field: &Field,
    path: &Path,
    format: SampleFormat,
) -> Result<u64, ExportError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SampleFormat::F64 => writer.write_all(bytemuck::cast_slice(field.values()))?,
        SampleFormat::F32 => {
            let samples: Vec<f32> = field.values().iter().map(|&v| v as f32).collect();
            writer.write_all(bytemuck::cast_slice(&samples))?;
        }
    }

    writer.flush()?;
    Ok(field.len() as u64 * format.bytes_per_sample())
}

/// Size in bytes of a raw dump of `shape`, or `None` if it overflows
pub fn expected_file_size(shape: &[usize], format: SampleFormat) -> Option<u64> {
    shape
        .iter()
        .try_fold(format.bytes_per_sample(), |acc, &extent| acc.checked_mul(extent as u64))
}

/// View a 2D `[height, width]` field as a single-channel raster
pub fn field_to_raster(field: &Field) -> Result<Raster, ExportError> {
    match *field.shape() {
        [height, width] => {
            let data = field.values().iter().map(|&v| v as f32).collect();
            Ok(Raster::from_data(width as u32, height as u32, 1, data)?)
        }
        _ => Err(ExportError::NotAnImage(field.shape().to_vec())),
    }
}

/// Exports a 2D field as an 8-bit grayscale PNG
///
/// With `tiled` set the image is written twice side by side, which makes
/// any seam at the wrap-around boundary easy to spot.
pub fn export_field_png(field: &Field, path: &Path, tiled: bool) -> Result<(), ExportError> {
    let raster = field_to_raster(field)?;
    let raster = if tiled {
        raster.concat_horizontal(&raster)?
    } else {
        raster
    };
    raster.save_png(path)?;
    Ok(())
}

/// Export by file extension: `.png` for 2D images, a raw dump otherwise
pub fn export_field(
    field: &Field,
    path: &Path,
    format: SampleFormat,
    tiled: bool,
) -> Result<(), ExportError> {
    let is_png = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"));

    if is_png {
        export_field_png(field, path, tiled)
    } else {
        export_field_raw(field, path, format).map(|_| ())
    }
}
