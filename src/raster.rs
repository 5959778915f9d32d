//! Multi-channel float images and their PNG round trip.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageBuffer, ImageEncoder};
use thiserror::Error;

/// Errors that can occur while loading, saving or reshaping rasters.
#[derive(Error, Debug)]
pub enum RasterError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("unsupported channel count {0}, expected 1 to 4")]
    Channels(usize),
    #[error("buffer of {actual} samples does not fit {width}x{height}x{channels}")]
    BufferSize {
        width: u32,
        height: u32,
        channels: usize,
        actual: usize,
    },
    #[error("raster dimensions {width}x{height} must be non-zero")]
    EmptyDimensions { width: u32, height: u32 },
    #[error("channel {channel} out of range for a {channels}-channel raster")]
    ChannelOutOfRange { channel: usize, channels: usize },
}

/// A `width x height` image with `channels` interleaved `f32` samples per
/// pixel, nominally in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<f32>,
}

impl Raster {
    pub fn new(width: u32, height: u32, channels: usize) -> Result<Self, RasterError> {
        let len = checked_len(width, height, channels)?;
        Ok(Raster {
            width,
            height,
            channels,
            data: vec![0.0; len],
        })
    }

    pub fn from_data(
        width: u32,
        height: u32,
        channels: usize,
        data: Vec<f32>,
    ) -> Result<Self, RasterError> {
        let len = checked_len(width, height, channels)?;
        if data.len() != len {
            return Err(RasterError::BufferSize {
                width,
                height,
                channels,
                actual: data.len(),
            });
        }
        Ok(Raster {
            width,
            height,
            channels,
            data,
        })
    }

    /// Single-channel raster from a per-pixel function
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> f32,
    ) -> Result<Self, RasterError> {
        let len = checked_len(width, height, 1)?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Ok(Raster {
            width,
            height,
            channels: 1,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    fn offset(&self, x: u32, y: u32, channel: usize) -> usize {
        (y as usize * self.width as usize + x as usize) * self.channels + channel
    }

    /// Sample at (x, y, channel), or `None` out of bounds
    pub fn get(&self, x: u32, y: u32, channel: usize) -> Option<f32> {
        if x >= self.width || y >= self.height || channel >= self.channels {
            return None;
        }
        Some(self.data[self.offset(x, y, channel)])
    }

    pub fn set(&mut self, x: u32, y: u32, channel: usize, value: f32) {
        if x < self.width && y < self.height && channel < self.channels {
            let offset = self.offset(x, y, channel);
            self.data[offset] = value;
        }
    }

    /// All channels of one pixel, or `None` out of bounds
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[f32]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = self.offset(x, y, 0);
        Some(&self.data[start..start + self.channels])
    }

    /// Extract one channel as a single-channel raster
    pub fn channel(&self, channel: usize) -> Result<Raster, RasterError> {
        if channel >= self.channels {
            return Err(RasterError::ChannelOutOfRange {
                channel,
                channels: self.channels,
            });
        }
        let data = self
            .data
            .chunks_exact(self.channels)
            .map(|px| px[channel])
            .collect();
        Raster::from_data(self.width, self.height, 1, data)
    }

    /// Apply `f` to every sample
    pub fn map(mut self, f: impl Fn(f32) -> f32) -> Raster {
        for v in &mut self.data {
            *v = f(*v);
        }
        self
    }

    /// Place `other` to the right of `self`. Heights and channel counts must
    /// match.
    pub fn concat_horizontal(&self, other: &Raster) -> Result<Raster, RasterError> {
        if self.height != other.height || self.channels != other.channels {
            return Err(RasterError::BufferSize {
                width: other.width,
                height: self.height,
                channels: self.channels,
                actual: other.data.len(),
            });
        }

        let row_a = self.width as usize * self.channels;
        let row_b = other.width as usize * other.channels;
        let mut data = Vec::with_capacity(self.data.len() + other.data.len());
        for (a, b) in self.data.chunks_exact(row_a).zip(other.data.chunks_exact(row_b)) {
            data.extend_from_slice(a);
            data.extend_from_slice(b);
        }
        Raster::from_data(self.width + other.width, self.height, self.channels, data)
    }

    /// Decode an image file, scaling 8- and 16-bit samples into [0, 1].
    ///
    /// The decoder's allocation limit is lifted so full-resolution elevation
    /// maps can be read.
    pub fn load(path: &Path) -> Result<Raster, RasterError> {
        let mut reader = image::io::Reader::open(path)?.with_guessed_format()?;
        reader.no_limits();
        let image = reader.decode()?;
        Raster::from_dynamic(&image)
    }

    pub fn from_dynamic(image: &DynamicImage) -> Result<Raster, RasterError> {
        let channels = image.color().channel_count() as usize;

        // Convert at the file's own channel count
        let (width, height, data) = match channels {
            1 => {
                let buffer = image.to_luma32f();
                (buffer.width(), buffer.height(), buffer.into_raw())
            }
            2 => {
                let buffer = image.to_luma_alpha32f();
                (buffer.width(), buffer.height(), buffer.into_raw())
            }
            3 => {
                let buffer = image.to_rgb32f();
                (buffer.width(), buffer.height(), buffer.into_raw())
            }
            4 => {
                let buffer = image.to_rgba32f();
                (buffer.width(), buffer.height(), buffer.into_raw())
            }
            n => return Err(RasterError::Channels(n)),
        };
        Raster::from_data(width, height, channels, data)
    }

    /// Quantize to 8 bits per sample
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().map(|&v| quantize(v)).collect()
    }

    pub fn to_dynamic(&self) -> Result<DynamicImage, RasterError> {
        let (w, h) = (self.width, self.height);
        let bytes = self.to_bytes();
        let size_error = || RasterError::BufferSize {
            width: w,
            height: h,
            channels: self.channels,
            actual: self.data.len(),
        };

        let image = match self.channels {
            1 => DynamicImage::ImageLuma8(ImageBuffer::from_raw(w, h, bytes).ok_or_else(size_error)?),
            2 => DynamicImage::ImageLumaA8(ImageBuffer::from_raw(w, h, bytes).ok_or_else(size_error)?),
            3 => DynamicImage::ImageRgb8(ImageBuffer::from_raw(w, h, bytes).ok_or_else(size_error)?),
            4 => DynamicImage::ImageRgba8(ImageBuffer::from_raw(w, h, bytes).ok_or_else(size_error)?),
            n => return Err(RasterError::Channels(n)),
        };
        Ok(image)
    }

    /// Resample to `width x height` with a Lanczos-3 filter. The raster is
    /// quantized to 8 bits first, so output samples stay within [0, 1].
    pub fn resize(&self, width: u32, height: u32) -> Result<Raster, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::EmptyDimensions { width, height });
        }
        let resized = self
            .to_dynamic()?
            .resize_exact(width, height, FilterType::Lanczos3);
        Raster::from_dynamic(&resized)
    }

    /// Write an 8-bit PNG with one to four channels
    pub fn save_png(&self, path: &Path) -> Result<(), RasterError> {
        let color = match self.channels {
            1 => ColorType::L8,
            2 => ColorType::La8,
            3 => ColorType::Rgb8,
            4 => ColorType::Rgba8,
            n => return Err(RasterError::Channels(n)),
        };

        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        let encoder = PngEncoder::new(writer);
        encoder.write_image(&self.to_bytes(), self.width, self.height, color)?;
        Ok(())
    }
}

/// `[0, 1]` float to `u8`, clamped and rounded to nearest so 8-bit inputs
/// survive a load/save round trip unchanged
pub fn quantize(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

fn checked_len(width: u32, height: u32, channels: usize) -> Result<usize, RasterError> {
    if !(1..=4).contains(&channels) {
        return Err(RasterError::Channels(channels));
    }
    if width == 0 || height == 0 {
        return Err(RasterError::EmptyDimensions { width, height });
    }
    Ok(width as usize * height as usize * channels)
}
