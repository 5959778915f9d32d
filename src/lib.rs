//! Offline texture preparation for a globe renderer: elevation map
//! preprocessing and procedural noise volumes.

pub mod blur;
pub mod export;
pub mod field;
pub mod noise;
pub mod raster;
pub mod spatial;
pub mod tools;
