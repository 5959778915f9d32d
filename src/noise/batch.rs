//! Multi-frequency Worley volume batches.

use std::path::{Path, PathBuf};

use rand_pcg::Pcg32;
use tracing::info;

use super::{NoiseError, worley_noise_3d};
use crate::export::{SampleFormat, export_field_raw};

/// What to generate in one batch run
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub shape: [usize; 3],
    pub frequencies: Vec<usize>,
    pub seed: u64,
    pub format: SampleFormat,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            shape: [128, 128, 128],
            frequencies: vec![4, 8, 16],
            seed: 0,
            format: SampleFormat::F64,
        }
    }
}

/// `worley_3d_freq_<N>.bin`
pub fn batch_file_name(frequency: usize) -> String {
    format!("worley_3d_freq_{frequency}.bin")
}

/// Generate one 3D Worley volume per frequency and write each to
/// `output_dir`. Stops at the first failure.
///
/// Every frequency draws from its own stream of the batch seed, so a single
/// volume can be regenerated without replaying the whole batch.
pub fn run_worley_batch(config: &BatchConfig, output_dir: &Path) -> Result<Vec<PathBuf>, NoiseError> {
    std::fs::create_dir_all(output_dir).map_err(|e| NoiseError::Export {
        path: output_dir.display().to_string(),
        source: e.into(),
    })?;

    let mut written = Vec::with_capacity(config.frequencies.len());

    for &frequency in &config.frequencies {
        let mut rng = batch_rng(config.seed, frequency);
        let field = worley_noise_3d(config.shape, frequency, &mut rng)?;

        let path = output_dir.join(batch_file_name(frequency));
        let bytes = export_field_raw(&field, &path, config.format).map_err(|source| {
            NoiseError::Export {
                path: path.display().to_string(),
                source,
            }
        })?;

        info!(frequency, bytes, path = %path.display(), "wrote worley volume");
        written.push(path);
    }

    Ok(written)
}

/// Stream for a single frequency of a batch, matching [`run_worley_batch`]
pub fn batch_rng(seed: u64, frequency: usize) -> Pcg32 {
    Pcg32::new(seed, frequency as u64)
}
