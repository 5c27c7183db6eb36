//! Stem file encoding
//!
//! Two-tier writer: 32-bit float WAV first, and on failure a 16-bit PCM
//! fallback built from a clamped, frame-interleaved copy of the stem.
//! Codec availability varies by deployment, and one failing backend must
//! not abort an otherwise-successful separation.

use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use ndarray::ArrayView2;
use tracing::warn;

use super::AudioError;

/// Write one (channels, samples) stem to `path`.
pub fn save_stem(stem: ArrayView2<'_, f32>, path: &Path, sample_rate: u32) -> Result<(), AudioError> {
    match write_float(stem, path, sample_rate) {
        Ok(()) => Ok(()),
        Err(primary) => {
            warn!(
                path = %path.display(),
                error = %primary,
                "float WAV encode failed, retrying as 16-bit PCM"
            );
            write_pcm16(stem, path, sample_rate).map_err(|fallback| AudioError::Encode {
                path: path.to_path_buf(),
                primary: primary.to_string(),
                fallback: fallback.to_string(),
            })
        }
    }
}

/// Primary encoder: 32-bit float samples, written frame by frame.
fn write_float(stem: ArrayView2<'_, f32>, path: &Path, sample_rate: u32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: stem.nrows() as u16,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..stem.ncols() {
        for ch in 0..stem.nrows() {
            writer.write_sample(stem[[ch, frame]])?;
        }
    }
    writer.finalize()
}

/// Fallback encoder: the stem is clamped to [-1, 1], reordered to
/// (samples, channels) frame layout and quantized to 16-bit PCM.
fn write_pcm16(stem: ArrayView2<'_, f32>, path: &Path, sample_rate: u32) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: stem.nrows() as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;
    for frame in 0..stem.ncols() {
        for ch in 0..stem.nrows() {
            let sample = stem[[ch, frame]].clamp(-1.0, 1.0);
            writer.write_sample((sample * i16::MAX as f32) as i16)?;
        }
    }
    writer.finalize()
}
