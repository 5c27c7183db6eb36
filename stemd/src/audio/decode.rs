//! Audio file decoding
//!
//! Uses symphonia for format-agnostic decoding (MP3, WAV, FLAC, AAC/M4A,
//! OGG). Channels are kept separate; the result is handed to
//! [`Waveform::from_array`] for canonical-shape validation.

use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::debug;

use super::{AudioError, Waveform};

/// Decode the file at `path` into a canonical (channels, samples) waveform.
pub fn decode(path: &Path) -> Result<Waveform, AudioError> {
    debug!(path = %path.display(), "decoding audio file");

    let file = std::fs::File::open(path).map_err(|source| AudioError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Hint the probe with the file extension
    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::Decode(format!("unrecognized container: {e}")))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Decode("no audio track found".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| AudioError::Decode("sample rate unknown".into()))?;
    let channel_count = track
        .codec_params
        .channels
        .map(|c| c.count())
        .ok_or_else(|| AudioError::Decode("channel layout unknown".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Decode(format!("unsupported codec: {e}")))?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(AudioError::Decode(format!("error reading packet: {e}"))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| AudioError::Decode(format!("error decoding packet: {e}")))?;

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            let duration = decoded.capacity() as u64;
            sample_buf = Some(SampleBuffer::new(duration, spec));
        }
        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    if interleaved.is_empty() {
        return Err(AudioError::Decode("no audio frames decoded".into()));
    }

    // Deinterleave into planar (channels, samples) layout
    let frames = interleaved.len() / channel_count;
    let mut planar = vec![0.0f32; channel_count * frames];
    for frame in 0..frames {
        for ch in 0..channel_count {
            planar[ch * frames + frame] = interleaved[frame * channel_count + ch];
        }
    }

    let data = ArrayD::from_shape_vec(IxDyn(&[channel_count, frames]), planar)
        .map_err(|_| AudioError::Shape(vec![channel_count, frames]))?;
    let waveform = Waveform::from_array(data, sample_rate)?;

    debug!(
        path = %path.display(),
        channels = waveform.channels(),
        samples = waveform.samples(),
        sample_rate = waveform.sample_rate(),
        "audio decoding complete"
    );

    Ok(waveform)
}
