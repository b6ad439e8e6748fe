use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

use super::buffer::{AudioBuffer, BufferError};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported or corrupted audio: {0}")]
    Format(#[from] SymphoniaError),
    #[error("no audio tracks found")]
    NoAudioTrack,
    #[error("unknown sample rate")]
    UnknownSampleRate,
    #[error("decoded audio is invalid: {0}")]
    InvalidBuffer(#[from] BufferError),
}

/// Turns an audio item reference into decoded samples.
///
/// This is the only blocking, fallible step of an analysis run; analyzers
/// never touch the filesystem.
pub trait AudioDecoder: Sync {
    fn decode(&self, item: &Path) -> Result<AudioBuffer, DecodeError>;
}

/// File decoder backed by symphonia. Channels are kept separate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SymphoniaDecoder;

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, item: &Path) -> Result<AudioBuffer, DecodeError> {
        decode_audio(item)
    }
}

pub fn decode_audio(path: &Path) -> Result<AudioBuffer, DecodeError> {
    if !path.exists() {
        return Err(DecodeError::NotFound(path.to_path_buf()));
    }
    let file = std::fs::File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;

    let track_id = track.id;
    let mut channel_count = track.codec_params.channels.map_or(0, |c| c.count());
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;

    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                log::warn!(
                    "Stream reset in {}, keeping the {} samples decoded so far",
                    path.display(),
                    interleaved.len()
                );
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(err)) => {
                log::warn!("Skipping corrupt packet in {}: {}", path.display(), err);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        if channel_count == 0 {
            channel_count = spec.channels.count();
        }

        let mut sample_buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        interleaved.extend_from_slice(sample_buf.samples());
    }

    let buffer = AudioBuffer::from_interleaved(sample_rate, channel_count.max(1), &interleaved)?;

    log::info!(
        "Decoded {}: {} frames x {} ch, {}Hz, {:.1}s",
        path.display(),
        buffer.frames(),
        buffer.channel_count(),
        sample_rate,
        buffer.duration_secs()
    );

    Ok(buffer)
}
