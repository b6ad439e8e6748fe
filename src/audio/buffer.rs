use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum BufferError {
    #[error("sample rate must be greater than zero")]
    ZeroSampleRate,
    #[error("audio buffer needs at least one channel")]
    NoChannels,
    #[error("channel {channel} has {len} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: usize,
        len: usize,
        expected: usize,
    },
    #[error("non-finite sample in channel {channel} at frame {frame}")]
    NonFiniteSample { channel: usize, frame: usize },
}

/// Decoded multi-channel audio, one `Vec<f32>` per channel.
///
/// All channels have the same length. A length of zero is valid and means
/// the item carried no audio; every analyzer handles it explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, BufferError> {
        if sample_rate == 0 {
            return Err(BufferError::ZeroSampleRate);
        }
        let expected = channels.first().ok_or(BufferError::NoChannels)?.len();
        for (channel, samples) in channels.iter().enumerate() {
            if samples.len() != expected {
                return Err(BufferError::ChannelLengthMismatch {
                    channel,
                    len: samples.len(),
                    expected,
                });
            }
            if let Some(frame) = samples.iter().position(|s| !s.is_finite()) {
                return Err(BufferError::NonFiniteSample { channel, frame });
            }
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Splits interleaved frames into channels. A trailing partial frame is dropped.
    pub fn from_interleaved(
        sample_rate: u32,
        channel_count: usize,
        samples: &[f32],
    ) -> Result<Self, BufferError> {
        if channel_count == 0 {
            return Err(BufferError::NoChannels);
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (channel, &s) in channels.iter_mut().zip(frame) {
                channel.push(s);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    pub fn channels(&self) -> impl Iterator<Item = &[f32]> {
        self.channels.iter().map(Vec::as_slice)
    }

    /// Average of all channels per frame.
    pub fn mono_sum(&self) -> Vec<f32> {
        if self.channels.len() == 1 {
            return self.channels[0].clone();
        }
        let scale = 1.0 / self.channels.len() as f32;
        (0..self.frames())
            .map(|i| self.channels.iter().map(|c| c[i]).sum::<f32>() * scale)
            .collect()
    }
}
