//! Audio decoding
//!
//! The scheduler sees decoding only through [`AudioDecoder`]: raw bytes in, a
//! [`DecodedBuffer`] with a known duration out, asynchronously. Decodes issued
//! by different `add_chunk` calls may complete in any order.
//!
//! [`SymphoniaDecoder`] decodes in-memory files (MP3, FLAC, AAC/MP4, Ogg
//! Vorbis, WAV) on tokio's blocking pool.

use crate::audio::types::DecodedBuffer;
use crate::error::{Error, Result};
use futures::future::{BoxFuture, FutureExt};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Decoder collaborator: turns one chunk of raw bytes into a playable buffer
pub trait AudioDecoder: Send + Sync + 'static {
    /// Decode `bytes` into a buffer
    ///
    /// The returned future must be independent of `self` so that several
    /// decodes can be in flight at once.
    fn decode(&self, bytes: Vec<u8>) -> BoxFuture<'static, Result<DecodedBuffer>>;
}

/// Symphonia-based decoder for in-memory audio files
#[derive(Debug, Clone, Default)]
pub struct SymphoniaDecoder {
    extension_hint: Option<String>,
}

impl SymphoniaDecoder {
    /// Create a decoder that probes the format from content alone
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a file extension hint (e.g. "mp3")
    pub fn with_extension_hint(extension: &str) -> Self {
        Self {
            extension_hint: Some(extension.to_string()),
        }
    }

    /// Decode an entire in-memory file (blocking)
    ///
    /// # Errors
    /// - Unsupported or unrecognized format
    /// - No audio track, or no frames decoded
    /// - Unrecoverable codec error
    pub fn decode_bytes(bytes: Vec<u8>, extension_hint: Option<&str>) -> Result<DecodedBuffer> {
        let byte_len = bytes.len();
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension_hint {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Stream reset required mid-chunk, truncating decode");
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt packet: skip it, keep the rest of the chunk
                    warn!("Decode error: {}", e);
                    continue;
                }
                Err(e) => return Err(Error::Decode(format!("Codec failure: {}", e))),
            };

            let spec = *decoded.spec();
            sample_rate.get_or_insert(spec.rate);
            channels.get_or_insert(spec.channels.count() as u16);

            let required = decoded.capacity() * spec.channels.count();
            if sample_buf.as_ref().map_or(true, |b| b.capacity() < required) {
                sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
            }
            if let Some(buf) = sample_buf.as_mut() {
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
        }

        let sample_rate = sample_rate
            .filter(|&r| r > 0)
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;
        let channels = channels
            .filter(|&c| c > 0)
            .ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

        let buffer = DecodedBuffer::new(samples, sample_rate, channels);
        if buffer.is_empty() {
            return Err(Error::Decode("No audio frames decoded".to_string()));
        }

        debug!(
            "Decoded {} bytes: {} frames, {} Hz, {} ch",
            byte_len, buffer.frame_count, sample_rate, channels
        );

        Ok(buffer)
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, bytes: Vec<u8>) -> BoxFuture<'static, Result<DecodedBuffer>> {
        let hint = self.extension_hint.clone();
        async move {
            tokio::task::spawn_blocking(move || Self::decode_bytes(bytes, hint.as_deref()))
                .await
                .map_err(|e| Error::Decode(format!("Decode task failed: {}", e)))?
        }
        .boxed()
    }
}
