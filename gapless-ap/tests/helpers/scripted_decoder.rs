//! Scripted decoder
//!
//! Chunk bytes are a JSON script telling the decoder how long the decoded
//! audio is, how long decoding takes and whether it fails. Decoded audio is
//! mono at [`SCRIPT_SAMPLE_RATE`], every sample set to the chunk's `marker`.

use futures::future::{BoxFuture, FutureExt};
use gapless_ap::audio::{AudioDecoder, DecodedBuffer};
use gapless_ap::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 1 kHz: one frame is exactly 28,224 ticks
pub const SCRIPT_SAMPLE_RATE: u32 = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChunkScript {
    millis: u64,
    delay_ms: u64,
    fail: bool,
    marker: f32,
}

/// Chunk lasting `millis` that takes `delay_ms` to decode
pub fn scripted_chunk(millis: u64, delay_ms: u64) -> Vec<u8> {
    encode(ChunkScript {
        millis,
        delay_ms,
        fail: false,
        marker: millis as f32,
    })
}

/// Chunk that fails to decode after `delay_ms`
pub fn failing_chunk(delay_ms: u64) -> Vec<u8> {
    encode(ChunkScript {
        millis: 0,
        delay_ms,
        fail: true,
        marker: 0.0,
    })
}

fn encode(script: ChunkScript) -> Vec<u8> {
    serde_json::to_vec(&script).unwrap()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptedDecoder;

impl AudioDecoder for ScriptedDecoder {
    fn decode(&self, bytes: Vec<u8>) -> BoxFuture<'static, Result<DecodedBuffer>> {
        async move {
            let script: ChunkScript = serde_json::from_slice(&bytes)
                .map_err(|e| Error::Decode(format!("Bad script: {}", e)))?;

            if script.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(script.delay_ms)).await;
            }
            if script.fail {
                return Err(Error::Decode("Scripted failure".to_string()));
            }

            let frames = (script.millis * SCRIPT_SAMPLE_RATE as u64 / 1000) as usize;
            Ok(DecodedBuffer::new(
                vec![script.marker; frames],
                SCRIPT_SAMPLE_RATE,
                1,
            ))
        }
        .boxed()
    }
}
