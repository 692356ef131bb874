//! Ingest worker
//!
//! Single worker task that applies decoded chunks to the scheduler strictly in
//! submission order.
//!
//! Decodes run concurrently as independent tokio tasks; what is serialized is
//! the *mutation* step. Each `add_chunk` call posts an [`IngestJob`] holding
//! its decode task and a reply channel. The worker awaits the jobs one by one
//! in FIFO order, so a fast decode submitted late waits behind a slow decode
//! submitted early.
//!
//! A failed decode is reported to its own caller only; the worker moves on to
//! the next job.

use crate::audio::types::DecodedBuffer;
use crate::error::{Error, Result};
use crate::playback::scheduler::SchedulerCore;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// One queued `add_chunk` request
pub(crate) struct IngestJob {
    /// Sequence number in submission order (for logging)
    pub seq: u64,
    /// Already running decode
    pub decode: JoinHandle<Result<DecodedBuffer>>,
    /// Resolves the caller's future with the new total duration
    pub reply: oneshot::Sender<Result<i64>>,
    pub submitted: Instant,
}

/// Spawn the ingest worker
///
/// The worker exits once every sender of `rx` is dropped and the remaining
/// jobs are drained.
pub(crate) fn spawn_worker(
    core: Arc<Mutex<SchedulerCore>>,
    mut rx: mpsc::UnboundedReceiver<IngestJob>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("Ingest worker started");

        while let Some(job) = rx.recv().await {
            let result = match job.decode.await {
                Ok(Ok(buffer)) => {
                    let total = core.lock().append(buffer);
                    debug!(
                        "Chunk #{} appended after {:.1}ms (total {} ticks)",
                        job.seq,
                        job.submitted.elapsed().as_secs_f64() * 1000.0,
                        total
                    );
                    Ok(total)
                }
                Ok(Err(e)) => {
                    warn!("Chunk #{} failed to decode: {}", job.seq, e);
                    Err(e)
                }
                Err(e) => {
                    warn!("Chunk #{} decode task aborted: {}", job.seq, e);
                    Err(Error::Decode(format!("Decode task failed: {}", e)))
                }
            };

            if job.reply.send(result).is_err() {
                debug!("Chunk #{} caller went away before completion", job.seq);
            }
        }

        info!("Ingest worker stopped");
    })
}
