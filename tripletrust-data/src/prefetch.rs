// tripletrust-data/src/prefetch.rs
//
// Background batch producer. The worker thread owns its sampler and its copy
// of the samples; the bounded channel is the only thing it shares with the
// consumer. A full channel blocks the worker, so a slow consumer never makes
// it drop or pile up batches.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, info, warn};
use tripletrust_core::TripletRustError;

use crate::batch::{Batch, BatchAssembler};
use crate::samplers::Sampler;

pub const WORKER_THREAD_NAME: &str = "triplet-prefetch";

type BatchResult = Result<Batch, TripletRustError>;

/// Handle to the prefetch thread and the consumer end of its channel.
///
/// Dropping the handle shuts the worker down and joins it.
#[derive(Debug)]
pub struct PrefetchWorker {
    receiver: Option<Receiver<BatchResult>>,
    handle: Option<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl PrefetchWorker {
    /// Moves `sampler` and `assembler` onto a new thread that keeps at most
    /// `depth` finished batches queued.
    ///
    /// # Errors
    /// - `InvalidConfig` if `depth` is 0.
    /// - `WorkerSpawn` if the OS refuses to start the thread.
    pub fn spawn<S>(sampler: S, assembler: BatchAssembler, depth: usize) -> Result<Self, TripletRustError>
    where
        S: Sampler + 'static,
    {
        if depth == 0 {
            return Err(TripletRustError::InvalidConfig("prefetch_depth must be > 0".to_string()));
        }
        let (sender, receiver) = bounded(depth);
        let shutdown = Arc::new(AtomicBool::new(false));
        let stop = Arc::clone(&shutdown);

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || run(sampler, assembler, sender, stop))
            .map_err(|e| TripletRustError::WorkerSpawn(e.to_string()))?;
        info!("Prefetch worker started (channel depth {})", depth);

        Ok(PrefetchWorker {
            receiver: Some(receiver),
            handle: Some(handle),
            shutdown,
        })
    }

    /// Blocks until the worker delivers its next batch.
    ///
    /// Batches arrive in the order the worker finished them. A batch that
    /// failed to assemble is delivered as its error.
    ///
    /// # Errors
    /// `ChannelClosed` once the worker is shut down or has died.
    pub fn next_batch(&self) -> Result<Batch, TripletRustError> {
        let receiver = self.receiver.as_ref().ok_or(TripletRustError::ChannelClosed)?;
        receiver.recv().map_err(|_| TripletRustError::ChannelClosed)?
    }

    /// Number of finished batches waiting in the channel.
    pub fn queued(&self) -> usize {
        self.receiver.as_ref().map_or(0, Receiver::len)
    }

    /// True until shutdown, or until the worker thread exits on its own.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Stops the worker and waits for it: raise the stop flag, drop our end of
    /// the channel so a blocked send returns, then join. Idempotent.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        self.receiver.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Prefetch worker panicked before shutdown");
            }
            info!("Prefetch worker stopped");
        }
    }
}

impl Drop for PrefetchWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<S: Sampler>(mut sampler: S, assembler: BatchAssembler, sender: Sender<BatchResult>, stop: Arc<AtomicBool>) {
    let mut produced = 0u64;
    while !stop.load(Ordering::Acquire) {
        let batch = assembler.assemble(&mut sampler);
        if let Err(err) = &batch {
            warn!("Prefetch worker failed to assemble batch {}: {}", produced, err);
        }
        if sender.send(batch).is_err() {
            break;
        }
        produced += 1;
    }
    debug!(
        "Prefetch worker exiting after {} batches ({} sampler iterations)",
        produced,
        sampler.iteration()
    );
}

#[cfg(test)]
#[path = "prefetch_test.rs"]
mod tests;
