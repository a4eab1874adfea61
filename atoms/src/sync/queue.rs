use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use super::apply::{Applied, SyncApplier, SyncError};
use super::plan::SyncIntent;

/// Where failed intents end up. Failures are recorded, never retried.
pub trait FailureSink: Send + Sync {
    fn record(&self, intent: &SyncIntent, error: &SyncError);
}

/// Logs failed intents through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn record(&self, intent: &SyncIntent, error: &SyncError) {
        match error {
            SyncError::MissingUser(_) | SyncError::MissingTask(_) => {
                tracing::warn!(?intent, "Skipping reverse reference update: {}", error)
            }
            SyncError::Abandoned | SyncError::Store(_) => {
                tracing::error!(?intent, "Failed to apply reverse reference update: {}", error)
            }
        }
    }
}

enum Command {
    Apply(Vec<SyncIntent>),
    Flush(oneshot::Sender<()>),
}

/// Background queue for reverse-reference writes.
///
/// Handlers submit and return immediately; a spawned worker applies each
/// batch. Clones share the same worker. If the worker is torn down (runtime
/// shutdown) with batches still queued or in flight, every remaining intent
/// is handed to the sink as [`SyncError::Abandoned`].
#[derive(Clone)]
pub struct SyncQueue {
    sender: mpsc::UnboundedSender<Command>,
    sink: Arc<dyn FailureSink>,
}

impl SyncQueue {
    /// Starts the worker. Must be called inside a Tokio runtime.
    pub fn spawn(applier: SyncApplier, sink: Arc<dyn FailureSink>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = Worker {
            applier,
            sink: Arc::clone(&sink),
            receiver,
            in_flight: None,
        };
        tokio::spawn(worker.run());
        Self { sender, sink }
    }

    pub fn submit(&self, intents: Vec<SyncIntent>) {
        if intents.is_empty() {
            return;
        }
        tracing::debug!("Queueing {} reverse reference update(s)", intents.len());
        if let Err(mpsc::error::SendError(command)) = self.sender.send(Command::Apply(intents)) {
            tracing::error!("Reverse reference worker has stopped; dropping updates");
            if let Command::Apply(intents) = command {
                record_abandoned(self.sink.as_ref(), &intents);
            }
        }
    }

    /// Resolves once every batch submitted before this call has been applied.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

struct Worker {
    applier: SyncApplier,
    sink: Arc<dyn FailureSink>,
    receiver: mpsc::UnboundedReceiver<Command>,
    in_flight: Option<Vec<SyncIntent>>,
}

impl Worker {
    async fn run(mut self) {
        while let Some(command) = self.receiver.recv().await {
            match command {
                Command::Apply(batch) => {
                    let batch = self.in_flight.insert(batch);
                    apply_batch(&self.applier, self.sink.as_ref(), batch).await;
                    self.in_flight = None;
                }
                Command::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.receiver.close();
        let mut abandoned = self.in_flight.take().unwrap_or_default();
        while let Ok(command) = self.receiver.try_recv() {
            if let Command::Apply(batch) = command {
                abandoned.extend(batch);
            }
        }
        record_abandoned(self.sink.as_ref(), &abandoned);
    }
}

fn record_abandoned(sink: &dyn FailureSink, intents: &[SyncIntent]) {
    for intent in intents {
        sink.record(intent, &SyncError::Abandoned);
    }
}

/// Applies every intent independently; one failure never stops the others.
pub async fn apply_batch(applier: &SyncApplier, sink: &dyn FailureSink, batch: &[SyncIntent]) {
    let outcomes = join_all(batch.iter().map(|intent| applier.apply(intent))).await;

    for (intent, outcome) in batch.iter().zip(outcomes) {
        match outcome {
            Ok(Applied::Changed) => tracing::debug!(?intent, "Reverse reference updated"),
            Ok(Applied::Unchanged) => tracing::debug!(?intent, "Reverse reference already consistent"),
            Err(error) => sink.record(intent, &error),
        }
    }
}
