//! Upload events and the observers that consume them
//!
//! The upload state machine never logs directly. It publishes [`UploadEvent`]s
//! to an injected [`UploadObserver`]; the CLI uses [`TracingObserver`] and
//! tests capture events through [`ChannelObserver`].

use super::ledger::{UploadPhase, UploadStage};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Something that happened during an upload
#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// A phase began
    PhaseStarted {
        stage: UploadStage,
        part_number: Option<i32>,
    },

    /// A phase was recorded in the ledger
    PhaseEnded(UploadPhase),

    /// Raw store response, pretty-printed for verbose output
    StoreResponse {
        operation: &'static str,
        detail: String,
    },

    /// Abort requested for a failed upload
    AbortIssued { upload_id: String },

    /// Abort itself failed; the multipart session may be left on the server
    AbortFailed { upload_id: String, error: String },

    /// Upload completed and verified
    Completed {
        bucket: String,
        key: String,
        source: String,
    },
}

/// Sink for upload events
pub trait UploadObserver: Send + Sync {
    fn on_event(&self, event: &UploadEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl UploadObserver for TracingObserver {
    fn on_event(&self, event: &UploadEvent) {
        match event {
            UploadEvent::PhaseStarted { stage, part_number } => match (stage, part_number) {
                (UploadStage::Init, _) => tracing::info!("Initiating multipart upload..."),
                (UploadStage::PartUpload, Some(n)) => tracing::info!("Uploading part {}...", n),
                (UploadStage::PartUpload, None) => tracing::info!("Uploading part..."),
                (UploadStage::Completion, _) => tracing::info!("Completing multipart upload..."),
                (UploadStage::Verification, _) => {
                    tracing::info!("Verifying complete upload with checksums...")
                }
            },
            UploadEvent::PhaseEnded(phase) if !phase.success => {
                tracing::error!("{}", phase.summary());
            }
            UploadEvent::PhaseEnded(phase) => match (phase.stage, phase.part_number) {
                (UploadStage::PartUpload, Some(n)) => {
                    tracing::info!("✓ Part {} uploaded and verified", n)
                }
                _ => tracing::debug!("{}", phase.summary()),
            },
            UploadEvent::StoreResponse { operation, detail } => {
                tracing::debug!("{} response:\n{}", operation, detail);
            }
            UploadEvent::AbortIssued { upload_id } => {
                tracing::info!(upload_id = %upload_id, "Aborting multipart upload...");
            }
            UploadEvent::AbortFailed { upload_id, error } => {
                tracing::warn!(
                    upload_id = %upload_id,
                    "Failed to abort multipart upload: {}",
                    error
                );
            }
            UploadEvent::Completed {
                bucket,
                key,
                source,
            } => {
                tracing::info!("✓ Upload completed: {} → {}/{}", source, bucket, key);
            }
        }
    }
}

/// Publishes events onto a crossbeam channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Option<Sender<UploadEvent>>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel
    pub fn unbounded() -> (Self, EventSubscriber) {
        let (tx, rx) = unbounded();
        (Self { sender: Some(tx) }, EventSubscriber { receiver: rx })
    }

    /// Observer that discards everything
    pub fn noop() -> Self {
        Self { sender: None }
    }
}

impl UploadObserver for ChannelObserver {
    fn on_event(&self, event: &UploadEvent) {
        if let Some(tx) = &self.sender {
            // Subscriber may have been dropped
            let _ = tx.send(event.clone());
        }
    }
}

/// Receiving end of a [`ChannelObserver`]
pub struct EventSubscriber {
    receiver: Receiver<UploadEvent>,
}

impl EventSubscriber {
    pub fn receiver(&self) -> &Receiver<UploadEvent> {
        &self.receiver
    }

    pub fn try_recv(&self) -> Option<UploadEvent> {
        self.receiver.try_recv().ok()
    }

    /// Collect every event published so far
    pub fn drain(&self) -> Vec<UploadEvent> {
        self.receiver.try_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_delivers_in_order() {
        let (observer, subscriber) = ChannelObserver::unbounded();
        observer.on_event(&UploadEvent::PhaseStarted {
            stage: UploadStage::Init,
            part_number: None,
        });
        observer.on_event(&UploadEvent::AbortIssued {
            upload_id: "abc".to_string(),
        });

        let events = subscriber.drain();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            UploadEvent::PhaseStarted {
                stage: UploadStage::Init,
                ..
            }
        ));
        assert!(matches!(events[1], UploadEvent::AbortIssued { .. }));
        assert!(subscriber.try_recv().is_none());
    }

    #[test]
    fn test_noop_and_dropped_subscriber_do_not_panic() {
        let event = UploadEvent::AbortIssued {
            upload_id: "abc".to_string(),
        };
        ChannelObserver::noop().on_event(&event);

        let (observer, subscriber) = ChannelObserver::unbounded();
        drop(subscriber);
        observer.on_event(&event);
    }

    #[test]
    fn test_tracing_observer_handles_every_event() {
        let observer = TracingObserver;
        let mut ledger = crate::protocol::s3::ledger::PhaseLedger::new();
        ledger.start_phase(UploadStage::PartUpload, Some(1));
        let phase = ledger.fail("Upload failed", None);

        observer.on_event(&UploadEvent::PhaseEnded(phase));
        observer.on_event(&UploadEvent::AbortFailed {
            upload_id: "abc".to_string(),
            error: "NoSuchUpload".to_string(),
        });
        observer.on_event(&UploadEvent::Completed {
            bucket: "b".to_string(),
            key: "k".to_string(),
            source: "text input".to_string(),
        });
    }
}
