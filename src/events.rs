//! Structured progress events emitted per pipeline stage.
//!
//! The pipeline sends one event per stage transition plus a terminal
//! completion or failure event. A dropped receiver never fails a run;
//! emission is fire-and-forget.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::PipelineStage;

/// One progress notification from an ingestion run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub run_id: Uuid,
    pub stage: PipelineStage,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    #[must_use]
    pub fn new(run_id: Uuid, stage: PipelineStage, message: impl Into<String>) -> Self {
        Self {
            run_id,
            stage,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Sender half handed to the pipeline builder.
pub type ProgressSender = flume::Sender<ProgressEvent>;
/// Receiver half consumed by the hosting process.
pub type ProgressReceiver = flume::Receiver<ProgressEvent>;

/// Creates an unbounded progress channel.
#[must_use]
pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    flume::unbounded()
}
