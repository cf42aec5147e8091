//! Job queue message definitions.
//!
//! One queue message is one job. Messages are immutable once enqueued, and
//! delivery order across message kinds is not guaranteed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The wire envelope carried on the jobs queue, JSON-encoded as
/// `{"type": "...", "libraryId": "...", ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JobMessage {
    #[serde(rename_all = "camelCase")]
    ProcessPicture { library_id: Uuid, file_id: Uuid },
    #[serde(rename_all = "camelCase")]
    ProcessVideo {
        library_id: Uuid,
        file_id: Uuid,
        convert_to_mp4: bool,
    },
    #[serde(rename_all = "camelCase")]
    RecalculateFolder { library_id: Uuid, folder_id: Uuid },
}

impl JobMessage {
    /// Message kind as a short string, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            JobMessage::ProcessPicture { .. } => "ProcessPicture",
            JobMessage::ProcessVideo { .. } => "ProcessVideo",
            JobMessage::RecalculateFolder { .. } => "RecalculateFolder",
        }
    }

    pub fn library_id(&self) -> Uuid {
        match self {
            JobMessage::ProcessPicture { library_id, .. }
            | JobMessage::ProcessVideo { library_id, .. }
            | JobMessage::RecalculateFolder { library_id, .. } => *library_id,
        }
    }
}
