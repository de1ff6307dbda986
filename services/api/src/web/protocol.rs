//! services/api/src/web/protocol.rs
//!
//! Defines the WebSocket message protocol between the browser client and the API server
//! for live tutorial generation.

use serde::{Deserialize, Serialize};
use tutorial_core::{LessonId, PipelineStatus};

//=========================================================================================
// Messages Sent FROM the Client (Browser) TO the Server
//=========================================================================================
// NOTE: The screenshot itself is sent as a single Binary frame, not as part of this enum.
//=========================================================================================

/// Represents the structured text messages a client can send to the server.
#[derive(Deserialize, Debug, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Abandons the running generation. Nothing is saved.
    Cancel,
}

//=========================================================================================
// Messages Sent FROM the Server TO the Client (Browser)
//=========================================================================================

/// Represents the structured text messages the server can send to the client.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Progress update; `message` is meant to be shown as-is.
    Status { stage: &'static str, message: String },

    /// The lesson was saved. The UI can navigate to its viewer.
    Ready { lesson_id: LessonId, has_video: bool },

    /// The screenshot could not be turned into a lesson. The UI should offer a retry.
    Failed { message: String },

    /// The generation was cancelled at the client's request.
    Cancelled,

    /// Reports a protocol error, e.g. text sent where the screenshot was expected.
    Error { message: String },
}

impl ServerMessage {
    pub fn status(status: &PipelineStatus) -> Self {
        Self::Status {
            stage: status.stage(),
            message: status.message(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_messages_carry_stage_and_text() {
        let json = serde_json::to_value(ServerMessage::status(&PipelineStatus::SynthesizingVideo))
            .unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["stage"], "synthesizing_video");
        assert_eq!(
            json["message"],
            "Creating your video guide... This may take a minute."
        );
    }

    #[test]
    fn cancel_is_parsed() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"cancel"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Cancel);
    }
}
