//! Events emitted on the command stream
//!
//! The JSON shape follows the UI message stream protocol the editor client
//! consumes: each event is one SSE `data:` line.

use crate::router::ToolSelection;
use serde::{Deserialize, Serialize};

/// One review comment produced by the `comment` tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentResult {
    #[serde(rename = "blockId")]
    pub block_id: String,
    pub content: String,
    pub comment: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Streaming,
    Finished,
}

/// Payload of a `data-comment` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentData {
    pub comment: Option<CommentResult>,
    pub status: CommentStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Tool announcement, always the first event of a stream
    #[serde(rename = "data-toolName")]
    ToolName { data: ToolSelection },

    #[serde(rename = "data-comment")]
    Comment { id: String, data: CommentData },

    #[serde(rename = "text-start")]
    TextStart { id: String },

    #[serde(rename = "text-delta")]
    TextDelta { id: String, delta: String },

    #[serde(rename = "text-end")]
    TextEnd { id: String },

    /// Terminal failure after the response has started
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },
}

impl StreamEvent {
    pub fn is_finished_sentinel(&self) -> bool {
        matches!(
            self,
            StreamEvent::Comment {
                data: CommentData {
                    comment: None,
                    status: CommentStatus::Finished,
                },
                ..
            }
        )
    }

    /// Serialize for an SSE `data:` line
    pub fn to_json(&self) -> String {
        // Plain data types only; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
