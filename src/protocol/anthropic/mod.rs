//! Wire shapes of the Messages streaming protocol.
//!
//! Only the fields the decoder reads are modelled; everything else in a
//! payload is ignored so new provider fields never break decoding.

use serde::Deserialize;

/// Named SSE event types the decoder recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamEventKind {
    Ping,
    MessageStart,
    ContentBlockStart,
    ContentBlockDelta,
    ContentBlockStop,
    MessageDelta,
    MessageStop,
    Error,
}

impl StreamEventKind {
    /// Resolve an SSE `event:` name. Unknown names return `None`.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        let kind = match event_type {
            "ping" => Self::Ping,
            "message_start" => Self::MessageStart,
            "content_block_start" => Self::ContentBlockStart,
            "content_block_delta" => Self::ContentBlockDelta,
            "content_block_stop" => Self::ContentBlockStop,
            "message_delta" => Self::MessageDelta,
            "message_stop" => Self::MessageStop,
            "error" => Self::Error,
            _ => return None,
        };
        Some(kind)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ping => "ping",
            Self::MessageStart => "message_start",
            Self::ContentBlockStart => "content_block_start",
            Self::ContentBlockDelta => "content_block_delta",
            Self::ContentBlockStop => "content_block_stop",
            Self::MessageDelta => "message_delta",
            Self::MessageStop => "message_stop",
            Self::Error => "error",
        }
    }
}

/// Token usage as reported by `message_start` and `message_delta`.
///
/// All fields are optional: `message_start` usually carries the input side,
/// `message_delta` the output side and the iteration breakdown.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireUsage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub cache_read_input_tokens: Option<u64>,
    pub cache_creation_input_tokens: Option<u64>,
    pub iterations: Option<Vec<WireIteration>>,
}

/// One phase of a multi-phase generation (for example `compaction`, then `message`).
#[derive(Debug, Clone, Deserialize)]
pub struct WireIteration {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

/// `message_start` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartEvent {
    pub message: MessageStartBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageStartBody {
    #[serde(default)]
    pub usage: Option<WireUsage>,
    /// Content delivered whole at message start (deferred tool calls).
    #[serde(default)]
    pub content: Option<Vec<StartContent>>,
}

/// Entries of `message.content` at message start. Only tool calls matter here.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StartContent {
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    #[serde(other)]
    Other,
}

/// `content_block_start` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlockStartEvent {
    pub index: usize,
    pub content_block: WireContentBlock,
}

/// The block opened by `content_block_start`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireContentBlock {
    Text {
        #[serde(default)]
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    RedactedThinking,
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    ServerToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    McpToolUse {
        id: String,
        name: String,
        #[serde(default)]
        server_name: Option<String>,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    McpToolResult,
    /// Compaction summaries, provider tool results and block types added later.
    #[serde(other)]
    Other,
}

/// `content_block_delta` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlockDeltaEvent {
    pub index: usize,
    pub delta: WireDelta,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireDelta {
    TextDelta {
        text: String,
    },
    ThinkingDelta {
        thinking: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    SignatureDelta {
        #[serde(default)]
        signature: String,
    },
    CompactionDelta {
        #[serde(default)]
        content: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// `content_block_stop` payload.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ContentBlockStopEvent {
    pub index: usize,
}

/// `message_delta` payload.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDeltaEvent {
    #[serde(default)]
    pub delta: MessageDeltaBody,
    #[serde(default)]
    pub usage: Option<WireUsage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDeltaBody {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

/// `error` payload sent in-band when the provider aborts a stream.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEvent {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}
