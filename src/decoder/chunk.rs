use serde::Serialize;

/// Canonical reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Stop,
    LengthLimit,
    ToolCalls,
    Other,
}

/// Input tokens split by prompt-cache treatment. Unreported figures are zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InputTokenBreakdown {
    pub no_cache: u64,
    pub cache_read: u64,
    pub cache_write: u64,
}

/// Final token usage of one completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    pub input_breakdown: InputTokenBreakdown,
}

/// One unit of decoded output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SemanticChunk {
    TextDelta {
        text: String,
    },
    ReasoningDelta {
        text: String,
    },
    ToolCallComplete {
        id: String,
        name: String,
        arguments: serde_json::Map<String, serde_json::Value>,
    },
    FinishSummary {
        stop_reason: StopReason,
        usage: Usage,
    },
}

impl SemanticChunk {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        SemanticChunk::TextDelta { text: text.into() }
    }

    #[must_use]
    pub fn reasoning(text: impl Into<String>) -> Self {
        SemanticChunk::ReasoningDelta { text: text.into() }
    }

    /// Id of the tool call carried by this chunk, if any.
    #[must_use]
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            SemanticChunk::ToolCallComplete { id, .. } => Some(id),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_finish(&self) -> bool {
        matches!(self, SemanticChunk::FinishSummary { .. })
    }
}
