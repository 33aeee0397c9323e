pub mod block;
pub mod chunk;
pub mod session;
pub mod usage;

pub use block::{BlockKind, BlockState, BlockTracker};
pub use chunk::{InputTokenBreakdown, SemanticChunk, StopReason, Usage};
pub use session::{SessionState, StreamSession, Terminal};
pub use usage::{IterationUsage, UsageAccumulator};

use std::sync::Arc;

use crate::config::{DecoderConfig, MalformedPayloadPolicy};
use crate::protocol::server_tools::ServerToolTable;

/// Runtime knobs of a [`StreamSession`], usually built from [`DecoderConfig`].
#[derive(Debug, Clone)]
pub struct DecoderOptions {
    pub malformed_payloads: MalformedPayloadPolicy,
    /// Ceiling on one tool call's argument buffer; `None` is unbounded.
    pub max_tool_buffer_bytes: Option<usize>,
    pub server_tools: Arc<ServerToolTable>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self::from(&DecoderConfig::default())
    }
}

impl From<&DecoderConfig> for DecoderOptions {
    fn from(config: &DecoderConfig) -> Self {
        Self {
            malformed_payloads: config.malformed_payloads,
            max_tool_buffer_bytes: config.max_tool_buffer_bytes,
            server_tools: Arc::new(ServerToolTable::with_rules(&config.server_tools)),
        }
    }
}
