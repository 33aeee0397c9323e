//! Per-block accumulation state.
//!
//! Text and reasoning blocks stream straight through. Tool-call blocks
//! buffer their argument fragments until `content_block_stop`, then parse the
//! buffer into one completed call.

use rustc_hash::FxHashMap;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::decoder::chunk::SemanticChunk;
use crate::error::StreamError;
use crate::protocol::anthropic::{WireContentBlock, WireDelta};
use crate::protocol::server_tools::ServerToolTable;
use crate::util::{json_type_name, push_json_string_escaped};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Text,
    Reasoning,
    RedactedReasoning,
    ToolCall,
    ProviderToolCall,
    McpToolUse,
    McpToolResult,
    Opaque,
}

impl BlockKind {
    /// Kinds whose arguments arrive as JSON fragments and finalize at stop.
    #[must_use]
    pub fn buffers_arguments(self) -> bool {
        matches!(self, BlockKind::ToolCall | BlockKind::ProviderToolCall)
    }

    /// Kinds whose text and reasoning deltas pass through as chunks.
    #[must_use]
    pub fn streams_text(self) -> bool {
        matches!(
            self,
            BlockKind::Text | BlockKind::Reasoning | BlockKind::Opaque
        )
    }

    /// Kinds that never produce a chunk after their start event.
    #[must_use]
    pub fn is_inert(self) -> bool {
        matches!(
            self,
            BlockKind::RedactedReasoning | BlockKind::McpToolUse | BlockKind::McpToolResult
        )
    }
}

/// Result of feeding one argument fragment to a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    Appended,
    /// Empty (or whitespace-only before the header) fragment; nothing stored.
    Skipped,
    /// The block already holds complete arguments or does not buffer.
    Ignored,
}

/// Accumulation state of one open content block.
#[derive(Debug, Clone)]
pub struct BlockState {
    kind: BlockKind,
    tool_call_id: String,
    emitted_tool_name: String,
    provider_tool_name: String,
    buffer: String,
    is_first_fragment: bool,
    prepopulated: bool,
    inject_type_header: bool,
    awaiting_separator: bool,
}

impl BlockState {
    fn streaming(kind: BlockKind) -> Self {
        Self {
            kind,
            tool_call_id: String::new(),
            emitted_tool_name: String::new(),
            provider_tool_name: String::new(),
            buffer: String::new(),
            is_first_fragment: true,
            prepopulated: false,
            inject_type_header: false,
            awaiting_separator: false,
        }
    }

    #[must_use]
    pub fn text() -> Self {
        Self::streaming(BlockKind::Text)
    }

    #[must_use]
    pub fn reasoning() -> Self {
        Self::streaming(BlockKind::Reasoning)
    }

    #[must_use]
    pub fn inert(kind: BlockKind) -> Self {
        Self::streaming(kind)
    }

    /// A caller-executed tool call. A non-empty `input` object means the
    /// arguments were delivered whole and no fragments will follow.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ToolArguments`] when `input` is present but not
    /// a JSON object.
    pub fn tool_call(
        id: String,
        name: String,
        input: Option<Value>,
    ) -> Result<Self, StreamError> {
        let object = start_arguments(&name, &id, input)?;
        let mut state = Self::streaming(BlockKind::ToolCall);
        state.tool_call_id = id;
        state.provider_tool_name.clone_from(&name);
        state.emitted_tool_name = name;
        state.prepopulate(object);
        Ok(state)
    }

    /// A provider-executed tool call, named and framed per the strategy table.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ToolArguments`] when `input` is present but not
    /// a JSON object.
    pub fn provider_tool_call(
        id: String,
        raw_name: String,
        input: Option<Value>,
        tools: &ServerToolTable,
    ) -> Result<Self, StreamError> {
        let strategy = tools.resolve(&raw_name);
        let mut object = start_arguments(strategy.public_name, &id, input)?;
        let mut state = Self::streaming(BlockKind::ProviderToolCall);
        state.emitted_tool_name = strategy.public_name.to_string();
        state.inject_type_header = strategy.inject_type_header;
        state.tool_call_id = id;
        if state.inject_type_header && !object.is_empty() {
            object
                .entry("type")
                .or_insert_with(|| Value::String(raw_name.clone()));
        }
        state.prepopulate(object);
        state.provider_tool_name = raw_name;
        Ok(state)
    }

    fn prepopulate(&mut self, object: Map<String, Value>) {
        if !object.is_empty() {
            self.buffer = Value::Object(object).to_string();
            self.prepopulated = true;
        }
    }

    #[must_use]
    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    #[must_use]
    pub fn tool_call_id(&self) -> &str {
        &self.tool_call_id
    }

    #[must_use]
    pub fn emitted_tool_name(&self) -> &str {
        &self.emitted_tool_name
    }

    #[must_use]
    pub fn provider_tool_name(&self) -> &str {
        &self.provider_tool_name
    }

    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn is_prepopulated(&self) -> bool {
        self.prepopulated
    }

    /// Append one argument fragment.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ToolBufferLimit`] when the buffer would grow past
    /// `limit` bytes.
    pub fn append_fragment(
        &mut self,
        fragment: &str,
        limit: Option<usize>,
    ) -> Result<FragmentOutcome, StreamError> {
        if fragment.is_empty() {
            return Ok(FragmentOutcome::Skipped);
        }
        if !self.kind.buffers_arguments() || self.prepopulated {
            return Ok(FragmentOutcome::Ignored);
        }

        let mut rest = fragment;
        if self.is_first_fragment && self.inject_type_header {
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                return Ok(FragmentOutcome::Skipped);
            }
            if let Some(after_brace) = trimmed.strip_prefix('{') {
                self.buffer.push_str("{\"type\":");
                push_json_string_escaped(&mut self.buffer, &self.provider_tool_name);
                self.awaiting_separator = true;
                rest = after_brace;
            }
        }
        self.is_first_fragment = false;

        if self.awaiting_separator {
            let trimmed = rest.trim_start();
            if trimmed.is_empty() {
                return self.check_limit(limit).map(|()| FragmentOutcome::Appended);
            }
            if !trimmed.starts_with('}') {
                self.buffer.push(',');
            }
            self.awaiting_separator = false;
            rest = trimmed;
        }

        self.buffer.push_str(rest);
        self.check_limit(limit).map(|()| FragmentOutcome::Appended)
    }

    fn check_limit(&self, limit: Option<usize>) -> Result<(), StreamError> {
        match limit {
            Some(limit) if self.buffer.len() > limit => Err(StreamError::ToolBufferLimit {
                tool: self.emitted_tool_name.clone(),
                limit,
            }),
            _ => Ok(()),
        }
    }

    /// Consume the block at its stop event.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ToolArguments`] when a tool-call buffer is not a
    /// JSON object.
    pub fn finish(self) -> Result<Option<SemanticChunk>, StreamError> {
        if !self.kind.buffers_arguments() {
            return Ok(None);
        }
        let arguments =
            parse_arguments(&self.buffer).map_err(|message| StreamError::ToolArguments {
                tool: self.emitted_tool_name.clone(),
                id: self.tool_call_id.clone(),
                message,
            })?;
        Ok(Some(SemanticChunk::ToolCallComplete {
            id: self.tool_call_id,
            name: self.emitted_tool_name,
            arguments,
        }))
    }
}

/// Arguments carried whole by a start event. A missing or `null` input is
/// an empty object; any other non-object value is an error naming the tool.
pub(crate) fn start_arguments(
    tool: &str,
    id: &str,
    input: Option<Value>,
) -> Result<Map<String, Value>, StreamError> {
    match input {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(object)) => Ok(object),
        Some(other) => Err(StreamError::ToolArguments {
            tool: tool.to_string(),
            id: id.to_string(),
            message: format!("expected a JSON object, found {}", json_type_name(&other)),
        }),
    }
}

fn parse_arguments(buffer: &str) -> Result<Map<String, Value>, String> {
    if buffer.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(buffer) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(format!(
            "expected a JSON object, found {}",
            json_type_name(&other)
        )),
        Err(err) => Err(err.to_string()),
    }
}

/// Index-keyed table of open content blocks.
#[derive(Debug, Default)]
pub struct BlockTracker {
    blocks: FxHashMap<usize, BlockState>,
}

impl BlockTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a block from its `content_block_start` payload.
    ///
    /// Returns the chunk the start itself produces: initial text or
    /// reasoning, or the complete call of an MCP tool use.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ToolArguments`] when a tool block carries an
    /// `input` that is not a JSON object. No block is opened in that case.
    pub fn start(
        &mut self,
        index: usize,
        block: WireContentBlock,
        tools: &ServerToolTable,
    ) -> Result<Option<SemanticChunk>, StreamError> {
        let (state, chunk) = match block {
            WireContentBlock::Text { text } => {
                (BlockState::text(), (!text.is_empty()).then(|| SemanticChunk::text(text)))
            }
            WireContentBlock::Thinking { thinking } => (
                BlockState::reasoning(),
                (!thinking.is_empty()).then(|| SemanticChunk::reasoning(thinking)),
            ),
            WireContentBlock::RedactedThinking => {
                (BlockState::inert(BlockKind::RedactedReasoning), None)
            }
            WireContentBlock::ToolUse { id, name, input } => {
                (BlockState::tool_call(id, name, input)?, None)
            }
            WireContentBlock::ServerToolUse { id, name, input } => (
                BlockState::provider_tool_call(id, name, input, tools)?,
                None,
            ),
            WireContentBlock::McpToolUse {
                id,
                name,
                server_name,
                input,
            } => {
                debug!(index, tool = %name, server = ?server_name, "mcp tool use delivered at block start");
                let arguments = start_arguments(&name, &id, input)?;
                let chunk = SemanticChunk::ToolCallComplete {
                    id,
                    name,
                    arguments,
                };
                (BlockState::inert(BlockKind::McpToolUse), Some(chunk))
            }
            WireContentBlock::McpToolResult => (BlockState::inert(BlockKind::McpToolResult), None),
            WireContentBlock::Other => (BlockState::inert(BlockKind::Opaque), None),
        };

        if let Some(previous) = self.blocks.insert(index, state) {
            debug!(
                index,
                previous_kind = ?previous.kind,
                "content block restarted before stop; replacing state"
            );
        }
        Ok(chunk)
    }

    /// Apply one `content_block_delta`.
    ///
    /// # Errors
    ///
    /// Propagates [`StreamError::ToolBufferLimit`] from the accumulator.
    pub fn delta(
        &mut self,
        index: usize,
        delta: WireDelta,
        limit: Option<usize>,
    ) -> Result<Option<SemanticChunk>, StreamError> {
        let Some(block) = self.blocks.get_mut(&index) else {
            debug!(index, "delta for unopened content block; skipping");
            return Ok(None);
        };
        if block.kind.is_inert() {
            return Ok(None);
        }

        let chunk = match delta {
            WireDelta::TextDelta { .. }
            | WireDelta::ThinkingDelta { .. }
            | WireDelta::CompactionDelta { content: Some(_) }
                if !block.kind.streams_text() =>
            {
                debug!(index, kind = ?block.kind, "text delta on a tool block; skipping");
                None
            }
            WireDelta::TextDelta { text } | WireDelta::CompactionDelta { content: Some(text) } => {
                (!text.is_empty()).then(|| SemanticChunk::text(text))
            }
            WireDelta::ThinkingDelta { thinking } => {
                (!thinking.is_empty()).then(|| SemanticChunk::reasoning(thinking))
            }
            WireDelta::InputJsonDelta { partial_json } => {
                if block.append_fragment(&partial_json, limit)? == FragmentOutcome::Ignored
                    && block.kind.buffers_arguments()
                {
                    warn!(
                        index,
                        tool = %block.emitted_tool_name,
                        "argument fragment after pre-populated input; ignoring"
                    );
                }
                None
            }
            WireDelta::SignatureDelta { .. }
            | WireDelta::CompactionDelta { content: None }
            | WireDelta::Other => None,
        };
        Ok(chunk)
    }

    /// Close a block at `content_block_stop`, finalizing tool calls.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::ToolArguments`] when the accumulated arguments do
    /// not parse. The block is removed either way.
    pub fn stop(&mut self, index: usize) -> Result<Option<SemanticChunk>, StreamError> {
        match self.blocks.remove(&index) {
            Some(block) => block.finish(),
            None => {
                debug!(index, "stop for unopened content block; skipping");
                Ok(None)
            }
        }
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BlockState> {
        self.blocks.get(&index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
