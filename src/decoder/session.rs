//! The pull-driven reconstruction state machine.

use std::iter::FusedIterator;
use std::time::Instant;

use serde::de::DeserializeOwned;
use tracing::{debug, trace, warn};

use crate::config::MalformedPayloadPolicy;
use crate::decoder::block::{start_arguments, BlockTracker};
use crate::decoder::chunk::{SemanticChunk, Usage};
use crate::decoder::usage::UsageAccumulator;
use crate::decoder::DecoderOptions;
use crate::error::StreamError;
use crate::observability::log_stream_finish;
use crate::protocol::anthropic::{
    ContentBlockDeltaEvent, ContentBlockStartEvent, ContentBlockStopEvent, ErrorEvent,
    MessageDeltaEvent, MessageStartEvent, StartContent, StreamEventKind,
};
use crate::protocol::mapping::anthropic_stop_to_canonical;
use crate::queue::PendingQueue;
use crate::stream::{EventSource, RawEvent};

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminal {
    Eof,
    Error(StreamError),
}

/// Where the session is in its pull cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingEvent,
    Finalizing,
    Terminal(Terminal),
}

enum Step {
    Emit(SemanticChunk),
    Continue,
    End,
}

/// Decodes one streamed completion into [`SemanticChunk`]s.
///
/// Each call to [`StreamSession::next_chunk`] either drains a pending chunk
/// or pulls events from the source until one produces a chunk or the stream
/// ends. Once the session reaches a terminal state every later call returns
/// the same outcome without touching the source.
pub struct StreamSession<S> {
    source: S,
    options: DecoderOptions,
    blocks: BlockTracker,
    usage: UsageAccumulator,
    pending: PendingQueue<SemanticChunk>,
    state: SessionState,
    error_yielded: bool,
    started_at: Instant,
}

impl<S: EventSource> StreamSession<S> {
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_options(source, DecoderOptions::default())
    }

    #[must_use]
    pub fn with_options(source: S, options: DecoderOptions) -> Self {
        Self {
            source,
            options,
            blocks: BlockTracker::new(),
            usage: UsageAccumulator::new(),
            pending: PendingQueue::new(),
            state: SessionState::Idle,
            error_yielded: false,
            started_at: Instant::now(),
        }
    }

    /// Pull the next chunk.
    ///
    /// `Ok(None)` means the stream ended cleanly.
    ///
    /// # Errors
    ///
    /// Returns the terminal [`StreamError`] (transport failure, malformed
    /// payload, malformed tool arguments or a provider error event). The same
    /// error is returned again on every later call.
    pub fn next_chunk(&mut self) -> Result<Option<SemanticChunk>, StreamError> {
        loop {
            if let Some(chunk) = self.pending.pop_front() {
                return Ok(Some(chunk));
            }
            if let SessionState::Terminal(terminal) = &self.state {
                return match terminal {
                    Terminal::Eof => Ok(None),
                    Terminal::Error(err) => Err(err.clone()),
                };
            }

            self.state = SessionState::AwaitingEvent;
            let event = match self.source.next_event() {
                Ok(Some(event)) => event,
                Ok(None) => {
                    self.end_of_stream();
                    continue;
                }
                Err(err) => return Err(self.fail(err)),
            };

            match self.process(event) {
                Ok(Step::Emit(chunk)) => {
                    self.state = SessionState::Idle;
                    return Ok(Some(chunk));
                }
                Ok(Step::Continue) => {}
                Ok(Step::End) => self.end_of_stream(),
                Err(err) => return Err(self.fail(err)),
            }
        }
    }

    fn process(&mut self, event: RawEvent) -> Result<Step, StreamError> {
        let Some(kind) = StreamEventKind::from_event_type(&event.event_type) else {
            debug!(event_type = %event.event_type, "skipping unrecognized stream event");
            return Ok(Step::Continue);
        };
        trace!(event_type = kind.as_str(), bytes = event.payload.len(), "stream event");

        match kind {
            StreamEventKind::Ping => Ok(Step::Continue),
            StreamEventKind::MessageStart => {
                let Some(start) = self.decode::<MessageStartEvent>(kind, &event.payload)? else {
                    return Ok(Step::Continue);
                };
                self.on_message_start(start)?;
                Ok(Step::Continue)
            }
            StreamEventKind::ContentBlockStart => {
                let Some(start) = self.decode::<ContentBlockStartEvent>(kind, &event.payload)?
                else {
                    return Ok(Step::Continue);
                };
                let chunk =
                    self.blocks
                        .start(start.index, start.content_block, &self.options.server_tools)?;
                Ok(chunk.map_or(Step::Continue, Step::Emit))
            }
            StreamEventKind::ContentBlockDelta => {
                let Some(delta) = self.decode::<ContentBlockDeltaEvent>(kind, &event.payload)?
                else {
                    return Ok(Step::Continue);
                };
                let chunk = self.blocks.delta(
                    delta.index,
                    delta.delta,
                    self.options.max_tool_buffer_bytes,
                )?;
                Ok(chunk.map_or(Step::Continue, Step::Emit))
            }
            StreamEventKind::ContentBlockStop => {
                let Some(stop) = self.decode::<ContentBlockStopEvent>(kind, &event.payload)? else {
                    return Ok(Step::Continue);
                };
                self.state = SessionState::Finalizing;
                let chunk = self.blocks.stop(stop.index)?;
                Ok(chunk.map_or(Step::Continue, Step::Emit))
            }
            StreamEventKind::MessageDelta => {
                let Some(delta) = self.decode::<MessageDeltaEvent>(kind, &event.payload)? else {
                    return Ok(Step::Continue);
                };
                Ok(self.on_message_delta(delta))
            }
            StreamEventKind::MessageStop => Ok(Step::End),
            StreamEventKind::Error => {
                let Some(error) = self.decode::<ErrorEvent>(kind, &event.payload)? else {
                    return Ok(Step::Continue);
                };
                Err(StreamError::Provider {
                    kind: error.error.kind,
                    message: error.error.message,
                })
            }
        }
    }

    fn decode<T: DeserializeOwned>(
        &self,
        kind: StreamEventKind,
        payload: &[u8],
    ) -> Result<Option<T>, StreamError> {
        match serde_json::from_slice(payload) {
            Ok(value) => Ok(Some(value)),
            Err(err) => match self.options.malformed_payloads {
                MalformedPayloadPolicy::Fatal => Err(StreamError::malformed(kind.as_str(), &err)),
                MalformedPayloadPolicy::Skip => {
                    warn!(event_type = kind.as_str(), error = %err, "skipping malformed stream event");
                    Ok(None)
                }
            },
        }
    }

    fn on_message_start(&mut self, start: MessageStartEvent) -> Result<(), StreamError> {
        if let Some(usage) = start.message.usage.as_ref() {
            self.usage.merge(usage);
        }
        for entry in start.message.content.unwrap_or_default() {
            if let StartContent::ToolUse { id, name, input } = entry {
                let arguments = start_arguments(&name, &id, input)?;
                debug!(tool = %name, id = %id, "tool call delivered with message start");
                self.pending.push(SemanticChunk::ToolCallComplete {
                    id,
                    name,
                    arguments,
                });
            }
        }
        Ok(())
    }

    fn on_message_delta(&mut self, delta: MessageDeltaEvent) -> Step {
        if let Some(usage) = delta.usage.as_ref() {
            self.usage.merge(usage);
        }
        match delta.delta.stop_reason.as_deref() {
            Some(raw) if !raw.is_empty() => {
                let stop_reason = anthropic_stop_to_canonical(raw);
                let usage = self.usage.snapshot();
                log_stream_finish(raw, stop_reason, &usage, self.started_at.elapsed());
                Step::Emit(SemanticChunk::FinishSummary { stop_reason, usage })
            }
            _ => Step::Continue,
        }
    }

    fn end_of_stream(&mut self) {
        if !self.blocks.is_empty() {
            debug!(open_blocks = self.blocks.len(), "stream ended with open content blocks");
            self.blocks.clear();
        }
        self.state = SessionState::Terminal(Terminal::Eof);
    }

    fn fail(&mut self, err: StreamError) -> StreamError {
        warn!(error = %err, "stream session terminated");
        self.blocks.clear();
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "discarding queued chunks after failure");
            self.pending.clear();
        }
        self.state = SessionState::Terminal(Terminal::Error(err.clone()));
        err
    }

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self.state, SessionState::Terminal(_))
    }

    /// Usage accumulated so far.
    #[must_use]
    pub fn usage(&self) -> Usage {
        self.usage.snapshot()
    }

    #[must_use]
    pub fn open_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// End the session early and hand back the event source.
    pub fn close(self) -> S {
        self.source
    }
}

/// Yields chunks until the stream ends. A terminal error is yielded once,
/// after which the iterator is exhausted.
impl<S: EventSource> Iterator for StreamSession<S> {
    type Item = Result<SemanticChunk, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.error_yielded {
            return None;
        }
        match self.next_chunk() {
            Ok(Some(chunk)) => Some(Ok(chunk)),
            Ok(None) => None,
            Err(err) => {
                self.error_yielded = true;
                Some(Err(err))
            }
        }
    }
}

impl<S: EventSource> FusedIterator for StreamSession<S> {}
