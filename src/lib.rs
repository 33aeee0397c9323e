pub mod config;
pub mod decoder;
pub mod error;
pub mod observability;
pub mod protocol;
pub mod stream;

mod queue;
mod util;

pub use decoder::{DecoderOptions, SemanticChunk, StopReason, StreamSession, Usage};
pub use error::StreamError;
pub use stream::{EventSource, IterEventSource, RawEvent, SseEventSource};
