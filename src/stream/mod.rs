pub mod sse;

pub use sse::{format_sse_frame, SseEvent, SseEventSource, SseParser};

use bytes::Bytes;

use crate::error::StreamError;

/// One framed record from the transport: the SSE event name and its raw payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub event_type: String,
    pub payload: Bytes,
}

impl RawEvent {
    #[must_use]
    pub fn new(event_type: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            event_type: event_type.into(),
            payload: payload.into(),
        }
    }
}

/// Blocking pull source of framed events.
///
/// `Ok(None)` signals a clean end of stream; `Err` a transport failure.
pub trait EventSource {
    /// # Errors
    ///
    /// Returns [`StreamError::Transport`] when the underlying transport fails.
    fn next_event(&mut self) -> Result<Option<RawEvent>, StreamError>;
}

impl<S: EventSource + ?Sized> EventSource for &mut S {
    fn next_event(&mut self) -> Result<Option<RawEvent>, StreamError> {
        (**self).next_event()
    }
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn next_event(&mut self) -> Result<Option<RawEvent>, StreamError> {
        (**self).next_event()
    }
}

/// Event source over an in-memory iterator of records.
#[derive(Debug, Clone)]
pub struct IterEventSource<I> {
    inner: I,
}

impl<I> IterEventSource<I>
where
    I: Iterator<Item = Result<RawEvent, StreamError>>,
{
    #[must_use]
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

/// Iterator type behind [`IterEventSource::from_events`].
pub type ReplayIter = std::iter::Map<
    std::vec::IntoIter<RawEvent>,
    fn(RawEvent) -> Result<RawEvent, StreamError>,
>;

impl IterEventSource<ReplayIter> {
    /// Source that replays `events` and then ends cleanly.
    #[must_use]
    pub fn from_events(events: Vec<RawEvent>) -> Self {
        let wrap: fn(RawEvent) -> Result<RawEvent, StreamError> = Ok;
        Self {
            inner: events.into_iter().map(wrap),
        }
    }
}

impl<I> EventSource for IterEventSource<I>
where
    I: Iterator<Item = Result<RawEvent, StreamError>>,
{
    fn next_event(&mut self) -> Result<Option<RawEvent>, StreamError> {
        self.inner.next().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iter_source_ends_cleanly() {
        let mut source = IterEventSource::from_events(vec![RawEvent::new("ping", "{}")]);
        let first = source.next_event().unwrap().unwrap();
        assert_eq!(first.event_type, "ping");
        assert_eq!(first.payload.as_ref(), b"{}");
        assert!(source.next_event().unwrap().is_none());
    }

    #[test]
    fn test_iter_source_propagates_errors() {
        let mut source = IterEventSource::new(
            vec![Err(StreamError::Transport("closed".into()))].into_iter(),
        );
        assert!(source.next_event().is_err());
    }

    #[test]
    fn test_mut_ref_is_a_source() {
        fn pull<S: EventSource>(mut source: S) -> bool {
            source.next_event().unwrap().is_some()
        }

        let mut source = IterEventSource::from_events(vec![RawEvent::new("ping", "")]);
        assert!(pull(&mut source));
        assert!(!pull(&mut source));
    }
}
