/// Errors surfaced by a stream session.
///
/// Every variant owns plain strings so a terminal error can be cloned and
/// returned again on each later pull.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed {event_type} payload: {message}")]
    MalformedEvent { event_type: String, message: String },
    #[error("Malformed arguments for tool '{tool}' (id={id}): {message}")]
    ToolArguments {
        tool: String,
        id: String,
        message: String,
    },
    #[error("Argument buffer for tool '{tool}' exceeded {limit} bytes")]
    ToolBufferLimit { tool: String, limit: usize },
    #[error("Provider error: type={kind}, message={message}")]
    Provider { kind: String, message: String },
}

/// Broad error category, useful for callers deciding whether to re-issue a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Transport,
    Protocol,
    Provider,
}

impl StreamError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            StreamError::Transport(_) => ErrorCategory::Transport,
            StreamError::MalformedEvent { .. }
            | StreamError::ToolArguments { .. }
            | StreamError::ToolBufferLimit { .. } => ErrorCategory::Protocol,
            StreamError::Provider { .. } => ErrorCategory::Provider,
        }
    }

    pub(crate) fn transport(err: &std::io::Error) -> Self {
        StreamError::Transport(err.to_string())
    }

    pub(crate) fn malformed(event_type: &str, err: &serde_json::Error) -> Self {
        StreamError::MalformedEvent {
            event_type: event_type.to_string(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_event_names_event_type() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = StreamError::malformed("content_block_delta", &err);
        let message = err.to_string();
        assert!(message.contains("content_block_delta"), "{message}");
        assert_eq!(err.category(), ErrorCategory::Protocol);
    }

    #[test]
    fn test_tool_arguments_names_tool() {
        let err = StreamError::ToolArguments {
            tool: "get_weather".to_string(),
            id: "toolu_1".to_string(),
            message: "EOF while parsing".to_string(),
        };
        assert!(err.to_string().contains("'get_weather'"));
    }

    #[test]
    fn test_transport_category() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = StreamError::transport(&io);
        assert_eq!(err.category(), ErrorCategory::Transport);
        assert_eq!(err.to_string(), "Transport error: reset by peer");
    }
}
