use crate::decoder::chunk::StopReason;

/// Map a provider stop reason onto the canonical set.
#[must_use]
pub fn anthropic_stop_to_canonical(s: &str) -> StopReason {
    match s {
        "end_turn" | "stop_sequence" | "pause_turn" => StopReason::Stop,
        "max_tokens" | "model_context_window_exceeded" => StopReason::LengthLimit,
        "tool_use" => StopReason::ToolCalls,
        _ => StopReason::Other,
    }
}
