use crate::decoder::chunk::{InputTokenBreakdown, Usage};
use crate::protocol::anthropic::WireUsage;

/// Token usage of one generation phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterationUsage {
    pub kind: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Merges token figures reported across `message_start` and `message_delta`.
///
/// The provider reports cumulative counters, so a figure present in a later
/// event replaces the earlier one instead of being added to it. A non-empty
/// iteration breakdown supersedes the flat input/output counters.
#[derive(Debug, Clone, Default)]
pub struct UsageAccumulator {
    input_tokens: u64,
    cache_read_tokens: u64,
    cache_write_tokens: u64,
    output_tokens: u64,
    iterations: Vec<IterationUsage>,
}

impl UsageAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, usage: &WireUsage) {
        if let Some(input) = usage.input_tokens {
            self.input_tokens = input;
        }
        if let Some(cache_read) = usage.cache_read_input_tokens {
            self.cache_read_tokens = cache_read;
        }
        if let Some(cache_write) = usage.cache_creation_input_tokens {
            self.cache_write_tokens = cache_write;
        }
        if let Some(output) = usage.output_tokens {
            self.output_tokens = output;
        }
        if let Some(iterations) = usage.iterations.as_deref() {
            if !iterations.is_empty() {
                self.iterations = iterations
                    .iter()
                    .map(|iteration| IterationUsage {
                        kind: iteration.kind.clone(),
                        input_tokens: iteration.input_tokens,
                        output_tokens: iteration.output_tokens,
                    })
                    .collect();
            }
        }
    }

    #[must_use]
    pub fn iterations(&self) -> &[IterationUsage] {
        &self.iterations
    }

    #[must_use]
    pub fn total_input(&self) -> u64 {
        if self.iterations.is_empty() {
            self.input_tokens
                .saturating_add(self.cache_read_tokens)
                .saturating_add(self.cache_write_tokens)
        } else {
            self.iterations
                .iter()
                .fold(0u64, |acc, it| acc.saturating_add(it.input_tokens))
        }
    }

    #[must_use]
    pub fn total_output(&self) -> u64 {
        if self.iterations.is_empty() {
            self.output_tokens
        } else {
            self.iterations
                .iter()
                .fold(0u64, |acc, it| acc.saturating_add(it.output_tokens))
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Usage {
        let input_tokens = self.total_input();
        let output_tokens = self.total_output();
        let cached = self.cache_read_tokens.saturating_add(self.cache_write_tokens);
        Usage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens.saturating_add(output_tokens),
            input_breakdown: InputTokenBreakdown {
                no_cache: input_tokens.saturating_sub(cached),
                cache_read: self.cache_read_tokens,
                cache_write: self.cache_write_tokens,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::anthropic::WireIteration;

    fn start_usage(input: u64, cache_read: Option<u64>, cache_write: Option<u64>) -> WireUsage {
        WireUsage {
            input_tokens: Some(input),
            output_tokens: Some(1),
            cache_read_input_tokens: cache_read,
            cache_creation_input_tokens: cache_write,
            iterations: None,
        }
    }

    #[test]
    fn test_flat_usage_with_cache() {
        let mut acc = UsageAccumulator::new();
        acc.merge(&start_usage(100, Some(400), Some(50)));
        acc.merge(&WireUsage {
            output_tokens: Some(30),
            ..WireUsage::default()
        });

        let usage = acc.snapshot();
        assert_eq!(usage.input_tokens, 550);
        assert_eq!(usage.output_tokens, 30);
        assert_eq!(usage.total_tokens, 580);
        assert_eq!(usage.input_breakdown.no_cache, 100);
        assert_eq!(usage.input_breakdown.cache_read, 400);
        assert_eq!(usage.input_breakdown.cache_write, 50);
    }

    #[test]
    fn test_missing_cache_figures_default_to_zero() {
        let mut acc = UsageAccumulator::new();
        acc.merge(&start_usage(12, None, None));
        let usage = acc.snapshot();
        assert_eq!(usage.input_breakdown.cache_read, 0);
        assert_eq!(usage.input_breakdown.cache_write, 0);
        assert_eq!(usage.input_breakdown.no_cache, 12);
    }

    #[test]
    fn test_iterations_supersede_flat_counts() {
        let mut acc = UsageAccumulator::new();
        acc.merge(&start_usage(120, None, None));
        acc.merge(&WireUsage {
            output_tokens: Some(12),
            iterations: Some(vec![
                WireIteration {
                    kind: "compaction".to_string(),
                    input_tokens: 900,
                    output_tokens: 40,
                },
                WireIteration {
                    kind: "message".to_string(),
                    input_tokens: 120,
                    output_tokens: 12,
                },
            ]),
            ..WireUsage::default()
        });

        let usage = acc.snapshot();
        assert_eq!(usage.input_tokens, 1020);
        assert_eq!(usage.output_tokens, 52);
        assert_eq!(usage.total_tokens, 1072);
        assert_eq!(acc.iterations().len(), 2);
    }

    #[test]
    fn test_empty_iteration_list_keeps_flat_counts() {
        let mut acc = UsageAccumulator::new();
        acc.merge(&start_usage(7, None, None));
        acc.merge(&WireUsage {
            output_tokens: Some(3),
            iterations: Some(Vec::new()),
            ..WireUsage::default()
        });
        assert_eq!(acc.snapshot().total_tokens, 10);
    }

    #[test]
    fn test_late_input_figures_replace_start_values() {
        let mut acc = UsageAccumulator::new();
        acc.merge(&start_usage(0, None, None));
        acc.merge(&WireUsage {
            input_tokens: Some(42),
            output_tokens: Some(8),
            cache_read_input_tokens: Some(2),
            ..WireUsage::default()
        });
        let usage = acc.snapshot();
        assert_eq!(usage.input_tokens, 44);
        assert_eq!(usage.total_tokens, 52);
    }
}
