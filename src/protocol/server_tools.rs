//! Provider-executed ("server") tool handling.
//!
//! The provider streams its own tool identifiers. Some of them are variants of
//! one public tool and need their argument object tagged with the raw
//! identifier so callers can tell the variants apart.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// How one raw server tool identifier is presented to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerToolRule {
    pub raw_name: String,
    pub public_name: String,
    /// Prefix the argument object with `"type": "<raw_name>"`.
    #[serde(default)]
    pub inject_type_header: bool,
}

impl ServerToolRule {
    #[must_use]
    pub fn new(raw_name: &str, public_name: &str, inject_type_header: bool) -> Self {
        Self {
            raw_name: raw_name.to_string(),
            public_name: public_name.to_string(),
            inject_type_header,
        }
    }
}

/// Resolved treatment for one raw tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerToolStrategy<'a> {
    pub public_name: &'a str,
    pub inject_type_header: bool,
}

/// Strategy table keyed by raw provider tool identifier.
#[derive(Debug, Clone)]
pub struct ServerToolTable {
    rules: FxHashMap<String, ServerToolRule>,
}

const BUILTIN_RULES: &[(&str, &str, bool)] = &[
    ("bash_code_execution", "code_execution", true),
    ("text_editor_code_execution", "code_execution", true),
    ("tool_search_tool_regex", "tool_search", false),
    ("tool_search_tool_bm25", "tool_search", false),
];

impl ServerToolTable {
    /// A table with no rules: every raw name passes through unchanged.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            rules: FxHashMap::default(),
        }
    }

    /// The built-in rules for the provider's current server tools.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        for &(raw, public, inject) in BUILTIN_RULES {
            table.insert(ServerToolRule::new(raw, public, inject));
        }
        table
    }

    /// Built-in rules overlaid with `rules`; later entries win.
    #[must_use]
    pub fn with_rules<'a>(rules: impl IntoIterator<Item = &'a ServerToolRule>) -> Self {
        let mut table = Self::builtin();
        for rule in rules {
            table.insert(rule.clone());
        }
        table
    }

    pub fn insert(&mut self, rule: ServerToolRule) -> Option<ServerToolRule> {
        self.rules.insert(rule.raw_name.clone(), rule)
    }

    #[must_use]
    pub fn resolve<'a>(&'a self, raw_name: &'a str) -> ServerToolStrategy<'a> {
        match self.rules.get(raw_name) {
            Some(rule) => ServerToolStrategy {
                public_name: &rule.public_name,
                inject_type_header: rule.inject_type_header,
            },
            None => ServerToolStrategy {
                public_name: raw_name,
                inject_type_header: false,
            },
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for ServerToolTable {
    fn default() -> Self {
        Self::builtin()
    }
}
