//! Engine limits and per-request diff preferences.

use serde::{Deserialize, Serialize};

/// Limits applied while packing content. Passed into the builder explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Files with more lines than this on either side are "huge".
    pub huge_file_lines: usize,

    /// Upper bound on context lines sent for a huge file.
    pub huge_file_context: usize,

    /// Context sent for ordinary files, so the client can expand locally.
    pub max_context: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            huge_file_lines: 9000,
            huge_file_context: 25,
            max_context: 5_000_000,
        }
    }
}

/// Whitespace handling of the line-level diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Whitespace {
    #[default]
    IgnoreNone,
    IgnoreTrailing,
    IgnoreLeadingAndTrailing,
    IgnoreAll,
}

impl Whitespace {
    /// Whether lines that differ only in whitespace may count as unchanged.
    #[inline]
    #[must_use]
    pub const fn is_ignoring(self) -> bool {
        !matches!(self, Self::IgnoreNone)
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ignore_none" | "none" => Some(Self::IgnoreNone),
            "ignore_trailing" | "trailing" => Some(Self::IgnoreTrailing),
            "ignore_leading_and_trailing" | "leading_and_trailing" => {
                Some(Self::IgnoreLeadingAndTrailing)
            }
            "ignore_all" | "all" => Some(Self::IgnoreAll),
            _ => None,
        }
    }
}

/// What the user asked to see.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffPreferences {
    /// Lines of context shown around changes; [`Self::WHOLE_FILE_CONTEXT`] for all.
    pub context: usize,
    pub ignore_whitespace: Whitespace,
    pub intraline_difference: bool,
    pub syntax_highlighting: bool,
}

impl DiffPreferences {
    pub const WHOLE_FILE_CONTEXT: usize = usize::MAX;
}

impl Default for DiffPreferences {
    fn default() -> Self {
        Self {
            context: 10,
            ignore_whitespace: Whitespace::IgnoreNone,
            intraline_difference: true,
            syntax_highlighting: true,
        }
    }
}
