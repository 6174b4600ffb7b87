//! Contract with the intraline (word-level) diff cache.
//!
//! Intraline results are computed elsewhere; the engine only looks them up.
//! A lookup that finds nothing is reported as `None` and treated by the
//! builder exactly like [`IntralineOutcome::Error`].

use crate::config::Whitespace;
use crate::edit::Edit;
use crate::text::Text;
use crate::types::ObjectId;

/// Everything an intraline result depends on.
#[derive(Debug, Clone, Copy)]
pub struct IntralineKey<'a> {
    pub id_a: &'a ObjectId,
    pub text_a: &'a Text,
    pub id_b: &'a ObjectId,
    pub text_b: &'a Text,
    /// The coarse, line-level edits being refined.
    pub edits: &'a [Edit],
    pub project: &'a str,
    pub commit_b: &'a ObjectId,
    pub path: &'a str,
    pub whitespace: Whitespace,
}

/// Result of an intraline computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntralineOutcome {
    /// Refined edits that replace the coarse ones.
    EditList(Vec<Edit>),
    /// Intraline diffs are switched off for this content.
    Disabled,
    Error,
    Timeout,
}

pub trait IntralineCache: Send + Sync {
    /// Returns the cached outcome, or `None` if nothing was computed yet.
    fn lookup(&self, key: &IntralineKey<'_>) -> Option<IntralineOutcome>;
}

/// A cache that never holds anything; every file reports intraline disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIntraline;

impl IntralineCache for NoIntraline {
    fn lookup(&self, _key: &IntralineKey<'_>) -> Option<IntralineOutcome> {
        Some(IntralineOutcome::Disabled)
    }
}

/// How an intraline lookup affected the output flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntralineStatus {
    pub possible: bool,
    pub failure: bool,
    pub timeout: bool,
}

impl Default for IntralineStatus {
    fn default() -> Self {
        Self {
            possible: true,
            failure: false,
            timeout: false,
        }
    }
}

impl IntralineStatus {
    /// Applies `outcome` to `edits`, returning the edits to continue with.
    #[must_use]
    pub fn apply(outcome: Option<IntralineOutcome>, edits: Vec<Edit>) -> (Vec<Edit>, Self) {
        let degraded = |failure, timeout| Self {
            possible: false,
            failure,
            timeout,
        };
        match outcome {
            Some(IntralineOutcome::EditList(refined)) => (refined, Self::default()),
            Some(IntralineOutcome::Disabled) => (edits, degraded(false, false)),
            Some(IntralineOutcome::Error) | None => (edits, degraded(true, false)),
            Some(IntralineOutcome::Timeout) => (edits, degraded(true, true)),
        }
    }
}
