//! Crate-wide error type.
//!
//! Only one failure class is expected while building a patch script: the
//! content behind a revision could not be read. Everything else in the
//! pipeline is total over its inputs. Degraded intraline results and missing
//! line correspondences are reported through the output, never as errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::PatchSetId;

/// Convenient alias for crate-wide results.
pub type Result<T> = std::result::Result<T, PatchScriptError>;

#[derive(Debug, Error)]
pub enum PatchScriptError {
    /// An object store read failed or returned inconsistent data.
    #[error("content unavailable for {what}: {reason}")]
    ContentUnavailable {
        /// The object, revision or path that could not be read.
        what: String,
        reason: String,
    },

    /// The patch set has no resolvable revision.
    #[error("patch set {0} has no revision")]
    NoSuchPatchSet(PatchSetId),

    /// A `git` invocation exited unsuccessfully.
    #[error("`{command}` failed: {stderr}")]
    Git { command: String, stderr: String },

    /// The working directory is not inside a git repository.
    #[error("not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PatchScriptError {
    /// Shorthand for [`PatchScriptError::ContentUnavailable`].
    pub fn unavailable(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ContentUnavailable {
            what: what.into(),
            reason: reason.into(),
        }
    }
}
