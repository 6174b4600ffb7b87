//! Building a [`PatchScript`] for one file.
//!
//! ## Pipeline
//!
//! 1. Resolve side A, then side B (which may reuse A's content).
//! 2. For modifications, optionally swap the coarse edits for cached
//!    intraline edits.
//! 3. Add anchor edits so commented lines stay visible.
//! 4. Pack the lines the client needs into sparse content.
//!
//! Every step takes its inputs explicitly and returns new values; the builder
//! itself only holds its collaborators and limits.
//!
//! ## Packing policy
//!
//! - Submodule links carry no line content at all.
//! - Two identical sides with no edits, viewed with at least whole-file
//!   context, are sent as the complete side A plus one empty edit at the end
//!   of the file, so the client never receives an empty script for a file
//!   that exists.
//! - Huge files are sent with at most [`EngineConfig::huge_file_context`]
//!   lines of context and without syntax highlighting.
//! - Everything else is sent with [`EngineConfig::max_context`], which lets
//!   the client expand context without another round trip. The requested
//!   context still decides what the client shows first.

use tracing::{debug, instrument, warn};

use crate::anchor::ensure_comments_visible;
use crate::comment::{CommentDetail, HistoryEntry};
use crate::config::{DiffPreferences, EngineConfig};
use crate::diff::FileDiff;
use crate::edit::Edit;
use crate::error::Result;
use crate::hunk::{EditList, HunkLine};
use crate::intraline::{IntralineCache, IntralineKey, IntralineOutcome, IntralineStatus};
use crate::mime::MimeRegistry;
use crate::script::PatchScript;
use crate::side::{ObjectStore, Side, SideResolver};
use crate::text::SparseFileContent;
use crate::types::{FileMode, ObjectId};

/// The per-request inputs of [`PatchScriptBuilder::build`].
#[derive(Debug, Clone)]
pub struct BuildInput<'a> {
    pub project: &'a str,
    pub file: &'a FileDiff,

    /// Commit of side A; `None` when side A is the empty tree.
    pub commit_a: Option<&'a ObjectId>,
    pub commit_b: &'a ObjectId,

    /// Side A is the parent of side B rather than another patch set.
    pub against_parent: bool,

    pub comments: CommentDetail,
    pub history: Vec<HistoryEntry>,
}

pub struct PatchScriptBuilder<'a> {
    store: &'a dyn ObjectStore,
    mime: &'a dyn MimeRegistry,
    intraline: &'a dyn IntralineCache,
    config: EngineConfig,
}

/// Output of the packing step.
struct Packed {
    a: SparseFileContent,
    b: SparseFileContent,
    edits: Vec<Edit>,
    context: usize,
    preferences: DiffPreferences,
    huge_file: bool,
}

impl<'a> PatchScriptBuilder<'a> {
    pub fn new(
        store: &'a dyn ObjectStore,
        mime: &'a dyn MimeRegistry,
        intraline: &'a dyn IntralineCache,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            mime,
            intraline,
            config,
        }
    }

    /// Builds the patch script for `input.file`.
    ///
    /// Fails only when revision content cannot be read. The object store
    /// reader is opened here and released before returning, on success and
    /// on error.
    #[instrument(skip_all, fields(path = %input.file.path, change = input.file.change_type.as_str()))]
    pub fn build(&self, prefs: &DiffPreferences, input: BuildInput<'_>) -> Result<PatchScript> {
        let reader = self.store.open_reader()?;
        let parent_base = input.commit_a.filter(|_| input.against_parent);
        let resolver = SideResolver::new(reader.as_ref(), self.mime, parent_base);

        let file = input.file;
        let a = resolver.resolve(file.old_name(), input.commit_a, None)?;
        let b = resolver.resolve(file.new_name(), Some(input.commit_b), Some(&a))?;
        drop(resolver);
        drop(reader);

        let (edits, intraline) = self.refine_edits(prefs, &input, &a, &b);
        let edits = ensure_comments_visible(edits, &input.comments);
        let packed = pack(&self.config, prefs, &a, &b, edits);

        Ok(PatchScript {
            change_type: file.change_type,
            old_name: file.old_name().map(str::to_string),
            new_name: file.new_name().map(str::to_string),
            old_mode: a.mode,
            new_mode: b.mode,
            header: file.header.clone(),
            preferences: packed.preferences,
            context: packed.context,
            a: packed.a,
            b: packed.b,
            edits: packed.edits,
            display_method_a: a.display_method,
            display_method_b: b.display_method,
            mime_type_a: a.mime_type,
            mime_type_b: b.mime_type,
            commit_id_a: input.commit_a.cloned(),
            commit_id_b: Some(input.commit_b.clone()),
            comments: input.comments,
            history: input.history,
            huge_file: packed.huge_file,
            intraline_difference_possible: intraline.possible,
            intraline_failure: intraline.failure,
            intraline_timeout: intraline.timeout,
        })
    }

    /// Looks up intraline edits for modifications when the user wants them.
    fn refine_edits(
        &self,
        prefs: &DiffPreferences,
        input: &BuildInput<'_>,
        a: &Side,
        b: &Side,
    ) -> (Vec<Edit>, IntralineStatus) {
        let edits = input.file.edits.clone();
        if !input.file.change_type.is_modification() || !prefs.intraline_difference {
            return (edits, IntralineStatus::default());
        }

        let key = IntralineKey {
            id_a: &a.id,
            text_a: &a.text,
            id_b: &b.id,
            text_b: &b.text,
            edits: &edits,
            project: input.project,
            commit_b: input.commit_b,
            path: &input.file.path,
            whitespace: prefs.ignore_whitespace,
        };
        let outcome = self.intraline.lookup(&key);
        match &outcome {
            Some(IntralineOutcome::EditList(refined)) => {
                debug!(edits = refined.len(), "using intraline edits");
            }
            Some(IntralineOutcome::Disabled) => debug!("intraline disabled"),
            Some(IntralineOutcome::Error) => warn!("intraline computation failed"),
            Some(IntralineOutcome::Timeout) => warn!("intraline computation timed out"),
            None => warn!("intraline result not available"),
        }
        IntralineStatus::apply(outcome, edits)
    }
}

fn pack(
    config: &EngineConfig,
    prefs: &DiffPreferences,
    side_a: &Side,
    side_b: &Side,
    edits: Vec<Edit>,
) -> Packed {
    let mut a = side_a.sparse_content();
    let mut b = side_b.sparse_content();
    let mut preferences = prefs.clone();

    if side_a.mode == FileMode::Gitlink || side_b.mode == FileMode::Gitlink {
        debug!("submodule link, no content sent");
        return Packed {
            a,
            b,
            edits,
            context: prefs.context,
            preferences,
            huge_file: false,
        };
    }

    if side_a.same_object(side_b) && edits.is_empty() && prefs.context >= side_a.size() {
        let size = side_a.size();
        debug!(lines = size, "identical sides, sending the whole file");
        for i in 0..size {
            a.add_line(i, side_a.text.line_or_empty(i));
        }
        return Packed {
            a,
            b,
            edits: vec![Edit::empty(size, size)],
            context: prefs.context,
            preferences,
            huge_file: false,
        };
    }

    let huge_file = side_a.size().max(side_b.size()) > config.huge_file_lines;
    let context = if huge_file {
        debug!(
            lines_a = side_a.size(),
            lines_b = side_b.size(),
            "huge file, limiting context"
        );
        preferences.context = config.huge_file_context.min(prefs.context);
        preferences.syntax_highlighting = false;
        preferences.context
    } else {
        config.max_context
    };

    let ignoring_whitespace = prefs.ignore_whitespace.is_ignoring();
    let list = EditList::new(&edits, context, side_a.size(), side_b.size());
    for hunk in list.hunks() {
        for line in hunk {
            match line {
                HunkLine::Context { a: i, b: j } => {
                    let line_a = side_a.text.line_or_empty(i);
                    if ignoring_whitespace {
                        // Unchanged modulo whitespace; keep B's literal bytes too.
                        let line_b = side_b.text.line_or_empty(j);
                        if line_a != line_b {
                            b.add_line(j, line_b);
                        }
                    }
                    a.add_line(i, line_a);
                }
                HunkLine::Deleted { a: i } => a.add_line(i, side_a.text.line_or_empty(i)),
                HunkLine::Inserted { b: j } => b.add_line(j, side_b.text.line_or_empty(j)),
            }
        }
    }

    Packed {
        a,
        b,
        edits,
        context,
        preferences,
        huge_file,
    }
}
