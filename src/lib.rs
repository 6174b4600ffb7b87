//! # patchscript-nvim
//!
//! A Neovim plugin backend that prepares side-by-side file diffs for review.
//!
//! For each file it produces a *patch script*: the edit regions between two
//! revisions, the subset of lines the viewer needs from each side, and enough
//! metadata (modes, MIME types, comments, intraline status) to render it.
//!
//! ## Architecture
//!
//! - `translate`, `anchor`, `hunk` - pure line arithmetic over edit lists
//! - `side` - loads one side of a file through an object store reader
//! - `builder` - assembles a [`PatchScript`] for one file
//! - `factory` - turns patch-set ids into revisions, diffs and comments
//! - `git` - collaborators backed by the `git` binary
//! - `lib` (this module) - Lua bindings
//!
//! ## Usage from Lua
//!
//! ```lua
//! local ps = require("patchscript_nvim")
//!
//! -- Diff a file between HEAD^ and HEAD
//! local script = ps.patch_script("HEAD^", "HEAD", "src/main.rs", { context = 3 })
//!
//! -- Several files at once; old revision defaults to the first parent
//! local scripts = ps.patch_scripts(nil, "HEAD", { "a.rs", "b.rs" }, {
//!   ignore_whitespace = "trailing",
//!   comments = { { side = "b", line = 12, path = "a.rs" } },
//! })
//! ```

use mlua::prelude::*;
use rayon::prelude::*;
use std::path::Path;
use tracing::debug;

pub mod anchor;
pub mod builder;
pub mod comment;
pub mod config;
pub mod diff;
pub mod edit;
pub mod error;
pub mod factory;
pub mod git;
pub mod hunk;
pub mod intraline;
pub mod mime;
pub mod script;
pub mod side;
pub mod text;
pub mod translate;
pub mod types;

#[cfg(test)]
mod testing;

pub use builder::{BuildInput, PatchScriptBuilder};
pub use comment::{Comment, CommentDetail, CommentSide};
pub use config::{DiffPreferences, EngineConfig, Whitespace};
pub use edit::Edit;
pub use error::{PatchScriptError, Result};
pub use factory::{CommentStore, PatchScriptFactory, PatchSetRegistry, ScriptRequest};
pub use script::PatchScript;
pub use types::{ChangeType, FileMode, ObjectId, PatchSetId};

use git::{GitDiffSource, GitObjectStore};
use intraline::NoIntraline;
use mime::ExtensionMimeRegistry;

/// A revision pair presented as a change.
///
/// When side A is the first parent of `new` (or absent), the change has one
/// patch set diffed against its parent. Any other pair becomes two patch sets,
/// `base` as 1 and `new` as 2, diffed against each other.
#[derive(Debug, Clone)]
struct LocalChange {
    project: String,
    parent: Option<ObjectId>,
    base: Option<ObjectId>,
    new: ObjectId,
}

impl LocalChange {
    fn new(project: String, old: Option<ObjectId>, new: ObjectId, parent: Option<ObjectId>) -> Self {
        let base = old.filter(|old| Some(old) != parent.as_ref());
        Self {
            project,
            parent,
            base,
            new,
        }
    }

    /// Patch set compared against, `None` meaning the target's parent.
    fn base_patch_set(&self) -> Option<PatchSetId> {
        self.base.as_ref().map(|_| PatchSetId(1))
    }

    fn target_patch_set(&self) -> PatchSetId {
        match self.base {
            Some(_) => PatchSetId(2),
            None => PatchSetId(1),
        }
    }

    /// Where a comment shown on `pane` is stored.
    fn comment_slot(&self, pane: Pane) -> (PatchSetId, CommentSide) {
        match (pane, self.base_patch_set()) {
            (Pane::A, None) => (self.target_patch_set(), CommentSide::Parent),
            (Pane::A, Some(base)) => (base, CommentSide::Revision),
            (Pane::B, _) => (self.target_patch_set(), CommentSide::Revision),
        }
    }
}

impl PatchSetRegistry for LocalChange {
    fn project(&self) -> &str {
        &self.project
    }

    fn patch_sets(&self) -> Vec<PatchSetId> {
        self.base_patch_set()
            .into_iter()
            .chain([self.target_patch_set()])
            .collect()
    }

    fn revision(&self, patch_set: PatchSetId) -> Option<ObjectId> {
        if patch_set == self.target_patch_set() {
            Some(self.new.clone())
        } else if Some(patch_set) == self.base_patch_set() {
            self.base.clone()
        } else {
            None
        }
    }

    fn parent_revision(&self, patch_set: PatchSetId) -> Option<ObjectId> {
        self.parent
            .clone()
            .filter(|_| patch_set == self.target_patch_set())
    }
}

/// Viewer pane a Lua comment is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pane {
    A,
    B,
}

/// A comment passed in from Lua; `path = None` targets the requested file.
#[derive(Debug, Clone)]
struct InlineComment {
    path: Option<String>,
    pane: Pane,
    line: u32,
    author: String,
    message: String,
    draft: bool,
}

/// Comments supplied with one request.
struct InlineComments<'a> {
    target: &'a str,
    change: &'a LocalChange,
    entries: &'a [InlineComment],
}

impl CommentStore for InlineComments<'_> {
    fn comments(&self, path: &str) -> Result<Vec<Comment>> {
        Ok(self
            .entries
            .iter()
            .filter(|e| match e.path.as_deref() {
                Some(p) => p == path,
                None => path == self.target,
            })
            .map(|e| {
                let (patch_set, side) = self.change.comment_slot(e.pane);
                Comment {
                    patch_set,
                    side,
                    line: e.line,
                    author: e.author.clone(),
                    message: e.message.clone(),
                    draft: e.draft,
                }
            })
            .collect())
    }
}

/// Request options parsed from the Lua `opts` table.
#[derive(Debug, Clone, Default)]
struct Options {
    preferences: DiffPreferences,
    config: EngineConfig,
    comments: Vec<InlineComment>,
}

/// Negative context from Lua means "whole file".
#[inline]
fn context_from_lua(n: i64) -> usize {
    usize::try_from(n).unwrap_or(DiffPreferences::WHOLE_FILE_CONTEXT)
}

fn parse_side(side: &str) -> Option<Pane> {
    match side {
        "a" | "parent" => Some(Pane::A),
        "b" | "revision" => Some(Pane::B),
        _ => None,
    }
}

impl FromLua for InlineComment {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        let table = match value {
            LuaValue::Table(table) => table,
            other => {
                return Err(LuaError::RuntimeError(format!(
                    "comment must be a table, got {}",
                    other.type_name()
                )));
            }
        };
        let side: String = table.get::<Option<String>>("side")?.unwrap_or_else(|| "b".into());
        let pane = parse_side(&side)
            .ok_or_else(|| LuaError::RuntimeError(format!("invalid comment side: {side}")))?;
        Ok(Self {
            path: table.get("path")?,
            pane,
            line: table.get("line")?,
            author: table.get::<Option<String>>("author")?.unwrap_or_default(),
            message: table.get::<Option<String>>("message")?.unwrap_or_default(),
            draft: table.get::<Option<bool>>("draft")?.unwrap_or(false),
        })
    }
}

impl FromLua for Options {
    fn from_lua(value: LuaValue, _: &Lua) -> LuaResult<Self> {
        let table = match value {
            LuaValue::Nil => return Ok(Self::default()),
            LuaValue::Table(table) => table,
            other => {
                return Err(LuaError::RuntimeError(format!(
                    "opts must be a table, got {}",
                    other.type_name()
                )));
            }
        };

        let mut opts = Self::default();
        let prefs = &mut opts.preferences;
        if let Some(n) = table.get::<Option<i64>>("context")? {
            prefs.context = context_from_lua(n);
        }
        if let Some(ws) = table.get::<Option<String>>("ignore_whitespace")? {
            prefs.ignore_whitespace = Whitespace::parse(&ws).ok_or_else(|| {
                LuaError::RuntimeError(format!("invalid ignore_whitespace: {ws}"))
            })?;
        }
        if let Some(on) = table.get::<Option<bool>>("intraline_difference")? {
            prefs.intraline_difference = on;
        }
        if let Some(on) = table.get::<Option<bool>>("syntax_highlighting")? {
            prefs.syntax_highlighting = on;
        }

        let config = &mut opts.config;
        if let Some(n) = table.get::<Option<usize>>("huge_file_lines")? {
            config.huge_file_lines = n;
        }
        if let Some(n) = table.get::<Option<usize>>("huge_file_context")? {
            config.huge_file_context = n;
        }
        if let Some(n) = table.get::<Option<usize>>("max_context")? {
            config.max_context = n;
        }

        if let Some(list) = table.get::<Option<LuaTable>>("comments")? {
            opts.comments = list
                .sequence_values::<InlineComment>()
                .collect::<LuaResult<_>>()?;
        }
        Ok(opts)
    }
}

/// Everything shared by the files of one Lua call.
struct Session {
    store: GitObjectStore,
    diffs: GitDiffSource,
    change: LocalChange,
}

impl Session {
    /// Opens the repository containing the working directory.
    fn open(old_rev: Option<&str>, new_rev: &str) -> Result<Self> {
        Self::open_in(&std::env::current_dir()?, old_rev, new_rev)
    }

    /// Opens the repository containing `dir`.
    ///
    /// Without `old_rev`, `new_rev` is compared against its first parent.
    fn open_in(dir: &Path, old_rev: Option<&str>, new_rev: &str) -> Result<Self> {
        let root = git::git_root(dir)?;
        let new = git::rev_parse(&root, new_rev)?;
        let parent = git::first_parent(&root, &new)?;
        let old = old_rev
            .filter(|rev| !rev.is_empty())
            .map(|rev| git::rev_parse(&root, rev))
            .transpose()?;
        debug!(%new, ?old, ?parent, "opened session");
        Ok(Self {
            store: GitObjectStore::new(&root),
            diffs: GitDiffSource::new(&root),
            change: LocalChange::new(project_name(&root), old, new, parent),
        })
    }

    fn patch_script(&self, path: &str, opts: &Options) -> Result<PatchScript> {
        let comments = InlineComments {
            target: path,
            change: &self.change,
            entries: &opts.comments,
        };
        let factory = PatchScriptFactory {
            registry: &self.change,
            diffs: &self.diffs,
            comments: &comments,
            store: &self.store,
            mime: &ExtensionMimeRegistry,
            intraline: &NoIntraline,
            config: opts.config,
        };
        factory.create(&ScriptRequest {
            path,
            base: self.change.base_patch_set(),
            target: self.change.target_patch_set(),
            preferences: opts.preferences.clone(),
        })
    }
}

fn project_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| root.display().to_string())
}

#[inline]
fn into_lua_error(err: PatchScriptError) -> LuaError {
    LuaError::RuntimeError(err.to_string())
}

/// Builds the patch script of one file.
fn patch_script(
    lua: &Lua,
    (old_rev, new_rev, path, opts): (Option<String>, String, String, Options),
) -> LuaResult<LuaValue> {
    let session = Session::open(old_rev.as_deref(), &new_rev).map_err(into_lua_error)?;
    let script = session.patch_script(&path, &opts).map_err(into_lua_error)?;
    script.into_lua(lua)
}

/// Builds the patch scripts of several files in parallel.
fn patch_scripts(
    lua: &Lua,
    (old_rev, new_rev, paths, opts): (Option<String>, String, Vec<String>, Options),
) -> LuaResult<LuaTable> {
    let session = Session::open(old_rev.as_deref(), &new_rev).map_err(into_lua_error)?;
    let scripts: Vec<PatchScript> = paths
        .par_iter()
        .map(|path| session.patch_script(path, &opts))
        .collect::<Result<_>>()
        .map_err(into_lua_error)?;

    let table = lua.create_table()?;
    for (i, script) in scripts.into_iter().enumerate() {
        table.set(i + 1, script.into_lua(lua)?)?;
    }
    Ok(table)
}

/// Same as `patch_script`, serialized as JSON.
fn patch_script_json(
    _: &Lua,
    (old_rev, new_rev, path, opts): (Option<String>, String, String, Options),
) -> LuaResult<String> {
    let session = Session::open(old_rev.as_deref(), &new_rev).map_err(into_lua_error)?;
    let script = session.patch_script(&path, &opts).map_err(into_lua_error)?;
    script
        .to_json()
        .map_err(|e| LuaError::RuntimeError(format!("failed to serialize patch script: {e}")))
}

/// Creates the Lua module exports. Called by mlua when loaded via `require("patchscript_nvim")`.
#[mlua::lua_module]
fn patchscript_nvim(lua: &Lua) -> LuaResult<LuaTable> {
    let exports = lua.create_table()?;
    exports.set("patch_script", lua.create_function(patch_script)?)?;
    exports.set("patch_scripts", lua.create_function(patch_scripts)?)?;
    exports.set("patch_script_json", lua.create_function(patch_script_json)?)?;
    Ok(exports)
}
