//! The patch script: everything a client needs to render one file diff.
//!
//! A patch script is produced once per request and handed to the caller,
//! either as a Rust value, as JSON (via `serde`), or as a Lua table.

use mlua::prelude::*;
use serde::Serialize;

use crate::comment::{Comment, CommentDetail, HistoryEntry};
use crate::config::DiffPreferences;
use crate::edit::Edit;
use crate::mime::MimeType;
use crate::text::SparseFileContent;
use crate::types::{ChangeType, DisplayMethod, FileMode, ObjectId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchScript {
    pub change_type: ChangeType,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub old_mode: FileMode,
    pub new_mode: FileMode,

    /// The raw diff header (`diff --git`, `index`, `rename from`, ...).
    pub header: Vec<String>,

    /// Preferences as applied; a huge file turns off syntax highlighting.
    pub preferences: DiffPreferences,

    /// Context lines actually sent, which may exceed the requested context.
    pub context: usize,

    pub a: SparseFileContent,
    pub b: SparseFileContent,
    pub edits: Vec<Edit>,

    pub display_method_a: DisplayMethod,
    pub display_method_b: DisplayMethod,
    pub mime_type_a: MimeType,
    pub mime_type_b: MimeType,
    pub commit_id_a: Option<ObjectId>,
    pub commit_id_b: Option<ObjectId>,

    pub comments: CommentDetail,
    pub history: Vec<HistoryEntry>,

    pub huge_file: bool,
    pub intraline_difference_possible: bool,
    pub intraline_failure: bool,
    pub intraline_timeout: bool,
}

impl PatchScript {
    /// Serializes the script for a transport layer.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Whether any line content was sent for either side.
    #[must_use]
    pub fn has_content(&self) -> bool {
        !self.a.lines.is_empty() || !self.b.lines.is_empty()
    }
}

impl IntoLua for Edit {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set("begin_a", self.begin_a)?;
        table.set("end_a", self.end_a)?;
        table.set("begin_b", self.begin_b)?;
        table.set("end_b", self.end_b)?;
        Ok(LuaValue::Table(table))
    }
}

impl IntoLua for SparseFileContent {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set("path", self.path)?;
        table.set("size", self.size)?;
        table.set("missing_newline_at_end", self.missing_newline_at_end)?;

        // Sparse keys would break `ipairs`, so lines travel as `{line, text}` pairs.
        let lines: Vec<LuaValue> = self
            .lines
            .into_iter()
            .map(|(line, text)| {
                let entry = lua.create_table()?;
                entry.set("line", line)?;
                entry.set("text", text)?;
                Ok(LuaValue::Table(entry))
            })
            .collect::<LuaResult<_>>()?;
        table.set("lines", lua.create_sequence_from(lines)?)?;

        Ok(LuaValue::Table(table))
    }
}

impl IntoLua for Comment {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set("patch_set", self.patch_set.0)?;
        table.set("line", self.line)?;
        table.set("author", self.author)?;
        table.set("message", self.message)?;
        table.set("draft", self.draft)?;
        Ok(LuaValue::Table(table))
    }
}

impl IntoLua for HistoryEntry {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set("patch_set", self.patch_set.0)?;
        table.set("comment_count", self.comment_count)?;
        table.set("draft_count", self.draft_count)?;
        Ok(LuaValue::Table(table))
    }
}

impl IntoLua for PatchScript {
    fn into_lua(self, lua: &Lua) -> LuaResult<LuaValue> {
        let table = lua.create_table()?;
        table.set("change_type", self.change_type.as_str())?;
        table.set("old_name", self.old_name)?;
        table.set("new_name", self.new_name)?;
        table.set("old_mode", self.old_mode.as_str())?;
        table.set("new_mode", self.new_mode.as_str())?;
        table.set("header", lua.create_sequence_from(self.header)?)?;
        table.set("context", self.context)?;
        table.set("syntax_highlighting", self.preferences.syntax_highlighting)?;

        table.set("a", self.a.into_lua(lua)?)?;
        table.set("b", self.b.into_lua(lua)?)?;

        let edits: Vec<LuaValue> = self
            .edits
            .into_iter()
            .map(|e| e.into_lua(lua))
            .collect::<LuaResult<_>>()?;
        table.set("edits", lua.create_sequence_from(edits)?)?;

        table.set("display_method_a", self.display_method_a.as_str())?;
        table.set("display_method_b", self.display_method_b.as_str())?;
        table.set("mime_type_a", self.mime_type_a.as_str())?;
        table.set("mime_type_b", self.mime_type_b.as_str())?;
        table.set("commit_id_a", self.commit_id_a.map(|id| id.to_string()))?;
        table.set("commit_id_b", self.commit_id_b.map(|id| id.to_string()))?;

        let comments_a: Vec<LuaValue> = self
            .comments
            .comments_a
            .into_iter()
            .map(|c| c.into_lua(lua))
            .collect::<LuaResult<_>>()?;
        let comments_b: Vec<LuaValue> = self
            .comments
            .comments_b
            .into_iter()
            .map(|c| c.into_lua(lua))
            .collect::<LuaResult<_>>()?;
        table.set("comments_a", lua.create_sequence_from(comments_a)?)?;
        table.set("comments_b", lua.create_sequence_from(comments_b)?)?;

        let history: Vec<LuaValue> = self
            .history
            .into_iter()
            .map(|h| h.into_lua(lua))
            .collect::<LuaResult<_>>()?;
        table.set("history", lua.create_sequence_from(history)?)?;

        table.set("huge_file", self.huge_file)?;
        table.set(
            "intraline_difference_possible",
            self.intraline_difference_possible,
        )?;
        table.set("intraline_failure", self.intraline_failure)?;
        table.set("intraline_timeout", self.intraline_timeout)?;

        Ok(LuaValue::Table(table))
    }
}
