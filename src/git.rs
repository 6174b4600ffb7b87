//! Collaborators backed by the `git` command line.
//!
//! Every read shells out to `git -C <root>`; nothing here links against
//! libgit2. The coarse diff comes from `git diff -U0`, whose hunk headers
//! carry exactly the edit regions the engine needs.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, trace};

use crate::config::Whitespace;
use crate::diff::{CoarseDiffCache, DiffKey, DiffList, FileDiff};
use crate::edit::Edit;
use crate::error::{PatchScriptError, Result};
use crate::side::{ContentReader, ObjectStore, TreeEntry};
use crate::text::Text;
use crate::types::{COMMIT_MSG, ChangeType, FileMode, ObjectId};

/// Tree of the empty repository, used as side A of a root commit.
const EMPTY_TREE: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

const COMMIT_MSG_FORMAT: &str = "--format=Parent:     %p%n\
Author:     %an <%ae>%n\
AuthorDate: %ad%n\
Commit:     %cn <%ce>%n\
CommitDate: %cd%n\
%n\
%B";

/// Runs `git -C root <args>` and returns its stdout.
fn run_git<I, S>(root: &Path, args: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    run_git_accepting(root, args, &[0])
}

/// Like [`run_git`], treating every exit code in `accepted` as success.
fn run_git_accepting<I, S>(root: &Path, args: I, accepted: &[i32]) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut command = Command::new("git");
    command.arg("-C").arg(root).args(args);
    let output = command.output()?;

    if !output.status.code().is_some_and(|code| accepted.contains(&code)) {
        let rendered: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        return Err(PatchScriptError::Git {
            command: format!("git {}", rendered.join(" ")),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}

/// Turns a failed read of `what` into [`PatchScriptError::ContentUnavailable`].
fn unavailable_on_failure(what: String) -> impl FnOnce(PatchScriptError) -> PatchScriptError {
    move |err| match err {
        PatchScriptError::Git { stderr, .. } => PatchScriptError::unavailable(what, stderr),
        other => other,
    }
}

/// The top level of the repository containing `dir`.
pub fn git_root(dir: &Path) -> Result<PathBuf> {
    let stdout = run_git(dir, ["rev-parse", "--show-toplevel"])
        .map_err(|_| PatchScriptError::NotARepository(dir.to_path_buf()))?;
    Ok(PathBuf::from(String::from_utf8_lossy(&stdout).trim()))
}

/// Resolves a revision expression to a commit id.
pub fn rev_parse(root: &Path, rev: &str) -> Result<ObjectId> {
    let spec = format!("{rev}^{{commit}}");
    let stdout = run_git(root, ["rev-parse", "--verify", "--end-of-options", spec.as_str()])?;
    Ok(ObjectId::new(String::from_utf8_lossy(&stdout).trim()))
}

/// First parent of `commit`, or `None` for a root commit.
pub fn first_parent(root: &Path, commit: &ObjectId) -> Result<Option<ObjectId>> {
    let stdout = run_git(root, ["rev-list", "--parents", "-n", "1", commit.as_str()])?;
    Ok(String::from_utf8_lossy(&stdout)
        .split_whitespace()
        .nth(1)
        .map(ObjectId::new))
}

/// The commit-message pseudo-file: a short commit header, then the message.
pub fn commit_message(root: &Path, commit: &ObjectId) -> Result<Vec<u8>> {
    run_git(root, ["show", "-s", "--no-color", COMMIT_MSG_FORMAT, commit.as_str()])
        .map_err(unavailable_on_failure(format!("commit {commit}")))
}

/// Object store reading straight from a repository on disk.
#[derive(Debug, Clone)]
pub struct GitObjectStore {
    root: PathBuf,
}

impl GitObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ObjectStore for GitObjectStore {
    fn open_reader(&self) -> Result<Box<dyn ContentReader + '_>> {
        Ok(Box::new(GitReader { root: &self.root }))
    }
}

struct GitReader<'a> {
    root: &'a Path,
}

impl ContentReader for GitReader<'_> {
    fn resolve_tree_path(&self, revision: &ObjectId, path: &str) -> Result<Option<TreeEntry>> {
        let stdout = run_git(
            self.root,
            ["ls-tree", "-z", "--full-tree", revision.as_str(), "--", path],
        )
        .map_err(unavailable_on_failure(format!("tree of {revision}")))?;
        Ok(parse_ls_tree(&stdout, path))
    }

    fn read_blob(&self, id: &ObjectId) -> Result<Vec<u8>> {
        trace!(%id, "reading blob");
        run_git(self.root, ["cat-file", "blob", id.as_str()])
            .map_err(unavailable_on_failure(format!("blob {id}")))
    }

    fn read_commit_message(&self, commit: &ObjectId) -> Result<Vec<u8>> {
        commit_message(self.root, commit)
    }
}

/// Picks the entry for exactly `path` out of `ls-tree -z` output.
///
/// Entries look like `<mode> SP <type> SP <id> TAB <path> NUL`. Trees and
/// unknown modes are not files and resolve to `None`.
fn parse_ls_tree(stdout: &[u8], path: &str) -> Option<TreeEntry> {
    stdout
        .split(|b| *b == 0)
        .filter_map(|record| std::str::from_utf8(record).ok())
        .find_map(|record| {
            let (meta, name) = record.split_once('\t')?;
            if name != path {
                return None;
            }
            let mut fields = meta.split(' ');
            let mode = FileMode::from_git_mode(fields.next()?)?;
            let _kind = fields.next()?;
            let id = ObjectId::new(fields.next()?);
            Some(TreeEntry { id, mode })
        })
}

/// Coarse diffs computed by `git diff` and memoized per [`DiffKey`].
#[derive(Debug)]
pub struct GitDiffSource {
    root: PathBuf,
    cache: Mutex<HashMap<DiffKey, Arc<DiffList>>>,
}

impl GitDiffSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn compute(&self, key: &DiffKey) -> Result<DiffList> {
        let old = key
            .old_id
            .as_ref()
            .map_or(EMPTY_TREE, ObjectId::as_str);

        let mut args = vec![
            "-c",
            "core.quotepath=false",
            "diff",
            "-U0",
            "--no-color",
            "--no-ext-diff",
            "--find-renames",
            "--src-prefix=a/",
            "--dst-prefix=b/",
        ];
        args.extend(whitespace_flag(key.whitespace));
        args.extend([old, key.new_id.as_str()]);

        let stdout = run_git(&self.root, &args)?;
        let mut list = parse_unified(&String::from_utf8_lossy(&stdout));
        list.insert(self.commit_message_entry(key)?);
        debug!(files = list.len(), old, new = %key.new_id, "computed coarse diff");
        Ok(list)
    }

    /// The commit-message pseudo-file: added when side A is the parent (or
    /// the empty tree), otherwise the line diff of both messages.
    fn commit_message_entry(&self, key: &DiffKey) -> Result<FileDiff> {
        let new_message = commit_message(&self.root, &key.new_id)?;
        let parent = first_parent(&self.root, &key.new_id)?;

        let base = key
            .old_id
            .as_ref()
            .filter(|old| Some(*old) != parent.as_ref());

        let (change_type, edits) = match base {
            None => {
                let lines = Text::new(new_message).len();
                (ChangeType::Added, vec![Edit::new(0, 0, 0, lines)])
            }
            Some(old) => {
                let old_message = commit_message(&self.root, old)?;
                let edits = diff_texts(&old_message, &new_message, key.whitespace)?;
                (ChangeType::Modified, edits)
            }
        };
        Ok(FileDiff {
            change_type,
            path: COMMIT_MSG.to_string(),
            old_path: None,
            header: Vec::new(),
            edits,
        })
    }
}

impl CoarseDiffCache for GitDiffSource {
    fn get(&self, key: &DiffKey) -> Result<Arc<DiffList>> {
        // Held across the computation so concurrent requests run `git diff` once.
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(list) = cache.get(key) {
            return Ok(Arc::clone(list));
        }
        let list = Arc::new(self.compute(key)?);
        cache.insert(key.clone(), Arc::clone(&list));
        Ok(list)
    }
}

fn whitespace_flag(whitespace: Whitespace) -> Option<&'static str> {
    match whitespace {
        Whitespace::IgnoreNone => None,
        Whitespace::IgnoreTrailing => Some("--ignore-space-at-eol"),
        Whitespace::IgnoreLeadingAndTrailing => Some("--ignore-space-change"),
        Whitespace::IgnoreAll => Some("--ignore-all-space"),
    }
}

/// Line edits between two texts that are not stored as blobs.
///
/// Runs `git diff --no-index` on scratch copies; exit code 1 only means the
/// texts differ.
fn diff_texts(old: &[u8], new: &[u8], whitespace: Whitespace) -> Result<Vec<Edit>> {
    let scratch = tempfile::tempdir()?;
    std::fs::write(scratch.path().join("a"), old)?;
    std::fs::write(scratch.path().join("b"), new)?;

    let mut args = vec!["diff", "--no-index", "-U0", "--no-color", "--no-ext-diff"];
    args.extend(whitespace_flag(whitespace));
    args.extend(["a", "b"]);

    let stdout = run_git_accepting(scratch.path(), &args, &[0, 1])?;
    Ok(String::from_utf8_lossy(&stdout)
        .lines()
        .filter_map(parse_hunk_header)
        .collect())
}

/// One `diff --git` section while it is being read.
#[derive(Default)]
struct Section {
    change_type: Option<ChangeType>,
    path: Option<String>,
    old_path: Option<String>,
    git_line_path: Option<String>,
    header: Vec<String>,
    edits: Vec<Edit>,
    in_hunks: bool,
}

impl Section {
    fn header_line(&mut self, line: &str) {
        self.header.push(line.to_string());

        if line.starts_with("new file mode") {
            self.change_type = Some(ChangeType::Added);
        } else if line.starts_with("deleted file mode") {
            self.change_type = Some(ChangeType::Deleted);
        } else if line.starts_with("dissimilarity index") {
            self.change_type.get_or_insert(ChangeType::Rewrite);
        } else if let Some(from) = line.strip_prefix("rename from ") {
            self.change_type = Some(ChangeType::Renamed);
            self.old_path = Some(from.to_string());
        } else if let Some(to) = line.strip_prefix("rename to ") {
            self.path = Some(to.to_string());
        } else if let Some(from) = line.strip_prefix("copy from ") {
            self.change_type = Some(ChangeType::Copied);
            self.old_path = Some(from.to_string());
        } else if let Some(to) = line.strip_prefix("copy to ") {
            self.path = Some(to.to_string());
        } else if let Some(new) = line.strip_prefix("+++ b/") {
            self.path.get_or_insert_with(|| trim_name(new));
        } else if let Some(old) = line.strip_prefix("--- a/") {
            if self.change_type == Some(ChangeType::Deleted) {
                self.path.get_or_insert_with(|| trim_name(old));
            }
        }
    }

    fn finish(self) -> Option<FileDiff> {
        let path = self.path.or(self.git_line_path)?;
        Some(FileDiff {
            change_type: self.change_type.unwrap_or(ChangeType::Modified),
            path,
            old_path: self.old_path,
            header: self.header,
            edits: self.edits,
        })
    }
}

/// Names with spaces get a trailing tab in `---`/`+++` lines.
fn trim_name(name: &str) -> String {
    name.trim_end_matches('\t').to_string()
}

/// The path of `diff --git a/P b/P` when both names are equal.
fn path_from_git_line(rest: &str) -> Option<String> {
    let len = rest.len().checked_sub(5)? / 2;
    let a = rest.get(2..2 + len)?;
    let b = rest.get(2 + len + 3..)?;
    (a == b && rest.starts_with("a/")).then(|| a.to_string())
}

/// Parses `-start[,count]` or `+start[,count]` into a half-open line range.
fn parse_range(spec: &str) -> Option<(usize, usize)> {
    let spec = &spec[1..];
    let (start, count) = match spec.split_once(',') {
        Some((start, count)) => (start.parse::<usize>().ok()?, count.parse::<usize>().ok()?),
        None => (spec.parse::<usize>().ok()?, 1),
    };
    // An empty range sits after line `start`; a non-empty one starts on it.
    let begin = if count == 0 { start } else { start.checked_sub(1)? };
    Some((begin, begin + count))
}

/// Parses one `@@ -a,b +c,d @@` line into an edit.
fn parse_hunk_header(line: &str) -> Option<Edit> {
    let mut fields = line.strip_prefix("@@ ")?.split(' ');
    let old = fields.next().filter(|f| f.starts_with('-'))?;
    let new = fields.next().filter(|f| f.starts_with('+'))?;
    let (begin_a, end_a) = parse_range(old)?;
    let (begin_b, end_b) = parse_range(new)?;
    Some(Edit::new(begin_a, end_a, begin_b, end_b))
}

/// Parses `git diff -U0` output into per-file coarse diffs.
pub fn parse_unified(output: &str) -> DiffList {
    let mut list = DiffList::default();
    let mut current: Option<Section> = None;

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("diff --git ") {
            if let Some(file) = current.take().and_then(Section::finish) {
                list.insert(file);
            }
            current = Some(Section {
                git_line_path: path_from_git_line(rest),
                header: vec![line.to_string()],
                ..Section::default()
            });
            continue;
        }

        let Some(section) = current.as_mut() else {
            continue;
        };
        if line.starts_with("@@ ") {
            section.in_hunks = true;
            match parse_hunk_header(line) {
                Some(edit) => section.edits.push(edit),
                None => debug!(line, "skipping malformed hunk header"),
            }
        } else if !section.in_hunks {
            section.header_line(line);
        }
    }

    if let Some(file) = current.and_then(Section::finish) {
        list.insert(file);
    }
    list
}
