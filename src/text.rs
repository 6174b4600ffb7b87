//! Line-addressable file content.
//!
//! [`Text`] holds one revision's raw bytes and an index of where each line
//! starts, so any line can be fetched without splitting the whole file up
//! front. [`SparseFileContent`] is the output side of the same idea: it only
//! holds the lines actually sent to the client, keyed by their original index.

use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Raw content of one side, indexed by line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    content: Vec<u8>,
    /// Byte offset of the start of each line.
    starts: Vec<usize>,
}

impl Text {
    /// Indexes `content` by line. A trailing line without `\n` still counts.
    #[must_use]
    pub fn new(content: Vec<u8>) -> Self {
        let mut starts = Vec::with_capacity(content.len() / 32 + 1);
        if !content.is_empty() {
            starts.push(0);
            starts.extend(
                content
                    .iter()
                    .enumerate()
                    .filter(|&(i, b)| *b == b'\n' && i + 1 < content.len())
                    .map(|(i, _)| i + 1),
            );
        }
        Self { content, starts }
    }

    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Number of lines.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.starts.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Whether the content is non-empty and its last byte is not `\n`.
    #[inline]
    #[must_use]
    pub fn missing_newline_at_end(&self) -> bool {
        self.content.last().is_some_and(|b| *b != b'\n')
    }

    /// Returns line `i` without its terminator, or `None` past the end.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; the viewer shows text.
    #[must_use]
    pub fn line(&self, i: usize) -> Option<Cow<'_, str>> {
        let start = *self.starts.get(i)?;
        let end = self.starts.get(i + 1).copied().unwrap_or(self.content.len());
        let raw = &self.content[start..end];
        let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
        Some(String::from_utf8_lossy(raw))
    }

    /// Like [`Text::line`] but yields an empty string past the end.
    #[inline]
    #[must_use]
    pub fn line_or_empty(&self, i: usize) -> String {
        self.line(i).map(Cow::into_owned).unwrap_or_default()
    }
}

/// The subset of one side's lines that is sent to the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SparseFileContent {
    pub path: Option<String>,

    /// Total line count of the side, including lines not sent.
    pub size: usize,

    pub missing_newline_at_end: bool,

    pub lines: BTreeMap<usize, String>,
}

impl SparseFileContent {
    #[must_use]
    pub fn new(path: Option<String>, size: usize, missing_newline_at_end: bool) -> Self {
        Self {
            path,
            size,
            missing_newline_at_end,
            lines: BTreeMap::new(),
        }
    }

    #[inline]
    pub fn add_line(&mut self, i: usize, line: String) {
        self.lines.insert(i, line);
    }

    #[inline]
    #[must_use]
    pub fn get(&self, i: usize) -> Option<&str> {
        self.lines.get(&i).map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, i: usize) -> bool {
        self.lines.contains_key(&i)
    }

    /// Whether every line of the side was sent.
    #[must_use]
    pub fn is_whole_file(&self) -> bool {
        self.lines.len() == self.size
    }
}
