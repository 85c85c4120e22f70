//! The edit model: single line changes, ordered collections of them, and
//! the statistics derived from a collection.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single line-granularity change to one file.
///
/// `line_number` is a 0-based index into the *original* file's lines. For a
/// pure insertion it is the position immediately before which the new line
/// should appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    /// The identifier of the file, usually a relative path.
    pub file_name: String,
    /// The 0-based line index in the original file.
    pub line_number: usize,
    /// The original line's text, or empty for a pure insertion.
    pub line_content: String,
    /// The replacement text, or empty for a pure deletion.
    pub new_line_content: String,
}

/// How an [`Edit`] changes its line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// A new line is introduced (`line_content` is empty).
    Added,
    /// An existing line is removed (`new_line_content` is empty).
    Deleted,
    /// An existing line is rewritten.
    Modified,
    /// Both sides are empty. Such an edit carries no change and is never
    /// produced by this crate.
    Empty,
}

impl Edit {
    /// Creates an edit that inserts `new_line` before `line_number`.
    pub fn insertion(
        file_name: impl Into<String>,
        line_number: usize,
        new_line: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            line_number,
            line_content: String::new(),
            new_line_content: new_line.into(),
        }
    }

    /// Creates an edit that deletes `old_line` at `line_number`.
    pub fn deletion(
        file_name: impl Into<String>,
        line_number: usize,
        old_line: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            line_number,
            line_content: old_line.into(),
            new_line_content: String::new(),
        }
    }

    /// Creates an edit from an old/new pair. Either side may be empty.
    pub fn replacement(
        file_name: impl Into<String>,
        line_number: usize,
        old_line: impl Into<String>,
        new_line: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            line_number,
            line_content: old_line.into(),
            new_line_content: new_line.into(),
        }
    }

    /// Classifies the edit.
    ///
    /// # Example
    ///
    /// ```
    /// # use linepatch::{Edit, EditKind};
    /// assert_eq!(Edit::insertion("a.py", 3, "x = 1").kind(), EditKind::Added);
    /// assert_eq!(Edit::deletion("a.py", 3, "x = 1").kind(), EditKind::Deleted);
    /// assert_eq!(Edit::replacement("a.py", 3, "x = 1", "x = 2").kind(), EditKind::Modified);
    /// ```
    pub fn kind(&self) -> EditKind {
        match (self.line_content.is_empty(), self.new_line_content.is_empty()) {
            (true, false) => EditKind::Added,
            (false, true) => EditKind::Deleted,
            (false, false) => EditKind::Modified,
            (true, true) => EditKind::Empty,
        }
    }
}

/// An ordered sequence of [`Edit`]s, possibly spanning several files.
///
/// The order is not significant for application but is kept stable so that
/// output and tests are reproducible. A well-formed patch has no two edits
/// sharing `(file_name, line_number)`; this is not enforced here, see
/// [`validate_patch`](crate::validate_patch).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
    pub edits: Vec<Edit>,
}

impl Patch {
    pub fn new(edits: Vec<Edit>) -> Self {
        Self { edits }
    }

    /// Returns `true` when the patch carries no edits at all.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// The distinct file names touched by this patch, sorted.
    pub fn files(&self) -> BTreeSet<&str> {
        self.edits.iter().map(|e| e.file_name.as_str()).collect()
    }

    /// The edits for one file, in patch order.
    pub fn edits_for<'a>(&'a self, file_name: &'a str) -> impl Iterator<Item = &'a Edit> + 'a {
        self.edits.iter().filter(move |e| e.file_name == file_name)
    }

    /// Summarizes the patch.
    ///
    /// # Example
    ///
    /// ```
    /// # use linepatch::{Edit, Patch};
    /// let patch = Patch::new(vec![
    ///     Edit::insertion("a.txt", 0, "new"),
    ///     Edit::deletion("a.txt", 1, "gone"),
    ///     Edit::replacement("b.txt", 2, "old", "changed"),
    /// ]);
    /// let stats = patch.statistics();
    /// assert_eq!(stats.total_edits, 3);
    /// assert_eq!(stats.files_modified, 2);
    /// assert_eq!((stats.lines_added, stats.lines_deleted, stats.lines_modified), (1, 1, 1));
    /// ```
    pub fn statistics(&self) -> PatchStatistics {
        let mut stats = PatchStatistics {
            total_edits: self.edits.len(),
            files_modified: self.files().len(),
            ..PatchStatistics::default()
        };
        for edit in &self.edits {
            match edit.kind() {
                EditKind::Added => stats.lines_added += 1,
                EditKind::Deleted => stats.lines_deleted += 1,
                EditKind::Modified => stats.lines_modified += 1,
                EditKind::Empty => {}
            }
        }
        stats
    }
}

impl FromIterator<Edit> for Patch {
    fn from_iter<I: IntoIterator<Item = Edit>>(iter: I) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

impl Extend<Edit> for Patch {
    fn extend<I: IntoIterator<Item = Edit>>(&mut self, iter: I) {
        self.edits.extend(iter);
    }
}

/// Counts derived from a [`Patch`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchStatistics {
    pub total_edits: usize,
    pub files_modified: usize,
    pub lines_added: usize,
    pub lines_deleted: usize,
    pub lines_modified: usize,
}
