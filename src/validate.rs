//! Structural checks of a [`Patch`] against the original files.

use crate::diff::split_lines;
use crate::edit::Patch;
use crate::{FileMap, ValidationIssue};
use log::{debug, trace};
use std::collections::HashMap;

/// The outcome of [`validate_patch`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Every problem found, in the order they were detected.
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// A patch is valid exactly when no issue was found.
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// The `(file_name, line_number)` keys targeted by more than one edit, in
    /// the order they first appear in the patch. Empty when there are none.
    pub fn conflicts(&self) -> &[(String, usize)] {
        self.issues
            .iter()
            .find_map(|issue| match issue {
                ValidationIssue::ConflictingEdits(keys) => Some(keys.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// The human-readable messages, one per issue.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

/// Checks that `patch` can be applied to `original_files`.
///
/// The checks do not stop at the first problem:
/// - a patch with no edits is rejected outright;
/// - a file referenced by an edit but absent from `original_files` is
///   reported once, and its edits are not bounds-checked;
/// - an edit whose `line_number` is at or past the end of its file is
///   reported when it claims an original line (`line_content` non-empty).
///   Pure insertions there are fine;
/// - every `(file_name, line_number)` key shared by several edits is
///   reported, all together in a single conflict issue.
///
/// # Example
///
/// ```
/// # use linepatch::{validate_patch, Edit, FileMap, Patch, ValidationIssue};
/// let original = FileMap::from([("f.txt".to_string(), "a\nb\n".to_string())]);
/// let patch = Patch::new(vec![
///     Edit::insertion("f.txt", 2, "c"),
///     Edit::deletion("f.txt", 5, "ghost"),
/// ]);
///
/// let report = validate_patch(&patch, &original);
/// assert!(!report.is_valid());
/// assert_eq!(
///     report.issues,
///     vec![ValidationIssue::LineOutOfBounds { file: "f.txt".to_string(), line_number: 5 }]
/// );
/// ```
pub fn validate_patch(patch: &Patch, original_files: &FileMap) -> ValidationReport {
    let mut issues = Vec::new();

    if patch.is_empty() {
        issues.push(ValidationIssue::EmptyPatch);
        return ValidationReport { issues };
    }

    // Group edits by file, keeping first-seen order.
    let mut file_order: Vec<&str> = Vec::new();
    let mut by_file: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, edit) in patch.edits.iter().enumerate() {
        by_file
            .entry(edit.file_name.as_str())
            .or_insert_with(|| {
                file_order.push(edit.file_name.as_str());
                Vec::new()
            })
            .push(i);
    }

    for file_name in file_order {
        let Some(content) = original_files.get(file_name) else {
            debug!("  Validation: '{}' not in original files.", file_name);
            issues.push(ValidationIssue::FileNotFound(file_name.to_string()));
            continue;
        };
        let line_count = split_lines(content).len();
        trace!("  Validation: '{}' has {} line(s).", file_name, line_count);

        for &i in &by_file[file_name] {
            let edit = &patch.edits[i];
            if edit.line_number >= line_count && !edit.line_content.is_empty() {
                issues.push(ValidationIssue::LineOutOfBounds {
                    file: file_name.to_string(),
                    line_number: edit.line_number,
                });
            }
        }
    }

    let mut key_order: Vec<(&str, usize)> = Vec::new();
    let mut counts: HashMap<(&str, usize), usize> = HashMap::new();
    for edit in &patch.edits {
        let key = (edit.file_name.as_str(), edit.line_number);
        let count = counts.entry(key).or_insert_with(|| {
            key_order.push(key);
            0
        });
        *count += 1;
    }
    let conflicting: Vec<(String, usize)> = key_order
        .into_iter()
        .filter(|key| counts[key] > 1)
        .map(|(file, line)| (file.to_string(), line))
        .collect();
    if !conflicting.is_empty() {
        debug!("  Validation: {} conflicting key(s).", conflicting.len());
        issues.push(ValidationIssue::ConflictingEdits(conflicting));
    }

    ValidationReport { issues }
}
