//! Reconstructing post-patch file content in memory.

use crate::diff::split_lines;
use crate::edit::{Edit, Patch};
use crate::FileMap;
use log::{debug, trace};
use std::collections::BTreeMap;

/// Computes what every file would look like after applying `patch`.
///
/// Neither input is modified and nothing touches the filesystem.
///
/// - A file absent from `original_files` is built from its edits sorted by
///   ascending `line_number`, one output line per non-empty
///   `new_line_content`.
/// - An existing file starts from its original lines and takes its edits in
///   descending `line_number` order, so that removing a line never shifts an
///   index still to be visited. An in-range edit deletes its line when
///   `new_line_content` is empty and overwrites it otherwise. An edit at or
///   past the current end appends `new_line_content`.
/// - Files no edit refers to are passed through unchanged.
///
/// Lines are joined with `\n`. An existing file keeps its trailing newline if
/// it had one.
///
/// In-range insertions overwrite rather than insert. The preview is exact for
/// substitutions, deletions and a single line appended at the end, and only
/// approximate when more lines are added.
///
/// # Example
///
/// ```
/// # use linepatch::{preview_patch, Edit, FileMap, Patch};
/// let original = FileMap::from([("f.txt".to_string(), "a\nb\nc\n".to_string())]);
/// let patch = Patch::new(vec![
///     Edit::replacement("f.txt", 1, "b", "x"),
///     Edit::insertion("f.txt", 3, "d"),
/// ]);
///
/// let preview = preview_patch(&original, &patch);
/// assert_eq!(preview["f.txt"], "a\nx\nc\nd\n");
/// // The input map is left as it was.
/// assert_eq!(original["f.txt"], "a\nb\nc\n");
/// ```
pub fn preview_patch(original_files: &FileMap, patch: &Patch) -> FileMap {
    if patch.is_empty() {
        return original_files.clone();
    }

    let mut by_file: BTreeMap<&str, Vec<&Edit>> = BTreeMap::new();
    for edit in &patch.edits {
        by_file.entry(edit.file_name.as_str()).or_default().push(edit);
    }

    let mut result = FileMap::new();
    for (file_name, mut edits) in by_file {
        let content = match original_files.get(file_name) {
            None => {
                debug!("  Previewing new file '{}'", file_name);
                edits.sort_by_key(|e| e.line_number);
                edits
                    .iter()
                    .filter(|e| !e.new_line_content.is_empty())
                    .map(|e| e.new_line_content.as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Some(original) => {
                debug!("  Previewing '{}' with {} edit(s)", file_name, edits.len());
                apply_edits_to_content(original, &mut edits)
            }
        };
        result.insert(file_name.to_string(), content);
    }

    for (file_name, content) in original_files {
        result
            .entry(file_name.clone())
            .or_insert_with(|| content.clone());
    }
    result
}

fn apply_edits_to_content(original: &str, edits: &mut [&Edit]) -> String {
    let mut lines: Vec<String> = split_lines(original).into_iter().map(String::from).collect();

    // Stable sort: edits sharing a line keep their patch order.
    edits.sort_by(|a, b| b.line_number.cmp(&a.line_number));
    for edit in edits.iter() {
        let line_number = edit.line_number;
        if line_number < lines.len() {
            if edit.new_line_content.is_empty() {
                trace!("    delete line {}", line_number);
                lines.remove(line_number);
            } else {
                trace!("    replace line {}", line_number);
                lines[line_number] = edit.new_line_content.clone();
            }
        } else {
            trace!("    append at end (requested line {})", line_number);
            lines.push(edit.new_line_content.clone());
        }
    }

    let mut content = lines.join("\n");
    if original.ends_with('\n') && !content.is_empty() {
        content.push('\n');
    }
    content
}
