//! Line differencing: aligning two line sequences and turning the alignment
//! into [`Edit`]s, either plainly or with the edit-count optimizations.

use crate::edit::{Edit, EditKind, Patch};
use crate::validate::validate_patch;
use crate::FileMap;
use log::{debug, info, trace, warn};
use similar::{Algorithm, DiffTag, TextDiff};
use std::ops::Range;

/// The classification of an aligned segment between two line sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeTag {
    Equal,
    Replace,
    Delete,
    Insert,
}

/// One segment of a global alignment.
///
/// `old` and `new` are half-open index ranges into the original and edited
/// sequences. For [`OpcodeTag::Equal`] the two ranges cover identical lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opcode {
    pub tag: OpcodeTag,
    pub old: Range<usize>,
    pub new: Range<usize>,
}

/// Splits file content into lines, without tracking a trailing newline.
pub(crate) fn split_lines(content: &str) -> Vec<&str> {
    content.lines().collect()
}

/// Aligns two line sequences and returns the opcodes covering both of them.
///
/// The alignment is computed with Myers' algorithm, with adjacent
/// delete/insert runs folded into `Replace` segments. The result is
/// deterministic for identical inputs.
///
/// # Example
///
/// ```
/// # use linepatch::{opcodes, OpcodeTag};
/// let ops = opcodes(&["a", "b", "c"], &["a", "x", "c"]);
/// let tags: Vec<_> = ops.iter().map(|op| op.tag).collect();
/// assert_eq!(tags, vec![OpcodeTag::Equal, OpcodeTag::Replace, OpcodeTag::Equal]);
/// assert_eq!(ops[1].old, 1..2);
/// assert_eq!(ops[1].new, 1..2);
/// ```
pub fn opcodes(original: &[&str], edited: &[&str]) -> Vec<Opcode> {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Myers)
        .diff_slices(original, edited);
    diff.ops()
        .iter()
        .map(|op| {
            let tag = match op.tag() {
                DiffTag::Equal => OpcodeTag::Equal,
                DiffTag::Delete => OpcodeTag::Delete,
                DiffTag::Insert => OpcodeTag::Insert,
                DiffTag::Replace => OpcodeTag::Replace,
            };
            Opcode {
                tag,
                old: op.old_range(),
                new: op.new_range(),
            }
        })
        .collect()
}

/// Edits for the lines removed by a `Delete` opcode.
fn deletion_edits(file_name: &str, original: &[&str], old: Range<usize>) -> Vec<Edit> {
    old.map(|i| Edit::deletion(file_name, i, original[i])).collect()
}

/// Edits for the lines added by an `Insert` opcode, anchored at the original
/// position where the insertion point falls.
fn insertion_edits(file_name: &str, edited: &[&str], at: usize, new: Range<usize>) -> Vec<Edit> {
    let start = new.start;
    new.map(|j| Edit::insertion(file_name, at + (j - start), edited[j]))
        .collect()
}

/// Drops edits with no text on either side. Adding or removing a blank line
/// has no [`Edit`] representation, so such changes are left out of the patch.
fn drop_blank_edits(edits: &mut Vec<Edit>) {
    edits.retain(|e| {
        let blank = e.kind() == EditKind::Empty;
        if blank {
            trace!("    Dropping blank-line change at {}", e.line_number);
        }
        !blank
    });
}

/// Creates the edits for one file with the plain differencer.
///
/// `Replace` segments are walked pairwise up to the longer side. Where one
/// side runs out, the missing line is taken as empty, which yields a tail of
/// pure insertions or deletions. An edit is emitted only where the two lines
/// differ. Blank lines added or removed produce no edit.
///
/// # Example
///
/// ```
/// # use linepatch::{create_file_edits, Edit};
/// let edits = create_file_edits("f.txt", "a\nb\nc\n", "a\nx\nc\n");
/// assert_eq!(edits, vec![Edit::replacement("f.txt", 1, "b", "x")]);
/// ```
pub fn create_file_edits(file_name: &str, original_content: &str, edited_content: &str) -> Vec<Edit> {
    let original = split_lines(original_content);
    let edited = split_lines(edited_content);
    let mut edits = Vec::new();

    for op in opcodes(&original, &edited) {
        trace!("    {:?} old {:?} new {:?}", op.tag, op.old, op.new);
        match op.tag {
            OpcodeTag::Equal => {}
            OpcodeTag::Replace => {
                let span = op.old.len().max(op.new.len());
                for idx in 0..span {
                    let old_line = if idx < op.old.len() { original[op.old.start + idx] } else { "" };
                    let new_line = if idx < op.new.len() { edited[op.new.start + idx] } else { "" };
                    if old_line != new_line {
                        edits.push(Edit::replacement(
                            file_name,
                            op.old.start + idx,
                            old_line,
                            new_line,
                        ));
                    }
                }
            }
            OpcodeTag::Delete => edits.extend(deletion_edits(file_name, &original, op.old)),
            OpcodeTag::Insert => {
                edits.extend(insertion_edits(file_name, &edited, op.old.start, op.new))
            }
        }
    }
    drop_blank_edits(&mut edits);
    edits
}

/// Creates the edits for one file with the edit-count optimizations.
///
/// Equal-length `Replace` segments become line-by-line substitutions where
/// the lines differ. Unequal-length ones are decomposed into a deletion for
/// every original line followed by an insertion for every edited line, both
/// numbered from the segment's original start. The two halves may therefore
/// share a `line_number`: "at this position, these lines were replaced by
/// those lines". The validator reports such pairs as conflicts. As with
/// [`create_file_edits`], blank lines added or removed produce no edit.
///
/// # Example
///
/// ```
/// # use linepatch::{create_optimized_file_edits, Edit};
/// let edits = create_optimized_file_edits("f.txt", "a\nb\nz\n", "a\nx\ny\nz\n");
/// assert_eq!(
///     edits,
///     vec![
///         Edit::deletion("f.txt", 1, "b"),
///         Edit::insertion("f.txt", 1, "x"),
///         Edit::insertion("f.txt", 2, "y"),
///     ]
/// );
/// ```
pub fn create_optimized_file_edits(
    file_name: &str,
    original_content: &str,
    edited_content: &str,
) -> Vec<Edit> {
    let original = split_lines(original_content);
    let edited = split_lines(edited_content);
    let mut edits = Vec::new();

    for op in opcodes(&original, &edited) {
        trace!("    {:?} old {:?} new {:?}", op.tag, op.old, op.new);
        match op.tag {
            OpcodeTag::Equal => {}
            OpcodeTag::Replace if op.old.len() == op.new.len() => {
                for (idx, (old_line, new_line)) in original[op.old.clone()]
                    .iter()
                    .zip(&edited[op.new.clone()])
                    .enumerate()
                {
                    if old_line != new_line {
                        edits.push(Edit::replacement(
                            file_name,
                            op.old.start + idx,
                            *old_line,
                            *new_line,
                        ));
                    }
                }
            }
            OpcodeTag::Replace => {
                let start = op.old.start;
                edits.extend(deletion_edits(file_name, &original, op.old));
                edits.extend(
                    edited[op.new]
                        .iter()
                        .enumerate()
                        .map(|(idx, line)| Edit::insertion(file_name, start + idx, *line)),
                );
            }
            OpcodeTag::Delete => edits.extend(deletion_edits(file_name, &original, op.old)),
            OpcodeTag::Insert => {
                edits.extend(insertion_edits(file_name, &edited, op.old.start, op.new))
            }
        }
    }
    drop_blank_edits(&mut edits);
    edits
}

/// Builds the optimized patch across all files.
///
/// Files whose content is unchanged are skipped. Files present only in
/// `edited_files` are skipped as well; creating new files is left to
/// [`create_fallback_patch`]. Files missing from `edited_files` are not
/// treated as deletions.
pub fn create_optimized_patch(original_files: &FileMap, edited_files: &FileMap) -> Patch {
    let mut patch = Patch::default();
    for (file_name, edited_content) in edited_files {
        let Some(original_content) = original_files.get(file_name) else {
            trace!("  Skipping new file '{}' in optimized pass.", file_name);
            continue;
        };
        if original_content == edited_content {
            continue;
        }
        let file_edits = create_optimized_file_edits(file_name, original_content, edited_content);
        debug!("  {} optimized edit(s) for '{}'", file_edits.len(), file_name);
        patch.extend(file_edits);
    }
    patch
}

/// Builds the patch with the plain differencer.
///
/// Unlike [`create_optimized_patch`], a file present only in `edited_files`
/// is treated as newly created: every non-blank line becomes an insertion
/// at its own index.
pub fn create_fallback_patch(original_files: &FileMap, edited_files: &FileMap) -> Patch {
    let mut patch = Patch::default();
    for (file_name, edited_content) in edited_files {
        match original_files.get(file_name) {
            None => {
                debug!("  New file '{}'", file_name);
                patch.extend(
                    split_lines(edited_content)
                        .into_iter()
                        .enumerate()
                        .filter(|(_, line)| !line.is_empty())
                        .map(|(i, line)| Edit::insertion(file_name.as_str(), i, line)),
                );
            }
            Some(original_content) if original_content == edited_content => {}
            Some(original_content) => {
                let file_edits = create_file_edits(file_name, original_content, edited_content);
                debug!("  {} edit(s) for '{}'", file_edits.len(), file_name);
                patch.extend(file_edits);
            }
        }
    }
    patch
}

/// Creates a patch that turns `original_files` into `edited_files`.
///
/// The optimized patch is produced first and checked with
/// [`validate_patch`]. If the validator rejects it, the issues are logged and
/// the plain fallback patch is returned instead. An empty `edited_files` map
/// produces an empty patch.
///
/// # Example
///
/// ```
/// # use linepatch::{create_patch, Edit, FileMap};
/// let original = FileMap::from([("f.txt".to_string(), "a\nb\n".to_string())]);
/// let edited = FileMap::from([("f.txt".to_string(), "a\n".to_string())]);
///
/// let patch = create_patch(&original, &edited);
/// assert_eq!(patch.edits, vec![Edit::deletion("f.txt", 1, "b")]);
/// ```
pub fn create_patch(original_files: &FileMap, edited_files: &FileMap) -> Patch {
    if edited_files.is_empty() {
        return Patch::default();
    }

    let optimized = create_optimized_patch(original_files, edited_files);
    let report = validate_patch(&optimized, original_files);
    if report.is_valid() {
        info!(
            "Created optimized patch with {} edit(s) across {} file(s).",
            optimized.len(),
            optimized.files().len()
        );
        return optimized;
    }

    for issue in &report.issues {
        warn!("  Patch validation issue: {}", issue);
    }
    let fallback = create_fallback_patch(original_files, edited_files);
    info!(
        "Falling back to plain patch with {} edit(s).",
        fallback.len()
    );
    fallback
}
