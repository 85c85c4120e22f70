//! Finding a previously extracted chunk in text that may have shifted since,
//! and substituting new text for its target region.

use crate::blocks::{block_end_by_indentation, enclosing_block_start};
use crate::chunk::{ChunkOptions, CodeChunk};
use crate::diff::split_lines;
use crate::RelocationError;
use log::{debug, info, trace, warn};

/// The strategy that located a chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocationStrategy {
    /// The target region and its saved context were found verbatim.
    ExactContext,
    /// A line containing the signature was found with saved context nearby;
    /// the enclosing block (0-based, inclusive lines of the text as it was
    /// before the rewrite) was replaced.
    SignatureAnchor { block_start: usize, block_end: usize },
    /// The target region's text was found verbatim without its context.
    RawContent,
}

/// A successful relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub new_content: String,
    pub strategy: RelocationStrategy,
}

fn join_present(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n")
}

/// Whether either saved context of `chunk` shows up in `window`. An empty
/// side (a chunk at the top or bottom of its file) always counts as found.
fn context_near(chunk: &CodeChunk, window: &str) -> bool {
    window.contains(chunk.context_before.as_str()) || window.contains(chunk.context_after.as_str())
}

fn try_exact_context(content: &str, chunk: &CodeChunk, core: &str, fixed: &str) -> Option<String> {
    let pattern = join_present(&[&chunk.context_before, core, &chunk.context_after]);
    if pattern.is_empty() || !content.contains(&pattern) {
        return None;
    }
    let replacement = join_present(&[&chunk.context_before, fixed, &chunk.context_after]);
    Some(content.replacen(&pattern, &replacement, 1))
}

fn try_signature_anchor(
    content: &str,
    chunk: &CodeChunk,
    fixed: &str,
    context_lines: usize,
) -> Option<(String, usize, usize)> {
    if chunk.signature.is_empty() {
        return None;
    }
    let lines = split_lines(content);

    for (i, line) in lines.iter().enumerate() {
        if !line.contains(chunk.signature.as_str()) {
            continue;
        }
        let from = i.saturating_sub(context_lines);
        let to = i.saturating_add(context_lines).min(lines.len());
        let window = lines[from..to].join("\n");
        if !context_near(chunk, &window) {
            trace!("    Signature at line {} has no saved context nearby.", i + 1);
            continue;
        }

        let block_start = enclosing_block_start(&lines, i);
        let block_end = block_end_by_indentation(&lines, block_start);
        debug!(
            "    Signature anchored at line {} (block {}-{}, recorded at {}).",
            i + 1,
            block_start + 1,
            block_end + 1,
            chunk.target_start.saturating_add(1)
        );

        let mut rewritten: Vec<&str> = Vec::with_capacity(lines.len());
        rewritten.extend_from_slice(&lines[..block_start]);
        rewritten.extend(fixed.lines());
        rewritten.extend_from_slice(&lines[block_end + 1..]);
        let mut new_content = rewritten.join("\n");
        if content.ends_with('\n') && !new_content.is_empty() {
            new_content.push('\n');
        }
        return Some((new_content, block_start, block_end));
    }
    None
}

/// Locates `chunk` in `content` and replaces its target region with `fixed`.
///
/// The strategies are tried in order, stopping at the first that succeeds:
///
/// 1. **Exact context**: the target region surrounded by its saved context
///    is searched for verbatim, and its first occurrence is rewritten with
///    `fixed` between the unchanged contexts.
/// 2. **Signature anchor**: each line containing the chunk's signature is
///    checked for either saved context within the context window around it,
///    so the chunk may have moved since extraction. An empty context counts
///    as present. At the first confirmed line, the enclosing block (found
///    by scanning back to its header and forward by indentation) is
///    replaced with `fixed`.
/// 3. **Raw content**: the first verbatim occurrence of the target region
///    is replaced.
///
/// # Errors
///
/// Returns [`RelocationError::NotFound`] when no strategy locates the chunk.
/// The caller should skip this fix; `content` is never partially modified.
///
/// # Example
///
/// ```
/// # use linepatch::{extract_chunks, relocate_chunk, ChunkOptions, RelocationStrategy};
/// let source = "x = 1\n\ndef greet():\n    return 'hi'\n";
/// let options = ChunkOptions::builder().context_lines(2).build();
/// let chunk = &extract_chunks(source, &["greet"], "g.py", &options)[0];
///
/// let result = relocate_chunk(source, chunk, "def greet():\n    return 'hello'", &options)?;
/// assert_eq!(result.strategy, RelocationStrategy::ExactContext);
/// assert_eq!(result.new_content, "x = 1\n\ndef greet():\n    return 'hello'\n");
/// # Ok::<(), linepatch::RelocationError>(())
/// ```
pub fn relocate_chunk(
    content: &str,
    chunk: &CodeChunk,
    fixed: &str,
    options: &ChunkOptions,
) -> Result<Relocation, RelocationError> {
    let core = chunk.core_text();

    trace!("    Attempting exact context match for '{}'...", chunk.signature);
    if let Some(new_content) = try_exact_context(content, chunk, &core, fixed) {
        return Ok(Relocation {
            new_content,
            strategy: RelocationStrategy::ExactContext,
        });
    }

    trace!("    Attempting signature anchor for '{}'...", chunk.signature);
    if let Some((new_content, block_start, block_end)) =
        try_signature_anchor(content, chunk, fixed, options.context_lines)
    {
        return Ok(Relocation {
            new_content,
            strategy: RelocationStrategy::SignatureAnchor {
                block_start,
                block_end,
            },
        });
    }

    trace!("    Attempting raw content match for '{}'...", chunk.signature);
    if !core.is_empty() && content.contains(&core) {
        return Ok(Relocation {
            new_content: content.replacen(&core, fixed, 1),
            strategy: RelocationStrategy::RawContent,
        });
    }

    Err(RelocationError::NotFound {
        signature: chunk.signature.clone(),
    })
}

/// The outcome of one fix within [`apply_chunk_fixes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixStatus {
    Applied(RelocationStrategy),
    Failed(RelocationError),
}

/// Details about a fix that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixFailure {
    /// The 1-based position of the fix in the input list.
    pub fix_index: usize,
    pub reason: RelocationError,
}

/// Per-fix results, in the order the fixes were given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocationReport {
    pub fix_results: Vec<FixStatus>,
}

impl RelocationReport {
    /// Checks whether every fix was applied.
    pub fn all_applied(&self) -> bool {
        self.fix_results
            .iter()
            .all(|r| matches!(r, FixStatus::Applied(_)))
    }

    /// Returns the fixes that could not be applied.
    pub fn failures(&self) -> Vec<FixFailure> {
        self.fix_results
            .iter()
            .enumerate()
            .filter_map(|(i, status)| match status {
                FixStatus::Failed(reason) => Some(FixFailure {
                    fix_index: i + 1,
                    reason: reason.clone(),
                }),
                FixStatus::Applied(_) => None,
            })
            .collect()
    }
}

/// The result of [`apply_chunk_fixes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixApplication {
    pub new_content: String,
    pub report: RelocationReport,
}

/// Applies several `(chunk, replacement)` fixes to one file's content.
///
/// Fixes are applied in descending `start_line` order, each as an
/// independent [`relocate_chunk`] on the text produced by the previous one,
/// so that a rewrite lower in the file never shifts a region still to be
/// visited. Fixes sharing a `start_line` keep their input order. A fix that
/// cannot be located is recorded as failed and skipped.
pub fn apply_chunk_fixes(
    content: &str,
    fixes: &[(CodeChunk, String)],
    options: &ChunkOptions,
) -> FixApplication {
    let mut order: Vec<usize> = (0..fixes.len()).collect();
    order.sort_by(|&a, &b| fixes[b].0.start_line.cmp(&fixes[a].0.start_line));

    let mut current = content.to_string();
    let mut statuses: Vec<Option<FixStatus>> = vec![None; fixes.len()];
    for i in order {
        let (chunk, fixed) = &fixes[i];
        let status = match relocate_chunk(&current, chunk, fixed, options) {
            Ok(relocation) => {
                info!(
                    "  Applied fix to {} (lines {}-{}) via {:?}",
                    chunk.signature,
                    chunk.start_line.saturating_add(1),
                    chunk.end_line.saturating_add(1),
                    relocation.strategy
                );
                current = relocation.new_content;
                FixStatus::Applied(relocation.strategy)
            }
            Err(error) => {
                warn!("  Failed to apply fix {}: {}", i + 1, error);
                FixStatus::Failed(error)
            }
        };
        statuses[i] = Some(status);
    }

    FixApplication {
        new_content: current,
        report: RelocationReport {
            fix_results: statuses.into_iter().flatten().collect(),
        },
    }
}
