//! Extracting keyword-relevant code chunks, with the surrounding context
//! needed to find them again after the file has drifted.

use crate::blocks::{find_blocks, Block, BlockKind, DefaultStructureParser, StructureParser};
use crate::diff::split_lines;
use log::{debug, info, trace};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// The default number of context lines around a chunk.
pub const DEFAULT_CONTEXT_LINES: usize = 10;

/// How many leading lines [`extract_imports`] looks at.
const IMPORT_SCAN_LINES: usize = 50;

/// Options for chunk extraction and relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkOptions {
    /// The context window size. Blocks closer than this are merged, chunks
    /// are expanded by this many lines on each side, and relocation looks
    /// this far around a signature match for the saved context.
    pub context_lines: usize,
    /// A class whose block is used when nothing else matched but a keyword
    /// mentions it (compared case-insensitively).
    pub pinned_class: Option<String>,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            context_lines: DEFAULT_CONTEXT_LINES,
            pinned_class: None,
        }
    }
}

impl ChunkOptions {
    /// Creates a new builder for `ChunkOptions`.
    ///
    /// # Example
    ///
    /// ```
    /// # use linepatch::ChunkOptions;
    /// let options = ChunkOptions::builder()
    ///     .context_lines(4)
    ///     .pinned_class("CommandParser")
    ///     .build();
    ///
    /// assert_eq!(options.context_lines, 4);
    /// assert_eq!(options.pinned_class.as_deref(), Some("CommandParser"));
    /// ```
    pub fn builder() -> ChunkOptionsBuilder {
        ChunkOptionsBuilder::default()
    }
}

/// A builder for creating `ChunkOptions`.
#[derive(Debug, Clone, Default)]
pub struct ChunkOptionsBuilder {
    context_lines: Option<usize>,
    pinned_class: Option<String>,
}

impl ChunkOptionsBuilder {
    /// Sets the context window size.
    pub fn context_lines(mut self, context_lines: usize) -> Self {
        self.context_lines = Some(context_lines);
        self
    }

    /// Sets the class to fall back on when no block matched.
    pub fn pinned_class(mut self, class_name: impl Into<String>) -> Self {
        self.pinned_class = Some(class_name.into());
        self
    }

    /// Builds the `ChunkOptions`.
    pub fn build(self) -> ChunkOptions {
        let default = ChunkOptions::default();
        ChunkOptions {
            context_lines: self.context_lines.unwrap_or(default.context_lines),
            pinned_class: self.pinned_class.or(default.pinned_class),
        }
    }
}

/// An extracted code region together with its anchors.
///
/// `start_line..=end_line` is the context-expanded region at extraction time
/// and `content` is its text. The region the keywords selected,
/// `target_start..=target_end`, lies inside it; `context_before` and
/// `context_after` hold the expansion on either side of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    /// The first non-blank line of the target region, trimmed.
    pub signature: String,
    pub file_path: String,
    pub context_before: String,
    pub context_after: String,
    pub target_start: usize,
    pub target_end: usize,
}

impl CodeChunk {
    /// The text of the target region alone, without its context.
    pub fn core_text(&self) -> String {
        let lines = split_lines(&self.content);
        let from = self.target_start.saturating_sub(self.start_line);
        let to = self
            .target_end
            .saturating_sub(self.start_line)
            .saturating_add(1)
            .min(lines.len());
        if from >= to {
            return String::new();
        }
        lines[from..to].join("\n")
    }
}

fn camel_boundary() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([a-z])([A-Z])").expect("valid camel-case regex"))
}

/// Broadens a keyword list into the lowercase terms used for matching.
///
/// Each keyword contributes its pieces split on non-alphanumeric characters,
/// its pieces split at camel-case boundaries, and itself. Empty keywords are
/// ignored.
///
/// # Example
///
/// ```
/// # use linepatch::expand_keywords;
/// let terms = expand_keywords(&["parseArgs"]);
/// let terms: Vec<&str> = terms.iter().map(String::as_str).collect();
/// assert_eq!(terms, vec!["args", "parse", "parseargs"]);
/// ```
pub fn expand_keywords<S: AsRef<str>>(keywords: &[S]) -> BTreeSet<String> {
    let mut expanded = BTreeSet::new();
    for keyword in keywords {
        let keyword = keyword.as_ref();
        if keyword.is_empty() {
            continue;
        }
        let separated = keyword.split(|c: char| !c.is_ascii_alphanumeric());
        let spaced = camel_boundary().replace_all(keyword, "$1 $2");
        let camel = spaced.split_whitespace();
        expanded.extend(
            separated
                .chain(camel)
                .filter(|part| !part.is_empty())
                .map(str::to_lowercase),
        );
        expanded.insert(keyword.to_lowercase());
    }
    expanded
}

fn block_text(lines: &[&str], start: usize, end: usize) -> String {
    if lines.is_empty() || start >= lines.len() {
        return String::new();
    }
    lines[start..=end.min(lines.len() - 1)].join("\n")
}

/// Merges ranges that overlap or sit within `distance` lines of the previous
/// one into a minimal, sorted set.
pub(crate) fn merge_ranges(mut ranges: Vec<(usize, usize)>, distance: usize) -> Vec<(usize, usize)> {
    if ranges.is_empty() {
        return vec![];
    }
    ranges.sort_unstable();
    let mut merged = Vec::with_capacity(ranges.len());
    let mut current_range = ranges[0];

    for &(start, end) in &ranges[1..] {
        if start <= current_range.1.saturating_add(distance) {
            current_range.1 = current_range.1.max(end);
        } else {
            merged.push(current_range);
            current_range = (start, end);
        }
    }
    merged.push(current_range);
    merged
}

/// Extracts the chunks of `content` relevant to `keywords`, using the
/// built-in structural parser.
///
/// See [`extract_chunks_with`].
///
/// # Example
///
/// ```
/// # use linepatch::{extract_chunks, ChunkOptions};
/// let source = "import os\n\ndef load(path):\n    return open(path).read()\n\ndef save(path, data):\n    open(path, 'w').write(data)\n";
/// let options = ChunkOptions::builder().context_lines(1).build();
///
/// let chunks = extract_chunks(source, &["save"], "io.py", &options);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].signature, "def save(path, data):");
/// assert_eq!(chunks[0].context_before, "");
/// assert_eq!(chunks[0].start_line, 4);
/// ```
pub fn extract_chunks<S: AsRef<str>>(
    content: &str,
    keywords: &[S],
    file_path: &str,
    options: &ChunkOptions,
) -> Vec<CodeChunk> {
    extract_chunks_with(&DefaultStructureParser, content, keywords, file_path, options)
}

/// Extracts the chunks of `content` relevant to `keywords`.
///
/// Candidate blocks come from [`find_blocks`]. A block is relevant when its
/// lowercased text contains any of the [`expand_keywords`] terms. When none
/// is, the search widens: first to the [`ChunkOptions::pinned_class`] block
/// if a keyword mentions it, then to up to two class blocks and one other
/// block regardless of keywords. Relevant blocks within the context window of
/// each other are merged, each merged range is expanded by the window on both
/// sides, and one [`CodeChunk`] is built per range.
///
/// Returns an empty list when the file has no blocks at all.
pub fn extract_chunks_with<P: StructureParser + ?Sized, S: AsRef<str>>(
    parser: &P,
    content: &str,
    keywords: &[S],
    file_path: &str,
    options: &ChunkOptions,
) -> Vec<CodeChunk> {
    let lines = split_lines(content);
    let terms = expand_keywords(keywords);
    trace!("  Expanded keywords for '{}': {:?}", file_path, terms);

    let blocks = find_blocks(parser, content);
    let mut selected: Vec<Block> = blocks
        .iter()
        .filter(|b| {
            let text = block_text(&lines, b.start_line, b.end_line).to_lowercase();
            terms.iter().any(|term| text.contains(term.as_str()))
        })
        .copied()
        .collect();

    if selected.is_empty() {
        if let Some(class_name) = &options.pinned_class {
            let lowered = class_name.to_lowercase();
            if terms.iter().any(|term| term.contains(&lowered)) {
                let header = format!("class {}", class_name);
                if let Some(block) = blocks
                    .iter()
                    .find(|b| block_text(&lines, b.start_line, b.end_line).contains(&header))
                {
                    debug!(
                        "  Using pinned class '{}' at lines {}-{}",
                        class_name,
                        block.start_line + 1,
                        block.end_line + 1
                    );
                    selected.push(*block);
                }
            }
        }
    }

    if selected.is_empty() {
        info!("  No keyword matches, trying broader search in {}", file_path);
        let (classes, others): (Vec<Block>, Vec<Block>) =
            blocks.iter().copied().partition(|b| b.kind == BlockKind::Class);
        selected.extend(classes.into_iter().take(2));
        selected.extend(others.into_iter().take(1));
    }

    if selected.is_empty() {
        info!("  No code blocks found in {}", file_path);
        return vec![];
    }

    let ranges = selected.iter().map(|b| (b.start_line, b.end_line)).collect();
    let merged = merge_ranges(ranges, options.context_lines);
    debug!(
        "  {} block(s) merged into {} chunk(s) for '{}'",
        selected.len(),
        merged.len(),
        file_path
    );

    merged
        .into_iter()
        .filter_map(|(target_start, target_end)| {
            build_chunk(&lines, target_start, target_end, file_path, options.context_lines)
        })
        .collect()
}

fn build_chunk(
    lines: &[&str],
    target_start: usize,
    target_end: usize,
    file_path: &str,
    context_lines: usize,
) -> Option<CodeChunk> {
    let last = lines.len().checked_sub(1)?;
    if target_start > last {
        return None;
    }
    let target_end = target_end.min(last);
    let start_line = target_start.saturating_sub(context_lines);
    let end_line = target_end.saturating_add(context_lines).min(last);

    let signature = lines[target_start..=target_end]
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string();

    let context_before = lines[start_line..target_start].join("\n");
    let context_after = if target_end < end_line {
        lines[target_end + 1..=end_line].join("\n")
    } else {
        String::new()
    };

    Some(CodeChunk {
        start_line,
        end_line,
        content: lines[start_line..=end_line].join("\n"),
        signature,
        file_path: file_path.to_string(),
        context_before,
        context_after,
        target_start,
        target_end,
    })
}

/// Returns the import statements among the first lines of `content`,
/// trimmed, in file order.
///
/// # Example
///
/// ```
/// # use linepatch::extract_imports;
/// let imports = extract_imports("import os\nfrom sys import argv\n\nx = 1\n");
/// assert_eq!(imports, vec!["import os", "from sys import argv"]);
/// ```
pub fn extract_imports(content: &str) -> Vec<String> {
    content
        .lines()
        .take(IMPORT_SCAN_LINES)
        .map(str::trim)
        .filter(|l| l.starts_with("import ") || l.starts_with("from "))
        .map(String::from)
        .collect()
}
