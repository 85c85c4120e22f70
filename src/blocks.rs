//! Locating function- and class-like blocks in source text.
//!
//! Blocks come from a [`StructureParser`] when one is available and the
//! content parses cleanly. Otherwise a line scan for declaration headers is
//! used, with block ends tightened by indentation.

use log::{debug, trace};
use regex::Regex;
use std::sync::OnceLock;

/// What kind of declaration a block starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Function,
    Class,
    /// A header the scanner recognizes but cannot classify (e.g. `const`).
    Unknown,
}

/// A declaration's line range, 0-based and inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Block {
    pub kind: BlockKind,
    pub start_line: usize,
    pub end_line: usize,
}

/// A source of structural block information.
///
/// Implementations return `None` when they cannot handle the content (no
/// grammar, or the content does not parse). Callers then fall back to
/// [`header_blocks`].
pub trait StructureParser {
    /// Returns every function-like and class-like declaration, nested ones
    /// included, sorted by start line.
    fn parse_blocks(&self, content: &str) -> Option<Vec<Block>>;
}

/// The built-in parser.
///
/// With the `structural` feature it parses Python with tree-sitter; a tree
/// containing syntax errors counts as a parse failure. Without the feature
/// it never succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStructureParser;

impl StructureParser for DefaultStructureParser {
    #[cfg(feature = "structural")]
    fn parse_blocks(&self, content: &str) -> Option<Vec<Block>> {
        let mut parser = tree_sitter::Parser::new();
        let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
        parser.set_language(&language).ok()?;
        let tree = parser.parse(content, None)?;
        let root = tree.root_node();
        if root.has_error() {
            debug!("    Structural parse reported syntax errors.");
            return None;
        }

        let mut blocks = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            let kind = match node.kind() {
                "function_definition" => Some(BlockKind::Function),
                "class_definition" => Some(BlockKind::Class),
                _ => None,
            };
            if let Some(kind) = kind {
                let start_line = node.start_position().row;
                let end = code_end(node);
                // An end at column 0 belongs to the previous row.
                let end_line = if end.column == 0 && end.row > start_line {
                    end.row - 1
                } else {
                    end.row
                };
                blocks.push(Block {
                    kind,
                    start_line,
                    end_line,
                });
            }
            let mut cursor = node.walk();
            stack.extend(node.children(&mut cursor));
        }

        blocks.sort_by_key(|b| (b.start_line, b.end_line));
        Some(blocks)
    }

    #[cfg(not(feature = "structural"))]
    fn parse_blocks(&self, _content: &str) -> Option<Vec<Block>> {
        None
    }
}

/// The end of the last non-comment token under `node`. Comments trailing a
/// body belong to whatever follows it.
#[cfg(feature = "structural")]
fn code_end(node: tree_sitter::Node) -> tree_sitter::Point {
    let mut end = node.start_position();
    let mut stack = vec![node];
    while let Some(current) = stack.pop() {
        if current.kind() == "comment" {
            continue;
        }
        if current.child_count() == 0 {
            let candidate = current.end_position();
            if (candidate.row, candidate.column) > (end.row, end.column) {
                end = candidate;
            }
            continue;
        }
        let mut cursor = current.walk();
        stack.extend(current.children(&mut cursor));
    }
    end
}

fn declaration_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\s*)(def |class |function |const |let |var )").expect("valid header regex")
    })
}

fn block_start_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*)(def |class |function )").expect("valid header regex"))
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Finds the last line of the block whose header is at `start_line`.
///
/// Scans forward while lines are indented deeper than the header. Blank
/// lines count as inside the block. Returns `start_line` itself when it is
/// out of range or nothing follows it.
///
/// # Example
///
/// ```
/// # use linepatch::block_end_by_indentation;
/// let lines = ["def f():", "    a = 1", "", "    return a", "x = f()"];
/// assert_eq!(block_end_by_indentation(&lines, 0), 3);
/// ```
pub fn block_end_by_indentation<T: AsRef<str>>(lines: &[T], start_line: usize) -> usize {
    let Some(header) = lines.get(start_line) else {
        return start_line;
    };
    let header_indent = indentation(header.as_ref());
    let mut last_line = start_line;

    for (i, line) in lines.iter().enumerate().skip(start_line + 1) {
        let line = line.as_ref();
        if line.trim_start().is_empty() {
            last_line = i;
            continue;
        }
        if indentation(line) > header_indent {
            last_line = i;
        } else {
            break;
        }
    }
    last_line
}

/// Finds blocks by scanning for declaration header lines.
///
/// Each header starts a block that runs until just before the next header,
/// then is tightened with [`block_end_by_indentation`].
pub fn header_blocks<T: AsRef<str>>(lines: &[T]) -> Vec<Block> {
    let header = declaration_header();
    let mut starts: Vec<(usize, BlockKind)> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        if let Some(caps) = header.captures(line.as_ref()) {
            let kind = match &caps[2] {
                "class " => BlockKind::Class,
                "def " | "function " => BlockKind::Function,
                _ => BlockKind::Unknown,
            };
            starts.push((i, kind));
        }
    }

    let mut blocks = Vec::with_capacity(starts.len());
    for (n, &(start_line, kind)) in starts.iter().enumerate() {
        let scan_end = starts
            .get(n + 1)
            .map_or(lines.len().saturating_sub(1), |&(next, _)| next - 1);
        let end_line = block_end_by_indentation(lines, start_line).min(scan_end);
        trace!("    Header block {:?} at {}..={}", kind, start_line, end_line);
        blocks.push(Block {
            kind,
            start_line,
            end_line,
        });
    }
    blocks
}

/// Returns the candidate blocks of `content`, preferring `parser` and
/// falling back to [`header_blocks`].
pub fn find_blocks<P: StructureParser + ?Sized>(parser: &P, content: &str) -> Vec<Block> {
    match parser.parse_blocks(content) {
        Some(blocks) => {
            debug!("    Structural parse found {} block(s).", blocks.len());
            blocks
        }
        None => {
            let lines: Vec<&str> = content.lines().collect();
            let blocks = header_blocks(&lines);
            debug!("    Header scan found {} block(s).", blocks.len());
            blocks
        }
    }
}

/// Finds the header of the block enclosing `line`, scanning backwards for
/// the nearest `def`/`class`/`function` header. Returns `line` when there is
/// none.
pub fn enclosing_block_start<T: AsRef<str>>(lines: &[T], line: usize) -> usize {
    if lines.is_empty() {
        return line;
    }
    let header = block_start_header();
    (0..=line.min(lines.len() - 1))
        .rev()
        .find(|&i| header.is_match(lines[i].as_ref()))
        .unwrap_or(line)
}
