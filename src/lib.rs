//! A line-level patch engine with drift-tolerant chunk relocation.
//!
//! `linepatch` turns pairs of whole-file contents (original and edited) into a
//! minimal, ordered list of line edits, checks those edits against the
//! original files, and reconstructs file content from them. Separately, it
//! extracts keyword-relevant code chunks from a file and later puts new text
//! in place of a chunk even when the file has shifted since it was read, by
//! searching for the chunk's saved context and signature instead of trusting
//! line numbers.
//!
//! Everything here is a pure, synchronous transformation over in-memory
//! strings. Nothing reads or writes files; the `linepatch` binary does that.
//!
//! ## Getting Started
//!
//! ```rust
//! use linepatch::{create_patch, preview_patch, validate_patch, Edit, FileMap};
//!
//! let original = FileMap::from([("app.py".to_string(), "a\nb\nc\n".to_string())]);
//! let edited = FileMap::from([("app.py".to_string(), "a\nx\nc\n".to_string())]);
//!
//! // 1. Diff the two states into a patch.
//! let patch = create_patch(&original, &edited);
//! assert_eq!(patch.edits, vec![Edit::replacement("app.py", 1, "b", "x")]);
//!
//! // 2. The patch is structurally sound.
//! assert!(validate_patch(&patch, &original).is_valid());
//!
//! // 3. Preview the result without touching anything.
//! let preview = preview_patch(&original, &patch);
//! assert_eq!(preview["app.py"], edited["app.py"]);
//! ```
//!
//! ## Key Concepts
//!
//! ### Edits and Patches
//!
//! An [`Edit`] changes one line of one file. Its `line_number` always refers to
//! the *original* file. A [`Patch`] is an ordered list of edits. Two edits in a
//! well-formed patch never share `(file_name, line_number)`; the
//! [validator](validate_patch) reports those that do.
//!
//! ### Producing a Patch
//!
//! [`create_patch`] aligns each file's lines with [`opcodes`] and emits edits
//! for the non-equal segments, preferring the optimized decomposition
//! ([`create_optimized_patch`]) and falling back to the plain one
//! ([`create_fallback_patch`]) when the validator rejects it.
//!
//! ### Chunks and Relocation
//!
//! [`extract_chunks`] picks the function- and class-like blocks mentioning a
//! set of keywords and wraps each in a [`CodeChunk`] carrying its signature and
//! surrounding context. [`relocate_chunk`] uses those anchors to find the chunk
//! again in the current text and substitute new text for it:
//!
//! ```rust
//! use linepatch::{extract_chunks, relocate_chunk, ChunkOptions};
//!
//! let source = "import os\n\ndef load(path):\n    return open(path).read()\n";
//! let options = ChunkOptions::builder().context_lines(2).build();
//! let chunk = &extract_chunks(source, &["load"], "io.py", &options)[0];
//!
//! // Three lines are added above the chunk after it was extracted.
//! let drifted = format!("# one\n# two\n# three\n{}", source);
//! let result = relocate_chunk(
//!     &drifted,
//!     chunk,
//!     "def load(path):\n    with open(path) as f:\n        return f.read()",
//!     &options,
//! )
//! .unwrap();
//! assert!(result.new_content.ends_with("        return f.read()\n"));
//! assert!(result.new_content.starts_with("# one\n# two\n# three\nimport os\n"));
//! ```
//!
//! ## Feature Flags
//!
//! ### `structural`
//!
//! - **Enabled by default.**
//! - Parses Python with [`tree-sitter`](https://crates.io/crates/tree-sitter) to
//!   find function and class blocks. Content that does not parse, and every file
//!   when the feature is off, falls back to a line scan for declaration headers.
use thiserror::Error;

mod blocks;
mod chunk;
mod diff;
mod edit;
mod fix;
mod preview;
mod relocate;
mod validate;

pub use blocks::{
    block_end_by_indentation, enclosing_block_start, find_blocks, header_blocks, Block, BlockKind,
    DefaultStructureParser, StructureParser,
};
pub use chunk::{
    expand_keywords, extract_chunks, extract_chunks_with, extract_imports, ChunkOptions,
    ChunkOptionsBuilder, CodeChunk, DEFAULT_CONTEXT_LINES,
};
pub use diff::{
    create_fallback_patch, create_file_edits, create_optimized_file_edits, create_optimized_patch,
    create_patch, opcodes, Opcode, OpcodeTag,
};
pub use edit::{Edit, EditKind, Patch, PatchStatistics};
pub use fix::{fix_files, validate_fix, ChunkFixer, FixSink};
pub use preview::preview_patch;
pub use relocate::{
    apply_chunk_fixes, relocate_chunk, FixApplication, FixFailure, FixStatus, Relocation,
    RelocationReport, RelocationStrategy,
};
pub use validate::{validate_patch, ValidationReport};

/// A set of files keyed by identifier (usually a relative path), each holding
/// the file's full text.
pub type FileMap = std::collections::BTreeMap<String, String>;

// --- Error Types ---

/// A problem the validator found in a [`Patch`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The patch has no edits at all.
    #[error("Patch contains no edits")]
    EmptyPatch,
    /// An edit refers to a file that is not among the original files.
    #[error("File {0} not found in original files")]
    FileNotFound(String),
    /// An edit claims an original line at or past the end of its file.
    #[error("Line number {line_number} exceeds file length in {file}")]
    LineOutOfBounds { file: String, line_number: usize },
    /// Several edits target the same `(file_name, line_number)` keys.
    #[error("Multiple edits on same lines: {}", format_keys(.0))]
    ConflictingEdits(Vec<(String, usize)>),
}

fn format_keys(keys: &[(String, usize)]) -> String {
    let keys: Vec<String> = keys
        .iter()
        .map(|(file, line)| format!("({}, {})", file, line))
        .collect();
    format!("[{}]", keys.join(", "))
}

/// The reason a chunk could not be relocated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelocationError {
    /// None of the anchoring strategies found the chunk in the current text.
    #[error("Could not find location to apply fix for: {signature}")]
    NotFound { signature: String },
}

/// The reason [`validate_fix`] refused a fixed text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixRejection {
    /// The fixed text does not parse.
    #[error("Fixed code for {0} does not parse")]
    SyntaxError(String),
    /// Too many top-level definitions disappeared.
    #[error("Function/class definitions removed ({after} vs {before})")]
    DefinitionsRemoved { before: usize, after: usize },
}
