//! Driving chunk fixes across files with an injected fixer and sink.

#[cfg(feature = "structural")]
use crate::blocks::{DefaultStructureParser, StructureParser};
use crate::chunk::{extract_chunks, extract_imports, ChunkOptions, CodeChunk};
use crate::relocate::apply_chunk_fixes;
use crate::{FileMap, FixRejection};
use log::{debug, info, warn};
use regex::Regex;
use std::sync::OnceLock;

/// A fixed text may keep no fewer than this share of the original's
/// top-level definitions.
const MIN_DEFINITION_RATIO: f64 = 0.8;

/// Produces replacement text for a chunk's target region.
///
/// This is the seam for whatever generates fixes (a model, a rule engine, a
/// test double). Returning `None` means the chunk needs no change.
pub trait ChunkFixer {
    fn fix_chunk(&mut self, chunk: &CodeChunk, imports: &[String]) -> Option<String>;
}

impl<F> ChunkFixer for F
where
    F: FnMut(&CodeChunk, &[String]) -> Option<String>,
{
    fn fix_chunk(&mut self, chunk: &CodeChunk, imports: &[String]) -> Option<String> {
        self(chunk, imports)
    }
}

/// Receives every file that [`fix_files`] successfully rewrote, e.g. to
/// stage it for review.
pub trait FixSink {
    fn accept(&mut self, file_name: &str, content: &str);
}

impl<F> FixSink for F
where
    F: FnMut(&str, &str),
{
    fn accept(&mut self, file_name: &str, content: &str) {
        self(file_name, content)
    }
}

fn top_level_definition() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^(def |class |async def )").expect("valid definition regex"))
}

#[cfg(feature = "structural")]
fn dedent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    text.lines()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(feature = "structural")]
fn parses_cleanly(python: &str) -> bool {
    DefaultStructureParser.parse_blocks(&dedent(python)).is_some()
}

#[cfg(not(feature = "structural"))]
fn parses_cleanly(_python: &str) -> bool {
    true
}

/// Sanity-checks a fixed text against the text it replaces.
///
/// Identical texts always pass. For `.py` files the fixed text, dedented,
/// must parse cleanly when the structural parser is available. The number
/// of line-leading `def`/`class`/`async def` headers must not drop below
/// 80% of the original's.
///
/// # Errors
///
/// Returns the [`FixRejection`] describing the first failed check.
pub fn validate_fix(original: &str, fixed: &str, file_path: &str) -> Result<(), FixRejection> {
    if original == fixed {
        return Ok(());
    }

    if file_path.ends_with(".py") && !parses_cleanly(fixed) {
        return Err(FixRejection::SyntaxError(file_path.to_string()));
    }

    let before = top_level_definition().find_iter(original).count();
    let after = top_level_definition().find_iter(fixed).count();
    if (after as f64) < (before as f64) * MIN_DEFINITION_RATIO {
        return Err(FixRejection::DefinitionsRemoved { before, after });
    }
    Ok(())
}

/// Extracts chunks from each named file, asks `fixer` for replacements,
/// and applies the accepted ones.
///
/// For every name in `file_names` present in `files`: chunks relevant to
/// `keywords` are extracted, each is offered to `fixer` along with the
/// file's imports, each replacement is checked with [`validate_fix`]
/// against the chunk's target region, and the survivors are applied with
/// [`apply_chunk_fixes`]. A file whose content changed and still passes
/// [`validate_fix`] as a whole is returned and handed to `sink`.
///
/// Missing inputs (no files, no names, or no keywords) produce an empty map.
pub fn fix_files<S, K, F, W>(
    files: &FileMap,
    file_names: &[S],
    keywords: &[K],
    fixer: &mut F,
    sink: &mut W,
    options: &ChunkOptions,
) -> FileMap
where
    S: AsRef<str>,
    K: AsRef<str>,
    F: ChunkFixer + ?Sized,
    W: FixSink + ?Sized,
{
    let mut fixed_files = FileMap::new();
    if files.is_empty() || file_names.is_empty() || keywords.is_empty() {
        warn!("Missing required inputs; nothing to fix.");
        return fixed_files;
    }

    for file_name in file_names {
        let file_name = file_name.as_ref();
        let Some(content) = files.get(file_name) else {
            warn!("File '{}' not found; skipping.", file_name);
            continue;
        };
        info!("Processing {}", file_name);

        let imports = extract_imports(content);
        let chunks = extract_chunks(content, keywords, file_name, options);
        if chunks.is_empty() {
            info!("  No relevant chunks found in {}", file_name);
            continue;
        }

        let total = chunks.len();
        let mut accepted: Vec<(CodeChunk, String)> = Vec::new();
        for (i, chunk) in chunks.into_iter().enumerate() {
            debug!("  Analyzing chunk {}/{}: {}", i + 1, total, chunk.signature);
            let Some(fixed) = fixer.fix_chunk(&chunk, &imports) else {
                debug!("  No changes needed.");
                continue;
            };
            match validate_fix(&chunk.core_text(), &fixed, file_name) {
                Ok(()) => accepted.push((chunk, fixed)),
                Err(rejection) => warn!("  Fix for {} rejected: {}", chunk.signature, rejection),
            }
        }
        if accepted.is_empty() {
            info!("  No valid fixes generated for {}", file_name);
            continue;
        }

        let application = apply_chunk_fixes(content, &accepted, options);
        if application.new_content == *content {
            info!("  No net changes applied to {}", file_name);
            continue;
        }
        match validate_fix(content, &application.new_content, file_name) {
            Ok(()) => {
                info!(
                    "Fixed {} with {} change(s).",
                    file_name,
                    accepted.len() - application.report.failures().len()
                );
                sink.accept(file_name, &application.new_content);
                fixed_files.insert(file_name.to_string(), application.new_content);
            }
            Err(rejection) => warn!("Final validation failed for {}: {}", file_name, rejection),
        }
    }
    fixed_files
}
