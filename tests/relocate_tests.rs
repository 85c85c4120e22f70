use indoc::indoc;
use linepatch::{
    apply_chunk_fixes, extract_chunks, fix_files, relocate_chunk, validate_fix, ChunkOptions,
    CodeChunk, FileMap, FixRejection, FixStatus, RelocationError, RelocationStrategy,
};

fn chunk(
    content: &str,
    signature: &str,
    (start_line, end_line): (usize, usize),
    (target_start, target_end): (usize, usize),
    (context_before, context_after): (&str, &str),
) -> CodeChunk {
    CodeChunk {
        start_line,
        end_line,
        content: content.to_string(),
        signature: signature.to_string(),
        file_path: "m.py".to_string(),
        context_before: context_before.to_string(),
        context_after: context_after.to_string(),
        target_start,
        target_end,
    }
}

/// The `target` function of a small module, extracted with two lines of
/// context before its body changed.
fn target_chunk() -> CodeChunk {
    chunk(
        "    return 1\n\ndef target(x):\n    y = x + 1\n    return y\n\ndef other():",
        "def target(x):",
        (4, 10),
        (6, 8),
        ("    return 1\n", "\ndef other():"),
    )
}

fn options() -> ChunkOptions {
    ChunkOptions::builder().context_lines(2).build()
}

// --- Single relocation ---

#[test]
fn test_relocates_by_signature_after_drift() {
    // Three lines were added above the chunk and its body was edited, so only
    // the signature and the surrounding context still match.
    let drifted = indoc! {"
        # added 1
        # added 2
        # added 3
        import os
        import sys

        def helper():
            return 1

        def target(x):
            y = x + 2
            return y

        def other():
            return 2
    "};
    let result = relocate_chunk(
        drifted,
        &target_chunk(),
        "def target(x):\n    return x * 2",
        &options(),
    )
    .unwrap();

    assert_eq!(
        result.strategy,
        RelocationStrategy::SignatureAnchor {
            block_start: 9,
            block_end: 12
        }
    );
    assert_eq!(
        result.new_content,
        indoc! {"
            # added 1
            # added 2
            # added 3
            import os
            import sys

            def helper():
                return 1

            def target(x):
                return x * 2
            def other():
                return 2
        "}
    );
}

#[test]
fn test_signature_without_nearby_context_is_skipped() {
    // The only `def target(x):` line now sits far from the saved context.
    let mut drifted = String::from("def target(x):\n    y = x + 2\n    return y\n");
    drifted.push_str(&"# filler\n".repeat(20));
    drifted.push_str("def helper():\n    return 1\n");

    let err = relocate_chunk(&drifted, &target_chunk(), "def target(x):\n    pass", &options())
        .unwrap_err();
    assert_eq!(
        err,
        RelocationError::NotFound {
            signature: "def target(x):".to_string()
        }
    );
    assert_eq!(
        err.to_string(),
        "Could not find location to apply fix for: def target(x):"
    );
}

#[test]
fn test_chunk_without_context_anchors_on_signature_alone() {
    let stored = chunk("def f():\n    old()", "def f():", (0, 1), (0, 1), ("", ""));
    let current = "x = 0\ndef f():\n    new()\n";
    let result = relocate_chunk(current, &stored, "def f():\n    fixed()", &options()).unwrap();
    assert_eq!(
        result.strategy,
        RelocationStrategy::SignatureAnchor {
            block_start: 1,
            block_end: 2
        }
    );
    assert_eq!(result.new_content, "x = 0\ndef f():\n    fixed()\n");
}

#[test]
fn test_exact_context_wins_when_nothing_moved() {
    let current = indoc! {"
        import os
        import sys

        def helper():
            return 1

        def target(x):
            y = x + 1
            return y

        def other():
            return 2
    "};
    let result = relocate_chunk(current, &target_chunk(), "def target(x):\n    return x", &options())
        .unwrap();
    assert_eq!(result.strategy, RelocationStrategy::ExactContext);
    assert!(result
        .new_content
        .contains("    return 1\n\ndef target(x):\n    return x\n\ndef other():"));
}

#[test]
fn test_raw_content_is_the_last_resort() {
    let stored = chunk(
        "# gone\nvalue = compute()",
        "def vanished():",
        (0, 1),
        (1, 1),
        ("# gone", ""),
    );
    let current = "x = 1\nvalue = compute()\ny = 2\n";
    let result = relocate_chunk(current, &stored, "value = compute_fast()", &options()).unwrap();
    assert_eq!(result.strategy, RelocationStrategy::RawContent);
    assert_eq!(result.new_content, "x = 1\nvalue = compute_fast()\ny = 2\n");
}

#[test]
fn test_top_of_file_chunk_anchors_after_trailing_context_drifts() {
    // Nothing precedes the chunk, so its missing leading context still counts
    // as found even though the trailing context changed.
    let stored = chunk(
        "def target(a):\n    return a\n\nz = 1",
        "def target(a):",
        (0, 3),
        (0, 1),
        ("", "\nz = 1"),
    );
    let current = "# new\ndef target(a):\n    return a + 0\n\nz = 9\nw = 2\n";
    let result = relocate_chunk(current, &stored, "def target(a):\n    return 0", &options()).unwrap();

    assert_ne!(result.strategy, RelocationStrategy::RawContent);
    assert_eq!(
        result.strategy,
        RelocationStrategy::SignatureAnchor {
            block_start: 1,
            block_end: 3
        }
    );
    assert_eq!(result.new_content, "# new\ndef target(a):\n    return 0\nz = 9\nw = 2\n");
}

#[cfg(feature = "structural")]
#[test]
fn test_extracted_top_of_file_chunk_has_empty_leading_context() {
    let source = "def target(a):\n    return a\n\nz = 1\nw = 2\n";
    let chunks = extract_chunks(source, &["target"], "m.py", &options());
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].context_before, "");
    assert_eq!(chunks[0].context_after, "\nz = 1");

    let current = "# new\ndef target(a):\n    return a + 0\n\nz = 9\nw = 2\n";
    let result =
        relocate_chunk(current, &chunks[0], "def target(a):\n    return 0", &options()).unwrap();
    assert!(matches!(
        result.strategy,
        RelocationStrategy::SignatureAnchor { .. }
    ));
    assert_eq!(result.new_content, "# new\ndef target(a):\n    return 0\nz = 9\nw = 2\n");
}

#[test]
fn test_unbounded_context_window_does_not_overflow() {
    let options = ChunkOptions::builder().context_lines(usize::MAX).build();
    let chunks = extract_chunks("def f():\n    pass\n", &["f"], "f.py", &options);
    assert_eq!(chunks.len(), 1);

    let current = "x = 0\ndef f():\n    old()\n";
    let result = relocate_chunk(current, &chunks[0], "def f():\n    return 1", &options).unwrap();
    assert_eq!(
        result.strategy,
        RelocationStrategy::SignatureAnchor {
            block_start: 1,
            block_end: 2
        }
    );
    assert_eq!(result.new_content, "x = 0\ndef f():\n    return 1\n");
}

// --- Several fixes ---

#[test]
fn test_fixes_apply_bottom_up_and_report_in_input_order() {
    let content = indoc! {"
        def alpha():
            return 1

        def beta():
            return 2
    "};
    let alpha = chunk("def alpha():\n    return 1", "def alpha():", (0, 1), (0, 1), ("", ""));
    let beta = chunk("def beta():\n    return 2", "def beta():", (3, 4), (3, 4), ("", ""));
    let missing = chunk("def gamma():\n    return 3", "def gamma():", (6, 7), (6, 7), ("", ""));
    let fixes = vec![
        (alpha, "def alpha():\n    return 10".to_string()),
        (missing, "def gamma():\n    return 30".to_string()),
        (beta, "def beta():\n    return 20".to_string()),
    ];

    let application = apply_chunk_fixes(content, &fixes, &options());
    assert_eq!(
        application.new_content,
        "def alpha():\n    return 10\n\ndef beta():\n    return 20\n"
    );
    assert_eq!(
        application.report.fix_results,
        vec![
            FixStatus::Applied(RelocationStrategy::ExactContext),
            FixStatus::Failed(RelocationError::NotFound {
                signature: "def gamma():".to_string()
            }),
            FixStatus::Applied(RelocationStrategy::ExactContext),
        ]
    );
    assert!(!application.report.all_applied());
    let failures = application.report.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].fix_index, 2);
}

#[test]
fn test_extracted_chunk_round_trips_through_relocation() {
    let source = indoc! {"
        import json

        def dump(obj):
            return json.dumps(obj)
    "};
    let chunks = extract_chunks(source, &["dump"], "d.py", &options());
    assert_eq!(chunks.len(), 1);

    let fixed = chunks[0].core_text().replace("json.dumps(obj)", "json.dumps(obj, indent=2)");
    let application = apply_chunk_fixes(source, &[(chunks[0].clone(), fixed)], &options());
    assert!(application.report.all_applied());
    assert!(application
        .new_content
        .contains("    return json.dumps(obj, indent=2)"));
    assert!(application.new_content.starts_with("import json\n"));
}

// --- Fix validation and the fix pipeline ---

#[test]
fn test_validate_fix_counts_definitions() {
    assert_eq!(validate_fix("same", "same", "a.js"), Ok(()));
    assert_eq!(
        validate_fix("class A: pass\nclass B: pass\n", "class A: pass\n", "a.js"),
        Err(FixRejection::DefinitionsRemoved {
            before: 2,
            after: 1
        })
    );
    assert_eq!(
        validate_fix(
            "def a():\n    pass\n",
            "def a():\n    return 1\n",
            "a.py"
        ),
        Ok(())
    );
}

#[cfg(feature = "structural")]
#[test]
fn test_validate_fix_rejects_unparseable_python() {
    assert_eq!(
        validate_fix("def a():\n    pass", "def a(:\n    pass", "a.py"),
        Err(FixRejection::SyntaxError("a.py".to_string()))
    );
    // Indented method bodies are checked after dedenting.
    assert_eq!(
        validate_fix(
            "    def m(self):\n        pass",
            "    def m(self):\n        return 1",
            "a.py"
        ),
        Ok(())
    );
}

fn calc_files() -> FileMap {
    FileMap::from([(
        "calc.py".to_string(),
        indoc! {"
            import math

            def area(r):
                return math.pi * r * r

            def perimeter(r):
                return 2 * math.pi * r
        "}
        .to_string(),
    )])
}

#[test]
fn test_fix_files_applies_and_hands_result_to_sink() {
    let files = calc_files();
    let mut seen_imports = Vec::new();
    let mut fixer = |chunk: &CodeChunk, imports: &[String]| {
        seen_imports = imports.to_vec();
        (chunk.signature == "def area(r):")
            .then(|| chunk.core_text().replace("r * r", "r ** 2"))
    };
    let mut staged: Vec<(String, String)> = Vec::new();
    let mut sink = |name: &str, content: &str| staged.push((name.to_string(), content.to_string()));

    let fixed = fix_files(
        &files,
        &["calc.py", "missing.py"],
        &["area"],
        &mut fixer,
        &mut sink,
        &ChunkOptions::default(),
    );

    assert_eq!(seen_imports, vec!["import math"]);
    assert_eq!(fixed.len(), 1);
    let content = &fixed["calc.py"];
    assert!(content.contains("    return math.pi * r ** 2"));
    assert!(content.contains("def perimeter(r):\n    return 2 * math.pi * r"));
    assert_eq!(staged, vec![("calc.py".to_string(), content.clone())]);
}

#[test]
fn test_fix_files_drops_fixes_that_remove_definitions() {
    let files = calc_files();
    let mut fixer = |_: &CodeChunk, _: &[String]| Some(String::new());
    let mut calls = 0;
    let mut sink = |_: &str, _: &str| calls += 1;

    let fixed = fix_files(
        &files,
        &["calc.py"],
        &["area"],
        &mut fixer,
        &mut sink,
        &ChunkOptions::default(),
    );
    assert!(fixed.is_empty());
    assert_eq!(calls, 0);
}

#[test]
fn test_fix_files_needs_inputs() {
    let files = calc_files();
    let options = ChunkOptions::default();
    let mut fixer_calls = 0;
    let mut fixer = |_: &CodeChunk, _: &[String]| {
        fixer_calls += 1;
        None::<String>
    };
    let mut sink_calls = 0;
    let mut sink = |_: &str, _: &str| sink_calls += 1;
    let none: [&str; 0] = [];

    let no_keywords = fix_files(&files, &["calc.py"], &none, &mut fixer, &mut sink, &options);
    let no_names = fix_files(&files, &none, &["area"], &mut fixer, &mut sink, &options);
    let no_files = fix_files(
        &FileMap::new(),
        &["calc.py"],
        &["area"],
        &mut fixer,
        &mut sink,
        &options,
    );

    assert!(no_keywords.is_empty() && no_names.is_empty() && no_files.is_empty());
    assert_eq!((fixer_calls, sink_calls), (0, 0));
}
