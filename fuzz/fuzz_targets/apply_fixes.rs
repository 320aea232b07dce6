//! Fuzz target for the analyzer and fix application.
//!
//! Runs the full rule catalog over arbitrary source, then applies every
//! suggested fix. Fixing must never panic, must account for every fixable
//! finding, and must be a no-op when nothing is fixable.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use prtriage_domain::{Analyzer, analyze_source, apply_fixes, dedupe, detect_language};
use prtriage_types::AnalysisConfig;

#[derive(Arbitrary, Debug)]
struct FixInput {
    source: String,
    extension: u8,
    max_line_length: u8,
}

fuzz_target!(|input: FixInput| {
    let filename = match input.extension % 4 {
        0 => "fuzz.js",
        1 => "fuzz.ts",
        2 => "fuzz.py",
        _ => "fuzz.rs",
    };
    let config = AnalysisConfig {
        max_line_length: u32::from(input.max_line_length).max(1),
        ..AnalysisConfig::default()
    };
    let analyzer = Analyzer::new(config);
    let language = detect_language(filename);

    let Ok(issues) = analyze_source(
        &input.source,
        filename,
        language,
        analyzer.rules(),
        analyzer.config(),
        None,
    ) else {
        return;
    };
    let issues = dedupe(issues);
    let fixable = issues.iter().filter(|i| i.fixable).count() as u32;

    let outcome = apply_fixes(&input.source, &issues);
    assert!(outcome.applied + outcome.skipped <= fixable);
    if fixable == 0 {
        assert_eq!(outcome.content, input.source);
    }

    // The reported subset goes through the same path.
    let result = analyzer.analyze(&input.source, filename, "");
    let _ = apply_fixes(&input.source, &result.issues);
});
