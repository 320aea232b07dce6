#![no_main]

use libfuzzer_sys::fuzz_target;

use prtriage_diff::{parse_changed_lines, parse_unified_diff};

fuzz_target!(|data: &[u8]| {
    let s = String::from_utf8_lossy(data);

    // Bare hunk parsing never fails; every line it reports is 1-based.
    let lines = parse_changed_lines(&s);
    assert!(!lines.contains(&0));

    if let Ok(files) = parse_unified_diff(&s) {
        for file in files {
            assert!(!file.changed_lines.contains(&0));
            assert!(file.changed_lines.len() <= file.additions as usize);
        }
    }
});
