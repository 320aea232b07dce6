//! Fuzz target for the comment and string masking preprocessor.
//!
//! The preprocessor must keep every line the same length in bytes, and must
//! leave a line untouched when masking is switched off.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use prtriage_domain::{Language, PreprocessOptions, Preprocessor};

#[derive(Arbitrary, Debug)]
struct PreprocessInput {
    language: FuzzLanguage,
    mask_comments: bool,
    mask_strings: bool,
    lines: Vec<String>,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzLanguage {
    JavaScript,
    TypeScript,
    Python,
    Ruby,
    Rust,
    Go,
    Java,
    C,
    Cpp,
    Unknown,
}

impl From<FuzzLanguage> for Language {
    fn from(lang: FuzzLanguage) -> Self {
        match lang {
            FuzzLanguage::JavaScript => Language::JavaScript,
            FuzzLanguage::TypeScript => Language::TypeScript,
            FuzzLanguage::Python => Language::Python,
            FuzzLanguage::Ruby => Language::Ruby,
            FuzzLanguage::Rust => Language::Rust,
            FuzzLanguage::Go => Language::Go,
            FuzzLanguage::Java => Language::Java,
            FuzzLanguage::C => Language::C,
            FuzzLanguage::Cpp => Language::Cpp,
            FuzzLanguage::Unknown => Language::Unknown,
        }
    }
}

fuzz_target!(|input: PreprocessInput| {
    let options = PreprocessOptions {
        mask_comments: input.mask_comments,
        mask_strings: input.mask_strings,
    };
    let mut pre = Preprocessor::new(options, Language::from(input.language));

    for line in &input.lines {
        let line = line.replace(['\r', '\n'], "");
        let out = pre.sanitize_line(&line);
        assert_eq!(out.len(), line.len());
        if !input.mask_comments && !input.mask_strings {
            assert_eq!(out, line);
        }
    }

    pre.reset();
    for line in &input.lines {
        let _ = pre.sanitize_line(line);
    }
});
