//! Fuzz target for merge-conflict scanning and resolution.
//!
//! Checks that the scanner and both resolvers agree with each other on
//! arbitrary marker-heavy text.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use prtriage_domain::{
    Language, conflict_info, extract_sections, has_conflicts, resolve, resolve_with_fallback,
};

#[derive(Arbitrary, Debug)]
enum Piece {
    Text(String),
    Start(String),
    Separator,
    Base,
    End(String),
}

#[derive(Arbitrary, Debug)]
struct ConflictInput {
    pieces: Vec<Piece>,
    crlf: bool,
    python: bool,
}

impl ConflictInput {
    fn render(&self) -> String {
        let eol = if self.crlf { "\r\n" } else { "\n" };
        let mut out = String::new();
        for piece in &self.pieces {
            let line = match piece {
                Piece::Text(t) => t.replace(['\r', '\n'], ""),
                Piece::Start(label) => format!("<<<<<<< {}", label.replace(['\r', '\n'], "")),
                Piece::Separator => "=======".to_string(),
                Piece::Base => "||||||| base".to_string(),
                Piece::End(label) => format!(">>>>>>> {}", label.replace(['\r', '\n'], "")),
            };
            out.push_str(&line);
            out.push_str(eol);
        }
        out
    }
}

fuzz_target!(|input: ConflictInput| {
    let content = input.render();
    let language = if input.python {
        Language::Python
    } else {
        Language::JavaScript
    };

    let info = conflict_info(&content);
    assert_eq!(info.is_some(), has_conflicts(&content));
    if let Some(info) = &info {
        assert_eq!(info.sections.len(), extract_sections(&content).len());
        for s in &info.sections {
            assert!(s.start_line < s.end_line);
        }
    }

    let resolved = resolve(&content);
    assert_eq!(
        resolved.is_ok(),
        info.as_ref().is_none_or(|i| i.auto_resolvable)
    );
    if let Err(err) = &resolved {
        assert!(err.unterminated || !err.sections.is_empty());
    }

    let forced = resolve_with_fallback(&content, language);
    assert_eq!(
        forced.is_err(),
        info.as_ref().is_some_and(|i| i.unterminated)
    );

    // Text without sections passes through both resolvers byte for byte.
    if info.is_none() {
        assert_eq!(resolved.as_deref(), Ok(content.as_str()));
        assert_eq!(forced.as_deref(), Ok(content.as_str()));
    }
});
