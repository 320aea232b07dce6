//! Merge-conflict detection and resolution.
//!
//! A single pass over the file drives a three-state machine:
//!
//! ```text
//! Outside --"<<<<<<< ours"--> InOurs --"======="--> InTheirs --">>>>>>> theirs"--> Outside
//! ```
//!
//! Each full cycle yields one [`ConflictSection`]. Marker lines that arrive in
//! the wrong state are ordinary content of the side being read. Resolution is
//! whole-file and fail-closed: [`resolve`] either rewrites every section or
//! returns an error and no text.

use thiserror::Error;

use prtriage_types::{ConflictInfo, ConflictSection};

use crate::preprocess::Language;

pub const START_MARKER: &str = "<<<<<<<";
pub const SEPARATOR: &str = "=======";
pub const END_MARKER: &str = ">>>>>>>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Outside,
    InOurs,
    InTheirs,
}

/// What one line means given the state it was read in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step<'a> {
    Plain,
    Open { label: &'a str },
    Ours,
    Separate,
    Theirs,
    Close { label: &'a str },
}

impl ScanState {
    /// Transition on one line (terminator already stripped).
    pub fn step(self, line: &str) -> (ScanState, Step<'_>) {
        match self {
            ScanState::Outside => match marker_label(line, START_MARKER) {
                Some(label) => (ScanState::InOurs, Step::Open { label }),
                None => (ScanState::Outside, Step::Plain),
            },
            ScanState::InOurs if line.trim_end() == SEPARATOR => {
                (ScanState::InTheirs, Step::Separate)
            }
            ScanState::InOurs => (ScanState::InOurs, Step::Ours),
            ScanState::InTheirs => match marker_label(line, END_MARKER) {
                Some(label) => (ScanState::Outside, Step::Close { label }),
                None => (ScanState::InTheirs, Step::Theirs),
            },
        }
    }
}

/// `Some(label)` when `line` is `marker` alone or followed by a space.
fn marker_label<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(marker)?;
    if rest.is_empty() {
        return Some("");
    }
    rest.starts_with(' ').then(|| rest.trim())
}

struct PendingSection {
    start_line: u32,
    /// Byte offset of the start marker in the scanned text.
    offset: usize,
    ours_label: String,
    ours_lines: Vec<String>,
    theirs_lines: Vec<String>,
}

impl PendingSection {
    fn close(self, end_line: u32, theirs_label: &str) -> ConflictSection {
        ConflictSection {
            start_line: self.start_line,
            end_line,
            ours_label: self.ours_label,
            theirs_label: theirs_label.to_string(),
            ours_lines: self.ours_lines,
            theirs_lines: self.theirs_lines,
        }
    }
}

enum Event<'a> {
    /// A line outside any section, terminator included.
    Plain(&'a str),
    /// A closed section and the terminator of its end-marker line.
    Closed(ConflictSection, &'a str),
    /// Everything from an unclosed start marker to end of input.
    Unterminated(&'a str),
}

fn walk<'a>(content: &'a str, mut emit: impl FnMut(Event<'a>)) {
    let mut state = ScanState::Outside;
    let mut pending: Option<PendingSection> = None;
    let mut offset = 0;

    for (idx, chunk) in content.split_inclusive('\n').enumerate() {
        let line_no = u32::try_from(idx + 1).unwrap_or(u32::MAX);
        let body = chunk.strip_suffix('\n').unwrap_or(chunk);
        let body = body.strip_suffix('\r').unwrap_or(body);
        let newline = &chunk[body.len()..];

        let (next, step) = state.step(body);
        match step {
            Step::Plain => emit(Event::Plain(chunk)),
            Step::Open { label } => {
                pending = Some(PendingSection {
                    start_line: line_no,
                    offset,
                    ours_label: label.to_string(),
                    ours_lines: vec![],
                    theirs_lines: vec![],
                });
            }
            Step::Ours => {
                if let Some(p) = pending.as_mut() {
                    p.ours_lines.push(body.to_string());
                }
            }
            Step::Separate => {}
            Step::Theirs => {
                if let Some(p) = pending.as_mut() {
                    p.theirs_lines.push(body.to_string());
                }
            }
            Step::Close { label } => {
                if let Some(p) = pending.take() {
                    emit(Event::Closed(p.close(line_no, label), newline));
                }
            }
        }
        state = next;
        offset += chunk.len();
    }

    if let Some(p) = pending {
        emit(Event::Unterminated(&content[p.offset..]));
    }
}

struct Scan {
    sections: Vec<ConflictSection>,
    unterminated: bool,
}

fn scan(content: &str) -> Scan {
    let mut out = Scan {
        sections: vec![],
        unterminated: false,
    };
    walk(content, |event| match event {
        Event::Plain(_) => {}
        Event::Closed(section, _) => out.sections.push(section),
        Event::Unterminated(_) => out.unterminated = true,
    });
    out
}

/// The content holds at least one start marker.
pub fn has_conflicts(content: &str) -> bool {
    let scan = scan(content);
    !scan.sections.is_empty() || scan.unterminated
}

/// Every closed conflict section, in file order.
pub fn extract_sections(content: &str) -> Vec<ConflictSection> {
    scan(content).sections
}

/// Summary for an analysis result; `None` when the content has no markers.
pub fn conflict_info(content: &str) -> Option<ConflictInfo> {
    let Scan {
        sections,
        unterminated,
    } = scan(content);
    if sections.is_empty() && !unterminated {
        return None;
    }
    let auto_resolvable = !unterminated && sections.iter().all(is_auto_resolvable);
    Some(ConflictInfo {
        sections,
        auto_resolvable,
        unterminated,
    })
}

fn is_blank(lines: &[String]) -> bool {
    lines.iter().all(|l| l.trim().is_empty())
}

fn without_whitespace(lines: &[String]) -> String {
    lines
        .iter()
        .flat_map(|l| l.chars())
        .filter(|c| !c.is_whitespace())
        .collect()
}

/// One side is blank, or both sides match once whitespace is removed.
pub fn is_auto_resolvable(section: &ConflictSection) -> bool {
    auto_merge(section).is_some()
}

fn auto_merge(section: &ConflictSection) -> Option<Vec<String>> {
    if is_blank(&section.ours_lines) {
        return Some(section.theirs_lines.clone());
    }
    if is_blank(&section.theirs_lines) {
        return Some(section.ours_lines.clone());
    }
    if without_whitespace(&section.ours_lines) == without_whitespace(&section.theirs_lines) {
        return Some(section.ours_lines.clone());
    }
    None
}

/// Replacement lines for one section.
///
/// Auto-resolvable sections take the non-blank side (or ours). Anything else
/// becomes ours followed by the theirs lines ours lacks, fenced by comments in
/// `language`'s line-comment syntax so a reviewer can find it.
pub fn merge_section(section: &ConflictSection, language: Language) -> Vec<String> {
    if let Some(lines) = auto_merge(section) {
        return lines;
    }
    let c = language.line_comment();
    let mut out = Vec::with_capacity(section.ours_lines.len() + section.theirs_lines.len() + 2);
    out.push(format!(
        "{c} prtriage: kept both sides of a conflict ({} / {}); review before merging",
        label_or(&section.ours_label, "ours"),
        label_or(&section.theirs_label, "theirs"),
    ));
    out.extend(section.ours_lines.iter().cloned());
    out.extend(
        section
            .theirs_lines
            .iter()
            .filter(|l| !section.ours_lines.contains(l))
            .cloned(),
    );
    out.push(format!("{c} prtriage: end of merged conflict"));
    out
}

fn label_or<'a>(label: &'a str, fallback: &'a str) -> &'a str {
    if label.is_empty() { fallback } else { label }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", describe(.sections, .unterminated))]
pub struct UnresolvedConflicts {
    /// Sections that need a human.
    pub sections: Vec<ConflictSection>,
    /// A start marker was never closed.
    pub unterminated: bool,
}

fn describe(sections: &[ConflictSection], unterminated: &bool) -> String {
    let mut msg = format!(
        "{} conflict section(s) cannot be resolved automatically",
        sections.len()
    );
    if *unterminated {
        msg.push_str("; a conflict start marker is never closed");
    }
    msg
}

/// Resolve every section, or none.
pub fn resolve(content: &str) -> Result<String, UnresolvedConflicts> {
    let scan = scan(content);
    let offending: Vec<_> = scan
        .sections
        .into_iter()
        .filter(|s| !is_auto_resolvable(s))
        .collect();
    if !offending.is_empty() || scan.unterminated {
        return Err(UnresolvedConflicts {
            sections: offending,
            unterminated: scan.unterminated,
        });
    }
    Ok(splice(content, |s| auto_merge(s).unwrap_or_default()))
}

/// Resolve every section, falling back to [`merge_section`] for the hard ones.
///
/// Fails only on an unterminated start marker.
pub fn resolve_with_fallback(
    content: &str,
    language: Language,
) -> Result<String, UnresolvedConflicts> {
    if scan(content).unterminated {
        return Err(UnresolvedConflicts {
            sections: vec![],
            unterminated: true,
        });
    }
    Ok(splice(content, |s| merge_section(s, language)))
}

fn splice(content: &str, merge: impl Fn(&ConflictSection) -> Vec<String>) -> String {
    let eol = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let mut out = String::with_capacity(content.len());
    walk(content, |event| match event {
        Event::Plain(chunk) | Event::Unterminated(chunk) => out.push_str(chunk),
        Event::Closed(section, newline) => {
            let lines = merge(&section);
            let last = lines.len().saturating_sub(1);
            for (i, line) in lines.iter().enumerate() {
                out.push_str(line);
                out.push_str(if i == last { newline } else { eol });
            }
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ONE_SIDED: &str = "a\n<<<<<<< HEAD\n=======\nfrom theirs\n>>>>>>> feature\nb\n";

    fn section(ours: &[&str], theirs: &[&str]) -> ConflictSection {
        ConflictSection {
            start_line: 1,
            end_line: 3 + (ours.len() + theirs.len()) as u32,
            ours_label: "HEAD".to_string(),
            theirs_label: "feature".to_string(),
            ours_lines: ours.iter().map(|s| s.to_string()).collect(),
            theirs_lines: theirs.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn transitions() {
        use ScanState::*;
        assert_eq!(
            Outside.step("<<<<<<< HEAD"),
            (InOurs, Step::Open { label: "HEAD" })
        );
        assert_eq!(Outside.step("======="), (Outside, Step::Plain));
        assert_eq!(Outside.step("<<<<<<<<"), (Outside, Step::Plain));
        assert_eq!(InOurs.step("======="), (InTheirs, Step::Separate));
        assert_eq!(InOurs.step(">>>>>>> x"), (InOurs, Step::Ours));
        assert_eq!(InTheirs.step("<<<<<<< y"), (InTheirs, Step::Theirs));
        assert_eq!(
            InTheirs.step(">>>>>>>"),
            (Outside, Step::Close { label: "" })
        );
    }

    #[test]
    fn extracts_labels_and_lines() {
        let sections = extract_sections(ONE_SIDED);
        assert_eq!(sections.len(), 1);
        let s = &sections[0];
        assert_eq!((s.start_line, s.end_line), (2, 5));
        assert_eq!(s.ours_label, "HEAD");
        assert_eq!(s.theirs_label, "feature");
        assert!(s.ours_lines.is_empty());
        assert_eq!(s.theirs_lines, vec!["from theirs"]);
    }

    #[test]
    fn block_round_trips_through_to_block() {
        let s = &extract_sections(ONE_SIDED)[0];
        assert!(ONE_SIDED.contains(&s.to_block()));
    }

    #[test]
    fn plain_text_has_no_conflicts() {
        assert!(!has_conflicts("a\n=======\nb\n"));
        assert!(conflict_info("a\n").is_none());
    }

    #[test]
    fn auto_resolvable_cases() {
        assert!(is_auto_resolvable(&section(&["", "  "], &["x"])));
        assert!(is_auto_resolvable(&section(&["x"], &[])));
        assert!(is_auto_resolvable(&section(&["a = 1;"], &["a=1;"])));
        assert!(!is_auto_resolvable(&section(&["a = 1;"], &["a = 2;"])));
    }

    #[test]
    fn resolves_to_non_blank_side() {
        assert_eq!(resolve(ONE_SIDED).unwrap(), "a\nfrom theirs\nb\n");
    }

    #[test]
    fn whitespace_equivalent_keeps_ours() {
        let text = "<<<<<<< HEAD\nf(a, b);\n=======\nf(a,b);\n>>>>>>> other\n";
        assert_eq!(resolve(text).unwrap(), "f(a, b);\n");
    }

    #[test]
    fn one_hard_section_blocks_the_whole_file() {
        let text = format!("{ONE_SIDED}<<<<<<< HEAD\nx = 1\n=======\nx = 2\n>>>>>>> b\n");
        let err = resolve(&text).unwrap_err();
        assert_eq!(err.sections.len(), 1);
        assert_eq!(err.sections[0].ours_lines, vec!["x = 1"]);
        assert!(!err.unterminated);
        assert_eq!(
            err.to_string(),
            "1 conflict section(s) cannot be resolved automatically"
        );
    }

    #[test]
    fn unterminated_section_fails_closed() {
        let text = "a\n<<<<<<< HEAD\nx\n=======\ny\n";
        assert!(has_conflicts(text));
        let info = conflict_info(text).unwrap();
        assert!(info.unterminated);
        assert!(!info.auto_resolvable);
        assert!(resolve(text).unwrap_err().unterminated);
        assert!(resolve_with_fallback(text, Language::JavaScript).is_err());
    }

    #[test]
    fn crlf_is_preserved() {
        let text = "a\r\n<<<<<<< HEAD\r\n=======\r\nx\r\ny\r\n>>>>>>> f\r\nb\r\n";
        assert_eq!(resolve(text).unwrap(), "a\r\nx\r\ny\r\nb\r\n");
    }

    #[test]
    fn missing_trailing_newline_is_preserved() {
        let text = "<<<<<<< HEAD\nx\n=======\n>>>>>>> f";
        assert_eq!(resolve(text).unwrap(), "x");
    }

    #[test]
    fn fallback_fences_both_sides() {
        let text = "<<<<<<< HEAD\nx = 1\nshared\n=======\nshared\nx = 2\n>>>>>>> feature\n";
        let out = resolve_with_fallback(text, Language::Python).unwrap();
        assert_eq!(
            out,
            "# prtriage: kept both sides of a conflict (HEAD / feature); review before merging\n\
             x = 1\nshared\nx = 2\n# prtriage: end of merged conflict\n"
        );
        assert!(!has_conflicts(&out));
    }
}
