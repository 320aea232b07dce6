//! A file split into lines, each with its masked views.

use crate::preprocess::{Language, PreprocessOptions, Preprocessor};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// The line as written, without its terminator.
    pub raw: String,
    /// Comments masked; strings intact.
    pub code: String,
    /// Comments and string contents masked.
    pub masked: String,
}

impl SourceLine {
    pub fn is_blank(&self) -> bool {
        self.raw.trim().is_empty()
    }

    /// The line holds nothing but comment text.
    pub fn is_comment(&self) -> bool {
        !self.is_blank() && self.code.trim().is_empty()
    }

    pub fn indent(&self) -> &str {
        let trimmed = self.raw.trim_start();
        &self.raw[..self.raw.len() - trimmed.len()]
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub language: Language,
    pub lines: Vec<SourceLine>,
    /// Quote character used by most string literals, if one clearly dominates.
    pub dominant_quote: Option<char>,
}

impl SourceFile {
    pub fn new(content: &str, language: Language) -> Self {
        let mut p_code = Preprocessor::new(PreprocessOptions::comments_only(), language);
        let mut p_masked = Preprocessor::new(PreprocessOptions::comments_and_strings(), language);

        let lines: Vec<SourceLine> = content
            .lines()
            .map(|raw| {
                let raw = raw.strip_suffix('\r').unwrap_or(raw);
                SourceLine {
                    raw: raw.to_string(),
                    code: p_code.sanitize_line(raw),
                    masked: p_masked.sanitize_line(raw),
                }
            })
            .collect();

        let dominant_quote = dominant_quote(&lines);
        Self {
            language,
            lines,
            dominant_quote,
        }
    }

    /// The 0-based line, if in range.
    pub fn line(&self, index: usize) -> Option<&SourceLine> {
        self.lines.get(index)
    }
}

/// Single- and double-quoted literals on a line, in order.
///
/// A literal opens wherever the code view has a quote that the fully-masked
/// view blanked out.
pub fn string_literals(line: &SourceLine) -> Vec<StringLiteral> {
    let code = line.code.as_bytes();
    let masked = line.masked.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < code.len() {
        let q = code[i];
        if masked[i] == b' ' && (q == b'"' || q == b'\'') {
            // Walk to the matching close quote in the code view.
            let mut j = i + 1;
            let mut escaped = false;
            while j < code.len() {
                if escaped {
                    escaped = false;
                } else if code[j] == b'\\' {
                    escaped = true;
                } else if code[j] == q {
                    break;
                }
                j += 1;
            }
            if j < code.len() {
                out.push(StringLiteral {
                    start: i,
                    end: j + 1,
                    quote: q as char,
                });
                i = j + 1;
                continue;
            }
            break;
        }
        i += 1;
    }
    out
}

/// Byte range of a quoted literal (quotes included) within `raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringLiteral {
    pub start: usize,
    pub end: usize,
    pub quote: char,
}

impl StringLiteral {
    pub fn text<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.start..self.end]
    }

    pub fn content<'a>(&self, raw: &'a str) -> &'a str {
        &raw[self.start + 1..self.end - 1]
    }
}

fn dominant_quote(lines: &[SourceLine]) -> Option<char> {
    let (mut single, mut double) = (0usize, 0usize);
    for line in lines {
        for lit in string_literals(line) {
            match lit.quote {
                '\'' => single += 1,
                _ => double += 1,
            }
        }
    }
    match single.cmp(&double) {
        std::cmp::Ordering::Greater => Some('\''),
        std::cmp::Ordering::Less => Some('"'),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_share_byte_length() {
        let file = SourceFile::new("const a = \"x\"; // note\r\n", Language::JavaScript);
        let line = &file.lines[0];
        assert_eq!(line.raw, "const a = \"x\"; // note");
        assert_eq!(line.code.len(), line.raw.len());
        assert_eq!(line.masked.len(), line.raw.len());
        assert!(line.code.contains("\"x\""));
        assert!(!line.masked.contains('x'));
    }

    #[test]
    fn comment_and_blank_lines() {
        let file = SourceFile::new("// only a comment\n\n  x();\n", Language::JavaScript);
        assert!(file.lines[0].is_comment());
        assert!(file.lines[1].is_blank());
        assert!(!file.lines[1].is_comment());
        assert_eq!(file.lines[2].indent(), "  ");
    }

    #[test]
    fn finds_string_literals() {
        let file = SourceFile::new(r#"f('a', "b\"c", x);"#, Language::JavaScript);
        let line = &file.lines[0];
        let lits = string_literals(line);
        assert_eq!(lits.len(), 2);
        assert_eq!(lits[0].text(&line.raw), "'a'");
        assert_eq!(lits[1].content(&line.raw), r#"b\"c"#);
    }

    #[test]
    fn dominant_quote_needs_a_majority() {
        let single = SourceFile::new("a('x');\nb('y');\nc(\"z\");\n", Language::JavaScript);
        assert_eq!(single.dominant_quote, Some('\''));
        let tie = SourceFile::new("a('x');\nc(\"z\");\n", Language::JavaScript);
        assert_eq!(tie.dominant_quote, None);
    }
}
