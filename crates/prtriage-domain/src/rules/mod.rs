//! The rule interface and the built-in catalog.
//!
//! Each rule inspects one line at a time through a [`LineContext`], which also
//! exposes neighbouring lines and the rest of the file for rules that need
//! them. A rule never builds an [`Issue`](prtriage_types::Issue) itself: it
//! returns a [`RuleHit`] and the engine fills in location and identity.

use prtriage_types::{AnalysisConfig, Category, IssueType, Severity};

use crate::source::{SourceFile, SourceLine};

mod lint;
mod perf;
mod security;
mod style;

/// A line-scoped check.
pub trait Rule: Send + Sync {
    /// Stable identifier, used in config and in issue identity.
    fn id(&self) -> &'static str;

    fn category(&self) -> Category;

    /// One-line summary for listings.
    fn description(&self) -> &'static str;

    /// Runs on files in any language, not only JavaScript and TypeScript.
    fn cross_language(&self) -> bool {
        false
    }

    /// Also runs on lines that hold only a comment.
    fn inspects_comments(&self) -> bool {
        false
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit>;
}

/// The line under inspection plus read access to the whole file.
#[derive(Debug, Clone, Copy)]
pub struct LineContext<'a> {
    pub file: &'a SourceFile,
    /// 0-based index into `file.lines`. Always in range.
    pub index: usize,
    pub settings: &'a AnalysisConfig,
}

impl<'a> LineContext<'a> {
    pub fn line(&self) -> &'a SourceLine {
        &self.file.lines[self.index]
    }

    /// 1-based line number.
    pub fn line_no(&self) -> u32 {
        u32::try_from(self.index + 1).unwrap_or(u32::MAX)
    }

    pub fn raw(&self) -> &'a str {
        &self.line().raw
    }

    pub fn code(&self) -> &'a str {
        &self.line().code
    }

    pub fn masked(&self) -> &'a str {
        &self.line().masked
    }

    pub fn indent(&self) -> &'a str {
        self.line().indent()
    }

    /// Lines within `radius` of this one, this one included.
    pub fn window(&self, radius: usize) -> &'a [SourceLine] {
        let start = self.index.saturating_sub(radius);
        let end = (self.index + radius + 1).min(self.file.lines.len());
        &self.file.lines[start..end]
    }

    /// Lines before this one.
    pub fn before(&self) -> &'a [SourceLine] {
        &self.file.lines[..self.index]
    }

    /// Lines after this one.
    pub fn rest(&self) -> &'a [SourceLine] {
        &self.file.lines[self.index + 1..]
    }

    pub fn prev_non_blank(&self) -> Option<&'a SourceLine> {
        self.before().iter().rev().find(|l| !l.is_blank())
    }

    /// Next line carrying code (not blank, not comment-only).
    pub fn next_code_line(&self) -> Option<&'a SourceLine> {
        self.rest()
            .iter()
            .find(|l| !l.is_blank() && !l.is_comment())
    }
}

/// What a rule reports about a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleHit {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub message: String,
    pub column: Option<u32>,
    pub suggestion: Option<String>,
    /// Literal replacement for the whole line; `\n` separates replacement lines.
    pub suggested_code: Option<String>,
}

impl RuleHit {
    pub fn new(issue_type: IssueType, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            issue_type,
            severity,
            message: message.into(),
            column: None,
            suggestion: None,
            suggested_code: None,
        }
    }

    /// Point the hit at byte offset `byte` of `raw`.
    pub fn at(mut self, raw: &str, byte: usize) -> Self {
        self.column = byte_to_column(raw, byte);
        self
    }

    pub fn suggest(mut self, text: impl Into<String>) -> Self {
        self.suggestion = Some(text.into());
        self
    }

    pub fn replace_with(mut self, code: impl Into<String>) -> Self {
        self.suggested_code = Some(code.into());
        self
    }
}

/// Every built-in rule, in reporting order.
pub fn builtin_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(lint::NoConsole),
        Box::new(lint::NoUnusedVars),
        Box::new(lint::PreferConst),
        Box::new(style::Semi),
        Box::new(lint::Eqeqeq),
        Box::new(lint::RequireAwaitCatch),
        Box::new(style::MaxLen),
        Box::new(lint::NoMagicStrings),
        Box::new(lint::PreferArrowCallback),
        Box::new(lint::RequireJsdoc),
        Box::new(security::NoEval),
        Box::new(security::NoInnerHtml),
        Box::new(perf::CacheDomLookups),
        Box::new(perf::LoopLengthCache),
        Box::new(perf::NoAllocInLoop),
        Box::new(lint::PreferTemplate),
        Box::new(style::Quotes),
        Box::new(style::CommaDangle),
        Box::new(style::SpaceInfixOps),
        Box::new(style::NoMultipleEmptyLines),
        Box::new(security::NoSqlInjection),
        Box::new(security::NoHardcodedSecrets),
        Box::new(security::NoInsecureRandom),
        Box::new(security::NoInsecureHttp),
    ]
}

/// The built-in catalog minus the ids listed in `disabled`.
pub fn rule_catalog(disabled: &[String]) -> Vec<Box<dyn Rule>> {
    builtin_rules()
        .into_iter()
        .filter(|r| !disabled.iter().any(|d| d == r.id()))
        .collect()
}

// ── Shared helpers ─────────────────────────────────────────────

pub(crate) fn byte_to_column(s: &str, byte_idx: usize) -> Option<u32> {
    let prefix = s.get(..byte_idx)?;
    u32::try_from(prefix.chars().count() + 1).ok()
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Byte offset of `word` in `hay` where it is not part of a longer identifier.
pub(crate) fn find_word(hay: &str, word: &str) -> Option<usize> {
    find_word_from(hay, word, 0)
}

pub(crate) fn find_word_from(hay: &str, word: &str, from: usize) -> Option<usize> {
    if word.is_empty() {
        return None;
    }
    let bytes = hay.as_bytes();
    let mut start = from;
    while let Some(pos) = hay.get(start..).and_then(|h| h.find(word)) {
        let at = start + pos;
        let end = at + word.len();
        let before_ok = at == 0 || !is_ident_byte(bytes[at - 1]);
        let after_ok = end >= bytes.len() || !is_ident_byte(bytes[end]);
        if before_ok && after_ok {
            return Some(at);
        }
        start = at + 1;
    }
    None
}

/// The trimmed-end length of a code view, i.e. where a terminator would go.
pub(crate) fn code_end(code: &str) -> usize {
    code.trim_end().len()
}

/// Enclosing block openers of byte `limit` on line `index`, innermost first.
///
/// Walks backwards over masked text balancing braces, for at most `max_lines`
/// lines. Each item is the line index and byte offset of an unmatched `{`/`[`.
pub(crate) fn enclosing_openers(
    file: &SourceFile,
    index: usize,
    limit: usize,
    max_lines: usize,
) -> Vec<(usize, usize, u8)> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let lowest = index.saturating_sub(max_lines);
    for i in (lowest..=index).rev() {
        let masked = file.lines[i].masked.as_bytes();
        let end = if i == index {
            limit.min(masked.len())
        } else {
            masked.len()
        };
        for j in (0..end).rev() {
            match masked[j] {
                b'}' | b']' => depth += 1,
                b'{' | b'[' => {
                    if depth == 0 {
                        out.push((i, j, masked[j]));
                    } else {
                        depth -= 1;
                    }
                }
                _ => {}
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::Language;
    use std::collections::HashSet;

    #[test]
    fn catalog_ids_are_unique() {
        let rules = builtin_rules();
        let ids: HashSet<_> = rules.iter().map(|r| r.id()).collect();
        assert_eq!(ids.len(), rules.len());
        assert_eq!(rules.len(), 24);
    }

    #[test]
    fn cross_language_subset() {
        let mut cross: Vec<_> = builtin_rules()
            .into_iter()
            .filter(|r| r.cross_language())
            .map(|r| r.id())
            .collect();
        cross.sort_unstable();
        assert_eq!(
            cross,
            vec![
                "no-eval",
                "no-hardcoded-secrets",
                "no-inner-html",
                "no-insecure-http"
            ]
        );
    }

    #[test]
    fn disabled_rules_are_dropped() {
        let rules = rule_catalog(&["semi".to_string(), "quotes".to_string()]);
        assert_eq!(rules.len(), 22);
        assert!(rules.iter().all(|r| r.id() != "semi" && r.id() != "quotes"));
    }

    #[test]
    fn find_word_respects_boundaries() {
        assert_eq!(find_word("let total = subtotal", "total"), Some(4));
        assert_eq!(find_word("subtotal", "total"), None);
        assert_eq!(find_word("$el.x", "$el"), Some(0));
        assert_eq!(find_word("a_el", "el"), None);
    }

    #[test]
    fn column_counts_chars() {
        assert_eq!(byte_to_column("é = 1", 3), Some(3));
        assert_eq!(byte_to_column("abc", 10), None);
    }

    #[test]
    fn enclosing_openers_skip_balanced_blocks() {
        let file = SourceFile::new(
            "for (const x of xs) {\n  if (x) { y(); }\n  const a = [];\n}\n",
            Language::JavaScript,
        );
        let openers = enclosing_openers(&file, 2, 12, 50);
        assert_eq!(openers.len(), 1);
        assert_eq!(openers[0].0, 0);
    }
}
