//! Formatting rules.

use std::sync::LazyLock;

use regex::Regex;

use prtriage_types::{Category, IssueType, Severity};

use super::{LineContext, Rule, RuleHit, code_end, enclosing_openers, is_ident_byte};
use crate::source::string_literals;

static OBJECT_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:[\w$]+|"[^"]*"|'[^']*'|\[[^\]]*\])\??\s*:"#).expect("valid regex")
});

static REGEX_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[=(,:!&|?]|return)\s*/[^/*\s]").expect("valid regex"));

/// Line openings after which no terminator is expected.
const BLOCK_STARTS: &[&str] = &[
    "if ", "if(", "for ", "for(", "while ", "while(", "else", "switch", "function", "class ",
    "try", "catch", "finally", "do ", "do{", "case ", "default:", "@", "}", "<", "interface ",
    "enum ", "namespace ", "declare ", "async function", "export function",
    "export default ", "export class", "export interface", "export enum", "abstract class",
];

// ── semi ───────────────────────────────────────────────────────

pub struct Semi;

impl Rule for Semi {
    fn id(&self) -> &'static str {
        "semi"
    }

    fn category(&self) -> Category {
        Category::Format
    }

    fn description(&self) -> &'static str {
        "Statement without a terminating semicolon"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let code = cx.code();
        let end = code_end(code);
        let trimmed = code[..end].trim_start();
        if trimmed.is_empty() || !needs_terminator(trimmed) {
            return None;
        }

        // The line ends inside a string or template literal.
        let last = code.as_bytes()[end - 1];
        if cx.masked().as_bytes()[end - 1] == b' ' && last != b'\'' && last != b'"' {
            return None;
        }

        if let Some(next) = cx.next_code_line() {
            let next = next.code.trim_start();
            let continues = [".", "?", ":", "+", "-", "*", "/", "&&", "||", ")", "]", "=", ",", "(", "["]
                .iter()
                .any(|p| next.starts_with(p));
            if continues {
                return None;
            }
        }

        let raw = cx.raw();
        let fixed = format!("{};{}", &raw[..end], &raw[end..]);
        Some(
            RuleHit::new(IssueType::Warning, Severity::Low, "Missing semicolon")
                .at(raw, end)
                .replace_with(fixed),
        )
    }
}

fn needs_terminator(trimmed: &str) -> bool {
    if BLOCK_STARTS.iter().any(|s| trimmed.starts_with(s)) || OBJECT_KEY.is_match(trimmed) {
        return false;
    }
    if trimmed.ends_with("++") || trimmed.ends_with("--") {
        return true;
    }
    trimmed
        .bytes()
        .last()
        .is_some_and(|b| is_ident_byte(b) || matches!(b, b')' | b']' | b'\'' | b'"'))
}

// ── max-len ────────────────────────────────────────────────────

pub struct MaxLen;

impl Rule for MaxLen {
    fn id(&self) -> &'static str {
        "max-len"
    }

    fn category(&self) -> Category {
        Category::Format
    }

    fn description(&self) -> &'static str {
        "Line longer than the configured budget"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let raw = cx.raw();
        let max = cx.settings.max_line_length as usize;
        let len = raw.chars().count();
        if len <= max {
            return None;
        }

        let limit = raw.char_indices().nth(max).map_or(raw.len(), |(i, _)| i);
        let hit = RuleHit::new(
            IssueType::Info,
            Severity::Low,
            format!("Line exceeds {max} characters ({len})"),
        )
        .at(raw, limit)
        .suggest("Break the line at a logical operator or argument boundary");

        match break_point(cx, limit) {
            Some(cut) => {
                let first = raw[..cut].trim_end();
                let second = raw[cut..].trim_start();
                if first.trim().is_empty() || second.is_empty() {
                    return Some(hit);
                }
                Some(hit.replace_with(format!("{first}\n{}  {second}", cx.indent())))
            }
            None => Some(hit),
        }
    }
}

/// Where to split an overlong line: after `&&`/`||`, else after `,`, else at a space.
fn break_point(cx: &LineContext<'_>, limit: usize) -> Option<usize> {
    let masked = cx.masked();
    let indent = cx.indent().len();
    let lo = indent + cx.raw().get(indent..)?.chars().next()?.len_utf8();
    if lo >= limit {
        return None;
    }
    // Masking may not keep multibyte boundaries.
    let window = masked.get(lo..limit)?;

    let logical = [window.rfind("&&"), window.rfind("||")]
        .into_iter()
        .flatten()
        .max();
    if let Some(at) = logical {
        return Some(lo + at + 2);
    }
    if let Some(at) = window.rfind(',') {
        return Some(lo + at + 1);
    }

    // Spaces inside literals are not break points.
    if cx.code().contains('`') {
        return None;
    }
    let literals = string_literals(cx.line());
    let raw = cx.raw().as_bytes();
    (lo..limit)
        .rev()
        .find(|&i| raw[i] == b' ' && !literals.iter().any(|l| l.start < i && i < l.end))
}

// ── quotes ─────────────────────────────────────────────────────

pub struct Quotes;

impl Rule for Quotes {
    fn id(&self) -> &'static str {
        "quotes"
    }

    fn category(&self) -> Category {
        Category::Format
    }

    fn description(&self) -> &'static str {
        "String literal using the file's minority quote style"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let dominant = cx.file.dominant_quote?;
        let raw = cx.raw();
        let convertible: Vec<_> = string_literals(cx.line())
            .into_iter()
            .filter(|l| l.quote != dominant)
            .filter(|l| {
                let content = l.content(raw);
                !content.contains(dominant) && !content.contains('\\')
            })
            .collect();
        let first = convertible.first()?;

        let mut fixed = raw.to_string();
        for lit in convertible.iter().rev() {
            let swapped = format!("{dominant}{}{dominant}", lit.content(raw));
            fixed.replace_range(lit.start..lit.end, &swapped);
        }

        let style = if dominant == '\'' { "single" } else { "double" };
        Some(
            RuleHit::new(
                IssueType::Info,
                Severity::Low,
                format!("Strings must use {style} quotes"),
            )
            .at(raw, first.start)
            .replace_with(fixed),
        )
    }
}

// ── comma-dangle ───────────────────────────────────────────────

pub struct CommaDangle;

const OPENER_SEARCH_LINES: usize = 100;

impl Rule for CommaDangle {
    fn id(&self) -> &'static str {
        "comma-dangle"
    }

    fn category(&self) -> Category {
        Category::Format
    }

    fn description(&self) -> &'static str {
        "Last element of a multi-line literal without a trailing comma"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let code = cx.code();
        let end = code_end(code);
        let trimmed = code[..end].trim_start();
        if trimmed.is_empty() || trimmed.starts_with("...") {
            return None;
        }
        if trimmed.ends_with([',', '{', '[', '(', ';', ':', '=', '>']) {
            return None;
        }

        let next = cx.next_code_line()?.code.trim_start();
        if !next.starts_with('}') && !next.starts_with(']') {
            return None;
        }

        let (line_idx, at, opener) =
            *enclosing_openers(cx.file, cx.index, end, OPENER_SEARCH_LINES).first()?;
        let literal = opener == b'[' || {
            let lead = cx.file.lines[line_idx].masked[..at].trim_end();
            lead.ends_with(['=', '(', ':', ',', '[']) || lead.ends_with("return")
        };
        if !literal {
            return None;
        }

        let raw = cx.raw();
        let fixed = format!("{},{}", &raw[..end], &raw[end..]);
        Some(
            RuleHit::new(IssueType::Info, Severity::Low, "Missing trailing comma")
                .at(raw, end)
                .replace_with(fixed),
        )
    }
}

// ── space-infix-ops ────────────────────────────────────────────

pub struct SpaceInfixOps;

/// Operators consumed by the scanner, longest first. `true` marks the ones that need spacing.
const OPERATORS: &[(&str, bool)] = &[
    ("===", true),
    ("!==", true),
    ("**=", false),
    ("...", false),
    ("<<=", false),
    (">>=", false),
    (">>>", false),
    ("==", true),
    ("!=", true),
    ("<=", true),
    (">=", true),
    ("&&", true),
    ("||", true),
    ("+=", true),
    ("-=", true),
    ("*=", false),
    ("/=", false),
    ("%=", false),
    ("=>", false),
    ("++", false),
    ("--", false),
    ("**", false),
    ("?.", false),
    ("??", false),
    ("<<", false),
    (">>", false),
    ("=", true),
    ("+", true),
    ("*", true),
];

impl Rule for SpaceInfixOps {
    fn id(&self) -> &'static str {
        "space-infix-ops"
    }

    fn category(&self) -> Category {
        Category::Format
    }

    fn description(&self) -> &'static str {
        "Infix operator without surrounding spaces"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let masked = cx.masked();
        let t = masked.trim_start();
        if t.starts_with('<')
            || masked.contains("</")
            || masked.contains("/>")
            || t.starts_with("import ")
            || REGEX_LITERAL.is_match(masked)
        {
            return None;
        }

        let bad = unspaced_operators(masked);
        let &(first, first_len) = bad.first()?;
        let raw = cx.raw();
        let op = &raw[first..first + first_len];

        let mut fixed = raw.to_string();
        for &(at, len) in bad.iter().rev() {
            let end = at + len;
            if end < fixed.len() && fixed.as_bytes()[end] != b' ' {
                fixed.insert(end, ' ');
            }
            if at > 0 && fixed.as_bytes()[at - 1] != b' ' {
                fixed.insert(at, ' ');
            }
        }

        Some(
            RuleHit::new(
                IssueType::Info,
                Severity::Low,
                format!("Operator '{op}' must be spaced"),
            )
            .at(raw, first)
            .replace_with(fixed),
        )
    }
}

/// `(offset, len)` of every spacing-sensitive binary operator lacking a space on either side.
pub(crate) fn unspaced_operators(masked: &str) -> Vec<(usize, usize)> {
    let b = masked.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i < b.len() {
        let Some(&(op, checked)) = OPERATORS
            .iter()
            .find(|(op, _)| b[i..].starts_with(op.as_bytes()))
        else {
            i += 1;
            continue;
        };
        let len = op.len();
        if checked && !is_unary(b, i, op) {
            let before_ok = i == 0 || b[i - 1] == b' ' || b[..i].iter().all(|c| *c == b' ');
            let after_ok = i + len >= b.len() || b[i + len] == b' ';
            if !before_ok || !after_ok {
                out.push((i, len));
            }
        }
        i += len;
    }
    out
}

fn is_unary(b: &[u8], i: usize, op: &str) -> bool {
    if op != "+" && op != "*" {
        return false;
    }
    let before = std::str::from_utf8(&b[..i]).unwrap_or("").trim_end();
    let Some(prev) = before.bytes().last() else {
        return true;
    };
    if op == "*" {
        // `function*`, `yield*`, `import * as`
        return before.ends_with("function") || before.ends_with("yield") || prev == b'{';
    }
    // Exponent inside a numeric literal: `1e+5`.
    if matches!(prev, b'e' | b'E') {
        let digits = before[..before.len() - 1].bytes().last();
        if digits.is_some_and(|d| d.is_ascii_digit()) {
            return true;
        }
    }
    matches!(
        prev,
        b'(' | b'[' | b'{' | b',' | b'=' | b':' | b'?' | b'!' | b'&' | b'|' | b'+' | b'-' | b'*'
            | b'/' | b'%' | b'<' | b'>' | b';'
    ) || before.ends_with("return")
        || before.ends_with("typeof")
        || before.ends_with("case")
}

// ── no-multiple-empty-lines ────────────────────────────────────

pub struct NoMultipleEmptyLines;

impl Rule for NoMultipleEmptyLines {
    fn id(&self) -> &'static str {
        "no-multiple-empty-lines"
    }

    fn category(&self) -> Category {
        Category::Format
    }

    fn description(&self) -> &'static str {
        "More than one consecutive blank line"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let prev_blank = cx.before().last().is_some_and(|l| l.is_blank());
        if !cx.line().is_blank() || !prev_blank {
            return None;
        }
        Some(
            RuleHit::new(
                IssueType::Info,
                Severity::Low,
                "More than 1 blank line not allowed",
            )
            .suggest("Remove the extra blank line"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::Language;
    use crate::source::SourceFile;
    use prtriage_types::AnalysisConfig;

    fn check_with(rule: &dyn Rule, src: &str, line_no: usize, settings: &AnalysisConfig) -> Option<RuleHit> {
        let file = SourceFile::new(src, Language::JavaScript);
        rule.check(&LineContext {
            file: &file,
            index: line_no - 1,
            settings,
        })
    }

    fn check_line(rule: &dyn Rule, src: &str, line_no: usize) -> Option<RuleHit> {
        check_with(rule, src, line_no, &AnalysisConfig::default())
    }

    fn fix(rule: &dyn Rule, src: &str, line_no: usize) -> Option<String> {
        check_line(rule, src, line_no)?.suggested_code
    }

    #[test]
    fn semi_appends_before_trailing_comment() {
        assert_eq!(
            fix(&Semi, "const a = 1 // one\n", 1).as_deref(),
            Some("const a = 1; // one")
        );
        assert_eq!(fix(&Semi, "i++\n", 1).as_deref(), Some("i++;"));
        assert_eq!(fix(&Semi, "go('x')\n", 1).as_deref(), Some("go('x');"));
    }

    #[test]
    fn semi_skips_blocks_and_continuations() {
        assert!(check_line(&Semi, "if (a) {\n", 1).is_none());
        assert!(check_line(&Semi, "const a = 1;\n", 1).is_none());
        assert!(check_line(&Semi, "fetch(url)\n  .then(done);\n", 1).is_none());
        assert!(check_line(&Semi, "const o = {\n  a: 1\n};\n", 2).is_none());
        assert!(check_line(&Semi, "f(\n  a,\n  b\n);\n", 3).is_none());
        assert!(check_line(&Semi, "const q = `a\n  b\n`;\n", 2).is_none());
        assert!(check_line(&Semi, "\n", 1).is_none());
    }

    #[test]
    fn semi_skips_default_exports() {
        assert!(check_line(&Semi, "export default App\n", 1).is_none());
        assert!(check_line(&Semi, "export default router\n", 1).is_none());
        assert!(check_line(&Semi, "export default function App() {\n", 1).is_none());
        assert_eq!(
            fix(&Semi, "export const app = create()\n", 1).as_deref(),
            Some("export const app = create();")
        );
    }

    #[test]
    fn max_len_breaks_at_logical_operator() {
        let settings = AnalysisConfig {
            max_line_length: 30,
            ..AnalysisConfig::default()
        };
        let src = "  if (alpha && beta && gamma && delta) {\n";
        let hit = check_with(&MaxLen, src, 1, &settings).unwrap();
        assert_eq!(hit.message, "Line exceeds 30 characters (40)");
        assert_eq!(
            hit.suggested_code.as_deref(),
            Some("  if (alpha && beta &&\n    gamma && delta) {")
        );
    }

    #[test]
    fn max_len_falls_back_to_comma_then_space() {
        let settings = AnalysisConfig {
            max_line_length: 20,
            ..AnalysisConfig::default()
        };
        let hit = check_with(&MaxLen, "call(first, second, third);\n", 1, &settings).unwrap();
        assert_eq!(
            hit.suggested_code.as_deref(),
            Some("call(first, second,\n  third);")
        );

        let hit = check_with(&MaxLen, "const value = compute(x);\n", 1, &settings).unwrap();
        assert_eq!(
            hit.suggested_code.as_deref(),
            Some("const value =\n  compute(x);")
        );
        assert!(check_with(&MaxLen, "short();\n", 1, &settings).is_none());
    }

    #[test]
    fn max_len_handles_multibyte_line_start() {
        let settings = AnalysisConfig {
            max_line_length: 30,
            ..AnalysisConfig::default()
        };
        let src = "  ñandú = compute(first, second);\n";
        let hit = check_with(&MaxLen, src, 1, &settings).unwrap();
        assert_eq!(
            hit.suggested_code.as_deref(),
            Some("  ñandú = compute(first,\n    second);")
        );

        let long = format!("ñ{};\n", "x".repeat(50));
        assert!(check_with(&MaxLen, &long, 1, &settings).unwrap().suggested_code.is_none());
    }

    #[test]
    fn quotes_follow_the_majority() {
        let src = "a('x');\nb('y');\nc(\"z\");\n";
        let hit = check_line(&Quotes, src, 3).unwrap();
        assert_eq!(hit.message, "Strings must use single quotes");
        assert_eq!(hit.suggested_code.as_deref(), Some("c('z');"));
        assert!(check_line(&Quotes, src, 1).is_none());
    }

    #[test]
    fn quotes_leave_literals_that_contain_the_other_quote() {
        let src = "a('x');\nb('y');\nc(\"it's\");\n";
        assert!(check_line(&Quotes, src, 3).is_none());
    }

    #[test]
    fn comma_dangle_in_object_and_array() {
        let obj = "const o = {\n  a: 1,\n  b: 2\n};\n";
        assert_eq!(fix(&CommaDangle, obj, 3).as_deref(), Some("  b: 2,"));
        let arr = "const xs = [\n  1,\n  2\n];\n";
        assert_eq!(fix(&CommaDangle, arr, 3).as_deref(), Some("  2,"));
    }

    #[test]
    fn comma_dangle_ignores_blocks_and_rest() {
        assert!(check_line(&CommaDangle, "if (a) {\n  run()\n}\n", 2).is_none());
        assert!(check_line(&CommaDangle, "const {\n  a,\n  ...rest\n} = o;\n", 3).is_none());
    }

    #[test]
    fn unspaced_operator_positions() {
        assert_eq!(unspaced_operators("a=b"), vec![(1, 1)]);
        assert_eq!(unspaced_operators("x === y&&z"), vec![(7, 2)]);
        assert!(unspaced_operators("a = b + c").is_empty());
        assert!(unspaced_operators("i++; x => x; f(...args)").is_empty());
        assert!(unspaced_operators("f(+x, -y)").is_empty());
        assert!(unspaced_operators("function* gen() {}").is_empty());
        assert!(unspaced_operators("const n = 1e+5;").is_empty());
    }

    #[test]
    fn space_infix_fix_inserts_spaces() {
        assert_eq!(
            fix(&SpaceInfixOps, "let total=a+b;\n", 1).as_deref(),
            Some("let total = a + b;")
        );
        assert!(check_line(&SpaceInfixOps, "return <div className=\"x\" />;\n", 1).is_none());
    }

    #[test]
    fn multiple_blank_lines() {
        let src = "a();\n\n\nb();\n";
        assert!(check_line(&NoMultipleEmptyLines, src, 2).is_none());
        let hit = check_line(&NoMultipleEmptyLines, src, 3).unwrap();
        assert!(hit.suggested_code.is_none());
    }
}
