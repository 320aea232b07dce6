//! Lint and best-practice rules for JavaScript and TypeScript.

use std::sync::LazyLock;

use regex::Regex;

use prtriage_types::{Category, IssueType, Severity};

use super::{LineContext, Rule, RuleHit, code_end, find_word, find_word_from, is_ident_byte};
use crate::source::{SourceLine, string_literals};

static CONSOLE_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bconsole\s*\.\s*(log|debug|trace|dir)\s*\(").expect("valid regex")
});

static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=").expect("valid regex")
});

static LET_DECLARATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*let\s+([A-Za-z_$][\w$]*)\s*=").expect("valid regex"));

static AWAIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bawait\b").expect("valid regex"));
static TRY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\btry\b").expect("valid regex"));
static CATCH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bcatch\b").expect("valid regex"));

static CONSTANT_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?const\s+[A-Z][A-Z0-9_]*\s*=").expect("valid regex")
});

static FUNCTION_CALLBACK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[(,]\s*((?:async\s+)?)function\s*\(([^)]*)\)\s*\{").expect("valid regex")
});

static FUNCTION_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s*([A-Za-z_$][\w$]*)\s*\(",
    )
    .expect("valid regex")
});

static CLASS_DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)")
        .expect("valid regex")
});

static SIMPLE_OPERAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_$][\w$]*(?:\.[A-Za-z_$][\w$]*|\[[\w$.]+\]|\(\))*$").expect("valid regex")
});

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "this", "that", "from", "are", "was", "not", "you", "your",
    "has", "have", "but", "into", "its",
];

// ── no-console ─────────────────────────────────────────────────

pub struct NoConsole;

impl Rule for NoConsole {
    fn id(&self) -> &'static str {
        "no-console"
    }

    fn category(&self) -> Category {
        Category::BestPractice
    }

    fn description(&self) -> &'static str {
        "Debug output left in code (console.log/debug/trace/dir)"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let caps = CONSOLE_CALL.captures(cx.masked())?;
        let call = caps.get(0)?;
        let method = caps.get(1).map_or("log", |m| m.as_str());

        let hit = RuleHit::new(
            IssueType::Warning,
            Severity::Medium,
            format!("Unexpected console.{method} call"),
        )
        .at(cx.raw(), call.start())
        .suggest("Remove debug output before merging or route it through a logger");

        // Commenting out only works when the whole call sits on this line.
        let masked = cx.masked();
        if masked.matches('(').count() == masked.matches(')').count() {
            let commented = format!("{}// {}", cx.indent(), cx.raw().trim());
            Some(hit.replace_with(commented))
        } else {
            Some(hit)
        }
    }
}

// ── no-unused-vars ─────────────────────────────────────────────

pub struct NoUnusedVars;

impl Rule for NoUnusedVars {
    fn id(&self) -> &'static str {
        "no-unused-vars"
    }

    fn category(&self) -> Category {
        Category::Lint
    }

    fn description(&self) -> &'static str {
        "Variable declared but never referenced afterwards"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let caps = DECLARATION.captures(cx.masked())?;
        let name_m = caps.get(1)?;
        let name = name_m.as_str();
        if name.starts_with('_') {
            return None;
        }

        let tail = &cx.code()[caps.get(0)?.end()..];
        let used_later = find_word(tail, name).is_some()
            || cx.rest().iter().any(|l| find_word(&l.code, name).is_some());
        let used_before = cx.before().iter().any(|l| find_word(&l.code, name).is_some());
        if used_later || used_before {
            return None;
        }

        let raw = cx.raw();
        let renamed = format!("{}_{}", &raw[..name_m.start()], &raw[name_m.start()..]);
        Some(
            RuleHit::new(
                IssueType::Warning,
                Severity::Low,
                format!("'{name}' is assigned a value but never used"),
            )
            .at(raw, name_m.start())
            .suggest("Remove the variable or prefix it with `_` to mark it intentionally unused")
            .replace_with(renamed),
        )
    }
}

// ── prefer-const ───────────────────────────────────────────────

pub struct PreferConst;

impl Rule for PreferConst {
    fn id(&self) -> &'static str {
        "prefer-const"
    }

    fn category(&self) -> Category {
        Category::Lint
    }

    fn description(&self) -> &'static str {
        "`let` binding that is never reassigned"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let masked = cx.masked();
        let caps = LET_DECLARATION.captures(masked)?;
        let decl = caps.get(0)?;
        let name = caps.get(1)?.as_str();

        if has_top_level_comma(&masked[decl.end()..]) {
            return None;
        }
        if is_reassigned(&masked[decl.end()..], name)
            || cx.rest().iter().any(|l| is_reassigned(&l.masked, name))
        {
            return None;
        }

        let raw = cx.raw();
        let let_at = masked.find("let")?;
        let fixed = format!("{}const{}", &raw[..let_at], &raw[let_at + 3..]);
        Some(
            RuleHit::new(
                IssueType::Warning,
                Severity::Low,
                format!("'{name}' is never reassigned; use 'const' instead"),
            )
            .at(raw, let_at)
            .replace_with(fixed),
        )
    }
}

fn has_top_level_comma(s: &str) -> bool {
    let mut depth = 0i32;
    for b in s.bytes() {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b',' if depth == 0 => return true,
            _ => {}
        }
    }
    false
}

/// `name` appears as an assignment target or increment operand.
fn is_reassigned(masked: &str, name: &str) -> bool {
    let mut from = 0;
    while let Some(at) = find_word_from(masked, name, from) {
        let end = at + name.len();
        from = end;

        let before = masked[..at].trim_end();
        if before.ends_with("++") || before.ends_with("--") {
            return true;
        }

        let after = masked[end..].trim_start();
        let ab = after.as_bytes();
        if after.starts_with("++") || after.starts_with("--") {
            return true;
        }
        // Compound assignment: `+=`, `**=`, `??=`, `>>>=` and friends.
        let op_len = ab
            .iter()
            .take_while(|b| b"+-*/%&|^<>?".contains(b))
            .count();
        let next = ab.get(op_len + 1);
        if ab.get(op_len) == Some(&b'=') && next != Some(&b'=') && next != Some(&b'>') {
            let op = &after[..op_len];
            // `<=`, `>=` are comparisons.
            if op != "<" && op != ">" {
                return true;
            }
        }
    }
    false
}

// ── eqeqeq ─────────────────────────────────────────────────────

pub struct Eqeqeq;

impl Rule for Eqeqeq {
    fn id(&self) -> &'static str {
        "eqeqeq"
    }

    fn category(&self) -> Category {
        Category::Lint
    }

    fn description(&self) -> &'static str {
        "Loose equality (`==`, `!=`)"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let ops = loose_equality_ops(cx.masked());
        let first = *ops.first()?;
        let raw = cx.raw();
        let op = &raw[first..first + 2];
        let strict = if op == "==" { "===" } else { "!==" };

        let mut fixed = raw.to_string();
        for &at in ops.iter().rev() {
            fixed.insert(at + 2, '=');
        }

        Some(
            RuleHit::new(
                IssueType::Warning,
                Severity::Medium,
                format!("Expected '{strict}' and instead saw '{op}'"),
            )
            .at(raw, first)
            .suggest("Use strict equality to avoid type coercion")
            .replace_with(fixed),
        )
    }
}

/// Byte offsets of every `==` / `!=` that is not already strict.
pub(crate) fn loose_equality_ops(masked: &str) -> Vec<usize> {
    let b = masked.as_bytes();
    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < b.len() {
        let is_candidate = (b[i] == b'=' || b[i] == b'!') && b[i + 1] == b'=';
        if !is_candidate {
            i += 1;
            continue;
        }
        if b.get(i + 2) == Some(&b'=') {
            i += 3;
            continue;
        }
        let prev_ok = i == 0 || !matches!(b[i - 1], b'=' | b'!' | b'<' | b'>');
        if b[i] == b'!' || prev_ok {
            out.push(i);
        }
        i += 2;
    }
    out
}

// ── require-await-catch ────────────────────────────────────────

pub struct RequireAwaitCatch;

const AWAIT_WINDOW: usize = 10;

impl Rule for RequireAwaitCatch {
    fn id(&self) -> &'static str {
        "require-await-catch"
    }

    fn category(&self) -> Category {
        Category::BestPractice
    }

    fn description(&self) -> &'static str {
        "Awaited call with no try/catch nearby"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let masked = cx.masked();
        let at = AWAIT.find(masked)?.start();
        if masked.contains(".catch(") || masked.contains("for await") {
            return None;
        }

        let window = cx.window(AWAIT_WINDOW);
        let has_try = window.iter().any(|l| TRY.is_match(&l.masked));
        let has_catch = window.iter().any(|l| CATCH.is_match(&l.masked));
        if has_try && has_catch {
            return None;
        }

        let hit = RuleHit::new(
            IssueType::Warning,
            Severity::Medium,
            "Awaited call has no error handling",
        )
        .at(cx.raw(), at)
        .suggest("Wrap the call in try/catch or attach a .catch() handler");

        let trimmed = cx.raw().trim();
        let declares = ["const ", "let ", "var "]
            .iter()
            .any(|kw| trimmed.starts_with(kw));
        if declares || !cx.code().trim_end().ends_with(';') {
            return Some(hit);
        }

        let ind = cx.indent();
        let wrapped = format!(
            "{ind}try {{\n{ind}  {trimmed}\n{ind}}} catch (error) {{\n{ind}  console.error(error);\n{ind}}}"
        );
        Some(hit.replace_with(wrapped))
    }
}

// ── no-magic-strings ───────────────────────────────────────────

pub struct NoMagicStrings;

impl Rule for NoMagicStrings {
    fn id(&self) -> &'static str {
        "no-magic-strings"
    }

    fn category(&self) -> Category {
        Category::BestPractice
    }

    fn description(&self) -> &'static str {
        "Long inline string literal that belongs in a named constant"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let code = cx.code();
        if CONSTANT_DECLARATION.is_match(cx.masked())
            || code.contains("require(")
            || code.trim_start().starts_with("import ")
        {
            return None;
        }

        let raw = cx.raw();
        let min_len = cx.settings.min_constant_string_len as usize;
        let lit = string_literals(cx.line())
            .into_iter()
            .find(|l| l.content(raw).chars().count() >= min_len)?;

        let name = constant_name(lit.content(raw));
        let hit = RuleHit::new(
            IssueType::Info,
            Severity::Low,
            "String literal should be extracted to a named constant",
        )
        .at(raw, lit.start)
        .suggest(format!("Extract the literal into `const {name}`"));

        // A hoisted declaration is only valid at a statement boundary.
        let at_boundary = cx
            .before()
            .iter()
            .rev()
            .find(|l| !l.is_blank() && !l.is_comment())
            .is_none_or(|l| {
                let end = l.code.trim_end();
                end.is_empty() || end.ends_with(';') || end.ends_with('{') || end.ends_with('}')
            });
        if !at_boundary {
            return Some(hit);
        }

        let replaced = format!("{}{}{}", &raw[..lit.start], name, &raw[lit.end..]);
        let hoisted = format!(
            "{}const {} = {};\n{}",
            cx.indent(),
            name,
            lit.text(raw),
            replaced
        );
        Some(hit.replace_with(hoisted))
    }
}

/// Upper-snake name built from the first significant words of a literal.
pub(crate) fn constant_name(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| w.len() >= 3)
        .filter(|w| w.chars().next().is_some_and(|c| c.is_ascii_alphabetic()))
        .filter(|w| !STOP_WORDS.contains(&w.to_ascii_lowercase().as_str()))
        .take(3)
        .map(|w| w.to_ascii_uppercase())
        .collect();
    if words.is_empty() {
        "MESSAGE".to_string()
    } else {
        words.join("_")
    }
}

// ── prefer-arrow-callback ──────────────────────────────────────

pub struct PreferArrowCallback;

const CALLBACK_BODY_LIMIT: usize = 50;

impl Rule for PreferArrowCallback {
    fn id(&self) -> &'static str {
        "prefer-arrow-callback"
    }

    fn category(&self) -> Category {
        Category::BestPractice
    }

    fn description(&self) -> &'static str {
        "Anonymous `function` passed as a callback"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let masked = cx.masked();
        let caps = FUNCTION_CALLBACK.captures(masked)?;
        let whole = caps.get(0)?;
        let header_start = caps.get(1)?.start();
        if body_mentions(cx, whole.end() - 1, &["this", "arguments"]) {
            return None;
        }

        let raw = cx.raw();
        let params = caps.get(2)?.range();
        let async_kw = caps.get(1)?.as_str();
        let fixed = format!(
            "{}{}({}) => {{{}",
            &raw[..header_start],
            async_kw,
            &raw[params],
            &raw[whole.end()..]
        );
        Some(
            RuleHit::new(
                IssueType::Info,
                Severity::Low,
                "Unexpected function expression as callback",
            )
            .at(raw, header_start)
            .suggest("Use an arrow function")
            .replace_with(fixed),
        )
    }
}

/// Whether the block opening at `open` on the current line mentions any of `words`.
fn body_mentions(cx: &LineContext<'_>, open: usize, words: &[&str]) -> bool {
    let lines: Vec<&SourceLine> = std::iter::once(cx.line())
        .chain(cx.rest().iter())
        .take(CALLBACK_BODY_LIMIT)
        .collect();

    let mut depth = 0i32;
    for (n, line) in lines.iter().enumerate() {
        let start = if n == 0 { open } else { 0 };
        let masked = &line.masked;
        let mut end = masked.len();
        for (j, b) in masked.bytes().enumerate().skip(start) {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = j;
                        break;
                    }
                }
                _ => {}
            }
        }
        let segment = masked.get(start..end).unwrap_or("");
        if words.iter().any(|w| find_word(segment, w).is_some()) {
            return true;
        }
        if depth <= 0 {
            return false;
        }
    }
    false
}

// ── require-jsdoc ──────────────────────────────────────────────

pub struct RequireJsdoc;

impl Rule for RequireJsdoc {
    fn id(&self) -> &'static str {
        "require-jsdoc"
    }

    fn category(&self) -> Category {
        Category::BestPractice
    }

    fn description(&self) -> &'static str {
        "Function or class declaration without a doc block"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let masked = cx.masked();
        let (kind, name_m) = if let Some(c) = FUNCTION_DECLARATION.captures(masked) {
            ("function", c.get(1)?)
        } else if let Some(c) = CLASS_DECLARATION.captures(masked) {
            ("class", c.get(1)?)
        } else {
            return None;
        };

        if let Some(prev) = cx.prev_non_blank() {
            let prev = prev.raw.trim();
            if prev.ends_with("*/") || prev.starts_with('@') {
                return None;
            }
        }

        let name = name_m.as_str();
        let ind = cx.indent();
        let summary = if kind == "class" {
            format!("Describe the `{name}` class.")
        } else {
            format!("Describe what `{name}` does.")
        };
        let documented = format!("{ind}/**\n{ind} * {summary}\n{ind} */\n{}", cx.raw());

        Some(
            RuleHit::new(
                IssueType::Info,
                Severity::Low,
                format!("Missing JSDoc comment for {kind} '{name}'"),
            )
            .at(cx.raw(), name_m.start())
            .replace_with(documented),
        )
    }
}

// ── prefer-template ────────────────────────────────────────────

pub struct PreferTemplate;

impl Rule for PreferTemplate {
    fn id(&self) -> &'static str {
        "prefer-template"
    }

    fn category(&self) -> Category {
        Category::Lint
    }

    fn description(&self) -> &'static str {
        "String concatenation that reads better as a template literal"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let raw = cx.raw();
        let masked = cx.masked();
        let literals = string_literals(cx.line());
        let concat_at = literals
            .iter()
            .find(|lit| concatenated_with_value(masked, lit.start, lit.end))?
            .start;

        let hit = RuleHit::new(IssueType::Info, Severity::Low, "Unexpected string concatenation")
            .at(raw, concat_at)
            .suggest("Use a template literal");

        match template_rewrite(cx, &literals) {
            Some(fixed) => Some(hit.replace_with(fixed)),
            None => Some(hit),
        }
    }
}

fn concatenated_with_value(masked: &str, start: usize, end: usize) -> bool {
    let after = masked[end..].trim_start();
    if let Some(rest) = after.strip_prefix('+')
        && !rest.starts_with('+')
        && rest
            .trim_start()
            .bytes()
            .next()
            .is_some_and(|b| is_ident_byte(b) || b == b'(')
    {
        return true;
    }

    let before = masked[..start].trim_end();
    if let Some(rest) = before.strip_suffix('+')
        && !rest.ends_with('+')
    {
        let rest = rest.trim_end();
        return rest
            .bytes()
            .last()
            .is_some_and(|b| is_ident_byte(b) || b == b')' || b == b']');
    }
    false
}

/// Rewrite `x = 'a' + b + 'c';` (or `return ...`) into a template literal.
fn template_rewrite(
    cx: &LineContext<'_>,
    literals: &[crate::source::StringLiteral],
) -> Option<String> {
    let raw = cx.raw();
    let masked = cx.masked();
    let expr_start = expression_start(masked)?;
    let mut expr_end = code_end(masked);
    if masked[..expr_end].ends_with(';') {
        expr_end -= 1;
    }
    if expr_start >= expr_end {
        return None;
    }

    // Split on top-level `+`.
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut part_start = expr_start;
    for (i, b) in masked.bytes().enumerate().take(expr_end).skip(expr_start) {
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth -= 1,
            b'+' if depth == 0 => {
                parts.push((part_start, i));
                part_start = i + 1;
            }
            _ => {}
        }
    }
    parts.push((part_start, expr_end));

    let mut body = String::new();
    let mut saw_literal = false;
    let mut saw_value = false;
    let mut prev_value = false;
    for (s, e) in parts {
        let text = raw[s..e].trim();
        let lead = s + (raw[s..e].len() - raw[s..e].trim_start().len());
        if let Some(lit) = literals
            .iter()
            .find(|l| l.start == lead && l.end == lead + text.len())
        {
            let content = lit.content(raw);
            let content = content
                .replace("\\'", "'")
                .replace("\\\"", "\"")
                .replace('`', "\\`")
                .replace("${", "\\${");
            body.push_str(&content);
            saw_literal = true;
            prev_value = false;
        } else if SIMPLE_OPERAND.is_match(text) {
            // `a + b + 'x'` adds numerically before concatenating.
            if prev_value || (!saw_literal && saw_value) {
                return None;
            }
            body.push_str("${");
            body.push_str(text);
            body.push('}');
            saw_value = true;
            prev_value = true;
        } else {
            return None;
        }
    }
    if !(saw_literal && saw_value) {
        return None;
    }

    let lead = &raw[..expr_start];
    let sep = if lead.ends_with(' ') || lead.ends_with('(') {
        ""
    } else {
        " "
    };
    Some(format!("{lead}{sep}`{body}`{}", &raw[expr_end..]))
}

/// Byte offset just past the assignment `=` or `return` keyword that starts the expression.
fn expression_start(masked: &str) -> Option<usize> {
    let trimmed = masked.trim_start();
    let lead = masked.len() - trimmed.len();
    if trimmed.starts_with("return ") {
        return Some(lead + "return".len());
    }

    let b = masked.as_bytes();
    (0..b.len()).find_map(|i| {
        let assign = b[i] == b'='
            && b.get(i + 1).is_none_or(|n| *n != b'=' && *n != b'>')
            && (i == 0 || !matches!(b[i - 1], b'=' | b'!' | b'<' | b'>'));
        assign.then_some(i + 1)
    })
}
