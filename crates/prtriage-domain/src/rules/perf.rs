//! Performance rules.

use std::sync::LazyLock;

use regex::Regex;

use prtriage_types::{Category, IssueType, Severity};

use super::{LineContext, Rule, RuleHit, enclosing_openers, find_word};

static DOM_LOOKUP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bdocument\s*\.\s*(?:getElementById|querySelector|querySelectorAll|getElementsByClassName|getElementsByTagName|getElementsByName)\s*\([^()]*\)",
    )
    .expect("valid regex")
});

static LENGTH_LOOP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\bfor\s*\(\s*(let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*([^;,]+?)\s*;\s*([A-Za-z_$][\w$]*)\s*(<=?)\s*([A-Za-z_$][\w$.]*)\.length\s*;",
    )
    .expect("valid regex")
});

static ALLOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"=\s*\[\s*\]|=\s*\{\s*\}|\bnew\s+[A-Z][\w$]*\s*\(|\.concat\s*\(|\.slice\s*\(\s*\)|\[\s*\.\.\.|\{\s*\.\.\.",
    )
    .expect("valid regex")
});

static LOOP_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:for|while)\s*\(|\bdo\s*$|\.(?:forEach|map|filter|reduce|flatMap)\s*\(")
        .expect("valid regex")
});

// ── cache-dom-lookups ──────────────────────────────────────────

pub struct CacheDomLookups;

impl Rule for CacheDomLookups {
    fn id(&self) -> &'static str {
        "cache-dom-lookups"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn description(&self) -> &'static str {
        "Identical DOM lookup repeated instead of cached"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let code = cx.code();
        let m = DOM_LOOKUP.find(code)?;
        let call = normalize(m.as_str());
        let repeated = cx
            .before()
            .iter()
            .any(|l| DOM_LOOKUP.find_iter(&l.code).any(|p| normalize(p.as_str()) == call));
        if !repeated {
            return None;
        }
        Some(
            RuleHit::new(
                IssueType::Warning,
                Severity::Medium,
                format!("Repeated DOM lookup `{call}`"),
            )
            .at(cx.raw(), m.start())
            .suggest("Store the element in a variable and reuse it"),
        )
    }
}

fn normalize(call: &str) -> String {
    call.chars().filter(|c| !c.is_whitespace()).collect()
}

// ── loop-length-cache ──────────────────────────────────────────

pub struct LoopLengthCache;

impl Rule for LoopLengthCache {
    fn id(&self) -> &'static str {
        "loop-length-cache"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn description(&self) -> &'static str {
        "Loop condition re-reads `.length` every iteration"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let code = cx.code();
        let caps = LENGTH_LOOP.captures(code)?;
        let whole = caps.get(0)?;
        let (kw, var, init) = (&caps[1], &caps[2], &caps[3]);
        let (cond_var, op, target) = (&caps[4], &caps[5], &caps[6]);
        if var != cond_var {
            return None;
        }

        let len = ["len", "length", "n"]
            .into_iter()
            .find(|name| find_word(code, name).is_none())?;
        let raw = cx.raw();
        let fixed = format!(
            "{}for ({kw} {var} = {init}, {len} = {target}.length; {var} {op} {len};{}",
            &raw[..whole.start()],
            &raw[whole.end()..]
        );

        Some(
            RuleHit::new(
                IssueType::Warning,
                Severity::Medium,
                format!("Loop re-reads `{target}.length` on every iteration"),
            )
            .at(raw, whole.start())
            .suggest("Cache the length before the loop")
            .replace_with(fixed),
        )
    }
}

// ── no-alloc-in-loop ───────────────────────────────────────────

pub struct NoAllocInLoop;

const LOOP_SEARCH_LINES: usize = 50;

impl Rule for NoAllocInLoop {
    fn id(&self) -> &'static str {
        "no-alloc-in-loop"
    }

    fn category(&self) -> Category {
        Category::Performance
    }

    fn description(&self) -> &'static str {
        "Object or array allocated on every loop iteration"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let masked = cx.masked();
        if masked.contains("throw ") {
            return None;
        }
        let at = ALLOCATION.find(masked)?.start();
        if !inside_loop(cx, at) {
            return None;
        }
        Some(
            RuleHit::new(
                IssueType::Warning,
                Severity::High,
                "Allocation inside a loop body",
            )
            .at(cx.raw(), at)
            .suggest("Hoist the allocation out of the loop or reuse a buffer"),
        )
    }
}

fn inside_loop(cx: &LineContext<'_>, at: usize) -> bool {
    enclosing_openers(cx.file, cx.index, at, LOOP_SEARCH_LINES)
        .into_iter()
        .filter(|&(_, _, ch)| ch == b'{')
        .any(|(line_idx, byte, _)| {
            let lead = &cx.file.lines[line_idx].masked[..byte];
            if !lead.trim().is_empty() {
                return LOOP_HEADER.is_match(lead.trim_end());
            }
            // Brace on its own line: the header is the line above.
            cx.file.lines[..line_idx]
                .iter()
                .rev()
                .find(|l| !l.is_blank())
                .is_some_and(|l| LOOP_HEADER.is_match(l.masked.trim_end()))
        })
}
