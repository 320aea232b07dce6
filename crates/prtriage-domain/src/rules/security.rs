//! Security rules. Four of these run on every language.

use std::sync::LazyLock;

use regex::Regex;

use prtriage_types::{Category, IssueType, Severity};

use super::{LineContext, Rule, RuleHit};

static EVAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\beval\s*\(|\bnew\s+Function\s*\(|\bset(?:Timeout|Interval)\s*\(\s*["'`]"#)
        .expect("valid regex")
});

static HTML_SINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\.(innerHTML|outerHTML)\s*(\+?=)(?:[^=]|$)|\bdocument\s*\.\s*write(?:ln)?\s*\(|\.insertAdjacentHTML\s*\(|\bdangerouslySetInnerHTML\b",
    )
    .expect("valid regex")
});

static SQL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:select\s+[\w*.,\s]+\s+from|insert\s+into|update\s+[\w.]+\s+set|delete\s+from)\b",
    )
    .expect("valid regex")
});

static SECRET_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)[\w$]*(?:password|passwd|pwd|secret|api[_-]?key|access[_-]?key|auth[_-]?token|token|private[_-]?key)[\w$]*["']?\s*[:=]\s*["'`]([^"'`\s]{6,})["'`]"#,
    )
    .expect("valid regex")
});

static SECRET_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"AKIA[0-9A-Z]{16}|gh[pousr]_[A-Za-z0-9]{36}|sk_live_[0-9A-Za-z]{16,}|xox[baprs]-[0-9A-Za-z-]{10,}|-----BEGIN (?:RSA |EC |DSA |OPENSSH )?PRIVATE KEY-----",
    )
    .expect("valid regex")
});

static MATH_RANDOM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bMath\s*\.\s*random\s*\(").expect("valid regex"));

static HTTP_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"http://([^\s/'"`:?#]+)"#).expect("valid regex"));

const PLACEHOLDERS: &[&str] = &[
    "example", "placeholder", "changeme", "your_", "your-", "xxx", "dummy", "<", "${", "{{",
    "process.env",
];

const SECRET_WORDS: &[&str] = &[
    "token", "secret", "password", "passwd", "salt", "nonce", "session", "otp", "auth", "key",
    "csrf",
];

const LOCAL_HOSTS: &[&str] = &["localhost", "127.0.0.1", "0.0.0.0", "[", "www.w3.org"];

// ── no-eval ────────────────────────────────────────────────────

pub struct NoEval;

impl Rule for NoEval {
    fn id(&self) -> &'static str {
        "no-eval"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn description(&self) -> &'static str {
        "Dynamic code execution"
    }

    fn cross_language(&self) -> bool {
        true
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        // String-argument timers need the quote, which the masked view drops.
        let masked = cx.masked().as_bytes();
        let m = EVAL
            .find_iter(cx.code())
            .find(|m| masked[m.start()] != b' ')?;
        Some(
            RuleHit::new(
                IssueType::Error,
                Severity::High,
                "Dynamic code execution allows arbitrary code to run",
            )
            .at(cx.raw(), m.start())
            .suggest("Replace eval-style execution with explicit parsing or dispatch"),
        )
    }
}

// ── no-inner-html ──────────────────────────────────────────────

pub struct NoInnerHtml;

impl Rule for NoInnerHtml {
    fn id(&self) -> &'static str {
        "no-inner-html"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn description(&self) -> &'static str {
        "Raw HTML written into the document"
    }

    fn cross_language(&self) -> bool {
        true
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let masked = cx.masked();
        let caps = HTML_SINK.captures(masked)?;
        let whole = caps.get(0)?;
        let raw = cx.raw();
        let sink = caps.get(1).map_or_else(
            || whole.as_str().trim_end_matches(['(', ' ']).trim_start_matches('.'),
            |p| p.as_str(),
        );

        let hit = RuleHit::new(
            IssueType::Error,
            Severity::High,
            format!("Writing raw HTML through `{sink}` can lead to XSS"),
        )
        .at(raw, whole.start())
        .suggest("Assign text through textContent or sanitize the markup first");

        let plain_assign = caps.get(2).is_some_and(|op| op.as_str() == "=");
        if sink != "innerHTML" || !plain_assign {
            return Some(hit);
        }
        let prop_end = whole.start() + ".innerHTML".len();
        Some(hit.replace_with(format!(
            "{}.textContent{}",
            &raw[..whole.start()],
            &raw[prop_end..]
        )))
    }
}

// ── no-sql-injection ───────────────────────────────────────────

pub struct NoSqlInjection;

impl Rule for NoSqlInjection {
    fn id(&self) -> &'static str {
        "no-sql-injection"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn description(&self) -> &'static str {
        "SQL text built from dynamic values"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let code = cx.code();
        let m = SQL.find(code)?;
        // The keywords must sit inside a literal, not in code.
        if SQL.is_match(cx.masked()) {
            return None;
        }
        let interpolated = code.contains("${");
        let concatenated = cx.masked().replace("++", "").contains('+');
        if !interpolated && !concatenated {
            return None;
        }
        Some(
            RuleHit::new(
                IssueType::Error,
                Severity::High,
                "SQL query built from dynamic values",
            )
            .at(cx.raw(), m.start())
            .suggest("Use parameterized queries or prepared statements"),
        )
    }
}

// ── no-hardcoded-secrets ───────────────────────────────────────

pub struct NoHardcodedSecrets;

impl Rule for NoHardcodedSecrets {
    fn id(&self) -> &'static str {
        "no-hardcoded-secrets"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn description(&self) -> &'static str {
        "Credential or key embedded in source"
    }

    fn cross_language(&self) -> bool {
        true
    }

    fn inspects_comments(&self) -> bool {
        true
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let raw = cx.raw();
        let at = SECRET_TOKEN.find(raw).map(|m| m.start()).or_else(|| {
            let caps = SECRET_ASSIGNMENT.captures(raw)?;
            let value = caps.get(1)?.as_str();
            (!is_placeholder(value)).then(|| caps.get(0).map_or(0, |m| m.start()))
        })?;
        Some(
            RuleHit::new(IssueType::Error, Severity::High, "Possible hardcoded secret")
                .at(raw, at)
                .suggest("Load the value from the environment or a secret store"),
        )
    }
}

fn is_placeholder(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    if PLACEHOLDERS.iter().any(|p| lower.contains(p)) {
        return true;
    }
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|first| chars.all(|c| c == first || c == '*'))
}

// ── no-insecure-random ─────────────────────────────────────────

pub struct NoInsecureRandom;

impl Rule for NoInsecureRandom {
    fn id(&self) -> &'static str {
        "no-insecure-random"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn description(&self) -> &'static str {
        "Math.random() used for a secret-like value"
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let m = MATH_RANDOM.find(cx.masked())?;
        let lower = cx.code().to_ascii_lowercase();
        if !SECRET_WORDS.iter().any(|w| lower.contains(w)) {
            return None;
        }
        Some(
            RuleHit::new(
                IssueType::Error,
                Severity::High,
                "Math.random() is not cryptographically secure",
            )
            .at(cx.raw(), m.start())
            .suggest("Use crypto.getRandomValues() or crypto.randomBytes()"),
        )
    }
}

// ── no-insecure-http ───────────────────────────────────────────

pub struct NoInsecureHttp;

impl Rule for NoInsecureHttp {
    fn id(&self) -> &'static str {
        "no-insecure-http"
    }

    fn category(&self) -> Category {
        Category::Security
    }

    fn description(&self) -> &'static str {
        "Plaintext HTTP endpoint"
    }

    fn cross_language(&self) -> bool {
        true
    }

    fn check(&self, cx: &LineContext<'_>) -> Option<RuleHit> {
        let code = cx.code();
        if code.contains("xmlns") {
            return None;
        }
        let caps = HTTP_URL
            .captures_iter(code)
            .find(|c| !is_local_host(&c[1]))?;
        let whole = caps.get(0)?;
        let raw = cx.raw();
        let fixed = format!(
            "{}https://{}",
            &raw[..whole.start()],
            &raw[whole.start() + "http://".len()..]
        );
        Some(
            RuleHit::new(
                IssueType::Warning,
                Severity::Medium,
                format!("Insecure HTTP endpoint `{}`", whole.as_str()),
            )
            .at(raw, whole.start())
            .suggest("Use HTTPS for network endpoints")
            .replace_with(fixed),
        )
    }
}

fn is_local_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    LOCAL_HOSTS.iter().any(|h| host.starts_with(h))
        || host.ends_with(".local")
        || host.ends_with(".localhost")
        || host.ends_with(".test")
}
