use std::collections::BTreeSet;
use std::path::Path;

/// One file's slice of a multi-file `git diff`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileDiff {
    pub path: String,
    pub changed_lines: BTreeSet<u32>,
    pub additions: u32,
    pub deletions: u32,
    /// The new side is `/dev/null`.
    pub deleted: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DiffParseError {
    #[error("malformed hunk header: {0}")]
    MalformedHunkHeader(String),
}

/// Line counter over the new revision, driven one patch line at a time.
#[derive(Debug, Default)]
struct HunkCursor {
    /// Number of the last new-revision line passed over.
    line: u32,
    in_hunk: bool,
}

enum LineKind {
    Added,
    Removed,
    Context,
    Other,
}

impl HunkCursor {
    fn start_hunk(&mut self, new_start: u32) {
        self.line = new_start.saturating_sub(1);
        self.in_hunk = true;
    }

    fn suspend(&mut self) {
        self.in_hunk = false;
    }

    /// Advance over one body line. Returns the new-revision line number for added lines.
    fn step(&mut self, raw: &str) -> (LineKind, Option<u32>) {
        if !self.in_hunk {
            return (LineKind::Other, None);
        }

        match raw.as_bytes().first() {
            Some(b'+') => {
                self.line = self.line.saturating_add(1);
                (LineKind::Added, Some(self.line))
            }
            Some(b'-') => (LineKind::Removed, None),
            Some(b' ') => {
                self.line = self.line.saturating_add(1);
                (LineKind::Context, None)
            }
            // "\ No newline at end of file" and anything unrecognised.
            _ => (LineKind::Other, None),
        }
    }
}

/// Parse a single file's patch text (as served per file by code-hosting APIs) and
/// return the new-revision line numbers of every added line.
///
/// Context lines advance the counter without being recorded; removed lines do
/// neither. Each hunk header resets the counter. Empty or unparsable text yields an
/// empty set, and a malformed hunk header suspends counting until the next valid one.
pub fn parse_changed_lines(patch: &str) -> BTreeSet<u32> {
    let mut out = BTreeSet::new();
    let mut cursor = HunkCursor::default();

    for raw in patch.lines() {
        if raw.starts_with("@@") {
            match parse_hunk_header(raw) {
                Ok(hdr) => cursor.start_hunk(hdr.new_start),
                Err(_) => cursor.suspend(),
            }
            continue;
        }

        // File headers only appear between hunks, where `step` ignores them.
        if raw.starts_with("diff --git ") {
            cursor.suspend();
            continue;
        }

        if let (LineKind::Added, Some(line)) = cursor.step(raw) {
            out.insert(line);
        }
    }

    out
}

/// Parse a multi-file unified diff (git-style) into per-file changed-line sets, in diff order.
pub fn parse_unified_diff(diff_text: &str) -> Result<Vec<FileDiff>, DiffParseError> {
    let mut out: Vec<FileDiff> = Vec::new();
    let mut cursor = HunkCursor::default();
    // A `diff --git` line opened an entry that the `---`/`+++` pair still belongs to.
    let mut header_pending = false;

    let mut lines = diff_text.lines().peekable();
    while let Some(raw) = lines.next() {
        if raw.starts_with("diff --git ") {
            cursor.suspend();
            // Example: diff --git a/foo b/foo
            out.push(FileDiff {
                path: parse_diff_git_line(raw).unwrap_or_default(),
                ..FileDiff::default()
            });
            header_pending = true;
            continue;
        }

        let file_header = raw.starts_with("--- ")
            && lines.peek().is_some_and(|next| next.starts_with("+++ "));
        if file_header {
            cursor.suspend();
            if !header_pending {
                out.push(FileDiff::default());
            }
            header_pending = false;

            let old_path = parse_header_path(&raw[4..]);
            let new_path = lines.next().and_then(|next| parse_header_path(&next[4..]));
            let file = current_file(&mut out);
            match new_path {
                Some(p) => file.path = p,
                None => {
                    file.deleted = true;
                    if file.path.is_empty() {
                        file.path = old_path.unwrap_or_default();
                    }
                }
            }
            continue;
        }

        if raw.starts_with("@@") {
            let hdr = parse_hunk_header(raw)?;
            current_file(&mut out);
            header_pending = false;
            cursor.start_hunk(hdr.new_start);
            continue;
        }

        match cursor.step(raw) {
            (LineKind::Added, Some(line)) => record_added(&mut out, line),
            (LineKind::Removed, _) => {
                let file = current_file(&mut out);
                file.deletions = file.deletions.saturating_add(1);
            }
            _ => {}
        }
    }

    out.retain(|f| !f.path.is_empty());
    Ok(out)
}

fn record_added(out: &mut Vec<FileDiff>, line: u32) {
    let file = current_file(out);
    file.additions = file.additions.saturating_add(1);
    file.changed_lines.insert(line);
}

fn current_file(out: &mut Vec<FileDiff>) -> &mut FileDiff {
    if out.is_empty() {
        out.push(FileDiff::default());
    }
    let last = out.len() - 1;
    &mut out[last]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    new_start: u32,
}

fn parse_hunk_header(line: &str) -> Result<HunkHeader, DiffParseError> {
    // Formats:
    // @@ -1,2 +3,4 @@
    // @@ -1 +3 @@ fn context()
    let plus = line
        .split_whitespace()
        .nth(2)
        .ok_or_else(|| DiffParseError::MalformedHunkHeader(line.to_string()))?;

    // plus is like "+3,4" or "+3"
    let plus = plus
        .strip_prefix('+')
        .ok_or_else(|| DiffParseError::MalformedHunkHeader(line.to_string()))?;
    let start_str = plus.split(',').next().unwrap_or(plus);
    let new_start: u32 = start_str
        .parse()
        .map_err(|_| DiffParseError::MalformedHunkHeader(line.to_string()))?;

    Ok(HunkHeader { new_start })
}

fn parse_diff_git_line(line: &str) -> Option<String> {
    // diff --git a/foo b/foo
    let mut it = line.split_whitespace();
    if it.next()? != "diff" {
        return None;
    }
    if it.next()? != "--git" {
        return None;
    }
    let _a = it.next()?;
    let b = it.next()?;
    strip_prefix_path(b)
}

fn parse_header_path(rest: &str) -> Option<String> {
    // "b/foo", "a/foo\t2024-01-01", "/dev/null"
    let first = rest.split('\t').next().unwrap_or(rest);
    if first == "/dev/null" {
        return None;
    }
    strip_prefix_path(first)
}

fn strip_prefix_path(p: &str) -> Option<String> {
    // strips a/ or b/
    let p = p.trim();
    let p = p
        .strip_prefix("a/")
        .or_else(|| p.strip_prefix("b/"))
        .unwrap_or(p);

    // Normalize to forward slashes.
    let normalized = Path::new(p)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
