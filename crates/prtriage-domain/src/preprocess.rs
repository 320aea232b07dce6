use std::fmt;
use std::path::Path;

/// Languages the analyzer knows how to tokenize.
///
/// Only JavaScript and TypeScript get the full rule catalog. The others are
/// recognised so comments and strings are masked correctly for the
/// cross-language rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Ruby,
    Rust,
    Go,
    Java,
    C,
    Cpp,
    #[default]
    Unknown,
}

impl Language {
    /// Parse a language identifier. Case-insensitive; common aliases accepted.
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "javascript" | "js" | "jsx" | "node" => Language::JavaScript,
            "typescript" | "ts" | "tsx" => Language::TypeScript,
            "python" | "py" => Language::Python,
            "ruby" | "rb" => Language::Ruby,
            "rust" | "rs" => Language::Rust,
            "go" | "golang" => Language::Go,
            "java" => Language::Java,
            "c" => Language::C,
            "cpp" | "c++" => Language::Cpp,
            _ => Language::Unknown,
        }
    }

    /// Detect the language from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("js" | "jsx" | "mjs" | "cjs") => Language::JavaScript,
            Some("ts" | "tsx" | "mts" | "cts") => Language::TypeScript,
            Some("py" | "pyw") => Language::Python,
            Some("rb") => Language::Ruby,
            Some("rs") => Language::Rust,
            Some("go") => Language::Go,
            Some("java") => Language::Java,
            Some("c" | "h") => Language::C,
            Some("cc" | "cpp" | "cxx" | "hpp" | "hh") => Language::Cpp,
            _ => Language::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Ruby => "ruby",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Unknown => "unknown",
        }
    }

    /// Whether the full rule catalog applies.
    pub fn is_supported(self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }

    /// Marker that starts a line comment.
    pub fn line_comment(self) -> &'static str {
        match self.comment_syntax() {
            CommentSyntax::Hash => "#",
            CommentSyntax::CStyle | CommentSyntax::CStyleNested => "//",
        }
    }

    pub fn comment_syntax(self) -> CommentSyntax {
        match self {
            Language::Python | Language::Ruby => CommentSyntax::Hash,
            Language::Rust => CommentSyntax::CStyleNested,
            _ => CommentSyntax::CStyle,
        }
    }

    pub fn string_syntax(self) -> StringSyntax {
        match self {
            Language::JavaScript | Language::TypeScript | Language::Unknown => {
                StringSyntax::JavaScript
            }
            Language::Python => StringSyntax::Python,
            Language::Ruby => StringSyntax::Ruby,
            Language::Rust => StringSyntax::Rust,
            Language::Go => StringSyntax::Go,
            Language::Java | Language::C | Language::Cpp => StringSyntax::CStyle,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentSyntax {
    /// `//` and `/* */`
    CStyle,
    /// `//` and nestable `/* */`
    CStyleNested,
    /// `#`
    Hash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringSyntax {
    /// `"..."` and `'x'` char literals
    CStyle,
    /// `"..."`, `'...'`, `` `...` `` template literals (may span lines)
    JavaScript,
    /// `"..."`, `'...'`, `"""..."""`, `'''...'''`
    Python,
    /// `"..."`, `'...'`
    Ruby,
    /// `"..."`, `r#"..."#`, `'x'`
    Rust,
    /// `"..."`, `` `...` `` raw strings, `'x'`
    Go,
}

impl StringSyntax {
    fn single_quote_is_string(self) -> bool {
        matches!(
            self,
            StringSyntax::JavaScript | StringSyntax::Python | StringSyntax::Ruby
        )
    }

    fn has_backticks(self) -> bool {
        matches!(self, StringSyntax::JavaScript | StringSyntax::Go)
    }
}

/// `mask_*` controls whether the corresponding token class is replaced with spaces.
///
/// Strings are always tracked when comments are masked, so comment markers
/// inside string literals never start a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreprocessOptions {
    pub mask_comments: bool,
    pub mask_strings: bool,
}

impl PreprocessOptions {
    pub fn comments_only() -> Self {
        Self {
            mask_comments: true,
            mask_strings: false,
        }
    }

    pub fn comments_and_strings() -> Self {
        Self {
            mask_comments: true,
            mask_strings: true,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Normal,
    BlockComment { depth: u32 },
    Quoted { quote: u8, escaped: bool },
    TripleQuoted { quote: u8 },
    Backtick { escaped: bool },
    RawString { hashes: usize },
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Normal => write!(f, "Normal"),
            Mode::BlockComment { depth } => write!(f, "BlockComment(depth={depth})"),
            Mode::Quoted { quote, escaped } => {
                write!(f, "Quoted({}, escaped={escaped})", *quote as char)
            }
            Mode::TripleQuoted { quote } => write!(f, "TripleQuoted({})", *quote as char),
            Mode::Backtick { escaped } => write!(f, "Backtick(escaped={escaped})"),
            Mode::RawString { hashes } => write!(f, "RawString(hashes={hashes})"),
        }
    }
}

/// A stateful preprocessor, run over the lines of one file in order.
///
/// Block comments, template literals and triple-quoted strings carry over
/// between lines. Ordinary quoted strings end at end of line unless the
/// newline is escaped.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    opts: PreprocessOptions,
    lang: Language,
    mode: Mode,
}

impl Preprocessor {
    pub fn new(opts: PreprocessOptions, lang: Language) -> Self {
        Self {
            opts,
            lang,
            mode: Mode::Normal,
        }
    }

    pub fn reset(&mut self) {
        self.mode = Mode::Normal;
    }

    /// Returns the line with masked segments replaced by spaces.
    ///
    /// The output is the same length in bytes as the input.
    pub fn sanitize_line(&mut self, line: &str) -> String {
        let mut out: Vec<u8> = line.as_bytes().to_vec();
        let bytes = line.as_bytes();
        let len = bytes.len();
        let strings = self.lang.string_syntax();
        let comments = self.lang.comment_syntax();
        let mask_s = self.opts.mask_strings;
        let mask_c = self.opts.mask_comments;

        let mut i = 0;
        while i < len {
            match self.mode {
                Mode::Normal => {
                    let b = bytes[i];

                    if strings == StringSyntax::Rust
                        && let Some((quote_i, hashes)) = detect_raw_string_start(bytes, i)
                    {
                        if mask_s {
                            mask_range(&mut out, i, quote_i + 1);
                        }
                        self.mode = Mode::RawString { hashes };
                        i = quote_i + 1;
                        continue;
                    }

                    if strings == StringSyntax::Python
                        && (b == b'"' || b == b'\'')
                        && bytes.get(i + 1) == Some(&b)
                        && bytes.get(i + 2) == Some(&b)
                    {
                        if mask_s {
                            mask_range(&mut out, i, i + 3);
                        }
                        self.mode = Mode::TripleQuoted { quote: b };
                        i += 3;
                        continue;
                    }

                    if b == b'"' || (b == b'\'' && strings.single_quote_is_string()) {
                        if mask_s {
                            out[i] = b' ';
                        }
                        self.mode = Mode::Quoted {
                            quote: b,
                            escaped: false,
                        };
                        i += 1;
                        continue;
                    }

                    if b == b'\'' {
                        // Char literal, or a lifetime / label that is left alone.
                        if let Some(end) = char_literal_end(bytes, i) {
                            if mask_s {
                                mask_range(&mut out, i, end);
                            }
                            i = end;
                        } else {
                            i += 1;
                        }
                        continue;
                    }

                    if b == b'`' && strings.has_backticks() {
                        if mask_s {
                            out[i] = b' ';
                        }
                        self.mode = Mode::Backtick { escaped: false };
                        i += 1;
                        continue;
                    }

                    match comments {
                        CommentSyntax::Hash if b == b'#' => {
                            if mask_c {
                                mask_range(&mut out, i, len);
                            }
                            break;
                        }
                        CommentSyntax::CStyle | CommentSyntax::CStyleNested
                            if b == b'/' && i + 1 < len =>
                        {
                            if bytes[i + 1] == b'/' {
                                if mask_c {
                                    mask_range(&mut out, i, len);
                                }
                                break;
                            }
                            if bytes[i + 1] == b'*' {
                                if mask_c {
                                    mask_range(&mut out, i, i + 2);
                                }
                                self.mode = Mode::BlockComment { depth: 1 };
                                i += 2;
                                continue;
                            }
                        }
                        _ => {}
                    }

                    i += 1;
                }

                Mode::BlockComment { depth } => {
                    if mask_c {
                        out[i] = b' ';
                    }

                    let next = bytes.get(i + 1).copied();
                    if comments == CommentSyntax::CStyleNested
                        && bytes[i] == b'/'
                        && next == Some(b'*')
                    {
                        if mask_c {
                            out[i + 1] = b' ';
                        }
                        self.mode = Mode::BlockComment { depth: depth + 1 };
                        i += 2;
                        continue;
                    }

                    if bytes[i] == b'*' && next == Some(b'/') {
                        if mask_c {
                            out[i + 1] = b' ';
                        }
                        self.mode = if depth <= 1 {
                            Mode::Normal
                        } else {
                            Mode::BlockComment { depth: depth - 1 }
                        };
                        i += 2;
                        continue;
                    }

                    i += 1;
                }

                Mode::Quoted { quote, escaped } => {
                    if mask_s {
                        out[i] = b' ';
                    }
                    self.mode = if escaped {
                        Mode::Quoted {
                            quote,
                            escaped: false,
                        }
                    } else if bytes[i] == b'\\' {
                        Mode::Quoted {
                            quote,
                            escaped: true,
                        }
                    } else if bytes[i] == quote {
                        Mode::Normal
                    } else {
                        self.mode
                    };
                    i += 1;
                }

                Mode::TripleQuoted { quote } => {
                    if bytes[i] == quote
                        && bytes.get(i + 1) == Some(&quote)
                        && bytes.get(i + 2) == Some(&quote)
                    {
                        if mask_s {
                            mask_range(&mut out, i, i + 3);
                        }
                        self.mode = Mode::Normal;
                        i += 3;
                        continue;
                    }
                    if mask_s {
                        out[i] = b' ';
                    }
                    i += 1;
                }

                Mode::Backtick { escaped } => {
                    if mask_s {
                        out[i] = b' ';
                    }
                    // Go raw strings have no escapes.
                    let escapes = strings == StringSyntax::JavaScript;
                    self.mode = if escaped {
                        Mode::Backtick { escaped: false }
                    } else if escapes && bytes[i] == b'\\' {
                        Mode::Backtick { escaped: true }
                    } else if bytes[i] == b'`' {
                        Mode::Normal
                    } else {
                        self.mode
                    };
                    i += 1;
                }

                Mode::RawString { hashes } => {
                    if bytes[i] == b'"' && (1..=hashes).all(|j| bytes.get(i + j) == Some(&b'#')) {
                        if mask_s {
                            mask_range(&mut out, i, i + 1 + hashes);
                        }
                        self.mode = Mode::Normal;
                        i += 1 + hashes;
                        continue;
                    }
                    if mask_s {
                        out[i] = b' ';
                    }
                    i += 1;
                }
            }
        }

        // A quoted string only continues past end of line when the newline is escaped.
        if let Mode::Quoted { escaped: false, .. } = self.mode {
            self.mode = Mode::Normal;
        }
        if let Mode::Quoted {
            quote,
            escaped: true,
        } = self.mode
        {
            self.mode = Mode::Quoted {
                quote,
                escaped: false,
            };
        }

        String::from_utf8(out).unwrap_or_else(|_| line.to_string())
    }
}

fn mask_range(out: &mut [u8], start: usize, end: usize) {
    let end = end.min(out.len());
    for b in &mut out[start..end] {
        *b = b' ';
    }
}

/// Detect `r"`, `r#"`, `br#"` at `i`. Returns the index of the opening quote and the hash count.
fn detect_raw_string_start(bytes: &[u8], i: usize) -> Option<(usize, usize)> {
    if i > 0 && (bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_') {
        return None;
    }
    let r_i = match (bytes.get(i), bytes.get(i + 1)) {
        (Some(b'r'), _) => i,
        (Some(b'b'), Some(b'r')) => i + 1,
        _ => return None,
    };

    let mut j = r_i + 1;
    while bytes.get(j) == Some(&b'#') {
        j += 1;
    }
    (bytes.get(j) == Some(&b'"')).then_some((j, j - r_i - 1))
}

/// End (exclusive) of a char literal opening at `i`: `'x'`, `'é'`, `'\n'`, `'\u{1F600}'`.
fn char_literal_end(bytes: &[u8], i: usize) -> Option<usize> {
    let first = *bytes.get(i + 1)?;
    if first == b'\\' {
        let limit = (i + 12).min(bytes.len());
        return (i + 3..limit)
            .find(|&j| bytes[j] == b'\'')
            .map(|j| j + 1);
    }
    let width = utf8_width(first);
    (bytes.get(i + 1 + width) == Some(&b'\'')).then_some(i + 2 + width)
}

fn utf8_width(lead: u8) -> usize {
    match lead {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}
