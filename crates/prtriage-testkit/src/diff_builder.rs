//! Patch builders for tests.
//!
//! Two shapes come out of the same [`FileBuilder`]: the hunks-only patch a
//! hosting service attaches to each [`ChangedFile`], and a full `git diff`
//! (file headers plus hunks) for the CLI and the multi-file parser.
//!
//! Hunk headers are derived from the lines pushed, so a built patch is always
//! self-consistent.
//!
//! ```rust
//! use prtriage_testkit::diff_builder::{FileBuilder, HunkBuilder};
//!
//! let file = FileBuilder::new("src/app.js")
//!     .hunk(HunkBuilder::at(1).context("const a = 1;").add("const b = 2;"));
//!
//! assert_eq!(file.patch(), "@@ -1,1 +1,2 @@\n const a = 1;\n+const b = 2;");
//! assert_eq!(file.added_lines().into_iter().collect::<Vec<_>>(), vec![2]);
//! ```

use std::collections::BTreeSet;

use prtriage_types::{ChangedFile, FileStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Context,
    Add,
    Remove,
}

/// One `@@` hunk. `old_start` and `new_start` are equal unless set apart.
#[derive(Debug, Clone)]
pub struct HunkBuilder {
    old_start: u32,
    new_start: u32,
    lines: Vec<(Kind, String)>,
}

impl HunkBuilder {
    pub fn at(start: u32) -> Self {
        Self {
            old_start: start,
            new_start: start,
            lines: Vec::new(),
        }
    }

    /// A hunk whose old and new sides start at different lines.
    pub fn shifted(old_start: u32, new_start: u32) -> Self {
        Self {
            old_start,
            new_start,
            lines: Vec::new(),
        }
    }

    pub fn context(self, text: &str) -> Self {
        self.push(Kind::Context, text)
    }

    pub fn add(self, text: &str) -> Self {
        self.push(Kind::Add, text)
    }

    pub fn remove(self, text: &str) -> Self {
        self.push(Kind::Remove, text)
    }

    fn push(mut self, kind: Kind, text: &str) -> Self {
        self.lines.push((kind, text.to_string()));
        self
    }

    fn count(&self, skip: Kind) -> usize {
        self.lines.iter().filter(|(k, _)| *k != skip).count()
    }

    pub fn additions(&self) -> u32 {
        self.lines.iter().filter(|(k, _)| *k == Kind::Add).count() as u32
    }

    pub fn deletions(&self) -> u32 {
        self.lines.iter().filter(|(k, _)| *k == Kind::Remove).count() as u32
    }

    /// New-revision line numbers this hunk adds.
    pub fn added_lines(&self) -> Vec<u32> {
        let mut line = self.new_start.saturating_sub(1);
        let mut out = Vec::new();
        for (kind, _) in &self.lines {
            match kind {
                Kind::Context => line += 1,
                Kind::Add => {
                    line += 1;
                    out.push(line);
                }
                Kind::Remove => {}
            }
        }
        out
    }

    pub fn build(&self) -> String {
        let header = format!(
            "@@ -{},{} +{},{} @@",
            self.old_start,
            self.count(Kind::Add),
            self.new_start,
            self.count(Kind::Remove)
        );
        std::iter::once(header)
            .chain(self.lines.iter().map(|(kind, text)| {
                let prefix = match kind {
                    Kind::Context => ' ',
                    Kind::Add => '+',
                    Kind::Remove => '-',
                };
                format!("{prefix}{text}")
            }))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One file of a change.
#[derive(Debug, Clone)]
pub struct FileBuilder {
    path: String,
    status: FileStatus,
    hunks: Vec<HunkBuilder>,
}

impl FileBuilder {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            status: FileStatus::Modified,
            hunks: Vec::new(),
        }
    }

    pub fn new_file(mut self) -> Self {
        self.status = FileStatus::Added;
        self
    }

    pub fn deleted(mut self) -> Self {
        self.status = FileStatus::Removed;
        self
    }

    pub fn hunk(mut self, hunk: HunkBuilder) -> Self {
        self.hunks.push(hunk);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// New-revision line numbers of every added line, across all hunks.
    pub fn added_lines(&self) -> BTreeSet<u32> {
        self.hunks.iter().flat_map(HunkBuilder::added_lines).collect()
    }

    /// Hunks only, the way a hosting service serves one file's patch.
    pub fn patch(&self) -> String {
        self.hunks
            .iter()
            .map(HunkBuilder::build)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The changed-file record a hosting service would list for this file.
    pub fn changed_file(&self) -> ChangedFile {
        let additions = self.hunks.iter().map(HunkBuilder::additions).sum();
        let deletions = self.hunks.iter().map(HunkBuilder::deletions).sum();
        ChangedFile {
            filename: self.path.clone(),
            status: self.status,
            additions,
            deletions,
            changes: additions + deletions,
            patch: (!self.hunks.is_empty()).then(|| self.patch()),
        }
    }

    /// Full git-style diff for this file.
    pub fn git_diff(&self) -> String {
        let p = &self.path;
        let mut lines = vec![format!("diff --git a/{p} b/{p}")];
        match self.status {
            FileStatus::Added => {
                lines.push("new file mode 100644".to_string());
                lines.push("index 0000000..1111111".to_string());
                lines.push("--- /dev/null".to_string());
                lines.push(format!("+++ b/{p}"));
            }
            FileStatus::Removed => {
                lines.push("deleted file mode 100644".to_string());
                lines.push("index 1111111..0000000".to_string());
                lines.push(format!("--- a/{p}"));
                lines.push("+++ /dev/null".to_string());
            }
            FileStatus::Modified | FileStatus::Renamed => {
                lines.push("index 1111111..2222222 100644".to_string());
                lines.push(format!("--- a/{p}"));
                lines.push(format!("+++ b/{p}"));
            }
        }
        lines.extend(self.hunks.iter().map(HunkBuilder::build));
        lines.join("\n")
    }
}

/// A multi-file `git diff`.
#[derive(Debug, Clone, Default)]
pub struct DiffBuilder {
    files: Vec<FileBuilder>,
}

impl DiffBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, file: FileBuilder) -> Self {
        self.files.push(file);
        self
    }

    pub fn build(&self) -> String {
        self.files
            .iter()
            .map(FileBuilder::git_diff)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
