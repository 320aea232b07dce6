use std::collections::BTreeSet;
use std::io::{self, BufRead, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};

use prtriage_core::render_analysis;
use prtriage_diff::{FileDiff, parse_changed_lines, parse_unified_diff};
use prtriage_domain::{
    Analyzer, Language, analyze_source, apply_fixes, conflict_info, dedupe, detect_language,
    resolve, resolve_with_fallback,
};
use prtriage_types::{AnalysisResult, ConfigFile, Issue, Severity};

mod config_loader;

use config_loader::{DEFAULT_CONFIG_PATH, load_config};

/// Exit code when findings reach the `--fail-on` level or conflicts remain.
const EXIT_FINDINGS: i32 = 2;

#[derive(Parser)]
#[command(name = "prtriage")]
#[command(about = "Diff-aware change triage: findings, fixes and merge conflicts", long_about = None)]
struct Cli {
    /// Enable verbose (info-level) logging to stderr.
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Enable debug-level logging to stderr.
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a file, optionally only the lines a patch adds.
    Analyze(AnalyzeArgs),

    /// Apply the suggested fixes for a file's findings.
    Fix(FixArgs),

    /// Report merge conflicts in a file, or resolve them.
    Conflicts(ConflictsArgs),

    /// Print the new-revision line numbers a patch adds.
    ChangedLines(ChangedLinesArgs),

    /// List the rule catalog.
    Rules(RulesArgs),

    /// Write a default prtriage.toml.
    Init(InitArgs),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum FailOn {
    High,
    Medium,
    Never,
}

impl FailOn {
    fn is_reached(self, issues: &[Issue]) -> bool {
        match self {
            FailOn::High => issues.iter().any(|i| i.severity == Severity::High),
            FailOn::Medium => issues.iter().any(|i| i.severity != Severity::Low),
            FailOn::Never => false,
        }
    }
}

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    /// Source file to analyze.
    file: PathBuf,

    /// Language name (javascript, typescript, python, ...). Detected from the
    /// file extension when omitted.
    #[arg(long)]
    language: Option<String>,

    /// Unified diff; only the lines it adds to FILE are judged. A full
    /// `git diff` is matched to FILE by path. Use `-` for stdin.
    #[arg(long)]
    diff: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,

    /// Exit with code 2 when a finding at or above this severity is reported.
    #[arg(long, value_enum, default_value_t = FailOn::High)]
    fail_on: FailOn,

    /// Path to a config file. If omitted, uses ./prtriage.toml if present.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct FixArgs {
    file: PathBuf,

    #[arg(long)]
    language: Option<String>,

    /// Also apply fixes for low-severity findings (formatting and style).
    #[arg(long)]
    all: bool,

    /// Rewrite FILE in place instead of printing the result.
    #[arg(long)]
    write: bool,

    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ConflictsArgs {
    file: PathBuf,

    /// Resolve the conflicts instead of reporting them. Fails when any section
    /// needs a human.
    #[arg(long)]
    resolve: bool,

    /// With --resolve, keep both sides of sections that cannot be resolved
    /// automatically, fenced by marker comments.
    #[arg(long, requires = "resolve")]
    force: bool,

    /// With --resolve, rewrite FILE in place.
    #[arg(long, requires = "resolve")]
    write: bool,

    /// Language for the marker comments. Detected from the file extension
    /// when omitted.
    #[arg(long)]
    language: Option<String>,
}

#[derive(Parser, Debug)]
struct ChangedLinesArgs {
    /// Patch file, or `-` for stdin.
    patch: PathBuf,

    #[arg(long, value_enum, default_value_t = LinesFormat::Text)]
    format: LinesFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LinesFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
struct RulesArgs {
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LinesFormat::Text)]
    format: LinesFormat,
}

#[derive(Parser, Debug)]
struct InitArgs {
    /// Output path for the configuration file.
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    output: PathBuf,

    /// Overwrite existing configuration file without prompting.
    #[arg(long, short)]
    force: bool,
}

fn main() -> std::process::ExitCode {
    match run_with_args(std::env::args_os()) {
        Ok(code) => std::process::ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("{err:?}");
            std::process::ExitCode::from(1)
        }
    }
}

fn run_with_args<I, T>(args: I) -> Result<i32>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.verbose, cli.debug);

    match cli.command {
        Commands::Analyze(args) => cmd_analyze(args),
        Commands::Fix(args) => cmd_fix(args),
        Commands::Conflicts(args) => cmd_conflicts(args),
        Commands::ChangedLines(args) => {
            cmd_changed_lines(args)?;
            Ok(0)
        }
        Commands::Rules(args) => {
            cmd_rules(args)?;
            Ok(0)
        }
        Commands::Init(args) => {
            cmd_init(args)?;
            Ok(0)
        }
    }
}

/// Initialize tracing/logging based on CLI flags.
fn init_logging(verbose: bool, debug: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    debug!("Logging initialized at level: {}", level);
}

fn cmd_analyze(args: AnalyzeArgs) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    let content = read_source(&args.file)?;
    let filename = display_path(&args.file);
    let language = args.language.as_deref().unwrap_or("");
    let analyzer = Analyzer::new(config.analysis);

    let result = match &args.diff {
        Some(diff_path) => {
            let patch = read_input(diff_path)?;
            let changed = changed_lines_for(&patch, &filename)?;
            info!(file = %filename, lines = changed.len(), "analyzing changed lines");
            analyzer.analyze_changed_lines(&content, &filename, language, &changed)
        }
        None => analyzer.analyze(&content, &filename, language),
    };

    print_analysis(&filename, &result, args.format)?;

    if args.fail_on.is_reached(&result.issues) {
        return Ok(EXIT_FINDINGS);
    }
    Ok(0)
}

fn print_analysis(filename: &str, result: &AnalysisResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let s = serde_json::to_string_pretty(result).context("render json")?;
            println!("{s}");
        }
        OutputFormat::Markdown => print!("{}", render_analysis(filename, result)),
    }
    Ok(())
}

/// Lines `patch` adds to `filename`.
///
/// A patch with file headers is split per file and matched by path suffix;
/// a bare hunk list applies to `filename` as is.
fn changed_lines_for(patch: &str, filename: &str) -> Result<BTreeSet<u32>> {
    if !has_file_headers(patch) {
        return Ok(parse_changed_lines(patch));
    }
    let files = parse_unified_diff(patch).context("parse diff")?;
    let wanted = normalize_path(filename);
    let matched: Option<&FileDiff> = files.iter().find(|f| {
        let path = normalize_path(&f.path);
        path == wanted || wanted.ends_with(&format!("/{path}")) || path.ends_with(&format!("/{wanted}"))
    });
    match matched {
        Some(f) => Ok(f.changed_lines.clone()),
        None => {
            debug!(file = filename, "diff does not touch this file");
            Ok(BTreeSet::new())
        }
    }
}

fn has_file_headers(patch: &str) -> bool {
    patch
        .lines()
        .any(|l| l.starts_with("diff --git ") || l.starts_with("+++ "))
}

fn cmd_fix(args: FixArgs) -> Result<i32> {
    let config = load_config(args.config.as_deref())?;
    let content = read_source(&args.file)?;
    let filename = display_path(&args.file);
    let language = resolve_language(args.language.as_deref(), &filename);
    let analyzer = Analyzer::new(config.analysis);

    let issues = if args.all {
        match analyze_source(
            &content,
            &filename,
            language,
            analyzer.rules(),
            analyzer.config(),
            None,
        ) {
            Ok(issues) => dedupe(issues),
            Err(err) => bail!("cannot analyze {filename}: {err}"),
        }
    } else {
        analyzer
            .analyze(&content, &filename, language.as_str())
            .issues
    };

    let outcome = apply_fixes(&content, &issues);
    eprintln!(
        "{filename}: applied {} fix(es), skipped {}",
        outcome.applied, outcome.skipped
    );

    if args.write {
        if outcome.applied > 0 {
            write_text(&args.file, &outcome.content)?;
        }
    } else {
        print!("{}", outcome.content);
    }
    Ok(0)
}

fn cmd_conflicts(args: ConflictsArgs) -> Result<i32> {
    let content = read_source(&args.file)?;
    let filename = display_path(&args.file);

    if !args.resolve {
        let Some(info) = conflict_info(&content) else {
            println!("{filename}: no conflicts");
            return Ok(0);
        };
        println!(
            "{filename}: {} conflict section(s){}{}",
            info.sections.len(),
            if info.auto_resolvable {
                ", auto-resolvable"
            } else {
                ", manual resolution required"
            },
            if info.unterminated {
                ", unterminated start marker"
            } else {
                ""
            },
        );
        for s in &info.sections {
            println!(
                "  lines {}-{}: {} vs {}",
                s.start_line, s.end_line, s.ours_label, s.theirs_label
            );
        }
        return Ok(EXIT_FINDINGS);
    }

    let resolved = if args.force {
        let language = resolve_language(args.language.as_deref(), &filename);
        resolve_with_fallback(&content, language)
    } else {
        resolve(&content)
    };

    match resolved {
        Ok(text) => {
            if args.write {
                write_text(&args.file, &text)?;
                eprintln!("{filename}: conflicts resolved");
            } else {
                print!("{text}");
            }
            Ok(0)
        }
        Err(unresolved) => {
            eprintln!("{filename}: {unresolved}");
            for s in &unresolved.sections {
                eprintln!("  lines {}-{}", s.start_line, s.end_line);
            }
            Ok(EXIT_FINDINGS)
        }
    }
}

fn cmd_changed_lines(args: ChangedLinesArgs) -> Result<()> {
    let patch = read_input(&args.patch)?;

    let files: Vec<(String, BTreeSet<u32>)> = if has_file_headers(&patch) {
        parse_unified_diff(&patch)
            .context("parse diff")?
            .into_iter()
            .filter(|f| !f.deleted)
            .map(|f| (f.path, f.changed_lines))
            .collect()
    } else {
        vec![(String::new(), parse_changed_lines(&patch))]
    };

    match args.format {
        LinesFormat::Json => {
            let value: serde_json::Map<String, serde_json::Value> = files
                .into_iter()
                .map(|(path, lines)| (path, serde_json::json!(lines)))
                .collect();
            let s = serde_json::to_string_pretty(&value).context("render json")?;
            println!("{s}");
        }
        LinesFormat::Text => {
            for (path, lines) in files {
                let ranges = format_ranges(&lines);
                if path.is_empty() {
                    println!("{ranges}");
                } else {
                    println!("{path}: {ranges}");
                }
            }
        }
    }
    Ok(())
}

/// `{1,2,3,7}` → `1-3,7`.
fn format_ranges(lines: &BTreeSet<u32>) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut iter = lines.iter().copied().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        out.push(if start == end {
            start.to_string()
        } else {
            format!("{start}-{end}")
        });
    }
    out.join(",")
}

fn cmd_rules(args: RulesArgs) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    let analyzer = Analyzer::new(config.analysis);

    match args.format {
        LinesFormat::Json => {
            let rules: Vec<serde_json::Value> = analyzer
                .rules()
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "id": r.id(),
                        "category": r.category(),
                        "description": r.description(),
                        "cross_language": r.cross_language(),
                    })
                })
                .collect();
            let s = serde_json::to_string_pretty(&rules).context("render json")?;
            println!("{s}");
        }
        LinesFormat::Text => {
            for r in analyzer.rules() {
                let scope = if r.cross_language() { "any" } else { "js/ts" };
                println!(
                    "{:<24} {:<14} {:<6} {}",
                    r.id(),
                    r.category().as_str(),
                    scope,
                    r.description()
                );
            }
        }
    }
    Ok(())
}

fn confirm_overwrite<R: BufRead, W: Write>(
    input: &mut R,
    mut err: W,
    output_path: &Path,
) -> Result<bool> {
    write!(
        err,
        "Configuration file '{}' already exists. Overwrite? [y/N] ",
        output_path.display()
    )
    .context("write prompt")?;
    err.flush().context("flush stderr")?;

    let mut input_line = String::new();
    input.read_line(&mut input_line).context("read stdin")?;

    let input = input_line.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

fn cmd_init(args: InitArgs) -> Result<()> {
    let mut input = io::stdin().lock();
    cmd_init_with_io(args, &mut input, io::stderr())
}

fn cmd_init_with_io<R: BufRead, W: Write>(args: InitArgs, input: &mut R, err: W) -> Result<()> {
    let output_path = &args.output;

    if output_path.exists() && !args.force && !confirm_overwrite(input, err, output_path)? {
        println!("Aborted.");
        return Ok(());
    }

    write_text(output_path, &default_config_toml())?;

    println!("Created {}.", output_path.display());
    println!();
    println!("Next steps:");
    println!("  1. Adjust the settings in {}", output_path.display());
    println!("  2. Run 'prtriage analyze <FILE> --diff <PATCH>' on a change");
    Ok(())
}

/// The default config, rendered with a short header.
fn default_config_toml() -> String {
    let body = toml::to_string_pretty(&ConfigFile::default())
        .unwrap_or_else(|_| String::from("[analysis]\n\n[review]\n"));
    format!(
        "# prtriage configuration. Every key is optional; omitted keys take the values below.\n\
         # Values may reference environment variables with the ${{...}} syntax,\n\
         # optionally with a `:-fallback` default.\n\n{body}"
    )
}

fn resolve_language(name: Option<&str>, filename: &str) -> Language {
    match name {
        Some(n) if !n.trim().is_empty() => Language::from_name(n),
        _ => detect_language(filename),
    }
}

fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

/// Read a file, or stdin when `path` is `-`.
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("read stdin")?;
        return Ok(buf);
    }
    read_source(path)
}

fn display_path(path: &Path) -> String {
    normalize_path(&path.to_string_lossy())
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/").trim_start_matches("./").to_string()
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create dir {}", parent.display()))?;
    }

    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::TempDir;

    #[test]
    fn ranges_collapse_runs() {
        let lines: BTreeSet<u32> = [1, 2, 3, 7, 9, 10].into();
        assert_eq!(format_ranges(&lines), "1-3,7,9-10");
        assert_eq!(format_ranges(&BTreeSet::new()), "");
    }

    #[test]
    fn fail_on_levels() {
        use prtriage_testkit::fixtures::issue;
        use prtriage_types::Category;

        let medium = vec![issue(Category::Lint, Severity::Medium)];
        assert!(!FailOn::High.is_reached(&medium));
        assert!(FailOn::Medium.is_reached(&medium));
        assert!(!FailOn::Never.is_reached(&medium));
        let high = vec![issue(Category::Security, Severity::High)];
        assert!(FailOn::High.is_reached(&high));
    }

    #[test]
    fn full_diff_is_matched_by_path_suffix() {
        let patch = prtriage_testkit::fixtures::sample_patches::TWO_FILES;
        assert_eq!(
            changed_lines_for(patch, "repo/src/a.js").unwrap(),
            BTreeSet::from([2])
        );
        assert_eq!(
            changed_lines_for(patch, "src/b.js").unwrap(),
            BTreeSet::from([10])
        );
        assert!(changed_lines_for(patch, "src/c.js").unwrap().is_empty());
    }

    #[test]
    fn bare_hunks_apply_to_the_named_file() {
        let patch = prtriage_testkit::fixtures::sample_patches::EQ_AND_EVAL_ADDED;
        assert_eq!(
            changed_lines_for(patch, "anything.js").unwrap(),
            BTreeSet::from([2, 3])
        );
    }

    #[test]
    fn default_config_round_trips() {
        let text = default_config_toml();
        let parsed = config_loader::parse_config(&text, |_| None).unwrap();
        assert_eq!(parsed, ConfigFile::default());
    }

    #[test]
    fn init_declined_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prtriage.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        let args = InitArgs {
            output: path.clone(),
            force: false,
        };
        let mut input = Cursor::new("n\n");
        let mut err = Vec::new();
        cmd_init_with_io(args, &mut input, &mut err).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# mine\n");
        assert!(String::from_utf8(err).unwrap().contains("Overwrite?"));
    }

    #[test]
    fn init_confirmed_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prtriage.toml");
        std::fs::write(&path, "# mine\n").unwrap();

        let args = InitArgs {
            output: path.clone(),
            force: false,
        };
        let mut input = Cursor::new("yes\n");
        cmd_init_with_io(args, &mut input, Vec::new()).unwrap();

        assert!(std::fs::read_to_string(&path).unwrap().contains("[analysis]"));
    }

    #[test]
    fn explicit_language_wins() {
        assert_eq!(resolve_language(Some("python"), "a.js"), Language::Python);
        assert_eq!(resolve_language(None, "a.ts"), Language::TypeScript);
        assert_eq!(resolve_language(Some(" "), "a.js"), Language::JavaScript);
    }
}
