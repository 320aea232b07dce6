//! Configuration loading.
//!
//! An explicit `--config` path must exist. Without one, `./prtriage.toml` is
//! used when present, else the built-in defaults. `${VAR}` and
//! `${VAR:-default}` references are expanded before parsing.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, info};

use prtriage_types::ConfigFile;

pub const DEFAULT_CONFIG_PATH: &str = "prtriage.toml";

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid regex")
});

pub fn load_config(path: Option<&Path>) -> Result<ConfigFile> {
    let user_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let p = PathBuf::from(DEFAULT_CONFIG_PATH);
            p.exists().then_some(p)
        }
    };

    let Some(path) = user_path else {
        debug!("No config file found, using defaults");
        return Ok(ConfigFile::default());
    };

    info!("Loading config from: {}", path.display());
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read config '{}'", path.display()))?;
    parse_config(&text, |name| std::env::var(name).ok())
        .with_context(|| format!("parse config '{}'", path.display()))
}

/// Parse config text, resolving variables through `lookup`.
pub fn parse_config<F>(text: &str, lookup: F) -> Result<ConfigFile>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_env_vars(text, lookup)?;
    let config: ConfigFile = toml::from_str(&expanded)?;
    Ok(config)
}

/// Unset variables without a default are an error; an empty value falls back
/// to the default.
pub fn expand_env_vars<F>(text: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing = Vec::new();
    let expanded = ENV_REF.replace_all(text, |caps: &regex::Captures<'_>| {
        let name = &caps[1];
        match (lookup(name).filter(|v| !v.is_empty()), caps.get(2)) {
            (Some(value), _) => value,
            (None, Some(default)) => default.as_str().to_string(),
            (None, None) => {
                missing.push(name.to_string());
                String::new()
            }
        }
    });

    if !missing.is_empty() {
        bail!("environment variable(s) not set: {}", missing.join(", "));
    }
    Ok(expanded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use prtriage_types::MergeMethod;
    use tempfile::TempDir;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: Vec<(String, String)> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
    }

    #[test]
    fn missing_sections_take_defaults() {
        let cfg = parse_config("[review]\nauto_merge = true\n", env(&[])).unwrap();
        assert!(cfg.review.auto_merge);
        assert_eq!(cfg.analysis.max_line_length, 120);
        assert_eq!(cfg.review.merge_method, MergeMethod::Squash);
    }

    #[test]
    fn expands_variables_and_defaults() {
        let text = "[review]\nsweep_ref = \"${SWEEP_REF}\"\nmerge_method = \"${METHOD:-rebase}\"\n";
        let cfg = parse_config(text, env(&[("SWEEP_REF", "develop")])).unwrap();
        assert_eq!(cfg.review.sweep_ref, "develop");
        assert_eq!(cfg.review.merge_method, MergeMethod::Rebase);
    }

    #[test]
    fn empty_value_uses_default() {
        let out = expand_env_vars("${A:-x}", env(&[("A", "")])).unwrap();
        assert_eq!(out, "x");
    }

    #[test]
    fn unset_variable_without_default_errors() {
        let err = expand_env_vars("a = \"${NOPE}\" ${ALSO_NOPE}", env(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "environment variable(s) not set: NOPE, ALSO_NOPE"
        );
    }

    #[test]
    fn text_without_references_is_untouched() {
        let text = "cost = \"$5\"\n";
        assert_eq!(expand_env_vars(text, env(&[])).unwrap(), text);
    }

    #[test]
    fn invalid_toml_returns_error() {
        assert!(parse_config("[analysis\n", env(&[])).is_err());
        assert!(parse_config("[analysis]\nmax_line_length = \"wide\"\n", env(&[])).is_err());
    }

    #[test]
    fn explicit_missing_path_errors() {
        let dir = TempDir::new().unwrap();
        let err = load_config(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("read config"));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[analysis]\ndisabled_rules = [\"semi\"]\n").unwrap();
        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.analysis.disabled_rules, vec!["semi"]);
    }
}
