//! The analysis entry points.
//!
//! Both entry points swallow [`AnalysisError`](crate::engine::AnalysisError):
//! a binary or oversized file yields an empty result and a warning, so one bad
//! file never aborts a larger run.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use prtriage_types::{AnalysisConfig, AnalysisResult, Issue};

use crate::cache::IssueCache;
use crate::conflict::conflict_info;
use crate::engine::{AnalysisError, analyze_source, detect_language};
use crate::identity::{content_hash, dedupe};
use crate::metrics;
use crate::preprocess::Language;
use crate::rules::{Rule, rule_catalog};

pub struct Analyzer {
    config: AnalysisConfig,
    rules: Vec<Box<dyn Rule>>,
    cache: Arc<IssueCache>,
}

impl Analyzer {
    /// An analyzer with its own cache.
    pub fn new(config: AnalysisConfig) -> Self {
        Self::with_cache(config, Arc::new(IssueCache::new()))
    }

    /// An analyzer sharing `cache` with other owners.
    pub fn with_cache(config: AnalysisConfig, cache: Arc<IssueCache>) -> Self {
        let rules = rule_catalog(&config.disabled_rules);
        Self {
            config,
            rules,
            cache,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn cache(&self) -> &Arc<IssueCache> {
        &self.cache
    }

    /// Analyze a whole file. Results are cached per `(filename, language, content)`.
    ///
    /// An empty `language` means "detect from `filename`"; an unrecognised one
    /// runs only the cross-language rules.
    pub fn analyze(&self, content: &str, filename: &str, language: &str) -> AnalysisResult {
        let lang = resolve_language(language, filename);
        let key = IssueCache::key(filename, lang.as_str(), content);
        let raw = self.cache.get_or_try_compute(&key, || {
            analyze_source(content, filename, lang, &self.rules, &self.config, None)
        });
        self.finish(raw, content, filename, lang)
    }

    /// Analyze only the 1-based lines in `changed`. Not cached.
    pub fn analyze_changed_lines(
        &self,
        content: &str,
        filename: &str,
        language: &str,
        changed: &BTreeSet<u32>,
    ) -> AnalysisResult {
        let lang = resolve_language(language, filename);
        let raw = analyze_source(
            content,
            filename,
            lang,
            &self.rules,
            &self.config,
            Some(changed),
        );
        self.finish(raw, content, filename, lang)
    }

    fn finish(
        &self,
        raw: Result<Vec<Issue>, AnalysisError>,
        content: &str,
        filename: &str,
        language: Language,
    ) -> AnalysisResult {
        let issues = match raw {
            Ok(issues) => issues,
            Err(err) => {
                warn!(file = filename, error = %err, "analysis skipped");
                return AnalysisResult::empty();
            }
        };

        let found = issues.len();
        let issues: Vec<Issue> = dedupe(issues)
            .into_iter()
            .filter(metrics::is_reported)
            .collect();
        debug!(
            file = filename,
            found,
            reported = issues.len(),
            "filtered findings"
        );

        AnalysisResult {
            metrics: metrics::compute(content, language, &issues),
            suggestions: metrics::suggestions(&issues),
            file_hash: Some(content_hash(content)),
            conflicts: conflict_info(content),
            issues,
        }
    }
}

fn resolve_language(language: &str, filename: &str) -> Language {
    if language.trim().is_empty() {
        detect_language(filename)
    } else {
        Language::from_name(language)
    }
}
