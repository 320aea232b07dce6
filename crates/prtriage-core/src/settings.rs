use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};

use prtriage_types::{ConfigFile, ReviewConfig};

#[derive(Debug, thiserror::Error)]
pub enum PathFilterError {
    #[error("invalid exclude glob '{glob}': {source}")]
    InvalidGlob {
        glob: String,
        source: globset::Error,
    },
    #[error("failed to build exclude globs: {0}")]
    Build(globset::Error),
}

/// Review-time knobs plus the compiled path excludes.
#[derive(Debug, Clone)]
pub struct ReviewSettings {
    pub review: ReviewConfig,
    excludes: GlobSet,
}

impl ReviewSettings {
    pub fn from_config(config: &ConfigFile) -> Result<Self, PathFilterError> {
        Ok(Self {
            review: config.review.clone(),
            excludes: compile_exclude_globs(&config.analysis.exclude_paths)?,
        })
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.excludes.is_match(Path::new(path))
    }
}

impl Default for ReviewSettings {
    fn default() -> Self {
        Self {
            review: ReviewConfig::default(),
            excludes: GlobSet::empty(),
        }
    }
}

pub fn compile_exclude_globs(globs: &[String]) -> Result<GlobSet, PathFilterError> {
    let mut b = GlobSetBuilder::new();
    for g in globs {
        let glob = Glob::new(g).map_err(|e| PathFilterError::InvalidGlob {
            glob: g.clone(),
            source: e,
        })?;
        b.add(glob);
    }
    b.build().map_err(PathFilterError::Build)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_exclude_globs_rejects_invalid() {
        let err = compile_exclude_globs(&["[".to_string()]).unwrap_err();
        match err {
            PathFilterError::InvalidGlob { glob, .. } => assert_eq!(glob, "["),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn default_excludes_vendor_and_bundles() {
        let settings = ReviewSettings::from_config(&ConfigFile::default()).unwrap();
        assert!(settings.is_excluded("web/node_modules/left-pad/index.js"));
        assert!(settings.is_excluded("public/vendor.min.js"));
        assert!(settings.is_excluded("pkg/dist/bundle.js"));
        assert!(!settings.is_excluded("src/app.js"));
    }

    #[test]
    fn default_settings_exclude_nothing() {
        assert!(!ReviewSettings::default().is_excluded("node_modules/a.js"));
    }
}
