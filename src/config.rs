//! Immutable preview configuration.
//!
//! Built once (defaults, optional JSON file, then environment overrides) and
//! passed by reference into normalization, planning and production. Nothing
//! here is global, so tests can swap in alternate tables or offsets.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const ENV_ARTIFACT_DIR: &str = "VIDSNIP_ARTIFACT_DIR";
pub const ENV_THREADS: &str = "VIDSNIP_THREADS";

fn default_compression_quality() -> BTreeMap<u8, u8> {
    [(1, 95), (2, 85), (3, 75), (4, 65), (5, 55)]
        .into_iter()
        .collect()
}

fn default_video_extensions() -> Vec<String> {
    ["mp4", "m4v", "avi", "mov", "webm"]
        .into_iter()
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct PreviewConfig {
    /// Compression level (1-5) to encoder quality.
    pub compression_quality: BTreeMap<u8, u8>,
    /// Used when a level has no table entry.
    pub fallback_quality: u8,
    /// Seconds skipped at the head for `start` snippets.
    pub start_offset_secs: f64,
    /// Seconds kept clear of the tail for `end` snippets.
    pub end_offset_secs: f64,
    /// Ceiling for snippet length.
    pub max_snippet_secs: f64,
    pub max_fps: u32,
    pub default_width: u32,
    pub default_fps: u32,
    pub default_compression_level: u8,
    pub default_snippet_secs: f64,
    /// Lower-case extensions accepted as video input.
    pub video_extensions: Vec<String>,
    /// Encoder thread count handed to FFmpeg.
    pub threads: u32,
    /// Where produced artifacts are written. None means the system temp dir.
    pub artifact_dir: Option<PathBuf>,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            compression_quality: default_compression_quality(),
            fallback_quality: 75,
            start_offset_secs: 2.0,
            end_offset_secs: 10.0,
            max_snippet_secs: 10.0,
            max_fps: 30,
            default_width: 400,
            default_fps: 12,
            default_compression_level: 3,
            default_snippet_secs: 2.0,
            video_extensions: default_video_extensions(),
            threads: 4,
            artifact_dir: None,
        }
    }
}

impl PreviewConfig {
    /// Parses a JSON config. Missing keys keep their defaults; unknown keys are rejected.
    pub fn from_json_str(json: &str) -> Result<Self, AppError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AppError::Config(format!("Failed to parse config JSON: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Defaults or `path`, then `VIDSNIP_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let config = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        let config = config.with_overrides(|key| std::env::var(key).ok())?;
        log::debug!(
            target: "vidsnip::config",
            "Loaded preview config: threads={}, artifact_dir={}",
            config.threads,
            config.artifact_dir().display()
        );
        Ok(config)
    }

    /// Applies overrides from `lookup` (normally the process environment).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        if let Some(dir) = lookup(ENV_ARTIFACT_DIR).filter(|d| !d.trim().is_empty()) {
            self.artifact_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = lookup(ENV_THREADS) {
            self.threads = raw.trim().parse().map_err(|_| {
                AppError::Config(format!("{} must be a positive integer, got {:?}", ENV_THREADS, raw))
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.max_snippet_secs.is_finite() && self.max_snippet_secs > 0.0) {
            return Err(AppError::Config(
                "maxSnippetSecs must be greater than zero".into(),
            ));
        }
        if !(self.default_snippet_secs > 0.0 && self.default_snippet_secs <= self.max_snippet_secs)
        {
            return Err(AppError::Config(
                "defaultSnippetSecs must be within (0, maxSnippetSecs]".into(),
            ));
        }
        if self.start_offset_secs < 0.0 || self.end_offset_secs < 0.0 {
            return Err(AppError::Config("offsets must not be negative".into()));
        }
        if self.max_fps == 0 {
            return Err(AppError::Config("maxFps must be at least 1".into()));
        }
        if self.threads == 0 {
            return Err(AppError::Config("threads must be at least 1".into()));
        }
        if self.video_extensions.is_empty() {
            return Err(AppError::Config("videoExtensions must not be empty".into()));
        }
        Ok(())
    }

    /// Quality for a compression level, falling back when the table has no entry.
    pub fn quality_for_level(&self, level: u8) -> u8 {
        self.compression_quality
            .get(&level)
            .copied()
            .unwrap_or(self.fallback_quality)
    }

    pub fn is_video_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.video_extensions
            .iter()
            .any(|known| known.eq_ignore_ascii_case(&ext))
    }

    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}
