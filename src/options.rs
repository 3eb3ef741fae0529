//! Raw preview options and their normalization into canonical parameters.

use serde::{Deserialize, Serialize};

use crate::config::PreviewConfig;

/// Where in the source video the snippet is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Start,
    #[default]
    Middle,
    End,
}

impl Position {
    /// Maps canonical tokens and the legacy display labels. Anything else is `Middle`.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim) else {
            return Self::Middle;
        };
        match raw {
            "Anfang (nach 2 Sekunden)" => Self::Start,
            "10 Sekunden vor Ende" => Self::End,
            "Mitte des Videos" => Self::Middle,
            _ if raw.eq_ignore_ascii_case("start") => Self::Start,
            _ if raw.eq_ignore_ascii_case("end") => Self::End,
            _ => Self::Middle,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Middle => "middle",
            Self::End => "end",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Webp,
    Mp4,
}

impl OutputFormat {
    /// Only an exact (trimmed, case-folded) `mp4` selects MP4.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_lowercase()) {
            Some(s) if s == "mp4" => Self::Mp4,
            _ => Self::Webp,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Mp4 => "mp4",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Webp => "image/webp",
            Self::Mp4 => "video/mp4",
        }
    }
}

/// Untrusted caller input. Every field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptions {
    pub output_format: Option<String>,
    pub position: Option<String>,
    pub width: Option<i64>,
    pub fps: Option<i64>,
    pub compression_level: Option<i64>,
    pub snippet_length: Option<f64>,
}

/// Validated parameters. Every field is within bounds.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalParameters {
    pub width: u32,
    pub fps: u32,
    pub compression_level: u8,
    pub quality: u8,
    pub snippet_length: f64,
    pub position: Position,
    pub format: OutputFormat,
}

impl From<&CanonicalParameters> for RawOptions {
    fn from(params: &CanonicalParameters) -> Self {
        Self {
            output_format: Some(params.format.extension().to_string()),
            position: Some(params.position.as_str().to_string()),
            width: Some(params.width.into()),
            fps: Some(params.fps.into()),
            compression_level: Some(params.compression_level.into()),
            snippet_length: Some(params.snippet_length),
        }
    }
}

/// Clamps raw options into canonical parameters. Never fails.
///
/// A missing, non-finite or non-positive snippet length is replaced by the
/// configured default before the ceiling is applied.
pub fn normalize(raw: &RawOptions, config: &PreviewConfig) -> CanonicalParameters {
    let width = raw
        .width
        .unwrap_or(config.default_width.into())
        .clamp(1, u32::MAX.into()) as u32;
    let fps = raw
        .fps
        .unwrap_or(config.default_fps.into())
        .clamp(1, config.max_fps.max(1).into()) as u32;
    let compression_level = raw
        .compression_level
        .unwrap_or(config.default_compression_level.into())
        .clamp(1, 5) as u8;
    let quality = config.quality_for_level(compression_level);
    let snippet_length = raw
        .snippet_length
        .filter(|l| l.is_finite() && *l > 0.0)
        .unwrap_or(config.default_snippet_secs)
        .min(config.max_snippet_secs);

    let params = CanonicalParameters {
        width,
        fps,
        compression_level,
        quality,
        snippet_length,
        position: Position::parse(raw.position.as_deref()),
        format: OutputFormat::parse(raw.output_format.as_deref()),
    };
    log::debug!(
        target: "vidsnip::options",
        "normalize: raw_position={:?} -> {:?}",
        raw.position,
        params
    );
    params
}
