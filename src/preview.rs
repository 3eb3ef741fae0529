//! Preview production: decides whether an input gets a preview, then runs
//! normalize -> probe -> plan -> build -> transcode -> verify.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PreviewConfig;
use crate::encode::{EncodeSpec, build_encode_spec};
use crate::error::AppError;
use crate::ffmpeg::{artifact_path, discard_artifact};
use crate::options::{CanonicalParameters, OutputFormat, RawOptions, normalize};
use crate::planner::{SnippetPlan, plan_snippet};

/// Reports a video's duration in seconds.
pub trait DurationProbe {
    fn probe(&self, path: &Path) -> Result<f64, AppError>;
}

/// Runs a fully resolved encode spec against one input.
pub trait Transcoder {
    /// Fails with `ToolUnavailable` when the encoder binary cannot be found.
    fn ensure_available(&self) -> Result<(), AppError>;

    fn run(&self, spec: &EncodeSpec, input: &Path, output: &Path) -> Result<(), AppError>;
}

impl<T: DurationProbe + ?Sized> DurationProbe for &T {
    fn probe(&self, path: &Path) -> Result<f64, AppError> {
        (**self).probe(path)
    }
}

impl<T: Transcoder + ?Sized> Transcoder for &T {
    fn ensure_available(&self) -> Result<(), AppError> {
        (**self).ensure_available()
    }

    fn run(&self, spec: &EncodeSpec, input: &Path, output: &Path) -> Result<(), AppError> {
        (**self).run(spec, input, output)
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewArtifact {
    pub path: PathBuf,
    pub format: OutputFormat,
    pub mime_type: &'static str,
    pub plan: SnippetPlan,
    pub size: u64,
}

/// `Skipped` means there was nothing to do; it is not a failure.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewOutcome {
    Produced(PreviewArtifact),
    Skipped,
}

/// Plan and spec for a known duration, without touching the filesystem.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPlan {
    pub params: CanonicalParameters,
    pub plan: SnippetPlan,
    pub spec: EncodeSpec,
}

/// Pure part of a request: normalize, plan, build.
pub fn plan_preview(
    raw: &RawOptions,
    duration: f64,
    config: &PreviewConfig,
) -> Result<PreviewPlan, AppError> {
    let params = normalize(raw, config);
    let plan = plan_snippet(duration, params.snippet_length, params.position, config)?;
    let spec = build_encode_spec(plan, &params);
    Ok(PreviewPlan { params, plan, spec })
}

/// True when `path` has a recognized video extension (case-insensitive).
pub fn is_video_file(path: &Path, config: &PreviewConfig) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| config.is_video_extension(ext))
}

pub struct PreviewProducer<P, T> {
    config: PreviewConfig,
    probe: P,
    transcoder: T,
}

impl<P: DurationProbe, T: Transcoder> PreviewProducer<P, T> {
    pub fn new(config: PreviewConfig, probe: P, transcoder: T) -> Self {
        Self {
            config,
            probe,
            transcoder,
        }
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Produces a preview artifact for `input_path`.
    ///
    /// Non-video or missing inputs are `Skipped` without probing or
    /// transcoding. Every other failure is terminal for the request and
    /// leaves no artifact behind.
    pub fn produce_preview(
        &self,
        input_path: &Path,
        raw: &RawOptions,
    ) -> Result<PreviewOutcome, AppError> {
        if !is_video_file(input_path, &self.config) {
            log::debug!(
                target: "vidsnip::preview",
                "produce_preview: skipping non-video input {}",
                input_path.display()
            );
            return Ok(PreviewOutcome::Skipped);
        }
        if !input_path.is_file() {
            log::debug!(
                target: "vidsnip::preview",
                "produce_preview: skipping missing input {}",
                input_path.display()
            );
            return Ok(PreviewOutcome::Skipped);
        }

        self.transcoder.ensure_available()?;

        let duration = match self.probe.probe(input_path) {
            Ok(d) if d.is_finite() && d > 0.0 => d,
            Ok(d) => {
                return Err(AppError::DurationUnknown(format!(
                    "probe reported {} s for {}",
                    d,
                    input_path.display()
                )));
            }
            Err(e @ (AppError::DurationUnknown(_) | AppError::ToolUnavailable(_))) => {
                return Err(e);
            }
            Err(e) => {
                return Err(AppError::DurationUnknown(format!(
                    "{}: {}",
                    input_path.display(),
                    e
                )));
            }
        };

        let PreviewPlan { params, plan, spec } = plan_preview(raw, duration, &self.config)?;
        log::info!(
            target: "vidsnip::preview",
            "produce_preview: input={}, duration={}, position={}, start={}, length={}, format={}",
            input_path.display(),
            duration,
            params.position.as_str(),
            plan.start_offset,
            plan.length,
            params.format.extension()
        );

        let artifact_dir = self.config.artifact_dir();
        fs::create_dir_all(&artifact_dir)?;
        let output_path = artifact_path(&artifact_dir, input_path, params.format);
        // The name is stable per input; an earlier artifact must not pass the size check below.
        discard_artifact(&output_path);

        if let Err(e) = self.transcoder.run(&spec, input_path, &output_path) {
            discard_artifact(&output_path);
            return Err(e);
        }

        let size = fs::metadata(&output_path).map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            discard_artifact(&output_path);
            return Err(AppError::EmptyArtifact(output_path.display().to_string()));
        }

        log::info!(
            target: "vidsnip::preview",
            "produce_preview: complete, output={} ({} bytes)",
            output_path.display(),
            size
        );
        Ok(PreviewOutcome::Produced(PreviewArtifact {
            path: output_path,
            format: params.format,
            mime_type: params.format.mime_type(),
            plan,
            size,
        }))
    }
}
