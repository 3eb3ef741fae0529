use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::PreviewConfig;
use crate::error::AppError;
use crate::ffmpeg::{
    ARTIFACT_PREFIX, FfmpegTranscoder, FfprobeDurationProbe, ProgressCallback,
    cleanup_stale_artifacts, discard_artifact, discovery, format_args_for_display_multiline,
};
use crate::options::{OutputFormat, RawOptions};
use crate::preview::{self, PreviewOutcome, PreviewPlan, PreviewProducer};

pub type SidecarProgressEmitter = ProgressCallback;

pub const PROTOCOL_VERSION: u8 = 1;

/// Placeholder paths shown when the caller has no concrete input.
const DISPLAY_INPUT: &str = "input.mp4";

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCapabilitiesResult {
    pub protocol_version: u8,
    pub formats: Vec<&'static str>,
    pub ffmpeg_available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum ProduceResult {
    Produced {
        path: PathBuf,
        #[serde(rename = "mimeType")]
        mime_type: &'static str,
        format: OutputFormat,
        #[serde(rename = "startOffset")]
        start_offset: f64,
        length: f64,
    },
    Skipped,
}

impl From<PreviewOutcome> for ProduceResult {
    fn from(outcome: PreviewOutcome) -> Self {
        match outcome {
            PreviewOutcome::Produced(artifact) => ProduceResult::Produced {
                path: artifact.path,
                mime_type: artifact.mime_type,
                format: artifact.format,
                start_offset: artifact.plan.start_offset,
                length: artifact.plan.length,
            },
            PreviewOutcome::Skipped => ProduceResult::Skipped,
        }
    }
}

pub fn app_capabilities() -> AppCapabilitiesResult {
    let ffmpeg_path = discovery::get_ffmpeg_path()
        .ok()
        .map(|p| p.display().to_string());
    AppCapabilitiesResult {
        protocol_version: PROTOCOL_VERSION,
        formats: vec![
            OutputFormat::Webp.extension(),
            OutputFormat::Mp4.extension(),
        ],
        ffmpeg_available: ffmpeg_path.is_some(),
        ffmpeg_path,
    }
}

pub fn plan_preview(
    config: &PreviewConfig,
    duration: f64,
    options: &RawOptions,
) -> Result<PreviewPlan, AppError> {
    preview::plan_preview(options, duration, config)
}

/// Multi-line FFmpeg command for the plan, for display only.
pub fn preview_ffmpeg_command(
    config: &PreviewConfig,
    duration: f64,
    options: &RawOptions,
    input_path: Option<String>,
) -> Result<String, AppError> {
    let planned = preview::plan_preview(options, duration, config)?;
    let input = input_path.unwrap_or_else(|| DISPLAY_INPUT.to_string());
    let output = crate::ffmpeg::artifact_path(
        &config.artifact_dir(),
        Path::new(&input),
        planned.params.format,
    );
    let args = FfmpegTranscoder::new(config.threads).command_args(
        &planned.spec,
        Path::new(&input),
        &output,
    );
    Ok(format_args_for_display_multiline(&args))
}

pub fn produce_preview(
    config: &PreviewConfig,
    input_path: &Path,
    options: &RawOptions,
    progress: Option<SidecarProgressEmitter>,
) -> Result<ProduceResult, AppError> {
    let mut transcoder = FfmpegTranscoder::new(config.threads);
    if let Some(cb) = progress {
        transcoder = transcoder.with_progress(cb);
    }
    let producer = PreviewProducer::new(config.clone(), FfprobeDurationProbe, transcoder);
    producer
        .produce_preview(input_path, options)
        .map(ProduceResult::from)
}

/// Removes a produced artifact. Only prefixed files directly inside the
/// configured artifact dir are touched.
pub fn discard_preview(config: &PreviewConfig, path: &Path) -> Result<(), AppError> {
    let is_artifact = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(ARTIFACT_PREFIX))
        && path.parent() == Some(config.artifact_dir().as_path());
    if !is_artifact {
        return Err(AppError::InvalidRequest(format!(
            "Not a preview artifact: {}",
            path.display()
        )));
    }
    discard_artifact(path);
    Ok(())
}

pub fn cleanup_startup(config: &PreviewConfig, max_age: Duration) -> usize {
    cleanup_stale_artifacts(&config.artifact_dir(), max_age)
}
