mod builder;
pub mod discovery;
mod error;
pub mod ffprobe;
mod progress;
mod runner;
mod temp;

use std::path::Path;

pub use builder::{build_ffmpeg_command, format_args_for_display_multiline};
pub use error::{FfmpegErrorPayload, parse_ffmpeg_error};
pub use runner::{ProgressCallback, display_command, run_ffmpeg_blocking};
pub use temp::{ARTIFACT_PREFIX, artifact_path, cleanup_stale_artifacts, discard_artifact};

use crate::encode::EncodeSpec;
use crate::error::AppError;
use crate::preview::{DurationProbe, Transcoder};

/// Path to string for FFmpeg args or logging.
pub fn path_to_string(path: &(impl AsRef<Path> + ?Sized)) -> String {
    path.as_ref().to_string_lossy().to_string()
}

/// Duration probe backed by the ffprobe binary next to FFmpeg.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeDurationProbe;

impl DurationProbe for FfprobeDurationProbe {
    fn probe(&self, path: &Path) -> Result<f64, AppError> {
        Ok(ffprobe::probe_video(path)?.duration)
    }
}

/// Transcoder that renders the spec to FFmpeg arguments and runs the binary.
#[derive(Clone, Default)]
pub struct FfmpegTranscoder {
    threads: u32,
    progress: Option<ProgressCallback>,
}

impl FfmpegTranscoder {
    pub fn new(threads: u32) -> Self {
        Self {
            threads: threads.max(1),
            progress: None,
        }
    }

    /// Receives 0-1 progress for each run.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn command_args(&self, spec: &EncodeSpec, input: &Path, output: &Path) -> Vec<String> {
        build_ffmpeg_command(
            spec,
            &path_to_string(input),
            &path_to_string(output),
            self.threads.max(1),
            self.progress.is_some(),
        )
    }
}

impl Transcoder for FfmpegTranscoder {
    fn ensure_available(&self) -> Result<(), AppError> {
        discovery::get_ffmpeg_path().map(|_| ())
    }

    fn run(&self, spec: &EncodeSpec, input: &Path, output: &Path) -> Result<(), AppError> {
        let ffmpeg = discovery::get_ffmpeg_path()?;
        let args = self.command_args(spec, input, output);
        run_ffmpeg_blocking(ffmpeg, args, spec.window().length, self.progress.clone())
    }
}
