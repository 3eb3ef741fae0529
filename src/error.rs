//! Error type for preview requests. `summary_and_detail` feeds sidecar error replies.

use crate::ffmpeg::parse_ffmpeg_error;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    ToolUnavailable(String),

    #[error("Video duration could not be determined: {0}")]
    DurationUnknown(String),

    #[error("Invalid video duration: {0}")]
    InvalidDuration(f64),

    #[error("FFmpeg failed (code {code}): {output}")]
    TranscodeFailed {
        code: i32,
        command: String,
        output: String,
    },

    #[error("Preview artifact is missing or empty: {0}")]
    EmptyArtifact(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl AppError {
    pub fn transcode_failed(
        code: i32,
        command: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::TranscodeFailed {
            code,
            command: command.into(),
            output: output.into(),
        }
    }

    /// Short one-line summary plus full detail, as shown to pipeline operators.
    pub fn summary_and_detail(&self) -> (String, String) {
        match self {
            AppError::TranscodeFailed {
                code,
                command,
                output,
            } => {
                let payload = parse_ffmpeg_error(output, Some(*code));
                let detail = if command.is_empty() {
                    payload.detail
                } else {
                    format!("{}\n{}", command, payload.detail)
                };
                (payload.summary, detail)
            }
            _ => {
                let text = self.to_string();
                (text.clone(), text)
            }
        }
    }
}
