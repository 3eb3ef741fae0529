//! FFprobe-based duration probing.

use crate::error::AppError;
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

use super::discovery::get_ffprobe_path;

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    #[serde(default)]
    duration: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    streams: Option<Vec<FfprobeStream>>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoProbe {
    /// Seconds; 0 when neither the video stream nor the container reports one.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

fn parse_seconds(s: &str) -> Option<f64> {
    s.trim()
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
}

/// Parse ffprobe JSON. The first video stream's duration wins; the container
/// duration is the fallback (Matroska/WebM streams often carry none).
pub fn parse_ffprobe_json(json: &str) -> Result<VideoProbe, AppError> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| AppError::DurationUnknown(format!("Failed to parse ffprobe JSON: {}", e)))?;

    let video_stream = output
        .streams
        .as_ref()
        .and_then(|streams| streams.iter().find(|s| s.codec_type.as_deref() == Some("video")));
    let stream_duration = video_stream
        .and_then(|s| s.duration.as_deref())
        .and_then(parse_seconds);
    let format_duration = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds);

    Ok(VideoProbe {
        duration: stream_duration.or(format_duration).unwrap_or(0.0),
        width: video_stream.and_then(|s| s.width).unwrap_or(0),
        height: video_stream.and_then(|s| s.height).unwrap_or(0),
    })
}

/// Run ffprobe on a video file.
pub fn probe_video(path: &Path) -> Result<VideoProbe, AppError> {
    let ffprobe = get_ffprobe_path()?;
    let path_str = path.to_string_lossy();

    log::debug!(
        target: "vidsnip::ffmpeg::ffprobe",
        "probe_video: path={}",
        path_str
    );

    let output = Command::new(&ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_entries",
            "format=duration:stream=codec_type,duration,width,height",
            &path_str,
        ])
        .output()
        .map_err(|e| AppError::DurationUnknown(format!("Failed to run ffprobe: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AppError::DurationUnknown(format!(
            "ffprobe failed: {}",
            stderr.trim()
        )));
    }

    let json = String::from_utf8(output.stdout)
        .map_err(|_| AppError::DurationUnknown("ffprobe output was not valid UTF-8".into()))?;

    parse_ffprobe_json(&json)
}
