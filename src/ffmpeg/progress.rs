use regex::Regex;
use std::sync::LazyLock;

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^out_time_(?:ms|us)=(\d+)").expect("invalid time regex"));

/// Parse one line of `-progress pipe:1` output into a 0.0-1.0 fraction of
/// `snippet_secs`. FFmpeg reports `out_time_ms` in microseconds despite the name.
pub fn parse_ffmpeg_progress(line: &str, snippet_secs: f64) -> Option<f64> {
    if line.trim() == "progress=end" {
        return Some(1.0);
    }
    if snippet_secs <= 0.0 {
        return None;
    }
    let caps = TIME_RE.captures(line.trim())?;
    let micros: i64 = caps[1].parse().ok()?;
    let current = micros as f64 / 1_000_000.0;
    Some((current / snippet_secs).clamp(0.0, 1.0))
}
