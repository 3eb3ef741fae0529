use crate::error::AppError;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

pub const ENV_FFMPEG_PATH: &str = "FFMPEG_PATH";

fn find_in_path() -> Option<PathBuf> {
    let lookup = if cfg!(target_os = "windows") {
        "where"
    } else {
        "which"
    };
    let output = Command::new(lookup).arg("ffmpeg").output().ok()?;
    if output.status.success() {
        let path = String::from_utf8_lossy(&output.stdout);
        let first = path.lines().next()?.trim();
        if !first.is_empty() {
            return Some(PathBuf::from(first));
        }
    }
    None
}

fn common_paths() -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        vec![
            PathBuf::from("/opt/homebrew/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
            PathBuf::from("/opt/local/bin/ffmpeg"),
        ]
    }

    #[cfg(target_os = "windows")]
    {
        vec![
            PathBuf::from("C:\\ffmpeg\\bin\\ffmpeg.exe"),
            PathBuf::from("C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe"),
        ]
    }

    #[cfg(all(unix, not(target_os = "macos")))]
    {
        vec![
            PathBuf::from("/usr/bin/ffmpeg"),
            PathBuf::from("/usr/local/bin/ffmpeg"),
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", unix)))]
    {
        vec![]
    }
}

static FFMPEG_PATH_CACHE: OnceLock<PathBuf> = OnceLock::new();

fn resolve_ffmpeg_path() -> Result<PathBuf, AppError> {
    for path in common_paths() {
        if path.exists() {
            log::debug!(
                target: "vidsnip::ffmpeg::discovery",
                "FFmpeg found in common path: {}",
                path.display()
            );
            return Ok(path);
        }
    }

    if let Some(p) = find_in_path()
        && p.exists()
    {
        log::debug!(
            target: "vidsnip::ffmpeg::discovery",
            "FFmpeg found in PATH: {}",
            p.display()
        );
        return Ok(p);
    }

    log::error!(
        target: "vidsnip::ffmpeg::discovery",
        "FFmpeg not found in PATH or common locations"
    );
    Err(AppError::ToolUnavailable(format!(
        "FFmpeg not found. Install it (e.g. `apt install ffmpeg`) or set {}",
        ENV_FFMPEG_PATH
    )))
}

/// Get FFmpeg path. Cached for process lifetime.
/// `FFMPEG_PATH` takes precedence when it points at an existing file,
/// then common installation paths, then `PATH`.
pub fn get_ffmpeg_path() -> Result<&'static Path, AppError> {
    if let Some(path) = FFMPEG_PATH_CACHE.get() {
        return Ok(path.as_path());
    }
    let path = match std::env::var(ENV_FFMPEG_PATH).map(PathBuf::from) {
        Ok(p) if p.exists() => {
            log::debug!(
                target: "vidsnip::ffmpeg::discovery",
                "FFmpeg path from {} env: {}",
                ENV_FFMPEG_PATH,
                p.display()
            );
            p
        }
        _ => resolve_ffmpeg_path()?,
    };
    // Another thread may have initialized first; either value is valid.
    let _ = FFMPEG_PATH_CACHE.set(path);
    FFMPEG_PATH_CACHE
        .get()
        .map(PathBuf::as_path)
        .ok_or_else(|| AppError::ToolUnavailable("FFmpeg path cache is empty".into()))
}

/// Paths to try for ffprobe given an ffmpeg binary path (suffixed first, then plain).
pub fn ffprobe_candidates(ffmpeg_path: &Path) -> Vec<PathBuf> {
    let Some(parent) = ffmpeg_path.parent() else {
        return vec![];
    };
    let exe = if cfg!(target_os = "windows") { ".exe" } else { "" };
    let mut candidates = Vec::with_capacity(2);
    if let Some(suffix) = ffmpeg_path
        .file_stem()
        .and_then(|s| s.to_str())
        .and_then(|stem| stem.strip_prefix("ffmpeg"))
        .filter(|suffix| !suffix.is_empty())
    {
        candidates.push(parent.join(format!("ffprobe{suffix}{exe}")));
    }
    candidates.push(parent.join(format!("ffprobe{exe}")));
    candidates
}

/// Get ffprobe path. Same directory as ffmpeg (they ship together).
pub fn get_ffprobe_path() -> Result<PathBuf, AppError> {
    let ffmpeg = get_ffmpeg_path()?;
    let candidates = ffprobe_candidates(ffmpeg);
    if let Some(found) = candidates.iter().find(|c| c.exists()) {
        return Ok(found.clone());
    }
    Err(AppError::ToolUnavailable(format!(
        "ffprobe not found next to FFmpeg (tried {:?})",
        candidates
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn ffprobe_candidates_plain_ffmpeg() {
        let candidates = ffprobe_candidates(Path::new("/usr/bin/ffmpeg"));
        assert_eq!(candidates, vec![PathBuf::from("/usr/bin/ffprobe")]);
    }

    #[test]
    #[cfg(not(target_os = "windows"))]
    fn ffprobe_candidates_suffixed_ffmpeg() {
        let candidates = ffprobe_candidates(Path::new("/app/bin/ffmpeg-x86_64-linux"));
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/app/bin/ffprobe-x86_64-linux"),
                PathBuf::from("/app/bin/ffprobe"),
            ]
        );
    }

    #[test]
    #[cfg(target_os = "windows")]
    fn ffprobe_candidates_windows_exe() {
        let candidates = ffprobe_candidates(Path::new("C:\\bin\\ffmpeg.exe"));
        assert_eq!(candidates, vec![PathBuf::from("C:\\bin\\ffprobe.exe")]);
    }

    #[test]
    fn ffprobe_candidates_without_parent_is_empty() {
        assert!(ffprobe_candidates(Path::new("")).is_empty());
    }
}
