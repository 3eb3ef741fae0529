use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};

use crate::options::OutputFormat;

pub const ARTIFACT_PREFIX: &str = "vidsnip_preview_";

/// Deterministic artifact path for `input`: same input, same name; different
/// inputs never collide, so parallel requests on different files are safe.
pub fn artifact_path(dir: &Path, input: &Path, format: OutputFormat) -> PathBuf {
    let digest = Sha256::digest(input.to_string_lossy().as_bytes());
    dir.join(format!(
        "{}{:x}.{}",
        ARTIFACT_PREFIX,
        digest,
        format.extension()
    ))
}

/// Best-effort removal once the delivery path has consumed the artifact.
pub fn discard_artifact(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => log::debug!(
            target: "vidsnip::ffmpeg::temp",
            "Removed preview artifact {}",
            path.display()
        ),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => log::warn!(
            target: "vidsnip::ffmpeg::temp",
            "Failed to remove preview artifact {}: {}",
            path.display(),
            e
        ),
    }
}

/// Removes preview artifacts in `dir` older than `max_age`. Returns how many were removed.
pub fn cleanup_stale_artifacts(dir: &Path, max_age: Duration) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    let now = SystemTime::now();
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_artifact = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(ARTIFACT_PREFIX));
        if !is_artifact {
            continue;
        }
        let age = entry
            .metadata()
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok());
        if age.is_some_and(|age| age > max_age) && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    if removed > 0 {
        log::info!(
            target: "vidsnip::ffmpeg::temp",
            "Removed {} stale preview artifact(s) from {}",
            removed,
            dir.display()
        );
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_path_is_deterministic_per_input() {
        let dir = Path::new("/cache");
        let a1 = artifact_path(dir, Path::new("/media/a.mp4"), OutputFormat::Webp);
        let a2 = artifact_path(dir, Path::new("/media/a.mp4"), OutputFormat::Webp);
        let b = artifact_path(dir, Path::new("/media/b.mp4"), OutputFormat::Webp);
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn artifact_path_uses_format_extension() {
        let p = artifact_path(Path::new("/cache"), Path::new("clip.mov"), OutputFormat::Mp4);
        let name = p.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(ARTIFACT_PREFIX));
        assert!(name.ends_with(".mp4"));
        // prefix + 64 hex chars + ".mp4"
        assert_eq!(name.len(), ARTIFACT_PREFIX.len() + 64 + 4);
    }

    #[test]
    fn cleanup_removes_only_stale_artifacts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let artifact = dir.path().join(format!("{}abc.webp", ARTIFACT_PREFIX));
        let other = dir.path().join("keep-me.webp");
        fs::write(&artifact, b"x").unwrap();
        fs::write(&other, b"x").unwrap();

        assert_eq!(cleanup_stale_artifacts(dir.path(), Duration::from_secs(3600)), 0);
        assert!(artifact.exists());

        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(cleanup_stale_artifacts(dir.path(), Duration::from_millis(1)), 1);
        assert!(!artifact.exists());
        assert!(other.exists());
    }

    #[test]
    fn discard_missing_artifact_is_silent() {
        let dir = tempfile::tempdir().expect("tempdir");
        discard_artifact(&dir.path().join("missing.webp"));
    }
}
