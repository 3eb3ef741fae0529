#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use vidsnip_core::error::AppError;
use vidsnip_core::{DurationProbe, EncodeSpec, PreviewConfig, Transcoder};

type ProbeFn = Box<dyn Fn() -> Result<f64, AppError> + Send + Sync>;

pub struct MockProbe {
    respond: ProbeFn,
    calls: AtomicUsize,
}

impl MockProbe {
    pub fn duration(secs: f64) -> Self {
        Self::with(move || Ok(secs))
    }

    pub fn failing() -> Self {
        Self::with(|| Err(AppError::DurationUnknown("no streams".into())))
    }

    pub fn with(respond: impl Fn() -> Result<f64, AppError> + Send + Sync + 'static) -> Self {
        Self {
            respond: Box::new(respond),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DurationProbe for MockProbe {
    fn probe(&self, _path: &Path) -> Result<f64, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)()
    }
}

#[derive(Debug, Clone, Copy)]
pub enum TranscodeBehavior {
    /// Writes this many bytes to the output path.
    Write(usize),
    /// Writes a partial file, then fails with the given exit code.
    Fail(i32),
    /// Reports success without writing anything.
    SucceedSilently,
    Unavailable,
}

pub struct MockTranscoder {
    behavior: TranscodeBehavior,
    runs: Mutex<Vec<(EncodeSpec, PathBuf)>>,
    availability_checks: AtomicUsize,
}

impl MockTranscoder {
    pub fn new(behavior: TranscodeBehavior) -> Self {
        Self {
            behavior,
            runs: Mutex::new(Vec::new()),
            availability_checks: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> Vec<(EncodeSpec, PathBuf)> {
        self.runs.lock().clone()
    }

    pub fn availability_checks(&self) -> usize {
        self.availability_checks.load(Ordering::SeqCst)
    }
}

impl Transcoder for MockTranscoder {
    fn ensure_available(&self) -> Result<(), AppError> {
        self.availability_checks.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            TranscodeBehavior::Unavailable => {
                Err(AppError::ToolUnavailable("ffmpeg not installed".into()))
            }
            _ => Ok(()),
        }
    }

    fn run(&self, spec: &EncodeSpec, _input: &Path, output: &Path) -> Result<(), AppError> {
        self.runs.lock().push((spec.clone(), output.to_path_buf()));
        match self.behavior {
            TranscodeBehavior::Write(bytes) => {
                fs::write(output, vec![0u8; bytes])?;
                Ok(())
            }
            TranscodeBehavior::Fail(code) => {
                fs::write(output, b"partial")?;
                Err(AppError::transcode_failed(
                    code,
                    "ffmpeg -i input.mp4 out.webp",
                    "Conversion failed!",
                ))
            }
            TranscodeBehavior::SucceedSilently => Ok(()),
            TranscodeBehavior::Unavailable => Err(AppError::ToolUnavailable(
                "ffmpeg not installed".into(),
            )),
        }
    }
}

/// Scratch directory holding inputs and the artifact dir for one test.
pub struct TestEnv {
    dir: tempfile::TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn artifact_dir(&self) -> PathBuf {
        let dir = self.path("artifacts");
        fs::create_dir_all(&dir).expect("artifact dir");
        dir
    }

    pub fn config(&self) -> PreviewConfig {
        PreviewConfig {
            artifact_dir: Some(self.artifact_dir()),
            ..PreviewConfig::default()
        }
    }

    /// Creates a placeholder input file; mocks never read its contents.
    pub fn touch(&self, name: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, b"not really a video").expect("write input");
        path
    }

    pub fn artifact_count(&self) -> usize {
        fs::read_dir(self.artifact_dir())
            .map(|entries| entries.flatten().count())
            .unwrap_or(0)
    }
}

/// Environment backed by a real FFmpeg binary.
pub struct IntegrationEnv {
    pub ffmpeg: PathBuf,
    pub inner: TestEnv,
}

impl IntegrationEnv {
    pub fn new() -> Self {
        let ffmpeg = vidsnip_core::ffmpeg::discovery::get_ffmpeg_path()
            .expect("FFmpeg not found")
            .to_path_buf();
        Self {
            ffmpeg,
            inner: TestEnv::new(),
        }
    }

    pub fn with_test_video(&self, input_name: &str, duration_secs: f32) -> PathBuf {
        let output_path = self.inner.path(input_name);
        let status = create_test_video(&self.ffmpeg, &output_path, duration_secs)
            .expect("failed to create test video");
        assert!(status.success(), "ffmpeg failed to create test video");
        output_path
    }
}

pub fn create_test_video(
    ffmpeg: &Path,
    output_path: &Path,
    duration_secs: f32,
) -> std::io::Result<ExitStatus> {
    Command::new(ffmpeg)
        .args([
            "-loglevel",
            "error",
            "-y",
            "-f",
            "lavfi",
            "-i",
            &format!("testsrc=duration={}:size=640x360:rate=30", duration_secs),
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            output_path.to_string_lossy().as_ref(),
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
}
