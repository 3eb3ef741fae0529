//! FFmpeg process spawning.
//!
//! Spawns FFmpeg with an argument array, reads `-progress pipe:1` output from
//! stdout on a background thread and keeps a bounded tail of stderr for
//! diagnostics while the calling thread waits for completion.

use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[cfg(windows)]
use std::os::windows::process::CommandExt;

use parking_lot::Mutex;

use super::progress::parse_ffmpeg_progress;
use crate::error::AppError;

pub type ProgressCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Minimum interval between progress callbacks.
const PROGRESS_EMIT_INTERVAL: Duration = Duration::from_millis(150);
/// Keep only the last N bytes of stderr to avoid unbounded memory growth.
const MAX_STDERR_BYTES: usize = 64 * 1024;

fn read_progress<R: Read + Send + 'static>(
    reader: R,
    snippet_secs: f64,
    callback: Option<ProgressCallback>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut last_emit: Option<Instant> = None;
        for line in BufReader::new(reader).lines() {
            let Ok(line) = line else { break };
            let Some(cb) = callback.as_ref() else {
                continue;
            };
            if let Some(p) = parse_ffmpeg_progress(&line, snippet_secs) {
                let now = Instant::now();
                let due = last_emit.is_none_or(|t| now.duration_since(t) >= PROGRESS_EMIT_INTERVAL);
                if due || p >= 1.0 {
                    last_emit = Some(now);
                    cb(p);
                }
            }
        }
    })
}

fn read_stderr_tail<R: Read + Send + 'static>(
    reader: R,
    buffer: Arc<Mutex<Vec<u8>>>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let mut stream_reader = BufReader::new(reader);
        let mut line_buf = Vec::with_capacity(256);
        while stream_reader.read_until(b'\n', &mut line_buf).unwrap_or(0) > 0 {
            let mut guard = buffer.lock();
            guard.extend_from_slice(&line_buf);
            if guard.len() > MAX_STDERR_BYTES {
                let excess = guard.len() - MAX_STDERR_BYTES;
                guard.drain(..excess);
            }
            drop(guard);
            line_buf.clear();
        }
    })
}

/// One-line rendering of the invocation for error reports.
pub fn display_command(ffmpeg: &Path, args: &[String]) -> String {
    let mut parts = vec![ffmpeg.display().to_string()];
    parts.extend(args.iter().map(|a| {
        if a.is_empty() || a.contains(char::is_whitespace) {
            format!("{:?}", a)
        } else {
            a.clone()
        }
    }));
    parts.join(" ")
}

/// Run FFmpeg and block until it exits.
///
/// `snippet_secs` scales progress; `progress_callback` receives values in [0, 1].
/// A non-zero exit returns `TranscodeFailed` with the command line and the
/// captured stderr tail.
pub fn run_ffmpeg_blocking(
    ffmpeg: &Path,
    args: Vec<String>,
    snippet_secs: f64,
    progress_callback: Option<ProgressCallback>,
) -> Result<(), AppError> {
    let command_line = display_command(ffmpeg, &args);
    log::debug!(
        target: "vidsnip::ffmpeg::runner",
        "Spawning FFmpeg: {}",
        command_line
    );

    let mut cmd = Command::new(ffmpeg);
    cmd.args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    #[cfg(windows)]
    cmd.creation_flags(0x08000000); // CREATE_NO_WINDOW
    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AppError::ToolUnavailable(format!("FFmpeg binary not found at {}", ffmpeg.display()))
        } else {
            AppError::transcode_failed(-1, &command_line, format!("Failed to spawn FFmpeg: {}", e))
        }
    })?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill();
        let _ = child.wait();
        return Err(AppError::transcode_failed(
            -1,
            &command_line,
            "Failed to capture FFmpeg output",
        ));
    };

    let stderr_buffer = Arc::new(Mutex::new(Vec::new()));
    let stdout_handle = read_progress(stdout, snippet_secs, progress_callback);
    let stderr_handle = read_stderr_tail(stderr, Arc::clone(&stderr_buffer));

    let _ = stdout_handle.join();
    let _ = stderr_handle.join();
    let status = child.wait()?;

    let stderr_str = String::from_utf8_lossy(&stderr_buffer.lock()).to_string();

    if status.success() {
        log::info!(
            target: "vidsnip::ffmpeg::runner",
            "FFmpeg completed successfully"
        );
        Ok(())
    } else {
        let code = status.code().unwrap_or(-1);
        let err_preview = stderr_str
            .lines()
            .rev()
            .take(3)
            .collect::<Vec<_>>()
            .join("; ");
        log::error!(
            target: "vidsnip::ffmpeg::runner",
            "FFmpeg failed (code={}): {}",
            code,
            err_preview
        );
        Err(AppError::transcode_failed(code, command_line, stderr_str))
    }
}
