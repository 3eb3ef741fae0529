use crate::encode::{EncodeSpec, filter_graph};

/// Seconds formatted for `-ss`/`-t` with microsecond precision.
fn format_seconds(secs: f64) -> String {
    format!("{:.6}", secs.max(0.0))
}

/// Renders `spec` into FFmpeg arguments (no shell involved).
///
/// Seeking happens before `-i` so only the snippet window is decoded.
/// When `with_progress` is set, machine-readable progress goes to stdout.
pub fn build_ffmpeg_command(
    spec: &EncodeSpec,
    input_path: &str,
    output_path: &str,
    threads: u32,
    with_progress: bool,
) -> Vec<String> {
    let window = spec.window();
    log::debug!(
        target: "vidsnip::ffmpeg::builder",
        "Building FFmpeg command: format={}, start={}, length={}, input={} -> output={}",
        spec.format().extension(),
        window.start_offset,
        window.length,
        input_path,
        output_path
    );

    let mut args = vec!["-nostdin".to_string(), "-y".to_string()];
    if with_progress {
        args.extend(["-progress".to_string(), "pipe:1".to_string()]);
    }
    args.extend([
        "-ss".to_string(),
        format_seconds(window.start_offset),
        "-t".to_string(),
        format_seconds(window.length),
        "-i".to_string(),
        input_path.to_string(),
        "-vf".to_string(),
        filter_graph(spec.filters()),
    ]);

    match spec {
        EncodeSpec::AnimatedImage(webp) => {
            args.extend([
                "-c:v".to_string(),
                "libwebp".to_string(),
                "-preset".to_string(),
                "picture".to_string(),
                "-compression_level".to_string(),
                webp.compression_effort.to_string(),
                "-lossless".to_string(),
                "0".to_string(),
                "-quality".to_string(),
                webp.quality.to_string(),
                "-loop".to_string(),
                webp.loop_count.to_string(),
                "-vsync".to_string(),
                "0".to_string(),
                "-qmin".to_string(),
                webp.qmin.to_string(),
                "-qmax".to_string(),
                webp.qmax.to_string(),
            ]);
            if webp.strip_metadata {
                args.extend([
                    "-map_metadata".to_string(),
                    "-1".to_string(),
                    "-metadata".to_string(),
                    "author=".to_string(),
                ]);
            }
        }
        EncodeSpec::SilentVideo(video) => {
            args.extend([
                "-c:v".to_string(),
                "libx264".to_string(),
                "-preset".to_string(),
                video.preset.to_string(),
                "-crf".to_string(),
                video.crf.to_string(),
                "-profile:v".to_string(),
                video.profile.to_string(),
                "-pix_fmt".to_string(),
                video.pixel_format.to_string(),
            ]);
            if video.faststart {
                args.extend(["-movflags".to_string(), "+faststart".to_string()]);
            }
        }
    }

    args.extend([
        "-an".to_string(),
        "-threads".to_string(),
        threads.to_string(),
        output_path.to_string(),
    ]);
    args
}

/// Formats args for display with one flag (and its value) per line.
pub fn format_args_for_display_multiline(args: &[String]) -> String {
    if args.is_empty() {
        return String::new();
    }
    let mut lines = Vec::new();
    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        let line = if arg.starts_with('-') && i + 1 < args.len() && !is_flag(&args[i + 1]) {
            let value = &args[i + 1];
            i += 2;
            format!("  {} {}", arg, value)
        } else {
            i += 1;
            format!("  {}", arg)
        };
        lines.push(line);
    }
    lines.join("\n")
}

/// Negative numbers (e.g. `-map_metadata -1`) are values, not flags.
fn is_flag(arg: &str) -> bool {
    arg.starts_with('-') && !arg[1..].starts_with(|c: char| c.is_ascii_digit())
}
