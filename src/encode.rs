//! Encode specifications: the typed filter chain and codec knobs for one preview.
//!
//! Pure data. Rendering into FFmpeg arguments lives in `ffmpeg::builder`.

use std::fmt;

use serde::Serialize;

use crate::options::{CanonicalParameters, OutputFormat};
use crate::planner::SnippetPlan;

/// Levels above this get pre-smoothing; levels at or below get sharpening.
const SHARPEN_MAX_LEVEL: u8 = 3;
const CONTRAST: f64 = 1.1;
const WEBP_MAX_EFFORT: u8 = 4;
const WEBP_MAX_QMAX: u8 = 20;
const X264_BASE_CRF: u8 = 18;
const X264_MAX_CRF: u8 = 28;

/// One stage of the video filter chain, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Filter {
    /// Light unsharp blur that keeps heavy compression from amplifying noise.
    Smooth,
    /// Lanczos downscale to `width`, height follows aspect ratio.
    Scale { width: u32 },
    Contrast { factor: f64 },
    /// Stronger luma unsharp for text edges.
    Sharpen,
    Fps { fps: u32 },
    /// Rounds both dimensions down to even numbers (4:2:0 chroma).
    EvenCrop,
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Smooth => f.write_str("unsharp=3:3:0.3:3:3:0.1"),
            Filter::Scale { width } => write!(f, "scale={}:-1:flags=lanczos+accurate_rnd", width),
            Filter::Contrast { factor } => write!(f, "eq=contrast={}", factor),
            Filter::Sharpen => f.write_str("unsharp=5:5:1.0:5:5:0.0"),
            Filter::Fps { fps } => write!(f, "fps={}", fps),
            Filter::EvenCrop => f.write_str("crop=trunc(iw/2)*2:trunc(ih/2)*2"),
        }
    }
}

/// Joins filters into an FFmpeg `-vf` graph.
pub fn filter_graph(filters: &[Filter]) -> String {
    filters
        .iter()
        .map(Filter::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Lossy animated WebP, looping forever.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimatedImageSpec {
    pub window: SnippetPlan,
    pub filters: Vec<Filter>,
    pub quality: u8,
    /// libwebp `-compression_level` (encoder effort, 0-6).
    pub compression_effort: u8,
    pub qmin: u8,
    pub qmax: u8,
    /// 0 loops forever.
    pub loop_count: u32,
    pub strip_metadata: bool,
}

/// Silent H.264 MP4 laid out for progressive playback.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SilentVideoSpec {
    pub window: SnippetPlan,
    pub filters: Vec<Filter>,
    pub crf: u8,
    pub preset: &'static str,
    pub profile: &'static str,
    pub pixel_format: &'static str,
    pub faststart: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum EncodeSpec {
    AnimatedImage(AnimatedImageSpec),
    SilentVideo(SilentVideoSpec),
}

impl EncodeSpec {
    pub fn window(&self) -> SnippetPlan {
        match self {
            EncodeSpec::AnimatedImage(s) => s.window,
            EncodeSpec::SilentVideo(s) => s.window,
        }
    }

    pub fn filters(&self) -> &[Filter] {
        match self {
            EncodeSpec::AnimatedImage(s) => &s.filters,
            EncodeSpec::SilentVideo(s) => &s.filters,
        }
    }

    pub fn format(&self) -> OutputFormat {
        match self {
            EncodeSpec::AnimatedImage(_) => OutputFormat::Webp,
            EncodeSpec::SilentVideo(_) => OutputFormat::Mp4,
        }
    }
}

fn text_legibility_filters(params: &CanonicalParameters) -> Vec<Filter> {
    let heavy = params.compression_level > SHARPEN_MAX_LEVEL;
    let mut filters = Vec::with_capacity(5);
    if heavy {
        filters.push(Filter::Smooth);
    }
    filters.push(Filter::Scale {
        width: params.width,
    });
    filters.push(Filter::Contrast { factor: CONTRAST });
    if !heavy {
        filters.push(Filter::Sharpen);
    }
    filters.push(Filter::Fps { fps: params.fps });
    filters.push(Filter::EvenCrop);
    filters
}

/// `min(28, 18 + 2 * level)`.
pub fn crf_for_level(level: u8) -> u8 {
    X264_BASE_CRF
        .saturating_add(level.saturating_mul(2))
        .min(X264_MAX_CRF)
}

/// Builds the encode spec for `plan` from canonical parameters.
pub fn build_encode_spec(plan: SnippetPlan, params: &CanonicalParameters) -> EncodeSpec {
    let level = params.compression_level;
    let filters = text_legibility_filters(params);
    let spec = match params.format {
        OutputFormat::Webp => EncodeSpec::AnimatedImage(AnimatedImageSpec {
            window: plan,
            filters,
            quality: params.quality,
            compression_effort: level.min(WEBP_MAX_EFFORT),
            qmin: level.max(1),
            qmax: level.saturating_mul(4).min(WEBP_MAX_QMAX),
            loop_count: 0,
            strip_metadata: true,
        }),
        OutputFormat::Mp4 => EncodeSpec::SilentVideo(SilentVideoSpec {
            window: plan,
            filters,
            crf: crf_for_level(level),
            preset: "medium",
            profile: "main",
            pixel_format: "yuv420p",
            faststart: true,
        }),
    };
    log::debug!(
        target: "vidsnip::encode",
        "build_encode_spec: format={}, level={}, filters={}",
        params.format.extension(),
        level,
        filter_graph(spec.filters())
    );
    spec
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Position;

    fn params(level: u8, format: OutputFormat) -> CanonicalParameters {
        CanonicalParameters {
            width: 640,
            fps: 15,
            compression_level: level,
            quality: 75,
            snippet_length: 2.0,
            position: Position::Middle,
            format,
        }
    }

    fn window() -> SnippetPlan {
        SnippetPlan {
            start_offset: 4.0,
            length: 2.0,
        }
    }

    #[test]
    fn light_compression_chain_sharpens() {
        let spec = build_encode_spec(window(), &params(3, OutputFormat::Webp));
        assert_eq!(
            filter_graph(spec.filters()),
            "scale=640:-1:flags=lanczos+accurate_rnd,eq=contrast=1.1,unsharp=5:5:1.0:5:5:0.0,fps=15,crop=trunc(iw/2)*2:trunc(ih/2)*2"
        );
    }

    #[test]
    fn heavy_compression_chain_smooths_first() {
        let spec = build_encode_spec(window(), &params(4, OutputFormat::Mp4));
        assert_eq!(
            filter_graph(spec.filters()),
            "unsharp=3:3:0.3:3:3:0.1,scale=640:-1:flags=lanczos+accurate_rnd,eq=contrast=1.1,fps=15,crop=trunc(iw/2)*2:trunc(ih/2)*2"
        );
    }

    #[test]
    fn exactly_one_of_smooth_or_sharpen_per_level() {
        for level in 1..=5u8 {
            let spec = build_encode_spec(window(), &params(level, OutputFormat::Webp));
            let smooth = spec.filters().contains(&Filter::Smooth);
            let sharpen = spec.filters().contains(&Filter::Sharpen);
            assert!(smooth ^ sharpen, "level {level}");
            assert_eq!(sharpen, level <= 3, "level {level}");
        }
    }

    #[test]
    fn chain_always_ends_with_fps_then_even_crop() {
        for level in 1..=5u8 {
            let spec = build_encode_spec(window(), &params(level, OutputFormat::Mp4));
            let tail = &spec.filters()[spec.filters().len() - 2..];
            assert_eq!(tail, &[Filter::Fps { fps: 15 }, Filter::EvenCrop]);
        }
    }

    #[test]
    fn webp_knobs_follow_level() {
        let expected = [(1, 1, 1, 4), (2, 2, 2, 8), (3, 3, 3, 12), (4, 4, 4, 16), (5, 4, 5, 20)];
        for (level, effort, qmin, qmax) in expected {
            let EncodeSpec::AnimatedImage(spec) =
                build_encode_spec(window(), &params(level, OutputFormat::Webp))
            else {
                panic!("expected animated image spec");
            };
            assert_eq!(spec.compression_effort, effort, "level {level}");
            assert_eq!(spec.qmin, qmin, "level {level}");
            assert_eq!(spec.qmax, qmax, "level {level}");
            assert_eq!(spec.quality, 75);
            assert_eq!(spec.loop_count, 0);
            assert!(spec.strip_metadata);
        }
    }

    #[test]
    fn mp4_crf_follows_level() {
        let crfs: Vec<u8> = (1..=5).map(crf_for_level).collect();
        assert_eq!(crfs, vec![20, 22, 24, 26, 28]);
        assert_eq!(crf_for_level(9), 28);
    }

    #[test]
    fn mp4_spec_is_streamable_h264() {
        let spec = build_encode_spec(window(), &params(2, OutputFormat::Mp4));
        assert_eq!(spec.format(), OutputFormat::Mp4);
        assert_eq!(spec.window(), window());
        let EncodeSpec::SilentVideo(video) = spec else {
            panic!("expected silent video spec");
        };
        assert_eq!(video.crf, 22);
        assert_eq!(video.profile, "main");
        assert_eq!(video.pixel_format, "yuv420p");
        assert!(video.faststart);
    }
}
