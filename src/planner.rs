//! Snippet window selection.

use serde::Serialize;

use crate::config::PreviewConfig;
use crate::error::AppError;
use crate::options::Position;

/// Window extracted from the source: `start_offset + length <= duration`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetPlan {
    pub start_offset: f64,
    pub length: f64,
}

impl SnippetPlan {
    pub fn end(&self) -> f64 {
        self.start_offset + self.length
    }
}

fn start_offset(duration: f64, length: f64, position: Position, config: &PreviewConfig) -> f64 {
    match position {
        Position::Start => {
            if duration > config.start_offset_secs + length {
                config.start_offset_secs
            } else {
                0.0
            }
        }
        Position::End => {
            if duration <= config.end_offset_secs + length {
                (duration - length).max(0.0)
            } else {
                (duration - config.end_offset_secs - length).max(0.0)
            }
        }
        Position::Middle => (duration / 2.0 - length / 2.0)
            .min(duration - length)
            .max(0.0),
    }
}

/// Computes the snippet window for a video of `duration` seconds.
///
/// The requested length is first clamped to the duration; short videos fall
/// back toward offset 0 with the whole (or shrunk) length.
pub fn plan_snippet(
    duration: f64,
    length: f64,
    position: Position,
    config: &PreviewConfig,
) -> Result<SnippetPlan, AppError> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(AppError::InvalidDuration(duration));
    }
    let length = length.min(duration);
    let start_offset = start_offset(duration, length, position, config);

    log::debug!(
        target: "vidsnip::planner",
        "plan_snippet: position={}, duration={}, length={} -> start={}",
        position.as_str(),
        duration,
        length,
        start_offset
    );

    Ok(SnippetPlan {
        start_offset,
        length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn plan(duration: f64, length: f64, position: Position) -> SnippetPlan {
        plan_snippet(duration, length, position, &PreviewConfig::default()).expect("plan")
    }

    #[test]
    fn start_skips_head_when_video_is_long_enough() {
        assert_eq!(plan(12.0, 2.0, Position::Start).start_offset, 2.0);
    }

    #[test]
    fn start_falls_back_to_zero_for_short_video() {
        assert_eq!(plan(3.0, 2.0, Position::Start).start_offset, 0.0);
    }

    #[test]
    fn start_boundary_is_strict() {
        // 4 > 2 + 2 is false
        assert_eq!(plan(4.0, 2.0, Position::Start).start_offset, 0.0);
        assert_eq!(plan(4.5, 2.0, Position::Start).start_offset, 2.0);
    }

    #[test]
    fn end_short_video_takes_tail() {
        assert_eq!(plan(8.0, 2.0, Position::End).start_offset, 6.0);
    }

    #[test]
    fn end_long_video_keeps_offset_from_tail() {
        assert_eq!(plan(20.0, 2.0, Position::End).start_offset, 8.0);
    }

    #[test]
    fn end_boundary_is_inclusive() {
        // 12 <= 10 + 2, so the window sits at the very tail
        assert_eq!(plan(12.0, 2.0, Position::End).start_offset, 10.0);
        assert_eq!(plan(12.5, 2.0, Position::End).start_offset, 0.5);
    }

    #[test]
    fn middle_centers_window() {
        let p = plan(10.0, 4.0, Position::Middle);
        assert_eq!(p.start_offset, 3.0);
        assert_eq!(p.length, 4.0);
    }

    #[test]
    fn length_is_clamped_to_duration() {
        for position in [Position::Start, Position::Middle, Position::End] {
            let p = plan(1.5, 4.0, position);
            assert_eq!(p.length, 1.5);
            assert_eq!(p.start_offset, 0.0);
        }
    }

    #[test]
    fn non_positive_duration_is_rejected() {
        let config = PreviewConfig::default();
        for d in [0.0, -1.0, f64::NAN] {
            let err = plan_snippet(d, 2.0, Position::Middle, &config).unwrap_err();
            assert!(matches!(err, AppError::InvalidDuration(_)));
        }
    }

    #[test]
    fn windows_stay_inside_video() {
        let lengths = [0.1, 0.5, 1.0, 2.0, 3.3, 7.0, 10.0];
        for position in [Position::Start, Position::Middle, Position::End] {
            for step in 1..=400 {
                let duration = step as f64 * 0.137;
                for length in lengths {
                    let p = plan(duration, length, position);
                    assert!(p.start_offset >= 0.0, "{position:?} D={duration} L={length}");
                    assert!(p.length > 0.0);
                    assert!(p.length <= duration + EPS);
                    assert!(
                        p.end() <= duration + EPS,
                        "{position:?} D={duration} L={length}: {p:?}"
                    );
                }
            }
        }
    }

    #[test]
    fn alternate_offsets_are_honored() {
        let config = PreviewConfig {
            start_offset_secs: 5.0,
            end_offset_secs: 3.0,
            ..PreviewConfig::default()
        };
        let start = plan_snippet(30.0, 2.0, Position::Start, &config).unwrap();
        assert_eq!(start.start_offset, 5.0);
        let end = plan_snippet(30.0, 2.0, Position::End, &config).unwrap();
        assert_eq!(end.start_offset, 25.0);
    }
}
