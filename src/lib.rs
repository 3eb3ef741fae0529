pub mod config;
pub mod encode;
pub mod error;
pub mod ffmpeg;
pub mod options;
pub mod planner;
pub mod preview;
pub mod sidecar_api;

pub use config::PreviewConfig;
pub use encode::{AnimatedImageSpec, EncodeSpec, Filter, SilentVideoSpec, build_encode_spec};
pub use error::AppError;
pub use options::{CanonicalParameters, OutputFormat, Position, RawOptions, normalize};
pub use planner::{SnippetPlan, plan_snippet};
pub use preview::{
    DurationProbe, PreviewArtifact, PreviewOutcome, PreviewPlan, PreviewProducer, Transcoder,
};
