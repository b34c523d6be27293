use std::path::PathBuf;
use thiserror::Error;

/// Everything that can make a kart refuse to initialize.
///
/// None of these are produced once a `KartDynamics` exists: every check runs
/// at construction so the per-tick math never sees a bad parameter.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("fixed tick length must be positive and finite, got {0}")]
    NonPositiveTick(f32),

    #[error("{field} must be finite, got {value}")]
    NotFinite { field: &'static str, value: f32 },

    #[error("{field} must be non-negative, got {value}")]
    Negative { field: &'static str, value: f32 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("{field} must lie in [{min}, {max}], got {value}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("missing mount reference: {0}")]
    MissingMount(&'static str),

    #[error("torque curve: {0}")]
    TorqueCurve(String),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse kart configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
