//! Error types for instance generation and animation synthesis.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GrowthError>;

/// Broad classification of a [`GrowthError`].
///
/// The orchestrator uses the kind to decide whether a failure aborts a
/// whole run ([`ErrorKind::Configuration`]) or only the current guide or
/// instance ([`ErrorKind::Data`], [`ErrorKind::Resource`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Data,
    State,
    Resource,
    Cancelled,
}

/// Errors that can occur while multiplying and animating guide curves.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GrowthError {
    /// The named source collection does not exist in the scene.
    #[error("source collection `{0}` not found")]
    SourceNotFound(String),

    /// Noise octave count must be at least one.
    #[error("noise octaves must be positive, got {0}")]
    InvalidOctaves(u32),

    /// Noise scale must be strictly positive.
    #[error("noise scale must be positive, got {0}")]
    InvalidNoiseScale(f32),

    /// The animation frame range is empty or inverted.
    #[error("frame start must be before frame end, got {start}..{end}")]
    InvalidFrameRange {
        /// First frame of the range.
        start: f32,
        /// Last frame of the range.
        end: f32,
    },

    /// A `[min, max]` range is inverted or not finite.
    #[error("invalid {what} range: min {min} > max {max}")]
    InvalidRange {
        /// Which setting the range belongs to.
        what: &'static str,
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },

    /// A scatter or jitter range is negative.
    #[error("{what} must be non-negative, got {value}")]
    NegativeRange {
        /// Which setting was negative.
        what: &'static str,
        /// The provided value.
        value: f32,
    },

    /// A run would produce instances without any profile animation.
    #[error("run `{0}` animates neither thickness nor extrusion")]
    MissingProfile(String),

    /// The curve has no control points to work on.
    #[error("curve `{0}` has no control points")]
    EmptyCurve(String),

    /// The polygon could not be turned into an edge curve.
    #[error("mesh `{mesh}` polygon {polygon}: {reason}")]
    EdgeCurve {
        /// Source mesh name.
        mesh: String,
        /// Polygon index within the mesh.
        polygon: usize,
        /// What went wrong.
        reason: String,
    },

    /// Interpolation was requested before any keyframe was inserted.
    #[error("instance `{0}` has no animation curves to set interpolation on")]
    NoKeyframes(String),

    /// A pipeline step was invoked out of order.
    #[error("instance `{name}` cannot go from {from} to {to}")]
    InvalidTransition {
        /// Instance name.
        name: String,
        /// Current stage.
        from: &'static str,
        /// Requested stage.
        to: &'static str,
    },

    /// The scene store refused to register an instance.
    #[error("failed to register `{name}`: {reason}")]
    Registration {
        /// Instance name.
        name: String,
        /// Store-provided reason.
        reason: String,
    },

    /// The run was cancelled before this step.
    #[error("run cancelled")]
    Cancelled,
}

impl GrowthError {
    /// Returns the [`ErrorKind`] this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceNotFound(_)
            | Self::InvalidOctaves(_)
            | Self::InvalidNoiseScale(_)
            | Self::InvalidFrameRange { .. }
            | Self::InvalidRange { .. }
            | Self::NegativeRange { .. }
            | Self::MissingProfile(_) => ErrorKind::Configuration,
            Self::EmptyCurve(_) | Self::EdgeCurve { .. } => ErrorKind::Data,
            Self::NoKeyframes(_) | Self::InvalidTransition { .. } => ErrorKind::State,
            Self::Registration { .. } => ErrorKind::Resource,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }
}
