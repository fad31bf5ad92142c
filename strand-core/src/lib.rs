//! Core library for procedural growth animation of guide curves.
//!
//! Guide curves are multiplied into many randomly placed, optionally
//! noise-perturbed instances, each animated to grow along its length while
//! its cross-section thickens.
//!
//! Main components:
//! - [`curve`] - curve geometry, profiles and transforms.
//! - [`noise_field`] - seeded fractal 3-D vector noise.
//! - [`animation`] - keyframed parameter curves and interpolation.
//! - [`instance`] - a cloned guide and its processing stage.
//! - [`generator`] - clone placement (scatter, initial bevel).
//! - [`perturb`] - noise displacement of control points.
//! - [`synth`] - growth and profile keyframe synthesis.
//! - [`config`] - run configuration and built-in presets.
//! - [`scene`] - scene-store traits and an in-memory scene.
//! - [`pipeline`] - batch orchestration and cancellation.
//! - [`error`] - error type and its classification.
//! - [`types`] - shared type aliases and IDs.

pub mod animation;
pub mod config;
pub mod curve;
pub mod error;
pub mod generator;
pub mod instance;
pub mod noise_field;
pub mod perturb;
pub mod pipeline;
pub mod scene;
pub mod synth;
pub mod types;

pub use config::{GuideSource, PipelineConfig, Preset, RunConfig};
pub use error::{ErrorKind, GrowthError, Result};
pub use pipeline::{BatchReport, CancelToken, Pipeline};
pub use scene::{MemoryScene, SceneStore};
