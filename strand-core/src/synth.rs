//! Animation synthesis for generated instances.
//!
//! The synthesizers write two-key curves spanning a [`FrameRange`]:
//! - [`key_growth`] animates the revealed sub-range of the curve,
//! - [`key_bounded_target`] animates a profile attribute from a fixed
//!   start value to one random target (thickness and extrusion are both
//!   expressed through it),
//! - [`apply_interpolation`] then sets the segment shape of every key.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::animation::{Channel, Easing, Interpolation};
use crate::error::{GrowthError, Result};
use crate::instance::Instance;
use crate::types::Frame;

/// Timeline span of the synthesized curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: Frame,
    pub end: Frame,
}

impl FrameRange {
    pub fn new(start: Frame, end: Frame) -> Self {
        Self { start, end }
    }

    /// `start` must be strictly before `end`.
    pub fn validate(&self) -> Result<()> {
        if self.start.is_finite() && self.end.is_finite() && self.start < self.end {
            Ok(())
        } else {
            Err(GrowthError::InvalidFrameRange {
                start: self.start,
                end: self.end,
            })
        }
    }
}

/// Which boundary of the revealed range moves while the curve grows.
///
/// The grass presets grow from the base, the pillar preset from the tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GrowthDirection {
    /// The end boundary is held at 0 and the start boundary moves.
    #[default]
    FromBase,
    /// The start boundary is held at 0 and the end boundary moves.
    FromTip,
}

impl GrowthDirection {
    /// Returns `(held, moving)` channels.
    pub fn channels(self) -> (Channel, Channel) {
        match self {
            Self::FromBase => (Channel::GrowthEnd, Channel::GrowthStart),
            Self::FromTip => (Channel::GrowthStart, Channel::GrowthEnd),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthParams {
    /// Value of the moving boundary at the first frame.
    #[serde(default)]
    pub start_growth: f32,
    /// Value of the moving boundary at the last frame.
    #[serde(default = "default_growth_target")]
    pub growth_target: f32,
    #[serde(default)]
    pub direction: GrowthDirection,
}

fn default_growth_target() -> f32 {
    1.0
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self {
            start_growth: 0.0,
            growth_target: default_growth_target(),
            direction: GrowthDirection::default(),
        }
    }
}

/// Profile animation from a fixed start value to a random target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundedTarget {
    pub min: f32,
    pub max: f32,
    /// Value at the first frame.
    #[serde(default)]
    pub start: f32,
}

impl BoundedTarget {
    pub fn new(min: f32, max: f32, start: f32) -> Self {
        Self { min, max, start }
    }

    pub fn validate(&self, what: &'static str) -> Result<()> {
        if self.min.is_finite() && self.max.is_finite() && self.min <= self.max {
            Ok(())
        } else {
            Err(GrowthError::InvalidRange {
                what,
                min: self.min,
                max: self.max,
            })
        }
    }

    /// Draws one target uniformly from `[min, max]`. The range has to pass
    /// [`BoundedTarget::validate`] first.
    pub fn sample(&self, rng: &mut impl Rng) -> f32 {
        rng.random_range(self.min..=self.max)
    }
}

/// Keys the growth reveal of `instance`.
///
/// The held boundary gets `0` at both ends of `frames`; the moving one
/// goes from `growth.start_growth` to `growth.growth_target`.
pub fn key_growth(
    instance: &mut Instance,
    frames: FrameRange,
    growth: &GrowthParams,
) -> Result<()> {
    frames.validate()?;
    instance.mark_growth_keyed()?;

    let (held, moving) = growth.direction.channels();
    let track = &mut instance.track;
    track.insert_keyframe(held, frames.start, 0.0);
    track.insert_keyframe(held, frames.end, 0.0);
    track.insert_keyframe(moving, frames.start, growth.start_growth);
    track.insert_keyframe(moving, frames.end, growth.growth_target);
    Ok(())
}

/// Keys `channel` from `target.start` at the first frame to one random
/// value in `[target.min, target.max]` at the last frame.
///
/// ### Returns
/// The sampled end value.
pub fn key_bounded_target(
    instance: &mut Instance,
    channel: Channel,
    frames: FrameRange,
    target: &BoundedTarget,
    rng: &mut impl Rng,
) -> Result<f32> {
    frames.validate()?;
    target.validate(channel.name())?;
    instance.mark_profile_keyed()?;

    let end = target.sample(rng);
    instance.track.insert_keyframe(channel, frames.start, target.start);
    instance.track.insert_keyframe(channel, frames.end, end);
    debug!(instance = %instance.name, channel = channel.name(), end, "keyed profile");
    Ok(end)
}

pub fn key_thickness(
    instance: &mut Instance,
    frames: FrameRange,
    target: &BoundedTarget,
    rng: &mut impl Rng,
) -> Result<f32> {
    key_bounded_target(instance, Channel::Thickness, frames, target, rng)
}

pub fn key_extrusion(
    instance: &mut Instance,
    frames: FrameRange,
    target: &BoundedTarget,
    rng: &mut impl Rng,
) -> Result<f32> {
    key_bounded_target(instance, Channel::Extrusion, frames, target, rng)
}

/// Sets `interpolation` and `easing` on every key of every curve.
///
/// Fails with [`GrowthError::NoKeyframes`] when the instance has no curves
/// yet; growth or profile keys have to be inserted first.
pub fn apply_interpolation(
    instance: &mut Instance,
    interpolation: Interpolation,
    easing: Easing,
) -> Result<()> {
    if instance.track.is_empty() {
        return Err(GrowthError::NoKeyframes(instance.name.clone()));
    }
    for curve in instance.track.curves_mut() {
        curve.set_interpolation(interpolation, easing);
    }
    instance.mark_interpolation_set();
    Ok(())
}
