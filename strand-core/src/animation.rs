//! Keyframed parameter curves attached to generated instances.
//!
//! An [`AnimationTrack`] owns one [`ParameterCurve`] per animated
//! [`Channel`]. Each curve is a frame-sorted list of [`Keyframe`]s; the
//! interpolation and easing stored on a key shape the segment that starts
//! at that key, the way animation hosts evaluate f-curves.

use std::f32::consts::{FRAC_PI_2, PI};

use serde::{Deserialize, Serialize};

use crate::curve::CurveProfile;
use crate::types::Frame;

/// Profile attribute driven by a [`ParameterCurve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    /// Start of the revealed range (`bevel_factor_start`).
    GrowthStart,
    /// End of the revealed range (`bevel_factor_end`).
    GrowthEnd,
    /// Bevel radius (`bevel_depth`).
    Thickness,
    /// Extrusion depth (`extrude`).
    Extrusion,
}

impl Channel {
    pub fn name(self) -> &'static str {
        match self {
            Self::GrowthStart => "growth-start",
            Self::GrowthEnd => "growth-end",
            Self::Thickness => "thickness",
            Self::Extrusion => "extrusion",
        }
    }

    pub fn read(self, profile: &CurveProfile) -> f32 {
        match self {
            Self::GrowthStart => profile.bevel_factor_start,
            Self::GrowthEnd => profile.bevel_factor_end,
            Self::Thickness => profile.bevel_depth,
            Self::Extrusion => profile.extrude,
        }
    }

    pub fn write(self, profile: &mut CurveProfile, value: f32) {
        match self {
            Self::GrowthStart => profile.bevel_factor_start = value,
            Self::GrowthEnd => profile.bevel_factor_end = value,
            Self::Thickness => profile.bevel_depth = value,
            Self::Extrusion => profile.extrude = value,
        }
    }
}

/// Segment shape between a key and the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Constant,
    Linear,
    #[default]
    Bezier,
    Sine,
    Quad,
    Cubic,
    Quart,
    Quint,
    Expo,
    Circ,
    Back,
    Bounce,
    Elastic,
}

impl Interpolation {
    /// Back, Bounce and Elastic overshoot or oscillate.
    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::Back | Self::Bounce | Self::Elastic)
    }
}

/// Which end of a segment the easing function acts on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Easing {
    #[default]
    Auto,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Resolves [`Easing::Auto`]: dynamic effects ease out, the
    /// transitional families ease in.
    pub fn resolve(self, interpolation: Interpolation) -> Easing {
        match self {
            Easing::Auto if interpolation.is_dynamic() => Easing::EaseOut,
            Easing::Auto => Easing::EaseIn,
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub frame: Frame,
    pub value: f32,
    pub interpolation: Interpolation,
    pub easing: Easing,
}

impl Keyframe {
    pub fn new(frame: Frame, value: f32) -> Self {
        Self {
            frame,
            value,
            interpolation: Interpolation::default(),
            easing: Easing::default(),
        }
    }
}

/// Frame-sorted keys of one [`Channel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterCurve {
    pub channel: Channel,
    keyframes: Vec<Keyframe>,
}

impl ParameterCurve {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            keyframes: Vec::with_capacity(2),
        }
    }

    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    /// Inserts a key, replacing the value of an existing key on the same
    /// frame. A replaced key keeps its interpolation and easing.
    pub fn insert(&mut self, frame: Frame, value: f32) {
        match self
            .keyframes
            .binary_search_by(|k| k.frame.total_cmp(&frame))
        {
            Ok(i) => self.keyframes[i].value = value,
            Err(i) => self.keyframes.insert(i, Keyframe::new(frame, value)),
        }
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation, easing: Easing) {
        for k in &mut self.keyframes {
            k.interpolation = interpolation;
            k.easing = easing;
        }
    }

    /// Value of the curve at `frame`.
    ///
    /// Before the first key and after the last one the curve is constant.
    /// Returns `None` for a curve without keys.
    pub fn evaluate(&self, frame: Frame) -> Option<f32> {
        let first = self.keyframes.first()?;
        let last = self.keyframes.last()?;
        if frame <= first.frame {
            return Some(first.value);
        }
        if frame >= last.frame {
            return Some(last.value);
        }

        // `frame` lies strictly inside the key range, so both neighbours exist.
        let next = self.keyframes.partition_point(|k| k.frame <= frame);
        let a = &self.keyframes[next - 1];
        let b = &self.keyframes[next];
        let t = (frame - a.frame) / (b.frame - a.frame);
        let shaped = shape(a.interpolation, a.easing, t);
        Some(a.value + (b.value - a.value) * shaped)
    }
}

/// Maps a normalized segment position `t` in `[0, 1]` to an interpolation factor.
fn shape(interpolation: Interpolation, easing: Easing, t: f32) -> f32 {
    match interpolation {
        Interpolation::Constant => 0.0,
        Interpolation::Linear => t,
        Interpolation::Bezier => t * t * (3.0 - 2.0 * t),
        _ => match easing.resolve(interpolation) {
            Easing::EaseOut => 1.0 - ease_in(interpolation, 1.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    ease_in(interpolation, 2.0 * t) / 2.0
                } else {
                    1.0 - ease_in(interpolation, 2.0 - 2.0 * t) / 2.0
                }
            }
            _ => ease_in(interpolation, t),
        },
    }
}

fn ease_in(interpolation: Interpolation, t: f32) -> f32 {
    match interpolation {
        Interpolation::Sine => 1.0 - (t * FRAC_PI_2).cos(),
        Interpolation::Quad => t.powi(2),
        Interpolation::Cubic => t.powi(3),
        Interpolation::Quart => t.powi(4),
        Interpolation::Quint => t.powi(5),
        Interpolation::Expo => {
            if t <= 0.0 {
                0.0
            } else {
                2f32.powf(10.0 * t - 10.0)
            }
        }
        Interpolation::Circ => 1.0 - (1.0 - t * t).max(0.0).sqrt(),
        Interpolation::Back => {
            const C1: f32 = 1.70158;
            (C1 + 1.0) * t * t * t - C1 * t * t
        }
        Interpolation::Bounce => 1.0 - bounce_out(1.0 - t),
        Interpolation::Elastic => {
            if t <= 0.0 || t >= 1.0 {
                t.clamp(0.0, 1.0)
            } else {
                let c4 = 2.0 * PI / 3.0;
                -(2f32.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
            }
        }
        Interpolation::Constant => 0.0,
        Interpolation::Linear => t,
        Interpolation::Bezier => t * t * (3.0 - 2.0 * t),
    }
}

fn bounce_out(t: f32) -> f32 {
    const N1: f32 = 7.5625;
    const D1: f32 = 2.75;
    if t < 1.0 / D1 {
        N1 * t * t
    } else if t < 2.0 / D1 {
        let t = t - 1.5 / D1;
        N1 * t * t + 0.75
    } else if t < 2.5 / D1 {
        let t = t - 2.25 / D1;
        N1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / D1;
        N1 * t * t + 0.984375
    }
}

/// All parameter curves of one instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationTrack {
    curves: Vec<ParameterCurve>,
}

impl AnimationTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    pub fn curves(&self) -> &[ParameterCurve] {
        &self.curves
    }

    pub fn curves_mut(&mut self) -> &mut [ParameterCurve] {
        &mut self.curves
    }

    pub fn curve(&self, channel: Channel) -> Option<&ParameterCurve> {
        self.curves.iter().find(|c| c.channel == channel)
    }

    pub fn keyframe_count(&self) -> usize {
        self.curves.iter().map(ParameterCurve::len).sum()
    }

    /// Inserts a key on `channel`, creating its curve on first use.
    pub fn insert_keyframe(&mut self, channel: Channel, frame: Frame, value: f32) {
        let idx = match self.curves.iter().position(|c| c.channel == channel) {
            Some(i) => i,
            None => {
                self.curves.push(ParameterCurve::new(channel));
                self.curves.len() - 1
            }
        };
        self.curves[idx].insert(frame, value);
    }

    /// Writes the value of every animated channel at `frame` into `profile`.
    /// Channels without a curve keep their current value.
    pub fn apply_at(&self, profile: &mut CurveProfile, frame: Frame) {
        for c in &self.curves {
            if let Some(v) = c.evaluate(frame) {
                c.channel.write(profile, v);
            }
        }
    }

    pub fn clear(&mut self) {
        self.curves.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_key(interpolation: Interpolation, easing: Easing) -> ParameterCurve {
        let mut c = ParameterCurve::new(Channel::Thickness);
        c.insert(0.0, 0.0);
        c.insert(100.0, 1.0);
        c.set_interpolation(interpolation, easing);
        c
    }

    #[test]
    fn insert_keeps_frames_sorted_and_replaces_duplicates() {
        let mut c = ParameterCurve::new(Channel::GrowthEnd);
        c.insert(200.0, 1.0);
        c.insert(0.0, 0.1);
        c.insert(0.0, 0.2);

        assert_eq!(c.len(), 2);
        assert_eq!(c.keyframes()[0].frame, 0.0);
        assert_eq!(c.keyframes()[0].value, 0.2);
        assert_eq!(c.keyframes()[1].frame, 200.0);
    }

    #[test]
    fn new_keys_use_host_defaults() {
        let mut c = ParameterCurve::new(Channel::Thickness);
        c.insert(1.0, 1.0);
        assert_eq!(c.keyframes()[0].interpolation, Interpolation::Bezier);
        assert_eq!(c.keyframes()[0].easing, Easing::Auto);
    }

    #[test]
    fn evaluate_clamps_outside_key_range() {
        let c = two_key(Interpolation::Linear, Easing::Auto);
        assert_eq!(c.evaluate(-10.0), Some(0.0));
        assert_eq!(c.evaluate(500.0), Some(1.0));
        assert_eq!(ParameterCurve::new(Channel::Extrusion).evaluate(0.0), None);
    }

    #[test]
    fn linear_constant_and_bezier_segments() {
        let linear = two_key(Interpolation::Linear, Easing::Auto);
        assert_relative_eq!(linear.evaluate(25.0).unwrap(), 0.25);

        let constant = two_key(Interpolation::Constant, Easing::Auto);
        assert_eq!(constant.evaluate(99.0), Some(0.0));
        assert_eq!(constant.evaluate(100.0), Some(1.0));

        let bezier = two_key(Interpolation::Bezier, Easing::Auto);
        assert_relative_eq!(bezier.evaluate(50.0).unwrap(), 0.5);
        assert_relative_eq!(bezier.evaluate(25.0).unwrap(), 0.15625);
    }

    #[test]
    fn easing_direction_shapes_penner_families() {
        let quad_in = two_key(Interpolation::Quad, Easing::EaseIn);
        assert_relative_eq!(quad_in.evaluate(50.0).unwrap(), 0.25);

        let quad_out = two_key(Interpolation::Quad, Easing::EaseOut);
        assert_relative_eq!(quad_out.evaluate(50.0).unwrap(), 0.75);

        let quad_in_out = two_key(Interpolation::Quad, Easing::EaseInOut);
        assert_relative_eq!(quad_in_out.evaluate(25.0).unwrap(), 0.125);
        assert_relative_eq!(quad_in_out.evaluate(50.0).unwrap(), 0.5);
    }

    #[test]
    fn auto_easing_depends_on_the_family() {
        assert_eq!(Easing::Auto.resolve(Interpolation::Cubic), Easing::EaseIn);
        assert_eq!(Easing::Auto.resolve(Interpolation::Bounce), Easing::EaseOut);
        assert_eq!(Easing::EaseInOut.resolve(Interpolation::Bounce), Easing::EaseInOut);
    }

    #[test]
    fn every_family_hits_both_endpoints() {
        use Interpolation::*;
        for interp in [Sine, Quad, Cubic, Quart, Quint, Expo, Circ, Back, Bounce, Elastic] {
            for easing in [Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
                assert_relative_eq!(shape(interp, easing, 0.0), 0.0, epsilon = 1e-3);
                assert_relative_eq!(shape(interp, easing, 1.0), 1.0, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn back_overshoots_below_start() {
        let back = two_key(Interpolation::Back, Easing::EaseIn);
        assert!(back.evaluate(20.0).unwrap() < 0.0);
    }

    #[test]
    fn track_creates_one_curve_per_channel() {
        let mut track = AnimationTrack::new();
        assert!(track.is_empty());

        track.insert_keyframe(Channel::GrowthStart, 0.0, 0.0);
        track.insert_keyframe(Channel::GrowthStart, 200.0, 1.0);
        track.insert_keyframe(Channel::Thickness, 0.0, 0.01);

        assert_eq!(track.curves().len(), 2);
        assert_eq!(track.keyframe_count(), 3);
        assert_eq!(track.curve(Channel::GrowthStart).unwrap().len(), 2);
        assert!(track.curve(Channel::Extrusion).is_none());
    }

    #[test]
    fn apply_at_writes_only_animated_channels() {
        let mut track = AnimationTrack::new();
        track.insert_keyframe(Channel::Extrusion, 0.0, 0.0);
        track.insert_keyframe(Channel::Extrusion, 10.0, 2.0);
        track.curves_mut()[0].set_interpolation(Interpolation::Linear, Easing::Auto);

        let mut profile = CurveProfile::default();
        profile.bevel_depth = 0.3;
        track.apply_at(&mut profile, 5.0);

        assert_relative_eq!(profile.extrude, 1.0);
        assert_eq!(profile.bevel_depth, 0.3);
        assert_eq!(Channel::Extrusion.read(&profile), profile.extrude);
    }
}
