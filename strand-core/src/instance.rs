use serde::Serialize;

use crate::animation::AnimationTrack;
use crate::curve::{CurveData, CurveProfile, GuideCurve, Transform};
use crate::error::{GrowthError, Result};
use crate::types::Frame;

/// Lifecycle of an [`Instance`].
///
/// Steps run in declaration order. `Perturbed` may be skipped, and the
/// two keying steps may happen in either order, but both must be done
/// before `InterpolationSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstanceStage {
    Created,
    Transformed,
    Perturbed,
    GrowthKeyed,
    ProfileKeyed,
    InterpolationSet,
    Registered,
}

impl InstanceStage {
    pub fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Transformed => "transformed",
            Self::Perturbed => "perturbed",
            Self::GrowthKeyed => "growth-keyed",
            Self::ProfileKeyed => "profile-keyed",
            Self::InterpolationSet => "interpolation-set",
            Self::Registered => "registered",
        }
    }
}

/// Collection an instance is registered into.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum Destination {
    /// The scene's active/default collection.
    Active,
    Named(String),
}

impl Destination {
    pub fn from_option(name: Option<&str>) -> Self {
        match name {
            Some(n) => Self::Named(n.to_owned()),
            None => Self::Active,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Active => None,
            Self::Named(n) => Some(n),
        }
    }
}

/// Independent, deep copy of a guide curve with its own placement and
/// animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instance {
    pub name: String,
    /// Name of the guide this instance was cloned from.
    pub guide: String,
    pub data: CurveData,
    pub transform: Transform,
    pub track: AnimationTrack,
    pub destination: Destination,
    stage: InstanceStage,
    growth_keyed: bool,
    profile_keyed: bool,
}

impl Instance {
    /// Clones geometry, profile and material of `guide`. The animation
    /// track starts empty.
    pub fn from_guide(
        guide: &GuideCurve,
        name: impl Into<String>,
        destination: Destination,
    ) -> Self {
        Self {
            name: name.into(),
            guide: guide.name.clone(),
            data: guide.data.clone(),
            transform: guide.transform,
            track: AnimationTrack::new(),
            destination,
            stage: InstanceStage::Created,
            growth_keyed: false,
            profile_keyed: false,
        }
    }

    pub fn stage(&self) -> InstanceStage {
        self.stage
    }

    /// Both growth and profile curves are keyed and interpolation is set.
    pub fn is_complete(&self) -> bool {
        self.stage >= InstanceStage::InterpolationSet
    }

    /// Profile as rendered at `frame`, with every animated channel evaluated.
    pub fn profile_at(&self, frame: Frame) -> CurveProfile {
        let mut profile = self.data.profile;
        self.track.apply_at(&mut profile, frame);
        profile
    }

    fn invalid(&self, to: InstanceStage) -> GrowthError {
        GrowthError::InvalidTransition {
            name: self.name.clone(),
            from: self.stage.name(),
            to: to.name(),
        }
    }

    pub(crate) fn mark_transformed(&mut self) -> Result<()> {
        if self.stage != InstanceStage::Created {
            return Err(self.invalid(InstanceStage::Transformed));
        }
        self.stage = InstanceStage::Transformed;
        Ok(())
    }

    pub(crate) fn check_perturbable(&self) -> Result<()> {
        if self.stage != InstanceStage::Transformed {
            return Err(self.invalid(InstanceStage::Perturbed));
        }
        Ok(())
    }

    pub(crate) fn mark_perturbed(&mut self) -> Result<()> {
        self.check_perturbable()?;
        self.stage = InstanceStage::Perturbed;
        Ok(())
    }

    fn check_keyable(&self, to: InstanceStage) -> Result<()> {
        if self.stage < InstanceStage::Transformed
            || self.stage >= InstanceStage::InterpolationSet
        {
            return Err(self.invalid(to));
        }
        Ok(())
    }

    pub(crate) fn mark_growth_keyed(&mut self) -> Result<()> {
        self.check_keyable(InstanceStage::GrowthKeyed)?;
        self.growth_keyed = true;
        self.stage = self.stage.max(InstanceStage::GrowthKeyed);
        Ok(())
    }

    pub(crate) fn mark_profile_keyed(&mut self) -> Result<()> {
        self.check_keyable(InstanceStage::ProfileKeyed)?;
        self.profile_keyed = true;
        self.stage = self.stage.max(InstanceStage::ProfileKeyed);
        Ok(())
    }

    /// Advances to `InterpolationSet` once both keying steps are done.
    /// Returns whether the stage moved.
    pub(crate) fn mark_interpolation_set(&mut self) -> bool {
        if self.growth_keyed && self.profile_keyed && self.stage < InstanceStage::InterpolationSet {
            self.stage = InstanceStage::InterpolationSet;
            true
        } else {
            false
        }
    }

    /// Gate before handing the instance to a scene store.
    pub(crate) fn check_registrable(&self) -> Result<()> {
        if self.stage != InstanceStage::InterpolationSet {
            return Err(self.invalid(InstanceStage::Registered));
        }
        Ok(())
    }

    pub(crate) fn mark_registered(&mut self) {
        self.stage = InstanceStage::Registered;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::Channel;
    use crate::curve::{ControlPoint, SplineKind};
    use crate::error::ErrorKind;
    use glam::Vec3;

    fn guide() -> GuideCurve {
        let mut data = CurveData::new(
            SplineKind::Poly,
            vec![
                ControlPoint::weighted(Vec3::ZERO, 1.0),
                ControlPoint::weighted(Vec3::Z, 1.0),
            ],
        );
        data.material = Some("grass".into());
        GuideCurve::new("blade", data)
    }

    #[test]
    fn clone_is_deep_and_starts_clean() {
        let g = guide();
        let mut inst = Instance::from_guide(&g, "blade.001", Destination::Active);

        assert_eq!(inst.data, g.data);
        assert_eq!(inst.guide, "blade");
        assert!(inst.track.is_empty());
        assert_eq!(inst.stage(), InstanceStage::Created);

        inst.data.points[0].co = Vec3::ONE;
        assert_eq!(g.data.points[0].co, Vec3::ZERO);
    }

    #[test]
    fn keying_order_is_free_but_both_are_required() {
        let mut inst = Instance::from_guide(&guide(), "a", Destination::Active);
        inst.mark_transformed().unwrap();

        inst.mark_profile_keyed().unwrap();
        assert!(!inst.mark_interpolation_set());
        inst.mark_growth_keyed().unwrap();
        assert_eq!(inst.stage(), InstanceStage::ProfileKeyed);

        assert!(inst.mark_interpolation_set());
        assert!(inst.is_complete());
        inst.check_registrable().unwrap();
    }

    #[test]
    fn steps_cannot_run_out_of_order() {
        let mut inst = Instance::from_guide(&guide(), "a", Destination::Active);

        let err = inst.mark_growth_keyed().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert!(inst.mark_perturbed().is_err());
        assert!(inst.check_registrable().is_err());

        inst.mark_transformed().unwrap();
        inst.mark_growth_keyed().unwrap();
        // Perturbation has to come before keying.
        assert!(inst.mark_perturbed().is_err());
    }

    #[test]
    fn profile_at_evaluates_the_track() {
        let mut inst = Instance::from_guide(&guide(), "a", Destination::Named("out".into()));
        inst.track.insert_keyframe(Channel::Thickness, 0.0, 0.0);
        inst.track.insert_keyframe(Channel::Thickness, 10.0, 0.5);

        assert_eq!(inst.profile_at(10.0).bevel_depth, 0.5);
        assert_eq!(inst.profile_at(-1.0).bevel_depth, 0.0);
        assert_eq!(inst.destination.as_name(), Some("out"));
    }
}
