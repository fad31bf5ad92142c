use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curve::GuideCurve;
use crate::error::{GrowthError, Result};
use crate::instance::{Destination, Instance};

/// Random rigid placement applied to each clone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScatterParams {
    /// Width of the square, centred on the guide, that clones are moved within.
    pub translation_range: f32,
    /// Upper bound of the uniform scale factor.
    pub scale_range: f32,
}

impl ScatterParams {
    pub fn validate(&self) -> Result<()> {
        non_negative("translation range", self.translation_range)?;
        non_negative("scale range", self.scale_range)
    }
}

pub(crate) fn non_negative(what: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GrowthError::NegativeRange { what, value })
    }
}

/// Clones a guide curve into independently placed [`Instance`]s.
///
/// Without [`ScatterParams`] clones keep the guide's transform.
#[derive(Debug, Clone)]
pub struct InstanceGenerator {
    pub destination: Destination,
    pub scatter: Option<ScatterParams>,
    /// Upper bound of a random initial bevel depth.
    pub initial_bevel: Option<f32>,
}

impl InstanceGenerator {
    pub fn new(destination: Destination) -> Self {
        Self {
            destination,
            scatter: None,
            initial_bevel: None,
        }
    }

    pub fn with_scatter(mut self, scatter: ScatterParams) -> Self {
        self.scatter = Some(scatter);
        self
    }

    pub fn with_initial_bevel(mut self, max: f32) -> Self {
        self.initial_bevel = Some(max);
        self
    }

    /// Name of the `index`-th clone of `guide`: `blade.001`, `blade.002`, ...
    pub fn instance_name(guide: &GuideCurve, index: usize) -> String {
        format!("{}.{:03}", guide.name, index + 1)
    }

    /// Builds the `index`-th clone of `guide`, drawing from `rng`.
    ///
    /// With scatter enabled the clone gets:
    /// - a rotation about Z drawn uniformly from `[0°, 360°)`,
    /// - an XY offset from the guide location drawn uniformly from
    ///   `[-translation_range / 2, translation_range / 2]` per axis,
    /// - one scale factor drawn from `[0, scale_range]`, applied to all axes.
    ///
    /// The guide is expected to carry no unapplied transform.
    pub fn spawn(&self, guide: &GuideCurve, index: usize, rng: &mut impl Rng) -> Result<Instance> {
        if let Some(s) = &self.scatter {
            s.validate()?;
        }
        if let Some(max) = self.initial_bevel {
            non_negative("initial bevel", max)?;
        }

        let name = Self::instance_name(guide, index);
        let mut inst = Instance::from_guide(guide, name, self.destination.clone());

        if let Some(max) = self.initial_bevel {
            inst.data.profile.bevel_depth = rng.random_range(0.0..=max);
        }

        if let Some(s) = &self.scatter {
            let degrees: f32 = rng.random_range(0.0..360.0);
            inst.transform.rotation.z = degrees.to_radians();

            let half = s.translation_range / 2.0;
            inst.transform.location.x = guide.transform.location.x + rng.random_range(-half..=half);
            inst.transform.location.y = guide.transform.location.y + rng.random_range(-half..=half);

            let scale = rng.random_range(0.0..=s.scale_range);
            inst.transform.scale = Vec3::splat(scale);
        }

        inst.mark_transformed()?;
        debug!(
            instance = %inst.name,
            location = ?inst.transform.location,
            scale = inst.transform.scale.x,
            "spawned instance"
        );
        Ok(inst)
    }

    /// Builds `count` clones of `guide`. `count == 0` yields an empty vector.
    pub fn generate(
        &self,
        guide: &GuideCurve,
        count: usize,
        rng: &mut impl Rng,
    ) -> Result<Vec<Instance>> {
        (0..count).map(|i| self.spawn(guide, i, rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::{ControlPoint, CurveData, SplineKind, Transform};
    use crate::instance::InstanceStage;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::f32::consts::TAU;

    fn bezier_guide() -> GuideCurve {
        let points = (0..5)
            .map(|i| ControlPoint::bezier(Vec3::new(0.1 * i as f32, 0.0, 0.3 * i as f32)))
            .collect();
        GuideCurve::new("blade", CurveData::new(SplineKind::Bezier, points)).with_transform(
            Transform {
                location: Vec3::new(4.0, -2.0, 1.0),
                rotation: Vec3::new(0.5, 0.25, 0.0),
                scale: Vec3::ONE,
            },
        )
    }

    fn scattering() -> InstanceGenerator {
        InstanceGenerator::new(Destination::Named("grass".into())).with_scatter(ScatterParams {
            translation_range: 3.0,
            scale_range: 2.0,
        })
    }

    #[test]
    fn zero_count_is_empty_not_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = scattering().generate(&bezier_guide(), 0, &mut rng).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn generates_exactly_count_clones_with_guide_geometry() {
        let guide = bezier_guide();
        let mut rng = StdRng::seed_from_u64(2);
        let out = scattering().generate(&guide, 7, &mut rng).unwrap();

        assert_eq!(out.len(), 7);
        for inst in &out {
            assert_eq!(inst.data.kind, SplineKind::Bezier);
            assert_eq!(inst.data.point_count(), 5);
            assert_eq!(inst.stage(), InstanceStage::Transformed);
            assert!(inst.track.is_empty());
        }
    }

    #[test]
    fn scatter_stays_in_range_with_uniform_scale() {
        let guide = bezier_guide();
        let mut rng = StdRng::seed_from_u64(3);
        let out = scattering().generate(&guide, 200, &mut rng).unwrap();

        for inst in &out {
            let t = &inst.transform;
            assert!(t.is_uniform_scale());
            assert!((0.0..=2.0).contains(&t.scale.x));
            assert!((t.location.x - 4.0).abs() <= 1.5);
            assert!((t.location.y + 2.0).abs() <= 1.5);
            // Height and the non-vertical rotation axes come from the guide.
            assert_eq!(t.location.z, 1.0);
            assert_eq!(t.rotation.x, 0.5);
            assert_eq!(t.rotation.y, 0.25);
            assert!((0.0..TAU).contains(&t.rotation.z));
        }
    }

    #[test]
    fn without_scatter_clones_keep_guide_transform() {
        let guide = bezier_guide();
        let mut rng = StdRng::seed_from_u64(4);
        let out = InstanceGenerator::new(Destination::Active)
            .with_initial_bevel(0.2)
            .generate(&guide, 3, &mut rng)
            .unwrap();

        for inst in &out {
            assert_eq!(inst.transform, guide.transform);
            assert!((0.0..=0.2).contains(&inst.data.profile.bevel_depth));
        }
    }

    #[test]
    fn clones_are_mutually_independent() {
        let guide = bezier_guide();
        let mut rng = StdRng::seed_from_u64(5);
        let mut out = scattering().generate(&guide, 2, &mut rng).unwrap();

        out[0].data.points[1].co = Vec3::splat(9.0);
        assert_eq!(out[1].data.points[1].co, guide.data.points[1].co);
        assert_ne!(out[0].name, out[1].name);
    }

    #[test]
    fn same_seed_same_clones() {
        let guide = bezier_guide();
        let a = scattering()
            .generate(&guide, 4, &mut StdRng::seed_from_u64(6))
            .unwrap();
        let b = scattering()
            .generate(&guide, 4, &mut StdRng::seed_from_u64(6))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn negative_ranges_are_rejected() {
        let s = ScatterParams {
            translation_range: -1.0,
            scale_range: 1.0,
        };
        assert!(matches!(
            s.validate(),
            Err(GrowthError::NegativeRange { what: "translation range", .. })
        ));

        let mut rng = StdRng::seed_from_u64(7);
        let guide = bezier_guide();
        let err = InstanceGenerator::new(Destination::Active)
            .with_scatter(s)
            .spawn(&guide, 0, &mut rng)
            .unwrap_err();
        assert!(matches!(err, GrowthError::NegativeRange { .. }));

        let err = InstanceGenerator::new(Destination::Active)
            .with_initial_bevel(f32::NAN)
            .spawn(&guide, 0, &mut rng)
            .unwrap_err();
        assert!(matches!(err, GrowthError::NegativeRange { what: "initial bevel", .. }));
    }

    #[test]
    fn degenerate_ranges_pin_the_placement() {
        let guide = bezier_guide();
        let mut rng = StdRng::seed_from_u64(8);
        let inst = InstanceGenerator::new(Destination::Active)
            .with_scatter(ScatterParams {
                translation_range: 0.0,
                scale_range: 0.0,
            })
            .with_initial_bevel(0.0)
            .spawn(&guide, 0, &mut rng)
            .unwrap();

        assert_eq!(inst.transform.location, guide.transform.location);
        assert_eq!(inst.transform.scale, Vec3::ZERO);
        assert_eq!(inst.data.profile.bevel_depth, 0.0);
    }
}
