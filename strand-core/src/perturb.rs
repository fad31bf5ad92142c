//! Noise-driven displacement of curve control points.
//!
//! Every control point of a supported spline is moved by the
//! [`NoiseField`] sampled at its own position. Only the three spatial
//! coordinates change; point order, point count, spline kind and the
//! homogeneous weight of Poly/NURBS points are preserved.
//!
//! ### Per-point jitter
//! With `per_point_jitter` enabled, each point's sampling position is
//! multiplied by its own uniform random factor in `[0, 1)`. Neighbouring
//! points then read unrelated parts of the field, which destroys the
//! spatial coherence the noise is meant to provide. It is off by default
//! and only the perturbed-pillar preset turns it on; treat it as a
//! probable defect kept for compatibility, not as a feature.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::curve::CurveData;
use crate::error::{GrowthError, Result};
use crate::instance::Instance;
use crate::noise_field::{NoiseField, NoiseParams};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerturbParams {
    #[serde(flatten)]
    pub noise: NoiseParams,
    #[serde(default)]
    pub per_point_jitter: bool,
}

/// Displaces the control points of `curve` in place.
///
/// ### Parameters
/// - `curve` - Geometry to modify. `name` is only used in errors.
/// - `field` - Noise field providing the displacement.
/// - `jitter` - Draw an independent sampling multiplier per point.
/// - `rng` - Source of the jitter multipliers; untouched when `jitter` is off.
///
/// ### Returns
/// - `Ok(n)` with the number of points moved. Unsupported spline kinds
///   are passed through unchanged and report `0`.
/// - `Err(GrowthError::EmptyCurve)` if a supported curve has no points.
pub fn displace_points(
    curve: &mut CurveData,
    name: &str,
    field: &NoiseField,
    jitter: bool,
    rng: &mut impl Rng,
) -> Result<usize> {
    if !curve.kind.is_supported() {
        return Ok(0);
    }
    if curve.points.is_empty() {
        return Err(GrowthError::EmptyCurve(name.to_owned()));
    }

    for p in &mut curve.points {
        let j = if jitter { rng.random::<f32>() } else { 1.0 };
        p.co += field.sample(p.co * j);
    }
    Ok(curve.points.len())
}

/// Perturbs an instance that has just been placed.
///
/// Fails with a configuration error if `params.noise` is invalid, with a
/// data error if the curve has no points, and with a state error if the
/// instance is not in the `Transformed` stage.
pub fn perturb(instance: &mut Instance, params: &PerturbParams, rng: &mut impl Rng) -> Result<()> {
    let field = NoiseField::new(params.noise)?;
    perturb_with(instance, &field, params.per_point_jitter, rng)
}

/// Like [`perturb`], reusing an already built field.
pub fn perturb_with(
    instance: &mut Instance,
    field: &NoiseField,
    jitter: bool,
    rng: &mut impl Rng,
) -> Result<()> {
    instance.check_perturbable()?;
    let moved = displace_points(&mut instance.data, &instance.name, field, jitter, rng)?;
    instance.mark_perturbed()?;
    debug!(instance = %instance.name, moved, jitter, "perturbed control points");
    Ok(())
}
