//! Multi-octave coherent noise mapping positions to displacement vectors.
//!
//! A [`NoiseField`] sums `octaves` layers of vector noise. Layer `k` is
//! evaluated at `position * scale * frequency_falloff^k` and weighted by
//! `strength * amplitude_falloff^k`. The field is a pure function of its
//! parameters: two fields built from equal [`NoiseParams`] return equal
//! samples for equal positions.

use std::fmt;

use glam::Vec3;
use noise::{NoiseFn, OpenSimplex, Perlin, SuperSimplex, Value};
use serde::{Deserialize, Serialize};

use crate::error::{GrowthError, Result};

/// Fixed sampling offset of each output channel. Gradient bases vanish on
/// the integer lattice, so every channel reads away from it.
const CHANNEL_OFFSETS: [[f64; 3]; 3] = [
    [0.5379, 0.2113, 0.7701],
    [0.3141, 0.8623, 0.1379],
    [0.6917, 0.4271, 0.9127],
];

/// Coherent noise basis evaluated for each octave.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseBasis {
    #[default]
    Perlin,
    OpenSimplex,
    SuperSimplex,
    Value,
}

/// Parameters of a [`NoiseField`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Base frequency applied to the input position. Must be positive.
    pub scale: f32,
    /// Base amplitude of the displacement.
    pub strength: f32,
    /// Number of layers summed. Must be at least one.
    pub octaves: u32,
    /// Amplitude multiplier between consecutive octaves.
    pub amplitude_falloff: f32,
    /// Frequency multiplier between consecutive octaves.
    pub frequency_falloff: f32,
    #[serde(default)]
    pub basis: NoiseBasis,
    /// Take the absolute value of every octave ("hard" turbulence).
    #[serde(default)]
    pub hard: bool,
    /// Permutation seed of the basis.
    #[serde(default)]
    pub seed: u32,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            scale: 1.0,
            strength: 1.0,
            octaves: 1,
            amplitude_falloff: 1.0,
            frequency_falloff: 1.0,
            basis: NoiseBasis::Perlin,
            hard: false,
            seed: 0,
        }
    }
}

impl NoiseParams {
    /// Checks that the octave count and scale are usable.
    ///
    /// ### Returns
    /// - `Err(GrowthError::InvalidOctaves)` if `octaves == 0`.
    /// - `Err(GrowthError::InvalidNoiseScale)` if `scale` is not a
    ///   positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.octaves == 0 {
            return Err(GrowthError::InvalidOctaves(self.octaves));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(GrowthError::InvalidNoiseScale(self.scale));
        }
        Ok(())
    }
}

#[derive(Clone)]
enum BasisFn {
    Perlin(Perlin),
    OpenSimplex(OpenSimplex),
    SuperSimplex(SuperSimplex),
    Value(Value),
}

impl BasisFn {
    fn new(basis: NoiseBasis, seed: u32) -> Self {
        match basis {
            NoiseBasis::Perlin => Self::Perlin(Perlin::new(seed)),
            NoiseBasis::OpenSimplex => Self::OpenSimplex(OpenSimplex::new(seed)),
            NoiseBasis::SuperSimplex => Self::SuperSimplex(SuperSimplex::new(seed)),
            NoiseBasis::Value => Self::Value(Value::new(seed)),
        }
    }

    #[inline]
    fn get(&self, p: [f64; 3]) -> f64 {
        match self {
            Self::Perlin(n) => n.get(p),
            Self::OpenSimplex(n) => n.get(p),
            Self::SuperSimplex(n) => n.get(p),
            Self::Value(n) => n.get(p),
        }
    }
}

/// Vector-valued multi-octave noise.
///
/// Each output axis reads its own basis instance, seeded from
/// `params.seed` plus the axis index, so the three components are
/// decorrelated.
#[derive(Clone)]
pub struct NoiseField {
    params: NoiseParams,
    channels: [BasisFn; 3],
}

impl fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoiseField")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl NoiseField {
    /// Builds a field after validating `params`.
    pub fn new(params: NoiseParams) -> Result<Self> {
        params.validate()?;
        let channels =
            [0u32, 1, 2].map(|axis| BasisFn::new(params.basis, params.seed.wrapping_add(axis)));
        Ok(Self { params, channels })
    }

    pub fn params(&self) -> &NoiseParams {
        &self.params
    }

    /// Evaluates one octave of the basis at `p`, without scale or strength.
    ///
    /// Channel `i` is read at `p + CHANNEL_OFFSETS[i]`.
    #[inline]
    pub fn basis_vector(&self, p: Vec3) -> Vec3 {
        let q = [p.x as f64, p.y as f64, p.z as f64];
        let axis = |i: usize| {
            let o = CHANNEL_OFFSETS[i];
            self.channels[i].get([q[0] + o[0], q[1] + o[1], q[2] + o[2]]) as f32
        };
        Vec3::new(axis(0), axis(1), axis(2))
    }

    /// Returns the displacement at `position`.
    pub fn sample(&self, position: Vec3) -> Vec3 {
        let p = &self.params;
        let mut total = Vec3::ZERO;
        let mut amplitude = p.strength;
        let mut frequency = p.scale;

        for _ in 0..p.octaves {
            let mut layer = self.basis_vector(position * frequency);
            if p.hard {
                layer = layer.abs();
            }
            total += layer * amplitude;
            amplitude *= p.amplitude_falloff;
            frequency *= p.frequency_falloff;
        }
        total
    }
}

/// One-shot form of [`NoiseField::sample`].
pub fn sample(position: Vec3, params: &NoiseParams) -> Result<Vec3> {
    Ok(NoiseField::new(*params)?.sample(position))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use approx::assert_relative_eq;

    const P: Vec3 = Vec3::new(0.37, 1.21, -0.58);

    #[test]
    fn rejects_zero_octaves_and_non_positive_scale() {
        let mut params = NoiseParams::default();
        params.octaves = 0;
        let err = NoiseField::new(params).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        let mut params = NoiseParams::default();
        params.scale = 0.0;
        assert!(matches!(
            NoiseField::new(params),
            Err(GrowthError::InvalidNoiseScale(_))
        ));

        params.scale = -2.0;
        assert!(sample(P, &params).is_err());
    }

    #[test]
    fn sampling_is_deterministic() {
        let mut params = NoiseParams::default();
        params.octaves = 3;
        params.amplitude_falloff = 0.5;
        params.frequency_falloff = 2.0;

        let a = NoiseField::new(params).unwrap();
        let b = NoiseField::new(params).unwrap();
        assert_eq!(a.sample(P), b.sample(P));
        assert_eq!(a.sample(P), a.sample(P));
    }

    #[test]
    fn single_octave_reduces_to_one_basis_evaluation() {
        let mut params = NoiseParams::default();
        params.scale = 2.5;
        params.strength = 3.0;

        let field = NoiseField::new(params).unwrap();
        let expected = field.basis_vector(P * 2.5) * 3.0;
        let got = field.sample(P);
        assert_relative_eq!(got.x, expected.x, epsilon = 1e-6);
        assert_relative_eq!(got.y, expected.y, epsilon = 1e-6);
        assert_relative_eq!(got.z, expected.z, epsilon = 1e-6);
    }

    #[test]
    fn octaves_accumulate_with_falloff() {
        let mut params = NoiseParams::default();
        params.scale = 1.5;
        params.strength = 2.0;
        params.octaves = 2;
        params.amplitude_falloff = 0.5;
        params.frequency_falloff = 3.0;

        let field = NoiseField::new(params).unwrap();
        let expected = field.basis_vector(P * 1.5) * 2.0 + field.basis_vector(P * 4.5) * 1.0;
        let got = field.sample(P);
        assert_relative_eq!(got.x, expected.x, epsilon = 1e-5);
        assert_relative_eq!(got.y, expected.y, epsilon = 1e-5);
        assert_relative_eq!(got.z, expected.z, epsilon = 1e-5);
    }

    #[test]
    fn axes_are_decorrelated() {
        let field = NoiseField::new(NoiseParams::default()).unwrap();
        let v = field.basis_vector(P);
        assert!(v.x != v.y || v.y != v.z);
    }

    #[test]
    fn hard_mode_never_points_backwards() {
        let mut params = NoiseParams::default();
        params.hard = true;
        params.octaves = 4;
        params.amplitude_falloff = 0.5;
        params.frequency_falloff = 2.0;

        let field = NoiseField::new(params).unwrap();
        for i in 0..32 {
            let v = field.sample(Vec3::new(i as f32 * 0.31, 0.17, i as f32 * -0.23));
            assert!(v.cmpge(Vec3::ZERO).all());
        }
    }

    #[test]
    fn lattice_points_and_origin_still_move() {
        let mut params = NoiseParams::default();
        params.scale = 2.0;
        params.strength = 3.0;
        let field = NoiseField::new(params).unwrap();

        assert_ne!(field.sample(Vec3::ZERO), Vec3::ZERO);
        for x in -2..=2 {
            let v = field.sample(Vec3::new(x as f32, 0.0, 0.0));
            assert!(v.length() > 1e-4, "no displacement at x = {x}");
        }
        for basis in [NoiseBasis::OpenSimplex, NoiseBasis::SuperSimplex, NoiseBasis::Value] {
            params.basis = basis;
            let field = NoiseField::new(params).unwrap();
            assert_ne!(field.sample(Vec3::ZERO), Vec3::ZERO, "{basis:?}");
        }
    }

    #[test]
    fn zero_strength_means_no_displacement() {
        let mut params = NoiseParams::default();
        params.strength = 0.0;
        params.basis = NoiseBasis::SuperSimplex;
        assert_eq!(sample(P, &params).unwrap(), Vec3::ZERO);
    }
}
