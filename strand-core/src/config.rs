//! Pipeline configuration and named presets.
//!
//! A [`PipelineConfig`] is a list of independent [`RunConfig`]s, one per
//! `(source, destination)` pair, plus an optional seed. Everything is
//! `serde`-friendly so front ends can accept it as structured input.

use serde::{Deserialize, Serialize};

use crate::animation::{Easing, Interpolation};
use crate::error::{GrowthError, Result};
use crate::generator::{InstanceGenerator, ScatterParams, non_negative};
use crate::instance::Destination;
use crate::perturb::PerturbParams;
use crate::scene::EDGE_CURVE_BEVEL;
use crate::synth::{BoundedTarget, FrameRange, GrowthDirection, GrowthParams};

/// Where the guides of a run come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "collection", rename_all = "kebab-case")]
pub enum GuideSource {
    /// Every curve object in the named collection.
    Collection(String),
    /// One edge curve per polygon of every mesh in the named collection.
    MeshPolygons(String),
}

impl GuideSource {
    pub fn collection(&self) -> &str {
        match self {
            Self::Collection(c) | Self::MeshPolygons(c) => c,
        }
    }
}

/// Settings of one `(source, destination)` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub name: String,
    pub source: GuideSource,
    /// Target collection; the scene's active collection when absent.
    #[serde(default)]
    pub destination: Option<String>,
    pub copies_per_guide: usize,
    /// Random placement; clones keep the guide transform when absent.
    #[serde(default)]
    pub scatter: Option<ScatterParams>,
    pub frames: FrameRange,
    #[serde(default)]
    pub growth: GrowthParams,
    #[serde(default)]
    pub thickness: Option<BoundedTarget>,
    #[serde(default)]
    pub extrusion: Option<BoundedTarget>,
    #[serde(default)]
    pub perturb: Option<PerturbParams>,
    /// Cuts inserted per segment of each guide before cloning.
    #[serde(default)]
    pub subdivide: Option<usize>,
    /// Upper bound of a random initial bevel depth.
    #[serde(default)]
    pub initial_bevel: Option<f32>,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default)]
    pub easing: Easing,
}

impl RunConfig {
    /// Checks every setting that would otherwise fail per instance.
    pub fn validate(&self) -> Result<()> {
        self.frames.validate()?;
        if let Some(s) = &self.scatter {
            s.validate()?;
        }
        if let Some(t) = &self.thickness {
            t.validate("thickness")?;
        }
        if let Some(e) = &self.extrusion {
            e.validate("extrusion")?;
        }
        if self.thickness.is_none() && self.extrusion.is_none() {
            return Err(GrowthError::MissingProfile(self.name.clone()));
        }
        if let Some(p) = &self.perturb {
            p.noise.validate()?;
        }
        if let Some(b) = self.initial_bevel {
            non_negative("initial bevel", b)?;
        }
        Ok(())
    }

    pub fn destination(&self) -> Destination {
        Destination::from_option(self.destination.as_deref())
    }

    pub fn generator(&self) -> InstanceGenerator {
        InstanceGenerator {
            destination: self.destination(),
            scatter: self.scatter,
            initial_bevel: self.initial_bevel,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Base seed of every random stream. Drawn fresh per batch when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    pub runs: Vec<RunConfig>,
}

impl PipelineConfig {
    pub fn from_presets(presets: &[Preset]) -> Self {
        Self {
            seed: None,
            runs: presets.iter().map(|p| p.config()).collect(),
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// Built-in run configurations for the production scene setups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Preset {
    /// Scattered grass blades growing from the base while their bevel thickens.
    BevelGrowth,
    /// Dense scattered grass driven by extrusion depth, linear timing.
    ExtrudeGrowth,
    /// Noisy pillar vines growing from the tip, kept in place.
    PerturbedPillarGrowth,
    /// One finely subdivided, noise-wobbled curve along the edges of every
    /// pillar base polygon, with a constant thin bevel.
    PolygonEdgeCurves,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Self::BevelGrowth,
        Self::ExtrudeGrowth,
        Self::PerturbedPillarGrowth,
        Self::PolygonEdgeCurves,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::BevelGrowth => "bevel-growth",
            Self::ExtrudeGrowth => "extrude-growth",
            Self::PerturbedPillarGrowth => "perturbed-pillar-growth",
            Self::PolygonEdgeCurves => "polygon-edge-curves",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn config(self) -> RunConfig {
        let frames = FrameRange::new(0.0, 200.0);
        match self {
            Self::BevelGrowth => RunConfig {
                name: self.name().to_owned(),
                source: GuideSource::Collection("grass1_guides".into()),
                destination: None,
                copies_per_guide: 10,
                scatter: Some(ScatterParams {
                    translation_range: 3.0,
                    scale_range: 2.0,
                }),
                frames,
                growth: GrowthParams::default(),
                thickness: Some(BoundedTarget::new(0.01, 0.1, 0.0)),
                extrusion: None,
                perturb: None,
                subdivide: None,
                initial_bevel: Some(0.01),
                interpolation: Interpolation::Bezier,
                easing: Easing::Auto,
            },
            Self::ExtrudeGrowth => RunConfig {
                name: self.name().to_owned(),
                source: GuideSource::Collection("grass2_guides".into()),
                destination: Some("grass2_generated".into()),
                copies_per_guide: 100,
                scatter: Some(ScatterParams {
                    translation_range: 10.0,
                    scale_range: 3.0,
                }),
                frames,
                growth: GrowthParams {
                    start_growth: 0.1,
                    ..GrowthParams::default()
                },
                thickness: None,
                extrusion: Some(BoundedTarget::new(0.01, 0.2, 0.01)),
                perturb: None,
                subdivide: None,
                initial_bevel: None,
                interpolation: Interpolation::Linear,
                easing: Easing::Auto,
            },
            Self::PerturbedPillarGrowth => {
                let mut perturb = PerturbParams {
                    per_point_jitter: true,
                    ..PerturbParams::default()
                };
                perturb.noise.scale = 2.0;
                perturb.noise.strength = 3.0;
                perturb.noise.octaves = 1;
                perturb.noise.amplitude_falloff = 2.0;
                perturb.noise.frequency_falloff = 2.0;

                RunConfig {
                    name: self.name().to_owned(),
                    source: GuideSource::Collection("pillar_grow_curve_guide".into()),
                    destination: Some("pillar_grow_curve_generated".into()),
                    copies_per_guide: 10,
                    scatter: None,
                    frames,
                    growth: GrowthParams {
                        start_growth: 0.1,
                        growth_target: 1.0,
                        direction: GrowthDirection::FromTip,
                    },
                    thickness: Some(BoundedTarget::new(0.1, 0.2, 0.01)),
                    extrusion: None,
                    perturb: Some(perturb),
                    subdivide: None,
                    initial_bevel: Some(0.2),
                    interpolation: Interpolation::Bezier,
                    easing: Easing::Auto,
                }
            }
            Self::PolygonEdgeCurves => {
                let mut perturb = PerturbParams {
                    per_point_jitter: true,
                    ..PerturbParams::default()
                };
                perturb.noise.scale = 5.0;
                perturb.noise.strength = 0.4;
                perturb.noise.octaves = 1;
                perturb.noise.amplitude_falloff = 0.5;
                perturb.noise.frequency_falloff = 1.0;

                RunConfig {
                    name: self.name().to_owned(),
                    source: GuideSource::MeshPolygons("pillars_base".into()),
                    destination: Some("pillars_generated".into()),
                    copies_per_guide: 1,
                    scatter: None,
                    frames,
                    growth: GrowthParams::default(),
                    thickness: Some(BoundedTarget::new(
                        EDGE_CURVE_BEVEL,
                        EDGE_CURVE_BEVEL,
                        EDGE_CURVE_BEVEL,
                    )),
                    extrusion: None,
                    perturb: Some(perturb),
                    subdivide: Some(10),
                    initial_bevel: None,
                    interpolation: Interpolation::Bezier,
                    easing: Easing::Auto,
                }
            }
        }
    }
}
