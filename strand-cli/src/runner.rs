//! Batch runner behind the `run` subcommand.
//!
//! [`Runner`] owns a [`MemoryScene`], fills it either from a scene file or
//! with generated demo guides, runs a [`PipelineConfig`] against it and
//! reports what was registered.

use std::collections::BTreeMap;
use std::f32::consts::TAU;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use anyhow::{Context, Result};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use strand_core::curve::{ControlPoint, CurveData, GuideCurve, SplineKind};
use strand_core::instance::Instance;
use strand_core::scene::PolyMesh;
use strand_core::{BatchReport, GuideSource, MemoryScene, Pipeline, PipelineConfig, SceneStore};
use tracing::{debug, info};

/// Guides generated per demo collection.
const DEMO_GUIDES: usize = 3;
/// Control points per demo guide.
const DEMO_POINTS: usize = 5;

/// On-disk scene: guide curves and meshes keyed by collection name.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SceneFile {
    #[serde(default)]
    pub guides: BTreeMap<String, Vec<GuideCurve>>,
    #[serde(default)]
    pub meshes: BTreeMap<String, Vec<PolyMesh>>,
}

pub struct Runner {
    scene: MemoryScene,
}

impl Runner {
    /// Loads every guide and mesh of a [`SceneFile`].
    pub fn from_scene_file(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let doc: SceneFile = serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("parsing {}", path.display()))?;

        let mut scene = MemoryScene::default();
        for (collection, guides) in doc.guides {
            for g in guides {
                scene.add_guide(&collection, g);
            }
        }
        for (collection, meshes) in doc.meshes {
            for m in meshes {
                scene.add_mesh(&collection, m);
            }
        }
        Ok(Self { scene })
    }

    /// Creates a scene holding demo geometry for every source `config` reads.
    ///
    /// Curve collections get a few upright Bezier blades scattered in a
    /// unit disc; mesh collections get a hexagonal footprint split into
    /// triangles.
    pub fn with_demo_scene(config: &PipelineConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut scene = MemoryScene::default();

        for run in &config.runs {
            match &run.source {
                GuideSource::Collection(c) => {
                    if scene.guides(c).is_some() {
                        continue;
                    }
                    for i in 0..DEMO_GUIDES {
                        scene.add_guide(c, demo_blade(&format!("{c}_{i}"), &mut rng));
                    }
                }
                GuideSource::MeshPolygons(c) => {
                    scene.add_mesh(c, demo_footprint(&format!("{c}_mesh")));
                }
            }
        }
        debug!(collections = config.runs.len(), "demo scene ready");

        Self { scene }
    }

    pub fn run(&mut self, config: PipelineConfig) -> BatchReport {
        info!(runs = config.runs.len(), seed = ?config.seed, "starting batch");
        Pipeline::new(config).run(&mut self.scene)
    }

    pub fn print_summary(&self, report: &BatchReport) {
        println!("seed {}", report.seed);
        for run in &report.runs {
            match &run.result {
                Ok(r) => {
                    println!(
                        "  {:<26} guides {:>3}  registered {:>4}  failed {:>3}{}",
                        run.name,
                        r.guides,
                        r.registered.len(),
                        r.failures.len(),
                        if r.cancelled { "  (cancelled)" } else { "" }
                    );
                    for f in &r.failures {
                        let what = f.instance.as_deref().unwrap_or(&f.guide);
                        println!("      {what}: {}", f.error);
                    }
                }
                Err(e) => println!("  {:<26} aborted: {e}", run.name),
            }
        }
        println!("total registered {}", report.registered_count());
    }

    /// Writes every registered instance, grouped by collection, as JSON.
    pub fn dump(&self, path: &Path) -> Result<()> {
        let out: BTreeMap<&str, Vec<&Instance>> = self
            .scene
            .collection_names()
            .map(|c| (c, self.scene.objects(c)))
            .filter(|(_, objs)| !objs.is_empty())
            .collect();

        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &out)?;
        info!(path = %path.display(), "instances written");
        Ok(())
    }
}

/// Upright blade rooted at a random point of the unit disc, leaning in a
/// random direction.
fn demo_blade(name: &str, rng: &mut impl Rng) -> GuideCurve {
    let angle = rng.random_range(0.0..TAU);
    let radius = rng.random::<f32>().sqrt();
    let base = Vec3::new(angle.cos() * radius, angle.sin() * radius, 0.0);

    let lean_dir = rng.random_range(0.0..TAU);
    let lean = Vec3::new(lean_dir.cos(), lean_dir.sin(), 0.0) * rng.random_range(0.1..=0.4);
    let height = rng.random_range(0.8..=1.5);

    let points = (0..DEMO_POINTS)
        .map(|i| {
            let t = i as f32 / (DEMO_POINTS - 1) as f32;
            ControlPoint::bezier(base + lean * (t * t) + Vec3::Z * (height * t))
        })
        .collect();

    let mut data = CurveData::new(SplineKind::Bezier, points);
    data.profile.bevel_depth = 0.01;
    GuideCurve::new(name, data)
}

/// Hexagon of radius 1 fanned into six triangles around its centre.
fn demo_footprint(name: &str) -> PolyMesh {
    let mut vertices = vec![Vec3::ZERO];
    vertices.extend((0..6).map(|i| {
        let a = i as f32 * std::f32::consts::FRAC_PI_3;
        Vec3::new(a.cos(), a.sin(), 0.0)
    }));
    let polygons = (0..6).map(|i| vec![0, 1 + i, 1 + (i + 1) % 6]).collect();

    PolyMesh {
        name: name.to_owned(),
        vertices,
        polygons,
    }
}
