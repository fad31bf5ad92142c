//! Batch orchestration of guide multiplication.
//!
//! For every [`RunConfig`] the pipeline:
//! 1. validates the run and collects its guides from the scene,
//! 2. skips guides without control points (recorded as failures),
//! 3. builds every instance in parallel: spawn, optional perturbation,
//!    growth and profile keys, interpolation,
//! 4. registers finished instances into the scene one at a time.
//!
//! Configuration errors abort only the affected run. Data and resource
//! errors are isolated to one guide or one instance. Instances are only
//! registered once every step has succeeded.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{GuideSource, PipelineConfig, RunConfig};
use crate::curve::GuideCurve;
use crate::error::{GrowthError, Result};
use crate::generator::InstanceGenerator;
use crate::instance::Instance;
use crate::noise_field::NoiseField;
use crate::perturb::perturb_with;
use crate::scene::SceneStore;
use crate::synth::{apply_interpolation, key_extrusion, key_growth, key_thickness};
use crate::types::ObjectId;

/// Shared flag for best-effort cancellation.
///
/// Checked before each instance is built and before each registration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A guide or instance that was dropped from a run.
#[derive(Debug)]
pub struct Failure {
    pub guide: String,
    /// `None` when the whole guide was skipped.
    pub instance: Option<String>,
    pub error: GrowthError,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub guides: usize,
    pub registered: Vec<ObjectId>,
    pub failures: Vec<Failure>,
    pub cancelled: bool,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub name: String,
    pub result: Result<RunReport>,
}

#[derive(Debug)]
pub struct BatchReport {
    /// Base seed the batch was drawn from; rerunning with it reproduces the batch.
    pub seed: u64,
    pub runs: Vec<RunOutcome>,
}

impl BatchReport {
    pub fn registered_count(&self) -> usize {
        self.runs
            .iter()
            .filter_map(|r| r.result.as_ref().ok())
            .map(|r| r.registered.len())
            .sum()
    }

    pub fn failed_runs(&self) -> impl Iterator<Item = (&str, &GrowthError)> {
        self.runs
            .iter()
            .filter_map(|r| r.result.as_ref().err().map(|e| (r.name.as_str(), e)))
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    cancel: CancelToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Executes every configured run against `scene`.
    ///
    /// A failing run is reported in the returned [`BatchReport`] and does
    /// not stop the runs after it.
    pub fn run<S: SceneStore>(&self, scene: &mut S) -> BatchReport {
        let seed = self.config.seed.unwrap_or_else(|| rand::rng().random());
        let runs = self
            .config
            .runs
            .iter()
            .enumerate()
            .map(|(i, run)| {
                let result = self.execute(scene, run, mix_seed(seed, i as u64, 0));
                match &result {
                    Ok(r) => info!(
                        run = %run.name,
                        guides = r.guides,
                        registered = r.registered.len(),
                        failed = r.failures.len(),
                        cancelled = r.cancelled,
                        "run finished"
                    ),
                    Err(e) => warn!(run = %run.name, error = %e, "run aborted"),
                }
                RunOutcome {
                    name: run.name.clone(),
                    result,
                }
            })
            .collect();

        BatchReport { seed, runs }
    }

    fn execute<S: SceneStore>(
        &self,
        scene: &mut S,
        run: &RunConfig,
        run_seed: u64,
    ) -> Result<RunReport> {
        run.validate()?;
        let mut report = RunReport::default();
        if self.cancel.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }

        let guides = collect_guides(scene, run, &mut report.failures)?;
        report.guides = guides.len();

        let field = run.perturb.map(|p| NoiseField::new(p.noise)).transpose()?;
        if let Some(dest) = &run.destination {
            scene.ensure_collection(dest)?;
        }

        let generator = run.generator();
        let jobs: Vec<(usize, usize)> = (0..guides.len())
            .flat_map(|g| (0..run.copies_per_guide).map(move |c| (g, c)))
            .collect();

        let built: Vec<(usize, usize, Result<Instance>)> = jobs
            .par_iter()
            .map(|&(g, c)| {
                if self.cancel.is_cancelled() {
                    return (g, c, Err(GrowthError::Cancelled));
                }
                let mut rng = StdRng::seed_from_u64(mix_seed(run_seed, g as u64 + 1, c as u64));
                (g, c, build_instance(run, &generator, &guides[g], c, field.as_ref(), &mut rng))
            })
            .collect();

        for (g, c, result) in built {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let guide = &guides[g];
            let instance = InstanceGenerator::instance_name(guide, c);
            match result.and_then(|inst| register(scene, inst)) {
                Ok(id) => report.registered.push(id),
                Err(error) => {
                    warn!(
                        run = %run.name,
                        instance = %instance,
                        error = %error,
                        "instance dropped"
                    );
                    report.failures.push(Failure {
                        guide: guide.name.clone(),
                        instance: Some(instance),
                        error,
                    });
                }
            }
        }
        Ok(report)
    }
}

/// Runs every per-instance step for the `copy`-th clone of `guide`.
///
/// The returned instance is complete and ready for registration.
pub fn build_instance(
    run: &RunConfig,
    generator: &InstanceGenerator,
    guide: &GuideCurve,
    copy: usize,
    field: Option<&NoiseField>,
    rng: &mut impl Rng,
) -> Result<Instance> {
    let mut inst = generator.spawn(guide, copy, rng)?;

    if let (Some(p), Some(field)) = (&run.perturb, field) {
        perturb_with(&mut inst, field, p.per_point_jitter, rng)?;
    }

    key_growth(&mut inst, run.frames, &run.growth)?;
    if let Some(t) = &run.thickness {
        key_thickness(&mut inst, run.frames, t, rng)?;
    }
    if let Some(e) = &run.extrusion {
        key_extrusion(&mut inst, run.frames, e, rng)?;
    }
    apply_interpolation(&mut inst, run.interpolation, run.easing)?;

    debug!(instance = %inst.name, keys = inst.track.keyframe_count(), "instance built");
    Ok(inst)
}

/// Hands a complete instance to the scene store.
pub fn register<S: SceneStore + ?Sized>(scene: &mut S, mut instance: Instance) -> Result<ObjectId> {
    instance.check_registrable()?;
    instance.mark_registered();
    let destination = instance.destination.clone();
    scene.link_object(instance, destination.as_name())
}

/// Reads the guides of a run, applies subdivision and drops guides
/// without control points into `failures`.
fn collect_guides<S: SceneStore>(
    scene: &S,
    run: &RunConfig,
    failures: &mut Vec<Failure>,
) -> Result<Vec<GuideCurve>> {
    let raw = match &run.source {
        GuideSource::Collection(name) => scene
            .guides(name)
            .ok_or_else(|| GrowthError::SourceNotFound(name.clone()))?,
        GuideSource::MeshPolygons(name) => {
            let not_found = || GrowthError::SourceNotFound(name.clone());
            let edges = scene.edge_curves().ok_or_else(not_found)?;
            let meshes = edges.meshes(name).ok_or_else(not_found)?;

            let mut out = Vec::new();
            for (mesh, polygons) in meshes {
                for p in 0..polygons {
                    match edges.derive_edge_curve(&mesh, p) {
                        Ok(g) => out.push(g),
                        Err(error) => {
                            warn!(mesh = %mesh, polygon = p, error = %error, "polygon skipped");
                            failures.push(Failure {
                                guide: format!("{mesh}.poly{p}"),
                                instance: None,
                                error,
                            });
                        }
                    }
                }
            }
            out
        }
    };

    let mut guides = Vec::with_capacity(raw.len());
    for mut guide in raw {
        if let Some(cuts) = run.subdivide {
            guide.data.subdivide(cuts);
        }
        if guide.data.points.is_empty() {
            let error = GrowthError::EmptyCurve(guide.name.clone());
            warn!(run = %run.name, guide = %guide.name, "guide skipped: no control points");
            failures.push(Failure {
                guide: guide.name,
                instance: None,
                error,
            });
            continue;
        }
        guides.push(guide);
    }
    Ok(guides)
}

/// Derives an independent stream seed; splitmix64 finalizer.
fn mix_seed(base: u64, a: u64, b: u64) -> u64 {
    fn splitmix(mut z: u64) -> u64 {
        z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
    splitmix(splitmix(base ^ splitmix(a)) ^ b)
}
