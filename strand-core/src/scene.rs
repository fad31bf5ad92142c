//! Scene-store collaborators and an in-memory implementation.
//!
//! The core never owns scene state. Guides are read through
//! [`SceneStore::guides`], finished instances are handed over with
//! [`SceneStore::link_object`], and mesh polygons can be turned into
//! guides by an optional [`EdgeCurveSource`].

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::curve::{ControlPoint, CurveData, GuideCurve, SplineKind};
use crate::error::{GrowthError, Result};
use crate::instance::Instance;
use crate::types::ObjectId;

/// Host scene the pipeline reads guides from and registers instances into.
///
/// Implementations need not be thread-safe: the orchestrator performs all
/// store calls from a single thread.
pub trait SceneStore {
    /// Guide curves of `collection`, or `None` if no such collection exists.
    fn guides(&self, collection: &str) -> Option<Vec<GuideCurve>>;

    /// Creates `name` if it does not exist yet.
    fn ensure_collection(&mut self, name: &str) -> Result<()>;

    /// Takes ownership of `instance` and links it into `collection`, or
    /// into the active collection when `None`.
    fn link_object(&mut self, instance: Instance, collection: Option<&str>) -> Result<ObjectId>;

    /// Polygon-to-curve capability of this scene, if it has one.
    fn edge_curves(&self) -> Option<&dyn EdgeCurveSource> {
        None
    }
}

/// Derives guide curves from mesh polygons.
pub trait EdgeCurveSource {
    /// `(mesh name, polygon count)` of every mesh in `collection`, or
    /// `None` if no such collection exists.
    fn meshes(&self, collection: &str) -> Option<Vec<(String, usize)>>;

    /// Curve running along the edges of one polygon of `mesh`.
    fn derive_edge_curve(&self, mesh: &str, polygon: usize) -> Result<GuideCurve>;
}

/// Vertices closer than this are merged when deriving edge curves.
pub const MERGE_DISTANCE: f32 = 1e-4;

/// Bevel depth given to freshly derived edge curves.
pub const EDGE_CURVE_BEVEL: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyMesh {
    pub name: String,
    pub vertices: Vec<Vec3>,
    /// Vertex loops, one per polygon.
    pub polygons: Vec<Vec<usize>>,
}

/// Scene held entirely in memory.
#[derive(Debug)]
pub struct MemoryScene {
    active: String,
    guides: BTreeMap<String, Vec<GuideCurve>>,
    meshes: BTreeMap<String, Vec<PolyMesh>>,
    collections: BTreeMap<String, Vec<(ObjectId, Instance)>>,
    locked: BTreeSet<String>,
    next_id: ObjectId,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new("Collection")
    }
}

impl MemoryScene {
    pub fn new(active: impl Into<String>) -> Self {
        let active = active.into();
        let mut collections = BTreeMap::new();
        collections.insert(active.clone(), Vec::new());
        Self {
            active,
            guides: BTreeMap::new(),
            meshes: BTreeMap::new(),
            collections,
            locked: BTreeSet::new(),
            next_id: 0,
        }
    }

    pub fn active(&self) -> &str {
        &self.active
    }

    pub fn add_guide(&mut self, collection: &str, guide: GuideCurve) {
        self.guides.entry(collection.to_owned()).or_default().push(guide);
    }

    pub fn add_mesh(&mut self, collection: &str, mesh: PolyMesh) {
        self.meshes.entry(collection.to_owned()).or_default().push(mesh);
    }

    /// Makes every later link into `collection` fail.
    pub fn lock_collection(&mut self, collection: &str) {
        self.locked.insert(collection.to_owned());
    }

    /// Instances registered into `collection`, in registration order.
    pub fn objects(&self, collection: &str) -> Vec<&Instance> {
        self.collections
            .get(collection)
            .map(|v| v.iter().map(|(_, i)| i).collect())
            .unwrap_or_default()
    }

    pub fn object(&self, id: ObjectId) -> Option<&Instance> {
        self.collections
            .values()
            .flatten()
            .find(|(oid, _)| *oid == id)
            .map(|(_, i)| i)
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    pub fn instance_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    fn find_mesh(&self, name: &str) -> Option<&PolyMesh> {
        self.meshes.values().flatten().find(|m| m.name == name)
    }
}

impl SceneStore for MemoryScene {
    fn guides(&self, collection: &str) -> Option<Vec<GuideCurve>> {
        self.guides.get(collection).cloned()
    }

    fn ensure_collection(&mut self, name: &str) -> Result<()> {
        self.collections.entry(name.to_owned()).or_default();
        Ok(())
    }

    fn link_object(&mut self, instance: Instance, collection: Option<&str>) -> Result<ObjectId> {
        let target = collection.unwrap_or(self.active.as_str()).to_owned();
        if self.locked.contains(&target) {
            return Err(GrowthError::Registration {
                name: instance.name,
                reason: format!("collection `{target}` is locked"),
            });
        }
        let Some(objects) = self.collections.get_mut(&target) else {
            return Err(GrowthError::Registration {
                name: instance.name,
                reason: format!("collection `{target}` does not exist"),
            });
        };

        let id = self.next_id;
        self.next_id += 1;
        objects.push((id, instance));
        Ok(id)
    }

    fn edge_curves(&self) -> Option<&dyn EdgeCurveSource> {
        Some(self)
    }
}

impl EdgeCurveSource for MemoryScene {
    fn meshes(&self, collection: &str) -> Option<Vec<(String, usize)>> {
        self.meshes
            .get(collection)
            .map(|ms| ms.iter().map(|m| (m.name.clone(), m.polygons.len())).collect())
    }

    /// Builds a cyclic Poly curve through the polygon's vertex loop,
    /// merging vertices closer than [`MERGE_DISTANCE`].
    fn derive_edge_curve(&self, mesh: &str, polygon: usize) -> Result<GuideCurve> {
        let fail = |reason: &str| GrowthError::EdgeCurve {
            mesh: mesh.to_owned(),
            polygon,
            reason: reason.to_owned(),
        };

        let m = self.find_mesh(mesh).ok_or_else(|| fail("mesh not found"))?;
        let loop_ = m.polygons.get(polygon).ok_or_else(|| fail("polygon index out of range"))?;

        let mut points: Vec<Vec3> = Vec::with_capacity(loop_.len());
        for &vi in loop_ {
            let v = *m.vertices.get(vi).ok_or_else(|| fail("vertex index out of range"))?;
            if points.iter().all(|p| p.distance(v) > MERGE_DISTANCE) {
                points.push(v);
            }
        }
        if points.len() < 2 {
            return Err(fail("polygon collapses to a single point"));
        }

        let mut data = CurveData::new(
            SplineKind::Poly,
            points.into_iter().map(|co| ControlPoint::weighted(co, 1.0)).collect(),
        );
        data.cyclic = true;
        data.profile.bevel_depth = EDGE_CURVE_BEVEL;

        Ok(GuideCurve::new(format!("{mesh}.poly{polygon}"), data))
    }
}
