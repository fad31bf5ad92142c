use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Control mathematics of a spline.
///
/// Only [`SplineKind::Bezier`], [`SplineKind::Poly`] and
/// [`SplineKind::Nurbs`] are understood by perturbation and subdivision;
/// the legacy kinds are carried through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplineKind {
    Bezier,
    Poly,
    Nurbs,
    Cardinal,
    BSpline,
}

impl SplineKind {
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Bezier | Self::Poly | Self::Nurbs)
    }

    /// Poly and NURBS points carry a fourth, homogeneous coordinate.
    pub fn is_weighted(self) -> bool {
        matches!(self, Self::Poly | Self::Nurbs)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bezier => "bezier",
            Self::Poly => "poly",
            Self::Nurbs => "nurbs",
            Self::Cardinal => "cardinal",
            Self::BSpline => "b-spline",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BezierHandles {
    pub left: Vec3,
    pub right: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    pub co: Vec3,
    /// Homogeneous weight of Poly/NURBS points. Never perturbed.
    pub w: Option<f32>,
    /// Bezier handles, `None` for straight segments and non-Bezier kinds.
    pub handles: Option<BezierHandles>,
}

impl ControlPoint {
    pub fn bezier(co: Vec3) -> Self {
        Self {
            co,
            w: None,
            handles: None,
        }
    }

    pub fn bezier_with_handles(co: Vec3, left: Vec3, right: Vec3) -> Self {
        Self {
            co,
            w: None,
            handles: Some(BezierHandles { left, right }),
        }
    }

    pub fn weighted(co: Vec3, w: f32) -> Self {
        Self {
            co,
            w: Some(w),
            handles: None,
        }
    }
}

/// Cross-section attributes the animation channels drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurveProfile {
    /// Round bevel radius.
    pub bevel_depth: f32,
    /// Linear extrusion depth.
    pub extrude: f32,
    /// Start of the rendered sub-range of the curve, in `[0, 1]`.
    pub bevel_factor_start: f32,
    /// End of the rendered sub-range of the curve, in `[0, 1]`.
    pub bevel_factor_end: f32,
}

impl Default for CurveProfile {
    fn default() -> Self {
        Self {
            bevel_depth: 0.0,
            extrude: 0.0,
            bevel_factor_start: 0.0,
            bevel_factor_end: 1.0,
        }
    }
}

/// Geometry and visual attributes of a single-spline curve.
///
/// Point order is load-bearing: perturbation and subdivision keep the
/// index of every original point stable relative to its neighbours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveData {
    pub kind: SplineKind,
    pub points: Vec<ControlPoint>,
    #[serde(default)]
    pub cyclic: bool,
    #[serde(default)]
    pub profile: CurveProfile,
    #[serde(default)]
    pub material: Option<String>,
}

impl CurveData {
    pub fn new(kind: SplineKind, points: Vec<ControlPoint>) -> Self {
        Self {
            kind,
            points,
            cyclic: false,
            profile: CurveProfile::default(),
            material: None,
        }
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Inserts `cuts` evenly spaced points into every segment.
    ///
    /// Poly and NURBS segments are split linearly, weights included.
    /// Bezier segments whose endpoints both carry handles are split
    /// exactly, so the curve shape is unchanged; segments without handles
    /// are treated as straight lines. Unsupported kinds, curves with fewer
    /// than two points and `cuts == 0` are left as they are.
    pub fn subdivide(&mut self, cuts: usize) {
        let n = self.points.len();
        if cuts == 0 || n < 2 || !self.kind.is_supported() {
            return;
        }

        let segments = if self.cyclic { n } else { n - 1 };
        let mut originals = self.points.clone();
        let mut inner: Vec<Vec<ControlPoint>> = Vec::with_capacity(segments);

        for s in 0..segments {
            let a = self.points[s];
            let b = self.points[(s + 1) % n];
            match (self.kind, a.handles, b.handles) {
                (SplineKind::Bezier, Some(ha), Some(hb)) => {
                    let seg = [a.co, ha.right, hb.left, b.co];
                    let dt = 1.0 / (cuts + 1) as f32;

                    // Shorten the handles that now span a fraction of the segment.
                    if let Some(h) = originals[s].handles.as_mut() {
                        h.right = seg[0] + (seg[1] - seg[0]) * dt;
                    }
                    if let Some(h) = originals[(s + 1) % n].handles.as_mut() {
                        h.left = seg[3] - (seg[3] - seg[2]) * dt;
                    }

                    let pts = (1..=cuts)
                        .map(|k| {
                            let t = k as f32 * dt;
                            let co = cubic_point(&seg, t);
                            let tangent = cubic_tangent(&seg, t) * (dt / 3.0);
                            ControlPoint::bezier_with_handles(co, co - tangent, co + tangent)
                        })
                        .collect();
                    inner.push(pts);
                }
                _ => {
                    let pts = (1..=cuts)
                        .map(|k| {
                            let t = k as f32 / (cuts + 1) as f32;
                            let w = match (a.w, b.w) {
                                (Some(wa), Some(wb)) => Some(wa + (wb - wa) * t),
                                (wa, _) => wa,
                            };
                            ControlPoint {
                                co: a.co.lerp(b.co, t),
                                w,
                                handles: None,
                            }
                        })
                        .collect();
                    inner.push(pts);
                }
            }
        }

        let mut out = Vec::with_capacity(n + segments * cuts);
        for (i, p) in originals.into_iter().enumerate() {
            out.push(p);
            if let Some(pts) = inner.get_mut(i) {
                out.append(pts);
            }
        }
        self.points = out;
    }
}

fn cubic_point(p: &[Vec3; 4], t: f32) -> Vec3 {
    let u = 1.0 - t;
    p[0] * (u * u * u) + p[1] * (3.0 * u * u * t) + p[2] * (3.0 * u * t * t) + p[3] * (t * t * t)
}

fn cubic_tangent(p: &[Vec3; 4], t: f32) -> Vec3 {
    let u = 1.0 - t;
    (p[1] - p[0]) * (3.0 * u * u) + (p[2] - p[1]) * (6.0 * u * t) + (p[3] - p[2]) * (3.0 * t * t)
}

/// Object-level placement. Rotation is XYZ Euler in radians.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub location: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            location: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn is_uniform_scale(&self) -> bool {
        self.scale.x == self.scale.y && self.scale.y == self.scale.z
    }
}

/// Hand-authored source curve. Read-only while instances are generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuideCurve {
    pub name: String,
    pub data: CurveData,
    #[serde(default)]
    pub transform: Transform,
}

impl GuideCurve {
    pub fn new(name: impl Into<String>, data: CurveData) -> Self {
        Self {
            name: name.into(),
            data,
            transform: Transform::default(),
        }
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn poly_line(n: usize) -> CurveData {
        let points = (0..n)
            .map(|i| ControlPoint::weighted(Vec3::new(i as f32, 0.0, 0.0), 1.0))
            .collect();
        CurveData::new(SplineKind::Poly, points)
    }

    #[test]
    fn subdivide_poly_inserts_points_per_segment() {
        let mut curve = poly_line(3);
        curve.subdivide(1);

        assert_eq!(curve.point_count(), 5);
        let xs: Vec<f32> = curve.points.iter().map(|p| p.co.x).collect();
        assert_eq!(xs, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
        assert!(curve.points.iter().all(|p| p.w == Some(1.0)));
    }

    #[test]
    fn subdivide_cyclic_closes_the_loop() {
        let mut curve = poly_line(3);
        curve.cyclic = true;
        curve.subdivide(2);

        // 3 segments including the closing one, 2 cuts each.
        assert_eq!(curve.point_count(), 9);
        // Last inserted points lie between the final point and the first.
        let last = curve.points.last().unwrap();
        assert_relative_eq!(last.co.x, 2.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    fn subdivide_interpolates_weights() {
        let mut curve = CurveData::new(
            SplineKind::Nurbs,
            vec![
                ControlPoint::weighted(Vec3::ZERO, 1.0),
                ControlPoint::weighted(Vec3::X, 3.0),
            ],
        );
        curve.subdivide(1);
        assert_eq!(curve.points[1].w, Some(2.0));
    }

    #[test]
    fn subdivide_bezier_keeps_shape() {
        // A straight segment whose handles sit at the thirds.
        let a = ControlPoint::bezier_with_handles(
            Vec3::ZERO,
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
        );
        let b = ControlPoint::bezier_with_handles(
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
        );
        let mut curve = CurveData::new(SplineKind::Bezier, vec![a, b]);
        curve.subdivide(1);

        assert_eq!(curve.point_count(), 3);
        let mid = curve.points[1];
        assert_relative_eq!(mid.co.x, 1.5, epsilon = 1e-6);
        let h = mid.handles.unwrap();
        assert_relative_eq!(h.left.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(h.right.x, 2.0, epsilon = 1e-6);

        // Outer handles shrink to the new segment length.
        assert_relative_eq!(curve.points[0].handles.unwrap().right.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(curve.points[2].handles.unwrap().left.x, 2.5, epsilon = 1e-6);
        // Handles facing away from the split are untouched.
        assert_eq!(curve.points[0].handles.unwrap().left, Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn subdivide_skips_unsupported_kinds() {
        let mut curve = poly_line(4);
        curve.kind = SplineKind::Cardinal;
        let before = curve.clone();
        curve.subdivide(3);
        assert_eq!(curve, before);
    }

    #[test]
    fn default_transform_has_unit_uniform_scale() {
        let t = Transform::default();
        assert!(t.is_uniform_scale());
        assert_eq!(t.scale, Vec3::ONE);
    }
}
