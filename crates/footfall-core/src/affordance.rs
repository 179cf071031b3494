//! Environment affordances: labelled planar contact surfaces.
//!
//! An [`AffordanceMap`] groups [`Surface`]s by affordance type ("Support",
//! "Lean", ...). An [`AffordanceFilter`] lists, per limb, the types the limb
//! may touch. [`objects_for_limb`] resolves the two into the ordered list of
//! surfaces a limb is allowed to contact.

use std::collections::BTreeMap;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ContactError;

// ---------------------------------------------------------------------------
// Aabb
// ---------------------------------------------------------------------------

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vector3<f64>,
    pub max: Vector3<f64>,
}

impl Aabb {
    pub const fn from_min_max(min: Vector3<f64>, max: Vector3<f64>) -> Self {
        Self { min, max }
    }

    /// Smallest box containing every point. `None` for an empty input.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vector3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut aabb = Self::from_min_max(first, first);
        for p in iter {
            aabb.expand_point(p);
        }
        Some(aabb)
    }

    pub fn expand_point(&mut self, point: &Vector3<f64>) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Grow every face outward by `margin`.
    #[must_use]
    pub fn inflated(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self::from_min_max(self.min - m, self.max + m)
    }

    pub fn contains(&self, p: &Vector3<f64>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    pub fn intersects(&self, other: &Self) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && other.min[i] <= self.max[i])
    }

    pub fn center(&self) -> Vector3<f64> {
        (self.min + self.max) * 0.5
    }

    /// Euclidean distance from `p` to the box, zero inside.
    pub fn distance(&self, p: &Vector3<f64>) -> f64 {
        let clamped = p.sup(&self.min).inf(&self.max);
        (p - clamped).norm()
    }
}

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// Convex planar polygon an effector may rest on.
///
/// The normal follows the vertex winding (counter-clockwise seen from the
/// side the normal points to).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub name: String,
    vertices: Vec<Vector3<f64>>,
    normal: Vector3<f64>,
}

impl Surface {
    /// Build a surface from at least three coplanar vertices.
    pub fn new(name: impl Into<String>, vertices: Vec<Vector3<f64>>) -> Result<Self, ContactError> {
        let name = name.into();
        if vertices.len() < 3 {
            return Err(ContactError::DegenerateSurface(name));
        }
        // Newell's method
        let mut normal = Vector3::zeros();
        for (i, a) in vertices.iter().enumerate() {
            let b = &vertices[(i + 1) % vertices.len()];
            normal.x += (a.y - b.y) * (a.z + b.z);
            normal.y += (a.z - b.z) * (a.x + b.x);
            normal.z += (a.x - b.x) * (a.y + b.y);
        }
        let Some(normal) = normal.try_normalize(1e-12) else {
            return Err(ContactError::DegenerateSurface(name));
        };
        Ok(Self {
            name,
            vertices,
            normal,
        })
    }

    /// Horizontal rectangle facing +Z centred at `center`.
    pub fn rectangle(
        name: impl Into<String>,
        center: Vector3<f64>,
        half_x: f64,
        half_y: f64,
    ) -> Result<Self, ContactError> {
        let c = center;
        Self::new(
            name,
            vec![
                c + Vector3::new(-half_x, -half_y, 0.0),
                c + Vector3::new(half_x, -half_y, 0.0),
                c + Vector3::new(half_x, half_y, 0.0),
                c + Vector3::new(-half_x, half_y, 0.0),
            ],
        )
    }

    pub fn vertices(&self) -> &[Vector3<f64>] {
        &self.vertices
    }

    pub const fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    /// Signed distance from `p` to the supporting plane.
    pub fn signed_distance(&self, p: &Vector3<f64>) -> f64 {
        self.normal.dot(&(p - self.vertices[0]))
    }

    /// Orthogonal projection of `p` onto the supporting plane.
    pub fn project(&self, p: &Vector3<f64>) -> Vector3<f64> {
        p - self.normal * self.signed_distance(p)
    }

    /// Whether the projection of `p` falls inside the polygon, `tolerance`
    /// allowing points slightly outside an edge.
    pub fn contains(&self, p: &Vector3<f64>, tolerance: f64) -> bool {
        let q = self.project(p);
        let n = self.vertices.len();
        self.vertices.iter().enumerate().all(|(i, a)| {
            let b = &self.vertices[(i + 1) % n];
            let edge = b - a;
            let len = edge.norm();
            if len < f64::EPSILON {
                return true;
            }
            // distance of q to the inner side of the edge
            edge.cross(&(q - a)).dot(&self.normal) / len >= -tolerance
        })
    }

    pub fn aabb(&self) -> Aabb {
        // at least three vertices by construction
        let mut aabb = Aabb::from_min_max(self.vertices[0], self.vertices[0]);
        for v in &self.vertices[1..] {
            aabb.expand_point(v);
        }
        aabb
    }
}

// ---------------------------------------------------------------------------
// AffordanceMap / AffordanceFilter
// ---------------------------------------------------------------------------

/// Affordance type -> surfaces of that type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AffordanceMap {
    objects: BTreeMap<String, Vec<Surface>>,
}

impl AffordanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `surface` to the objects of `affordance`.
    pub fn insert(&mut self, affordance: &str, surface: Surface) {
        self.objects
            .entry(affordance.to_owned())
            .or_default()
            .push(surface);
    }

    /// Declare `affordance` with the given objects, replacing any previous list.
    #[must_use]
    pub fn with(mut self, affordance: &str, surfaces: Vec<Surface>) -> Self {
        self.objects.insert(affordance.to_owned(), surfaces);
        self
    }

    pub fn get(&self, affordance: &str) -> Option<&[Surface]> {
        self.objects.get(affordance).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Surface])> {
        self.objects
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Every surface, in affordance-type order.
    pub fn all_objects(&self) -> impl Iterator<Item = &Surface> {
        self.objects.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.values().all(Vec::is_empty)
    }
}

/// Limb -> affordance types the limb may touch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffordanceFilter {
    types: BTreeMap<String, Vec<String>>,
}

impl AffordanceFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, limb: &str, affordances: &[&str]) {
        self.types.insert(
            limb.to_owned(),
            affordances.iter().map(|a| (*a).to_owned()).collect(),
        );
    }

    #[must_use]
    pub fn with(mut self, limb: &str, affordances: &[&str]) -> Self {
        self.set(limb, affordances);
        self
    }

    pub fn get(&self, limb: &str) -> Option<&[String]> {
        self.types.get(limb).map(Vec::as_slice)
    }
}

/// Surfaces `limb` may contact, in filter order then insertion order.
///
/// A limb without a filter entry may use every object. An affordance type
/// missing from the map contributes nothing. An empty result is an error.
pub fn objects_for_limb<'a>(
    limb: &str,
    affordances: &'a AffordanceMap,
    filter: &AffordanceFilter,
) -> Result<Vec<&'a Surface>, ContactError> {
    let objects: Vec<&Surface> = match filter.get(limb) {
        Some(types) => types
            .iter()
            .filter_map(|t| affordances.get(t))
            .flatten()
            .collect(),
        None => {
            warn!(limb, "no affordance filter for limb, using all objects");
            affordances.all_objects().collect()
        }
    };
    if objects.is_empty() {
        return Err(ContactError::NoAffordanceObjects(limb.to_owned()));
    }
    Ok(objects)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ground() -> Surface {
        Surface::rectangle("ground", Vector3::zeros(), 1.0, 0.5).unwrap()
    }

    #[test]
    fn rectangle_normal_points_up() {
        let s = ground();
        assert_relative_eq!(*s.normal(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn reversed_winding_flips_normal() {
        let mut v = ground().vertices().to_vec();
        v.reverse();
        let s = Surface::new("flipped", v).unwrap();
        assert_relative_eq!(*s.normal(), -Vector3::z(), epsilon = 1e-12);
        assert!(s.contains(&Vector3::new(0.2, 0.1, 0.0), 0.0));
    }

    #[test]
    fn degenerate_surfaces_rejected() {
        let two = vec![Vector3::zeros(), Vector3::x()];
        assert!(matches!(
            Surface::new("line", two),
            Err(ContactError::DegenerateSurface(_))
        ));
        let collinear = vec![Vector3::zeros(), Vector3::x(), Vector3::x() * 2.0];
        assert!(Surface::new("collinear", collinear).is_err());
    }

    #[test]
    fn signed_distance_and_projection() {
        let s = ground();
        let p = Vector3::new(0.3, 0.2, 0.25);
        assert_relative_eq!(s.signed_distance(&p), 0.25, epsilon = 1e-12);
        assert_relative_eq!(s.project(&p), Vector3::new(0.3, 0.2, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn contains_respects_edges_and_tolerance() {
        let s = ground();
        assert!(s.contains(&Vector3::new(0.9, 0.4, 0.3), 0.0));
        assert!(!s.contains(&Vector3::new(1.05, 0.0, 0.0), 0.0));
        assert!(s.contains(&Vector3::new(1.05, 0.0, 0.0), 0.1));
    }

    #[test]
    fn surface_aabb() {
        let s = Surface::rectangle("step", Vector3::new(1.0, 0.0, 0.2), 0.5, 0.25).unwrap();
        let aabb = s.aabb();
        assert_relative_eq!(aabb.min, Vector3::new(0.5, -0.25, 0.2), epsilon = 1e-12);
        assert_relative_eq!(aabb.max, Vector3::new(1.5, 0.25, 0.2), epsilon = 1e-12);
    }

    #[test]
    fn aabb_queries() {
        let a = Aabb::from_min_max(Vector3::zeros(), Vector3::repeat(1.0));
        assert!(a.contains(&Vector3::repeat(0.5)));
        assert!(!a.contains(&Vector3::new(1.5, 0.5, 0.5)));
        assert_relative_eq!(a.distance(&Vector3::new(2.0, 0.5, 0.5)), 1.0, epsilon = 1e-12);
        assert_relative_eq!(a.distance(&Vector3::repeat(0.5)), 0.0);
        let b = Aabb::from_min_max(Vector3::repeat(0.9), Vector3::repeat(2.0));
        assert!(a.intersects(&b));
        assert!(!a.intersects(&b.inflated(-0.2)));
        assert!(Aabb::from_points(std::iter::empty::<&Vector3<f64>>()).is_none());
    }

    #[test]
    fn objects_for_limb_follows_filter() {
        let map = AffordanceMap::new()
            .with("Support", vec![ground()])
            .with(
                "Lean",
                vec![Surface::rectangle("wall", Vector3::new(0.0, 0.0, 1.0), 0.2, 0.2).unwrap()],
            );
        let filter = AffordanceFilter::new().with("lf", &["Support"]);
        let objects = objects_for_limb("lf", &map, &filter).unwrap();
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].name, "ground");
    }

    #[test]
    fn objects_for_limb_without_filter_uses_everything() {
        let map = AffordanceMap::new()
            .with("Support", vec![ground()])
            .with(
                "Lean",
                vec![Surface::rectangle("wall", Vector3::new(0.0, 0.0, 1.0), 0.2, 0.2).unwrap()],
            );
        let objects = objects_for_limb("rf", &map, &AffordanceFilter::new()).unwrap();
        let names: Vec<&str> = objects.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["wall", "ground"]);
    }

    #[test]
    fn objects_for_limb_empty_affordance_is_error() {
        let map = AffordanceMap::new()
            .with("Support", vec![ground()])
            .with("Lean", vec![]);
        let filter = AffordanceFilter::new().with("L", &["Lean"]);
        let err = objects_for_limb("L", &map, &filter).unwrap_err();
        assert_eq!(err.to_string(), "No aff objects found for limb L");
    }

    #[test]
    fn objects_for_limb_unknown_type_is_error() {
        let map = AffordanceMap::new().with("Support", vec![ground()]);
        let filter = AffordanceFilter::new().with("L", &["Grasp"]);
        assert_eq!(
            objects_for_limb("L", &map, &filter),
            Err(ContactError::NoAffordanceObjects("L".into()))
        );
    }
}
