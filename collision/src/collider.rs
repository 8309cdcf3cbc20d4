use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::collision::castable::Castable;
use crate::collision::colliders::triangle::barycentric_to_world;
use crate::collision::colliders::{Sphere, Triangle, TriangleHit};
use crate::collision::hit::{EXPECTED_HITS, Hit, sort_hits_by_distance};
use crate::collision::query::{BroadPhaseQuery, NarrowPhaseQuery, QueryOrigin, RayCast};
use crate::maths::Ray;
use crate::skinning::bone::{Bone, BoneIndex};
use crate::skinning::pose::SkeletonPose;
use crate::skinning::skinner::VertexSkinner;
use crate::skinning::source::SkinnedMeshSource;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColliderId(pub Uuid);

impl ColliderId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ColliderId {
    fn default() -> Self {
        Self::new()
    }
}

/// Ray and sphere casts against a mesh deformed by its bones.
///
/// Each bone's triangles are culled as a group against a bounding sphere around the vertices the
/// bone moves, then tested one by one. Call [`SkinnedMeshCollider::recompute_vertices`] once per
/// update before casting.
///
/// A clone is a separate collider with its own id.
#[derive(Debug)]
pub struct SkinnedMeshCollider {
    id: ColliderId,
    name: String,
    skinner: VertexSkinner,
}

impl Clone for SkinnedMeshCollider {
    fn clone(&self) -> Self {
        Self {
            id: ColliderId::new(),
            name: self.name.clone(),
            skinner: self.skinner.clone(),
        }
    }
}

impl SkinnedMeshCollider {
    pub fn new(name: impl Into<String>, source: &SkinnedMeshSource) -> Self {
        let collider = Self {
            id: ColliderId::new(),
            name: name.into(),
            skinner: VertexSkinner::new(source),
        };

        log::info!(
            "Created skinned mesh collider \"{}\" ({} bones)",
            collider.name,
            collider.skinner.bones().len()
        );

        collider
    }

    pub fn recompute_vertices<P: SkeletonPose + ?Sized>(&mut self, pose: &P) {
        self.skinner.recompute_vertices(pose);
    }

    pub fn id(&self) -> ColliderId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skinner(&self) -> &VertexSkinner {
        &self.skinner
    }

    pub fn bones(&self) -> &[Bone] {
        self.skinner.bones()
    }

    /// Collider local vertex positions from the last recompute.
    pub fn vertices(&self) -> &[Point3<f32>] {
        self.skinner.vertices()
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        self.skinner.triangles()
    }

    /// Every hit along the ray up to `max_distance`, nearest first.
    pub fn cast_ray_all(&self, ray: &Ray, max_distance: f32) -> Vec<Hit> {
        self.cast(&RayCast::new(*ray, max_distance))
    }

    /// Every triangle overlapping the sphere, nearest to its centre first.
    pub fn cast_sphere_all(&self, sphere: &Sphere) -> Vec<Hit> {
        self.cast(sphere)
    }

    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<Hit> {
        self.cast_ray_all(ray, max_distance).into_iter().next()
    }

    /// Current bounding sphere of every bone that moves at least one vertex.
    pub fn bone_bounding_spheres(&self) -> Vec<(BoneIndex, Sphere)> {
        self.bones()
            .iter()
            .filter_map(|bone| Some((bone.index(), self.skinner.bounding_sphere(bone)?)))
            .collect()
    }

    /// The triangle's corners in world space, `None` if there is no such triangle.
    pub fn world_triangle(&self, triangle_index: usize) -> Option<Triangle> {
        let [a, b, c] = *self.skinner.triangles().get(triangle_index)?;

        Some(Triangle([
            self.skinner.world_vertex(a),
            self.skinner.world_vertex(b),
            self.skinner.world_vertex(c),
        ]))
    }

    pub fn world_triangle_normal(&self, triangle_index: usize) -> Option<Vector3<f32>> {
        self.world_triangle(triangle_index)?.normal()
    }

    /// Where barycentric coordinates taken from a hit lie on the triangle now. Useful for sticking
    /// something to the spot that was hit as the mesh keeps moving.
    pub fn barycentric_to_world(&self, triangle_index: usize, barycentric: &Vector3<f32>) -> Option<Point3<f32>> {
        let triangle = self.world_triangle(triangle_index)?;

        Some(barycentric_to_world(barycentric, triangle.a(), triangle.b(), triangle.c()))
    }

    fn cast<Q>(&self, query: &Q) -> Vec<Hit>
    where
        Q: QueryOrigin,
        Sphere: BroadPhaseQuery<Q>,
        Triangle: NarrowPhaseQuery<Q, Hit = Option<TriangleHit>>,
    {
        let mut hits = Vec::with_capacity(EXPECTED_HITS);

        for bone in self.bones() {
            if bone.triangle_indices().is_empty() {
                continue;
            }

            let Some(bounds) = self.skinner.bounding_sphere(bone) else {
                continue;
            };

            if !bounds.broad_intersect(query) {
                continue;
            }

            for &triangle_index in bone.triangle_indices() {
                let Some(triangle) = self.world_triangle(triangle_index) else {
                    continue;
                };

                if let Some(hit) = triangle.narrow_intersect(query) {
                    hits.push(Hit::from_triangle_hit(hit, triangle_index, bone.index(), self.id));
                }
            }
        }

        sort_hits_by_distance(&mut hits, &query.origin());

        hits
    }
}

impl Castable for SkinnedMeshCollider {
    fn id(&self) -> ColliderId {
        self.id
    }

    fn cast_ray_all(&self, ray: &Ray, max_distance: f32) -> Vec<Hit> {
        SkinnedMeshCollider::cast_ray_all(self, ray, max_distance)
    }

    fn cast_sphere_all(&self, sphere: &Sphere) -> Vec<Hit> {
        SkinnedMeshCollider::cast_sphere_all(self, sphere)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use nalgebra::{Matrix4, Scale3, Translation3, UnitQuaternion};

    use super::*;
    use crate::maths::Transform;
    use crate::skinning::pose::Skeleton;
    use crate::skinning::source::BoneWeights;

    const EPSILON: f32 = 1e-5;

    fn flat_triangle() -> SkinnedMeshCollider {
        let source = SkinnedMeshSource::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            &[0, 1, 2],
            vec![Matrix4::identity()],
            vec![BoneWeights::single(0); 3],
        )
        .unwrap();

        let mut collider = SkinnedMeshCollider::new("triangle", &source);
        collider.recompute_vertices(&Skeleton::identity(1));
        collider
    }

    /// Two parallel unit squares at z = 0 and z = 2, each moved by its own bone.
    fn two_layers() -> SkinnedMeshCollider {
        let mut positions = Vec::new();
        let mut weights = Vec::new();
        for (bone, z) in [(0, 0.0), (1, 2.0)] {
            positions.extend([
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(0.0, 1.0, z),
                Point3::new(1.0, 1.0, z),
            ]);
            weights.extend([BoneWeights::single(bone); 4]);
        }

        let source = SkinnedMeshSource::new(
            positions,
            &[0, 1, 2, 2, 1, 3, 4, 5, 6, 6, 5, 7],
            vec![Matrix4::identity(); 2],
            weights,
        )
        .unwrap();

        let mut collider = SkinnedMeshCollider::new("layers", &source);
        collider.recompute_vertices(&Skeleton::identity(2));
        collider
    }

    #[test]
    fn ray_hits_flat_triangle() {
        let collider = flat_triangle();
        let ray = Ray::new(Point3::new(0.2, 0.2, 1.0), Vector3::new(0.0, 0.0, -1.0));

        let hits = collider.cast_ray_all(&ray, f32::INFINITY);

        assert_eq!(hits.len(), 1);
        let hit = hits[0];
        assert_relative_eq!(hit.distance, 1.0, epsilon = EPSILON);
        assert_relative_eq!(hit.point, Point3::new(0.2, 0.2, 0.0), epsilon = EPSILON);
        assert_relative_eq!(hit.normal, Vector3::new(0.0, 0.0, 1.0), epsilon = EPSILON);
        assert_relative_eq!(hit.barycentric.sum(), 1.0, epsilon = EPSILON);
        assert_eq!(hit.triangle_index, 0);
        assert_eq!(hit.bone, BoneIndex(0));
        assert_eq!(hit.collider, collider.id());
    }

    #[test]
    fn ray_miss_returns_no_hits() {
        let collider = flat_triangle();
        let ray = Ray::new(Point3::new(3.0, 3.0, 1.0), Vector3::new(0.0, 0.0, -1.0));

        assert!(collider.cast_ray_all(&ray, f32::INFINITY).is_empty());
        assert!(collider.raycast(&ray, f32::INFINITY).is_none());
    }

    #[test]
    fn ray_hits_are_sorted_by_distance() {
        let collider = two_layers();
        let ray = Ray::new(Point3::new(0.25, 0.25, 5.0), Vector3::new(0.0, 0.0, -1.0));

        let hits = collider.cast_ray_all(&ray, f32::INFINITY);

        assert_eq!(hits.len(), 2);
        assert_relative_eq!(hits[0].distance, 3.0, epsilon = EPSILON);
        assert_eq!(hits[0].bone, BoneIndex(1));
        assert_relative_eq!(hits[1].distance, 5.0, epsilon = EPSILON);
        assert_eq!(hits[1].bone, BoneIndex(0));

        let closest = collider.raycast(&ray, f32::INFINITY).unwrap();
        assert_eq!(closest, hits[0]);
    }

    #[test]
    fn max_distance_limits_ray() {
        let collider = two_layers();
        let ray = Ray::new(Point3::new(0.25, 0.25, 5.0), Vector3::new(0.0, 0.0, -1.0));

        let hits = collider.cast_ray_all(&ray, 4.0);

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].bone, BoneIndex(1));
    }

    #[test]
    fn broad_phase_miss_skips_triangles() {
        // The collider is scaled up but its bone is not, so the bone's bounding sphere is a tenth
        // of the size of its triangle in world space. A ray near a corner of the triangle would
        // hit it, but is culled first.
        let mut collider = flat_triangle();
        let pose = Skeleton::new(
            Transform::new(
                Translation3::identity(),
                UnitQuaternion::identity(),
                Scale3::new(10.0, 10.0, 10.0),
            ),
            vec![Transform::identity()],
        );
        collider.recompute_vertices(&pose);

        let triangle = collider.world_triangle(0).unwrap();
        assert_relative_eq!(*triangle.b(), Point3::new(1.0, 0.0, 0.0), epsilon = EPSILON);

        let corner_ray = Ray::new(Point3::new(0.8, 0.1, 1.0), Vector3::new(0.0, 0.0, -1.0));
        assert!(triangle.intersect_ray(&corner_ray, f32::INFINITY).is_some());

        let (_, bounds) = collider.bone_bounding_spheres()[0];
        assert!(!bounds.intersects_ray(&corner_ray, f32::INFINITY));

        assert!(collider.cast_ray_all(&corner_ray, f32::INFINITY).is_empty());
    }

    #[test]
    fn sphere_enclosing_triangle_hits_closest_point() {
        let collider = flat_triangle();
        let sphere = Sphere::new(Point3::new(0.3, 0.3, 0.4), 10.0);

        let hits = collider.cast_sphere_all(&sphere);

        assert_eq!(hits.len(), 1);
        let triangle = collider.world_triangle(0).unwrap();
        let closest = triangle.closest_point(&sphere.origin);
        assert_relative_eq!(hits[0].point, closest, epsilon = EPSILON);
        assert_relative_eq!(hits[0].distance, (sphere.origin - closest).norm(), epsilon = EPSILON);
    }

    #[test]
    fn sphere_cast_sorts_by_distance_from_centre() {
        let collider = two_layers();
        let sphere = Sphere::new(Point3::new(0.25, 0.25, 1.5), 2.0);

        let hits = collider.cast_sphere_all(&sphere);

        // Both triangles of each layer are within reach
        assert_eq!(hits.len(), 4);
        assert_eq!(hits[0].bone, BoneIndex(1));
        assert_eq!(hits[1].bone, BoneIndex(1));
        assert_eq!(hits[2].bone, BoneIndex(0));
        assert_eq!(hits[3].bone, BoneIndex(0));
        assert_relative_eq!(hits[0].distance, 0.5, epsilon = EPSILON);
        assert_relative_eq!(hits[1].distance, 0.375_f32.sqrt(), epsilon = EPSILON);
        assert_relative_eq!(hits[2].distance, 1.5, epsilon = EPSILON);
        assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
    }

    #[test]
    fn sphere_away_from_mesh_misses() {
        let collider = flat_triangle();

        assert!(collider.cast_sphere_all(&Sphere::new(Point3::new(5.0, 5.0, 5.0), 1.0)).is_empty());
    }

    #[test]
    fn casts_follow_the_pose() {
        let mut collider = flat_triangle();
        let ray = Ray::new(Point3::new(0.2, 0.2, 10.0), Vector3::new(0.0, 0.0, -1.0));

        collider.recompute_vertices(&Skeleton::new(
            Transform::identity(),
            vec![Transform::from_translation(Vector3::new(0.0, 0.0, 4.0))],
        ));

        let hit = collider.raycast(&ray, f32::INFINITY).unwrap();
        assert_relative_eq!(hit.distance, 6.0, epsilon = EPSILON);
        assert_relative_eq!(hit.point, Point3::new(0.2, 0.2, 4.0), epsilon = EPSILON);
    }

    #[test]
    fn degenerate_triangle_never_hits() {
        let source = SkinnedMeshSource::new(
            vec![
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(2.0, 0.0, 0.0),
            ],
            &[0, 1, 2],
            vec![Matrix4::identity()],
            vec![BoneWeights::single(0); 3],
        )
        .unwrap();
        let mut collider = SkinnedMeshCollider::new("sliver", &source);
        collider.recompute_vertices(&Skeleton::identity(1));

        let ray = Ray::new(Point3::new(1.0, 0.0, 1.0), Vector3::new(0.0, 0.0, -1.0));
        let sphere = Sphere::new(Point3::new(1.0, 0.0, 0.0), 1.0);

        assert!(collider.cast_ray_all(&ray, f32::INFINITY).is_empty());
        assert!(collider.cast_sphere_all(&sphere).is_empty());
    }

    #[test]
    fn barycentric_coordinates_track_the_moving_triangle() {
        let mut collider = flat_triangle();
        let ray = Ray::new(Point3::new(0.2, 0.3, 1.0), Vector3::new(0.0, 0.0, -1.0));
        let hit = collider.raycast(&ray, f32::INFINITY).unwrap();

        collider.recompute_vertices(&Skeleton::new(
            Transform::identity(),
            vec![Transform::from_translation(Vector3::new(5.0, 0.0, 0.0))],
        ));

        let moved = collider
            .barycentric_to_world(hit.triangle_index, &hit.barycentric)
            .unwrap();
        assert_relative_eq!(moved, Point3::new(5.2, 0.3, 0.0), epsilon = EPSILON);
    }

    #[test]
    fn clone_is_a_separate_collider() {
        let first = flat_triangle();
        let mut copy = first.clone();
        assert_ne!(copy.id(), first.id());

        copy.recompute_vertices(&Skeleton::new(
            Transform::identity(),
            vec![Transform::from_translation(Vector3::new(0.0, 0.0, 5.0))],
        ));
        let ray = Ray::new(Point3::new(0.2, 0.2, 10.0), Vector3::new(0.0, 0.0, -1.0));

        assert_eq!(copy.raycast(&ray, f32::INFINITY).unwrap().collider, copy.id());
        assert_relative_eq!(first.raycast(&ray, f32::INFINITY).unwrap().distance, 10.0, epsilon = EPSILON);
    }

    #[test]
    fn triangle_helpers_reject_unknown_triangles() {
        let collider = flat_triangle();

        assert!(collider.world_triangle(1).is_none());
        assert!(collider.world_triangle_normal(1).is_none());
        assert_relative_eq!(collider.world_triangle_normal(0).unwrap(), Vector3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn hit_lists_grow_past_expected_capacity() {
        // A fan of stacked triangles all pierced by one ray
        let layers = EXPECTED_HITS + 10;
        let mut positions = Vec::new();
        let mut indices = Vec::new();
        for layer in 0..layers {
            let z = layer as f32;
            let base = positions.len() as u32;
            positions.extend([
                Point3::new(0.0, 0.0, z),
                Point3::new(1.0, 0.0, z),
                Point3::new(0.0, 1.0, z),
            ]);
            indices.extend([base, base + 1, base + 2]);
        }
        let weights = vec![BoneWeights::single(0); positions.len()];
        let source = SkinnedMeshSource::new(positions, &indices, vec![Matrix4::identity()], weights).unwrap();
        let mut collider = SkinnedMeshCollider::new("stack", &source);
        collider.recompute_vertices(&Skeleton::identity(1));

        let ray = Ray::new(Point3::new(0.1, 0.1, -1.0), Vector3::new(0.0, 0.0, 1.0));
        let hits = collider.cast_ray_all(&ray, f32::INFINITY);

        assert_eq!(hits.len(), layers);
        assert!(hits.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
    }
}
