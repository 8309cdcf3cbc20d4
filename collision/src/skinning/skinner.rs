use nalgebra::{Matrix4, Point3, Vector3};

use crate::collision::colliders::Sphere;
use crate::maths::Matrix4Ext;
use crate::skinning::bone::{Bone, BoneIndex, VertexWeight};
use crate::skinning::pose::SkeletonPose;
use crate::skinning::source::SkinnedMeshSource;

/// Rebuilds the collider local vertex positions of one skinned mesh from a pose.
#[derive(Debug, Clone)]
pub struct VertexSkinner {
    bind_vertices: Vec<Point3<f32>>,
    triangles: Vec<[usize; 3]>,
    bones: Vec<Bone>,
    weight_sums: Vec<f32>,

    vertices: Vec<Point3<f32>>,
    accumulator: Vec<Vector3<f32>>,

    // Snapshot of the pose taken by the last recompute, read by queries
    collider_to_world: Matrix4<f32>,
    bone_scales: Vec<Vector3<f32>>,
}

impl VertexSkinner {
    pub fn new(source: &SkinnedMeshSource) -> Self {
        let bone_count = source.bone_count();
        let mut bone_weights: Vec<Vec<VertexWeight>> = vec![Vec::new(); bone_count];

        for (index, (position, weights)) in source.positions().iter().zip(source.weights()).enumerate() {
            for (bone, weight) in weights.influences() {
                bone_weights[bone].push(VertexWeight {
                    index,
                    local_position: source.inverse_bind_matrices()[bone].transform_point(position),
                    weight,
                });
            }
        }

        let bones = bone_weights
            .into_iter()
            .enumerate()
            .map(|(bone, weights)| Bone::new(BoneIndex(bone), weights, source.triangles()))
            .collect::<Vec<_>>();

        log::debug!(
            "Built skinner with {} vertices, {} triangles and {} bones",
            source.positions().len(),
            source.triangles().len(),
            bones.len()
        );

        Self {
            bind_vertices: source.positions().to_vec(),
            triangles: source.triangles().to_vec(),
            weight_sums: source.weights().iter().map(|weights| weights.sum()).collect(),
            bones,
            vertices: source.positions().to_vec(),
            accumulator: Vec::with_capacity(source.positions().len()),
            collider_to_world: Matrix4::identity(),
            bone_scales: vec![Vector3::new(1.0, 1.0, 1.0); bone_count],
        }
    }

    /// Full skinning pass. Every vertex becomes `sum(weight * bone_to_world * local_position)` over
    /// its influences, converted into the collider's local space.
    ///
    /// Must run once per update before that update's queries; until then queries see the previous
    /// pose (or the bind pose before the first call). A vertex whose weights sum to zero ends up at
    /// the collider local origin.
    pub fn recompute_vertices<P: SkeletonPose + ?Sized>(&mut self, pose: &P) {
        if pose.bone_count() < self.bones.len() {
            log::warn!(
                "Pose has {} bones but the mesh is skinned to {}, missing bones are ignored",
                pose.bone_count(),
                self.bones.len()
            );
        }

        self.accumulator.clear();
        self.accumulator.resize(self.bind_vertices.len(), Vector3::zeros());

        for (bone, scale) in self.bones.iter().zip(self.bone_scales.iter_mut()) {
            let Some(bone_to_world) = pose.bone_to_world(bone.index()) else {
                *scale = Vector3::new(1.0, 1.0, 1.0);
                continue;
            };

            *scale = bone_to_world.lossy_scale();

            for weight in bone.weights() {
                let world = bone_to_world.transform_point(&weight.local_position);
                self.accumulator[weight.index] += world.coords * weight.weight;
            }
        }

        let world_to_collider = pose.world_to_collider();

        for ((vertex, world), weight_sum) in self
            .vertices
            .iter_mut()
            .zip(&self.accumulator)
            .zip(&self.weight_sums)
        {
            *vertex = if *weight_sum == 0.0 {
                Point3::origin()
            } else {
                world_to_collider.transform_point(&Point3::from(*world))
            };
        }

        self.collider_to_world = pose.collider_to_world();

        log::trace!("Recomputed {} skinned vertices", self.vertices.len());
    }

    /// Collider local positions from the last recompute.
    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    pub fn bind_vertices(&self) -> &[Point3<f32>] {
        &self.bind_vertices
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn collider_to_world(&self) -> &Matrix4<f32> {
        &self.collider_to_world
    }

    /// World scale of the bone as of the last recompute. Unit scale for a bone that pose lacked.
    pub fn bone_scale(&self, bone: BoneIndex) -> Option<&Vector3<f32>> {
        self.bone_scales.get(bone.0)
    }

    pub fn world_vertex(&self, index: usize) -> Point3<f32> {
        self.collider_to_world.transform_point(&self.vertices[index])
    }

    pub fn bounding_sphere(&self, bone: &Bone) -> Option<Sphere> {
        bone.bounding_sphere(
            &self.vertices,
            &self.collider_to_world,
            &self.bone_scales[bone.index().0],
        )
    }
}
