use fxhash::FxHashSet;
use itertools::Itertools;
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::collision::colliders::Sphere;

/// Index of a bone in the skeleton's bone list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BoneIndex(pub usize);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexWeight {
    pub index: usize,
    /// The vertex's bind position in the bone's local space.
    pub local_position: Point3<f32>,
    pub weight: f32,
}

#[derive(Debug, Clone)]
pub struct Bone {
    index: BoneIndex,
    weights: Vec<VertexWeight>,
    unique_vertex_indices: Vec<usize>,
    triangle_indices: Vec<usize>,
}

impl Bone {
    pub fn new(index: BoneIndex, weights: Vec<VertexWeight>, triangles: &[[usize; 3]]) -> Self {
        let unique_vertex_indices = weights.iter().map(|weight| weight.index).unique().collect_vec();

        let influenced: FxHashSet<usize> = unique_vertex_indices.iter().copied().collect();

        // A triangle only belongs to this bone if the bone moves every corner of it
        let triangle_indices = triangles
            .iter()
            .positions(|triangle| triangle.iter().all(|corner| influenced.contains(corner)))
            .collect_vec();

        Self {
            index,
            weights,
            unique_vertex_indices,
            triangle_indices,
        }
    }

    pub fn index(&self) -> BoneIndex {
        self.index
    }

    pub fn weights(&self) -> &[VertexWeight] {
        &self.weights
    }

    pub fn unique_vertex_indices(&self) -> &[usize] {
        &self.unique_vertex_indices
    }

    pub fn triangle_indices(&self) -> &[usize] {
        &self.triangle_indices
    }

    /// World space sphere around every vertex this bone influences.
    ///
    /// The centre is the unweighted centroid of the collider local `vertices`, moved into world
    /// space. The radius is the longest offset from that centroid, scaled per axis by the bone's
    /// world scale. `None` when the bone moves no vertices.
    pub fn bounding_sphere(
        &self,
        vertices: &[Point3<f32>],
        collider_to_world: &Matrix4<f32>,
        bone_scale: &Vector3<f32>,
    ) -> Option<Sphere> {
        if self.unique_vertex_indices.is_empty() {
            return None;
        }

        let sum = self
            .unique_vertex_indices
            .iter()
            .fold(Vector3::zeros(), |sum, &index| sum + vertices[index].coords);

        let centroid = Point3::from(sum / self.unique_vertex_indices.len() as f32);

        let longest = self
            .unique_vertex_indices
            .iter()
            .map(|&index| vertices[index] - centroid)
            .max_by(|a, b| a.norm_squared().total_cmp(&b.norm_squared()))?;

        Some(Sphere::new(
            collider_to_world.transform_point(&centroid),
            longest.component_mul(bone_scale).norm(),
        ))
    }
}
