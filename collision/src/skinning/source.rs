use std::fmt;

use nalgebra::{Matrix4, Point3};

/// A vertex can be moved by at most this many bones.
pub const MAX_BONE_INFLUENCES: usize = 4;

/// Up to four `(bone index, weight)` pairs for one vertex. Zero weight slots are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoneWeights(pub [(usize, f32); MAX_BONE_INFLUENCES]);

impl BoneWeights {
    pub fn single(bone: usize) -> Self {
        Self([(bone, 1.0), (0, 0.0), (0, 0.0), (0, 0.0)])
    }

    pub fn from_joints(joints: [u16; MAX_BONE_INFLUENCES], weights: [f32; MAX_BONE_INFLUENCES]) -> Self {
        Self(std::array::from_fn(|i| (joints[i] as usize, weights[i])))
    }

    pub fn influences(&self) -> impl Iterator<Item = (usize, f32)> + '_ {
        self.0.iter().copied().filter(|(_, weight)| *weight != 0.0)
    }

    pub fn sum(&self) -> f32 {
        self.influences().map(|(_, weight)| weight).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceError {
    IndexCountNotMultipleOfThree(usize),
    IndexOutOfRange { index: usize, vertex_count: usize },
    WeightCountMismatch { vertex_count: usize, weight_count: usize },
    BoneOutOfRange { vertex: usize, bone: usize, bone_count: usize },
}

impl std::error::Error for SourceError {}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::IndexCountNotMultipleOfThree(count) => {
                write!(f, "The triangle index count {} is not a multiple of 3", count)
            }
            Self::IndexOutOfRange { index, vertex_count } => {
                write!(f, "Triangle index {} is out of range for {} vertices", index, vertex_count)
            }
            Self::WeightCountMismatch {
                vertex_count,
                weight_count,
            } => {
                write!(
                    f,
                    "There are {} vertices but {} sets of bone weights",
                    vertex_count, weight_count
                )
            }
            Self::BoneOutOfRange {
                vertex,
                bone,
                bone_count,
            } => {
                write!(
                    f,
                    "Vertex {} is weighted to bone {} but there are only {} bones",
                    vertex, bone, bone_count
                )
            }
        }
    }
}

/// Bind pose snapshot of a skinned mesh, handed over once when a collider is built.
///
/// Weights are not required to sum to one per vertex.
#[derive(Debug, Clone)]
pub struct SkinnedMeshSource {
    positions: Vec<Point3<f32>>,
    triangles: Vec<[usize; 3]>,
    inverse_bind_matrices: Vec<Matrix4<f32>>,
    weights: Vec<BoneWeights>,
}

impl SkinnedMeshSource {
    /// `indices` is a flat triangle list. There is one inverse bind matrix per bone.
    pub fn new(
        positions: Vec<Point3<f32>>,
        indices: &[u32],
        inverse_bind_matrices: Vec<Matrix4<f32>>,
        weights: Vec<BoneWeights>,
    ) -> Result<Self, SourceError> {
        if indices.len() % 3 != 0 {
            return Err(SourceError::IndexCountNotMultipleOfThree(indices.len()));
        }

        if let Some(&index) = indices.iter().find(|&&index| index as usize >= positions.len()) {
            return Err(SourceError::IndexOutOfRange {
                index: index as usize,
                vertex_count: positions.len(),
            });
        }

        if weights.len() != positions.len() {
            return Err(SourceError::WeightCountMismatch {
                vertex_count: positions.len(),
                weight_count: weights.len(),
            });
        }

        let bone_count = inverse_bind_matrices.len();
        for (vertex, vertex_weights) in weights.iter().enumerate() {
            if let Some((bone, _)) = vertex_weights.influences().find(|(bone, _)| *bone >= bone_count) {
                return Err(SourceError::BoneOutOfRange {
                    vertex,
                    bone,
                    bone_count,
                });
            }
        }

        let triangles = indices
            .chunks_exact(3)
            .map(|chunk| [chunk[0] as usize, chunk[1] as usize, chunk[2] as usize])
            .collect();

        Ok(Self {
            positions,
            triangles,
            inverse_bind_matrices,
            weights,
        })
    }

    pub fn positions(&self) -> &[Point3<f32>] {
        &self.positions
    }

    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    pub fn inverse_bind_matrices(&self) -> &[Matrix4<f32>] {
        &self.inverse_bind_matrices
    }

    pub fn weights(&self) -> &[BoneWeights] {
        &self.weights
    }

    pub fn bone_count(&self) -> usize {
        self.inverse_bind_matrices.len()
    }
}
