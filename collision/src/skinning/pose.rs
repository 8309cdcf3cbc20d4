use nalgebra::Matrix4;
use serde::{Deserialize, Serialize};

use crate::maths::{Matrix4Ext, Transform};
use crate::skinning::bone::BoneIndex;

/// The current pose of a skinned mesh, as handed over by whatever animates it.
///
/// Colliders only read poses. They never walk a transform hierarchy themselves.
pub trait SkeletonPose {
    fn bone_count(&self) -> usize;

    /// `None` for a bone the pose doesn't know about.
    fn bone_to_world(&self, bone: BoneIndex) -> Option<Matrix4<f32>>;

    /// The collider's own local to world matrix.
    fn collider_to_world(&self) -> Matrix4<f32>;

    fn world_to_collider(&self) -> Matrix4<f32> {
        self.collider_to_world().inverse_or_identity()
    }
}

/// World space transforms for a collider and each of its bones.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Skeleton {
    pub collider: Transform,
    pub bones: Vec<Transform>,
}

impl Skeleton {
    pub fn new(collider: Transform, bones: Vec<Transform>) -> Self {
        Self { collider, bones }
    }

    /// An untransformed collider with `bone_count` bones at the origin.
    pub fn identity(bone_count: usize) -> Self {
        Self::new(Transform::identity(), vec![Transform::identity(); bone_count])
    }

    /// Transforms don't serialise their cached matrices, so they are rebuilt here.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut skeleton: Skeleton = serde_json::from_str(json)?;
        skeleton.compute_transform_matrices();

        Ok(skeleton)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn compute_transform_matrices(&mut self) {
        self.collider.compute_transform_matrix();
        self.bones.iter_mut().for_each(Transform::compute_transform_matrix);
    }

    pub fn bone_mut(&mut self, bone: BoneIndex) -> Option<&mut Transform> {
        self.bones.get_mut(bone.0)
    }
}

impl SkeletonPose for Skeleton {
    fn bone_count(&self) -> usize {
        self.bones.len()
    }

    fn bone_to_world(&self, bone: BoneIndex) -> Option<Matrix4<f32>> {
        self.bones.get(bone.0).map(Transform::matrix)
    }

    fn collider_to_world(&self) -> Matrix4<f32> {
        self.collider.matrix()
    }

    fn world_to_collider(&self) -> Matrix4<f32> {
        self.collider.inverse_matrix()
    }
}
