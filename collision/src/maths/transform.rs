use nalgebra::{Matrix4, Point3, Scale3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::maths::Matrix4Ext;

/// Translation, rotation and non-uniform scale, composed as `T * R * S`.
/// The matrix is cached and only rebuilt by [`Transform::compute_transform_matrix`].
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Transform {
    translation: Translation3<f32>,
    rotation: UnitQuaternion<f32>,
    scale: Scale3<f32>,
    #[serde(skip, default = "Matrix4::identity")]
    matrix: Matrix4<f32>,
    #[serde(skip, default = "dirty")]
    dirty: bool,
}

fn dirty() -> bool {
    true
}

impl Transform {
    pub fn new(translation: Translation3<f32>, rotation: UnitQuaternion<f32>, scale: Scale3<f32>) -> Self {
        let mut transform = Self {
            translation,
            rotation,
            scale,
            matrix: Matrix4::identity(),
            dirty: true,
        };

        transform.compute_transform_matrix();
        transform
    }

    pub fn from_translation(translation: Vector3<f32>) -> Self {
        Self::new(Translation3::from(translation), UnitQuaternion::identity(), Scale3::identity())
    }

    pub fn compute_transform_matrix(&mut self) {
        if self.dirty {
            let scale_matrix = Matrix4::new_nonuniform_scaling(&self.scale.vector);
            let rotation_matrix = self.rotation.to_homogeneous();
            let translation_matrix = self.translation.to_homogeneous();

            self.matrix = translation_matrix * rotation_matrix * scale_matrix;

            self.dirty = false;
        }
    }

    /// Places `self`, expressed relative to `parent`, into the parent's space.
    /// Exact for uniform parent scale; with non-uniform parent scale and a rotated child the shear
    /// is dropped.
    pub fn combine(&self, parent: &Transform) -> Transform {
        let mut combined = self.clone();

        combined.scale.x *= parent.scale.x;
        combined.scale.y *= parent.scale.y;
        combined.scale.z *= parent.scale.z;

        combined.rotation = parent.rotation * combined.rotation;

        let scaled_translation = Vector3::new(
            combined.translation.vector.x * parent.scale.x,
            combined.translation.vector.y * parent.scale.y,
            combined.translation.vector.z * parent.scale.z,
        );

        combined.translation =
            Translation3::from(parent.translation.vector + parent.rotation.transform_vector(&scaled_translation));

        combined.dirty = true;
        combined.compute_transform_matrix();
        combined
    }

    /// Whether [`Transform::combine`] under `parent` matches `parent.matrix() * self.matrix()`.
    /// False when a rotated child sits under a non-uniformly scaled parent.
    pub fn combines_without_shear(&self, parent: &Transform) -> bool {
        let close = |a: f32, b: f32| (a - b).abs() <= f32::EPSILON * a.abs().max(b.abs());
        let scale = parent.scale.vector;

        let uniform = close(scale.x, scale.y) && close(scale.y, scale.z);
        let unrotated = self.rotation.imag().norm() <= f32::EPSILON;

        uniform || unrotated
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        if self.dirty {
            log::warn!("Obtaining dirty transform matrix.")
        }

        self.matrix
    }

    pub fn inverse_matrix(&self) -> Matrix4<f32> {
        self.matrix().inverse_or_identity()
    }

    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        self.matrix().transform_point(point)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn scale(&self) -> Scale3<f32> {
        self.scale
    }

    pub fn set_scale(&mut self, scale: Scale3<f32>) {
        self.scale = scale;
        self.dirty = true;
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: UnitQuaternion<f32>) {
        self.rotation = rotation;
        self.dirty = true;
    }

    pub fn translation(&self) -> Translation3<f32> {
        self.translation
    }

    pub fn set_translation(&mut self, translation: Translation3<f32>) {
        self.translation = translation;
        self.dirty = true;
    }

    pub fn identity() -> Self {
        Self::default()
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Translation3::identity(),
            rotation: UnitQuaternion::identity(),
            scale: Scale3::identity(),
            matrix: Matrix4::identity(),
            dirty: false,
        }
    }
}
