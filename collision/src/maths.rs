use nalgebra::{Matrix4, Vector3};

pub mod ray;
pub mod transform;

pub use ray::Ray;
pub use transform::Transform;

pub trait Matrix4Ext {
    /// Per axis scale baked into the upper 3x3 block, i.e. the length of each basis column.
    /// Shear and reflection are not recovered.
    fn lossy_scale(&self) -> Vector3<f32>;

    fn inverse_or_identity(&self) -> Self;
}

impl Matrix4Ext for Matrix4<f32> {
    fn lossy_scale(&self) -> Vector3<f32> {
        Vector3::new(
            self.fixed_view::<3, 1>(0, 0).norm(),
            self.fixed_view::<3, 1>(0, 1).norm(),
            self.fixed_view::<3, 1>(0, 2).norm(),
        )
    }

    fn inverse_or_identity(&self) -> Self {
        self.try_inverse().unwrap_or_else(|| {
            log::warn!("Matrix is not invertible, falling back to identity.");
            Matrix4::identity()
        })
    }
}
