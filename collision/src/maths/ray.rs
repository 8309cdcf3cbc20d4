use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Point3<f32>,

    direction: Vector3<f32>,
}

impl Ray {
    /// The direction is normalised. A zero length direction is kept as zero, and such a ray never
    /// intersects any triangle.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        let direction = direction.try_normalize(f32::EPSILON).unwrap_or_else(|| {
            log::debug!("Ray created with a zero length direction");
            Vector3::zeros()
        });

        Self { origin, direction }
    }

    pub fn direction(&self) -> Vector3<f32> {
        self.direction
    }

    pub fn is_degenerate(&self) -> bool {
        self.direction == Vector3::zeros()
    }

    pub fn point_at(&self, t: f32) -> Point3<f32> {
        self.origin + self.direction * t
    }
}
