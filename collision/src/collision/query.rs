use nalgebra::Point3;

use crate::maths::Ray;

/// A ray limited to `max_distance` along its direction.
#[derive(Debug, Clone, Copy)]
pub struct RayCast {
    pub ray: Ray,
    pub max_distance: f32,
}

impl RayCast {
    pub fn new(ray: Ray, max_distance: f32) -> Self {
        Self { ray, max_distance }
    }

    pub fn unbounded(ray: Ray) -> Self {
        Self::new(ray, f32::INFINITY)
    }
}

/// Cheap conservative rejection of a whole group of triangles.
pub trait BroadPhaseQuery<Q> {
    fn broad_intersect(&self, query: &Q) -> bool;
}

/// Precise test against a single primitive.
pub trait NarrowPhaseQuery<Q> {
    type Hit;

    fn narrow_intersect(&self, query: &Q) -> Self::Hit;
}

/// The point hit distances of a query are measured from.
pub trait QueryOrigin {
    fn origin(&self) -> Point3<f32>;
}

impl QueryOrigin for RayCast {
    fn origin(&self) -> Point3<f32> {
        self.ray.origin
    }
}
