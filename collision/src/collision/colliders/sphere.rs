use nalgebra::Point3;
use serde::Serialize;

use crate::collision::query::{BroadPhaseQuery, QueryOrigin, RayCast};
use crate::maths::Ray;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sphere {
    pub radius: f32,
    pub origin: Point3<f32>,
}

impl Sphere {
    pub fn new(origin: Point3<f32>, radius: f32) -> Sphere {
        Sphere { origin, radius }
    }

    pub fn contains_point(&self, point: &Point3<f32>) -> bool {
        (point - self.origin).norm_squared() <= self.radius * self.radius
    }

    /// True when the ray starts inside the sphere, or enters it within `max_distance`.
    pub fn intersects_ray(&self, ray: &Ray, max_distance: f32) -> bool {
        let m = ray.origin - self.origin;
        let c = m.norm_squared() - self.radius * self.radius;

        if c <= 0.0 {
            return true;
        }

        // Outside and pointing away
        let b = m.dot(&ray.direction());
        if b > 0.0 {
            return false;
        }

        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return false;
        }

        let t = -b - discriminant.sqrt();
        t <= max_distance
    }

    pub fn intersects_sphere(&self, other: &Sphere) -> bool {
        let reach = self.radius + other.radius;
        (other.origin - self.origin).norm_squared() <= reach * reach
    }
}

impl BroadPhaseQuery<RayCast> for Sphere {
    fn broad_intersect(&self, query: &RayCast) -> bool {
        self.intersects_ray(&query.ray, query.max_distance)
    }
}

impl BroadPhaseQuery<Sphere> for Sphere {
    fn broad_intersect(&self, query: &Sphere) -> bool {
        self.intersects_sphere(query)
    }
}

impl QueryOrigin for Sphere {
    fn origin(&self) -> Point3<f32> {
        self.origin
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector3;

    use super::*;

    fn unit_sphere() -> Sphere {
        Sphere::new(Point3::new(0.0, 0.0, 5.0), 1.0)
    }

    #[test]
    fn ray_towards_sphere_hits() {
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));

        assert!(unit_sphere().intersects_ray(&ray, f32::INFINITY));
    }

    #[test]
    fn ray_starting_inside_sphere_hits() {
        let ray = Ray::new(Point3::new(0.0, 0.5, 5.0), Vector3::new(1.0, 0.0, 0.0));

        assert!(unit_sphere().intersects_ray(&ray, 0.0));
    }

    #[test]
    fn sphere_behind_ray_misses() {
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, -1.0));

        assert!(!unit_sphere().intersects_ray(&ray, f32::INFINITY));
    }

    #[test]
    fn sphere_beyond_max_distance_misses() {
        let ray = Ray::new(Point3::origin(), Vector3::new(0.0, 0.0, 1.0));

        assert!(!unit_sphere().intersects_ray(&ray, 3.9));
        assert!(unit_sphere().intersects_ray(&ray, 4.0));
    }

    #[test]
    fn ray_passing_beside_sphere_misses() {
        let ray = Ray::new(Point3::new(1.5, 0.0, 0.0), Vector3::new(0.0, 0.0, 1.0));

        assert!(!unit_sphere().intersects_ray(&ray, f32::INFINITY));
    }

    #[test]
    fn zero_direction_ray_outside_misses() {
        let ray = Ray::new(Point3::origin(), Vector3::zeros());

        assert!(!unit_sphere().intersects_ray(&ray, f32::INFINITY));
    }

    #[test]
    fn spheres_overlap_when_touching() {
        let other = Sphere::new(Point3::new(0.0, 0.0, 2.0), 2.0);
        let apart = Sphere::new(Point3::new(0.0, 0.0, 1.0), 2.9);

        assert!(unit_sphere().intersects_sphere(&other));
        assert!(!unit_sphere().intersects_sphere(&apart));
    }
}
