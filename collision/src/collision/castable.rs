use crate::collider::ColliderId;
use crate::collision::colliders::Sphere;
use crate::collision::hit::Hit;
use crate::maths::Ray;

/// Anything that can answer ray and sphere casts in world space.
///
/// Hit lists are freshly allocated on every call and sorted nearest first. An empty list means
/// nothing was hit.
pub trait Castable {
    fn id(&self) -> ColliderId;

    fn cast_ray_all(&self, ray: &Ray, max_distance: f32) -> Vec<Hit>;

    fn cast_sphere_all(&self, sphere: &Sphere) -> Vec<Hit>;

    /// The nearest hit along the ray.
    fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<Hit> {
        self.cast_ray_all(ray, max_distance).into_iter().next()
    }
}
