use nalgebra::{Point3, Vector3};

use crate::collision::colliders::sphere::Sphere;
use crate::collision::query::{NarrowPhaseQuery, RayCast};
use crate::maths::Ray;

/// The part of a hit the triangle itself can answer for. The caller stamps on which triangle, bone
/// and collider it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleHit {
    pub distance: f32,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    pub barycentric: Vector3<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle(pub [Point3<f32>; 3]);

/// Weights `(u, v, w)` of `a`, `b` and `c` such that `point = u * a + v * b + w * c`.
///
/// The point is projected onto the triangle's plane. Returns `None` when the triangle has no area.
pub fn barycentric(point: &Point3<f32>, a: &Point3<f32>, b: &Point3<f32>, c: &Point3<f32>) -> Option<Vector3<f32>> {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = point - a;

    // Cramer's rule on the normal equations
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);

    // Equal to |v0 x v1|^2
    let denom = d00 * d11 - d01 * d01;
    if denom <= f32::EPSILON * f32::EPSILON * d00 * d11 {
        return None;
    }

    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;

    Some(Vector3::new(1.0 - v - w, v, w))
}

pub fn barycentric_to_world(
    barycentric: &Vector3<f32>,
    a: &Point3<f32>,
    b: &Point3<f32>,
    c: &Point3<f32>,
) -> Point3<f32> {
    Point3::from(a.coords * barycentric.x + b.coords * barycentric.y + c.coords * barycentric.z)
}

/// Closest point to `point` on the solid triangle, after Ericson's Real-Time Collision Detection 5.1.5.
/// Each of the three vertex regions and three edge regions is tested before falling back to the face.
pub fn closest_point_on_triangle(
    point: &Point3<f32>,
    a: &Point3<f32>,
    b: &Point3<f32>,
    c: &Point3<f32>,
) -> Point3<f32> {
    let ab = b - a;
    let ac = c - a;

    // Vertex region outside A
    let ap = point - a;
    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    // Vertex region outside B
    let bp = point - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    // Edge region of AB
    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return a + ab * v;
    }

    // Vertex region outside C
    let cp = point - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    // Edge region of AC
    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return a + ac * w;
    }

    // Edge region of BC
    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * w;
    }

    // Face region
    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
}

/// Below this, `|edge1 x edge2|` counts as zero. Relative to the edge lengths so that small
/// triangles keep their area.
fn area_tolerance(edge1: &Vector3<f32>, edge2: &Vector3<f32>) -> f32 {
    f32::EPSILON * edge1.norm() * edge2.norm()
}

impl Triangle {
    pub fn a(&self) -> &Point3<f32> {
        &self.0[0]
    }

    pub fn b(&self) -> &Point3<f32> {
        &self.0[1]
    }

    pub fn c(&self) -> &Point3<f32> {
        &self.0[2]
    }

    /// `normalize((b - a) x (c - a))`, so the orientation follows the winding.
    /// `None` for a triangle with no area.
    pub fn normal(&self) -> Option<Vector3<f32>> {
        let edge1 = self.b() - self.a();
        let edge2 = self.c() - self.a();

        let cross = edge1.cross(&edge2);
        let length = cross.norm();
        if length <= area_tolerance(&edge1, &edge2) {
            return None;
        }

        Some(cross / length)
    }

    pub fn is_degenerate(&self) -> bool {
        self.normal().is_none()
    }

    pub fn barycentric(&self, point: &Point3<f32>) -> Option<Vector3<f32>> {
        barycentric(point, self.a(), self.b(), self.c())
    }

    pub fn closest_point(&self, point: &Point3<f32>) -> Point3<f32> {
        closest_point_on_triangle(point, self.a(), self.b(), self.c())
    }

    /// Möller–Trumbore. Both windings are hit; the reported normal is not flipped towards the ray.
    pub fn intersect_ray(&self, ray: &Ray, max_distance: f32) -> Option<TriangleHit> {
        let edge1 = self.b() - self.a();
        let edge2 = self.c() - self.a();
        let pvec = ray.direction().cross(&edge2);

        let det = edge1.dot(&pvec);

        // Parallel to the plane, or no area
        if det.abs() <= area_tolerance(&edge1, &edge2) {
            return None;
        }

        let inv_det = 1.0 / det;

        let tvec = ray.origin - self.a();
        let u = tvec.dot(&pvec) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let qvec = tvec.cross(&edge1);
        let v = ray.direction().dot(&qvec) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(&qvec) * inv_det;

        if t <= f32::EPSILON || t > max_distance {
            return None;
        }

        Some(TriangleHit {
            distance: t,
            point: ray.point_at(t),
            normal: self.normal()?,
            barycentric: Vector3::new(1.0 - u - v, u, v),
        })
    }

    /// Overlap of the solid sphere with the triangle. The hit point is the closest point on the
    /// triangle to the sphere's centre and the normal is the face normal.
    pub fn intersect_sphere(&self, sphere: &Sphere) -> Option<TriangleHit> {
        let normal = self.normal()?;
        let closest = self.closest_point(&sphere.origin);

        let distance_squared = (sphere.origin - closest).norm_squared();
        if distance_squared > sphere.radius * sphere.radius {
            return None;
        }

        Some(TriangleHit {
            distance: distance_squared.sqrt(),
            point: closest,
            normal,
            barycentric: self.barycentric(&closest)?,
        })
    }
}

impl NarrowPhaseQuery<RayCast> for Triangle {
    type Hit = Option<TriangleHit>;

    fn narrow_intersect(&self, query: &RayCast) -> Self::Hit {
        self.intersect_ray(&query.ray, query.max_distance)
    }
}

impl NarrowPhaseQuery<Sphere> for Triangle {
    type Hit = Option<TriangleHit>;

    fn narrow_intersect(&self, query: &Sphere) -> Self::Hit {
        self.intersect_sphere(query)
    }
}
