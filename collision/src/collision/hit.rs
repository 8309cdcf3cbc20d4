use nalgebra::{Point3, Vector3};
use serde::Serialize;

use crate::collider::ColliderId;
use crate::collision::colliders::TriangleHit;
use crate::skinning::bone::BoneIndex;

/// Capacity hint for hit lists. Lists grow past it as needed.
pub const EXPECTED_HITS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hit {
    /// World space distance from the query origin.
    pub distance: f32,
    pub point: Point3<f32>,
    pub normal: Vector3<f32>,
    /// Weights of the triangle's three corners at `point`.
    pub barycentric: Vector3<f32>,
    pub triangle_index: usize,
    pub bone: BoneIndex,
    pub collider: ColliderId,
}

impl Hit {
    pub fn from_triangle_hit(hit: TriangleHit, triangle_index: usize, bone: BoneIndex, collider: ColliderId) -> Self {
        Self {
            distance: hit.distance,
            point: hit.point,
            normal: hit.normal,
            barycentric: hit.barycentric,
            triangle_index,
            bone,
            collider,
        }
    }
}

/// Ascending by distance from `origin`. Equal distances end up in no particular order.
pub fn sort_hits_by_distance(hits: &mut [Hit], origin: &Point3<f32>) {
    hits.sort_unstable_by(|a, b| {
        (a.point - origin)
            .norm_squared()
            .total_cmp(&(b.point - origin).norm_squared())
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_at(point: Point3<f32>) -> Hit {
        Hit {
            distance: point.coords.norm(),
            point,
            normal: Vector3::z(),
            barycentric: Vector3::new(1.0, 0.0, 0.0),
            triangle_index: 0,
            bone: BoneIndex(0),
            collider: ColliderId::new(),
        }
    }

    #[test]
    fn sorts_nearest_first() {
        let mut hits = vec![
            hit_at(Point3::new(0.0, 0.0, 3.0)),
            hit_at(Point3::new(0.0, 1.0, 0.0)),
            hit_at(Point3::new(2.0, 0.0, 0.0)),
        ];

        sort_hits_by_distance(&mut hits, &Point3::origin());

        let distances: Vec<f32> = hits.iter().map(|hit| hit.distance).collect();
        assert_eq!(distances, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn sorts_relative_to_origin() {
        let mut hits = vec![hit_at(Point3::new(0.0, 0.0, 0.0)), hit_at(Point3::new(0.0, 0.0, 10.0))];

        sort_hits_by_distance(&mut hits, &Point3::new(0.0, 0.0, 9.0));

        assert_eq!(hits[0].point, Point3::new(0.0, 0.0, 10.0));
    }
}
