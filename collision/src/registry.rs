use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;
use nalgebra::Point3;

use crate::collider::ColliderId;
use crate::collision::castable::Castable;
use crate::collision::colliders::Sphere;
use crate::collision::hit::{EXPECTED_HITS, Hit, sort_hits_by_distance};
use crate::maths::Ray;

/// Queries against many colliders at once.
///
/// The registry does not own its colliders. A collider that has been dropped, or is mutably
/// borrowed while a query runs, is skipped.
#[derive(Default)]
pub struct CollisionRegistry {
    colliders: FxHashMap<ColliderId, Weak<RefCell<dyn Castable>>>,
}

impl CollisionRegistry {
    pub fn new() -> Self {
        Self {
            colliders: FxHashMap::default(),
        }
    }

    /// Registering a collider twice has no further effect. A collider that is mutably borrowed is
    /// not registered.
    pub fn register<C: Castable + 'static>(&mut self, collider: &Rc<RefCell<C>>) {
        let Ok(id) = collider.try_borrow().map(|collider| collider.id()) else {
            log::warn!("Not registering a collider that is mutably borrowed");
            return;
        };

        if self.colliders.contains_key(&id) {
            log::debug!("Collider {:?} is already registered", id);
            return;
        }

        let shared: Rc<RefCell<dyn Castable>> = collider.clone();
        self.colliders.insert(id, Rc::downgrade(&shared));
    }

    /// Matches by reference, so a collider can be deregistered while it is borrowed.
    pub fn deregister<C: Castable + 'static>(&mut self, collider: &Rc<RefCell<C>>) -> bool {
        let before = self.colliders.len();
        self.colliders
            .retain(|_, registered| !std::ptr::addr_eq(registered.as_ptr(), Rc::as_ptr(collider)));

        before != self.colliders.len()
    }

    /// Returns whether the collider was registered.
    pub fn deregister_id(&mut self, id: ColliderId) -> bool {
        self.colliders.remove(&id).is_some()
    }

    pub fn contains(&self, id: ColliderId) -> bool {
        self.colliders.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Forgets colliders that have since been dropped. Returns how many were removed.
    pub fn prune(&mut self) -> usize {
        let before = self.colliders.len();
        self.colliders.retain(|_, collider| collider.strong_count() > 0);

        before - self.colliders.len()
    }

    /// Every hit along the ray across all live colliders, nearest first.
    pub fn cast_ray_all(&self, ray: &Ray, max_distance: f32) -> Vec<Hit> {
        self.cast(&ray.origin, |collider| collider.cast_ray_all(ray, max_distance))
    }

    /// Every triangle overlapping the sphere across all live colliders, nearest to its centre first.
    pub fn cast_sphere_all(&self, sphere: &Sphere) -> Vec<Hit> {
        self.cast(&sphere.origin, |collider| collider.cast_sphere_all(sphere))
    }

    pub fn raycast(&self, ray: &Ray, max_distance: f32) -> Option<Hit> {
        self.cast_ray_all(ray, max_distance).into_iter().next()
    }

    /// [`CollisionRegistry::cast_ray_all`] over an explicit set of colliders.
    pub fn cast_ray_all_among(colliders: &[&dyn Castable], ray: &Ray, max_distance: f32) -> Vec<Hit> {
        let mut hits = Vec::with_capacity(EXPECTED_HITS);
        for collider in colliders {
            hits.extend(collider.cast_ray_all(ray, max_distance));
        }

        sort_hits_by_distance(&mut hits, &ray.origin);
        hits
    }

    /// [`CollisionRegistry::cast_sphere_all`] over an explicit set of colliders.
    pub fn cast_sphere_all_among(colliders: &[&dyn Castable], sphere: &Sphere) -> Vec<Hit> {
        let mut hits = Vec::with_capacity(EXPECTED_HITS);
        for collider in colliders {
            hits.extend(collider.cast_sphere_all(sphere));
        }

        sort_hits_by_distance(&mut hits, &sphere.origin);
        hits
    }

    fn cast(&self, origin: &Point3<f32>, cast: impl Fn(&dyn Castable) -> Vec<Hit>) -> Vec<Hit> {
        let mut hits = Vec::with_capacity(EXPECTED_HITS);

        for (id, collider) in &self.colliders {
            let Some(collider) = collider.upgrade() else {
                log::warn!("Skipping collider {:?}, it has been dropped without being deregistered", id);
                continue;
            };

            let Ok(collider) = collider.try_borrow() else {
                log::warn!("Skipping collider {:?}, it is mutably borrowed", id);
                continue;
            };

            hits.extend(cast(&*collider));
        }

        sort_hits_by_distance(&mut hits, origin);
        hits
    }
}
