pub mod collider;
pub mod collision;
pub mod debug;
pub mod import;
pub mod maths;
pub mod registry;
pub mod skinning;

pub use collider::{ColliderId, SkinnedMeshCollider};
pub use collision::castable::Castable;
pub use collision::hit::Hit;
pub use registry::CollisionRegistry;
pub use skinning::pose::{Skeleton, SkeletonPose};
pub use skinning::source::{BoneWeights, SkinnedMeshSource, SourceError};
