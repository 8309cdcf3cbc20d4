pub mod castable;
pub mod colliders;
pub mod hit;
pub mod query;
