//! Concrete model estimators usable with [`RansacDriver`](crate::core::RansacDriver).

pub mod rigid_plane;

pub use rigid_plane::RigidPlaneEstimator;
