//! Rig access for the pose evaluator.
//!
//! The evaluator never owns a rig. It borrows one through [`HumanoidRig`],
//! which hands out joints by logical bone name and, when the model supports
//! it, an [`ExpressionControl`] for blend shapes.

pub mod bones;
pub mod loader;
pub mod vrm;

#[cfg(test)]
pub(crate) mod testing;

use glam::Vec3;

pub use bones::HumanBone;
pub use loader::{spawn_load, RigLoad};
pub use vrm::{VrmRig, VrmVersion};

/// A rotatable joint of a loaded rig.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Joint {
    /// Local Euler rotation (XYZ order, radians) relative to the normalized
    /// rest pose.
    pub rotation: Vec3,
}

/// Named blend-shape control of a rig.
pub trait ExpressionControl {
    /// Set the weight of an expression. Unknown names are ignored.
    fn set_value(&mut self, name: &str, weight: f32);

    /// Current weight of an expression, if the rig knows the name.
    fn value(&self, name: &str) -> Option<f32>;
}

/// A skinned humanoid model the pose evaluator can write into.
pub trait HumanoidRig {
    /// The joint for `bone`, or `None` when the model does not map it.
    fn joint_mut(&mut self, bone: HumanBone) -> Option<&mut Joint>;

    /// Expression control, or `None` when the model has no blend shapes.
    fn expressions(&mut self) -> Option<&mut dyn ExpressionControl>;

    /// Per-frame hook for the rig's own systems. Called before the pose is
    /// applied.
    fn update(&mut self, _delta: f32) {}
}
