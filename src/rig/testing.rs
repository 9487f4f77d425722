//! In-memory rig used by unit tests.

use glam::Vec3;
use std::collections::HashMap;

use super::{ExpressionControl, HumanBone, HumanoidRig, Joint};
use crate::animation::pose::MANAGED_EXPRESSIONS;

/// Expressions with a fixed set of known names. Unknown names are ignored,
/// like on a loaded model.
#[derive(Debug, Default)]
pub(crate) struct TestExpressions {
    pub values: HashMap<String, f32>,
}

impl TestExpressions {
    pub fn with_names(names: &[&str]) -> Self {
        Self {
            values: names.iter().map(|n| (n.to_string(), 0.0)).collect(),
        }
    }
}

impl ExpressionControl for TestExpressions {
    fn set_value(&mut self, name: &str, weight: f32) {
        if let Some(value) = self.values.get_mut(name) {
            *value = weight;
        }
    }

    fn value(&self, name: &str) -> Option<f32> {
        self.values.get(name).copied()
    }
}

/// A rig that maps an arbitrary set of bones and records update calls.
#[derive(Debug, Default)]
pub(crate) struct TestRig {
    pub joints: HashMap<HumanBone, Joint>,
    pub expressions: Option<TestExpressions>,
    pub updates: Vec<f32>,
}

impl TestRig {
    /// A rig with every humanoid bone and expression support.
    pub fn full() -> Self {
        Self::with_bones(HumanBone::ALL).with_expressions()
    }

    /// A rig with no bones and no expressions.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_bones(bones: &[HumanBone]) -> Self {
        Self {
            joints: bones.iter().map(|&b| (b, Joint::default())).collect(),
            ..Default::default()
        }
    }

    /// Expression support for every expression a pose can write.
    pub fn with_expressions(self) -> Self {
        self.with_expression_names(MANAGED_EXPRESSIONS)
    }

    pub fn with_expression_names(mut self, names: &[&str]) -> Self {
        self.expressions = Some(TestExpressions::with_names(names));
        self
    }

    pub fn rotation(&self, bone: HumanBone) -> Vec3 {
        self.joints
            .get(&bone)
            .map(|j| j.rotation)
            .unwrap_or_else(|| panic!("test rig has no {bone} bone"))
    }

    pub fn expression(&self, name: &str) -> Option<f32> {
        self.expressions.as_ref().and_then(|e| e.value(name))
    }
}

impl HumanoidRig for TestRig {
    fn joint_mut(&mut self, bone: HumanBone) -> Option<&mut Joint> {
        self.joints.get_mut(&bone)
    }

    fn expressions(&mut self) -> Option<&mut dyn ExpressionControl> {
        self.expressions
            .as_mut()
            .map(|e| e as &mut dyn ExpressionControl)
    }

    fn update(&mut self, delta: f32) {
        self.updates.push(delta);
    }
}
