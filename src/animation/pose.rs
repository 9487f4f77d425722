//! Procedural pose evaluation.
//!
//! [`evaluate`] maps an animation mode and the time spent in it to a set of
//! joint rotations and expression weights. It is a pure function: the same
//! `(mode, time)` always yields the same [`Pose`]. Writing the pose into a
//! live rig is a separate step, [`Pose::apply`].

use glam::Vec3;
use serde::Serialize;
use std::f32::consts::PI;

use super::mode::AnimationMode;
use crate::rig::{HumanBone, HumanoidRig};

/// Expression key of the open-mouth viseme.
pub const MOUTH_OPEN: &str = "aa";

/// Every bone any mode writes to.
pub const MANAGED_BONES: &[HumanBone] = &[
    HumanBone::Spine,
    HumanBone::Head,
    HumanBone::LeftUpperArm,
    HumanBone::RightUpperArm,
    HumanBone::LeftLowerArm,
    HumanBone::RightLowerArm,
    HumanBone::RightHand,
];

/// Every expression any mode writes to.
pub const MANAGED_EXPRESSIONS: &[&str] = &[MOUTH_OPEN];

/// Upper arm drop from the T-pose in idle (72°).
const IDLE_ARM_DROP: f32 = PI / 2.5;
const IDLE_ARM_FORWARD: f32 = 0.1;
const IDLE_ELBOW_BEND: f32 = 0.1;

/// A partial local Euler rotation. Axes left as `None` are not written, so the
/// joint keeps whatever value it had on that axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AxisRotation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z: Option<f32>,
}

impl AxisRotation {
    pub fn with_x(mut self, radians: f32) -> Self {
        self.x = Some(radians);
        self
    }

    pub fn with_y(mut self, radians: f32) -> Self {
        self.y = Some(radians);
        self
    }

    pub fn with_z(mut self, radians: f32) -> Self {
        self.z = Some(radians);
        self
    }

    /// Number of axes this rotation sets.
    pub fn axis_count(&self) -> usize {
        [self.x, self.y, self.z].iter().filter(|a| a.is_some()).count()
    }

    /// Overwrite the set axes of `rotation`, returning how many were written.
    pub fn write_into(&self, rotation: &mut Vec3) -> usize {
        if let Some(x) = self.x {
            rotation.x = x;
        }
        if let Some(y) = self.y {
            rotation.y = y;
        }
        if let Some(z) = self.z {
            rotation.z = z;
        }
        self.axis_count()
    }
}

/// A rotation targeted at one bone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoneWrite {
    pub bone: HumanBone,
    pub rotation: AxisRotation,
}

/// An expression weight in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpressionWrite {
    pub name: &'static str,
    pub weight: f32,
}

/// The joint rotations and expression weights for one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pose {
    pub mode: AnimationMode,
    pub joints: Vec<BoneWrite>,
    pub expressions: Vec<ExpressionWrite>,
}

/// What [`Pose::apply`] actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ApplyReport {
    /// Individual joint axes written
    pub joint_writes: usize,
    /// Bones in the pose the rig does not map
    pub skipped_bones: usize,
    /// Expression weights written
    pub expression_writes: usize,
    /// Expression weights dropped because the rig has no expression support
    /// or does not define the expression
    pub skipped_expressions: usize,
}

impl Pose {
    fn new(mode: AnimationMode) -> Self {
        Self {
            mode,
            joints: Vec::new(),
            expressions: Vec::new(),
        }
    }

    fn rotate(&mut self, bone: HumanBone, rotation: AxisRotation) {
        self.joints.push(BoneWrite { bone, rotation });
    }

    fn express(&mut self, name: &'static str, weight: f32) {
        self.expressions.push(ExpressionWrite {
            name,
            weight: weight.clamp(0.0, 1.0),
        });
    }

    /// The rotation this pose sets on `bone`, if any.
    pub fn joint(&self, bone: HumanBone) -> Option<AxisRotation> {
        self.joints
            .iter()
            .find(|w| w.bone == bone)
            .map(|w| w.rotation)
    }

    /// The weight this pose sets on expression `name`, if any.
    pub fn expression(&self, name: &str) -> Option<f32> {
        self.expressions
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.weight)
    }

    /// Write this pose into `rig`.
    ///
    /// Bones the rig does not map are skipped, as are expressions the rig does
    /// not define. Neither is an error.
    pub fn apply<R: HumanoidRig + ?Sized>(&self, rig: &mut R) -> ApplyReport {
        let mut report = ApplyReport::default();

        for write in &self.joints {
            match rig.joint_mut(write.bone) {
                Some(joint) => report.joint_writes += write.rotation.write_into(&mut joint.rotation),
                None => report.skipped_bones += 1,
            }
        }

        if self.expressions.is_empty() {
            return report;
        }
        match rig.expressions() {
            Some(control) => {
                for expr in &self.expressions {
                    if control.value(expr.name).is_none() {
                        report.skipped_expressions += 1;
                        continue;
                    }
                    control.set_value(expr.name, expr.weight);
                    report.expression_writes += 1;
                }
            }
            None => report.skipped_expressions += self.expressions.len(),
        }

        report
    }
}

/// Compute the pose for `mode` after `time` seconds in it.
pub fn evaluate(mode: AnimationMode, time: f32) -> Pose {
    let mut pose = Pose::new(mode);

    match mode {
        AnimationMode::Idle => idle(&mut pose, time),
        AnimationMode::Waving => waving(&mut pose, time),
        AnimationMode::Nodding => nodding(&mut pose, time),
        AnimationMode::Talking => talking(&mut pose, time),
    }

    pose
}

/// Breathing, slow head sway and relaxed arms.
fn idle(pose: &mut Pose, t: f32) {
    let breathing = (t * 2.0).sin() * 0.02;
    pose.rotate(HumanBone::Spine, AxisRotation::default().with_x(breathing));

    pose.rotate(
        HumanBone::Head,
        AxisRotation::default()
            .with_y((t * 0.5).sin() * 0.05)
            .with_x((t * 0.3).sin() * 0.03),
    );

    // Arms down out of the T-pose, held constant
    pose.rotate(
        HumanBone::LeftUpperArm,
        AxisRotation::default()
            .with_z(-IDLE_ARM_DROP)
            .with_x(IDLE_ARM_FORWARD),
    );
    pose.rotate(
        HumanBone::RightUpperArm,
        AxisRotation::default()
            .with_z(IDLE_ARM_DROP)
            .with_x(IDLE_ARM_FORWARD),
    );
    pose.rotate(
        HumanBone::LeftLowerArm,
        AxisRotation::default().with_z(-IDLE_ELBOW_BEND),
    );
    pose.rotate(
        HumanBone::RightLowerArm,
        AxisRotation::default().with_z(IDLE_ELBOW_BEND),
    );
}

fn waving(pose: &mut Pose, t: f32) {
    let swing = (t * 5.0).sin();

    pose.rotate(
        HumanBone::RightUpperArm,
        AxisRotation::default()
            .with_z(-PI / 2.0 + swing * 0.3)
            .with_x(PI / 4.0),
    );
    pose.rotate(
        HumanBone::RightLowerArm,
        AxisRotation::default().with_z(-swing * 0.4),
    );
    pose.rotate(
        HumanBone::RightHand,
        AxisRotation::default().with_z((t * 10.0).sin() * 0.2),
    );
}

fn nodding(pose: &mut Pose, t: f32) {
    pose.rotate(
        HumanBone::Head,
        AxisRotation::default().with_x((t * 4.0).sin() * 0.2),
    );
}

fn talking(pose: &mut Pose, t: f32) {
    let jaw = (t * 8.0).sin();

    pose.rotate(
        HumanBone::Head,
        AxisRotation::default()
            .with_x(jaw * 0.05)
            .with_y((t * 3.0).sin() * 0.03),
    );

    pose.express(MOUTH_OPEN, jaw.abs() * 0.5);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::testing::TestRig;

    const EPS: f32 = 1e-6;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_times() -> impl Iterator<Item = f32> {
        (0..20_000).map(|i| i as f32 * 0.005)
    }

    #[test]
    fn test_idle_stays_within_amplitude() {
        for t in sample_times() {
            let pose = evaluate(AnimationMode::Idle, t);
            let spine_x = pose.joint(HumanBone::Spine).and_then(|r| r.x).unwrap();
            let head_y = pose.joint(HumanBone::Head).and_then(|r| r.y).unwrap();
            assert!((-0.02..=0.02).contains(&spine_x), "spine.x={spine_x} at t={t}");
            assert!((-0.05..=0.05).contains(&head_y), "head.y={head_y} at t={t}");
        }
    }

    #[test]
    fn test_idle_arm_rest_is_constant() {
        let early = evaluate(AnimationMode::Idle, 0.0);
        let late = evaluate(AnimationMode::Idle, 37.5);
        for bone in [
            HumanBone::LeftUpperArm,
            HumanBone::RightUpperArm,
            HumanBone::LeftLowerArm,
            HumanBone::RightLowerArm,
        ] {
            assert_eq!(early.joint(bone), late.joint(bone), "{bone} moved");
        }

        let left = early.joint(HumanBone::LeftUpperArm).unwrap();
        assert_close(left.z.unwrap(), -PI / 2.5);
        assert_close(left.x.unwrap(), 0.1);
        assert_eq!(left.y, None);

        let right = early.joint(HumanBone::RightUpperArm).unwrap();
        assert_close(right.z.unwrap(), PI / 2.5);
        assert_close(
            early.joint(HumanBone::RightLowerArm).unwrap().z.unwrap(),
            0.1,
        );
    }

    #[test]
    fn test_waving_at_zero() {
        let pose = evaluate(AnimationMode::Waving, 0.0);
        let upper = pose.joint(HumanBone::RightUpperArm).unwrap();
        assert_close(upper.z.unwrap(), -PI / 2.0);
        assert_close(upper.x.unwrap(), PI / 4.0);
        assert_close(pose.joint(HumanBone::RightLowerArm).unwrap().z.unwrap(), 0.0);
        assert_close(pose.joint(HumanBone::RightHand).unwrap().z.unwrap(), 0.0);
        assert!(pose.joint(HumanBone::LeftUpperArm).is_none());
        assert!(pose.expressions.is_empty());
    }

    #[test]
    fn test_talking_mouth_peaks_at_half() {
        let pose = evaluate(AnimationMode::Talking, PI / 16.0);
        assert_close(pose.expression(MOUTH_OPEN).unwrap(), 0.5);

        for t in sample_times() {
            let weight = evaluate(AnimationMode::Talking, t)
                .expression(MOUTH_OPEN)
                .unwrap();
            assert!((0.0..=0.5 + EPS).contains(&weight), "aa={weight} at t={t}");
        }
    }

    #[test]
    fn test_nodding_head_pitch() {
        // 4t = 0.5
        let pose = evaluate(AnimationMode::Nodding, 0.125);
        let head = pose.joint(HumanBone::Head).unwrap();
        assert_close(head.x.unwrap(), 0.5f32.sin() * 0.2);
        assert!((head.x.unwrap() - 0.0959).abs() < 1e-4);
        assert_eq!(head.y, None);
        assert_eq!(pose.joints.len(), 1);

        // 4t = π/2, the peak of the nod
        let peak = evaluate(AnimationMode::Nodding, PI / 8.0);
        assert_close(peak.joint(HumanBone::Head).unwrap().x.unwrap(), 0.2);
    }

    #[test]
    fn test_talking_head_bob() {
        let t = 0.4;
        let head = evaluate(AnimationMode::Talking, t)
            .joint(HumanBone::Head)
            .unwrap();
        assert_close(head.x.unwrap(), (t * 8.0).sin() * 0.05);
        assert_close(head.y.unwrap(), (t * 3.0).sin() * 0.03);
    }

    const GENERIC_TIMES: [f32; 2] = [0.37, 2.9];

    #[test]
    fn test_idle_matches_closed_form() {
        for t in GENERIC_TIMES {
            let pose = evaluate(AnimationMode::Idle, t);
            assert_eq!(pose.joints.len(), 6);
            assert!(pose.expressions.is_empty());

            let spine = pose.joint(HumanBone::Spine).unwrap();
            assert_close(spine.x.unwrap(), (2.0 * t).sin() * 0.02);
            assert_eq!((spine.y, spine.z), (None, None));

            let head = pose.joint(HumanBone::Head).unwrap();
            assert_close(head.x.unwrap(), (0.3 * t).sin() * 0.03);
            assert_close(head.y.unwrap(), (0.5 * t).sin() * 0.05);
            assert_eq!(head.z, None);

            let left = pose.joint(HumanBone::LeftUpperArm).unwrap();
            assert_close(left.z.unwrap(), -PI / 2.5);
            assert_close(left.x.unwrap(), 0.1);
            let right = pose.joint(HumanBone::RightUpperArm).unwrap();
            assert_close(right.z.unwrap(), PI / 2.5);
            assert_close(right.x.unwrap(), 0.1);
            assert_eq!(right.y, None);

            let left_lower = pose.joint(HumanBone::LeftLowerArm).unwrap();
            assert_close(left_lower.z.unwrap(), -0.1);
            assert_eq!((left_lower.x, left_lower.y), (None, None));
            let right_lower = pose.joint(HumanBone::RightLowerArm).unwrap();
            assert_close(right_lower.z.unwrap(), 0.1);
            assert_eq!((right_lower.x, right_lower.y), (None, None));
        }
    }

    #[test]
    fn test_waving_matches_closed_form() {
        for t in GENERIC_TIMES {
            let pose = evaluate(AnimationMode::Waving, t);
            assert_eq!(pose.joints.len(), 3);
            assert!(pose.expressions.is_empty());

            let upper = pose.joint(HumanBone::RightUpperArm).unwrap();
            assert_close(upper.z.unwrap(), -PI / 2.0 + (5.0 * t).sin() * 0.3);
            assert_close(upper.x.unwrap(), PI / 4.0);
            assert_eq!(upper.y, None);

            let lower = pose.joint(HumanBone::RightLowerArm).unwrap();
            assert_close(lower.z.unwrap(), -(5.0 * t).sin() * 0.4);
            assert_eq!((lower.x, lower.y), (None, None));

            let hand = pose.joint(HumanBone::RightHand).unwrap();
            assert_close(hand.z.unwrap(), (10.0 * t).sin() * 0.2);
            assert_eq!((hand.x, hand.y), (None, None));
        }
    }

    #[test]
    fn test_nodding_matches_closed_form() {
        for t in GENERIC_TIMES {
            let pose = evaluate(AnimationMode::Nodding, t);
            assert_eq!(pose.joints.len(), 1);
            assert!(pose.expressions.is_empty());

            let head = pose.joint(HumanBone::Head).unwrap();
            assert_close(head.x.unwrap(), (4.0 * t).sin() * 0.2);
            assert_eq!((head.y, head.z), (None, None));
        }
    }

    #[test]
    fn test_talking_matches_closed_form() {
        for t in GENERIC_TIMES {
            let pose = evaluate(AnimationMode::Talking, t);
            assert_eq!(pose.joints.len(), 1);
            assert_eq!(pose.expressions.len(), 1);

            let head = pose.joint(HumanBone::Head).unwrap();
            assert_close(head.x.unwrap(), (8.0 * t).sin() * 0.05);
            assert_close(head.y.unwrap(), (3.0 * t).sin() * 0.03);
            assert_eq!(head.z, None);
            assert_close(
                pose.expression(MOUTH_OPEN).unwrap(),
                (8.0 * t).sin().abs() * 0.5,
            );
        }
    }

    #[test]
    fn test_apply_skips_expressions_the_rig_lacks() {
        let mut rig = TestRig::full().with_expression_names(&["blink"]);
        let report = evaluate(AnimationMode::Talking, PI / 16.0).apply(&mut rig);
        assert_eq!(report.expression_writes, 0);
        assert_eq!(report.skipped_expressions, 1);
        assert_eq!(rig.expression(MOUTH_OPEN), None);
        assert_eq!(rig.expression("blink"), Some(0.0));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        for mode in AnimationMode::ALL {
            for t in [0.0, 0.1, 1.7, 250.0] {
                assert_eq!(evaluate(mode, t), evaluate(mode, t));
            }
        }
    }

    #[test]
    fn test_managed_bones_cover_every_mode() {
        for mode in AnimationMode::ALL {
            let pose = evaluate(mode, 1.0);
            for write in &pose.joints {
                assert!(MANAGED_BONES.contains(&write.bone), "{} not managed", write.bone);
            }
            for expr in &pose.expressions {
                assert!(MANAGED_EXPRESSIONS.contains(&expr.name));
            }
        }
    }

    #[test]
    fn test_apply_to_rig_without_bones_writes_nothing() {
        let mut rig = TestRig::empty();
        for mode in AnimationMode::ALL {
            let report = evaluate(mode, 0.3).apply(&mut rig);
            assert_eq!(report.joint_writes, 0);
            assert_eq!(report.expression_writes, 0);
        }
        assert!(rig.joints.is_empty());

        let report = evaluate(AnimationMode::Idle, 0.3).apply(&mut rig);
        assert_eq!(report.skipped_bones, 6);
        let report = evaluate(AnimationMode::Talking, 0.3).apply(&mut rig);
        assert_eq!(report.skipped_expressions, 1);
    }

    #[test]
    fn test_apply_skips_only_missing_bones() {
        let mut rig = TestRig::with_bones(&[HumanBone::Head, HumanBone::LeftUpperArm]);
        let report = evaluate(AnimationMode::Idle, 1.0).apply(&mut rig);

        // head x+y, left upper arm z+x
        assert_eq!(report.joint_writes, 4);
        assert_eq!(report.skipped_bones, 4);
        assert_close(rig.rotation(HumanBone::LeftUpperArm).z, -PI / 2.5);
    }

    #[test]
    fn test_apply_only_touches_named_axes() {
        let mut rig = TestRig::full();
        rig.joints.get_mut(&HumanBone::Head).unwrap().rotation = Vec3::new(0.7, 0.8, 0.9);

        evaluate(AnimationMode::Nodding, 0.125).apply(&mut rig);

        let head = rig.rotation(HumanBone::Head);
        assert_close(head.x, 0.5f32.sin() * 0.2);
        assert_close(head.y, 0.8);
        assert_close(head.z, 0.9);
    }

    #[test]
    fn test_apply_writes_mouth_when_supported() {
        let mut rig = TestRig::full();
        let report = evaluate(AnimationMode::Talking, PI / 16.0).apply(&mut rig);
        assert_eq!(report.expression_writes, 1);
        assert_close(rig.expression(MOUTH_OPEN).unwrap(), 0.5);

        let mut rig = TestRig::with_bones(&[HumanBone::Head]);
        let report = evaluate(AnimationMode::Talking, PI / 16.0).apply(&mut rig);
        assert_eq!(report.joint_writes, 2);
        assert_eq!(report.skipped_expressions, 1);
    }

    #[test]
    fn test_repeated_apply_is_stable() {
        let mut rig = TestRig::full();
        let pose = evaluate(AnimationMode::Waving, 2.25);
        pose.apply(&mut rig);
        let first: Vec<_> = MANAGED_BONES.iter().map(|&b| rig.rotation(b)).collect();
        pose.apply(&mut rig);
        let second: Vec<_> = MANAGED_BONES.iter().map(|&b| rig.rotation(b)).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_axis_rotation_counts() {
        let r = AxisRotation::default().with_x(1.0).with_z(2.0);
        assert_eq!(r.axis_count(), 2);
        let mut v = Vec3::splat(5.0);
        assert_eq!(r.write_into(&mut v), 2);
        assert_eq!(v, Vec3::new(1.0, 5.0, 2.0));
    }
}
