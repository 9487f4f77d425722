//! VRM humanoid bone vocabulary.
//!
//! Bones are addressed by logical name, independent of the node names a
//! particular model file uses. Names follow VRM 1.0 (`VRMC_vrm`); VRM 0.x
//! names are mapped onto the same set.

use serde::{Deserialize, Serialize};

macro_rules! human_bones {
    ($($variant:ident => $name:literal,)*) => {
        /// A bone in the VRM humanoid skeleton.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        pub enum HumanBone {
            $($variant,)*
        }

        impl HumanBone {
            /// Every bone in the vocabulary, in VRM humanoid order.
            pub const ALL: &'static [HumanBone] = &[$(HumanBone::$variant,)*];

            /// The VRM 1.0 name of this bone (`"leftUpperArm"`, ...).
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(HumanBone::$variant => $name,)*
                }
            }

            /// Look up a bone by its VRM 1.0 name.
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($name => Some(HumanBone::$variant),)*
                    _ => None,
                }
            }
        }
    };
}

human_bones! {
    Hips => "hips",
    Spine => "spine",
    Chest => "chest",
    UpperChest => "upperChest",
    Neck => "neck",
    Head => "head",
    LeftEye => "leftEye",
    RightEye => "rightEye",
    Jaw => "jaw",
    LeftUpperLeg => "leftUpperLeg",
    LeftLowerLeg => "leftLowerLeg",
    LeftFoot => "leftFoot",
    LeftToes => "leftToes",
    RightUpperLeg => "rightUpperLeg",
    RightLowerLeg => "rightLowerLeg",
    RightFoot => "rightFoot",
    RightToes => "rightToes",
    LeftShoulder => "leftShoulder",
    LeftUpperArm => "leftUpperArm",
    LeftLowerArm => "leftLowerArm",
    LeftHand => "leftHand",
    RightShoulder => "rightShoulder",
    RightUpperArm => "rightUpperArm",
    RightLowerArm => "rightLowerArm",
    RightHand => "rightHand",
    LeftThumbMetacarpal => "leftThumbMetacarpal",
    LeftThumbProximal => "leftThumbProximal",
    LeftThumbDistal => "leftThumbDistal",
    LeftIndexProximal => "leftIndexProximal",
    LeftIndexIntermediate => "leftIndexIntermediate",
    LeftIndexDistal => "leftIndexDistal",
    LeftMiddleProximal => "leftMiddleProximal",
    LeftMiddleIntermediate => "leftMiddleIntermediate",
    LeftMiddleDistal => "leftMiddleDistal",
    LeftRingProximal => "leftRingProximal",
    LeftRingIntermediate => "leftRingIntermediate",
    LeftRingDistal => "leftRingDistal",
    LeftLittleProximal => "leftLittleProximal",
    LeftLittleIntermediate => "leftLittleIntermediate",
    LeftLittleDistal => "leftLittleDistal",
    RightThumbMetacarpal => "rightThumbMetacarpal",
    RightThumbProximal => "rightThumbProximal",
    RightThumbDistal => "rightThumbDistal",
    RightIndexProximal => "rightIndexProximal",
    RightIndexIntermediate => "rightIndexIntermediate",
    RightIndexDistal => "rightIndexDistal",
    RightMiddleProximal => "rightMiddleProximal",
    RightMiddleIntermediate => "rightMiddleIntermediate",
    RightMiddleDistal => "rightMiddleDistal",
    RightRingProximal => "rightRingProximal",
    RightRingIntermediate => "rightRingIntermediate",
    RightRingDistal => "rightRingDistal",
    RightLittleProximal => "rightLittleProximal",
    RightLittleIntermediate => "rightLittleIntermediate",
    RightLittleDistal => "rightLittleDistal",
}

impl HumanBone {
    /// Look up a bone by its VRM 0.x name.
    ///
    /// VRM 0.x names may start upper-case (`"LeftUpperArm"`) and its thumb
    /// chain is one joint further out: 0.x `thumbProximal` is 1.0
    /// `thumbMetacarpal`, 0.x `thumbIntermediate` is 1.0 `thumbProximal`.
    pub fn from_vrm0_name(name: &str) -> Option<Self> {
        let name = lower_first(name);
        match name.as_str() {
            "leftThumbProximal" => Some(Self::LeftThumbMetacarpal),
            "leftThumbIntermediate" => Some(Self::LeftThumbProximal),
            "rightThumbProximal" => Some(Self::RightThumbMetacarpal),
            "rightThumbIntermediate" => Some(Self::RightThumbProximal),
            other => Self::from_name(other),
        }
    }
}

impl std::fmt::Display for HumanBone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// "LeftUpperArm" → "leftUpperArm"
fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vocabulary_size() {
        // 25 body bones + 30 finger bones
        assert_eq!(HumanBone::ALL.len(), 55);
    }

    #[test]
    fn test_name_lookup() {
        assert_eq!(HumanBone::from_name("head"), Some(HumanBone::Head));
        assert_eq!(HumanBone::from_name("upperChest"), Some(HumanBone::UpperChest));
        assert_eq!(HumanBone::from_name("rightHand"), Some(HumanBone::RightHand));
        assert_eq!(HumanBone::from_name("Head"), None);
        assert_eq!(HumanBone::from_name("tail"), None);
    }

    #[test]
    fn test_names_are_unique_and_consistent() {
        for bone in HumanBone::ALL {
            assert_eq!(HumanBone::from_name(bone.as_str()), Some(*bone));
        }
    }

    #[test]
    fn test_serde_uses_vrm_names() {
        for bone in HumanBone::ALL {
            let json = serde_json::to_string(bone).unwrap();
            assert_eq!(json, format!("\"{}\"", bone.as_str()));
        }
    }

    #[test]
    fn test_vrm0_names() {
        assert_eq!(HumanBone::from_vrm0_name("LeftUpperArm"), Some(HumanBone::LeftUpperArm));
        assert_eq!(HumanBone::from_vrm0_name("spine"), Some(HumanBone::Spine));
        assert_eq!(
            HumanBone::from_vrm0_name("leftThumbProximal"),
            Some(HumanBone::LeftThumbMetacarpal)
        );
        assert_eq!(
            HumanBone::from_vrm0_name("rightThumbIntermediate"),
            Some(HumanBone::RightThumbProximal)
        );
        assert_eq!(
            HumanBone::from_vrm0_name("rightThumbDistal"),
            Some(HumanBone::RightThumbDistal)
        );
        assert_eq!(HumanBone::from_vrm0_name(""), None);
    }
}
