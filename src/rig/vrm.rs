//! VRM rig loaded from a GLB/VRM file.
//!
//! Reads the node hierarchy through the `gltf` crate and the VRM extensions
//! (humanoid bone map, expression presets) from the raw glTF JSON. Both
//! VRM 1.0 (`VRMC_vrm`) and VRM 0.x (`VRM`) files are supported.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::f32::consts::PI;
use std::path::Path;

use super::{ExpressionControl, HumanBone, HumanoidRig, Joint};
use crate::error::RigError;

/// VRM format generation a model was authored against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VrmVersion {
    /// VRM 0.x (`VRM` extension)
    V0,
    /// VRM 1.0 (`VRMC_vrm` extension)
    V1,
}

/// One morph target driven by an expression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpressionBind {
    /// Morph target index within the face mesh
    pub morph_index: usize,
    /// Weight applied at full expression strength
    pub weight: f32,
}

/// A scene node and its rest-pose rotation.
#[derive(Debug, Clone)]
pub struct RigNode {
    pub name: Option<String>,
    pub rest_rotation: Quat,
    pub parent: Option<usize>,
}

/// Expression presets of a VRM model and their current values.
#[derive(Debug, Clone, Default)]
pub struct ExpressionManager {
    binds: HashMap<String, Vec<ExpressionBind>>,
    /// Expressions marked `isBinary` (values snap to 0 or 1)
    binary: HashSet<String>,
    values: HashMap<String, f32>,
    morph_weights: Vec<f32>,
}

impl ExpressionManager {
    /// Build from parsed binds. Binds pointing past the face mesh's
    /// `morph_count` targets are dropped, as are expressions left without any.
    fn new(
        mut binds: HashMap<String, Vec<ExpressionBind>>,
        binary: HashSet<String>,
        morph_count: usize,
    ) -> Self {
        binds.retain(|name, list| {
            list.retain(|b| {
                let in_range = b.morph_index < morph_count;
                if !in_range {
                    tracing::warn!(
                        "Expression '{}' binds missing morph target {} (face mesh has {})",
                        name,
                        b.morph_index,
                        morph_count
                    );
                }
                in_range
            });
            !list.is_empty()
        });

        Self {
            binds,
            binary,
            values: HashMap::new(),
            morph_weights: vec![0.0; morph_count],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }

    /// Names of all expressions the model defines.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.binds.keys().map(|s| s.as_str())
    }

    pub fn is_binary(&self, name: &str) -> bool {
        self.binary.contains(name)
    }

    /// Morph target weights as of the last [`ExpressionManager::update`].
    pub fn morph_weights(&self) -> &[f32] {
        &self.morph_weights
    }

    /// Resolve expression values into morph target weights.
    pub fn update(&mut self) {
        self.morph_weights.iter_mut().for_each(|w| *w = 0.0);

        for (name, binds) in &self.binds {
            let value = self.values.get(name).copied().unwrap_or(0.0);
            let value = if self.binary.contains(name) {
                if value > 0.5 { 1.0 } else { 0.0 }
            } else {
                value
            };
            if value == 0.0 {
                continue;
            }

            for bind in binds {
                if let Some(w) = self.morph_weights.get_mut(bind.morph_index) {
                    *w = (*w + value * bind.weight).min(1.0);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.values.clear();
    }
}

impl ExpressionControl for ExpressionManager {
    fn set_value(&mut self, name: &str, weight: f32) {
        if !self.binds.contains_key(name) {
            tracing::trace!("Ignoring unknown expression '{}'", name);
            return;
        }
        self.values.insert(name.to_string(), weight.clamp(0.0, 1.0));
    }

    fn value(&self, name: &str) -> Option<f32> {
        self.binds
            .contains_key(name)
            .then(|| self.values.get(name).copied().unwrap_or(0.0))
    }
}

/// A loaded VRM humanoid the pose evaluator can drive.
#[derive(Debug, Clone)]
pub struct VrmRig {
    version: VrmVersion,
    nodes: Vec<RigNode>,
    /// VRM humanoid bone → node index
    bone_to_node: HashMap<HumanBone, usize>,
    /// Normalized joint rotations, one per mapped bone
    joints: HashMap<HumanBone, Joint>,
    expressions: ExpressionManager,
    position: Vec3,
    scale: f32,
}

impl VrmRig {
    /// Load a `.vrm`/`.glb` (or plain `.gltf`) file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RigError> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .map_err(|e| RigError::ReadFile(format!("{}: {}", path.display(), e)))?;

        Self::from_slice(&data)
    }

    /// Build a rig from the bytes of a GLB container or glTF JSON document.
    pub fn from_slice(data: &[u8]) -> Result<Self, RigError> {
        let gltf = gltf::Gltf::from_slice(data).map_err(|e| RigError::Gltf(e.to_string()))?;
        let document = &gltf.document;

        // Build parent map
        let node_count = document.nodes().count();
        let mut parents = vec![None; node_count];
        for node in document.nodes() {
            for child in node.children() {
                parents[child.index()] = Some(node.index());
            }
        }

        let nodes: Vec<RigNode> = document
            .nodes()
            .map(|node| {
                let (_, r, _) = node.transform().decomposed();
                RigNode {
                    name: node.name().map(String::from),
                    rest_rotation: Quat::from_array(r),
                    parent: parents[node.index()],
                }
            })
            .collect();

        // Face mesh: the mesh with the most morph targets
        let morph_count = document
            .meshes()
            .filter_map(|m| m.primitives().next().map(|p| p.morph_targets().count()))
            .max()
            .unwrap_or(0);

        let root = json_root(data)?;
        let (version, bone_to_node) = parse_humanoid(&root, node_count)?;
        let (binds, binary) = parse_expression_binds(&root);

        let joints = bone_to_node
            .keys()
            .map(|&bone| (bone, Joint::default()))
            .collect();

        Ok(Self {
            version,
            nodes,
            bone_to_node,
            joints,
            expressions: ExpressionManager::new(binds, binary, morph_count),
            position: Vec3::ZERO,
            scale: 1.0,
        })
    }

    pub fn version(&self) -> VrmVersion {
        self.version
    }

    pub fn nodes(&self) -> &[RigNode] {
        &self.nodes
    }

    /// Number of humanoid bones the model maps.
    pub fn bone_count(&self) -> usize {
        self.bone_to_node.len()
    }

    pub fn has_bone(&self, bone: HumanBone) -> bool {
        self.bone_to_node.contains_key(&bone)
    }

    /// Scene node index of a humanoid bone.
    pub fn node_for(&self, bone: HumanBone) -> Option<usize> {
        self.bone_to_node.get(&bone).copied()
    }

    pub fn joint(&self, bone: HumanBone) -> Option<&Joint> {
        self.joints.get(&bone)
    }

    /// All mapped joints in bone order.
    pub fn joints(&self) -> Vec<(HumanBone, Joint)> {
        let mut joints: Vec<_> = self.joints.iter().map(|(&b, &j)| (b, j)).collect();
        joints.sort_by_key(|(b, _)| *b);
        joints
    }

    pub fn expression_manager(&self) -> &ExpressionManager {
        &self.expressions
    }

    /// Local rotation of a bone's node: rest rotation followed by the joint's
    /// Euler rotation.
    pub fn posed_rotation(&self, bone: HumanBone) -> Option<Quat> {
        let node = self.node_for(bone)?;
        let joint = self.joints.get(&bone)?;
        let r = joint.rotation;
        Some(self.nodes[node].rest_rotation * Quat::from_euler(EulerRot::XYZ, r.x, r.y, r.z))
    }

    /// Zero every joint rotation and expression value.
    pub fn reset_pose(&mut self) {
        for joint in self.joints.values_mut() {
            joint.rotation = Vec3::ZERO;
        }
        self.expressions.reset();
    }

    /// Yaw applied to the model root so it faces the camera. VRM 0.x models
    /// face +Z and are turned around.
    pub fn root_yaw(&self) -> f32 {
        match self.version {
            VrmVersion::V0 => PI,
            VrmVersion::V1 => 0.0,
        }
    }

    pub fn set_placement(&mut self, position: Vec3, scale: f32) {
        self.position = position;
        self.scale = scale;
    }

    /// World transform of the model root.
    pub fn root_transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.root_yaw()),
            self.position,
        )
    }
}

impl HumanoidRig for VrmRig {
    fn joint_mut(&mut self, bone: HumanBone) -> Option<&mut Joint> {
        self.joints.get_mut(&bone)
    }

    fn expressions(&mut self) -> Option<&mut dyn ExpressionControl> {
        if self.expressions.is_empty() {
            None
        } else {
            Some(&mut self.expressions)
        }
    }

    fn update(&mut self, _delta: f32) {
        self.expressions.update();
    }
}

/// Parse the glTF JSON document, unwrapping a GLB container if present.
fn json_root(data: &[u8]) -> Result<Value, RigError> {
    let json: Cow<'_, [u8]> = if data.starts_with(b"glTF") {
        gltf::Glb::from_slice(data)
            .map_err(|e| RigError::Gltf(e.to_string()))?
            .json
    } else {
        Cow::Borrowed(data)
    };

    serde_json::from_slice(&json).map_err(|e| RigError::Json(e.to_string()))
}

/// Read the humanoid bone map, preferring VRM 1.0 over VRM 0.x.
fn parse_humanoid(
    root: &Value,
    node_count: usize,
) -> Result<(VrmVersion, HashMap<HumanBone, usize>), RigError> {
    let extensions = root.get("extensions");
    let mut map = HashMap::new();

    let mut insert = |bone: Option<HumanBone>, name: &str, node: Option<u64>| {
        let (Some(bone), Some(node)) = (bone, node) else {
            tracing::debug!("Skipping humanoid bone entry '{}'", name);
            return;
        };
        let node = node as usize;
        if node >= node_count {
            tracing::warn!("Humanoid bone '{}' points at missing node {}", name, node);
            return;
        }
        map.insert(bone, node);
    };

    if let Some(vrmc) = extensions.and_then(|e| e.get("VRMC_vrm")) {
        if let Some(bones) = vrmc
            .get("humanoid")
            .and_then(|h| h.get("humanBones"))
            .and_then(|b| b.as_object())
        {
            for (name, data) in bones {
                insert(
                    HumanBone::from_name(name),
                    name.as_str(),
                    data.get("node").and_then(|n| n.as_u64()),
                );
            }
        }
        return Ok((VrmVersion::V1, map));
    }

    if let Some(vrm) = extensions.and_then(|e| e.get("VRM")) {
        if let Some(bones) = vrm
            .get("humanoid")
            .and_then(|h| h.get("humanBones"))
            .and_then(|b| b.as_array())
        {
            for bone in bones {
                let name = bone.get("bone").and_then(|b| b.as_str()).unwrap_or("");
                insert(
                    HumanBone::from_vrm0_name(name),
                    name,
                    bone.get("node").and_then(|n| n.as_u64()),
                );
            }
        }
        return Ok((VrmVersion::V0, map));
    }

    Err(RigError::NotHumanoid)
}

/// Parse expression morph target binds.
///
/// Reads `VRMC_vrm.expressions` (preset and custom) and falls back to the
/// VRM 0.x `blendShapeMaster`, whose preset names are mapped to their 1.0
/// equivalents and whose 0-100 weights are rescaled to 0-1.
fn parse_expression_binds(
    root: &Value,
) -> (HashMap<String, Vec<ExpressionBind>>, HashSet<String>) {
    let mut map = HashMap::new();
    let mut binary = HashSet::new();
    let extensions = root.get("extensions");

    if let Some(expressions) = extensions
        .and_then(|e| e.get("VRMC_vrm"))
        .and_then(|v| v.get("expressions"))
    {
        for group in ["preset", "custom"] {
            let Some(entries) = expressions.get(group).and_then(|p| p.as_object()) else {
                continue;
            };
            for (name, expr) in entries {
                if expr.get("isBinary").and_then(|b| b.as_bool()).unwrap_or(false) {
                    binary.insert(name.clone());
                }
                let binds = parse_binds(expr.get("morphTargetBinds"), 1.0);
                if !binds.is_empty() {
                    map.insert(name.clone(), binds);
                }
            }
        }
        return (map, binary);
    }

    if let Some(groups) = extensions
        .and_then(|e| e.get("VRM"))
        .and_then(|v| v.get("blendShapeMaster"))
        .and_then(|m| m.get("blendShapeGroups"))
        .and_then(|g| g.as_array())
    {
        for group in groups {
            // Prefer presetName (standardized) over name (freeform)
            let raw_name = group
                .get("presetName")
                .and_then(|n| n.as_str())
                .filter(|n| !n.is_empty() && *n != "unknown")
                .or_else(|| group.get("name").and_then(|n| n.as_str()));
            let Some(raw_name) = raw_name else {
                continue;
            };
            let name = vrm0_preset_name(&raw_name.to_lowercase());

            if group.get("isBinary").and_then(|b| b.as_bool()).unwrap_or(false) {
                binary.insert(name.clone());
            }
            let binds = parse_binds(group.get("binds"), 100.0);
            if !binds.is_empty() {
                map.insert(name, binds);
            }
        }
    }

    (map, binary)
}

/// Parse a bind list; `full_weight` is the weight that means 100%.
fn parse_binds(binds: Option<&Value>, full_weight: f32) -> Vec<ExpressionBind> {
    binds
        .and_then(|b| b.as_array())
        .map(|binds| {
            binds
                .iter()
                .filter_map(|b| {
                    let index = usize::try_from(b.get("index")?.as_u64()?).ok()?;
                    let weight = b
                        .get("weight")
                        .and_then(|w| w.as_f64())
                        .map(|w| w as f32)
                        .unwrap_or(full_weight);
                    Some(ExpressionBind {
                        morph_index: index,
                        weight: weight / full_weight,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// VRM 0.x preset name → VRM 1.0 preset name
fn vrm0_preset_name(name: &str) -> String {
    match name {
        "a" => "aa",
        "i" => "ih",
        "u" => "ou",
        "e" => "ee",
        "o" => "oh",
        "blink_l" => "blinkLeft",
        "blink_r" => "blinkRight",
        "joy" => "happy",
        "sorrow" => "sad",
        "fun" => "relaxed",
        "lookup" => "lookUp",
        "lookdown" => "lookDown",
        "lookleft" => "lookLeft",
        "lookright" => "lookRight",
        other => other,
    }
    .to_string()
}
