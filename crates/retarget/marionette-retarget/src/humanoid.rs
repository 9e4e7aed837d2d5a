//! Humanoid bone mapper: infers canonical humanoid slots from joint names.
//!
//! Each canonical bone has an ordered list of candidate names covering the
//! Unity/VRM, Mixamo, Unreal, Blender and 3ds Max Biped conventions. Bones are
//! resolved in priority order (torso, head, legs, arms, fingers) and each claims
//! the first unclaimed joint whose name matches a candidate. Matching is
//! case-insensitive and also tries the name with any namespace prefix removed
//! (everything up to the last `:` or `|`), so `mixamorig:Hips` matches `Hips`.

use std::fmt;

use hashbrown::HashMap;
use marionette_anim_core::Skeleton;
use serde::{Deserialize, Serialize};

pub const HUMANOID_BONE_COUNT: usize = 52;

/// Canonical humanoid bones, declared in mapping priority order.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HumanoidBone {
    // Torso and head
    Hips,
    Spine,
    Chest,
    UpperChest,
    Neck,
    Head,
    // Legs
    LeftUpperLeg,
    LeftLowerLeg,
    LeftFoot,
    LeftToes,
    RightUpperLeg,
    RightLowerLeg,
    RightFoot,
    RightToes,
    // Arms
    LeftShoulder,
    LeftUpperArm,
    LeftLowerArm,
    LeftHand,
    RightShoulder,
    RightUpperArm,
    RightLowerArm,
    RightHand,
    // Fingers
    LeftThumbProximal,
    LeftThumbIntermediate,
    LeftThumbDistal,
    LeftIndexProximal,
    LeftIndexIntermediate,
    LeftIndexDistal,
    LeftMiddleProximal,
    LeftMiddleIntermediate,
    LeftMiddleDistal,
    LeftRingProximal,
    LeftRingIntermediate,
    LeftRingDistal,
    LeftLittleProximal,
    LeftLittleIntermediate,
    LeftLittleDistal,
    RightThumbProximal,
    RightThumbIntermediate,
    RightThumbDistal,
    RightIndexProximal,
    RightIndexIntermediate,
    RightIndexDistal,
    RightMiddleProximal,
    RightMiddleIntermediate,
    RightMiddleDistal,
    RightRingProximal,
    RightRingIntermediate,
    RightRingDistal,
    RightLittleProximal,
    RightLittleIntermediate,
    RightLittleDistal,
}

impl HumanoidBone {
    /// Every bone in mapping priority order.
    pub const ALL: [HumanoidBone; HUMANOID_BONE_COUNT] = [
        HumanoidBone::Hips,
        HumanoidBone::Spine,
        HumanoidBone::Chest,
        HumanoidBone::UpperChest,
        HumanoidBone::Neck,
        HumanoidBone::Head,
        HumanoidBone::LeftUpperLeg,
        HumanoidBone::LeftLowerLeg,
        HumanoidBone::LeftFoot,
        HumanoidBone::LeftToes,
        HumanoidBone::RightUpperLeg,
        HumanoidBone::RightLowerLeg,
        HumanoidBone::RightFoot,
        HumanoidBone::RightToes,
        HumanoidBone::LeftShoulder,
        HumanoidBone::LeftUpperArm,
        HumanoidBone::LeftLowerArm,
        HumanoidBone::LeftHand,
        HumanoidBone::RightShoulder,
        HumanoidBone::RightUpperArm,
        HumanoidBone::RightLowerArm,
        HumanoidBone::RightHand,
        HumanoidBone::LeftThumbProximal,
        HumanoidBone::LeftThumbIntermediate,
        HumanoidBone::LeftThumbDistal,
        HumanoidBone::LeftIndexProximal,
        HumanoidBone::LeftIndexIntermediate,
        HumanoidBone::LeftIndexDistal,
        HumanoidBone::LeftMiddleProximal,
        HumanoidBone::LeftMiddleIntermediate,
        HumanoidBone::LeftMiddleDistal,
        HumanoidBone::LeftRingProximal,
        HumanoidBone::LeftRingIntermediate,
        HumanoidBone::LeftRingDistal,
        HumanoidBone::LeftLittleProximal,
        HumanoidBone::LeftLittleIntermediate,
        HumanoidBone::LeftLittleDistal,
        HumanoidBone::RightThumbProximal,
        HumanoidBone::RightThumbIntermediate,
        HumanoidBone::RightThumbDistal,
        HumanoidBone::RightIndexProximal,
        HumanoidBone::RightIndexIntermediate,
        HumanoidBone::RightIndexDistal,
        HumanoidBone::RightMiddleProximal,
        HumanoidBone::RightMiddleIntermediate,
        HumanoidBone::RightMiddleDistal,
        HumanoidBone::RightRingProximal,
        HumanoidBone::RightRingIntermediate,
        HumanoidBone::RightRingDistal,
        HumanoidBone::RightLittleProximal,
        HumanoidBone::RightLittleIntermediate,
        HumanoidBone::RightLittleDistal,
    ];

    /// Bones a skeleton must provide to be retargeted.
    pub const REQUIRED: [HumanoidBone; 15] = [
        HumanoidBone::Hips,
        HumanoidBone::Spine,
        HumanoidBone::Head,
        HumanoidBone::LeftUpperArm,
        HumanoidBone::LeftLowerArm,
        HumanoidBone::LeftHand,
        HumanoidBone::RightUpperArm,
        HumanoidBone::RightLowerArm,
        HumanoidBone::RightHand,
        HumanoidBone::LeftUpperLeg,
        HumanoidBone::LeftLowerLeg,
        HumanoidBone::LeftFoot,
        HumanoidBone::RightUpperLeg,
        HumanoidBone::RightLowerLeg,
        HumanoidBone::RightFoot,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<HumanoidBone> {
        Self::ALL.get(index).copied()
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    pub fn name(self) -> &'static str {
        match self {
            HumanoidBone::Hips => "Hips",
            HumanoidBone::Spine => "Spine",
            HumanoidBone::Chest => "Chest",
            HumanoidBone::UpperChest => "UpperChest",
            HumanoidBone::Neck => "Neck",
            HumanoidBone::Head => "Head",
            HumanoidBone::LeftUpperLeg => "LeftUpperLeg",
            HumanoidBone::LeftLowerLeg => "LeftLowerLeg",
            HumanoidBone::LeftFoot => "LeftFoot",
            HumanoidBone::LeftToes => "LeftToes",
            HumanoidBone::RightUpperLeg => "RightUpperLeg",
            HumanoidBone::RightLowerLeg => "RightLowerLeg",
            HumanoidBone::RightFoot => "RightFoot",
            HumanoidBone::RightToes => "RightToes",
            HumanoidBone::LeftShoulder => "LeftShoulder",
            HumanoidBone::LeftUpperArm => "LeftUpperArm",
            HumanoidBone::LeftLowerArm => "LeftLowerArm",
            HumanoidBone::LeftHand => "LeftHand",
            HumanoidBone::RightShoulder => "RightShoulder",
            HumanoidBone::RightUpperArm => "RightUpperArm",
            HumanoidBone::RightLowerArm => "RightLowerArm",
            HumanoidBone::RightHand => "RightHand",
            HumanoidBone::LeftThumbProximal => "LeftThumbProximal",
            HumanoidBone::LeftThumbIntermediate => "LeftThumbIntermediate",
            HumanoidBone::LeftThumbDistal => "LeftThumbDistal",
            HumanoidBone::LeftIndexProximal => "LeftIndexProximal",
            HumanoidBone::LeftIndexIntermediate => "LeftIndexIntermediate",
            HumanoidBone::LeftIndexDistal => "LeftIndexDistal",
            HumanoidBone::LeftMiddleProximal => "LeftMiddleProximal",
            HumanoidBone::LeftMiddleIntermediate => "LeftMiddleIntermediate",
            HumanoidBone::LeftMiddleDistal => "LeftMiddleDistal",
            HumanoidBone::LeftRingProximal => "LeftRingProximal",
            HumanoidBone::LeftRingIntermediate => "LeftRingIntermediate",
            HumanoidBone::LeftRingDistal => "LeftRingDistal",
            HumanoidBone::LeftLittleProximal => "LeftLittleProximal",
            HumanoidBone::LeftLittleIntermediate => "LeftLittleIntermediate",
            HumanoidBone::LeftLittleDistal => "LeftLittleDistal",
            HumanoidBone::RightThumbProximal => "RightThumbProximal",
            HumanoidBone::RightThumbIntermediate => "RightThumbIntermediate",
            HumanoidBone::RightThumbDistal => "RightThumbDistal",
            HumanoidBone::RightIndexProximal => "RightIndexProximal",
            HumanoidBone::RightIndexIntermediate => "RightIndexIntermediate",
            HumanoidBone::RightIndexDistal => "RightIndexDistal",
            HumanoidBone::RightMiddleProximal => "RightMiddleProximal",
            HumanoidBone::RightMiddleIntermediate => "RightMiddleIntermediate",
            HumanoidBone::RightMiddleDistal => "RightMiddleDistal",
            HumanoidBone::RightRingProximal => "RightRingProximal",
            HumanoidBone::RightRingIntermediate => "RightRingIntermediate",
            HumanoidBone::RightRingDistal => "RightRingDistal",
            HumanoidBone::RightLittleProximal => "RightLittleProximal",
            HumanoidBone::RightLittleIntermediate => "RightLittleIntermediate",
            HumanoidBone::RightLittleDistal => "RightLittleDistal",
        }
    }

    /// Candidate joint names in lookup order. Clavicle-style names come before
    /// shoulder-style ones, and a shoulder-style name left unclaimed falls
    /// through to the upper arm.
    pub fn candidates(self) -> &'static [&'static str] {
        match self {
            HumanoidBone::Hips => &["Hips", "pelvis", "Bip01 Pelvis"],
            HumanoidBone::Spine => &["Spine", "spine_01", "Bip01 Spine"],
            HumanoidBone::Chest => &["Chest", "Spine1", "spine_02", "Bip01 Spine1"],
            HumanoidBone::UpperChest => &[
                "UpperChest",
                "Spine2",
                "spine_03",
                "upper_chest",
                "Bip01 Spine2",
            ],
            HumanoidBone::Neck => &["Neck", "neck_01", "Bip01 Neck"],
            HumanoidBone::Head => &["Head", "Bip01 Head"],
            HumanoidBone::LeftUpperLeg => &[
                "LeftUpperLeg",
                "LeftUpLeg",
                "thigh_l",
                "thigh.L",
                "Bip01 L Thigh",
                "LeftThigh",
                "LeftHip",
            ],
            HumanoidBone::LeftLowerLeg => &[
                "LeftLowerLeg",
                "LeftLeg",
                "calf_l",
                "shin.L",
                "Bip01 L Calf",
                "LeftShin",
                "LeftKnee",
            ],
            HumanoidBone::LeftFoot => &[
                "LeftFoot",
                "foot_l",
                "foot.L",
                "Bip01 L Foot",
                "LeftAnkle",
            ],
            HumanoidBone::LeftToes => &[
                "LeftToes",
                "LeftToeBase",
                "ball_l",
                "toe.L",
                "Bip01 L Toe0",
            ],
            HumanoidBone::RightUpperLeg => &[
                "RightUpperLeg",
                "RightUpLeg",
                "thigh_r",
                "thigh.R",
                "Bip01 R Thigh",
                "RightThigh",
                "RightHip",
            ],
            HumanoidBone::RightLowerLeg => &[
                "RightLowerLeg",
                "RightLeg",
                "calf_r",
                "shin.R",
                "Bip01 R Calf",
                "RightShin",
                "RightKnee",
            ],
            HumanoidBone::RightFoot => &[
                "RightFoot",
                "foot_r",
                "foot.R",
                "Bip01 R Foot",
                "RightAnkle",
            ],
            HumanoidBone::RightToes => &[
                "RightToes",
                "RightToeBase",
                "ball_r",
                "toe.R",
                "Bip01 R Toe0",
            ],
            HumanoidBone::LeftShoulder => &[
                "LeftClavicle",
                "clavicle_l",
                "Bip01 L Clavicle",
                "LeftShoulder",
                "shoulder.L",
            ],
            HumanoidBone::LeftUpperArm => &[
                "LeftUpperArm",
                "LeftArm",
                "upperarm_l",
                "upper_arm.L",
                "Bip01 L UpperArm",
                "LeftShoulder",
            ],
            HumanoidBone::LeftLowerArm => &[
                "LeftLowerArm",
                "LeftForeArm",
                "lowerarm_l",
                "forearm.L",
                "Bip01 L Forearm",
                "LeftElbow",
            ],
            HumanoidBone::LeftHand => &[
                "LeftHand",
                "hand_l",
                "hand.L",
                "Bip01 L Hand",
                "LeftWrist",
            ],
            HumanoidBone::RightShoulder => &[
                "RightClavicle",
                "clavicle_r",
                "Bip01 R Clavicle",
                "RightShoulder",
                "shoulder.R",
            ],
            HumanoidBone::RightUpperArm => &[
                "RightUpperArm",
                "RightArm",
                "upperarm_r",
                "upper_arm.R",
                "Bip01 R UpperArm",
                "RightShoulder",
            ],
            HumanoidBone::RightLowerArm => &[
                "RightLowerArm",
                "RightForeArm",
                "lowerarm_r",
                "forearm.R",
                "Bip01 R Forearm",
                "RightElbow",
            ],
            HumanoidBone::RightHand => &[
                "RightHand",
                "hand_r",
                "hand.R",
                "Bip01 R Hand",
                "RightWrist",
            ],
            HumanoidBone::LeftThumbProximal => &[
                "LeftThumbProximal",
                "LeftHandThumb1",
                "thumb_01_l",
                "thumb.01.L",
                "Bip01 L Finger0",
            ],
            HumanoidBone::LeftThumbIntermediate => &[
                "LeftThumbIntermediate",
                "LeftHandThumb2",
                "thumb_02_l",
                "thumb.02.L",
                "Bip01 L Finger01",
            ],
            HumanoidBone::LeftThumbDistal => &[
                "LeftThumbDistal",
                "LeftHandThumb3",
                "thumb_03_l",
                "thumb.03.L",
                "Bip01 L Finger02",
            ],
            HumanoidBone::LeftIndexProximal => &[
                "LeftIndexProximal",
                "LeftHandIndex1",
                "index_01_l",
                "f_index.01.L",
                "Bip01 L Finger1",
            ],
            HumanoidBone::LeftIndexIntermediate => &[
                "LeftIndexIntermediate",
                "LeftHandIndex2",
                "index_02_l",
                "f_index.02.L",
                "Bip01 L Finger11",
            ],
            HumanoidBone::LeftIndexDistal => &[
                "LeftIndexDistal",
                "LeftHandIndex3",
                "index_03_l",
                "f_index.03.L",
                "Bip01 L Finger12",
            ],
            HumanoidBone::LeftMiddleProximal => &[
                "LeftMiddleProximal",
                "LeftHandMiddle1",
                "middle_01_l",
                "f_middle.01.L",
                "Bip01 L Finger2",
            ],
            HumanoidBone::LeftMiddleIntermediate => &[
                "LeftMiddleIntermediate",
                "LeftHandMiddle2",
                "middle_02_l",
                "f_middle.02.L",
                "Bip01 L Finger21",
            ],
            HumanoidBone::LeftMiddleDistal => &[
                "LeftMiddleDistal",
                "LeftHandMiddle3",
                "middle_03_l",
                "f_middle.03.L",
                "Bip01 L Finger22",
            ],
            HumanoidBone::LeftRingProximal => &[
                "LeftRingProximal",
                "LeftHandRing1",
                "ring_01_l",
                "f_ring.01.L",
                "Bip01 L Finger3",
            ],
            HumanoidBone::LeftRingIntermediate => &[
                "LeftRingIntermediate",
                "LeftHandRing2",
                "ring_02_l",
                "f_ring.02.L",
                "Bip01 L Finger31",
            ],
            HumanoidBone::LeftRingDistal => &[
                "LeftRingDistal",
                "LeftHandRing3",
                "ring_03_l",
                "f_ring.03.L",
                "Bip01 L Finger32",
            ],
            HumanoidBone::LeftLittleProximal => &[
                "LeftLittleProximal",
                "LeftHandPinky1",
                "pinky_01_l",
                "f_pinky.01.L",
                "Bip01 L Finger4",
            ],
            HumanoidBone::LeftLittleIntermediate => &[
                "LeftLittleIntermediate",
                "LeftHandPinky2",
                "pinky_02_l",
                "f_pinky.02.L",
                "Bip01 L Finger41",
            ],
            HumanoidBone::LeftLittleDistal => &[
                "LeftLittleDistal",
                "LeftHandPinky3",
                "pinky_03_l",
                "f_pinky.03.L",
                "Bip01 L Finger42",
            ],
            HumanoidBone::RightThumbProximal => &[
                "RightThumbProximal",
                "RightHandThumb1",
                "thumb_01_r",
                "thumb.01.R",
                "Bip01 R Finger0",
            ],
            HumanoidBone::RightThumbIntermediate => &[
                "RightThumbIntermediate",
                "RightHandThumb2",
                "thumb_02_r",
                "thumb.02.R",
                "Bip01 R Finger01",
            ],
            HumanoidBone::RightThumbDistal => &[
                "RightThumbDistal",
                "RightHandThumb3",
                "thumb_03_r",
                "thumb.03.R",
                "Bip01 R Finger02",
            ],
            HumanoidBone::RightIndexProximal => &[
                "RightIndexProximal",
                "RightHandIndex1",
                "index_01_r",
                "f_index.01.R",
                "Bip01 R Finger1",
            ],
            HumanoidBone::RightIndexIntermediate => &[
                "RightIndexIntermediate",
                "RightHandIndex2",
                "index_02_r",
                "f_index.02.R",
                "Bip01 R Finger11",
            ],
            HumanoidBone::RightIndexDistal => &[
                "RightIndexDistal",
                "RightHandIndex3",
                "index_03_r",
                "f_index.03.R",
                "Bip01 R Finger12",
            ],
            HumanoidBone::RightMiddleProximal => &[
                "RightMiddleProximal",
                "RightHandMiddle1",
                "middle_01_r",
                "f_middle.01.R",
                "Bip01 R Finger2",
            ],
            HumanoidBone::RightMiddleIntermediate => &[
                "RightMiddleIntermediate",
                "RightHandMiddle2",
                "middle_02_r",
                "f_middle.02.R",
                "Bip01 R Finger21",
            ],
            HumanoidBone::RightMiddleDistal => &[
                "RightMiddleDistal",
                "RightHandMiddle3",
                "middle_03_r",
                "f_middle.03.R",
                "Bip01 R Finger22",
            ],
            HumanoidBone::RightRingProximal => &[
                "RightRingProximal",
                "RightHandRing1",
                "ring_01_r",
                "f_ring.01.R",
                "Bip01 R Finger3",
            ],
            HumanoidBone::RightRingIntermediate => &[
                "RightRingIntermediate",
                "RightHandRing2",
                "ring_02_r",
                "f_ring.02.R",
                "Bip01 R Finger31",
            ],
            HumanoidBone::RightRingDistal => &[
                "RightRingDistal",
                "RightHandRing3",
                "ring_03_r",
                "f_ring.03.R",
                "Bip01 R Finger32",
            ],
            HumanoidBone::RightLittleProximal => &[
                "RightLittleProximal",
                "RightHandPinky1",
                "pinky_01_r",
                "f_pinky.01.R",
                "Bip01 R Finger4",
            ],
            HumanoidBone::RightLittleIntermediate => &[
                "RightLittleIntermediate",
                "RightHandPinky2",
                "pinky_02_r",
                "f_pinky.02.R",
                "Bip01 R Finger41",
            ],
            HumanoidBone::RightLittleDistal => &[
                "RightLittleDistal",
                "RightHandPinky3",
                "pinky_03_r",
                "f_pinky.03.R",
                "Bip01 R Finger42",
            ],
        }
    }
}

impl fmt::Display for HumanoidBone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Joint index per canonical bone, `None` where the skeleton has no match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HumanoidMapping {
    joints: [Option<usize>; HUMANOID_BONE_COUNT],
}

impl Default for HumanoidMapping {
    fn default() -> Self {
        Self {
            joints: [None; HUMANOID_BONE_COUNT],
        }
    }
}

impl HumanoidMapping {
    #[inline]
    pub fn get(&self, bone: HumanoidBone) -> Option<usize> {
        self.joints[bone.index()]
    }

    /// Mapped bones in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (HumanoidBone, usize)> + '_ {
        HumanoidBone::ALL
            .iter()
            .filter_map(|&bone| self.get(bone).map(|joint| (bone, joint)))
    }

    pub fn mapped_count(&self) -> usize {
        self.joints.iter().filter(|j| j.is_some()).count()
    }

    /// Canonical bone claimed by `joint`, if any.
    pub fn bone_for_joint(&self, joint: usize) -> Option<HumanoidBone> {
        self.iter().find(|&(_, j)| j == joint).map(|(bone, _)| bone)
    }

    pub fn is_valid_humanoid(&self) -> bool {
        HumanoidBone::REQUIRED
            .iter()
            .all(|&bone| self.get(bone).is_some())
    }

    pub fn missing_required(&self) -> Vec<HumanoidBone> {
        HumanoidBone::REQUIRED
            .iter()
            .copied()
            .filter(|&bone| self.get(bone).is_none())
            .collect()
    }
}

/// Drop any namespace prefix: everything up to the last `:` or `|`.
fn strip_prefix(name: &str) -> &str {
    match name.rfind(|c| c == ':' || c == '|') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Map `skeleton`'s joints onto canonical humanoid bones by name.
pub fn map_humanoid(skeleton: &Skeleton) -> HumanoidMapping {
    // Lowercased full and stripped names -> joints carrying them, ascending.
    let mut lookup: HashMap<String, Vec<usize>> =
        HashMap::with_capacity(skeleton.joint_count() * 2);
    for (idx, joint) in skeleton.joints.iter().enumerate() {
        lookup.entry(joint.name.to_lowercase()).or_default().push(idx);
        let stripped = strip_prefix(&joint.name);
        if stripped.len() != joint.name.len() {
            let joints = lookup.entry(stripped.to_lowercase()).or_default();
            if !joints.contains(&idx) {
                joints.push(idx);
            }
        }
    }

    let mut mapping = HumanoidMapping::default();
    let mut claimed = vec![false; skeleton.joint_count()];
    for bone in HumanoidBone::ALL {
        let found = bone.candidates().iter().find_map(|candidate| {
            lookup
                .get(&candidate.to_lowercase())?
                .iter()
                .copied()
                .find(|&idx| !claimed[idx])
        });
        if let Some(idx) = found {
            claimed[idx] = true;
            mapping.joints[bone.index()] = Some(idx);
        }
    }
    mapping
}
