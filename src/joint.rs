//! RAM Dance Toolkit joint set and its mapping onto Perception Neuron bones.

/// RAM Dance Toolkitの関節 (送信側の骨格定義)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(usize)]
pub enum RamJoint {
    Hips = 0,
    Abdomen = 1,
    Chest = 2,
    Neck = 3,
    Head = 4,

    LeftHip = 5,
    LeftKnee = 6,
    LeftAnkle = 7,
    LeftToe = 8,

    RightHip = 9,
    RightKnee = 10,
    RightAnkle = 11,
    RightToe = 12,

    LeftCollar = 13,
    LeftShoulder = 14,
    LeftElbow = 15,
    LeftWrist = 16,
    LeftHand = 17,

    RightCollar = 18,
    RightShoulder = 19,
    RightElbow = 20,
    RightWrist = 21,
    RightHand = 22,
}

/// 送信用の関節名 (インデックス順)
const DISPLAY_NAMES: [&str; RamJoint::COUNT] = [
    "HIPS",
    "ABDOMEN",
    "CHEST",
    "NECK",
    "HEAD",
    "LEFT_HIP",
    "LEFT_KNEE",
    "LEFT_ANKLE",
    "LEFT_TOE",
    "RIGHT_HIP",
    "RIGHT_KNEE",
    "RIGHT_ANKLE",
    "RIGHT_TOE",
    "LEFT_COLLAR",
    "LEFT_SHOULDER",
    "LEFT_ELBOW",
    "LEFT_WRIST",
    "LEFT_HAND",
    "RIGHT_COLLAR",
    "RIGHT_SHOULDER",
    "RIGHT_ELBOW",
    "RIGHT_WRIST",
    "RIGHT_HAND",
];

/// RAM関節 → Perception Neuronボーン名
///
/// Perception Neuronにはつま先と鎖骨が無いので、足首/つま先と
/// 鎖骨/肩はそれぞれ同じボーンを参照する。
const NEURON_BONE_NAMES: [&str; RamJoint::COUNT] = [
    "Hips",
    "Spine1",
    "Spine3",
    "Neck",
    "Head",
    "LeftUpLeg",
    "LeftLeg",
    "LeftFoot",
    "LeftFoot", // no toe
    "RightUpLeg",
    "RightLeg",
    "RightFoot",
    "RightFoot", // no toe
    "LeftShoulder", // no collar
    "LeftShoulder",
    "LeftArm",
    "LeftForeArm",
    "LeftHand",
    "RightShoulder", // no collar
    "RightShoulder",
    "RightArm",
    "RightForeArm",
    "RightHand",
];

impl RamJoint {
    pub const COUNT: usize = 23;

    /// 送信順に並んだ全関節
    pub const ALL: [RamJoint; RamJoint::COUNT] = [
        RamJoint::Hips,
        RamJoint::Abdomen,
        RamJoint::Chest,
        RamJoint::Neck,
        RamJoint::Head,
        RamJoint::LeftHip,
        RamJoint::LeftKnee,
        RamJoint::LeftAnkle,
        RamJoint::LeftToe,
        RamJoint::RightHip,
        RamJoint::RightKnee,
        RamJoint::RightAnkle,
        RamJoint::RightToe,
        RamJoint::LeftCollar,
        RamJoint::LeftShoulder,
        RamJoint::LeftElbow,
        RamJoint::LeftWrist,
        RamJoint::LeftHand,
        RamJoint::RightCollar,
        RamJoint::RightShoulder,
        RamJoint::RightElbow,
        RamJoint::RightWrist,
        RamJoint::RightHand,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// OSCで送る関節名 (e.g. "LEFT_ANKLE")
    pub fn display_name(self) -> &'static str {
        DISPLAY_NAMES[self.index()]
    }

    /// キャプチャ側で問い合わせるボーン名
    pub fn neuron_bone_name(self) -> &'static str {
        NEURON_BONE_NAMES[self.index()]
    }
}
