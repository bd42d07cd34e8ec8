/// Axis Neuron BVHのボーン数
pub const BONE_COUNT: usize = 59;

/// ボーン名と親インデックス (BVHの出力順)
pub const BONES: [(&str, Option<usize>); BONE_COUNT] = [
    ("Hips", None),
    ("RightUpLeg", Some(0)),
    ("RightLeg", Some(1)),
    ("RightFoot", Some(2)),
    ("LeftUpLeg", Some(0)),
    ("LeftLeg", Some(4)),
    ("LeftFoot", Some(5)),
    ("Spine", Some(0)),
    ("Spine1", Some(7)),
    ("Spine2", Some(8)),
    ("Spine3", Some(9)),
    ("Neck", Some(10)),
    ("Head", Some(11)),
    // 右腕
    ("RightShoulder", Some(10)),
    ("RightArm", Some(13)),
    ("RightForeArm", Some(14)),
    ("RightHand", Some(15)),
    ("RightHandThumb1", Some(16)),
    ("RightHandThumb2", Some(17)),
    ("RightHandThumb3", Some(18)),
    ("RightInHandIndex", Some(16)),
    ("RightHandIndex1", Some(20)),
    ("RightHandIndex2", Some(21)),
    ("RightHandIndex3", Some(22)),
    ("RightInHandMiddle", Some(16)),
    ("RightHandMiddle1", Some(24)),
    ("RightHandMiddle2", Some(25)),
    ("RightHandMiddle3", Some(26)),
    ("RightInHandRing", Some(16)),
    ("RightHandRing1", Some(28)),
    ("RightHandRing2", Some(29)),
    ("RightHandRing3", Some(30)),
    ("RightInHandPinky", Some(16)),
    ("RightHandPinky1", Some(32)),
    ("RightHandPinky2", Some(33)),
    ("RightHandPinky3", Some(34)),
    // 左腕
    ("LeftShoulder", Some(10)),
    ("LeftArm", Some(36)),
    ("LeftForeArm", Some(37)),
    ("LeftHand", Some(38)),
    ("LeftHandThumb1", Some(39)),
    ("LeftHandThumb2", Some(40)),
    ("LeftHandThumb3", Some(41)),
    ("LeftInHandIndex", Some(39)),
    ("LeftHandIndex1", Some(43)),
    ("LeftHandIndex2", Some(44)),
    ("LeftHandIndex3", Some(45)),
    ("LeftInHandMiddle", Some(39)),
    ("LeftHandMiddle1", Some(47)),
    ("LeftHandMiddle2", Some(48)),
    ("LeftHandMiddle3", Some(49)),
    ("LeftInHandRing", Some(39)),
    ("LeftHandRing1", Some(51)),
    ("LeftHandRing2", Some(52)),
    ("LeftHandRing3", Some(53)),
    ("LeftInHandPinky", Some(39)),
    ("LeftHandPinky1", Some(55)),
    ("LeftHandPinky2", Some(56)),
    ("LeftHandPinky3", Some(57)),
];

pub fn bone_index(name: &str) -> Option<usize> {
    BONES.iter().position(|(n, _)| *n == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::RamJoint;

    #[test]
    fn test_parents_precede_children() {
        for (i, (_, parent)) in BONES.iter().enumerate() {
            if let Some(p) = parent {
                assert!(*p < i, "bone {} has parent {}", i, p);
            }
        }
    }

    #[test]
    fn test_single_root() {
        let roots = BONES.iter().filter(|(_, p)| p.is_none()).count();
        assert_eq!(roots, 1);
        assert_eq!(bone_index("Hips"), Some(0));
    }

    #[test]
    fn test_every_ram_joint_has_a_bone() {
        for joint in RamJoint::ALL {
            assert!(
                bone_index(joint.neuron_bone_name()).is_some(),
                "{} -> {}",
                joint.display_name(),
                joint.neuron_bone_name()
            );
        }
    }

    #[test]
    fn test_arm_chain() {
        let hand = bone_index("LeftHand").unwrap();
        let fore = bone_index("LeftForeArm").unwrap();
        let arm = bone_index("LeftArm").unwrap();
        let shoulder = bone_index("LeftShoulder").unwrap();
        assert_eq!(BONES[hand].1, Some(fore));
        assert_eq!(BONES[fore].1, Some(arm));
        assert_eq!(BONES[arm].1, Some(shoulder));
        assert_eq!(BONES[shoulder].1, bone_index("Spine3"));
    }
}
