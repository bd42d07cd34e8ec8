//! Axis Neuron BVH data stream frames.
//!
//! A frame is `<avatar index> [<avatar name>] <values...> ||`. With
//! displacement enabled every bone carries six values: local translation
//! x, y, z followed by rotation y, x, z in degrees.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

use crate::neuron::bones::{BONES, BONE_COUNT};
use crate::skeleton::{Joint, Skeleton};

const FRAME_TERMINATOR: &[u8] = b"||";
/// 終端が来ないまま溜まった場合に破棄するサイズ
const MAX_PENDING_BYTES: usize = 64 * 1024;

const VALUES_PER_BONE: usize = 6;
/// 変位あり: 59ボーン × 6
pub const DISPLACEMENT_VALUES: usize = BONE_COUNT * VALUES_PER_BONE;
/// 先頭にReferenceボーン(6値)が付く形式
pub const REFERENCE_DISPLACEMENT_VALUES: usize = DISPLACEMENT_VALUES + VALUES_PER_BONE;
/// 変位なし: ルート位置3 + 59ボーン × 回転3
const ROTATION_ONLY_VALUES: usize = 3 + BONE_COUNT * 3;

#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("invalid avatar index {0:?}")]
    AvatarIndex(String),
    #[error("invalid value {token:?} at position {position}")]
    Value { position: usize, token: String },
    #[error("frame has no displacement data ({0} values), enable displacement in Axis Neuron")]
    NoDisplacement(usize),
    #[error("unexpected value count {0}, expected {} or {}", DISPLACEMENT_VALUES, REFERENCE_DISPLACEMENT_VALUES)]
    ValueCount(usize),
}

/// TCPで受けたバイト列を `||` 区切りのフレームに分ける
///
/// 文字列化は完成したフレーム単位で行う
#[derive(Debug, Default)]
pub struct FrameSplitter {
    pending: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 受信データを追加し、完成したフレームを返す
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(end) = self
            .pending
            .windows(FRAME_TERMINATOR.len())
            .position(|w| w == FRAME_TERMINATOR)
        {
            let frame = String::from_utf8_lossy(&self.pending[..end]).trim().to_string();
            self.pending.drain(..end + FRAME_TERMINATOR.len());
            if !frame.is_empty() {
                frames.push(frame);
            }
        }

        if self.pending.len() > MAX_PENDING_BYTES {
            tracing::warn!("dropping {} bytes without frame terminator", self.pending.len());
            self.pending.clear();
        }
        frames
    }
}

/// 1アバター分のフレーム
#[derive(Debug, Clone, PartialEq)]
pub struct AvatarFrame {
    pub index: u32,
    pub name: String,
    /// ボーンごとの6値 (Reference分は除去済み)
    pub values: Vec<f32>,
}

impl AvatarFrame {
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let mut tokens = text.split_whitespace();

        let index_token = tokens.next().ok_or(FrameError::Empty)?;
        let index: u32 = index_token
            .parse()
            .map_err(|_| FrameError::AvatarIndex(index_token.to_string()))?;

        // 名前は省略されることがある。数字だけの名前もあるので個数で判定する
        let rest: Vec<&str> = tokens.collect();
        let (name, value_tokens) = match rest.split_first() {
            Some((name, values)) if Self::is_known_count(values.len()) => (name.to_string(), values),
            _ => (format!("Avatar{:02}", index), rest.as_slice()),
        };

        let mut values = Vec::with_capacity(REFERENCE_DISPLACEMENT_VALUES);
        for (position, token) in value_tokens.iter().enumerate() {
            let v: f32 = token.parse().map_err(|_| FrameError::Value {
                position,
                token: token.to_string(),
            })?;
            values.push(v);
        }

        match values.len() {
            DISPLACEMENT_VALUES => {}
            REFERENCE_DISPLACEMENT_VALUES => {
                values.drain(..VALUES_PER_BONE);
            }
            n if n == ROTATION_ONLY_VALUES || n == ROTATION_ONLY_VALUES + VALUES_PER_BONE => {
                return Err(FrameError::NoDisplacement(n));
            }
            n => return Err(FrameError::ValueCount(n)),
        }

        Ok(Self { index, name, values })
    }

    fn is_known_count(n: usize) -> bool {
        n == DISPLACEMENT_VALUES
            || n == REFERENCE_DISPLACEMENT_VALUES
            || n == ROTATION_ONLY_VALUES
            || n == ROTATION_ONLY_VALUES + VALUES_PER_BONE
    }

    /// BVHの回転チャンネル (Y, X, Z 度) からローカル回転
    fn local_rotation(y: f32, x: f32, z: f32) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y.to_radians())
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x.to_radians())
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z.to_radians())
    }

    /// 親から順にローカル変換を掛けてグローバル変換を求める
    pub fn to_skeleton(&self) -> Skeleton {
        let mut joints: Vec<Joint> = Vec::with_capacity(BONE_COUNT);

        for (i, (name, parent)) in BONES.iter().enumerate() {
            let v = &self.values[i * VALUES_PER_BONE..(i + 1) * VALUES_PER_BONE];
            let local = Isometry3::from_parts(
                Translation3::new(v[0], v[1], v[2]),
                Self::local_rotation(v[3], v[4], v[5]),
            );
            let global = match parent {
                Some(p) => joints[*p].global * local,
                None => local,
            };
            joints.push(Joint::new(*name, *parent, global));
        }

        Skeleton::new(self.name.clone(), joints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::bones::bone_index;
    use nalgebra::Point3;

    fn approx_eq_point(a: Point3<f32>, b: Point3<f32>, eps: f32) -> bool {
        (a - b).norm() < eps
    }

    /// 全ボーンの値を指定したフレーム文字列
    fn frame_text(prefix: &str, values: &[f32]) -> String {
        let body: Vec<String> = values.iter().map(|v| format!("{:.3}", v)).collect();
        format!("{} {}", prefix, body.join(" "))
    }

    fn rest_values() -> Vec<f32> {
        let mut values = vec![0.0; DISPLACEMENT_VALUES];
        values[1] = 100.0; // Hips y
        values
    }

    fn set_bone(values: &mut [f32], bone: &str, v: [f32; 6]) {
        let i = bone_index(bone).unwrap() * VALUES_PER_BONE;
        values[i..i + VALUES_PER_BONE].copy_from_slice(&v);
    }

    #[test]
    fn test_splitter_across_chunks() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"0 Avatar00 1.0 2.").is_empty());
        let frames = splitter.push(b"0 ||\n0 Avatar00 3.0 |");
        assert_eq!(frames, vec!["0 Avatar00 1.0 2.0".to_string()]);
        let frames = splitter.push(b"|1 Avatar01 4.0||");
        assert_eq!(frames, vec!["0 Avatar00 3.0".to_string(), "1 Avatar01 4.0".to_string()]);
    }

    #[test]
    fn test_splitter_keeps_multibyte_name_split_across_reads() {
        let mut splitter = FrameSplitter::new();
        let data = "0 ダンサー 1.0||".as_bytes();
        // "ダ" の途中で切る
        assert!(splitter.push(&data[..4]).is_empty());
        let frames = splitter.push(&data[4..]);
        assert_eq!(frames, vec!["0 ダンサー 1.0".to_string()]);
    }

    #[test]
    fn test_splitter_skips_empty_frames() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push(b"|| \r\n ||").is_empty());
    }

    #[test]
    fn test_splitter_drops_runaway_data() {
        let mut splitter = FrameSplitter::new();
        splitter.push(&vec![b'1'; MAX_PENDING_BYTES + 1]);
        assert_eq!(splitter.push(b"0 a||"), vec!["0 a".to_string()]);
    }

    #[test]
    fn test_parse_with_name() {
        let frame = AvatarFrame::parse(&frame_text("0 Avatar00", &rest_values())).unwrap();
        assert_eq!(frame.index, 0);
        assert_eq!(frame.name, "Avatar00");
        assert_eq!(frame.values.len(), DISPLACEMENT_VALUES);
        assert_eq!(frame.values[1], 100.0);
    }

    #[test]
    fn test_parse_without_name() {
        let frame = AvatarFrame::parse(&frame_text("3", &rest_values())).unwrap();
        assert_eq!(frame.index, 3);
        assert_eq!(frame.name, "Avatar03");
    }

    #[test]
    fn test_parse_numeric_name() {
        for name in ["2024", "inf", "nan", "-1"] {
            let frame = AvatarFrame::parse(&frame_text(&format!("0 {}", name), &rest_values())).unwrap();
            assert_eq!(frame.name, name);
            assert_eq!(frame.values, rest_values());
        }

        let mut values = vec![9.0; VALUES_PER_BONE];
        values.extend(rest_values());
        let frame = AvatarFrame::parse(&frame_text("1 7", &values)).unwrap();
        assert_eq!(frame.name, "7");
        assert_eq!(frame.values, rest_values());
    }

    #[test]
    fn test_parse_skips_reference_block() {
        let mut values = vec![9.0; VALUES_PER_BONE];
        values.extend(rest_values());
        let frame = AvatarFrame::parse(&frame_text("0 Dancer", &values)).unwrap();
        assert_eq!(frame.values, rest_values());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(AvatarFrame::parse("   "), Err(FrameError::Empty));
        assert_eq!(
            AvatarFrame::parse("x Avatar00 1.0"),
            Err(FrameError::AvatarIndex("x".to_string()))
        );
        let bad = frame_text("0 Avatar00", &rest_values()).replacen(" 100.000 ", " nan? ", 1);
        assert_eq!(
            AvatarFrame::parse(&bad),
            Err(FrameError::Value { position: 1, token: "nan?".to_string() })
        );
        assert_eq!(AvatarFrame::parse("0 1.0 2.0"), Err(FrameError::ValueCount(2)));
        // 個数が合わなければ名前とはみなさない
        assert_eq!(
            AvatarFrame::parse("0 Avatar00 1.0 2.0"),
            Err(FrameError::Value { position: 0, token: "Avatar00".to_string() })
        );

        let rotation_only = vec![0.0; ROTATION_ONLY_VALUES];
        assert_eq!(
            AvatarFrame::parse(&frame_text("0 Avatar00", &rotation_only)),
            Err(FrameError::NoDisplacement(ROTATION_ONLY_VALUES))
        );
    }

    #[test]
    fn test_rest_pose_chain() {
        let mut values = rest_values();
        set_bone(&mut values, "Spine", [0.0, 10.0, 0.0, 0.0, 0.0, 0.0]);
        set_bone(&mut values, "Spine1", [0.0, 10.0, 0.0, 0.0, 0.0, 0.0]);
        let skeleton = AvatarFrame { index: 0, name: "a".to_string(), values }.to_skeleton();

        assert_eq!(skeleton.joints.len(), BONE_COUNT);
        let spine1 = skeleton.joint_by_name("Spine1").unwrap();
        assert!(approx_eq_point(spine1.position(), Point3::new(0.0, 120.0, 0.0), 1e-4));
        assert_eq!(spine1.parent, bone_index("Spine"));
    }

    #[test]
    fn test_parent_rotation_carries_children() {
        let mut values = rest_values();
        // Hipsを+Y軸まわりに90度
        set_bone(&mut values, "Hips", [0.0, 100.0, 0.0, 90.0, 0.0, 0.0]);
        set_bone(&mut values, "RightUpLeg", [-10.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        let skeleton = AvatarFrame { index: 0, name: "a".to_string(), values }.to_skeleton();

        let leg = skeleton.joint_by_name("RightUpLeg").unwrap();
        assert!(approx_eq_point(leg.position(), Point3::new(0.0, 100.0, 10.0), 1e-3));
        // 子は親の回転を引き継ぐ
        let angle = leg.global.rotation.angle().to_degrees();
        assert!((angle - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_rotation_order_yxz() {
        let q = AvatarFrame::local_rotation(30.0, 20.0, 10.0);
        let expected = UnitQuaternion::from_axis_angle(&Vector3::y_axis(), 30f32.to_radians())
            * UnitQuaternion::from_axis_angle(&Vector3::x_axis(), 20f32.to_radians())
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 10f32.to_radians());
        assert!(q.angle_to(&expected) < 1e-5);
        let wrong = UnitQuaternion::from_euler_angles(20f32.to_radians(), 30f32.to_radians(), 10f32.to_radians());
        assert!(q.angle_to(&wrong) > 1e-3);
    }
}
