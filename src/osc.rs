//! `/ram/skeleton` message construction for RAM Dance Toolkit.
//!
//! Message arguments:
//! name, joint count, then per joint: display name, x, y, z, angle, ax, ay, az,
//! and finally the elapsed seconds since the bridge started.

use anyhow::Result;
use nalgebra::{Isometry3, UnitQuaternion};
use rosc::{encoder, OscMessage, OscPacket, OscType};
use thiserror::Error;

use crate::joint::RamJoint;
use crate::skeleton::Skeleton;

/// RAM Dance Toolkitの骨格アドレス
pub const RAM_SKELETON_ADDR: &str = "/ram/skeleton";

/// 1関節あたりの引数数 (名前 + 位置3 + 回転4)
pub const ARGS_PER_JOINT: usize = 8;

/// メッセージ全体の引数数
pub const SKELETON_MESSAGE_ARGS: usize = 2 + RamJoint::COUNT * ARGS_PER_JOINT + 1;

/// 軸角度表現の回転 (角度は度)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisAngle {
    pub angle: f32,
    pub axis: [f32; 3],
}

impl AxisAngle {
    /// 回転なし: 角度0、軸は+Z
    pub fn identity() -> Self {
        Self {
            angle: 0.0,
            axis: [0.0, 0.0, 1.0],
        }
    }

    /// クォータニオンを分解する。角度は 2·atan2(|v|, w) で [0, 360] の範囲
    pub fn from_quaternion(q: &UnitQuaternion<f32>) -> Self {
        let v = q.imag();
        let w = q.scalar();
        let sin_half = v.norm();
        if sin_half <= f32::EPSILON {
            return Self::identity();
        }
        let angle = (2.0 * sin_half.atan2(w)).to_degrees();
        Self {
            angle,
            axis: [v.x / sin_half, v.y / sin_half, v.z / sin_half],
        }
    }
}

/// 送信する関節の位置と回転
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub position: [f32; 3],
    pub rotation: AxisAngle,
}

impl JointPose {
    pub fn new(position: [f32; 3], rotation: AxisAngle) -> Self {
        Self { position, rotation }
    }

    /// 原点、回転なし
    pub fn identity() -> Self {
        Self::new([0.0, 0.0, 0.0], AxisAngle::identity())
    }

    pub fn from_isometry(transform: &Isometry3<f32>) -> Self {
        let t = transform.translation.vector;
        Self::new([t.x, t.y, t.z], AxisAngle::from_quaternion(&transform.rotation))
    }

    /// 骨格からRAM関節の姿勢を取り出す。該当ボーンが無ければ単位姿勢
    pub fn lookup(skeleton: &Skeleton, joint: RamJoint) -> Self {
        skeleton
            .joint_by_name(joint.neuron_bone_name())
            .map(|j| Self::from_isometry(&j.global))
            .unwrap_or_else(Self::identity)
    }
}

/// 骨格1体分の `/ram/skeleton` メッセージを構築
pub fn build_skeleton_message(skeleton: &Skeleton, elapsed_secs: f32) -> OscMessage {
    let mut args = Vec::with_capacity(SKELETON_MESSAGE_ARGS);
    args.push(OscType::String(skeleton.name.clone()));
    args.push(OscType::Int(RamJoint::COUNT as i32));

    for joint in RamJoint::ALL {
        let pose = JointPose::lookup(skeleton, joint);
        args.push(OscType::String(joint.display_name().to_string()));
        args.push(OscType::Float(pose.position[0]));
        args.push(OscType::Float(pose.position[1]));
        args.push(OscType::Float(pose.position[2]));
        args.push(OscType::Float(pose.rotation.angle));
        args.push(OscType::Float(pose.rotation.axis[0]));
        args.push(OscType::Float(pose.rotation.axis[1]));
        args.push(OscType::Float(pose.rotation.axis[2]));
    }

    args.push(OscType::Float(elapsed_secs));

    OscMessage {
        addr: RAM_SKELETON_ADDR.to_string(),
        args,
    }
}

/// OSCメッセージをバイト列にエンコード
pub fn encode_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

#[derive(Debug, Error, PartialEq)]
pub enum MessageError {
    #[error("unexpected address {0:?}")]
    Address(String),
    #[error("expected {expected} arguments, got {actual}")]
    Arity { expected: usize, actual: usize },
    #[error("unsupported joint count {0}")]
    JointCount(i32),
    #[error("argument {index} is not {expected}")]
    Argument { index: usize, expected: &'static str },
}

/// 受信側でデコードした `/ram/skeleton`
#[derive(Debug, Clone, PartialEq)]
pub struct SkeletonMessage {
    pub name: String,
    pub joints: Vec<(String, JointPose)>,
    pub timestamp: f32,
}

impl SkeletonMessage {
    pub fn joint(&self, name: &str) -> Option<&JointPose> {
        self.joints.iter().find(|(n, _)| n == name).map(|(_, p)| p)
    }
}

fn string_arg(args: &[OscType], index: usize) -> Result<String, MessageError> {
    match &args[index] {
        OscType::String(s) => Ok(s.clone()),
        _ => Err(MessageError::Argument { index, expected: "a string" }),
    }
}

fn float_arg(args: &[OscType], index: usize) -> Result<f32, MessageError> {
    match args[index] {
        OscType::Float(f) => Ok(f),
        _ => Err(MessageError::Argument { index, expected: "a float" }),
    }
}

/// 受信したOSCメッセージを骨格として読む
pub fn parse_skeleton_message(msg: &OscMessage) -> Result<SkeletonMessage, MessageError> {
    if msg.addr != RAM_SKELETON_ADDR {
        return Err(MessageError::Address(msg.addr.clone()));
    }
    let args = &msg.args;
    if args.len() < 2 {
        return Err(MessageError::Arity { expected: SKELETON_MESSAGE_ARGS, actual: args.len() });
    }

    let name = string_arg(args, 0)?;
    let count = match args[1] {
        OscType::Int(n) => n,
        _ => return Err(MessageError::Argument { index: 1, expected: "an int" }),
    };
    if count != RamJoint::COUNT as i32 {
        return Err(MessageError::JointCount(count));
    }
    if args.len() != SKELETON_MESSAGE_ARGS {
        return Err(MessageError::Arity { expected: SKELETON_MESSAGE_ARGS, actual: args.len() });
    }

    let mut joints = Vec::with_capacity(RamJoint::COUNT);
    for j in 0..RamJoint::COUNT {
        let base = 2 + j * ARGS_PER_JOINT;
        let joint_name = string_arg(args, base)?;
        let mut values = [0.0f32; 7];
        for (k, v) in values.iter_mut().enumerate() {
            *v = float_arg(args, base + 1 + k)?;
        }
        let pose = JointPose::new(
            [values[0], values[1], values[2]],
            AxisAngle { angle: values[3], axis: [values[4], values[5], values[6]] },
        );
        joints.push((joint_name, pose));
    }
    let timestamp = float_arg(args, SKELETON_MESSAGE_ARGS - 1)?;

    Ok(SkeletonMessage { name, joints, timestamp })
}
