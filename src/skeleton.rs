use nalgebra::{Isometry3, Point3};

/// 骨格の1関節 (グローバル座標系)
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub name: String,
    /// 親関節のインデックス (ルートはNone)
    pub parent: Option<usize>,
    pub global: Isometry3<f32>,
}

impl Joint {
    pub fn new(name: impl Into<String>, parent: Option<usize>, global: Isometry3<f32>) -> Self {
        Self {
            name: name.into(),
            parent,
            global,
        }
    }

    pub fn position(&self) -> Point3<f32> {
        Point3::from(self.global.translation.vector)
    }
}

/// 1ティック分の骨格スナップショット
#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub name: String,
    pub joints: Vec<Joint>,
}

impl Skeleton {
    pub fn new(name: impl Into<String>, joints: Vec<Joint>) -> Self {
        Self {
            name: name.into(),
            joints,
        }
    }

    pub fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joints.iter().find(|j| j.name == name)
    }

    /// (親, 子) の位置ペア。描画用
    pub fn bones(&self) -> impl Iterator<Item = (Point3<f32>, Point3<f32>)> + '_ {
        self.joints.iter().filter_map(move |joint| {
            let parent = self.joints.get(joint.parent?)?;
            Some((parent.position(), joint.position()))
        })
    }
}
