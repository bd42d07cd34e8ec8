use nalgebra::Point3;

/// 関節の色 (RGB)
pub const JOINT_COLOR: u32 = 0x00FF00; // 緑

/// ボーンの色 (RGB)
pub const BONE_COLOR: u32 = 0xFFFF00; // 黄色

/// ワールドX軸
pub const AXIS_X_COLOR: u32 = 0xFF0000;

/// ワールドY軸
pub const AXIS_Y_COLOR: u32 = 0x00FF00;

/// 軸の長さ (ワールド単位)
pub const AXIS_LENGTH: f32 = 100.0;

/// 正面からの正射影。Xは右、Yは上
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    width: usize,
    height: usize,
    /// 1単位あたりのピクセル数
    scale: f32,
}

impl Projection {
    pub fn new(width: usize, height: usize, scale: f32) -> Self {
        Self { width, height, scale }
    }

    /// 原点は画面下寄りの中央 (床の位置)
    pub fn origin(&self) -> (i32, i32) {
        ((self.width / 2) as i32, (self.height * 9 / 10) as i32)
    }

    pub fn to_pixel(&self, p: &Point3<f32>) -> (i32, i32) {
        let (ox, oy) = self.origin();
        let x = ox as f32 + p.x * self.scale;
        let y = oy as f32 - p.y * self.scale;
        (x.round() as i32, y.round() as i32)
    }
}

/// ウィンドウタイトル: FPS、スケルトン数、凍結表示
pub fn window_title(fps: f32, skeletons: usize, frozen: bool) -> String {
    format!(
        "{:.1} fps | skeletons: {}{}",
        fps,
        skeletons,
        if frozen { " [FROZEN]" } else { "" }
    )
}
