use anyhow::Result;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use nalgebra::Point3;

use crate::bridge::RunState;
use crate::render::skeleton::{
    window_title, Projection, AXIS_LENGTH, AXIS_X_COLOR, AXIS_Y_COLOR, BONE_COLOR, JOINT_COLOR,
};
use crate::skeleton::Skeleton;

/// minifbを使用したデバッグ表示
pub struct DebugView {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
    projection: Projection,
}

impl DebugView {
    /// ウィンドウを作成
    pub fn new(title: &str, width: usize, height: usize, scale: f32) -> Result<Self> {
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;

        Ok(Self {
            window,
            buffer: vec![0u32; width * height],
            width,
            height,
            projection: Projection::new(width, height, scale),
        })
    }

    /// ウィンドウが開いているか (Escで閉じる)
    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// h: デバッグ描画の表示切替、Space: 凍結切替
    pub fn handle_keys(&self, state: &mut RunState) {
        if self.window.is_key_pressed(Key::H, KeyRepeat::No) {
            state.toggle_debug();
        }
        if self.window.is_key_pressed(Key::Space, KeyRepeat::No) {
            state.toggle_freeze();
            tracing::info!("freeze: {}", if state.frozen { "ON" } else { "OFF" });
        }
    }

    /// 軸と骨格を描画してウィンドウに表示
    pub fn draw(&mut self, skeletons: &[Skeleton], state: &RunState, fps: f32) -> Result<()> {
        self.buffer.fill(0);

        if state.debug_visible {
            for skeleton in skeletons {
                self.draw_skeleton(skeleton);
            }
        }
        self.draw_axes();

        self.window.set_title(&window_title(fps, skeletons.len(), state.frozen));
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)?;
        Ok(())
    }

    fn draw_axes(&mut self) {
        let origin = self.projection.to_pixel(&Point3::origin());
        let x = self.projection.to_pixel(&Point3::new(AXIS_LENGTH, 0.0, 0.0));
        let y = self.projection.to_pixel(&Point3::new(0.0, AXIS_LENGTH, 0.0));
        self.draw_line(origin, x, AXIS_X_COLOR);
        self.draw_line(origin, y, AXIS_Y_COLOR);
    }

    fn draw_skeleton(&mut self, skeleton: &Skeleton) {
        for (parent, child) in skeleton.bones() {
            let a = self.projection.to_pixel(&parent);
            let b = self.projection.to_pixel(&child);
            self.draw_line(a, b, BONE_COLOR);
        }
        for joint in &skeleton.joints {
            let p = self.projection.to_pixel(&joint.position());
            self.draw_circle(p, 2, JOINT_COLOR);
        }
    }

    /// Bresenhamのアルゴリズムで線を描画
    fn draw_line(&mut self, (x0, y0): (i32, i32), (x1, y1): (i32, i32), color: u32) {
        if !self.near_screen(x0, y0) || !self.near_screen(x1, y1) {
            return;
        }
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        let mut x = x0;
        let mut y = y0;

        loop {
            self.set_pixel(x, y, color);

            if x == x1 && y == y1 {
                break;
            }

            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    /// 円を描画（塗りつぶし）
    fn draw_circle(&mut self, (cx, cy): (i32, i32), radius: i32, color: u32) {
        if !self.near_screen(cx, cy) {
            return;
        }
        for dy in -radius..=radius {
            for dx in -radius..=radius {
                if dx * dx + dy * dy <= radius * radius {
                    self.set_pixel(cx + dx, cy + dy, color);
                }
            }
        }
    }

    /// 画面から大きく外れた線は描かない
    fn near_screen(&self, x: i32, y: i32) -> bool {
        let w = self.width as i32;
        let h = self.height as i32;
        x > -w && x < 2 * w && y > -h && y < 2 * h
    }

    /// ピクセルをセット（境界チェック付き）
    fn set_pixel(&mut self, x: i32, y: i32, color: u32) {
        if x >= 0 && x < self.width as i32 && y >= 0 && y < self.height as i32 {
            self.buffer[y as usize * self.width + x as usize] = color;
        }
    }
}
