use std::time::Instant;

use crate::broadcast::{BroadcastReport, Broadcaster};
use crate::capture::CaptureSource;
use crate::osc::build_skeleton_message;

/// キー操作で切り替わる状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunState {
    /// trueの間は取得元を更新しない (最後のスナップショットを送り続ける)
    pub frozen: bool,
    pub debug_visible: bool,
}

impl RunState {
    pub fn toggle_freeze(&mut self) {
        self.frozen = !self.frozen;
    }

    pub fn toggle_debug(&mut self) {
        self.debug_visible = !self.debug_visible;
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            frozen: false,
            debug_visible: true,
        }
    }
}

/// 1ティックの結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub skeletons: usize,
    pub messages: usize,
    pub broadcast: BroadcastReport,
}

/// 取得元の骨格を `/ram/skeleton` にして全送信先へ送る
pub struct Bridge<S: CaptureSource> {
    source: S,
    broadcaster: Broadcaster,
    started: Instant,
}

impl<S: CaptureSource> Bridge<S> {
    pub fn new(source: S, broadcaster: Broadcaster) -> Self {
        Self {
            source,
            broadcaster,
            started: Instant::now(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// 起動からの経過秒
    pub fn elapsed_secs(&self) -> f32 {
        self.started.elapsed().as_secs_f32()
    }

    pub fn tick(&mut self, state: &RunState) -> TickReport {
        let elapsed = self.elapsed_secs();
        self.tick_at(state, elapsed)
    }

    /// タイムスタンプを指定して1ティック処理する
    pub fn tick_at(&mut self, state: &RunState, elapsed_secs: f32) -> TickReport {
        if !state.frozen {
            self.source.update();
        }

        let mut report = TickReport::default();
        for skeleton in self.source.skeletons() {
            let msg = build_skeleton_message(skeleton, elapsed_secs);
            report.broadcast.merge(self.broadcaster.broadcast(&msg));
            report.messages += 1;
        }
        report.skeletons = self.source.skeletons().len();
        report
    }
}
