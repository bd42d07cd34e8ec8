use anyhow::Result;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

use neuron_ram_osc::bridge::{Bridge, RunState, TickReport};
use neuron_ram_osc::broadcast::Broadcaster;
use neuron_ram_osc::capture::CaptureSource;
use neuron_ram_osc::config::Config;
use neuron_ram_osc::neuron::NeuronReader;
use neuron_ram_osc::render::DebugView;

const CONFIG_PATH: &str = "config.toml";

/// 1秒ごとの集計
struct FpsCounter {
    frame_count: u32,
    messages: usize,
    failed: usize,
    timer: Instant,
    fps: f32,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            frame_count: 0,
            messages: 0,
            failed: 0,
            timer: Instant::now(),
            fps: 0.0,
        }
    }

    fn record(&mut self, report: &TickReport) {
        self.frame_count += 1;
        self.messages += report.messages;
        self.failed += report.broadcast.failed;

        let elapsed = self.timer.elapsed().as_secs_f32();
        if elapsed >= 1.0 {
            self.fps = self.frame_count as f32 / elapsed;
            tracing::debug!(
                "FPS: {:.1} | skeletons: {} | messages: {} | send failures: {}",
                self.fps,
                report.skeletons,
                self.messages,
                self.failed
            );
            self.frame_count = 0;
            self.messages = 0;
            self.failed = 0;
            self.timer = Instant::now();
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1).unwrap_or_else(|| CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path);

    tracing::info!("neuron-ram-osc {}", env!("GIT_VERSION"));
    tracing::info!("Axis Neuron: {}", config.capture_addr());
    tracing::info!("Target FPS: {}", config.app.target_fps);
    tracing::info!("Debug view: {}", if config.debug.view { "ON" } else { "OFF" });

    let broadcaster = Broadcaster::from_config(&config.destinations);
    if broadcaster.is_empty() {
        tracing::warn!("no destinations configured, nothing will be sent");
    }

    let reader = NeuronReader::connect(
        &config.capture.host,
        config.capture.port,
        Duration::from_millis(config.capture.reconnect_interval_ms),
    )?;
    let mut bridge = Bridge::new(reader, broadcaster);

    let mut view = if config.debug.view {
        tracing::info!("keys: [H] debug draw  [Space] freeze  [Esc] quit");
        Some(DebugView::new(
            "neuron-ram-osc",
            config.debug.width,
            config.debug.height,
            config.debug.scale,
        )?)
    } else {
        None
    };

    let frame_duration = Duration::from_secs_f64(1.0 / config.app.target_fps.max(1) as f64);
    let mut state = RunState::default();
    let mut fps = FpsCounter::new();

    loop {
        let loop_start = Instant::now();

        if let Some(ref v) = view {
            if !v.is_open() {
                break;
            }
            v.handle_keys(&mut state);
        }

        let report = bridge.tick(&state);
        fps.record(&report);

        if let Some(ref mut v) = view {
            v.draw(bridge.source().skeletons(), &state, fps.fps)?;
        }

        if let Some(rest) = frame_duration.checked_sub(loop_start.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    tracing::info!("Shutting down...");
    Ok(())
}
