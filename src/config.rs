use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// 旧形式の設定ファイル名 (`<axis_neuron>` と `<rdtk>` 要素)
const LEGACY_XML_NAME: &str = "config.xml";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub capture: CaptureConfig,
    /// RAM Dance Toolkitの送信先 (0個以上)
    #[serde(default)]
    pub destinations: Vec<DestinationConfig>,
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub debug: DebugConfig,
}

/// Axis Neuronの接続先
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaptureConfig {
    #[serde(default = "default_capture_host")]
    pub host: String,
    #[serde(default = "default_capture_port")]
    pub port: u16,
    /// 切断時の再接続間隔（ミリ秒）
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DestinationConfig {
    #[serde(default = "default_destination_host")]
    pub host: String,
    #[serde(default = "default_destination_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DebugConfig {
    /// デバッグウィンドウを開くか
    #[serde(default = "default_debug_view")]
    pub view: bool,
    #[serde(default = "default_debug_width")]
    pub width: usize,
    #[serde(default = "default_debug_height")]
    pub height: usize,
    /// 1単位あたりのピクセル数 (Axis Neuronはcm)
    #[serde(default = "default_debug_scale")]
    pub scale: f32,
}

fn default_capture_host() -> String { "127.0.0.1".to_string() }
fn default_capture_port() -> u16 { 7001 }
fn default_reconnect_interval_ms() -> u64 { 1000 }
fn default_destination_host() -> String { "127.0.0.1".to_string() }
fn default_destination_port() -> u16 { 10000 }
fn default_target_fps() -> u32 { 60 }
fn default_debug_view() -> bool { true }
fn default_debug_width() -> usize { 640 }
fn default_debug_height() -> usize { 480 }
fn default_debug_scale() -> f32 { 1.5 }

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            host: default_capture_host(),
            port: default_capture_port(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: default_destination_host(),
            port: default_destination_port(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            view: default_debug_view(),
            width: default_debug_width(),
            height: default_debug_height(),
            scale: default_debug_scale(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// 読み込めなければ組み込みのデフォルト値を使う
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            match Self::legacy_xml_path(path) {
                Some(xml) => tracing::warn!(
                    "{} not found but {} exists, it is no longer read: move [capture] and [[destinations]] to TOML (see config.example.toml)",
                    path.display(),
                    xml.display()
                ),
                None => tracing::info!("{} not found, using defaults", path.display()),
            }
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("failed to load {}: {:#}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// 同じディレクトリに旧形式の config.xml があればそのパス
    pub fn legacy_xml_path(path: &Path) -> Option<PathBuf> {
        let xml = path.with_file_name(LEGACY_XML_NAME);
        (xml != path && xml.is_file()).then_some(xml)
    }

    pub fn capture_addr(&self) -> String {
        format!("{}:{}", self.capture.host, self.capture.port)
    }
}
