use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use crate::capture::CaptureSource;
use crate::neuron::frame::{AvatarFrame, FrameError, FrameSplitter};
use crate::skeleton::Skeleton;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const READ_TIMEOUT: Duration = Duration::from_millis(200);
const READ_BUFFER_SIZE: usize = 16 * 1024;

type Avatars = Arc<Mutex<BTreeMap<u32, Skeleton>>>;

fn lock(avatars: &Avatars) -> MutexGuard<'_, BTreeMap<u32, Skeleton>> {
    avatars.lock().unwrap_or_else(|e| e.into_inner())
}

/// 別スレッドでAxis Neuronからフレームを受信し、アバターごとの最新骨格を保持する
pub struct NeuronReader {
    latest: Avatars,
    frame_id: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    snapshot: Vec<Skeleton>,
    _handle: thread::JoinHandle<()>,
}

impl NeuronReader {
    /// 受信スレッドを開始する。接続できなくてもエラーにはせず再接続を続ける
    pub fn connect(host: &str, port: u16, reconnect_interval: Duration) -> Result<Self> {
        let latest: Avatars = Arc::new(Mutex::new(BTreeMap::new()));
        let frame_id = Arc::new(AtomicU64::new(0));
        let connected = Arc::new(AtomicBool::new(false));
        let running = Arc::new(AtomicBool::new(true));

        let worker = Worker {
            host: host.to_string(),
            port,
            reconnect_interval,
            latest: latest.clone(),
            frame_id: frame_id.clone(),
            connected: connected.clone(),
            running: running.clone(),
        };
        let handle = thread::Builder::new()
            .name("neuron-reader".to_string())
            .spawn(move || worker.run())
            .context("failed to spawn neuron reader thread")?;

        Ok(Self {
            latest,
            frame_id,
            connected,
            running,
            snapshot: Vec::new(),
            _handle: handle,
        })
    }

    /// 受信済みフレーム数。新フレームが到着するたびにインクリメントされる
    pub fn frame_id(&self) -> u64 {
        self.frame_id.load(Ordering::Acquire)
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl CaptureSource for NeuronReader {
    /// 最新のアバターをアバター番号順にスナップショットへコピー
    fn update(&mut self) {
        let latest = lock(&self.latest);
        self.snapshot.clear();
        self.snapshot.extend(latest.values().cloned());
    }

    fn skeletons(&self) -> &[Skeleton] {
        &self.snapshot
    }
}

impl Drop for NeuronReader {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// 1接続の間に出した警告
#[derive(Debug, Default)]
struct ConnectionLog {
    no_displacement_reported: bool,
}

impl ConnectionLog {
    /// 変位なしの警告は接続ごとに1回だけ。それ以外は毎回
    fn should_report(&mut self, err: &FrameError) -> bool {
        match err {
            FrameError::NoDisplacement(_) => !std::mem::replace(&mut self.no_displacement_reported, true),
            _ => true,
        }
    }
}

/// 受信スレッド側の状態
struct Worker {
    host: String,
    port: u16,
    reconnect_interval: Duration,
    latest: Avatars,
    frame_id: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) {
        let endpoint = format!("{}:{}", self.host, self.port);
        // 切断中の警告は1回だけ
        let mut outage_reported = false;

        while self.running.load(Ordering::Acquire) {
            match self.open() {
                Ok(stream) => {
                    tracing::info!("connected to Axis Neuron at {}", endpoint);
                    outage_reported = false;
                    self.connected.store(true, Ordering::Release);
                    if let Err(e) = self.receive(stream) {
                        tracing::warn!("Axis Neuron connection lost: {}", e);
                    }
                    self.connected.store(false, Ordering::Release);
                    lock(&self.latest).clear();
                }
                Err(e) => {
                    if !outage_reported {
                        tracing::warn!("cannot reach Axis Neuron at {}: {:#}, retrying", endpoint, e);
                        outage_reported = true;
                    }
                }
            }
            self.sleep_interruptible(self.reconnect_interval);
        }
        tracing::debug!("neuron reader stopped");
    }

    fn open(&self) -> Result<TcpStream> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port).to_socket_addrs()?.collect();
        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT) {
                Ok(stream) => {
                    stream.set_read_timeout(Some(READ_TIMEOUT))?;
                    return Ok(stream);
                }
                Err(e) => last_err = Some(e),
            }
        }
        match last_err {
            Some(e) => Err(e.into()),
            None => anyhow::bail!("no address for {}:{}", self.host, self.port),
        }
    }

    /// 切断されるか停止要求が来るまで受信する
    fn receive(&self, mut stream: TcpStream) -> io::Result<()> {
        let mut splitter = FrameSplitter::new();
        let mut log = ConnectionLog::default();
        let mut buf = vec![0u8; READ_BUFFER_SIZE];

        while self.running.load(Ordering::Acquire) {
            let n = match stream.read(&mut buf) {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "closed by peer")),
                Ok(n) => n,
                Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            for text in splitter.push(&buf[..n]) {
                self.handle_frame(&text, &mut log);
            }
        }
        Ok(())
    }

    fn handle_frame(&self, text: &str, log: &mut ConnectionLog) {
        match AvatarFrame::parse(text) {
            Ok(frame) => {
                let skeleton = frame.to_skeleton();
                lock(&self.latest).insert(frame.index, skeleton);
                self.frame_id.fetch_add(1, Ordering::Release);
            }
            Err(e) if !log.should_report(&e) => tracing::trace!("{}", e),
            Err(e @ FrameError::NoDisplacement(_)) => tracing::warn!("{}", e),
            Err(e) => tracing::warn!("dropping malformed frame: {}", e),
        }
    }

    fn sleep_interruptible(&self, total: Duration) {
        let step = Duration::from_millis(50);
        let mut slept = Duration::ZERO;
        while slept < total && self.running.load(Ordering::Acquire) {
            thread::sleep(step.min(total - slept));
            slept += step;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neuron::frame::DISPLACEMENT_VALUES;
    use std::io::Write;
    use std::net::TcpListener;
    use std::time::Instant;

    fn frame_bytes(prefix: &str, hips_y: f32) -> Vec<u8> {
        let mut values = vec!["0".to_string(); DISPLACEMENT_VALUES];
        values[1] = format!("{}", hips_y);
        format!("{} {} ||\n", prefix, values.join(" ")).into_bytes()
    }

    /// 条件が満たされるまで update() を繰り返す
    fn wait_for(reader: &mut NeuronReader, cond: impl Fn(&NeuronReader) -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            reader.update();
            if cond(reader) {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_receives_avatars_in_index_order() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut reader = NeuronReader::connect("127.0.0.1", port, Duration::from_millis(50)).unwrap();

        let (mut peer, _) = listener.accept().unwrap();
        peer.write_all(&frame_bytes("1 Dancer", 90.0)).unwrap();
        peer.write_all(&frame_bytes("0 Avatar00", 100.0)).unwrap();
        peer.flush().unwrap();

        assert!(wait_for(&mut reader, |r| r.skeletons().len() == 2));
        assert!(reader.is_connected());
        assert!(reader.frame_id() >= 2);

        let names: Vec<_> = reader.skeletons().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Avatar00", "Dancer"]);
        let hips = reader.skeletons()[1].joint_by_name("Hips").unwrap();
        assert_eq!(hips.position().y, 90.0);

        // 切断したらスケルトンは空になる
        drop(peer);
        assert!(wait_for(&mut reader, |r| r.skeletons().is_empty()));
    }

    #[test]
    fn test_snapshot_only_changes_on_update() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut reader = NeuronReader::connect("127.0.0.1", port, Duration::from_millis(50)).unwrap();

        let (mut peer, _) = listener.accept().unwrap();
        peer.write_all(&frame_bytes("0 Avatar00", 100.0)).unwrap();
        assert!(wait_for(&mut reader, |r| r.skeletons().len() == 1));

        let before = reader.frame_id();
        peer.write_all(&frame_bytes("0 Avatar00", 50.0)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(5);
        while reader.frame_id() == before && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        // update() を呼ぶまでは古いスナップショットのまま
        assert_eq!(reader.skeletons()[0].joint_by_name("Hips").unwrap().position().y, 100.0);
        reader.update();
        assert_eq!(reader.skeletons()[0].joint_by_name("Hips").unwrap().position().y, 50.0);
    }

    #[test]
    fn test_no_displacement_reported_once_per_connection() {
        let mut log = ConnectionLog::default();
        assert!(log.should_report(&FrameError::NoDisplacement(180)));
        assert!(!log.should_report(&FrameError::NoDisplacement(180)));
        assert!(!log.should_report(&FrameError::NoDisplacement(186)));
        // 壊れたフレームは毎回
        assert!(log.should_report(&FrameError::ValueCount(2)));
        assert!(log.should_report(&FrameError::ValueCount(2)));

        // 再接続で新しいログになる
        let mut log = ConnectionLog::default();
        assert!(log.should_report(&FrameError::NoDisplacement(180)));
    }

    #[test]
    fn test_rotation_only_stream_yields_no_skeletons() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let mut reader = NeuronReader::connect("127.0.0.1", port, Duration::from_millis(50)).unwrap();

        let (mut peer, _) = listener.accept().unwrap();
        let rotation_only = vec!["0"; 180].join(" ");
        for _ in 0..3 {
            peer.write_all(format!("0 Avatar00 {} ||\n", rotation_only).as_bytes()).unwrap();
        }
        // 変位なしの後でも正常なフレームは受け付ける
        peer.write_all(&frame_bytes("1 Dancer", 90.0)).unwrap();

        assert!(wait_for(&mut reader, |r| r.skeletons().len() == 1));
        assert_eq!(reader.skeletons()[0].name, "Dancer");
        assert_eq!(reader.frame_id(), 1);
    }

    #[test]
    fn test_unreachable_source_is_empty() {
        // 使われていないポートを取ってすぐ閉じる
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let mut reader = NeuronReader::connect("127.0.0.1", port, Duration::from_millis(50)).unwrap();
        thread::sleep(Duration::from_millis(100));
        reader.update();
        assert!(reader.skeletons().is_empty());
        assert!(!reader.is_connected());
    }
}
