use anyhow::{Context, Result};
use rosc::OscMessage;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

use crate::config::DestinationConfig;
use crate::osc::encode_message;

/// エンコード済みOSCパケットの送信先
pub trait OscSender {
    fn send_packet(&self, packet: &[u8]) -> io::Result<usize>;

    /// ログ表示用の送信先
    fn target(&self) -> String;
}

/// IPv4のアドレスを優先し、なければ先頭を使う
fn prefer_ipv4(addrs: impl IntoIterator<Item = SocketAddr>) -> Option<SocketAddr> {
    let addrs: Vec<SocketAddr> = addrs.into_iter().collect();
    addrs.iter().copied().find(SocketAddr::is_ipv4).or_else(|| addrs.first().copied())
}

/// UDPの送信先。ソケットは非ブロッキングで、送りっぱなし
pub struct UdpDestination {
    socket: UdpSocket,
    target_addr: SocketAddr,
}

impl UdpDestination {
    pub fn new(target_addr: SocketAddr) -> Result<Self> {
        let bind_addr = if target_addr.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self { socket, target_addr })
    }

    /// ホスト名を解決して作成
    pub fn resolve(host: &str, port: u16) -> Result<Self> {
        let addrs = (host, port)
            .to_socket_addrs()
            .with_context(|| format!("failed to resolve {}:{}", host, port))?;
        let target_addr = prefer_ipv4(addrs).with_context(|| format!("no address for {}:{}", host, port))?;
        Self::new(target_addr)
    }

    pub fn target_addr(&self) -> SocketAddr {
        self.target_addr
    }
}

impl OscSender for UdpDestination {
    fn send_packet(&self, packet: &[u8]) -> io::Result<usize> {
        self.socket.send_to(packet, self.target_addr)
    }

    fn target(&self) -> String {
        self.target_addr.to_string()
    }
}

/// 1回のブロードキャスト結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub failed: usize,
}

impl BroadcastReport {
    pub fn merge(&mut self, other: BroadcastReport) {
        self.delivered += other.delivered;
        self.failed += other.failed;
    }
}

/// 同じメッセージを全送信先へ送る
#[derive(Default)]
pub struct Broadcaster {
    senders: Vec<Box<dyn OscSender>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// 設定の送信先からUDP送信先を作る。解決できない送信先は警告して飛ばす
    pub fn from_config(destinations: &[DestinationConfig]) -> Self {
        let mut broadcaster = Self::new();
        for dest in destinations {
            match UdpDestination::resolve(&dest.host, dest.port) {
                Ok(udp) => {
                    tracing::info!("destination: {}", udp.target_addr());
                    broadcaster.add(Box::new(udp));
                }
                Err(e) => tracing::warn!("skipping destination {}:{}: {:#}", dest.host, dest.port, e),
            }
        }
        broadcaster
    }

    pub fn add(&mut self, sender: Box<dyn OscSender>) {
        self.senders.push(sender);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// 全送信先へ送信。失敗は数えるだけで他の送信先には影響しない
    pub fn broadcast(&self, msg: &OscMessage) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        if self.senders.is_empty() {
            return report;
        }

        let packet = match encode_message(msg) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::debug!("failed to encode {}: {:#}", msg.addr, e);
                report.failed = self.senders.len();
                return report;
            }
        };

        for sender in &self.senders {
            match sender.send_packet(&packet) {
                Ok(_) => report.delivered += 1,
                Err(e) => {
                    tracing::debug!("send to {} failed: {}", sender.target(), e);
                    report.failed += 1;
                }
            }
        }
        report
    }
}
