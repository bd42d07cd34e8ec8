//! Listen for `/ram/skeleton` messages and print what arrives.

use anyhow::{Context, Result};
use rosc::{decoder, OscPacket};
use std::net::UdpSocket;
use tracing_subscriber::EnvFilter;

use neuron_ram_osc::config::DestinationConfig;
use neuron_ram_osc::osc::{parse_skeleton_message, JointPose, SkeletonMessage};

fn print_skeleton(msg: &SkeletonMessage) {
    let hips = msg.joint("HIPS").copied().unwrap_or_else(JointPose::identity);
    println!(
        "[{:8.3}] {} joints={} hips=[{:.2}, {:.2}, {:.2}] rot={:.1}°",
        msg.timestamp,
        msg.name,
        msg.joints.len(),
        hips.position[0],
        hips.position[1],
        hips.position[2],
        hips.rotation.angle,
    );
}

fn handle_packet(packet: OscPacket) {
    match packet {
        OscPacket::Message(msg) => match parse_skeleton_message(&msg) {
            Ok(skeleton) => print_skeleton(&skeleton),
            Err(e) => tracing::warn!("{}: {}", msg.addr, e),
        },
        OscPacket::Bundle(bundle) => {
            for p in bundle.content {
                handle_packet(p);
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = match std::env::args().nth(1) {
        Some(arg) => arg.parse().with_context(|| format!("invalid port {:?}", arg))?,
        None => DestinationConfig::default().port,
    };

    let socket = UdpSocket::bind(("0.0.0.0", port)).with_context(|| format!("failed to bind port {}", port))?;
    tracing::info!("listening for /ram/skeleton on {}", socket.local_addr()?);

    let mut buf = [0u8; 8192];
    loop {
        let (size, from) = socket.recv_from(&mut buf)?;
        match decoder::decode_udp(&buf[..size]) {
            Ok((_, packet)) => handle_packet(packet),
            Err(e) => tracing::warn!("undecodable packet from {}: {:?}", from, e),
        }
    }
}
