//! Local address detection

use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use tracing::debug;

/// Reported when no address can be found
pub const UNKNOWN_IP: &str = "0.0.0.0";

/// Address of the interface holding the default route. Connecting a UDP
/// socket sends nothing; it only makes the OS pick a source address.
pub fn detect_local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(8, 8, 8, 8), 80)).ok()?;
    let ip = socket.local_addr().ok()?.ip();

    if ip.is_unspecified() || ip.is_loopback() {
        debug!(target: "simulator", "No routable local address found");
        return None;
    }
    Some(ip)
}

/// `--ip` when given, else the detected address, else `0.0.0.0`
pub fn advertised_ip(flag: Option<&str>) -> String {
    match flag {
        Some(ip) if !ip.trim().is_empty() => ip.trim().to_string(),
        _ => detect_local_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| UNKNOWN_IP.to_string()),
    }
}
