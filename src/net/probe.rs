//! Port availability and local address probes.
//!
//! Both probes are advisory. A free port can be taken by another process
//! before the real bind, so callers still handle bind failure.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpListener, UdpSocket};

/// Report whether `port` can currently be bound on all interfaces.
///
/// Port 0 names no concrete port and is never available.
pub fn is_port_available(port: u16) -> bool {
    if port == 0 {
        return false;
    }
    // Dropped before return, so the probe leaves nothing open.
    TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port)).is_ok()
}

/// Best-effort list of this host's LAN-facing addresses, for display only.
pub fn local_network_addresses() -> Vec<IpAddr> {
    let mut addrs = Vec::new();
    // Connecting a UDP socket sends nothing; it only selects a route.
    for target in ["10.255.255.255:1", "192.168.255.255:1", "172.31.255.255:1"] {
        let Some(ip) = route_source(target) else {
            continue;
        };
        if is_lan_address(&ip) && !addrs.contains(&ip) {
            addrs.push(ip);
        }
    }
    addrs
}

fn route_source(target: &str) -> Option<IpAddr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect(target).ok()?;
    Some(socket.local_addr().ok()?.ip())
}

fn is_lan_address(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_link_local(),
        IpAddr::V6(_) => false,
    }
}
