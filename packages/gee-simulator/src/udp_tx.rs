//! udp_tx.rs — UDP feed of scene/frame messages to an external display
//!
//! Sends each feed message as one JSON datagram to:
//!   - Unicast: the display address given with `--udp` (e.g. 127.0.0.1:6060)
//!   - Multicast: optional group address for several displays at once
//!
//! Send errors are logged but never stop the simulation.

use std::net::UdpSocket;

use tracing::{debug, warn};

use crate::presenter::{FeedMessage, FrameSink};

/// Largest UDP payload over IPv4
const MAX_DATAGRAM: usize = 65_507;

pub struct UdpTransmitter {
    socket: UdpSocket,
    unicast_addr: String,
    multicast_addr: Option<String>,
}

impl UdpTransmitter {
    /// Create a transmitter bound to an ephemeral local port.
    pub fn new(unicast_addr: &str, multicast_addr: Option<&str>) -> Result<Self, std::io::Error> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_nonblocking(false)?;
        Ok(Self {
            socket,
            unicast_addr: unicast_addr.to_string(),
            multicast_addr: multicast_addr.map(|s| s.to_string()),
        })
    }

    pub fn local_port(&self) -> Option<u16> {
        self.socket.local_addr().ok().map(|a| a.port())
    }

    fn send_bytes(&self, bytes: &[u8], target: &str) {
        match self.socket.send_to(bytes, target) {
            Ok(n) => debug!("UDP → {target}: {n} bytes"),
            Err(e) => warn!("UDP: send to {target} failed: {e}"),
        }
    }
}

impl FrameSink for UdpTransmitter {
    fn send(&mut self, msg: &FeedMessage) -> anyhow::Result<()> {
        let bytes = match serde_json::to_vec(msg) {
            Ok(b) => b,
            Err(e) => { warn!("UDP: serialize failed: {e}"); return Ok(()); }
        };
        if bytes.len() > MAX_DATAGRAM {
            // Dense loci blow past one datagram; lower [locus] resolution for UDP displays
            warn!("UDP: {} byte message exceeds one datagram, skipped", bytes.len());
            return Ok(());
        }

        self.send_bytes(&bytes, &self.unicast_addr);
        if let Some(mc) = &self.multicast_addr {
            self.send_bytes(&bytes, mc);
        }
        Ok(())
    }
}
