//! Wake-on-LAN.
//!
//! WebOS TVs cannot be powered on over the SSAP socket, which is closed
//! while the TV is off. A magic packet on the local network wakes them if
//! "Mobile TV On" is enabled.

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::{Error, Result};

/// UDP port magic packets are sent to.
pub const WOL_PORT: u16 = 9;

/// Length of a magic packet: 6 sync bytes plus 16 copies of the MAC.
pub const MAGIC_PACKET_LEN: usize = 6 + 16 * 6;

static MAC_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})[:-]([0-9A-Fa-f]{2})$")
        .expect("valid MAC pattern")
});

// ============================================================================
// MacAddress
// ============================================================================

/// A 48-bit hardware address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    /// Creates an address from raw bytes.
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    #[inline]
    #[must_use]
    pub const fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let captures = MAC_PATTERN
            .captures(s.trim())
            .ok_or_else(|| Error::invalid_argument(format!("invalid MAC address: {s}")))?;

        let mut bytes = [0u8; 6];
        for (byte, group) in bytes.iter_mut().zip(captures.iter().skip(1)) {
            let group = group.map(|m| m.as_str()).unwrap_or_default();
            *byte = u8::from_str_radix(group, 16)
                .map_err(|e| Error::invalid_argument(format!("invalid MAC address: {e}")))?;
        }
        Ok(Self(bytes))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// Parses `aa:bb:cc:dd:ee:ff` or `aa-bb-cc-dd-ee-ff`.
///
/// # Errors
///
/// Returns [`Error::InvalidArgument`] if `s` is not a MAC address.
pub fn parse_mac(s: &str) -> Result<MacAddress> {
    s.parse()
}

// ============================================================================
// Magic Packet
// ============================================================================

/// Builds the magic packet for `mac`.
#[must_use]
pub fn magic_packet(mac: MacAddress) -> [u8; MAGIC_PACKET_LEN] {
    let mut packet = [0xFF; MAGIC_PACKET_LEN];
    for chunk in packet[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&mac.0);
    }
    packet
}

/// Broadcasts the magic packet for `mac` to `broadcast` on [`WOL_PORT`].
///
/// Use `Ipv4Addr::BROADCAST` unless the TV sits on another subnet.
///
/// # Errors
///
/// Returns [`Error::Io`] if the socket cannot be opened or the send fails.
pub async fn send_magic_packet(mac: MacAddress, broadcast: Ipv4Addr) -> Result<()> {
    let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
    socket.set_broadcast(true)?;

    let target = SocketAddr::from((broadcast, WOL_PORT));
    let sent = socket.send_to(&magic_packet(mac), target).await?;
    debug!(%mac, %target, sent, "Sent Wake-on-LAN packet");
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mac_separators() {
        let expected = MacAddress::new([0xa8, 0x23, 0xfe, 0x01, 0x9c, 0xff]);
        assert_eq!(parse_mac("a8:23:fe:01:9c:ff").expect("colon"), expected);
        assert_eq!(parse_mac("A8-23-FE-01-9C-FF").expect("dash"), expected);
        assert_eq!(expected.to_string(), "a8:23:fe:01:9c:ff");
    }

    #[test]
    fn test_parse_mac_rejects_garbage() {
        for input in ["", "a8:23:fe:01:9c", "a8:23:fe:01:9c:ff:00", "zz:23:fe:01:9c:ff", "a823fe019cff"] {
            assert!(
                matches!(parse_mac(input), Err(Error::InvalidArgument { .. })),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_magic_packet_layout() {
        let mac = MacAddress::new([1, 2, 3, 4, 5, 6]);
        let packet = magic_packet(mac);

        assert_eq!(packet.len(), 102);
        assert_eq!(&packet[..6], &[0xFF; 6]);
        for chunk in packet[6..].chunks(6) {
            assert_eq!(chunk, &[1, 2, 3, 4, 5, 6]);
        }
    }

    #[tokio::test]
    async fn test_send_magic_packet_to_loopback() {
        let mac = parse_mac("00:11:22:33:44:55").expect("mac");
        send_magic_packet(mac, Ipv4Addr::LOCALHOST)
            .await
            .expect("packet sent");
    }
}
