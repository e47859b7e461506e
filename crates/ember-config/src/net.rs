//! Sized-integer and address value types.
//!
//! The `Display` form of each type is the canonical text used in emitted
//! code, so changing it changes generated firmware sources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An integer rendered as hexadecimal in emitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HexInt(pub u64);

impl fmt::Display for HexInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 <= 0xFF {
            write!(f, "0x{:02X}", self.0)
        } else {
            write!(f, "0x{:X}", self.0)
        }
    }
}

/// An IPv4 address, four octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ipv4(pub [u8; 4]);

impl Ipv4 {
    /// Parse dotted-decimal notation.
    pub fn parse(text: &str) -> Result<Self, String> {
        let parts: Vec<&str> = text.split('.').collect();
        if parts.len() != 4 {
            return Err(format!("IPv4 address must have 4 octets: '{}'", text));
        }
        let mut octets = [0u8; 4];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            *slot = part
                .parse::<u8>()
                .map_err(|_| format!("invalid IPv4 octet '{}' in '{}'", part, text))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for Ipv4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0;
        write!(f, "{}.{}.{}.{}", a, b, c, d)
    }
}

/// A MAC address, six octets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Parse colon-separated hex notation.
    pub fn parse(text: &str) -> Result<Self, String> {
        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() != 6 {
            return Err(format!("MAC address must have 6 parts: '{}'", text));
        }
        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(&parts) {
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| format!("invalid MAC part '{}' in '{}'", part, text))?;
        }
        Ok(Self(octets))
    }

    /// The address as a single hex integer literal, for runtime APIs that
    /// take a packed MAC.
    pub fn as_hex(&self) -> String {
        let mut out = String::from("0x");
        for part in self.0 {
            out.push_str(&format!("{:02X}", part));
        }
        out.push_str("ULL");
        out
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|p| format!("{:02X}", p)).collect();
        write!(f, "{}", parts.join(":"))
    }
}
