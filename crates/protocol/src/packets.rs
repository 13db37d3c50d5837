//! # Source Query Packet Definitions
//!
//! Header sentinels, request discriminants and response tags for the server
//! query protocol.
//!
//! ## Packet Organization
//!
//! Every datagram starts with a 4-byte header code:
//! - `FF FF FF FF` ([`HEADER_SIMPLE`]): the rest of the datagram is the whole response
//! - `FF FF FF FE` ([`HEADER_SPLIT`]): the datagram is one fragment of a larger response
//!
//! After the header, requests carry a 1-byte [`RequestType`] and responses a
//! 1-byte [`ResponseType`].

/// Header code of a datagram carrying a complete response
pub const HEADER_SIMPLE: u32 = 0xFFFF_FFFF;

/// Header code of a datagram carrying one fragment of a split response
pub const HEADER_SPLIT: u32 = 0xFFFF_FFFE;

/// The simple header as it appears on the wire
pub const HEADER_SIMPLE_BYTES: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Maximum payload of a single query datagram
pub const PACKET_SIZE: usize = 1400;

/// Challenge value meaning "no challenge yet, please send one"
pub const NO_CHALLENGE: i32 = -1;

/// Payload of the info request
pub const INFO_QUERY_STRING: &str = "Source Engine Query";

/// Application id of The Ship, whose info response carries an extra block
pub const THE_SHIP_APP_ID: i16 = 2400;

/// Request discriminants (client to server)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RequestType {
    /// Server info
    ///
    /// # Packet Format
    /// ```text
    /// {FF FF FF FF}{0x54}{"Source Engine Query"}{0x00}
    /// ```
    Info = 0x54,

    /// Player list, requires a challenge
    ///
    /// # Packet Format
    /// ```text
    /// {FF FF FF FF}{0x55}{LONG challenge}
    /// ```
    Players = 0x55,

    /// Server rules (convars), requires a challenge
    ///
    /// # Packet Format
    /// ```text
    /// {FF FF FF FF}{0x56}{LONG challenge}
    /// ```
    Rules = 0x56,

    /// Latency probe
    ///
    /// # Packet Format
    /// ```text
    /// {FF FF FF FF}{0x69}
    /// ```
    Ping = 0x69,
}

impl RequestType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Response tags (server to client)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ResponseType {
    /// `'A'` - challenge token
    Challenge = 0x41,
    /// `'D'` - player list
    Players = 0x44,
    /// `'E'` - rules
    Rules = 0x45,
    /// `'I'` - server info
    Info = 0x49,
    /// `'j'` - ping reply
    Ping = 0x6A,
}

impl ResponseType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(b: u8) -> Option<Self> {
        Some(match b {
            0x41 => ResponseType::Challenge,
            0x44 => ResponseType::Players,
            0x45 => ResponseType::Rules,
            0x49 => ResponseType::Info,
            0x6A => ResponseType::Ping,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_tags_are_ascii() {
        assert_eq!(ResponseType::Info.as_u8(), b'I');
        assert_eq!(ResponseType::Players.as_u8(), b'D');
        assert_eq!(ResponseType::Rules.as_u8(), b'E');
        assert_eq!(ResponseType::Challenge.as_u8(), b'A');
        assert_eq!(ResponseType::from_u8(b'j'), Some(ResponseType::Ping));
        assert_eq!(ResponseType::from_u8(b'Z'), None);
    }
}
