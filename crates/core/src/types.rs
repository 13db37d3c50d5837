//! Wire-level enum types

use serde::{Deserialize, Serialize};

/// Kind of server answering an info query.
///
/// Servers send the discriminant as an ASCII letter; older builds use upper
/// case, newer ones lower case, so both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerType {
    Dedicated,
    /// Non-dedicated (listen) server
    Listen,
    SourceTv,
    Unknown(u8),
}

impl From<u8> for ServerType {
    fn from(b: u8) -> Self {
        match b.to_ascii_lowercase() {
            b'd' => ServerType::Dedicated,
            b'l' => ServerType::Listen,
            b'p' => ServerType::SourceTv,
            _ => ServerType::Unknown(b),
        }
    }
}

/// Operating system the server runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Environment {
    Linux,
    Windows,
    Mac,
    Unknown(u8),
}

impl From<u8> for Environment {
    fn from(b: u8) -> Self {
        match b.to_ascii_lowercase() {
            b'l' => Environment::Linux,
            b'w' => Environment::Windows,
            b'm' | b'o' => Environment::Mac,
            _ => Environment::Unknown(b),
        }
    }
}

/// Region code sent to the master server.
///
/// The master treats this as an opaque byte; no filtering semantics are
/// applied client-side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Region {
    USEast = 0x00,
    USWest = 0x01,
    SouthAmerica = 0x02,
    Europe = 0x03,
    Asia = 0x04,
    Australia = 0x05,
    MiddleEast = 0x06,
    Africa = 0x07,
    RestOfWorld = 0xFF,
}

impl Region {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x00 => Region::USEast,
            0x01 => Region::USWest,
            0x02 => Region::SouthAmerica,
            0x03 => Region::Europe,
            0x04 => Region::Asia,
            0x05 => Region::Australia,
            0x06 => Region::MiddleEast,
            0x07 => Region::Africa,
            0xFF => Region::RestOfWorld,
            _ => return None,
        })
    }

    /// Parse a region from its name (case-insensitive, `_`/`-` ignored) or numeric code.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| *c != '_' && *c != '-' && !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "useast" => Some(Region::USEast),
            "uswest" => Some(Region::USWest),
            "southamerica" => Some(Region::SouthAmerica),
            "europe" => Some(Region::Europe),
            "asia" => Some(Region::Asia),
            "australia" => Some(Region::Australia),
            "middleeast" => Some(Region::MiddleEast),
            "africa" => Some(Region::Africa),
            "restofworld" | "world" => Some(Region::RestOfWorld),
            other => other.parse::<u8>().ok().and_then(Region::from_code),
        }
    }
}

impl Default for Region {
    fn default() -> Self {
        Region::USWest
    }
}
