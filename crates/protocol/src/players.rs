//! Player list response decoding
//!
//! # Packet Format
//! ```text
//! {0x44 'D'}{BYTE count}
//! count * {BYTE index}{STRING name}{LONG score}{FLOAT duration}
//! ```

use bytes::{Buf, Bytes};
use serde::Serialize;
use srcquery_core::{QueryError, Result};
use std::time::Duration;

use crate::codecs::*;
use crate::packets::ResponseType;

/// Conservative lower bound on the size of one player entry
pub const MIN_PLAYER_SIZE: usize = 9;

/// One connected player
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    /// Index in the server's player list
    pub index: u8,
    pub name: String,
    /// Score as defined by the game, usually kills
    pub score: i32,
    /// Time connected to the server
    pub duration: Duration,
}

/// Convert a float seconds value into a duration
///
/// Widened to f64 before scaling to nanoseconds to lose as little precision
/// as possible. Negative or non-finite values (bots often report garbage)
/// become zero.
pub fn duration_from_secs(secs: f32) -> Duration {
    Duration::try_from_secs_f64(f64::from(secs)).unwrap_or_default()
}

/// Decode a player list payload (starting at the response tag)
pub fn decode_players(payload: Bytes) -> Result<Vec<Player>> {
    let mut buf = payload;

    let tag = read_byte(&mut buf)?;
    if tag != ResponseType::Players.as_u8() {
        return Err(QueryError::Malformed(format!(
            "expected players response, got tag {:#04x}",
            tag
        )));
    }

    let count = read_byte(&mut buf)?;
    if buf.remaining() < MIN_PLAYER_SIZE * usize::from(count) {
        return Err(QueryError::MissingPlayers {
            declared: count,
            available: buf.remaining() / MIN_PLAYER_SIZE,
        });
    }

    let mut players = Vec::with_capacity(usize::from(count));
    for _ in 0..count {
        let index = read_byte(&mut buf)?;
        let name = read_cstring(&mut buf)?;
        let score = read_long(&mut buf)?;
        let duration = duration_from_secs(read_float(&mut buf)?);
        players.push(Player {
            index,
            name,
            score,
            duration,
        });
    }

    Ok(players)
}
