//! Rules (server convars) response decoding
//!
//! # Packet Format
//! ```text
//! {0x45 'E'}{SHORT count}
//! count * {STRING name}{STRING value}
//! ```
//!
//! Names are not guaranteed unique. The decoder returns every pair in wire
//! order; [`into_map`] builds a map under an explicit collision policy.

use bytes::Bytes;
use serde::Serialize;
use srcquery_core::{QueryError, Result};
use std::collections::HashMap;

use crate::codecs::*;
use crate::packets::ResponseType;

/// One server rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rule {
    pub name: String,
    pub value: String,
}

/// Which value wins when a rule name appears more than once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionPolicy {
    FirstWins,
    LastWins,
}

/// Decode a rules payload (starting at the response tag)
pub fn decode_rules(payload: Bytes) -> Result<Vec<Rule>> {
    let mut buf = payload;

    let tag = read_byte(&mut buf)?;
    if tag != ResponseType::Rules.as_u8() {
        return Err(QueryError::Malformed(format!(
            "expected rules response, got tag {:#04x}",
            tag
        )));
    }

    let count = read_short(&mut buf)?;
    let count = usize::try_from(count)
        .map_err(|_| QueryError::Malformed(format!("negative rule count {}", count)))?;

    let mut rules = Vec::with_capacity(count.min(buf.len() / 2));
    for _ in 0..count {
        let name = read_cstring(&mut buf)?;
        let value = read_cstring(&mut buf)?;
        rules.push(Rule { name, value });
    }

    Ok(rules)
}

/// Collapse a rule sequence into a map
pub fn into_map(rules: Vec<Rule>, policy: CollisionPolicy) -> HashMap<String, String> {
    let mut map = HashMap::with_capacity(rules.len());
    for rule in rules {
        match policy {
            CollisionPolicy::FirstWins => {
                map.entry(rule.name).or_insert(rule.value);
            }
            CollisionPolicy::LastWins => {
                map.insert(rule.name, rule.value);
            }
        }
    }
    map
}
