//! Server info response decoding
//!
//! # Packet Format
//! ```text
//! {0x49 'I'}{BYTE protocol}
//! {STRING name}{STRING map}{STRING folder}{STRING game}
//! {SHORT app_id}{BYTE players}{BYTE max_players}{BYTE bots}
//! {BYTE server_type}{BYTE environment}{BYTE visibility}{BYTE vac}
//! [{BYTE mode}{BYTE witnesses}{BYTE duration}]      -- only if app_id == 2400
//! {STRING version}{BYTE edf}
//! [{SHORT port}]                                    -- edf & 0x80
//! [{LONG LONG steam_id}]                            -- edf & 0x10
//! [{SHORT spectator_port}{STRING spectator_name}]   -- edf & 0x40
//! [{STRING keywords}]                               -- edf & 0x20
//! [{LONG LONG game_id}]                             -- edf & 0x01
//! ```

use bytes::Bytes;
use serde::Serialize;
use srcquery_core::{Environment, QueryError, Result, ServerType};

use crate::codecs::*;
use crate::packets::{ResponseType, THE_SHIP_APP_ID};

/// Extra data flag: game port follows
pub const EDF_PORT: u8 = 0x80;
/// Extra data flag: server steam id follows
pub const EDF_STEAM_ID: u8 = 0x10;
/// Extra data flag: spectator (SourceTV) port and name follow
pub const EDF_SOURCE_TV: u8 = 0x40;
/// Extra data flag: keyword string follows
pub const EDF_KEYWORDS: u8 = 0x20;
/// Extra data flag: 64-bit game id follows
pub const EDF_GAME_ID: u8 = 0x01;

/// The Ship specific block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShipInfo {
    pub mode: u8,
    pub witnesses: u8,
    /// Seconds before a player is arrested while being witnessed
    pub duration: u8,
}

/// Spectator relay advertised by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceTvInfo {
    pub port: u16,
    pub name: String,
}

/// Optional fields selected by the extra data flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtraData {
    pub port: Option<u16>,
    pub steam_id: Option<u64>,
    pub source_tv: Option<SourceTvInfo>,
    pub keywords: Option<String>,
    pub game_id: Option<u64>,
}

/// Decoded server info response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: i16,
    pub players: u8,
    pub max_players: u8,
    pub bots: u8,
    pub server_type: ServerType,
    pub environment: Environment,
    /// Password protected
    pub visibility: bool,
    pub vac: bool,
    pub ship: Option<ShipInfo>,
    pub version: String,
    pub extra_data_flags: u8,
    pub extra: ExtraData,
}

impl ServerInfo {
    /// Decode an info response payload (starting at the response tag)
    pub fn decode(payload: Bytes) -> Result<Self> {
        let mut buf = payload;

        let tag = read_byte(&mut buf)?;
        if tag != ResponseType::Info.as_u8() {
            return Err(QueryError::Malformed(format!(
                "expected info response, got tag {:#04x}",
                tag
            )));
        }

        let protocol = read_byte(&mut buf)?;
        let name = read_cstring(&mut buf)?;
        let map = read_cstring(&mut buf)?;
        let folder = read_cstring(&mut buf)?;
        let game = read_cstring(&mut buf)?;

        let app_id = read_short(&mut buf)?;
        let players = read_byte(&mut buf)?;
        let max_players = read_byte(&mut buf)?;
        let bots = read_byte(&mut buf)?;
        let server_type = ServerType::from(read_byte(&mut buf)?);
        let environment = Environment::from(read_byte(&mut buf)?);
        let visibility = read_byte(&mut buf)? != 0;
        let vac = read_byte(&mut buf)? != 0;

        let ship = if app_id == THE_SHIP_APP_ID {
            Some(ShipInfo {
                mode: read_byte(&mut buf)?,
                witnesses: read_byte(&mut buf)?,
                duration: read_byte(&mut buf)?,
            })
        } else {
            None
        };

        let version = read_cstring(&mut buf)?;
        let extra_data_flags = read_byte(&mut buf)?;
        let extra = decode_extra(&mut buf, extra_data_flags)?;

        Ok(Self {
            protocol,
            name,
            map,
            folder,
            game,
            app_id,
            players,
            max_players,
            bots,
            server_type,
            environment,
            visibility,
            vac,
            ship,
            version,
            extra_data_flags,
            extra,
        })
    }
}

// Field order on the wire is fixed and does not follow bit order.
fn decode_extra(buf: &mut Bytes, edf: u8) -> Result<ExtraData> {
    let mut extra = ExtraData::default();

    if edf & EDF_PORT != 0 {
        extra.port = Some(read_ushort(buf)?);
    }
    if edf & EDF_STEAM_ID != 0 {
        extra.steam_id = Some(read_long_long(buf)?);
    }
    if edf & EDF_SOURCE_TV != 0 {
        let port = read_ushort(buf)?;
        let name = read_cstring(buf)?;
        extra.source_tv = Some(SourceTvInfo { port, name });
    }
    if edf & EDF_KEYWORDS != 0 {
        extra.keywords = Some(read_cstring(buf)?);
    }
    if edf & EDF_GAME_ID != 0 {
        extra.game_id = Some(read_long_long(buf)?);
    }

    Ok(extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::{BufMut, BytesMut};

    fn base_payload(app_id: i16) -> BytesMut {
        let mut buf = BytesMut::new();
        buf.put_u8(b'I');
        buf.put_u8(17);
        write_cstring(&mut buf, "My Server");
        write_cstring(&mut buf, "de_dust2");
        write_cstring(&mut buf, "cstrike");
        write_cstring(&mut buf, "Counter-Strike: Source");
        buf.put_i16_le(app_id);
        buf.put_u8(12);
        buf.put_u8(24);
        buf.put_u8(2);
        buf.put_u8(b'd');
        buf.put_u8(b'l');
        buf.put_u8(0);
        buf.put_u8(1);
        buf
    }

    #[test]
    fn test_decode_without_extra_data() {
        let mut buf = base_payload(240);
        write_cstring(&mut buf, "1.0.0.70");
        buf.put_u8(0x00);

        let info = ServerInfo::decode(buf.freeze()).unwrap();
        assert_eq!(info.protocol, 17);
        assert_eq!(info.name, "My Server");
        assert_eq!(info.map, "de_dust2");
        assert_eq!(info.folder, "cstrike");
        assert_eq!(info.game, "Counter-Strike: Source");
        assert_eq!(info.app_id, 240);
        assert_eq!(info.players, 12);
        assert_eq!(info.max_players, 24);
        assert_eq!(info.bots, 2);
        assert_eq!(info.server_type, ServerType::Dedicated);
        assert_eq!(info.environment, Environment::Linux);
        assert!(!info.visibility);
        assert!(info.vac);
        assert!(info.ship.is_none());
        assert_eq!(info.version, "1.0.0.70");
        assert_eq!(info.extra, ExtraData::default());
    }

    #[test]
    fn test_decode_all_extra_data() {
        let mut buf = base_payload(240);
        write_cstring(&mut buf, "1.0.0.70");
        buf.put_u8(EDF_PORT | EDF_STEAM_ID | EDF_SOURCE_TV | EDF_KEYWORDS | EDF_GAME_ID);
        buf.put_u16_le(27015);
        buf.put_u64_le(76_561_197_960_287_930);
        buf.put_u16_le(27020);
        write_cstring(&mut buf, "My Relay");
        write_cstring(&mut buf, "alltalk,increased_maxplayers");
        buf.put_u64_le(240);

        let info = ServerInfo::decode(buf.freeze()).unwrap();
        assert_eq!(info.extra.port, Some(27015));
        assert_eq!(info.extra.steam_id, Some(76_561_197_960_287_930));
        assert_eq!(
            info.extra.source_tv,
            Some(SourceTvInfo {
                port: 27020,
                name: "My Relay".to_string()
            })
        );
        assert_eq!(info.extra.keywords.as_deref(), Some("alltalk,increased_maxplayers"));
        assert_eq!(info.extra.game_id, Some(240));
        // The spectator name never overwrites the version
        assert_eq!(info.version, "1.0.0.70");
    }

    #[test]
    fn test_decode_the_ship() {
        let mut buf = base_payload(THE_SHIP_APP_ID);
        buf.put_u8(1);
        buf.put_u8(3);
        buf.put_u8(15);
        write_cstring(&mut buf, "1.0.0.4");
        buf.put_u8(EDF_PORT);
        buf.put_u16_le(27015);

        let info = ServerInfo::decode(buf.freeze()).unwrap();
        assert_eq!(
            info.ship,
            Some(ShipInfo {
                mode: 1,
                witnesses: 3,
                duration: 15
            })
        );
        assert_eq!(info.version, "1.0.0.4");
        assert_eq!(info.extra.port, Some(27015));
    }

    #[test]
    fn test_flagged_field_missing() {
        let mut buf = base_payload(240);
        write_cstring(&mut buf, "1.0.0.70");
        buf.put_u8(EDF_GAME_ID);
        buf.put_u32_le(240);

        assert!(matches!(
            ServerInfo::decode(buf.freeze()).unwrap_err(),
            QueryError::Malformed(_)
        ));
    }

    #[test]
    fn test_wrong_tag() {
        let mut buf = base_payload(240);
        buf[0] = b'm';
        assert!(ServerInfo::decode(buf.freeze()).is_err());
    }

    #[test]
    fn test_truncated_before_edf() {
        let mut buf = base_payload(240);
        write_cstring(&mut buf, "1.0.0.70");
        assert!(ServerInfo::decode(buf.freeze()).is_err());
    }
}
