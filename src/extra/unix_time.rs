//! Info-ZIP Unix timestamp/ownership extra fields.
//!
//! - `0x5455` Extended Timestamp: `flags:u8` then whichever of
//!   mtime/atime/ctime (each `i32`, seconds since epoch) the flag bits
//!   select are present (bit 0 = mtime, bit 1 = atime, bit 2 = ctime).
//!   Central-directory copies conventionally carry only mtime.
//! - `0x7875` Info-ZIP Unix (new, variable-width uid/gid).
//! - `0x5855` Info-ZIP Unix (old, fixed-width atime/mtime/uid/gid).

use crate::error::{Result, ZipError};

pub const EXT_TIMESTAMP_ID: u16 = 0x5455;
pub const UNIX_N_ID: u16 = 0x7875;
pub const OLD_UNIX_ID: u16 = 0x5855;

pub mod flags {
    pub const MTIME: u8 = 1 << 0;
    pub const ATIME: u8 = 1 << 1;
    pub const CTIME: u8 = 1 << 2;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtTimestamp {
    pub mtime: Option<i32>,
    pub atime: Option<i32>,
    pub ctime: Option<i32>,
}

pub fn decode_ext_timestamp(payload: &[u8]) -> Result<ExtTimestamp> {
    if payload.is_empty() {
        return Err(ZipError::InvalidFormat(
            "extended timestamp extra field is empty".to_string(),
        ));
    }
    let flag_byte = payload[0];
    let mut cursor = 1usize;
    let mut take = || -> Result<i32> {
        if cursor + 4 > payload.len() {
            return Err(ZipError::InvalidFormat(
                "extended timestamp extra field truncated".to_string(),
            ));
        }
        let v = i32::from_le_bytes(payload[cursor..cursor + 4].try_into().unwrap());
        cursor += 4;
        Ok(v)
    };

    let mut out = ExtTimestamp::default();
    if flag_byte & flags::MTIME != 0 {
        out.mtime = Some(take()?);
    }
    if flag_byte & flags::ATIME != 0 && cursor < payload.len() {
        out.atime = Some(take()?);
    }
    if flag_byte & flags::CTIME != 0 && cursor < payload.len() {
        out.ctime = Some(take()?);
    }
    Ok(out)
}

pub fn encode_ext_timestamp(ts: &ExtTimestamp, local: bool) -> Vec<u8> {
    let mut flag_byte = 0u8;
    if ts.mtime.is_some() {
        flag_byte |= flags::MTIME;
    }
    if ts.atime.is_some() {
        flag_byte |= flags::ATIME;
    }
    if ts.ctime.is_some() {
        flag_byte |= flags::CTIME;
    }
    let mut out = vec![flag_byte];
    if let Some(v) = ts.mtime {
        out.extend_from_slice(&v.to_le_bytes());
    }
    // Central-directory copies conventionally carry only mtime.
    if local {
        if let Some(v) = ts.atime {
            out.extend_from_slice(&v.to_le_bytes());
        }
        if let Some(v) = ts.ctime {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnixNExtra {
    pub version: u8,
    pub uid: u64,
    pub gid: u64,
}

pub fn decode_unix_n(payload: &[u8]) -> Result<UnixNExtra> {
    if payload.len() < 3 {
        return Err(ZipError::InvalidFormat(
            "Info-ZIP UnixN extra field too short".to_string(),
        ));
    }
    let version = payload[0];
    let uid_size = payload[1] as usize;
    let mut cursor = 2usize;
    if cursor + uid_size > payload.len() {
        return Err(ZipError::InvalidFormat(
            "Info-ZIP UnixN extra field: uid overruns payload".to_string(),
        ));
    }
    let uid = le_bytes_to_u64(&payload[cursor..cursor + uid_size]);
    cursor += uid_size;

    if cursor >= payload.len() {
        return Err(ZipError::InvalidFormat(
            "Info-ZIP UnixN extra field missing gid size".to_string(),
        ));
    }
    let gid_size = payload[cursor] as usize;
    cursor += 1;
    if cursor + gid_size > payload.len() {
        return Err(ZipError::InvalidFormat(
            "Info-ZIP UnixN extra field: gid overruns payload".to_string(),
        ));
    }
    let gid = le_bytes_to_u64(&payload[cursor..cursor + gid_size]);

    Ok(UnixNExtra { version, uid, gid })
}

pub fn encode_unix_n(extra: &UnixNExtra) -> Vec<u8> {
    let uid_bytes = extra.uid.to_le_bytes();
    let gid_bytes = extra.gid.to_le_bytes();
    let mut out = vec![extra.version, 4];
    out.extend_from_slice(&uid_bytes[..4]);
    out.push(4);
    out.extend_from_slice(&gid_bytes[..4]);
    out
}

fn le_bytes_to_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..bytes.len().min(8)].copy_from_slice(&bytes[..bytes.len().min(8)]);
    u64::from_le_bytes(buf)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OldUnixExtra {
    pub atime: u32,
    pub mtime: u32,
    pub uid: Option<u16>,
    pub gid: Option<u16>,
}

pub fn decode_old_unix(payload: &[u8]) -> Result<OldUnixExtra> {
    if payload.len() != 0 && payload.len() != 8 && payload.len() != 12 {
        return Err(ZipError::InvalidFormat(format!(
            "old Info-ZIP Unix extra field has unexpected length {}",
            payload.len()
        )));
    }
    if payload.is_empty() {
        return Ok(OldUnixExtra {
            atime: 0,
            mtime: 0,
            uid: None,
            gid: None,
        });
    }
    let atime = u32::from_le_bytes(payload[0..4].try_into().unwrap());
    let mtime = u32::from_le_bytes(payload[4..8].try_into().unwrap());
    let (uid, gid) = if payload.len() == 12 {
        (
            Some(u16::from_le_bytes(payload[8..10].try_into().unwrap())),
            Some(u16::from_le_bytes(payload[10..12].try_into().unwrap())),
        )
    } else {
        (None, None)
    };
    Ok(OldUnixExtra {
        atime,
        mtime,
        uid,
        gid,
    })
}

pub fn encode_old_unix(extra: &OldUnixExtra) -> Vec<u8> {
    let mut out = Vec::with_capacity(12);
    out.extend_from_slice(&extra.atime.to_le_bytes());
    out.extend_from_slice(&extra.mtime.to_le_bytes());
    if let (Some(uid), Some(gid)) = (extra.uid, extra.gid) {
        out.extend_from_slice(&uid.to_le_bytes());
        out.extend_from_slice(&gid.to_le_bytes());
    }
    out
}
