//! NTFS extra field (header ID 0x000A): `reserved:u32 | tag1=1:u16 |
//! size1=24:u16 | mtime:u64 | atime:u64 | ctime:u64`, each timestamp in
//! 100-ns ticks since 1601-01-01.

use crate::error::{Result, ZipError};

pub const HEADER_ID: u16 = 0x000a;
const ATTR_TAG_TIMESTAMPS: u16 = 1;
const ATTR_TAG_SIZE: u16 = 24;

/// Ticks (100 ns) between 1601-01-01 and 1970-01-01.
const UNIX_EPOCH_TICKS: i64 = 116_444_736_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NtfsExtra {
    pub mtime_ticks: u64,
    pub atime_ticks: u64,
    pub ctime_ticks: u64,
}

impl NtfsExtra {
    pub fn from_unix_seconds(mtime: i64, atime: i64, ctime: i64) -> Self {
        NtfsExtra {
            mtime_ticks: unix_seconds_to_ticks(mtime),
            atime_ticks: unix_seconds_to_ticks(atime),
            ctime_ticks: unix_seconds_to_ticks(ctime),
        }
    }

    pub fn mtime_unix_seconds(&self) -> i64 {
        ticks_to_unix_seconds(self.mtime_ticks)
    }

    pub fn atime_unix_seconds(&self) -> i64 {
        ticks_to_unix_seconds(self.atime_ticks)
    }

    pub fn ctime_unix_seconds(&self) -> i64 {
        ticks_to_unix_seconds(self.ctime_ticks)
    }
}

fn unix_seconds_to_ticks(secs: i64) -> u64 {
    (secs * 10_000_000 + UNIX_EPOCH_TICKS).max(0) as u64
}

fn ticks_to_unix_seconds(ticks: u64) -> i64 {
    (ticks as i64 - UNIX_EPOCH_TICKS) / 10_000_000
}

pub fn decode(payload: &[u8]) -> Result<NtfsExtra> {
    if payload.len() < 4 + 4 + 24 {
        return Err(ZipError::InvalidFormat(
            "NTFS extra field too short".to_string(),
        ));
    }
    let tag1 = u16::from_le_bytes(payload[4..6].try_into().unwrap());
    let size1 = u16::from_le_bytes(payload[6..8].try_into().unwrap());
    if tag1 != ATTR_TAG_TIMESTAMPS || size1 != ATTR_TAG_SIZE {
        return Err(ZipError::InvalidFormat(
            "NTFS extra field: unexpected attribute tag/size".to_string(),
        ));
    }
    let mtime_ticks = u64::from_le_bytes(payload[8..16].try_into().unwrap());
    let atime_ticks = u64::from_le_bytes(payload[16..24].try_into().unwrap());
    let ctime_ticks = u64::from_le_bytes(payload[24..32].try_into().unwrap());
    Ok(NtfsExtra {
        mtime_ticks,
        atime_ticks,
        ctime_ticks,
    })
}

pub fn encode(extra: &NtfsExtra) -> Vec<u8> {
    let mut out = Vec::with_capacity(32);
    out.extend_from_slice(&0u32.to_le_bytes()); // reserved
    out.extend_from_slice(&ATTR_TAG_TIMESTAMPS.to_le_bytes());
    out.extend_from_slice(&ATTR_TAG_SIZE.to_le_bytes());
    out.extend_from_slice(&extra.mtime_ticks.to_le_bytes());
    out.extend_from_slice(&extra.atime_ticks.to_le_bytes());
    out.extend_from_slice(&extra.ctime_ticks.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let extra = NtfsExtra::from_unix_seconds(1_700_000_000, 1_700_000_100, 1_699_000_000);
        let payload = encode(&extra);
        let decoded = decode(&payload).unwrap();
        assert_eq!(decoded, extra);
        assert_eq!(decoded.mtime_unix_seconds(), 1_700_000_000);
    }
}
