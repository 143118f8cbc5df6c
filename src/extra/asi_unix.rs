//! ASi Unix extra field (header ID 0x756E).
//!
//! Layout: `CRC32(rest) | mode:u16 | sizdev:u32 | uid:u16 | gid:u16 | link[..]`.
//! The CRC32 covers every byte *after* the CRC32 field itself.

use crate::error::{Result, ZipError};

pub const HEADER_ID: u16 = 0x756e;

const S_IFMT: u16 = 0xF000;
const S_IFLNK: u16 = 0xA000;
const S_IFDIR: u16 = 0x4000;
const S_IFREG: u16 = 0x8000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsiUnixExtra {
    pub mode: u16,
    pub dev: u32,
    pub uid: u16,
    pub gid: u16,
    pub link: Vec<u8>,
}

impl AsiUnixExtra {
    /// Sets the symlink target. A non-empty target forces `S_IFLNK` into
    /// the mode's file-type bits; clearing it restores `S_IFDIR`/`S_IFREG`
    /// depending on whatever type bits were set before — this is the
    /// mutation rule spec.md §4.2 calls out for this typed wrapper.
    pub fn set_link(&mut self, link: Vec<u8>, was_directory: bool) {
        if link.is_empty() {
            self.mode = (self.mode & !S_IFMT) | if was_directory { S_IFDIR } else { S_IFREG };
        } else {
            self.mode = (self.mode & !S_IFMT) | S_IFLNK;
        }
        self.link = link;
    }
}

pub fn decode(payload: &[u8]) -> Result<AsiUnixExtra> {
    if payload.len() < 14 {
        return Err(ZipError::InvalidFormat(
            "ASi Unix extra field shorter than fixed part".to_string(),
        ));
    }
    let stored_crc = u32::from_le_bytes(payload[0..4].try_into().unwrap());
    let rest = &payload[4..];
    let actual_crc = crc32fast::hash(rest);
    if actual_crc != stored_crc {
        return Err(ZipError::Crc32Mismatch(format!(
            "ASi Unix extra field: expected CRC32 value 0x{stored_crc:08x}, computed 0x{actual_crc:08x}"
        )));
    }

    let mode = u16::from_le_bytes(rest[0..2].try_into().unwrap());
    let dev = u32::from_le_bytes(rest[2..6].try_into().unwrap());
    let uid = u16::from_le_bytes(rest[6..8].try_into().unwrap());
    let gid = u16::from_le_bytes(rest[8..10].try_into().unwrap());
    let link = rest[10..].to_vec();

    Ok(AsiUnixExtra {
        mode,
        dev,
        uid,
        gid,
        link,
    })
}

pub fn encode(extra: &AsiUnixExtra) -> Vec<u8> {
    let mut rest = Vec::with_capacity(10 + extra.link.len());
    rest.extend_from_slice(&extra.mode.to_le_bytes());
    rest.extend_from_slice(&extra.dev.to_le_bytes());
    rest.extend_from_slice(&extra.uid.to_le_bytes());
    rest.extend_from_slice(&extra.gid.to_le_bytes());
    rest.extend_from_slice(&extra.link);

    let crc = crc32fast::hash(&rest);
    let mut out = Vec::with_capacity(4 + rest.len());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_concrete_scenario() {
        let extra = AsiUnixExtra {
            mode: 0o040755,
            dev: 0,
            uid: 1000,
            gid: 1000,
            link: Vec::new(),
        };
        let payload = encode(&extra);
        assert_eq!(
            payload,
            b"#\x06\\\xF6\xEDA\x00\x00\x00\x00\xE8\x03\xE8\x03".to_vec()
        );
        assert_eq!(decode(&payload).unwrap(), extra);
    }

    #[test]
    fn crc_corruption_is_rejected() {
        let input = b"\x01\x06\\\xF6\xEDA\x00\x00\x00\x00\xE8\x03\xE8\x03";
        let err = decode(input).unwrap_err().to_string();
        assert!(err.contains("expected CRC32 value"), "{err}");
    }

    #[test]
    fn set_link_forces_symlink_bits() {
        let mut extra = AsiUnixExtra {
            mode: 0o040755,
            dev: 0,
            uid: 0,
            gid: 0,
            link: Vec::new(),
        };
        extra.set_link(b"target".to_vec(), true);
        assert_eq!(extra.mode & S_IFMT, S_IFLNK);

        extra.set_link(Vec::new(), true);
        assert_eq!(extra.mode & S_IFMT, S_IFDIR);
    }
}
