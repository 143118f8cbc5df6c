//! Central Directory Header (CDH), signature `0x02014B50`: the
//! authoritative per-entry metadata record read during archive parsing
//! and emitted once at the end of the write pipeline (spec.md §4.1).

use crate::error::{Result, ZipError};
use crate::extra::{self, Context};
use crate::model::RawExtraField;

pub const SIGNATURE: u32 = 0x0201_4B50;
const FIXED_LEN: usize = 46;

/// The as-parsed contents of one CDH: 32-bit fields are left exactly as
/// read (sentinel values included) — ZIP64 override decoding is a
/// separate step the caller performs once it knows which slots are
/// sentinels.
#[derive(Debug, Clone)]
pub struct CentralDirectoryHeader {
    pub version_made_by: u16,
    pub version_needed: u16,
    pub gp_flag: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub disk_start: u16,
    pub internal_attrs: u16,
    pub external_attrs: u32,
    pub local_header_offset: u32,
    pub name_raw: Vec<u8>,
    pub extra: Vec<RawExtraField>,
    pub comment: Vec<u8>,
}

/// Parses one CDH starting at `buf[0]`. Returns the header and the
/// number of bytes consumed, so callers can walk a Central Directory
/// blob entry by entry.
pub fn parse(buf: &[u8]) -> Result<(CentralDirectoryHeader, usize)> {
    if buf.len() < FIXED_LEN {
        return Err(ZipError::InvalidFormat(
            "central directory header truncated".to_string(),
        ));
    }
    let sig = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    if sig != SIGNATURE {
        return Err(ZipError::InvalidFormat(
            "central directory header signature mismatch".to_string(),
        ));
    }
    let version_made_by = u16::from_le_bytes(buf[4..6].try_into().unwrap());
    let version_needed = u16::from_le_bytes(buf[6..8].try_into().unwrap());
    let gp_flag = u16::from_le_bytes(buf[8..10].try_into().unwrap());
    let method = u16::from_le_bytes(buf[10..12].try_into().unwrap());
    let mod_time = u16::from_le_bytes(buf[12..14].try_into().unwrap());
    let mod_date = u16::from_le_bytes(buf[14..16].try_into().unwrap());
    let crc32 = u32::from_le_bytes(buf[16..20].try_into().unwrap());
    let compressed_size = u32::from_le_bytes(buf[20..24].try_into().unwrap());
    let uncompressed_size = u32::from_le_bytes(buf[24..28].try_into().unwrap());
    let name_len = u16::from_le_bytes(buf[28..30].try_into().unwrap()) as usize;
    let extra_len = u16::from_le_bytes(buf[30..32].try_into().unwrap()) as usize;
    let comment_len = u16::from_le_bytes(buf[32..34].try_into().unwrap()) as usize;
    let disk_start = u16::from_le_bytes(buf[34..36].try_into().unwrap());
    let internal_attrs = u16::from_le_bytes(buf[36..38].try_into().unwrap());
    let external_attrs = u32::from_le_bytes(buf[38..42].try_into().unwrap());
    let local_header_offset = u32::from_le_bytes(buf[42..46].try_into().unwrap());

    let total_len = FIXED_LEN + name_len + extra_len + comment_len;
    if buf.len() < total_len {
        return Err(ZipError::InvalidFormat(
            "central directory header name/extra/comment past end of buffer".to_string(),
        ));
    }

    let name_raw = buf[FIXED_LEN..FIXED_LEN + name_len].to_vec();
    let extra_blob = &buf[FIXED_LEN + name_len..FIXED_LEN + name_len + extra_len];
    let extra = extra::parse_raw_blob(extra_blob)?;
    let comment_start = FIXED_LEN + name_len + extra_len;
    let comment = buf[comment_start..comment_start + comment_len].to_vec();

    let _ = Context::Central;
    Ok((
        CentralDirectoryHeader {
            version_made_by,
            version_needed,
            gp_flag,
            method,
            mod_time,
            mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            disk_start,
            internal_attrs,
            external_attrs,
            local_header_offset,
            name_raw,
            extra,
            comment,
        },
        total_len,
    ))
}

pub fn write(h: &CentralDirectoryHeader) -> Vec<u8> {
    let extra_blob = extra::encode_raw_blob(&h.extra);
    let mut out = Vec::with_capacity(FIXED_LEN + h.name_raw.len() + extra_blob.len() + h.comment.len());
    out.extend_from_slice(&SIGNATURE.to_le_bytes());
    out.extend_from_slice(&h.version_made_by.to_le_bytes());
    out.extend_from_slice(&h.version_needed.to_le_bytes());
    out.extend_from_slice(&h.gp_flag.to_le_bytes());
    out.extend_from_slice(&h.method.to_le_bytes());
    out.extend_from_slice(&h.mod_time.to_le_bytes());
    out.extend_from_slice(&h.mod_date.to_le_bytes());
    out.extend_from_slice(&h.crc32.to_le_bytes());
    out.extend_from_slice(&h.compressed_size.to_le_bytes());
    out.extend_from_slice(&h.uncompressed_size.to_le_bytes());
    out.extend_from_slice(&(h.name_raw.len() as u16).to_le_bytes());
    out.extend_from_slice(&(extra_blob.len() as u16).to_le_bytes());
    out.extend_from_slice(&(h.comment.len() as u16).to_le_bytes());
    out.extend_from_slice(&h.disk_start.to_le_bytes());
    out.extend_from_slice(&h.internal_attrs.to_le_bytes());
    out.extend_from_slice(&h.external_attrs.to_le_bytes());
    out.extend_from_slice(&h.local_header_offset.to_le_bytes());
    out.extend_from_slice(&h.name_raw);
    out.extend_from_slice(&extra_blob);
    out.extend_from_slice(&h.comment);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CentralDirectoryHeader {
        CentralDirectoryHeader {
            version_made_by: 0x0314,
            version_needed: 20,
            gp_flag: 0,
            method: 8,
            mod_time: 0,
            mod_date: 0,
            crc32: 0xDEAD_BEEF,
            compressed_size: 100,
            uncompressed_size: 200,
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: 0,
            local_header_offset: 0,
            name_raw: b"hello.txt".to_vec(),
            extra: Vec::new(),
            comment: Vec::new(),
        }
    }

    #[test]
    fn roundtrip() {
        let h = sample();
        let bytes = write(&h);
        let (parsed, consumed) = parse(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed.crc32, h.crc32);
        assert_eq!(parsed.name_raw, h.name_raw);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut bytes = write(&sample());
        bytes[0] = 0;
        assert!(parse(&bytes).is_err());
    }
}
