//! Local File Header (LFH), signature `0x04034B50`: written immediately
//! before each entry's payload and re-read lazily when content is
//! requested (spec.md §4.1).

use crate::error::{Result, ZipError};
use crate::extra::{self, Context};
use crate::model::RawExtraField;

pub const SIGNATURE: u32 = 0x0403_4B50;
const FIXED_LEN: usize = 30;

#[derive(Debug, Clone)]
pub struct LocalFileHeader {
    pub version_needed: u16,
    pub gp_flag: u16,
    pub method: u16,
    pub mod_time: u16,
    pub mod_date: u16,
    pub crc32: u32,
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub name_raw: Vec<u8>,
    pub extra: Vec<RawExtraField>,
}

/// Parses the fixed part + name + extra of an LFH starting at `buf[0]`.
/// (The payload itself is not part of this struct — callers read it
/// separately once they know `compressed_size`.)
pub fn parse(buf: &[u8]) -> Result<(LocalFileHeader, usize)> {
    if buf.len() < FIXED_LEN {
        return Err(ZipError::InvalidFormat(
            "local file header truncated".to_string(),
        ));
    }
    let sig = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    if sig != SIGNATURE {
        return Err(ZipError::InvalidFormat(
            "local file header signature mismatch".to_string(),
        ));
    }
    let version_needed = u16::from_le_bytes(buf[4..6].try_into().unwrap());
    let gp_flag = u16::from_le_bytes(buf[6..8].try_into().unwrap());
    let method = u16::from_le_bytes(buf[8..10].try_into().unwrap());
    let mod_time = u16::from_le_bytes(buf[10..12].try_into().unwrap());
    let mod_date = u16::from_le_bytes(buf[12..14].try_into().unwrap());
    let crc32 = u32::from_le_bytes(buf[14..18].try_into().unwrap());
    let compressed_size = u32::from_le_bytes(buf[18..22].try_into().unwrap());
    let uncompressed_size = u32::from_le_bytes(buf[22..26].try_into().unwrap());
    let name_len = u16::from_le_bytes(buf[26..28].try_into().unwrap()) as usize;
    let extra_len = u16::from_le_bytes(buf[28..30].try_into().unwrap()) as usize;

    let total_len = FIXED_LEN + name_len + extra_len;
    if buf.len() < total_len {
        return Err(ZipError::InvalidFormat(
            "local file header name/extra past end of buffer".to_string(),
        ));
    }
    let name_raw = buf[FIXED_LEN..FIXED_LEN + name_len].to_vec();
    let extra_blob = &buf[FIXED_LEN + name_len..total_len];
    let extra = extra::parse_raw_blob(extra_blob)?;
    let _ = Context::Local;

    Ok((
        LocalFileHeader {
            version_needed,
            gp_flag,
            method,
            mod_time,
            mod_date,
            crc32,
            compressed_size,
            uncompressed_size,
            name_raw,
            extra,
        },
        total_len,
    ))
}

pub fn write(h: &LocalFileHeader) -> Vec<u8> {
    let extra_blob = extra::encode_raw_blob(&h.extra);
    let mut out = Vec::with_capacity(FIXED_LEN + h.name_raw.len() + extra_blob.len());
    out.extend_from_slice(&SIGNATURE.to_le_bytes());
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
    out.extend_from_slice(&h.name_raw);
    out.extend_from_slice(&extra_blob);
    out
}

/// `true` if the data-descriptor bit (GP bit 3) is set, meaning CRC and
/// sizes in this header are placeholders (spec.md §3.1).
pub fn uses_data_descriptor(h: &LocalFileHeader) -> bool {
    h.gp_flag & crate::model::gp_flag::DATA_DESCRIPTOR != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> LocalFileHeader {
        LocalFileHeader {
            version_needed: 20,
            gp_flag: 0,
            method: 0,
            mod_time: 0,
            mod_date: 0,
            crc32: 42,
            compressed_size: 10,
            uncompressed_size: 10,
            name_raw: b"a.txt".to_vec(),
            extra: Vec::new(),
        }
    }

    #[test]
    fn roundtrip() {
        let h = sample();
        let bytes = write(&h);
        let (parsed, consumed) = parse(&bytes).unwrap();
        assert_eq!(consumed, bytes.len());
        assert_eq!(parsed.crc32, 42);
        assert_eq!(parsed.name_raw, b"a.txt");
    }

    #[test]
    fn data_descriptor_flag_detected() {
        let mut h = sample();
        h.gp_flag |= crate::model::gp_flag::DATA_DESCRIPTOR;
        let bytes = write(&h);
        let (parsed, _) = parse(&bytes).unwrap();
        assert!(uses_data_descriptor(&parsed));
    }
}
