//! ZIP64 extended information extra field (header ID 0x0001).
//!
//! Unlike the other typed extras, this field's payload shape depends on
//! *which* 32-bit header slots were sentinel (`0xFFFFFFFF`/`0xFFFF`) —
//! only the overflowing fields are present, always in the fixed order
//! uncompressed size, compressed size, local header offset, disk number
//! (spec.md §4.1). Decoding therefore takes the sentinel flags observed
//! in the surrounding header rather than being dispatched generically.

use crate::error::{Result, ZipError};

pub const HEADER_ID: u16 = 0x0001;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Zip64Extra {
    pub uncompressed_size: Option<u64>,
    pub compressed_size: Option<u64>,
    pub local_header_offset: Option<u64>,
    pub disk_start: Option<u32>,
}

/// Which 32-bit slots in the enclosing header were sentinel values and
/// therefore must be present, in canonical order, in this payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct Zip64Need {
    pub uncompressed_size: bool,
    pub compressed_size: bool,
    pub local_header_offset: bool,
    pub disk_start: bool,
}

pub fn decode(payload: &[u8], need: Zip64Need) -> Result<Zip64Extra> {
    let mut cursor = 0usize;
    let mut take_u64 = || -> Result<u64> {
        if cursor + 8 > payload.len() {
            return Err(ZipError::InvalidFormat(
                "ZIP64 extra field too short for declared sentinel fields".to_string(),
            ));
        }
        let v = u64::from_le_bytes(payload[cursor..cursor + 8].try_into().unwrap());
        cursor += 8;
        Ok(v)
    };

    let mut out = Zip64Extra::default();
    if need.uncompressed_size {
        out.uncompressed_size = Some(take_u64()?);
    }
    if need.compressed_size {
        out.compressed_size = Some(take_u64()?);
    }
    if need.local_header_offset {
        out.local_header_offset = Some(take_u64()?);
    }
    if need.disk_start {
        if cursor + 4 > payload.len() {
            return Err(ZipError::InvalidFormat(
                "ZIP64 extra field too short for disk start".to_string(),
            ));
        }
        out.disk_start = Some(u32::from_le_bytes(
            payload[cursor..cursor + 4].try_into().unwrap(),
        ));
        cursor += 4;
    }
    Ok(out)
}

pub fn encode(extra: &Zip64Extra) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(v) = extra.uncompressed_size {
        out.extend_from_slice(&v.to_le_bytes());
    }
    if let Some(v) = extra.compressed_size {
        out.extend_from_slice(&v.to_le_bytes());
    }
    if let Some(v) = extra.local_header_offset {
        out.extend_from_slice(&v.to_le_bytes());
    }
    if let Some(v) = extra.disk_start {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}
