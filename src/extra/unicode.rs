//! Info-ZIP Unicode Path (0x7075) / Unicode Comment (0x6375) extra fields.
//!
//! Layout: `version:u8(=1) | crc32:u32 | utf8_bytes[..]`. The CRC32 guards
//! against a stale Unicode field surviving an edit to the non-Unicode
//! name/comment it shadows — on decode we only expose it; the write path
//! recomputes it against the current name/comment.

use crate::error::{Result, ZipError};

pub const UNICODE_PATH_ID: u16 = 0x7075;
pub const UNICODE_COMMENT_ID: u16 = 0x6375;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnicodeExtra {
    pub version: u8,
    pub crc32_of_original: u32,
    pub unicode_bytes: Vec<u8>,
}

pub fn decode(payload: &[u8]) -> Result<UnicodeExtra> {
    if payload.len() < 5 {
        return Err(ZipError::InvalidFormat(
            "Unicode extra field too short".to_string(),
        ));
    }
    Ok(UnicodeExtra {
        version: payload[0],
        crc32_of_original: u32::from_le_bytes(payload[1..5].try_into().unwrap()),
        unicode_bytes: payload[5..].to_vec(),
    })
}

pub fn encode(extra: &UnicodeExtra) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + extra.unicode_bytes.len());
    out.push(extra.version);
    out.extend_from_slice(&extra.crc32_of_original.to_le_bytes());
    out.extend_from_slice(&extra.unicode_bytes);
    out
}

/// Builds a Unicode extra field for `unicode_name`, guarded by the CRC32
/// of `original_bytes` (the non-Unicode name/comment it shadows).
pub fn build(original_bytes: &[u8], unicode_name: &str) -> UnicodeExtra {
    UnicodeExtra {
        version: 1,
        crc32_of_original: crc32fast::hash(original_bytes),
        unicode_bytes: unicode_name.as_bytes().to_vec(),
    }
}

/// `true` if this Unicode extra still matches `original_bytes` — a
/// mismatch means the field is stale (the name/comment it shadows was
/// edited without refreshing it) and should be dropped rather than used.
pub fn is_current(extra: &UnicodeExtra, original_bytes: &[u8]) -> bool {
    extra.crc32_of_original == crc32fast::hash(original_bytes)
}
