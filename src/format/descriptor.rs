//! Data descriptor (spec.md §4.6 step 6): the post-payload record
//! carrying CRC-32 and sizes when they weren't known at LFH-write time.
//! Always written with its optional signature `0x08074B50` — PKWARE
//! recommends it and every major implementation expects it.

pub const SIGNATURE: u32 = 0x0807_4B50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDescriptor {
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
}

/// Serializes the descriptor. `zip64` selects 8-byte size fields
/// (required once either size exceeds the 32-bit range).
pub fn write(d: &DataDescriptor, zip64: bool) -> Vec<u8> {
    let mut out = Vec::with_capacity(if zip64 { 24 } else { 16 });
    out.extend_from_slice(&SIGNATURE.to_le_bytes());
    out.extend_from_slice(&d.crc32.to_le_bytes());
    if zip64 {
        out.extend_from_slice(&d.compressed_size.to_le_bytes());
        out.extend_from_slice(&d.uncompressed_size.to_le_bytes());
    } else {
        out.extend_from_slice(&(d.compressed_size as u32).to_le_bytes());
        out.extend_from_slice(&(d.uncompressed_size as u32).to_le_bytes());
    }
    out
}

/// Parses a descriptor of known `zip64`-ness from `buf[0]`, tolerating
/// the optional leading signature.
pub fn parse(buf: &[u8], zip64: bool) -> crate::error::Result<(DataDescriptor, usize)> {
    use crate::error::ZipError;

    let has_sig = buf.len() >= 4 && u32::from_le_bytes(buf[0..4].try_into().unwrap()) == SIGNATURE;
    let start = if has_sig { 4 } else { 0 };
    let field_width = if zip64 { 8 } else { 4 };
    let total = start + 4 + field_width * 2;
    if buf.len() < total {
        return Err(ZipError::InvalidFormat(
            "data descriptor truncated".to_string(),
        ));
    }
    let crc32 = u32::from_le_bytes(buf[start..start + 4].try_into().unwrap());
    let (compressed_size, uncompressed_size) = if zip64 {
        (
            u64::from_le_bytes(buf[start + 4..start + 12].try_into().unwrap()),
            u64::from_le_bytes(buf[start + 12..start + 20].try_into().unwrap()),
        )
    } else {
        (
            u32::from_le_bytes(buf[start + 4..start + 8].try_into().unwrap()) as u64,
            u32::from_le_bytes(buf[start + 8..start + 12].try_into().unwrap()) as u64,
        )
    };
    Ok((
        DataDescriptor {
            crc32,
            compressed_size,
            uncompressed_size,
        },
        total,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_32bit() {
        let d = DataDescriptor {
            crc32: 0x1234,
            compressed_size: 100,
            uncompressed_size: 200,
        };
        let bytes = write(&d, false);
        assert_eq!(bytes.len(), 16);
        let (parsed, consumed) = parse(&bytes, false).unwrap();
        assert_eq!(parsed, d);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn roundtrip_zip64() {
        let d = DataDescriptor {
            crc32: 0xABCD,
            compressed_size: 5_000_000_000,
            uncompressed_size: 6_000_000_000,
        };
        let bytes = write(&d, true);
        assert_eq!(bytes.len(), 24);
        let (parsed, _) = parse(&bytes, true).unwrap();
        assert_eq!(parsed, d);
    }
}
