//! Extra-Field Registry (C2): typed encode/decode of polymorphic extra
//! fields keyed by 16-bit header ID (spec.md §3.3, §4.2).
//!
//! `ZipEntry` keeps extras as raw `(headerId, payload)` pairs
//! (`model::RawExtraField`), separately for local and central headers, so
//! unknown IDs and local/central divergence round-trip untouched. Typed
//! decoding happens on demand through [`decode`] (and, for the
//! context-dependent ZIP64 field, [`zip64::decode`] directly).

pub mod aes;
pub mod asi_unix;
pub mod misc;
pub mod ntfs;
pub mod unicode;
pub mod unix_time;
pub mod zip64;

use crate::error::Result;
use crate::model::RawExtraField;

/// Whether an extra field was read from a Local File Header or a
/// Central Directory Header — some typed fields (ZIP64, extended
/// timestamp) differ in shape between the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    Local,
    Central,
}

/// A typed extra field. The ZIP64 extended info field (0x0001) is
/// deliberately absent here: its payload shape depends on which 32-bit
/// header slots were sentinel values, so it's decoded directly via
/// [`zip64::decode`] by the container codec, which has that context.
#[derive(Debug, Clone)]
pub enum ExtraField {
    Aes(aes::AesExtra),
    Ntfs(ntfs::NtfsExtra),
    ExtTimestamp(unix_time::ExtTimestamp),
    UnixN(unix_time::UnixNExtra),
    OldUnix(unix_time::OldUnixExtra),
    AsiUnix(asi_unix::AsiUnixExtra),
    UnicodePath(unicode::UnicodeExtra),
    UnicodeComment(unicode::UnicodeExtra),
    JarMarker,
    Alignment(Vec<u8>),
    Unknown(u16, Vec<u8>),
}

impl ExtraField {
    pub fn header_id(&self) -> u16 {
        match self {
            ExtraField::Aes(_) => aes::HEADER_ID,
            ExtraField::Ntfs(_) => ntfs::HEADER_ID,
            ExtraField::ExtTimestamp(_) => unix_time::EXT_TIMESTAMP_ID,
            ExtraField::UnixN(_) => unix_time::UNIX_N_ID,
            ExtraField::OldUnix(_) => unix_time::OLD_UNIX_ID,
            ExtraField::AsiUnix(_) => asi_unix::HEADER_ID,
            ExtraField::UnicodePath(_) => unicode::UNICODE_PATH_ID,
            ExtraField::UnicodeComment(_) => unicode::UNICODE_COMMENT_ID,
            ExtraField::JarMarker => misc::JAR_MARKER_ID,
            ExtraField::Alignment(_) => misc::ALIGNMENT_ID,
            ExtraField::Unknown(id, _) => *id,
        }
    }
}

/// Decodes a single raw extra field into its typed form. Unknown header
/// IDs (including 0x0001, ZIP64, which needs extra context — see
/// [`zip64::decode`]) pass through as [`ExtraField::Unknown`].
pub fn decode(header_id: u16, payload: &[u8], _ctx: Context) -> ExtraField {
    let decoded = match header_id {
        aes::HEADER_ID => aes::decode(payload).map(ExtraField::Aes),
        ntfs::HEADER_ID => ntfs::decode(payload).map(ExtraField::Ntfs),
        unix_time::EXT_TIMESTAMP_ID => {
            unix_time::decode_ext_timestamp(payload).map(ExtraField::ExtTimestamp)
        }
        unix_time::UNIX_N_ID => unix_time::decode_unix_n(payload).map(ExtraField::UnixN),
        unix_time::OLD_UNIX_ID => unix_time::decode_old_unix(payload).map(ExtraField::OldUnix),
        asi_unix::HEADER_ID => asi_unix::decode(payload).map(ExtraField::AsiUnix),
        unicode::UNICODE_PATH_ID => unicode::decode(payload).map(ExtraField::UnicodePath),
        unicode::UNICODE_COMMENT_ID => unicode::decode(payload).map(ExtraField::UnicodeComment),
        misc::JAR_MARKER_ID => Ok(ExtraField::JarMarker),
        misc::ALIGNMENT_ID => Ok(ExtraField::Alignment(payload.to_vec())),
        other => Ok(ExtraField::Unknown(other, payload.to_vec())),
    };
    // A corrupt *known* field (e.g. ASi Unix CRC mismatch) is the caller's
    // problem to surface as an error from whatever higher-level operation
    // asked for it; for bulk parsing we retain the raw bytes so the
    // surrounding headers still round-trip.
    decoded.unwrap_or_else(|_| ExtraField::Unknown(header_id, payload.to_vec()))
}

/// Like [`decode`], but propagates a decode error for a known ID instead
/// of silently degrading to `Unknown`. Used where the caller specifically
/// asked for a typed field (e.g. the write pipeline needing AES
/// parameters) and a decode failure is meaningful.
pub fn decode_strict(header_id: u16, payload: &[u8], _ctx: Context) -> Result<ExtraField> {
    match header_id {
        aes::HEADER_ID => aes::decode(payload).map(ExtraField::Aes),
        ntfs::HEADER_ID => ntfs::decode(payload).map(ExtraField::Ntfs),
        unix_time::EXT_TIMESTAMP_ID => {
            unix_time::decode_ext_timestamp(payload).map(ExtraField::ExtTimestamp)
        }
        unix_time::UNIX_N_ID => unix_time::decode_unix_n(payload).map(ExtraField::UnixN),
        unix_time::OLD_UNIX_ID => unix_time::decode_old_unix(payload).map(ExtraField::OldUnix),
        asi_unix::HEADER_ID => asi_unix::decode(payload).map(ExtraField::AsiUnix),
        unicode::UNICODE_PATH_ID => unicode::decode(payload).map(ExtraField::UnicodePath),
        unicode::UNICODE_COMMENT_ID => unicode::decode(payload).map(ExtraField::UnicodeComment),
        misc::JAR_MARKER_ID => Ok(ExtraField::JarMarker),
        misc::ALIGNMENT_ID => Ok(ExtraField::Alignment(payload.to_vec())),
        other => Ok(ExtraField::Unknown(other, payload.to_vec())),
    }
}

pub fn encode(field: &ExtraField) -> Vec<u8> {
    match field {
        ExtraField::Aes(e) => aes::encode(e),
        ExtraField::Ntfs(e) => ntfs::encode(e),
        ExtraField::ExtTimestamp(e) => unix_time::encode_ext_timestamp(e, true),
        ExtraField::UnixN(e) => unix_time::encode_unix_n(e),
        ExtraField::OldUnix(e) => unix_time::encode_old_unix(e),
        ExtraField::AsiUnix(e) => asi_unix::encode(e),
        ExtraField::UnicodePath(e) | ExtraField::UnicodeComment(e) => unicode::encode(e),
        ExtraField::JarMarker => Vec::new(),
        ExtraField::Alignment(padding) => padding.clone(),
        ExtraField::Unknown(_, bytes) => bytes.clone(),
    }
}

/// Parses a raw LFH/CDH extra-field blob into `(headerId, payload)` pairs,
/// preserving order (spec.md's universal invariant: "extra-field ordering
/// among unknown IDs is preserved").
pub fn parse_raw_blob(blob: &[u8]) -> Result<Vec<RawExtraField>> {
    let mut out = Vec::new();
    let mut i = 0usize;
    while i + 4 <= blob.len() {
        let header_id = u16::from_le_bytes([blob[i], blob[i + 1]]);
        let len = u16::from_le_bytes([blob[i + 2], blob[i + 3]]) as usize;
        i += 4;
        if i + len > blob.len() {
            return Err(crate::error::ZipError::InvalidFormat(
                "extra field declares a length past the end of the extra block".to_string(),
            ));
        }
        out.push(RawExtraField {
            header_id,
            payload: blob[i..i + len].to_vec(),
        });
        i += len;
    }
    Ok(out)
}

pub fn encode_raw_blob(fields: &[RawExtraField]) -> Vec<u8> {
    let mut out = Vec::new();
    for field in fields {
        out.extend_from_slice(&field.header_id.to_le_bytes());
        out.extend_from_slice(&(field.payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&field.payload);
    }
    out
}

/// Finds the raw payload for `header_id` among a set of parsed extras.
pub fn find_raw<'a>(fields: &'a [RawExtraField], header_id: u16) -> Option<&'a [u8]> {
    fields
        .iter()
        .find(|f| f.header_id == header_id)
        .map(|f| f.payload.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_blob_roundtrip_preserves_order() {
        let fields = vec![
            RawExtraField {
                header_id: 0x1234,
                payload: vec![1, 2, 3],
            },
            RawExtraField {
                header_id: 0x000a,
                payload: vec![9, 9],
            },
        ];
        let blob = encode_raw_blob(&fields);
        let parsed = parse_raw_blob(&blob).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].header_id, 0x1234);
        assert_eq!(parsed[1].header_id, 0x000a);
    }

    #[test]
    fn unknown_id_passes_through() {
        let field = decode(0xBEEF, &[1, 2, 3], Context::Central);
        match field {
            ExtraField::Unknown(id, payload) => {
                assert_eq!(id, 0xBEEF);
                assert_eq!(payload, vec![1, 2, 3]);
            }
            other => panic!("expected Unknown, got {other:?}"),
        }
    }
}
