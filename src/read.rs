//! Read pipeline: locating the Central Directory, populating a
//! [`ZipModel`] from it, and lazily decoding one entry's plaintext by
//! composing the crypto and compression filters (spec.md §4.1, §4.6's
//! mirror image).

use std::io::{Cursor, Read, Seek, SeekFrom};

use crate::compress::DecompressReader;
use crate::crypto::{CheckByteSource, DecryptReader};
use crate::error::{Result, ZipError};
use crate::extra::{self, zip64};
use crate::format::{self, central, eocd, local};
use crate::model::{CompressionMethod, DataSource, EncryptionMethod, RawExtraField, ZipEntry, ZipModel};

/// Parses the Central Directory of the archive in `reader` into a
/// [`ZipModel`] whose entries carry `DataSource::FromArchive` sources
/// pointing back into `reader`'s byte range. Content isn't touched here
/// (spec.md §4.1: LFH verification is lazy).
pub fn open_archive<R: Read + Seek>(mut reader: R) -> Result<ZipModel> {
    let e = eocd::find_and_parse(&mut reader)?;
    if e.cd_start_disk != 0 || e.disk_number != 0 {
        return Err(ZipError::FeatureUnsupported(
            "multi-disk archives are not supported".to_string(),
        ));
    }

    reader.seek(SeekFrom::Start(e.cd_offset))?;
    let mut cd_blob = vec![0u8; e.cd_size as usize];
    reader.read_exact(&mut cd_blob)?;

    let mut model = ZipModel::new();
    model.comment = e.comment;

    let mut cursor = 0usize;
    for _ in 0..e.total_entries {
        let (cdh, consumed) = central::parse(&cd_blob[cursor..])?;
        cursor += consumed;
        let entry = build_entry(cdh)?;
        model.add(entry, false)?;
    }
    Ok(model)
}

fn build_entry(cdh: central::CentralDirectoryHeader) -> Result<ZipEntry> {
    let need = zip64::Zip64Need {
        uncompressed_size: cdh.uncompressed_size == format::ZIP64_SENTINEL_U32,
        compressed_size: cdh.compressed_size == format::ZIP64_SENTINEL_U32,
        local_header_offset: cdh.local_header_offset == format::ZIP64_SENTINEL_U32,
        disk_start: cdh.disk_start == format::ZIP64_SENTINEL_U16,
    };
    let zip64_override = if need.uncompressed_size || need.compressed_size || need.local_header_offset || need.disk_start {
        let payload = extra::find_raw(&cdh.extra, zip64::HEADER_ID).ok_or_else(|| {
            ZipError::InvalidFormat(
                "32-bit header field is a ZIP64 sentinel but no ZIP64 extra field is present".to_string(),
            )
        })?;
        Some(zip64::decode(payload, need)?)
    } else {
        None
    };

    let uncompressed_size = zip64_override
        .as_ref()
        .and_then(|z| z.uncompressed_size)
        .unwrap_or(cdh.uncompressed_size as u64);
    let compressed_size = zip64_override
        .as_ref()
        .and_then(|z| z.compressed_size)
        .unwrap_or(cdh.compressed_size as u64);
    let local_header_offset = zip64_override
        .as_ref()
        .and_then(|z| z.local_header_offset)
        .unwrap_or(cdh.local_header_offset as u64);

    let is_utf8 = cdh.gp_flag & crate::model::gp_flag::UTF8_NAME != 0;
    let name = if is_utf8 {
        String::from_utf8(cdh.name_raw.clone())
            .map_err(|_| ZipError::InvalidFormat("entry name is not valid UTF-8".to_string()))?
    } else {
        crate::cp437::decode(&cdh.name_raw)
    };

    let (compression, encryption) = if cdh.method == format::AES_METHOD_PLACEHOLDER {
        let payload = extra::find_raw(&cdh.extra, crate::extra::aes::HEADER_ID).ok_or_else(|| {
            ZipError::InvalidFormat(
                "compression method 99 (AES) but no AES extra field present".to_string(),
            )
        })?;
        let aes = crate::extra::aes::decode(payload)?;
        (
            CompressionMethod::from_code(aes.actual_compression_method)?,
            aes.encryption,
        )
    } else {
        let enc = if cdh.gp_flag & crate::model::gp_flag::ENCRYPTED != 0 {
            EncryptionMethod::Pkware
        } else {
            EncryptionMethod::None
        };
        (CompressionMethod::from_code(cdh.method)?, enc)
    };

    let (unix_mtime, unix_atime, unix_ctime) = extract_unix_times(&cdh.extra);

    Ok(ZipEntry {
        name,
        compression,
        compression_level: 6,
        crc32: cdh.crc32,
        compressed_size,
        uncompressed_size,
        dos_time: cdh.mod_time,
        dos_date: cdh.mod_date,
        unix_mtime,
        unix_atime,
        unix_ctime,
        external_attrs: cdh.external_attrs,
        version_made_by: cdh.version_made_by,
        version_needed: cdh.version_needed,
        gp_flag: cdh.gp_flag,
        local_header_offset,
        local_extra: Vec::new(),
        central_extra: cdh.extra,
        comment: cdh.comment,
        encryption,
        password: None,
        source: DataSource::FromArchive {
            offset: local_header_offset,
            compressed_len: compressed_size,
        },
    })
}

fn extract_unix_times(extras: &[RawExtraField]) -> (Option<i64>, Option<i64>, Option<i64>) {
    if let Some(payload) = extra::find_raw(extras, crate::extra::ntfs::HEADER_ID) {
        if let Ok(ntfs) = crate::extra::ntfs::decode(payload) {
            return (
                Some(ntfs.mtime_unix_seconds()),
                Some(ntfs.atime_unix_seconds()),
                Some(ntfs.ctime_unix_seconds()),
            );
        }
    }
    if let Some(payload) = extra::find_raw(extras, crate::extra::unix_time::EXT_TIMESTAMP_ID) {
        if let Ok(ts) = crate::extra::unix_time::decode_ext_timestamp(payload) {
            return (
                ts.mtime.map(|v| v as i64),
                ts.atime.map(|v| v as i64),
                ts.ctime.map(|v| v as i64),
            );
        }
    }
    if let Some(payload) = extra::find_raw(extras, crate::extra::unix_time::OLD_UNIX_ID) {
        if let Ok(old) = crate::extra::unix_time::decode_old_unix(payload) {
            return (Some(old.mtime as i64), Some(old.atime as i64), None);
        }
    }
    (None, None, None)
}

/// Reads and decodes `entry`'s full plaintext from the archive backing
/// `reader`. `entry.source` must be `FromArchive`.
pub fn read_entry_content<R: Read + Seek>(
    mut reader: R,
    entry: &ZipEntry,
    password: Option<&[u8]>,
) -> Result<Vec<u8>> {
    let (offset, compressed_len) = match entry.source {
        DataSource::FromArchive { offset, compressed_len } => (offset, compressed_len),
        _ => {
            return Err(ZipError::InvalidArgument(
                "read_entry_content requires a FromArchive data source".to_string(),
            ))
        }
    };

    reader.seek(SeekFrom::Start(offset))?;
    let mut header_buf = vec![0u8; 30];
    reader.read_exact(&mut header_buf)?;
    let name_len = u16::from_le_bytes([header_buf[26], header_buf[27]]) as usize;
    let extra_len = u16::from_le_bytes([header_buf[28], header_buf[29]]) as usize;
    let mut rest = vec![0u8; name_len + extra_len];
    reader.read_exact(&mut rest)?;
    let mut full = header_buf;
    full.extend_from_slice(&rest);
    let (lfh, _) = local::parse(&full)?;

    let has_descriptor = local::uses_data_descriptor(&lfh);
    if !has_descriptor {
        if lfh.crc32 != entry.crc32
            || lfh.compressed_size as u64 != compressed_len.min(u32::MAX as u64)
        {
            // 32-bit LFH fields legitimately differ from a ZIP64-promoted
            // entry's true sizes; only compare when neither sentinel applies.
            if lfh.compressed_size != format::ZIP64_SENTINEL_U32 && lfh.crc32 != 0 {
                return Err(ZipError::InvalidFormat(
                    "local file header CRC/size disagree with central directory".to_string(),
                ));
            }
        }
    }

    let mut ciphertext = vec![0u8; compressed_len as usize];
    reader.read_exact(&mut ciphertext)?;

    let password = password.unwrap_or(&[]);
    let plaintext = decode_payload(&ciphertext, entry, password, has_descriptor)?;

    if entry.encryption == EncryptionMethod::None || should_check_crc(entry) {
        let crc = crc32fast::hash(&plaintext);
        if crc != entry.crc32 {
            return Err(ZipError::Crc32Mismatch(format!(
                "expected CRC32 value {:08x}, got {:08x}",
                entry.crc32, crc
            )));
        }
    }

    Ok(plaintext)
}

/// AE-2 skips the plaintext CRC check (authentication is via HMAC
/// instead); AE-1 retains it (spec.md §4.4.2).
fn should_check_crc(entry: &ZipEntry) -> bool {
    if !entry.encryption.is_aes() {
        return true;
    }
    match extra::find_raw(&entry.central_extra, crate::extra::aes::HEADER_ID) {
        Some(payload) => crate::extra::aes::decode(payload)
            .map(|a| a.vendor_version == crate::extra::aes::VendorVersion::Ae1)
            .unwrap_or(false),
        None => false,
    }
}

fn decode_payload(
    ciphertext: &[u8],
    entry: &ZipEntry,
    password: &[u8],
    has_descriptor: bool,
) -> Result<Vec<u8>> {
    let check = if has_descriptor {
        CheckByteSource::DosTimeHigh(entry.dos_time)
    } else {
        CheckByteSource::Crc32High(entry.crc32)
    };

    let (ctr_region, tag): (&[u8], Option<&[u8]>) = if entry.encryption.is_aes() {
        if ciphertext.len() < 10 {
            return Err(ZipError::InvalidFormat(
                "AES ciphertext shorter than its MAC trailer".to_string(),
            ));
        }
        let split = ciphertext.len() - 10;
        (&ciphertext[..split], Some(&ciphertext[split..]))
    } else {
        (ciphertext, None)
    };

    let mut decrypt = DecryptReader::new(Cursor::new(ctr_region), entry.encryption, password, check)?;
    let mut compressed = Vec::new();
    decrypt.read_to_end(&mut compressed)?;
    if let Some(tag) = tag {
        decrypt.verify(tag)?;
    }

    let mut decompress = DecompressReader::new(Cursor::new(compressed), entry.compression);
    let mut plaintext = Vec::new();
    decompress.read_to_end(&mut plaintext)?;
    Ok(plaintext)
}
