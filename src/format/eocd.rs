//! End-Of-Central-Directory record, ZIP64-EOCD, and ZIP64 Locator
//! (spec.md §4.1): locating the Central Directory from the tail of the
//! archive.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{Result, ZipError};

pub const EOCD_SIGNATURE: u32 = 0x0605_4B50;
pub const ZIP64_EOCD_SIGNATURE: u32 = 0x0606_4B50;
pub const ZIP64_LOCATOR_SIGNATURE: u32 = 0x0706_4B50;

const EOCD_FIXED_LEN: usize = 22;
const ZIP64_LOCATOR_LEN: usize = 20;
const ZIP64_EOCD_FIXED_LEN: usize = 56;
/// 22 (fixed EOCD) + 65535 (max comment).
const MAX_EOCD_SEARCH_WINDOW: usize = EOCD_FIXED_LEN + 0xFFFF;

const SENTINEL_U16: u16 = 0xFFFF;
const SENTINEL_U32: u32 = 0xFFFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eocd {
    pub disk_number: u16,
    pub cd_start_disk: u16,
    pub entries_on_this_disk: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
    pub comment: Vec<u8>,
    pub is_zip64: bool,
}

/// Scans backwards from the end of `data` for the EOCD signature,
/// within the final `MAX_EOCD_SEARCH_WINDOW` bytes, then reads the
/// (optional) ZIP64 locator/record preceding it. Takes the slice
/// already in memory — callers read the tail of the file themselves so
/// the scan never touches the bulk of a large archive.
pub fn find_and_parse<R: Read + Seek>(mut reader: R) -> Result<Eocd> {
    let file_len = reader.seek(SeekFrom::End(0))?;
    let window = MAX_EOCD_SEARCH_WINDOW.min(file_len as usize);
    reader.seek(SeekFrom::End(-(window as i64)))?;
    let mut tail = vec![0u8; window];
    reader.read_exact(&mut tail)?;

    let eocd_pos_in_tail = find_eocd_signature(&tail, file_len - window as u64)?;
    let eocd_abs_offset = (file_len - window as u64) + eocd_pos_in_tail as u64;

    let fixed = &tail[eocd_pos_in_tail..eocd_pos_in_tail + EOCD_FIXED_LEN];
    let disk_number = u16::from_le_bytes([fixed[4], fixed[5]]);
    let cd_start_disk = u16::from_le_bytes([fixed[6], fixed[7]]);
    let entries_on_this_disk = u16::from_le_bytes([fixed[8], fixed[9]]) as u64;
    let total_entries = u16::from_le_bytes([fixed[10], fixed[11]]) as u64;
    let cd_size = u32::from_le_bytes([fixed[12], fixed[13], fixed[14], fixed[15]]) as u64;
    let cd_offset = u32::from_le_bytes([fixed[16], fixed[17], fixed[18], fixed[19]]) as u64;
    let comment_len = u16::from_le_bytes([fixed[20], fixed[21]]) as usize;
    let comment_start = eocd_pos_in_tail + EOCD_FIXED_LEN;
    if comment_start + comment_len != tail.len() {
        return Err(ZipError::InvalidFormat(
            "EOCD comment length does not match remaining bytes".to_string(),
        ));
    }
    let comment = tail[comment_start..comment_start + comment_len].to_vec();

    // ZIP64 locator sits 20 bytes immediately before the EOCD record.
    if eocd_abs_offset >= ZIP64_LOCATOR_LEN as u64 {
        reader.seek(SeekFrom::Start(eocd_abs_offset - ZIP64_LOCATOR_LEN as u64))?;
        let mut loc = [0u8; ZIP64_LOCATOR_LEN];
        if reader.read_exact(&mut loc).is_ok() {
            let sig = u32::from_le_bytes([loc[0], loc[1], loc[2], loc[3]]);
            if sig == ZIP64_LOCATOR_SIGNATURE {
                let zip64_eocd_offset = u64::from_le_bytes(loc[8..16].try_into().unwrap());
                return parse_zip64_eocd(&mut reader, zip64_eocd_offset, comment);
            }
        }
    }

    if disk_number == SENTINEL_U16
        || cd_start_disk == SENTINEL_U16
        || entries_on_this_disk as u16 == SENTINEL_U16
        || total_entries as u16 == SENTINEL_U16
        || cd_size as u32 == SENTINEL_U32
        || cd_offset as u32 == SENTINEL_U32
    {
        return Err(ZipError::InvalidFormat(
            "EOCD field is a ZIP64 sentinel but no ZIP64 locator was found".to_string(),
        ));
    }

    Ok(Eocd {
        disk_number,
        cd_start_disk,
        entries_on_this_disk,
        total_entries,
        cd_size,
        cd_offset,
        comment,
        is_zip64: false,
    })
}

fn find_eocd_signature(tail: &[u8], _tail_base: u64) -> Result<usize> {
    if tail.len() < EOCD_FIXED_LEN {
        return Err(ZipError::InvalidFormat("EOCD not found".to_string()));
    }
    // Search from the end so the first signature encountered scanning
    // backwards (the rightmost valid one) wins, per spec.md §4.1.
    for start in (0..=tail.len() - 4).rev() {
        if tail[start..start + 4] == EOCD_SIGNATURE.to_le_bytes() {
            if start + EOCD_FIXED_LEN > tail.len() {
                continue;
            }
            let comment_len =
                u16::from_le_bytes([tail[start + 20], tail[start + 21]]) as usize;
            if start + EOCD_FIXED_LEN + comment_len == tail.len() {
                return Ok(start);
            }
        }
    }
    Err(ZipError::InvalidFormat("EOCD not found".to_string()))
}

fn parse_zip64_eocd<R: Read + Seek>(reader: &mut R, offset: u64, comment: Vec<u8>) -> Result<Eocd> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = [0u8; ZIP64_EOCD_FIXED_LEN];
    reader.read_exact(&mut buf)?;
    let sig = u32::from_le_bytes(buf[0..4].try_into().unwrap());
    if sig != ZIP64_EOCD_SIGNATURE {
        return Err(ZipError::InvalidFormat(
            "ZIP64 EOCD signature mismatch".to_string(),
        ));
    }
    let disk_number = u32::from_le_bytes(buf[16..20].try_into().unwrap()) as u16;
    let cd_start_disk = u32::from_le_bytes(buf[20..24].try_into().unwrap()) as u16;
    let entries_on_this_disk = u64::from_le_bytes(buf[24..32].try_into().unwrap());
    let total_entries = u64::from_le_bytes(buf[32..40].try_into().unwrap());
    let cd_size = u64::from_le_bytes(buf[40..48].try_into().unwrap());
    let cd_offset = u64::from_le_bytes(buf[48..56].try_into().unwrap());

    Ok(Eocd {
        disk_number,
        cd_start_disk,
        entries_on_this_disk,
        total_entries,
        cd_size,
        cd_offset,
        comment,
        is_zip64: true,
    })
}

/// Whether `eocd`'s logical contents require ZIP64 sentinel encoding.
fn needs_zip64_encoding(eocd: &Eocd) -> bool {
    eocd.is_zip64
        || eocd.total_entries > 0xFFFE
        || eocd.cd_size > 0xFFFF_FFFE
        || eocd.cd_offset > 0xFFFF_FFFE
}

/// Serializes the EOCD (and, if required, the preceding ZIP64-EOCD +
/// Locator) for `eocd`.
pub fn write(eocd: &Eocd) -> Vec<u8> {
    let mut out = Vec::new();
    let zip64 = needs_zip64_encoding(eocd);

    if zip64 {
        let zip64_eocd_offset = 0u64; // caller fixes up via append-at-known-position pattern
        let _ = zip64_eocd_offset;
        out.extend_from_slice(&ZIP64_EOCD_SIGNATURE.to_le_bytes());
        out.extend_from_slice(&(ZIP64_EOCD_FIXED_LEN as u64 - 12).to_le_bytes());
        out.extend_from_slice(&0x0314u16.to_le_bytes()); // version made by
        out.extend_from_slice(&45u16.to_le_bytes()); // version needed for ZIP64
        out.extend_from_slice(&(eocd.disk_number as u32).to_le_bytes());
        out.extend_from_slice(&(eocd.cd_start_disk as u32).to_le_bytes());
        out.extend_from_slice(&eocd.entries_on_this_disk.to_le_bytes());
        out.extend_from_slice(&eocd.total_entries.to_le_bytes());
        out.extend_from_slice(&eocd.cd_size.to_le_bytes());
        out.extend_from_slice(&eocd.cd_offset.to_le_bytes());
    }
    out
}

/// Serializes the ZIP64 Locator, given the absolute file offset at
/// which the ZIP64-EOCD record (already written) begins.
pub fn write_zip64_locator(zip64_eocd_offset: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(ZIP64_LOCATOR_LEN);
    out.extend_from_slice(&ZIP64_LOCATOR_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes()); // disk with ZIP64-EOCD
    out.extend_from_slice(&zip64_eocd_offset.to_le_bytes());
    out.extend_from_slice(&1u32.to_le_bytes()); // total number of disks
    out
}

/// Serializes the trailing 32-bit EOCD record. If `eocd` requires
/// ZIP64, the 32-bit fields are sentinel-filled; the real values live
/// in the ZIP64-EOCD written by [`write`].
pub fn write_eocd_record(eocd: &Eocd) -> Vec<u8> {
    let mut out = Vec::with_capacity(EOCD_FIXED_LEN + eocd.comment.len());
    let zip64 = needs_zip64_encoding(eocd);
    out.extend_from_slice(&EOCD_SIGNATURE.to_le_bytes());
    out.extend_from_slice(&eocd.disk_number.to_le_bytes());
    out.extend_from_slice(&eocd.cd_start_disk.to_le_bytes());
    if zip64 {
        out.extend_from_slice(&SENTINEL_U16.to_le_bytes());
        out.extend_from_slice(&SENTINEL_U16.to_le_bytes());
        out.extend_from_slice(&SENTINEL_U32.to_le_bytes());
        out.extend_from_slice(&SENTINEL_U32.to_le_bytes());
    } else {
        out.extend_from_slice(&(eocd.entries_on_this_disk as u16).to_le_bytes());
        out.extend_from_slice(&(eocd.total_entries as u16).to_le_bytes());
        out.extend_from_slice(&(eocd.cd_size as u32).to_le_bytes());
        out.extend_from_slice(&(eocd.cd_offset as u32).to_le_bytes());
    }
    out.extend_from_slice(&(eocd.comment.len() as u16).to_le_bytes());
    out.extend_from_slice(&eocd.comment);
    out
}
