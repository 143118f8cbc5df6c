//! Write Pipeline (C6): orchestrates per-entry filter chains, the
//! pass-through optimization, alignment, ZIP64 promotion, and CRC
//! accounting, then appends the Central Directory and EOCD (spec.md
//! §4.6).

use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::compress::{self, CompressWriter};
use crate::crypto::{self, CheckByteSource, EncryptWriter};
use crate::error::{Result, ZipError};
use crate::extra::{self, misc, zip64};
use crate::format::{self, central, descriptor, local};
use crate::model::{CompressionMethod, DataSource, EncryptionMethod, RawExtraField, ZipEntry, ZipModel};

const ZIP64_THRESHOLD: u64 = 0xFFFF_FFFE;

/// Everything the Central Directory pass needs once an entry's payload
/// has been written.
struct FinishedEntry {
    name_raw: Vec<u8>,
    version_made_by: u16,
    version_needed: u16,
    gp_flag: u16,
    method: u16,
    dos_time: u16,
    dos_date: u16,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    external_attrs: u32,
    local_header_offset: u64,
    central_extra: Vec<RawExtraField>,
    comment: Vec<u8>,
}

/// A `Write` wrapper that tallies bytes passed through it, used to
/// measure ciphertext length without assuming the underlying writer
/// exposes a position (needed when writing into an in-memory buffer).
struct ByteCounter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> ByteCounter<W> {
    fn new(inner: W) -> Self {
        ByteCounter { inner, count: 0 }
    }
}

impl<W: Write> Write for ByteCounter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// A `Write` wrapper that accumulates the CRC-32 and byte count of
/// whatever plaintext passes through it, ahead of compression.
struct CrcCounter<W: Write> {
    inner: W,
    hasher: crc32fast::Hasher,
    count: u64,
}

impl<W: Write> CrcCounter<W> {
    fn new(inner: W) -> Self {
        CrcCounter {
            inner,
            hasher: crc32fast::Hasher::new(),
            count: 0,
        }
    }

    fn finish(self) -> (u32, u64, W) {
        (self.hasher.finalize(), self.count, self.inner)
    }
}

impl<W: Write> Write for CrcCounter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.hasher.update(buf);
        self.count += buf.len() as u64;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

fn compute_version_needed(compression: CompressionMethod, zip64: bool, aes: bool) -> u16 {
    let mut v = match compression {
        CompressionMethod::Store => 20,
        CompressionMethod::Deflate => 20,
        CompressionMethod::Bzip2 => 46,
    };
    if zip64 {
        v = v.max(45);
    }
    if aes {
        v = v.max(51);
    }
    v
}

fn encode_name(name: &str) -> (Vec<u8>, bool) {
    match crate::cp437::encode(name) {
        Some(bytes) => (bytes, false),
        None => (name.as_bytes().to_vec(), true),
    }
}

/// Builds the ZIP64 extra field (if any 32-bit slot overflows) for a
/// finished entry, returning it ready to attach to LFH and CD extras.
fn zip64_extra_for(compressed_size: u64, uncompressed_size: u64, offset: u64) -> Option<RawExtraField> {
    let need = zip64::Zip64Need {
        uncompressed_size: uncompressed_size > ZIP64_THRESHOLD,
        compressed_size: compressed_size > ZIP64_THRESHOLD,
        local_header_offset: offset > ZIP64_THRESHOLD,
        disk_start: false,
    };
    if !(need.uncompressed_size || need.compressed_size || need.local_header_offset) {
        return None;
    }
    let extra = zip64::Zip64Extra {
        uncompressed_size: need.uncompressed_size.then_some(uncompressed_size),
        compressed_size: need.compressed_size.then_some(compressed_size),
        local_header_offset: need.local_header_offset.then_some(offset),
        disk_start: None,
    };
    Some(RawExtraField {
        header_id: zip64::HEADER_ID,
        payload: zip64::encode(&extra),
    })
}

/// Reads a `DataSource`'s plaintext fully into memory. Entries written
/// without a data descriptor need their CRC and final size known before
/// the LFH is emitted, so the whole payload is buffered up front for
/// those (spec.md §4.6 step 1-2); streamed sources always go through
/// the descriptor path instead and never call this.
fn read_plaintext(source: DataSource) -> Result<Vec<u8>> {
    match source {
        DataSource::FromBytes(bytes) => Ok(bytes),
        DataSource::FromPath(path) => Ok(std::fs::read(path)?),
        DataSource::None => Ok(Vec::new()),
        DataSource::FromArchive { .. } | DataSource::FromStream(_) => Err(ZipError::InvalidArgument(
            "read_plaintext called on a source requiring streaming".to_string(),
        )),
    }
}

/// `true` if `entry`'s final size can be computed without running the
/// payload through a compressor: STORE (size = input length) with a
/// source that isn't an open-ended stream.
fn is_size_known_upfront(entry: &ZipEntry) -> bool {
    entry.compression == CompressionMethod::Store
        && !matches!(entry.source, DataSource::FromStream(_))
}

/// Writes one entry, owning it so its `DataSource` can be moved out.
fn write_entry<W: Write + Seek>(
    target: &mut W,
    mut entry: ZipEntry,
    align: u32,
    source_archive: Option<&mut dyn ReadSeek>,
) -> Result<FinishedEntry> {
    let local_header_offset = target.stream_position()?;

    if let DataSource::FromArchive { offset, compressed_len } = entry.source {
        if let Some(src) = source_archive {
            return write_entry_pass_through(target, &entry, offset, compressed_len, src, local_header_offset);
        }
    }

    let (name_raw, force_utf8) = encode_name(&entry.name);
    let mut gp_flag = entry.gp_flag;
    if force_utf8 {
        gp_flag |= crate::model::gp_flag::UTF8_NAME;
    }

    let password = entry.password.clone().unwrap_or_default();
    let aes = entry.encryption.is_aes();
    let on_disk_method = if aes {
        format::AES_METHOD_PLACEHOLDER
    } else {
        entry.compression.code()
    };

    if is_size_known_upfront(&entry) {
        let source = std::mem::replace(&mut entry.source, DataSource::None);
        let mut plaintext = read_plaintext(source)?;
        if entry.is_directory() {
            plaintext.clear();
        }
        let crc32 = crc32fast::hash(&plaintext);
        let uncompressed_size = plaintext.len() as u64;

        let check = CheckByteSource::Crc32High(crc32);
        let mut local_extra: Vec<RawExtraField> = entry.local_extra.clone();

        // Alignment only applies to unencrypted STORE payloads (spec.md §4.1).
        if align > 0 && entry.encryption == EncryptionMethod::None {
            let header_len_guess = estimate_lfh_len(&name_raw, &local_extra, aes);
            let unaligned = local_header_offset + header_len_guess as u64;
            if let Some(pad) = alignment_extra_padding(unaligned, align as u64) {
                local_extra.push(RawExtraField {
                    header_id: misc::ALIGNMENT_ID,
                    payload: misc::encode_alignment_padding(pad as usize),
                });
            }
        }

        if aes {
            local_extra.retain(|f| f.header_id != crate::extra::aes::HEADER_ID);
            local_extra.push(aes_extra_field(&entry));
        }

        let mut ciphertext = Vec::new();
        {
            let counter = ByteCounter::new(Cursor::new(&mut ciphertext));
            let mut enc = EncryptWriter::new(counter, entry.encryption, &password, check)?;
            enc.write_all(&plaintext)?;
            let (trailer, mut counter) = enc.finish()?;
            counter.write_all(&trailer)?;
        }
        let compressed_size = ciphertext.len() as u64;

        let zip64_extra = zip64_extra_for(compressed_size, uncompressed_size, local_header_offset);
        let is_zip64 = zip64_extra.is_some();
        if let Some(z) = &zip64_extra {
            local_extra.push(z.clone());
        }

        let version_needed = compute_version_needed(entry.compression, is_zip64, aes);
        let lfh = local::LocalFileHeader {
            version_needed,
            gp_flag,
            method: on_disk_method,
            mod_time: entry.dos_time,
            mod_date: entry.dos_date,
            crc32,
            compressed_size: if is_zip64 {
                format::ZIP64_SENTINEL_U32
            } else {
                compressed_size as u32
            },
            uncompressed_size: if is_zip64 {
                format::ZIP64_SENTINEL_U32
            } else {
                uncompressed_size as u32
            },
            name_raw: name_raw.clone(),
            extra: local_extra.clone(),
        };
        target.write_all(&local::write(&lfh))?;
        target.write_all(&ciphertext)?;

        let mut central_extra = entry.central_extra.clone();
        if aes {
            central_extra.retain(|f| f.header_id != crate::extra::aes::HEADER_ID);
            central_extra.push(aes_extra_field(&entry));
        }
        if let Some(z) = zip64_extra {
            central_extra.retain(|f| f.header_id != zip64::HEADER_ID);
            central_extra.push(z);
        }

        return Ok(FinishedEntry {
            name_raw,
            version_made_by: entry.version_made_by,
            version_needed,
            gp_flag,
            method: on_disk_method,
            dos_time: entry.dos_time,
            dos_date: entry.dos_date,
            crc32,
            compressed_size,
            uncompressed_size,
            external_attrs: entry.external_attrs,
            local_header_offset,
            central_extra,
            comment: entry.comment,
        });
    }

    // Streaming path: sizes unknown up front (DEFLATE/BZIP2, or a
    // stream source), so a data descriptor follows the payload.
    // ZIP64 promotion is not supported on this path (see DESIGN.md).
    gp_flag |= crate::model::gp_flag::DATA_DESCRIPTOR;
    let mut local_extra = entry.local_extra.clone();
    if aes {
        local_extra.retain(|f| f.header_id != crate::extra::aes::HEADER_ID);
        local_extra.push(aes_extra_field(&entry));
    }
    let version_needed = compute_version_needed(entry.compression, false, aes);
    let lfh = local::LocalFileHeader {
        version_needed,
        gp_flag,
        method: on_disk_method,
        mod_time: entry.dos_time,
        mod_date: entry.dos_date,
        crc32: 0,
        compressed_size: 0,
        uncompressed_size: 0,
        name_raw: name_raw.clone(),
        extra: local_extra,
    };
    target.write_all(&local::write(&lfh))?;

    let check = CheckByteSource::DosTimeHigh(entry.dos_time);
    let mut plaintext_reader: Box<dyn Read> = match std::mem::replace(&mut entry.source, DataSource::None) {
        DataSource::FromStream(r) => r,
        DataSource::FromBytes(b) => Box::new(Cursor::new(b)),
        DataSource::FromPath(p) => Box::new(std::fs::File::open(p)?),
        DataSource::None => Box::new(std::io::empty()),
        DataSource::FromArchive { .. } => {
            return Err(ZipError::InvalidArgument(
                "pass-through source reached the streaming write path".to_string(),
            ))
        }
    };

    let byte_counter = ByteCounter::new(&mut *target);
    let enc = EncryptWriter::new(byte_counter, entry.encryption, &password, check)?;
    let compress = CompressWriter::new(enc, entry.compression, entry.compression_level);
    let mut crc_writer = CrcCounter::new(compress);
    std::io::copy(&mut plaintext_reader, &mut crc_writer)?;
    let (crc32, uncompressed_size, compress) = crc_writer.finish();
    let enc = compress.finish()?;
    let (trailer, mut byte_counter) = enc.finish()?;
    byte_counter.write_all(&trailer)?;
    let compressed_size = byte_counter.count;

    let dd = descriptor::DataDescriptor {
        crc32,
        compressed_size,
        uncompressed_size,
    };
    target.write_all(&descriptor::write(&dd, false))?;

    let mut central_extra = entry.central_extra;
    if aes {
        central_extra.retain(|f| f.header_id != crate::extra::aes::HEADER_ID);
        central_extra.push(aes_extra_field(&entry));
    }

    Ok(FinishedEntry {
        name_raw,
        version_made_by: entry.version_made_by,
        version_needed,
        gp_flag,
        method: on_disk_method,
        dos_time: entry.dos_time,
        dos_date: entry.dos_date,
        crc32,
        compressed_size,
        uncompressed_size,
        external_attrs: entry.external_attrs,
        local_header_offset,
        central_extra,
        comment: entry.comment,
    })
}

fn aes_extra_field(entry: &ZipEntry) -> RawExtraField {
    let aes_extra = crate::extra::aes::AesExtra {
        vendor_version: crate::extra::aes::VendorVersion::Ae2,
        encryption: entry.encryption,
        actual_compression_method: entry.compression.code(),
    };
    RawExtraField {
        header_id: crate::extra::aes::HEADER_ID,
        payload: crate::extra::aes::encode(&aes_extra),
    }
}

fn estimate_lfh_len(name_raw: &[u8], extra: &[RawExtraField], _aes: bool) -> usize {
    30 + name_raw.len() + extra::encode_raw_blob(extra).len()
}

fn padding_for_alignment(unaligned_offset: u64, align: u64) -> u64 {
    let rem = unaligned_offset % align;
    if rem == 0 {
        0
    } else {
        align - rem
    }
}

/// Payload length for a `0xD935` alignment extra field so the entry's
/// payload lands on an `align` boundary, *including* the field's own
/// 4-byte (id+len) header in the count — `None` if `unaligned_offset` is
/// already aligned and no field is needed. The gap to the next boundary
/// must be at least 4 bytes to hold that header; when it isn't, the next
/// boundary beyond it is used instead, as `zipalign` does.
fn alignment_extra_padding(unaligned_offset: u64, align: u64) -> Option<u64> {
    let gap = padding_for_alignment(unaligned_offset, align);
    if gap == 0 {
        return None;
    }
    let mut total = gap;
    while total < 4 {
        total += align;
    }
    Some(total - 4)
}

/// Trait alias so `write_entry` can accept any seekable reader for the
/// pass-through source without a generic parameter polluting every call
/// site (the source archive type is fixed for the whole write, but
/// entries are processed one at a time through a shared `&mut dyn`).
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}

fn write_entry_pass_through<W: Write + Seek>(
    target: &mut W,
    entry: &ZipEntry,
    offset: u64,
    compressed_len: u64,
    source: &mut dyn ReadSeek,
    local_header_offset: u64,
) -> Result<FinishedEntry> {
    source.seek(SeekFrom::Start(offset))?;
    let mut header_buf = vec![0u8; 30];
    source.read_exact(&mut header_buf)?;
    let name_len = u16::from_le_bytes([header_buf[26], header_buf[27]]) as usize;
    let extra_len = u16::from_le_bytes([header_buf[28], header_buf[29]]) as usize;
    let mut rest = vec![0u8; name_len + extra_len];
    source.read_exact(&mut rest)?;
    let mut full = header_buf;
    full.extend_from_slice(&rest);
    let (lfh, _) = local::parse(&full)?;

    // local_header_offset itself isn't part of the LFH payload, only
    // used by the CD; the LFH bytes are copied verbatim.
    target.write_all(&local::write(&lfh))?;

    let mut remaining = compressed_len;
    let mut buf = [0u8; 64 * 1024];
    while remaining > 0 {
        let take = remaining.min(buf.len() as u64) as usize;
        source.read_exact(&mut buf[..take])?;
        target.write_all(&buf[..take])?;
        remaining -= take as u64;
    }

    if local::uses_data_descriptor(&lfh) {
        let zip64 = entry.needs_zip64();
        let (dd, consumed) = descriptor::parse(&peek_descriptor(source)?, zip64)?;
        let _ = consumed;
        target.write_all(&descriptor::write(&dd, zip64))?;
        source.seek(SeekFrom::Current(consumed_len(&dd, zip64) as i64))?;
    }

    Ok(FinishedEntry {
        name_raw: lfh.name_raw.clone(),
        version_made_by: entry.version_made_by,
        version_needed: lfh.version_needed,
        gp_flag: lfh.gp_flag,
        method: lfh.method,
        dos_time: lfh.mod_time,
        dos_date: lfh.mod_date,
        crc32: entry.crc32,
        compressed_size: entry.compressed_size,
        uncompressed_size: entry.uncompressed_size,
        external_attrs: entry.external_attrs,
        local_header_offset,
        central_extra: entry.central_extra.clone(),
        comment: entry.comment.clone(),
    })
}

fn peek_descriptor(source: &mut dyn ReadSeek) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; 24];
    let pos = source.stream_position()?;
    let n = source.read(&mut buf)?;
    buf.truncate(n);
    source.seek(SeekFrom::Start(pos))?;
    Ok(buf)
}

fn consumed_len(_dd: &descriptor::DataDescriptor, zip64: bool) -> usize {
    4 + if zip64 { 16 } else { 8 }
}

/// Serializes `model` to `target`. `source_archive`, when given, is used
/// for entries whose `DataSource` is `FromArchive` (pass-through).
pub fn write_archive<W: Write + Seek>(
    model: ZipModel,
    target: &mut W,
    mut source_archive: Option<&mut dyn ReadSeek>,
) -> Result<()> {
    let align = model.align;
    let comment = model.comment.clone();
    let entries = model.into_entries();

    let mut finished = Vec::with_capacity(entries.len());
    for entry in entries {
        let src = source_archive.as_deref_mut();
        let f = write_entry(target, entry, align, src)?;
        finished.push(f);
    }

    let cd_offset = target.stream_position()?;
    for f in &finished {
        let mut central_extra = f.central_extra.clone();
        let is_zip64 = f.compressed_size > ZIP64_THRESHOLD
            || f.uncompressed_size > ZIP64_THRESHOLD
            || f.local_header_offset > ZIP64_THRESHOLD;
        if is_zip64 {
            central_extra.retain(|e| e.header_id != zip64::HEADER_ID);
            if let Some(z) = zip64_extra_for(f.compressed_size, f.uncompressed_size, f.local_header_offset) {
                central_extra.push(z);
            }
        }
        let cdh = central::CentralDirectoryHeader {
            version_made_by: f.version_made_by,
            version_needed: f.version_needed,
            gp_flag: f.gp_flag,
            method: f.method,
            mod_time: f.dos_time,
            mod_date: f.dos_date,
            crc32: f.crc32,
            compressed_size: if is_zip64 {
                format::ZIP64_SENTINEL_U32
            } else {
                f.compressed_size as u32
            },
            uncompressed_size: if is_zip64 {
                format::ZIP64_SENTINEL_U32
            } else {
                f.uncompressed_size as u32
            },
            disk_start: 0,
            internal_attrs: 0,
            external_attrs: f.external_attrs,
            local_header_offset: if f.local_header_offset > ZIP64_THRESHOLD {
                format::ZIP64_SENTINEL_U32
            } else {
                f.local_header_offset as u32
            },
            name_raw: f.name_raw.clone(),
            extra: central_extra,
            comment: f.comment.clone(),
        };
        target.write_all(&central::write(&cdh))?;
    }
    let cd_size = target.stream_position()? - cd_offset;

    let eocd = format::eocd::Eocd {
        disk_number: 0,
        cd_start_disk: 0,
        entries_on_this_disk: finished.len() as u64,
        total_entries: finished.len() as u64,
        cd_size,
        cd_offset,
        comment,
        is_zip64: finished.len() > 0xFFFE || cd_size > ZIP64_THRESHOLD || cd_offset > ZIP64_THRESHOLD,
    };

    if eocd.is_zip64 {
        let zip64_eocd_offset = target.stream_position()?;
        target.write_all(&format::eocd::write(&eocd))?;
        target.write_all(&format::eocd::write_zip64_locator(zip64_eocd_offset))?;
    }
    target.write_all(&format::eocd::write_eocd_record(&eocd))?;

    Ok(())
}
