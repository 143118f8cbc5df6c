//! Entry Model (C3): in-memory representation of a ZIP archive's entries
//! and the operations that mutate them.

use std::io::Read;
use std::path::PathBuf;

use crate::compress;
use crate::error::{Result, ZipError};

/// Sentinel for "size unknown before write", per spec.md §3.1.
pub const SIZE_UNKNOWN: u64 = 0xFFFF_FFFF_FFFF_FFFF;

/// Compression methods this engine knows how to encode/decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Store,
    Deflate,
    Bzip2,
}

impl CompressionMethod {
    /// The on-disk method code. AES-wrapped entries instead stamp `99`
    /// at the header level and carry the true method in the 0x9901 extra
    /// field (handled by the write pipeline, not here).
    pub fn code(self) -> u16 {
        match self {
            CompressionMethod::Store => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Bzip2 => 12,
        }
    }

    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            0 => Ok(CompressionMethod::Store),
            8 => Ok(CompressionMethod::Deflate),
            12 => Ok(CompressionMethod::Bzip2),
            other => Err(ZipError::FeatureUnsupported(format!(
                "compression method {other} not supported"
            ))),
        }
    }
}

/// Encryption methods an entry may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptionMethod {
    None,
    Pkware,
    Aes128,
    Aes192,
    Aes256,
}

impl EncryptionMethod {
    pub fn is_aes(self) -> bool {
        matches!(
            self,
            EncryptionMethod::Aes128 | EncryptionMethod::Aes192 | EncryptionMethod::Aes256
        )
    }

    /// AES key size in bytes, for AES variants.
    pub fn aes_key_size(self) -> Option<usize> {
        match self {
            EncryptionMethod::Aes128 => Some(16),
            EncryptionMethod::Aes192 => Some(24),
            EncryptionMethod::Aes256 => Some(32),
            _ => None,
        }
    }

    /// WinZip AES strength code stored in the 0x9901 extra field.
    pub fn aes_strength_code(self) -> Option<u8> {
        match self {
            EncryptionMethod::Aes128 => Some(1),
            EncryptionMethod::Aes192 => Some(2),
            EncryptionMethod::Aes256 => Some(3),
            _ => None,
        }
    }

    pub fn from_aes_strength_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(EncryptionMethod::Aes128),
            2 => Ok(EncryptionMethod::Aes192),
            3 => Ok(EncryptionMethod::Aes256),
            other => Err(ZipError::InvalidFormat(format!(
                "unknown AES strength code {other}"
            ))),
        }
    }
}

/// Where an entry's plaintext comes from.
pub enum DataSource {
    /// Bytes already compressed+encrypted in a previously-opened archive,
    /// at `offset` (the entry's local header offset) and known
    /// `compressed_len`. Used for pass-through.
    FromArchive { offset: u64, compressed_len: u64 },
    /// Plaintext held entirely in memory; length known, re-readable.
    FromBytes(Vec<u8>),
    /// Plaintext read on demand from an arbitrary stream; length
    /// possibly unknown, forcing a data descriptor.
    FromStream(Box<dyn Read>),
    /// Plaintext read on demand from the filesystem; length known from
    /// `fs::metadata`.
    FromPath(PathBuf),
    /// No content (directory entry).
    None,
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSource::FromArchive {
                offset,
                compressed_len,
            } => f
                .debug_struct("FromArchive")
                .field("offset", offset)
                .field("compressed_len", compressed_len)
                .finish(),
            DataSource::FromBytes(b) => f.debug_tuple("FromBytes").field(&b.len()).finish(),
            DataSource::FromStream(_) => f.debug_tuple("FromStream").field(&"<stream>").finish(),
            DataSource::FromPath(p) => f.debug_tuple("FromPath").field(p).finish(),
            DataSource::None => write!(f, "None"),
        }
    }
}

impl DataSource {
    /// `true` if the source carries a known, precomputable length.
    pub fn has_known_length(&self) -> bool {
        !matches!(self, DataSource::FromStream(_))
    }

    pub fn is_directory_source(&self) -> bool {
        matches!(self, DataSource::None)
    }
}

/// An (headerId, payload) extra field pair, tagged local vs. central,
/// as stored before/after typed decoding (spec.md §3.3). Typed decoding
/// lives in the `extra` module; `ZipEntry` keeps both the typed and raw
/// forms so unknown IDs and local/central divergence survive round-trip.
#[derive(Debug, Clone)]
pub struct RawExtraField {
    pub header_id: u16,
    pub payload: Vec<u8>,
}

/// General-purpose bit flag positions (spec.md §3.1).
pub mod gp_flag {
    pub const ENCRYPTED: u16 = 1 << 0;
    pub const DATA_DESCRIPTOR: u16 = 1 << 3;
    pub const STRONG_ENCRYPTION: u16 = 1 << 6;
    pub const UTF8_NAME: u16 = 1 << 11;
}

/// In-memory representation of one archive entry.
pub struct ZipEntry {
    pub name: String,
    pub compression: CompressionMethod,
    pub compression_level: u32,
    pub crc32: u32,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub dos_time: u16,
    pub dos_date: u16,
    pub unix_mtime: Option<i64>,
    pub unix_atime: Option<i64>,
    pub unix_ctime: Option<i64>,
    pub external_attrs: u32,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub gp_flag: u16,
    pub local_header_offset: u64,
    pub local_extra: Vec<RawExtraField>,
    pub central_extra: Vec<RawExtraField>,
    pub comment: Vec<u8>,
    pub encryption: EncryptionMethod,
    pub password: Option<Vec<u8>>,
    pub source: DataSource,
}

impl ZipEntry {
    pub fn is_directory(&self) -> bool {
        self.name.ends_with('/')
    }

    pub fn new_directory(name: impl Into<String>) -> Self {
        let mut name = name.into();
        if !name.ends_with('/') {
            name.push('/');
        }
        ZipEntry {
            name,
            compression: CompressionMethod::Store,
            compression_level: 0,
            crc32: 0,
            compressed_size: 0,
            uncompressed_size: 0,
            dos_time: 0,
            dos_date: 0,
            unix_mtime: None,
            unix_atime: None,
            unix_ctime: None,
            external_attrs: 0o40755 << 16,
            version_made_by: 0x0314,
            version_needed: 20,
            gp_flag: 0,
            local_header_offset: 0,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
            comment: Vec::new(),
            encryption: EncryptionMethod::None,
            password: None,
            source: DataSource::None,
        }
    }

    pub fn new_file(name: impl Into<String>, source: DataSource) -> Self {
        ZipEntry {
            name: name.into(),
            compression: CompressionMethod::Deflate,
            compression_level: 6,
            crc32: 0,
            compressed_size: SIZE_UNKNOWN,
            uncompressed_size: SIZE_UNKNOWN,
            dos_time: 0,
            dos_date: 0,
            unix_mtime: None,
            unix_atime: None,
            unix_ctime: None,
            external_attrs: 0o100644 << 16,
            version_made_by: 0x0314,
            version_needed: 20,
            gp_flag: 0,
            local_header_offset: 0,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
            comment: Vec::new(),
            encryption: EncryptionMethod::None,
            password: None,
            source: DataSource::None,
        }
        .with_source(source)
    }

    fn with_source(mut self, source: DataSource) -> Self {
        self.source = source;
        self
    }

    /// Sets encryption method, forcing GP-bit 0 per spec.md §3.1's
    /// invariant.
    pub fn set_encryption(&mut self, method: EncryptionMethod, password: Option<Vec<u8>>) {
        self.encryption = method;
        if method == EncryptionMethod::None {
            self.gp_flag &= !gp_flag::ENCRYPTED;
            self.password = None;
        } else {
            self.gp_flag |= gp_flag::ENCRYPTED;
            self.password = password;
        }
    }

    /// `true` if any 32-bit field would overflow and the entry must be
    /// promoted to ZIP64 (spec.md §3.1's ZIP64 invariant).
    pub fn needs_zip64(&self) -> bool {
        self.uncompressed_size > 0xFFFF_FFFE
            || self.compressed_size > 0xFFFF_FFFE
            || self.local_header_offset > 0xFFFF_FFFE
    }
}

/// Options that govern how a single entry is encoded on write — the
/// "configuration" surface of the engine, passed explicitly rather than
/// read from a file (spec.md §4.3).
#[derive(Debug, Clone)]
pub struct WriteOptions {
    pub compression: CompressionMethod,
    pub compression_level: u32,
    pub encryption: EncryptionMethod,
    pub password: Option<Vec<u8>>,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            compression: CompressionMethod::Deflate,
            compression_level: 6,
            encryption: EncryptionMethod::None,
            password: None,
        }
    }
}

/// An ordered sequence of entries plus archive-level state (spec.md §3.2).
pub struct ZipModel {
    entries: Vec<ZipEntry>,
    pub comment: Vec<u8>,
    pub align: u32,
    default_password: Option<Vec<u8>>,
}

impl Default for ZipModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ZipModel {
    pub fn new() -> Self {
        ZipModel {
            entries: Vec::new(),
            comment: Vec::new(),
            align: 0,
            default_password: None,
        }
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [ZipEntry] {
        &mut self.entries
    }

    pub fn into_entries(self) -> Vec<ZipEntry> {
        self.entries
    }

    pub fn find(&self, name: &str) -> Option<&ZipEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut ZipEntry> {
        self.entries.iter_mut().find(|e| e.name == name)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// Adds an entry. Fails with `EntryAlreadyExists` unless `replace` is
    /// set, per spec.md §4.6's tie-break rule: a replacing entry
    /// supersedes the old one and inherits nothing from it.
    pub fn add(&mut self, mut entry: ZipEntry, replace: bool) -> Result<()> {
        if entry.name.len() > 0xFFFF {
            return Err(ZipError::InvalidArgument(
                "entry name exceeds 65535 bytes".to_string(),
            ));
        }
        if entry.password.is_none() {
            entry.password = self.default_password.clone();
        }
        match self.position(&entry.name) {
            Some(idx) if replace => {
                self.entries[idx] = entry;
                Ok(())
            }
            Some(_) => Err(ZipError::EntryAlreadyExists(entry.name)),
            None => {
                self.entries.push(entry);
                Ok(())
            }
        }
    }

    pub fn rename(&mut self, old_name: &str, new_name: &str) -> Result<()> {
        if self.position(new_name).is_some() {
            return Err(ZipError::EntryAlreadyExists(new_name.to_string()));
        }
        let idx = self
            .position(old_name)
            .ok_or_else(|| ZipError::EntryNotFound(old_name.to_string()))?;
        self.entries[idx].name = new_name.to_string();
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<ZipEntry> {
        let idx = self
            .position(name)
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
        Ok(self.entries.remove(idx))
    }

    /// Deletes every entry whose name matches `predicate`, returning the
    /// count removed. Kept predicate-based (rather than taking a `Regex`
    /// directly) so the core has no regex dependency of its own; callers
    /// needing regex matching pass `|name| re.is_match(name)`.
    pub fn delete_matching(&mut self, mut predicate: impl FnMut(&str) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|e| !predicate(&e.name));
        before - self.entries.len()
    }

    pub fn set_compression(&mut self, name: &str, method: CompressionMethod, level: u32) -> Result<()> {
        compress::validate_level(method, level)?;
        let entry = self
            .find_mut(name)
            .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
        entry.compression = method;
        entry.compression_level = level;
        Ok(())
    }

    /// Sets the password. With `name` given, it applies only to that
    /// entry; with `name` omitted, it becomes the default for
    /// subsequently-added entries (spec.md §4.3).
    pub fn set_password(&mut self, name: Option<&str>, password: Vec<u8>) -> Result<()> {
        match name {
            Some(name) => {
                let entry = self
                    .find_mut(name)
                    .ok_or_else(|| ZipError::EntryNotFound(name.to_string()))?;
                entry.password = Some(password);
            }
            None => self.default_password = Some(password),
        }
        Ok(())
    }

    pub fn set_align(&mut self, align: u32) -> Result<()> {
        if align != 0 && !align.is_power_of_two() {
            return Err(ZipError::InvalidArgument(
                "alignment must be 0 or a power of two".to_string(),
            ));
        }
        self.align = align;
        Ok(())
    }

    /// `true` if any entry or the aggregate archive requires ZIP64
    /// promotion (spec.md §3.1, §4.1).
    pub fn needs_zip64(&self) -> bool {
        self.entries.len() > 0xFFFF || self.entries.iter().any(ZipEntry::needs_zip64)
    }
}
