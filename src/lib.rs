//! # zipwright: ZIP Archive Engine
//!
//! `zipwright` builds and reads ZIP archives: the binary container
//! (EOCD/ZIP64-EOCD/Central Directory/Local File Headers/data
//! descriptors), the polymorphic extra-field registry, traditional
//! PKWARE and WinZip AES encryption, STORE/DEFLATE/BZIP2 compression,
//! and a write pipeline that can either re-encode an entry from
//! scratch or copy an already-compressed-and-encrypted entry through
//! verbatim.
//!
//! ## Quick start
//!
//! ### Writing an archive
//!
//! ```no_run
//! use std::fs::File;
//! use zipwright::model::{DataSource, ZipEntry, ZipModel};
//!
//! let mut model = ZipModel::new();
//! model.add(ZipEntry::new_file("hello.txt", DataSource::FromBytes(b"hi".to_vec())), false)?;
//!
//! let mut out = File::create("out.zip")?;
//! zipwright::write::write_archive(model, &mut out, None)?;
//! # Ok::<(), zipwright::error::ZipError>(())
//! ```
//!
//! ### Reading an archive
//!
//! ```no_run
//! use std::fs::File;
//!
//! let file = File::open("out.zip")?;
//! let model = zipwright::read::open_archive(file)?;
//! for entry in model.entries() {
//!     println!("{}: {} bytes", entry.name, entry.uncompressed_size);
//! }
//! # Ok::<(), zipwright::error::ZipError>(())
//! ```

pub mod compress;
pub mod cp437;
pub mod crypto;
pub mod error;
pub mod extra;
pub mod format;
pub mod model;
pub mod read;
pub mod write;

pub use error::{Result, ZipError};
pub use model::{CompressionMethod, DataSource, EncryptionMethod, WriteOptions, ZipEntry, ZipModel};
pub use read::open_archive;
pub use write::write_archive;
