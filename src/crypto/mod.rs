//! Crypto Filters (C4): streaming encrypt/decrypt adapters over
//! `Read`/`Write`, selected by [`EncryptionMethod`] (spec.md §4.4).

pub mod pkware;
pub mod winzip_aes;

use std::io::{Read, Write};

use crate::error::{Result, ZipError};
use crate::model::EncryptionMethod;

pub use pkware::CheckByteSource;

/// Extra bytes a given encryption method adds around the compressed
/// plaintext (header + trailer), needed by the write pipeline to size
/// the local/central `compressed_size` field.
pub fn overhead(method: EncryptionMethod) -> Result<u64> {
    match method {
        EncryptionMethod::None => Ok(0),
        EncryptionMethod::Pkware => Ok(12),
        _ if method.is_aes() => winzip_aes::overhead(method),
        _ => unreachable!(),
    }
}

/// A writer that encrypts whatever is written to it, dispatched by
/// method. Wraps the two concrete filters behind one enum rather than a
/// trait object so `finish()` can return differently-shaped trailer data
/// without an allocation per entry.
pub enum EncryptWriter<W: Write> {
    None(W),
    Pkware(pkware::PkwareEncryptWriter<W>),
    WinZipAes(winzip_aes::WinZipAesEncryptWriter<W>),
}

impl<W: Write> EncryptWriter<W> {
    pub fn new(
        inner: W,
        method: EncryptionMethod,
        password: &[u8],
        check: CheckByteSource,
    ) -> Result<Self> {
        match method {
            EncryptionMethod::None => Ok(EncryptWriter::None(inner)),
            EncryptionMethod::Pkware => Ok(EncryptWriter::Pkware(pkware::PkwareEncryptWriter::new(
                inner, password, check,
            ))),
            _ if method.is_aes() => Ok(EncryptWriter::WinZipAes(
                winzip_aes::WinZipAesEncryptWriter::new(inner, method, password)?,
            )),
            _ => Err(ZipError::FeatureUnsupported(
                "unsupported encryption method".to_string(),
            )),
        }
    }

    /// Finalizes the stream, returning any trailer bytes to append after
    /// the ciphertext (empty for PKWARE/None, the 10-byte HMAC tag for
    /// WinZip AES) and the unwrapped inner writer.
    pub fn finish(self) -> std::io::Result<(Vec<u8>, W)> {
        match self {
            EncryptWriter::None(w) => Ok((Vec::new(), w)),
            EncryptWriter::Pkware(w) => Ok((Vec::new(), w.into_inner())),
            EncryptWriter::WinZipAes(w) => {
                let (tag, inner) = w.finish()?;
                Ok((tag.to_vec(), inner))
            }
        }
    }
}

impl<W: Write> Write for EncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            EncryptWriter::None(w) => w.write(buf),
            EncryptWriter::Pkware(w) => w.write(buf),
            EncryptWriter::WinZipAes(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            EncryptWriter::None(w) => w.flush(),
            EncryptWriter::Pkware(w) => w.flush(),
            EncryptWriter::WinZipAes(w) => w.flush(),
        }
    }
}

/// A reader that decrypts whatever is read from it, dispatched by
/// method. For WinZip AES, [`verify`](Self::verify) must be called with
/// the trailing 10-byte tag once the caller has exhausted the ciphertext.
pub enum DecryptReader<R: Read> {
    None(R),
    Pkware(pkware::PkwareDecryptReader<R>),
    WinZipAes(winzip_aes::WinZipAesDecryptReader<R>),
}

impl<R: Read> DecryptReader<R> {
    pub fn new(
        inner: R,
        method: EncryptionMethod,
        password: &[u8],
        check: CheckByteSource,
    ) -> Result<Self> {
        match method {
            EncryptionMethod::None => Ok(DecryptReader::None(inner)),
            EncryptionMethod::Pkware => Ok(DecryptReader::Pkware(
                pkware::PkwareDecryptReader::new(inner, password, check),
            )),
            _ if method.is_aes() => Ok(DecryptReader::WinZipAes(
                winzip_aes::WinZipAesDecryptReader::new(inner, method, password)?,
            )),
            _ => Err(ZipError::FeatureUnsupported(
                "unsupported encryption method".to_string(),
            )),
        }
    }

    /// Verifies the stream's trailer, if it has one. PKWARE/None have
    /// none (the sole integrity check is the plaintext CRC32, checked by
    /// the caller after decompression); WinZip AES checks the HMAC tag.
    pub fn verify(&self, trailer: &[u8]) -> Result<()> {
        match self {
            DecryptReader::None(_) | DecryptReader::Pkware(_) => Ok(()),
            DecryptReader::WinZipAes(r) => r.verify(trailer),
        }
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            DecryptReader::None(r) => r.read(buf),
            DecryptReader::Pkware(r) => r.read(buf),
            DecryptReader::WinZipAes(r) => r.read(buf),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn pkware_roundtrip_through_dispatch() {
        let plaintext = b"roundtrip through the unified dispatch".to_vec();
        let crc = crc32fast::hash(&plaintext);
        let mut ciphertext = Vec::new();
        {
            let mut w = EncryptWriter::new(
                &mut ciphertext,
                EncryptionMethod::Pkware,
                b"pw",
                CheckByteSource::Crc32High(crc),
            )
            .unwrap();
            w.write_all(&plaintext).unwrap();
            w.finish().unwrap();
        }

        let mut r = DecryptReader::new(
            Cursor::new(&ciphertext),
            EncryptionMethod::Pkware,
            b"pw",
            CheckByteSource::Crc32High(crc),
        )
        .unwrap();
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, plaintext);
    }

    #[test]
    fn aes_roundtrip_through_dispatch() {
        let plaintext = b"aes through the unified dispatch".to_vec();
        let mut ciphertext = Vec::new();
        let trailer = {
            let mut w = EncryptWriter::new(
                &mut ciphertext,
                EncryptionMethod::Aes256,
                b"pw",
                CheckByteSource::Crc32High(0),
            )
            .unwrap();
            w.write_all(&plaintext).unwrap();
            w.finish().unwrap().0
        };

        let r = DecryptReader::new(
            Cursor::new(&ciphertext),
            EncryptionMethod::Aes256,
            b"pw",
            CheckByteSource::Crc32High(0),
        )
        .unwrap();
        let mut reader = r;
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, plaintext);
        reader.verify(&trailer).unwrap();
    }
}
