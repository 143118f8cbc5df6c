//! Traditional PKWARE encryption (spec.md §4.4.1): three 32-bit keys mixed
//! with each plaintext byte, a 12-byte decryption header, and a
//! single check byte used to reject wrong passwords cheaply.

use std::io::{Read, Write};

use crate::error::{Result, ZipError};

const K0_INIT: u32 = 305_419_896;
const K1_INIT: u32 = 591_751_049;
const K2_INIT: u32 = 878_082_192;
const HEADER_LEN: usize = 12;

/// The three-key keystream state shared by encryption and decryption.
#[derive(Debug, Clone, Copy)]
struct PkwareKeys {
    k0: u32,
    k1: u32,
    k2: u32,
}

impl PkwareKeys {
    fn new(password: &[u8]) -> Self {
        let mut keys = PkwareKeys {
            k0: K0_INIT,
            k1: K1_INIT,
            k2: K2_INIT,
        };
        for &b in password {
            keys.update(b);
        }
        keys
    }

    /// Mixes in a plaintext byte, per spec.md's keystream recurrence.
    fn update(&mut self, plain_byte: u8) {
        self.k0 = crc32_update(self.k0, plain_byte);
        self.k1 = self
            .k1
            .wrapping_add(self.k0 & 0xFF)
            .wrapping_mul(134_775_813)
            .wrapping_add(1);
        self.k2 = crc32_update(self.k2, ((self.k1 >> 24) & 0xFF) as u8);
    }

    fn keystream_byte(&self) -> u8 {
        let temp = (self.k2 | 2) as u16;
        (temp.wrapping_mul(temp ^ 1) >> 8) as u8
    }

    fn encrypt_byte(&mut self, plain: u8) -> u8 {
        let cipher = plain ^ self.keystream_byte();
        self.update(plain);
        cipher
    }

    fn decrypt_byte(&mut self, cipher: u8) -> u8 {
        let plain = cipher ^ self.keystream_byte();
        self.update(plain);
        plain
    }
}

/// `CRC32_update(k, b) = (k >> 8) XOR table[(k XOR b) & 0xFF]`, reflected
/// polynomial `0xEDB88320`.
fn crc32_update(k: u32, b: u8) -> u32 {
    (k >> 8) ^ CRC32_TABLE[((k ^ b as u32) & 0xFF) as usize]
}

static CRC32_TABLE: [u32; 256] = build_crc32_table();

const fn build_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut j = 0;
        while j < 8 {
            c = if c & 1 != 0 {
                0xEDB8_8320 ^ (c >> 1)
            } else {
                c >> 1
            };
            j += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Which byte the 12-byte decryption header's last byte must match
/// (spec.md §4.4.1): when no data descriptor is used, the high byte of
/// the entry's CRC-32; when one is used, the high byte of the DOS time.
#[derive(Debug, Clone, Copy)]
pub enum CheckByteSource {
    Crc32High(u32),
    DosTimeHigh(u16),
}

impl CheckByteSource {
    fn byte(self) -> u8 {
        match self {
            CheckByteSource::Crc32High(crc) => (crc >> 24) as u8,
            CheckByteSource::DosTimeHigh(time) => (time >> 8) as u8,
        }
    }
}

/// Encrypts a byte stream, writing the 12-byte decryption header on the
/// first write (one-shot header absorption per spec.md §4.4.3).
pub struct PkwareEncryptWriter<W: Write> {
    inner: W,
    keys: PkwareKeys,
    check_byte: u8,
    header_written: bool,
}

impl<W: Write> PkwareEncryptWriter<W> {
    pub fn new(inner: W, password: &[u8], check: CheckByteSource) -> Self {
        PkwareEncryptWriter {
            inner,
            keys: PkwareKeys::new(password),
            check_byte: check.byte(),
            header_written: false,
        }
    }

    fn write_header(&mut self) -> std::io::Result<()> {
        let mut header = [0u8; HEADER_LEN];
        getrandom::getrandom(&mut header[..HEADER_LEN - 1])
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        header[HEADER_LEN - 1] = self.check_byte;
        for b in header.iter_mut() {
            *b = self.keys.encrypt_byte(*b);
        }
        self.inner.write_all(&header)?;
        self.header_written = true;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for PkwareEncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !self.header_written {
            self.write_header()?;
        }
        let mut encrypted = Vec::with_capacity(buf.len());
        for &b in buf {
            encrypted.push(self.keys.encrypt_byte(b));
        }
        self.inner.write_all(&encrypted)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypts a byte stream, consuming and verifying the 12-byte
/// decryption header on the first read.
pub struct PkwareDecryptReader<R: Read> {
    inner: R,
    keys: PkwareKeys,
    check_byte: u8,
    header_consumed: bool,
}

impl<R: Read> PkwareDecryptReader<R> {
    pub fn new(inner: R, password: &[u8], check: CheckByteSource) -> Self {
        PkwareDecryptReader {
            inner,
            keys: PkwareKeys::new(password),
            check_byte: check.byte(),
            header_consumed: false,
        }
    }

    fn consume_header(&mut self) -> Result<()> {
        let mut header = [0u8; HEADER_LEN];
        self.inner.read_exact(&mut header)?;
        let mut last = 0u8;
        for b in header.iter_mut() {
            last = self.keys.decrypt_byte(*b);
            *b = last;
        }
        self.header_consumed = true;
        if last != self.check_byte {
            return Err(ZipError::ZipAuthentication(
                "bad password or corrupt stream".to_string(),
            ));
        }
        Ok(())
    }
}

impl<R: Read> Read for PkwareDecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.header_consumed {
            self.consume_header()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        }
        let n = self.inner.read(buf)?;
        for b in &mut buf[..n] {
            *b = self.keys.decrypt_byte(*b);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn encrypt_decrypt_roundtrip() {
        let password = b"secret";
        let plaintext = vec![0xAAu8; 100_000];
        let crc = crc32fast::hash(&plaintext);

        let mut ciphertext = Vec::new();
        {
            let mut writer = PkwareEncryptWriter::new(
                &mut ciphertext,
                password,
                CheckByteSource::Crc32High(crc),
            );
            writer.write_all(&plaintext).unwrap();
        }
        assert_eq!(ciphertext.len(), plaintext.len() + HEADER_LEN);

        let mut reader = PkwareDecryptReader::new(
            Cursor::new(&ciphertext),
            password,
            CheckByteSource::Crc32High(crc),
        );
        let mut decrypted = Vec::new();
        reader.read_to_end(&mut decrypted).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn wrong_password_is_rejected() {
        let plaintext = vec![0x55u8; 64];
        let crc = crc32fast::hash(&plaintext);
        let mut ciphertext = Vec::new();
        {
            let mut writer =
                PkwareEncryptWriter::new(&mut ciphertext, b"right", CheckByteSource::Crc32High(crc));
            writer.write_all(&plaintext).unwrap();
        }

        let mut reader = PkwareDecryptReader::new(
            Cursor::new(&ciphertext),
            b"wrong",
            CheckByteSource::Crc32High(crc),
        );
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
