//! WinZip AES encryption (spec.md §4.4.2): PBKDF2-HMAC-SHA1 key
//! derivation, AES-CTR in WinZip's little-endian counter layout, and an
//! HMAC-SHA1 authentication tag over the ciphertext.

use std::io::{Read, Write};

use aes::{Aes128, Aes192, Aes256};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;

use crate::error::{Result, ZipError};
use crate::model::EncryptionMethod;

type HmacSha1 = Hmac<Sha1>;
const PBKDF2_ITERATIONS: u32 = 1000;
const MAC_LEN: usize = 10;
const PWVERIFY_LEN: usize = 2;

pub fn key_size(method: EncryptionMethod) -> Result<usize> {
    method
        .aes_key_size()
        .ok_or_else(|| ZipError::InvalidArgument("not an AES encryption method".to_string()))
}

pub fn salt_size(method: EncryptionMethod) -> Result<usize> {
    Ok(key_size(method)? / 2)
}

/// Overhead WinZip AES framing adds beyond the compressed plaintext:
/// salt + 2-byte password verifier + 10-byte MAC.
pub fn overhead(method: EncryptionMethod) -> Result<u64> {
    Ok((salt_size(method)? + PWVERIFY_LEN + MAC_LEN) as u64)
}

struct DerivedKeys {
    crypt_key: Vec<u8>,
    mac: HmacSha1,
    pwverify: [u8; PWVERIFY_LEN],
}

fn derive(password: &[u8], salt: &[u8], key_len: usize) -> DerivedKeys {
    let dk_len = key_len * 2 + PWVERIFY_LEN;
    let mut derived = vec![0u8; dk_len];
    pbkdf2_hmac::<Sha1>(password, salt, PBKDF2_ITERATIONS, &mut derived);

    let crypt_key = derived[..key_len].to_vec();
    let mac_key = &derived[key_len..key_len * 2];
    let pwverify = [derived[key_len * 2], derived[key_len * 2 + 1]];
    let mac = HmacSha1::new_from_slice(mac_key).expect("HMAC accepts any key length");

    DerivedKeys {
        crypt_key,
        mac,
        pwverify,
    }
}

enum Cipher {
    Aes128(ctr::Ctr128LE<Aes128>),
    Aes192(ctr::Ctr128LE<Aes192>),
    Aes256(ctr::Ctr128LE<Aes256>),
}

impl Cipher {
    /// WinZip's counter layout: a little-endian 64-bit block counter in
    /// the low 8 bytes of a 16-byte IV, zero-filled upper 8 bytes,
    /// starting at 1 (spec.md §4.4.2).
    fn new(method: EncryptionMethod, key: &[u8]) -> Self {
        let iv = 1u128.to_le_bytes();
        match method {
            EncryptionMethod::Aes128 => Cipher::Aes128(ctr::Ctr128LE::new(key.into(), iv.as_slice().into())),
            EncryptionMethod::Aes192 => Cipher::Aes192(ctr::Ctr128LE::new(key.into(), iv.as_slice().into())),
            EncryptionMethod::Aes256 => Cipher::Aes256(ctr::Ctr128LE::new(key.into(), iv.as_slice().into())),
            _ => unreachable!("caller must validate AES variant"),
        }
    }

    fn apply_keystream(&mut self, buf: &mut [u8]) {
        match self {
            Cipher::Aes128(c) => c.apply_keystream(buf),
            Cipher::Aes192(c) => c.apply_keystream(buf),
            Cipher::Aes256(c) => c.apply_keystream(buf),
        }
    }
}

/// Encrypts a byte stream: writes `salt || pwVerify` on the first write,
/// then AES-CTR ciphertext; the HMAC is accumulated over ciphertext and
/// retrieved with [`finish`](Self::finish) once the caller is done
/// writing (one-shot tag emission at stream end, per spec.md §4.4.3).
pub struct WinZipAesEncryptWriter<W: Write> {
    inner: W,
    method: EncryptionMethod,
    salt: Vec<u8>,
    pwverify: [u8; PWVERIFY_LEN],
    cipher: Cipher,
    mac: HmacSha1,
    header_written: bool,
}

impl<W: Write> WinZipAesEncryptWriter<W> {
    pub fn new(inner: W, method: EncryptionMethod, password: &[u8]) -> Result<Self> {
        let key_len = key_size(method)?;
        let salt_len = key_len / 2;
        let mut salt = vec![0u8; salt_len];
        getrandom::getrandom(&mut salt)
            .map_err(|e| ZipError::InvalidFormat(format!("failed to generate AES salt: {e}")))?;

        let derived = derive(password, &salt, key_len);
        let cipher = Cipher::new(method, &derived.crypt_key);

        Ok(WinZipAesEncryptWriter {
            inner,
            method,
            salt,
            pwverify: derived.pwverify,
            cipher,
            mac: derived.mac,
            header_written: false,
        })
    }

    fn write_header(&mut self) -> std::io::Result<()> {
        self.inner.write_all(&self.salt)?;
        self.inner.write_all(&self.pwverify)?;
        self.header_written = true;
        Ok(())
    }

    /// Finalizes the stream, returning the 10-byte truncated HMAC-SHA1
    /// authentication tag to append after the ciphertext.
    pub fn finish(mut self) -> std::io::Result<([u8; MAC_LEN], W)> {
        if !self.header_written {
            self.write_header()?;
        }
        self.inner.flush()?;
        let full = self.mac.finalize().into_bytes();
        let mut tag = [0u8; MAC_LEN];
        tag.copy_from_slice(&full[..MAC_LEN]);
        Ok((tag, self.inner))
    }

    pub fn method(&self) -> EncryptionMethod {
        self.method
    }
}

impl<W: Write> Write for WinZipAesEncryptWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if !self.header_written {
            self.write_header()?;
        }
        let mut ciphertext = buf.to_vec();
        self.cipher.apply_keystream(&mut ciphertext);
        self.mac.update(&ciphertext);
        self.inner.write_all(&ciphertext)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// Decrypts a byte stream: consumes `salt || pwVerify` and verifies the
/// password on the first read, then decrypts AES-CTR ciphertext while
/// accumulating the HMAC over it. Call [`verify`](Self::verify) once all
/// ciphertext has been read, with the 10-byte tag read separately from
/// the trailer.
pub struct WinZipAesDecryptReader<R: Read> {
    inner: R,
    cipher: Cipher,
    mac: HmacSha1,
    header_consumed: bool,
    pwverify_expected: [u8; PWVERIFY_LEN],
    password: Vec<u8>,
    method: EncryptionMethod,
}

impl<R: Read> WinZipAesDecryptReader<R> {
    pub fn new(mut inner: R, method: EncryptionMethod, password: &[u8]) -> Result<Self> {
        let key_len = key_size(method)?;
        let salt_len = key_len / 2;
        let mut salt = vec![0u8; salt_len];
        inner.read_exact(&mut salt)?;
        let mut pwverify_on_disk = [0u8; PWVERIFY_LEN];
        inner.read_exact(&mut pwverify_on_disk)?;

        let derived = derive(password, &salt, key_len);
        if derived.pwverify != pwverify_on_disk {
            return Err(ZipError::ZipAuthentication(
                "WinZip AES password verification failed".to_string(),
            ));
        }
        let cipher = Cipher::new(method, &derived.crypt_key);

        Ok(WinZipAesDecryptReader {
            inner,
            cipher,
            mac: derived.mac,
            header_consumed: true,
            pwverify_expected: derived.pwverify,
            password: password.to_vec(),
            method,
        })
    }

    /// Verifies the trailing 10-byte MAC read by the caller after
    /// exhausting ciphertext. AE-1 additionally expects the caller to
    /// check the decompressed plaintext's CRC-32; AE-2 skips that check
    /// (spec.md §4.4.2).
    pub fn verify(&self, tag: &[u8]) -> Result<()> {
        let full = self.mac.clone().finalize().into_bytes();
        if &full[..MAC_LEN] != tag {
            return Err(ZipError::ZipAuthentication(
                "WinZip AES authentication tag mismatch".to_string(),
            ));
        }
        Ok(())
    }

    #[cfg(test)]
    fn password_verified(&self) -> bool {
        let _ = (&self.pwverify_expected, &self.password, self.method);
        self.header_consumed
    }
}

impl<R: Read> Read for WinZipAesDecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.mac.update(&buf[..n]);
        self.cipher.apply_keystream(&mut buf[..n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn roundtrip(method: EncryptionMethod) {
        let password = b"correct horse battery staple";
        let plaintext = vec![0xAAu8; 100_000];

        let mut ciphertext = Vec::new();
        let tag = {
            let mut writer =
                WinZipAesEncryptWriter::new(&mut ciphertext, method, password).unwrap();
            writer.write_all(&plaintext).unwrap();
            let (tag, _) = writer.finish().unwrap();
            tag
        };

        let overhead_len = overhead(method).unwrap() as usize;
        assert_eq!(ciphertext.len() + MAC_LEN, overhead_len + plaintext.len());

        let mut reader =
            WinZipAesDecryptReader::new(Cursor::new(&ciphertext), method, password).unwrap();
        let mut decrypted = Vec::new();
        reader.read_to_end(&mut decrypted).unwrap();
        assert_eq!(decrypted, plaintext);
        reader.verify(&tag).unwrap();
    }

    #[test]
    fn aes256_roundtrip() {
        roundtrip(EncryptionMethod::Aes256);
    }

    #[test]
    fn aes128_roundtrip() {
        roundtrip(EncryptionMethod::Aes128);
    }

    #[test]
    fn tampered_ciphertext_fails_mac() {
        let password = b"hunter2";
        let plaintext = vec![0x42u8; 256];
        let mut ciphertext = Vec::new();
        let tag = {
            let mut writer = WinZipAesEncryptWriter::new(
                &mut ciphertext,
                EncryptionMethod::Aes256,
                password,
            )
            .unwrap();
            writer.write_all(&plaintext).unwrap();
            writer.finish().unwrap().0
        };
        // Flip a byte inside the CTR region (after the 16-byte salt+pwverify header).
        ciphertext[20] ^= 0xFF;

        let mut reader = WinZipAesDecryptReader::new(
            Cursor::new(&ciphertext),
            EncryptionMethod::Aes256,
            password,
        )
        .unwrap();
        let mut decrypted = Vec::new();
        reader.read_to_end(&mut decrypted).unwrap();
        assert!(reader.verify(&tag).is_err());
    }

    #[test]
    fn wrong_password_fails_verification() {
        let plaintext = vec![1u8; 32];
        let mut ciphertext = Vec::new();
        {
            let mut writer = WinZipAesEncryptWriter::new(
                &mut ciphertext,
                EncryptionMethod::Aes256,
                b"right",
            )
            .unwrap();
            writer.write_all(&plaintext).unwrap();
            writer.finish().unwrap();
        }
        let err = WinZipAesDecryptReader::new(
            Cursor::new(&ciphertext),
            EncryptionMethod::Aes256,
            b"wrong",
        )
        .unwrap_err();
        assert!(matches!(err, ZipError::ZipAuthentication(_)));
    }
}
