//! WinZip AES extra field (header ID 0x9901). See spec.md §4.1/§4.4.2.

use crate::error::{Result, ZipError};
use crate::model::EncryptionMethod;

pub const HEADER_ID: u16 = 0x9901;
const VENDOR_ID: [u8; 2] = *b"AE";

/// AE-1 retains the plaintext CRC check; AE-2 relies solely on the HMAC
/// and always stores CRC32 = 0 (spec.md §4.4.2, §9 open question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorVersion {
    Ae1,
    Ae2,
}

impl VendorVersion {
    fn code(self) -> u16 {
        match self {
            VendorVersion::Ae1 => 1,
            VendorVersion::Ae2 => 2,
        }
    }

    fn from_code(code: u16) -> Result<Self> {
        match code {
            1 => Ok(VendorVersion::Ae1),
            2 => Ok(VendorVersion::Ae2),
            other => Err(ZipError::InvalidFormat(format!(
                "unknown WinZip AES vendor version {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesExtra {
    pub vendor_version: VendorVersion,
    pub encryption: EncryptionMethod,
    /// The true compression method, hidden behind method=99 at the
    /// header level.
    pub actual_compression_method: u16,
}

pub fn decode(payload: &[u8]) -> Result<AesExtra> {
    if payload.len() != 7 {
        return Err(ZipError::InvalidFormat(format!(
            "WinZip AES extra field must be 7 bytes, got {}",
            payload.len()
        )));
    }
    let vendor_version = VendorVersion::from_code(u16::from_le_bytes([payload[0], payload[1]]))?;
    if payload[2..4] != VENDOR_ID {
        return Err(ZipError::InvalidFormat(
            "WinZip AES extra field has wrong vendor id".to_string(),
        ));
    }
    let strength = payload[4];
    let encryption = EncryptionMethod::from_aes_strength_code(strength)?;
    let actual_compression_method = u16::from_le_bytes([payload[5], payload[6]]);
    Ok(AesExtra {
        vendor_version,
        encryption,
        actual_compression_method,
    })
}

pub fn encode(extra: &AesExtra) -> Vec<u8> {
    let mut out = Vec::with_capacity(7);
    out.extend_from_slice(&extra.vendor_version.code().to_le_bytes());
    out.extend_from_slice(&VENDOR_ID);
    out.push(
        extra
            .encryption
            .aes_strength_code()
            .expect("AesExtra::encryption must be an AES variant"),
    );
    out.extend_from_slice(&extra.actual_compression_method.to_le_bytes());
    out
}
