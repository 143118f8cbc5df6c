//! DEFLATE (method 8) via `flate2`, raw stream with no zlib/gzip framing
//! (spec.md §4.5: ZIP's LFH/CDH already carry the sizes and CRC a zlib
//! header would duplicate).

use std::io::{Read, Write};

use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::error::Result;

pub struct DeflateEncoderWriter<W: Write> {
    inner: DeflateEncoder<W>,
}

impl<W: Write> DeflateEncoderWriter<W> {
    pub fn new(inner: W, level: u32) -> Self {
        DeflateEncoderWriter {
            inner: DeflateEncoder::new(inner, Compression::new(level)),
        }
    }

    pub fn finish(self) -> Result<W> {
        Ok(self.inner.finish()?)
    }
}

impl<W: Write> Write for DeflateEncoderWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

pub struct DeflateDecoderReader<R: Read> {
    inner: DeflateDecoder<R>,
}

impl<R: Read> DeflateDecoderReader<R> {
    pub fn new(inner: R) -> Self {
        DeflateDecoderReader {
            inner: DeflateDecoder::new(inner),
        }
    }
}

impl<R: Read> Read for DeflateDecoderReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(200);
        let mut compressed = Vec::new();
        {
            let mut w = DeflateEncoderWriter::new(&mut compressed, 6);
            w.write_all(&data).unwrap();
            w.finish().unwrap();
        }
        assert!(compressed.len() < data.len());

        let mut reader = DeflateDecoderReader::new(compressed.as_slice());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
