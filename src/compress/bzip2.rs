//! BZIP2 (method 12) via the `bzip2` crate's `libbz2-rs` backend
//! (spec.md §4.5; picked over the C-library backend so the crate stays
//! free of a native build dependency, matching the rest of the pack's
//! pure-Rust codec preference).

use std::io::{Read, Write};

use bzip2::read::BzDecoder;
use bzip2::write::BzEncoder;
use bzip2::Compression;

use crate::error::Result;

pub struct Bzip2EncoderWriter<W: Write> {
    inner: BzEncoder<W>,
}

impl<W: Write> Bzip2EncoderWriter<W> {
    pub fn new(inner: W, level: u32) -> Self {
        Bzip2EncoderWriter {
            inner: BzEncoder::new(inner, Compression::new(level)),
        }
    }

    pub fn finish(self) -> Result<W> {
        Ok(self.inner.finish()?)
    }
}

impl<W: Write> Write for Bzip2EncoderWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

pub struct Bzip2DecoderReader<R: Read> {
    inner: BzDecoder<R>,
}

impl<R: Read> Bzip2DecoderReader<R> {
    pub fn new(inner: R) -> Self {
        Bzip2DecoderReader {
            inner: BzDecoder::new(inner),
        }
    }
}

impl<R: Read> Read for Bzip2DecoderReader<R> {
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
            let mut w = Bzip2EncoderWriter::new(&mut compressed, 6);
            w.write_all(&data).unwrap();
            w.finish().unwrap();
        }
        assert!(compressed.len() < data.len());

        let mut reader = Bzip2DecoderReader::new(compressed.as_slice());
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, data);
    }
}
