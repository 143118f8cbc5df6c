//! Compression Pipeline (C5): STORE/DEFLATE/BZIP2 encoders and decoders
//! behind a common streaming interface (spec.md §4.5), following the
//! teacher's `flate2::write`/`flate2::read` adapter pattern.

pub mod bzip2;
pub mod deflate;
pub mod store;

use std::io::{Read, Write};

use crate::error::{Result, ZipError};
use crate::model::CompressionMethod;

/// A writer that compresses whatever is written to it and must be
/// explicitly [`finish`](Self::finish)ed to flush any trailing encoder
/// state (DEFLATE/BZIP2 both buffer internally).
pub enum CompressWriter<W: Write> {
    Store(store::StoreWriter<W>),
    Deflate(deflate::DeflateEncoderWriter<W>),
    Bzip2(bzip2::Bzip2EncoderWriter<W>),
}

impl<W: Write> CompressWriter<W> {
    pub fn new(inner: W, method: CompressionMethod, level: u32) -> Self {
        match method {
            CompressionMethod::Store => CompressWriter::Store(store::StoreWriter::new(inner)),
            CompressionMethod::Deflate => {
                CompressWriter::Deflate(deflate::DeflateEncoderWriter::new(inner, level))
            }
            CompressionMethod::Bzip2 => {
                CompressWriter::Bzip2(bzip2::Bzip2EncoderWriter::new(inner, level))
            }
        }
    }

    /// Flushes any buffered compressor state and returns the wrapped
    /// writer.
    pub fn finish(self) -> Result<W> {
        match self {
            CompressWriter::Store(w) => Ok(w.into_inner()),
            CompressWriter::Deflate(w) => w.finish(),
            CompressWriter::Bzip2(w) => w.finish(),
        }
    }
}

impl<W: Write> Write for CompressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            CompressWriter::Store(w) => w.write(buf),
            CompressWriter::Deflate(w) => w.write(buf),
            CompressWriter::Bzip2(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            CompressWriter::Store(w) => w.flush(),
            CompressWriter::Deflate(w) => w.flush(),
            CompressWriter::Bzip2(w) => w.flush(),
        }
    }
}

/// A reader that decompresses whatever is read from the wrapped stream.
pub enum DecompressReader<R: Read> {
    Store(R),
    Deflate(deflate::DeflateDecoderReader<R>),
    Bzip2(bzip2::Bzip2DecoderReader<R>),
}

impl<R: Read> DecompressReader<R> {
    pub fn new(inner: R, method: CompressionMethod) -> Self {
        match method {
            CompressionMethod::Store => DecompressReader::Store(inner),
            CompressionMethod::Deflate => {
                DecompressReader::Deflate(deflate::DeflateDecoderReader::new(inner))
            }
            CompressionMethod::Bzip2 => {
                DecompressReader::Bzip2(bzip2::Bzip2DecoderReader::new(inner))
            }
        }
    }
}

impl<R: Read> Read for DecompressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            DecompressReader::Store(r) => r.read(buf),
            DecompressReader::Deflate(r) => r.read(buf),
            DecompressReader::Bzip2(r) => r.read(buf),
        }
    }
}

/// Clamps a 0-9 compression-level knob to the method's accepted range,
/// erroring rather than silently clamping for methods with no such
/// concept (spec.md §4.5: STORE ignores level; BZIP2 takes 1-9).
pub fn validate_level(method: CompressionMethod, level: u32) -> Result<()> {
    match method {
        CompressionMethod::Store => Ok(()),
        CompressionMethod::Deflate if level <= 9 => Ok(()),
        CompressionMethod::Bzip2 if (1..=9).contains(&level) => Ok(()),
        _ => Err(ZipError::InvalidArgument(format!(
            "compression level {level} out of range for {method:?}"
        ))),
    }
}
