//! STORE (method 0): no compression, a pass-through `Write`/`Read`.

use std::io::Write;

pub struct StoreWriter<W: Write> {
    inner: W,
}

impl<W: Write> StoreWriter<W> {
    pub fn new(inner: W) -> Self {
        StoreWriter { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for StoreWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}
