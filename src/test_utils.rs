//! Helpers shared by unit tests.

use std::{io, io::Write};

/// Collects everything written to it into a string.
///
/// Renderers write to a generic writer, so this lets us check the exact output of a render in
/// unit tests.
pub(crate) struct StringWriter {
    internal_buffer: String,
}

impl StringWriter {
    pub fn new() -> Self {
        Self {
            internal_buffer: String::new(),
        }
    }

    /// Consume the writer and return the internal string.
    pub fn consume(self) -> String {
        self.internal_buffer
    }
}

impl Write for StringWriter {
    /// Renderers only ever write complete UTF-8 strings, anything else is a bug.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = std::str::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.internal_buffer.push_str(s);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
