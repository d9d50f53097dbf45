//! `String` and `Identifier` decoding.

use tracing::trace;

use super::{Decoder, field};
use crate::error::{Error, Result};
use crate::process::{ByteBuffer, ReadMemory, decode_utf8_lossy};

impl<R: ReadMemory + ?Sized> Decoder<'_, R> {
    /// Decode the `String { buf, len }` cell at `address`.
    ///
    /// Reads exactly `len` bytes; invalid UTF-8 is replaced, never rejected.
    pub(crate) fn decode_string(&mut self, address: u64) -> Result<String> {
        let layout = &self.layout.string;
        let width = self.layout.pointer_size;

        let image = self.reader.read_bytes(address, layout.size as usize)?;
        let header = ByteBuffer::at(address, &image);
        let buf = header.word_at(layout.buf, width)?;
        let len = header.word_at(layout.len, width)?;
        trace!("String at {:#x}: buf={:#x} len={}", address, buf, len);

        if len == 0 {
            return Ok(String::new());
        }
        if len > self.options.max_string_len as u64 {
            return Err(Error::MemoryReadFailed {
                address: buf,
                message: format!(
                    "String length {} exceeds limit {}",
                    len, self.options.max_string_len
                ),
            });
        }

        let bytes = self.reader.read_bytes(buf, len as usize)?;
        Ok(decode_utf8_lossy(&bytes))
    }

    /// Decode the name of the `Identifier` at `address`.
    pub(crate) fn decode_identifier(&mut self, address: u64) -> Result<String> {
        self.decode_string(field(address, self.layout.identifier.value)?)
    }
}

/// Quote `text` as a literal so quotes and control characters cannot be
/// confused with the renderer's own delimiters.
///
/// Single quotes unless the text contains `'` and no `"`.
pub fn quote(text: &str) -> String {
    let delim = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut out = String::with_capacity(text.len() + 2);
    out.push(delim);
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push_str(&format!("\\x{:02x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}
