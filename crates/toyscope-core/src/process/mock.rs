//! Mock memory for testing
//!
//! Provides a configurable implementation of the ReadMemory trait that reads
//! from an in-memory buffer instead of a real process, plus [`MockHeap`], which
//! lays out toyscript runtime structures in such a buffer.

use std::ops::Range;

use crate::error::{Error, Result};
use crate::process::ReadMemory;
use crate::process::layout::Layout;

/// Mock memory reader for testing
///
/// Reads from an in-memory buffer, allowing tests to verify decoding logic
/// without requiring access to a real process. Ranges marked unreadable fail
/// like unmapped pages would.
#[derive(Debug, Clone)]
pub struct MockMemoryReader {
    data: Vec<u8>,
    base: u64,
    unreadable: Vec<Range<u64>>,
    pointer_size: Option<usize>,
}

impl MockMemoryReader {
    /// Create a new mock reader with the given data at base address 0x1000
    pub fn new(data: Vec<u8>) -> Self {
        Self::with_base(data, 0x1000)
    }

    /// Create a new mock reader with custom base address
    pub fn with_base(data: Vec<u8>, base: u64) -> Self {
        Self {
            data,
            base,
            unreadable: Vec::new(),
            pointer_size: None,
        }
    }

    pub fn base_address(&self) -> u64 {
        self.base
    }

    /// Get the size of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl ReadMemory for MockMemoryReader {
    fn read_bytes(&self, address: u64, size: usize) -> Result<Vec<u8>> {
        if address < self.base {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("Address below base (base=0x{:X})", self.base),
            });
        }
        let end = address
            .checked_add(size as u64)
            .ok_or_else(|| Error::MemoryReadFailed {
                address,
                message: "Address overflow".to_string(),
            })?;
        if let Some(hole) = self
            .unreadable
            .iter()
            .find(|hole| address < hole.end && hole.start < end)
        {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!("Unreadable range 0x{:X}..0x{:X}", hole.start, hole.end),
            });
        }
        let offset = (address - self.base) as usize;
        if offset.saturating_add(size) > self.data.len() {
            return Err(Error::MemoryReadFailed {
                address,
                message: format!(
                    "Out of bounds: offset={}, size={}, len={}",
                    offset,
                    size,
                    self.data.len()
                ),
            });
        }
        Ok(self.data[offset..offset + size].to_vec())
    }

    fn pointer_size(&self) -> Option<usize> {
        self.pointer_size
    }
}

/// Builder for creating test memory buffers
///
/// Provides a fluent API for constructing memory layouts for testing.
#[derive(Debug, Clone)]
pub struct MockMemoryBuilder {
    data: Vec<u8>,
    base: u64,
    unreadable: Vec<Range<u64>>,
    pointer_size: Option<usize>,
}

impl Default for MockMemoryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMemoryBuilder {
    /// Create a new builder with default base address (0x1000)
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            base: 0x1000,
            unreadable: Vec::new(),
            pointer_size: None,
        }
    }

    /// Set the base address for the mock reader
    pub fn base(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Report `width` as the target pointer size
    pub fn pointer_size(mut self, width: usize) -> Self {
        self.pointer_size = Some(width);
        self
    }

    /// Pre-allocate buffer with zeros up to the specified size
    pub fn with_size(mut self, size: usize) -> Self {
        self.data.resize(size, 0);
        self
    }

    /// Write an unsigned 32-bit integer at the specified offset from base
    pub fn write_u32(mut self, offset: usize, value: u32) -> Self {
        self.put(offset, &value.to_le_bytes());
        self
    }

    /// Write a signed 64-bit integer at the specified offset from base
    pub fn write_i64(mut self, offset: usize, value: i64) -> Self {
        self.put(offset, &value.to_le_bytes());
        self
    }

    /// Write an unsigned 64-bit integer at the specified offset from base
    pub fn write_u64(mut self, offset: usize, value: u64) -> Self {
        self.put(offset, &value.to_le_bytes());
        self
    }

    /// Write raw bytes at the specified offset from base
    pub fn write_bytes(mut self, offset: usize, bytes: &[u8]) -> Self {
        self.put(offset, bytes);
        self
    }

    /// Make `len` bytes at `offset` fail on read
    pub fn unreadable(mut self, offset: usize, len: usize) -> Self {
        let start = self.base + offset as u64;
        self.unreadable.push(start..start + len as u64);
        self
    }

    /// Build the MockMemoryReader
    pub fn build(self) -> MockMemoryReader {
        MockMemoryReader {
            data: self.data,
            base: self.base,
            unreadable: self.unreadable,
            pointer_size: self.pointer_size,
        }
    }

    fn put(&mut self, offset: usize, bytes: &[u8]) {
        let end = offset + bytes.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[offset..end].copy_from_slice(bytes);
    }
}

/// A toyscript value to lay out in a [`MockHeap`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockElement {
    Null,
    Error(String),
    Int(i64),
    Str(Vec<u8>),
    Bool(bool),
    List(Vec<MockElement>),
    Return(Box<MockElement>),
    Function { params: Vec<String>, closure: u64 },
    Builtin,
    /// Raw discriminant with an untouched payload.
    Tag(u32),
}

impl MockElement {
    pub fn str(text: &str) -> Self {
        MockElement::Str(text.as_bytes().to_vec())
    }
}

/// One namespace entry: slot index, key, value.
pub type MockEntry<'a> = (usize, &'a str, MockElement);

/// Bump allocator that writes toyscript structures into mock memory.
///
/// Every `alloc_*`/constructor returns the target address of the new
/// structure. Address 0 is never handed out, so it can stand for NULL.
pub struct MockHeap {
    layout: Layout,
    builder: MockMemoryBuilder,
    base: u64,
    next: u64,
}

impl MockHeap {
    pub fn new(layout: Layout) -> Self {
        let base = 0x1000;
        Self {
            layout,
            builder: MockMemoryBuilder::new().base(base),
            base,
            // Keep the base address itself unused.
            next: base + 0x10,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Reserve `size` zeroed bytes, 8-byte aligned.
    pub fn alloc(&mut self, size: u64) -> u64 {
        let addr = (self.next + 7) & !7;
        self.next = addr + size.max(1);
        let end = (self.next - self.base) as usize;
        self.builder.put(end - 1, &[0]);
        addr
    }

    pub fn write_bytes(&mut self, address: u64, bytes: &[u8]) {
        let offset = (address - self.base) as usize;
        self.builder.put(offset, bytes);
    }

    pub fn write_u32(&mut self, address: u64, value: u32) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_i64(&mut self, address: u64, value: i64) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    pub fn write_u64(&mut self, address: u64, value: u64) {
        self.write_bytes(address, &value.to_le_bytes());
    }

    /// Write a pointer-sized word.
    pub fn write_ptr(&mut self, address: u64, value: u64) {
        let bytes = value.to_le_bytes();
        let width = self.layout.pointer_size;
        self.write_bytes(address, &bytes[..width]);
    }

    /// Read back a pointer-sized word written earlier.
    pub fn read_word(&self, address: u64) -> u64 {
        let offset = (address - self.base) as usize;
        let mut bytes = [0u8; 8];
        let width = self.layout.pointer_size;
        bytes[..width].copy_from_slice(&self.builder.data[offset..offset + width]);
        u64::from_le_bytes(bytes)
    }

    /// Address of a namespace's slot array.
    pub fn namespace_slots(&self, namespace: u64) -> u64 {
        self.read_word(namespace + self.layout.namespace.values)
    }

    /// Make a range fail on read.
    pub fn mark_unreadable(&mut self, address: u64, len: u64) {
        self.builder.unreadable.push(address..address + len);
    }

    /// Write a `String { buf, len }` at `at` pointing to fresh bytes.
    pub fn write_string(&mut self, at: u64, bytes: &[u8]) {
        let buf = if bytes.is_empty() {
            0
        } else {
            let buf = self.alloc(bytes.len() as u64);
            self.write_bytes(buf, bytes);
            buf
        };
        self.write_string_raw(at, buf, bytes.len() as u64);
    }

    /// Write a `String` header with an arbitrary buffer and length.
    pub fn write_string_raw(&mut self, at: u64, buf: u64, len: u64) {
        let layout = self.layout.string.clone();
        self.write_ptr(at + layout.buf, buf);
        self.write_ptr(at + layout.len, len);
    }

    /// Allocate a standalone `String` struct.
    pub fn string(&mut self, text: &str) -> u64 {
        let at = self.alloc(self.layout.string.size);
        self.write_string(at, text.as_bytes());
        at
    }

    /// Allocate an `Identifier` struct.
    pub fn identifier(&mut self, name: &str) -> u64 {
        let at = self.alloc(self.layout.identifier.size);
        self.write_string(at + self.layout.identifier.value, name.as_bytes());
        at
    }

    /// Allocate an `Element` struct.
    pub fn element(&mut self, value: &MockElement) -> u64 {
        let at = self.alloc(self.layout.element.size);
        self.write_element(at, value);
        at
    }

    /// Write an `Element` in place.
    pub fn write_element(&mut self, at: u64, value: &MockElement) {
        let layout = self.layout.element.clone();
        let payload = at + layout.payload;
        let tag = match value {
            MockElement::Null => 0,
            MockElement::Error(msg) => {
                self.write_string(payload, msg.as_bytes());
                1
            }
            MockElement::Int(v) => {
                self.write_i64(payload, *v);
                2
            }
            MockElement::Str(bytes) => {
                self.write_string(payload, bytes);
                3
            }
            MockElement::Bool(b) => {
                self.write_bytes(payload, &[u8::from(*b)]);
                4
            }
            MockElement::List(items) => {
                let list = self.elem_list(items);
                self.write_ptr(payload, list);
                5
            }
            MockElement::Return(inner) => {
                let inner = self.element(inner);
                self.write_ptr(payload, inner);
                6
            }
            MockElement::Function { params, closure } => {
                let names: Vec<&str> = params.iter().map(String::as_str).collect();
                let params = self.ident_list(&names);
                self.write_ptr(at + layout.function_params, params);
                self.write_ptr(at + layout.function_namespace, *closure);
                7
            }
            MockElement::Builtin => 8,
            MockElement::Tag(tag) => *tag,
        };
        self.write_u32(at + layout.tag, tag);
    }

    /// Allocate an `ElemList` with one node per item; returns the header address.
    pub fn elem_list(&mut self, items: &[MockElement]) -> u64 {
        let node = self.layout.elem_node.clone();
        let nodes: Vec<u64> = items
            .iter()
            .map(|item| {
                let at = self.alloc(node.size);
                self.write_element(at + node.value, item);
                at
            })
            .collect();
        self.link_list(&nodes, node.next)
    }

    /// Allocate an `IdentList`; returns the header address.
    pub fn ident_list(&mut self, names: &[&str]) -> u64 {
        let node = self.layout.ident_node.clone();
        let value = self.layout.identifier.value;
        let nodes: Vec<u64> = names
            .iter()
            .map(|name| {
                let at = self.alloc(node.size);
                self.write_string(at + node.value + value, name.as_bytes());
                at
            })
            .collect();
        self.link_list(&nodes, node.next)
    }

    fn link_list(&mut self, nodes: &[u64], next_offset: u64) -> u64 {
        for pair in nodes.windows(2) {
            self.write_ptr(pair[0] + next_offset, pair[1]);
        }
        let header = self.alloc(self.layout.list.size);
        self.write_ptr(header + self.layout.list.head, nodes.first().copied().unwrap_or(0));
        header
    }

    /// Allocate a `Pair`.
    pub fn pair(&mut self, key: &str, value: &MockElement) -> u64 {
        let layout = self.layout.pair.clone();
        let at = self.alloc(layout.size);
        self.write_string(at + layout.key, key.as_bytes());
        self.write_element(at + layout.elem, value);
        at
    }

    /// Allocate a `Namespace` with `capacity` slots.
    ///
    /// Entries sharing a slot index are chained through `Pair.next` in the
    /// order given. `len` is set to the number of entries.
    pub fn namespace(&mut self, capacity: u64, entries: &[MockEntry<'_>], parent: Option<u64>) -> u64 {
        let layout = self.layout.namespace.clone();
        let stride = self.layout.slot_stride();
        let next = self.layout.pair.next;

        let at = self.alloc(layout.size);
        let slots = self.alloc(capacity * stride);

        let mut tails: Vec<Option<u64>> = vec![None; capacity as usize];
        for (slot, key, value) in entries {
            let pair = self.pair(key, value);
            match (tails[*slot], next) {
                (Some(tail), Some(next)) => self.write_ptr(tail + next, pair),
                _ => self.write_ptr(slots + *slot as u64 * stride, pair),
            }
            tails[*slot] = Some(pair);
        }

        self.write_u64(at + layout.len, entries.len() as u64);
        self.write_u64(at + layout.cap, capacity);
        self.write_ptr(at + layout.values, slots);
        self.write_ptr(at + layout.global, parent.unwrap_or(0));
        at
    }

    /// Allocate an `Environment` pointing at `namespace`.
    pub fn environment(&mut self, namespace: u64) -> u64 {
        let at = self.alloc(self.layout.environment.size);
        self.write_ptr(at + self.layout.environment.namespace, namespace);
        at
    }

    /// Allocate a pointer cell holding `target`.
    pub fn pointer_to(&mut self, target: u64) -> u64 {
        let at = self.alloc(self.layout.pointer_size as u64);
        self.write_ptr(at, target);
        at
    }

    /// Finish the heap; the reader reports the layout's pointer size.
    pub fn build(self) -> MockMemoryReader {
        let width = self.layout.pointer_size;
        self.builder.pointer_size(width).build()
    }
}
