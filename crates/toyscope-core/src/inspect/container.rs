//! Namespace hash-table and linked-list walks.

use tracing::trace;

use super::{Decoder, field};
use super::guard::Visited;
use super::node::{ElementNode, NamespaceNode, PairNode};
use crate::error::{Error, Result};
use crate::process::layout::NodeLayout;
use crate::process::{ByteBuffer, ReadMemory};

impl<R: ReadMemory + ?Sized> Decoder<'_, R> {
    /// Decode the namespace at `address` and every enclosing scope.
    ///
    /// The chain ends at the first scope without a parent link. Reaching a
    /// scope twice is a cycle error.
    pub(crate) fn decode_scope_chain(&mut self, address: u64) -> Result<Vec<NamespaceNode>> {
        let mut visited = Visited::default();
        let mut chain = Vec::new();
        let mut current = address;

        while current != 0 {
            visited.insert(current)?;
            let scope = self.decode_namespace(current)?;
            current = scope.parent.unwrap_or(0);
            chain.push(scope);
        }

        Ok(chain)
    }

    /// Decode one namespace's slots, without following its parent.
    ///
    /// Slots are scanned in index order and the scan stops as soon as `len`
    /// pairs have been found, so trailing slots are never read. Pairs chained
    /// through `Pair.next` count toward `len` and appear right after their
    /// slot's head.
    pub(crate) fn decode_namespace(&mut self, address: u64) -> Result<NamespaceNode> {
        let layout = self.layout;
        let ns = &layout.namespace;
        let width = layout.pointer_size;
        let stride = layout.slot_stride();

        let image = self.reader.read_bytes(address, ns.size as usize)?;
        let header = ByteBuffer::at(address, &image);
        // `len` and `cap` are fixed 64-bit counters on every target.
        let count = header.read_u64_at(ns.len)?;
        let capacity = header.read_u64_at(ns.cap)?;
        let slots = header.word_at(ns.values, width)?;
        let parent = header.word_at(ns.global, width)?;
        trace!(
            "Namespace at {:#x}: len={} cap={} values={:#x} global={:#x}",
            address, count, capacity, slots, parent
        );

        let mut entries = Vec::new();
        let mut pairs_seen = Visited::default();
        let mut found = 0u64;
        let mut index = 0u64;

        while index < capacity && found < count {
            let slot = index
                .checked_mul(stride)
                .and_then(|offset| slots.checked_add(offset))
                .ok_or_else(|| Error::MemoryReadFailed {
                    address: slots,
                    message: format!("Slot {} lies beyond the address space", index),
                })?;
            let mut pair = self.read_ptr(slot)?;

            while pair != 0 && found < count {
                pairs_seen.insert(pair)?;
                trace!("Slot {} -> pair {:#x}", index, pair);
                entries.push(self.decode_pair(pair)?);
                found += 1;

                pair = match layout.pair.next {
                    Some(next) => self.read_ptr(field(pair, next)?)?,
                    None => 0,
                };
            }

            index += 1;
        }

        Ok(NamespaceNode {
            address,
            capacity,
            count,
            entries,
            parent: (parent != 0).then_some(parent),
        })
    }

    /// Decode the `Pair` at `address`; the value only when values are requested.
    pub(crate) fn decode_pair(&mut self, address: u64) -> Result<PairNode> {
        let layout = self.layout;
        let key = self.decode_string(field(address, layout.pair.key)?)?;
        let value = if self.options.include_values {
            Some(self.decode_element(field(address, layout.pair.elem)?)?)
        } else {
            None
        };
        Ok(PairNode { key, value })
    }

    /// Decode an `ElemList` header. A NULL header is an empty list.
    pub(crate) fn decode_element_list(&mut self, header: u64) -> Result<Vec<ElementNode>> {
        let layout = self.layout;
        let node = &layout.elem_node;
        self.nested(header, |d| d.walk_list(header, node, |d, at| d.decode_element(at)))
    }

    /// Decode an `IdentList` header into identifier names.
    pub(crate) fn decode_ident_list(&mut self, header: u64) -> Result<Vec<String>> {
        let layout = self.layout;
        let node = &layout.ident_node;
        self.walk_list(header, node, |d, at| d.decode_identifier(at))
    }

    /// Follow `head`, then each node's `next`, decoding node payloads in order.
    fn walk_list<T, F>(&mut self, header: u64, node: &NodeLayout, mut decode: F) -> Result<Vec<T>>
    where
        F: FnMut(&mut Self, u64) -> Result<T>,
    {
        if header == 0 {
            return Ok(Vec::new());
        }

        let mut visited = Visited::default();
        let mut items = Vec::new();
        let mut cursor = self.read_ptr(field(header, self.layout.list.head)?)?;

        while cursor != 0 {
            visited.insert(cursor)?;
            items.push(decode(self, field(cursor, node.value)?)?);
            cursor = self.read_ptr(field(cursor, node.next)?)?;
        }

        trace!("List at {:#x}: {} nodes", header, items.len());
        Ok(items)
    }
}
