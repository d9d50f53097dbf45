//! Decode-and-render pipeline for toyscript interpreter state.
//!
//! A [`Cell`] names an address and a declared type. [`dispatch`] picks the
//! decoder, the decoders read target memory through [`ReadMemory`] into an
//! owned [`Node`] tree, and [`render`] turns that tree into text.

mod cell;
mod container;
mod element;
mod guard;
mod node;
mod render;
mod scalar;

pub use cell::{Cell, CellKind, TypeRef, dispatch, parse_address};
pub use element::ElementTag;
pub use node::{ElementNode, NamespaceNode, Node, PairNode};
pub use render::{render, render_element, render_namespace, render_scope_chain};
pub use scalar::quote;

use tracing::debug;

use crate::config::{InspectorConfig, RenderOptions};
use crate::error::{Error, Result};
use crate::process::{Layout, ReadMemory};
use guard::DepthGuard;

/// Address of the field at `offset` inside the structure at `base`.
///
/// `base` comes from target memory, so a corrupt pointer near the top of the
/// address space is a read failure rather than an overflow.
pub(crate) fn field(base: u64, offset: u64) -> Result<u64> {
    base.checked_add(offset).ok_or_else(|| Error::MemoryReadFailed {
        address: base,
        message: format!("Field offset {:#x} overflows the address space", offset),
    })
}

/// Per-call decoding state. The depth guard lives exactly as long as one
/// top-level decode.
pub(crate) struct Decoder<'a, R: ReadMemory + ?Sized> {
    reader: &'a R,
    layout: &'a Layout,
    options: &'a RenderOptions,
    guard: DepthGuard,
}

impl<'a, R: ReadMemory + ?Sized> Decoder<'a, R> {
    pub(crate) fn new(reader: &'a R, layout: &'a Layout, options: &'a RenderOptions) -> Self {
        Self {
            reader,
            layout,
            options,
            guard: DepthGuard::new(options.max_depth),
        }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, address: u64, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.guard.enter(address)?;
        let result = f(self);
        self.guard.leave();
        result
    }

    fn read_ptr(&self, address: u64) -> Result<u64> {
        self.reader.read_ptr(address, self.layout.pointer_size)
    }

    /// Decode the structure of `kind` located at `address`.
    pub(crate) fn decode(&mut self, kind: CellKind, address: u64) -> Result<Node> {
        let node = match kind {
            CellKind::String => Node::Str(self.decode_string(address)?),
            CellKind::Identifier => Node::Ident(self.decode_identifier(address)?),
            CellKind::Element => Node::Element(self.decode_element(address)?),
            CellKind::Pair => Node::Pair(self.decode_pair(address)?),
            CellKind::Namespace => Node::ScopeChain(self.decode_scope_chain(address)?),
            CellKind::ElemList => Node::ElementList(self.decode_element_list(address)?),
            CellKind::IdentList => Node::IdentList(self.decode_ident_list(address)?),
            CellKind::Environment => {
                let namespace = self.read_ptr(field(address, self.layout.environment.namespace)?)?;
                if namespace == 0 {
                    debug!("Environment at {:#x} has no namespace", address);
                    return Ok(Node::Null);
                }
                Node::ScopeChain(self.decode_scope_chain(namespace)?)
            }
        };
        Ok(node)
    }

    /// Follow the cell's pointer levels, then decode the pointee.
    fn decode_cell(&mut self, kind: CellKind, cell: &Cell) -> Result<Node> {
        let mut address = cell.address;
        for level in 0..cell.ty.pointer_depth {
            address = self.read_ptr(address)?;
            if address == 0 {
                debug!(
                    "NULL pointer at level {} of {} cell {:#x}",
                    level + 1,
                    cell.ty,
                    cell.address
                );
                return Ok(Node::Null);
            }
        }
        self.decode(kind, address)
    }
}

/// Decode `cell` into a node tree. `Ok(None)` means no decoder for its type.
pub fn decode_cell<R: ReadMemory + ?Sized>(
    reader: &R,
    cell: &Cell,
    options: &RenderOptions,
    layout: &Layout,
) -> Result<Option<Node>> {
    let Some(kind) = dispatch(&cell.ty) else {
        debug!("No decoder for type {}", cell.ty);
        return Ok(None);
    };
    Decoder::new(reader, layout, options)
        .decode_cell(kind, cell)
        .map(Some)
}

/// Render `cell` as text using the default 64-bit layout.
///
/// `Ok(None)` means no decoder for the cell's type; the caller should fall
/// back to its own rendering.
pub fn render_cell<R: ReadMemory + ?Sized>(
    reader: &R,
    cell: &Cell,
    options: &RenderOptions,
) -> Result<Option<String>> {
    Inspector::new(reader).with_options(options.clone()).render(cell)
}

/// A reader bound to render options and a structure layout.
#[derive(Debug)]
pub struct Inspector<R> {
    reader: R,
    options: RenderOptions,
    layout: Layout,
}

impl<R: ReadMemory> Inspector<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            options: RenderOptions::default(),
            layout: Layout::default(),
        }
    }

    pub fn from_config(reader: R, config: InspectorConfig) -> Self {
        Self {
            reader,
            options: config.render,
            layout: config.layout,
        }
    }

    pub fn with_options(mut self, options: RenderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn decode(&self, cell: &Cell) -> Result<Option<Node>> {
        decode_cell(&self.reader, cell, &self.options, &self.layout)
    }

    pub fn render(&self, cell: &Cell) -> Result<Option<String>> {
        Ok(self
            .decode(cell)?
            .map(|node| render(&node, self.options.style)))
    }
}
