//! Memory layout of toyscript runtime structures
//!
//! This module centralizes every field offset the decoders use. The `toyscript`
//! constants describe a 64-bit little-endian build compiled with the default C
//! struct layout, and `toyscript32` the same sources built for i386. [`Layout`]
//! carries these values at runtime; [`LayoutPreset`] picks one of the two as the
//! base a config file overrides.
//!
//! # Structure Overview
//!
//! - **String**: pointer + length pair, embedded by value in other structs
//! - **Element**: tagged union of runtime values
//! - **Pair**: one namespace hash-table entry (key, value, bucket link)
//! - **Namespace**: hash table of `Pair *` slots plus a link to the enclosing scope
//! - **ElemList / IdentList**: list headers pointing at singly linked nodes

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// Default offsets for a 64-bit toyscript build.
pub mod toyscript {
    /// Width of pointers and `size_t`.
    pub const POINTER_SIZE: usize = 8;

    /// `String`
    ///
    /// ```text
    /// Offset   Field   Size
    /// ──────────────────────
    /// 0x00     buf     8
    /// 0x08     len     8
    /// ```
    pub mod string {
        pub const BUF: u64 = 0;
        pub const LEN: u64 = 8;
        pub const SIZE: u64 = 16;
    }

    /// `Identifier`: a 24-byte `Token` followed by the name string.
    pub mod identifier {
        pub const VALUE: u64 = 24;
        pub const SIZE: u64 = 40;
    }

    /// `Element`
    ///
    /// ```text
    /// Offset   Field              Size
    /// ─────────────────────────────────
    /// 0x00     type (ElemType)    4
    /// 0x08     union payload      24
    /// 0x20     string (Stringer)  8
    /// ```
    ///
    /// Inside the payload, `_fn` is `{ params, body, namespace }`.
    pub mod element {
        pub const TAG: u64 = 0;
        pub const PAYLOAD: u64 = 8;
        pub const FUNCTION_PARAMS: u64 = PAYLOAD;
        pub const FUNCTION_NAMESPACE: u64 = PAYLOAD + 16;
        pub const SIZE: u64 = 40;
    }

    /// `Pair`
    ///
    /// ```text
    /// Offset   Field   Size
    /// ──────────────────────
    /// 0x00     key     16
    /// 0x10     elem    40
    /// 0x38     next    8
    /// ```
    pub mod pair {
        pub const KEY: u64 = 0;
        pub const ELEM: u64 = 16;
        pub const NEXT: u64 = 56;
        pub const SIZE: u64 = 64;
    }

    /// `Namespace`
    ///
    /// ```text
    /// Offset   Field    Size
    /// ───────────────────────
    /// 0x00     arena    8
    /// 0x08     len      8
    /// 0x10     cap      8
    /// 0x18     values   8     Pair ** (cap slots)
    /// 0x20     global   8     Namespace *
    /// ```
    pub mod namespace {
        pub const LEN: u64 = 8;
        pub const CAP: u64 = 16;
        pub const VALUES: u64 = 24;
        pub const GLOBAL: u64 = 32;
        pub const SIZE: u64 = 40;
    }

    /// `ElemList` / `IdentList`: `{ arena, head, tail, len }`.
    pub mod list {
        pub const HEAD: u64 = 8;
        pub const SIZE: u64 = 32;
    }

    /// `ElemNode` / `IdentNode`: a 40-byte payload followed by `next`.
    pub mod node {
        pub const VALUE: u64 = 0;
        pub const NEXT: u64 = 40;
        pub const SIZE: u64 = 48;
    }

    /// `Environment`: `{ arena, namespace }`.
    pub mod environment {
        pub const NAMESPACE: u64 = 8;
        pub const SIZE: u64 = 16;
    }
}

/// Offsets for a 32-bit (i386) toyscript build.
///
/// Pointers and `size_t` are 4 bytes and 64-bit integers are 4-byte aligned,
/// so the `Element` payload starts right after the tag. The namespace `len`
/// and `cap` counters stay 8 bytes wide.
pub mod toyscript32 {
    pub const POINTER_SIZE: usize = 4;

    pub mod string {
        pub const BUF: u64 = 0;
        pub const LEN: u64 = 4;
        pub const SIZE: u64 = 8;
    }

    /// A 12-byte `Token` followed by the name string.
    pub mod identifier {
        pub const VALUE: u64 = 12;
        pub const SIZE: u64 = 20;
    }

    /// ```text
    /// Offset   Field              Size
    /// ─────────────────────────────────
    /// 0x00     type (ElemType)    4
    /// 0x04     union payload      12
    /// 0x10     string (Stringer)  4
    /// ```
    pub mod element {
        pub const TAG: u64 = 0;
        pub const PAYLOAD: u64 = 4;
        pub const FUNCTION_PARAMS: u64 = PAYLOAD;
        pub const FUNCTION_NAMESPACE: u64 = PAYLOAD + 8;
        pub const SIZE: u64 = 20;
    }

    pub mod pair {
        pub const KEY: u64 = 0;
        pub const ELEM: u64 = 8;
        pub const NEXT: u64 = 28;
        pub const SIZE: u64 = 32;
    }

    /// ```text
    /// Offset   Field    Size
    /// ───────────────────────
    /// 0x00     arena    4
    /// 0x04     len      8
    /// 0x0C     cap      8
    /// 0x14     values   4
    /// 0x18     global   4
    /// ```
    pub mod namespace {
        pub const LEN: u64 = 4;
        pub const CAP: u64 = 12;
        pub const VALUES: u64 = 20;
        pub const GLOBAL: u64 = 24;
        pub const SIZE: u64 = 28;
    }

    pub mod list {
        pub const HEAD: u64 = 4;
        pub const SIZE: u64 = 20;
    }

    pub mod node {
        pub const VALUE: u64 = 0;
        pub const NEXT: u64 = 20;
        pub const SIZE: u64 = 24;
    }

    pub mod environment {
        pub const NAMESPACE: u64 = 4;
        pub const SIZE: u64 = 8;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringLayout {
    pub buf: u64,
    pub len: u64,
    pub size: u64,
}

impl Default for StringLayout {
    fn default() -> Self {
        Self {
            buf: toyscript::string::BUF,
            len: toyscript::string::LEN,
            size: toyscript::string::SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentifierLayout {
    pub value: u64,
    pub size: u64,
}

impl Default for IdentifierLayout {
    fn default() -> Self {
        Self {
            value: toyscript::identifier::VALUE,
            size: toyscript::identifier::SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementLayout {
    pub tag: u64,
    pub payload: u64,
    pub function_params: u64,
    pub function_namespace: u64,
    pub size: u64,
}

impl Default for ElementLayout {
    fn default() -> Self {
        Self {
            tag: toyscript::element::TAG,
            payload: toyscript::element::PAYLOAD,
            function_params: toyscript::element::FUNCTION_PARAMS,
            function_namespace: toyscript::element::FUNCTION_NAMESPACE,
            size: toyscript::element::SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PairLayout {
    pub key: u64,
    pub elem: u64,
    /// Bucket chain link; `None` for tables without chaining.
    pub next: Option<u64>,
    pub size: u64,
}

impl Default for PairLayout {
    fn default() -> Self {
        Self {
            key: toyscript::pair::KEY,
            elem: toyscript::pair::ELEM,
            next: Some(toyscript::pair::NEXT),
            size: toyscript::pair::SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceLayout {
    pub len: u64,
    pub cap: u64,
    pub values: u64,
    pub global: u64,
    pub size: u64,
}

impl Default for NamespaceLayout {
    fn default() -> Self {
        Self {
            len: toyscript::namespace::LEN,
            cap: toyscript::namespace::CAP,
            values: toyscript::namespace::VALUES,
            global: toyscript::namespace::GLOBAL,
            size: toyscript::namespace::SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListLayout {
    pub head: u64,
    pub size: u64,
}

impl Default for ListLayout {
    fn default() -> Self {
        Self {
            head: toyscript::list::HEAD,
            size: toyscript::list::SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeLayout {
    pub value: u64,
    pub next: u64,
    pub size: u64,
}

impl Default for NodeLayout {
    fn default() -> Self {
        Self {
            value: toyscript::node::VALUE,
            next: toyscript::node::NEXT,
            size: toyscript::node::SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentLayout {
    pub namespace: u64,
    pub size: u64,
}

impl Default for EnvironmentLayout {
    fn default() -> Self {
        Self {
            namespace: toyscript::environment::NAMESPACE,
            size: toyscript::environment::SIZE,
        }
    }
}

/// Runtime description of the target's struct layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    /// Width of pointers and `size_t` fields (4 or 8). Namespace `len`
    /// and `cap` are always 8 bytes.
    pub pointer_size: usize,
    pub string: StringLayout,
    pub identifier: IdentifierLayout,
    pub element: ElementLayout,
    pub pair: PairLayout,
    pub namespace: NamespaceLayout,
    pub list: ListLayout,
    pub elem_node: NodeLayout,
    pub ident_node: NodeLayout,
    pub environment: EnvironmentLayout,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            pointer_size: toyscript::POINTER_SIZE,
            string: StringLayout::default(),
            identifier: IdentifierLayout::default(),
            element: ElementLayout::default(),
            pair: PairLayout::default(),
            namespace: NamespaceLayout::default(),
            list: ListLayout::default(),
            elem_node: NodeLayout::default(),
            ident_node: NodeLayout::default(),
            environment: EnvironmentLayout::default(),
        }
    }
}

impl Layout {
    /// The i386 build of toyscript.
    pub fn ilp32() -> Self {
        use toyscript32 as t;

        let node = NodeLayout {
            value: t::node::VALUE,
            next: t::node::NEXT,
            size: t::node::SIZE,
        };
        Self {
            pointer_size: t::POINTER_SIZE,
            string: StringLayout {
                buf: t::string::BUF,
                len: t::string::LEN,
                size: t::string::SIZE,
            },
            identifier: IdentifierLayout {
                value: t::identifier::VALUE,
                size: t::identifier::SIZE,
            },
            element: ElementLayout {
                tag: t::element::TAG,
                payload: t::element::PAYLOAD,
                function_params: t::element::FUNCTION_PARAMS,
                function_namespace: t::element::FUNCTION_NAMESPACE,
                size: t::element::SIZE,
            },
            pair: PairLayout {
                key: t::pair::KEY,
                elem: t::pair::ELEM,
                next: Some(t::pair::NEXT),
                size: t::pair::SIZE,
            },
            namespace: NamespaceLayout {
                len: t::namespace::LEN,
                cap: t::namespace::CAP,
                values: t::namespace::VALUES,
                global: t::namespace::GLOBAL,
                size: t::namespace::SIZE,
            },
            list: ListLayout {
                head: t::list::HEAD,
                size: t::list::SIZE,
            },
            elem_node: node.clone(),
            ident_node: node,
            environment: EnvironmentLayout {
                namespace: t::environment::NAMESPACE,
                size: t::environment::SIZE,
            },
        }
    }

    /// Reject layouts the readers cannot honor.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.pointer_size, 4 | 8) {
            return Err(Error::ConfigParseError(format!(
                "pointer_size must be 4 or 8, got {}",
                self.pointer_size
            )));
        }
        Ok(())
    }

    /// Stride of the namespace slot array.
    pub fn slot_stride(&self) -> u64 {
        self.pointer_size as u64
    }
}

/// Built-in layouts a config file can start from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LayoutPreset {
    /// 64-bit pointers and `size_t`.
    #[default]
    Lp64,
    /// 32-bit pointers and `size_t`, i386 alignment.
    Ilp32,
}

impl LayoutPreset {
    /// The preset for a target whose pointers are `width` bytes wide.
    pub fn for_pointer_size(width: usize) -> Self {
        if width == 4 {
            LayoutPreset::Ilp32
        } else {
            LayoutPreset::Lp64
        }
    }

    pub fn layout(self) -> Layout {
        match self {
            LayoutPreset::Lp64 => Layout::default(),
            LayoutPreset::Ilp32 => Layout::ilp32(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_constants() {
        let layout = Layout::default();
        assert_eq!(layout.pointer_size, 8);
        assert_eq!(layout.pair.elem, toyscript::pair::ELEM);
        assert_eq!(layout.pair.next, Some(56));
        assert_eq!(layout.namespace.global, 32);
        assert_eq!(layout.element.function_namespace, 24);
    }

    #[test]
    fn test_pair_fields_fit_in_pair() {
        // key (String) then elem (Element) then next pointer
        assert_eq!(toyscript::pair::ELEM, toyscript::string::SIZE);
        assert_eq!(
            toyscript::pair::NEXT,
            toyscript::pair::ELEM + toyscript::element::SIZE
        );
    }

    #[test]
    fn test_validate_pointer_size() {
        let mut layout = Layout::default();
        assert!(layout.validate().is_ok());

        layout.pointer_size = 4;
        assert!(layout.validate().is_ok());

        layout.pointer_size = 2;
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_ilp32_struct_sizes_chain() {
        let layout = Layout::ilp32();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.slot_stride(), 4);
        // Pair is key, elem, next with no padding.
        assert_eq!(layout.pair.elem, layout.string.size);
        assert_eq!(layout.pair.next, Some(layout.pair.elem + layout.element.size));
        // Nodes embed a whole Element or Identifier before `next`.
        assert_eq!(layout.elem_node.next, layout.element.size);
        assert_eq!(layout.ident_node.next, layout.identifier.size);
        assert_eq!(layout.identifier.value + layout.string.size, layout.identifier.size);
        assert_eq!(layout.namespace.cap, layout.namespace.len + 8);
    }

    #[test]
    fn test_preset_selection() {
        assert_eq!(LayoutPreset::for_pointer_size(4), LayoutPreset::Ilp32);
        assert_eq!(LayoutPreset::for_pointer_size(8), LayoutPreset::Lp64);
        assert_eq!(LayoutPreset::Lp64.layout(), Layout::default());
        assert_eq!(LayoutPreset::Ilp32.layout().pointer_size, 4);
        assert_eq!("ILP32".parse::<LayoutPreset>().unwrap(), LayoutPreset::Ilp32);
        assert_eq!(LayoutPreset::Lp64.to_string(), "lp64");
    }
}
