//! Decoded views of target structures.
//!
//! Decoders produce these owned trees; the renderer turns them into text.
//! Nothing here points back into target memory except plain addresses.

use serde::Serialize;

/// A decoded toyscript `Element`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ElementNode {
    Null,
    Error(String),
    Int(i64),
    Str(String),
    Bool(bool),
    List(Vec<ElementNode>),
    Return(Box<ElementNode>),
    Function { params: Vec<String>, closure: u64 },
    Builtin,
    /// Discriminant outside the known variant set.
    Unknown(u32),
}

/// One namespace entry. `value` is `None` when values were not requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairNode {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ElementNode>,
}

/// One scope of a namespace chain, entries in slot order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceNode {
    pub address: u64,
    pub capacity: u64,
    pub count: u64,
    pub entries: Vec<PairNode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
}

/// Any decoded cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Node {
    /// A pointer cell that held NULL.
    Null,
    Str(String),
    Ident(String),
    Element(ElementNode),
    Pair(PairNode),
    /// Innermost scope first, root scope last.
    ScopeChain(Vec<NamespaceNode>),
    ElementList(Vec<ElementNode>),
    IdentList(Vec<String>),
}
