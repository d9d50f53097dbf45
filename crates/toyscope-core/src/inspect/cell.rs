//! Declared-type dispatch for memory cells.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{Error, Result};

/// The toyscript structures that have a decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, Serialize, Deserialize)]
pub enum CellKind {
    String,
    Identifier,
    Element,
    Pair,
    Namespace,
    ElemList,
    IdentList,
    Environment,
}

/// A declared C type as seen by a debugger: base name plus indirection.
///
/// ```
/// use toyscope_core::inspect::TypeRef;
///
/// let ty = TypeRef::parse("const struct Namespace **");
/// assert_eq!(ty.name, "Namespace");
/// assert_eq!(ty.pointer_depth, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    pub pointer_depth: usize,
}

const QUALIFIERS: &[&str] = &["struct", "const", "volatile"];

impl TypeRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pointer_depth: 0,
        }
    }

    pub fn pointer_to(mut self) -> Self {
        self.pointer_depth += 1;
        self
    }

    /// Parse a type spelling. Qualifiers are dropped and every `*` is one
    /// level of indirection, wherever it appears.
    pub fn parse(spelling: &str) -> Self {
        let pointer_depth = spelling.matches('*').count();
        let name = spelling
            .split(|c: char| c == '*' || c.is_whitespace())
            .filter(|word| !word.is_empty() && !QUALIFIERS.contains(word))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            name,
            pointer_depth,
        }
    }
}

impl FromStr for TypeRef {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.pointer_depth > 0 {
            write!(f, " {}", "*".repeat(self.pointer_depth))?;
        }
        Ok(())
    }
}

/// An opaque memory cell: where it lives and what it claims to be.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub address: u64,
    pub ty: TypeRef,
}

impl Cell {
    pub fn new(address: u64, ty: TypeRef) -> Self {
        Self { address, ty }
    }
}

/// Parse a target address written in hex, with or without a `0x` prefix.
pub fn parse_address(text: &str) -> Result<u64> {
    let text = text.trim();
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() {
        return Err(Error::InvalidAddress(format!("empty address {:?}", text)));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::InvalidAddress(format!("{:?} is not a hex address: {}", text, e)))
}

/// Resolve the decoder for a declared type. `None` means no decoder.
pub fn dispatch(ty: &TypeRef) -> Option<CellKind> {
    CellKind::from_str(&ty.name).ok()
}
