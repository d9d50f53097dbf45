//! Tagged-union `Element` decoding.

use strum::{Display, FromRepr};
use tracing::debug;

use super::{Decoder, field};
use super::node::ElementNode;
use crate::error::{Error, Result};
use crate::process::ReadMemory;

/// `ElemType` discriminant values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRepr, Display)]
#[repr(u32)]
pub enum ElementTag {
    #[strum(serialize = "NULL")]
    Null = 0,
    #[strum(serialize = "ERR")]
    Error = 1,
    #[strum(serialize = "INT")]
    Int = 2,
    #[strum(serialize = "STR")]
    Str = 3,
    #[strum(serialize = "BOOL")]
    Bool = 4,
    #[strum(serialize = "LIST")]
    List = 5,
    #[strum(serialize = "RETURN")]
    Return = 6,
    #[strum(serialize = "FUNCTION")]
    Function = 7,
    #[strum(serialize = "BUILTIN")]
    Builtin = 8,
}

impl<R: ReadMemory + ?Sized> Decoder<'_, R> {
    /// Decode the `Element` at `address`.
    ///
    /// Only the active variant's payload is read. An unrecognized
    /// discriminant decodes to [`ElementNode::Unknown`].
    pub(crate) fn decode_element(&mut self, address: u64) -> Result<ElementNode> {
        self.nested(address, |d| d.decode_element_at(address))
    }

    fn decode_element_at(&mut self, address: u64) -> Result<ElementNode> {
        let layout = self.layout;
        let raw = self.reader.read_u32(field(address, layout.element.tag)?)?;
        let Some(tag) = ElementTag::from_repr(raw) else {
            debug!("Unknown element tag {} at {:#x}", raw, address);
            return Ok(ElementNode::Unknown(raw));
        };

        let payload = field(address, layout.element.payload)?;
        let node = match tag {
            ElementTag::Null => ElementNode::Null,
            ElementTag::Error => ElementNode::Error(self.decode_string(payload)?),
            ElementTag::Int => ElementNode::Int(self.reader.read_i64(payload)?),
            ElementTag::Str => ElementNode::Str(self.decode_string(payload)?),
            ElementTag::Bool => ElementNode::Bool(self.reader.read_u8(payload)? != 0),
            ElementTag::List => {
                let items = self.read_ptr(payload)?;
                ElementNode::List(self.decode_element_list(items)?)
            }
            ElementTag::Return => {
                let value = self.read_ptr(payload)?;
                if value == 0 {
                    return Err(Error::MemoryReadFailed {
                        address: payload,
                        message: "RETURN element holds a NULL value pointer".to_string(),
                    });
                }
                ElementNode::Return(Box::new(self.decode_element(value)?))
            }
            ElementTag::Function => {
                let params = self.read_ptr(field(address, layout.element.function_params)?)?;
                let closure = self.read_ptr(field(address, layout.element.function_namespace)?)?;
                ElementNode::Function {
                    params: self.decode_ident_list(params)?,
                    closure,
                }
            }
            ElementTag::Builtin => ElementNode::Builtin,
        };
        Ok(node)
    }
}
