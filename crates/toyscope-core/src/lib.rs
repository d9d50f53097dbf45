pub mod config;
pub mod error;
pub mod inspect;
pub mod process;

pub use config::{ElementStyle, InspectorConfig, RenderOptions};
pub use error::{Error, Result, TraversalLimit};
pub use inspect::{
    Cell, CellKind, ElementNode, Inspector, Node, TypeRef, dispatch, parse_address, render_cell,
};
pub use process::{
    Layout, LayoutPreset, MemoryReader, ProcessHandle, ReadMemory, SnapshotFile, SnapshotReader,
};
