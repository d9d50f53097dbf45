mod bytes;
mod handle;
pub mod layout;
mod reader;
pub mod snapshot;

// Mock memory for testing (always available for unit and integration tests)
#[doc(hidden)]
pub mod mock;

pub use bytes::{ByteBuffer, decode_utf8_lossy};
pub use handle::*;
pub use layout::{Layout, LayoutPreset};
pub use reader::{MemoryReader, ReadMemory};
pub use snapshot::{SnapshotFile, SnapshotReader};

// Re-export mock for convenient access in tests
#[doc(hidden)]
pub use mock::{MockElement, MockHeap, MockMemoryBuilder, MockMemoryReader};
