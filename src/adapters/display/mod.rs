//! Frame display adapters.

mod in_memory;

pub use in_memory::InMemoryFrameDisplay;
