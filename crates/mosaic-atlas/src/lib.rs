// Sprite atlas: packs many small same-format images into a few large ones
// and tracks where each image landed.

mod atlas;
mod bank;
mod config;
mod error;
mod memory;
mod skyline;

pub use atlas::{Atlas, AtlasEntry, EntryKey, PackedImage};
pub use bank::{AtlasBank, AtlasInfo, BankEntryId};
pub use config::{BankConfig, DEFAULT_MAX_ATLAS_SIZE};
pub use error::AtlasError;
pub use memory::{MemoryBackend, MemoryTexture};
