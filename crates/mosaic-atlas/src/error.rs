// Errors reported to callers of the atlas and the bank.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AtlasError {
    #[error("atlas entry must have a non-zero size, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("pixel data too short: expected {expected} bytes, got {actual}")]
    DataTooShort { expected: usize, actual: usize },

    /// The entry (border included) can never fit in one atlas page.
    #[error("{width}x{height} entry exceeds the {max_width}x{max_height} atlas limit")]
    ExceedsMaxSize {
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },

    #[error("atlas bank entry handle is no longer valid")]
    StaleEntry,
}
