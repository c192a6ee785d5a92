//! Key Generator - monotonically increasing row keys

use rowlite_core::format::FRESH_WATERMARK;
use rowlite_core::{Error, Result};

/// Issues unique row keys from a persisted watermark.
///
/// The watermark is the last key handed out; the next key is always
/// `watermark + 1`. A store that never minted a key carries a watermark
/// of `-1`, so its first key is `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyGenerator {
    /// No store attached; minting fails
    #[default]
    Uninitialized,
    /// Restored from (or about to be written to) the metadata block
    Ready {
        /// Last minted key, or -1
        watermark: i64,
    },
}

impl KeyGenerator {
    /// Generator restored from a persisted watermark
    pub fn with_watermark(watermark: i64) -> Self {
        KeyGenerator::Ready { watermark }
    }

    /// Generator for a store that has minted nothing yet
    pub fn fresh() -> Self {
        Self::with_watermark(FRESH_WATERMARK)
    }

    /// Mints the next key.
    pub fn mint(&mut self) -> Result<u64> {
        match self {
            KeyGenerator::Uninitialized => Err(Error::InvalidGenerator),
            KeyGenerator::Ready { watermark } => {
                let next = watermark
                    .checked_add(1)
                    .ok_or_else(|| Error::InvalidOperation("key space exhausted".to_string()))?;
                *watermark = next;
                // next >= 0 since the watermark never drops below -1
                Ok(next as u64)
            }
        }
    }

    /// The watermark to persist, if initialized
    pub fn watermark(&self) -> Option<i64> {
        match self {
            KeyGenerator::Uninitialized => None,
            KeyGenerator::Ready { watermark } => Some(*watermark),
        }
    }

    /// Returns true once restored from a store
    pub fn is_ready(&self) -> bool {
        matches!(self, KeyGenerator::Ready { .. })
    }
}
