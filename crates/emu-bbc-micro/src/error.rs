//! Machine configuration errors.

use thiserror::Error;

/// A ROM image that cannot be mapped.
///
/// Images are never padded or truncated to fit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RomError {
    #[error("OS ROM must be 16384 bytes, got {0}")]
    OsRomSize(usize),
    #[error("paged ROM must be 8192 or 16384 bytes, got {0}")]
    PagedRomSize(usize),
    #[error("paged ROM bank {0} out of range (0-15)")]
    BankOutOfRange(u8),
}

/// Anything that stops a machine from being built.
#[derive(Debug, Error)]
pub enum BbcError {
    #[error(transparent)]
    Rom(#[from] RomError),
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl BbcError {
    /// Wrap an I/O error with the path that caused it.
    #[must_use]
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
