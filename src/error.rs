//! Error types shared by the CV store, the function cache and the decoder.

use core::fmt;

/// Failure reported by a [`Storage`](crate::Storage) backend.
///
/// Carries the byte address of the failed access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageError {
    pub address: u16,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "storage access failed at address {}", self.address)
    }
}

impl core::error::Error for StorageError {}

/// Recoverable decoder errors
///
/// Every variant rejects a single operation and leaves state unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// CV number is not part of the CV table
    UnknownCv(u16),
    /// CV exists but is read-only
    NotWritable(u16),
    /// Function index outside of F0..F28
    IndexOutOfRange(u8),
    /// Backing store rejected a write; the cached value was not touched
    Storage(StorageError),
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownCv(number) => write!(f, "CV{number} not found"),
            Self::NotWritable(number) => write!(f, "CV{number} is read-only"),
            Self::IndexOutOfRange(index) => write!(f, "function F{index} out of range"),
            Self::Storage(err) => err.fmt(f),
        }
    }
}

impl core::error::Error for Error {}

/// Invalid [`DecoderConfig`](crate::DecoderConfig)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The same CV number appears twice in the table
    DuplicateCv(u16),
    /// The table does not fit into the store capacity
    TooManyCvs,
    /// A light role points to a CV that is not in the table
    MissingLightCv(u16),
    /// The packed function cache shares addresses with CV bytes
    CacheOverlapsCvs,
    /// CV bytes or the function cache run past the last storage address
    AddressOutOfRange,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCv(number) => write!(f, "CV{number} defined twice"),
            Self::TooManyCvs => f.write_str("CV table exceeds store capacity"),
            Self::MissingLightCv(number) => write!(f, "light CV{number} missing from table"),
            Self::CacheOverlapsCvs => f.write_str("function cache overlaps CV storage"),
            Self::AddressOutOfRange => f.write_str("storage layout exceeds the address space"),
        }
    }
}

impl core::error::Error for ConfigError {}
