// error.rs - error type shared by the BSP container and semantics layers

use thiserror::Error;

/// Error type for BSP loading, writing, and conversion.
#[derive(Error, Debug)]
pub enum BspError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file's ident/version pair matches no known format.
    #[error("unrecognized BSP format: ident {ident:#010x}, version {version:?}")]
    FormatUnrecognized { ident: i32, version: Option<i32> },

    /// Two registry entries claim the same ident/version pair and are
    /// not a documented sibling pair (Quake / Hexen II).
    #[error("ambiguous BSP format registry: {first} and {second} share an ident/version pair")]
    FormatAmbiguous {
        first: &'static str,
        second: &'static str,
    },

    /// A lump's directory entry points past the end of the file.
    #[error("{lump} lump at {offset}+{length} overruns file of {file_size} bytes")]
    TruncatedFile {
        lump: &'static str,
        offset: usize,
        length: usize,
        file_size: usize,
    },

    /// A read ran past the end of the buffer.
    #[error("unexpected end of data: {wanted} bytes at offset {offset} in buffer of {size}")]
    UnexpectedEof {
        offset: usize,
        wanted: usize,
        size: usize,
    },

    /// A lump's byte length is not a whole number of records.
    #[error("{lump} lump has funny size: {length} bytes is not a multiple of {record_size}")]
    LumpSizeMismatch {
        lump: &'static str,
        length: usize,
        record_size: usize,
    },

    /// The in-memory document shape does not match the requested format.
    #[error("BSP data holds {actual} but {expected} was requested")]
    VariantFormatMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// A value does not fit the narrower on-disk field during conversion.
    #[error("{field}: value {value} out of range for {target}")]
    NumericOverflow {
        field: &'static str,
        value: f64,
        target: &'static str,
    },
}

/// Result type alias for BSP operations.
pub type BspResult<T> = std::result::Result<T, BspError>;
