//! Error types for USTAR encoding, decoding and archive streaming.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading or writing USTAR archives.
#[derive(Debug, Error)]
pub enum Error {
    /// A text value does not fit its fixed-width header field.
    ///
    /// Every text field needs room for at least one terminating NUL byte.
    #[error("field too long: {len} bytes does not fit a {width}-byte field")]
    FieldTooLong {
        /// Length of the rejected value.
        len: usize,
        /// Width of the destination field.
        width: usize,
    },

    /// A path cannot be represented in the `name`/`prefix` fields, even when split.
    #[error("filename too long: {len} bytes cannot be stored in a ustar header")]
    FilenameTooLong {
        /// Length of the rejected path.
        len: usize,
    },

    /// A number has more octal digits than its header field can hold.
    #[error("numeric field overflow: {value} does not fit {width} octal digits")]
    NumericFieldOverflow {
        /// The rejected value.
        value: u64,
        /// Number of octal digits available.
        width: usize,
    },

    /// The write cursor is before the end of the entry header being sealed.
    #[error("invalid seek: write position {position} is before the body of the header at {header_offset}")]
    InvalidSeek {
        /// Offset of the header being sealed.
        header_offset: u64,
        /// Current write position of the transport.
        position: u64,
    },

    /// The stored header checksum does not match the computed value.
    #[error("checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// The checksum value stored in the header.
        stored: u64,
        /// The checksum computed from the header bytes.
        computed: u64,
    },

    /// Entry size in header is invalid (overflow when computing padded size).
    #[error("invalid entry size: {0}")]
    InvalidSize(u64),

    /// The filesystem object cannot be represented as a ustar entry.
    #[error("unsupported file type: {0:?}")]
    UnsupportedFileType(PathBuf),

    /// The archive has already been terminated.
    #[error("archive already finished")]
    Finished,

    /// An earlier seal or finish failed and the archive is incomplete.
    #[error("archive writer failed earlier; the archive is incomplete")]
    Failed,

    /// I/O error from the underlying transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for ustar operations.
pub type Result<T> = std::result::Result<T, Error>;
