//! Configuration for archive reading.

/// Options controlling how strictly [`Reader`] treats header blocks.
///
/// # Example
///
/// ```
/// use ustar_stream::ReadOptions;
///
/// let options = ReadOptions {
///     verify_checksum: true,
///     ..Default::default()
/// };
/// assert!(options.stop_at_zero_block);
/// ```
///
/// [`Reader`]: crate::Reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOptions {
    /// Fail with [`Error::ChecksumMismatch`] when a header checksum is wrong.
    ///
    /// Default: `false`; headers are decoded leniently.
    ///
    /// [`Error::ChecksumMismatch`]: crate::Error::ChecksumMismatch
    pub verify_checksum: bool,

    /// Treat an all-zero header block as the end of the archive.
    ///
    /// When disabled, the zero block is decoded like any other header, which
    /// yields an entry with an empty path.
    ///
    /// Default: `true`.
    pub stop_at_zero_block: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            verify_checksum: false,
            stop_at_zero_block: true,
        }
    }
}

impl ReadOptions {
    /// Create a new `ReadOptions` with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify every header checksum.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            verify_checksum: true,
            stop_at_zero_block: true,
        }
    }

    /// Decode every block as a header, without any validation.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            verify_checksum: false,
            stop_at_zero_block: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ReadOptions::default();
        assert!(!options.verify_checksum);
        assert!(options.stop_at_zero_block);
        assert_eq!(options, ReadOptions::new());
    }

    #[test]
    fn test_strict_and_lenient() {
        assert!(ReadOptions::strict().verify_checksum);
        assert!(!ReadOptions::lenient().stop_at_zero_block);
    }
}
