//! Streaming reader and writer for USTAR (POSIX.1-1988 "ustar") archives.
//!
//! Archives are processed one entry at a time against a seekable transport:
//!
//! - [`Reader`] decodes a header, then exposes exactly that entry's body
//!   through [`std::io::Read`]. Skipping a body costs a seek, not a read.
//! - [`Writer`] writes a header, lets the caller stream the body through
//!   [`std::io::Write`] without knowing its length in advance, and then seeks
//!   back to patch the size and checksum.
//!
//! Headers exist in two forms: [`EntryHeader`] is the friendly description of
//! an entry (paths, numbers, names) and [`UstarHeader`] is the raw 512-byte
//! block with its fixed-width octal and text fields. Converting between them
//! splits long paths across the `prefix` and `name` fields (see
//! [`split_path`]).
//!
//! # Archive layout
//!
//! | Block(s)                    | Contents                                  |
//! |-----------------------------|-------------------------------------------|
//! | 1                           | header of entry 1                         |
//! | `ceil(size / 512)`          | body of entry 1, zero padded              |
//! | ...                         | further entries                           |
//! | 2                           | zero blocks marking the end of archive    |
//!
//! # Example
//!
//! ```
//! use std::io::{Cursor, Read, Write};
//! use ustar_stream::{EntryHeader, EntryType, Reader, Writer};
//!
//! let mut writer = Writer::new(Cursor::new(Vec::new()));
//! writer.append(&EntryHeader {
//!     entry_type: EntryType::Directory,
//!     mode: 0o755,
//!     ..EntryHeader::new("menu")
//! })?;
//! writer.append(&EntryHeader {
//!     mode: 0o644,
//!     ..EntryHeader::new("menu/Burger")
//! })?;
//! writer.write_all(b"Royale with Cheese\n")?;
//! let archive = writer.into_inner()?.into_inner();
//!
//! let mut reader = Reader::new(Cursor::new(archive))?;
//! let mut names = Vec::new();
//! while let Some(entry) = reader.next_entry()? {
//!     names.push(entry.path);
//! }
//! assert_eq!(names, ["menu", "menu/Burger"].map(std::path::PathBuf::from));
//! # Ok::<(), ustar_stream::Error>(())
//! ```

mod error;
pub mod field;
mod fs;
pub mod header;
mod options;
mod reader;
mod util;
mod window;
mod writer;

pub use error::{Error, Result};
pub use header::{
    split_path, EntryHeader, EntryType, UstarHeader, BLOCK_SIZE, NAME_MAX, PATH_MAX, PREFIX_MAX,
    USTAR_MAGIC, USTAR_VERSION,
};
pub use options::ReadOptions;
pub use reader::Reader;
pub use window::Window;
pub use writer::Writer;
