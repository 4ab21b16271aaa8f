//! Sequential ustar archive reader.

use std::io::{self, Read, Seek};

use log::{debug, trace};
use zerocopy::IntoBytes;

use crate::{
    error::{Error, Result},
    header::{EntryHeader, UstarHeader, BLOCK_SIZE},
    options::ReadOptions,
    util::read_exactish,
    window::Window,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ReadyForHeader,
    AtBody,
    Exhausted,
}

/// Reads an archive one entry at a time from a seekable transport.
///
/// After [`next_entry`] returns an entry, reading from the `Reader` yields
/// exactly that entry's body and then end-of-data, regardless of what follows
/// it in the transport. The body does not have to be consumed: the next call
/// to [`next_entry`] seeks straight to the following header.
///
/// ```
/// use std::io::{Cursor, Read};
/// use ustar_stream::{EntryHeader, Reader, Writer};
///
/// let mut writer = Writer::new(Cursor::new(Vec::new()));
/// writer.append(&EntryHeader::new("hello.txt")).unwrap();
/// std::io::Write::write_all(&mut writer, b"Hello, World!").unwrap();
/// let archive = writer.into_inner().unwrap();
///
/// let mut reader = Reader::new(Cursor::new(archive.into_inner())).unwrap();
/// let entry = reader.next_entry().unwrap().unwrap();
/// assert_eq!(entry.size, 13);
///
/// let mut body = String::new();
/// reader.read_to_string(&mut body).unwrap();
/// assert_eq!(body, "Hello, World!");
/// assert!(reader.next_entry().unwrap().is_none());
/// ```
///
/// [`next_entry`]: Reader::next_entry
#[derive(Debug)]
pub struct Reader<R> {
    window: Window<R>,
    /// Offset of the next header block in the transport.
    header_offset: u64,
    state: State,
    options: ReadOptions,
}

impl<R: Read + Seek> Reader<R> {
    /// Create a reader for the archive starting at the transport's current position.
    pub fn new(transport: R) -> Result<Self> {
        Self::with_options(transport, ReadOptions::default())
    }

    /// Create a reader with the given options.
    pub fn with_options(transport: R, options: ReadOptions) -> Result<Self> {
        let window = Window::new(transport)?;
        let (header_offset, _) = window.range();
        Ok(Self {
            window,
            header_offset,
            state: State::ReadyForHeader,
            options,
        })
    }

    /// Advance to the next entry and return its decoded header.
    ///
    /// Returns `Ok(None)` at the end of the archive: a clean end of input at
    /// a header boundary or, unless disabled in [`ReadOptions`], a zero block.
    /// Once this returns `Ok(None)` or an error, the reader is exhausted and
    /// every later call returns `Ok(None)`.
    pub fn next_entry(&mut self) -> Result<Option<EntryHeader>> {
        Ok(self.next_header()?.map(|header| header.to_entry()))
    }

    /// Advance to the next entry and return its raw binary header.
    ///
    /// See [`Reader::next_entry`].
    pub fn next_header(&mut self) -> Result<Option<UstarHeader>> {
        if self.state == State::Exhausted {
            return Ok(None);
        }

        match self.read_header() {
            Ok(Some(header)) => {
                self.state = State::AtBody;
                Ok(Some(header))
            }
            Ok(None) => {
                self.state = State::Exhausted;
                Ok(None)
            }
            Err(e) => {
                self.state = State::Exhausted;
                Err(e)
            }
        }
    }

    fn read_header(&mut self) -> Result<Option<UstarHeader>> {
        let header_begin = self.header_offset;
        let body_begin = header_begin + BLOCK_SIZE as u64;
        self.window.reset(header_begin, body_begin)?;

        let mut header = UstarHeader::new();
        if !read_exactish(&mut self.window, header.as_mut_bytes())? {
            debug!("end of input at offset {header_begin}");
            return Ok(None);
        }

        if self.options.stop_at_zero_block && header.is_empty() {
            debug!("end-of-archive block at offset {header_begin}");
            return Ok(None);
        }

        if self.options.verify_checksum {
            header.verify_checksum()?;
        }

        let size = header.entry_size();
        let padded_size = size
            .checked_next_multiple_of(BLOCK_SIZE as u64)
            .ok_or(Error::InvalidSize(size))?;
        let body_end = body_begin
            .checked_add(size)
            .ok_or(Error::InvalidSize(size))?;
        let next_header = body_begin
            .checked_add(padded_size)
            .ok_or(Error::InvalidSize(size))?;

        self.window.reset(body_begin, body_end)?;
        self.header_offset = next_header;
        trace!("entry {header:?} at {header_begin}, next header at {next_header}");

        Ok(Some(header))
    }

    /// Offset of the next header block in the transport.
    #[must_use]
    pub fn next_header_offset(&self) -> u64 {
        self.header_offset
    }

    /// Get the current options.
    #[must_use]
    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &R {
        self.window.get_ref()
    }

    /// Get a mutable reference to the underlying transport.
    ///
    /// Moving the transport's cursor changes what the current body read returns.
    pub fn get_mut(&mut self) -> &mut R {
        self.window.get_mut()
    }

    /// Consume the reader and return the underlying transport.
    pub fn into_inner(self) -> R {
        self.window.into_inner()
    }
}

impl<R: Read + Seek> Read for Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.state {
            State::AtBody => self.window.read(buf),
            State::ReadyForHeader | State::Exhausted => Ok(0),
        }
    }
}
