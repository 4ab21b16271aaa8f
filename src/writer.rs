//! Sequential ustar archive writer.

use std::{
    io::{self, Read, Seek, SeekFrom, Write},
    mem::offset_of,
};

use log::debug;
use zerocopy::IntoBytes;

use crate::{
    error::{Error, Result},
    header::{EntryHeader, UstarHeader, BLOCK_SIZE},
    util::padding_len,
};

const SIZE_OFFSET: u64 = offset_of!(UstarHeader, size) as u64;
const CHECKSUM_OFFSET: u64 = offset_of!(UstarHeader, checksum) as u64;

/// The entry whose header has been written but whose size is not known yet.
#[derive(Debug)]
struct OpenEntry {
    header: UstarHeader,
    offset: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Writing,
    Finished,
    Failed,
}

/// Writes an archive one entry at a time to a seekable transport.
///
/// Entry sizes do not need to be known up front. Each call to [`append`]
/// writes the header and leaves the entry open; body bytes are then written
/// through the [`Write`] impl. When the next entry is appended (or the archive
/// is finished), the writer measures how many bytes were written, seeks back
/// to patch the header's size and checksum fields, and pads the body to the
/// next block boundary.
///
/// A failure while sealing or terminating leaves the archive incomplete: the
/// writer then rejects every further operation with [`Error::Failed`] and
/// writes nothing more, not even on drop.
///
/// ```
/// use std::io::{Cursor, Write};
/// use ustar_stream::{EntryHeader, Writer};
///
/// let mut writer = Writer::new(Cursor::new(Vec::new()));
/// writer.append(&EntryHeader::new("Burger")).unwrap();
/// writer.write_all(b"Royale with Cheese\n").unwrap();
/// let archive = writer.into_inner().unwrap().into_inner();
/// assert_eq!(archive.len(), 4 * 512);
/// ```
///
/// [`append`]: Writer::append
#[derive(Debug)]
pub struct Writer<W: Write + Seek> {
    inner: Option<W>,
    open: Option<OpenEntry>,
    state: State,
}

impl<W: Write + Seek> Writer<W> {
    /// Create a writer that starts the archive at the transport's current position.
    pub fn new(transport: W) -> Self {
        Self {
            inner: Some(transport),
            open: None,
            state: State::Writing,
        }
    }

    fn check_writable(&self) -> Result<()> {
        match self.state {
            State::Writing => Ok(()),
            State::Finished => Err(Error::Finished),
            State::Failed => Err(Error::Failed),
        }
    }

    /// Run `f`, and stop accepting anything once it has failed.
    fn or_fail<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let result = f(self);
        if result.is_err() {
            self.state = State::Failed;
        }
        result
    }

    fn transport(&mut self) -> &mut W {
        // only taken by into_inner(), which consumes self
        self.inner.as_mut().expect("transport present until into_inner")
    }

    /// Seal the current entry (if any) and start a new one described by `entry`.
    ///
    /// The `size` of `entry` is replaced by the number of body bytes actually
    /// written before the entry is sealed.
    ///
    /// # Errors
    ///
    /// Fails if `entry` cannot be encoded, if sealing the previous entry fails,
    /// with [`Error::Finished`] after [`Writer::finish`], or with
    /// [`Error::Failed`] after an earlier failure.
    pub fn append(&mut self, entry: &EntryHeader) -> Result<()> {
        let header = UstarHeader::from_entry(entry)?;
        self.append_header(header)
    }

    /// Seal the current entry (if any) and start a new one with a prebuilt header.
    pub fn append_header(&mut self, header: UstarHeader) -> Result<()> {
        self.check_writable()?;
        self.or_fail(|writer| {
            writer.seal()?;

            let transport = writer.transport();
            let offset = transport.stream_position()?;
            transport.write_all(header.as_bytes())?;
            debug!("opened entry {:?} at offset {offset}", header.path());

            writer.open = Some(OpenEntry { header, offset });
            Ok(())
        })
    }

    fn seal(&mut self) -> Result<()> {
        let Some(&OpenEntry { mut header, offset }) = self.open.as_ref() else {
            return Ok(());
        };

        let transport = self.transport();
        let position = transport.stream_position()?;
        let body_begin = offset + BLOCK_SIZE as u64;
        if position < body_begin {
            return Err(Error::InvalidSeek {
                header_offset: offset,
                position,
            });
        }

        let size = position - body_begin;
        header.set_entry_size(size)?;
        header.update_checksum()?;

        transport.seek(SeekFrom::Start(offset + SIZE_OFFSET))?;
        transport.write_all(&header.size)?;
        transport.seek(SeekFrom::Start(offset + CHECKSUM_OFFSET))?;
        transport.write_all(&header.checksum)?;
        transport.seek(SeekFrom::Start(position))?;

        let padding = padding_len(size);
        io::copy(&mut io::repeat(0).take(padding), transport)?;
        debug!("sealed entry at offset {offset}: {size} bytes, {padding} bytes padding");

        self.open = None;
        Ok(())
    }

    /// Seal the current entry and terminate the archive with two zero blocks.
    ///
    /// Calling this again after success has no effect; calling it again after
    /// a failure returns [`Error::Failed`].
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            State::Finished => return Ok(()),
            State::Failed => return Err(Error::Failed),
            State::Writing => {}
        }

        self.or_fail(|writer| {
            writer.seal()?;

            let transport = writer.transport();
            transport.write_all(&[0u8; 2 * BLOCK_SIZE])?;
            transport.flush()?;
            Ok(())
        })?;
        self.state = State::Finished;
        debug!("archive finished");

        Ok(())
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &W {
        self.inner
            .as_ref()
            .expect("transport present until into_inner")
    }

    /// Get a mutable reference to the underlying transport.
    ///
    /// Moving the cursor changes where body bytes land and what size the open
    /// entry is sealed with.
    pub fn get_mut(&mut self) -> &mut W {
        self.transport()
    }

    /// Finish the archive and return the underlying transport.
    pub fn into_inner(mut self) -> Result<W> {
        self.finish()?;
        self.inner.take().ok_or(Error::Finished)
    }
}

impl<W: Write + Seek> Write for Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check_writable().map_err(io::Error::other)?;
        self.transport().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.transport().flush()
    }
}

impl<W: Write + Seek> Drop for Writer<W> {
    fn drop(&mut self) {
        if self.inner.is_some() && self.state == State::Writing {
            if let Err(e) = self.finish() {
                debug!("failed to finish archive on drop: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use similar_asserts::assert_eq;

    use super::*;
    use crate::header::EntryType;

    fn burger() -> EntryHeader {
        EntryHeader {
            mode: 0o644,
            uid: 1000,
            gid: 1000,
            mtime: 1234567890,
            user_name: "vincent".into(),
            group_name: "jules".into(),
            ..EntryHeader::new("Burger")
        }
    }

    fn header_at(data: &[u8], offset: usize) -> UstarHeader {
        let block: [u8; BLOCK_SIZE] = data[offset..offset + BLOCK_SIZE].try_into().unwrap();
        UstarHeader::from_block(block)
    }

    #[test]
    fn test_single_entry() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.append(&burger()).unwrap();
        writer.write_all(b"Royale with Cheese\n").unwrap();
        let data = writer.into_inner().unwrap().into_inner();

        assert_eq!(data.len(), 4 * BLOCK_SIZE);

        let header = header_at(&data, 0);
        assert_eq!(&header.size, b"00000000023\0");
        assert_eq!(header.entry_size(), 19);
        header.verify_checksum().unwrap();
        assert_eq!(&header.checksum[6..], b"\0 ");

        assert_eq!(&data[512..531], b"Royale with Cheese\n");
        assert!(data[531..].iter().all(|&b| b == 0));

        let entry = header.to_entry();
        assert_eq!(entry, EntryHeader { size: 19, ..burger() });
    }

    #[test]
    fn test_read_back_with_tar_crate() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.append(&burger()).unwrap();
        writer.write_all(b"Royale with Cheese\n").unwrap();
        writer
            .append(&EntryHeader {
                entry_type: EntryType::Directory,
                mode: 0o755,
                ..EntryHeader::new("dir")
            })
            .unwrap();
        let data = writer.into_inner().unwrap().into_inner();

        let mut archive = tar::Archive::new(&data[..]);
        let mut entries = archive.entries().unwrap();

        let mut entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.path().unwrap().to_str(), Some("Burger"));
        assert_eq!(entry.header().mode().unwrap(), 0o644);
        assert_eq!(entry.header().username().unwrap(), Some("vincent"));
        assert_eq!(entry.header().groupname().unwrap(), Some("jules"));
        let mut body = String::new();
        entry.read_to_string(&mut body).unwrap();
        assert_eq!(body, "Royale with Cheese\n");

        let entry = entries.next().unwrap().unwrap();
        assert_eq!(entry.header().entry_type(), tar::EntryType::Directory);
        assert_eq!(entry.header().size().unwrap(), 0);

        assert!(entries.next().is_none());
    }

    #[test]
    fn test_entry_without_body() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.append(&burger()).unwrap();
        writer.append(&EntryHeader::new("second")).unwrap();
        let data = writer.into_inner().unwrap().into_inner();

        // two headers, no bodies, two end blocks
        assert_eq!(data.len(), 4 * BLOCK_SIZE);
        assert_eq!(header_at(&data, 0).entry_size(), 0);
        assert_eq!(header_at(&data, 512).path().to_str(), Some("second"));
    }

    #[test]
    fn test_declared_size_is_replaced() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer
            .append(&EntryHeader {
                size: 4096,
                ..burger()
            })
            .unwrap();
        writer.write_all(b"abc").unwrap();
        let data = writer.into_inner().unwrap().into_inner();

        let header = header_at(&data, 0);
        assert_eq!(header.entry_size(), 3);
        header.verify_checksum().unwrap();
    }

    #[test]
    fn test_block_aligned_body_has_no_padding() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.append(&burger()).unwrap();
        writer.write_all(&[b'x'; 1024]).unwrap();
        let data = writer.into_inner().unwrap().into_inner();

        assert_eq!(data.len(), BLOCK_SIZE + 1024 + 2 * BLOCK_SIZE);
    }

    #[test]
    fn test_padding_relative_to_body() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_all(b"abc").unwrap();

        let mut writer = Writer::new(cursor);
        writer.append(&burger()).unwrap();
        writer.write_all(b"xyz").unwrap();
        let data = writer.into_inner().unwrap().into_inner();

        assert_eq!(data.len(), 3 + 4 * BLOCK_SIZE);
        let header = header_at(&data, 3);
        assert_eq!(header.entry_size(), 3);
        header.verify_checksum().unwrap();
    }

    #[test]
    fn test_invalid_seek() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.append(&burger()).unwrap();
        writer.get_mut().set_position(100);

        match writer.finish() {
            Err(Error::InvalidSeek {
                header_offset,
                position,
            }) => {
                assert_eq!(header_offset, 0);
                assert_eq!(position, 100);
            }
            other => panic!("expected InvalidSeek, got {other:?}"),
        }
    }

    fn invalid_seek_after_body(writer: &mut Writer<impl Write + Seek>) {
        writer.append(&burger()).unwrap();
        writer.write_all(b"Royale").unwrap();
        writer.get_mut().seek(SeekFrom::Start(100)).unwrap();
        assert!(matches!(writer.finish(), Err(Error::InvalidSeek { .. })));
    }

    fn assert_header_intact(data: &[u8]) {
        assert_eq!(data.len(), BLOCK_SIZE + 6);
        let header = header_at(data, 0);
        assert_eq!(&header.magic, b"ustar\0");
        assert_eq!(header.checksum, [b' '; 8]);
        assert_eq!(header.path().to_str(), Some("Burger"));
    }

    #[test]
    fn test_failed_finish_stays_failed() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        invalid_seek_after_body(&mut writer);

        assert!(matches!(writer.finish(), Err(Error::Failed)));
        assert!(matches!(writer.append(&burger()), Err(Error::Failed)));
        assert!(writer.write(b"late").is_err());
        assert!(matches!(writer.into_inner(), Err(Error::Failed)));
    }

    #[test]
    fn test_failed_writer_drop_writes_nothing() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = Writer::new(&mut cursor);
            invalid_seek_after_body(&mut writer);
        }
        assert_header_intact(cursor.get_ref());
    }

    #[test]
    fn test_failed_finish_keeps_header() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        invalid_seek_after_body(&mut writer);
        assert!(writer.finish().is_err());
        assert_header_intact(writer.get_ref().get_ref());
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.append(&burger()).unwrap();
        writer.finish().unwrap();
        writer.finish().unwrap();
        assert_eq!(writer.get_ref().get_ref().len(), 3 * BLOCK_SIZE);

        assert!(matches!(writer.append(&burger()), Err(Error::Finished)));
        assert!(writer.write(b"late").is_err());
    }

    #[test]
    fn test_empty_archive() {
        let writer = Writer::new(Cursor::new(Vec::new()));
        let data = writer.into_inner().unwrap().into_inner();
        assert_eq!(data, vec![0u8; 2 * BLOCK_SIZE]);
    }

    #[test]
    fn test_drop_finishes() {
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = Writer::new(&mut cursor);
            writer.append(&burger()).unwrap();
            writer.write_all(b"Royale with Cheese\n").unwrap();
        }
        let data = cursor.into_inner();
        assert_eq!(data.len(), 4 * BLOCK_SIZE);
        assert_eq!(header_at(&data, 0).entry_size(), 19);
    }

    #[test]
    fn test_bad_entry_leaves_writer_usable() {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        let long = EntryHeader::new("x".repeat(300));
        assert!(matches!(
            writer.append(&long),
            Err(Error::FilenameTooLong { len: 300 })
        ));
        writer.append(&burger()).unwrap();
        let data = writer.into_inner().unwrap().into_inner();
        assert_eq!(data.len(), 3 * BLOCK_SIZE);
    }
}
