//! A read view restricted to a byte range of a seekable transport.

use std::io::{self, Read, Seek, SeekFrom};

use log::trace;

/// Restricts reads on `R` to the range `[begin, end)`.
///
/// The window does not keep a cursor of its own: it asks the transport where
/// it is on every read and clamps the request to what is left before `end`.
/// Reading past `end` reports end-of-data even if the transport has more
/// bytes. Seeking the transport through [`Window::get_mut`] moves the window's
/// view along with it.
#[derive(Debug)]
pub struct Window<R> {
    inner: R,
    begin: u64,
    end: u64,
}

impl<R: Seek> Window<R> {
    /// Wrap `inner` with an empty window at its current position.
    pub fn new(mut inner: R) -> io::Result<Self> {
        let pos = inner.stream_position()?;
        Ok(Self {
            inner,
            begin: pos,
            end: pos,
        })
    }

    /// Move the window to `[begin, end)` and seek the transport to `begin`.
    pub fn reset(&mut self, begin: u64, end: u64) -> io::Result<()> {
        trace!("window reset to [{begin}, {end})");
        self.begin = begin;
        self.end = end;
        self.inner.seek(SeekFrom::Start(begin))?;
        Ok(())
    }

    /// Number of bytes left before the end of the window.
    pub fn remaining(&mut self) -> io::Result<u64> {
        let pos = self.inner.stream_position()?;
        Ok(self.end.saturating_sub(pos))
    }

    /// The current `[begin, end)` range.
    #[must_use]
    pub fn range(&self) -> (u64, u64) {
        (self.begin, self.end)
    }

    /// Get a reference to the underlying transport.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Get a mutable reference to the underlying transport.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Consume the window and return the underlying transport.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read + Seek> Read for Window<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.remaining()?;
        if remaining == 0 {
            return Ok(0);
        }
        let len = usize::try_from(remaining).map_or(buf.len(), |r| r.min(buf.len()));
        self.inner.read(&mut buf[..len])
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use similar_asserts::assert_eq;

    use super::*;

    #[test]
    fn test_window_clamps_reads() {
        let mut window = Window::new(Cursor::new(b"0123456789")).unwrap();
        window.reset(2, 7).unwrap();

        let mut buf = [0u8; 10];
        window.read_exact(&mut buf[..2]).unwrap();
        assert_eq!(&buf[..2], b"23");
        assert_eq!(window.remaining().unwrap(), 3);

        let n = window.read(&mut buf[..5]).unwrap();
        assert_eq!(&buf[..n], b"456");
        assert_eq!(window.read(&mut buf).unwrap(), 0);

        // read_exact over the boundary is a short read
        window.reset(2, 7).unwrap();
        assert_eq!(
            window.read_exact(&mut buf[..6]).unwrap_err().kind(),
            io::ErrorKind::UnexpectedEof
        );
    }

    #[test]
    fn test_window_read_to_end() {
        let mut window = Window::new(Cursor::new(b"0123456789")).unwrap();
        window.reset(4, 9).unwrap();

        let mut body = Vec::new();
        window.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"45678");
        assert_eq!(window.range(), (4, 9));
        // the transport itself still has data
        assert_eq!(window.get_ref().position(), 9);
    }

    #[test]
    fn test_window_past_transport_end() {
        let mut window = Window::new(Cursor::new(b"0123")).unwrap();
        window.reset(2, 100).unwrap();

        let mut body = Vec::new();
        window.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"23");
        assert_eq!(window.remaining().unwrap(), 96);
    }

    #[test]
    fn test_window_new_is_empty() {
        let mut cursor = Cursor::new(b"0123456789");
        cursor.set_position(3);
        let mut window = Window::new(cursor).unwrap();
        assert_eq!(window.range(), (3, 3));
        assert_eq!(window.read(&mut [0u8; 4]).unwrap(), 0);
    }

    #[test]
    fn test_window_shares_cursor() {
        let mut window = Window::new(Cursor::new(b"0123456789")).unwrap();
        window.reset(0, 8).unwrap();
        window.get_mut().seek(SeekFrom::Start(6)).unwrap();

        let mut body = Vec::new();
        window.read_to_end(&mut body).unwrap();
        assert_eq!(body, b"67");
    }
}
