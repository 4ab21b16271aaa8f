use std::io::{Error, ErrorKind, Read, Result};

/// This function reads the exact amount of bytes required to fill the buffer, possibly performing
/// multiple reads to do so (and also retrying if required to deal with EINTR).
///
/// Unlike the standard Read::read_exact() method, it tells an incomplete read (some bytes were
/// read, but the buffer wasn't filled) apart from a "clean" EOF where the stream ends
/// immediately with no data read at all, which is still considered to be a success.
///
/// # Return value
///
///  - the buffer was filled: Ok(true)
///  - clean EOF: Ok(false)
///  - EOF after some bytes were read: an Error with ErrorKind::UnexpectedEof
///  - errors from the Read implementation are returned directly
pub(crate) fn read_exactish(reader: &mut impl Read, buf: &mut [u8]) -> Result<bool> {
    let buflen = buf.len();
    let mut todo: &mut [u8] = buf;

    while !todo.is_empty() {
        match reader.read(todo) {
            Ok(0) => {
                return match todo.len() {
                    s if s == buflen => Ok(false), // clean EOF
                    _ => Err(Error::from(ErrorKind::UnexpectedEof)),
                };
            }
            Ok(n) => todo = &mut todo[n..],
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(true)
}

/// Number of zero bytes needed after `len` body bytes to reach a block boundary.
pub(crate) fn padding_len(len: u64) -> u64 {
    len.next_multiple_of(crate::BLOCK_SIZE as u64) - len
}
