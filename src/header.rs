//! The ustar header block and its mapping to a generic entry description.
//!
//! [`UstarHeader`] is the raw 512-byte layout, accessed through [`zerocopy`]
//! so that the checksum can be computed as a flat byte sum over the block.
//! [`EntryHeader`] is the format-independent description callers work with.

use std::{
    ffi::OsStr,
    fmt,
    mem::offset_of,
    os::unix::ffi::OsStrExt,
    path::PathBuf,
};

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::{
    error::{Error, Result},
    field::{decode_octal, decode_text, encode_octal, encode_text},
};

/// Size of a tar block (and of a header) in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Magic string for ustar headers ("ustar\0").
pub const USTAR_MAGIC: &[u8; 6] = b"ustar\0";

/// Version field for ustar headers ("00").
pub const USTAR_VERSION: &[u8; 2] = b"00";

/// Width of the `name` field.
pub const NAME_MAX: usize = 100;

/// Width of the `prefix` field.
pub const PREFIX_MAX: usize = 155;

/// Longest path [`split_path`] accepts.
pub const PATH_MAX: usize = (NAME_MAX - 1) + (PREFIX_MAX - 1);

const CHECKSUM_OFFSET: usize = offset_of!(UstarHeader, checksum);
const CHECKSUM_LEN: usize = 8;

/// Tar entry type indicating the kind of file system object.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EntryType {
    /// Regular file (type '0' or '\0' for old tar compatibility).
    #[default]
    Regular,
    /// Hard link to another entry in the archive (type '1').
    Link,
    /// Symbolic link (type '2').
    Symlink,
    /// Character device (type '3').
    Char,
    /// Block device (type '4').
    Block,
    /// Directory (type '5').
    Directory,
    /// FIFO/named pipe (type '6').
    Fifo,
    /// Contiguous file (type '7').
    Contiguous,
    /// Any other type flag, kept verbatim.
    Other(u8),
}

impl EntryType {
    /// Parse an entry type from a raw type flag.
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            b'0' | b'\0' => EntryType::Regular,
            b'1' => EntryType::Link,
            b'2' => EntryType::Symlink,
            b'3' => EntryType::Char,
            b'4' => EntryType::Block,
            b'5' => EntryType::Directory,
            b'6' => EntryType::Fifo,
            b'7' => EntryType::Contiguous,
            other => EntryType::Other(other),
        }
    }

    /// Convert to the raw type flag. `Regular` is encoded as '0', not '\0'.
    #[must_use]
    pub fn to_byte(self) -> u8 {
        match self {
            EntryType::Regular => b'0',
            EntryType::Link => b'1',
            EntryType::Symlink => b'2',
            EntryType::Char => b'3',
            EntryType::Block => b'4',
            EntryType::Directory => b'5',
            EntryType::Fifo => b'6',
            EntryType::Contiguous => b'7',
            EntryType::Other(b) => b,
        }
    }

    /// Returns true for entries whose size describes a body.
    #[must_use]
    pub fn is_file(self) -> bool {
        matches!(self, EntryType::Regular | EntryType::Contiguous)
    }

    /// Returns true for hard and symbolic links.
    #[must_use]
    pub fn is_link(self) -> bool {
        matches!(self, EntryType::Link | EntryType::Symlink)
    }

    /// Returns true for character and block devices.
    #[must_use]
    pub fn is_device(self) -> bool {
        matches!(self, EntryType::Char | EntryType::Block)
    }
}

impl From<u8> for EntryType {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<EntryType> for u8 {
    fn from(entry_type: EntryType) -> Self {
        entry_type.to_byte()
    }
}

/// Format-independent description of one archive entry.
///
/// `size` is only meaningful for regular and contiguous files and `link`
/// only for hard and symbolic links. Device numbers are accepted but not
/// round-tripped: they are always written and read back as 0.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryHeader {
    /// Path of the entry inside the archive.
    pub path: PathBuf,
    /// Permission bits.
    pub mode: u32,
    /// Owner user ID.
    pub uid: u64,
    /// Owner group ID.
    pub gid: u64,
    /// Body size in bytes.
    pub size: u64,
    /// Modification time in seconds since the Unix epoch.
    pub mtime: u64,
    /// Kind of file system object.
    pub entry_type: EntryType,
    /// Link target for hard and symbolic links.
    pub link: PathBuf,
    /// Owner user name.
    pub user_name: String,
    /// Owner group name.
    pub group_name: String,
    /// Device major number.
    pub device_major: u32,
    /// Device minor number.
    pub device_minor: u32,
}

impl EntryHeader {
    /// A regular file entry at `path` with every other field zeroed.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// The ustar header block.
///
/// | Offset | Size | Field    |
/// |--------|------|----------|
/// | 0      | 100  | name     |
/// | 100    | 8    | mode     |
/// | 108    | 8    | uid      |
/// | 116    | 8    | gid      |
/// | 124    | 12   | size     |
/// | 136    | 12   | mtime    |
/// | 148    | 8    | checksum |
/// | 156    | 1    | typeflag |
/// | 157    | 100  | linkname |
/// | 257    | 6    | magic    |
/// | 263    | 2    | version  |
/// | 265    | 32   | uname    |
/// | 297    | 32   | gname    |
/// | 329    | 8    | devmajor |
/// | 337    | 8    | devminor |
/// | 345    | 155  | prefix   |
/// | 500    | 12   | (pad)    |
#[derive(Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct UstarHeader {
    /// Last path components (null-terminated).
    pub name: [u8; 100],
    /// File mode in octal ASCII.
    pub mode: [u8; 8],
    /// Owner user ID in octal ASCII.
    pub uid: [u8; 8],
    /// Owner group ID in octal ASCII.
    pub gid: [u8; 8],
    /// File size in octal ASCII.
    pub size: [u8; 12],
    /// Modification time as Unix timestamp in octal ASCII.
    pub mtime: [u8; 12],
    /// Header checksum in octal ASCII.
    pub checksum: [u8; 8],
    /// Entry type flag.
    pub typeflag: u8,
    /// Link target name for hard/symbolic links.
    pub linkname: [u8; 100],
    /// Magic string identifying the format ("ustar\0").
    pub magic: [u8; 6],
    /// Format version ("00").
    pub version: [u8; 2],
    /// Owner user name (null-terminated).
    pub uname: [u8; 32],
    /// Owner group name (null-terminated).
    pub gname: [u8; 32],
    /// Device major number in octal ASCII.
    pub devmajor: [u8; 8],
    /// Device minor number in octal ASCII.
    pub devminor: [u8; 8],
    /// Leading path components for paths that do not fit `name`.
    pub prefix: [u8; 155],
    /// Padding to fill the 512-byte block.
    pub pad: [u8; 12],
}

impl Default for UstarHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl UstarHeader {
    /// An empty header with magic and version set and a blank checksum.
    #[must_use]
    pub fn new() -> Self {
        let mut header: UstarHeader = zerocopy::transmute!([0u8; BLOCK_SIZE]);
        header.checksum = [b' '; CHECKSUM_LEN];
        header.magic = *USTAR_MAGIC;
        header.version = *USTAR_VERSION;
        header
    }

    /// Reinterpret a raw block as a header.
    #[must_use]
    pub fn from_block(block: [u8; BLOCK_SIZE]) -> Self {
        zerocopy::transmute!(block)
    }

    /// Build the binary header for `entry`.
    ///
    /// The checksum is left blank; it is filled in once the body size is
    /// known (see [`UstarHeader::update_checksum`]).
    ///
    /// # Errors
    ///
    /// Returns [`Error::FilenameTooLong`] if the path cannot be stored even
    /// when split, [`Error::FieldTooLong`] for an oversized link target or
    /// owner name, and [`Error::NumericFieldOverflow`] for numbers that do not
    /// fit their octal fields.
    pub fn from_entry(entry: &EntryHeader) -> Result<Self> {
        let path = entry.path.as_os_str().as_bytes();
        let (name, prefix) = split_path(path)?;

        let mut header = Self::new();
        encode_text(name, &mut header.name)?;
        encode_octal(u64::from(entry.mode), &mut header.mode[..7])?;
        encode_octal(entry.uid, &mut header.uid[..7])?;
        encode_octal(entry.gid, &mut header.gid[..7])?;
        encode_octal(entry.size, &mut header.size[..11])?;
        encode_octal(entry.mtime, &mut header.mtime[..11])?;
        header.typeflag = entry.entry_type.to_byte();
        encode_text(entry.link.as_os_str().as_bytes(), &mut header.linkname)?;

        encode_text(entry.user_name.as_bytes(), &mut header.uname)?;
        encode_text(entry.group_name.as_bytes(), &mut header.gname)?;
        encode_octal(0, &mut header.devmajor[..7])?;
        encode_octal(0, &mut header.devminor[..7])?;
        encode_text(prefix, &mut header.prefix)
            .map_err(|_| Error::FilenameTooLong { len: path.len() })?;

        Ok(header)
    }

    /// Decode the generic description of this header.
    ///
    /// Numeric fields decode leniently; device numbers are reported as 0.
    #[must_use]
    pub fn to_entry(&self) -> EntryHeader {
        EntryHeader {
            path: self.path(),
            mode: decode_octal(&self.mode) as u32,
            uid: decode_octal(&self.uid),
            gid: decode_octal(&self.gid),
            size: self.entry_size(),
            mtime: decode_octal(&self.mtime),
            entry_type: self.entry_type(),
            link: PathBuf::from(OsStr::from_bytes(decode_text(&self.linkname))),
            user_name: String::from_utf8_lossy(decode_text(&self.uname)).into_owned(),
            group_name: String::from_utf8_lossy(decode_text(&self.gname)).into_owned(),
            device_major: 0,
            device_minor: 0,
        }
    }

    /// The full path: `prefix/name` when a prefix is present, else `name`.
    #[must_use]
    pub fn path_bytes(&self) -> Vec<u8> {
        let name = decode_text(&self.name);
        let prefix = decode_text(&self.prefix);
        if prefix.is_empty() {
            return name.to_vec();
        }
        let mut path = Vec::with_capacity(prefix.len() + 1 + name.len());
        path.extend_from_slice(prefix);
        path.push(b'/');
        path.extend_from_slice(name);
        path
    }

    /// The full path as a [`PathBuf`].
    #[must_use]
    pub fn path(&self) -> PathBuf {
        PathBuf::from(OsStr::from_bytes(&self.path_bytes()))
    }

    /// Get the entry type.
    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        EntryType::from_byte(self.typeflag)
    }

    /// Get the body size in bytes (0 if the field is malformed).
    #[must_use]
    pub fn entry_size(&self) -> u64 {
        decode_octal(&self.size)
    }

    /// Store the body size.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NumericFieldOverflow`] if the size needs more than 11
    /// octal digits.
    pub fn set_entry_size(&mut self, size: u64) -> Result<()> {
        encode_octal(size, &mut self.size[..11])
    }

    /// Raw device major number as stored in the header.
    #[must_use]
    pub fn device_major(&self) -> u64 {
        decode_octal(&self.devmajor)
    }

    /// Raw device minor number as stored in the header.
    #[must_use]
    pub fn device_minor(&self) -> u64 {
        decode_octal(&self.devminor)
    }

    /// Check if this header is an all-zero block.
    ///
    /// Two consecutive zero blocks mark the end of an archive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }

    /// Compute the header checksum.
    ///
    /// This is the unsigned sum of all header bytes, with the checksum field
    /// counted as eight ASCII spaces.
    #[must_use]
    pub fn compute_checksum(&self) -> u64 {
        let checksum_field = CHECKSUM_OFFSET..CHECKSUM_OFFSET + CHECKSUM_LEN;
        self.as_bytes()
            .iter()
            .enumerate()
            .map(|(i, &byte)| {
                if checksum_field.contains(&i) {
                    u64::from(b' ')
                } else {
                    u64::from(byte)
                }
            })
            .sum()
    }

    /// Compute the checksum and store it as six octal digits, NUL, space.
    ///
    /// # Errors
    ///
    /// Never fails in practice: the largest possible sum fits six digits.
    pub fn update_checksum(&mut self) -> Result<()> {
        let sum = self.compute_checksum();
        encode_octal(sum, &mut self.checksum[..6])?;
        self.checksum[6] = b'\0';
        self.checksum[7] = b' ';
        Ok(())
    }

    /// Get the checksum stored in the header.
    #[must_use]
    pub fn stored_checksum(&self) -> u64 {
        decode_octal(&self.checksum)
    }

    /// Verify the stored checksum.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChecksumMismatch`] if it does not match the computed
    /// value.
    pub fn verify_checksum(&self) -> Result<()> {
        let stored = self.stored_checksum();
        let computed = self.compute_checksum();
        if stored == computed {
            Ok(())
        } else {
            Err(Error::ChecksumMismatch { stored, computed })
        }
    }
}

impl TryFrom<&EntryHeader> for UstarHeader {
    type Error = Error;

    fn try_from(entry: &EntryHeader) -> Result<Self> {
        Self::from_entry(entry)
    }
}

impl From<&UstarHeader> for EntryHeader {
    fn from(header: &UstarHeader) -> Self {
        header.to_entry()
    }
}

impl fmt::Debug for UstarHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UstarHeader")
            .field("path", &String::from_utf8_lossy(&self.path_bytes()))
            .field("entry_type", &self.entry_type())
            .field("size", &self.entry_size())
            .field("mode", &format!("{:04o}", decode_octal(&self.mode)))
            .field("checksum", &String::from_utf8_lossy(&self.checksum))
            .finish_non_exhaustive()
    }
}

/// Split `path` into the `(name, prefix)` pair stored in a ustar header.
///
/// Paths shorter than [`NAME_MAX`] go into `name` unchanged. Longer paths are
/// split at a `/` so that `name` is the longest suffix shorter than
/// [`NAME_MAX`] and `prefix` holds everything before the separator:
/// `prefix + "/" + name == path`.
///
/// # Errors
///
/// Returns [`Error::FilenameTooLong`] if the last component alone is
/// [`NAME_MAX`] bytes or longer, if the path is longer than [`PATH_MAX`], or
/// if there is no separator left to split at.
pub fn split_path(path: &[u8]) -> Result<(&[u8], &[u8])> {
    let len = path.len();
    if len < NAME_MAX {
        return Ok((path, &[]));
    }

    let too_long = Error::FilenameTooLong { len };
    let last = path.rsplit(|&b| b == b'/').next().unwrap_or(path);
    if last.len() >= NAME_MAX || len > PATH_MAX {
        return Err(too_long);
    }

    // `boundary` is the index of the slash ending the prefix; 0 means no
    // prefix yet (a leading slash alone does not make one).
    let mut boundary = 0;
    let mut remaining = len;
    for component in path.split(|&b| b == b'/') {
        if remaining < NAME_MAX && boundary > 0 {
            break;
        }
        let end = len - remaining + component.len();
        if end >= len {
            return Err(too_long);
        }
        boundary = end;
        remaining = len - end - 1;
    }

    Ok((&path[boundary + 1..], &path[..boundary]))
}
