//! Building archive entries from filesystem objects.

use std::{
    fs::File,
    io::{self, Seek, Write},
    path::{Path, PathBuf},
};

use log::debug;
use rustix::fs::{lstat, major, minor, FileType};
use uzers::{get_group_by_gid, get_user_by_uid};

use crate::{
    error::{Error, Result},
    header::{EntryHeader, EntryType},
    writer::Writer,
};

impl EntryHeader {
    /// Describe the filesystem object at `path`, without following symlinks.
    ///
    /// The entry is named after `path`. Permission bits, ownership, and
    /// modification time come from `lstat()`. Only regular files get a
    /// non-zero size; symlinks carry their target in `link`. User and group
    /// names are resolved from the system databases, and left empty for IDs
    /// without an entry.
    ///
    /// # Errors
    ///
    /// Fails if `path` cannot be inspected, or with
    /// [`Error::UnsupportedFileType`] for sockets and unknown file types.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let buf = lstat(path).map_err(io::Error::from)?;

        let entry_type = match FileType::from_raw_mode(buf.st_mode) {
            FileType::RegularFile => EntryType::Regular,
            FileType::Directory => EntryType::Directory,
            FileType::Symlink => EntryType::Symlink,
            FileType::CharacterDevice => EntryType::Char,
            FileType::BlockDevice => EntryType::Block,
            FileType::Fifo => EntryType::Fifo,
            FileType::Socket | FileType::Unknown => {
                return Err(Error::UnsupportedFileType(path.to_path_buf()))
            }
        };

        let link = match entry_type {
            EntryType::Symlink => std::fs::read_link(path)?,
            _ => PathBuf::new(),
        };

        let (device_major, device_minor) = if entry_type.is_device() {
            (major(buf.st_rdev), minor(buf.st_rdev))
        } else {
            (0, 0)
        };

        Ok(Self {
            path: path.to_path_buf(),
            mode: buf.st_mode & 0o7777,
            uid: buf.st_uid.into(),
            gid: buf.st_gid.into(),
            size: match entry_type {
                EntryType::Regular => u64::try_from(buf.st_size).unwrap_or(0),
                _ => 0,
            },
            mtime: u64::try_from(buf.st_mtime).unwrap_or(0),
            entry_type,
            link,
            user_name: get_user_by_uid(buf.st_uid)
                .map(|user| user.name().to_string_lossy().into_owned())
                .unwrap_or_default(),
            group_name: get_group_by_gid(buf.st_gid)
                .map(|group| group.name().to_string_lossy().into_owned())
                .unwrap_or_default(),
            device_major,
            device_minor,
        })
    }
}

impl<W: Write + Seek> Writer<W> {
    /// Append the filesystem object at `path`, archived as `name` if given.
    ///
    /// Regular file contents are copied in as the entry body; every other
    /// type is written as a header alone.
    pub fn append_path(&mut self, path: impl AsRef<Path>, name: Option<&Path>) -> Result<()> {
        let path = path.as_ref();
        let mut entry = EntryHeader::from_path(path)?;
        if let Some(name) = name {
            entry.path = name.to_path_buf();
        }

        // open before writing the header so an unreadable file leaves no entry behind
        let file = match entry.entry_type {
            EntryType::Regular => Some(File::open(path)?),
            _ => None,
        };

        self.append(&entry)?;
        if let Some(mut file) = file {
            let copied = io::copy(&mut file, self)?;
            debug!("copied {copied} bytes from {path:?}");
        }

        Ok(())
    }
}
