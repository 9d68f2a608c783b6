//! Error taxonomy for the filesystem engine.
//!
//! Every fallible operation in this crate returns [`FsResult`]. Nothing here
//! is recovered internally; a failing call leaves no mutation the caller can
//! observe, except where a partial write is explicitly documented.

use std::fmt;
use std::io;

/// Result alias used throughout the typed API.
pub type FsResult<T> = Result<T, FsError>;

/// All ways a filesystem operation can fail.
#[derive(Debug)]
pub enum FsError {
    /// The underlying block device could not be opened, the superblock
    /// could not be read, or a layout invariant did not hold.
    MountFailure(&'static str),

    /// An operation was attempted before a successful `mount`.
    NotMounted,

    /// A second mount was attempted while a mount was already active.
    AlreadyMounted,

    /// A filename was null, empty, or at least `FILENAME_LEN` bytes long.
    InvalidName,

    /// `create` was called with a filename already present in the root.
    Exists,

    /// `delete`, `open`, or `stat` named a file absent from the root.
    NoSuchFile,

    /// The root directory is at capacity.
    Full,

    /// The FAT has no free entry to satisfy an allocation.
    NoSpace,

    /// The open-file table is at capacity.
    TooManyOpen,

    /// A descriptor was out of range, or referred to an empty slot.
    BadFd,

    /// A `lseek` target exceeded the file's size.
    BadOffset,

    /// `delete` targeted a file that is still open, or `unmount` was called
    /// while descriptors remain open.
    Busy,

    /// The block device reported an I/O failure.
    Io(io::Error),
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::MountFailure(reason) => write!(f, "mount failed: {reason}"),
            FsError::NotMounted => write!(f, "no filesystem is mounted"),
            FsError::AlreadyMounted => write!(f, "a filesystem is already mounted"),
            FsError::InvalidName => write!(f, "invalid filename"),
            FsError::Exists => write!(f, "file already exists"),
            FsError::NoSuchFile => write!(f, "no such file"),
            FsError::Full => write!(f, "root directory is full"),
            FsError::NoSpace => write!(f, "no free data block"),
            FsError::TooManyOpen => write!(f, "too many open files"),
            FsError::BadFd => write!(f, "bad file descriptor"),
            FsError::BadOffset => write!(f, "offset beyond end of file"),
            FsError::Busy => write!(f, "file is still open"),
            FsError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for FsError {
    fn from(e: io::Error) -> Self {
        FsError::Io(e)
    }
}
