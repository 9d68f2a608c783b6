//! ECS150-FS: a simple FAT-style filesystem over a fixed-block virtual disk.
//!
//! This crate implements the filesystem engine only: the on-disk layout and
//! its invariants, the in-memory mount image (superblock, FAT, root
//! directory, open-file table), and the read/write path that maps
//! byte-range requests through a singly-linked per-file chain of data
//! blocks using a bounce buffer. The block device itself is abstracted
//! behind [`BlockDevice`]; [`FileBlockDevice`] is the file-backed
//! implementation used by [`FileSystem::mount`].
//!
//! The typed API lives on [`FileSystem`]. Callers that want the original
//! POSIX-style `0`/`-1` return-value convention instead can use
//! [`posix::PosixShim`].

mod block;
mod dir;
mod error;
mod fat;
mod io;
mod mount;
mod openfile;
pub mod posix;
mod superblock;

pub use block::{BlockDevice, FileBlockDevice, BLOCK_SIZE};
pub use dir::{FILENAME_LEN, FILE_MAX_COUNT};
pub use error::{FsError, FsResult};
pub use fat::EOC;
pub use mount::FileSystem;
pub use openfile::OPEN_MAX_COUNT;
