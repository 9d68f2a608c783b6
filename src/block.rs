//! The block device contract and a file-backed reference implementation.
//!
//! The engine in this crate never assumes anything about how blocks are
//! stored; it only depends on [`BlockDevice`]. [`FileBlockDevice`] is the
//! concrete collaborator used by [`crate::FileSystem::mount`] when the caller
//! doesn't supply one of their own.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::FsResult;

/// Size in bytes of a single block, and of every read/write transfer.
pub const BLOCK_SIZE: usize = 4096;

/// A fixed-size-block storage device.
///
/// Implementors transfer exactly [`BLOCK_SIZE`] bytes per `read`/`write`
/// call; the engine never issues a partial-block request.
pub trait BlockDevice {
    /// Number of blocks available on the device.
    fn block_count(&self) -> usize;

    /// Read block `index` into `buf`, which must be exactly [`BLOCK_SIZE`] bytes.
    fn read_block(&mut self, index: usize, buf: &mut [u8; BLOCK_SIZE]) -> FsResult<()>;

    /// Write `buf` to block `index`.
    fn write_block(&mut self, index: usize, buf: &[u8; BLOCK_SIZE]) -> FsResult<()>;
}

/// A [`BlockDevice`] backed by a regular file, where block `i` occupies
/// bytes `[i * BLOCK_SIZE, (i + 1) * BLOCK_SIZE)`.
#[derive(Debug)]
pub struct FileBlockDevice {
    file: File,
    block_count: usize,
}

impl FileBlockDevice {
    /// Opens an existing disk image at `path`. The file's length must be an
    /// exact multiple of [`BLOCK_SIZE`].
    pub fn open(path: impl AsRef<Path>) -> FsResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len % BLOCK_SIZE as u64 != 0 {
            return Err(crate::error::FsError::MountFailure(
                "disk image length is not a multiple of the block size",
            ));
        }
        let block_count = (len / BLOCK_SIZE as u64) as usize;
        log::debug!("opened block device with {block_count} blocks");
        Ok(Self { file, block_count })
    }
}

impl BlockDevice for FileBlockDevice {
    fn block_count(&self) -> usize {
        self.block_count
    }

    fn read_block(&mut self, index: usize, buf: &mut [u8; BLOCK_SIZE]) -> FsResult<()> {
        self.file
            .seek(SeekFrom::Start((index * BLOCK_SIZE) as u64))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, index: usize, buf: &[u8; BLOCK_SIZE]) -> FsResult<()> {
        self.file
            .seek(SeekFrom::Start((index * BLOCK_SIZE) as u64))?;
        self.file.write_all(buf)?;
        Ok(())
    }
}
