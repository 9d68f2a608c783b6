//! Mount lifecycle: owns the block device and every in-memory table for the
//! duration of a single mount. There is no process-wide state; "only one
//! mount at a time" falls out of `FileSystem` being the sole owner of the
//! device and tables it was built from.

use crate::block::{BlockDevice, FileBlockDevice};
use crate::dir::RootDirectory;
use crate::error::{FsError, FsResult};
use crate::fat::Fat;
use crate::io;
use crate::openfile::OpenFileTable;
use crate::superblock::Superblock;

/// A mounted ECS150-FS image.
///
/// Dropping this handle without calling [`FileSystem::unmount`] leaves the
/// FAT unflushed; callers that care about durability should call `unmount`
/// explicitly and check its result.
pub struct FileSystem<D: BlockDevice> {
    device: D,
    superblock: Superblock,
    fat: Fat,
    root: RootDirectory,
    open_files: OpenFileTable,
}

impl FileSystem<FileBlockDevice> {
    /// Mounts the ECS150-FS image at `path`, opening it as a plain file.
    pub fn mount(path: impl AsRef<std::path::Path>) -> FsResult<Self> {
        let device = FileBlockDevice::open(path)?;
        Self::mount_device(device)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    /// Mounts an already-open block device. Useful for testing against an
    /// in-memory device, or for embedding this crate over an arbitrary
    /// [`BlockDevice`] implementation.
    pub fn mount_device(mut device: D) -> FsResult<Self> {
        let superblock = Superblock::load(&mut device)?;
        let fat = Fat::load(
            &mut device,
            superblock.fat_blocks as usize,
            superblock.data_blocks as usize,
        )?;
        let root = RootDirectory::load(&mut device, superblock.root_index as usize)?;

        log::info!(
            "mounted filesystem: {} data blocks, {} free",
            superblock.data_blocks,
            fat.free_count()
        );

        Ok(Self {
            device,
            superblock,
            fat,
            root,
            open_files: OpenFileTable::new(),
        })
    }

    /// Flushes the superblock, FAT, and root directory, then releases the
    /// handle. Fails with [`FsError::Busy`] if any descriptor is still open.
    pub fn unmount(mut self) -> FsResult<()> {
        if self.open_files.any_open() {
            return Err(FsError::Busy);
        }
        self.superblock.flush(&mut self.device)?;
        self.fat.flush(&mut self.device)?;
        self.root.flush(&mut self.device)?;
        log::info!("unmounted filesystem");
        Ok(())
    }

    /// Creates a new, empty file named `name`.
    pub fn create(&mut self, name: &str) -> FsResult<()> {
        self.root.create(&mut self.device, name)
    }

    /// Deletes `name`. Fails with [`FsError::Busy`] if it is currently open.
    pub fn delete(&mut self, name: &str) -> FsResult<()> {
        if self.open_files.is_open(name) {
            return Err(FsError::Busy);
        }
        let first_block = self.root.delete(&mut self.device, name)?;
        self.fat.free_chain(first_block);
        Ok(())
    }

    /// Opens `name`, returning a descriptor id.
    pub fn open(&mut self, name: &str) -> FsResult<usize> {
        self.open_files.open(&self.root, name)
    }

    pub fn close(&mut self, fd: usize) -> FsResult<()> {
        self.open_files.close(fd)
    }

    /// Size, in bytes, of the file referenced by `fd`.
    pub fn stat(&self, fd: usize) -> FsResult<u32> {
        let name = self.open_files.filename(fd)?;
        let slot = self.root.lookup(name).ok_or(FsError::NoSuchFile)?;
        Ok(self.root.entry(slot).size)
    }

    /// Moves `fd`'s cursor to `offset`, which must not exceed the file's size.
    pub fn lseek(&mut self, fd: usize, offset: usize) -> FsResult<()> {
        let size = self.stat(fd)? as usize;
        if offset > size {
            return Err(FsError::BadOffset);
        }
        self.open_files.set_offset(fd, offset)
    }

    /// Reads up to `buf.len()` bytes from `fd` at its current offset,
    /// advancing it by the number of bytes actually read.
    pub fn read(&mut self, fd: usize, buf: &mut [u8]) -> FsResult<usize> {
        let name = self.open_files.filename(fd)?.to_string();
        let slot = self.root.lookup(&name).ok_or(FsError::NoSuchFile)?;
        let entry = *self.root.entry(slot);
        let offset = self.open_files.offset(fd)?;

        let n = io::read_chain(
            &mut self.device,
            &self.fat,
            self.superblock.data_start as usize,
            entry.first_block,
            entry.size as usize,
            offset,
            buf,
        )?;
        self.open_files.set_offset(fd, offset + n)?;
        Ok(n)
    }

    /// Writes `buf` to `fd` at its current offset, allocating new blocks as
    /// needed, and advances the offset by the number of bytes actually
    /// written.
    pub fn write(&mut self, fd: usize, buf: &[u8]) -> FsResult<usize> {
        let name = self.open_files.filename(fd)?.to_string();
        let slot = self.root.lookup(&name).ok_or(FsError::NoSuchFile)?;
        let entry = *self.root.entry(slot);
        let offset = self.open_files.offset(fd)?;

        let outcome = io::write_chain(
            &mut self.device,
            &mut self.fat,
            self.superblock.data_start as usize,
            entry.first_block,
            entry.size,
            offset,
            buf,
        )?;

        if outcome.new_size != entry.size || outcome.new_first_block != entry.first_block {
            self.root.update(
                &mut self.device,
                &name,
                outcome.new_size,
                outcome.new_first_block,
            )?;
        }
        if outcome.bytes_written == 0 && !buf.is_empty() && outcome.new_first_block == entry.first_block
        {
            log::warn!("write to {name:?} dropped for lack of free space");
        }
        self.open_files
            .set_offset(fd, offset + outcome.bytes_written)?;
        Ok(outcome.bytes_written)
    }

    /// Prints filesystem geometry and free-space ratios, per the `FS Info:`
    /// human-readable format.
    pub fn info(&self) {
        let total_entries = self.fat.data_blocks();
        println!("FS Info:");
        println!("total_blk_count={}", self.superblock.total_blocks);
        println!("fat_blk_count={}", self.superblock.fat_blocks);
        println!("rdir_blk={}", self.superblock.root_index);
        println!("data_blk={}", self.superblock.data_start);
        println!("data_blk_count={}", self.superblock.data_blocks);
        println!(
            "fat_free_ratio={}/{}",
            self.fat.free_count(),
            total_entries
        );
        let (free, capacity) = io::root_free_ratio(&self.root, crate::dir::FILE_MAX_COUNT);
        println!("rdir_free_ratio={free}/{capacity}");
    }

    /// Prints one line per non-empty root entry, per the `FS ls:` format.
    pub fn ls(&self) {
        println!("FS ls:");
        for entry in self.root.list() {
            println!(
                "file: {}, size: {}, data_blk: {}",
                entry.name_str(),
                entry.size,
                entry.first_block
            );
        }
    }
}
