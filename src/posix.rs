//! A thin POSIX-style compatibility shim over [`FileSystem`].
//!
//! Re-expresses the typed API using the original contract's return-value
//! convention: 0 on success, -1 on any validated failure, except for calls
//! that return an id, a count, or a size. Useful for callers migrating from
//! that contract, or for tests asserting against it directly. The handle is
//! owned by the caller, not a process-wide global.
use std::path::Path;

use crate::block::FileBlockDevice;
use crate::error::FsError;
use crate::mount::FileSystem;

/// Holds at most one mounted filesystem, forwarding every call to the typed
/// API and collapsing [`Result::Err`] to `-1`.
#[derive(Default)]
pub struct PosixShim {
    fs: Option<FileSystem<FileBlockDevice>>,
}

impl PosixShim {
    pub fn new() -> Self {
        Self { fs: None }
    }

    pub fn fs_mount(&mut self, path: impl AsRef<Path>) -> i32 {
        if self.fs.is_some() {
            return Self::reject(FsError::AlreadyMounted);
        }
        match FileSystem::mount(path) {
            Ok(fs) => {
                self.fs = Some(fs);
                0
            }
            Err(e) => Self::reject(e),
        }
    }

    pub fn fs_umount(&mut self) -> i32 {
        match self.fs.take() {
            Some(fs) => match fs.unmount() {
                Ok(()) => 0,
                Err(e) => Self::reject(e),
            },
            None => Self::reject(FsError::NotMounted),
        }
    }

    pub fn fs_info(&self) -> i32 {
        match &self.fs {
            Some(fs) => {
                fs.info();
                0
            }
            None => Self::reject(FsError::NotMounted),
        }
    }

    pub fn fs_create(&mut self, name: &str) -> i32 {
        self.with_mounted_mut(|fs| fs.create(name))
    }

    pub fn fs_delete(&mut self, name: &str) -> i32 {
        self.with_mounted_mut(|fs| fs.delete(name))
    }

    pub fn fs_ls(&self) -> i32 {
        match &self.fs {
            Some(fs) => {
                fs.ls();
                0
            }
            None => Self::reject(FsError::NotMounted),
        }
    }

    pub fn fs_open(&mut self, name: &str) -> i32 {
        match self.fs.as_mut() {
            Some(fs) => fs.open(name).map(|fd| fd as i32).unwrap_or_else(Self::reject),
            None => Self::reject(FsError::NotMounted),
        }
    }

    pub fn fs_close(&mut self, fd: i32) -> i32 {
        self.with_mounted_mut(|fs| fs.close(fd as usize))
    }

    pub fn fs_stat(&self, fd: i32) -> i32 {
        match &self.fs {
            Some(fs) => fs.stat(fd as usize).map(|s| s as i32).unwrap_or_else(Self::reject),
            None => Self::reject(FsError::NotMounted),
        }
    }

    pub fn fs_lseek(&mut self, fd: i32, offset: usize) -> i32 {
        self.with_mounted_mut(|fs| fs.lseek(fd as usize, offset))
    }

    pub fn fs_read(&mut self, fd: i32, buf: &mut [u8]) -> i32 {
        match self.fs.as_mut() {
            Some(fs) => fs
                .read(fd as usize, buf)
                .map(|n| n as i32)
                .unwrap_or_else(Self::reject),
            None => Self::reject(FsError::NotMounted),
        }
    }

    pub fn fs_write(&mut self, fd: i32, buf: &[u8]) -> i32 {
        match self.fs.as_mut() {
            Some(fs) => fs
                .write(fd as usize, buf)
                .map(|n| n as i32)
                .unwrap_or_else(Self::reject),
            None => Self::reject(FsError::NotMounted),
        }
    }

    /// Calls `f` against the mounted filesystem, or reports [`FsError::NotMounted`]
    /// if none is mounted. Maps `Ok(()) -> 0`, any `Err -> -1`.
    fn with_mounted_mut(
        &mut self,
        f: impl FnOnce(&mut FileSystem<FileBlockDevice>) -> crate::error::FsResult<()>,
    ) -> i32 {
        match self.fs.as_mut() {
            Some(fs) => match f(fs) {
                Ok(()) => 0,
                Err(e) => Self::reject(e),
            },
            None => Self::reject(FsError::NotMounted),
        }
    }

    /// Logs `e` and collapses it to the POSIX-style `-1` failure sentinel.
    fn reject(e: FsError) -> i32 {
        log::error!("{e}");
        -1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_image(path: &std::path::Path, data_blocks: u16) {
        use std::fs::File;
        use std::io::Write;
        use crate::block::BLOCK_SIZE;

        let fat_blocks = 1u8;
        let root_index = 1u16 + fat_blocks as u16;
        let data_start = root_index + 1;
        let total_blocks = 1 + fat_blocks as u16 + 1 + data_blocks;

        let mut file = File::create(path).unwrap();
        let mut sb = [0u8; BLOCK_SIZE];
        sb[0..8].copy_from_slice(b"ECS150FS");
        sb[8..10].copy_from_slice(&total_blocks.to_le_bytes());
        sb[10..12].copy_from_slice(&root_index.to_le_bytes());
        sb[12..14].copy_from_slice(&data_start.to_le_bytes());
        sb[14..16].copy_from_slice(&data_blocks.to_le_bytes());
        sb[16] = fat_blocks;
        file.write_all(&sb).unwrap();

        let mut fat = [0u8; BLOCK_SIZE];
        fat[0..2].copy_from_slice(&0xFFFFu16.to_le_bytes());
        file.write_all(&fat).unwrap();
        file.write_all(&[0u8; BLOCK_SIZE]).unwrap();
        for _ in 0..data_blocks {
            file.write_all(&[0u8; BLOCK_SIZE]).unwrap();
        }
    }

    #[test]
    fn shim_round_trip_matches_posix_conventions() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        make_image(tmp.path(), 4);

        let mut shim = PosixShim::new();
        assert_eq!(shim.fs_mount(tmp.path()), 0);
        assert_eq!(shim.fs_mount(tmp.path()), -1);

        assert_eq!(shim.fs_create("a"), 0);
        let fd = shim.fs_open("a");
        assert!(fd >= 0);
        assert_eq!(shim.fs_write(fd, b"hi"), 2);
        assert_eq!(shim.fs_stat(fd), 2);

        assert_eq!(shim.fs_lseek(fd, 0), 0);
        let mut buf = [0u8; 2];
        assert_eq!(shim.fs_read(fd, &mut buf), 2);
        assert_eq!(&buf, b"hi");

        assert_eq!(shim.fs_close(fd), 0);
        assert_eq!(shim.fs_umount(), 0);
        assert_eq!(shim.fs_umount(), -1);
    }

    #[test]
    fn second_mount_rejected_as_already_mounted() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        make_image(tmp.path(), 4);

        let mut shim = PosixShim::new();
        assert_eq!(shim.fs_mount(tmp.path()), 0);
        assert_eq!(shim.fs_mount(tmp.path()), -1);
        assert_eq!(shim.fs_umount(), 0);
        assert_eq!(shim.fs_mount(tmp.path()), 0);
        assert_eq!(shim.fs_umount(), 0);
    }

    #[test]
    fn calls_before_mount_rejected_as_not_mounted() {
        let mut shim = PosixShim::new();
        assert_eq!(shim.fs_info(), -1);
        assert_eq!(shim.fs_ls(), -1);
        assert_eq!(shim.fs_create("a"), -1);
        assert_eq!(shim.fs_open("a"), -1);
        assert_eq!(shim.fs_umount(), -1);
    }
}
