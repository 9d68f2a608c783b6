//! The open-file table: up to [`OPEN_MAX_COUNT`] in-memory descriptors, each
//! naming a file in the root directory and holding an independent byte
//! offset into it.

use crate::dir::RootDirectory;
use crate::error::{FsError, FsResult};

/// Maximum number of simultaneously open descriptors.
pub const OPEN_MAX_COUNT: usize = 32;

struct Slot {
    filename: Option<String>,
    /// Wide enough to index any byte of the largest representable file; the
    /// original source's 8-bit offset could not, and that was a bug.
    offset: usize,
}

impl Slot {
    fn empty() -> Self {
        Self {
            filename: None,
            offset: 0,
        }
    }
}

/// The table of open-file descriptors.
pub struct OpenFileTable {
    slots: [Slot; OPEN_MAX_COUNT],
    open_count: usize,
}

impl Default for OpenFileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenFileTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| Slot::empty()),
            open_count: 0,
        }
    }

    fn check_fd(&self, fd: usize) -> FsResult<()> {
        if fd >= OPEN_MAX_COUNT || self.slots[fd].filename.is_none() {
            return Err(FsError::BadFd);
        }
        Ok(())
    }

    /// Opens `name`, which must already exist in `root`. Returns the new
    /// descriptor id (the lowest free slot index).
    pub fn open(&mut self, root: &RootDirectory, name: &str) -> FsResult<usize> {
        if root.lookup(name).is_none() {
            return Err(FsError::NoSuchFile);
        }
        if self.open_count == OPEN_MAX_COUNT {
            return Err(FsError::TooManyOpen);
        }
        let fd = self
            .slots
            .iter()
            .position(|s| s.filename.is_none())
            .expect("open_count < OPEN_MAX_COUNT implies a free slot exists");
        self.slots[fd] = Slot {
            filename: Some(name.to_string()),
            offset: 0,
        };
        self.open_count += 1;
        log::debug!("opened {name:?} as fd {fd}");
        Ok(fd)
    }

    pub fn close(&mut self, fd: usize) -> FsResult<()> {
        self.check_fd(fd)?;
        self.slots[fd] = Slot::empty();
        self.open_count -= 1;
        Ok(())
    }

    /// Filename held by `fd`.
    pub fn filename(&self, fd: usize) -> FsResult<&str> {
        self.check_fd(fd)?;
        Ok(self.slots[fd].filename.as_deref().unwrap())
    }

    pub fn offset(&self, fd: usize) -> FsResult<usize> {
        self.check_fd(fd)?;
        Ok(self.slots[fd].offset)
    }

    pub fn set_offset(&mut self, fd: usize, offset: usize) -> FsResult<()> {
        self.check_fd(fd)?;
        self.slots[fd].offset = offset;
        Ok(())
    }

    /// `true` if any open descriptor refers to `name`.
    pub fn is_open(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|s| s.filename.as_deref() == Some(name))
    }

    /// `true` if any descriptor is currently open, used to gate `unmount`.
    pub fn any_open(&self) -> bool {
        self.open_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::MemBlockDevice;

    fn root_with(names: &[&str]) -> (RootDirectory, MemBlockDevice) {
        let mut dev = MemBlockDevice::new(2);
        let mut root = RootDirectory::load(&mut dev, 1).unwrap();
        for n in names {
            root.create(&mut dev, n).unwrap();
        }
        (root, dev)
    }

    #[test]
    fn open_assigns_lowest_free_slot() {
        let (root, _dev) = root_with(&["a", "b"]);
        let mut table = OpenFileTable::new();
        let fd_a = table.open(&root, "a").unwrap();
        let fd_b = table.open(&root, "b").unwrap();
        assert_eq!(fd_a, 0);
        assert_eq!(fd_b, 1);
        table.close(fd_a).unwrap();
        let fd_a2 = table.open(&root, "a").unwrap();
        assert_eq!(fd_a2, 0);
    }

    #[test]
    fn independent_offsets_for_same_file() {
        let (root, _dev) = root_with(&["a"]);
        let mut table = OpenFileTable::new();
        let fd1 = table.open(&root, "a").unwrap();
        let fd2 = table.open(&root, "a").unwrap();
        table.set_offset(fd1, 3).unwrap();
        table.set_offset(fd2, 7).unwrap();
        assert_eq!(table.offset(fd1).unwrap(), 3);
        assert_eq!(table.offset(fd2).unwrap(), 7);
    }

    #[test]
    fn too_many_open_rejected() {
        let mut names = Vec::new();
        for i in 0..OPEN_MAX_COUNT + 1 {
            names.push(format!("f{i}"));
        }
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (root, _dev) = root_with(&name_refs);
        let mut table = OpenFileTable::new();
        for name in &name_refs[..OPEN_MAX_COUNT] {
            table.open(&root, name).unwrap();
        }
        assert!(matches!(
            table.open(&root, name_refs[OPEN_MAX_COUNT]),
            Err(FsError::TooManyOpen)
        ));
    }

    #[test]
    fn bad_fd_rejected() {
        let table = OpenFileTable::new();
        assert!(matches!(table.offset(0), Err(FsError::BadFd)));
        assert!(matches!(table.offset(OPEN_MAX_COUNT), Err(FsError::BadFd)));
    }
}
