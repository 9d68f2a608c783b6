//! The root directory: a single 4096-byte block holding a fixed-capacity,
//! flat table of file entries. There is no hierarchy.

use bytemuck::{Pod, Zeroable};

use crate::block::{BlockDevice, BLOCK_SIZE};
use crate::error::{FsError, FsResult};
use crate::fat::EOC;

/// Maximum length of a filename, including its NUL terminator.
pub const FILENAME_LEN: usize = 16;

/// Maximum number of files the root directory can hold.
pub const FILE_MAX_COUNT: usize = 128;

/// Bit-exact, byte-addressable layout of one root directory entry.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
struct RawEntry {
    filename: [u8; FILENAME_LEN],
    file_size: u32,
    first_block: u16,
    padding: [u8; 10],
}

const _: () = assert!(std::mem::size_of::<RawEntry>() == 32);
const _: () = assert!(std::mem::size_of::<[RawEntry; FILE_MAX_COUNT]>() == BLOCK_SIZE);

/// An in-memory root directory entry.
#[derive(Clone, Copy, Debug)]
pub struct Entry {
    pub filename: [u8; FILENAME_LEN],
    pub size: u32,
    pub first_block: u16,
}

impl Entry {
    fn empty() -> Self {
        Self {
            filename: [0u8; FILENAME_LEN],
            size: 0,
            first_block: EOC,
        }
    }

    fn is_empty(&self) -> bool {
        self.filename[0] == 0
    }

    /// Decodes the stored filename up to its NUL terminator.
    pub fn name_str(&self) -> &str {
        let len = self
            .filename
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.filename.len());
        std::str::from_utf8(&self.filename[..len]).unwrap_or("")
    }
}

/// The root directory, cached in memory for the lifetime of a mount.
pub struct RootDirectory {
    entries: [Entry; FILE_MAX_COUNT],
    root_index: usize,
}

/// Validates a filename against the `FILENAME_LEN` constraint and returns
/// its zero-padded, NUL-terminated on-disk representation.
fn encode_name(name: &str) -> FsResult<[u8; FILENAME_LEN]> {
    if name.is_empty() || name.len() >= FILENAME_LEN || name.as_bytes().contains(&0) {
        return Err(FsError::InvalidName);
    }
    let mut buf = [0u8; FILENAME_LEN];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    Ok(buf)
}

impl RootDirectory {
    /// Reads the single root block at `root_index`.
    pub fn load(device: &mut dyn BlockDevice, root_index: usize) -> FsResult<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(root_index, &mut buf)?;
        let raw: [RawEntry; FILE_MAX_COUNT] = bytemuck::pod_read_unaligned(&buf);

        let mut entries = [Entry::empty(); FILE_MAX_COUNT];
        for (dst, src) in entries.iter_mut().zip(raw.iter()) {
            dst.filename = src.filename;
            dst.size = src.file_size;
            dst.first_block = src.first_block;
        }

        Ok(Self { entries, root_index })
    }

    /// Writes the whole root block back, in slot order.
    pub fn flush(&self, device: &mut dyn BlockDevice) -> FsResult<()> {
        let mut raw = [RawEntry::zeroed(); FILE_MAX_COUNT];
        for (dst, src) in raw.iter_mut().zip(self.entries.iter()) {
            dst.filename = src.filename;
            dst.file_size = src.size;
            dst.first_block = if src.is_empty() { EOC } else { src.first_block };
        }
        let mut buf = [0u8; BLOCK_SIZE];
        buf.copy_from_slice(bytemuck::bytes_of(&raw));
        device.write_block(self.root_index, &buf)
    }

    /// Finds the slot holding `name`, if any.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| !e.is_empty() && e.name_str() == name)
    }

    pub fn entry(&self, slot: usize) -> &Entry {
        &self.entries[slot]
    }

    fn entry_mut(&mut self, slot: usize) -> &mut Entry {
        &mut self.entries[slot]
    }

    /// Installs a new, empty entry for `name` into the first free slot.
    pub fn create(&mut self, device: &mut dyn BlockDevice, name: &str) -> FsResult<()> {
        let encoded = encode_name(name)?;
        if self.lookup(name).is_some() {
            return Err(FsError::Exists);
        }
        let slot = self
            .entries
            .iter()
            .position(|e| e.is_empty())
            .ok_or(FsError::Full)?;

        self.entries[slot] = Entry {
            filename: encoded,
            size: 0,
            first_block: EOC,
        };
        self.flush(device)?;
        log::debug!("created file {name:?} in slot {slot}");
        Ok(())
    }

    /// Clears the slot holding `name`, returning its former first-block
    /// index so the caller can free the FAT chain. `name` must not be open.
    pub fn delete(&mut self, device: &mut dyn BlockDevice, name: &str) -> FsResult<u16> {
        let slot = self.lookup(name).ok_or(FsError::NoSuchFile)?;
        let first_block = self.entries[slot].first_block;
        self.entries[slot] = Entry::empty();
        self.flush(device)?;
        log::debug!("deleted file {name:?} from slot {slot}");
        Ok(first_block)
    }

    /// Updates the size and first-block of `name`'s entry and writes the
    /// root block back through immediately.
    pub fn update(
        &mut self,
        device: &mut dyn BlockDevice,
        name: &str,
        size: u32,
        first_block: u16,
    ) -> FsResult<()> {
        let slot = self.lookup(name).ok_or(FsError::NoSuchFile)?;
        let entry = self.entry_mut(slot);
        entry.size = size;
        entry.first_block = first_block;
        self.flush(device)
    }

    /// Non-empty entries in slot order, for `ls`.
    pub fn list(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(|e| !e.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::MemBlockDevice;

    fn fresh_root() -> (RootDirectory, MemBlockDevice) {
        let mut dev = MemBlockDevice::new(2);
        let root = RootDirectory::load(&mut dev, 1).unwrap();
        (root, dev)
    }

    #[test]
    fn create_then_lookup() {
        let (mut root, mut dev) = fresh_root();
        root.create(&mut dev, "hello.txt").unwrap();
        let slot = root.lookup("hello.txt").unwrap();
        assert_eq!(root.entry(slot).size, 0);
        assert_eq!(root.entry(slot).first_block, EOC);
    }

    #[test]
    fn rejects_duplicate_create() {
        let (mut root, mut dev) = fresh_root();
        root.create(&mut dev, "a").unwrap();
        assert!(matches!(root.create(&mut dev, "a"), Err(FsError::Exists)));
    }

    #[test]
    fn boundary_name_lengths() {
        let (mut root, mut dev) = fresh_root();
        assert!(root.create(&mut dev, "abcdefghijklmno").is_ok());
        assert!(matches!(
            root.create(&mut dev, "abcdefghijklmnop"),
            Err(FsError::InvalidName)
        ));
    }

    #[test]
    fn full_root_rejects_extra_create() {
        let (mut root, mut dev) = fresh_root();
        for i in 0..FILE_MAX_COUNT {
            root.create(&mut dev, &format!("f{i}")).unwrap();
        }
        assert!(matches!(
            root.create(&mut dev, "overflow"),
            Err(FsError::Full)
        ));
    }

    #[test]
    fn create_delete_round_trips_bytes() {
        let (mut root, mut dev) = fresh_root();
        let mut before = [0u8; BLOCK_SIZE];
        dev.read_block(1, &mut before).unwrap();

        root.create(&mut dev, "tmp").unwrap();
        root.delete(&mut dev, "tmp").unwrap();

        let mut after = [0u8; BLOCK_SIZE];
        dev.read_block(1, &mut after).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn delete_missing_file_fails() {
        let (mut root, mut dev) = fresh_root();
        assert!(matches!(
            root.delete(&mut dev, "ghost"),
            Err(FsError::NoSuchFile)
        ));
    }
}
