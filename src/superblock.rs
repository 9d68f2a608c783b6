//! The on-disk superblock: geometry of the filesystem, cached in memory for
//! the lifetime of a mount.

use bytemuck::{Pod, Zeroable};

use crate::block::{BlockDevice, BLOCK_SIZE};
use crate::error::{FsError, FsResult};

/// Signature every valid image must carry in its first 8 bytes.
pub const SIGNATURE: [u8; 8] = *b"ECS150FS";

/// Bit-exact, byte-addressable layout of block 0.
///
/// Padding brings the struct up to [`BLOCK_SIZE`] so a single `read_block`
/// call fills it directly; [`Pod`]/[`Zeroable`] let us do that with a plain
/// byte-level cast instead of relying on any particular struct layout.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct RawSuperblock {
    pub signature: [u8; 8],
    pub total_blocks: u16,
    pub root_index: u16,
    pub data_start: u16,
    pub data_blocks: u16,
    pub fat_blocks: u8,
    pub padding: [u8; 4079],
}

const _: () = assert!(std::mem::size_of::<RawSuperblock>() == BLOCK_SIZE);

/// Parsed and validated superblock, cached for the lifetime of a mount.
#[derive(Clone, Copy, Debug)]
pub struct Superblock {
    pub total_blocks: u16,
    pub root_index: u16,
    pub data_start: u16,
    pub data_blocks: u16,
    pub fat_blocks: u8,
}

impl Superblock {
    /// Reads block 0 from `device` and validates every invariant in one
    /// pass. Any violation is reported as [`FsError::MountFailure`] and the
    /// caller is expected to release the device.
    pub fn load(device: &mut dyn BlockDevice) -> FsResult<Self> {
        let mut buf = [0u8; BLOCK_SIZE];
        device.read_block(0, &mut buf)?;
        let raw: RawSuperblock = bytemuck::pod_read_unaligned(&buf);

        if raw.signature != SIGNATURE {
            return Err(FsError::MountFailure("bad signature"));
        }

        let total_blocks = raw.total_blocks;
        let root_index = raw.root_index;
        let data_start = raw.data_start;
        let data_blocks = raw.data_blocks;
        let fat_blocks = raw.fat_blocks;

        let expected_total = 1u32 + fat_blocks as u32 + 1 + data_blocks as u32;
        if expected_total != total_blocks as u32 {
            return Err(FsError::MountFailure(
                "1 + fat_blocks + 1 + data_blocks != total_blocks",
            ));
        }
        if root_index != 1 + fat_blocks as u16 {
            return Err(FsError::MountFailure("root_index != 1 + fat_blocks"));
        }
        if data_start != root_index + 1 {
            return Err(FsError::MountFailure("data_start != root_index + 1"));
        }
        if total_blocks as usize != device.block_count() {
            return Err(FsError::MountFailure(
                "total_blocks does not match the block device's reported count",
            ));
        }

        log::debug!(
            "superblock: total={total_blocks} fat_blocks={fat_blocks} root={root_index} \
             data_start={data_start} data_blocks={data_blocks}"
        );

        Ok(Self {
            total_blocks,
            root_index,
            data_start,
            data_blocks,
            fat_blocks,
        })
    }

    /// Serializes this superblock back into its canonical 4096-byte form
    /// and writes it to block 0. The contents never change at runtime; this
    /// keeps the mount/unmount protocol symmetric.
    pub fn flush(&self, device: &mut dyn BlockDevice) -> FsResult<()> {
        let raw = RawSuperblock {
            signature: SIGNATURE,
            total_blocks: self.total_blocks,
            root_index: self.root_index,
            data_start: self.data_start,
            data_blocks: self.data_blocks,
            fat_blocks: self.fat_blocks,
            padding: [0u8; 4079],
        };
        let bytes = bytemuck::bytes_of(&raw);
        let mut buf = [0u8; BLOCK_SIZE];
        buf.copy_from_slice(bytes);
        device.write_block(0, &buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::test_support::MemBlockDevice;

    fn valid_image(data_blocks: u16, fat_blocks: u8) -> MemBlockDevice {
        let total = 1 + fat_blocks as u16 + 1 + data_blocks;
        let mut dev = MemBlockDevice::new(total as usize);
        let raw = RawSuperblock {
            signature: SIGNATURE,
            total_blocks: total,
            root_index: 1 + fat_blocks as u16,
            data_start: 2 + fat_blocks as u16,
            data_blocks,
            fat_blocks,
            padding: [0u8; 4079],
        };
        let mut buf = [0u8; BLOCK_SIZE];
        buf.copy_from_slice(bytemuck::bytes_of(&raw));
        dev.write_block(0, &buf).unwrap();
        dev
    }

    #[test]
    fn loads_valid_superblock() {
        let mut dev = valid_image(10, 1);
        let sb = Superblock::load(&mut dev).unwrap();
        assert_eq!(sb.total_blocks, 12);
        assert_eq!(sb.root_index, 1);
        assert_eq!(sb.data_start, 2);
        assert_eq!(sb.data_blocks, 10);
    }

    #[test]
    fn rejects_bad_signature() {
        let mut dev = valid_image(10, 1);
        let mut buf = [0u8; BLOCK_SIZE];
        dev.read_block(0, &mut buf).unwrap();
        buf[0] = b'X';
        dev.write_block(0, &buf).unwrap();
        assert!(matches!(
            Superblock::load(&mut dev),
            Err(FsError::MountFailure(_))
        ));
    }

    #[test]
    fn rejects_geometry_mismatch() {
        let mut dev = valid_image(10, 1);
        let mut buf = [0u8; BLOCK_SIZE];
        dev.read_block(0, &mut buf).unwrap();
        let mut raw: RawSuperblock = bytemuck::pod_read_unaligned(&buf);
        raw.total_blocks += 1;
        buf.copy_from_slice(bytemuck::bytes_of(&raw));
        dev.write_block(0, &buf).unwrap();
        assert!(matches!(
            Superblock::load(&mut dev),
            Err(FsError::MountFailure(_))
        ));
    }

    #[test]
    fn flush_round_trips() {
        let mut dev = valid_image(10, 1);
        let sb = Superblock::load(&mut dev).unwrap();
        sb.flush(&mut dev).unwrap();
        let sb2 = Superblock::load(&mut dev).unwrap();
        assert_eq!(sb.total_blocks, sb2.total_blocks);
        assert_eq!(sb.root_index, sb2.root_index);
    }
}
