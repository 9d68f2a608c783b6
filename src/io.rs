//! The read/write path: block-offset arithmetic, FAT chain walking, lazy
//! block allocation on write, and the bounce buffer that bridges
//! byte-granular requests to whole-block device transfers.

use crate::block::{BlockDevice, BLOCK_SIZE};
use crate::dir::RootDirectory;
use crate::error::{FsError, FsResult};
use crate::fat::{Fat, EOC};

/// Walks `logical` nodes forward from `head` along the FAT chain, returning
/// the physical chain index reached. `logical == 0` returns `head`
/// unchanged. Offsets that land exactly on a block boundary address the
/// next block, never the tail of the previous one.
fn walk(fat: &Fat, head: u16, logical: usize) -> u16 {
    let mut cur = head;
    for _ in 0..logical {
        cur = fat.next(cur);
    }
    cur
}

/// Reads up to `count` bytes from `buf` of the file starting at `offset`
/// and extending for `size` bytes on the chain rooted at `first_block`.
///
/// Returns the number of bytes actually copied.
pub fn read_chain(
    device: &mut dyn BlockDevice,
    fat: &Fat,
    data_start: usize,
    first_block: u16,
    size: usize,
    offset: usize,
    buf: &mut [u8],
) -> FsResult<usize> {
    if buf.is_empty() || size == 0 || offset >= size {
        return Ok(0);
    }
    let n_readable = std::cmp::min(buf.len(), size - offset);
    if n_readable == 0 {
        return Ok(0);
    }

    let mut bounce = [0u8; BLOCK_SIZE];
    let mut logical = offset / BLOCK_SIZE;
    let mut chain_idx = walk(fat, first_block, logical);
    device.read_block(data_start + chain_idx as usize, &mut bounce)?;

    let mut copied = 0;
    let mut pos = offset;
    while copied < n_readable {
        let block_off = pos % BLOCK_SIZE;
        if block_off == 0 && copied > 0 {
            logical += 1;
            chain_idx = fat.next(chain_idx);
            device.read_block(data_start + chain_idx as usize, &mut bounce)?;
        }
        let take = std::cmp::min(BLOCK_SIZE - block_off, n_readable - copied);
        buf[copied..copied + take].copy_from_slice(&bounce[block_off..block_off + take]);
        copied += take;
        pos += take;
    }

    Ok(copied)
}

/// Outcome of a write: bytes transferred, and the file's new size/first
/// block (the caller persists these into the root entry).
pub struct WriteOutcome {
    pub bytes_written: usize,
    pub new_size: u32,
    pub new_first_block: u16,
}

/// Writes `buf` into the file's chain starting at `offset`, allocating new
/// blocks as needed. `first_block` is `EOC` for an empty file.
///
/// Every block touched is persisted before this function returns (no
/// buffering across calls); if an allocation fails partway through, the
/// bytes already committed are returned and the chain built so far stays
/// linked.
pub fn write_chain(
    device: &mut dyn BlockDevice,
    fat: &mut Fat,
    data_start: usize,
    mut first_block: u16,
    mut size: u32,
    offset: usize,
    buf: &[u8],
) -> FsResult<WriteOutcome> {
    if buf.is_empty() {
        return Ok(WriteOutcome {
            bytes_written: 0,
            new_size: size,
            new_first_block: first_block,
        });
    }

    if first_block == EOC {
        match fat.allocate_free() {
            Ok(b) => first_block = b,
            Err(FsError::NoSpace) => {
                return Ok(WriteOutcome {
                    bytes_written: 0,
                    new_size: size,
                    new_first_block: first_block,
                })
            }
            Err(e) => return Err(e),
        }
    }

    let logical_target = offset / BLOCK_SIZE;
    let mut logical = 0usize;
    let mut chain_idx = first_block;
    while logical < logical_target {
        let next = fat.next(chain_idx);
        if next == EOC {
            let new_block = match fat.allocate_free() {
                Ok(b) => b,
                Err(FsError::NoSpace) => {
                    return Ok(WriteOutcome {
                        bytes_written: 0,
                        new_size: size,
                        new_first_block: first_block,
                    })
                }
                Err(e) => return Err(e),
            };
            fat.link(chain_idx, new_block);
            chain_idx = new_block;
        } else {
            chain_idx = next;
        }
        logical += 1;
    }

    let mut bounce = [0u8; BLOCK_SIZE];
    device.read_block(data_start + chain_idx as usize, &mut bounce)?;

    let mut written = 0;
    let mut pos = offset;
    while written < buf.len() {
        let block_off = pos % BLOCK_SIZE;
        if block_off == 0 && written > 0 {
            // The previous block is fully staged; persist it before
            // advancing, so bytes already counted in `written` are durable
            // even if the next allocation below fails.
            device.write_block(data_start + chain_idx as usize, &bounce)?;
            let next = fat.next(chain_idx);
            let next = if next == EOC {
                match fat.allocate_free() {
                    Ok(b) => {
                        fat.link(chain_idx, b);
                        b
                    }
                    Err(FsError::NoSpace) => break,
                    Err(e) => return Err(e),
                }
            } else {
                next
            };
            chain_idx = next;
            device.read_block(data_start + chain_idx as usize, &mut bounce)?;
        }

        let take = std::cmp::min(BLOCK_SIZE - block_off, buf.len() - written);
        bounce[block_off..block_off + take].copy_from_slice(&buf[written..written + take]);
        written += take;
        pos += take;
        if pos as u64 > size as u64 {
            size = pos as u32;
        }
    }
    device.write_block(data_start + chain_idx as usize, &bounce)?;

    Ok(WriteOutcome {
        bytes_written: written,
        new_size: size,
        new_first_block: first_block,
    })
}

/// Total non-empty root-directory accounting used by `info`/`ls`; kept here
/// since it walks the same data as the I/O path.
pub fn root_free_ratio(root: &RootDirectory, capacity: usize) -> (usize, usize) {
    let used = root.list().count();
    (capacity - used, capacity)
}
