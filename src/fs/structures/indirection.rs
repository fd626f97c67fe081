//! The block-map engine: translates a logical file offset into a physical block number, allocating
//! and persisting indirection pages on demand.
//!
//! This mirrors, in spirit, the teacher crate's `IndirectedBlocks` resolution of ext2's (12 direct +
//! single + double + triple) pointer tree, narrowed to this format's two levels of indirection and
//! extended with the allocate-and-write-back behaviour ext2's read-only resolver doesn't need.

use log::{trace, warn};

use crate::dev::BlockDevice;
use crate::fs::error::FsError;
use crate::fs::layout::{decode_pointer_page, encode_pointer_page, Inode, BLOCK_SIZE, DIRECT_POINTERS, POINTERS_PER_BLOCK};
use crate::fs::structures::bitmap::Bitmap;

/// Which region of the block map a logical block index falls into.
enum Region {
    /// One of the four direct slots.
    Direct(usize),

    /// The single-indirect page, at entry `index`.
    Single(usize),

    /// The double-indirect page: indirect page `outer`, entry `inner` within it.
    Double(usize, usize),
}

/// Classifies logical block index `block_index` into the region of the block map it falls in.
///
/// Returns `None` if `block_index` exceeds the addressable range (`MAX_FILE_SIZE` worth of blocks).
fn classify(block_index: u64) -> Option<Region> {
    let direct = u64::from(DIRECT_POINTERS);
    let per_block = u64::from(POINTERS_PER_BLOCK);

    if block_index < direct {
        #[allow(clippy::cast_possible_truncation)]
        return Some(Region::Direct(block_index as usize));
    }

    let single_index = block_index - direct;
    if single_index < per_block {
        #[allow(clippy::cast_possible_truncation)]
        return Some(Region::Single(single_index as usize));
    }

    let double_index = single_index - per_block;
    if double_index < per_block * per_block {
        #[allow(clippy::cast_possible_truncation)]
        let outer = (double_index / per_block) as usize;
        #[allow(clippy::cast_possible_truncation)]
        let inner = (double_index % per_block) as usize;
        return Some(Region::Double(outer, inner));
    }

    None
}

/// Allocates a fresh block, zeroes it on disk, and returns its number.
///
/// On a device error while zeroing, the just-allocated block is released from `bitmap` (best-effort:
/// if the zero-write itself failed, the block may be stranded on disk until the next mount's bitmap
/// reconstruction).
fn allocate_zeroed<D: BlockDevice>(device: &mut D, bitmap: &mut Bitmap) -> Result<u32, crate::error::Error> {
    let block = bitmap.find_free()?;
    let zeros = [0_u8; BLOCK_SIZE as usize];
    if let Err(err) = device.write_block(block, &zeros) {
        warn!("zeroing newly allocated block {block} failed, releasing it: {err}");
        bitmap.release(block);
        return Err(err.into());
    }
    trace!("zeroed newly allocated block {block}");
    Ok(block)
}

/// Reads the indirection page at `page_block`, decoded into its `POINTERS_PER_BLOCK` entries.
fn read_page<D: BlockDevice>(device: &mut D, page_block: u32) -> Result<Vec<u32>, crate::error::Error> {
    let mut block = [0_u8; BLOCK_SIZE as usize];
    device.read_block(page_block, &mut block)?;
    Ok(decode_pointer_page(&block))
}

/// Writes `pointers` back to the indirection page at `page_block`.
fn write_page<D: BlockDevice>(device: &mut D, page_block: u32, pointers: &[u32]) -> Result<(), crate::error::Error> {
    let block = encode_pointer_page(pointers);
    device.write_block(page_block, &block)?;
    Ok(())
}

/// Writes `pointers` back to the indirection page at `page_block`, releasing `new_block` from
/// `bitmap` first if the write-back fails — `new_block` was just allocated and linked into
/// `pointers` to be persisted by this very write, so on failure it is unreachable from any inode
/// and must not be left marked used for the rest of the mount session.
fn write_page_linking<D: BlockDevice>(
    device: &mut D,
    bitmap: &mut Bitmap,
    page_block: u32,
    pointers: &[u32],
    new_block: u32,
) -> Result<(), crate::error::Error> {
    if let Err(err) = write_page(device, page_block, pointers) {
        warn!("linking newly allocated block {new_block} into page {page_block} failed, releasing it: {err}");
        bitmap.release(new_block);
        return Err(err);
    }
    Ok(())
}

/// Returns the physical block backing byte offset `file_offset` of `inode`, allocating and persisting
/// indirection/data pages along the way if `allocate` is `true`.
///
/// Returns `Ok(0)` to signal "no mapping, and not allocating" (a hole). The caller is responsible for
/// persisting `inode` afterwards (this function only mutates the in-memory copy's direct/indirect
/// pointers; indirect and double-indirect *pages* are written back to disk immediately, since they
/// aren't owned by the caller the way the inode itself is).
///
/// # Errors
///
/// Returns [`FsError::InvalidOffset`] if `file_offset` exceeds the addressable range of the block map,
/// [`FsError::OutOfSpace`] if allocation is requested and no free block remains, or a device error if
/// reading/writing a block fails.
pub fn block_for_offset<D: BlockDevice>(
    device: &mut D,
    bitmap: &mut Bitmap,
    inode: &mut Inode,
    file_offset: u64,
    allocate: bool,
) -> Result<u32, crate::error::Error> {
    let block_index = file_offset / u64::from(BLOCK_SIZE);
    let region = classify(block_index).ok_or(crate::error::Error::Fs(FsError::InvalidOffset))?;

    match region {
        Region::Direct(i) => {
            if inode.direct_blocks[i] == 0 && allocate {
                inode.direct_blocks[i] = allocate_zeroed(device, bitmap)?;
            }
            Ok(inode.direct_blocks[i])
        }
        Region::Single(i) => {
            if inode.indirect_block == 0 {
                if !allocate {
                    return Ok(0);
                }
                inode.indirect_block = allocate_zeroed(device, bitmap)?;
            }

            let mut pointers = read_page(device, inode.indirect_block)?;
            if pointers[i] == 0 && allocate {
                let new_block = allocate_zeroed(device, bitmap)?;
                pointers[i] = new_block;
                write_page_linking(device, bitmap, inode.indirect_block, &pointers, new_block)?;
            }
            Ok(pointers[i])
        }
        Region::Double(outer, inner) => {
            if inode.double_indirect_block == 0 {
                if !allocate {
                    return Ok(0);
                }
                inode.double_indirect_block = allocate_zeroed(device, bitmap)?;
            }

            let mut outer_pointers = read_page(device, inode.double_indirect_block)?;
            if outer_pointers[outer] == 0 {
                if !allocate {
                    return Ok(0);
                }
                let new_indirect = allocate_zeroed(device, bitmap)?;
                outer_pointers[outer] = new_indirect;
                write_page_linking(device, bitmap, inode.double_indirect_block, &outer_pointers, new_indirect)?;
            }

            let indirect_block = outer_pointers[outer];
            let mut inner_pointers = read_page(device, indirect_block)?;
            if inner_pointers[inner] == 0 && allocate {
                let new_block = allocate_zeroed(device, bitmap)?;
                inner_pointers[inner] = new_block;
                write_page_linking(device, bitmap, indirect_block, &inner_pointers, new_block)?;
            }
            Ok(inner_pointers[inner])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::MemBlockDevice;

    fn fresh(num_blocks: u32, first_data_block: u32) -> (MemBlockDevice, Bitmap) {
        (MemBlockDevice::new(num_blocks), Bitmap::new(num_blocks, first_data_block))
    }

    #[test]
    fn direct_allocation_is_lazy_and_deterministic() {
        let (mut device, mut bitmap) = fresh(100, 2);
        let mut inode = Inode::empty();

        assert_eq!(block_for_offset(&mut device, &mut bitmap, &mut inode, 0, false).unwrap(), 0);
        let block = block_for_offset(&mut device, &mut bitmap, &mut inode, 0, true).unwrap();
        assert_eq!(block, 2);
        assert_eq!(inode.direct_blocks[0], 2);

        // Re-reading the same offset returns the same block without reallocating.
        assert_eq!(block_for_offset(&mut device, &mut bitmap, &mut inode, 500, true).unwrap(), 2);
    }

    #[test]
    fn single_indirect_allocates_page_then_entry() {
        let (mut device, mut bitmap) = fresh(300, 2);
        let mut inode = Inode::empty();

        // Offset in block index 4 (first single-indirect slot).
        let offset = u64::from(BLOCK_SIZE) * 4;
        let block = block_for_offset(&mut device, &mut bitmap, &mut inode, offset, true).unwrap();
        assert_ne!(block, 0);
        assert_ne!(inode.indirect_block, 0);
        assert_ne!(inode.indirect_block, block);
    }

    #[test]
    fn double_indirect_out_of_range_offset_errors() {
        let (mut device, mut bitmap) = fresh(10, 2);
        let mut inode = Inode::empty();
        let too_far = crate::fs::layout::MAX_FILE_SIZE;
        let result = block_for_offset(&mut device, &mut bitmap, &mut inode, too_far, true);
        assert!(matches!(result, Err(crate::error::Error::Fs(FsError::InvalidOffset))));
    }

    #[test]
    fn out_of_space_when_no_free_block() {
        let (mut device, mut bitmap) = fresh(3, 3); // no data blocks at all
        let mut inode = Inode::empty();
        let result = block_for_offset(&mut device, &mut bitmap, &mut inode, 0, true);
        assert!(matches!(result, Err(crate::error::Error::Fs(FsError::OutOfSpace))));
    }
}
