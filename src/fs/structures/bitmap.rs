//! In-memory block allocator.
//!
//! Unlike ext2's per-block-group, byte-packed free-block bitmaps, this format is a single flat
//! device, so [`Bitmap`] keeps one `bool` per block rather than bit-packing — there is no on-disk
//! bitmap to mirror, the whole structure is reconstructed at [`mount`](crate::fs::session::Session::mount)
//! time by walking every inode's pointer graph (see [`Bitmap::reconstruct`]).

use log::{trace, warn};

use crate::fs::error::FsError;
use crate::fs::layout::INODES_PER_BLOCK;

/// First-fit, in-memory block allocator.
#[derive(Debug)]
pub struct Bitmap {
    /// `used[i]` is `true` if block `i` is currently allocated.
    used: Vec<bool>,

    /// First block of the data pool (`num_inode_blocks + 1`).
    first_data_block: u32,
}

impl Bitmap {
    /// Creates a new [`Bitmap`] with every block initially free, for a device with `num_blocks`
    /// blocks and `first_data_block` as the first block available for allocation.
    #[must_use]
    pub fn new(num_blocks: u32, first_data_block: u32) -> Self {
        Self { used: vec![false; num_blocks as usize], first_data_block }
    }

    /// Scans `[first_data_block, num_blocks)` ascending and returns the first free block, marking it
    /// used. Deterministic first-fit.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::OutOfSpace`] if every block is in use.
    pub fn find_free(&mut self) -> Result<u32, FsError> {
        for i in self.first_data_block as usize..self.used.len() {
            if !self.used[i] {
                self.used[i] = true;
                #[allow(clippy::cast_possible_truncation)]
                let block = i as u32;
                trace!("allocated block {block}");
                return Ok(block);
            }
        }
        Err(FsError::OutOfSpace)
    }

    /// Marks `block_num` free again. A no-op for block `0` or blocks outside the device (matching the
    /// original's best-effort `free_block`, which never errors).
    pub fn release(&mut self, block_num: u32) {
        if block_num > 0 && (block_num as usize) < self.used.len() {
            self.used[block_num as usize] = false;
            trace!("released block {block_num}");
        } else {
            warn!("attempted to release out-of-range block {block_num}");
        }
    }

    /// Marks `block_num` used. Idempotent; used only while reconstructing the bitmap at mount time.
    fn mark(&mut self, block_num: u32) {
        if (block_num as usize) < self.used.len() {
            self.used[block_num as usize] = true;
        }
    }

    /// Returns whether `block_num` is currently marked used.
    #[must_use]
    pub fn is_used(&self, block_num: u32) -> bool {
        self.used.get(block_num as usize).copied().unwrap_or(false)
    }

    /// Reconstructs the bitmap from scratch: marks the superblock and every inode block used, then
    /// walks every valid inode's pointer graph, marking every block it reaches.
    ///
    /// This is the sole source of truth for which blocks are in use across a mount/unmount cycle: the
    /// format never persists a bitmap, it is always rebuilt by this scan.
    ///
    /// # Errors
    ///
    /// Propagates any device error encountered while reading an inode block or a referenced
    /// indirection page.
    pub fn reconstruct<D: crate::dev::BlockDevice>(
        device: &mut D,
        num_blocks: u32,
        num_inode_blocks: u32,
    ) -> Result<Self, crate::error::Error> {
        let mut bitmap = Self::new(num_blocks, num_inode_blocks + 1);
        for i in 0..=num_inode_blocks {
            bitmap.mark(i);
        }

        let inode_table = crate::fs::inode_table::InodeTable::new(num_inode_blocks);
        for index in 0..num_inode_blocks * INODES_PER_BLOCK {
            let inode = inode_table.read_inode(device, index)?;
            if !inode.valid {
                continue;
            }

            for &block in &inode.direct_blocks {
                if block != 0 {
                    bitmap.mark(block);
                }
            }

            if inode.indirect_block != 0 {
                bitmap.mark(inode.indirect_block);
                mark_pointer_page(device, &mut bitmap, inode.indirect_block)?;
            }

            if inode.double_indirect_block != 0 {
                bitmap.mark(inode.double_indirect_block);
                let mut page = [0_u8; crate::fs::layout::BLOCK_SIZE as usize];
                device.read_block(inode.double_indirect_block, &mut page)?;
                for pointer in crate::fs::layout::decode_pointer_page(&page) {
                    if pointer != 0 {
                        bitmap.mark(pointer);
                        mark_pointer_page(device, &mut bitmap, pointer)?;
                    }
                }
            }
        }

        trace!("bitmap reconstructed: {} blocks used of {num_blocks}", bitmap.used.iter().filter(|&&b| b).count());
        Ok(bitmap)
    }
}

/// Reads the indirection page at `page_block` and marks every non-zero entry used in `bitmap`.
fn mark_pointer_page<D: crate::dev::BlockDevice>(
    device: &mut D,
    bitmap: &mut Bitmap,
    page_block: u32,
) -> Result<(), crate::error::Error> {
    let mut page = [0_u8; crate::fs::layout::BLOCK_SIZE as usize];
    device.read_block(page_block, &mut page)?;
    for pointer in crate::fs::layout::decode_pointer_page(&page) {
        if pointer != 0 {
            bitmap.mark(pointer);
        }
    }
    Ok(())
}
