//! Accessor for reading and writing individual inodes on the inode table.

use crate::dev::BlockDevice;
use crate::error::Error;
use crate::fs::error::FsError;
use crate::fs::layout::{Inode, BLOCK_SIZE, INODES_PER_BLOCK, INODE_SIZE};

/// Addresses and serializes individual [`Inode`]s within the inode table.
///
/// Grounded in the teacher crate's ext2 inode addressing (`block = table start + index /
/// per-block`, `offset = index % per-block * record size`), narrowed from ext2's per-block-group
/// table to this format's single flat table starting right after the superblock.
#[derive(Debug, Clone, Copy)]
pub struct InodeTable {
    /// Number of inode blocks in the table.
    num_inode_blocks: u32,
}

impl InodeTable {
    /// Creates an accessor for a table of `num_inode_blocks` inode blocks.
    #[must_use]
    pub const fn new(num_inode_blocks: u32) -> Self {
        Self { num_inode_blocks }
    }

    /// Total number of inodes addressable in this table.
    #[must_use]
    pub const fn inode_count(&self) -> u32 {
        self.num_inode_blocks * INODES_PER_BLOCK
    }

    /// Returns the `(block, offset)` address of inode `index` within the table.
    fn address(&self, index: u32) -> (u32, usize) {
        let block = 1 + index / INODES_PER_BLOCK;
        #[allow(clippy::cast_possible_truncation)]
        let offset = (index % INODES_PER_BLOCK) as usize * INODE_SIZE as usize;
        (block, offset)
    }

    /// Reads inode `index` from `device`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidInode`] if `index` is out of range, or a device error if the inode
    /// block cannot be read.
    pub fn read_inode<D: BlockDevice>(&self, device: &mut D, index: u32) -> Result<Inode, Error> {
        if index >= self.inode_count() {
            return Err(Error::Fs(FsError::InvalidInode));
        }
        let (block, offset) = self.address(index);
        let mut buf = [0_u8; BLOCK_SIZE as usize];
        device.read_block(block, &mut buf)?;
        let mut record = [0_u8; INODE_SIZE as usize];
        record.copy_from_slice(&buf[offset..offset + INODE_SIZE as usize]);
        Ok(Inode::decode(&record))
    }

    /// Writes `inode` at index `index`, read-modify-writing its block so neighbouring inodes are
    /// preserved.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidInode`] if `index` is out of range, or a device error if the block
    /// cannot be read or written.
    pub fn write_inode<D: BlockDevice>(&self, device: &mut D, index: u32, inode: &Inode) -> Result<(), Error> {
        if index >= self.inode_count() {
            return Err(Error::Fs(FsError::InvalidInode));
        }
        let (block, offset) = self.address(index);
        let mut buf = [0_u8; BLOCK_SIZE as usize];
        device.read_block(block, &mut buf)?;
        buf[offset..offset + INODE_SIZE as usize].copy_from_slice(&inode.encode());
        device.write_block(block, &buf)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dev::MemBlockDevice;

    #[test]
    fn read_write_round_trip_preserves_neighbours() {
        let mut device = MemBlockDevice::new(10);
        let table = InodeTable::new(1);

        let mut inode_a = Inode::empty();
        inode_a.valid = true;
        inode_a.size = 42;
        table.write_inode(&mut device, 0, &inode_a).unwrap();

        let mut inode_b = Inode::empty();
        inode_b.valid = true;
        inode_b.size = 7;
        table.write_inode(&mut device, 1, &inode_b).unwrap();

        let read_back_a = table.read_inode(&mut device, 0).unwrap();
        let read_back_b = table.read_inode(&mut device, 1).unwrap();
        assert_eq!(read_back_a.size, 42);
        assert_eq!(read_back_b.size, 7);
    }

    #[test]
    fn out_of_range_index_is_invalid() {
        let mut device = MemBlockDevice::new(10);
        let table = InodeTable::new(1);
        let result = table.read_inode(&mut device, table.inode_count());
        assert!(matches!(result, Err(Error::Fs(FsError::InvalidInode))));
    }
}
