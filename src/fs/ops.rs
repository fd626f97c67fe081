//! File operations: `create`, `delete`, `stat`, `read`, `write`, layered on the inode table and the
//! block-map engine.

use log::{debug, trace};

use crate::dev::BlockDevice;
use crate::error::Error;
use crate::fs::error::FsError;
use crate::fs::layout::{Inode, BLOCK_SIZE};
use crate::fs::session::Session;
use crate::fs::structures::indirection::block_for_offset;

impl<D: BlockDevice> Session<D> {
    /// Creates a new, empty file and returns its inode index.
    ///
    /// Scans inode indices ascending and returns the first free one, after writing it back with
    /// `valid = true`, `size = 0`, and every pointer cleared. Deterministic: the smallest free index
    /// always wins, so indices are recycled rather than growing monotonically forever.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::OutOfInodes`] if every inode is allocated, or a device error.
    pub fn create(&mut self) -> Result<u32, Error> {
        for index in 0..self.inode_table.inode_count() {
            let inode = self.inode_table.read_inode(&mut self.device, index)?;
            if !inode.valid {
                let mut fresh = Inode::empty();
                fresh.valid = true;
                self.inode_table.write_inode(&mut self.device, index, &fresh)?;
                debug!("created inode {index}");
                return Ok(index);
            }
        }
        Err(Error::Fs(FsError::OutOfInodes))
    }

    /// Deletes the file at inode `index`, releasing every block it references.
    ///
    /// Walks the block map and releases, in order: the direct blocks, the indirect page's entries
    /// then the indirect page itself, and each double-indirect entry's entries and page then the
    /// double-indirect page itself. A device error partway through aborts immediately; any blocks
    /// already released stay released, and the inode is left `valid` — the next mount's
    /// reconstruction only rediscovers what's still reachable from the (possibly partially cleared)
    /// on-disk pointers, so blocks already unlinked on disk before the failure can end up orphaned.
    /// This mirrors the original implementation's accepted trade-off.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidInode`] if `index` is out of range or already free, or a device error.
    pub fn delete(&mut self, index: u32) -> Result<(), Error> {
        let mut inode = self.inode_table.read_inode(&mut self.device, index)?;
        if !inode.valid {
            return Err(Error::Fs(FsError::InvalidInode));
        }

        for block in inode.direct_blocks {
            if block != 0 {
                self.bitmap.release(block);
            }
        }
        inode.direct_blocks = [0; 4];

        if inode.indirect_block != 0 {
            self.release_pointer_page(inode.indirect_block)?;
            inode.indirect_block = 0;
        }

        if inode.double_indirect_block != 0 {
            let mut page = [0_u8; BLOCK_SIZE as usize];
            self.device.read_block(inode.double_indirect_block, &mut page)?;
            for pointer in crate::fs::layout::decode_pointer_page(&page) {
                if pointer != 0 {
                    self.release_pointer_page(pointer)?;
                }
            }
            self.bitmap.release(inode.double_indirect_block);
            inode.double_indirect_block = 0;
        }

        inode.valid = false;
        inode.size = 0;
        self.inode_table.write_inode(&mut self.device, index, &inode)?;
        debug!("deleted inode {index}");
        Ok(())
    }

    /// Releases every non-zero entry of the indirection page at `page_block`, then the page itself.
    fn release_pointer_page(&mut self, page_block: u32) -> Result<(), Error> {
        let mut page = [0_u8; BLOCK_SIZE as usize];
        self.device.read_block(page_block, &mut page)?;
        for pointer in crate::fs::layout::decode_pointer_page(&page) {
            if pointer != 0 {
                self.bitmap.release(pointer);
            }
        }
        self.bitmap.release(page_block);
        Ok(())
    }

    /// Returns the size in bytes of the file at inode `index`.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidInode`] if `index` is out of range or free, or a device error.
    pub fn stat(&mut self, index: u32) -> Result<u32, Error> {
        let inode = self.inode_table.read_inode(&mut self.device, index)?;
        if !inode.valid {
            return Err(Error::Fs(FsError::InvalidInode));
        }
        Ok(inode.size)
    }

    /// Reads at most `buf.len()` bytes of the file at inode `index`, starting at `offset`, into `buf`.
    ///
    /// Returns the number of bytes actually read, which may be less than `buf.len()` if the file is
    /// shorter, or if a hole (an unmapped block within the file's declared size) is reached, in which
    /// case the read stops early and returns what was read so far rather than erroring.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidInode`] if `index` is out of range or free. A device error is
    /// returned only if no bytes were read yet; if some bytes were already read, the byte count is
    /// returned instead and the error is swallowed (the caller can retry the remainder at the new
    /// offset).
    pub fn read(&mut self, index: u32, buf: &mut [u8], offset: u64) -> Result<usize, Error> {
        let inode = self.inode_table.read_inode(&mut self.device, index)?;
        if !inode.valid {
            return Err(Error::Fs(FsError::InvalidInode));
        }

        if offset >= u64::from(inode.size) {
            return Ok(0);
        }
        let bytes_to_read = usize::try_from(u64::from(inode.size) - offset).unwrap_or(usize::MAX).min(buf.len());
        if bytes_to_read == 0 {
            return Ok(0);
        }

        let mut inode = inode;
        let mut bytes_read = 0_usize;
        let mut current_offset = offset;

        while bytes_read < bytes_to_read {
            let block_offset = (current_offset % u64::from(BLOCK_SIZE)) as usize;
            let block_result = block_for_offset(&mut self.device, &mut self.bitmap, &mut inode, current_offset, false);
            let block_num = match block_result {
                Ok(block) => block,
                Err(err) => return if bytes_read > 0 { Ok(bytes_read) } else { Err(err) },
            };
            if block_num == 0 {
                // Hole: no mapping for this offset, stop early.
                break;
            }

            let mut block = [0_u8; BLOCK_SIZE as usize];
            if let Err(err) = self.device.read_block(block_num, &mut block) {
                return if bytes_read > 0 { Ok(bytes_read) } else { Err(err.into()) };
            }

            let bytes_to_copy = (BLOCK_SIZE as usize - block_offset).min(bytes_to_read - bytes_read);
            buf[bytes_read..bytes_read + bytes_to_copy].copy_from_slice(&block[block_offset..block_offset + bytes_to_copy]);

            bytes_read += bytes_to_copy;
            current_offset += bytes_to_copy as u64;
        }

        trace!("read {bytes_read} bytes from inode {index} at offset {offset}");
        Ok(bytes_read)
    }

    /// Writes `buf` to the file at inode `index`, starting at `offset`.
    ///
    /// If `offset` is past the current end of file, the gap is zero-filled first (materializing any
    /// blocks it spans). Returns the number of bytes actually written; on a mid-operation device error,
    /// any bytes already written are kept and their count returned, with the file's `size` advanced to
    /// reflect the furthest point actually reached and persisted on a best-effort basis.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::InvalidInode`] if `index` is out of range or free,
    /// [`FsError::InvalidOffset`] if the write would exceed the block map's addressable range with no
    /// bytes written yet, [`FsError::OutOfSpace`] if allocation fails with no bytes written yet, or a
    /// device error under the same "no progress yet" condition.
    pub fn write(&mut self, index: u32, buf: &[u8], offset: u64) -> Result<usize, Error> {
        let mut inode = self.inode_table.read_inode(&mut self.device, index)?;
        if !inode.valid {
            return Err(Error::Fs(FsError::InvalidInode));
        }

        if offset > u64::from(inode.size) {
            if let Err(err) = self.zero_fill(&mut inode, u64::from(inode.size), offset) {
                self.inode_table.write_inode(&mut self.device, index, &inode).ok();
                return Err(err);
            }
        }

        let mut bytes_written = 0_usize;
        let mut current_offset = offset;

        while bytes_written < buf.len() {
            let block_offset = (current_offset % u64::from(BLOCK_SIZE)) as usize;
            let block_result = block_for_offset(&mut self.device, &mut self.bitmap, &mut inode, current_offset, true);
            let block_num = match block_result {
                Ok(block) => block,
                Err(err) => return self.finish_write_on_error(index, &mut inode, current_offset, bytes_written, err),
            };

            let bytes_to_write = (BLOCK_SIZE as usize - block_offset).min(buf.len() - bytes_written);
            let mut block = [0_u8; BLOCK_SIZE as usize];
            if block_offset > 0 || bytes_to_write < BLOCK_SIZE as usize {
                if let Err(err) = self.device.read_block(block_num, &mut block) {
                    return self.finish_write_on_error(index, &mut inode, current_offset, bytes_written, err.into());
                }
            }
            block[block_offset..block_offset + bytes_to_write]
                .copy_from_slice(&buf[bytes_written..bytes_written + bytes_to_write]);

            if let Err(err) = self.device.write_block(block_num, &block) {
                return self.finish_write_on_error(index, &mut inode, current_offset, bytes_written, err.into());
            }

            bytes_written += bytes_to_write;
            current_offset += bytes_to_write as u64;
        }

        if current_offset > u64::from(inode.size) {
            inode.size = current_offset.min(u64::from(u32::MAX)) as u32;
            // Even if this fails, the payload bytes were written; report them regardless.
            self.inode_table.write_inode(&mut self.device, index, &inode).ok();
        }

        trace!("wrote {bytes_written} bytes to inode {index} at offset {offset}");
        Ok(bytes_written)
    }

    /// Zero-fills `[start, end)` of `inode`, allocating blocks as needed.
    ///
    /// `inode.size` is advanced after every chunk actually written, so a mid-range failure leaves it
    /// at the furthest offset successfully zero-filled rather than at its original value — the caller
    /// persists exactly that on its error path.
    fn zero_fill(&mut self, inode: &mut Inode, start: u64, end: u64) -> Result<(), Error> {
        let mut current_offset = start;
        while current_offset < end {
            let block_offset = (current_offset % u64::from(BLOCK_SIZE)) as usize;
            let block_num = block_for_offset(&mut self.device, &mut self.bitmap, inode, current_offset, true)?;

            let bytes_to_fill = (BLOCK_SIZE as usize - block_offset).min((end - current_offset) as usize);
            let mut block = [0_u8; BLOCK_SIZE as usize];
            if block_offset > 0 || bytes_to_fill < BLOCK_SIZE as usize {
                self.device.read_block(block_num, &mut block)?;
            }
            block[block_offset..block_offset + bytes_to_fill].fill(0);
            self.device.write_block(block_num, &block)?;

            current_offset += bytes_to_fill as u64;
            #[allow(clippy::cast_possible_truncation)]
            {
                inode.size = current_offset.min(u64::from(u32::MAX)) as u32;
            }
        }
        Ok(())
    }

    /// Shared tail of [`Session::write`]'s error paths: advances and best-effort persists `inode.size`
    /// to the furthest offset actually reached, then returns `bytes_written` if nonzero, else `err`.
    fn finish_write_on_error(
        &mut self,
        index: u32,
        inode: &mut Inode,
        reached_offset: u64,
        bytes_written: usize,
        err: Error,
    ) -> Result<usize, Error> {
        if reached_offset > u64::from(inode.size) {
            inode.size = reached_offset.min(u64::from(u32::MAX)) as u32;
            self.inode_table.write_inode(&mut self.device, index, inode).ok();
        }
        if bytes_written > 0 {
            Ok(bytes_written)
        } else {
            Err(err)
        }
    }
}
