//! Lifecycle: `format`, `mount`, `unmount`, and the [`Session`] that owns a mounted filesystem.

use std::path::Path;

use log::info;

use crate::dev::BlockDevice;
use crate::error::Error;
use crate::fs::error::FsError;
use crate::fs::inode_table::InodeTable;
use crate::fs::layout::{Superblock, BLOCK_SIZE, INODES_PER_BLOCK};
use crate::fs::structures::bitmap::Bitmap;

/// A mounted SSFS session: the device handle, the superblock, the reconstructed block bitmap, and the
/// inode table accessor, bundled together as recommended by the Design Notes — an owned, caller-visible
/// value rather than hidden global state.
///
/// File operations (`create`, `delete`, `stat`, `read`, `write`) are defined in
/// [`fs::ops`](crate::fs::ops) as inherent methods on `Session`.
#[derive(Debug)]
pub struct Session<D: BlockDevice> {
    /// The underlying block device.
    pub(crate) device: D,

    /// The validated superblock.
    pub(crate) superblock: Superblock,

    /// Allocator state, reconstructed at mount time.
    pub(crate) bitmap: Bitmap,

    /// Inode addressing accessor.
    pub(crate) inode_table: InodeTable,

    /// Path the session was mounted from, kept for diagnostics (mirrors the original's `mounted_disk`
    /// name, which served the same informational purpose).
    pub(crate) disk_name: String,
}

impl<D: BlockDevice> Session<D> {
    /// Formats the image at `path` with `inodes` inodes (clamped to at least 1, and rounded up to a
    /// whole number of inode blocks — so the usable inode count is always a multiple of
    /// [`INODES_PER_BLOCK`]).
    ///
    /// Formatting does not keep a session open: it opens the device, writes the superblock and zeroed
    /// inode blocks, syncs, and closes it again.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::OutOfSpace`] if the image has no room for at least one data block after the
    /// superblock and inode table, or a device error if the image cannot be opened or written.
    pub fn format<P: AsRef<Path>>(path: P, inodes: u32) -> Result<(), Error> {
        let path = path.as_ref();
        let inodes = inodes.max(1);
        let mut device = D::open(path)?;

        let num_inode_blocks = inodes.div_ceil(INODES_PER_BLOCK).max(1);
        let num_blocks = device.block_count();

        if num_inode_blocks + 1 >= num_blocks {
            return Err(Error::Fs(FsError::OutOfSpace));
        }

        let superblock = Superblock { num_blocks, num_inode_blocks, block_size: BLOCK_SIZE };
        device.write_block(0, &superblock.encode())?;

        let empty_inode_block = [0_u8; BLOCK_SIZE as usize];
        for block in 1..=num_inode_blocks {
            device.write_block(block, &empty_inode_block)?;
        }

        device.sync()?;
        info!(
            "formatted {:?}: {num_blocks} blocks, {num_inode_blocks} inode blocks ({} inodes)",
            path,
            num_inode_blocks * INODES_PER_BLOCK
        );
        Ok(())
    }

    /// Mounts the image at `path`.
    ///
    /// Opens the device, validates the superblock's magic number, and reconstructs the block bitmap by
    /// scanning every inode's pointer graph (see [`Bitmap::reconstruct`]). Any failure along the way
    /// leaves nothing behind: the device is dropped and no partial state escapes this function.
    ///
    /// # Errors
    ///
    /// Returns [`FsError::CorruptDisk`] if the magic number doesn't match, or a device error if the
    /// image cannot be opened or read.
    pub fn mount<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let mut device = D::open(path)?;

        let mut block = [0_u8; BLOCK_SIZE as usize];
        device.read_block(0, &mut block)?;
        let superblock = Superblock::decode(&block)?;

        let bitmap = Bitmap::reconstruct(&mut device, superblock.num_blocks, superblock.num_inode_blocks)?;
        let inode_table = InodeTable::new(superblock.num_inode_blocks);

        info!(
            "mounted {:?}: {} blocks, {} inode blocks ({} inodes)",
            path,
            superblock.num_blocks,
            superblock.num_inode_blocks,
            inode_table.inode_count()
        );

        Ok(Self { device, superblock, bitmap, inode_table, disk_name: path.display().to_string() })
    }

    /// Unmounts this session: syncs the device, then drops it.
    ///
    /// Cleanup (dropping the device and bitmap) always happens, even if the sync fails — the sync
    /// error is only reported back to the caller, it does not prevent the session from being torn
    /// down, matching the original's "clean up even if sync fails" behaviour.
    ///
    /// # Errors
    ///
    /// Returns a device error if the final sync fails; the session is torn down regardless.
    pub fn unmount(mut self) -> Result<(), Error> {
        info!("unmounting {:?}", self.disk_name);
        self.device.sync().map_err(Error::from)
    }

    /// Returns the number of inodes addressable on this session's inode table.
    #[must_use]
    pub const fn inode_count(&self) -> u32 {
        self.inode_table.inode_count()
    }
}
