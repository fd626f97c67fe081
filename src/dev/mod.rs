//! Everything related to the block device abstraction.
//!
//! A [`BlockDevice`] is the environment collaborator this crate is built on top of: a fixed-size,
//! sector-addressable image, each sector exactly [`BLOCK_SIZE`](crate::fs::layout::BLOCK_SIZE) bytes
//! long. The filesystem core never reasons about paths, files descriptors or byte offsets within the
//! device directly: it always goes through [`read_block`](BlockDevice::read_block) and
//! [`write_block`](BlockDevice::write_block), which take a whole-block buffer and a sector number.
//!
//! Two implementations are provided:
//!
//! * [`ImageFile`], backed by a [`std::fs::File`], used for actual on-disk images;
//! * [`MemBlockDevice`] (test-only), backed by a [`Vec<u8>`], used to exercise the filesystem core
//!   without touching the filesystem.
//!
//! Both simply wrap [`Read`](std::io::Read), [`Write`](std::io::Write) and [`Seek`](std::io::Seek), the
//! same pattern the teacher crate this one is derived from uses for its own `std`-backed devices.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, trace};

pub mod error;

use self::error::DevError;
use crate::fs::layout::BLOCK_SIZE;

/// A fixed-size, sector-addressable block device.
///
/// Every sector is exactly [`BLOCK_SIZE`] bytes. Implementors only need to move bytes around;
/// [`BlockDevice`] does not interpret their content in any way.
pub trait BlockDevice: Sized {
    /// Opens the device backing the image at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`DevError`] if the image cannot be opened, or if its length is not a multiple of
    /// [`BLOCK_SIZE`].
    fn open<P: AsRef<Path>>(path: P) -> Result<Self, DevError>;

    /// Returns the number of [`BLOCK_SIZE`]-byte sectors available on this device.
    fn block_count(&self) -> u32;

    /// Reads sector `sector` into `buf`.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::OutOfBounds`] if `sector >= self.block_count()`, or a [`DevError::Io`] if the
    /// underlying I/O fails.
    fn read_block(&mut self, sector: u32, buf: &mut [u8; BLOCK_SIZE as usize]) -> Result<(), DevError>;

    /// Writes `buf` to sector `sector`.
    ///
    /// # Errors
    ///
    /// Returns [`DevError::OutOfBounds`] if `sector >= self.block_count()`, or a [`DevError::Io`] if the
    /// underlying I/O fails.
    fn write_block(&mut self, sector: u32, buf: &[u8; BLOCK_SIZE as usize]) -> Result<(), DevError>;

    /// Flushes any pending writes to the backing storage.
    ///
    /// # Errors
    ///
    /// Returns a [`DevError::Io`] if the flush fails.
    fn sync(&mut self) -> Result<(), DevError>;
}

/// Checks that `sector` is addressable on a device with `block_count` sectors.
fn check_bounds(sector: u32, block_count: u32) -> Result<(), DevError> {
    if sector >= block_count {
        return Err(DevError::OutOfBounds { sector, block_count });
    }
    Ok(())
}

/// A [`BlockDevice`] backed by a [`std::fs::File`].
///
/// The file is expected to already exist with the right length (a zeroed sparse file, typically
/// created with `dd` or [`std::fs::File::set_len`]); [`ImageFile::open`] never creates or resizes it.
#[derive(Debug)]
pub struct ImageFile {
    /// Underlying file handle.
    file: File,

    /// Number of [`BLOCK_SIZE`]-byte sectors in the image, derived from its length at open time.
    block_count: u32,
}

impl BlockDevice for ImageFile {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self, DevError> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let length = file.metadata()?.len();
        if length % u64::from(BLOCK_SIZE) != 0 {
            return Err(DevError::MisalignedImage { length });
        }
        #[allow(clippy::cast_possible_truncation)]
        let block_count = (length / u64::from(BLOCK_SIZE)) as u32;
        debug!("opened image with {block_count} blocks of {BLOCK_SIZE} bytes");
        Ok(Self { file, block_count })
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, sector: u32, buf: &mut [u8; BLOCK_SIZE as usize]) -> Result<(), DevError> {
        check_bounds(sector, self.block_count)?;
        trace!("reading block {sector}");
        self.file.seek(SeekFrom::Start(u64::from(sector) * u64::from(BLOCK_SIZE)))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, sector: u32, buf: &[u8; BLOCK_SIZE as usize]) -> Result<(), DevError> {
        check_bounds(sector, self.block_count)?;
        trace!("writing block {sector}");
        self.file.seek(SeekFrom::Start(u64::from(sector) * u64::from(BLOCK_SIZE)))?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DevError> {
        self.file.sync_data()?;
        Ok(())
    }
}

/// An in-memory [`BlockDevice`], used by tests that want to exercise the filesystem core without
/// creating a real file.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct MemBlockDevice {
    /// Backing storage, `block_count * BLOCK_SIZE` bytes long.
    data: Vec<u8>,

    /// Number of sectors.
    block_count: u32,
}

#[cfg(test)]
impl MemBlockDevice {
    /// Creates a new zeroed [`MemBlockDevice`] with `block_count` sectors.
    #[must_use]
    pub fn new(block_count: u32) -> Self {
        Self { data: vec![0_u8; block_count as usize * BLOCK_SIZE as usize], block_count }
    }
}

#[cfg(test)]
impl BlockDevice for MemBlockDevice {
    fn open<P: AsRef<Path>>(_path: P) -> Result<Self, DevError> {
        unimplemented!("MemBlockDevice is constructed directly with `MemBlockDevice::new`")
    }

    fn block_count(&self) -> u32 {
        self.block_count
    }

    fn read_block(&mut self, sector: u32, buf: &mut [u8; BLOCK_SIZE as usize]) -> Result<(), DevError> {
        check_bounds(sector, self.block_count)?;
        let start = sector as usize * BLOCK_SIZE as usize;
        buf.copy_from_slice(&self.data[start..start + BLOCK_SIZE as usize]);
        Ok(())
    }

    fn write_block(&mut self, sector: u32, buf: &[u8; BLOCK_SIZE as usize]) -> Result<(), DevError> {
        check_bounds(sector, self.block_count)?;
        let start = sector as usize * BLOCK_SIZE as usize;
        self.data[start..start + BLOCK_SIZE as usize].copy_from_slice(buf);
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DevError> {
        Ok(())
    }
}
