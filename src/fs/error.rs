//! Errors related to filesystem-level manipulation.

use derive_more::derive::{Display, Error};

/// Enumeration of possible errors encountered with [`Session`](super::session::Session) manipulation.
///
/// Each variant's doc comment carries the legacy negative integer constant it corresponds to in the
/// original C implementation this filesystem's on-disk format is compatible with; [`FsError::error_code`]
/// reconstructs it.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, PartialEq, Eq, Display, Error)]
#[display("FileSystem Error: {_variant}")]
pub enum FsError {
    /// No disk is currently mounted (`E_DISK_NOT_MOUNTED`, -100).
    #[display("Disk Not Mounted")]
    DiskNotMounted,

    /// A disk is already mounted (`E_DISK_ALREADY_MOUNTED`, -101).
    #[display("Disk Already Mounted")]
    DiskAlreadyMounted,

    /// The given inode index is out of range, or refers to a free inode where an allocated one was
    /// expected (`E_INVALID_INODE`, -102).
    #[display("Invalid Inode")]
    InvalidInode,

    /// No free block (or, during mount, no free memory) was available (`E_OUT_OF_SPACE`, -103).
    #[display("Out Of Space")]
    OutOfSpace,

    /// No free inode was available (`E_OUT_OF_INODES`, -104).
    #[display("Out Of Inodes")]
    OutOfInodes,

    /// The superblock's magic number did not match (`E_CORRUPT_DISK`, -105).
    #[display("Corrupt Disk")]
    CorruptDisk,

    /// The requested file offset exceeds the addressable range of the block-map (`E_INVALID_OFFSET`,
    /// -106).
    #[display("Invalid Offset")]
    InvalidOffset,
}

impl FsError {
    /// Legacy code used for device-layer errors that have no dedicated `FsError` variant.
    pub(crate) const DEVICE_ERROR_CODE: i32 = -1;

    /// Returns the legacy negative integer code this error corresponds to.
    #[must_use]
    pub const fn error_code(&self) -> i32 {
        match self {
            Self::DiskNotMounted => -100,
            Self::DiskAlreadyMounted => -101,
            Self::InvalidInode => -102,
            Self::OutOfSpace => -103,
            Self::OutOfInodes => -104,
            Self::CorruptDisk => -105,
            Self::InvalidOffset => -106,
        }
    }
}
