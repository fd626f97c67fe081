//! Errors related to block device manipulation.

use derive_more::derive::{Display, Error};

/// Enumeration of possible errors encountered with a [`BlockDevice`](super::BlockDevice)'s manipulation.
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Display, Error)]
#[display("Device Error: {_variant}")]
pub enum DevError {
    /// The given sector is not within `[0, block_count)`.
    #[display("Out of Bounds: sector {sector} is not within [0, {block_count})")]
    OutOfBounds {
        /// Sector that was requested.
        sector: u32,

        /// Number of sectors available on the device.
        block_count: u32,
    },

    /// The device image's length is not a multiple of the block size.
    #[display("Misaligned Image: the image is {length} bytes long, which is not a multiple of the block size")]
    MisalignedImage {
        /// Length of the image file, in bytes.
        length: u64,
    },

    /// Forwarded from the underlying I/O layer (file open/read/write/sync failures, permission errors, …).
    #[display("I/O Error: {_0}")]
    Io(String),
}

impl From<std::io::Error> for DevError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}
