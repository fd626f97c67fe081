//! Interface for `ssfs`'s possible errors.

use derive_more::derive::{Display, Error, From};

use crate::dev::error::DevError;
use crate::fs::error::FsError;

/// Enumeration of possible sources of error.
#[allow(clippy::error_impl_error)]
#[derive(Debug, Display, Error, From)]
#[display("Error: {_variant}")]
pub enum Error {
    /// Device-level error (see [`DevError`]).
    Device(DevError),

    /// Filesystem-level error (see [`FsError`]).
    Fs(FsError),
}

impl Error {
    /// Returns the legacy negative integer code this error corresponds to, matching the original
    /// `E_*` constants (`E_DISK_NOT_MOUNTED = -100`, …) for callers that need the old FFI/CLI
    /// convention rather than this crate's native [`Result`]-based API.
    ///
    /// Device errors have no legacy equivalent and are mapped to [`FsError::error_code`]'s generic
    /// device-error code.
    #[must_use]
    pub const fn error_code(&self) -> i32 {
        match self {
            Self::Device(_) => FsError::DEVICE_ERROR_CODE,
            Self::Fs(fs_error) => fs_error.error_code(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Device(DevError::from(value))
    }
}
