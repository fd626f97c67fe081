//! Process-wide convenience wrapper around a single [`Session`], for callers that want the
//! original's singleton-session API rather than passing a `Session` value around themselves.
//!
//! [`Session`]'s own methods have no notion of "mounted" — calling one requires already holding a
//! `Session`, which is only possible after [`mount`] succeeds. The `E_DISK_NOT_MOUNTED` /
//! `E_DISK_ALREADY_MOUNTED` checks therefore live here, against the process-wide slot, rather than
//! inside `Session` itself.

use std::path::Path;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::dev::ImageFile;
use crate::error::Error;
use crate::fs::error::FsError;
use crate::fs::session::Session;

static MOUNTED: Lazy<Mutex<Option<Session<ImageFile>>>> = Lazy::new(|| Mutex::new(None));

/// Formats the image at `path` with `inodes` inodes.
///
/// # Errors
///
/// Returns [`FsError::DiskAlreadyMounted`] if a disk is currently mounted, otherwise whatever
/// [`Session::format`] returns.
pub fn format<P: AsRef<Path>>(path: P, inodes: u32) -> Result<(), Error> {
    let guard = MOUNTED.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if guard.is_some() {
        return Err(Error::Fs(FsError::DiskAlreadyMounted));
    }
    drop(guard);
    Session::<ImageFile>::format(path, inodes)
}

/// Mounts the image at `path` as the process-wide session.
///
/// # Errors
///
/// Returns [`FsError::DiskAlreadyMounted`] if a disk is currently mounted, otherwise whatever
/// [`Session::mount`] returns.
pub fn mount<P: AsRef<Path>>(path: P) -> Result<(), Error> {
    let mut guard = MOUNTED.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    if guard.is_some() {
        return Err(Error::Fs(FsError::DiskAlreadyMounted));
    }
    let session = Session::<ImageFile>::mount(path)?;
    *guard = Some(session);
    Ok(())
}

/// Unmounts the process-wide session.
///
/// # Errors
///
/// Returns [`FsError::DiskNotMounted`] if no disk is mounted, otherwise whatever
/// [`Session::unmount`] returns. The slot is cleared regardless of the unmount result.
pub fn unmount() -> Result<(), Error> {
    let mut guard = MOUNTED.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let session = guard.take().ok_or(Error::Fs(FsError::DiskNotMounted))?;
    session.unmount()
}

/// Runs `f` against the mounted session, or returns [`FsError::DiskNotMounted`] if none is mounted.
fn with_mounted<T>(f: impl FnOnce(&mut Session<ImageFile>) -> Result<T, Error>) -> Result<T, Error> {
    let mut guard = MOUNTED.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
    let session = guard.as_mut().ok_or(Error::Fs(FsError::DiskNotMounted))?;
    f(session)
}

/// Creates a new, empty file on the mounted session and returns its inode index.
///
/// # Errors
///
/// Returns [`FsError::DiskNotMounted`] if no disk is mounted, otherwise whatever
/// [`Session::create`] returns.
pub fn create() -> Result<u32, Error> {
    with_mounted(Session::create)
}

/// Deletes the file at inode `index` on the mounted session.
///
/// # Errors
///
/// Returns [`FsError::DiskNotMounted`] if no disk is mounted, otherwise whatever
/// [`Session::delete`] returns.
pub fn delete(index: u32) -> Result<(), Error> {
    with_mounted(|session| session.delete(index))
}

/// Returns the size in bytes of the file at inode `index` on the mounted session.
///
/// # Errors
///
/// Returns [`FsError::DiskNotMounted`] if no disk is mounted, otherwise whatever [`Session::stat`]
/// returns.
pub fn stat(index: u32) -> Result<u32, Error> {
    with_mounted(|session| session.stat(index))
}

/// Reads from the file at inode `index` on the mounted session, at `offset`, into `buf`.
///
/// # Errors
///
/// Returns [`FsError::DiskNotMounted`] if no disk is mounted, otherwise whatever [`Session::read`]
/// returns.
pub fn read(index: u32, buf: &mut [u8], offset: u64) -> Result<usize, Error> {
    with_mounted(|session| session.read(index, buf, offset))
}

/// Writes `buf` to the file at inode `index` on the mounted session, at `offset`.
///
/// # Errors
///
/// Returns [`FsError::DiskNotMounted`] if no disk is mounted, otherwise whatever [`Session::write`]
/// returns.
pub fn write(index: u32, buf: &[u8], offset: u64) -> Result<usize, Error> {
    with_mounted(|session| session.write(index, buf, offset))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use tempfile::NamedTempFile;

    use super::*;

    // Serializes tests against the shared process-wide slot.
    static TEST_LOCK: StdMutex<()> = StdMutex::new(());

    fn image(num_blocks: u64) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        file.as_file().set_len(num_blocks * u64::from(crate::fs::layout::BLOCK_SIZE)).unwrap();
        file
    }

    #[test]
    fn operations_require_mount() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        assert!(matches!(create(), Err(Error::Fs(FsError::DiskNotMounted))));
    }

    #[test]
    fn double_mount_is_rejected() {
        let _guard = TEST_LOCK.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let image = image(100);
        format(image.path(), 10).unwrap();
        mount(image.path()).unwrap();
        assert!(matches!(mount(image.path()), Err(Error::Fs(FsError::DiskAlreadyMounted))));
        unmount().unwrap();
    }
}
