//! # ssfs
//!
//! A Simple Sequential File System: a single-user, flat (directory-free) file system laid out over a
//! fixed-size block device image.
//!
//! ## Usage
//!
//! ```
//! use ssfs::dev::ImageFile;
//! use ssfs::fs::session::Session;
//! use tempfile::NamedTempFile;
//!
//! let image = NamedTempFile::new().unwrap();
//! image.as_file().set_len(100 * 1024).unwrap();
//!
//! Session::<ImageFile>::format(image.path(), 10).unwrap();
//! let mut session = Session::<ImageFile>::mount(image.path()).unwrap();
//!
//! let i = session.create().unwrap();
//! session.write(i, b"Hello, File System World!", 0).unwrap();
//! assert_eq!(session.stat(i).unwrap(), 25);
//!
//! let mut buf = [0_u8; 25];
//! session.read(i, &mut buf, 0).unwrap();
//! assert_eq!(&buf, b"Hello, File System World!");
//!
//! session.unmount().unwrap();
//! ```
//!
//! Callers that prefer a single process-wide mounted session over passing a [`Session`](fs::session::Session)
//! value around can use [`fs::global`] instead, which mirrors the same operations as free functions and
//! enforces the mounted/not-mounted state that a `Session` value makes implicit.

pub mod dev;
pub mod error;
pub mod fs;
