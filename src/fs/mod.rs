//! The filesystem core: on-disk layout, inode addressing, the block-map engine, file operations, and
//! session lifecycle.
//!
//! A [`Session`](session::Session) owns everything a mounted filesystem needs (device, superblock,
//! bitmap, inode table); [`global`] offers a process-wide convenience wrapper around a single
//! `Session` for callers that want the original singleton-session API instead.

pub mod error;
pub mod global;
pub mod inode_table;
pub mod layout;
pub mod ops;
pub mod session;
pub mod structures;
