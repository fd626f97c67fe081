//! Structures built on top of a raw [`BlockDevice`](crate::dev::BlockDevice): the block allocator and
//! the block-map (indirection) engine.

pub mod bitmap;
pub mod indirection;
