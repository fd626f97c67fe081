//! Property-style tests for the universal invariants: inode counts, create recycling, round-trips,
//! bitmap reconstruction, and partial-progress-on-error semantics.

use ssfs::dev::ImageFile;
use ssfs::error::Error;
use ssfs::fs::error::FsError;
use ssfs::fs::layout::{BLOCK_SIZE, INODES_PER_BLOCK};
use ssfs::fs::session::Session;
use tempfile::NamedTempFile;

fn image(num_blocks: u64) -> NamedTempFile {
    let file = NamedTempFile::new().expect("failed to create temp file");
    file.as_file().set_len(num_blocks * u64::from(BLOCK_SIZE)).expect("failed to size temp file");
    file
}

#[test]
fn format_then_mount_rounds_inode_count_up_to_a_multiple_of_32() {
    for requested in [1_u32, 10, 31, 32, 33, 64, 100] {
        let image = image(200);
        Session::<ImageFile>::format(image.path(), requested).unwrap();
        let session = Session::<ImageFile>::mount(image.path()).unwrap();

        let expected = requested.max(1).div_ceil(INODES_PER_BLOCK).max(1) * INODES_PER_BLOCK;
        assert_eq!(session.inode_count(), expected, "requested {requested} inodes");
    }
}

#[test]
fn create_returns_strictly_increasing_indices_until_recycled() {
    let image = image(100);
    Session::<ImageFile>::format(image.path(), 10).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();

    let first = session.create().unwrap();
    let second = session.create().unwrap();
    let third = session.create().unwrap();
    assert!(first < second);
    assert!(second < third);

    session.delete(second).unwrap();
    let recycled = session.create().unwrap();
    assert_eq!(recycled, second, "the smallest free index should be reused");
}

#[test]
fn round_trip_arbitrary_offsets_and_lengths() {
    let image = image(400);
    Session::<ImageFile>::format(image.path(), 10).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();
    let i = session.create().unwrap();

    for (offset, payload) in [
        (0_u64, b"abc".as_slice()),
        (10, b"the quick brown fox"),
        (1024, b"crosses a block boundary"),
        (4090, b"straddles the edge of a direct block"),
    ] {
        let written = session.write(i, payload, offset).unwrap();
        assert_eq!(written, payload.len());

        let mut buf = vec![0_u8; payload.len()];
        let read = session.read(i, &mut buf, offset).unwrap();
        assert_eq!(read, payload.len());
        assert_eq!(buf, payload);
    }
}

#[test]
fn bitmap_reconstruction_after_remount_frees_deleted_blocks() {
    // Only 4 data blocks available: exactly enough for one 3-block file, twice, unless a delete
    // really frees its blocks and a fresh mount really sees them free again.
    let image = image(6);
    Session::<ImageFile>::format(image.path(), 1).unwrap();

    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();
    let i = session.create().unwrap();
    let payload = vec![0x42_u8; 3 * BLOCK_SIZE as usize];
    session.write(i, &payload, 0).unwrap();
    session.delete(i).unwrap();
    session.unmount().unwrap();

    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();
    let j = session.create().unwrap();
    let written = session.write(j, &payload, 0).unwrap();
    assert_eq!(written, payload.len(), "blocks freed by delete should be available again after remount");
}

#[test]
fn write_out_of_space_mid_operation_returns_bytes_written_so_far() {
    // First data block is consumed up front; the write below needs a second block it can't get.
    let image = image(4);
    Session::<ImageFile>::format(image.path(), 1).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();

    let i = session.create().unwrap();
    let other = session.create().unwrap();
    session.write(other, b"x", 0).unwrap(); // claims the sole spare data block

    let payload = vec![0xAA_u8; BLOCK_SIZE as usize + 10];
    let result = session.write(i, &payload, 0);
    match result {
        Ok(written) => assert!(written > 0 && written < payload.len()),
        Err(Error::Fs(FsError::OutOfSpace)) => panic!("expected partial progress, not a bare error"),
        Err(other) => panic!("unexpected error: {other}"),
    }
}
