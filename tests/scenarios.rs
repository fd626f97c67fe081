//! End-to-end scenarios exercising a full format/mount/create/write/read/delete/unmount cycle
//! against a real temporary image file.

use ssfs::dev::ImageFile;
use ssfs::error::Error;
use ssfs::fs::error::FsError;
use ssfs::fs::layout::BLOCK_SIZE;
use ssfs::fs::session::Session;
use tempfile::NamedTempFile;

fn image(num_blocks: u64) -> NamedTempFile {
    let file = NamedTempFile::new().expect("failed to create temp file");
    file.as_file().set_len(num_blocks * u64::from(BLOCK_SIZE)).expect("failed to size temp file");
    file
}

#[test]
fn s1_format_mount_create_write_read() {
    let image = image(100);
    Session::<ImageFile>::format(image.path(), 10).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();

    let i = session.create().unwrap();
    assert_eq!(i, 0);

    let written = session.write(i, b"Hello, File System World!", 0).unwrap();
    assert_eq!(written, 25);
    assert_eq!(session.stat(i).unwrap(), 25);

    let mut buf = [0_u8; 25];
    let read = session.read(i, &mut buf, 0).unwrap();
    assert_eq!(read, 25);
    assert_eq!(&buf, b"Hello, File System World!");
}

#[test]
fn s2_delete_then_recreate_recycles_smallest_index() {
    let image = image(100);
    Session::<ImageFile>::format(image.path(), 10).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();

    assert_eq!(session.create().unwrap(), 0);
    assert_eq!(session.create().unwrap(), 1);

    session.delete(1).unwrap();
    assert_eq!(session.create().unwrap(), 1);
}

#[test]
fn s3_append_write_extends_file() {
    let image = image(100);
    Session::<ImageFile>::format(image.path(), 10).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();

    let i = session.create().unwrap();
    session.write(i, b"Hello, File System World!", 0).unwrap();
    session.write(i, b" This is additional data.", 25).unwrap();

    assert_eq!(session.stat(i).unwrap(), 50);

    let mut buf = [0_u8; 50];
    session.read(i, &mut buf, 0).unwrap();
    assert_eq!(&buf, b"Hello, File System World! This is additional data.");
}

#[test]
fn s4_sparse_write_zero_fills_the_gap() {
    let image = image(100);
    Session::<ImageFile>::format(image.path(), 10).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();

    let k = session.create().unwrap();
    let written = session.write(k, b"X", 5000).unwrap();
    assert_eq!(written, 1);
    assert_eq!(session.stat(k).unwrap(), 5001);

    let mut buf = [0xFF_u8; 5000];
    session.read(k, &mut buf, 0).unwrap();
    assert!(buf.iter().all(|&b| b == 0));

    let mut last_byte = [0_u8; 1];
    session.read(k, &mut last_byte, 5000).unwrap();
    assert_eq!(last_byte, *b"X");
}

#[test]
fn s5_state_survives_unmount_and_remount() {
    let image = image(100);
    Session::<ImageFile>::format(image.path(), 10).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();

    let i = session.create().unwrap();
    session.write(i, b"Hello, File System World!", 0).unwrap();
    session.unmount().unwrap();

    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();
    assert_eq!(session.stat(i).unwrap(), 25);

    let mut buf = [0_u8; 25];
    session.read(i, &mut buf, 0).unwrap();
    assert_eq!(&buf, b"Hello, File System World!");
}

#[test]
fn s6_corrupted_magic_refuses_to_mount() {
    let image = image(100);
    Session::<ImageFile>::format(image.path(), 10).unwrap();

    {
        use std::io::{Seek, SeekFrom, Write};
        let mut file = image.reopen().unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.write_all(&[0x00]).unwrap();
    }

    let result = Session::<ImageFile>::mount(image.path());
    assert!(matches!(result, Err(Error::Fs(FsError::CorruptDisk))));
}

/// Reads the whole file at `index` back in `BLOCK_SIZE`-sized chunks, advancing the offset after
/// each read, mirroring the original driver's `display_file_contents` chunking loop (clamping the
/// final chunk to whatever remains of `file_size`).
fn read_file_in_chunks(session: &mut Session<ImageFile>, index: u32, file_size: usize) -> Vec<u8> {
    let mut contents = Vec::with_capacity(file_size);
    let mut offset = 0_u64;
    let mut chunk = vec![0_u8; BLOCK_SIZE as usize];

    while (offset as usize) < file_size {
        let chunk_size = (file_size - offset as usize).min(BLOCK_SIZE as usize);
        let bytes_read = session.read(index, &mut chunk[..chunk_size], offset).unwrap();
        assert!(bytes_read > 0, "chunked read stalled at offset {offset}");
        contents.extend_from_slice(&chunk[..bytes_read]);
        offset += bytes_read as u64;
    }

    contents
}

#[test]
fn chunked_read_reproduces_a_multi_block_file() {
    let image = image(400);
    Session::<ImageFile>::format(image.path(), 10).unwrap();
    let mut session = Session::<ImageFile>::mount(image.path()).unwrap();

    let i = session.create().unwrap();
    // Spans all four direct blocks plus part of the single-indirect region.
    let payload: Vec<u8> = (0..BLOCK_SIZE as usize * 5 + 17).map(|n| (n % 251) as u8).collect();
    let written = session.write(i, &payload, 0).unwrap();
    assert_eq!(written, payload.len());

    let contents = read_file_in_chunks(&mut session, i, payload.len());
    assert_eq!(contents, payload);
}
