//! On-disk layout: the superblock and inode binary records.
//!
//! Every integer in these records is little-endian on disk, independent of the host's native
//! endianness or struct-layout rules — both records are encoded and decoded field-by-field rather
//! than transmuted, so that images stay portable across architectures and compilers.

/// Size in bytes of a single block (sector).
pub const BLOCK_SIZE: u32 = 1024;

/// Size in bytes of a single on-disk inode record.
pub const INODE_SIZE: u32 = 32;

/// Number of inode records packed into a single inode block.
pub const INODES_PER_BLOCK: u32 = BLOCK_SIZE / INODE_SIZE;

/// Number of `u32` block pointers packed into a single indirection page.
pub const POINTERS_PER_BLOCK: u32 = BLOCK_SIZE / 4;

/// Number of direct block pointers stored in an inode.
pub const DIRECT_POINTERS: u32 = 4;

/// Largest byte offset addressable through an inode's block map:
/// `(direct + single-indirect + double-indirect) * BLOCK_SIZE`.
pub const MAX_FILE_SIZE: u64 =
    (DIRECT_POINTERS as u64 + POINTERS_PER_BLOCK as u64 + POINTERS_PER_BLOCK as u64 * POINTERS_PER_BLOCK as u64) * BLOCK_SIZE as u64;

/// Magic number identifying a formatted SSFS image, stored at the start of the superblock.
pub const MAGIC: [u8; 16] = [
    0xF0, 0x55, 0x4C, 0x49, 0x45, 0x47, 0x45, 0x49, 0x4E, 0x46, 0x4F, 0x30, 0x39, 0x34, 0x30, 0x0F,
];

/// The superblock, placed at byte 0 of block 0. Exactly 28 bytes; the rest of the block is zero
/// padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    /// Total number of blocks in the image (equal to the device's sector count).
    pub num_blocks: u32,

    /// Number of inode blocks, starting at block index 1.
    pub num_inode_blocks: u32,

    /// Block size in bytes; always [`BLOCK_SIZE`] in a valid image.
    pub block_size: u32,
}

impl Superblock {
    /// Encoded length of a superblock on disk, in bytes (`16 + 4 + 4 + 4`).
    pub const ENCODED_LEN: usize = 28;

    /// Returns the first data block: the first block past the superblock and the inode table.
    #[must_use]
    pub const fn first_data_block(&self) -> u32 {
        self.num_inode_blocks + 1
    }

    /// Returns the total number of inodes addressable in the inode table.
    #[must_use]
    pub const fn inode_count(&self) -> u32 {
        self.num_inode_blocks * INODES_PER_BLOCK
    }

    /// Encodes this superblock into a full `BLOCK_SIZE`-byte block buffer, zero-padded after the 28
    /// encoded bytes.
    #[must_use]
    pub fn encode(&self) -> [u8; BLOCK_SIZE as usize] {
        let mut block = [0_u8; BLOCK_SIZE as usize];
        block[..16].copy_from_slice(&MAGIC);
        block[16..20].copy_from_slice(&self.num_blocks.to_le_bytes());
        block[20..24].copy_from_slice(&self.num_inode_blocks.to_le_bytes());
        block[24..28].copy_from_slice(&self.block_size.to_le_bytes());
        block
    }

    /// Decodes a superblock from the first block of an image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::fs::error::FsError::CorruptDisk`] if the magic number does not match.
    pub fn decode(block: &[u8; BLOCK_SIZE as usize]) -> Result<Self, crate::fs::error::FsError> {
        if block[..16] != MAGIC {
            return Err(crate::fs::error::FsError::CorruptDisk);
        }
        let num_blocks = u32::from_le_bytes([block[16], block[17], block[18], block[19]]);
        let num_inode_blocks = u32::from_le_bytes([block[20], block[21], block[22], block[23]]);
        let block_size = u32::from_le_bytes([block[24], block[25], block[26], block[27]]);
        Ok(Self { num_blocks, num_inode_blocks, block_size })
    }
}

/// An inode: the 32-byte on-disk record describing one file, including its size and block map.
///
/// Field order matches the original byte layout (`valid, padding, size, direct[4], indirect,
/// double_indirect`) so images stay portable across implementations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inode {
    /// `true` if this inode is allocated to a file, `false` if it is free.
    pub valid: bool,

    /// File size in bytes.
    pub size: u32,

    /// Direct data block pointers; `0` means unmapped.
    pub direct_blocks: [u32; DIRECT_POINTERS as usize],

    /// Single-indirect block pointer; `0` means none.
    pub indirect_block: u32,

    /// Double-indirect block pointer; `0` means none.
    pub double_indirect_block: u32,
}

impl Inode {
    /// Returns a free inode record with every pointer cleared.
    #[must_use]
    pub const fn empty() -> Self {
        Self { valid: false, size: 0, direct_blocks: [0; DIRECT_POINTERS as usize], indirect_block: 0, double_indirect_block: 0 }
    }

    /// Encodes this inode into its 32-byte on-disk representation.
    #[must_use]
    pub fn encode(&self) -> [u8; INODE_SIZE as usize] {
        let mut bytes = [0_u8; INODE_SIZE as usize];
        bytes[0] = u8::from(self.valid);
        // bytes[1..4] are padding, left zeroed.
        bytes[4..8].copy_from_slice(&self.size.to_le_bytes());
        for (i, block) in self.direct_blocks.iter().enumerate() {
            let start = 8 + i * 4;
            bytes[start..start + 4].copy_from_slice(&block.to_le_bytes());
        }
        bytes[24..28].copy_from_slice(&self.indirect_block.to_le_bytes());
        bytes[28..32].copy_from_slice(&self.double_indirect_block.to_le_bytes());
        bytes
    }

    /// Decodes an inode from its 32-byte on-disk representation.
    #[must_use]
    pub fn decode(bytes: &[u8; INODE_SIZE as usize]) -> Self {
        let valid = bytes[0] != 0;
        let size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let mut direct_blocks = [0_u32; DIRECT_POINTERS as usize];
        for (i, block) in direct_blocks.iter_mut().enumerate() {
            let start = 8 + i * 4;
            *block = u32::from_le_bytes([bytes[start], bytes[start + 1], bytes[start + 2], bytes[start + 3]]);
        }
        let indirect_block = u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]);
        let double_indirect_block = u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]);
        Self { valid, size, direct_blocks, indirect_block, double_indirect_block }
    }
}

/// Decodes a [`BLOCK_SIZE`]-wide indirection page into its `POINTERS_PER_BLOCK` little-endian `u32`
/// entries. A `0` entry means "unmapped".
#[must_use]
pub fn decode_pointer_page(block: &[u8; BLOCK_SIZE as usize]) -> Vec<u32> {
    block.chunks_exact(4).map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])).collect()
}

/// Encodes `pointers` (expected to hold exactly `POINTERS_PER_BLOCK` entries) into a
/// [`BLOCK_SIZE`]-wide indirection page.
#[must_use]
pub fn encode_pointer_page(pointers: &[u32]) -> [u8; BLOCK_SIZE as usize] {
    let mut block = [0_u8; BLOCK_SIZE as usize];
    for (i, pointer) in pointers.iter().enumerate() {
        let start = i * 4;
        block[start..start + 4].copy_from_slice(&pointer.to_le_bytes());
    }
    block
}
