//! Fixed volume geometry. Every record on disk is sized against these values.

/// Bytes in one logical block.
pub const BLOCK_SIZE: usize = 128;

/// Blocks in a full volume. The free bitmap covers exactly one block worth of bits.
pub const NUM_BLOCKS: usize = BLOCK_SIZE * 8;

/// Longest entry name in bytes, not counting the NUL terminator stored on disk.
pub const MAX_FNAME_SIZE: usize = 9;

/// Directory entries that fit after the 8 byte directory header.
pub const MAX_DIR_ENTRIES: usize = (BLOCK_SIZE - 8) / (MAX_FNAME_SIZE + 1 + 2);

/// Direct data block pointers that fit after the 8 byte inode header.
pub const MAX_DATA_BLOCKS: usize = (BLOCK_SIZE - 8) / 2;

pub const MAX_FILE_SIZE: usize = MAX_DATA_BLOCKS * BLOCK_SIZE;

pub const DIR_MAGIC: u32 = 0xFFFF_FFFF;
pub const INODE_MAGIC: u32 = 0xFFFF_FFFE;

/// Known locations.
pub const SUPERBLOCK: u16 = 0;
pub const HOME_DIR: u16 = 1;
