//! On-disk records. Every block the file system owns is either a directory
//! block or an inode block, told apart by the leading magic number; data
//! blocks are plain bytes and never decoded.
//!
//! # Directory block
//! ==========================================================
//! | magic (4) | num_entries (4) | 10 x (name (10), block (2)) |
//! ==========================================================
//!
//! # Inode block
//! =============================================
//! | magic (4) | size (4) | 60 x data block (2) |
//! =============================================
use crate::config::{
    BLOCK_SIZE, DIR_MAGIC, HOME_DIR, INODE_MAGIC, MAX_DATA_BLOCKS, MAX_DIR_ENTRIES,
    MAX_FILE_SIZE, MAX_FNAME_SIZE,
};
use crate::fs::FsError;
use crate::io::BlockNumber;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

pub type Block = [u8; BLOCK_SIZE];

#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirEntry {
    /// NUL terminated, so at most `MAX_FNAME_SIZE` usable bytes.
    name: [u8; MAX_FNAME_SIZE + 1],
    block_num: BlockNumber,
}

impl DirEntry {
    fn new(name: &str, block_num: BlockNumber) -> Self {
        let mut entry = Self::new_zeroed();
        entry.name[..name.len()].copy_from_slice(name.as_bytes());
        entry.block_num = block_num;
        entry
    }

    /// The stored name up to its terminator.
    pub fn name(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(self.name.len());
        &self.name[..end]
    }

    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name()).into_owned()
    }

    pub fn block(&self) -> BlockNumber {
        self.block_num
    }
}

#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, PartialEq, Eq)]
pub struct DirBlock {
    magic: u32,
    num_entries: u32,
    entries: [DirEntry; MAX_DIR_ENTRIES],
}

#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Inode {
    magic: u32,
    size: u32,
    blocks: [BlockNumber; MAX_DATA_BLOCKS],
}

const _: () = assert!(std::mem::size_of::<DirBlock>() == BLOCK_SIZE);
const _: () = assert!(std::mem::size_of::<Inode>() == BLOCK_SIZE);

/// What a block turns out to be once its tag has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Directory(DirBlock),
    File(Inode),
    /// Unknown tag or a record that breaks its own bounds.
    Invalid,
}

impl Node {
    pub fn decode(block: &Block) -> Node {
        let mut tag = [0; 4];
        tag.copy_from_slice(&block[..4]);
        match u32::from_ne_bytes(tag) {
            DIR_MAGIC => match DirBlock::read_from(&block[..]) {
                Some(dir) if dir.len() <= MAX_DIR_ENTRIES => Node::Directory(dir),
                _ => Node::Invalid,
            },
            INODE_MAGIC => match Inode::read_from(&block[..]) {
                Some(inode) if inode.is_consistent() => Node::File(inode),
                _ => Node::Invalid,
            },
            _ => Node::Invalid,
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Node::Directory(_))
    }
}

fn encode<T: AsBytes>(record: &T) -> Block {
    let mut block = [0; BLOCK_SIZE];
    block.copy_from_slice(record.as_bytes());
    block
}

impl DirBlock {
    /// An empty, tagged directory.
    pub fn new() -> Self {
        let mut dir = Self::new_zeroed();
        dir.magic = DIR_MAGIC;
        dir
    }

    pub fn encode(&self) -> Block {
        encode(self)
    }

    pub fn len(&self) -> usize {
        self.num_entries as usize
    }

    pub fn is_empty(&self) -> bool {
        self.num_entries == 0
    }

    pub fn is_full(&self) -> bool {
        self.len() >= MAX_DIR_ENTRIES
    }

    /// The in-use entries, which are always packed at the front.
    pub fn entries(&self) -> &[DirEntry] {
        &self.entries[..self.len().min(MAX_DIR_ENTRIES)]
    }

    /// Position and contents of the entry called `name`.
    pub fn find(&self, name: &str) -> Option<(usize, DirEntry)> {
        self.entries()
            .iter()
            .position(|entry| entry.name() == name.as_bytes())
            .map(|index| (index, self.entries[index]))
    }

    /// Appends an entry after the last in-use slot.
    pub fn push(&mut self, name: &str, block_num: BlockNumber) -> Result<(), FsError> {
        if name.contains('\0') {
            return Err(FsError::InvalidName);
        }
        if name.len() > MAX_FNAME_SIZE {
            return Err(FsError::NameTooLong);
        }
        if self.is_full() {
            return Err(FsError::DirectoryFull);
        }
        self.entries[self.len()] = DirEntry::new(name, block_num);
        self.num_entries += 1;
        Ok(())
    }

    /// Removes the entry at `index`, shifting later entries down so the in-use
    /// slots stay packed. The vacated last slot is zeroed.
    pub fn remove(&mut self, index: usize) -> Option<DirEntry> {
        let len = self.len();
        if index >= len {
            return None;
        }
        let removed = self.entries[index];
        self.entries.copy_within(index + 1..len, index);
        self.entries[len - 1] = DirEntry::new_zeroed();
        self.num_entries -= 1;
        Some(removed)
    }
}

impl Default for DirBlock {
    fn default() -> Self {
        Self::new()
    }
}

impl Inode {
    /// An empty, tagged inode with no data blocks.
    pub fn new() -> Self {
        let mut inode = Self::new_zeroed();
        inode.magic = INODE_MAGIC;
        inode
    }

    pub fn encode(&self) -> Block {
        encode(self)
    }

    pub fn size(&self) -> usize {
        self.size as usize
    }

    pub(crate) fn set_size(&mut self, size: usize) {
        debug_assert!(size <= MAX_FILE_SIZE);
        self.size = size as u32;
    }

    /// Data block backing byte offsets `index * BLOCK_SIZE ..`, 0 when unused.
    pub fn block(&self, index: usize) -> BlockNumber {
        self.blocks.get(index).copied().unwrap_or(0)
    }

    pub(crate) fn set_block(&mut self, index: usize, block_num: BlockNumber) {
        self.blocks[index] = block_num;
    }

    /// Every non-zero data block pointer, in file order.
    pub fn data_blocks(&self) -> impl Iterator<Item = BlockNumber> + '_ {
        self.blocks.iter().copied().filter(|&block| block != 0)
    }

    /// Blocks held by the file, the inode itself included.
    pub fn block_count(&self) -> usize {
        1 + self.data_blocks().count()
    }

    pub fn first_block(&self) -> BlockNumber {
        self.blocks[0]
    }

    /// Size within bounds, and exactly the first `ceil(size / BLOCK_SIZE)`
    /// pointers in use, each past the reserved blocks.
    fn is_consistent(&self) -> bool {
        let size = self.size();
        if size > MAX_FILE_SIZE {
            return false;
        }
        let used = (size + BLOCK_SIZE - 1) / BLOCK_SIZE;
        let (live, spare) = self.blocks.split_at(used);
        live.iter().all(|&block| block > HOME_DIR) && spare.iter().all(|&block| block == 0)
    }
}

impl Default for Inode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(dir: &DirBlock) -> Vec<String> {
        dir.entries().iter().map(DirEntry::name_lossy).collect()
    }

    #[test]
    fn zeroed_block_is_invalid() {
        assert_eq!(Node::decode(&[0; BLOCK_SIZE]), Node::Invalid);
    }

    #[test]
    fn fresh_records_decode_to_their_variant() {
        assert_eq!(
            Node::decode(&DirBlock::new().encode()),
            Node::Directory(DirBlock::new())
        );
        assert_eq!(Node::decode(&Inode::new().encode()), Node::File(Inode::new()));
    }

    #[test]
    fn out_of_bounds_records_are_invalid() {
        let mut dir = DirBlock::new();
        dir.num_entries = (MAX_DIR_ENTRIES + 1) as u32;
        assert_eq!(Node::decode(&dir.encode()), Node::Invalid);

        let mut inode = Inode::new();
        inode.size = (MAX_FILE_SIZE + 1) as u32;
        assert_eq!(Node::decode(&inode.encode()), Node::Invalid);
    }

    #[test]
    fn inode_pointers_must_match_its_size() {
        let mut inode = Inode::new();
        inode.set_block(0, 7);
        inode.set_block(1, 8);
        inode.set_size(BLOCK_SIZE + 1);
        assert!(matches!(Node::decode(&inode.encode()), Node::File(_)));

        // A pointer past the last block the size needs.
        let mut stray = inode;
        stray.set_block(3, 9);
        assert_eq!(Node::decode(&stray.encode()), Node::Invalid);

        // A hole inside the used range.
        let mut sparse = inode;
        sparse.set_block(0, 0);
        assert_eq!(Node::decode(&sparse.encode()), Node::Invalid);

        // Pointers into the bitmap or home directory.
        let mut reserved = inode;
        reserved.set_block(1, HOME_DIR);
        assert_eq!(Node::decode(&reserved.encode()), Node::Invalid);

        // Blocks listed for an empty file.
        let mut empty = Inode::new();
        empty.set_block(0, 7);
        assert_eq!(Node::decode(&empty.encode()), Node::Invalid);
    }

    #[test]
    fn decode_keeps_untouched_bytes() {
        // Stale bytes in unused slots survive a decode/encode cycle.
        let mut raw = DirBlock::new().encode();
        raw[BLOCK_SIZE - 3] = 0x5A;
        match Node::decode(&raw) {
            Node::Directory(dir) => assert_eq!(dir.encode(), raw),
            other => panic!("expected a directory, got {:?}", other),
        }
    }

    #[test]
    fn push_and_find_entries() {
        let mut dir = DirBlock::new();
        dir.push("a", 4).unwrap();
        dir.push("123456789", 5).unwrap();

        let (index, entry) = dir.find("123456789").unwrap();
        assert_eq!(index, 1);
        assert_eq!(entry.block(), 5);
        assert!(dir.find("12345678").is_none());
        assert!(dir.find("b").is_none());
    }

    #[test]
    fn push_rejects_long_names_and_full_directories() {
        let mut dir = DirBlock::new();
        assert!(matches!(
            dir.push("0123456789", 2),
            Err(FsError::NameTooLong)
        ));
        for i in 0..MAX_DIR_ENTRIES {
            dir.push(&format!("f{}", i), i as BlockNumber + 2).unwrap();
        }
        assert!(dir.is_full());
        assert!(matches!(dir.push("extra", 99), Err(FsError::DirectoryFull)));
    }

    #[test]
    fn push_rejects_names_with_nul() {
        let mut dir = DirBlock::new();
        assert!(matches!(dir.push("a\0b", 2), Err(FsError::InvalidName)));
        assert!(dir.is_empty());
    }

    #[test]
    fn remove_keeps_entries_packed() {
        let mut dir = DirBlock::new();
        dir.push("one", 2).unwrap();
        dir.push("two", 3).unwrap();
        dir.push("three", 4).unwrap();

        let removed = dir.remove(1).unwrap();
        assert_eq!(removed.name(), b"two");
        assert_eq!(names(&dir), vec!["one", "three"]);
        assert_eq!(dir.entries[2], DirEntry::new_zeroed());
        assert!(dir.remove(2).is_none());
    }

    #[test]
    fn inode_counts_its_blocks() {
        let mut inode = Inode::new();
        assert_eq!(inode.block_count(), 1);
        assert_eq!(inode.first_block(), 0);

        inode.set_block(0, 9);
        inode.set_block(1, 12);
        inode.set_size(BLOCK_SIZE + 1);
        assert_eq!(inode.block_count(), 3);
        assert_eq!(inode.first_block(), 9);
        assert_eq!(inode.data_blocks().collect::<Vec<_>>(), vec![9, 12]);
        assert_eq!(inode.block(MAX_DATA_BLOCKS), 0);
    }
}
