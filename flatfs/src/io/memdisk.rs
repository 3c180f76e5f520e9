use super::block::{check_range, BlockNumber, BlockStorage};
use crate::config::BLOCK_SIZE;
use std::io::ErrorKind;

/// A zero-initialized disk held entirely in memory. Contents are gone once
/// the value is dropped.
pub struct MemoryDisk {
    data: Vec<u8>,
    block_count: usize,
}

impl MemoryDisk {
    pub fn new(block_count: usize) -> Self {
        Self {
            data: vec![0; block_count * BLOCK_SIZE],
            block_count,
        }
    }

    fn span(blocknr: BlockNumber) -> std::ops::Range<usize> {
        let start = usize::from(blocknr) * BLOCK_SIZE;
        start..start + BLOCK_SIZE
    }
}

impl BlockStorage for MemoryDisk {
    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()> {
        check_range(blocknr, self.block_count)?;
        if buf.len() < BLOCK_SIZE {
            return Err(std::io::Error::new(
                ErrorKind::InvalidInput,
                "buffer does not contain enough space to read block",
            ));
        }
        buf[..BLOCK_SIZE].copy_from_slice(&self.data[Self::span(blocknr)]);
        Ok(())
    }

    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()> {
        check_range(blocknr, self.block_count)?;
        let max = BLOCK_SIZE.min(buf.len());
        let start = Self::span(blocknr).start;
        self.data[start..start + max].copy_from_slice(&buf[..max]);
        Ok(())
    }

    fn sync_disk(&mut self) -> std::io::Result<()> {
        Ok(())
    }

    fn block_count(&self) -> usize {
        self.block_count
    }
}
