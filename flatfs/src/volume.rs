use crate::alloc::{Bitmap, NextAvailableAllocation, State};
use crate::config::{BLOCK_SIZE, HOME_DIR, SUPERBLOCK};
use crate::fs::FsError;
use crate::io::{BlockNumber, BlockStorage};
use crate::layout::{Block, DirBlock, Node};

/// What the file system engine needs from the layer below it: whole-block
/// reads and writes plus a free pool. Block 0 is never handed out.
pub trait BlockStore {
    fn read_block(&mut self, blocknr: BlockNumber) -> Result<Block, FsError>;
    fn write_block(&mut self, blocknr: BlockNumber, block: &Block) -> Result<(), FsError>;
    /// Takes a free block out of the pool, `None` when the volume is full.
    fn allocate(&mut self) -> Result<Option<BlockNumber>, FsError>;
    /// Returns a block to the free pool.
    fn reclaim(&mut self, blocknr: BlockNumber) -> Result<(), FsError>;
}

/// A formatted device: the free bitmap lives in block 0 and the home
/// directory in block 1.
///
/// # Layout
/// ===============================================
/// | Bitmap | Home directory | Directories, inodes and data |
/// ===============================================
pub struct Volume<T: BlockStorage> {
    dev: T,
    bitmap: Bitmap,
    /// Usable blocks, the smaller of the device size and the bitmap span.
    cap: usize,
}

impl<T: BlockStorage> Volume<T> {
    /// Lays an empty file system onto the device, discarding whatever it held.
    pub fn format(mut dev: T) -> Result<Self, FsError> {
        let cap = dev.block_count().min(crate::config::NUM_BLOCKS);
        if cap <= usize::from(HOME_DIR) {
            return Err(FsError::InvalidBlock(HOME_DIR));
        }

        let mut bitmap = Bitmap::new();
        bitmap.set_reserved(SUPERBLOCK);
        bitmap.set_reserved(HOME_DIR);

        dev.write_block(HOME_DIR, &DirBlock::new().encode())?;
        dev.write_block(SUPERBLOCK, bitmap.serialize())?;
        dev.sync_disk()?;
        info!("formatted volume with {} blocks", cap);

        Ok(Volume { dev, bitmap, cap })
    }

    /// Opens a previously formatted device.
    pub fn open(mut dev: T) -> Result<Self, FsError> {
        let cap = dev.block_count().min(crate::config::NUM_BLOCKS);
        let mut buf = [0; BLOCK_SIZE];

        dev.read_block(SUPERBLOCK, &mut buf)?;
        let bitmap = Bitmap::parse(&buf).ok_or(FsError::Unformatted)?;
        if bitmap.get(SUPERBLOCK) != State::Used || bitmap.get(HOME_DIR) != State::Used {
            return Err(FsError::Unformatted);
        }

        dev.read_block(HOME_DIR, &mut buf)?;
        if !Node::decode(&buf).is_directory() {
            return Err(FsError::Unformatted);
        }
        debug!(
            "opened volume, {} of {} blocks free",
            bitmap.free_count(cap),
            cap
        );

        Ok(Volume { dev, bitmap, cap })
    }

    /// Opens the device, formatting it first if it has never been written.
    pub fn mount(mut dev: T) -> Result<Self, FsError> {
        let mut buf = [0; BLOCK_SIZE];
        dev.read_block(SUPERBLOCK, &mut buf)?;
        if buf.iter().all(|&b| b == 0) {
            return Self::format(dev);
        }
        Self::open(dev)
    }

    pub fn free_blocks(&self) -> usize {
        self.bitmap.free_count(self.cap)
    }

    pub fn sync(&mut self) -> Result<(), FsError> {
        self.dev.sync_disk()?;
        Ok(())
    }

    /// Returns ownership of the device to the caller.
    pub fn into_inner(self) -> T {
        self.dev
    }

    fn write_bitmap(&mut self) -> Result<(), FsError> {
        self.dev.write_block(SUPERBLOCK, self.bitmap.serialize())?;
        Ok(())
    }
}

impl<T: BlockStorage> BlockStore for Volume<T> {
    fn read_block(&mut self, blocknr: BlockNumber) -> Result<Block, FsError> {
        let mut block = [0; BLOCK_SIZE];
        self.dev.read_block(blocknr, &mut block)?;
        Ok(block)
    }

    fn write_block(&mut self, blocknr: BlockNumber, block: &Block) -> Result<(), FsError> {
        self.dev.write_block(blocknr, block)?;
        Ok(())
    }

    fn allocate(&mut self) -> Result<Option<BlockNumber>, FsError> {
        let next = NextAvailableAllocation::new(&self.bitmap, HOME_DIR + 1, self.cap).next();
        match next {
            Some(blocknr) => {
                self.bitmap.set_reserved(blocknr);
                self.write_bitmap()?;
                trace!("allocated block {}", blocknr);
                Ok(Some(blocknr))
            }
            None => {
                warn!("no free blocks left on volume");
                Ok(None)
            }
        }
    }

    fn reclaim(&mut self, blocknr: BlockNumber) -> Result<(), FsError> {
        if blocknr <= HOME_DIR
            || usize::from(blocknr) >= self.cap
            || self.bitmap.get(blocknr) == State::Free
        {
            return Err(FsError::InvalidBlock(blocknr));
        }
        self.bitmap.set_free(blocknr);
        self.write_bitmap()?;
        trace!("reclaimed block {}", blocknr);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryDisk;

    #[test]
    fn format_reserves_bitmap_and_home() {
        let volume = Volume::format(MemoryDisk::new(8)).unwrap();
        assert_eq!(volume.free_blocks(), 6);
    }

    #[test]
    fn allocation_never_returns_reserved_blocks() {
        let mut volume = Volume::format(MemoryDisk::new(5)).unwrap();
        let mut seen = Vec::new();
        while let Some(blocknr) = volume.allocate().unwrap() {
            seen.push(blocknr);
        }
        assert_eq!(seen, vec![2, 3, 4]);
        assert_eq!(volume.free_blocks(), 0);
    }

    #[test]
    fn reclaimed_blocks_are_reused_first() {
        let mut volume = Volume::format(MemoryDisk::new(8)).unwrap();
        let a = volume.allocate().unwrap().unwrap();
        let b = volume.allocate().unwrap().unwrap();
        volume.reclaim(a).unwrap();
        assert_eq!(volume.allocate().unwrap(), Some(a));
        assert_eq!(volume.allocate().unwrap(), Some(b + 1));
    }

    #[test]
    fn reclaiming_reserved_or_free_blocks_fails() {
        let mut volume = Volume::format(MemoryDisk::new(8)).unwrap();
        for blocknr in [SUPERBLOCK, HOME_DIR, 5, 40] {
            assert!(matches!(
                volume.reclaim(blocknr),
                Err(FsError::InvalidBlock(n)) if n == blocknr
            ));
        }
    }

    #[test]
    fn bitmap_changes_reach_the_device() {
        let mut volume = Volume::format(MemoryDisk::new(8)).unwrap();
        volume.allocate().unwrap();
        volume.allocate().unwrap();

        let reopened = Volume::open(volume.into_inner()).unwrap();
        assert_eq!(reopened.free_blocks(), 4);
    }

    #[test]
    fn open_rejects_blank_device() {
        assert!(matches!(
            Volume::open(MemoryDisk::new(8)),
            Err(FsError::Unformatted)
        ));
    }

    #[test]
    fn mount_formats_blank_device_once() {
        let mut volume = Volume::mount(MemoryDisk::new(8)).unwrap();
        volume.allocate().unwrap();

        let volume = Volume::mount(volume.into_inner()).unwrap();
        assert_eq!(volume.free_blocks(), 5);
    }

    #[test]
    fn tiny_devices_cannot_be_formatted() {
        assert!(Volume::format(MemoryDisk::new(1)).is_err());
    }
}
