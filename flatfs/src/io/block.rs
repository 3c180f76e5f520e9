/// The block number to access ranging from 0 (the first block) to n - 1 (the last
/// block) where n is number of blocks available. Stored on disk as 16 bits.
pub type BlockNumber = u16;

/// Raw fixed-size block access, loosely following the interface described here:
/// http://web.mit.edu/6.033/1997/handouts/html/04sfs.html.
///
/// Devices know nothing about allocation or layout; that lives in
/// [`Volume`](crate::Volume).
pub trait BlockStorage {
    /// Reads disk block number into provided buffer.
    ///
    /// # Errors
    ///
    /// Attempting to read a block out of range, or into a buffer shorter than a
    /// block, will return an error.
    fn read_block(&mut self, blocknr: BlockNumber, buf: &mut [u8]) -> std::io::Result<()>;
    /// Writes provided buffer into the specified block number. Buffers longer
    /// than a block are truncated.
    ///
    /// # Errors
    ///
    /// Attempting to write a block out of range will return an error.
    fn write_block(&mut self, blocknr: BlockNumber, buf: &[u8]) -> std::io::Result<()>;
    /// Flush any buffered disk IO from memory. This is useful if it must guaranteed
    /// the disk writes actually occurred, for instance, if being re-read from
    /// disk.
    fn sync_disk(&mut self) -> std::io::Result<()>;
    /// The number of addressable blocks on the device.
    fn block_count(&self) -> usize;
}

pub(crate) fn check_range(blocknr: BlockNumber, block_count: usize) -> std::io::Result<()> {
    if usize::from(blocknr) >= block_count {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "block out of range",
        ));
    }
    Ok(())
}
