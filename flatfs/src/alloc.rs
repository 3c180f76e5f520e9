use crate::config::{BLOCK_SIZE, NUM_BLOCKS};
use crate::io::BlockNumber;
use zerocopy::{AsBytes, FromBytes, FromZeroes};

#[derive(Debug, PartialEq)]
pub enum State {
    Free,
    Used,
}

#[repr(C)]
#[derive(AsBytes, FromBytes, FromZeroes, Clone, Copy, Debug, PartialEq)]
pub struct Bitmap {
    /// Stores one bit per logical block on disk. A 128 byte bitmap tracks
    /// 128 * 8 blocks, which is the whole volume.
    bitmap: [u64; BLOCK_SIZE / 8],
}

impl Bitmap {
    pub fn new() -> Self {
        Self::new_zeroed()
    }

    /// Reads a bitmap from the first `BLOCK_SIZE` bytes of `buf`. Returns `None`
    /// when the buffer is shorter than a block.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        Self::read_from(buf.get(..BLOCK_SIZE)?)
    }

    pub fn serialize(&self) -> &[u8] {
        self.as_bytes()
    }

    /// Blocks outside the bitmap are always reported as used so they can never
    /// be handed out.
    pub fn get(&self, blocknr: BlockNumber) -> State {
        let blocknr = usize::from(blocknr);
        if blocknr >= NUM_BLOCKS {
            return State::Used;
        }
        let word = self.bitmap[blocknr / 64];
        let mask = 0b01_u64 << (blocknr % 64);
        if word & mask == 0 {
            State::Free
        } else {
            State::Used
        }
    }

    pub fn set_reserved(&mut self, blocknr: BlockNumber) {
        let blocknr = usize::from(blocknr);
        debug_assert!(blocknr < NUM_BLOCKS);
        if let Some(word) = self.bitmap.get_mut(blocknr / 64) {
            *word |= 0b01_u64 << (blocknr % 64);
        }
    }

    pub fn set_free(&mut self, blocknr: BlockNumber) {
        let blocknr = usize::from(blocknr);
        debug_assert!(blocknr < NUM_BLOCKS);
        if let Some(word) = self.bitmap.get_mut(blocknr / 64) {
            *word &= !(0b01_u64 << (blocknr % 64));
        }
    }

    /// Number of free blocks among the first `cap` blocks.
    pub fn free_count(&self, cap: usize) -> usize {
        (0..cap.min(NUM_BLOCKS))
            .filter(|&i| self.get(i as BlockNumber) == State::Free)
            .count()
    }
}

impl Default for Bitmap {
    fn default() -> Self {
        Self::new()
    }
}

/// Implements a naive block allocation policy. Each call to the iterator returns
/// the next free block at or after the marker, so the lowest free block is
/// always handed out first and reclaimed blocks are reused before fresh ones.
///
/// ## Other Pre-Allocation Policies
///
/// 1. Allocation that attempts to find enough contiguous available blocks so data can be allocated
///    close together (speed ups through sequential reads).
/// 2. Allocation that attempts to spread randomly over blocks to prevent wear of physical devices
///    in the front section (that may be rewritten many times before allocating to the back).
pub struct NextAvailableAllocation<'a> {
    /// Keeps track of the next starting place for looking for available blocks.
    marker: usize,
    /// A simple bitmap tracking which blocks are allocated and which are free.
    bitmap: &'a Bitmap,
    /// The number of blocks the device actually has, at most `NUM_BLOCKS`.
    cap: usize,
}

impl<'a> NextAvailableAllocation<'a> {
    pub fn new(bitmap: &'a Bitmap, start: BlockNumber, cap: usize) -> Self {
        Self {
            marker: usize::from(start),
            bitmap,
            cap: cap.min(NUM_BLOCKS),
        }
    }
}

impl Iterator for NextAvailableAllocation<'_> {
    type Item = BlockNumber;

    fn next(&mut self) -> Option<Self::Item> {
        while self.marker < self.cap {
            let candidate = self.marker as BlockNumber;
            self.marker += 1;
            if let State::Free = self.bitmap.get(candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_read_and_write_values_to_bitmap() {
        let mut bmp = Bitmap::new();

        bmp.set_reserved(2);

        assert_eq!(bmp.get(0), State::Free);
        assert_eq!(bmp.get(2), State::Used);
    }

    #[test]
    fn can_set_values_at_ends_of_bitmap() {
        let mut bmp = Bitmap::new();

        bmp.set_reserved(0);
        bmp.set_reserved((NUM_BLOCKS - 1) as BlockNumber);

        assert_eq!(bmp.get(0), State::Used);
        assert_eq!(bmp.get((NUM_BLOCKS - 1) as BlockNumber), State::Used);
    }

    #[test]
    fn blocks_past_the_bitmap_read_as_used() {
        let bmp = Bitmap::new();
        assert_eq!(bmp.get(NUM_BLOCKS as BlockNumber), State::Used);
    }

    #[test]
    fn can_toggle_block_between_free_and_used() {
        let mut bmp = Bitmap::new();

        bmp.set_reserved(10);
        bmp.set_reserved(11);
        assert_eq!(bmp.get(10), State::Used);

        bmp.set_free(10);
        assert_eq!(bmp.get(10), State::Free);
        // Neighbouring bits in the same word are untouched.
        assert_eq!(bmp.get(11), State::Used);
    }

    #[test]
    fn can_serialize_and_deserialize_state() {
        let mut bmp = Bitmap::new();
        bmp.set_reserved(10);
        bmp.set_reserved(11);
        bmp.set_reserved(700);

        assert_eq!(bmp.serialize().len(), BLOCK_SIZE);
        let read_bmp = Bitmap::parse(bmp.serialize()).unwrap();
        assert_eq!(read_bmp, bmp);
    }

    #[test]
    fn parse_rejects_short_buffers() {
        assert!(Bitmap::parse(&[0; BLOCK_SIZE - 1]).is_none());
    }

    #[test]
    fn free_count_respects_capacity() {
        let mut bmp = Bitmap::new();
        bmp.set_reserved(0);
        bmp.set_reserved(1);
        bmp.set_reserved(20);
        assert_eq!(bmp.free_count(8), 6);
        assert_eq!(bmp.free_count(NUM_BLOCKS), NUM_BLOCKS - 3);
    }

    #[test]
    fn allocation_skips_used_blocks_and_stops_at_cap() {
        let mut bmp = Bitmap::new();
        bmp.set_reserved(2);
        bmp.set_reserved(4);

        let found: Vec<BlockNumber> = NextAvailableAllocation::new(&bmp, 2, 7).collect();
        assert_eq!(found, vec![3, 5, 6]);
    }
}
