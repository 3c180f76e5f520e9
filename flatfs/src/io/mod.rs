mod block;
mod diskemu;
mod memdisk;

pub use block::{BlockNumber, BlockStorage};
pub use diskemu::{FileBlockEmulator, FileBlockEmulatorBuilder};
pub use memdisk::MemoryDisk;
