//! A small single-volume file system: a free-block bitmap in block 0, the home
//! directory in block 1, and every other block either a directory, an inode
//! with a flat list of direct data pointers, or file data.
#[macro_use]
extern crate log;

pub mod alloc;
pub mod config;
mod fs;
pub mod io;
pub mod layout;
mod volume;

pub use crate::config::{BLOCK_SIZE, MAX_FILE_SIZE, MAX_FNAME_SIZE, NUM_BLOCKS};
pub use crate::fs::{FileSys, FsError, Listing, Stat};
pub use crate::io::BlockNumber;
pub use crate::volume::{BlockStore, Volume};
