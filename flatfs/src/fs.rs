use std::fmt;

use crate::config::{BLOCK_SIZE, HOME_DIR, MAX_FILE_SIZE, MAX_FNAME_SIZE};
use crate::io::BlockNumber;
use crate::layout::{Block, DirBlock, Inode, Node};
use crate::volume::BlockStore;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FsError {
    #[error("file is not a directory")]
    NotADirectory,
    #[error("file is a directory")]
    IsADirectory,
    #[error("file exists")]
    AlreadyExists,
    #[error("file does not exist")]
    NotFound,
    #[error("file name is too long")]
    NameTooLong,
    #[error("file name contains a NUL byte")]
    InvalidName,
    #[error("disk is full")]
    DiskFull,
    #[error("directory is full")]
    DirectoryFull,
    #[error("directory is not empty")]
    NotEmpty,
    #[error("append exceeds maximum file size")]
    AppendTooLarge,
    #[error("block {0} holds neither a directory nor an inode")]
    Corrupt(BlockNumber),
    #[error("medium does not hold a formatted volume")]
    Unformatted,
    #[error("invalid block number {0}")]
    InvalidBlock(BlockNumber),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl FsError {
    /// Faults come from the environment or a damaged volume rather than from
    /// the request, so there is nothing meaningful to report back to a client.
    pub fn is_fault(&self) -> bool {
        matches!(
            self,
            FsError::Corrupt(_) | FsError::Unformatted | FsError::InvalidBlock(_) | FsError::Io(_)
        )
    }
}

/// One line of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub name: String,
    pub is_dir: bool,
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dir {
            write!(f, "{}/", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stat {
    Directory {
        name: String,
        block: BlockNumber,
        entries: usize,
    },
    File {
        block: BlockNumber,
        size: usize,
        /// Inode plus data blocks.
        blocks: usize,
        /// 0 for an empty file.
        first_block: BlockNumber,
    },
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Directory {
                name,
                block,
                entries,
            } => {
                writeln!(f, "Directory name: {}/", name)?;
                writeln!(f, "Directory block: {}", block)?;
                writeln!(f, "Entries: {}", entries)
            }
            Stat::File {
                block,
                size,
                blocks,
                first_block,
            } => {
                writeln!(f, "Inode block: {}", block)?;
                writeln!(f, "Bytes in file: {}", size)?;
                writeln!(f, "Number of blocks: {}", blocks)?;
                writeln!(f, "First block: {}", first_block)
            }
        }
    }
}

/// A directory entry resolved against the current directory.
struct Found {
    /// The current directory as read for the lookup.
    parent: DirBlock,
    index: usize,
    block: BlockNumber,
}

/// Single-level file system over a [`BlockStore`]. Every operation works on
/// an entry of the current directory; only `cd` and `home` move the cursor.
///
/// Each operation validates fully before its first write, so a failed request
/// leaves the volume untouched. The one exception is an `append` that runs out
/// of blocks part way, which keeps the bytes it managed to store.
pub struct FileSys<S: BlockStore> {
    store: S,
    cwd: BlockNumber,
}

impl<S: BlockStore> FileSys<S> {
    /// Takes over a formatted store with the cursor at the home directory.
    pub fn mount(store: S) -> Self {
        FileSys {
            store,
            cwd: HOME_DIR,
        }
    }

    pub fn unmount(self) -> S {
        self.store
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Block number of the current directory.
    pub fn cwd(&self) -> BlockNumber {
        self.cwd
    }

    pub fn mkdir(&mut self, name: &str) -> Result<(), FsError> {
        let blocknr = self.link(name, &DirBlock::new().encode())?;
        debug!("mkdir {} -> block {}", name, blocknr);
        Ok(())
    }

    pub fn cd(&mut self, name: &str) -> Result<(), FsError> {
        let found = self.lookup(name)?;
        self.expect_dir(found.block)?;
        self.cwd = found.block;
        debug!("cd {} -> block {}", name, found.block);
        Ok(())
    }

    pub fn home(&mut self) {
        self.cwd = HOME_DIR;
    }

    pub fn rmdir(&mut self, name: &str) -> Result<(), FsError> {
        let mut found = self.lookup(name)?;
        let target = self.expect_dir(found.block)?;
        if !target.is_empty() {
            return Err(FsError::NotEmpty);
        }

        found.parent.remove(found.index);
        self.store.write_block(self.cwd, &found.parent.encode())?;
        self.store.reclaim(found.block)?;
        debug!("rmdir {} freed block {}", name, found.block);
        Ok(())
    }

    pub fn ls(&mut self) -> Result<Vec<Listing>, FsError> {
        let dir = self.current_dir()?;
        let mut listing = Vec::with_capacity(dir.len());
        for entry in dir.entries() {
            let is_dir = match self.node(entry.block())? {
                Node::Directory(_) => true,
                Node::File(_) => false,
                Node::Invalid => return Err(FsError::Corrupt(entry.block())),
            };
            listing.push(Listing {
                name: entry.name_lossy(),
                is_dir,
            });
        }
        Ok(listing)
    }

    pub fn create(&mut self, name: &str) -> Result<(), FsError> {
        let blocknr = self.link(name, &Inode::new().encode())?;
        debug!("create {} -> inode {}", name, blocknr);
        Ok(())
    }

    /// Appends `data` to the end of the file, filling the partially used tail
    /// block before taking new ones.
    pub fn append(&mut self, name: &str, data: &[u8]) -> Result<(), FsError> {
        let found = self.lookup(name)?;
        let mut inode = self.expect_file(found.block)?;
        if inode.size() + data.len() > MAX_FILE_SIZE {
            return Err(FsError::AppendTooLarge);
        }

        let mut written = 0;
        while written < data.len() {
            let offset = inode.size();
            let index = offset / BLOCK_SIZE;
            let within = offset % BLOCK_SIZE;

            let (blocknr, mut block) = if within == 0 {
                match self.store.allocate()? {
                    Some(blocknr) => {
                        inode.set_block(index, blocknr);
                        (blocknr, [0; BLOCK_SIZE])
                    }
                    None => {
                        if written > 0 {
                            // Keep what already reached the disk.
                            self.store.write_block(found.block, &inode.encode())?;
                            warn!(
                                "append to {} stopped after {} of {} bytes",
                                name,
                                written,
                                data.len()
                            );
                        }
                        return Err(FsError::DiskFull);
                    }
                }
            } else {
                let blocknr = inode.block(index);
                (blocknr, self.store.read_block(blocknr)?)
            };

            let count = (BLOCK_SIZE - within).min(data.len() - written);
            block[within..within + count].copy_from_slice(&data[written..written + count]);
            self.store.write_block(blocknr, &block)?;

            inode.set_size(offset + count);
            written += count;
        }

        self.store.write_block(found.block, &inode.encode())?;
        debug!("append {} bytes to {}, size now {}", written, name, inode.size());
        Ok(())
    }

    pub fn cat(&mut self, name: &str) -> Result<Vec<u8>, FsError> {
        self.read(name, MAX_FILE_SIZE)
    }

    /// The first `n` bytes of the file, or the whole file when it is shorter.
    pub fn head(&mut self, name: &str, n: usize) -> Result<Vec<u8>, FsError> {
        self.read(name, n)
    }

    pub fn rm(&mut self, name: &str) -> Result<(), FsError> {
        let mut found = self.lookup(name)?;
        let inode = self.expect_file(found.block)?;

        for blocknr in inode.data_blocks() {
            self.store.reclaim(blocknr)?;
        }
        self.store.reclaim(found.block)?;

        found.parent.remove(found.index);
        self.store.write_block(self.cwd, &found.parent.encode())?;
        debug!("rm {} freed {} blocks", name, inode.block_count());
        Ok(())
    }

    pub fn stat(&mut self, name: &str) -> Result<Stat, FsError> {
        let found = self.lookup(name)?;
        match self.node(found.block)? {
            Node::Directory(dir) => Ok(Stat::Directory {
                name: name.to_string(),
                block: found.block,
                entries: dir.len(),
            }),
            Node::File(inode) => Ok(Stat::File {
                block: found.block,
                size: inode.size(),
                blocks: inode.block_count(),
                first_block: inode.first_block(),
            }),
            Node::Invalid => Err(FsError::Corrupt(found.block)),
        }
    }

    fn read(&mut self, name: &str, limit: usize) -> Result<Vec<u8>, FsError> {
        let found = self.lookup(name)?;
        let inode = self.expect_file(found.block)?;

        let len = inode.size().min(limit);
        let mut content = Vec::with_capacity(len);
        let mut index = 0;
        while content.len() < len {
            let blocknr = inode.block(index);
            if blocknr == 0 {
                return Err(FsError::Corrupt(found.block));
            }
            let block = self.store.read_block(blocknr)?;
            let count = (len - content.len()).min(BLOCK_SIZE);
            content.extend_from_slice(&block[..count]);
            index += 1;
        }
        Ok(content)
    }

    /// Allocates a block holding `contents` and links it into the current
    /// directory under `name`. The child is written before the parent.
    fn link(&mut self, name: &str, contents: &Block) -> Result<BlockNumber, FsError> {
        // Stored names end at the first NUL, so such a name could never be found again.
        if name.contains('\0') {
            return Err(FsError::InvalidName);
        }
        if name.len() > MAX_FNAME_SIZE {
            return Err(FsError::NameTooLong);
        }
        let mut dir = self.current_dir()?;
        if dir.find(name).is_some() {
            return Err(FsError::AlreadyExists);
        }
        if dir.is_full() {
            return Err(FsError::DirectoryFull);
        }
        let blocknr = self.store.allocate()?.ok_or(FsError::DiskFull)?;

        self.store.write_block(blocknr, contents)?;
        dir.push(name, blocknr)?;
        self.store.write_block(self.cwd, &dir.encode())?;
        Ok(blocknr)
    }

    fn node(&mut self, blocknr: BlockNumber) -> Result<Node, FsError> {
        Ok(Node::decode(&self.store.read_block(blocknr)?))
    }

    fn current_dir(&mut self) -> Result<DirBlock, FsError> {
        match self.node(self.cwd)? {
            Node::Directory(dir) => Ok(dir),
            _ => Err(FsError::Corrupt(self.cwd)),
        }
    }

    fn lookup(&mut self, name: &str) -> Result<Found, FsError> {
        let parent = self.current_dir()?;
        let (index, entry) = parent.find(name).ok_or(FsError::NotFound)?;
        Ok(Found {
            parent,
            index,
            block: entry.block(),
        })
    }

    fn expect_dir(&mut self, blocknr: BlockNumber) -> Result<DirBlock, FsError> {
        match self.node(blocknr)? {
            Node::Directory(dir) => Ok(dir),
            Node::File(_) => Err(FsError::NotADirectory),
            Node::Invalid => Err(FsError::Corrupt(blocknr)),
        }
    }

    fn expect_file(&mut self, blocknr: BlockNumber) -> Result<Inode, FsError> {
        match self.node(blocknr)? {
            Node::File(inode) => Ok(inode),
            Node::Directory(_) => Err(FsError::IsADirectory),
            Node::Invalid => Err(FsError::Corrupt(blocknr)),
        }
    }
}
