use thiserror::Error;

/// Reasons a mount can be refused. The device is handed back to the caller
/// alongside the error so it can still be inspected or reformatted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    #[error("device is already mounted")]
    AlreadyMounted,
    #[error("device of {0} blocks cannot hold a file system")]
    TooSmall(usize),
    #[error("bad magic number {0:#010x}")]
    BadMagicNumber(u32),
    #[error("superblock says {superblock} blocks, device has {device}")]
    BadBlockCount { superblock: u32, device: usize },
    #[error("superblock says {0} inode blocks, expected {1}")]
    BadInodeBlockCount(u32, u32),
    #[error("superblock says {0} inodes, expected {1}")]
    BadInodeCount(u32, u32),
}
