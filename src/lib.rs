//! sfs is a small inode-based file system layered over a raw image of
//! fixed-size blocks.
//!
//! Image layout:
//! - block 0: superblock (magic number plus geometry)
//! - blocks 1..1+InodeBlocks: the inode table, one tenth of the disk
//! - remaining blocks: file data and indirect pointer blocks
//!
//! Files are anonymous and addressed by inumber. Each inode carries five
//! direct block pointers and one single-indirect block. Free space is
//! tracked only in memory, as a bitmap rebuilt from the inode graph at
//! mount time.
//!
//! The `FileSystem` handle returned by `mount` owns its block device for
//! the life of the mount; the `BlockDevice` trait has file-backed
//! (`FileDisk`) and in-memory (`MemDisk`) implementations. All on-disk
//! integers are little-endian.

pub mod fs;

pub use fs::prelude;
pub use fs::FileSystem;
