// Layout parameters. These are fixed at build time and must agree between
// format and mount; the values are baked into every image this crate reads
// or writes.

pub const MAGIC_NUMBER: u32 = 0xf0f0_3410;
pub const BLOCK_SIZE: usize = 4096;
pub const POINTERS_PER_INODE: usize = 5;
pub const INODE_SIZE: usize = 32; // packed inode record, in bytes
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE;
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;

/// Upper bound on a single file: five direct blocks plus one indirect
/// block's worth of data pointers.
pub const MAX_FILE_SIZE: usize = (POINTERS_PER_INODE + POINTERS_PER_BLOCK) * BLOCK_SIZE;
