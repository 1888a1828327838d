//! Shared helpers for the integration suites.
#![allow(unused)]

use sfs::prelude::*;
use sfs::FileSystem;

/// Format a fresh in-memory disk and mount it.
pub fn mounted_mem_fs(nblocks: usize) -> FileSystem<MemDisk> {
    let mut disk = MemDisk::new(nblocks);
    assert!(FileSystem::format(&mut disk));
    FileSystem::mount(disk)
        .map_err(|(_, e)| e)
        .expect("mounting a freshly formatted disk")
}

/// Deterministic byte pattern; different seeds give different streams.
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Decode the superblock straight off the device.
pub fn read_superblock<D: BlockDevice>(disk: &mut D) -> Superblock {
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read(0, &mut buf);
    Superblock::from_block(&buf)
}

/// Decode one inode record straight off the device.
pub fn read_inode_record<D: BlockDevice>(disk: &mut D, inumber: usize) -> Inode {
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read(block_of_inode(inumber), &mut buf);
    let slot = slot_of_inode(inumber) * INODE_SIZE;
    Inode::from_slot(&buf[slot..slot + INODE_SIZE])
}

/// Decode a pointer block straight off the device.
pub fn read_indirect_block<D: BlockDevice>(disk: &mut D, block: usize) -> IndirectBlock {
    let mut buf = [0u8; BLOCK_SIZE];
    disk.read(block, &mut buf);
    IndirectBlock::from_block(&buf)
}
