use serde::{Deserialize, Serialize};
use serde_big_array::BigArray;

use super::inode::Inode;
use crate::fs::constants::*;

/// Block 0 of every image: the magic number plus the geometry that format
/// chose. Never rewritten after format.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Superblock {
    pub magic_number: u32,
    pub blocks: u32,
    pub inode_blocks: u32,
    pub inodes: u32,
}

impl Superblock {
    /// Geometry for a fresh image: one tenth of the disk, rounded up, goes
    /// to the inode table.
    pub fn for_disk(nblocks: usize) -> Superblock {
        let inode_blocks = (nblocks + 9) / 10;
        Superblock {
            magic_number: MAGIC_NUMBER,
            blocks: nblocks as u32,
            inode_blocks: inode_blocks as u32,
            inodes: (inode_blocks * INODES_PER_BLOCK) as u32,
        }
    }

    pub fn from_block(data: &[u8; BLOCK_SIZE]) -> Superblock {
        bincode::deserialize(&data[..]).expect("a block holds a superblock header")
    }

    /// Encode as a full block; bytes past the header are zero.
    pub fn to_block(&self) -> [u8; BLOCK_SIZE] {
        let mut data = [0u8; BLOCK_SIZE];
        bincode::serialize_into(&mut data[..], self).expect("a superblock header fits in a block");
        data
    }

    /// First data-region block; everything below it is reserved.
    pub fn data_start(&self) -> usize {
        1 + self.inode_blocks as usize
    }
}

/// An inode-table block: a packed array of records.
#[derive(Serialize, Deserialize, Copy, Clone)]
pub struct InodeBlock {
    #[serde(with = "BigArray")]
    pub inodes: [Inode; INODES_PER_BLOCK],
}

impl InodeBlock {
    pub fn from_block(data: &[u8; BLOCK_SIZE]) -> InodeBlock {
        bincode::deserialize(&data[..]).expect("an inode block is a packed record array")
    }

    pub fn to_block(&self) -> [u8; BLOCK_SIZE] {
        let mut data = [0u8; BLOCK_SIZE];
        bincode::serialize_into(&mut data[..], self).expect("an inode block fills one block");
        data
    }
}

/// A data-region block reinterpreted as an array of block pointers.
#[derive(Serialize, Deserialize, Copy, Clone)]
pub struct IndirectBlock {
    #[serde(with = "BigArray")]
    pub pointers: [u32; POINTERS_PER_BLOCK],
}

impl IndirectBlock {
    pub fn new() -> IndirectBlock {
        IndirectBlock {
            pointers: [0; POINTERS_PER_BLOCK],
        }
    }

    pub fn from_block(data: &[u8; BLOCK_SIZE]) -> IndirectBlock {
        bincode::deserialize(&data[..]).expect("an indirect block is a packed pointer array")
    }

    pub fn to_block(&self) -> [u8; BLOCK_SIZE] {
        let mut data = [0u8; BLOCK_SIZE];
        bincode::serialize_into(&mut data[..], self).expect("an indirect block fills one block");
        data
    }
}

impl Default for IndirectBlock {
    fn default() -> IndirectBlock {
        IndirectBlock::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn superblock_header_is_little_endian() {
        let sb = Superblock::for_disk(20);
        let data = sb.to_block();
        // magic 0xf0f03410, then blocks=20, inode_blocks=2, inodes=256
        assert_eq!(&data[0..4], &[0x10, 0x34, 0xf0, 0xf0]);
        assert_eq!(&data[4..8], &20u32.to_le_bytes());
        assert_eq!(&data[8..12], &2u32.to_le_bytes());
        assert_eq!(&data[12..16], &256u32.to_le_bytes());
        assert!(data[16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn superblock_round_trip() {
        let sb = Superblock::for_disk(200);
        assert_eq!(sb.inode_blocks, 20);
        assert_eq!(sb.inodes, 2560);
        assert_eq!(Superblock::from_block(&sb.to_block()), sb);
    }

    #[test]
    fn inode_block_slots_are_packed() {
        let mut table = InodeBlock {
            inodes: [Inode::default(); INODES_PER_BLOCK],
        };
        table.inodes[3] = Inode {
            valid: 1,
            size: 5,
            direct: [9, 0, 0, 0, 0],
            indirect: 0,
        };
        let data = table.to_block();
        let slot = &data[3 * INODE_SIZE..4 * INODE_SIZE];
        assert_eq!(Inode::from_slot(slot), table.inodes[3]);
    }

    #[test]
    fn indirect_block_round_trip() {
        let mut ind = IndirectBlock::new();
        ind.pointers[0] = 9;
        ind.pointers[POINTERS_PER_BLOCK - 1] = 19;
        let decoded = IndirectBlock::from_block(&ind.to_block());
        assert_eq!(decoded.pointers[0], 9);
        assert_eq!(decoded.pointers[POINTERS_PER_BLOCK - 1], 19);
        assert!(decoded.pointers[1..POINTERS_PER_BLOCK - 1].iter().all(|&p| p == 0));
    }
}
