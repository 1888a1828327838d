use serde::{Deserialize, Serialize};

use crate::fs::constants::*;

/// One packed 32-byte inode record as stored in the inode table. A zero
/// `valid` field means the slot is unused; zero pointers are unallocated.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Inode {
    pub valid: u32,
    pub size: u32,
    pub direct: [u32; POINTERS_PER_INODE],
    pub indirect: u32,
}

impl Inode {
    /// A freshly created inode: valid, zero length, no blocks.
    pub fn blank() -> Inode {
        Inode {
            valid: 1,
            ..Inode::default()
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid != 0
    }

    /// Decode the record stored in one 32-byte inode-table slot.
    pub fn from_slot(slot: &[u8]) -> Inode {
        bincode::deserialize(slot).expect("an inode slot holds a full record")
    }

    /// Encode this record into one 32-byte inode-table slot.
    pub fn to_slot(&self, slot: &mut [u8]) {
        bincode::serialize_into(slot, self).expect("an inode record fits its slot");
    }
}

/// Inode-table block holding inode `inumber`.
pub fn block_of_inode(inumber: usize) -> usize {
    1 + inumber / INODES_PER_BLOCK
}

/// Slot index of inode `inumber` within its table block.
pub fn slot_of_inode(inumber: usize) -> usize {
    inumber % INODES_PER_BLOCK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_exactly_one_slot() {
        let encoded = bincode::serialize(&Inode::blank()).unwrap();
        assert_eq!(encoded.len(), INODE_SIZE);
    }

    #[test]
    fn slot_round_trip() {
        let inode = Inode {
            valid: 1,
            size: 24576,
            direct: [3, 4, 5, 6, 7],
            indirect: 8,
        };
        let mut slot = [0u8; INODE_SIZE];
        inode.to_slot(&mut slot[..]);
        assert_eq!(Inode::from_slot(&slot[..]), inode);
    }

    #[test]
    fn table_index_math() {
        assert_eq!(block_of_inode(0), 1);
        assert_eq!(block_of_inode(INODES_PER_BLOCK - 1), 1);
        assert_eq!(block_of_inode(INODES_PER_BLOCK), 2);
        assert_eq!(slot_of_inode(INODES_PER_BLOCK + 3), 3);
    }
}
