//! The file system proper: format/mount/debug plus the per-inode
//! operations. A mounted `FileSystem` owns its block device and the free
//! map; dropping or unmounting the handle releases both.

pub mod constants;
pub mod disk;
pub mod error;
pub mod free_map;
pub mod types;

use log::{debug, warn};

use self::constants::*;
use self::disk::BlockDevice;
use self::error::FsError;
use self::free_map::FreeMap;
use self::types::*;

pub struct FileSystem<D: BlockDevice> {
    disk: D,
    blocks: usize,
    inode_blocks: usize,
    inodes: usize,
    free_map: FreeMap,
}

impl<D: BlockDevice> FileSystem<D> {
    /// Write a fresh, empty file system onto `disk`: superblock first, then
    /// every remaining block zeroed. Refuses a mounted device and anything
    /// too small to hold the superblock plus one inode-table block.
    pub fn format(disk: &mut D) -> bool {
        if disk.mounted() || disk.size() < 2 {
            return false;
        }

        let superblock = Superblock::for_disk(disk.size());
        disk.write(0, &superblock.to_block());

        let zeroes = [0u8; BLOCK_SIZE];
        for i in 1..disk.size() {
            disk.write(i, &zeroes);
        }

        true
    }

    /// Validate the superblock and take ownership of the device. On failure
    /// the device is handed back untouched alongside the reason.
    pub fn mount(mut disk: D) -> Result<FileSystem<D>, (D, FsError)> {
        if disk.mounted() {
            return Err((disk, FsError::AlreadyMounted));
        }
        let disk_size = disk.size();
        if disk_size < 2 {
            return Err((disk, FsError::TooSmall(disk_size)));
        }

        let mut buf = [0u8; BLOCK_SIZE];
        disk.read(0, &mut buf);
        let superblock = Superblock::from_block(&buf);

        let expected = Superblock::for_disk(disk.size());
        if superblock.magic_number != MAGIC_NUMBER {
            return Err((disk, FsError::BadMagicNumber(superblock.magic_number)));
        }
        if superblock.blocks != expected.blocks {
            return Err((
                disk,
                FsError::BadBlockCount {
                    superblock: superblock.blocks,
                    device: expected.blocks as usize,
                },
            ));
        }
        if superblock.inode_blocks != expected.inode_blocks {
            return Err((
                disk,
                FsError::BadInodeBlockCount(superblock.inode_blocks, expected.inode_blocks),
            ));
        }
        let expected_inodes = superblock.inode_blocks * INODES_PER_BLOCK as u32;
        if superblock.inodes != expected_inodes {
            return Err((
                disk,
                FsError::BadInodeCount(superblock.inodes, expected_inodes),
            ));
        }

        disk.mount();
        let free_map = FreeMap::rebuild(&mut disk, &superblock);
        debug!(
            "mounted image: {} blocks, {} inode blocks, {} inodes, {} free blocks",
            superblock.blocks,
            superblock.inode_blocks,
            superblock.inodes,
            free_map.free_blocks()
        );

        Ok(FileSystem {
            blocks: superblock.blocks as usize,
            inode_blocks: superblock.inode_blocks as usize,
            inodes: superblock.inodes as usize,
            free_map,
            disk,
        })
    }

    /// Release the device; the free map dies with the handle.
    pub fn unmount(mut self) -> D {
        self.disk.unmount();
        self.disk
    }

    /// Borrow the underlying device, e.g. for inspection while mounted.
    pub fn disk_mut(&mut self) -> &mut D {
        &mut self.disk
    }

    /// Dump the superblock and every valid inode to stdout. Works on any
    /// disk, mounted or not.
    pub fn debug(disk: &mut D) {
        if disk.size() == 0 {
            println!("SuperBlock:");
            println!("    magic number is invalid");
            return;
        }

        let mut buf = [0u8; BLOCK_SIZE];
        disk.read(0, &mut buf);
        let superblock = Superblock::from_block(&buf);

        println!("SuperBlock:");
        println!(
            "    magic number is {}",
            if superblock.magic_number == MAGIC_NUMBER {
                "valid"
            } else {
                "invalid"
            }
        );
        println!("    {} blocks", superblock.blocks);
        println!("    {} inode blocks", superblock.inode_blocks);
        println!("    {} inodes", superblock.inodes);

        // A garbage superblock can claim any table size; stay on-device.
        let table_end = superblock.data_start().min(disk.size());
        for i in 1..table_end {
            disk.read(i, &mut buf);
            let table = InodeBlock::from_block(&buf);
            for (j, inode) in table.inodes.iter().enumerate() {
                if !inode.is_valid() {
                    continue;
                }
                println!("Inode {}:", (i - 1) * INODES_PER_BLOCK + j);
                println!("    size: {} bytes", inode.size);
                let direct: Vec<String> = inode
                    .direct
                    .iter()
                    .filter(|&&ptr| ptr != 0)
                    .map(|ptr| ptr.to_string())
                    .collect();
                println!("    direct blocks: {}", direct.join(" "));
                if inode.indirect != 0 {
                    println!("    indirect block: {}", inode.indirect);
                    if (inode.indirect as usize) < disk.size() {
                        let mut ind_buf = [0u8; BLOCK_SIZE];
                        disk.read(inode.indirect as usize, &mut ind_buf);
                        let ind = IndirectBlock::from_block(&ind_buf);
                        let pointers: Vec<String> = ind
                            .pointers
                            .iter()
                            .filter(|&&ptr| ptr != 0)
                            .map(|ptr| ptr.to_string())
                            .collect();
                        println!("    indirect data blocks: {}", pointers.join(" "));
                    }
                }
            }
        }
    }

    /// Claim the first invalid slot in the inode table. Returns the new
    /// inumber, or -1 when every slot is in use.
    pub fn create(&mut self) -> i64 {
        let mut buf = [0u8; BLOCK_SIZE];
        for i in 1..=self.inode_blocks {
            self.disk.read(i, &mut buf);
            let mut table = InodeBlock::from_block(&buf);
            for j in 0..INODES_PER_BLOCK {
                if table.inodes[j].is_valid() {
                    continue;
                }
                table.inodes[j] = Inode::blank();
                self.disk.write(i, &table.to_block());
                return ((i - 1) * INODES_PER_BLOCK + j) as i64;
            }
        }
        -1
    }

    /// Release every block the inode references, then invalidate it.
    pub fn remove(&mut self, inumber: usize) -> bool {
        let inode = match self.load_inode(inumber) {
            Some(inode) if inode.is_valid() => inode,
            _ => return false,
        };

        for k in 0..POINTERS_PER_INODE {
            self.release(inode.direct[k]);
        }

        if inode.indirect != 0 {
            // The pointer block has to be read before anything is released;
            // a released block may be reallocated and overwritten.
            if (inode.indirect as usize) < self.blocks {
                let mut buf = [0u8; BLOCK_SIZE];
                self.disk.read(inode.indirect as usize, &mut buf);
                let ind = IndirectBlock::from_block(&buf);
                for k in 0..POINTERS_PER_BLOCK {
                    self.release(ind.pointers[k]);
                }
            }
            self.release(inode.indirect);
        }

        self.save_inode(inumber, &Inode::default())
    }

    /// Logical size of the file in bytes, or -1 for a bad or unused
    /// inumber.
    pub fn stat(&mut self, inumber: usize) -> i64 {
        match self.load_inode(inumber) {
            Some(inode) if inode.is_valid() => inode.size as i64,
            _ => -1,
        }
    }

    /// Copy up to `length` bytes starting at byte `offset` into `data`.
    /// Returns the bytes copied (0 at end of file), or -1 for a bad
    /// inumber or an offset past the end.
    pub fn read(&mut self, inumber: usize, data: &mut [u8], length: usize, offset: usize) -> i64 {
        let inode = match self.load_inode(inumber) {
            Some(inode) if inode.is_valid() => inode,
            _ => return -1,
        };

        // A corrupt record could claim more bytes than the pointer layout
        // can address; never walk past it.
        let size = (inode.size as usize).min(MAX_FILE_SIZE);
        if offset > size {
            return -1;
        }
        let length = length.min(data.len()).min(size - offset);
        if length == 0 {
            return 0;
        }

        let start_block = offset / BLOCK_SIZE;
        let end_block = (offset + length - 1) / BLOCK_SIZE;

        // The pointer block is fetched once, and only when the range
        // actually extends past the direct pointers.
        let mut indirect = IndirectBlock::new();
        if end_block >= POINTERS_PER_INODE {
            if inode.indirect == 0 || inode.indirect as usize >= self.blocks {
                warn!(
                    "inode {} claims {} bytes but has no usable indirect block",
                    inumber, inode.size
                );
            } else {
                let mut buf = [0u8; BLOCK_SIZE];
                self.disk.read(inode.indirect as usize, &mut buf);
                indirect = IndirectBlock::from_block(&buf);
            }
        }

        let mut bytes_read = 0;
        let mut buf = [0u8; BLOCK_SIZE];
        for i in start_block..=end_block {
            let ptr = if i < POINTERS_PER_INODE {
                inode.direct[i]
            } else {
                indirect.pointers[i - POINTERS_PER_INODE]
            };
            if ptr == 0 || ptr as usize >= self.blocks {
                // The size said there was data here but no block backs it;
                // hand back what was actually present.
                warn!("inode {} has no block for byte offset {}", inumber, i * BLOCK_SIZE);
                break;
            }
            self.disk.read(ptr as usize, &mut buf);

            let from = if i == start_block { offset % BLOCK_SIZE } else { 0 };
            let to = (offset + length - i * BLOCK_SIZE).min(BLOCK_SIZE);
            data[bytes_read..bytes_read + (to - from)].copy_from_slice(&buf[from..to]);
            bytes_read += to - from;
        }

        bytes_read as i64
    }

    /// Copy up to `length` bytes from `data` into the file starting at byte
    /// `offset`, allocating direct and indirect blocks as needed. Returns
    /// the bytes actually written (short when the disk fills), or -1 for a
    /// bad inumber or an offset past the end.
    pub fn write(&mut self, inumber: usize, data: &[u8], length: usize, offset: usize) -> i64 {
        let mut inode = match self.load_inode(inumber) {
            Some(inode) if inode.is_valid() => inode,
            _ => return -1,
        };

        if offset > inode.size as usize {
            return -1;
        }
        let mut length = length.min(data.len());
        if offset + length > MAX_FILE_SIZE {
            length = MAX_FILE_SIZE - offset;
        }
        if length == 0 {
            return 0;
        }

        let start_block = offset / BLOCK_SIZE;
        let end_block = (offset + length - 1) / BLOCK_SIZE;

        let mut indirect = IndirectBlock::new();
        let mut indirect_loaded = false;
        let mut indirect_dirty = false;

        let mut bytes_written = 0;
        let mut buf = [0u8; BLOCK_SIZE];
        for i in start_block..=end_block {
            // Resolve the target block, allocating whatever is missing.
            let target = if i < POINTERS_PER_INODE {
                if inode.direct[i] == 0 {
                    match self.free_map.allocate(&mut self.disk) {
                        Some(block) => inode.direct[i] = block as u32,
                        None => break,
                    }
                }
                inode.direct[i]
            } else {
                if inode.indirect == 0 {
                    match self.free_map.allocate(&mut self.disk) {
                        Some(block) => {
                            inode.indirect = block as u32;
                            // Freshly allocated blocks are zeroed on disk,
                            // so the in-memory copy is already current.
                            indirect_loaded = true;
                            indirect_dirty = true;
                        }
                        None => break,
                    }
                }
                if !indirect_loaded {
                    if inode.indirect as usize >= self.blocks {
                        warn!("inode {} has an out-of-range indirect block", inumber);
                        break;
                    }
                    self.disk.read(inode.indirect as usize, &mut buf);
                    indirect = IndirectBlock::from_block(&buf);
                    indirect_loaded = true;
                }
                let k = i - POINTERS_PER_INODE;
                if indirect.pointers[k] == 0 {
                    match self.free_map.allocate(&mut self.disk) {
                        Some(block) => {
                            indirect.pointers[k] = block as u32;
                            indirect_dirty = true;
                        }
                        None => break,
                    }
                }
                indirect.pointers[k]
            };

            let from = if i == start_block { offset % BLOCK_SIZE } else { 0 };
            let to = (offset + length - i * BLOCK_SIZE).min(BLOCK_SIZE);
            if to - from < BLOCK_SIZE {
                self.disk.read(target as usize, &mut buf);
            }
            buf[from..to].copy_from_slice(&data[bytes_written..bytes_written + (to - from)]);
            self.disk.write(target as usize, &buf);
            bytes_written += to - from;
        }

        // A short write still has to leave every block it allocated
        // reachable from the persisted inode.
        if offset + bytes_written > inode.size as usize {
            inode.size = (offset + bytes_written) as u32;
        }
        if indirect_dirty {
            self.disk.write(inode.indirect as usize, &indirect.to_block());
        }
        self.save_inode(inumber, &inode);

        bytes_written as i64
    }

    fn load_inode(&mut self, inumber: usize) -> Option<Inode> {
        if inumber >= self.inodes {
            return None;
        }
        let mut buf = [0u8; BLOCK_SIZE];
        self.disk.read(block_of_inode(inumber), &mut buf);
        let slot = slot_of_inode(inumber) * INODE_SIZE;
        Some(Inode::from_slot(&buf[slot..slot + INODE_SIZE]))
    }

    fn save_inode(&mut self, inumber: usize, inode: &Inode) -> bool {
        if inumber >= self.inodes {
            return false;
        }
        let block = block_of_inode(inumber);
        let mut buf = [0u8; BLOCK_SIZE];
        self.disk.read(block, &mut buf);
        let slot = slot_of_inode(inumber) * INODE_SIZE;
        inode.to_slot(&mut buf[slot..slot + INODE_SIZE]);
        self.disk.write(block, &buf);
        true
    }

    /// Hand a block back to the free map, skipping pointers an intact image
    /// could not contain.
    fn release(&mut self, ptr: u32) {
        if ptr == 0 {
            return;
        }
        let block = ptr as usize;
        if block <= self.inode_blocks || block >= self.blocks {
            warn!("not releasing out-of-range block pointer {}", ptr);
            return;
        }
        self.free_map.release(block);
    }
}

pub mod prelude {
    pub use super::constants::*;
    pub use super::disk::{BlockDevice, FileDisk, MemDisk};
    pub use super::error::FsError;
    pub use super::types::*;
}
