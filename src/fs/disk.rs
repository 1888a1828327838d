use std::fs::{File, OpenOptions};
use std::io;
use std::io::prelude::*;
use std::io::SeekFrom;
use std::path::Path;

use super::constants::BLOCK_SIZE;

/// Fixed-size block I/O as consumed by the file system.
///
/// Reads and writes move whole blocks and are reliable; a block index
/// outside `[0, size())` is a caller bug and panics. The mount counter
/// records whether a file system currently owns the device.
pub trait BlockDevice {
    /// Number of blocks on the device.
    fn size(&self) -> usize;

    fn mount(&mut self);

    fn unmount(&mut self);

    fn mounted(&self) -> bool;

    fn read(&mut self, blocknum: usize, data: &mut [u8; BLOCK_SIZE]);

    fn write(&mut self, blocknum: usize, data: &[u8; BLOCK_SIZE]);
}

/// Disk image backed by a regular file, one `BLOCK_SIZE` chunk per block.
pub struct FileDisk {
    file: File,
    blocks: usize,
    reads: usize,
    writes: usize,
    mounts: usize,
}

impl FileDisk {
    /// Open (creating if necessary) a disk image of `nblocks` blocks. The
    /// file is extended with zeros up to the full image size.
    pub fn open<P: AsRef<Path>>(path: P, nblocks: usize) -> io::Result<FileDisk> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.set_len((nblocks * BLOCK_SIZE) as u64)?;

        Ok(FileDisk {
            file,
            blocks: nblocks,
            reads: 0,
            writes: 0,
            mounts: 0,
        })
    }

    /// Number of block reads performed so far.
    pub fn reads(&self) -> usize {
        self.reads
    }

    /// Number of block writes performed so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn sanity_check(&self, blocknum: usize) {
        if blocknum >= self.blocks {
            panic!(
                "block number {} out of range (disk has {} blocks)",
                blocknum, self.blocks
            );
        }
    }
}

impl BlockDevice for FileDisk {
    fn size(&self) -> usize {
        self.blocks
    }

    fn mount(&mut self) {
        self.mounts += 1;
    }

    fn unmount(&mut self) {
        if self.mounts > 0 {
            self.mounts -= 1;
        }
    }

    fn mounted(&self) -> bool {
        self.mounts > 0
    }

    fn read(&mut self, blocknum: usize, data: &mut [u8; BLOCK_SIZE]) {
        self.sanity_check(blocknum);
        self.file
            .seek(SeekFrom::Start((blocknum * BLOCK_SIZE) as u64))
            .expect("disk seek failed");
        self.file.read_exact(data).expect("disk read failed");
        self.reads += 1;
    }

    fn write(&mut self, blocknum: usize, data: &[u8; BLOCK_SIZE]) {
        self.sanity_check(blocknum);
        self.file
            .seek(SeekFrom::Start((blocknum * BLOCK_SIZE) as u64))
            .expect("disk seek failed");
        self.file.write_all(data).expect("disk write failed");
        self.writes += 1;
    }
}

/// Disk held entirely in memory. Same contract as `FileDisk`; used for
/// tests and scratch images.
pub struct MemDisk {
    data: Vec<u8>,
    blocks: usize,
    reads: usize,
    writes: usize,
    mounts: usize,
}

impl MemDisk {
    pub fn new(nblocks: usize) -> MemDisk {
        MemDisk {
            data: vec![0; nblocks * BLOCK_SIZE],
            blocks: nblocks,
            reads: 0,
            writes: 0,
            mounts: 0,
        }
    }

    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn writes(&self) -> usize {
        self.writes
    }

    fn sanity_check(&self, blocknum: usize) {
        if blocknum >= self.blocks {
            panic!(
                "block number {} out of range (disk has {} blocks)",
                blocknum, self.blocks
            );
        }
    }
}

impl BlockDevice for MemDisk {
    fn size(&self) -> usize {
        self.blocks
    }

    fn mount(&mut self) {
        self.mounts += 1;
    }

    fn unmount(&mut self) {
        if self.mounts > 0 {
            self.mounts -= 1;
        }
    }

    fn mounted(&self) -> bool {
        self.mounts > 0
    }

    fn read(&mut self, blocknum: usize, data: &mut [u8; BLOCK_SIZE]) {
        self.sanity_check(blocknum);
        let start = blocknum * BLOCK_SIZE;
        data.copy_from_slice(&self.data[start..start + BLOCK_SIZE]);
        self.reads += 1;
    }

    fn write(&mut self, blocknum: usize, data: &[u8; BLOCK_SIZE]) {
        self.sanity_check(blocknum);
        let start = blocknum * BLOCK_SIZE;
        self.data[start..start + BLOCK_SIZE].copy_from_slice(data);
        self.writes += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_disk_read_write() {
        let mut disk = MemDisk::new(5);
        let data = [3u8; BLOCK_SIZE];
        disk.write(1, &data);

        let mut data2 = [0u8; BLOCK_SIZE];
        disk.read(1, &mut data2);

        assert_eq!(data[..], data2[..]);
        assert_eq!(disk.reads(), 1);
        assert_eq!(disk.writes(), 1);
    }

    #[test]
    fn mount_counter() {
        let mut disk = MemDisk::new(5);
        assert!(!disk.mounted());
        disk.mount();
        assert!(disk.mounted());
        disk.unmount();
        assert!(!disk.mounted());
        // extra unmounts do not wrap around
        disk.unmount();
        assert!(!disk.mounted());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn read_past_end_panics() {
        let mut disk = MemDisk::new(5);
        let mut data = [0u8; BLOCK_SIZE];
        disk.read(5, &mut data);
    }

    #[test]
    fn file_disk_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.5");

        let mut disk = FileDisk::open(&path, 5).unwrap();
        assert_eq!(disk.size(), 5);
        let data = [7u8; BLOCK_SIZE];
        disk.write(2, &data);
        drop(disk);

        let mut disk = FileDisk::open(&path, 5).unwrap();
        let mut data2 = [0u8; BLOCK_SIZE];
        disk.read(2, &mut data2);
        assert_eq!(data[..], data2[..]);
    }
}
