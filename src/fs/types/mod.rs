//! On-disk record types and their wire codec. Everything here is encoded
//! with bincode's fixed-width little-endian format, so the structs below
//! are the byte-exact image layout.

pub mod block;
pub mod inode;

pub use block::*;
pub use inode::*;
