//! In-memory ext2 image construction for tests.
//!
//! Builds a single-group filesystem with the same zerocopy structs the
//! library decodes, so the tests and the reader can never disagree about
//! the layout. The root directory always gets `.` and `..`; additional
//! root entries are serialized when the builder is turned into a device.

#![allow(dead_code)]

use ext2fs::{
    BlockGroupDescriptor, DirEntryRaw, EXT2_SUPER_MAGIC, FT_DIR, INCOMPAT_FILETYPE, Inode,
    MemBlockDevice, RO_COMPAT_LARGE_FILE, RO_COMPAT_SPARSE_SUPER, S_IFDIR, Superblock,
};
use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, FromZeros, IntoBytes};

fn align4(val: usize) -> usize {
    (val + 3) & !3
}

pub struct ImageBuilder {
    data: Vec<u8>,
    block_size: usize,
    inode_table: u32,
    root_block: u32,
    root_entries: Vec<(u32, u8, Vec<u8>)>,
    next_block: u32,
}

impl ImageBuilder {
    /// A single-group image: `blocks` blocks of `block_size` bytes and
    /// `inodes` inodes, with the dirent-type, sparse-superblock, and
    /// large-file features set.
    pub fn new(block_size: usize, blocks: u32, inodes: u32) -> Self {
        let data = vec![0u8; blocks as usize * block_size];

        let bgdt_block: u32 = if block_size == 1024 { 2 } else { 1 };
        let block_bitmap = bgdt_block + 1;
        let inode_table = block_bitmap + 2;
        let inode_table_blocks = (inodes as usize * 128).div_ceil(block_size) as u32;
        let root_block = inode_table + inode_table_blocks;

        let mut builder = Self {
            data,
            block_size,
            inode_table,
            root_block,
            root_entries: vec![(2, FT_DIR, b".".to_vec()), (2, FT_DIR, b"..".to_vec())],
            next_block: root_block + 1,
        };

        let mut sb = Superblock::new_zeroed();
        sb.inodes_count = inodes.into();
        sb.blocks_count = blocks.into();
        sb.blocks_per_group = blocks.into();
        sb.inodes_per_group = inodes.into();
        sb.log_block_size = ((block_size / 1024).trailing_zeros()).into();
        sb.magic = EXT2_SUPER_MAGIC.into();
        sb.rev_level = U32::new(1);
        sb.first_ino = U32::new(11);
        sb.inode_size = U16::new(128);
        sb.feature_incompat = INCOMPAT_FILETYPE.into();
        sb.feature_ro_compat = (RO_COMPAT_SPARSE_SUPER | RO_COMPAT_LARGE_FILE).into();
        builder.data[1024..2048].copy_from_slice(sb.as_bytes());

        let mut bgd = BlockGroupDescriptor::new_zeroed();
        bgd.block_bitmap = block_bitmap.into();
        bgd.inode_bitmap = (block_bitmap + 1).into();
        bgd.inode_table = inode_table.into();
        let off = bgdt_block as usize * block_size;
        builder.data[off..off + 32].copy_from_slice(bgd.as_bytes());

        let mut root = make_inode(S_IFDIR | 0o755, block_size as u64, &[root_block]);
        root.links_count = U16::new(2);
        builder.set_inode(2, &root);

        builder
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn root_block(&self) -> u32 {
        self.root_block
    }

    /// Hand out the next unused data block.
    pub fn alloc_block(&mut self) -> u32 {
        let block = self.next_block;
        self.next_block += 1;
        block
    }

    /// Add an entry to the root directory.
    pub fn add_root_entry(&mut self, name: &[u8], ino: u32, file_type: u8) {
        self.root_entries.push((ino, file_type, name.to_vec()));
    }

    pub fn set_inode(&mut self, ino: u32, inode: &Inode) {
        let off = self.inode_table as usize * self.block_size + (ino as usize - 1) * 128;
        self.data[off..off + 128].copy_from_slice(inode.as_bytes());
    }

    pub fn write_block(&mut self, block: u32, bytes: &[u8]) {
        let off = block as usize * self.block_size;
        self.data[off..off + bytes.len()].copy_from_slice(bytes);
    }

    pub fn fill_block(&mut self, block: u32, byte: u8) {
        let off = block as usize * self.block_size;
        self.data[off..off + self.block_size].fill(byte);
    }

    /// Overwrite a single byte within a block.
    pub fn set_byte(&mut self, block: u32, offset: usize, value: u8) {
        self.data[block as usize * self.block_size + offset] = value;
    }

    /// Write one little-endian pointer into an indirect block.
    pub fn set_ptr(&mut self, block: u32, index: u32, value: u32) {
        let off = block as usize * self.block_size + index as usize * 4;
        self.data[off..off + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Write a raw directory entry; returns the position after it.
    pub fn dirent(
        &mut self,
        block: u32,
        pos: usize,
        ino: u32,
        rec_len: u16,
        file_type: u8,
        name: &[u8],
    ) -> usize {
        let mut raw = DirEntryRaw::new_zeroed();
        raw.inode = ino.into();
        raw.rec_len = rec_len.into();
        raw.name_len = name.len() as u8;
        raw.file_type = file_type;
        let off = block as usize * self.block_size + pos;
        self.data[off..off + 8].copy_from_slice(raw.as_bytes());
        self.data[off + 8..off + 8 + name.len()].copy_from_slice(name);
        pos + rec_len as usize
    }

    pub fn patch_superblock(&mut self, patch: impl FnOnce(&mut Superblock)) {
        let sb = Superblock::mut_from_bytes(&mut self.data[1024..2048]).unwrap();
        patch(sb);
    }

    pub fn patch_bgd(&mut self, group: usize, patch: impl FnOnce(&mut BlockGroupDescriptor)) {
        let bgdt_block: usize = if self.block_size == 1024 { 2 } else { 1 };
        let off = bgdt_block * self.block_size + group * 32;
        let bgd = BlockGroupDescriptor::mut_from_bytes(&mut self.data[off..off + 32]).unwrap();
        patch(bgd);
    }

    pub fn patch_inode(&mut self, ino: u32, patch: impl FnOnce(&mut Inode)) {
        let off = self.inode_table as usize * self.block_size + (ino as usize - 1) * 128;
        let inode = Inode::mut_from_bytes(&mut self.data[off..off + 128]).unwrap();
        patch(inode);
    }

    /// Serialize the root directory and produce the device.
    pub fn device(mut self) -> MemBlockDevice {
        let entries = std::mem::take(&mut self.root_entries);
        let block = self.root_block;
        let mut pos = 0;
        for (i, (ino, file_type, name)) in entries.iter().enumerate() {
            let rec_len = if i == entries.len() - 1 {
                self.block_size - pos
            } else {
                align4(8 + name.len())
            };
            pos = self.dirent(block, pos, *ino, rec_len as u16, *file_type, name);
        }
        MemBlockDevice::new(self.data)
    }
}

/// An inode with the given mode, logical size, and leading block pointers.
pub fn make_inode(mode: u16, size: u64, blocks: &[u32]) -> Inode {
    let mut inode = Inode::new_zeroed();
    inode.mode = mode.into();
    inode.size_lo = ((size & 0xffff_ffff) as u32).into();
    inode.size_hi = ((size >> 32) as u32).into();
    inode.links_count = U16::new(1);
    for (i, block) in blocks.iter().enumerate() {
        inode.block[i] = (*block).into();
    }
    inode
}
