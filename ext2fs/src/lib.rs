//! Read-only ext2 filesystem layer over an abstract block device.
//!
//! [`Ext2Fs::mount`] validates an image and produces a handle that borrows
//! the device for its lifetime. The handle resolves paths from the root
//! inode, enumerates directories, and reads arbitrary byte ranges out of
//! file inodes through the classic direct / indirect block-pointer tree.
//! Sparse regions (zero block pointers) read back as zeros.
//!
//! Writing, journal replay, extents, and hashed directories are out of
//! scope; unknown required feature bits make the mount fail, and unknown
//! read-only-compatible bits only block write-intent mounts.

pub mod block;
mod dir;
mod error;
mod file;
mod structs;

pub use block::{BlockDevice, BlockError, FileBlockDevice, MemBlockDevice, SubRangeDevice};
pub use dir::{DirEntry, ReadDir};
pub use error::{FsError, MountError};
pub use file::Ext2File;
pub use structs::*;

use zerocopy::little_endian::U32;
use zerocopy::{FromZeros, IntoBytes};

/// Mount-time options.
#[derive(Debug, Clone, Copy, Default)]
pub struct MountOptions {
    /// Request write access. The mount fails with
    /// [`MountError::UnsupportedForWrite`] if the filesystem carries
    /// read-only-compatible feature bits this implementation does not
    /// understand.
    pub writable: bool,
}

/// Read a single block pointer out of an indirect block.
///
/// A zero `block` short-circuits to 0 so sparse holes propagate through
/// every indirection level.
fn read_block_ptr<D: BlockDevice + ?Sized>(
    device: &mut D,
    blocks_count: u32,
    block_size: u32,
    block: u32,
    index: u32,
) -> Result<u32, FsError> {
    if block == 0 {
        return Ok(0);
    }
    if block >= blocks_count {
        return Err(FsError::CorruptIndirectBlock(block));
    }
    let offset = u64::from(block) * u64::from(block_size) + u64::from(index) * 4;
    let mut buf = [0u8; 4];
    device.read_exact_at(offset, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Map a logical file block to a physical block number, walking the
/// indirection tree as needed.
///
/// Block pointers in an inode:
/// - 0-11: direct blocks
/// - 12: single indirect (points to a block of pointers)
/// - 13: double indirect (points to a block of single indirect blocks)
/// - 14: triple indirect (points to a block of double indirect blocks)
///
/// `Ok(None)` is a sparse hole; the caller substitutes zeros.
fn resolve_block<D: BlockDevice + ?Sized>(
    device: &mut D,
    blocks_count: u32,
    block_size: u32,
    pointers: &[U32; 15],
    file_block: u64,
) -> Result<Option<u32>, FsError> {
    let p = u64::from(block_size / 4);

    let ptr = if file_block < DIRECT_POINTERS as u64 {
        pointers[file_block as usize].get()
    } else {
        let fb = file_block - DIRECT_POINTERS as u64;
        if fb < p {
            read_block_ptr(device, blocks_count, block_size, pointers[12].get(), fb as u32)?
        } else {
            let fb = fb - p;
            if fb < p * p {
                let ind = read_block_ptr(
                    device,
                    blocks_count,
                    block_size,
                    pointers[13].get(),
                    (fb / p) as u32,
                )?;
                read_block_ptr(device, blocks_count, block_size, ind, (fb % p) as u32)?
            } else {
                let fb = fb - p * p;
                if fb >= p * p * p {
                    return Err(FsError::FileBlockOutOfRange(file_block));
                }
                let dbl = read_block_ptr(
                    device,
                    blocks_count,
                    block_size,
                    pointers[14].get(),
                    (fb / (p * p)) as u32,
                )?;
                let ind = read_block_ptr(
                    device,
                    blocks_count,
                    block_size,
                    dbl,
                    ((fb / p) % p) as u32,
                )?;
                read_block_ptr(device, blocks_count, block_size, ind, (fb % p) as u32)?
            }
        }
    };

    if ptr == 0 {
        Ok(None)
    } else if ptr >= blocks_count {
        Err(FsError::CorruptIndirectBlock(ptr))
    } else {
        Ok(Some(ptr))
    }
}

/// A mounted ext2 filesystem.
///
/// Owns its decoded superblock copy, the block group descriptor table, and
/// the root inode; borrows the block device for its lifetime. Operations
/// take `&mut self` because device reads may move an internal cursor; a
/// handle is not meant to be shared between threads.
#[derive(Debug)]
pub struct Ext2Fs<'d, D: BlockDevice + ?Sized> {
    device: &'d mut D,
    superblock: Box<Superblock>,
    block_size: u32,
    inode_size: u32,
    group_count: u32,
    writable: bool,
    block_groups: Vec<BlockGroupDescriptor>,
    root: Inode,
}

impl<'d, D: BlockDevice + ?Sized> Ext2Fs<'d, D> {
    /// Mount an ext2 filesystem from a block device.
    ///
    /// Validates the superblock, loads the block group descriptor table,
    /// and reads the root inode. On error no handle is produced and the
    /// device is handed back untouched.
    pub fn mount(device: &'d mut D, options: MountOptions) -> Result<Self, MountError> {
        let device_size = device.size();
        if device_size < SUPERBLOCK_OFFSET + SUPERBLOCK_SIZE as u64 {
            return Err(MountError::ImageTooSmall);
        }

        let mut superblock =
            Superblock::new_box_zeroed().map_err(|_| MountError::OutOfMemory)?;
        device.read_exact_at(SUPERBLOCK_OFFSET, superblock.as_mut_bytes())?;

        if superblock.magic.get() != EXT2_SUPER_MAGIC {
            return Err(MountError::BadMagic);
        }

        superblock.validate()?;
        let block_size = superblock
            .block_size()
            .ok_or(MountError::InvalidBlockSize)?;
        let group_count = superblock
            .block_group_count()
            .ok_or(MountError::InvalidBlocksPerGroup)?;

        let fs_bytes = u64::from(superblock.blocks_count.get()) * u64::from(block_size);
        if device_size < fs_bytes {
            return Err(MountError::ImageShorterThanFilesystem);
        }

        let unsupported = superblock.unsupported_required_features();
        if unsupported != 0 {
            log::error!("ext2: unsupported required features: {unsupported:#x}");
            return Err(MountError::UnsupportedRequiredFeature(unsupported));
        }
        if options.writable {
            let unsupported = superblock.unsupported_write_features();
            if unsupported != 0 {
                log::error!("ext2: features block write access: {unsupported:#x}");
                return Err(MountError::UnsupportedForWrite(unsupported));
            }
        }

        // The descriptor table occupies the block after the superblock's:
        // block 2 for 1 KiB blocks, block 1 otherwise.
        let bgdt_block: u64 = if block_size == 1024 { 2 } else { 1 };
        let mut block_groups =
            vec![BlockGroupDescriptor::new_zeroed(); group_count as usize];
        device.read_exact_at(
            bgdt_block * u64::from(block_size),
            block_groups.as_mut_bytes(),
        )?;

        let blocks_count = superblock.blocks_count.get();
        for (group, descriptor) in block_groups.iter().enumerate() {
            if !descriptor.validate(blocks_count) {
                return Err(MountError::CorruptBgdt(group as u32));
            }
        }

        let inode_size = superblock.inode_size();
        let mut fs = Self {
            device,
            superblock,
            block_size,
            inode_size,
            group_count,
            writable: options.writable,
            block_groups,
            root: Inode::new_zeroed(),
        };

        let root = fs
            .read_inode(EXT2_ROOT_INO)
            .map_err(MountError::CannotReadRootInode)?;
        if !root.is_dir() {
            return Err(MountError::RootNotDirectory);
        }
        fs.root = root;

        log::debug!(
            "ext2: mounted: {} blocks of {} bytes, {} inodes of {} bytes, {} group(s)",
            blocks_count,
            block_size,
            fs.superblock.inodes_count.get(),
            inode_size,
            group_count
        );

        Ok(fs)
    }

    /// Release the handle, returning the borrowed device.
    pub fn unmount(self) -> &'d mut D {
        self.device
    }

    /// The decoded superblock.
    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    /// On-disk inode record size in bytes.
    pub fn inode_size(&self) -> u32 {
        self.inode_size
    }

    /// Number of block groups.
    pub fn group_count(&self) -> u32 {
        self.group_count
    }

    /// The root directory inode (always inode 2).
    pub fn root(&self) -> &Inode {
        &self.root
    }

    /// Whether the mount was performed with write intent.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Read an inode by number.
    ///
    /// Inode numbers are 1-based, but inode 1 is the reserved bad-blocks
    /// inode and is not addressable; the first readable inode is the root
    /// at 2.
    pub fn read_inode(&mut self, ino: u32) -> Result<Inode, FsError> {
        if ino < 2 || ino > self.superblock.inodes_count.get() {
            return Err(FsError::InodeOutOfRange(ino));
        }

        let inodes_per_group = self.superblock.inodes_per_group.get();
        let group = (ino - 1) / inodes_per_group;
        if group >= self.group_count {
            return Err(FsError::InodeOutOfRange(ino));
        }
        let index = (ino - 1) % inodes_per_group;

        let table = self.block_groups[group as usize].inode_table.get();
        let offset = u64::from(table) * u64::from(self.block_size)
            + u64::from(index) * u64::from(self.inode_size);

        // Only the classic 128-byte prefix is decoded; the remainder of a
        // larger inode record is ignored.
        let mut inode = Inode::new_zeroed();
        self.device.read_exact_at(offset, inode.as_mut_bytes())?;
        Ok(inode)
    }

    /// Logical size of an inode in bytes.
    ///
    /// The high 32 bits only count for regular files on a filesystem with
    /// the large-file feature; everything else is governed by the low word.
    pub fn file_size(&self, inode: &Inode) -> u64 {
        if inode.is_file() && self.superblock.has_large_files() {
            u64::from(inode.size_lo.get()) | (u64::from(inode.size_hi.get()) << 32)
        } else {
            u64::from(inode.size_lo.get())
        }
    }

    /// Map a logical file block to a physical block number.
    ///
    /// `Ok(None)` is a sparse hole.
    pub fn get_block(&mut self, inode: &Inode, file_block: u64) -> Result<Option<u32>, FsError> {
        resolve_block(
            &mut *self.device,
            self.superblock.blocks_count.get(),
            self.block_size,
            &inode.block,
            file_block,
        )
    }

    /// Read `buf.len()` bytes from the start of a physical block.
    pub fn read_block(&mut self, block: u32, buf: &mut [u8]) -> Result<(), FsError> {
        let offset = u64::from(block) * u64::from(self.block_size);
        self.device.read_exact_at(offset, buf)?;
        Ok(())
    }

    /// Read at an absolute device offset. Callers must have validated the
    /// block number the offset was derived from.
    pub(crate) fn read_raw(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), FsError> {
        self.device.read_exact_at(offset, buf)?;
        Ok(())
    }

    /// Read a byte range out of an inode.
    ///
    /// Returns the number of bytes read, truncated to the inode's logical
    /// size; sparse blocks read back as zeros. An `offset` at or past the
    /// end reads zero bytes.
    pub fn read_at(&mut self, inode: &Inode, offset: u64, buf: &mut [u8]) -> Result<usize, FsError> {
        let size = self.file_size(inode);
        if offset >= size {
            return Ok(0);
        }

        let to_read = (buf.len() as u64).min(size - offset) as usize;
        let block_size = u64::from(self.block_size);
        let mut done = 0;
        let mut pos = offset;

        while done < to_read {
            let file_block = pos / block_size;
            let within = (pos % block_size) as usize;
            let chunk = (self.block_size as usize - within).min(to_read - done);

            match self.get_block(inode, file_block)? {
                // Sparse hole: fill with zeros.
                None => buf[done..done + chunk].fill(0),
                Some(block) => {
                    let disk_offset = u64::from(block) * block_size + within as u64;
                    self.device
                        .read_exact_at(disk_offset, &mut buf[done..done + chunk])?;
                }
            }

            done += chunk;
            pos += chunk as u64;
        }

        Ok(to_read)
    }

    /// Enumerate the entries of a directory inode.
    pub fn read_dir<'f>(&'f mut self, dir: &Inode) -> Result<ReadDir<'f, 'd, D>, FsError> {
        if !dir.is_dir() {
            return Err(FsError::NotADirectory);
        }
        Ok(ReadDir::new(self, *dir))
    }

    /// Find a directory entry by name, returning its inode number.
    pub fn lookup(&mut self, dir: &Inode, name: &[u8]) -> Result<u32, FsError> {
        for entry in self.read_dir(dir)? {
            let entry = entry?;
            if entry.name() == name {
                return Ok(entry.ino());
            }
        }
        Err(FsError::NotFound)
    }

    /// Resolve an absolute path to an inode number.
    ///
    /// Empty components are ignored, so `//a///b` equals `/a/b`. Symbolic
    /// links are never followed; a link anywhere before the final
    /// component fails with [`FsError::SymlinkUnsupported`].
    pub fn resolve(&mut self, path: &str) -> Result<u32, FsError> {
        let mut current = EXT2_ROOT_INO;
        for component in path.split('/').filter(|c| !c.is_empty()) {
            let inode = self.read_inode(current)?;
            if inode.is_symlink() {
                return Err(FsError::SymlinkUnsupported);
            }
            if !inode.is_dir() {
                return Err(FsError::NotADirectory);
            }
            current = self.lookup(&inode, component.as_bytes())?;
        }
        Ok(current)
    }

    /// Open a regular file by path for positioned reads.
    pub fn open(&mut self, path: &str) -> Result<Ext2File<'_, 'd, D>, FsError> {
        let ino = self.resolve(path)?;
        let inode = self.read_inode(ino)?;
        if !inode.is_file() {
            // Directories and special files cannot be opened for byte I/O.
            return Err(FsError::NotFound);
        }
        Ok(Ext2File::new(self, ino, inode))
    }

    /// Collect the entries of the directory at `path`.
    pub fn readdir(&mut self, path: &str) -> Result<Vec<DirEntry>, FsError> {
        let ino = self.resolve(path)?;
        let inode = self.read_inode(ino)?;
        self.read_dir(&inode)?.collect()
    }
}
