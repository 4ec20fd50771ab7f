//! Ext2 on-disk structures.
//!
//! All records are `#[repr(C)]` with explicit little-endian fields, so they
//! decode correctly on any host via [`zerocopy`]. The superblock layout
//! covers the full extended (revision 1) tail; revision 0 filesystems simply
//! leave the tail undefined and it must not be consulted.

use zerocopy::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::error::MountError;

/// Ext2 magic number in the superblock.
pub const EXT2_SUPER_MAGIC: u16 = 0xEF53;

/// Root directory inode number (always 2 in ext2).
pub const EXT2_ROOT_INO: u32 = 2;

/// Superblock offset from start of device (in bytes).
pub const SUPERBLOCK_OFFSET: u64 = 1024;

/// Superblock size in bytes.
pub const SUPERBLOCK_SIZE: usize = 1024;

/// Number of direct block pointers in an inode.
pub const DIRECT_POINTERS: usize = 12;

// =============================================================================
// Feature flags
// =============================================================================

// Optional features (ignorable for both reading and writing)
/// Directory preallocation
pub const COMPAT_DIR_PREALLOC: u32 = 0x0001;
/// "imagic inodes" (AFS server inodes)
pub const COMPAT_IMAGIC_INODES: u32 = 0x0002;
/// Has a journal (ext3)
pub const COMPAT_HAS_JOURNAL: u32 = 0x0004;
/// Extended attributes
pub const COMPAT_EXT_ATTR: u32 = 0x0008;
/// Filesystem can resize itself for larger partitions
pub const COMPAT_RESIZE_INO: u32 = 0x0010;
/// Directories use hash index
pub const COMPAT_DIR_INDEX: u32 = 0x0020;

// Required features (must not mount at all if not supported)
/// Compression
pub const INCOMPAT_COMPRESSION: u32 = 0x0001;
/// Directory entries have a file type byte
pub const INCOMPAT_FILETYPE: u32 = 0x0002;
/// Filesystem needs recovery (journal replay)
pub const INCOMPAT_RECOVER: u32 = 0x0004;
/// Filesystem has a separate journal device
pub const INCOMPAT_JOURNAL_DEV: u32 = 0x0008;

// Read-only-compatible features (must not mount writable if not supported)
/// Sparse superblock copies
pub const RO_COMPAT_SPARSE_SUPER: u32 = 0x0001;
/// 64-bit file sizes (nbytes_hi is meaningful for regular files)
pub const RO_COMPAT_LARGE_FILE: u32 = 0x0002;
/// Directories use a binary tree
pub const RO_COMPAT_BTREE_DIR: u32 = 0x0004;

/// Required features this implementation understands.
pub const SUPPORTED_INCOMPAT: u32 = INCOMPAT_FILETYPE;

/// Read-only-compatible features this implementation understands.
pub const SUPPORTED_RO_COMPAT: u32 = RO_COMPAT_SPARSE_SUPER | RO_COMPAT_LARGE_FILE;

// Inode mode: type mask and types (top nibble of the mode word)
pub const S_IFMT: u16 = 0xF000;
/// FIFO
pub const S_IFIFO: u16 = 0x1000;
/// Character device
pub const S_IFCHR: u16 = 0x2000;
/// Directory
pub const S_IFDIR: u16 = 0x4000;
/// Block device
pub const S_IFBLK: u16 = 0x6000;
/// Regular file
pub const S_IFREG: u16 = 0x8000;
/// Symbolic link
pub const S_IFLNK: u16 = 0xA000;
/// Socket
pub const S_IFSOCK: u16 = 0xC000;

// Inode mode: permission and mode bits (low 12 bits of the mode word)
pub const PERM_OTHER_EXEC: u16 = 0o0001;
pub const PERM_OTHER_WRITE: u16 = 0o0002;
pub const PERM_OTHER_READ: u16 = 0o0004;
pub const PERM_GROUP_EXEC: u16 = 0o0010;
pub const PERM_GROUP_WRITE: u16 = 0o0020;
pub const PERM_GROUP_READ: u16 = 0o0040;
pub const PERM_USER_EXEC: u16 = 0o0100;
pub const PERM_USER_WRITE: u16 = 0o0200;
pub const PERM_USER_READ: u16 = 0o0400;
pub const PERM_STICKY: u16 = 0o1000;
pub const PERM_SETGID: u16 = 0o2000;
pub const PERM_SETUID: u16 = 0o4000;

// Directory entry file types (dirent type byte, INCOMPAT_FILETYPE only)
pub const FT_UNKNOWN: u8 = 0;
pub const FT_REG_FILE: u8 = 1;
pub const FT_DIR: u8 = 2;
pub const FT_CHRDEV: u8 = 3;
pub const FT_BLKDEV: u8 = 4;
pub const FT_FIFO: u8 = 5;
pub const FT_SOCK: u8 = 6;
pub const FT_SYMLINK: u8 = 7;

/// File-like object type, derived from an inode mode word or a dirent type
/// byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Unknown,
    Fifo,
    CharDevice,
    Directory,
    BlockDevice,
    Regular,
    Symlink,
    Socket,
}

impl FileType {
    /// Decode from the top nibble of an inode mode word.
    pub fn from_mode(mode: u16) -> FileType {
        match mode & S_IFMT {
            S_IFIFO => FileType::Fifo,
            S_IFCHR => FileType::CharDevice,
            S_IFDIR => FileType::Directory,
            S_IFBLK => FileType::BlockDevice,
            S_IFREG => FileType::Regular,
            S_IFLNK => FileType::Symlink,
            S_IFSOCK => FileType::Socket,
            _ => FileType::Unknown,
        }
    }

    /// Decode from a directory entry's type byte.
    pub fn from_dirent_type(ft: u8) -> FileType {
        match ft {
            FT_REG_FILE => FileType::Regular,
            FT_DIR => FileType::Directory,
            FT_CHRDEV => FileType::CharDevice,
            FT_BLKDEV => FileType::BlockDevice,
            FT_FIFO => FileType::Fifo,
            FT_SOCK => FileType::Socket,
            FT_SYMLINK => FileType::Symlink,
            _ => FileType::Unknown,
        }
    }
}

/// Ext2 superblock.
///
/// Located at byte offset 1024 from the start of the device, 1024 bytes
/// long. Fields from `first_ino` onward are only defined when
/// `rev_level >= 1`.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Clone)]
#[repr(C)]
pub struct Superblock {
    /// Total number of inodes in the filesystem
    pub inodes_count: U32,
    /// Total number of blocks in the filesystem
    pub blocks_count: U32,
    /// Number of blocks reserved for the superuser
    pub reserved_blocks_count: U32,
    /// Number of free blocks
    pub free_blocks_count: U32,
    /// Number of free inodes
    pub free_inodes_count: U32,
    /// Block number of the first data block
    pub first_data_block: U32,
    /// Block size = 1024 << log_block_size
    pub log_block_size: U32,
    /// Fragment size (obsolete, usually same as block size)
    pub log_frag_size: U32,
    /// Number of blocks per block group
    pub blocks_per_group: U32,
    /// Number of fragments per block group (obsolete)
    pub frags_per_group: U32,
    /// Number of inodes per block group
    pub inodes_per_group: U32,
    /// Last mount time (POSIX seconds)
    pub mtime: U32,
    /// Last write time (POSIX seconds)
    pub wtime: U32,
    /// Mount count since last fsck
    pub mnt_count: U16,
    /// Maximum mount count before fsck
    pub max_mnt_count: U16,
    /// Magic number (0xEF53)
    pub magic: U16,
    /// Filesystem state
    pub state: U16,
    /// What to do on error
    pub errors: U16,
    /// Minor revision level
    pub minor_rev_level: U16,
    /// Last fsck time
    pub lastcheck: U32,
    /// Maximum time between fscks
    pub checkinterval: U32,
    /// Creator OS
    pub creator_os: U32,
    /// Revision level (0 = original, 1 = dynamic)
    pub rev_level: U32,
    /// Default UID for reserved blocks
    pub def_resuid: U16,
    /// Default GID for reserved blocks
    pub def_resgid: U16,
    // --- extended fields (rev_level >= 1) ---
    /// First non-reserved inode
    pub first_ino: U32,
    /// Inode structure size
    pub inode_size: U16,
    /// Block group number of this superblock copy
    pub block_group_nr: U16,
    /// Optional feature set
    pub feature_compat: U32,
    /// Required feature set
    pub feature_incompat: U32,
    /// Read-only-compatible feature set
    pub feature_ro_compat: U32,
    /// 128-bit filesystem UUID
    pub uuid: [u8; 16],
    /// Volume label
    pub volume_name: [u8; 16],
    /// Last mount path
    pub last_mounted: [u8; 64],
    /// Compression algorithm bitmap
    pub algo_bitmap: U32,
    /// Blocks to preallocate for files
    pub prealloc_blocks: u8,
    /// Blocks to preallocate for directories
    pub prealloc_dir_blocks: u8,
    pub padding1: U16,
    /// Journal UUID
    pub journal_uuid: [u8; 16],
    /// Journal inode number
    pub journal_inum: U32,
    /// Journal device number
    pub journal_dev: U32,
    /// Head of the orphan inode list
    pub last_orphan: U32,
    /// Directory hash seeds
    pub hash_seed: [U32; 4],
    /// Default hash version
    pub def_hash_version: u8,
    pub padding2: [u8; 3],
    /// Default mount options
    pub default_mount_options: U32,
    /// First metablock block group
    pub first_meta_bg: U32,
    pub reserved: [u8; 760],
}

impl Superblock {
    /// Maximum valid log_block_size (3 = 8192-byte blocks).
    pub const MAX_LOG_BLOCK_SIZE: u32 = 3;

    /// Whether the extended (revision 1) fields are defined.
    pub fn has_extended_fields(&self) -> bool {
        self.rev_level.get() >= 1
    }

    /// Block size in bytes.
    ///
    /// Returns `None` if `log_block_size` is out of the valid range [0, 3].
    pub fn block_size(&self) -> Option<u32> {
        if self.log_block_size.get() > Self::MAX_LOG_BLOCK_SIZE {
            return None;
        }
        Some(1024 << self.log_block_size.get())
    }

    /// Inode size in bytes (128 for rev 0, variable for rev 1+).
    pub fn inode_size(&self) -> u32 {
        if self.has_extended_fields() {
            self.inode_size.get() as u32
        } else {
            128
        }
    }

    /// Number of block groups, derived from the block counts.
    ///
    /// Returns `None` if `blocks_per_group` is zero.
    pub fn block_group_count(&self) -> Option<u32> {
        if self.blocks_per_group.get() == 0 {
            return None;
        }
        Some(self.blocks_count.get().div_ceil(self.blocks_per_group.get()))
    }

    /// Number of block groups derived from the inode counts. Must agree
    /// with [`Superblock::block_group_count`] on a well-formed filesystem.
    pub fn inode_group_count(&self) -> Option<u32> {
        if self.inodes_per_group.get() == 0 {
            return None;
        }
        Some(self.inodes_count.get().div_ceil(self.inodes_per_group.get()))
    }

    /// Required feature bits this implementation does not understand.
    pub fn unsupported_required_features(&self) -> u32 {
        if !self.has_extended_fields() {
            return 0;
        }
        self.feature_incompat.get() & !SUPPORTED_INCOMPAT
    }

    /// Read-only-compatible feature bits this implementation does not
    /// understand. Unknown bits here only block write access.
    pub fn unsupported_write_features(&self) -> u32 {
        if !self.has_extended_fields() {
            return 0;
        }
        self.feature_ro_compat.get() & !SUPPORTED_RO_COMPAT
    }

    /// Whether directory entries carry a file-type byte.
    pub fn dirents_have_type(&self) -> bool {
        self.has_extended_fields() && self.feature_incompat.get() & INCOMPAT_FILETYPE != 0
    }

    /// Whether `nbytes_hi` is meaningful for regular files.
    pub fn has_large_files(&self) -> bool {
        self.has_extended_fields() && self.feature_ro_compat.get() & RO_COMPAT_LARGE_FILE != 0
    }

    /// Validate geometry fields. The magic word is checked separately
    /// during mount, before anything else is trusted.
    pub fn validate(&self) -> Result<(), MountError> {
        let Some(block_size) = self.block_size() else {
            log::warn!(
                "ext2: invalid log_block_size {} (max {})",
                self.log_block_size.get(),
                Self::MAX_LOG_BLOCK_SIZE
            );
            return Err(MountError::InvalidBlockSize);
        };

        if self.blocks_per_group.get() == 0 {
            return Err(MountError::InvalidBlocksPerGroup);
        }

        if self.inodes_per_group.get() == 0 {
            return Err(MountError::InvalidInodesPerGroup);
        }

        if self.block_group_count() != self.inode_group_count() {
            log::warn!(
                "ext2: block group count disagrees between blocks ({:?}) and inodes ({:?})",
                self.block_group_count(),
                self.inode_group_count()
            );
            return Err(MountError::InconsistentGroupCount);
        }

        if self.has_extended_fields() {
            let inode_size = self.inode_size.get();
            if inode_size < 128
                || !inode_size.is_power_of_two()
                || u32::from(inode_size) > block_size
            {
                log::warn!("ext2: invalid inode_size {inode_size}");
                return Err(MountError::InvalidInodeSize(inode_size));
            }
        }

        Ok(())
    }
}

/// Block group descriptor.
///
/// Located in the block group descriptor table, which occupies the block
/// after the superblock's block.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Clone, Copy)]
#[repr(C)]
pub struct BlockGroupDescriptor {
    /// Block number of the block bitmap
    pub block_bitmap: U32,
    /// Block number of the inode bitmap
    pub inode_bitmap: U32,
    /// Block number of the first inode table block
    pub inode_table: U32,
    /// Number of free blocks in this group
    pub free_blocks_count: U16,
    /// Number of free inodes in this group
    pub free_inodes_count: U16,
    /// Number of directories in this group
    pub used_dirs_count: U16,
    pub pad: U16,
    pub reserved: [u8; 12],
}

impl BlockGroupDescriptor {
    /// Check that every block number this descriptor names lies inside the
    /// filesystem.
    pub fn validate(&self, blocks_count: u32) -> bool {
        self.block_bitmap.get() < blocks_count
            && self.inode_bitmap.get() < blocks_count
            && self.inode_table.get() < blocks_count
    }
}

/// Inode, classic 128-byte layout.
///
/// Filesystems with a larger `inode_size` carry extra bytes after this
/// prefix; they are left on disk untouched and ignored.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Clone, Copy)]
#[repr(C)]
pub struct Inode {
    /// File mode (type and permissions)
    pub mode: U16,
    /// Owner user ID
    pub uid: U16,
    /// File size in bytes, low 32 bits
    pub size_lo: U32,
    /// Last access time (POSIX seconds)
    pub atime: U32,
    /// Creation time (POSIX seconds)
    pub ctime: U32,
    /// Last modification time (POSIX seconds)
    pub mtime: U32,
    /// Deletion time (POSIX seconds, 0 = live)
    pub dtime: U32,
    /// Owner group ID
    pub gid: U16,
    /// Number of hard links
    pub links_count: U16,
    /// Number of 512-byte sectors allocated (sanity hint only)
    pub sectors: U32,
    /// File flags
    pub flags: U32,
    /// OS-specific value 1
    pub osd1: U32,
    /// Block pointers: 0-11 direct, 12 indirect, 13 double, 14 triple
    pub block: [U32; 15],
    /// File generation (for NFS)
    pub generation: U32,
    /// Extended attribute block
    pub file_acl: U32,
    /// High 32 bits of the size for regular files on large-file
    /// filesystems; directory ACL otherwise
    pub size_hi: U32,
    /// Fragment address (obsolete)
    pub faddr: U32,
    /// OS-specific value 2
    pub osd2: [u8; 12],
}

impl Inode {
    /// File type from the mode word.
    pub fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode.get())
    }

    /// Permission and SUID/SGID/sticky bits (low 12 bits of the mode word).
    pub fn permissions(&self) -> u16 {
        self.mode.get() & !S_IFMT
    }

    /// Check if this inode is a directory.
    pub fn is_dir(&self) -> bool {
        self.mode.get() & S_IFMT == S_IFDIR
    }

    /// Check if this inode is a regular file.
    pub fn is_file(&self) -> bool {
        self.mode.get() & S_IFMT == S_IFREG
    }

    /// Check if this inode is a symbolic link.
    pub fn is_symlink(&self) -> bool {
        self.mode.get() & S_IFMT == S_IFLNK
    }

    /// Whether the inode is live (not deleted).
    pub fn is_live(&self) -> bool {
        self.dtime.get() == 0
    }
}

/// Directory entry header (on-disk format).
///
/// A variable-length name of `name_len` bytes follows the header; `rec_len`
/// is the 4-byte-aligned distance to the next entry.
#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Debug, Clone, Copy)]
#[repr(C)]
pub struct DirEntryRaw {
    /// Inode number (0 = tombstone)
    pub inode: U32,
    /// Record length (distance to the next entry)
    pub rec_len: U16,
    /// Name length
    pub name_len: u8,
    /// File type byte (only valid with INCOMPAT_FILETYPE)
    pub file_type: u8,
}

/// Size of the fixed dirent header.
pub const DIRENT_HEADER_SIZE: usize = 8;

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::FromZeros;

    /// A valid superblock for testing; individual tests override fields.
    fn make_valid_superblock() -> Superblock {
        let mut sb = Superblock::new_zeroed();
        sb.magic = EXT2_SUPER_MAGIC.into();
        sb.blocks_count = U32::new(8192);
        sb.inodes_count = U32::new(2048);
        sb.blocks_per_group = U32::new(8192);
        sb.inodes_per_group = U32::new(2048);
        sb.log_block_size = U32::new(0);
        sb.rev_level = U32::new(1);
        sb.inode_size = U16::new(128);
        sb
    }

    #[test]
    fn struct_sizes_match_disk_layout() {
        assert_eq!(size_of::<Superblock>(), 1024);
        assert_eq!(size_of::<BlockGroupDescriptor>(), 32);
        assert_eq!(size_of::<Inode>(), 128);
        assert_eq!(size_of::<DirEntryRaw>(), DIRENT_HEADER_SIZE);
    }

    #[test]
    fn magic_field_sits_at_offset_56() {
        let mut sb = Superblock::new_zeroed();
        sb.magic = EXT2_SUPER_MAGIC.into();
        let bytes = sb.as_bytes();
        assert_eq!(&bytes[56..58], &[0x53, 0xEF]);
    }

    #[test]
    fn valid_superblock_passes() {
        assert!(make_valid_superblock().validate().is_ok());
    }

    #[test]
    fn zero_blocks_per_group_rejected() {
        let mut sb = make_valid_superblock();
        sb.blocks_per_group = U32::new(0);
        assert!(matches!(
            sb.validate(),
            Err(MountError::InvalidBlocksPerGroup)
        ));
    }

    #[test]
    fn zero_inodes_per_group_rejected() {
        let mut sb = make_valid_superblock();
        sb.inodes_per_group = U32::new(0);
        assert!(matches!(
            sb.validate(),
            Err(MountError::InvalidInodesPerGroup)
        ));
    }

    #[test]
    fn log_block_size_too_large_rejected() {
        let mut sb = make_valid_superblock();
        sb.log_block_size = U32::new(4);
        assert!(matches!(sb.validate(), Err(MountError::InvalidBlockSize)));
    }

    #[test]
    fn group_count_mismatch_rejected() {
        let mut sb = make_valid_superblock();
        // 8192 blocks / 8192 per group = 1 group, but 2048 inodes with 512
        // per group = 4 groups.
        sb.inodes_per_group = U32::new(512);
        assert!(matches!(
            sb.validate(),
            Err(MountError::InconsistentGroupCount)
        ));
    }

    #[test]
    fn inode_size_too_small_rejected() {
        let mut sb = make_valid_superblock();
        sb.inode_size = U16::new(96);
        assert!(matches!(
            sb.validate(),
            Err(MountError::InvalidInodeSize(96))
        ));
    }

    #[test]
    fn inode_size_not_power_of_two_rejected() {
        let mut sb = make_valid_superblock();
        sb.inode_size = U16::new(192);
        assert!(matches!(
            sb.validate(),
            Err(MountError::InvalidInodeSize(192))
        ));
    }

    #[test]
    fn inode_size_larger_than_block_rejected() {
        let mut sb = make_valid_superblock();
        sb.inode_size = U16::new(2048);
        assert!(matches!(
            sb.validate(),
            Err(MountError::InvalidInodeSize(2048))
        ));
    }

    #[test]
    fn inode_size_256_accepted() {
        let mut sb = make_valid_superblock();
        sb.inode_size = U16::new(256);
        assert!(sb.validate().is_ok());
    }

    #[test]
    fn rev0_ignores_inode_size_field() {
        let mut sb = make_valid_superblock();
        sb.rev_level = U32::new(0);
        sb.inode_size = U16::new(999);
        assert!(sb.validate().is_ok());
        assert_eq!(sb.inode_size(), 128);
    }

    #[test]
    fn block_size_values() {
        let mut sb = make_valid_superblock();
        for (log, size) in [(0, 1024), (1, 2048), (2, 4096), (3, 8192)] {
            sb.log_block_size = U32::new(log);
            assert_eq!(sb.block_size(), Some(size));
        }
        sb.log_block_size = U32::new(4);
        assert_eq!(sb.block_size(), None);
    }

    #[test]
    fn block_group_count_rounds_up() {
        let mut sb = make_valid_superblock();
        sb.blocks_count = U32::new(8193);
        sb.inodes_count = U32::new(4096);
        assert_eq!(sb.block_group_count(), Some(2));
        assert_eq!(sb.inode_group_count(), Some(2));
    }

    #[test]
    fn block_group_count_zero_bpg() {
        let mut sb = make_valid_superblock();
        sb.blocks_per_group = U32::new(0);
        assert_eq!(sb.block_group_count(), None);
    }

    #[test]
    fn inode_size_rev1() {
        let mut sb = make_valid_superblock();
        sb.inode_size = U16::new(256);
        assert_eq!(sb.inode_size(), 256);
    }

    #[test]
    fn unsupported_incompat_detected() {
        let mut sb = make_valid_superblock();
        sb.feature_incompat = (INCOMPAT_COMPRESSION | INCOMPAT_FILETYPE).into();
        assert_eq!(sb.unsupported_required_features(), INCOMPAT_COMPRESSION);
    }

    #[test]
    fn supported_incompat_passes() {
        let mut sb = make_valid_superblock();
        sb.feature_incompat = INCOMPAT_FILETYPE.into();
        assert_eq!(sb.unsupported_required_features(), 0);
        assert!(sb.dirents_have_type());
    }

    #[test]
    fn rev0_has_no_features() {
        let mut sb = make_valid_superblock();
        sb.rev_level = U32::new(0);
        sb.feature_incompat = U32::new(0xFFFF_FFFF);
        sb.feature_ro_compat = U32::new(0xFFFF_FFFF);
        assert_eq!(sb.unsupported_required_features(), 0);
        assert_eq!(sb.unsupported_write_features(), 0);
        assert!(!sb.dirents_have_type());
        assert!(!sb.has_large_files());
    }

    #[test]
    fn unknown_ro_features_block_writes_only() {
        let mut sb = make_valid_superblock();
        sb.feature_ro_compat = (RO_COMPAT_SPARSE_SUPER | RO_COMPAT_BTREE_DIR).into();
        assert_eq!(sb.unsupported_write_features(), RO_COMPAT_BTREE_DIR);
        assert_eq!(sb.unsupported_required_features(), 0);
    }

    #[test]
    fn file_type_from_mode() {
        assert_eq!(FileType::from_mode(S_IFREG | 0o644), FileType::Regular);
        assert_eq!(FileType::from_mode(S_IFDIR | 0o755), FileType::Directory);
        assert_eq!(FileType::from_mode(S_IFLNK | 0o777), FileType::Symlink);
        assert_eq!(FileType::from_mode(S_IFSOCK), FileType::Socket);
        assert_eq!(FileType::from_mode(0o644), FileType::Unknown);
    }

    #[test]
    fn file_type_from_dirent_byte() {
        assert_eq!(FileType::from_dirent_type(FT_REG_FILE), FileType::Regular);
        assert_eq!(FileType::from_dirent_type(FT_DIR), FileType::Directory);
        assert_eq!(FileType::from_dirent_type(FT_SYMLINK), FileType::Symlink);
        assert_eq!(FileType::from_dirent_type(FT_UNKNOWN), FileType::Unknown);
        assert_eq!(FileType::from_dirent_type(200), FileType::Unknown);
    }

    #[test]
    fn inode_type_helpers() {
        let mut inode = Inode::new_zeroed();
        inode.mode = (S_IFDIR | 0o755).into();
        assert!(inode.is_dir() && !inode.is_file() && !inode.is_symlink());
        inode.mode = (S_IFREG | 0o644).into();
        assert!(inode.is_file() && !inode.is_dir());
        inode.mode = (S_IFLNK | 0o777).into();
        assert!(inode.is_symlink());
        assert_eq!(inode.permissions(), 0o777);
    }

    #[test]
    fn deletion_time_marks_liveness() {
        let mut inode = Inode::new_zeroed();
        assert!(inode.is_live());
        inode.dtime = U32::new(1_700_000_000);
        assert!(!inode.is_live());
    }
}
