//! Error types for mounting and operating on a filesystem.

use std::borrow::Cow;
use std::fmt;
use std::io;

use crate::block::BlockError;

/// Errors detected while mounting an image.
///
/// A mount error means no handle was produced; the device is untouched.
#[derive(Debug)]
pub enum MountError {
    /// The image is too small to contain a superblock.
    ImageTooSmall,
    /// A device read failed or came back short.
    ReadFailed(BlockError),
    /// The superblock magic word is not 0xEF53.
    BadMagic,
    /// `log_block_size` is out of range.
    InvalidBlockSize,
    /// `blocks_per_group` is zero.
    InvalidBlocksPerGroup,
    /// `inodes_per_group` is zero.
    InvalidInodesPerGroup,
    /// The block-derived and inode-derived group counts disagree.
    InconsistentGroupCount,
    /// The extended inode size is not a power of two in [128, block_size].
    InvalidInodeSize(u16),
    /// The device is shorter than `blocks_count * block_size`.
    ImageShorterThanFilesystem,
    /// The filesystem requires feature bits this implementation does not
    /// understand.
    UnsupportedRequiredFeature(u32),
    /// Write access was requested but the filesystem carries unknown
    /// read-only-compatible feature bits.
    UnsupportedForWrite(u32),
    /// A block group descriptor names a block outside the filesystem.
    CorruptBgdt(u32),
    /// The root inode could not be read.
    CannotReadRootInode(FsError),
    /// Inode 2 is not a directory.
    RootNotDirectory,
    /// Allocation of the handle's owned buffers failed.
    OutOfMemory,
}

impl MountError {
    /// Human-readable message. Simple failures borrow a static string;
    /// failures that carry a value allocate a formatted one.
    pub fn message(&self) -> Cow<'static, str> {
        match self {
            MountError::ImageTooSmall => Cow::Borrowed("image too small for superblock"),
            MountError::ReadFailed(err) => Cow::Owned(format!("read failed: {err}")),
            MountError::BadMagic => Cow::Borrowed("invalid ext2 signature in superblock"),
            MountError::InvalidBlockSize => Cow::Borrowed("invalid block size"),
            MountError::InvalidBlocksPerGroup => Cow::Borrowed("invalid blocks per group"),
            MountError::InvalidInodesPerGroup => Cow::Borrowed("invalid inodes per group"),
            MountError::InconsistentGroupCount => {
                Cow::Borrowed("inconsistent total block groups between blocks and inodes")
            }
            MountError::InvalidInodeSize(size) => Cow::Owned(format!("invalid inode size: {size}")),
            MountError::ImageShorterThanFilesystem => {
                Cow::Borrowed("image is shorter than the filesystem it claims to contain")
            }
            MountError::UnsupportedRequiredFeature(bits) => {
                Cow::Owned(format!("unsupported required features: {bits:#x}"))
            }
            MountError::UnsupportedForWrite(bits) => Cow::Owned(format!(
                "filesystem cannot be written: unsupported features: {bits:#x}"
            )),
            MountError::CorruptBgdt(group) => {
                Cow::Owned(format!("corrupt descriptor for block group {group}"))
            }
            MountError::CannotReadRootInode(err) => {
                Cow::Owned(format!("cannot read root inode: {err}"))
            }
            MountError::RootNotDirectory => Cow::Borrowed("root inode is not a directory"),
            MountError::OutOfMemory => Cow::Borrowed("out of memory"),
        }
    }
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for MountError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MountError::ReadFailed(err) => Some(err),
            MountError::CannotReadRootInode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BlockError> for MountError {
    fn from(err: BlockError) -> Self {
        MountError::ReadFailed(err)
    }
}

/// Errors from operations on a mounted filesystem.
///
/// These poison the originating request only; the handle stays mounted.
#[derive(Debug)]
pub enum FsError {
    /// A device read failed or came back short.
    ReadFailed(BlockError),
    /// The inode number is zero or beyond the inode count.
    InodeOutOfRange(u32),
    /// The logical block index lies beyond the triply-indirect range.
    FileBlockOutOfRange(u64),
    /// A block pointer names a block outside the filesystem.
    CorruptIndirectBlock(u32),
    /// A directory block contains a malformed entry.
    CorruptDirectory,
    /// No entry with the requested name.
    NotFound,
    /// The inode is not a directory.
    NotADirectory,
    /// A path component is a symbolic link; links are never followed.
    SymlinkUnsupported,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsError::ReadFailed(err) => write!(f, "read failed: {err}"),
            FsError::InodeOutOfRange(ino) => write!(f, "inode {ino} out of range"),
            FsError::FileBlockOutOfRange(block) => {
                write!(f, "file block {block} out of range")
            }
            FsError::CorruptIndirectBlock(block) => {
                write!(f, "block pointer {block} outside filesystem")
            }
            FsError::CorruptDirectory => write!(f, "corrupt directory entry"),
            FsError::NotFound => write!(f, "no such file or directory"),
            FsError::NotADirectory => write!(f, "not a directory"),
            FsError::SymlinkUnsupported => {
                write!(f, "symbolic links in paths are not supported")
            }
        }
    }
}

impl std::error::Error for FsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FsError::ReadFailed(err) => Some(err),
            _ => None,
        }
    }
}

impl From<BlockError> for FsError {
    fn from(err: BlockError) -> Self {
        FsError::ReadFailed(err)
    }
}

impl From<FsError> for io::Error {
    fn from(err: FsError) -> Self {
        let kind = match &err {
            FsError::NotFound => io::ErrorKind::NotFound,
            FsError::NotADirectory => io::ErrorKind::NotADirectory,
            FsError::ReadFailed(_) => io::ErrorKind::Other,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, err)
    }
}
