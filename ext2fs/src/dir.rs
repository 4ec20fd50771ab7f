//! Directory entry enumeration.
//!
//! Ext2 directories are packed sequences of variable-length records inside
//! the directory's data blocks:
//!
//! ```text
//! +--------+--------+--------+-----+--------+
//! | entry0 | entry1 | entry2 | ... | entryN |
//! +--------+--------+--------+-----+--------+
//! ```
//!
//! Each record has a fixed 8-byte header ([`DirEntryRaw`]) followed by the
//! name. `rec_len` is the 4-byte-aligned distance to the next record and
//! the last record in a block extends to the end of the block, so the
//! record lengths of one block always sum to the block size. A record with
//! inode 0 is a tombstone: skipped, but its `rec_len` still counts.

use std::borrow::Cow;

use zerocopy::FromBytes;

use crate::Ext2Fs;
use crate::block::BlockDevice;
use crate::error::FsError;
use crate::structs::{DIRENT_HEADER_SIZE, DirEntryRaw, FileType, Inode};

/// A decoded directory entry.
///
/// The name is the exact byte range stored on disk; it is not guaranteed
/// to be UTF-8.
#[derive(Debug, Clone)]
pub struct DirEntry {
    ino: u32,
    file_type: FileType,
    name: Vec<u8>,
}

impl DirEntry {
    /// Inode number of the entry's target.
    pub fn ino(&self) -> u32 {
        self.ino
    }

    /// Type hint from the dirent type byte. [`FileType::Unknown`] when the
    /// filesystem does not carry the dirent-type feature.
    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    /// Name bytes, exactly as stored on disk.
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    /// Name as a string, replacing invalid UTF-8.
    pub fn name_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

/// Streaming iterator over the entries of one directory inode.
///
/// Reads the directory block by block; a decoding error ends the
/// iteration after being yielded once.
pub struct ReadDir<'f, 'd, D: BlockDevice + ?Sized> {
    fs: &'f mut Ext2Fs<'d, D>,
    inode: Inode,
    size: u64,
    typed: bool,
    /// Byte offset within the directory of the block being decoded.
    offset: u64,
    block: Vec<u8>,
    pos: usize,
    loaded: bool,
    done: bool,
}

impl<'f, 'd, D: BlockDevice + ?Sized> ReadDir<'f, 'd, D> {
    pub(crate) fn new(fs: &'f mut Ext2Fs<'d, D>, inode: Inode) -> Self {
        let size = fs.file_size(&inode);
        let block = vec![0u8; fs.block_size() as usize];
        let typed = fs.superblock().dirents_have_type();
        Self {
            fs,
            inode,
            size,
            typed,
            offset: 0,
            block,
            pos: 0,
            loaded: false,
            done: false,
        }
    }

    fn fail(&mut self, err: FsError) -> Option<Result<DirEntry, FsError>> {
        self.done = true;
        Some(Err(err))
    }
}

impl<'f, 'd, D: BlockDevice + ?Sized> Iterator for ReadDir<'f, 'd, D> {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let block_size = self.block.len();

        loop {
            if !self.loaded {
                if self.offset >= self.size {
                    self.done = true;
                    return None;
                }
                let file_block = self.offset / block_size as u64;
                match self.fs.get_block(&self.inode, file_block) {
                    Err(err) => return self.fail(err),
                    // A hole in a directory carries no entries.
                    Ok(None) => {
                        self.offset += block_size as u64;
                        continue;
                    }
                    Ok(Some(block)) => {
                        if let Err(err) = self.fs.read_block(block, &mut self.block) {
                            return self.fail(err);
                        }
                        self.pos = 0;
                        self.loaded = true;
                    }
                }
            }

            if self.pos >= block_size {
                self.loaded = false;
                self.offset += block_size as u64;
                continue;
            }

            let Ok((header, _)) = DirEntryRaw::read_from_prefix(&self.block[self.pos..]) else {
                return self.fail(FsError::CorruptDirectory);
            };

            let rec_len = header.rec_len.get() as usize;
            if rec_len < DIRENT_HEADER_SIZE || rec_len % 4 != 0 || self.pos + rec_len > block_size
            {
                return self.fail(FsError::CorruptDirectory);
            }

            let name_len = header.name_len as usize;
            if DIRENT_HEADER_SIZE + name_len > rec_len {
                return self.fail(FsError::CorruptDirectory);
            }

            let name_start = self.pos + DIRENT_HEADER_SIZE;
            self.pos += rec_len;

            // Tombstone: the slot is dead but its record length counts.
            if header.inode.get() == 0 {
                continue;
            }

            let file_type = if self.typed {
                FileType::from_dirent_type(header.file_type)
            } else {
                FileType::Unknown
            };

            return Some(Ok(DirEntry {
                ino: header.inode.get(),
                file_type,
                name: self.block[name_start..name_start + name_len].to_vec(),
            }));
        }
    }
}
