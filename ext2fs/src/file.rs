//! Positioned reads from a regular-file inode.

use std::io::{self, Read, Seek, SeekFrom};

use crate::Ext2Fs;
use crate::block::BlockDevice;
use crate::error::FsError;
use crate::structs::{DIRECT_POINTERS, Inode};

/// One decoded indirect block.
struct CachedIndirect {
    block: u32,
    pointers: Vec<u32>,
}

/// An open file with a cursor.
///
/// Implements [`std::io::Read`] and [`std::io::Seek`]. Unlike the
/// resolver behind [`Ext2Fs::read_at`], the file keeps the most recently
/// decoded indirect block per indirection level, so a sequential read does
/// not re-fetch the same indirect block for every logical block it
/// crosses. The cache belongs to this file alone and dies with it.
pub struct Ext2File<'f, 'd, D: BlockDevice + ?Sized> {
    fs: &'f mut Ext2Fs<'d, D>,
    inode: Inode,
    ino: u32,
    size: u64,
    pos: u64,
    /// Cached indirect blocks, indexed by level (0 = innermost).
    cache: [Option<CachedIndirect>; 3],
}

impl<'f, 'd, D: BlockDevice + ?Sized> Ext2File<'f, 'd, D> {
    pub(crate) fn new(fs: &'f mut Ext2Fs<'d, D>, ino: u32, inode: Inode) -> Self {
        let size = fs.file_size(&inode);
        Self {
            fs,
            inode,
            ino,
            size,
            pos: 0,
            cache: [None, None, None],
        }
    }

    /// Inode number of the open file.
    pub fn ino(&self) -> u32 {
        self.ino
    }

    /// The file's decoded inode.
    pub fn inode(&self) -> &Inode {
        &self.inode
    }

    /// Logical file size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Map a logical file block to a physical block, using the per-level
    /// cache for the indirect levels.
    fn get_block(&mut self, file_block: u64) -> Result<Option<u32>, FsError> {
        let p = u64::from(self.fs.block_size() / 4);

        let ptr = if file_block < DIRECT_POINTERS as u64 {
            self.inode.block[file_block as usize].get()
        } else {
            let fb = file_block - DIRECT_POINTERS as u64;
            if fb < p {
                self.cached_ptr(0, self.inode.block[12].get(), fb as u32)?
            } else {
                let fb = fb - p;
                if fb < p * p {
                    let ind = self.cached_ptr(1, self.inode.block[13].get(), (fb / p) as u32)?;
                    self.cached_ptr(0, ind, (fb % p) as u32)?
                } else {
                    let fb = fb - p * p;
                    if fb >= p * p * p {
                        return Err(FsError::FileBlockOutOfRange(file_block));
                    }
                    let dbl =
                        self.cached_ptr(2, self.inode.block[14].get(), (fb / (p * p)) as u32)?;
                    let ind = self.cached_ptr(1, dbl, ((fb / p) % p) as u32)?;
                    self.cached_ptr(0, ind, (fb % p) as u32)?
                }
            }
        };

        if ptr == 0 {
            Ok(None)
        } else if ptr >= self.fs.superblock().blocks_count.get() {
            Err(FsError::CorruptIndirectBlock(ptr))
        } else {
            Ok(Some(ptr))
        }
    }

    /// Read one pointer out of an indirect block, decoding and caching the
    /// whole block on a miss.
    fn cached_ptr(&mut self, level: usize, block: u32, index: u32) -> Result<u32, FsError> {
        if block == 0 {
            return Ok(0);
        }
        if block >= self.fs.superblock().blocks_count.get() {
            return Err(FsError::CorruptIndirectBlock(block));
        }

        if let Some(cached) = &self.cache[level] {
            if cached.block == block {
                return Ok(cached.pointers.get(index as usize).copied().unwrap_or(0));
            }
        }

        let mut buf = vec![0u8; self.fs.block_size() as usize];
        self.fs.read_block(block, &mut buf)?;

        let pointers: Vec<u32> = buf
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        let ptr = pointers.get(index as usize).copied().unwrap_or(0);
        self.cache[level] = Some(CachedIndirect { block, pointers });
        Ok(ptr)
    }

    fn read_inner(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        if self.pos >= self.size {
            return Ok(0);
        }

        let to_read = (buf.len() as u64).min(self.size - self.pos) as usize;
        let block_size = u64::from(self.fs.block_size());
        let mut done = 0;

        while done < to_read {
            let file_block = self.pos / block_size;
            let within = (self.pos % block_size) as usize;
            let chunk = (block_size as usize - within).min(to_read - done);

            match self.get_block(file_block)? {
                // Sparse hole: fill with zeros.
                None => buf[done..done + chunk].fill(0),
                Some(block) => {
                    let disk_offset = u64::from(block) * block_size + within as u64;
                    self.fs.read_raw(disk_offset, &mut buf[done..done + chunk])?;
                }
            }

            done += chunk;
            self.pos += chunk as u64;
        }

        Ok(done)
    }
}

impl<'f, 'd, D: BlockDevice + ?Sized> Read for Ext2File<'f, 'd, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_inner(buf).map_err(io::Error::from)
    }
}

impl<'f, 'd, D: BlockDevice + ?Sized> Seek for Ext2File<'f, 'd, D> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(n) => Some(n),
            SeekFrom::Current(off) => self.pos.checked_add_signed(off),
            SeekFrom::End(off) => self.size.checked_add_signed(off),
        };
        match new_pos {
            Some(p) => {
                self.pos = p;
                Ok(p)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative position",
            )),
        }
    }
}
