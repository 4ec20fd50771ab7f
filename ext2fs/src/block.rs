//! Block device interface for random-access byte I/O.
//!
//! The filesystem layer never touches the host OS directly; everything goes
//! through [`BlockDevice`]. Backends exist for regular host files, in-memory
//! buffers, and sub-ranges of another device (for images embedded in a
//! larger container).

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Errors that can occur during block operations.
#[derive(Debug)]
pub enum BlockError {
    /// I/O error from the host backing.
    Io(io::Error),
    /// A bounded read returned fewer bytes than requested.
    ShortRead {
        offset: u64,
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::Io(err) => write!(f, "i/o error: {err}"),
            BlockError::ShortRead {
                offset,
                expected,
                got,
            } => write!(
                f,
                "short read at offset {offset}: expected {expected} bytes, got {got}"
            ),
        }
    }
}

impl std::error::Error for BlockError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BlockError::Io(err) => Some(err),
            BlockError::ShortRead { .. } => None,
        }
    }
}

impl From<io::Error> for BlockError {
    fn from(err: io::Error) -> Self {
        BlockError::Io(err)
    }
}

/// Block device interface for byte-level access.
///
/// Reads are bounded: a request names an absolute offset and a buffer, and
/// the device reports how many bytes it produced. The device does not
/// interpret its contents. Implementations may keep an internal cursor,
/// which is why reads take `&mut self`.
pub trait BlockDevice {
    /// Device size in bytes.
    fn size(&self) -> u64;

    /// Read bytes at the given byte offset.
    ///
    /// Returns the number of bytes read. May return fewer bytes than
    /// requested at end of device.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BlockError>;

    /// Read exactly `buf.len()` bytes at the given offset.
    ///
    /// A short read is a hard fault; it is reported, never retried.
    fn read_exact_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<(), BlockError> {
        let got = self.read_at(offset, buf)?;
        if got != buf.len() {
            return Err(BlockError::ShortRead {
                offset,
                expected: buf.len(),
                got,
            });
        }
        Ok(())
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn size(&self) -> u64 {
        (**self).size()
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BlockError> {
        (**self).read_at(offset, buf)
    }
}

/// A block device backed by a regular host file.
///
/// The file length is captured at construction time; the device does not
/// follow a file that grows or shrinks underneath it.
pub struct FileBlockDevice {
    file: File,
    size: u64,
}

impl FileBlockDevice {
    /// Open a host file read-only as a block device.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::from_file(File::open(path)?)
    }

    /// Wrap an already-open host file.
    pub fn from_file(file: File) -> io::Result<Self> {
        let size = file.metadata()?.len();
        Ok(Self { file, size })
    }
}

impl BlockDevice for FileBlockDevice {
    fn size(&self) -> u64 {
        self.size
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BlockError> {
        if offset >= self.size {
            return Ok(0);
        }
        let len = buf.len().min((self.size - offset) as usize);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut buf[..len])?;
        Ok(len)
    }
}

/// A block device backed by an in-memory buffer.
#[derive(Debug)]
pub struct MemBlockDevice {
    data: Vec<u8>,
}

impl MemBlockDevice {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl BlockDevice for MemBlockDevice {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BlockError> {
        if offset >= self.data.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let len = buf.len().min(self.data.len() - start);
        buf[..len].copy_from_slice(&self.data[start..start + len]);
        Ok(len)
    }
}

/// A window `[start, start + len)` over another block device.
///
/// Offsets are relative to the window; reads never escape it.
pub struct SubRangeDevice<D> {
    inner: D,
    start: u64,
    len: u64,
}

impl<D: BlockDevice> SubRangeDevice<D> {
    /// Create a window over `inner`. The window is clamped to the inner
    /// device's size.
    pub fn new(inner: D, start: u64, len: u64) -> Self {
        let end = start.saturating_add(len).min(inner.size());
        let len = end.saturating_sub(start);
        Self { inner, start, len }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: BlockDevice> BlockDevice for SubRangeDevice<D> {
    fn size(&self) -> u64 {
        self.len
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, BlockError> {
        if offset >= self.len {
            return Ok(0);
        }
        let len = buf.len().min((self.len - offset) as usize);
        self.inner.read_at(self.start + offset, &mut buf[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_device_truncates_at_eof() {
        let mut dev = MemBlockDevice::new(vec![1, 2, 3, 4]);
        let mut buf = [0u8; 8];
        assert_eq!(dev.read_at(2, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[3, 4]);
        assert_eq!(dev.read_at(4, &mut buf).unwrap(), 0);
        assert_eq!(dev.read_at(100, &mut buf).unwrap(), 0);
    }

    #[test]
    fn read_exact_at_flags_short_reads() {
        let mut dev = MemBlockDevice::new(vec![0u8; 10]);
        let mut buf = [0u8; 8];
        dev.read_exact_at(0, &mut buf).unwrap();
        let err = dev.read_exact_at(5, &mut buf).unwrap_err();
        match err {
            BlockError::ShortRead {
                offset,
                expected,
                got,
            } => {
                assert_eq!(offset, 5);
                assert_eq!(expected, 8);
                assert_eq!(got, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sub_range_offsets_reads() {
        let data: Vec<u8> = (0u8..100).collect();
        let mut dev = SubRangeDevice::new(MemBlockDevice::new(data), 10, 20);
        assert_eq!(dev.size(), 20);
        let mut buf = [0u8; 5];
        dev.read_exact_at(0, &mut buf).unwrap();
        assert_eq!(&buf, &[10, 11, 12, 13, 14]);
        assert_eq!(dev.read_at(18, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], &[28, 29]);
    }

    #[test]
    fn sub_range_clamps_to_inner_device() {
        let dev = SubRangeDevice::new(MemBlockDevice::new(vec![0u8; 10]), 8, 100);
        assert_eq!(dev.size(), 2);
    }

    #[test]
    fn mut_ref_is_a_device() {
        fn total_size<D: BlockDevice>(dev: D) -> u64 {
            dev.size()
        }
        let mut dev = MemBlockDevice::new(vec![0u8; 16]);
        assert_eq!(total_size(&mut dev), 16);
        assert_eq!(dev.size(), 16);
    }

    #[test]
    fn file_device_reads_back_contents() {
        let mut path = std::env::temp_dir();
        path.push(format!("ext2fs-block-test-{}", std::process::id()));
        std::fs::write(&path, b"hello block device").unwrap();

        let mut dev = FileBlockDevice::open(&path).unwrap();
        assert_eq!(dev.size(), 18);
        let mut buf = [0u8; 5];
        dev.read_exact_at(6, &mut buf).unwrap();
        assert_eq!(&buf, b"block");
        assert_eq!(dev.read_at(16, &mut buf).unwrap(), 2);

        std::fs::remove_file(&path).unwrap();
    }
}
