//! Random-access byte sources for heap decoding

use std::fs::File;
use std::io;
use std::os::unix::fs::FileExt;

/// Byte-addressable memory of another process
///
/// Every read is positional: there is no cursor, and each call reads exactly
/// `buf.len()` bytes at absolute address `addr` or fails.
pub trait MemorySource {
    /// Fill `buf` with the bytes at `addr`
    ///
    /// # Errors
    /// Returns an error if any byte in the range is unreadable
    fn read_at(&mut self, addr: u64, buf: &mut [u8]) -> io::Result<()>;
}

/// `/proc/<pid>/mem`, or any file holding a flat memory image
impl MemorySource for File {
    fn read_at(&mut self, addr: u64, buf: &mut [u8]) -> io::Result<()> {
        self.read_exact_at(buf, addr)
    }
}

/// An in-memory image whose first byte is address 0
impl MemorySource for Vec<u8> {
    fn read_at(&mut self, addr: u64, buf: &mut [u8]) -> io::Result<()> {
        let bytes = usize::try_from(addr)
            .ok()
            .and_then(|start| Some(start..start.checked_add(buf.len())?))
            .and_then(|range| self.get(range))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!("0x{addr:x}+{} is outside the {} byte image", buf.len(), self.len()),
                )
            })?;
        buf.copy_from_slice(bytes);
        Ok(())
    }
}

impl<S: MemorySource + ?Sized> MemorySource for &mut S {
    fn read_at(&mut self, addr: u64, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_at(addr, buf)
    }
}
