//! FNV-1a hashing for file checksums.
//!
//! Not cryptographic. Detects truncation and bit rot in step files.

use std::io::{self, Read, Write};

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Feed a single byte into an FNV-1a hash state.
#[inline]
fn fnv1a_byte(hash: u64, byte: u8) -> u64 {
    (hash ^ byte as u64).wrapping_mul(FNV_PRIME)
}

/// Feed a byte slice into an FNV-1a hash state.
#[inline]
fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = fnv1a_byte(hash, b);
    }
    hash
}

/// FNV-1a 64 of `bytes`.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    fnv1a_bytes(FNV_OFFSET, bytes)
}

/// A writer that hashes every byte it forwards.
pub struct HashingWriter<'a> {
    inner: &'a mut dyn Write,
    hash: u64,
}

impl<'a> HashingWriter<'a> {
    /// Wrap `inner`, starting from the FNV offset basis.
    pub fn new(inner: &'a mut dyn Write) -> Self {
        Self {
            inner,
            hash: FNV_OFFSET,
        }
    }

    /// Hash of everything written so far.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The wrapped writer, for bytes that must not be hashed.
    pub fn inner(&mut self) -> &mut dyn Write {
        &mut *self.inner
    }
}

impl Write for HashingWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hash = fnv1a_bytes(self.hash, &buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A reader that hashes every byte it yields.
pub struct HashingReader<'a> {
    inner: &'a mut dyn Read,
    hash: u64,
}

impl<'a> HashingReader<'a> {
    /// Wrap `inner`, starting from the FNV offset basis.
    pub fn new(inner: &'a mut dyn Read) -> Self {
        Self {
            inner,
            hash: FNV_OFFSET,
        }
    }

    /// Hash of everything read so far.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// The wrapped reader, for bytes that must not be hashed.
    pub fn inner(&mut self) -> &mut dyn Read {
        &mut *self.inner
    }
}

impl Read for HashingReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hash = fnv1a_bytes(self.hash, &buf[..n]);
        Ok(n)
    }
}
