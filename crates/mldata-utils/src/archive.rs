//! Typed little-endian byte streams for metadata and block payloads.
//!
//! Layout of the primitives:
//! - `u64`: 8 bytes little endian
//! - `bool`: one byte, `0` or `1`
//! - blob: `u64` byte length followed by the bytes
//! - bitset: `u64` bit length followed by `ceil(len / 64)` `u64` words
use bytes::{Buf, BufMut};
use mldata_error::{mldata_bail, mldata_ensure, MlDataResult};

use crate::bitset::Bitset;

#[derive(Debug, Default, Clone)]
pub struct ArchiveWriter {
    buf: Vec<u8>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn write_u64(&mut self, value: u64) {
        self.buf.put_u64_le(value);
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buf.put_u8(value as u8);
    }

    /// Writes `bytes` verbatim, without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }

    /// Writes `bytes` prefixed by their length.
    pub fn write_blob(&mut self, bytes: &[u8]) {
        self.write_u64(bytes.len() as u64);
        self.buf.put_slice(bytes);
    }

    pub fn write_bitset(&mut self, bits: &Bitset) {
        self.write_u64(bits.len() as u64);
        for &word in bits.words() {
            self.write_u64(word);
        }
    }

    /// Direct access for encoders that append to the byte buffer themselves.
    pub fn buffer_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads the primitives written by [`ArchiveWriter`].
///
/// Every read checks the remaining length first: running out of bytes is a
/// corruption signal, never a panic.
#[derive(Debug, Clone)]
pub struct ArchiveReader<'a> {
    buf: &'a [u8],
}

impl<'a> ArchiveReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    #[inline]
    fn ensure_remaining(&self, n: usize) -> MlDataResult<()> {
        mldata_ensure!(
            self.buf.remaining() >= n,
            Corruption: "unexpected end of stream: needed {} bytes, {} left", n, self.buf.remaining()
        );
        Ok(())
    }

    pub fn read_u8(&mut self) -> MlDataResult<u8> {
        self.ensure_remaining(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn read_u64(&mut self) -> MlDataResult<u64> {
        self.ensure_remaining(8)?;
        Ok(self.buf.get_u64_le())
    }

    /// Reads a `u64` that counts items held in memory.
    pub fn read_len(&mut self) -> MlDataResult<usize> {
        let len = self.read_u64()?;
        match usize::try_from(len) {
            Ok(len) => Ok(len),
            Err(_) => mldata_bail!(Corruption: "length {} does not fit in memory", len),
        }
    }

    pub fn read_bool(&mut self) -> MlDataResult<bool> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            b => mldata_bail!(Corruption: "invalid boolean byte {:#04x}", b),
        }
    }

    /// Reads `n` raw bytes.
    pub fn read_raw(&mut self, n: usize) -> MlDataResult<&'a [u8]> {
        self.ensure_remaining(n)?;
        let buf: &'a [u8] = self.buf;
        let (head, tail) = buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    pub fn read_blob(&mut self) -> MlDataResult<&'a [u8]> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    pub fn read_bitset(&mut self) -> MlDataResult<Bitset> {
        let len = self.read_len()?;
        let n_words = len.div_ceil(u64::BITS as usize);
        self.ensure_remaining(n_words.saturating_mul(8))?;
        let words = (0..n_words).map(|_| self.buf.get_u64_le()).collect();
        Bitset::from_words(words, len)
    }

    /// Direct access for decoders that consume the byte buffer themselves.
    pub fn buffer_mut(&mut self) -> &mut &'a [u8] {
        &mut self.buf
    }

    pub fn remaining(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}
