use mldata_error::{mldata_ensure, MlDataResult};

const WORD_BITS: usize = u64::BITS as usize;

/// A growable, densely packed sequence of bits backed by `u64` words.
///
/// Bit `i` lives in word `i / 64` at position `i % 64` (LSB first). Bits past
/// `len` in the last word are always zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitset {
    words: Vec<u64>,
    len: usize,
}

impl Bitset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            words: Vec::with_capacity(capacity.div_ceil(WORD_BITS)),
            len: 0,
        }
    }

    /// Rebuilds a bitset from its word representation.
    pub fn from_words(words: Vec<u64>, len: usize) -> MlDataResult<Self> {
        mldata_ensure!(
            words.len() == len.div_ceil(WORD_BITS),
            Corruption: "bitset of {} bits cannot be stored in {} words", len, words.len()
        );
        if len % WORD_BITS != 0 {
            let tail = words[words.len() - 1] >> (len % WORD_BITS);
            mldata_ensure!(tail == 0, Corruption: "bitset has bits set past its length");
        }
        Ok(Self { words, len })
    }

    #[inline]
    pub fn push(&mut self, value: bool) {
        if self.len % WORD_BITS == 0 {
            self.words.push(0);
        }
        if value {
            self.words[self.len / WORD_BITS] |= 1 << (self.len % WORD_BITS);
        }
        self.len += 1;
    }

    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(index < self.len);
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 == 1
    }

    /// # Panics
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(index < self.len);
        let mask = 1 << (index % WORD_BITS);
        if value {
            self.words[index / WORD_BITS] |= mask;
        } else {
            self.words[index / WORD_BITS] &= !mask;
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.len).map(|i| self.get(i))
    }
}

impl FromIterator<bool> for Bitset {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let iter = iter.into_iter();
        let mut out = Bitset::with_capacity(iter.size_hint().0);
        iter.for_each(|b| out.push(b));
        out
    }
}
