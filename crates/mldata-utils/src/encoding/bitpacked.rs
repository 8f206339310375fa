//! LSB-first bitpacking of `u64` values with an arbitrary bit width.
//!
//! Value `i` occupies bits `i * num_bits .. (i + 1) * num_bits` of the packed
//! byte stream, least significant bit first. A width of zero packs to no bytes.
use crate::ceil8;

/// Number of bytes needed to pack `len` values of `num_bits` bits each.
#[inline]
pub fn packed_len(len: usize, num_bits: usize) -> usize {
    ceil8(len * num_bits)
}

/// Appends the packed representation of `values` to `buffer`.
///
/// Bits of a value above `num_bits` are ignored.
pub fn pack(values: &[u64], num_bits: usize, buffer: &mut Vec<u8>) {
    debug_assert!(num_bits <= 64);
    if num_bits == 0 {
        return;
    }

    let start = buffer.len();
    buffer.resize(start + packed_len(values.len(), num_bits), 0);
    let packed = &mut buffer[start..];

    let mut bit = 0;
    for &value in values {
        let mut value = if num_bits == 64 {
            value
        } else {
            value & ((1u64 << num_bits) - 1)
        };
        let mut remaining = num_bits;
        while remaining > 0 {
            let shift = bit % 8;
            let take = (8 - shift).min(remaining);
            packed[bit / 8] |= ((value & ((1u64 << take) - 1)) as u8) << shift;
            value >>= take;
            remaining -= take;
            bit += take;
        }
    }
}

/// Unpacks `unpacked.len()` values of `num_bits` bits from `packed`.
///
/// # Panics
/// Panics if `packed` is shorter than `packed_len(unpacked.len(), num_bits)`.
pub fn unpack(packed: &[u8], num_bits: usize, unpacked: &mut [u64]) {
    debug_assert!(num_bits <= 64);
    assert!(packed.len() >= packed_len(unpacked.len(), num_bits));

    let mut bit = 0;
    for out in unpacked.iter_mut() {
        let mut value = 0u64;
        let mut filled = 0;
        while filled < num_bits {
            let shift = bit % 8;
            let take = (8 - shift).min(num_bits - filled);
            let bits = (packed[bit / 8] >> shift) as u64 & ((1u64 << take) - 1);
            value |= bits << filled;
            filled += take;
            bit += take;
        }
        *out = value;
    }
}
