//! Frame-of-reference compression of `u64` groups.
//!
//! Values are compressed in groups of at most [`FOR_BLOCK_LEN`] integers. The
//! number of values in a group is not stored: the decoder is always told how
//! many values to expect. Each group is laid out as
//!
//! ```text
//! ┌──────┬────────────────────┬──────────┬───────────────────────────┐
//! │ kind │ reference (uleb128)│ num_bits │ bitpacked residuals       │
//! └──────┴────────────────────┴──────────┴───────────────────────────┘
//! ```
//!
//! - `Constant`: every value equals the reference; `num_bits` and residuals
//!   are omitted.
//! - `FrameOfReference`: the reference is the group minimum and every value
//!   is stored as `value - min`.
//! - `Delta`: only used for non-decreasing groups. The reference is the first
//!   value and the remaining `n - 1` values are stored as differences to
//!   their predecessor.
use mldata_error::{mldata_bail, mldata_ensure, mldata_err, MlDataResult};

use super::{bitpacked, uleb128};

/// Maximum number of integers in one group. Part of the block wire format.
pub const FOR_BLOCK_LEN: usize = 128;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Constant = 0,
    FrameOfReference = 1,
    Delta = 2,
}

impl GroupKind {
    fn from_u8(kind: u8) -> MlDataResult<Self> {
        Ok(match kind {
            0 => GroupKind::Constant,
            1 => GroupKind::FrameOfReference,
            2 => GroupKind::Delta,
            k => mldata_bail!(Corruption: "unknown frame-of-reference group kind {}", k),
        })
    }
}

#[inline]
fn bit_width(max: u64) -> usize {
    (u64::BITS - max.leading_zeros()) as usize
}

/// Appends one compressed group holding `values` to `buffer`.
///
/// # Panics
/// Panics if `values.len() > FOR_BLOCK_LEN`.
pub fn encode(values: &[u64], buffer: &mut Vec<u8>) {
    assert!(values.len() <= FOR_BLOCK_LEN);
    let Some(&first) = values.first() else {
        return;
    };

    let mut min = first;
    let mut max = first;
    let mut max_delta = 0;
    let mut sorted = true;
    let mut prev = first;
    for &v in &values[1..] {
        min = min.min(v);
        max = max.max(v);
        if v < prev {
            sorted = false;
        } else {
            max_delta = max_delta.max(v - prev);
        }
        prev = v;
    }

    if min == max {
        buffer.push(GroupKind::Constant as u8);
        uleb128::encode_into(min, buffer);
        return;
    }

    let mut residuals = [0u64; FOR_BLOCK_LEN];
    let for_bits = bit_width(max - min);
    let delta_bits = bit_width(max_delta);

    if sorted && delta_bits < for_bits {
        let residuals = &mut residuals[..values.len() - 1];
        for (r, w) in residuals.iter_mut().zip(values.windows(2)) {
            *r = w[1] - w[0];
        }
        buffer.push(GroupKind::Delta as u8);
        uleb128::encode_into(first, buffer);
        buffer.push(delta_bits as u8);
        bitpacked::pack(residuals, delta_bits, buffer);
    } else {
        let residuals = &mut residuals[..values.len()];
        for (r, v) in residuals.iter_mut().zip(values) {
            *r = v - min;
        }
        buffer.push(GroupKind::FrameOfReference as u8);
        uleb128::encode_into(min, buffer);
        buffer.push(for_bits as u8);
        bitpacked::pack(residuals, for_bits, buffer);
    }
}

/// Decodes one group of `out.len()` values from the front of `buffer`,
/// advancing it past the consumed bytes.
///
/// # Panics
/// Panics if `out.len() > FOR_BLOCK_LEN`.
pub fn decode<'a>(buffer: &mut &'a [u8], out: &mut [u64]) -> MlDataResult<()> {
    assert!(out.len() <= FOR_BLOCK_LEN);
    if out.is_empty() {
        return Ok(());
    }

    let data: &'a [u8] = *buffer;
    let (&kind, rest) = data
        .split_first()
        .ok_or_else(|| mldata_err!(corrupted = "missing frame-of-reference group"))?;
    let kind = GroupKind::from_u8(kind)?;
    let (reference, consumed) = uleb128::decode(rest)?;
    let mut rest = &rest[consumed..];

    if kind == GroupKind::Constant {
        out.fill(reference);
        *buffer = rest;
        return Ok(());
    }

    let (&num_bits, tail) = rest
        .split_first()
        .ok_or_else(|| mldata_err!(corrupted = "missing frame-of-reference bit width"))?;
    let num_bits = num_bits as usize;
    mldata_ensure!(num_bits <= 64, Corruption: "invalid bit width {}", num_bits);
    rest = tail;

    let n_residuals = match kind {
        GroupKind::Delta => out.len() - 1,
        _ => out.len(),
    };
    let n_bytes = bitpacked::packed_len(n_residuals, num_bits);
    mldata_ensure!(
        rest.len() >= n_bytes,
        Corruption: "frame-of-reference group needs {} bytes, {} left", n_bytes, rest.len()
    );
    let (packed, tail) = rest.split_at(n_bytes);

    match kind {
        GroupKind::FrameOfReference => {
            bitpacked::unpack(packed, num_bits, out);
            out.iter_mut().for_each(|v| *v = v.wrapping_add(reference));
        },
        GroupKind::Delta => {
            out[0] = reference;
            bitpacked::unpack(packed, num_bits, &mut out[1..]);
            let mut acc = reference;
            for v in out[1..].iter_mut() {
                acc = acc.wrapping_add(*v);
                *v = acc;
            }
        },
        GroupKind::Constant => unreachable!(),
    }

    *buffer = tail;
    Ok(())
}

/// Encodes `values` as consecutive groups of [`FOR_BLOCK_LEN`].
pub fn encode_chunked(values: &[u64], buffer: &mut Vec<u8>) {
    for chunk in values.chunks(FOR_BLOCK_LEN) {
        encode(chunk, buffer);
    }
}

/// Decodes consecutive groups of [`FOR_BLOCK_LEN`] until `out` is filled.
pub fn decode_chunked(buffer: &mut &[u8], out: &mut [u64]) -> MlDataResult<()> {
    for chunk in out.chunks_mut(FOR_BLOCK_LEN) {
        decode(buffer, chunk)?;
    }
    Ok(())
}
