//! Persisted form of a [`RowDataBlock`].
//!
//! ```text
//! u64   version (= 1)
//! bool  all_integers
//! u64   number of cells
//! ── all_integers ──────────────────────────────────────────────
//!   frame-of-reference groups over the raw cell bits
//! ── mixed ─────────────────────────────────────────────────────
//!   u64     n_integers
//!   u64     n_doubles
//!   u64     n_doubles_as_ints
//!   bitset  integer cells, over all cells
//!   bitset  doubles-as-ints, over the non-integer cells
//!   u64 × n_doubles           true doubles, raw bits
//!   frame-of-reference groups, doubles-as-ints
//!   frame-of-reference groups, integers
//! ── tail ──────────────────────────────────────────────────────
//! blob  additional data (bincode)
//! u64   checksum (= 0x259e2e6d7a32c5c0)
//! ```
//!
//! A cell is an integer if its bits are at most `u32::MAX`; index and size
//! cells always are. A non-integer cell is a double-as-int if it holds a
//! non-negative integral double that survives `f64 -> u64 -> f64`; those are
//! stored as the integer they represent.
use mldata_error::{mldata_ensure, mldata_err, MlDataResult};
use mldata_utils::archive::{ArchiveReader, ArchiveWriter};
use mldata_utils::bitset::Bitset;
use mldata_utils::config::verbose_print;
use mldata_utils::encoding::frame_of_reference::{decode_chunked, encode_chunked, FOR_BLOCK_LEN};
use mldata_utils::serialize::{deserialize_from_bytes, serialize_to_bytes};

use crate::block::RowDataBlock;
use crate::entry::EntryValue;
use crate::value::Value;

pub const ROW_BLOCK_VERSION: u64 = 1;
pub const ROW_BLOCK_CHECKSUM: u64 = 0x259e_2e6d_7a32_c5c0;

/// 2^64 as a double; the first double that no longer fits a `u64`.
const U64_RANGE_END: f64 = 18_446_744_073_709_551_616.0;

#[inline]
fn is_integer_cell(bits: u64) -> bool {
    bits <= u32::MAX as u64
}

/// The integer a double-valued cell represents, if it round-trips exactly.
#[inline]
fn double_as_int(bits: u64) -> Option<u64> {
    let d = f64::from_bits(bits);
    if d >= 0.0 && d < U64_RANGE_END {
        let v = d as u64;
        ((v as f64).to_bits() == bits).then_some(v)
    } else {
        None
    }
}

fn write_mixed(raw: &[u64], writer: &mut ArchiveWriter) {
    let mut integers = Vec::with_capacity(raw.len());
    let mut doubles = vec![];
    let mut doubles_as_ints = vec![];
    let mut integer_mask = Bitset::with_capacity(raw.len());
    let mut double_as_int_mask = Bitset::new();

    for &bits in raw {
        if is_integer_cell(bits) {
            integer_mask.push(true);
            integers.push(bits);
            continue;
        }
        integer_mask.push(false);
        match double_as_int(bits) {
            Some(v) => {
                double_as_int_mask.push(true);
                doubles_as_ints.push(v);
            },
            None => {
                double_as_int_mask.push(false);
                doubles.push(bits);
            },
        }
    }

    writer.write_u64(integers.len() as u64);
    writer.write_u64(doubles.len() as u64);
    writer.write_u64(doubles_as_ints.len() as u64);
    writer.write_bitset(&integer_mask);
    writer.write_bitset(&double_as_int_mask);
    for &bits in &doubles {
        writer.write_u64(bits);
    }
    encode_chunked(&doubles_as_ints, writer.buffer_mut());
    encode_chunked(&integers, writer.buffer_mut());

    verbose_print(|| {
        format!(
            "row block: mixed encoding, {} integers, {} doubles, {} doubles-as-ints",
            integers.len(),
            doubles.len(),
            doubles_as_ints.len()
        )
    });
}

fn read_all_integers(reader: &mut ArchiveReader<'_>, n: usize) -> MlDataResult<Vec<u64>> {
    // Every group costs at least a kind byte and a reference byte.
    let min_bytes = n.div_ceil(FOR_BLOCK_LEN).saturating_mul(2);
    mldata_ensure!(
        min_bytes <= reader.remaining(),
        Corruption: "{} cells cannot be stored in {} bytes", n, reader.remaining()
    );
    let mut raw = vec![0u64; n];
    decode_chunked(reader.buffer_mut(), &mut raw)?;
    Ok(raw)
}

fn read_mixed(reader: &mut ArchiveReader<'_>, n: usize) -> MlDataResult<Vec<u64>> {
    let n_integers = reader.read_len()?;
    let n_doubles = reader.read_len()?;
    let n_doubles_as_ints = reader.read_len()?;
    let total = n_integers
        .checked_add(n_doubles)
        .and_then(|t| t.checked_add(n_doubles_as_ints));
    mldata_ensure!(
        total == Some(n),
        Corruption: "cell counts {} + {} + {} do not add up to {}", n_integers, n_doubles, n_doubles_as_ints, n
    );

    let integer_mask = reader.read_bitset()?;
    mldata_ensure!(
        integer_mask.len() == n && integer_mask.count_ones() == n_integers,
        Corruption: "integer bitset does not match {} integers in {} cells", n_integers, n
    );
    let double_as_int_mask = reader.read_bitset()?;
    mldata_ensure!(
        double_as_int_mask.len() == n - n_integers
            && double_as_int_mask.count_ones() == n_doubles_as_ints,
        Corruption: "doubles-as-ints bitset does not match {} of {} non-integer cells", n_doubles_as_ints, n - n_integers
    );

    mldata_ensure!(
        n_doubles.saturating_mul(8) <= reader.remaining(),
        Corruption: "{} doubles cannot be stored in {} bytes", n_doubles, reader.remaining()
    );
    let doubles = (0..n_doubles)
        .map(|_| reader.read_u64())
        .collect::<MlDataResult<Vec<_>>>()?;

    let mut doubles_as_ints = vec![0u64; n_doubles_as_ints];
    decode_chunked(reader.buffer_mut(), &mut doubles_as_ints)?;
    let mut integers = vec![0u64; n_integers];
    decode_chunked(reader.buffer_mut(), &mut integers)?;

    // The bitsets were checked against the counts, so every stream holds
    // exactly the values the masks ask for.
    let mut integers = integers.into_iter();
    let mut doubles = doubles.into_iter();
    let mut doubles_as_ints = doubles_as_ints.into_iter();
    let mut non_integer_idx = 0;
    let mut raw = Vec::with_capacity(n);
    for is_integer in integer_mask.iter() {
        let next = if is_integer {
            integers.next()
        } else {
            let is_double_as_int = double_as_int_mask.get(non_integer_idx);
            non_integer_idx += 1;
            if is_double_as_int {
                doubles_as_ints.next().map(|v| (v as f64).to_bits())
            } else {
                doubles.next()
            }
        };
        raw.push(next.ok_or_else(|| mldata_err!(corrupted = "cell streams exhausted early"))?);
    }
    Ok(raw)
}

impl RowDataBlock {
    /// Appends the persisted form of the block to `writer`.
    pub fn save(&self, writer: &mut ArchiveWriter) -> MlDataResult<()> {
        let raw: &[u64] = bytemuck::cast_slice(self.entry_data());
        let all_integers = raw.iter().all(|&bits| is_integer_cell(bits));

        writer.write_u64(ROW_BLOCK_VERSION);
        writer.write_bool(all_integers);
        writer.write_u64(raw.len() as u64);
        if all_integers {
            encode_chunked(raw, writer.buffer_mut());
            verbose_print(|| format!("row block: all-integer encoding, {} cells", raw.len()));
        } else {
            write_mixed(raw, writer);
        }

        let additional_data = serialize_to_bytes(&self.additional_data())?;
        writer.write_blob(&additional_data);
        writer.write_u64(ROW_BLOCK_CHECKSUM);
        Ok(())
    }

    /// Reads a block written by [`save`](Self::save).
    ///
    /// An unsupported version, inconsistent counts or a checksum mismatch
    /// fail with [`MlDataError::Corruption`](mldata_error::MlDataError::Corruption);
    /// no partially decoded block is ever returned.
    pub fn load(reader: &mut ArchiveReader<'_>) -> MlDataResult<Self> {
        let version = reader.read_u64()?;
        mldata_ensure!(
            version == ROW_BLOCK_VERSION,
            Corruption: "unsupported row block version {}", version
        );
        let all_integers = reader.read_bool()?;
        let n = reader.read_len()?;

        let raw = if all_integers {
            read_all_integers(reader, n)?
        } else {
            read_mixed(reader, n)?
        };

        let additional_data: Vec<Value> = deserialize_from_bytes(reader.read_blob()?)
            .map_err(|e| mldata_err!(Corruption: "additional data: {}", e))?;

        let checksum = reader.read_u64()?;
        mldata_ensure!(
            checksum == ROW_BLOCK_CHECKSUM,
            Corruption: "row block checksum mismatch: {:#018x}", checksum
        );

        let mut block = RowDataBlock::from_entries(bytemuck::allocation::cast_vec::<u64, EntryValue>(raw));
        block.set_additional_data(additional_data);
        Ok(block)
    }

    pub fn save_to_bytes(&self) -> MlDataResult<Vec<u8>> {
        let mut writer = ArchiveWriter::with_capacity(self.len() * 2 + 64);
        self.save(&mut writer)?;
        Ok(writer.into_bytes())
    }

    /// Loads a block that must span all of `bytes`.
    pub fn load_from_bytes(bytes: &[u8]) -> MlDataResult<Self> {
        let mut reader = ArchiveReader::new(bytes);
        let block = Self::load(&mut reader)?;
        mldata_ensure!(
            reader.is_empty(),
            Corruption: "{} trailing bytes after row block", reader.remaining()
        );
        Ok(block)
    }
}
