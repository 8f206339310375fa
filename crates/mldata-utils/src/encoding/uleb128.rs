use mldata_error::{mldata_bail, MlDataResult};

/// Decodes an uleb128 integer from the start of `values`.
/// Returns the integer and the number of bytes that made up this integer.
pub fn decode(values: &[u8]) -> MlDataResult<(u64, usize)> {
    let mut result = 0;
    let mut shift = 0;

    for (consumed, byte) in values.iter().enumerate() {
        if shift == 63 && *byte > 1 {
            mldata_bail!(Corruption: "uleb128 integer overflows 64 bits");
        }

        result |= u64::from(byte & 0b01111111) << shift;

        if byte & 0b10000000 == 0 {
            return Ok((result, consumed + 1));
        }

        shift += 7;
        if shift > 63 {
            mldata_bail!(Corruption: "uleb128 integer is longer than 10 bytes");
        }
    }
    mldata_bail!(Corruption: "unexpected end of stream inside uleb128 integer")
}

/// Appends the ULEB128 encoding of `value` to `buffer`: at most 10 bytes.
pub fn encode_into(mut value: u64, buffer: &mut Vec<u8>) {
    loop {
        let byte = (value & 0b01111111) as u8;
        value >>= 7;
        if value == 0 {
            buffer.push(byte);
            return;
        }
        buffer.push(byte | 0b10000000);
    }
}
