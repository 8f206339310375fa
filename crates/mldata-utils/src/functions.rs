/// Splits `len` items into `n` contiguous `(offset, len)` shards.
///
/// The last shard absorbs the remainder, so shards cover `0..len` exactly and
/// in order.
pub fn split_offsets(len: usize, n: usize) -> Vec<(usize, usize)> {
    if n <= 1 {
        vec![(0, len)]
    } else {
        let chunk_size = len / n;

        (0..n)
            .map(|partition| {
                let offset = partition * chunk_size;
                let len = if partition == (n - 1) {
                    len - offset
                } else {
                    chunk_size
                };
                (offset, len)
            })
            .collect()
    }
}

/// Returns the ceil of value / 8
#[inline]
pub fn ceil8(value: usize) -> usize {
    value.div_ceil(8)
}
