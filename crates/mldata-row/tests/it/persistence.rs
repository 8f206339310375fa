use std::sync::Arc;

use mldata_row::{
    compile_parallel, ColumnIndexer, ColumnStatistics, CompileOptions, RowDataBlock, Value,
};
use mldata_utils::archive::{ArchiveReader, ArchiveWriter};

use crate::mixed_dataset;

#[test]
fn test_compiled_shards_round_trip() {
    let indexer = Arc::new(ColumnIndexer::new());
    let (metadata, columns) = mixed_dataset(indexer, 500);
    let mut statistics = ColumnStatistics::for_metadata(&metadata);
    let out = compile_parallel(
        &metadata,
        &columns,
        &mut statistics,
        CompileOptions::default(),
        3,
    )
    .unwrap();

    // Several blocks back to back in one stream.
    let mut writer = ArchiveWriter::new();
    for (i, shard) in out.shards.iter().enumerate() {
        let mut block = shard.block.clone();
        block.set_additional_data(vec![Value::Integer(i as i64)]);
        block.save(&mut writer).unwrap();
    }

    let bytes = writer.into_bytes();
    let mut reader = ArchiveReader::new(&bytes);
    for (i, shard) in out.shards.iter().enumerate() {
        let loaded = RowDataBlock::load(&mut reader).unwrap();
        assert_eq!(loaded.entry_data(), shard.block.entry_data());
        assert_eq!(loaded.additional_data(), &[Value::Integer(i as i64)]);
        assert_eq!(
            loaded.num_rows(&metadata).unwrap(),
            shard.row_range.len()
        );
    }
    assert!(reader.is_empty());
}

#[test]
fn test_corrupted_stream_is_rejected() {
    let indexer = Arc::new(ColumnIndexer::new());
    let (metadata, columns) = mixed_dataset(indexer, 50);
    let mut statistics = ColumnStatistics::for_metadata(&metadata);
    let out = compile_parallel(
        &metadata,
        &columns,
        &mut statistics,
        CompileOptions::default(),
        1,
    )
    .unwrap();
    let bytes = out.shards[0].block.save_to_bytes().unwrap();

    let mut flipped = bytes.clone();
    let last = flipped.len() - 1;
    flipped[last] ^= 0x10;
    assert!(RowDataBlock::load_from_bytes(&flipped).is_err());

    assert!(RowDataBlock::load_from_bytes(&bytes[..bytes.len() / 2]).is_err());
}
