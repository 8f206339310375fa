use std::sync::Arc;

use mldata_row::{
    compile_parallel, decode_row, index_remapping, reindex_block, translate_row, truncate_block,
    CategoricalIndexer, ColumnIndexer, ColumnStatistics, CompileOptions, RowDataBlock, Value,
    UNKNOWN_INDEX,
};

use crate::{mixed_dataset, COLORS};

#[test]
fn test_compile_persist_reindex_translate() {
    let train_indexer = Arc::new(ColumnIndexer::new());
    let (metadata, columns) = mixed_dataset(train_indexer.clone(), 200);
    let mut statistics = ColumnStatistics::for_metadata(&metadata);
    let out = compile_parallel(
        &metadata,
        &columns,
        &mut statistics,
        CompileOptions::default(),
        4,
    )
    .unwrap();
    assert_eq!(train_indexer.indexed_column_size(), COLORS.len());
    assert_eq!(out.summary.num_unseen_categories, 0);

    // Missing prices are imputed, never counted.
    let missing = (0..200).filter(|i| i % 7 == 3).count() as u64;
    assert_eq!(statistics[0].count(0), 200 - missing);

    // A vocabulary with a different numbering, as after merging datasets.
    let merged_indexer = Arc::new(ColumnIndexer::from_values(["purple", "cyan", "blue", "green", "red"]));
    let remap = index_remapping(train_indexer.as_ref(), merged_indexer.as_ref());
    assert!(remap.iter().all(|&idx| idx != UNKNOWN_INDEX));
    let (merged_metadata, _) = mixed_dataset(merged_indexer, 0);

    for shard in &out.shards {
        let mut block = RowDataBlock::load_from_bytes(&shard.block.save_to_bytes().unwrap()).unwrap();
        let remap = Some(remap.as_slice());
        reindex_block(
            &metadata,
            &mut block,
            &[None, remap, None, None, remap, remap],
        )
        .unwrap();

        for (i, &offset) in shard.row_offsets.iter().enumerate() {
            let row = shard.row_range.start + i;
            let (before, size) = translate_row(&metadata, shard.block.entry_data(), offset).unwrap();
            let (after, _) = translate_row(&merged_metadata, block.entry_data(), offset).unwrap();
            assert_eq!(before, after);
            assert_eq!(after[1], columns[1][row]);
            assert_eq!(after[3], Value::Undefined);
            if row % 7 != 3 {
                assert_eq!(after[0], columns[0][row]);
            }

            let mut entries = vec![];
            assert_eq!(decode_row(&metadata, block.entry_data(), offset, &mut entries).unwrap(), size);
            assert!(entries.iter().all(|e| e.column_index != 3));
        }
    }
}

#[test]
fn test_frozen_indexer_at_inference() {
    let indexer = Arc::new(ColumnIndexer::from_values(["red", "green"]));
    let (metadata, columns) = mixed_dataset(indexer.clone(), 40);
    let mut statistics = ColumnStatistics::for_metadata(&metadata);
    let options = CompileOptions {
        immutable_indexing: true,
        track_statistics: false,
        ..Default::default()
    };
    let out = compile_parallel(&metadata, &columns, &mut statistics, options, 2).unwrap();
    assert!(out.summary.num_unseen_categories > 0);
    assert_eq!(indexer.indexed_column_size(), 2);

    // Truncating every shard to one row leaves exactly its first row.
    for shard in &out.shards {
        let mut block = shard.block.clone();
        truncate_block(&metadata, &mut block, 1).unwrap();
        assert_eq!(block.len(), shard.row_offsets[1]);
        let (values, _) = translate_row(&metadata, block.entry_data(), 0).unwrap();
        let expected_color = match &columns[1][shard.row_range.start] {
            Value::String(s) if s.as_str() == "red" || s.as_str() == "green" => Value::String(s.clone()),
            _ => Value::Undefined,
        };
        assert_eq!(values[1], expected_color);
    }
}
