mod persistence;
mod pipeline;

use std::sync::Arc;

use mldata_row::{ColumnIndexer, ColumnMetadata, RowMetadata, Value};

pub(crate) const COLORS: [&str; 4] = ["red", "green", "blue", "cyan"];

/// A mixed schema with variable-size rows and `n` rows of deterministic data.
pub(crate) fn mixed_dataset(indexer: Arc<ColumnIndexer>, n: usize) -> (RowMetadata, Vec<Vec<Value>>) {
    let metadata = RowMetadata::try_new(vec![
        ColumnMetadata::numeric("price"),
        ColumnMetadata::categorical("color", indexer.clone()),
        ColumnMetadata::numeric_vector("embedding", 3),
        ColumnMetadata::untranslated("comment"),
        ColumnMetadata::categorical_vector("tags", indexer.clone()),
        ColumnMetadata::dictionary("counts", indexer),
    ])
    .unwrap();

    let price = (0..n)
        .map(|i| {
            if i % 7 == 3 {
                Value::Undefined
            } else {
                Value::Float(i as f64 * 1.25 + 0.1)
            }
        })
        .collect();
    let color = (0..n).map(|i| Value::from(COLORS[i % 4])).collect();
    let embedding = (0..n)
        .map(|i| Value::Vector(vec![i as f64, -(i as f64), 0.5]))
        .collect();
    let comment = vec![];
    let tags = (0..n)
        .map(|i| {
            Value::List(
                (0..i % 3)
                    .map(|j| Value::from(COLORS[(i + 2 * j) % 4]))
                    .collect(),
            )
        })
        .collect();
    let counts = (0..n)
        .map(|i| {
            Value::Dict(
                (0..i % 4)
                    .map(|j| (Value::from(COLORS[3 - j]), Value::Integer((i * j) as i64)))
                    .collect(),
            )
        })
        .collect();

    (metadata, vec![price, color, embedding, comment, tags, counts])
}
