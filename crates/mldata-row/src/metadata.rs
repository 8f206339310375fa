use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use compact_str::CompactString;
use mldata_error::{mldata_bail, mldata_ensure, mldata_err, MlDataResult};

use crate::indexer::CategoricalIndexer;

/// How the values of a column are laid out in a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnMode {
    /// One double cell.
    Numeric,
    /// One index cell.
    Categorical,
    /// `width` double cells.
    NumericVector,
    /// A size cell followed by that many index cells, sorted ascending.
    CategoricalVector,
    /// A size cell followed by that many `(index, double)` pairs, sorted by index.
    Dictionary,
    /// Not stored in the row at all.
    Untranslated,
    /// `width` double cells; the shape lives in the column metadata.
    NumericNdVector,
    /// Reserved. Contributes no cells.
    CategoricalSorted,
}

impl ColumnMode {
    /// Whether values of this mode are mapped through an indexer.
    pub fn is_indexed(self) -> bool {
        matches!(
            self,
            ColumnMode::Categorical | ColumnMode::CategoricalVector | ColumnMode::Dictionary
        )
    }

    /// Whether every row spends the same number of cells on this mode.
    pub fn has_fixed_size(self) -> bool {
        !matches!(self, ColumnMode::CategoricalVector | ColumnMode::Dictionary)
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnMode::Numeric => "numeric",
            ColumnMode::Categorical => "categorical",
            ColumnMode::NumericVector => "numeric_vector",
            ColumnMode::CategoricalVector => "categorical_vector",
            ColumnMode::Dictionary => "dictionary",
            ColumnMode::Untranslated => "untranslated",
            ColumnMode::NumericNdVector => "numeric_nd_vector",
            ColumnMode::CategoricalSorted => "categorical_sorted",
        }
    }
}

/// Schema of a single column, shared read-only by everything that touches a
/// block compiled under it.
#[derive(Clone)]
pub struct ColumnMetadata {
    name: CompactString,
    mode: ColumnMode,
    width: usize,
    nd_shape: Option<Vec<usize>>,
    indexer: Option<Arc<dyn CategoricalIndexer>>,
}

impl ColumnMetadata {
    fn new(name: &str, mode: ColumnMode) -> Self {
        let width = match mode {
            ColumnMode::Numeric | ColumnMode::Categorical => 1,
            _ => 0,
        };
        Self {
            name: CompactString::from(name),
            mode,
            width,
            nd_shape: None,
            indexer: None,
        }
    }

    pub fn numeric(name: &str) -> Self {
        Self::new(name, ColumnMode::Numeric)
    }

    pub fn numeric_vector(name: &str, width: usize) -> Self {
        Self {
            width,
            ..Self::new(name, ColumnMode::NumericVector)
        }
    }

    pub fn numeric_nd_vector(name: &str, shape: Vec<usize>) -> Self {
        Self {
            width: shape.iter().product(),
            nd_shape: Some(shape),
            ..Self::new(name, ColumnMode::NumericNdVector)
        }
    }

    pub fn categorical(name: &str, indexer: Arc<dyn CategoricalIndexer>) -> Self {
        Self {
            indexer: Some(indexer),
            ..Self::new(name, ColumnMode::Categorical)
        }
    }

    pub fn categorical_vector(name: &str, indexer: Arc<dyn CategoricalIndexer>) -> Self {
        Self {
            indexer: Some(indexer),
            ..Self::new(name, ColumnMode::CategoricalVector)
        }
    }

    pub fn dictionary(name: &str, indexer: Arc<dyn CategoricalIndexer>) -> Self {
        Self {
            indexer: Some(indexer),
            ..Self::new(name, ColumnMode::Dictionary)
        }
    }

    pub fn untranslated(name: &str) -> Self {
        Self::new(name, ColumnMode::Untranslated)
    }

    pub fn categorical_sorted(name: &str) -> Self {
        Self::new(name, ColumnMode::CategoricalSorted)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> ColumnMode {
        self.mode
    }

    /// Cells per row of a fixed-width numeric vector.
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn nd_shape(&self) -> Option<&[usize]> {
        self.nd_shape.as_deref()
    }

    /// Cells this column occupies in every row, or `None` if it varies.
    pub fn fixed_cell_count(&self) -> Option<usize> {
        match self.mode {
            ColumnMode::Numeric | ColumnMode::Categorical => Some(1),
            ColumnMode::NumericVector | ColumnMode::NumericNdVector => Some(self.width),
            ColumnMode::Untranslated | ColumnMode::CategoricalSorted => Some(0),
            ColumnMode::CategoricalVector | ColumnMode::Dictionary => None,
        }
    }

    pub fn indexer(&self) -> MlDataResult<&dyn CategoricalIndexer> {
        self.indexer
            .as_deref()
            .ok_or_else(|| mldata_err!(SchemaMismatch: "column '{}' has no indexer", self.name))
    }
}

impl Debug for ColumnMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnMetadata")
            .field("name", &self.name)
            .field("mode", &self.mode)
            .field("width", &self.width)
            .field("nd_shape", &self.nd_shape)
            .field("indexed", &self.indexer.is_some())
            .finish()
    }
}

/// The row schema: the ordered columns plus the derived row-size layout.
///
/// If every column has a fixed cell count, rows are exactly
/// `constant_data_size` cells long and carry no size prefix. Otherwise each
/// row starts with a size cell holding the row's total cell count, the size
/// cell included.
#[derive(Debug, Clone)]
pub struct RowMetadata {
    columns: Vec<Arc<ColumnMetadata>>,
    data_size_is_constant: bool,
    constant_data_size: usize,
}

impl RowMetadata {
    pub fn try_new(columns: Vec<ColumnMetadata>) -> MlDataResult<Self> {
        for column in &columns {
            if column.mode.is_indexed() {
                mldata_ensure!(
                    column.indexer.is_some(),
                    SchemaMismatch: "{} column '{}' needs an indexer", column.mode.name(), column.name
                );
            }
            if column.mode == ColumnMode::NumericNdVector && column.nd_shape.is_none() {
                mldata_bail!(SchemaMismatch: "nd-vector column '{}' has no shape", column.name);
            }
        }

        let fixed: Option<usize> = columns.iter().map(|c| c.fixed_cell_count()).sum();
        Ok(Self {
            columns: columns.into_iter().map(Arc::new).collect(),
            data_size_is_constant: fixed.is_some(),
            constant_data_size: fixed.unwrap_or(0),
        })
    }

    pub fn columns(&self) -> &[Arc<ColumnMetadata>] {
        &self.columns
    }

    pub fn column(&self, idx: usize) -> &ColumnMetadata {
        &self.columns[idx]
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn data_size_is_constant(&self) -> bool {
        self.data_size_is_constant
    }

    /// Cells per row when [`data_size_is_constant`](Self::data_size_is_constant)
    /// holds; zero otherwise.
    pub fn constant_data_size(&self) -> usize {
        self.constant_data_size
    }
}
