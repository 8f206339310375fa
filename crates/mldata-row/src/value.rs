use compact_str::CompactString;
use mldata_error::{mldata_bail, mldata_ensure, MlDataResult};
use serde::{Deserialize, Serialize};

/// A dynamically typed source value, as read from a column of the table store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// A missing value.
    #[default]
    Undefined,
    Integer(i64),
    Float(f64),
    String(CompactString),
    /// A dense numeric vector.
    Vector(Vec<f64>),
    /// A dense numeric array with an explicit shape.
    NdVector(NdVector),
    /// A heterogeneous list, used for categorical vectors.
    List(Vec<Value>),
    /// Key/value pairs, used for sparse dictionaries.
    Dict(Vec<(Value, Value)>),
}

impl Value {
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Numeric payload of an integer or float, `None` for every other kind.
    #[inline]
    pub fn as_numeric(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Vector(_) => "vector",
            Value::NdVector(_) => "nd-vector",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(CompactString::from(v))
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Value::Vector(v)
    }
}

impl From<NdVector> for Value {
    fn from(v: NdVector) -> Self {
        Value::NdVector(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Undefined, Into::into)
    }
}

/// A dense row-major array of doubles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NdVector {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl NdVector {
    pub fn try_new(shape: Vec<usize>, data: Vec<f64>) -> MlDataResult<Self> {
        let n_elements: usize = shape.iter().product();
        mldata_ensure!(
            n_elements == data.len(),
            SchemaMismatch: "nd-vector of shape {:?} needs {} elements, got {}", shape, n_elements, data.len()
        );
        Ok(Self { shape, data })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }
}

/// The hashable subset of [`Value`] that may act as a category.
///
/// A missing value is a category of its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CategoryValue {
    Undefined,
    Integer(i64),
    String(CompactString),
}

impl TryFrom<&Value> for CategoryValue {
    type Error = mldata_error::MlDataError;

    fn try_from(value: &Value) -> MlDataResult<Self> {
        Ok(match value {
            Value::Undefined => CategoryValue::Undefined,
            Value::Integer(v) => CategoryValue::Integer(*v),
            Value::String(v) => CategoryValue::String(v.clone()),
            v => mldata_bail!(
                SchemaMismatch: "{} value cannot be used as a category", v.type_name()
            ),
        })
    }
}

impl From<CategoryValue> for Value {
    fn from(v: CategoryValue) -> Self {
        match v {
            CategoryValue::Undefined => Value::Undefined,
            CategoryValue::Integer(v) => Value::Integer(v),
            CategoryValue::String(v) => Value::String(v),
        }
    }
}

impl From<&str> for CategoryValue {
    fn from(v: &str) -> Self {
        CategoryValue::String(CompactString::from(v))
    }
}

impl From<i64> for CategoryValue {
    fn from(v: i64) -> Self {
        CategoryValue::Integer(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_conversion() {
        assert_eq!(
            CategoryValue::try_from(&Value::from("a")).unwrap(),
            CategoryValue::from("a")
        );
        assert_eq!(
            CategoryValue::try_from(&Value::Undefined).unwrap(),
            CategoryValue::Undefined
        );
        assert!(CategoryValue::try_from(&Value::Float(1.0)).is_err());
        assert!(CategoryValue::try_from(&Value::Vector(vec![1.0])).is_err());
        assert_eq!(Value::from(CategoryValue::Integer(3)), Value::Integer(3));
    }

    #[test]
    fn test_nd_vector_shape() {
        let nd = NdVector::try_new(vec![2, 3], vec![0.0; 6]).unwrap();
        assert_eq!(nd.shape(), &[2, 3]);
        assert!(NdVector::try_new(vec![2, 3], vec![0.0; 5]).is_err());
    }

    #[test]
    fn test_numeric() {
        assert_eq!(Value::Integer(3).as_numeric(), Some(3.0));
        assert_eq!(Value::from(Some(2.5)).as_numeric(), Some(2.5));
        assert!(Value::from(None::<f64>).is_undefined());
        assert_eq!(Value::from("x").as_numeric(), None);
    }
}
