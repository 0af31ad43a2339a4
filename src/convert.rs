//! Conversion of loaded data into the caller's requested shape.
//!
//! [`convert`] turns dense tables into numeric arrays (categorical columns
//! become their codes, missing values NaN) and sparse matrices into labelled
//! sparse frames. Anything else passes through unchanged.

use crate::error::{DatasetError, Result};
use crate::table::{Column, ColumnData, CsrMatrix, DenseTable};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Requested output shape.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Numeric array, or the sparse matrix itself for sparse data.
    Array,
    /// Tabular frame.
    #[default]
    DataFrame,
    /// Unrecognized request; data is returned unchanged.
    Other(String),
}

impl FromStr for OutputFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "array" => Self::Array,
            "dataframe" => Self::DataFrame,
            other => Self::Other(other.to_string()),
        })
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array => f.write_str("array"),
            Self::DataFrame => f.write_str("dataframe"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// Element storage of a [`NumericArray`].
#[derive(Clone, Debug, PartialEq)]
pub enum ArrayValues {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
}

impl ArrayValues {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::F64(v) => v.len(),
            Self::I64(v) => v.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Row-major numeric array.
#[derive(Clone, Debug, PartialEq)]
pub struct NumericArray {
    pub shape: Vec<usize>,
    pub values: ArrayValues,
}

impl NumericArray {
    /// One-dimensional array of `values`.
    #[must_use]
    pub fn vector(values: ArrayValues) -> Self {
        Self {
            shape: vec![values.len()],
            values,
        }
    }
}

/// Sparse matrix with column labels.
#[derive(Clone, Debug, PartialEq)]
pub struct SparseFrame {
    pub columns: Vec<String>,
    pub matrix: CsrMatrix,
}

/// Data in any of the shapes handed to callers.
#[derive(Clone, Debug, PartialEq)]
pub enum Data {
    Array(NumericArray),
    Sparse(CsrMatrix),
    Frame(DenseTable),
    Series(Column),
    SparseFrame(SparseFrame),
}

impl Data {
    fn is_sparse(&self) -> bool {
        matches!(self, Self::Sparse(_) | Self::SparseFrame(_))
    }
}

/// Numeric type a target column is coerced to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetDtype {
    I64,
    F64,
}

impl TargetDtype {
    /// Integer for categorical targets, real otherwise.
    #[must_use]
    pub fn for_target(categorical: bool) -> Self {
        if categorical { Self::I64 } else { Self::F64 }
    }
}

/// Convert `data` to `format`. `attribute_names` labels sparse frames.
///
/// # Errors
/// [`DatasetError::TypeMismatch`] when a dense column cannot be made numeric.
pub fn convert(data: Data, format: &OutputFormat, attribute_names: &[String]) -> Result<Data> {
    match (format, data) {
        (OutputFormat::Array, Data::Frame(table)) => encode_table(&table).map(Data::Array),
        (OutputFormat::Array, Data::Series(column)) => {
            encode_column(&column).map(|v| Data::Array(NumericArray::vector(ArrayValues::F32(v))))
        }
        (OutputFormat::Array, Data::Array(array)) => Ok(Data::Array(to_f32(array))),
        (OutputFormat::Array, data) => Ok(data),
        (OutputFormat::DataFrame, Data::Sparse(matrix)) => Ok(Data::SparseFrame(SparseFrame {
            columns: attribute_names.to_vec(),
            matrix,
        })),
        (OutputFormat::DataFrame, data) => Ok(data),
        (OutputFormat::Other(name), data) => {
            let kind = if data.is_sparse() { "sparse data" } else { "non-sparse data" };
            warn!("cannot convert {kind} to {name:?}, returning input data");
            Ok(data)
        }
    }
}

/// Cast a numeric array to `dtype`. Other data passes through.
///
/// # Errors
/// [`DatasetError::TypeMismatch`] when a NaN or infinite value would be cast
/// to an integer.
pub fn coerce(data: Data, dtype: TargetDtype) -> Result<Data> {
    let Data::Array(array) = data else {
        return Ok(data);
    };
    let as_f64: Vec<f64> = match array.values {
        ArrayValues::I64(v) if dtype == TargetDtype::I64 => {
            return Ok(Data::Array(NumericArray {
                shape: array.shape,
                values: ArrayValues::I64(v),
            }));
        }
        #[allow(clippy::cast_precision_loss)]
        ArrayValues::I64(v) => v.into_iter().map(|x| x as f64).collect(),
        ArrayValues::F32(v) => v.into_iter().map(f64::from).collect(),
        ArrayValues::F64(v) => v,
    };
    let values = match dtype {
        TargetDtype::F64 => ArrayValues::F64(as_f64),
        TargetDtype::I64 => ArrayValues::I64(
            as_f64
                .into_iter()
                .map(float_to_int)
                .collect::<Result<_>>()?,
        ),
    };
    Ok(Data::Array(NumericArray {
        shape: array.shape,
        values,
    }))
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_int(x: f64) -> Result<i64> {
    if x.is_finite() {
        Ok(x.trunc() as i64)
    } else {
        Err(DatasetError::TypeMismatch(format!(
            "cannot convert non-finite value {x} to an integer target"
        )))
    }
}

#[allow(clippy::cast_possible_truncation)]
fn to_f32(array: NumericArray) -> NumericArray {
    let values = match array.values {
        ArrayValues::F32(v) => v,
        ArrayValues::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        #[allow(clippy::cast_precision_loss)]
        ArrayValues::I64(v) => v.into_iter().map(|x| x as f32).collect(),
    };
    NumericArray {
        shape: array.shape,
        values: ArrayValues::F32(values),
    }
}

fn encode_table(table: &DenseTable) -> Result<NumericArray> {
    let n_rows = table.n_rows();
    let n_cols = table.n_cols();
    let mut values = vec![0.0f32; n_rows * n_cols];
    for (j, column) in table.columns().iter().enumerate() {
        for (i, v) in encode_column(column)?.into_iter().enumerate() {
            values[i * n_cols + j] = v;
        }
    }
    Ok(NumericArray {
        shape: vec![n_rows, n_cols],
        values: ArrayValues::F32(values),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn encode_column(column: &Column) -> Result<Vec<f32>> {
    Ok(match &column.data {
        ColumnData::Integer(v) => v.iter().map(|x| x.map_or(f32::NAN, |x| x as f32)).collect(),
        ColumnData::Real(v) => v.iter().map(|x| x.map_or(f32::NAN, |x| x as f32)).collect(),
        ColumnData::Categorical(c) => c
            .codes
            .iter()
            .map(|x| x.map_or(f32::NAN, |x| x as f32))
            .collect(),
        ColumnData::Text(v) => v
            .iter()
            .map(|x| match x {
                None => Ok(f32::NAN),
                Some(s) => s.trim().parse::<f32>().map_err(|_| {
                    DatasetError::TypeMismatch(format!(
                        "cannot handle string values (column {}) when returning numeric \
                         arrays; request the dataframe output format instead",
                        column.name
                    ))
                }),
            })
            .collect::<Result<_>>()?,
    })
}
