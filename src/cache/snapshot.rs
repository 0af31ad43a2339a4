//! Arrow IPC snapshot of a dense table.
//!
//! Integer, real and string columns map to `Int64`, `Float64` and `Utf8`.
//! Categorical columns are `Dictionary<Int32, Utf8>` whose dictionary is the
//! full ordered label list, so unused categories survive the round trip.
//! Boolean categoricals are tagged with the field metadata `semantic=boolean`.

use crate::error::{DatasetError, Result};
use crate::table::{CategoricalColumn, Categories, Column, ColumnData, DenseTable};
use arrow::array::{
    Array, ArrayRef, DictionaryArray, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::{DataType, Field, Int32Type, Schema};
use arrow::ipc::reader::FileReader;
use arrow::ipc::writer::FileWriter;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;
use std::sync::Arc;

const SEMANTIC_KEY: &str = "semantic";
const BOOLEAN_SEMANTIC: &str = "boolean";

fn dictionary_type() -> DataType {
    DataType::Dictionary(Box::new(DataType::Int32), Box::new(DataType::Utf8))
}

fn to_arrow(column: &Column) -> Result<(Field, ArrayRef)> {
    let (field, array): (Field, ArrayRef) = match &column.data {
        ColumnData::Integer(v) => (
            Field::new(&column.name, DataType::Int64, true),
            Arc::new(Int64Array::from(v.clone())),
        ),
        ColumnData::Real(v) => (
            Field::new(&column.name, DataType::Float64, true),
            Arc::new(Float64Array::from(v.clone())),
        ),
        ColumnData::Text(v) => (
            Field::new(&column.name, DataType::Utf8, true),
            Arc::new(StringArray::from(v.clone())),
        ),
        ColumnData::Categorical(c) => {
            let keys = c
                .codes
                .iter()
                .map(|code| code.map(i32::try_from).transpose())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| {
                    DatasetError::Format(format!("too many categories in column {}", column.name))
                })?;
            let values: ArrayRef = Arc::new(StringArray::from(c.categories.labels()));
            let dict = DictionaryArray::<Int32Type>::try_new(Int32Array::from(keys), values)?;
            let mut field = Field::new(&column.name, dictionary_type(), true);
            if c.categories == Categories::Boolean {
                field = field.with_metadata(HashMap::from([(
                    SEMANTIC_KEY.to_string(),
                    BOOLEAN_SEMANTIC.to_string(),
                )]));
            }
            (field, Arc::new(dict))
        }
    };
    Ok((field, array))
}

/// Write `table` as a single-batch Arrow IPC file.
///
/// # Errors
/// [`DatasetError::Snapshot`] if Arrow rejects the data or the write fails.
pub fn write_snapshot<W: Write>(table: &DenseTable, writer: W) -> Result<()> {
    let (fields, arrays): (Vec<Field>, Vec<ArrayRef>) = table
        .columns()
        .iter()
        .map(to_arrow)
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .unzip();

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(table.n_rows()));
    let batch = RecordBatch::try_new_with_options(schema.clone(), arrays, &options)?;

    let mut writer = FileWriter::try_new(writer, &schema)?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}

/// Read a snapshot written by [`write_snapshot`].
///
/// # Errors
/// [`DatasetError::Io`] if the file cannot be opened and
/// [`DatasetError::CacheCorruption`] for anything Arrow cannot decode or
/// that does not match the snapshot layout.
pub fn read_snapshot(path: &Path) -> Result<DenseTable> {
    let file = File::open(path).map_err(|e| DatasetError::io("open", path, e))?;
    let corrupt = |reason: String| DatasetError::corrupt(path, reason);

    let reader = FileReader::try_new(BufReader::new(file), None).map_err(|e| corrupt(e.to_string()))?;
    let schema = reader.schema();
    let batches = reader
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| corrupt(e.to_string()))?;
    let [batch] = batches.as_slice() else {
        return Err(corrupt(format!(
            "expected one record batch, found {}",
            batches.len()
        )));
    };

    let columns = schema
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, array)| from_arrow(field, array.as_ref()).map_err(&corrupt))
        .collect::<Result<Vec<_>>>()?;

    DenseTable::new(batch.num_rows(), columns).map_err(|e| corrupt(e.to_string()))
}

fn from_arrow(field: &Field, array: &dyn Array) -> std::result::Result<Column, String> {
    let mismatch = || format!("column {} does not match its {} type", field.name(), field.data_type());
    let data = match field.data_type() {
        DataType::Int64 => {
            let arr = array.as_any().downcast_ref::<Int64Array>().ok_or_else(mismatch)?;
            ColumnData::Integer(arr.iter().collect())
        }
        DataType::Float64 => {
            let arr = array.as_any().downcast_ref::<Float64Array>().ok_or_else(mismatch)?;
            ColumnData::Real(arr.iter().collect())
        }
        DataType::Utf8 => {
            let arr = array.as_any().downcast_ref::<StringArray>().ok_or_else(mismatch)?;
            ColumnData::Text(arr.iter().map(|v| v.map(str::to_string)).collect())
        }
        DataType::Dictionary(key, value)
            if **key == DataType::Int32 && **value == DataType::Utf8 =>
        {
            let dict = array
                .as_any()
                .downcast_ref::<DictionaryArray<Int32Type>>()
                .ok_or_else(mismatch)?;
            let labels = dict
                .values()
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(mismatch)?
                .iter()
                .map(|v| v.map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| format!("column {} has a null category", field.name()))?;
            let boolean = field
                .metadata()
                .get(SEMANTIC_KEY)
                .is_some_and(|v| v == BOOLEAN_SEMANTIC);
            let categories = if boolean {
                Categories::Boolean
            } else {
                Categories::Labels(labels)
            };
            let codes = dict
                .keys()
                .iter()
                .map(|k| k.and_then(|k| u32::try_from(k).ok()))
                .collect();
            ColumnData::Categorical(CategoricalColumn { codes, categories })
        }
        other => return Err(format!("unsupported snapshot type {other} for {}", field.name())),
    };
    Ok(Column::new(field.name().clone(), data))
}
