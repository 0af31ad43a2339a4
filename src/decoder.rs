//! Raw file decoding into the in-memory [`Table`].
//!
//! [`RawDecoder`] is the seam the cache manager parses through. The default
//! implementation, [`ArffDecoder`], reads (optionally compressed) ARFF files,
//! infers the column schema and materializes either a [`DenseTable`] or a
//! [`CsrMatrix`] depending on the requested [`StorageFormat`].

use crate::config::DatasetConfig;
use crate::error::{DatasetError, Result};
use crate::io::arff::{ArffReader, ArffValue, AttributeType};
use crate::schema::{ColumnSchema, SemanticType, StorageFormat, infer_schema};
use crate::table::{Column, ColumnData, CsrMatrix, DenseTable, Table, unpack_categories};
use std::path::Path;
use tracing::{debug, error};

/// A decoded dataset together with its parallel column metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedData {
    pub table: Table,
    /// One flag per column, `true` for categorical (and boolean) columns.
    pub categorical: Vec<bool>,
    /// Column names in raw-file order.
    pub attribute_names: Vec<String>,
}

/// Parses a raw data file.
pub trait RawDecoder: Send + Sync {
    /// Decode `path` into the requested storage layout.
    ///
    /// # Errors
    /// Implementations return [`DatasetError::Io`] for unreadable files and
    /// [`DatasetError::Format`] for malformed or unsupported content.
    fn decode(&self, path: &Path, storage: StorageFormat) -> Result<ParsedData>;
}

/// Decoder for ARFF files, plain or compressed.
#[derive(Clone, Debug, Default)]
pub struct ArffDecoder {
    config: DatasetConfig,
}

impl ArffDecoder {
    #[must_use]
    pub fn new(config: DatasetConfig) -> Self {
        Self { config }
    }

    /// Decode `path` and also return the column schema with missing counts.
    ///
    /// # Errors
    /// [`DatasetError::Resource`] when the file is too large for this
    /// environment, [`DatasetError::Io`] when it cannot be read and
    /// [`DatasetError::Format`] for malformed content.
    pub fn decode_with_schema(
        &self,
        path: &Path,
        storage: StorageFormat,
    ) -> Result<(ParsedData, Vec<ColumnSchema>)> {
        self.check_size(path)?;
        decode_file(path, storage).inspect_err(|e| {
            if let DatasetError::Io { .. } = e {
                error!(path = %path.display(), error = %e, "failed to read raw data file");
            }
        })
    }

    fn check_size(&self, path: &Path) -> Result<()> {
        let size = std::fs::metadata(path)
            .map_err(|e| {
                error!(path = %path.display(), error = %e, "cannot stat raw data file");
                DatasetError::io("stat", path, e)
            })?
            .len();
        if self.config.exceeds_size_limit(size) {
            return Err(DatasetError::Resource {
                path: path.to_path_buf(),
                size,
                bits: self.config.pointer_width,
            });
        }
        Ok(())
    }
}

impl RawDecoder for ArffDecoder {
    fn decode(&self, path: &Path, storage: StorageFormat) -> Result<ParsedData> {
        self.decode_with_schema(path, storage).map(|(data, _)| data)
    }
}

fn decode_file(path: &Path, storage: StorageFormat) -> Result<(ParsedData, Vec<ColumnSchema>)> {
    let reader = ArffReader::open(path)?;
    let mut schema = infer_schema(&reader.header().attributes, storage)?;

    let table = match storage {
        StorageFormat::Dense => {
            let rows = reader.read_dense()?;
            let mut columns = Vec::with_capacity(schema.len());
            for (entry, raw) in schema.iter_mut().zip(rows.columns) {
                let column = build_column(entry, &raw)?;
                entry.missing_count = column.data.missing_count();
                columns.push(column);
            }
            Table::Dense(DenseTable::new(rows.n_rows, columns)?)
        }
        StorageFormat::Sparse => {
            let coo = reader.read_coo()?;
            for (&value, &col) in coo.values.iter().zip(&coo.cols) {
                if value.is_nan() {
                    schema[col].missing_count += 1;
                }
            }
            #[allow(clippy::cast_possible_truncation)]
            let values: Vec<f32> = coo.values.iter().map(|&v| v as f32).collect();
            Table::Sparse(CsrMatrix::from_coo_inferred(&values, &coo.rows, &coo.cols)?)
        }
    };

    debug!(
        path = %path.display(),
        storage = %storage,
        rows = table.n_rows(),
        cols = table.n_cols(),
        "decoded raw data file"
    );

    let parsed = ParsedData {
        table,
        categorical: schema.iter().map(ColumnSchema::is_categorical).collect(),
        attribute_names: schema.iter().map(|c| c.name.clone()).collect(),
    };
    Ok((parsed, schema))
}

fn build_column(entry: &ColumnSchema, raw: &[ArffValue]) -> Result<Column> {
    let data = match (entry.semantic, &entry.declared, &entry.categories) {
        (SemanticType::Categorical | SemanticType::Boolean, AttributeType::Nominal(declared), Some(cats)) => {
            ColumnData::Categorical(unpack_categories(raw, declared, cats.clone()))
        }
        (SemanticType::Integer, ..) => ColumnData::Integer(
            raw.iter()
                .map(|cell| integer_cell(&entry.name, cell))
                .collect::<Result<_>>()?,
        ),
        (SemanticType::String, ..) => ColumnData::Text(
            raw.iter()
                .map(|cell| match cell {
                    ArffValue::Text(t) => Some(t.clone()),
                    ArffValue::Number(v) => Some(v.to_string()),
                    ArffValue::Missing | ArffValue::Nominal(_) => None,
                })
                .collect(),
        ),
        _ => ColumnData::Real(
            raw.iter()
                .map(|cell| match cell {
                    ArffValue::Number(v) => Some(*v),
                    _ => None,
                })
                .collect(),
        ),
    };
    Ok(Column::new(entry.name.clone(), data))
}

#[allow(clippy::cast_possible_truncation)]
fn integer_cell(name: &str, cell: &ArffValue) -> Result<Option<i64>> {
    match cell {
        ArffValue::Missing => Ok(None),
        ArffValue::Number(v) if v.fract() == 0.0 && v.abs() < 9.007_199_254_740_992e15 => {
            Ok(Some(*v as i64))
        }
        other => Err(DatasetError::Format(format!(
            "integer attribute {name} holds non-integral value {other:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Categories;
    use std::io::Write;

    fn write(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::File::create(&path)
            .unwrap()
            .write_all(text.as_bytes())
            .unwrap();
        path
    }

    const MIXED: &str = "@relation mixed\n\
        @attribute n integer\n\
        @attribute x real\n\
        @attribute s string\n\
        @attribute c {lo,hi}\n\
        @attribute b {TRUE,FALSE}\n\
        @data\n\
        1,0.5,'a b',hi,TRUE\n\
        ?,?,?,?,FALSE\n";

    #[test]
    fn dense_decode_types_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "mixed.arff", MIXED);
        let (parsed, schema) = ArffDecoder::default()
            .decode_with_schema(&path, StorageFormat::Dense)
            .unwrap();

        assert_eq!(parsed.attribute_names, ["n", "x", "s", "c", "b"]);
        assert_eq!(parsed.categorical, [false, false, false, true, true]);
        let Table::Dense(table) = parsed.table else {
            panic!("expected a dense table");
        };
        assert_eq!(table.n_rows(), 2);
        assert_eq!(
            table.column("n").unwrap().data,
            ColumnData::Integer(vec![Some(1), None])
        );
        assert_eq!(
            table.column("s").unwrap().data,
            ColumnData::Text(vec![Some("a b".into()), None])
        );
        let ColumnData::Categorical(b) = &table.column("b").unwrap().data else {
            panic!("expected a categorical column");
        };
        assert_eq!(b.categories, Categories::Boolean);
        assert_eq!(b.as_bool(0), Some(true));
        assert_eq!(b.as_bool(1), Some(false));

        let missing: Vec<_> = schema.iter().map(|c| c.missing_count).collect();
        assert_eq!(missing, [1, 1, 1, 1, 0]);
    }

    #[test]
    fn non_integral_integer_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "bad.arff",
            "@relation r\n@attribute n integer\n@data\n1.5\n",
        );
        let err = ArffDecoder::default()
            .decode(&path, StorageFormat::Dense)
            .unwrap_err();
        assert!(matches!(err, DatasetError::Format(msg) if msg.contains("non-integral")));
    }

    #[test]
    fn sparse_decode_builds_csr() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            dir.path(),
            "sp.arff",
            "@relation sp\n@attribute a numeric\n@attribute b numeric\n@attribute c numeric\n\
             @data\n{0 1, 2 3}\n{1 ?}\n",
        );
        let (parsed, schema) = ArffDecoder::default()
            .decode_with_schema(&path, StorageFormat::Sparse)
            .unwrap();
        let Table::Sparse(m) = parsed.table else {
            panic!("expected a sparse matrix");
        };
        assert_eq!((m.n_rows(), m.n_cols()), (2, 3));
        assert_eq!(m.get(0, 2), 3.0);
        assert!(m.get(1, 1).is_nan());
        assert_eq!(schema[1].missing_count, 1);
    }

    #[test]
    fn oversized_file_on_narrow_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(dir.path(), "mixed.arff", MIXED);
        let decoder = ArffDecoder::new(
            DatasetConfig::default()
                .with_pointer_width(32)
                .with_size_limit(10),
        );
        let err = decoder.decode(&path, StorageFormat::Dense).unwrap_err();
        assert!(matches!(err, DatasetError::Resource { bits: 32, .. }));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ArffDecoder::default()
            .decode(Path::new("/nonexistent/data.arff"), StorageFormat::Dense)
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
