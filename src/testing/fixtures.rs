//! Canned raw files.

use crate::cache::blob::{BLOB_MAGIC, BLOB_VERSION, LegacyArray, encode_legacy_blob};
use crate::table::Column;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Five columns: a row id, two numerics, a three-label class and an ignored string.
pub const DENSE_ARFF: &str = "% dense fixture
@relation dense
@attribute id integer
@attribute a numeric
@attribute b real
@attribute foo string
@attribute c {low, mid, high}
@data
1, 0.5, 10, 'x', low
2, 1.5, 20, 'y', high
3, ?, 30, ?, mid
4, 3.5, 40, 'z', low
";

/// Three numeric columns and a numeric-label class, in coordinate rows.
pub const SPARSE_ARFF: &str = "@relation sparse
@attribute f0 numeric
@attribute f1 numeric
@attribute f2 numeric
@attribute class {0, 1}
@data
{0 1.5, 3 1}
{1 2}
{0 4, 2 -1, 3 0}
";

/// Sparse layout with a string column, which sparse storage cannot hold.
pub const SPARSE_STRING_ARFF: &str = "@relation sparse_strings
@attribute f0 numeric
@attribute note string
@data
{0 1, 1 'a'}
";

/// A boolean column spelled in mixed case.
pub const BOOLEAN_ARFF: &str = "@relation flags
@attribute x numeric
@attribute flag {True, False}
@data
1, True
2, False
3, ?
";

/// Two categorical columns, for multi-target requests.
pub const TWO_TARGET_ARFF: &str = "@relation two
@attribute x numeric
@attribute a {p, q}
@attribute b {r, s}
@data
1, p, r
2, q, s
";

/// Write `text` to `dir/name` and return the path.
///
/// # Panics
/// Panics on I/O failure.
#[must_use]
pub fn write_fixture(dir: &Path, name: &str, text: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, text).unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
    path
}

/// Write `text` gzip-compressed to `dir/name` and return the path.
///
/// `name` must end in `.gz` for the codec to be picked.
///
/// # Panics
/// Panics on I/O failure.
#[cfg(feature = "compression-gzip")]
#[must_use]
pub fn write_gzip_fixture(dir: &Path, name: &str, text: &str) -> PathBuf {
    use std::io::Write;

    let path = dir.join(name);
    let mut writer = crate::io::compression::create_compressed(&path)
        .unwrap_or_else(|e| panic!("cannot create {}: {e}", path.display()));
    writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
        .unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
    drop(writer);
    path
}

/// Write a first-generation blob at `path` holding a row-major array.
///
/// # Panics
/// Panics on encoding or I/O failure.
pub fn write_legacy_blob(path: &Path, legacy: &LegacyArray) {
    let bytes = encode_legacy_blob(legacy).unwrap_or_else(|e| panic!("cannot encode blob: {e}"));
    std::fs::write(path, bytes).unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
}

/// Blob table layout written verbatim, bypassing the constructors' checks.
///
/// Variant and field order mirror the stored [`Table`](crate::table::Table).
#[derive(Clone, Debug, Serialize)]
pub enum UncheckedTable {
    Dense {
        n_rows: usize,
        columns: Vec<Column>,
    },
    Sparse {
        n_rows: usize,
        n_cols: usize,
        indptr: Vec<usize>,
        indices: Vec<usize>,
        data: Vec<f32>,
    },
}

/// Frame a current-generation blob from raw parts.
///
/// # Panics
/// Panics if the payload cannot be encoded.
#[must_use]
pub fn unchecked_blob_bytes(
    table: &UncheckedTable,
    categorical: &[bool],
    attribute_names: &[&str],
) -> Vec<u8> {
    let body = postcard::to_allocvec(&(table, categorical, attribute_names))
        .unwrap_or_else(|e| panic!("cannot encode blob: {e}"));
    let mut bytes = BLOB_MAGIC.to_vec();
    bytes.extend_from_slice(&BLOB_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    bytes
}

/// Write [`unchecked_blob_bytes`] to `path`.
///
/// # Panics
/// Panics on encoding or I/O failure.
pub fn write_unchecked_blob(
    path: &Path,
    table: &UncheckedTable,
    categorical: &[bool],
    attribute_names: &[&str],
) {
    let bytes = unchecked_blob_bytes(table, categorical, attribute_names);
    std::fs::write(path, bytes).unwrap_or_else(|e| panic!("cannot write {}: {e}", path.display()));
}

#[cfg(all(test, feature = "compression-gzip"))]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn gzip_fixture_uses_the_reader_codec() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_gzip_fixture(dir.path(), "dense.arff.gz", DENSE_ARFF);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

        let mut text = String::new();
        crate::io::compression::open_decompressed(&path)
            .unwrap()
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text, DENSE_ARFF);
    }
}
