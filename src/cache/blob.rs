//! Framed `postcard` cache files: the metadata side-file and the blob.
//!
//! Every file starts with a 4-byte magic and a little-endian `u32` format
//! version, followed by the `postcard` payload:
//!
//! | file     | magic  | version | payload                                   |
//! |----------|--------|---------|-------------------------------------------|
//! | metadata | `OMLM` | 1       | `(categorical flags, attribute names)`    |
//! | blob     | `OMLB` | 1       | legacy row-major `f64` array + metadata   |
//! | blob     | `OMLB` | 2       | `(Table, categorical flags, names)`       |
//!
//! Any framing or payload failure is reported as
//! [`DatasetError::CacheCorruption`].

use crate::decoder::ParsedData;
use crate::error::{DatasetError, Result};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const METADATA_MAGIC: [u8; 4] = *b"OMLM";
pub const BLOB_MAGIC: [u8; 4] = *b"OMLB";
pub const METADATA_VERSION: u32 = 1;
pub const LEGACY_BLOB_VERSION: u32 = 1;
pub const BLOB_VERSION: u32 = 2;

const HEADER_LEN: usize = 8;

/// Parallel per-column metadata stored in the side-file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub categorical: Vec<bool>,
    pub attribute_names: Vec<String>,
}

/// Payload of a version-1 blob: a plain row-major numeric array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyArray {
    pub n_rows: usize,
    pub n_cols: usize,
    pub values: Vec<f64>,
    pub categorical: Vec<bool>,
    pub attribute_names: Vec<String>,
}

/// A decoded blob, by format generation.
#[derive(Clone, Debug, PartialEq)]
pub enum BlobContents {
    Current(ParsedData),
    /// Needs migration by re-parsing the raw file.
    Legacy(LegacyArray),
}

#[derive(Serialize)]
struct BlobRef<'a>(&'a Table, &'a [bool], &'a [String]);

#[derive(Deserialize)]
struct BlobOwned(Table, Vec<bool>, Vec<String>);

fn frame(magic: [u8; 4], version: u32, payload: &impl Serialize) -> Result<Vec<u8>> {
    let body = postcard::to_allocvec(payload).map_err(DatasetError::Serialization)?;
    let mut out = Vec::with_capacity(HEADER_LEN + body.len());
    out.extend_from_slice(&magic);
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

fn unframe<'a>(bytes: &'a [u8], magic: [u8; 4], path: &Path) -> Result<(u32, &'a [u8])> {
    if bytes.len() < HEADER_LEN {
        return Err(DatasetError::corrupt(
            path,
            format!("unexpected end of data ({} bytes)", bytes.len()),
        ));
    }
    if bytes[..4] != magic {
        return Err(DatasetError::corrupt(path, "invalid magic bytes"));
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    Ok((version, &bytes[HEADER_LEN..]))
}

fn payload<'a, T: Deserialize<'a>>(bytes: &'a [u8], path: &Path) -> Result<T> {
    match postcard::take_from_bytes::<T>(bytes) {
        Ok((value, [])) => Ok(value),
        Ok((_, rest)) => Err(DatasetError::corrupt(
            path,
            format!("{} trailing bytes after payload", rest.len()),
        )),
        Err(postcard::Error::DeserializeUnexpectedEnd) => {
            Err(DatasetError::corrupt(path, "unexpected end of data"))
        }
        Err(e) => Err(DatasetError::corrupt(path, e.to_string())),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| DatasetError::io("read", path, e))
}

/// Encode the metadata side-file.
///
/// # Errors
/// [`DatasetError::Serialization`] if encoding fails.
pub fn encode_metadata(meta: &ColumnMetadata) -> Result<Vec<u8>> {
    frame(METADATA_MAGIC, METADATA_VERSION, meta)
}

/// Decode a metadata side-file read from `path`.
///
/// # Errors
/// [`DatasetError::CacheCorruption`] for any framing or payload problem.
pub fn decode_metadata(bytes: &[u8], path: &Path) -> Result<ColumnMetadata> {
    match unframe(bytes, METADATA_MAGIC, path)? {
        (METADATA_VERSION, body) => payload(body, path),
        (other, _) => Err(DatasetError::corrupt(
            path,
            format!("unknown metadata version {other}"),
        )),
    }
}

/// Read and decode the metadata side-file at `path`.
///
/// # Errors
/// [`DatasetError::Io`] if the file cannot be read,
/// [`DatasetError::CacheCorruption`] if it cannot be decoded.
pub fn read_metadata(path: &Path) -> Result<ColumnMetadata> {
    decode_metadata(&read_bytes(path)?, path)
}

/// Encode a current-generation blob.
///
/// # Errors
/// [`DatasetError::Serialization`] if encoding fails.
pub fn encode_blob(parsed: &ParsedData) -> Result<Vec<u8>> {
    frame(
        BLOB_MAGIC,
        BLOB_VERSION,
        &BlobRef(&parsed.table, &parsed.categorical, &parsed.attribute_names),
    )
}

/// Encode a version-1 blob.
///
/// # Errors
/// [`DatasetError::Serialization`] if encoding fails.
pub fn encode_legacy_blob(legacy: &LegacyArray) -> Result<Vec<u8>> {
    frame(BLOB_MAGIC, LEGACY_BLOB_VERSION, legacy)
}

/// Decode a blob of any known generation.
///
/// # Errors
/// [`DatasetError::CacheCorruption`] for any framing or payload problem,
/// including an unknown version.
pub fn decode_blob(bytes: &[u8], path: &Path) -> Result<BlobContents> {
    match unframe(bytes, BLOB_MAGIC, path)? {
        (BLOB_VERSION, body) => {
            let BlobOwned(table, categorical, attribute_names) = payload(body, path)?;
            let parsed = ParsedData {
                table,
                categorical,
                attribute_names,
            };
            check_consistency(&parsed, path)?;
            Ok(BlobContents::Current(parsed))
        }
        (LEGACY_BLOB_VERSION, body) => payload(body, path).map(BlobContents::Legacy),
        (other, _) => Err(DatasetError::corrupt(
            path,
            format!("unknown blob version {other}"),
        )),
    }
}

/// Reject payloads that decode cleanly but break the table layout or
/// disagree with their own column metadata.
///
/// A sparse matrix may be narrower than its names: trailing all-zero
/// columns are not stored.
fn check_consistency(parsed: &ParsedData, path: &Path) -> Result<()> {
    parsed
        .table
        .validate()
        .map_err(|e| DatasetError::corrupt(path, e.to_string()))?;
    let names = parsed.attribute_names.len();
    let width_ok = match &parsed.table {
        Table::Dense(t) => t.n_cols() == names,
        Table::Sparse(m) => m.n_cols() <= names,
    };
    if !width_ok || parsed.categorical.len() != names {
        return Err(DatasetError::corrupt(
            path,
            format!(
                "blob holds {} columns with {} categorical flags for {names} attribute names",
                parsed.table.n_cols(),
                parsed.categorical.len()
            ),
        ));
    }
    Ok(())
}

/// Read and decode the blob at `path`.
///
/// # Errors
/// [`DatasetError::Io`] if the file cannot be read,
/// [`DatasetError::CacheCorruption`] if it cannot be decoded.
pub fn read_blob(path: &Path) -> Result<BlobContents> {
    decode_blob(&read_bytes(path)?, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::CsrMatrix;

    fn sample() -> ParsedData {
        ParsedData {
            table: Table::Sparse(
                CsrMatrix::from_coo(2, 2, &[1.0, 2.0], &[0, 1], &[1, 0]).unwrap(),
            ),
            categorical: vec![false, true],
            attribute_names: vec!["a".into(), "b".into()],
        }
    }

    #[test]
    fn blob_round_trip() {
        let bytes = encode_blob(&sample()).unwrap();
        assert_eq!(&bytes[..4], b"OMLB");
        let decoded = decode_blob(&bytes, Path::new("x.blob")).unwrap();
        assert_eq!(decoded, BlobContents::Current(sample()));
    }

    #[test]
    fn legacy_blob_is_flagged_for_migration() {
        let legacy = LegacyArray {
            n_rows: 1,
            n_cols: 2,
            values: vec![1.0, 2.0],
            categorical: vec![false, false],
            attribute_names: vec!["a".into(), "b".into()],
        };
        let bytes = encode_legacy_blob(&legacy).unwrap();
        assert_eq!(
            decode_blob(&bytes, Path::new("x.blob")).unwrap(),
            BlobContents::Legacy(legacy)
        );
    }

    #[test]
    fn truncated_payload_is_corruption() {
        let bytes = encode_blob(&sample()).unwrap();
        let err = decode_blob(&bytes[..bytes.len() - 3], Path::new("x.blob")).unwrap_err();
        assert!(
            matches!(err, DatasetError::CacheCorruption { ref reason, .. } if reason.contains("unexpected end"))
        );
    }

    #[test]
    fn empty_file_is_corruption() {
        let err = decode_metadata(&[], Path::new("x.meta")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn unknown_version_is_corruption() {
        let mut bytes = encode_metadata(&ColumnMetadata::default()).unwrap();
        bytes[4] = 9;
        let err = decode_metadata(&bytes, Path::new("x.meta")).unwrap_err();
        assert!(matches!(err, DatasetError::CacheCorruption { ref reason, .. } if reason.contains("version 9")));
    }

    #[test]
    fn wrong_magic_is_corruption() {
        let bytes = encode_metadata(&ColumnMetadata::default()).unwrap();
        assert!(decode_blob(&bytes, Path::new("x.blob")).unwrap_err().is_recoverable());
    }

    #[test]
    fn decodable_but_inconsistent_blobs_are_corruption() {
        use crate::table::{Column, ColumnData};
        use crate::testing::{UncheckedTable, unchecked_blob_bytes};

        let short_indptr = UncheckedTable::Sparse {
            n_rows: 3,
            n_cols: 2,
            indptr: vec![0, 0],
            indices: vec![],
            data: vec![],
        };
        let wide_index = UncheckedTable::Sparse {
            n_rows: 1,
            n_cols: 2,
            indptr: vec![0, 1],
            indices: vec![5],
            data: vec![1.0],
        };
        let ragged = UncheckedTable::Dense {
            n_rows: 1,
            columns: vec![Column {
                name: "a".into(),
                data: ColumnData::Real(vec![Some(1.0), Some(2.0), None]),
            }],
        };
        for (table, names) in [
            (&short_indptr, &["a", "b"][..]),
            (&wide_index, &["a", "b"][..]),
            (&ragged, &["a"][..]),
        ] {
            let flags = vec![false; names.len()];
            let err = decode_blob(&unchecked_blob_bytes(table, &flags, names), Path::new("x.blob"))
                .unwrap_err();
            assert!(err.is_recoverable(), "{table:?}: {err}");
        }
    }

    #[test]
    fn blob_wider_than_its_names_is_corruption() {
        let wide = ParsedData {
            table: Table::Sparse(CsrMatrix::from_coo(1, 6, &[1.0], &[0], &[5]).unwrap()),
            categorical: vec![false; 4],
            attribute_names: ["a", "b", "c", "d"].map(String::from).to_vec(),
        };
        let err = decode_blob(&encode_blob(&wide).unwrap(), Path::new("x.blob")).unwrap_err();
        assert!(
            matches!(err, DatasetError::CacheCorruption { ref reason, .. } if reason.contains("6 columns"))
        );

        let flags_short = ParsedData {
            categorical: vec![false],
            ..sample()
        };
        let err = decode_blob(&encode_blob(&flags_short).unwrap(), Path::new("x.blob")).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn narrow_sparse_blob_is_accepted() {
        let narrow = ParsedData {
            attribute_names: ["a", "b", "c"].map(String::from).to_vec(),
            categorical: vec![false, true, false],
            ..sample()
        };
        let bytes = encode_blob(&narrow).unwrap();
        assert_eq!(
            decode_blob(&bytes, Path::new("x.blob")).unwrap(),
            BlobContents::Current(narrow)
        );
    }
}
