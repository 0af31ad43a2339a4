use anyhow::Result;
use openml_dataset::testing::*;
use openml_dataset::*;
use std::path::Path;

fn dense(path: &Path) -> Result<Dataset> {
    Ok(Dataset::new(
        DatasetDescriptor::new("dense")
            .with_data_file(path)
            .with_row_id_attribute("id")
            .with_ignore_attributes(["foo"]),
        DatasetConfig::default(),
    )?)
}

fn sparse(path: &Path) -> Result<Dataset> {
    Ok(Dataset::new(
        DatasetDescriptor::new("sparse")
            .with_data_file(path)
            .with_format(StorageFormat::Sparse),
        DatasetConfig::default(),
    )?)
}

fn frame(data: &Data) -> &DenseTable {
    match data {
        Data::Frame(table) => table,
        other => panic!("expected a frame, got {other:?}"),
    }
}

fn array(data: &Data) -> &NumericArray {
    match data {
        Data::Array(array) => array,
        other => panic!("expected an array, got {other:?}"),
    }
}

#[test]
fn row_id_and_ignored_columns_are_dropped() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = dense(&write_fixture(dir.path(), "dense.arff", DENSE_ARFF))?;

    let split = ds.get_data(&GetDataOptions::default())?;
    assert_eq!(split.attribute_names, ["a", "b", "c"]);
    assert_eq!(split.categorical, [false, false, true]);
    assert!(split.y.is_none());
    assert_eq!(frame(&split.x).column_names(), ["a", "b", "c"]);

    let split = ds.get_data(&GetDataOptions::default().with_row_id(true))?;
    assert_eq!(split.attribute_names, ["id", "a", "b", "c"]);

    let split = ds.get_data(
        &GetDataOptions::default()
            .with_row_id(true)
            .with_ignore_attribute(true),
    )?;
    assert_eq!(split.attribute_names, ["id", "a", "b", "foo", "c"]);
    Ok(())
}

#[test]
fn dataframe_target_is_a_series() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = dense(&write_fixture(dir.path(), "dense.arff", DENSE_ARFF))?;

    let split = ds.get_data(&GetDataOptions::default().with_target("c"))?;
    assert_eq!(split.attribute_names, ["a", "b"]);
    assert_eq!(split.categorical, [false, false]);
    match split.y {
        Some(Data::Series(column)) => {
            assert_eq!(column.name, "c");
            let ColumnData::Categorical(c) = &column.data else {
                panic!("expected a categorical target");
            };
            assert_eq!(c.codes, [Some(0), Some(2), Some(1), Some(0)]);
            assert_eq!(c.label(1), Some("high"));
        }
        other => panic!("expected a series, got {other:?}"),
    }
    Ok(())
}

#[test]
fn array_target_is_integer_coded() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = dense(&write_fixture(dir.path(), "dense.arff", DENSE_ARFF))?;

    let split = ds.get_data(
        &GetDataOptions::default()
            .with_target("c")
            .with_output_format(OutputFormat::Array),
    )?;

    let x = array(&split.x);
    assert_eq!(x.shape, [4, 2]);
    let ArrayValues::F32(values) = &x.values else {
        panic!("expected f32 features");
    };
    assert_eq!(values[0], 0.5);
    assert_eq!(values[1], 10.0);
    assert!(values[4].is_nan());
    assert_eq!(values[7], 40.0);

    let y = array(split.y.as_ref().unwrap());
    assert_eq!(y.shape, [4]);
    assert_eq!(y.values, ArrayValues::I64(vec![0, 2, 1, 0]));
    assert_eq!(split.categorical.len(), 2);
    Ok(())
}

#[test]
fn numeric_target_becomes_real() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = dense(&write_fixture(dir.path(), "dense.arff", DENSE_ARFF))?;

    let split = ds.get_data(
        &GetDataOptions::default()
            .with_target("b")
            .with_output_format(OutputFormat::Array),
    )?;
    let y = array(split.y.as_ref().unwrap());
    assert_eq!(y.values, ArrayValues::F64(vec![10.0, 20.0, 30.0, 40.0]));
    Ok(())
}

#[test]
fn missing_values_in_integer_target_are_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_fixture(dir.path(), "flags.arff", BOOLEAN_ARFF);
    let mut ds = Dataset::new(
        DatasetDescriptor::new("flags").with_data_file(&path),
        DatasetConfig::default(),
    )?;
    let err = ds
        .get_data(
            &GetDataOptions::default()
                .with_target("flag")
                .with_output_format(OutputFormat::Array),
        )
        .unwrap_err();
    assert!(matches!(err, DatasetError::TypeMismatch(_)), "{err}");
    Ok(())
}

#[test]
fn true_false_columns_are_boolean() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_fixture(dir.path(), "flags.arff", BOOLEAN_ARFF);
    let mut ds = Dataset::new(
        DatasetDescriptor::new("flags").with_data_file(&path),
        DatasetConfig::default(),
    )?;

    let split = ds.get_data(&GetDataOptions::default())?;
    assert_eq!(split.categorical, [false, true]);
    let column = frame(&split.x).column("flag").unwrap();
    let ColumnData::Categorical(flag) = &column.data else {
        panic!("expected a categorical column");
    };
    assert_eq!(flag.categories, Categories::Boolean);
    assert_eq!(
        (0..3).map(|r| flag.as_bool(r)).collect::<Vec<_>>(),
        [Some(true), Some(false), None]
    );
    Ok(())
}

#[test]
fn several_targets_are_not_implemented() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_fixture(dir.path(), "two.arff", TWO_TARGET_ARFF);
    let mut ds = Dataset::new(
        DatasetDescriptor::new("two").with_data_file(&path),
        DatasetConfig::default(),
    )?;

    let err = ds
        .get_data(&GetDataOptions::default().with_target("a,b"))
        .unwrap_err();
    match err {
        DatasetError::NotImplemented(msg) => assert!(msg.contains('2'), "{msg}"),
        other => panic!("expected NotImplemented, got {other:?}"),
    }

    let err = ds
        .get_data(&GetDataOptions::default().with_targets(["a", "b"]))
        .unwrap_err();
    assert!(matches!(err, DatasetError::NotImplemented(_)));
    Ok(())
}

#[test]
fn unknown_target_is_reported() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = dense(&write_fixture(dir.path(), "dense.arff", DENSE_ARFF))?;

    let err = ds
        .get_data(&GetDataOptions::default().with_target("nope"))
        .unwrap_err();
    assert!(matches!(err, DatasetError::UnknownTarget { target } if target == "nope"));

    // Excluded columns cannot be targets.
    let err = ds
        .get_data(&GetDataOptions::default().with_target("id"))
        .unwrap_err();
    assert!(matches!(err, DatasetError::UnknownTarget { .. }));
    Ok(())
}

#[test]
fn sparse_array_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = sparse(&write_fixture(dir.path(), "sparse.arff", SPARSE_ARFF))?;

    let split = ds.get_data(
        &GetDataOptions::default()
            .with_target("class")
            .with_output_format(OutputFormat::Array),
    )?;
    assert_eq!(split.attribute_names, ["f0", "f1", "f2"]);
    assert_eq!(split.categorical, [false, false, false]);

    let Data::Sparse(x) = &split.x else {
        panic!("expected a sparse matrix, got {:?}", split.x);
    };
    assert_eq!((x.n_rows(), x.n_cols()), (3, 3));
    assert_eq!(x.get(0, 0), 1.5);
    assert_eq!(x.get(1, 1), 2.0);
    assert_eq!(x.get(2, 2), -1.0);
    assert_eq!(x.get(1, 0), 0.0);

    let y = array(split.y.as_ref().unwrap());
    assert_eq!(y.values, ArrayValues::I64(vec![1, 0, 0]));
    Ok(())
}

#[test]
fn sparse_dataframe_output_is_labelled() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = sparse(&write_fixture(dir.path(), "sparse.arff", SPARSE_ARFF))?;

    let split = ds.get_data(&GetDataOptions::default())?;
    match &split.x {
        Data::SparseFrame(frame) => {
            assert_eq!(frame.columns, ["f0", "f1", "f2", "class"]);
            assert_eq!(frame.matrix.n_cols(), 4);
            assert_eq!(frame.matrix.get(0, 3), 1.0);
        }
        other => panic!("expected a sparse frame, got {other:?}"),
    }

    let split = ds.get_data(&GetDataOptions::default().with_target("class"))?;
    let y = array(split.y.as_ref().unwrap());
    assert_eq!(y.values, ArrayValues::I64(vec![1, 0, 0]));
    Ok(())
}

#[test]
fn unknown_output_format_returns_data_unchanged() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = dense(&write_fixture(dir.path(), "dense.arff", DENSE_ARFF))?;

    let plain = ds.get_data(&GetDataOptions::default())?;
    let other = ds.get_data(
        &GetDataOptions::default().with_output_format("parquet".parse().unwrap()),
    )?;
    assert_eq!(plain, other);
    Ok(())
}

#[cfg(feature = "compression-gzip")]
#[test]
fn gzipped_raw_files_decode() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_gzip_fixture(dir.path(), "dense.arff.gz", DENSE_ARFF);
    let mut ds = dense(&path)?;

    let split = ds.get_data(&GetDataOptions::default())?;
    assert_eq!(frame(&split.x).n_rows(), 4);
    assert!(dir.path().join("dense.feather").is_file());
    Ok(())
}

#[test]
fn oversized_raw_file_is_refused_on_narrow_targets() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_fixture(dir.path(), "dense.arff", DENSE_ARFF);
    let config = DatasetConfig::default()
        .with_pointer_width(32)
        .with_size_limit(10);
    let mut ds = Dataset::new(DatasetDescriptor::new("dense").with_data_file(&path), config)?;

    let err = ds.get_data(&GetDataOptions::default()).unwrap_err();
    match err {
        DatasetError::Resource { bits, .. } => assert_eq!(bits, 32),
        other => panic!("expected Resource, got {other:?}"),
    }
    assert!(!dir.path().join("dense.meta").exists());
    Ok(())
}

#[test]
fn sparse_strings_fail_before_caching() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write_fixture(dir.path(), "strings.arff", SPARSE_STRING_ARFF);
    let mut ds = sparse(&path)?;

    let err = ds.get_data(&GetDataOptions::default()).unwrap_err();
    assert!(matches!(&err, DatasetError::Format(msg) if msg.contains("strings")), "{err}");
    assert!(!dir.path().join("strings.meta").exists());
    assert!(!dir.path().join("strings.blob").exists());
    Ok(())
}

#[test]
fn missing_raw_file_is_a_retrieval_error() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut ds = dense(&dir.path().join("absent.arff"))?;
    let err = ds.get_data(&GetDataOptions::default()).unwrap_err();
    assert!(matches!(err, DatasetError::Retrieval(_)), "{err}");
    Ok(())
}
