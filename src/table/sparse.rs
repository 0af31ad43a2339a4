//! Compressed Sparse Row (CSR) matrix for numeric sparse datasets.
//!
//! For row `i`, the stored values are `data[indptr[i]..indptr[i + 1]]` with
//! column indices `indices[indptr[i]..indptr[i + 1]]`, ascending within a row.

use super::dense::check_mask;
use crate::error::{DatasetError, Result};
use serde::{Deserialize, Serialize};

/// Compressed Sparse Row matrix of `f32`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CsrMatrix {
    n_rows: usize,
    n_cols: usize,
    /// Row pointers, length `n_rows + 1`.
    indptr: Vec<usize>,
    indices: Vec<usize>,
    data: Vec<f32>,
}

impl CsrMatrix {
    /// Build from coordinate triples with an explicit shape.
    ///
    /// Duplicate coordinates are summed.
    ///
    /// # Errors
    /// [`DatasetError::Format`] if the triple vectors differ in length or a
    /// coordinate falls outside the shape.
    pub fn from_coo(
        n_rows: usize,
        n_cols: usize,
        values: &[f32],
        rows: &[usize],
        cols: &[usize],
    ) -> Result<Self> {
        if values.len() != rows.len() || values.len() != cols.len() {
            return Err(DatasetError::Format(format!(
                "coordinate arrays differ in length ({}, {}, {})",
                values.len(),
                rows.len(),
                cols.len()
            )));
        }
        if let Some((&r, &c)) = rows
            .iter()
            .zip(cols)
            .find(|&(&r, &c)| r >= n_rows || c >= n_cols)
        {
            return Err(DatasetError::Format(format!(
                "coordinate ({r}, {c}) outside a {n_rows}x{n_cols} matrix"
            )));
        }

        let mut order: Vec<usize> = (0..values.len()).collect();
        order.sort_by_key(|&k| (rows[k], cols[k]));

        let mut indptr = vec![0usize; n_rows + 1];
        let mut indices = Vec::with_capacity(order.len());
        let mut data: Vec<f32> = Vec::with_capacity(order.len());
        let mut last: Option<(usize, usize)> = None;

        for k in order {
            let key = (rows[k], cols[k]);
            if last == Some(key) {
                if let Some(v) = data.last_mut() {
                    *v += values[k];
                }
                continue;
            }
            indices.push(key.1);
            data.push(values[k]);
            indptr[key.0 + 1] += 1;
            last = Some(key);
        }
        for i in 0..n_rows {
            indptr[i + 1] += indptr[i];
        }

        Ok(Self {
            n_rows,
            n_cols,
            indptr,
            indices,
            data,
        })
    }

    /// Build from coordinate triples, sizing the matrix to the largest
    /// observed row and column index plus one.
    ///
    /// # Errors
    /// [`DatasetError::Format`] if the triple vectors differ in length.
    pub fn from_coo_inferred(values: &[f32], rows: &[usize], cols: &[usize]) -> Result<Self> {
        let n_rows = rows.iter().max().map_or(0, |m| m + 1);
        let n_cols = cols.iter().max().map_or(0, |m| m + 1);
        Self::from_coo(n_rows, n_cols, values, rows, cols)
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    /// Number of stored entries.
    #[must_use]
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn indptr(&self) -> &[usize] {
        &self.indptr
    }

    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Stored entries of `row` as `(column, value)` pairs.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f32)> + '_ {
        let (start, end) = if row < self.n_rows {
            (self.indptr[row], self.indptr[row + 1])
        } else {
            (0, 0)
        };
        self.indices[start..end]
            .iter()
            .copied()
            .zip(self.data[start..end].iter().copied())
    }

    /// Value at `(row, col)`; unstored entries read as zero.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> f32 {
        if row >= self.n_rows {
            return 0.0;
        }
        let start = self.indptr[row];
        let end = self.indptr[row + 1];
        self.indices[start..end]
            .binary_search(&col)
            .map_or(0.0, |pos| self.data[start + pos])
    }

    /// Row-major dense copy.
    #[must_use]
    pub fn to_dense(&self) -> Vec<f32> {
        let mut out = vec![0.0; self.n_rows * self.n_cols];
        for row in 0..self.n_rows {
            for (col, value) in self.row(row) {
                out[row * self.n_cols + col] = value;
            }
        }
        out
    }

    /// Keep the columns whose mask entry is `true`, renumbering them in order.
    ///
    /// # Errors
    /// [`DatasetError::Format`] when the mask length differs from the column count.
    pub fn select_columns(&self, mask: &[bool]) -> Result<Self> {
        check_mask(mask, self.n_cols)?;
        let mut remap = vec![None; self.n_cols];
        let mut next = 0usize;
        for (col, keep) in mask.iter().enumerate() {
            if *keep {
                remap[col] = Some(next);
                next += 1;
            }
        }

        let mut indptr = Vec::with_capacity(self.n_rows + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in 0..self.n_rows {
            for (col, value) in self.row(row) {
                if let Some(new_col) = remap[col] {
                    indices.push(new_col);
                    data.push(value);
                }
            }
            indptr.push(indices.len());
        }

        Ok(Self {
            n_rows: self.n_rows,
            n_cols: next,
            indptr,
            indices,
            data,
        })
    }

    /// Check the CSR layout against the declared shape.
    ///
    /// Matrices built by [`from_coo`](Self::from_coo) always pass; this is
    /// for matrices that arrive through deserialization.
    ///
    /// # Errors
    /// [`DatasetError::Format`] naming the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        let bad = |reason: String| Err(DatasetError::Format(format!("invalid CSR matrix: {reason}")));
        if self.indptr.len() != self.n_rows + 1 {
            return bad(format!(
                "indptr has {} entries for {} rows",
                self.indptr.len(),
                self.n_rows
            ));
        }
        if self.indptr[0] != 0 || self.indptr.windows(2).any(|w| w[0] > w[1]) {
            return bad("indptr is not a non-decreasing sequence from 0".into());
        }
        let nnz = self.indptr[self.n_rows];
        if nnz != self.indices.len() || nnz != self.data.len() {
            return bad(format!(
                "indptr ends at {nnz} but there are {} indices and {} values",
                self.indices.len(),
                self.data.len()
            ));
        }
        if let Some(col) = self.indices.iter().find(|&&c| c >= self.n_cols) {
            return bad(format!("column index {col} out of range for {} columns", self.n_cols));
        }
        Ok(())
    }

    /// Grow the column count to at least `n_cols`. Stored entries are unchanged.
    #[must_use]
    pub fn widen_cols(mut self, n_cols: usize) -> Self {
        self.n_cols = self.n_cols.max(n_cols);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialized_layout_is_checked() {
        let good = CsrMatrix::from_coo(2, 3, &[1.0, 2.0], &[0, 1], &[2, 0]).unwrap();
        assert!(good.validate().is_ok());

        let short_indptr = CsrMatrix {
            indptr: vec![0, 0],
            ..good.clone()
        };
        assert!(matches!(short_indptr.validate(), Err(DatasetError::Format(_))));

        let wide_index = CsrMatrix {
            indices: vec![2, 5],
            ..good.clone()
        };
        assert!(wide_index.validate().is_err());

        let decreasing = CsrMatrix {
            indptr: vec![0, 2, 1],
            ..good.clone()
        };
        assert!(decreasing.validate().is_err());

        let missing_values = CsrMatrix {
            data: vec![1.0],
            ..good
        };
        assert!(missing_values.validate().is_err());
    }

    #[test]
    fn duplicates_are_summed() {
        let m = CsrMatrix::from_coo(2, 2, &[1.0, 2.0, 3.0], &[0, 0, 1], &[1, 1, 0]).unwrap();
        assert_eq!(m.nnz(), 2);
        assert_eq!(m.get(0, 1), 3.0);
        assert_eq!(m.get(1, 0), 3.0);
        assert_eq!(m.get(0, 0), 0.0);
    }

    #[test]
    fn unsorted_input_is_ordered_per_row() {
        let m = CsrMatrix::from_coo(2, 3, &[5.0, 4.0, 6.0], &[1, 0, 0], &[0, 2, 0]).unwrap();
        assert_eq!(m.indptr(), [0, 2, 3]);
        assert_eq!(m.indices(), [0, 2, 0]);
        assert_eq!(m.to_dense(), [6.0, 0.0, 4.0, 5.0, 0.0, 0.0]);
    }

    #[test]
    fn inferred_shape_is_max_index_plus_one() {
        let m = CsrMatrix::from_coo_inferred(&[1.0, 1.0], &[0, 3], &[4, 1]).unwrap();
        assert_eq!((m.n_rows(), m.n_cols()), (4, 5));
        let empty = CsrMatrix::from_coo_inferred(&[], &[], &[]).unwrap();
        assert_eq!((empty.n_rows(), empty.n_cols()), (0, 0));
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        assert!(matches!(
            CsrMatrix::from_coo(1, 1, &[1.0], &[0], &[1]),
            Err(DatasetError::Format(_))
        ));
    }

    #[test]
    fn column_selection_renumbers() {
        let m = CsrMatrix::from_coo(2, 3, &[1.0, 2.0, 3.0], &[0, 0, 1], &[0, 2, 1]).unwrap();
        let s = m.select_columns(&[false, true, true]).unwrap();
        assert_eq!(s.n_cols(), 2);
        assert_eq!(s.to_dense(), [0.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn widen_keeps_entries() {
        let m = CsrMatrix::from_coo_inferred(&[1.0], &[0], &[0]).unwrap().widen_cols(3);
        assert_eq!(m.n_cols(), 3);
        assert_eq!(m.to_dense(), [1.0, 0.0, 0.0]);
        assert!(m.select_columns(&[true, false, true]).is_ok());
    }
}
