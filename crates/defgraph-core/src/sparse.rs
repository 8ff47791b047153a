//! Compressed sparse row matrix
//!
//! Square, `f64`-valued, built once from triplets. Duplicate entries are
//! summed and explicit zeros are kept out of the structure.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Square CSR matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    size: usize,
    /// `indptr[i]..indptr[i + 1]` spans the entries of row `i`
    indptr: Vec<usize>,
    /// Column of each entry, ascending within a row
    indices: Vec<usize>,
    data: Vec<f64>,
}

impl SparseMatrix {
    /// Empty `size` x `size` matrix
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            indptr: vec![0; size + 1],
            indices: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Build from `(row, col, value)` triplets
    ///
    /// # Panics
    ///
    /// Panics if a row or column is out of bounds.
    pub fn from_triplets(
        size: usize,
        triplets: impl IntoIterator<Item = (usize, usize, f64)>,
    ) -> Self {
        let mut triplets: Vec<(usize, usize, f64)> = triplets.into_iter().collect();
        for &(row, col, _) in &triplets {
            assert!(
                row < size && col < size,
                "entry ({row}, {col}) out of bounds for {size}x{size} matrix"
            );
        }
        triplets.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut matrix = Self::zeros(size);
        let mut last: Option<(usize, usize)> = None;
        for (row, col, value) in triplets {
            if last == Some((row, col)) {
                if let Some(slot) = matrix.data.last_mut() {
                    *slot += value;
                }
                continue;
            }
            matrix.indices.push(col);
            matrix.data.push(value);
            matrix.indptr[row + 1] += 1;
            last = Some((row, col));
        }
        for row in 0..size {
            matrix.indptr[row + 1] += matrix.indptr[row];
        }
        matrix.prune_zeros();
        matrix
    }

    fn prune_zeros(&mut self) {
        if self.data.iter().all(|&v| v != 0.0) {
            return;
        }
        let mut indptr = vec![0; self.size + 1];
        let mut indices = Vec::with_capacity(self.indices.len());
        let mut data = Vec::with_capacity(self.data.len());
        for row in 0..self.size {
            for k in self.indptr[row]..self.indptr[row + 1] {
                if self.data[k] != 0.0 {
                    indices.push(self.indices[k]);
                    data.push(self.data[k]);
                }
            }
            indptr[row + 1] = indices.len();
        }
        self.indptr = indptr;
        self.indices = indices;
        self.data = data;
    }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) {
        (self.size, self.size)
    }

    /// Number of stored (nonzero) entries
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    /// Value at `(row, col)`, zero when not stored or out of bounds
    pub fn get(&self, row: usize, col: usize) -> f64 {
        if row >= self.size {
            return 0.0;
        }
        let span = self.indptr[row]..self.indptr[row + 1];
        match self.indices[span.clone()].binary_search(&col) {
            Ok(offset) => self.data[span.start + offset],
            Err(_) => 0.0,
        }
    }

    /// Stored entries of `row` as `(col, value)`
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let span = if row < self.size {
            self.indptr[row]..self.indptr[row + 1]
        } else {
            0..0
        };
        span.map(move |k| (self.indices[k], self.data[k]))
    }

    /// All stored entries as `(row, col, value)`, row-major
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.size).flat_map(move |row| self.row(row).map(move |(col, value)| (row, col, value)))
    }

    /// Sum of each row
    pub fn row_sums(&self) -> Vec<f64> {
        (0..self.size).map(|row| self.row(row).map(|(_, v)| v).sum()).collect()
    }

    /// Dense copy of the matrix
    pub fn to_dense(&self) -> Array2<f64> {
        let mut dense = Array2::zeros((self.size, self.size));
        for (row, col, value) in self.iter() {
            dense[[row, col]] = value;
        }
        dense
    }
}
