//! Small dense matrices over GF(2^8).
//!
//! Just enough linear algebra for the codec: identity and Vandermonde
//! construction, multiplication, row selection, and Gauss-Jordan
//! inversion.

use crate::error::CodecError;
use crate::field::Gf256;

/// A row-major matrix of GF(2^8) elements.
#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Gf256>,
}

impl Matrix {
    /// All-zero matrix of the given shape.
    pub(crate) fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![Gf256::ZERO; rows * cols],
        }
    }

    /// Square identity matrix.
    pub(crate) fn identity(size: usize) -> Self {
        let mut m = Self::new(size, size);
        for i in 0..size {
            m.set(i, i, Gf256::ONE);
        }
        m
    }

    /// Vandermonde matrix: `m[r][c] = r^c`.
    ///
    /// Every square submatrix built from distinct rows is invertible,
    /// which is what makes the derived code MDS.
    pub(crate) fn vandermonde(rows: usize, cols: usize) -> Self {
        let mut m = Self::new(rows, cols);
        for r in 0..rows {
            for c in 0..cols {
                m.set(r, c, Gf256(r as u8).pow(c));
            }
        }
        m
    }

    #[inline]
    pub(crate) fn get(&self, row: usize, col: usize) -> Gf256 {
        self.data[row * self.cols + col]
    }

    #[inline]
    pub(crate) fn set(&mut self, row: usize, col: usize, value: Gf256) {
        self.data[row * self.cols + col] = value;
    }

    /// Matrix product `self * other`.
    pub(crate) fn times(&self, other: &Matrix) -> Matrix {
        debug_assert_eq!(self.cols, other.rows);
        let mut out = Matrix::new(self.rows, other.cols);
        for r in 0..self.rows {
            for c in 0..other.cols {
                let mut acc = Gf256::ZERO;
                for i in 0..self.cols {
                    acc = acc.add(self.get(r, i).mul(other.get(i, c)));
                }
                out.set(r, c, acc);
            }
        }
        out
    }

    /// New matrix made of the given rows of `self`, in order.
    pub(crate) fn select_rows(&self, rows: &[usize]) -> Matrix {
        let mut out = Matrix::new(rows.len(), self.cols);
        for (r, &src) in rows.iter().enumerate() {
            for c in 0..self.cols {
                out.set(r, c, self.get(src, c));
            }
        }
        out
    }

    /// Top-left square submatrix of the given size.
    pub(crate) fn top_square(&self, size: usize) -> Matrix {
        self.select_rows(&(0..size).collect::<Vec<_>>())
    }

    /// Invert a square matrix by Gauss-Jordan elimination on `[self | I]`.
    pub(crate) fn invert(&self) -> Result<Matrix, CodecError> {
        debug_assert_eq!(self.rows, self.cols);
        let n = self.rows;
        let mut work = self.clone();
        let mut out = Matrix::identity(n);

        for col in 0..n {
            // Find a pivot row with a nonzero entry in this column.
            let pivot = (col..n).find(|&r| work.get(r, col) != Gf256::ZERO).ok_or_else(|| {
                CodecError::InvalidParameters {
                    reason: "matrix is singular".to_string(),
                }
            })?;
            if pivot != col {
                work.swap_rows(pivot, col);
                out.swap_rows(pivot, col);
            }

            // Scale the pivot row so the pivot entry becomes 1.
            let inv = work
                .get(col, col)
                .inv()
                .ok_or_else(|| CodecError::InvalidParameters {
                    reason: "matrix is singular".to_string(),
                })?;
            work.scale_row(col, inv);
            out.scale_row(col, inv);

            // Eliminate the column from every other row.
            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = work.get(row, col);
                if factor != Gf256::ZERO {
                    work.add_scaled_row(row, col, factor);
                    out.add_scaled_row(row, col, factor);
                }
            }
        }

        Ok(out)
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        for c in 0..self.cols {
            let tmp = self.get(a, c);
            self.set(a, c, self.get(b, c));
            self.set(b, c, tmp);
        }
    }

    fn scale_row(&mut self, row: usize, factor: Gf256) {
        for c in 0..self.cols {
            let v = self.get(row, c).mul(factor);
            self.set(row, c, v);
        }
    }

    /// `row[target] += factor * row[source]` (addition is XOR).
    fn add_scaled_row(&mut self, target: usize, source: usize, factor: Gf256) {
        for c in 0..self.cols {
            let v = self.get(target, c).add(self.get(source, c).mul(factor));
            self.set(target, c, v);
        }
    }
}
