/// Dense sample × consensus-cluster signal matrix, row-major.
///
/// Every (sample, cluster) pair has a defined value; a sample with no
/// signal in a cluster holds 0.0 rather than a missing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalMatrix {
    data: Vec<f64>,
    rows: usize,
    cols: usize,
}

impl SignalMatrix {
    /// A zero-filled matrix with one row per sample and one column per
    /// consensus cluster.
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![0.0; rows * cols],
            rows,
            cols,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.rows && col < self.cols {
            self.data.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) -> Result<(), String> {
        if row < self.rows && col < self.cols {
            self.data[row * self.cols + col] = value;
            Ok(())
        } else {
            Err(format!("Index out of bounds: row {}, col {}", row, col))
        }
    }

    /// One sample's signal across all consensus clusters.
    pub fn row(&self, row: usize) -> Option<&[f64]> {
        if row < self.rows {
            Some(&self.data[row * self.cols..(row + 1) * self.cols])
        } else {
            None
        }
    }

    /// Total signal of one consensus cluster across samples.
    pub fn col_sum(&self, col: usize) -> Option<f64> {
        if col < self.cols {
            Some((0..self.rows).map(|r| self.data[r * self.cols + col]).sum())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_new_is_dense_zero() {
        let m = SignalMatrix::new(2, 3);
        for r in 0..2 {
            for c in 0..3 {
                assert_eq!(m.get(r, c), Some(0.0));
            }
        }
        assert_eq!(m.get(2, 0), None);
    }

    #[test]
    fn test_set_and_sums() {
        let mut m = SignalMatrix::new(2, 2);
        m.set(0, 1, 2.5).unwrap();
        m.set(1, 1, 1.5).unwrap();
        assert_eq!(m.row(0).unwrap(), &[0.0, 2.5]);
        assert_eq!(m.col_sum(1), Some(4.0));
        assert!(m.set(5, 0, 1.0).is_err());
    }
}
