//! Orientation carried from a source volume onto volumes derived from it

use serde::{Deserialize, Serialize};

/// 4x4 index-to-physical direction matrix.
///
/// `Copy` on purpose: derived volumes get their own value and never share
/// the source's storage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrientationMatrix {
    rows: [[f64; 4]; 4],
}

impl OrientationMatrix {
    pub fn identity() -> Self {
        let mut rows = [[0.0; 4]; 4];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { rows }
    }

    pub fn from_rows(rows: [[f64; 4]; 4]) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[f64; 4]; 4] {
        &self.rows
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.rows[row][col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.rows[row][col] = value;
    }

    /// Map an index-space direction into physical space (upper 3x3 only)
    pub fn transform_direction(&self, ijk: [f64; 3]) -> [f64; 3] {
        let mut out = [0.0; 3];
        for (r, o) in out.iter_mut().enumerate() {
            *o = (0..3).map(|c| self.rows[r][c] * ijk[c]).sum();
        }
        out
    }

    /// Determinant of the upper 3x3 block
    pub fn determinant3(&self) -> f64 {
        let m = &self.rows;
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity()
    }
}

impl Default for OrientationMatrix {
    fn default() -> Self {
        Self::identity()
    }
}
