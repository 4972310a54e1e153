//! Row-major numeric columns: one physical quantity for every particle.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dtype {
    F32,
    F64,
    I32,
    I64,
}

impl Dtype {
    /// Stable on-disk tag.
    pub fn tag(self) -> u8 {
        match self {
            Dtype::F32 => 1,
            Dtype::F64 => 2,
            Dtype::I32 => 3,
            Dtype::I64 => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(Dtype::F32),
            2 => Some(Dtype::F64),
            3 => Some(Dtype::I32),
            4 => Some(Dtype::I64),
            _ => None,
        }
    }

    /// Bytes per element.
    pub fn size(self) -> usize {
        match self {
            Dtype::F32 | Dtype::I32 => 4,
            Dtype::F64 | Dtype::I64 => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dtype::F32 => "float32",
            Dtype::F64 => "float64",
            Dtype::I32 => "int32",
            Dtype::I64 => "int64",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ColumnData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::F32(v) => v.len(),
            ColumnData::F64(v) => v.len(),
            ColumnData::I32(v) => v.len(),
            ColumnData::I64(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            ColumnData::F32(_) => Dtype::F32,
            ColumnData::F64(_) => Dtype::F64,
            ColumnData::I32(_) => Dtype::I32,
            ColumnData::I64(_) => Dtype::I64,
        }
    }

    fn zeros(dtype: Dtype, len: usize) -> Self {
        match dtype {
            Dtype::F32 => ColumnData::F32(vec![0.0; len]),
            Dtype::F64 => ColumnData::F64(vec![0.0; len]),
            Dtype::I32 => ColumnData::I32(vec![0; len]),
            Dtype::I64 => ColumnData::I64(vec![0; len]),
        }
    }

    fn value_f64(&self, i: usize) -> f64 {
        match self {
            ColumnData::F32(v) => v[i] as f64,
            ColumnData::F64(v) => v[i],
            ColumnData::I32(v) => v[i] as f64,
            ColumnData::I64(v) => v[i] as f64,
        }
    }
}

/// A column of `rows` entries, each `width` wide, stored flat.
///
/// `rows` is the leading dimension the schema validator compares; `width`
/// is 1 for scalar quantities and 3 for positions and velocities.
#[derive(Clone, Debug, PartialEq)]
pub struct Column {
    width: usize,
    data: ColumnData,
}

impl Column {
    /// Build from flat data. `None` when `width` is zero or does not divide the length.
    pub fn from_flat(data: ColumnData, width: usize) -> Option<Self> {
        if width == 0 || data.len() % width != 0 {
            return None;
        }
        Some(Self { width, data })
    }

    pub fn f64(values: Vec<f64>) -> Self {
        Self {
            width: 1,
            data: ColumnData::F64(values),
        }
    }

    pub fn f32(values: Vec<f32>) -> Self {
        Self {
            width: 1,
            data: ColumnData::F32(values),
        }
    }

    pub fn i32(values: Vec<i32>) -> Self {
        Self {
            width: 1,
            data: ColumnData::I32(values),
        }
    }

    pub fn i64(values: Vec<i64>) -> Self {
        Self {
            width: 1,
            data: ColumnData::I64(values),
        }
    }

    /// Fixed-width f64 rows, e.g. `[x, y, z]` positions.
    pub fn from_rows<const N: usize>(rows: Vec<[f64; N]>) -> Self {
        Self {
            width: N,
            data: ColumnData::F64(rows.into_iter().flatten().collect()),
        }
    }

    pub fn zeros(dtype: Dtype, rows: usize, width: usize) -> Self {
        Self {
            width: width.max(1),
            data: ColumnData::zeros(dtype, rows * width.max(1)),
        }
    }

    /// Zeros with this column's dtype and shape.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.dtype(), self.rows(), self.width)
    }

    /// Sequential indices `0..n` as int64.
    pub fn arange(n: usize) -> Self {
        Self::i64((0..n as i64).collect())
    }

    pub fn rows(&self) -> usize {
        self.data.len() / self.width
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn dtype(&self) -> Dtype {
        self.data.dtype()
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.data {
            ColumnData::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Component `j` of every row, widened to f64.
    pub fn component(&self, j: usize) -> Option<Vec<f64>> {
        if j >= self.width {
            return None;
        }
        Some(
            (0..self.rows())
                .map(|i| self.data.value_f64(i * self.width + j))
                .collect(),
        )
    }

    /// Every element widened to f64, row-major.
    pub fn to_f64_vec(&self) -> Vec<f64> {
        match &self.data {
            ColumnData::F64(v) => v.clone(),
            other => (0..other.len()).map(|i| other.value_f64(i)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_width() {
        let col = Column::from_rows(vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(col.rows(), 2);
        assert_eq!(col.width(), 3);
        assert_eq!(col.component(1), Some(vec![2.0, 5.0]));
        assert_eq!(col.component(3), None);
    }

    #[test]
    fn test_zeros_like_keeps_dtype() {
        let col = Column::f32(vec![1.5, 2.5]);
        let zeros = col.zeros_like();
        assert_eq!(zeros.dtype(), Dtype::F32);
        assert_eq!(zeros.data(), &ColumnData::F32(vec![0.0, 0.0]));
    }

    #[test]
    fn test_from_flat_rejects_ragged() {
        assert!(Column::from_flat(ColumnData::F64(vec![0.0; 5]), 2).is_none());
        assert!(Column::from_flat(ColumnData::F64(vec![0.0; 4]), 0).is_none());
        assert_eq!(
            Column::from_flat(ColumnData::F64(vec![0.0; 4]), 2).map(|c| c.rows()),
            Some(2)
        );
    }

    #[test]
    fn test_dtype_tags_roundtrip() {
        for dtype in [Dtype::F32, Dtype::F64, Dtype::I32, Dtype::I64] {
            assert_eq!(Dtype::from_tag(dtype.tag()), Some(dtype));
        }
        assert_eq!(Dtype::from_tag(0), None);
    }

    #[test]
    fn test_arange() {
        let col = Column::arange(4);
        assert_eq!(col.data(), &ColumnData::I64(vec![0, 1, 2, 3]));
    }
}
