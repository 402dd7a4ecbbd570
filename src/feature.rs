/// Row-major numeric feature matrix. Every row has the same width and
/// column `j` means the same thing in every row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Vec<f64>,
    column_names: Vec<String>,
    num_rows: usize,
}

impl FeatureMatrix {
    pub fn with_columns(column_names: Vec<String>) -> Self {
        Self {
            values: Vec::new(),
            column_names,
            num_rows: 0,
        }
    }

    /// Appends a row. The caller guarantees `row.len() == self.width()`.
    pub(crate) fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.width(), "feature row width mismatch");
        self.values.extend_from_slice(row);
        self.num_rows += 1;
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let width = self.width();
        &self.values[index * width..(index + 1) * width]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.num_rows).map(move |i| self.row(i))
    }

    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    pub fn width(&self) -> usize {
        self.column_names.len()
    }

    pub fn len(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_are_sliced_by_width() {
        let mut matrix = FeatureMatrix::with_columns(vec!["a".to_string(), "b".to_string()]);
        matrix.push_row(&[1.0, 2.0]);
        matrix.push_row(&[3.0, 4.0]);

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.width(), 2);
        assert_eq!(matrix.row(1), &[3.0, 4.0]);
        assert_eq!(matrix.rows().count(), 2);
    }
}
