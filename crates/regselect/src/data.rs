//! Feature/target views over the pre-split arrays.
//!
//! Arrays are sample-major: shape `[n_samples, n_features + 1]`, the target
//! in the last column. Splitting is pure column slicing; nothing is copied.

use ndarray::{s, ArrayView1, ArrayView2};

/// Errors raised while slicing input arrays.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataError {
    /// The array has no rows.
    #[error("{which} array has no rows")]
    NoRows { which: &'static str },

    /// The array needs at least one feature column plus the target column.
    #[error("{which} array needs at least 2 columns, got {n_cols}")]
    TooFewColumns { which: &'static str, n_cols: usize },

    /// Train and test arrays disagree on the column count.
    #[error("train array has {train} columns but test array has {test}")]
    ColumnMismatch { train: usize, test: usize },
}

/// Split one array into `(features, target)` views.
pub fn split_features_target<'a>(
    array: ArrayView2<'a, f64>,
    which: &'static str,
) -> Result<(ArrayView2<'a, f64>, ArrayView1<'a, f64>), DataError> {
    let (n_rows, n_cols) = array.dim();
    if n_rows == 0 {
        return Err(DataError::NoRows { which });
    }
    if n_cols < 2 {
        return Err(DataError::TooFewColumns { which, n_cols });
    }

    let last = n_cols - 1;
    Ok((array.slice_move(s![.., ..last]), array.slice_move(s![.., last])))
}

/// Borrowed train/test features and targets for one selection run.
#[derive(Debug, Clone, Copy)]
pub struct SplitData<'a> {
    pub x_train: ArrayView2<'a, f64>,
    pub y_train: ArrayView1<'a, f64>,
    pub x_test: ArrayView2<'a, f64>,
    pub y_test: ArrayView1<'a, f64>,
}

impl<'a> SplitData<'a> {
    /// Slice train and test arrays independently.
    pub fn from_arrays(
        train: ArrayView2<'a, f64>,
        test: ArrayView2<'a, f64>,
    ) -> Result<Self, DataError> {
        if train.ncols() != test.ncols() {
            return Err(DataError::ColumnMismatch {
                train: train.ncols(),
                test: test.ncols(),
            });
        }
        let (x_train, y_train) = split_features_target(train, "train")?;
        let (x_test, y_test) = split_features_target(test, "test")?;
        Ok(Self {
            x_train,
            y_train,
            x_test,
            y_test,
        })
    }

    pub fn n_features(&self) -> usize {
        self.x_train.ncols()
    }

    pub fn n_train(&self) -> usize {
        self.x_train.nrows()
    }

    pub fn n_test(&self) -> usize {
        self.x_test.nrows()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn splits_last_column_as_target() {
        let a = array![[1.0, 2.0, 10.0], [3.0, 4.0, 20.0]];
        let (x, y) = split_features_target(a.view(), "train").unwrap();
        assert_eq!(x, array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(y, array![10.0, 20.0]);
    }

    #[test]
    fn split_is_a_view() {
        let a = array![[1.0, 5.0], [2.0, 6.0]];
        let (x, _) = split_features_target(a.view(), "train").unwrap();
        assert_eq!(x.as_ptr(), a.as_ptr());
    }

    #[test]
    fn rejects_degenerate_shapes() {
        let empty = Array2::<f64>::zeros((0, 3));
        assert_eq!(
            split_features_target(empty.view(), "test"),
            Err(DataError::NoRows { which: "test" })
        );

        let one_col = Array2::<f64>::zeros((4, 1));
        assert_eq!(
            split_features_target(one_col.view(), "train"),
            Err(DataError::TooFewColumns { which: "train", n_cols: 1 })
        );
    }

    #[test]
    fn split_data_checks_column_counts() {
        let train = Array2::<f64>::zeros((3, 4));
        let test = Array2::<f64>::zeros((2, 5));
        let err = SplitData::from_arrays(train.view(), test.view()).unwrap_err();
        assert_eq!(err, DataError::ColumnMismatch { train: 4, test: 5 });
    }

    #[test]
    fn split_data_dimensions() {
        let train = Array2::<f64>::zeros((10, 5));
        let test = Array2::<f64>::zeros((3, 5));
        let data = SplitData::from_arrays(train.view(), test.view()).unwrap();
        assert_eq!(data.n_features(), 4);
        assert_eq!(data.n_train(), 10);
        assert_eq!(data.n_test(), 3);
        assert_eq!(data.y_test.len(), 3);
    }
}
