use serde::{Deserialize, Serialize};

/// Descriptive statistics summarizing a dataset.
///
/// Used for episode returns and lengths, which are the quantities tracked while
/// an agent is being trained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of values in the dataset.
    pub count: usize,
    /// The minimum value in the dataset.
    pub min: f32,
    /// The maximum value in the dataset.
    pub max: f32,
    /// The arithmetic mean of the dataset.
    pub mean: f32,
    /// The median value of the dataset; the mean of the two middle values for
    /// an even count.
    pub median: f32,
    /// The population standard deviation of the dataset.
    pub std_dev: f32,
}

impl Summary {
    /// Computes a summary from unsorted values.
    ///
    /// # Returns
    ///
    /// * `Some(Summary)` - if the dataset contains at least one value
    /// * `None` - if the dataset is empty
    ///
    /// # Examples
    ///
    /// ```
    /// # use omega_stats::Summary;
    /// let summary = Summary::new([5.0, 2.0, 4.0, 1.0, 3.0]).unwrap();
    /// assert_eq!(summary.count, 5);
    /// assert_eq!(summary.min, 1.0);
    /// assert_eq!(summary.max, 5.0);
    /// assert_eq!(summary.mean, 3.0);
    /// assert_eq!(summary.median, 3.0);
    /// ```
    #[must_use]
    pub fn new<I>(values: I) -> Option<Self>
    where
        I: IntoIterator<Item = f32>,
    {
        let mut values = values.into_iter().collect::<Vec<_>>();
        values.sort_by(f32::total_cmp);
        Self::from_sorted(&values)
    }

    /// Like [`Self::new`], but skips sorting.
    ///
    /// NaN values order after every number, as with [`f32::total_cmp`].
    ///
    /// # Panics
    ///
    /// Panics if `sorted_values` is not sorted in ascending order.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn from_sorted(sorted_values: &[f32]) -> Option<Self> {
        assert!(
            sorted_values.is_sorted_by(|a, b| a.total_cmp(b).is_le()),
            "values must be sorted in ascending order"
        );

        let min = *sorted_values.first()?;
        let max = *sorted_values.last()?;
        let count = sorted_values.len();
        let n = count as f32;
        let mean = sorted_values.iter().sum::<f32>() / n;
        let median = if count % 2 == 0 {
            f32::midpoint(sorted_values[count / 2 - 1], sorted_values[count / 2])
        } else {
            sorted_values[count / 2]
        };
        let variance = sorted_values
            .iter()
            .map(|v| (v - mean).powi(2))
            .sum::<f32>()
            / n;

        Some(Self {
            count,
            min,
            max,
            mean,
            median,
            std_dev: variance.sqrt(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert_eq!(Summary::new([]), None);
    }

    #[test]
    fn test_single_value() {
        let summary = Summary::new([-2.5]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.min, -2.5);
        assert_eq!(summary.max, -2.5);
        assert_eq!(summary.median, -2.5);
        assert_eq!(summary.std_dev, 0.0);
    }

    #[test]
    fn test_std_dev() {
        let summary = Summary::new([2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.std_dev, 2.0);
    }

    #[test]
    fn test_even_count_median() {
        let summary = Summary::new([4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.median, 2.5);
    }

    #[test]
    fn test_nan_sorts_last() {
        let summary = Summary::new([f32::NAN, 1.0, -1.0]).unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min, -1.0);
        assert_eq!(summary.median, 1.0);
        assert!(summary.max.is_nan());
        assert!(summary.mean.is_nan());
    }

    #[test]
    #[should_panic(expected = "values must be sorted")]
    fn test_from_sorted_rejects_unsorted() {
        let _ = Summary::from_sorted(&[3.0, 1.0]);
    }
}
