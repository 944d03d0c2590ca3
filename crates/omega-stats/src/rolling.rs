use std::collections::VecDeque;

/// Fixed-capacity window over the most recent values.
///
/// Pushing into a full window evicts the oldest value.
///
/// # Example
///
/// ```
/// use omega_stats::RollingWindow;
///
/// let mut window = RollingWindow::new(2);
/// window.push(1.0);
/// window.push(2.0);
/// window.push(4.0);
/// assert_eq!(window.values().collect::<Vec<_>>(), [2.0, 4.0]);
/// assert_eq!(window.mean(), Some(3.0));
/// ```
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f32>,
}

impl RollingWindow {
    /// Creates an empty window.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "rolling window capacity must be positive");
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn push(&mut self, value: f32) {
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    /// Iterates values from oldest to newest.
    pub fn values(&self) -> impl ExactSizeIterator<Item = f32> + '_ {
        self.values.iter().copied()
    }

    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean(&self) -> Option<f32> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f32>() / self.values.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_mean() {
        assert_eq!(RollingWindow::new(3).mean(), None);
    }

    #[test]
    fn test_eviction_keeps_capacity() {
        let mut window = RollingWindow::new(3);
        for i in 0..10 {
            #[expect(clippy::cast_precision_loss)]
            window.push(i as f32);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.values().collect::<Vec<_>>(), [7.0, 8.0, 9.0]);
    }

    #[test]
    #[should_panic(expected = "capacity must be positive")]
    fn test_zero_capacity() {
        let _ = RollingWindow::new(0);
    }
}
