use std::{ops::Deref, sync::Arc};

/// Immutable per-slot batch on the agent/training side.
///
/// Cloning a batch shares its storage, so a trajectory can keep the memory and
/// observations of every step without copying them.
#[derive(Debug, PartialEq, Eq)]
pub struct Batch<T>(Arc<[T]>);

impl<T> Clone for Batch<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Batch<T> {
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.0
    }
}

impl<T> Deref for Batch<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.0
    }
}

impl<T> From<Vec<T>> for Batch<T> {
    fn from(values: Vec<T>) -> Self {
        Self(values.into())
    }
}

impl<T> FromIterator<T> for Batch<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Moves host values (environment side) into the agent-side representation.
#[must_use]
pub fn to_device<T>(host: Vec<T>) -> Batch<T> {
    Batch::from(host)
}

/// Copies an agent-side batch into host values for the environment side.
#[must_use]
pub fn to_host<T>(batch: &Batch<T>) -> Vec<T>
where
    T: Clone,
{
    batch.to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_storage() {
        let a = to_device(vec![1, 2, 3]);
        let b = a.clone();
        assert!(std::ptr::eq(a.as_slice(), b.as_slice()));
    }

    #[test]
    fn test_host_roundtrip_keeps_order() {
        let batch: Batch<_> = (0..5).collect();
        assert_eq!(to_host(&batch), [0, 1, 2, 3, 4]);
        assert_eq!(batch.len(), 5);
        assert_eq!(batch[3], 3);
    }
}
