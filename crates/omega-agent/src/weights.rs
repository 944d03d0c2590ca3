//! Flat parameter vector operations.
//!
//! Policy parameters are plain `Vec<f32>`s; these helpers build, measure and
//! update them.

use rand::Rng;
use rand_distr::Normal;

/// Creates a vector by applying a function to each index.
///
/// # Examples
///
/// ```
/// use omega_agent::weights;
///
/// let values = weights::from_fn(|i| i as f32 * 0.5, 3);
/// assert_eq!(values, [0.0, 0.5, 1.0]);
/// ```
pub fn from_fn<F>(mut f: F, len: usize) -> Vec<f32>
where
    F: FnMut(usize) -> f32,
{
    let mut values = Vec::with_capacity(len);
    for i in 0..len {
        values.push(f(i));
    }
    values
}

/// Samples `len` values from `N(0, sigma²)`.
///
/// Returns `None` if `sigma` is negative or not finite. `sigma == 0` yields zeros.
pub fn normal<R>(rng: &mut R, sigma: f32, len: usize) -> Option<Vec<f32>>
where
    R: Rng + ?Sized,
{
    if !sigma.is_finite() || sigma < 0.0 {
        return None;
    }
    if sigma <= 0.0 {
        return Some(vec![0.0; len]);
    }
    let normal = Normal::new(0.0, sigma).ok()?;
    Some(from_fn(|_| rng.sample(normal), len))
}

#[must_use]
pub fn l2_norm(values: &[f32]) -> f32 {
    values.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// `target += scale * delta`, element-wise.
///
/// # Panics
///
/// Panics if the slices have different lengths.
pub fn add_scaled(target: &mut [f32], delta: &[f32], scale: f32) {
    assert_eq!(target.len(), delta.len());
    for (t, d) in target.iter_mut().zip(delta) {
        *t += scale * d;
    }
}

#[must_use]
pub fn all_finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}
