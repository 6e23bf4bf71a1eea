//! SIMD helpers for windowed statistics.
//!
//! Built on `wide` for portable SIMD. They back the moving averages, the
//! Bollinger bands and the support/resistance scan run on every replayed bar.

use wide::f64x4;

const LANES: usize = 4;

fn lanes(chunk: &[f64]) -> f64x4 {
    f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]])
}

pub fn sum_simd(data: &[f64]) -> f64 {
    let chunks = data.chunks_exact(LANES);
    let tail: f64 = chunks.remainder().iter().sum();
    chunks
        .fold(f64x4::splat(0.0), |acc, chunk| acc + lanes(chunk))
        .reduce_add()
        + tail
}

/// Arithmetic mean. Zero for an empty slice.
pub fn mean_simd(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    sum_simd(data) / data.len() as f64
}

/// Mean and population standard deviation of one window.
pub fn mean_std_simd(window: &[f64]) -> (f64, f64) {
    if window.is_empty() {
        return (0.0, 0.0);
    }

    let mean = mean_simd(window);
    let centre = f64x4::splat(mean);
    let chunks = window.chunks_exact(LANES);
    let tail: f64 = chunks.remainder().iter().map(|v| (v - mean) * (v - mean)).sum();
    let squares = chunks
        .fold(f64x4::splat(0.0), |acc, chunk| {
            let diff = lanes(chunk) - centre;
            acc + diff * diff
        })
        .reduce_add();

    (mean, ((squares + tail) / window.len() as f64).sqrt())
}

/// Minimum and maximum of a slice.
pub fn minmax_simd(data: &[f64]) -> Option<(f64, f64)> {
    if data.is_empty() {
        return None;
    }

    let chunks = data.chunks_exact(LANES);
    let tail = chunks.remainder();
    let (lo, hi) = chunks.fold(
        (f64x4::splat(f64::INFINITY), f64x4::splat(f64::NEG_INFINITY)),
        |(lo, hi), chunk| {
            let v = lanes(chunk);
            (lo.min(v), hi.max(v))
        },
    );

    let min = lo.to_array().into_iter().chain(tail.iter().copied()).fold(f64::INFINITY, f64::min);
    let max = hi.to_array().into_iter().chain(tail.iter().copied()).fold(f64::NEG_INFINITY, f64::max);
    Some((min, max))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sum_and_mean() {
        let data: Vec<f64> = (1..=101).map(|x| x as f64).collect();
        assert!((sum_simd(&data) - 5151.0).abs() < 1e-10);
        assert!((mean_simd(&data) - 51.0).abs() < 1e-10);
        assert_eq!(sum_simd(&[1.5, 2.5]), 4.0);
        assert_eq!(mean_simd(&[]), 0.0);
    }

    #[test]
    fn test_mean_std_population() {
        let (mean, std) = mean_std_simd(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((mean - 5.0).abs() < 1e-10);
        assert!((std - 2.0).abs() < 1e-10);

        // scalar tail only
        let (_, std) = mean_std_simd(&[1.0, 1.0, 1.0]);
        assert_eq!(std, 0.0);
        assert_eq!(mean_std_simd(&[]), (0.0, 0.0));
    }

    #[test]
    fn test_minmax_in_tail_and_lanes() {
        let data = [5.0, 2.0, 8.0, 1.0, 9.0, 3.0, 7.0, 4.0, 0.5];
        assert_eq!(minmax_simd(&data), Some((0.5, 9.0)));
        assert_eq!(minmax_simd(&[3.0]), Some((3.0, 3.0)));
        assert!(minmax_simd(&[]).is_none());
    }
}
