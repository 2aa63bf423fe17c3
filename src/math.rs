use nalgebra as na;
use num_traits::Float;

/// Unnormalized gaussian weight at offset `x` for spread `c`.
#[inline]
pub fn gauss<T: Float>(x: T, c: T) -> T {
    let two = T::one() + T::one();

    (-((x * x) / (two * c * c))).exp()
}

/// Sampled, normalized 1D gaussian kernel truncated at `truncate * sigma`.
///
/// Returns `[1.0]` for a non-positive sigma, which makes the blur a no-op.
pub fn gauss_kernel(sigma: f64, truncate: f64) -> Vec<f64> {
    if sigma <= 0.0 {
        return vec![1.0];
    }

    let radius = (truncate * sigma + 0.5) as isize;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| gauss(i as f64, sigma))
        .collect();

    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);

    kernel
}

/// Maps an out-of-range index back into `0..len` by half-sample symmetric
/// reflection: `d c b a | a b c d | d c b a`.
#[inline]
pub fn reflect_index(idx: isize, len: usize) -> usize {
    let len = len as isize;
    let period = 2 * len;
    let mut i = idx.rem_euclid(period);

    if i >= len {
        i = period - 1 - i;
    }

    i as usize
}

/// Total length of the polyline through `points`.
pub fn path_length<T: na::RealField + Copy>(points: &[na::Point2<T>]) -> T {
    points
        .windows(2)
        .fold(T::zero(), |acc, w| acc + na::distance(&w[0], &w[1]))
}

/// Twice the signed area of the triangle `a, b, c`.
#[inline]
pub fn cross(a: &[f64; 2], b: &[f64; 2], c: &[f64; 2]) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Whether any three of the four points are (nearly) collinear.
///
/// The tolerance is relative to the squared extent of the points so the
/// check works the same for pixels and meters.
pub fn has_collinear_triple(pts: &[[f64; 2]; 4]) -> bool {
    let (mut min_x, mut max_x) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut min_y, mut max_y) = (f64::INFINITY, f64::NEG_INFINITY);

    for p in pts {
        min_x = min_x.min(p[0]);
        max_x = max_x.max(p[0]);
        min_y = min_y.min(p[1]);
        max_y = max_y.max(p[1]);
    }

    let extent = (max_x - min_x).max(max_y - min_y);
    let eps = 1e-9 * extent * extent;

    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];

    extent <= f64::EPSILON
        || TRIPLES
            .iter()
            .any(|&(i, j, k)| cross(&pts[i], &pts[j], &pts[k]).abs() <= eps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gauss_kernel(3.0, 4.0);

        assert_eq!(k.len(), 25);
        assert_relative_eq!(k.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        for i in 0..k.len() / 2 {
            assert_relative_eq!(k[i], k[k.len() - 1 - i]);
        }
    }

    #[test]
    fn zero_sigma_kernel_is_identity() {
        assert_eq!(gauss_kernel(0.0, 4.0), vec![1.0]);
    }

    #[test]
    fn reflect_mirrors_at_both_edges() {
        assert_eq!(reflect_index(-1, 5), 0);
        assert_eq!(reflect_index(-2, 5), 1);
        assert_eq!(reflect_index(5, 5), 4);
        assert_eq!(reflect_index(6, 5), 3);
        assert_eq!(reflect_index(2, 5), 2);
        assert_eq!(reflect_index(-7, 3), 0);
    }

    #[test]
    fn path_length_sums_steps() {
        let pts = [
            na::Point2::new(0.0, 0.0),
            na::Point2::new(3.0, 4.0),
            na::Point2::new(3.0, 4.0),
        ];

        assert_relative_eq!(path_length(&pts), 5.0);
        assert_eq!(path_length::<f64>(&[]), 0.0);
    }

    #[test]
    fn detects_collinear_triples() {
        let square = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let line = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [5.0, 0.0]];

        assert!(!has_collinear_triple(&square));
        assert!(has_collinear_triple(&line));
    }
}
