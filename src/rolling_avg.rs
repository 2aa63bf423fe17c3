use nalgebra as na;

/// Centered moving average over a whole trajectory.
///
/// Sample `i` becomes the mean of samples `i - h ..= i + h`, with the window
/// clipped at both ends of the sequence rather than padded or wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingAvg {
    half_window: usize,
}

impl Default for RollingAvg {
    fn default() -> Self {
        Self::new(5)
    }
}

impl RollingAvg {
    pub fn new(half_window: usize) -> Self {
        Self { half_window }
    }

    /// Smoothed copy of `points`, same length and order.
    ///
    /// Sequences with fewer samples than the half-window are returned as is.
    pub fn smooth(&self, points: &[na::Point2<f64>]) -> Vec<na::Point2<f64>> {
        let n = points.len();
        if n < self.half_window || n == 0 {
            return points.to_vec();
        }

        // prefix[i] = sum of points[..i]
        let mut prefix = Vec::with_capacity(n + 1);
        prefix.push(na::Vector2::zeros());
        for p in points {
            let last = prefix[prefix.len() - 1];
            prefix.push(last + p.coords);
        }

        (0..n)
            .map(|i| {
                let start = i.saturating_sub(self.half_window);
                let end = (i + self.half_window + 1).min(n);
                let sum = prefix[end] - prefix[start];

                (sum / (end - start) as f64).into()
            })
            .collect()
    }
}
