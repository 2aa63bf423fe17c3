//! Image-to-pitch homography estimation.
//!
//! A normalized DLT solves the minimal 4-point problem; a seeded RANSAC loop
//! around it rejects outlying correspondences and the winning consensus set
//! is refit with all of its inliers.

use nalgebra as na;
use rand::{rngs::StdRng, SeedableRng};
use serde_derive::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::RansacConfig;
use crate::error::Error;
use crate::math;

/// Minimal number of correspondences that determine a homography.
pub const MIN_CORRESPONDENCES: usize = 4;

/// One image point paired with the field point it shows.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// Pixel coordinates.
    pub image: [f64; 2],
    /// Field coordinates in meters.
    pub field: [f64; 2],
}

impl Correspondence {
    #[inline]
    pub fn new(image: (f64, f64), field: (f64, f64)) -> Self {
        Self {
            image: [image.0, image.1],
            field: [field.0, field.1],
        }
    }
}

/// Projective transform from camera pixels to pitch meters.
///
/// Immutable once built, so one instance can be shared by reference across
/// threads for the whole capture session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(na::Matrix3<f64>);

impl Homography {
    /// Wraps a raw matrix, rejecting non-finite or non-invertible ones.
    ///
    /// Only exact singularity is rejected; conditioning is checked on the
    /// normalized DLT solution.
    pub fn from_matrix(m: na::Matrix3<f64>) -> Result<Self, Error> {
        if m.iter().any(|v| !v.is_finite()) {
            return Err(Error::degenerate("homography has non-finite entries"));
        }

        if m.try_inverse().is_none() {
            return Err(Error::degenerate("homography is singular"));
        }

        let m = if m[(2, 2)] != 0.0 { m / m[(2, 2)] } else { m };

        Ok(Self(m))
    }

    /// Row-major entries, the layout used when the transform is printed or
    /// persisted.
    pub fn to_rows(&self) -> [[f64; 3]; 3] {
        let m = &self.0;

        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
            [m[(2, 0)], m[(2, 1)], m[(2, 2)]],
        ]
    }

    /// Projects `(x, y, 1)` and divides by the homogeneous component.
    ///
    /// A component of exactly zero maps the point to infinity and is an error.
    pub fn project(&self, x: f64, y: f64) -> Result<na::Point2<f64>, Error> {
        let p = self.0 * na::Vector3::new(x, y, 1.0);

        if p.z == 0.0 {
            return Err(Error::DegenerateProjection { x, y });
        }

        Ok(na::Point2::new(p.x / p.z, p.y / p.z))
    }

    /// Field-to-image transform.
    pub fn inverse(&self) -> Result<Self, Error> {
        let inv = self
            .0
            .try_inverse()
            .ok_or_else(|| Error::degenerate("homography is not invertible"))?;

        Self::from_matrix(inv)
    }

    /// Euclidean distance between the projected image point and the field point.
    pub fn reprojection_error(&self, c: &Correspondence) -> f64 {
        match self.project(c.image[0], c.image[1]) {
            Ok(p) => na::distance(&p, &na::Point2::new(c.field[0], c.field[1])),
            Err(_) => f64::INFINITY,
        }
    }
}

/// Outcome of a robust fit.
#[derive(Debug, Clone)]
pub struct Estimate {
    pub homography: Homography,
    /// `true` for correspondences consistent with the final transform.
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
    /// Root mean square reprojection error over the inliers, in meters.
    pub rms_error: f64,
}

#[derive(Debug, Clone, Default)]
pub struct HomographyEstimator {
    config: RansacConfig,
}

impl HomographyEstimator {
    pub fn new(config: RansacConfig) -> Self {
        Self { config }
    }

    /// Fits the image-to-field transform for a correspondence set.
    ///
    /// Pure: the same input and seed always give the same transform.
    pub fn estimate(&self, correspondences: &[Correspondence]) -> Result<Estimate, Error> {
        let n = correspondences.len();
        if n < MIN_CORRESPONDENCES {
            return Err(Error::InsufficientCorrespondences { got: n });
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let iters = if n == MIN_CORRESPONDENCES {
            1
        } else {
            self.config.max_iters.max(1)
        };

        let mut best: Option<(Homography, Vec<bool>, usize)> = None;
        let mut degenerate_samples = 0usize;

        for _ in 0..iters {
            let sample: Vec<Correspondence> = if n == MIN_CORRESPONDENCES {
                correspondences.to_vec()
            } else {
                rand::seq::index::sample(&mut rng, n, MIN_CORRESPONDENCES)
                    .into_iter()
                    .map(|i| correspondences[i])
                    .collect()
            };

            if is_degenerate_sample(&sample) {
                degenerate_samples += 1;
                continue;
            }

            let h = match dlt(&sample) {
                Ok(h) => h,
                Err(_) => {
                    degenerate_samples += 1;
                    continue;
                }
            };

            let mask = self.inliers(&h, correspondences);
            let count = mask.iter().filter(|&&m| m).count();

            if best.as_ref().map_or(true, |(_, _, c)| count > *c) {
                best = Some((h, mask, count));

                // Early exit if >90% inliers
                if count * 10 > n * 9 {
                    break;
                }
            }
        }

        let (best_h, best_mask, best_count) = best.ok_or_else(|| {
            Error::degenerate(format!(
                "every minimal sample was degenerate ({} tried)",
                degenerate_samples
            ))
        })?;

        if best_count < self.config.min_inliers.max(MIN_CORRESPONDENCES) {
            return Err(Error::degenerate(format!(
                "no consistent transform: {} inliers of {}, need {}",
                best_count,
                n,
                self.config.min_inliers.max(MIN_CORRESPONDENCES)
            )));
        }

        let inliers: Vec<Correspondence> = correspondences
            .iter()
            .zip(&best_mask)
            .filter(|(_, &m)| m)
            .map(|(c, _)| *c)
            .collect();

        let refit = match dlt(&inliers) {
            Ok(h) => h,
            Err(err) => {
                debug!("inlier refit rejected, keeping best sample: {}", err);
                best_h
            }
        };
        let mask = self.inliers(&refit, correspondences);
        let n_inliers = mask.iter().filter(|&&m| m).count();

        let (homography, inlier_mask, n_inliers) = if n_inliers >= best_count {
            (refit, mask, n_inliers)
        } else {
            (best_h, best_mask, best_count)
        };

        let rms_error = rms(&homography, correspondences, &inlier_mask);

        debug!(
            "homography hypotheses rejected as degenerate: {}",
            degenerate_samples
        );
        info!(
            "homography estimated: {}/{} inliers, rms reprojection error {:.4} m",
            n_inliers, n, rms_error
        );

        Ok(Estimate {
            homography,
            inlier_mask,
            n_inliers,
            rms_error,
        })
    }

    fn inliers(&self, h: &Homography, correspondences: &[Correspondence]) -> Vec<bool> {
        correspondences
            .iter()
            .map(|c| h.reprojection_error(c) < self.config.inlier_threshold)
            .collect()
    }
}

/// Fits a transform with the default robust estimator.
pub fn estimate(correspondences: &[Correspondence]) -> Result<Homography, Error> {
    HomographyEstimator::default()
        .estimate(correspondences)
        .map(|e| e.homography)
}

fn is_degenerate_sample(sample: &[Correspondence]) -> bool {
    let image = [
        sample[0].image,
        sample[1].image,
        sample[2].image,
        sample[3].image,
    ];
    let field = [
        sample[0].field,
        sample[1].field,
        sample[2].field,
        sample[3].field,
    ];

    math::has_collinear_triple(&image) || math::has_collinear_triple(&field)
}

fn rms(h: &Homography, correspondences: &[Correspondence], mask: &[bool]) -> f64 {
    let (sum, count) = correspondences
        .iter()
        .zip(mask)
        .filter(|(_, &m)| m)
        .map(|(c, _)| h.reprojection_error(c))
        .fold((0.0, 0usize), |(s, k), e| (s + e * e, k + 1));

    if count == 0 {
        0.0
    } else {
        (sum / count as f64).sqrt()
    }
}

/// Translates the centroid to the origin and scales the mean distance from
/// it to sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (na::Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = na::Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts
        .iter()
        .map(|p| [s * (p[0] - cx), s * (p[1] - cy)])
        .collect();

    (t, normalized)
}

/// Direct linear transform over all given correspondences.
fn dlt(correspondences: &[Correspondence]) -> Result<Homography, Error> {
    let n = correspondences.len();
    if n < MIN_CORRESPONDENCES {
        return Err(Error::InsufficientCorrespondences { got: n });
    }

    let src: Vec<[f64; 2]> = correspondences.iter().map(|c| c.image).collect();
    let dst: Vec<[f64; 2]> = correspondences.iter().map(|c| c.field).collect();

    let (t_src, src_n) = normalize_points(&src);
    let (t_dst, dst_n) = normalize_points(&dst);

    let mut a = na::DMatrix::<f64>::zeros(2 * n, 9);
    for i in 0..n {
        let [sx, sy] = src_n[i];
        let [dx, dy] = dst_n[i];

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // h is the eigenvector of A^T A with the smallest eigenvalue
    let ata = a.transpose() * &a;
    let eig = na::SymmetricEigen::new(ata);

    let min_idx = eig
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
        .map(|(i, _)| i)
        .ok_or_else(|| Error::degenerate("empty eigen decomposition"))?;

    let h = eig.eigenvectors.column(min_idx);
    let h_norm = na::Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    // both point sets are unit-scaled, so a near-zero determinant here means
    // the points admit no proper transform
    let scale = h_norm.norm();
    if scale == 0.0 || (h_norm / scale).determinant().abs() < 1e-12 {
        return Err(Error::degenerate("normalized homography is singular"));
    }

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| Error::degenerate("field points are coincident"))?;

    Homography::from_matrix(t_dst_inv * h_norm * t_src)
}
