use nalgebra as na;

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;
use crate::homography::{Correspondence, Estimate, Homography, HomographyEstimator};

#[inline]
pub fn map_point(h: &Homography, point: na::Point2<f64>) -> Result<na::Point2<f64>, Error> {
    h.project(point.x, point.y)
}

/// Maps the bottom-center of the box, which approximates where the player
/// touches the ground.
#[inline]
pub fn map_bbox(h: &Homography, bbox: &BBox<Ltrb>) -> Result<na::Point2<f64>, Error> {
    map_point(h, bbox.anchor())
}

pub fn map_many(
    h: &Homography,
    points: &[na::Point2<f64>],
) -> Result<Vec<na::Point2<f64>>, Error> {
    points.iter().map(|&p| map_point(h, p)).collect()
}

/// Holds the transform of one capture session.
///
/// Mapping before a transform is set fails with [`Error::NotInitialized`].
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    homography: Option<Homography>,
}

impl FieldMapper {
    pub fn new() -> Self {
        Self { homography: None }
    }

    pub fn with_homography(homography: Homography) -> Self {
        Self {
            homography: Some(homography),
        }
    }

    /// Estimates and stores the transform for `correspondences`.
    pub fn set_correspondences(
        &mut self,
        estimator: &HomographyEstimator,
        correspondences: &[Correspondence],
    ) -> Result<Estimate, Error> {
        let estimate = estimator.estimate(correspondences)?;
        self.homography = Some(estimate.homography);

        Ok(estimate)
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.homography.is_some()
    }

    #[inline]
    pub fn homography(&self) -> Result<&Homography, Error> {
        self.homography.as_ref().ok_or(Error::NotInitialized)
    }

    pub fn map_point(&self, point: na::Point2<f64>) -> Result<na::Point2<f64>, Error> {
        map_point(self.homography()?, point)
    }

    pub fn map_bbox(&self, bbox: &BBox<Ltrb>) -> Result<na::Point2<f64>, Error> {
        map_bbox(self.homography()?, bbox)
    }

    pub fn map_many(&self, points: &[na::Point2<f64>]) -> Result<Vec<na::Point2<f64>>, Error> {
        map_many(self.homography()?, points)
    }

    pub fn map_bboxes(&self, bboxes: &[BBox<Ltrb>]) -> Result<Vec<na::Point2<f64>>, Error> {
        let h = self.homography()?;

        bboxes.iter().map(|b| map_bbox(h, b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn mapper() -> FieldMapper {
        let mut mapper = FieldMapper::new();
        mapper
            .set_correspondences(
                &HomographyEstimator::default(),
                &[
                    Correspondence::new((100.0, 200.0), (0.0, 0.0)),
                    Correspondence::new((1800.0, 220.0), (105.0, 0.0)),
                    Correspondence::new((150.0, 900.0), (0.0, 68.0)),
                    Correspondence::new((1750.0, 880.0), (105.0, 68.0)),
                ],
            )
            .unwrap();

        mapper
    }

    #[test]
    fn uninitialized_mapper_fails() {
        let mapper = FieldMapper::new();

        assert!(!mapper.is_initialized());
        assert!(matches!(
            mapper.map_point(na::Point2::new(1.0, 2.0)),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            mapper.map_bbox(&BBox::ltrb(0.0, 0.0, 1.0, 1.0)),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(mapper.map_many(&[]), Err(Error::NotInitialized)));
    }

    #[test]
    fn corners_reproject_to_pitch_corners() {
        let mapper = mapper();
        let out = mapper
            .map_many(&[
                na::Point2::new(100.0, 200.0),
                na::Point2::new(1800.0, 220.0),
                na::Point2::new(150.0, 900.0),
                na::Point2::new(1750.0, 880.0),
            ])
            .unwrap();

        let expected = [(0.0, 0.0), (105.0, 0.0), (0.0, 68.0), (105.0, 68.0)];
        assert_eq!(out.len(), expected.len());
        for (p, (x, y)) in out.iter().zip(expected) {
            assert_abs_diff_eq!(p.x, x, epsilon = 1e-6);
            assert_abs_diff_eq!(p.y, y, epsilon = 1e-6);
        }
    }

    #[test]
    fn map_many_preserves_order_and_length() {
        let mapper = mapper();
        let pts: Vec<_> = (0..7)
            .map(|i| na::Point2::new(200.0 + 100.0 * i as f64, 500.0))
            .collect();

        let batch = mapper.map_many(&pts).unwrap();
        for (p, q) in pts.iter().zip(&batch) {
            assert_eq!(mapper.map_point(*p).unwrap(), *q);
        }
    }

    #[test]
    fn map_bboxes_uses_anchor_rule() {
        let mapper = mapper();
        let boxes = [
            BBox::ltrb(900.0, 400.0, 940.0, 520.0),
            BBox::ltrb(300.0, 600.0, 330.0, 700.0),
        ];

        let mapped = mapper.map_bboxes(&boxes).unwrap();
        assert_eq!(mapped[0], mapper.map_point(na::Point2::new(920.0, 520.0)).unwrap());
        assert_eq!(mapped[1], mapper.map_point(na::Point2::new(315.0, 700.0)).unwrap());
    }

    proptest! {
        #[test]
        fn bbox_equals_bottom_center_point(
            x1 in 0.0f64..1900.0,
            y1 in 0.0f64..1000.0,
            w in 1.0f64..200.0,
            h in 1.0f64..300.0,
        ) {
            let mapper = mapper();
            let bbox = BBox::ltrb(x1, y1, x1 + w, y1 + h);
            let anchor = na::Point2::new((x1 + (x1 + w)) / 2.0, y1 + h);

            prop_assert_eq!(
                mapper.map_bbox(&bbox).unwrap(),
                mapper.map_point(anchor).unwrap()
            );
        }
    }
}
