use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug + Copy + PartialEq {}

/// Left-top-width-height format, contains left top corner and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltwh;
impl BBoxFormat for Ltwh {}

/// Left-top-right-bottom format, `(x1, y1, x2, y2)` in pixels
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

/// Pixel rectangle tagged with its coordinate layout.
///
/// Serializes as a bare `[f64; 4]`. Corners are not validated, `x1 < x2`
/// and `y1 < y2` are the producer's responsibility.
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq)]
#[serde(transparent, bound = "")]
pub struct BBox<F: BBoxFormat>([f64; 4], #[serde(skip)] PhantomData<F>);

impl<F: BBoxFormat> From<BBox<F>> for [f64; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl BBox<Ltwh> {
    #[inline]
    pub fn ltwh(left: f64, top: f64, width: f64, height: f64) -> Self {
        BBox([left, top, width, height], PhantomData)
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        BBox([x1, y1, x2, y2], PhantomData)
    }

    #[inline]
    pub fn as_ltwh(&self) -> BBox<Ltwh> {
        self.into()
    }

    #[inline(always)]
    pub fn left(&self) -> f64 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f64 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f64 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f64 {
        self.0[3]
    }

    /// Ground contact point of the subject: horizontal midpoint of the
    /// bottom edge, `((x1 + x2) / 2, y2)`.
    #[inline]
    pub fn anchor(&self) -> na::Point2<f64> {
        na::Point2::new((self.left() + self.right()) / 2.0, self.bottom())
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(cx: f64, cy: f64, width: f64, height: f64) -> Self {
        BBox([cx, cy, width, height], PhantomData)
    }

    #[inline(always)]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl<'a> From<&'a BBox<Ltwh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Ltwh>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] + v.0[0], v.0[3] + v.0[1]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Ltrb>> for BBox<Ltwh> {
    #[inline]
    fn from(v: &'a BBox<Ltrb>) -> Self {
        Self(
            [v.0[0], v.0[1], v.0[2] - v.0[0], v.0[3] - v.0[1]],
            PhantomData,
        )
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        let (hw, hh) = (v.0[2] / 2.0, v.0[3] / 2.0);

        Self(
            [v.0[0] - hw, v.0[1] - hh, v.0[0] + hw, v.0[1] + hh],
            PhantomData,
        )
    }
}
