//! 感兴趣区域 (blob) 的描述.

use crate::consts::DEFAULT_SLICE_NUMBER;
use crate::data::slice::RasterIter;
use crate::Idx2d;
use ndarray::Array2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 平面上的轴对齐矩形, 以 (高, 宽) 规则表示.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Rect {
    /// 左上角像素索引.
    pub origin: Idx2d,

    /// 矩形大小 (高, 宽).
    pub shape: Idx2d,
}

impl Rect {
    /// 直接初始化.
    #[inline]
    pub const fn new(origin: Idx2d, shape: Idx2d) -> Self {
        Self { origin, shape }
    }

    /// 包围给定所有像素的最小矩形. 像素集为空时返回 `None`.
    pub fn bounding<'a, I>(positions: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Idx2d>,
    {
        let mut it = positions.into_iter();
        let &(h0, w0) = it.next()?;
        let (mut min_h, mut min_w, mut max_h, mut max_w) = (h0, w0, h0, w0);
        for &(h, w) in it {
            min_h = min_h.min(h);
            min_w = min_w.min(w);
            max_h = max_h.max(h);
            max_w = max_w.max(w);
        }
        Some(Self::new(
            (min_h, min_w),
            (max_h - min_h + 1, max_w - min_w + 1),
        ))
    }

    /// 矩形的中心像素 (向下取整).
    #[inline]
    pub fn center(&self) -> Idx2d {
        let ((h0, w0), (h, w)) = (self.origin, self.shape);
        (h0 + h / 2, w0 + w / 2)
    }

    /// 矩形是否完全位于 `shape` 大小的平面之内?
    #[inline]
    pub fn fits(&self, (plane_h, plane_w): Idx2d) -> bool {
        let ((h0, w0), (h, w)) = (self.origin, self.shape);
        h0.checked_add(h).is_some_and(|end| end <= plane_h)
            && w0.checked_add(w).is_some_and(|end| end <= plane_w)
    }
}

/// 提取器给出的一个区域.
///
/// `mask` 覆盖 `bounds` 矩形, `true` 的位置属于该区域. 区域在一次运行中只被消费一次.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    label: String,
    slice: Option<usize>,
    bounds: Rect,
    mask: Array2<bool>,
    area: usize,
}

impl Region {
    /// 以矩形和其上的布尔掩膜构建区域.
    ///
    /// `slice` 从 1 开始计数. 当 `mask` 的形状与 `bounds.shape` 不一致时 panic.
    pub fn new(label: impl Into<String>, slice: Option<usize>, bounds: Rect, mask: Array2<bool>) -> Self {
        assert_eq!(mask.dim(), bounds.shape, "区域掩膜与包围盒大小不一致");
        let area = mask.iter().filter(|b| **b).count();
        Self {
            label: label.into(),
            slice,
            bounds,
            mask,
            area,
        }
    }

    /// 从像素索引集合构建区域. 包围盒取所有像素的最小外接矩形.
    ///
    /// 像素集为空时, 区域的包围盒为空矩形, 面积为 0.
    pub fn from_positions(label: impl Into<String>, slice: Option<usize>, positions: &[Idx2d]) -> Self {
        let Some(bounds) = Rect::bounding(positions) else {
            return Self::new(label, slice, Rect::default(), Array2::default((0, 0)));
        };
        let (h0, w0) = bounds.origin;
        let mut mask = Array2::from_elem(bounds.shape, false);
        for &(h, w) in positions {
            mask[(h - h0, w - w0)] = true;
        }
        Self::new(label, slice, bounds, mask)
    }

    /// 区域标签, 在一次运行中唯一.
    #[inline]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 提取器给出的切片编号 (从 1 开始计数), 可能缺失.
    #[inline]
    pub fn slice(&self) -> Option<usize> {
        self.slice
    }

    /// 区域所属切片编号 (从 1 开始计数). 缺失时归属到默认切片.
    #[inline]
    pub fn slice_number(&self) -> usize {
        self.slice.unwrap_or(DEFAULT_SLICE_NUMBER)
    }

    /// 包围盒.
    #[inline]
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// 包围盒上的布尔掩膜.
    #[inline]
    pub fn mask(&self) -> &Array2<bool> {
        &self.mask
    }

    /// 像素个数.
    #[inline]
    pub fn area(&self) -> usize {
        self.area
    }

    /// 区域是否不含任何像素?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.area == 0
    }

    /// 以行优先规则迭代区域内所有像素的绝对索引.
    pub fn positions(&self) -> impl Iterator<Item = Idx2d> + '_ {
        let (h0, w0) = self.bounds.origin;
        RasterIter::within(self.bounds.origin, self.bounds.shape)
            .filter(move |&(h, w)| self.mask[(h - h0, w - w0)])
    }
}

impl Default for Rect {
    fn default() -> Self {
        Self::new((0, 0), (0, 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_bounding() {
        let pos = [(3, 4), (1, 6), (2, 2)];
        let rect = Rect::bounding(&pos).unwrap();
        assert_eq!(rect, Rect::new((1, 2), (3, 5)));
        assert_eq!(rect.center(), (2, 4));
        assert!(rect.fits((4, 7)));
        assert!(!rect.fits((4, 6)));
        assert!(Rect::bounding(&[]).is_none());
    }

    #[test]
    fn test_region_from_positions() {
        let pos = vec![(1, 1), (1, 2), (2, 2)];
        let region = Region::from_positions("a", Some(2), &pos);
        assert_eq!(region.area(), 3);
        assert_eq!(region.bounds(), Rect::new((1, 1), (2, 2)));
        assert_eq!(region.positions().collect::<Vec<_>>(), pos);
        assert_eq!(region.slice_number(), 2);
    }

    #[test]
    fn test_region_default_slice() {
        let region = Region::from_positions("b", None, &[(0, 0)]);
        assert_eq!(region.slice_number(), DEFAULT_SLICE_NUMBER);
    }

    #[test]
    fn test_empty_region() {
        let region = Region::from_positions("c", None, &[]);
        assert!(region.is_empty());
        assert_eq!(region.positions().count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_region_mask_shape_mismatch() {
        Region::new("d", None, Rect::new((0, 0), (2, 2)), Array2::from_elem((1, 2), true));
    }
}
