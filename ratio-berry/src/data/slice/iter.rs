use crate::Idx2d;

/// 矩形范围内的行优先索引迭代器.
///
/// 迭代从 `origin` 开始, 覆盖 `(h, w)` 大小的矩形. 虽然
///
/// ```
/// type Idx2d = (usize, usize);
///
/// fn raster_auto((h0, w0): Idx2d, (h, w): Idx2d) -> impl Iterator<Item = Idx2d> {
///     (h0..h0 + h).flat_map(move |first| (w0..w0 + w).map(move |second| (first, second)))
/// }
/// ```
///
/// 也能实现相同的功能, 但该迭代器对象占用的空间更大. 区域遍历处在测量的热路径上,
/// 因此保留手写版本.
#[derive(Debug, Clone)]
pub struct RasterIter {
    origin: Idx2d,
    cur_h: usize,
    cur_w: usize,
    h: usize,
    w: usize,
}

impl RasterIter {
    /// 覆盖从 `(0, 0)` 开始的整个 `shape` 平面.
    #[inline]
    pub fn new(shape: Idx2d) -> Self {
        Self::within((0, 0), shape)
    }

    /// 覆盖从 `origin` 开始的 `shape` 矩形.
    #[inline]
    pub fn within(origin: Idx2d, (h, w): Idx2d) -> Self {
        Self {
            origin,
            cur_h: 0,
            cur_w: 0,
            h,
            w,
        }
    }
}

impl Iterator for RasterIter {
    type Item = Idx2d;

    fn next(&mut self) -> Option<Self::Item> {
        if self.h == 0 || self.w == 0 || self.cur_h == self.h {
            return None;
        }
        let ret_pos = (self.origin.0 + self.cur_h, self.origin.1 + self.cur_w);
        if self.cur_w + 1 == self.w {
            self.cur_w = 0;
            self.cur_h += 1;
        } else {
            self.cur_w += 1;
        }
        Some(ret_pos)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = if self.h == 0 || self.w == 0 {
            0
        } else {
            (self.h - self.cur_h) * self.w - self.cur_w
        };
        (left, Some(left))
    }
}

impl ExactSizeIterator for RasterIter {}

#[cfg(test)]
mod completeness_tests {
    use super::RasterIter;
    use crate::Idx2d;

    fn raster_builtin((h0, w0): Idx2d, (h, w): Idx2d) -> impl Iterator<Item = Idx2d> {
        (h0..h0 + h).flat_map(move |first| (w0..w0 + w).map(move |second| (first, second)))
    }

    #[test]
    fn test_builtin_iter_size_larger() {
        use std::mem::size_of_val as sizeof;

        let tup = (1, 1);
        assert!(sizeof(&raster_builtin(tup, tup)) > sizeof(&RasterIter::within(tup, tup)));
    }

    #[test]
    fn test_raster_iter() {
        for origin in [(0, 0), (2, 5)] {
            for i in 0..=4 {
                for j in 0..=4 {
                    let tup = (i, j);
                    let it = RasterIter::within(origin, tup);
                    assert_eq!(it.len(), i * j);
                    assert!(Iterator::eq(raster_builtin(origin, tup), it));
                }
            }
        }
    }
}
