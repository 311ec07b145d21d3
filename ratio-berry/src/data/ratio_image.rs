use crate::consts::RATIO_BACKGROUND;
use crate::data::{shape_of, Region, StackAttr};
use crate::Idx3d;
use ndarray::{Array3, ArrayView2, Axis};

/// 比值图像. 每个输入切片对应一个 `f32` 平面.
///
/// 初始时全部像素为 [`RATIO_BACKGROUND`], 每个被接受的区域以其均值比值填充.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioImage {
    data: Array3<f32>,
}

impl StackAttr for RatioImage {
    #[inline]
    fn shape(&self) -> Idx3d {
        shape_of(&self.data)
    }
}

impl RatioImage {
    /// 创建 (z, H, W) 大小的背景图像.
    pub fn background(shape: Idx3d) -> Self {
        Self {
            data: Array3::from_elem(shape, RATIO_BACKGROUND),
        }
    }

    /// 把 `value` 写入第 `z_index` 个平面 (从 0 开始计数) 中区域覆盖的所有像素.
    ///
    /// 区域必须位于平面内, 否则 panic.
    pub fn fill_region(&mut self, z_index: usize, region: &Region, value: f32) {
        let mut plane = self.data.index_axis_mut(Axis(0), z_index);
        for pos in region.positions() {
            plane[pos] = value;
        }
    }

    /// 平面个数.
    #[inline]
    pub fn plane_count(&self) -> usize {
        self.len_z()
    }

    /// 第 `z_index` 个平面 (从 0 开始计数).
    #[inline]
    pub fn plane(&self, z_index: usize) -> ArrayView2<f32> {
        self.data.index_axis(Axis(0), z_index)
    }

    /// 按升序迭代所有平面.
    #[inline]
    pub fn planes(&self) -> impl ExactSizeIterator<Item = ArrayView2<f32>> {
        self.data.axis_iter(Axis(0))
    }

    /// 获得底层 (z, H, W) 数据.
    #[inline]
    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array3<f32> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_region() {
        let mut img = RatioImage::background((2, 3, 3));
        let region = Region::from_positions("r", Some(2), &[(0, 0), (1, 1)]);
        img.fill_region(1, &region, 1.5);

        assert_eq!(img.plane_count(), 2);
        assert!(img.plane(0).iter().all(|&v| v == RATIO_BACKGROUND));
        assert_eq!(img.plane(1)[(0, 0)], 1.5);
        assert_eq!(img.plane(1)[(1, 1)], 1.5);
        assert_eq!(img.plane(1)[(0, 1)], RATIO_BACKGROUND);
    }

    #[test]
    fn test_fill_nan() {
        let mut img = RatioImage::background((1, 1, 2));
        img.fill_region(0, &Region::from_positions("n", None, &[(0, 1)]), f32::NAN);
        assert!(img.plane(0)[(0, 1)].is_nan());
        assert_eq!(img.plane(0)[(0, 0)], RATIO_BACKGROUND);
    }
}
