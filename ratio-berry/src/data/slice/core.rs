use super::RasterIter;
use crate::consts::gray::*;
use crate::data::{Calibration, PixelSize};
use crate::Idx2d;
use ndarray::iter::{Iter, IterMut};
use ndarray::{ArrayView2, ArrayViewMut2, Ix2};
use std::ops::{Index, IndexMut};

/// 不可变、借用的二维掩膜切片.
pub struct MaskSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::MaskStack`].
    data: ArrayView2<'a, u8>,
}

impl Index<Idx2d> for MaskSlice<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> MaskSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: ArrayView2<'a, u8>) -> Self {
        Self { data }
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, u8, Ix2> {
        self.data.iter()
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 图像的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 获得图像的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得图像的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 该图是否为全背景图?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().copied().all(is_background)
    }

    /// 统计前景像素总个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }

    /// 判断一个索引是否位于图像的边缘.
    #[inline]
    pub fn is_at_border(&self, (h, w): Idx2d) -> bool {
        h == 0
            || h.saturating_add(1) == self.height()
            || w == 0
            || w.saturating_add(1) == self.width()
    }

    /// 以行优先规则, 获取能迭代图像所有索引的迭代器.
    #[inline]
    pub fn pos_iter(&self) -> impl Iterator<Item = Idx2d> {
        RasterIter::new(self.shape())
    }

    /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &u8)> {
        self.data.indexed_iter()
    }
}

/// 不可变、借用的二维通道切片.
///
/// 除像素数据外, 还携带所属图像栈的强度标定与像素尺寸, 供区域统计使用.
pub struct ChannelSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::ChannelStack`].
    data: ArrayView2<'a, f32>,
    calibration: &'a Calibration,
    pixel: PixelSize,
}

impl Index<Idx2d> for ChannelSlice<'_> {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> ChannelSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(
        data: ArrayView2<'a, f32>,
        calibration: &'a Calibration,
        pixel: PixelSize,
    ) -> Self {
        Self {
            data,
            calibration,
            pixel,
        }
    }

    /// 获取强度标定.
    #[inline]
    pub fn calibration(&self) -> &Calibration {
        self.calibration
    }

    /// 获取像素空间尺寸.
    #[inline]
    pub fn pixel_size(&self) -> PixelSize {
        self.pixel
    }
}

/// 可变、借用的二维通道切片. 仅用于预处理阶段就地改写像素.
pub struct ChannelSliceMut<'a> {
    /// 底层数据的轻量级视图, 借用于 [`crate::ChannelStack`].
    data: ArrayViewMut2<'a, f32>,
}

impl<'a> ChannelSliceMut<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: ArrayViewMut2<'a, f32>) -> Self {
        Self { data }
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut2<f32> {
        self.data.view_mut()
    }

    /// 获取可以迭代并修改图像像素的迭代器.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, f32, Ix2> {
        self.data.iter_mut()
    }
}

impl Index<Idx2d> for ChannelSliceMut<'_> {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for ChannelSliceMut<'_> {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

/// 通道切片不可变方法集合.
macro_rules! impl_channel_slice_immut {
    ($life: lifetime, $slice: ty) => {
        /// 不可变方法集合.
        impl<$life> $slice {
            /// 获得数据的一份不可变 shallow copy.
            #[inline]
            pub fn data(&self) -> ArrayView2<f32> {
                self.data.view()
            }

            /// 获取可以迭代图像像素的迭代器.
            #[inline]
            pub fn iter(&self) -> Iter<'_, f32, Ix2> {
                self.data.iter()
            }

            /// 获取给定位置 (高, 宽) 的原始像素值. 越界时返回 `None`.
            #[inline]
            pub fn get(&self, pos: Idx2d) -> Option<&f32> {
                self.data.get(pos)
            }

            /// 图像的分辨率 (高, 宽).
            #[inline]
            pub fn shape(&self) -> Idx2d {
                let &[h, w] = self.data.shape() else {
                    unreachable!()
                };
                (h, w)
            }

            /// 图像的像素个数.
            #[inline]
            pub fn size(&self) -> usize {
                let (h, w) = self.shape();
                h * w
            }

            /// 以行优先规则, 获取能迭代图像所有 `(索引, 原始像素值)` 的迭代器.
            #[inline]
            pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &f32)> {
                self.data.indexed_iter()
            }
        }
    };
}

impl_channel_slice_immut!('a, ChannelSlice<'a>);
impl_channel_slice_immut!('a, ChannelSliceMut<'a>);
