use std::fmt;
use std::ops::{Index, IndexMut};
use std::sync::Arc;

use ndarray::{Array2, Array3, ArrayView, ArrayViewMut, Axis, Ix3};
use num::ToPrimitive;

use crate::consts::gray::*;
use crate::{Idx2d, Idx3d};

mod ratio_image;
pub mod region;
pub mod slice;

pub use ratio_image::RatioImage;
pub use region::{Rect, Region};
pub use slice::{ChannelSlice, ChannelSliceMut, MaskSlice};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 图像栈的共用属性和部分通用操作.
///
/// 所有图像栈均按照 (z, H, W) 模式组织, 其中 z 为切片方向.
pub trait StackAttr {
    /// 获取数据形状大小 (z, H, W).
    fn shape(&self) -> Idx3d;

    /// 获取数据水平切片形状大小.
    #[inline]
    fn slice_shape(&self) -> Idx2d {
        let (_, h, w) = self.shape();
        (h, w)
    }

    /// 获取切片个数.
    #[inline]
    fn len_z(&self) -> usize {
        self.shape().0
    }

    /// 获取数据像素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }
}

/// 把 `Array3` 的形状转换为 `Idx3d`.
#[inline]
fn shape_of<T>(data: &Array3<T>) -> Idx3d {
    let &[z, h, w] = data.shape() else {
        unreachable!()
    };
    (z, h, w)
}

/// 像素值的强度标定函数, 把原始数字值映射为标定值.
///
/// 默认为恒等映射, 此时标定均值与未标定均值相同.
#[derive(Clone, Default)]
pub enum Calibration {
    /// 恒等映射.
    #[default]
    Identity,

    /// `offset + slope * raw`.
    Linear {
        /// 截距.
        offset: f64,
        /// 斜率.
        slope: f64,
    },

    /// 任意用户给定的映射. 该函数必须是确定性的.
    Custom(Arc<dyn Fn(f64) -> f64 + Send + Sync>),
}

impl Calibration {
    /// 求原始值 `raw` 的标定值.
    #[inline]
    pub fn eval(&self, raw: f64) -> f64 {
        match self {
            Calibration::Identity => raw,
            Calibration::Linear { offset, slope } => offset + slope * raw,
            Calibration::Custom(f) => f(raw),
        }
    }

    /// 是否为恒等映射.
    #[inline]
    pub fn is_identity(&self) -> bool {
        matches!(self, Calibration::Identity)
    }
}

impl fmt::Debug for Calibration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Calibration::Identity => f.write_str("Identity"),
            Calibration::Linear { offset, slope } => f
                .debug_struct("Linear")
                .field("offset", offset)
                .field("slope", slope)
                .finish(),
            Calibration::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// 单个像素的空间尺寸 (宽, 高). 面积与质心坐标均以该尺寸为单位标定.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PixelSize {
    width: f64,
    height: f64,
}

impl PixelSize {
    /// 构建像素尺寸.
    ///
    /// `width` 和 `height` 必须为有限正数, 否则返回 `None`.
    pub fn new(width: f64, height: f64) -> Option<Self> {
        let valid = |v: f64| v.is_finite() && v > 0.0;
        (valid(width) && valid(height)).then_some(Self { width, height })
    }

    /// 未标定的像素, 宽高均为 1.
    #[inline]
    pub const fn unit() -> Self {
        Self {
            width: 1.0,
            height: 1.0,
        }
    }

    /// 像素宽 (自然图像的水平方向).
    #[inline]
    pub fn width(&self) -> f64 {
        self.width
    }

    /// 像素高 (自然图像的垂直方向).
    #[inline]
    pub fn height(&self) -> f64 {
        self.height
    }

    /// 单个像素的实际面积.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

impl Default for PixelSize {
    fn default() -> Self {
        Self::unit()
    }
}

/// 单通道强度图像栈. 像素值以 `f32` 保存.
#[derive(Debug, Clone)]
pub struct ChannelStack {
    data: Array3<f32>,
    calibration: Calibration,
    pixel: PixelSize,
}

impl StackAttr for ChannelStack {
    #[inline]
    fn shape(&self) -> Idx3d {
        shape_of(&self.data)
    }
}

impl Index<Idx3d> for ChannelStack {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for ChannelStack {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl ChannelStack {
    /// 直接以 (z, H, W) 格式的数据创建图像栈. 标定为恒等映射, 像素尺寸为 1.
    #[inline]
    pub fn new(data: Array3<f32>) -> Self {
        Self {
            data,
            calibration: Calibration::default(),
            pixel: PixelSize::default(),
        }
    }

    /// 以单张 (H, W) 平面创建只有一个切片的图像栈.
    #[inline]
    pub fn from_plane(plane: Array2<f32>) -> Self {
        Self::new(plane.insert_axis(Axis(0)))
    }

    /// 从任意数值类型 (如 8/16 位整型) 的 (z, H, W) 数据创建图像栈.
    ///
    /// 无法用 `f32` 表示的值会被记为 `NaN`.
    pub fn from_samples<T: ToPrimitive>(data: &Array3<T>) -> Self {
        Self::new(data.map(|v| v.to_f32().unwrap_or(f32::NAN)))
    }

    /// 设置强度标定.
    #[inline]
    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }

    /// 设置像素空间尺寸.
    #[inline]
    pub fn with_pixel_size(mut self, pixel: PixelSize) -> Self {
        self.pixel = pixel;
        self
    }

    /// 获取强度标定.
    #[inline]
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// 获取像素空间尺寸.
    #[inline]
    pub fn pixel_size(&self) -> PixelSize {
        self.pixel
    }

    /// 获取第 `z_index` 层切片视图 (从 0 开始计数).
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> ChannelSlice<'_> {
        ChannelSlice::new(
            self.data.index_axis(Axis(0), z_index),
            &self.calibration,
            self.pixel,
        )
    }

    /// 获取第 `z_index` 层可变切片视图 (从 0 开始计数).
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at_mut(&mut self, z_index: usize) -> ChannelSliceMut<'_> {
        ChannelSliceMut::new(self.data.index_axis_mut(Axis(0), z_index))
    }

    /// 获取能按升序迭代不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = ChannelSlice> {
        let (calibration, pixel) = (&self.calibration, self.pixel);
        self.data
            .axis_iter(Axis(0))
            .map(move |v| ChannelSlice::new(v, calibration, pixel))
    }

    /// 获取能按升序迭代可变切片的迭代器.
    #[inline]
    pub fn slice_iter_mut(&mut self) -> impl ExactSizeIterator<Item = ChannelSliceMut> {
        self.data.axis_iter_mut(Axis(0)).map(ChannelSliceMut::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, f32, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, f32, Ix3> {
        self.data.view_mut()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array3<f32> {
        self.data
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl ChannelStack {
    /// 借助 `rayon`, 并行地对每个可变切片实施 `op` 操作.
    /// 该操作会同时携带 z 方向索引信息. 遇到第一个错误时返回该错误.
    pub fn par_try_for_each_indexed_slice_mut<F, E>(&mut self, op: F) -> Result<(), E>
    where
        F: Fn(usize, ChannelSliceMut) -> Result<(), E> + Sync + Send,
        E: Send,
    {
        self.data_mut()
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .enumerate()
            .try_for_each(|(i, v)| op(i, ChannelSliceMut::new(v)))
    }
}

/// 掩膜图像栈. 像素值以 `u8` 保存, `0` 为背景.
///
/// 二值掩膜中任何非零像素都是前景; 标签掩膜中每个非零值代表一种标签.
#[derive(Debug, Clone)]
pub struct MaskStack {
    data: Array3<u8>,
}

impl StackAttr for MaskStack {
    #[inline]
    fn shape(&self) -> Idx3d {
        shape_of(&self.data)
    }
}

impl Index<Idx3d> for MaskStack {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl MaskStack {
    /// 直接以 (z, H, W) 格式的数据创建掩膜栈.
    #[inline]
    pub fn new(data: Array3<u8>) -> Self {
        Self { data }
    }

    /// 以单张 (H, W) 平面创建只有一个切片的掩膜栈.
    #[inline]
    pub fn from_plane(plane: Array2<u8>) -> Self {
        Self::new(plane.insert_axis(Axis(0)))
    }

    /// 从任意数值类型的 (z, H, W) 数据创建掩膜栈.
    ///
    /// 超出 `u8` 表示范围的正值会被饱和为 `u8::MAX`, 负值和无效值为背景.
    pub fn from_samples<T: ToPrimitive>(data: &Array3<T>) -> Self {
        Self::new(data.map(|v| match v.to_f64() {
            Some(f) if f >= u8::MAX as f64 => u8::MAX,
            Some(f) if f > 0.0 => f as u8,
            _ => MASK_BACKGROUND,
        }))
    }

    /// 获取第 `z_index` 层切片视图 (从 0 开始计数).
    ///
    /// 当 `z_index` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, z_index: usize) -> MaskSlice<'_> {
        MaskSlice::new(self.data.index_axis(Axis(0), z_index))
    }

    /// 获取能按升序迭代不可变切片的迭代器.
    #[inline]
    pub fn slice_iter(&self) -> impl ExactSizeIterator<Item = MaskSlice> {
        self.data.axis_iter(Axis(0)).map(MaskSlice::new)
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }

    /// 获取前景像素个数.
    #[inline]
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|p| is_foreground(**p)).count()
    }
}
