//! 区域 (粒子) 提取.
//!
//! 提取器逐切片地从掩膜平面中找出互不重叠的区域, 并按像素个数做粗略过滤.
//! 最终是否接受一个区域, 由引擎按通道 1 的标定面积判定.

mod components;

pub use components::{Connectivity, ConnectedComponents, ExtractOptions, MaskMode};

use crate::config::AreaBounds;
use crate::data::{MaskSlice, Rect};
use crate::{Idx2d, Region};
use thiserror::Error;

/// 区域提取失败.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 区域的切片编号超出图像栈范围.
    #[error("region `{label}` is tagged with slice {slice}, but the stack has {len} slice(s)")]
    SliceOutOfRange {
        /// 区域标签.
        label: String,
        /// 区域切片编号 (从 1 开始计数).
        slice: usize,
        /// 切片个数.
        len: usize,
    },

    /// 区域包围盒超出平面.
    #[error("region `{label}` with bounds {bounds:?} does not fit into a {shape:?} plane")]
    RegionOutOfBounds {
        /// 区域标签.
        label: String,
        /// 区域包围盒.
        bounds: Rect,
        /// 平面大小 (高, 宽).
        shape: Idx2d,
    },

    /// 同一次运行中出现了重复标签.
    #[error("region label `{0}` is not unique")]
    DuplicateLabel(String),

    /// 外部提取器自身的错误.
    #[error("{0}")]
    Other(String),
}

/// 区域提取器.
///
/// 在一次运行中, 引擎按切片升序对每个切片调用一次 [`ParticleExtractor::extract`].
/// 实现者需要保证:
///
/// 1. 返回的区域互不重叠, 且顺序即为下游处理顺序;
/// 2. 标签在整个运行中唯一;
/// 3. 区域携带所在切片编号 (从 1 开始计数).
pub trait ParticleExtractor {
    /// 从第 `slice_number` 个切片 (从 1 开始计数) 的掩膜平面中提取区域,
    /// 像素个数不在 `bounds` 内的区域不会被返回.
    fn extract(
        &mut self,
        plane: &MaskSlice,
        slice_number: usize,
        bounds: AreaBounds,
    ) -> Result<Vec<Region>, ExtractError>;
}

/// 获得 `(h, w)` 的 4-邻居索引. 不检查越界.
#[inline]
pub(crate) fn neighbour4((h, w): Idx2d) -> [Idx2d; 4] {
    [
        (h.wrapping_sub(1), w),
        (h.saturating_add(1), w),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
    ]
}

/// 获得 `(h, w)` 的 8-邻居索引. 不检查越界.
#[inline]
pub(crate) fn neighbour8((h, w): Idx2d) -> [Idx2d; 8] {
    [
        (h.wrapping_sub(1), w.wrapping_sub(1)),
        (h.wrapping_sub(1), w),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h.saturating_add(1), w),
        (h.saturating_add(1), w.saturating_add(1)),
    ]
}
