//! 运行配置.

use crate::consts::*;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 区域众数 (mode) 的计算策略.
///
/// 浮点像素的众数需要明确的量化规则; 两种策略下平局均取较小值.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ModePolicy {
    /// 按精确值统计直方图.
    #[default]
    Exact,

    /// 在 `[min, max]` 上划分为给定个数的等宽 bin, 众数取出现最多的 bin 的下边界.
    Binned(usize),
}

/// 比值测量配置. `Default` 与交互对话框的默认值一致.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RatioConfig {
    /// 背景扣除窗口 (滚球) 半径, 单位为像素. 必须为正.
    pub bg_window_size: u32,

    /// 最小对象面积 (标定单位, 闭区间).
    pub min_object_size: usize,

    /// 最大对象面积 (标定单位, 闭区间). `usize::MAX` 表示无上限.
    pub max_object_size: usize,

    /// 是否对通道 1 扣除背景.
    pub subtract_bg_ch1: bool,

    /// 是否对通道 2 扣除背景.
    pub subtract_bg_ch2: bool,

    /// 众数计算策略.
    pub mode: ModePolicy,
}

impl Default for RatioConfig {
    fn default() -> Self {
        Self {
            bg_window_size: DEFAULT_BG_WINDOW_SIZE,
            min_object_size: DEFAULT_MIN_OBJECT_SIZE,
            max_object_size: DEFAULT_MAX_OBJECT_SIZE,
            subtract_bg_ch1: true,
            subtract_bg_ch2: true,
            mode: ModePolicy::Exact,
        }
    }
}

/// 非法配置.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// 背景窗口为 0.
    #[error("background window size must be positive")]
    ZeroWindow,

    /// 最大面积小于最小面积.
    #[error("max object size {max} is smaller than min object size {min}")]
    InvertedBounds {
        /// 最小面积.
        min: usize,
        /// 最大面积.
        max: usize,
    },

    /// 分箱众数的 bin 个数为 0.
    #[error("binned mode needs at least one bin")]
    ZeroModeBins,
}

/// 以像素个数表示的粗略面积范围 (闭区间), 供区域提取器预先过滤.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AreaBounds {
    /// 最小像素个数.
    pub min: usize,
    /// 最大像素个数.
    pub max: usize,
}

impl AreaBounds {
    /// 不做任何过滤的范围.
    pub const UNBOUNDED: Self = Self {
        min: 0,
        max: usize::MAX,
    };

    /// 像素个数是否落在范围内?
    #[inline]
    pub fn contains(&self, pixel_count: usize) -> bool {
        (self.min..=self.max).contains(&pixel_count)
    }
}

impl RatioConfig {
    /// 检查配置是否合法.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bg_window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.max_object_size < self.min_object_size {
            return Err(ConfigError::InvertedBounds {
                min: self.min_object_size,
                max: self.max_object_size,
            });
        }
        if self.mode == ModePolicy::Binned(0) {
            return Err(ConfigError::ZeroModeBins);
        }
        Ok(())
    }

    /// 标定面积是否被接受 (闭区间 `[min_object_size, max_object_size]`)?
    ///
    /// `NaN` 永远不被接受.
    #[inline]
    pub fn accepts(&self, area: f64) -> bool {
        let max_ok = self.max_object_size == usize::MAX || area <= self.max_object_size as f64;
        area >= self.min_object_size as f64 && max_ok
    }

    /// 把标定面积范围换算为像素个数范围, `pixel_area` 为单个像素的标定面积.
    ///
    /// 换算向外取整, 只会比标定范围更宽, 最终判定仍以 [`RatioConfig::accepts`] 为准.
    pub fn area_bounds(&self, pixel_area: f64) -> AreaBounds {
        if !(pixel_area.is_finite() && pixel_area > 0.0) {
            return AreaBounds::UNBOUNDED;
        }
        let min = (self.min_object_size as f64 / pixel_area).floor() as usize;
        let max = if self.max_object_size == usize::MAX {
            usize::MAX
        } else {
            // `as` 转换在溢出时饱和.
            (self.max_object_size as f64 / pixel_area).ceil() as usize
        };
        AreaBounds { min, max }
    }
}
