//! 区域统计.
//!
//! 在单个通道平面上, 对区域掩膜覆盖的像素求面积、均值、众数、最大值与几何质心.

mod mode;

use crate::config::ModePolicy;
use crate::data::{ChannelSlice, Region};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 区域在平面内没有任何像素.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("region `{label}` covers no pixel of the plane")]
pub struct EmptyRegionError {
    /// 区域标签.
    pub label: String,
}

/// 单个 (区域, 通道) 的统计结果.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelStatistics {
    /// 参与统计的像素个数.
    pub pixel_count: usize,

    /// 标定面积, 即像素个数乘以单个像素面积.
    pub area: f64,

    /// 标定均值.
    pub mean: f64,

    /// 原始像素值均值. 平面未标定时与 `mean` 相同.
    pub uncalibrated_mean: f64,

    /// 标定众数.
    pub mode: f64,

    /// 标定最大值.
    pub max: f64,

    /// 质心横坐标 (标定单位).
    pub centroid_x: f64,

    /// 质心纵坐标 (标定单位).
    pub centroid_y: f64,
}

impl ChannelStatistics {
    /// 积分强度, 即面积乘以均值.
    #[inline]
    pub fn integral(&self) -> f64 {
        self.area * self.mean
    }
}

/// 区域统计器.
#[derive(Debug, Copy, Clone, Default)]
pub struct RegionStats {
    mode: ModePolicy,
}

impl RegionStats {
    /// 以给定众数策略初始化.
    #[inline]
    pub fn new(mode: ModePolicy) -> Self {
        Self { mode }
    }

    /// 统计 `region` 在 `plane` 上覆盖的像素. 超出平面的区域像素被忽略.
    ///
    /// 质心以像素中心为准 (`+0.5`), 并按像素尺寸换算.
    pub fn compute(
        &self,
        plane: &ChannelSlice,
        region: &Region,
    ) -> Result<ChannelStatistics, EmptyRegionError> {
        let calibration = plane.calibration();
        let mut values = Vec::with_capacity(region.area());
        let (mut raw_sum, mut sum) = (0.0, 0.0);
        let (mut h_sum, mut w_sum) = (0.0, 0.0);
        let mut max = f64::NEG_INFINITY;

        for pos @ (h, w) in region.positions() {
            let Some(&raw) = plane.get(pos) else {
                continue;
            };
            let raw = raw as f64;
            let v = calibration.eval(raw);
            raw_sum += raw;
            sum += v;
            max = max.max(v);
            h_sum += h as f64;
            w_sum += w as f64;
            values.push(v);
        }

        let empty = || EmptyRegionError {
            label: region.label().to_string(),
        };
        let pixel_count = values.len();
        if pixel_count == 0 {
            return Err(empty());
        }
        let mode = mode::mode_of(&values, self.mode).ok_or_else(empty)?;

        let n = pixel_count as f64;
        let pixel = plane.pixel_size();
        Ok(ChannelStatistics {
            pixel_count,
            area: n * pixel.area(),
            mean: sum / n,
            uncalibrated_mean: raw_sum / n,
            mode,
            max,
            centroid_x: (w_sum / n + 0.5) * pixel.width(),
            centroid_y: (h_sum / n + 0.5) * pixel.height(),
        })
    }
}
