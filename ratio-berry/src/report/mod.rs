//! 测量记录与结果交付.

mod table;

pub use table::ResultsTable;

use crate::data::RatioImage;
use crate::stats::ChannelStatistics;
use crate::Region;
use std::io;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 同一统计量在两个通道上的值及其比值 `ch1 / ch2`.
///
/// 比值遵循 IEEE 754 语义: 正数除以 0 为 `+inf`, `0 / 0` 为 `NaN`.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RatioPair {
    /// 通道 1 的值.
    pub ch1: f64,
    /// 通道 2 的值.
    pub ch2: f64,
    /// `ch1 / ch2`.
    pub ratio: f64,
}

impl RatioPair {
    /// 计算比值.
    #[inline]
    pub fn new(ch1: f64, ch2: f64) -> Self {
        Self {
            ch1,
            ch2,
            ratio: ch1 / ch2,
        }
    }

    /// 比值是否为有限值?
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.ratio.is_finite()
    }
}

/// 一个被接受区域的测量记录. 创建后不再修改.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MeasurementRecord {
    /// 区域标签.
    pub label: String,

    /// 区域所在切片 (从 1 开始计数).
    pub slice: usize,

    /// 质心横坐标 (通道 1).
    pub x_centroid: f64,

    /// 质心纵坐标 (通道 1).
    pub y_centroid: f64,

    /// 标定面积 (通道 1).
    pub area: f64,

    /// 均值.
    pub mean: RatioPair,

    /// 众数.
    pub mode: RatioPair,

    /// 最大值.
    pub max: RatioPair,

    /// 积分强度 (面积乘以均值).
    pub integral: RatioPair,
}

impl MeasurementRecord {
    /// 由区域在两个通道上的统计结果生成记录.
    pub fn from_stats(region: &Region, ch1: &ChannelStatistics, ch2: &ChannelStatistics) -> Self {
        Self {
            label: region.label().to_string(),
            slice: region.slice_number(),
            x_centroid: ch1.centroid_x,
            y_centroid: ch1.centroid_y,
            area: ch1.area,
            mean: RatioPair::new(ch1.mean, ch2.mean),
            mode: RatioPair::new(ch1.mode, ch2.mode),
            max: RatioPair::new(ch1.max, ch2.max),
            integral: RatioPair::new(ch1.integral(), ch2.integral()),
        }
    }
}

/// 一次运行的全部输出.
#[derive(Debug, Clone, PartialEq)]
pub struct RatioOutput {
    /// 比值图像.
    pub image: RatioImage,

    /// 按区域顺序排列的测量记录.
    pub records: Vec<MeasurementRecord>,
}

impl RatioOutput {
    /// 以表格形式查看记录.
    #[inline]
    pub fn table(&self) -> ResultsTable<'_> {
        ResultsTable::new(&self.records)
    }
}

/// 结果交付失败.
#[derive(Debug, Error)]
pub enum SinkError {
    /// 读写错误.
    #[error("i/o error")]
    Io(#[from] io::Error),

    /// 其它后端错误.
    #[error("report backend failed")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// 结果接收者. 每次运行成功后恰好被调用一次.
pub trait ReportSink {
    /// 接收比值图像与测量记录.
    fn consume(&mut self, output: RatioOutput) -> Result<(), SinkError>;
}

/// 把输出保存在内存中的接收者.
#[derive(Debug, Default)]
pub struct CollectSink {
    output: Option<RatioOutput>,
}

impl CollectSink {
    /// 初始化.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出已接收的输出.
    #[inline]
    pub fn take(&mut self) -> Option<RatioOutput> {
        self.output.take()
    }
}

impl ReportSink for CollectSink {
    fn consume(&mut self, output: RatioOutput) -> Result<(), SinkError> {
        self.output = Some(output);
        Ok(())
    }
}

/// 把结果表格以 CSV 写入任意 `io::Write`, 比值图像被丢弃.
#[derive(Debug)]
pub struct CsvSink<W> {
    writer: W,
}

impl<W: io::Write> CsvSink<W> {
    /// 初始化.
    #[inline]
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// 取回 writer.
    #[inline]
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> ReportSink for CsvSink<W> {
    fn consume(&mut self, output: RatioOutput) -> Result<(), SinkError> {
        output.table().write_csv(&mut self.writer)?;
        self.writer.flush()?;
        Ok(())
    }
}
