#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 对双通道荧光图像中的斑点 (blob) 逐个测量强度统计量与通道比值,
//! 并合成比值热图.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 数据流
//!
//! 通道栈 + 掩膜栈 -> 背景扣除 (可选, 逐通道) -> 区域提取 (逐切片)
//! -> 区域统计 (两个通道) -> 比值 -> 比值图像填充 + 测量记录 -> 结果接收者.
//!
//! # 注意
//!
//! 1. 所有图像栈按照 (z, H, W) 组织, 二维索引一律为 (高, 宽).
//!   切片编号对外从 1 开始计数, 内部索引从 0 开始.
//! 2. 比值遵循 IEEE 754 除法, 除以 0 得到 `inf` 或 `NaN`, 不会 panic.
//! 3. 核心库只通过 `log` 门面输出日志, 不会安装任何 logger.
//!
//! # 开发计划
//!
//! ### 区域统计 ✅
//!
//! 面积、标定均值、未标定均值、众数、最大值、几何质心.
//! 众数支持精确值与等宽分箱两种策略.
//!
//! 实现位于 `ratio-berry/src/stats`.
//!
//! ### 滚球背景扣除 ✅
//!
//! 球形结构元素灰度开运算, 大半径时缩小计算后插值放大.
//!
//! 实现位于 `ratio-berry/src/background`.
//!
//! ### 连通域提取 ✅
//!
//! 4-/8-相邻, 二值/标签掩膜, 可选排除边缘区域.
//!
//! 实现位于 `ratio-berry/src/extract`.
//!
//! ### 比值引擎 ✅
//!
//! 状态机, 两通道并行预处理, 切片内并行测量, 协作式取消.
//!
//! 实现位于 `ratio-berry/src/engine`.
//!
//! ### 结果表格 ✅
//!
//! CSV 输出, 非有限值按 `NaN`/`Infinity` 书写.
//!
//! 实现位于 `ratio-berry/src/report`.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private
//! API 提供文档.

/// 二维索引 (高, 宽).
pub type Idx2d = (usize, usize);

/// 三维索引 (z, 高, 宽).
pub type Idx3d = (usize, usize, usize);

type Area2d = Vec<Idx2d>;

/// 图像栈、切片、区域与比值图像.
pub mod data;

pub use data::{
    Calibration, ChannelSlice, ChannelSliceMut, ChannelStack, MaskSlice, MaskStack, PixelSize,
    RatioImage, Rect, Region, StackAttr,
};

pub mod background;
pub mod config;
pub mod consts;
pub mod engine;
mod error;
pub mod extract;
pub mod report;
pub mod stats;

pub use config::{ModePolicy, RatioConfig};
pub use engine::{CancelToken, EngineState, RatioEngine};
pub use error::{RatioError, RatioResult};

pub mod prelude;
