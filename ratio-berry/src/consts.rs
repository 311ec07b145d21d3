//! 通用常量.

/// 单通道掩膜像素值.
pub mod gray {
    /// 掩膜中背景的像素值. 其余任何值均被视为前景.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 二值掩膜中前景的常用像素值.
    pub const MASK_FOREGROUND: u8 = 255;

    /// 像素是否是掩膜背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }

    /// 像素是否是掩膜前景?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        !is_background(p)
    }
}

/// 默认背景扣除窗口 (滚球) 半径, 单位为像素.
pub const DEFAULT_BG_WINDOW_SIZE: u32 = 40;

/// 默认最小对象面积.
pub const DEFAULT_MIN_OBJECT_SIZE: usize = 10;

/// 默认最大对象面积 (无上限).
pub const DEFAULT_MAX_OBJECT_SIZE: usize = usize::MAX;

/// 当区域提取器没有给出区域所在切片时, 区域被归属到的切片编号 (从 1 开始计数).
pub const DEFAULT_SLICE_NUMBER: usize = 1;

/// 比值图像中未被任何区域覆盖的像素值.
pub const RATIO_BACKGROUND: f32 = 0.0;

/// 结果表格的列名, 按输出顺序排列.
pub const RESULT_COLUMNS: [&str; 16] = [
    "Label",
    "x centroid",
    "y centroid",
    "area",
    "mean(ch1)",
    "mean(ch2)",
    "mean(ch1)/mean(ch2)",
    "mode(ch1)",
    "mode(ch2)",
    "mode(ch1)/mode(ch2)",
    "max(ch1)",
    "max(ch2)",
    "max(ch1)/max(ch2)",
    "integral(ch1)",
    "integral(ch2)",
    "integral(ch1)/integral(ch2)",
];
