//! 顶层错误类型.

use crate::background::BackgroundError;
use crate::config::ConfigError;
use crate::extract::ExtractError;
use crate::report::SinkError;
use crate::Idx3d;
use thiserror::Error;

/// 比值测量运行失败. 任何该错误都意味着没有输出.
#[derive(Debug, Error)]
pub enum RatioError {
    /// 两个通道与掩膜的形状 (z, H, W) 不一致.
    #[error("dimension mismatch: ch1 {ch1:?}, ch2 {ch2:?}, mask {mask:?}")]
    DimensionMismatch {
        /// 通道 1 形状.
        ch1: Idx3d,
        /// 通道 2 形状.
        ch2: Idx3d,
        /// 掩膜形状.
        mask: Idx3d,
    },

    /// 配置不合法.
    #[error("invalid configuration")]
    InvalidConfig(#[from] ConfigError),

    /// 背景扣除失败.
    #[error("background subtraction failed on channel {channel}")]
    Background {
        /// 通道编号 (1 或 2).
        channel: u8,
        /// 底层错误.
        #[source]
        source: BackgroundError,
    },

    /// 区域提取失败.
    #[error("particle extraction failed on slice {slice}")]
    Extraction {
        /// 切片编号 (从 1 开始计数).
        slice: usize,
        /// 底层错误.
        #[source]
        source: ExtractError,
    },

    /// 运行被取消.
    #[error("run was cancelled")]
    Cancelled,

    /// 引擎只能运行一次.
    #[error("engine has already been run")]
    AlreadyRun,

    /// 结果交付失败.
    #[error("failed to deliver results")]
    Delivery(#[from] SinkError),
}

impl RatioError {
    /// 是否为预处理 (背景扣除或区域提取) 阶段的外部协作者失败?
    #[inline]
    pub fn is_preprocessing_failure(&self) -> bool {
        matches!(self, Self::Background { .. } | Self::Extraction { .. })
    }
}

/// 比值测量结果.
pub type RatioResult<T> = Result<T, RatioError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_source_chain() {
        let err = RatioError::Background {
            channel: 2,
            source: BackgroundError::ZeroRadius,
        };
        assert!(err.is_preprocessing_failure());
        assert_eq!(err.to_string(), "background subtraction failed on channel 2");
        assert!(err.source().is_some());

        let err: RatioError = ConfigError::ZeroWindow.into();
        assert!(matches!(err, RatioError::InvalidConfig(_)));
        assert!(!err.is_preprocessing_failure());
    }
}
