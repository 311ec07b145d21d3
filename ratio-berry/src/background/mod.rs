//! 背景扣除.

mod rolling_ball;

pub use rolling_ball::RollingBall;

use crate::data::{ChannelSliceMut, ChannelStack};
use thiserror::Error;

/// 背景扣除失败.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackgroundError {
    /// 窗口半径为 0.
    #[error("background window radius must be positive")]
    ZeroRadius,

    /// 外部实现自身的错误.
    #[error("{0}")]
    Other(String),
}

/// 背景扣除器. 对同一输入必须给出确定的结果.
///
/// 同一个扣除器可能被多个线程同时使用.
pub trait BackgroundSubtractor: Send + Sync {
    /// 就地扣除平面 `plane` 的低频背景, `radius` 为窗口半径 (像素).
    fn subtract(&self, plane: &mut ChannelSliceMut, radius: u32) -> Result<(), BackgroundError>;
}

/// 对图像栈的每个切片扣除背景, 切片间并行.
#[cfg(feature = "rayon")]
pub fn subtract_stack<B>(
    subtractor: &B,
    stack: &mut ChannelStack,
    radius: u32,
) -> Result<(), BackgroundError>
where
    B: BackgroundSubtractor + ?Sized,
{
    stack.par_try_for_each_indexed_slice_mut(|_, mut plane| subtractor.subtract(&mut plane, radius))
}

/// 对图像栈的每个切片扣除背景.
#[cfg(not(feature = "rayon"))]
pub fn subtract_stack<B>(
    subtractor: &B,
    stack: &mut ChannelStack,
    radius: u32,
) -> Result<(), BackgroundError>
where
    B: BackgroundSubtractor + ?Sized,
{
    for mut plane in stack.slice_iter_mut() {
        subtractor.subtract(&mut plane, radius)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    struct Offset(f32);

    impl BackgroundSubtractor for Offset {
        fn subtract(&self, plane: &mut ChannelSliceMut, _: u32) -> Result<(), BackgroundError> {
            plane.iter_mut().for_each(|v| *v -= self.0);
            Ok(())
        }
    }

    struct Failing;

    impl BackgroundSubtractor for Failing {
        fn subtract(&self, _: &mut ChannelSliceMut, _: u32) -> Result<(), BackgroundError> {
            Err(BackgroundError::Other("boom".to_string()))
        }
    }

    #[test]
    fn test_subtract_stack_every_slice() {
        let mut stack = ChannelStack::new(Array3::from_elem((3, 2, 2), 5.0));
        subtract_stack(&Offset(2.0), &mut stack, 1).unwrap();
        assert!(stack.data().iter().all(|&v| v == 3.0));
    }

    #[test]
    fn test_subtract_stack_error() {
        let mut stack = ChannelStack::new(Array3::zeros((2, 2, 2)));
        let err = subtract_stack(&Failing, &mut stack, 1).unwrap_err();
        assert_eq!(err, BackgroundError::Other("boom".to_string()));
    }
}
