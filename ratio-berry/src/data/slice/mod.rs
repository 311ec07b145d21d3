//! 通道/掩膜切片对象的操作.

mod core;
mod iter;

pub use core::{ChannelSlice, ChannelSliceMut, MaskSlice};

pub(crate) use iter::RasterIter;
