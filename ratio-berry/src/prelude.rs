//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx3d};

pub use crate::data::{
    Calibration, ChannelSlice, ChannelSliceMut, ChannelStack, MaskSlice, MaskStack, PixelSize,
    RatioImage, Rect, Region, StackAttr,
};

pub use crate::background::{BackgroundError, BackgroundSubtractor, RollingBall};
pub use crate::config::{AreaBounds, ConfigError, ModePolicy, RatioConfig};
pub use crate::engine::{CancelToken, EngineState, RatioEngine};
pub use crate::extract::{
    Connectivity, ConnectedComponents, ExtractError, ExtractOptions, MaskMode, ParticleExtractor,
};
pub use crate::report::{
    CollectSink, CsvSink, MeasurementRecord, RatioOutput, RatioPair, ReportSink, ResultsTable,
    SinkError,
};
pub use crate::stats::{ChannelStatistics, EmptyRegionError, RegionStats};
pub use crate::{RatioError, RatioResult};

pub use crate::consts::gray::{MASK_BACKGROUND, MASK_FOREGROUND};
pub use crate::consts::{DEFAULT_SLICE_NUMBER, RESULT_COLUMNS};
