//! 比值测量引擎.
//!
//! 一次运行依次经过以下状态:
//!
//! `Ready -> Validating -> Preprocessing -> Segmenting -> Measuring -> Finalizing -> Done`
//!
//! 任一状态出错时进入 `Failed`. `Done` 与 `Failed` 均为终态, 每个引擎只能运行一次.

mod cancel;
mod measure;

pub use cancel::CancelToken;

use self::measure::{measure_all, Measurement};
use crate::background::{subtract_stack, BackgroundSubtractor, RollingBall};
use crate::config::RatioConfig;
use crate::data::{ChannelStack, MaskStack, RatioImage, StackAttr};
use crate::error::{RatioError, RatioResult};
use crate::extract::{ConnectedComponents, ExtractError, ParticleExtractor};
use crate::report::{RatioOutput, ReportSink};
use crate::Region;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;

/// 引擎状态.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineState {
    /// 尚未运行.
    Ready,

    /// 检查输入形状与配置.
    Validating,

    /// 背景扣除.
    Preprocessing,

    /// 逐切片提取区域.
    Segmenting,

    /// 已处理 `index` 个区域, 共 `total` 个.
    Measuring {
        /// 已处理的区域个数.
        index: usize,
        /// 区域总数.
        total: usize,
    },

    /// 组装并交付输出.
    Finalizing,

    /// 成功结束.
    Done,

    /// 失败结束, 附带原因.
    Failed(String),
}

impl EngineState {
    /// 是否为终态?
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measuring { index, total } => write!(f, "Measuring({index} of {total})"),
            Self::Failed(reason) => write!(f, "Failed({reason})"),
            other => fmt::Debug::fmt(other, f),
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::join;
    } else {
        /// 顺序执行两个任务.
        #[inline]
        fn join<A, B, RA, RB>(a: A, b: B) -> (RA, RB)
        where
            A: FnOnce() -> RA,
            B: FnOnce() -> RB,
        {
            (a(), b())
        }
    }
}

/// 比值测量引擎.
///
/// 默认使用 [`RollingBall`] 扣除背景, 使用 [`ConnectedComponents`] 提取区域.
///
/// # 示例
///
/// ```
/// use ratio_berry::prelude::*;
/// use ndarray::Array2;
///
/// let mut mask = Array2::zeros((4, 4));
/// for h in 1..3 {
///     for w in 1..3 {
///         mask[(h, w)] = 255;
///     }
/// }
/// let mut ch1 = ChannelStack::from_plane(Array2::from_elem((4, 4), 10.0));
/// let mut ch2 = ChannelStack::from_plane(Array2::from_elem((4, 4), 5.0));
/// let mask = MaskStack::from_plane(mask);
///
/// let config = RatioConfig {
///     min_object_size: 1,
///     max_object_size: 100,
///     subtract_bg_ch1: false,
///     subtract_bg_ch2: false,
///     ..Default::default()
/// };
/// let output = RatioEngine::new(config).run(&mut ch1, &mut ch2, &mask).unwrap();
/// assert_eq!(output.records.len(), 1);
/// assert_eq!(output.records[0].mean.ratio, 2.0);
/// ```
pub struct RatioEngine<'a> {
    config: RatioConfig,
    extractor: Box<dyn ParticleExtractor + 'a>,
    background: Box<dyn BackgroundSubtractor + 'a>,
    cancel: CancelToken,
    state: EngineState,
}

impl<'a> RatioEngine<'a> {
    /// 以给定配置和默认协作者初始化.
    pub fn new(config: RatioConfig) -> Self {
        Self {
            config,
            extractor: Box::new(ConnectedComponents::default()),
            background: Box::new(RollingBall),
            cancel: CancelToken::new(),
            state: EngineState::Ready,
        }
    }

    /// 替换区域提取器.
    pub fn with_extractor(mut self, extractor: impl ParticleExtractor + 'a) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    /// 替换背景扣除器.
    pub fn with_background(mut self, background: impl BackgroundSubtractor + 'a) -> Self {
        self.background = Box::new(background);
        self
    }

    /// 使用外部的取消标记.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 获取取消标记的一份克隆.
    #[inline]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// 配置.
    #[inline]
    pub fn config(&self) -> &RatioConfig {
        &self.config
    }

    /// 当前状态.
    #[inline]
    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// 运行并返回输出.
    ///
    /// 开启背景扣除的通道会被就地修改.
    pub fn run(
        &mut self,
        ch1: &mut ChannelStack,
        ch2: &mut ChannelStack,
        mask: &MaskStack,
    ) -> RatioResult<RatioOutput> {
        self.execute(ch1, ch2, mask, Ok)
    }

    /// 运行并把输出交付给 `sink`.
    pub fn run_into<S>(
        &mut self,
        ch1: &mut ChannelStack,
        ch2: &mut ChannelStack,
        mask: &MaskStack,
        sink: &mut S,
    ) -> RatioResult<()>
    where
        S: ReportSink + ?Sized,
    {
        self.execute(ch1, ch2, mask, |output| {
            sink.consume(output).map_err(RatioError::Delivery)
        })
    }

    fn execute<T, F>(
        &mut self,
        ch1: &mut ChannelStack,
        ch2: &mut ChannelStack,
        mask: &MaskStack,
        deliver: F,
    ) -> RatioResult<T>
    where
        F: FnOnce(RatioOutput) -> RatioResult<T>,
    {
        if self.state != EngineState::Ready {
            return Err(RatioError::AlreadyRun);
        }
        let ans = self.process(ch1, ch2, mask).and_then(deliver);
        match &ans {
            Ok(_) => self.transition(EngineState::Done),
            Err(e) => self.transition(EngineState::Failed(e.to_string())),
        }
        ans
    }

    fn transition(&mut self, next: EngineState) {
        log::debug!("ratio engine: {} -> {}", self.state, next);
        self.state = next;
    }

    fn check_cancelled(&self) -> RatioResult<()> {
        if self.cancel.is_cancelled() {
            Err(RatioError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// 从 `Validating` 运行到 `Finalizing`.
    fn process(
        &mut self,
        ch1: &mut ChannelStack,
        ch2: &mut ChannelStack,
        mask: &MaskStack,
    ) -> RatioResult<RatioOutput> {
        self.transition(EngineState::Validating);
        self.validate(ch1, ch2, mask)?;

        self.transition(EngineState::Preprocessing);
        self.check_cancelled()?;
        self.preprocess(ch1, ch2)?;

        self.transition(EngineState::Segmenting);
        let regions = self.segment(mask, ch1.pixel_size().area())?;

        let mut image = RatioImage::background(mask.shape());
        let mut records = Vec::new();
        let (mut rejected, mut empty) = (0, 0);
        let total = regions.len();
        let mut index = 0;

        let groups = regions.iter().group_by(|r| r.slice_number());
        for (slice, group) in &groups {
            self.transition(EngineState::Measuring { index, total });
            self.check_cancelled()?;

            let group: Vec<&Region> = group.collect();
            let measured = measure_all(&self.config, ch1, ch2, &group);
            for (region, m) in group.iter().zip(measured) {
                match m {
                    Measurement::Accepted(rec) => {
                        if !rec.mean.is_finite() {
                            log::debug!("region `{}`: mean ratio is {}", rec.label, rec.mean.ratio);
                        }
                        image.fill_region(slice - 1, region, rec.mean.ratio as f32);
                        records.push(rec);
                    }
                    Measurement::Rejected(area) => {
                        log::debug!("region `{}`: area {area} out of range", region.label());
                        rejected += 1;
                    }
                    Measurement::Empty(e) => {
                        log::debug!("{e}, skipped");
                        empty += 1;
                    }
                }
            }
            index += group.len();
        }

        self.transition(EngineState::Finalizing);
        log::info!(
            "{} slice(s), {total} region(s): {} measured, {rejected} out of range, {empty} empty",
            mask.len_z(),
            records.len(),
        );
        Ok(RatioOutput { image, records })
    }

    fn validate(&self, ch1: &ChannelStack, ch2: &ChannelStack, mask: &MaskStack) -> RatioResult<()> {
        let (s1, s2, sm) = (ch1.shape(), ch2.shape(), mask.shape());
        if s1 != s2 || s1 != sm {
            return Err(RatioError::DimensionMismatch {
                ch1: s1,
                ch2: s2,
                mask: sm,
            });
        }
        self.config.validate()?;
        Ok(())
    }

    /// 两个通道的背景扣除并行进行.
    fn preprocess(&self, ch1: &mut ChannelStack, ch2: &mut ChannelStack) -> RatioResult<()> {
        let radius = self.config.bg_window_size;
        let (enabled1, enabled2) = (self.config.subtract_bg_ch1, self.config.subtract_bg_ch2);
        let background = self.background.as_ref();
        let job = |channel: u8, enabled: bool, stack: &mut ChannelStack| {
            if !enabled {
                return Ok(());
            }
            subtract_stack(background, stack, radius)
                .map_err(|source| RatioError::Background { channel, source })
        };

        let (r1, r2) = join(|| job(1, enabled1, ch1), || job(2, enabled2, ch2));
        r1.and(r2)
    }

    /// 按切片升序提取区域, 并检查切片编号、包围盒与标签唯一性.
    fn segment(&mut self, mask: &MaskStack, pixel_area: f64) -> RatioResult<Vec<Region>> {
        let bounds = self.config.area_bounds(pixel_area);
        let len = mask.len_z();
        let shape = mask.slice_shape();
        let mut labels = HashSet::new();
        let mut ans = Vec::new();

        for z in 0..len {
            self.check_cancelled()?;
            let slice = z + 1;
            let wrap = |source| RatioError::Extraction { slice, source };

            let regions = self
                .extractor
                .extract(&mask.slice_at(z), slice, bounds)
                .map_err(wrap)?;
            for region in regions {
                let label = region.label().to_string();
                if !(1..=len).contains(&region.slice_number()) {
                    return Err(wrap(ExtractError::SliceOutOfRange {
                        label,
                        slice: region.slice_number(),
                        len,
                    }));
                }
                if !region.bounds().fits(shape) {
                    return Err(wrap(ExtractError::RegionOutOfBounds {
                        label,
                        bounds: region.bounds(),
                        shape,
                    }));
                }
                if !labels.insert(label.clone()) {
                    return Err(wrap(ExtractError::DuplicateLabel(label)));
                }
                ans.push(region);
            }
            log::debug!("slice {slice}: {} region(s) so far", ans.len());
        }
        Ok(ans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::background::BackgroundError;
    use crate::config::AreaBounds;
    use crate::data::{ChannelSliceMut, MaskSlice, PixelSize, Rect};
    use crate::report::CollectSink;
    use ndarray::{array, s, Array2, Array3};
    use std::cell::Cell;

    fn no_bg(min: usize, max: usize) -> RatioConfig {
        RatioConfig {
            min_object_size: min,
            max_object_size: max,
            subtract_bg_ch1: false,
            subtract_bg_ch2: false,
            ..Default::default()
        }
    }

    fn square_mask() -> MaskStack {
        MaskStack::from_plane(array![
            [0, 0, 0, 0],
            [0, 255, 255, 0],
            [0, 255, 255, 0],
            [0, 0, 0, 0],
        ])
    }

    fn flat(shape: (usize, usize, usize), v: f32) -> ChannelStack {
        ChannelStack::new(Array3::from_elem(shape, v))
    }

    #[test]
    fn test_end_to_end_4x4() {
        let _ = simple_logger::SimpleLogger::new()
            .with_level(log::LevelFilter::Debug)
            .init();
        let (mut ch1, mut ch2) = (flat((1, 4, 4), 10.0), flat((1, 4, 4), 5.0));
        let mut engine = RatioEngine::new(no_bg(1, 100));
        let output = engine.run(&mut ch1, &mut ch2, &square_mask()).unwrap();

        assert_eq!(engine.state(), &EngineState::Done);
        assert_eq!(output.records.len(), 1);
        let rec = &output.records[0];
        assert_eq!(rec.area, 4.0);
        assert_eq!(rec.mean.ch1, 10.0);
        assert_eq!(rec.mean.ch2, 5.0);
        for pair in [rec.mean, rec.mode, rec.max, rec.integral] {
            assert_eq!(pair.ratio, 2.0);
        }

        let plane = output.image.plane(0);
        for ((h, w), &v) in plane.indexed_iter() {
            let inside = (1..3).contains(&h) && (1..3).contains(&w);
            assert_eq!(v, if inside { 2.0 } else { 0.0 });
        }
    }

    #[test]
    fn test_dimension_mismatch() {
        let (mut ch1, mut ch2) = (flat((3, 4, 4), 1.0), flat((3, 4, 4), 1.0));
        let mask = MaskStack::new(Array3::zeros((2, 4, 4)));
        let mut engine = RatioEngine::new(no_bg(1, 100));
        let err = engine.run(&mut ch1, &mut ch2, &mask).unwrap_err();

        assert!(matches!(
            err,
            RatioError::DimensionMismatch {
                mask: (2, 4, 4),
                ..
            }
        ));
        assert!(matches!(engine.state(), EngineState::Failed(_)));
    }

    #[test]
    fn test_invalid_config() {
        let (mut ch1, mut ch2) = (flat((1, 2, 2), 1.0), flat((1, 2, 2), 1.0));
        let mask = MaskStack::new(Array3::zeros((1, 2, 2)));
        let mut engine = RatioEngine::new(no_bg(5, 1));
        let err = engine.run(&mut ch1, &mut ch2, &mask).unwrap_err();
        assert!(matches!(err, RatioError::InvalidConfig(_)));
    }

    #[test]
    fn test_plane_per_slice_without_regions() {
        let (mut ch1, mut ch2) = (flat((3, 5, 5), 1.0), flat((3, 5, 5), 1.0));
        let mask = MaskStack::new(Array3::zeros((3, 5, 5)));
        let output = RatioEngine::new(no_bg(0, 100))
            .run(&mut ch1, &mut ch2, &mask)
            .unwrap();

        assert_eq!(output.image.plane_count(), 3);
        assert!(output.records.is_empty());
        assert!(output.image.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_division_anomalies() {
        let mut mask = Array3::zeros((2, 4, 4));
        mask[(0, 1, 1)] = 1;
        mask[(1, 2, 2)] = 1;
        let mask = MaskStack::new(mask);
        let mut ch1 = flat((2, 4, 4), 3.0);
        ch1.data_mut()
            .index_axis_mut(ndarray::Axis(0), 1)
            .fill(0.0);
        let mut ch2 = flat((2, 4, 4), 0.0);

        let output = RatioEngine::new(no_bg(1, 100))
            .run(&mut ch1, &mut ch2, &mask)
            .unwrap();
        assert_eq!(output.records.len(), 2);
        assert_eq!(output.records[0].mean.ratio, f64::INFINITY);
        assert!(output.records[1].mean.ratio.is_nan());
        assert_eq!(output.image.plane(0)[(1, 1)], f32::INFINITY);
        assert!(output.image.plane(1)[(2, 2)].is_nan());
    }

    #[test]
    fn test_area_filter() {
        let mask = MaskStack::from_plane(array![
            [0, 0, 0, 0, 0, 0],
            [0, 1, 0, 1, 1, 0],
            [0, 0, 0, 1, 1, 0],
            [0, 0, 0, 0, 0, 0],
        ]);
        let (mut ch1, mut ch2) = (flat((1, 4, 6), 4.0), flat((1, 4, 6), 2.0));
        let output = RatioEngine::new(no_bg(2, 100))
            .run(&mut ch1, &mut ch2, &mask)
            .unwrap();

        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].area, 4.0);
        assert_eq!(output.image.plane(0)[(1, 1)], 0.0);
        assert_eq!(output.image.plane(0)[(1, 3)], 2.0);
    }

    #[test]
    fn test_calibrated_area_filter() {
        let pixel = PixelSize::new(2.0, 2.0).unwrap();
        let mut ch1 = flat((1, 4, 4), 1.0).with_pixel_size(pixel);
        let mut ch2 = flat((1, 4, 4), 1.0).with_pixel_size(pixel);

        // 4 个像素, 标定面积 16.
        let output = RatioEngine::new(no_bg(1, 10))
            .run(&mut ch1, &mut ch2, &square_mask())
            .unwrap();
        assert!(output.records.is_empty());

        let output = RatioEngine::new(no_bg(16, 16))
            .run(&mut ch1, &mut ch2, &square_mask())
            .unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.records[0].area, 16.0);
    }

    #[test]
    fn test_ordering_across_slices() {
        let mut mask = Array3::zeros((3, 6, 6));
        for (z, h, w) in [(0, 3, 3), (0, 1, 1), (2, 4, 2), (2, 1, 4), (1, 2, 2)] {
            mask[(z, h, w)] = 255;
        }
        let mask = MaskStack::new(mask);
        let (mut ch1, mut ch2) = (flat((3, 6, 6), 2.0), flat((3, 6, 6), 1.0));
        let output = RatioEngine::new(no_bg(1, 100))
            .run(&mut ch1, &mut ch2, &mask)
            .unwrap();

        let labels: Vec<_> = output.records.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "0001-0001-0001",
                "0001-0003-0003",
                "0002-0002-0002",
                "0003-0001-0004",
                "0003-0004-0002",
            ]
        );
        let slices: Vec<_> = output.records.iter().map(|r| r.slice).collect();
        assert_eq!(slices, [1, 1, 2, 3, 3]);
    }

    #[test]
    fn test_background_subtraction_in_place() {
        let (mut ch1, mut ch2) = (flat((1, 4, 4), 10.0), flat((1, 4, 4), 5.0));
        let config = RatioConfig {
            bg_window_size: 3,
            subtract_bg_ch1: true,
            ..no_bg(1, 100)
        };
        let output = RatioEngine::new(config)
            .run(&mut ch1, &mut ch2, &square_mask())
            .unwrap();

        assert!(ch1.data().iter().all(|v| v.abs() < 1e-4));
        assert!(ch2.data().iter().all(|&v| v == 5.0));
        assert!(output.records[0].mean.ratio.abs() < 1e-4);
    }

    struct Failing;

    impl BackgroundSubtractor for Failing {
        fn subtract(&self, _: &mut ChannelSliceMut, _: u32) -> Result<(), BackgroundError> {
            Err(BackgroundError::Other("unavailable".to_string()))
        }
    }

    #[test]
    fn test_background_failure() {
        let (mut ch1, mut ch2) = (flat((1, 4, 4), 1.0), flat((1, 4, 4), 1.0));
        let config = RatioConfig {
            subtract_bg_ch1: false,
            subtract_bg_ch2: true,
            ..Default::default()
        };
        let err = RatioEngine::new(config)
            .with_background(Failing)
            .run(&mut ch1, &mut ch2, &square_mask())
            .unwrap_err();
        assert!(matches!(err, RatioError::Background { channel: 2, .. }));
        assert!(err.is_preprocessing_failure());
    }

    /// 总是在第 1 个切片上给出一个固定区域.
    struct Fixed(Region);

    impl ParticleExtractor for Fixed {
        fn extract(
            &mut self,
            _: &MaskSlice,
            _: usize,
            _: AreaBounds,
        ) -> Result<Vec<Region>, ExtractError> {
            Ok(vec![self.0.clone()])
        }
    }

    #[test]
    fn test_untagged_region_goes_to_default_slice() {
        let (mut ch1, mut ch2) = (flat((1, 4, 4), 6.0), flat((1, 4, 4), 3.0));
        let region = Region::from_positions("free", None, &[(0, 0), (0, 1)]);
        let output = RatioEngine::new(no_bg(1, 100))
            .with_extractor(Fixed(region))
            .run(&mut ch1, &mut ch2, &square_mask())
            .unwrap();
        assert_eq!(output.records[0].slice, 1);
        assert_eq!(output.image.plane(0)[(0, 1)], 2.0);
    }

    #[test]
    fn test_extractor_contract_violations() {
        let mask = MaskStack::new(Array3::zeros((2, 4, 4)));
        let (mut ch1, mut ch2) = (flat((2, 4, 4), 1.0), flat((2, 4, 4), 1.0));

        // 每个切片都给出同一标签.
        let dup = Region::from_positions("same", Some(1), &[(0, 0)]);
        let err = RatioEngine::new(no_bg(1, 100))
            .with_extractor(Fixed(dup))
            .run(&mut ch1, &mut ch2, &mask)
            .unwrap_err();
        assert!(matches!(
            err,
            RatioError::Extraction {
                slice: 2,
                source: ExtractError::DuplicateLabel(_)
            }
        ));

        let far = Region::from_positions("far", Some(9), &[(0, 0)]);
        let err = RatioEngine::new(no_bg(1, 100))
            .with_extractor(Fixed(far))
            .run(&mut ch1, &mut ch2, &mask)
            .unwrap_err();
        assert!(matches!(
            err,
            RatioError::Extraction {
                source: ExtractError::SliceOutOfRange { slice: 9, len: 2, .. },
                ..
            }
        ));

        let big = Region::new("big", Some(1), Rect::new((2, 2), (3, 3)), Array2::from_elem((3, 3), true));
        let err = RatioEngine::new(no_bg(1, 100))
            .with_extractor(Fixed(big))
            .run(&mut ch1, &mut ch2, &mask)
            .unwrap_err();
        assert!(matches!(
            err,
            RatioError::Extraction {
                source: ExtractError::RegionOutOfBounds { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_single_use() {
        let (mut ch1, mut ch2) = (flat((1, 4, 4), 1.0), flat((1, 4, 4), 1.0));
        let mut engine = RatioEngine::new(no_bg(1, 100));
        engine.run(&mut ch1, &mut ch2, &square_mask()).unwrap();
        let err = engine.run(&mut ch1, &mut ch2, &square_mask()).unwrap_err();
        assert!(matches!(err, RatioError::AlreadyRun));
        assert_eq!(engine.state(), &EngineState::Done);
    }

    #[test]
    fn test_cancelled_before_run() {
        let (mut ch1, mut ch2) = (flat((1, 4, 4), 1.0), flat((1, 4, 4), 1.0));
        let mut engine = RatioEngine::new(no_bg(1, 100));
        engine.cancel_token().cancel();
        let err = engine.run(&mut ch1, &mut ch2, &square_mask()).unwrap_err();
        assert!(matches!(err, RatioError::Cancelled));
        assert!(engine.state().is_terminal());
    }

    #[test]
    fn test_run_into_sink() {
        let (mut ch1, mut ch2) = (flat((1, 4, 4), 10.0), flat((1, 4, 4), 5.0));
        let mut sink = CollectSink::new();
        RatioEngine::new(no_bg(1, 100))
            .run_into(&mut ch1, &mut ch2, &square_mask(), &mut sink)
            .unwrap();
        let output = sink.take().unwrap();
        assert_eq!(output.records.len(), 1);
        assert_eq!(output.image.plane(0)[(2, 2)], 2.0);
    }

    #[test]
    fn test_ring_region_covers_hole() {
        let mask = MaskStack::from_plane(array![
            [0, 0, 0, 0, 0],
            [0, 1, 1, 1, 0],
            [0, 1, 0, 1, 0],
            [0, 1, 1, 1, 0],
            [0, 0, 0, 0, 0],
        ]);
        let mut ch1 = flat((1, 5, 5), 10.0);
        ch1[(0, 2, 2)] = 100.0;
        let mut ch2 = flat((1, 5, 5), 5.0);
        let output = RatioEngine::new(no_bg(1, 100))
            .run(&mut ch1, &mut ch2, &mask)
            .unwrap();

        assert_eq!(output.records.len(), 1);
        let rec = &output.records[0];
        assert_eq!(rec.area, 9.0);
        assert_eq!(rec.mean.ch1, 20.0);
        assert_eq!(rec.mean.ratio, 4.0);
        assert_eq!(output.image.plane(0)[(2, 2)], 4.0);
        assert_eq!(output.image.plane(0)[(0, 0)], 0.0);
    }

    /// 在提取第 `on` 个切片时触发取消, 并记录调用次数.
    struct CancelOn<'a> {
        inner: ConnectedComponents,
        token: CancelToken,
        on: usize,
        calls: &'a Cell<usize>,
    }

    impl ParticleExtractor for CancelOn<'_> {
        fn extract(
            &mut self,
            plane: &MaskSlice,
            slice_number: usize,
            bounds: AreaBounds,
        ) -> Result<Vec<Region>, ExtractError> {
            self.calls.set(self.calls.get() + 1);
            if slice_number == self.on {
                self.token.cancel();
            }
            self.inner.extract(plane, slice_number, bounds)
        }
    }

    fn squares(len: usize) -> MaskStack {
        let mut mask = Array3::zeros((len, 4, 4));
        mask.slice_mut(s![.., 1..3, 1..3]).fill(255);
        MaskStack::new(mask)
    }

    fn run_cancelled_on(len: usize, on: usize) -> usize {
        let (mut ch1, mut ch2) = (flat((len, 4, 4), 2.0), flat((len, 4, 4), 1.0));
        let token = CancelToken::new();
        let calls = Cell::new(0);
        let mut sink = CollectSink::new();
        let mut engine = RatioEngine::new(no_bg(1, 100))
            .with_cancel_token(token.clone())
            .with_extractor(CancelOn {
                inner: ConnectedComponents::default(),
                token,
                on,
                calls: &calls,
            });

        let err = engine
            .run_into(&mut ch1, &mut ch2, &squares(len), &mut sink)
            .unwrap_err();
        assert!(matches!(err, RatioError::Cancelled));
        assert!(matches!(engine.state(), EngineState::Failed(_)));
        assert!(sink.take().is_none());
        calls.get()
    }

    #[test]
    fn test_cancelled_between_slices() {
        // 第 1 个切片提取后即停止, 后续切片不再提取.
        assert_eq!(run_cancelled_on(3, 1), 1);
    }

    #[test]
    fn test_cancelled_while_measuring() {
        // 所有切片均已提取, 在测量阶段停止.
        assert_eq!(run_cancelled_on(2, 2), 2);
    }
}
