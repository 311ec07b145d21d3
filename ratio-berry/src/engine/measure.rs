use crate::config::RatioConfig;
use crate::data::ChannelStack;
use crate::report::MeasurementRecord;
use crate::stats::{EmptyRegionError, RegionStats};
use crate::Region;

/// 单个区域的测量结果.
#[derive(Debug)]
pub(crate) enum Measurement {
    /// 面积在范围内.
    Accepted(MeasurementRecord),

    /// 通道 1 的标定面积超出范围.
    Rejected(f64),

    /// 区域在平面内没有像素.
    Empty(EmptyRegionError),
}

/// 测量一个区域. 区域的切片编号必须已经过检查.
///
/// 先统计通道 1 并按其标定面积过滤, 被接受时再统计通道 2.
pub(crate) fn measure_region(
    config: &RatioConfig,
    ch1: &ChannelStack,
    ch2: &ChannelStack,
    region: &Region,
) -> Measurement {
    let z = region.slice_number() - 1;
    let stats = RegionStats::new(config.mode);

    let s1 = match stats.compute(&ch1.slice_at(z), region) {
        Ok(s) => s,
        Err(e) => return Measurement::Empty(e),
    };
    if !config.accepts(s1.area) {
        return Measurement::Rejected(s1.area);
    }
    match stats.compute(&ch2.slice_at(z), region) {
        Ok(s2) => Measurement::Accepted(MeasurementRecord::from_stats(region, &s1, &s2)),
        Err(e) => Measurement::Empty(e),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::prelude::*;

        /// 并行测量一组区域, 结果顺序与 `regions` 一致.
        pub(crate) fn measure_all(
            config: &RatioConfig,
            ch1: &ChannelStack,
            ch2: &ChannelStack,
            regions: &[&Region],
        ) -> Vec<Measurement> {
            regions
                .par_iter()
                .map(|r| measure_region(config, ch1, ch2, r))
                .collect()
        }
    } else {
        /// 顺序测量一组区域.
        pub(crate) fn measure_all(
            config: &RatioConfig,
            ch1: &ChannelStack,
            ch2: &ChannelStack,
            regions: &[&Region],
        ) -> Vec<Measurement> {
            regions
                .iter()
                .map(|r| measure_region(config, ch1, ch2, r))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn channels() -> (ChannelStack, ChannelStack) {
        (
            ChannelStack::from_plane(Array2::from_elem((4, 4), 8.0)),
            ChannelStack::from_plane(Array2::from_elem((4, 4), 2.0)),
        )
    }

    #[test]
    fn test_measure_accept_and_reject() {
        let (ch1, ch2) = channels();
        let config = RatioConfig {
            min_object_size: 2,
            max_object_size: 3,
            ..Default::default()
        };
        let small = Region::from_positions("s", Some(1), &[(0, 0)]);
        let fit = Region::from_positions("f", Some(1), &[(1, 1), (1, 2)]);

        assert!(matches!(
            measure_region(&config, &ch1, &ch2, &small),
            Measurement::Rejected(a) if a == 1.0
        ));
        let Measurement::Accepted(rec) = measure_region(&config, &ch1, &ch2, &fit) else {
            panic!("region should be accepted");
        };
        assert_eq!(rec.mean.ratio, 4.0);
        assert_eq!(rec.label, "f");
    }

    #[test]
    fn test_measure_all_keeps_order() {
        let (ch1, ch2) = channels();
        let config = RatioConfig {
            min_object_size: 0,
            ..Default::default()
        };
        let regions: Vec<_> = (0..4)
            .map(|i| Region::from_positions(i.to_string(), None, &[(i, i)]))
            .collect();
        let refs: Vec<_> = regions.iter().collect();
        let labels: Vec<_> = measure_all(&config, &ch1, &ch2, &refs)
            .into_iter()
            .map(|m| match m {
                Measurement::Accepted(rec) => rec.label,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(labels, ["0", "1", "2", "3"]);
    }

    #[test]
    fn test_measure_empty() {
        let (ch1, ch2) = channels();
        let region = Region::from_positions("e", None, &[]);
        assert!(matches!(
            measure_region(&RatioConfig::default(), &ch1, &ch2, &region),
            Measurement::Empty(_)
        ));
    }
}
