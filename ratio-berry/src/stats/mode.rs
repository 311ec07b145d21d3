use crate::config::ModePolicy;
use itertools::{Itertools, MinMaxResult};
use ordered_float::OrderedFloat;
use std::collections::BTreeMap;

/// 按照 `policy` 求 `values` 的众数. `values` 为空时返回 `None`.
pub(super) fn mode_of(values: &[f64], policy: ModePolicy) -> Option<f64> {
    match policy {
        ModePolicy::Exact => exact_mode(values),
        ModePolicy::Binned(bins) => binned_mode(values, bins),
    }
}

/// 精确值直方图. 平局时取最小值.
fn exact_mode(values: &[f64]) -> Option<f64> {
    let mut histogram = BTreeMap::<OrderedFloat<f64>, usize>::new();
    for &v in values {
        *histogram.entry(OrderedFloat(v)).or_default() += 1;
    }

    // 升序遍历, 只在计数严格变大时替换.
    let mut best: Option<(f64, usize)> = None;
    for (v, count) in histogram {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((v.into_inner(), count));
        }
    }
    best.map(|(v, _)| v)
}

/// 等宽分箱直方图. 平局时取下标最小的 bin.
fn binned_mode(values: &[f64], bins: usize) -> Option<f64> {
    let (lo, hi) = match values.iter().copied().map(OrderedFloat).minmax() {
        MinMaxResult::NoElements => return None,
        MinMaxResult::OneElement(v) => return Some(v.into_inner()),
        MinMaxResult::MinMax(lo, hi) => (lo.into_inner(), hi.into_inner()),
    };
    if bins <= 1 || lo == hi || !(hi - lo).is_finite() {
        return Some(lo);
    }

    let width = (hi - lo) / bins as f64;
    let mut histogram = vec![0_usize; bins];
    for &v in values {
        let i = ((v - lo) / width) as usize;
        histogram[i.min(bins - 1)] += 1;
    }
    let (best, _) = histogram
        .iter()
        .enumerate()
        .fold((0, 0), |(bi, bc), (i, &c)| if c > bc { (i, c) } else { (bi, bc) });
    Some(lo + best as f64 * width)
}
