//! 比值图像预览着色.

use image::{Rgb, RgbImage};
use itertools::{Itertools, MinMaxResult};
use ndarray::ArrayView2;
use once_cell::sync::Lazy;
use ordered_float::OrderedFloat;
use thiserror::Error;

/// 可视化失败. 只影响预览, 不影响数值输出.
#[derive(Debug, Error)]
pub enum VisualizationError {
    /// 未知的 LUT 名.
    #[error("unknown lookup table `{0}`")]
    UnknownLut(String),

    /// 写入预览图像失败.
    #[error("failed to write preview")]
    Image(#[from] image::ImageError),
}

/// "fire" LUT 的控制点, 每个通道 32 个.
const FIRE_R: [u8; 32] = [
    0, 0, 1, 25, 49, 73, 98, 122, 146, 162, 173, 184, 195, 207, 217, 229, 240, 252, 255, 255, 255,
    255, 255, 255, 255, 255, 255, 255, 255, 255, 255, 255,
];
const FIRE_G: [u8; 32] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 14, 35, 57, 79, 101, 117, 133, 147, 161, 175, 190, 205,
    219, 234, 248, 255, 255, 255, 255,
];
const FIRE_B: [u8; 32] = [
    0, 61, 96, 130, 165, 192, 220, 227, 210, 181, 151, 122, 93, 64, 35, 5, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 35, 98, 160, 223, 255, 255, 255,
];

/// 把 32 个控制点线性插值为 256 色.
fn interpolate(points: &[u8; 32]) -> [u8; 256] {
    let scale = (points.len() - 1) as f64 / 255.0;
    let mut ans = [0; 256];
    for (i, v) in ans.iter_mut().enumerate() {
        let pos = i as f64 * scale;
        let lo = pos.floor() as usize;
        let hi = (lo + 1).min(points.len() - 1);
        let frac = pos - lo as f64;
        *v = (points[lo] as f64 * (1.0 - frac) + points[hi] as f64 * frac).round() as u8;
    }
    ans
}

static FIRE: Lazy<[Rgb<u8>; 256]> = Lazy::new(|| {
    let (r, g, b) = (
        interpolate(&FIRE_R),
        interpolate(&FIRE_G),
        interpolate(&FIRE_B),
    );
    std::array::from_fn(|i| Rgb([r[i], g[i], b[i]]))
});

/// 查找表.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Lut {
    /// 黑-红-黄-白.
    Fire,
    /// 灰度.
    Grays,
}

impl Lut {
    /// 按名字 (不区分大小写) 查找.
    pub fn from_name(name: &str) -> Result<Self, VisualizationError> {
        match name.to_ascii_lowercase().as_str() {
            "fire" => Ok(Self::Fire),
            "grays" | "gray" => Ok(Self::Grays),
            _ => Err(VisualizationError::UnknownLut(name.to_string())),
        }
    }

    /// 第 `index` 个颜色.
    #[inline]
    pub fn color(&self, index: u8) -> Rgb<u8> {
        match self {
            Self::Fire => FIRE[index as usize],
            Self::Grays => Rgb([index; 3]),
        }
    }

    /// 把平面的有限值线性映射到 `[0, 255]` 后着色.
    ///
    /// `NaN` 与 `-inf` 取第一个颜色, `+inf` 取最后一个颜色.
    pub fn colorize(&self, plane: ArrayView2<f32>) -> RgbImage {
        let (lo, hi) = match plane
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .map(OrderedFloat)
            .minmax()
        {
            MinMaxResult::NoElements => (0.0, 0.0),
            MinMaxResult::OneElement(v) => (v.0, v.0),
            MinMaxResult::MinMax(lo, hi) => (lo.0, hi.0),
        };
        let span = hi - lo;
        let index = |v: f32| -> u8 {
            match v {
                v if v.is_nan() || v == f32::NEG_INFINITY => 0,
                v if v == f32::INFINITY => u8::MAX,
                _ if span <= 0.0 => 0,
                v => ((v - lo) / span * 255.0).round().clamp(0.0, 255.0) as u8,
            }
        };

        let (h, w) = plane.dim();
        RgbImage::from_fn(w as u32, h as u32, |x, y| {
            self.color(index(plane[(y as usize, x as usize)]))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_fire_endpoints() {
        assert_eq!(Lut::Fire.color(0), Rgb([0, 0, 0]));
        assert_eq!(Lut::Fire.color(255), Rgb([255, 255, 255]));
        assert_eq!(Lut::Grays.color(17), Rgb([17, 17, 17]));
    }

    #[test]
    fn test_from_name() {
        assert_eq!(Lut::from_name("Fire").unwrap(), Lut::Fire);
        assert_eq!(Lut::from_name("grays").unwrap(), Lut::Grays);
        assert!(matches!(
            Lut::from_name("spectrum"),
            Err(VisualizationError::UnknownLut(n)) if n == "spectrum"
        ));
    }

    #[test]
    fn test_colorize() {
        let plane = array![[0.0, 1.0], [f32::NAN, f32::INFINITY]];
        let img = Lut::Grays.colorize(plane.view());
        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(1, 0), &Rgb([255, 255, 255]));
        assert_eq!(img.get_pixel(0, 1), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(1, 1), &Rgb([255, 255, 255]));
    }
}
