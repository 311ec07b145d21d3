use super::{BackgroundError, BackgroundSubtractor};
use crate::data::ChannelSliceMut;
use crate::Idx2d;
use ndarray::{Array2, ArrayView2};

/// 球形结构元素. 偏移量 `(dh, dw)` 处的高度为 `sqrt(r^2 - dh^2 - dw^2)`.
struct BallKernel {
    offsets: Vec<(isize, isize, f64)>,
}

impl BallKernel {
    fn new(radius: f64) -> Self {
        let r2 = radius * radius;
        let reach = radius.floor() as isize;
        let mut offsets = Vec::new();
        for dh in -reach..=reach {
            for dw in -reach..=reach {
                let d2 = (dh * dh + dw * dw) as f64;
                if d2 <= r2 {
                    offsets.push((dh, dw, (r2 - d2).sqrt()));
                }
            }
        }
        Self { offsets }
    }

    /// 在平面内的邻居及其高度. 越界的邻居被跳过.
    fn around<'a>(
        &'a self,
        (h, w): Idx2d,
        (h_len, w_len): Idx2d,
    ) -> impl Iterator<Item = (Idx2d, f64)> + 'a {
        self.offsets.iter().filter_map(move |&(dh, dw, z)| {
            let nh = h.checked_add_signed(dh).filter(|&v| v < h_len)?;
            let nw = w.checked_add_signed(dw).filter(|&v| v < w_len)?;
            Some(((nh, nw), z))
        })
    }
}

/// 滚球背景扣除.
///
/// 背景是以球形结构元素对平面做灰度开运算的结果. 半径较大时先以块最小值缩小平面,
/// 开运算后再双线性插值放大回原大小. 扣除后的像素值不小于 0.
#[derive(Debug, Copy, Clone, Default)]
pub struct RollingBall;

impl RollingBall {
    /// 半径对应的缩小倍率.
    #[inline]
    fn shrink_factor(radius: u32) -> usize {
        match radius {
            0..=10 => 1,
            11..=30 => 2,
            31..=100 => 4,
            _ => 8,
        }
    }

    /// 估计 `plane` 的背景.
    pub fn background(&self, plane: ArrayView2<f32>, radius: u32) -> Array2<f64> {
        let factor = Self::shrink_factor(radius);
        let small = shrink(plane, factor);
        let ball = BallKernel::new((radius as f64 / factor as f64).max(1.0));
        let opened = dilate(&erode(&small, &ball), &ball);
        enlarge(&opened, factor, plane.dim())
    }
}

impl BackgroundSubtractor for RollingBall {
    fn subtract(&self, plane: &mut ChannelSliceMut, radius: u32) -> Result<(), BackgroundError> {
        if radius == 0 {
            return Err(BackgroundError::ZeroRadius);
        }
        if plane.size() == 0 {
            return Ok(());
        }
        let background = self.background(plane.data(), radius);
        plane
            .data_mut()
            .zip_mut_with(&background, |v, &bg| *v = (*v as f64 - bg).max(0.0) as f32);
        Ok(())
    }
}

/// 以 `factor * factor` 块的最小值缩小平面.
fn shrink(plane: ArrayView2<f32>, factor: usize) -> Array2<f64> {
    let (h_len, w_len) = plane.dim();
    let shape = (h_len.div_ceil(factor), w_len.div_ceil(factor));
    let mut small = Array2::from_elem(shape, f64::INFINITY);
    for ((h, w), &v) in plane.indexed_iter() {
        let cell = &mut small[(h / factor, w / factor)];
        *cell = cell.min(v as f64);
    }
    small
}

/// 灰度腐蚀: `min(f(p + q) - z(q))`.
fn erode(data: &Array2<f64>, ball: &BallKernel) -> Array2<f64> {
    let dim = data.dim();
    Array2::from_shape_fn(dim, |pos| {
        ball.around(pos, dim)
            .map(|(n, z)| data[n] - z)
            .fold(f64::INFINITY, f64::min)
    })
}

/// 灰度膨胀: `max(g(p - q) + z(q))`. 球关于原点对称.
fn dilate(data: &Array2<f64>, ball: &BallKernel) -> Array2<f64> {
    let dim = data.dim();
    Array2::from_shape_fn(dim, |pos| {
        ball.around(pos, dim)
            .map(|(n, z)| data[n] + z)
            .fold(f64::NEG_INFINITY, f64::max)
    })
}

/// 双线性插值放大回 `shape` 大小. 超出缩小平面的采样点取边缘值.
fn enlarge(small: &Array2<f64>, factor: usize, shape: Idx2d) -> Array2<f64> {
    if factor == 1 {
        return small.clone();
    }
    let (sh, sw) = small.dim();
    let scale = factor as f64;
    let sample = |y: f64, x: f64| {
        let y = y.clamp(0.0, (sh - 1) as f64);
        let x = x.clamp(0.0, (sw - 1) as f64);
        let (y0, x0) = (y.floor() as usize, x.floor() as usize);
        let (y1, x1) = ((y0 + 1).min(sh - 1), (x0 + 1).min(sw - 1));
        let (fy, fx) = (y - y0 as f64, x - x0 as f64);

        let top = small[(y0, x0)] + fx * (small[(y0, x1)] - small[(y0, x0)]);
        let bottom = small[(y1, x0)] + fx * (small[(y1, x1)] - small[(y1, x0)]);
        top + fy * (bottom - top)
    };
    Array2::from_shape_fn(shape, |(h, w)| {
        sample(
            (h as f64 + 0.5) / scale - 0.5,
            (w as f64 + 0.5) / scale - 0.5,
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ChannelStack;
    use ndarray::Array2;

    #[test]
    fn test_flat_plane_vanishes() {
        let mut ch = ChannelStack::from_plane(Array2::from_elem((64, 64), 30.0));
        RollingBall.subtract(&mut ch.slice_at_mut(0), 40).unwrap();
        assert!(ch.data().iter().all(|v| v.abs() < 1e-3));
    }

    #[test]
    fn test_spike_survives() {
        let mut plane = Array2::from_elem((21, 21), 10.0);
        plane[(10, 10)] = 50.0;
        let mut ch = ChannelStack::from_plane(plane);
        RollingBall.subtract(&mut ch.slice_at_mut(0), 5).unwrap();

        let spike = ch[(0, 10, 10)];
        assert!(spike > 39.0 && spike <= 40.0, "spike = {spike}");
        for ((_, h, w), &v) in ch.data().indexed_iter() {
            if (h, w) != (10, 10) {
                assert!(v.abs() < 1e-3, "({h}, {w}) = {v}");
            }
        }
    }

    #[test]
    fn test_never_negative() {
        let plane = Array2::from_shape_fn((24, 24), |(h, w)| ((h * 7 + w * 13) % 17) as f32);
        let mut ch = ChannelStack::from_plane(plane);
        RollingBall.subtract(&mut ch.slice_at_mut(0), 12).unwrap();
        assert!(ch.data().iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn test_zero_radius_and_empty_plane() {
        let mut ch = ChannelStack::from_plane(Array2::zeros((2, 2)));
        assert_eq!(
            RollingBall.subtract(&mut ch.slice_at_mut(0), 0),
            Err(BackgroundError::ZeroRadius)
        );

        let mut empty = ChannelStack::from_plane(Array2::zeros((0, 3)));
        assert!(RollingBall.subtract(&mut empty.slice_at_mut(0), 5).is_ok());
    }

    #[test]
    fn test_shrink_factor() {
        assert_eq!(RollingBall::shrink_factor(10), 1);
        assert_eq!(RollingBall::shrink_factor(11), 2);
        assert_eq!(RollingBall::shrink_factor(100), 4);
        assert_eq!(RollingBall::shrink_factor(101), 8);
    }
}
