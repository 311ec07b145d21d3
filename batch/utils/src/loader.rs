//! 输入数据加载器.
//!
//! 每个输入 (通道 1、通道 2、掩膜) 可以是一个 `.npy` 文件, 也可以是一个存放逐切片灰度图像
//! (`png`/`tif`) 的目录, 目录中的文件按文件名排序后依次作为切片.

use anyhow::{bail, ensure, Context};
use image::DynamicImage;
use ndarray::{Array2, Array3, ArrayView2, Axis};
use ndarray_npy::read_npy;
use ratio_berry::{ChannelStack, MaskStack};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// 通道 1 的文件名主干.
pub const CH1_STEM: &str = "ch1";

/// 通道 2 的文件名主干.
pub const CH2_STEM: &str = "ch2";

/// 掩膜的文件名主干.
pub const MASK_STEM: &str = "mask";

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 获取输入数据目录.
///
/// 1. 若环境变量 `$RATIO_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/ratio`.
pub fn data_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var("RATIO_DATA_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(["ratio"]),
    }
}

/// 在 `dir` 下查找名为 `stem` 的输入: 优先 `{stem}.npy`, 其次目录 `{stem}/`.
pub fn resolve_input(dir: &Path, stem: &str) -> anyhow::Result<PathBuf> {
    let npy = dir.join(format!("{stem}.npy"));
    if npy.is_file() {
        return Ok(npy);
    }
    let slices = dir.join(stem);
    if slices.is_dir() {
        return Ok(slices);
    }
    bail!("neither {} nor {} exists", npy.display(), slices.display())
}

/// 一次运行所需的全部输入.
pub struct InputSet {
    /// 通道 1.
    pub ch1: ChannelStack,
    /// 通道 2.
    pub ch2: ChannelStack,
    /// 掩膜.
    pub mask: MaskStack,
}

impl InputSet {
    /// 从目录 `dir` 加载 `ch1`、`ch2` 与 `mask`.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let ch1 = load_channel(resolve_input(dir, CH1_STEM)?)?;
        let ch2 = load_channel(resolve_input(dir, CH2_STEM)?)?;
        let mask = load_mask(resolve_input(dir, MASK_STEM)?)?;
        Ok(Self { ch1, ch2, mask })
    }
}

/// 依次尝试以给定元素类型与维度读取 npy 文件, 成功即返回.
macro_rules! try_read_npy {
    ($path: expr; $($ty: ty => $conv: expr),+ $(,)?) => {
        $(
            if let Ok(arr) = read_npy::<_, $ty>($path) {
                return Ok($conv(arr));
            }
        )+
    };
}

fn plane_to_stack<T>(plane: Array2<T>) -> Array3<T> {
    plane.insert_axis(Axis(0))
}

/// 加载通道图像栈. npy 支持 `f32`/`f64`/`u16`/`u8` 的二维或三维数组.
pub fn load_channel<P: AsRef<Path>>(path: P) -> anyhow::Result<ChannelStack> {
    let path = path.as_ref();
    if path.is_dir() {
        let data = read_slices(path, |img| {
            let img = img.into_luma16();
            let (w, h) = img.dimensions();
            Array2::from_shape_vec((h as usize, w as usize), img.into_raw())
        })?;
        return Ok(ChannelStack::from_samples(&data));
    }

    try_read_npy!(path;
        Array3<f32> => ChannelStack::new,
        Array2<f32> => ChannelStack::from_plane,
        Array3<f64> => |a: Array3<f64>| ChannelStack::from_samples(&a),
        Array2<f64> => |a: Array2<f64>| ChannelStack::from_samples(&plane_to_stack(a)),
        Array3<u16> => |a: Array3<u16>| ChannelStack::from_samples(&a),
        Array2<u16> => |a: Array2<u16>| ChannelStack::from_samples(&plane_to_stack(a)),
        Array3<u8> => |a: Array3<u8>| ChannelStack::from_samples(&a),
        Array2<u8> => |a: Array2<u8>| ChannelStack::from_samples(&plane_to_stack(a)),
    );
    bail!("unsupported channel array in {}", path.display())
}

/// 加载掩膜栈. npy 支持 `u8`/`u16`/`i32` 的二维或三维数组.
pub fn load_mask<P: AsRef<Path>>(path: P) -> anyhow::Result<MaskStack> {
    let path = path.as_ref();
    if path.is_dir() {
        let data = read_slices(path, |img| {
            let img = img.into_luma8();
            let (w, h) = img.dimensions();
            Array2::from_shape_vec((h as usize, w as usize), img.into_raw())
        })?;
        return Ok(MaskStack::new(data));
    }

    try_read_npy!(path;
        Array3<u8> => MaskStack::new,
        Array2<u8> => MaskStack::from_plane,
        Array3<u16> => |a: Array3<u16>| MaskStack::from_samples(&a),
        Array2<u16> => |a: Array2<u16>| MaskStack::from_samples(&plane_to_stack(a)),
        Array3<i32> => |a: Array3<i32>| MaskStack::from_samples(&a),
        Array2<i32> => |a: Array2<i32>| MaskStack::from_samples(&plane_to_stack(a)),
    );
    bail!("unsupported mask array in {}", path.display())
}

/// 按文件名排序列出目录下的切片图像.
fn slice_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("reading {}", dir.display()))? {
        let path = entry?.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if matches!(ext.as_deref(), Some("png" | "tif" | "tiff")) {
            files.push(path);
        }
    }
    files.sort();
    ensure!(!files.is_empty(), "no slice images under {}", dir.display());
    Ok(files)
}

/// 读取目录中的所有切片, 并沿 z 方向堆叠.
fn read_slices<T, F>(dir: &Path, to_plane: F) -> anyhow::Result<Array3<T>>
where
    T: Clone,
    F: Fn(DynamicImage) -> Result<Array2<T>, ndarray::ShapeError>,
{
    let mut planes = Vec::new();
    for file in slice_files(dir)? {
        let img = image::open(&file).with_context(|| format!("decoding {}", file.display()))?;
        let plane = to_plane(img)?;
        if let Some(first) = planes.first().map(Array2::dim) {
            ensure!(
                plane.dim() == first,
                "{} has shape {:?}, expected {:?}",
                file.display(),
                plane.dim(),
                first
            );
        }
        planes.push(plane);
    }
    let views: Vec<ArrayView2<T>> = planes.iter().map(Array2::view).collect();
    Ok(ndarray::stack(Axis(0), &views)?)
}
