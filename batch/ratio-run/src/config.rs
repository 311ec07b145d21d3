//! 运行配置. 所有配置项都可由环境变量覆盖.

use anyhow::{anyhow, Context};
use ratio_berry::extract::{Connectivity, ExtractOptions};
use ratio_berry::{ModePolicy, PixelSize, RatioConfig};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// 默认 LUT.
pub const DEFAULT_LUT: &str = "fire";

/// 一次批处理运行的配置.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// 输入目录.
    pub data_dir: PathBuf,
    /// 输出目录.
    pub out_dir: PathBuf,
    /// 引擎配置.
    pub ratio: RatioConfig,
    /// 连通域提取选项.
    pub extract: ExtractOptions,
    /// 像素尺寸, 同时作用于两个通道.
    pub pixel: PixelSize,
    /// 预览 LUT 名.
    pub lut: String,
}

/// 读取环境变量 `key` 并解析. 变量不存在或为空时返回 `None`.
fn parse_var<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => v
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("invalid ${key}: `{v}`")),
        _ => Ok(None),
    }
}

/// 读取布尔环境变量, 接受 `1/0`、`true/false`、`yes/no`、`on/off`.
fn parse_flag(key: &str) -> anyhow::Result<Option<bool>> {
    let Ok(v) = env::var(key) else {
        return Ok(None);
    };
    match v.trim().to_ascii_lowercase().as_str() {
        "" => Ok(None),
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(anyhow!("invalid ${key}: `{v}`")),
    }
}

impl RunConfig {
    /// 从环境变量构建配置.
    ///
    /// | 变量 | 含义 |
    /// | --- | --- |
    /// | `RATIO_DATA_DIR` | 输入目录, 默认 `$HOME/dataset/ratio` |
    /// | `RATIO_OUT_DIR` | 输出目录, 默认 `{输入目录}/out` |
    /// | `RATIO_BG_WINDOW` | 滚球半径 |
    /// | `RATIO_MIN_AREA` / `RATIO_MAX_AREA` | 面积范围 |
    /// | `RATIO_SUBTRACT_CH1` / `RATIO_SUBTRACT_CH2` | 是否扣除背景 |
    /// | `RATIO_MODE_BINS` | 分箱众数的 bin 个数, 不设置则使用精确众数 |
    /// | `RATIO_CONNECT4` | 使用 4-相邻 |
    /// | `RATIO_KEEP_EDGES` | 保留接触边缘的区域 |
    /// | `RATIO_FILL_HOLES` | 把区域内部的孔洞并入区域, 默认开启 |
    /// | `RATIO_PIXEL_WIDTH` / `RATIO_PIXEL_HEIGHT` | 像素尺寸 |
    /// | `RATIO_LUT` | 预览 LUT, 默认 `fire` |
    pub fn from_env() -> anyhow::Result<Self> {
        let data_dir = utils::loader::data_dir_from_env_or_home()
            .ok_or_else(|| anyhow!("cannot locate input directory, set $RATIO_DATA_DIR"))?;
        let out_dir = parse_var::<PathBuf>("RATIO_OUT_DIR")?.unwrap_or_else(|| data_dir.join("out"));

        let mut ratio = RatioConfig::default();
        if let Some(v) = parse_var("RATIO_BG_WINDOW")? {
            ratio.bg_window_size = v;
        }
        if let Some(v) = parse_var("RATIO_MIN_AREA")? {
            ratio.min_object_size = v;
        }
        if let Some(v) = parse_var("RATIO_MAX_AREA")? {
            ratio.max_object_size = v;
        }
        if let Some(v) = parse_flag("RATIO_SUBTRACT_CH1")? {
            ratio.subtract_bg_ch1 = v;
        }
        if let Some(v) = parse_flag("RATIO_SUBTRACT_CH2")? {
            ratio.subtract_bg_ch2 = v;
        }
        if let Some(bins) = parse_var("RATIO_MODE_BINS")? {
            ratio.mode = ModePolicy::Binned(bins);
        }
        ratio.validate()?;

        let mut extract = ExtractOptions::default();
        if parse_flag("RATIO_CONNECT4")?.unwrap_or(false) {
            extract.connectivity = Connectivity::Four;
        }
        if let Some(keep) = parse_flag("RATIO_KEEP_EDGES")? {
            extract.exclude_edges = !keep;
        }
        if let Some(fill) = parse_flag("RATIO_FILL_HOLES")? {
            extract.fill_holes = fill;
        }

        let width = parse_var("RATIO_PIXEL_WIDTH")?.unwrap_or(1.0);
        let height = parse_var("RATIO_PIXEL_HEIGHT")?.unwrap_or(1.0);
        let pixel = PixelSize::new(width, height)
            .ok_or_else(|| anyhow!("pixel size must be positive, got {width} x {height}"))?;

        let lut = env::var("RATIO_LUT")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LUT.to_string());

        Ok(Self {
            data_dir,
            out_dir,
            ratio,
            extract,
            pixel,
            lut,
        })
    }
}
