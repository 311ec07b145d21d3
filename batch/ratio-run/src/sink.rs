//! 把结果写入输出目录.

use crate::lut::{Lut, VisualizationError};
use ndarray_npy::write_npy;
use ratio_berry::report::{RatioOutput, ReportSink, SinkError};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

/// 结果表格文件名.
pub const RESULTS_FILE: &str = "results.csv";

/// 比值图像文件名.
pub const RATIO_FILE: &str = "ratio.npy";

/// 写入结果的统计.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Written {
    /// 测量记录条数.
    pub records: usize,
    /// 比值平面个数.
    pub planes: usize,
    /// 成功写入的预览图像个数.
    pub previews: usize,
}

/// 输出目录接收者.
///
/// 写入 `results.csv`、`ratio.npy`, 以及逐切片的 `ratio-{z:04}.png` 预览.
/// 预览失败只记录警告.
pub struct DirSink {
    dir: PathBuf,
    lut: String,
    written: Option<Written>,
}

impl DirSink {
    /// 初始化. 目录会在交付时创建.
    pub fn new<P: AsRef<Path>>(dir: P, lut: impl Into<String>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lut: lut.into(),
            written: None,
        }
    }

    /// 输出目录.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 已写入内容的统计. 尚未交付时为 `None`.
    #[inline]
    pub fn written(&self) -> Option<&Written> {
        self.written.as_ref()
    }

    fn write_previews(&self, output: &RatioOutput) -> Result<usize, VisualizationError> {
        let lut = Lut::from_name(&self.lut)?;
        for (z, plane) in output.image.planes().enumerate() {
            lut.colorize(plane)
                .save(self.dir.join(format!("ratio-{:04}.png", z + 1)))?;
        }
        Ok(output.image.plane_count())
    }
}

impl ReportSink for DirSink {
    fn consume(&mut self, output: RatioOutput) -> Result<(), SinkError> {
        fs::create_dir_all(&self.dir)?;

        let mut csv = BufWriter::new(File::create(self.dir.join(RESULTS_FILE))?);
        output.table().write_csv(&mut csv)?;
        csv.into_inner().map_err(|e| e.into_error())?;

        write_npy(self.dir.join(RATIO_FILE), output.image.data())
            .map_err(|e| SinkError::Backend(Box::new(e)))?;

        let previews = self.write_previews(&output).unwrap_or_else(|e| {
            log::warn!("skip ratio previews: {e}");
            0
        });
        log::info!(
            "{} record(s) and {} plane(s) written to {}",
            output.records.len(),
            output.image.plane_count(),
            self.dir.display()
        );
        self.written = Some(Written {
            records: output.records.len(),
            planes: output.image.plane_count(),
            previews,
        });
        Ok(())
    }
}
