//! 运行结果.

use crate::sink::Written;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

/// 一次批处理运行的统计.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// 切片个数.
    pub slices: usize,
    /// 写入内容.
    pub written: Written,
    /// 加载输入花费的时间.
    pub load_time: Duration,
    /// 引擎运行 (含交付) 花费的时间.
    pub run_time: Duration,
    /// 输出目录.
    pub out_dir: PathBuf,
}

/// 将 `s` 的结果写进 `w` 中.
fn describe_into<W: Write>(s: &RunSummary, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    #[inline]
    fn f64_to_display(f: Option<f64>) -> String {
        match f {
            Some(f) => format!("{f:.3}"),
            None => "/".to_string(),
        }
    }

    let per_slice = (s.slices > 0).then(|| s.run_time.as_secs_f64() * 1e3 / s.slices as f64);

    writeln!(w, "Ratio run `{}`:", s.out_dir.display())?;
    writeln!(w, "{S4}Slices: {}", s.slices)?;
    writeln!(w, "{S4}Measured regions: {}", s.written.records)?;
    writeln!(w, "{S4}Ratio planes: {}", s.written.planes)?;
    writeln!(w, "{S4}Previews: {}", s.written.previews)?;
    writeln!(w, "{S4}Loading time: {} ms", s.load_time.as_millis())?;
    writeln!(w, "{S4}Running time: {} ms", s.run_time.as_millis())?;
    write!(w, "{S4}Average per slice: {} ms", f64_to_display(per_slice))?;
    Ok(())
}

impl RunSummary {
    /// 输出运行结果.
    pub fn report(&self) -> io::Result<()> {
        let mut buf = Vec::with_capacity(512);
        utils::sep_to(&mut buf)?;
        describe_into(self, &mut buf)?;
        writeln!(&mut buf)?;
        utils::sep_to(&mut buf)?;
        io::stdout().lock().write_all(&buf)
    }
}
