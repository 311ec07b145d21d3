//! 双通道斑点比值批处理.
//!
//! 从 `$RATIO_DATA_DIR` (或 `$HOME/dataset/ratio`) 读取 `ch1`、`ch2`、`mask`,
//! 把结果表格、比值图像与预览写入 `$RATIO_OUT_DIR`. 日志级别由 `$RUST_LOG` 控制.

mod config;
mod lut;
mod result;
mod runner;
mod sink;

use log::LevelFilter;
use simple_logger::SimpleLogger;

fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()?;

    let config = config::RunConfig::from_env()?;
    let summary = runner::run(config)?;
    summary.report()?;
    Ok(())
}
