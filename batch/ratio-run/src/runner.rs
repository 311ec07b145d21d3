//! 程序运行函数.

use crate::config::RunConfig;
use crate::result::RunSummary;
use crate::sink::DirSink;
use anyhow::Context;
use ratio_berry::background::RollingBall;
use ratio_berry::extract::ConnectedComponents;
use ratio_berry::{RatioEngine, StackAttr};
use std::time::Instant;
use utils::loader::InputSet;

/// 实际运行.
pub fn run(config: RunConfig) -> anyhow::Result<RunSummary> {
    log::info!(
        "loading inputs from {} ({} cpu(s))",
        config.data_dir.display(),
        utils::cpus()
    );
    let since = Instant::now();
    let InputSet {
        mut ch1,
        mut ch2,
        mask,
    } = InputSet::load(&config.data_dir)
        .with_context(|| format!("loading inputs from {}", config.data_dir.display()))?;
    ch1 = ch1.with_pixel_size(config.pixel);
    ch2 = ch2.with_pixel_size(config.pixel);
    let load_time = since.elapsed();
    log::info!("stack shape {:?}, config {:?}", mask.shape(), config.ratio);

    let since = Instant::now();
    let mut sink = DirSink::new(&config.out_dir, config.lut.as_str());
    RatioEngine::new(config.ratio.clone())
        .with_background(RollingBall)
        .with_extractor(ConnectedComponents::new(config.extract))
        .run_into(&mut ch1, &mut ch2, &mask, &mut sink)
        .context("ratio measurement failed")?;
    let run_time = since.elapsed();

    Ok(RunSummary {
        slices: mask.len_z(),
        written: sink.written().cloned().unwrap_or_default(),
        load_time,
        run_time,
        out_dir: config.out_dir,
    })
}
