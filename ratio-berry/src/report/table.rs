use super::MeasurementRecord;
use crate::consts::RESULT_COLUMNS;
use std::fmt;
use std::io::{self, Write};

/// 结果表格视图. 列顺序见 [`RESULT_COLUMNS`].
#[derive(Debug, Copy, Clone)]
pub struct ResultsTable<'a> {
    records: &'a [MeasurementRecord],
}

/// 非有限浮点数按 `NaN`/`Infinity`/`-Infinity` 书写.
struct Cell(f64);

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            v if v.is_nan() => f.write_str("NaN"),
            v if v == f64::INFINITY => f.write_str("Infinity"),
            v if v == f64::NEG_INFINITY => f.write_str("-Infinity"),
            v => write!(f, "{v}"),
        }
    }
}

/// 必要时给 CSV 字段加引号.
fn quote(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

impl<'a> ResultsTable<'a> {
    /// 初始化.
    #[inline]
    pub fn new(records: &'a [MeasurementRecord]) -> Self {
        Self { records }
    }

    /// 行数 (不含表头).
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 表格是否没有任何数据行?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 以 CSV 格式写入 `w`, 第一行为表头.
    pub fn write_csv<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "{}", RESULT_COLUMNS.join(","))?;
        for rec in self.records {
            write!(
                w,
                "{},{},{},{}",
                quote(&rec.label),
                Cell(rec.x_centroid),
                Cell(rec.y_centroid),
                Cell(rec.area)
            )?;
            for pair in [rec.mean, rec.mode, rec.max, rec.integral] {
                write!(
                    w,
                    ",{},{},{}",
                    Cell(pair.ch1),
                    Cell(pair.ch2),
                    Cell(pair.ratio)
                )?;
            }
            writeln!(w)?;
        }
        Ok(())
    }
}
