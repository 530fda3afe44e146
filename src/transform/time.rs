use chrono::{NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{NormalizeError, Result};
use crate::table::{Column, ColumnRole, NormalizedTable};

pub const DEFAULT_TIME_COLUMN: &str = "elapsed_time";

/// How elapsed time is computed from the parsed source values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRule {
    /// Running sum of row-to-row deltas; the first row is 0.
    #[default]
    CumulativeDelta,
    /// The parsed value, already elapsed seconds.
    Passthrough,
}

/// How a source cell is read as a number of seconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeFormat {
    /// Decimal seconds, e.g. `12.75`.
    #[default]
    Seconds,
    /// Lap-timer clock, `[[H:]M:]S[.fff]`, e.g. `01:02.50`.
    Clock,
    /// A chrono strftime pattern; date-times count from the Unix epoch,
    /// patterns without a date count from midnight.
    Pattern(String),
}

fn default_output_column() -> String {
    DEFAULT_TIME_COLUMN.to_string()
}

/// Recipe for the total-elapsed-time column when a file has none.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeDerivation {
    pub source_column: String,
    #[serde(default)]
    pub rule: TimeRule,
    #[serde(default)]
    pub format: TimeFormat,
    /// Name the derived column is stored under. Whatever this is, it becomes
    /// the canonical time column for the rest of the pipeline.
    #[serde(default = "default_output_column")]
    pub output_column_name: String,
    /// Keep the source column next to the derived one.
    #[serde(default)]
    pub keep_source: bool,
}

impl TimeDerivation {
    pub fn new(source_column: impl Into<String>) -> Self {
        Self {
            source_column: source_column.into(),
            rule: TimeRule::default(),
            format: TimeFormat::default(),
            output_column_name: default_output_column(),
            keep_source: false,
        }
    }

    pub fn with_rule(mut self, rule: TimeRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_format(mut self, format: TimeFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_output(mut self, name: impl Into<String>) -> Self {
        self.output_column_name = name.into();
        self
    }

    pub fn keeping_source(mut self) -> Self {
        self.keep_source = true;
        self
    }
}

/// Parses `[[H:]M:]S[.fff]`.
fn parse_clock(s: &str) -> Option<f64> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.is_empty() || parts.len() > 3 || s.starts_with('-') {
        return None;
    }
    let (whole, last) = parts.split_at(parts.len() - 1);
    let seconds: f64 = last[0].parse().ok().filter(|v: &f64| v.is_finite() && *v >= 0.0)?;
    if !whole.is_empty() && seconds >= 60.0 {
        return None;
    }

    let mut total = 0.0;
    for (i, part) in whole.iter().enumerate() {
        let n: u64 = part.parse().ok()?;
        // minutes are bounded only when an hour field precedes them
        if whole.len() == 2 && i == 1 && n >= 60 {
            return None;
        }
        total = total * 60.0 + n as f64;
    }
    Some(total * 60.0 + seconds)
}

fn parse_pattern(s: &str, pattern: &str) -> Option<f64> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, pattern) {
        let utc = dt.and_utc();
        return Some(utc.timestamp() as f64 + f64::from(utc.timestamp_subsec_nanos()) / 1e9);
    }
    NaiveTime::parse_from_str(s, pattern).ok().map(|t| {
        f64::from(t.num_seconds_from_midnight()) + f64::from(t.nanosecond()) / 1e9
    })
}

/// Reads one cell as seconds, or explains why it cannot.
pub fn parse_seconds(value: &str, format: &TimeFormat) -> std::result::Result<f64, String> {
    let v = value.trim();
    if v.is_empty() {
        return Err("empty time value".into());
    }
    let parsed = match format {
        TimeFormat::Seconds => v.parse::<f64>().ok().filter(|s| s.is_finite()),
        TimeFormat::Clock => parse_clock(v),
        TimeFormat::Pattern(p) => parse_pattern(v, p),
    };
    parsed.ok_or_else(|| match format {
        TimeFormat::Seconds => "not a number of seconds".to_string(),
        TimeFormat::Clock => "not a [[H:]M:]S[.fff] clock value".to_string(),
        TimeFormat::Pattern(p) => format!("does not match pattern `{}`", p),
    })
}

impl TimeRule {
    pub fn apply(&self, seconds: &[f64]) -> Vec<f64> {
        match self {
            TimeRule::Passthrough => seconds.to_vec(),
            TimeRule::CumulativeDelta => {
                let mut out = Vec::with_capacity(seconds.len());
                let mut total = 0.0;
                let mut backwards = 0usize;
                for (i, t) in seconds.iter().enumerate() {
                    if i > 0 {
                        let delta = t - seconds[i - 1];
                        if delta < 0.0 {
                            backwards += 1;
                        }
                        total += delta;
                    }
                    out.push(total);
                }
                if backwards > 0 {
                    warn!(backwards, "time source is not monotonic");
                }
                out
            }
        }
    }
}

/// Seconds rounded to the microsecond, without a trailing `.0` on whole values.
pub fn format_seconds(v: f64) -> String {
    let rounded = (v * 1e6).round() / 1e6;
    // avoid printing "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    format!("{}", rounded)
}

/// Makes sure the table has a total-elapsed-time column and returns its name.
///
/// - one column already tagged `Time`: nothing changes, its name is returned;
/// - otherwise the column is derived from `derivation`, appended, tagged `Time`,
///   and `derivation.output_column_name` is returned.
///
/// The returned name is the canonical time column for the relocation step.
pub fn compute_total_time(
    table: &mut NormalizedTable,
    derivation: Option<&TimeDerivation>,
) -> Result<String> {
    match table.time_column() {
        Ok(idx) => {
            let name = table.columns()[idx].name.clone();
            debug!(column = %name, "time column already present");
            return Ok(name);
        }
        Err(NormalizeError::MissingTimeColumn) => {}
        Err(e) => return Err(e),
    }

    let derivation = derivation.ok_or(NormalizeError::MissingTimeColumn)?;
    let src = table.require(&derivation.source_column)?;
    let output = derivation.output_column_name.clone();

    // refuse before touching the table
    match table.index_of(&output) {
        Some(idx) if idx != src || derivation.keep_source => {
            return Err(NormalizeError::DuplicateColumn(output));
        }
        _ => {}
    }

    let mut seconds = Vec::with_capacity(table.num_rows());
    for (row, value) in table.column_values(src).enumerate() {
        let s = parse_seconds(value, &derivation.format).map_err(|reason| {
            NormalizeError::InvalidValue {
                column: derivation.source_column.clone(),
                line: table.line_of(row),
                value: value.to_string(),
                reason,
            }
        })?;
        seconds.push(s);
    }

    let values: Vec<String> = derivation
        .rule
        .apply(&seconds)
        .into_iter()
        .map(format_seconds)
        .collect();

    if !derivation.keep_source {
        table.remove_column(src);
    }
    table.push_column(Column::with_role(output.clone(), ColumnRole::Time), values)?;

    debug!(
        source = %derivation.source_column,
        column = %output,
        rule = ?derivation.rule,
        "derived time column"
    );
    Ok(output)
}
