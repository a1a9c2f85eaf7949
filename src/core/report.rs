use crate::core::analysis::{AnalysisOptions, AnalysisResult};
use crate::core::decay::decay_analysis;
use crate::core::loader::SpecLoader;
use crate::core::rb::{rb_analysis, rb_leakage_analysis};
use crate::core::spam::{spam_analysis, SpamEstimate};
use crate::core::stats::{avg_uncertainty, mean};
use crate::core::zones::relabel;
use crate::core::{ExperimentKind, Selector, SpecTable, Storage};
use crate::utils::error::{Result, SpecError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MEAN_ROW: &str = "Mean";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Csv,
    Json,
}

impl OutputFormat {
    pub const NAMES: [&'static str; 3] = ["table", "csv", "json"];
}

impl FromStr for OutputFormat {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(SpecError::InvalidConfigValueError {
                field: "output.format".to_string(),
                value: other.to_string(),
                reason: format!("Valid formats: {}", Self::NAMES.join(", ")),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    pub label: String,
    pub values: Vec<f64>,
}

/// 以列為單位的結果表，最後一列通常是平均
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub title: String,
    pub index_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl Report {
    pub fn new(title: impl Into<String>, index_name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            title: title.into(),
            index_name: index_name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, label: impl Into<String>, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.columns.len());
        self.rows.push(ReportRow {
            label: label.into(),
            values,
        });
    }

    /// 平均列: 數值欄取算術平均，不確定度欄取 `sqrt(sum(u^2))/N`
    pub fn push_mean_row(&mut self, uncertainty_columns: &[usize]) {
        let values = (0..self.columns.len())
            .map(|col| {
                let column: Vec<f64> = self.rows.iter().map(|r| r.values[col]).collect();
                if uncertainty_columns.contains(&col) {
                    avg_uncertainty(&column)
                } else {
                    mean(&column)
                }
            })
            .collect();
        self.push_row(MEAN_ROW, values);
    }

    pub fn row(&self, label: &str) -> Option<&ReportRow> {
        self.rows.iter().find(|r| r.label == label)
    }

    pub fn value(&self, row: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(row).map(|r| r.values[col])
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(std::iter::once(&self.index_name).chain(&self.columns))?;
        for row in &self.rows {
            let cells: Vec<String> = std::iter::once(row.label.clone())
                .chain(row.values.iter().map(|v| v.to_string()))
                .collect();
            writer.write_record(&cells)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| SpecError::IoError(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Table => Ok(self.to_string()),
            OutputFormat::Csv => self.to_csv(),
            OutputFormat::Json => self.to_json(),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|r| r.values.iter().map(|v| format_sci(*v)).collect())
            .collect();

        let label_width = self
            .rows
            .iter()
            .map(|r| r.label.len())
            .chain(std::iter::once(self.index_name.len()))
            .max()
            .unwrap_or(0);
        let widths: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| {
                cells
                    .iter()
                    .map(|row| row[i].len())
                    .chain(std::iter::once(c.len()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        if !self.title.is_empty() {
            writeln!(f, "{}", self.title)?;
        }
        write!(f, "{:<label_width$}", self.index_name)?;
        for (column, &width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", column)?;
        }
        writeln!(f)?;
        for (row, values) in self.rows.iter().zip(&cells) {
            write!(f, "{:<label_width$}", row.label)?;
            for (value, &width) in values.iter().zip(&widths) {
                write!(f, "  {:>width$}", value)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// 與 `%.3E` 相同的格式，例如 `1.234E-03`
pub fn format_sci(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let formatted = format!("{:.3E}", value);
    match formatted.split_once('E') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}E{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}

const RB_COLUMNS: [&str; 4] = [
    "Avg. infidelity",
    "Avg. infidelity uncertainty",
    "RB intercept",
    "RB intercept uncertainty",
];

const DECAY_COLUMNS: [&str; 4] = [
    "Avg. infidelity",
    "Avg. infidelity uncertainty",
    "Decay intercept",
    "Decay intercept uncertainty",
];

const SPAM_COLUMNS: [&str; 4] = [
    "Avg. SPAM error",
    "Avg. SPAM error uncertainty",
    "0 SPAM error",
    "1 SPAM error",
];

pub fn rb_report(selector: &Selector, result: &AnalysisResult) -> Report {
    let mut report = Report::new(selector.to_string(), "Qubits", &RB_COLUMNS);
    let keys: Vec<&str> = result.groups.iter().map(|g| g.qubits.as_str()).collect();
    for (label, group) in relabel(selector, &keys).into_iter().zip(&result.groups) {
        report.push_row(
            label,
            vec![
                group.infidelity(),
                group.fidelity_interval.half_width(),
                1.0 - group.intercept,
                group.intercept_interval.half_width(),
            ],
        );
    }
    report.push_mean_row(&[1, 3]);
    report
}

pub fn decay_report(selector: &Selector, result: &AnalysisResult) -> Report {
    let mut report = Report::new(selector.to_string(), "Qubits", &DECAY_COLUMNS);
    let keys: Vec<&str> = result.groups.iter().map(|g| g.qubits.as_str()).collect();
    for (label, group) in relabel(selector, &keys).into_iter().zip(&result.groups) {
        report.push_row(
            label,
            vec![
                group.infidelity(),
                group.fidelity_interval.half_width(),
                group.intercept,
                group.intercept_interval.half_width(),
            ],
        );
    }
    report.push_mean_row(&[1, 3]);
    report
}

pub fn spam_report(selector: &Selector, estimates: &[SpamEstimate]) -> Report {
    let mut report = Report::new(selector.to_string(), "Qubits", &SPAM_COLUMNS);
    let keys: Vec<&str> = estimates.iter().map(|e| e.qubits.as_str()).collect();
    for (label, estimate) in relabel(selector, &keys).into_iter().zip(estimates) {
        report.push_row(
            label,
            vec![
                estimate.avg_error,
                estimate.avg_uncertainty,
                estimate.zero_error,
                estimate.one_error,
            ],
        );
    }
    report.push_mean_row(&[1]);
    report
}

fn no_analysis(selector: &Selector) -> SpecError {
    SpecError::analysis(format!(
        "'{}' is a parameter sheet and has no analysis",
        selector.experiment
    ))
}

/// 依實驗種類分析並產生報表
pub fn experiment_report<S: Storage>(
    loader: &SpecLoader<S>,
    selector: &Selector,
    options: &AnalysisOptions,
) -> Result<Report> {
    let kind = selector.kind();
    if kind == ExperimentKind::Sheet {
        return Err(no_analysis(selector));
    }

    let data = loader.load_experiment(selector)?;
    tracing::info!("Analyzing {} ({:?})", selector, kind);

    let report = match kind {
        ExperimentKind::RandomizedBenchmarking => rb_report(selector, &rb_analysis(&data, options)?),
        ExperimentKind::MeasurementCrosstalk | ExperimentKind::ResetCrosstalk => {
            decay_report(selector, &decay_analysis(&data, options)?)
        }
        ExperimentKind::Spam => spam_report(selector, &spam_analysis(&data)?),
        ExperimentKind::Sheet => return Err(no_analysis(selector)),
    };
    Ok(report)
}

fn combined_label(test: &str) -> Option<&'static str> {
    match test {
        "SQ_RB" => Some("Single-qubit gate error"),
        "TQ_RB" => Some("Two-qubit gate error"),
        "SQ_RB_SE" => Some("Single-qubit spontaneous emission"),
        "TQ_RB_SE" => Some("Two-qubit spontaneous emission"),
        "Memory_RB" => Some("Memory error"),
        "Measurement_crosstalk" => Some("Measurement crosstalk error"),
        "Reset_crosstalk" => Some("Reset crosstalk error"),
        "SPAM" => Some("SPAM error"),
        _ => None,
    }
}

/// 平均列的前兩欄: 數值與不確定度
fn mean_pair(report: &Report) -> Result<Vec<f64>> {
    report
        .row(MEAN_ROW)
        .map(|row| row.values[..2].to_vec())
        .ok_or_else(|| SpecError::analysis(format!("{} has no mean row", report.title)))
}

/// 多個實驗的平均誤差彙整成一張表
pub fn combined_report<S: Storage>(
    loader: &SpecLoader<S>,
    machine: &str,
    date: &str,
    tests: &[String],
    options: &AnalysisOptions,
) -> Result<Report> {
    let mut report = Report::new(
        format!("{} {}", machine, date),
        "Error",
        &["Magnitude", "Uncertainty"],
    );

    for test in tests {
        let label = combined_label(test).ok_or_else(|| SpecError::InvalidConfigValueError {
            field: "tests".to_string(),
            value: test.clone(),
            reason: "Unknown test name".to_string(),
        })?;
        let selector = Selector::new(machine, date, test.as_str())?;

        match selector.kind() {
            ExperimentKind::RandomizedBenchmarking => {
                let data = loader.load_experiment(&selector)?;
                let main = rb_report(&selector, &rb_analysis(&data, options)?);
                report.push_row(label, mean_pair(&main)?);

                if let Some(se_label) = combined_label(&format!("{}_SE", test)) {
                    if let Some(result) = rb_leakage_analysis(&data, options)? {
                        report.push_row(se_label, mean_pair(&rb_report(&selector, &result))?);
                    }
                }
            }
            _ => {
                let single = experiment_report(loader, &selector, options)?;
                report.push_row(label, mean_pair(&single)?);
            }
        }
    }

    Ok(report)
}

/// 參數表的輸出
pub fn render_table(table: &SpecTable, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(table)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            writer.write_record(["name", "value", "units", "qubits", "date", "variant"])?;
            for record in table {
                writer.write_record([
                    record.name.clone(),
                    record.value.to_string(),
                    record.units.clone(),
                    record.metadata.qubits.clone().unwrap_or_default(),
                    record
                        .metadata
                        .date
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    record.metadata.variant.clone(),
                ])?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| SpecError::IoError(e.into_error()))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
        OutputFormat::Table => {
            let width = table.iter().map(|r| r.name.len()).max().unwrap_or(0).max(4);
            let mut out = format!("{}\n", table.selector());
            for record in table {
                out.push_str(&format!(
                    "{:<width$}  {:>12}  {}\n",
                    record.name, record.value, record.units
                ));
            }
            Ok(out)
        }
    }
}
