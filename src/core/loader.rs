use crate::core::{ExperimentData, Selector, SpecRecord, SpecTable, Storage};
use crate::domain::model::RecordMetadata;
use crate::utils::error::{Result, SpecError};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// 支援的副檔名，依解析順序
const EXTENSIONS: [&str; 2] = ["json", "csv"];

/// 從資料來源找出檔案並解析成 [`SpecTable`]
pub struct SpecLoader<S: Storage> {
    storage: S,
}

impl<S: Storage> SpecLoader<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// 逐一列出可用的 selector (machine/date/experiment 三層下的 json/csv 檔)
    pub fn selectors(&self) -> impl Iterator<Item = Result<Selector>> + '_ {
        self.storage.list_files().filter_map(|entry| match entry {
            Ok(path) => selector_from_relative(&path).map(Ok),
            Err(e) => Some(Err(e)),
        })
    }

    pub fn machines(&self) -> Result<Vec<String>> {
        let mut machines = BTreeSet::new();
        for selector in self.selectors() {
            machines.insert(selector?.machine);
        }
        Ok(machines.into_iter().collect())
    }

    pub fn dates(&self, machine: &str) -> Result<Vec<String>> {
        let mut dates = BTreeSet::new();
        for selector in self.selectors() {
            let selector = selector?;
            if selector.machine == machine {
                dates.insert(selector.date);
            }
        }
        Ok(dates.into_iter().collect())
    }

    /// 依序嘗試 `.json`、`.csv`
    pub fn resolve(&self, selector: &Selector) -> Result<String> {
        let stem = selector.relative_stem();
        EXTENSIONS
            .iter()
            .map(|ext| format!("{}.{}", stem, ext))
            .find(|path| self.storage.exists(path))
            .ok_or_else(|| SpecError::NotFound {
                selector: selector.to_string(),
            })
    }

    pub fn load(&self, selector: &Selector) -> Result<SpecTable> {
        let path = self.resolve(selector)?;
        tracing::debug!("Resolved {} -> {}", selector, path);

        let bytes = self.storage.read_file(&path)?;
        let table = parse_table(selector, &path, &bytes)?;

        tracing::info!("Loaded {} records from {}", table.len(), path);
        Ok(table)
    }

    /// 以字串形式的 selector 載入，例如 `"H1-1/2024_01_15/SPAM"`
    pub fn load_str(&self, selector: &str) -> Result<SpecTable> {
        self.load(&selector.parse()?)
    }

    /// 原始計數資料，只適用 JSON 檔
    pub fn load_experiment(&self, selector: &Selector) -> Result<ExperimentData> {
        let path = format!("{}.json", selector.relative_stem());
        if !self.storage.exists(&path) {
            return Err(SpecError::NotFound {
                selector: selector.to_string(),
            });
        }

        let bytes = self.storage.read_file(&path)?;
        let data: ExperimentData =
            serde_json::from_slice(&bytes).map_err(|e| SpecError::parse(&path, e))?;
        if data.shots == 0 {
            return Err(SpecError::parse(&path, "shots must be positive"));
        }

        tracing::debug!(
            "Loaded experiment {} ({} shots, {} qubit groups)",
            selector,
            data.shots,
            data.survival.qubit_groups().len()
        );
        Ok(data)
    }
}

/// 直接載入某個檔案；selector 取自路徑最後三段
pub fn load_path(path: impl AsRef<Path>) -> Result<SpecTable> {
    let path = path.as_ref();
    let display = path.display().to_string();

    let segments: Vec<String> = path
        .components()
        .rev()
        .take(3)
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    let selector = selector_from_relative(&segments.join("/")).ok_or_else(|| {
        SpecError::InvalidSelector {
            selector: display.clone(),
            reason: "expected .../machine/date/experiment.{json,csv}".to_string(),
        }
    })?;

    if !path.is_file() {
        return Err(SpecError::NotFound { selector: display });
    }

    let bytes = std::fs::read(path)?;
    parse_table(&selector, &display, &bytes)
}

fn selector_from_relative(path: &str) -> Option<Selector> {
    let parts: Vec<&str> = path.split('/').collect();
    let [machine, date, file] = parts.as_slice() else {
        return None;
    };
    let (stem, ext) = file.rsplit_once('.')?;
    if !EXTENSIONS.contains(&ext) {
        return None;
    }
    Selector::new(*machine, *date, stem).ok()
}

fn parse_table(selector: &Selector, path: &str, bytes: &[u8]) -> Result<SpecTable> {
    let records = if path.ends_with(".csv") {
        parse_csv_records(selector, path, bytes)?
    } else {
        let root: Value = serde_json::from_slice(bytes).map_err(|e| SpecError::parse(path, e))?;
        json_records(selector, &root)
    };

    if records.is_empty() {
        return Err(SpecError::parse(path, "file contains no numeric records"));
    }

    Ok(SpecTable::new(selector.clone(), records))
}

fn base_metadata(selector: &Selector) -> RecordMetadata {
    RecordMetadata {
        machine: selector.machine.clone(),
        date: selector.calendar_date(),
        variant: selector.experiment.clone(),
        qubits: None,
        extra: BTreeMap::new(),
    }
}

/// 每個數值葉節點成為一筆紀錄，名稱是 `/` 連接的 key 路徑
fn json_records(selector: &Selector, root: &Value) -> Vec<SpecRecord> {
    let mut records = Vec::new();
    let mut path = Vec::new();
    collect_numeric_leaves(selector, root, &mut path, &mut records);
    records
}

fn collect_numeric_leaves(
    selector: &Selector,
    value: &Value,
    path: &mut Vec<String>,
    out: &mut Vec<SpecRecord>,
) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                path.push(key.clone());
                collect_numeric_leaves(selector, child, path, out);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                path.push(i.to_string());
                collect_numeric_leaves(selector, child, path, out);
                path.pop();
            }
        }
        Value::Number(n) => {
            let Some(value) = n.as_f64() else {
                return;
            };
            let (units, qubits) = match path.first().map(String::as_str) {
                Some("shots") if path.len() == 1 => ("shots", None),
                Some("survival") | Some("leakage_postselect") => ("counts", path.get(1).cloned()),
                _ => ("", None),
            };
            let mut metadata = base_metadata(selector);
            metadata.qubits = qubits;
            out.push(SpecRecord {
                name: path.join("/"),
                value,
                units: units.to_string(),
                metadata,
            });
        }
        _ => {}
    }
}

/// 參數表: 必要欄位 `parameter`、`value`，`units` 可選，其餘欄位放進 metadata
fn parse_csv_records(selector: &Selector, path: &str, bytes: &[u8]) -> Result<Vec<SpecRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| SpecError::parse(path, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);
    let name_idx = column("parameter")
        .ok_or_else(|| SpecError::parse(path, "missing 'parameter' column"))?;
    let value_idx =
        column("value").ok_or_else(|| SpecError::parse(path, "missing 'value' column"))?;
    let units_idx = column("units");
    let qubits_idx = column("qubits");

    let mut records = Vec::new();
    for (row_no, row) in reader.records().enumerate() {
        let row = row.map_err(|e| SpecError::parse(path, e))?;
        let name = row.get(name_idx).unwrap_or("").to_string();
        if name.is_empty() {
            return Err(SpecError::parse(
                path,
                format!("row {}: empty parameter name", row_no + 1),
            ));
        }
        let raw = row.get(value_idx).unwrap_or("");
        let value: f64 = raw.parse().map_err(|_| {
            SpecError::parse(
                path,
                format!("row {}: value '{}' is not a number", row_no + 1, raw),
            )
        })?;

        let mut metadata = base_metadata(selector);
        for (idx, cell) in row.iter().enumerate() {
            if idx == name_idx || idx == value_idx || Some(idx) == units_idx || cell.is_empty() {
                continue;
            }
            if Some(idx) == qubits_idx {
                metadata.qubits = Some(cell.to_string());
            } else {
                metadata.extra.insert(headers[idx].clone(), cell.to_string());
            }
        }

        records.push(SpecRecord {
            name,
            value,
            units: units_idx
                .and_then(|i| row.get(i))
                .unwrap_or("")
                .to_string(),
            metadata,
        });
    }

    Ok(records)
}
