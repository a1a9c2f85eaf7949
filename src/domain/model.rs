use crate::utils::error::{Result, SpecError};
use crate::utils::validation::validate_selector_segment;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// 指向一個資料檔: `machine/date/experiment`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub machine: String,
    pub date: String,
    pub experiment: String,
}

impl Selector {
    pub fn new(
        machine: impl Into<String>,
        date: impl Into<String>,
        experiment: impl Into<String>,
    ) -> Result<Self> {
        let selector = Self {
            machine: machine.into(),
            date: date.into(),
            experiment: experiment.into(),
        };
        let display = selector.to_string();
        for segment in [&selector.machine, &selector.date, &selector.experiment] {
            validate_selector_segment(&display, segment)?;
        }
        Ok(selector)
    }

    /// 日期目錄採 `YYYY_MM_DD`，格式不符時回傳 None
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y_%m_%d").ok()
    }

    /// 日期目錄的年份，前綴不是數字時回傳 None
    pub fn year(&self) -> Option<i32> {
        self.date.split('_').next()?.parse().ok()
    }

    pub fn kind(&self) -> ExperimentKind {
        ExperimentKind::from_name(&self.experiment)
    }

    /// 資料目錄下的相對路徑 (不含副檔名)
    pub fn relative_stem(&self) -> String {
        format!("{}/{}/{}", self.machine, self.date, self.experiment)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.machine, self.date, self.experiment)
    }
}

impl FromStr for Selector {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [machine, date, experiment] => Selector::new(*machine, *date, *experiment),
            _ => Err(SpecError::InvalidSelector {
                selector: s.to_string(),
                reason: "expected machine/date/experiment".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentKind {
    RandomizedBenchmarking,
    MeasurementCrosstalk,
    ResetCrosstalk,
    Spam,
    /// 純參數表，沒有可分析的計數資料
    Sheet,
}

impl ExperimentKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Measurement_crosstalk" => ExperimentKind::MeasurementCrosstalk,
            "Reset_crosstalk" => ExperimentKind::ResetCrosstalk,
            "SPAM" => ExperimentKind::Spam,
            n if n.contains("RB") => ExperimentKind::RandomizedBenchmarking,
            _ => ExperimentKind::Sheet,
        }
    }

    pub fn is_decay(self) -> bool {
        matches!(
            self,
            ExperimentKind::MeasurementCrosstalk | ExperimentKind::ResetCrosstalk
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub machine: String,
    pub date: Option<NaiveDate>,
    /// 實驗名稱或參數表名稱
    pub variant: String,
    pub qubits: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

/// 一筆硬體參數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecRecord {
    pub name: String,
    pub value: f64,
    pub units: String,
    pub metadata: RecordMetadata,
}

/// 同一個 selector 底下的所有參數，載入後不可變
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecTable {
    selector: Selector,
    records: Vec<SpecRecord>,
}

impl SpecTable {
    pub fn new(selector: Selector, records: Vec<SpecRecord>) -> Self {
        Self { selector, records }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn records(&self) -> &[SpecRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&SpecRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SpecRecord> {
        self.records.iter()
    }

    /// 依 qubit 分組 (沒有 qubit 資訊的紀錄歸在 None)
    pub fn by_qubits(&self) -> BTreeMap<Option<&str>, Vec<&SpecRecord>> {
        let mut groups: BTreeMap<Option<&str>, Vec<&SpecRecord>> = BTreeMap::new();
        for record in &self.records {
            groups
                .entry(record.metadata.qubits.as_deref())
                .or_default()
                .push(record);
        }
        groups
    }
}

impl<'a> IntoIterator for &'a SpecTable {
    type Item = &'a SpecRecord;
    type IntoIter = std::slice::Iter<'a, SpecRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

pub type Counts = BTreeMap<String, u64>;

/// `survival` 區塊的兩種形狀
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Survival {
    /// qubits -> sequence length -> repetition -> count (RB)
    Repeated(BTreeMap<String, BTreeMap<String, Counts>>),
    /// qubits -> key -> count (decay, SPAM)
    Single(BTreeMap<String, Counts>),
}

impl Survival {
    pub fn qubit_groups(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = match self {
            Survival::Repeated(map) => map.keys().map(String::as_str).collect(),
            Survival::Single(map) => map.keys().map(String::as_str).collect(),
        };
        keys.sort_by_key(|k| qubit_indices(k));
        keys
    }
}

/// 一次基準測試的原始計數
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentData {
    pub shots: u64,
    pub survival: Survival,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leakage_postselect: Option<Survival>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_info: Option<serde_json::Value>,
}

/// `"0, 1"` -> `[0, 1]`；無法解析的部分放到最後
pub fn qubit_indices(key: &str) -> Vec<u32> {
    key.split(',')
        .map(|part| part.trim().parse().unwrap_or(u32::MAX))
        .collect()
}

/// group 中的 qubit 數
pub fn qubit_count(key: &str) -> u32 {
    key.split(',').count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_from_str() {
        let selector: Selector = "H1-1/2024_01_15/SQ_RB".parse().unwrap();
        assert_eq!(selector.machine, "H1-1");
        assert_eq!(selector.date, "2024_01_15");
        assert_eq!(selector.experiment, "SQ_RB");
        assert_eq!(selector.to_string(), "H1-1/2024_01_15/SQ_RB");
        assert_eq!(
            selector.calendar_date(),
            NaiveDate::from_ymd_opt(2024, 1, 15)
        );
        assert_eq!(selector.year(), Some(2024));
    }

    #[test]
    fn test_selector_rejects_bad_input() {
        assert!("H1-1/SQ_RB".parse::<Selector>().is_err());
        assert!("../2024_01_15/SQ_RB".parse::<Selector>().is_err());
        assert!("H1-1//SQ_RB".parse::<Selector>().is_err());
    }

    #[test]
    fn test_experiment_kind() {
        assert_eq!(
            ExperimentKind::from_name("TQ_RB"),
            ExperimentKind::RandomizedBenchmarking
        );
        assert_eq!(
            ExperimentKind::from_name("Memory_RB"),
            ExperimentKind::RandomizedBenchmarking
        );
        assert!(ExperimentKind::from_name("Reset_crosstalk").is_decay());
        assert_eq!(ExperimentKind::from_name("SPAM"), ExperimentKind::Spam);
        assert_eq!(
            ExperimentKind::from_name("device_specs"),
            ExperimentKind::Sheet
        );
    }

    #[test]
    fn test_survival_shapes() {
        let repeated: Survival =
            serde_json::from_str(r#"{"0": {"2": {"0": 99, "1": 98}}}"#).unwrap();
        assert!(matches!(repeated, Survival::Repeated(_)));

        let single: Survival = serde_json::from_str(r#"{"0": {"0": 99, "1": 98}}"#).unwrap();
        assert!(matches!(single, Survival::Single(_)));
    }

    #[test]
    fn test_qubit_groups_sorted_numerically() {
        let survival: Survival = serde_json::from_str(
            r#"{"10, 11": {"0": 1}, "2, 3": {"0": 1}, "0, 1": {"0": 1}}"#,
        )
        .unwrap();
        assert_eq!(survival.qubit_groups(), vec!["0, 1", "2, 3", "10, 11"]);
        assert_eq!(qubit_count("10, 11"), 2);
    }
}
