use crate::core::analysis::DEFAULT_RESAMPLES;
use crate::core::fit::MAX_ITERATIONS_LIMIT;
use crate::core::report::OutputFormat;
use crate::core::ConfigProvider;
use crate::utils::error::{Result, SpecError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub data: Option<DataConfig>,
    pub analysis: Option<AnalysisConfig>,
    pub output: Option<OutputConfig>,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataConfig {
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub resamples: Option<usize>,
    pub seed: Option<u64>,
    pub max_iterations: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    pub format: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub json_logs: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(SpecError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| SpecError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${QTM_DATA})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SpecError::ConfigValidationError {
            field: "environment".to_string(),
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(dir) = self.data.as_ref().and_then(|d| d.dir.as_deref()) {
            validation::validate_path("data.dir", dir)?;
        }

        if let Some(analysis) = &self.analysis {
            if let Some(resamples) = analysis.resamples {
                validation::validate_min("analysis.resamples", resamples, 2)?;
            }
            if let Some(max_iterations) = analysis.max_iterations {
                validation::validate_range(
                    "analysis.max_iterations",
                    max_iterations,
                    1,
                    MAX_ITERATIONS_LIMIT,
                )?;
            }
        }

        if let Some(format) = self.output.as_ref().and_then(|o| o.format.as_deref()) {
            validation::validate_one_of("output.format", format, &OutputFormat::NAMES)?;
        }

        Ok(())
    }

    pub fn resamples(&self) -> usize {
        self.analysis
            .as_ref()
            .and_then(|a| a.resamples)
            .unwrap_or(DEFAULT_RESAMPLES)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn data_dir(&self) -> Option<&str> {
        self.data.as_ref().and_then(|d| d.dir.as_deref())
    }

    fn resamples(&self) -> usize {
        TomlConfig::resamples(self)
    }

    fn seed(&self) -> Option<u64> {
        self.analysis.as_ref().and_then(|a| a.seed)
    }

    fn output_format(&self) -> &str {
        self.output
            .as_ref()
            .and_then(|o| o.format.as_deref())
            .unwrap_or("table")
    }

    fn max_iterations(&self) -> Option<usize> {
        self.analysis.as_ref().and_then(|a| a.max_iterations)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[data]
dir = "./data"

[analysis]
resamples = 200
seed = 42

[output]
format = "csv"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.data_dir(), Some("./data"));
        assert_eq!(config.resamples(), 200);
        assert_eq!(config.seed(), Some(42));
        assert_eq!(config.output_format(), "csv");
        assert!(!config.monitoring_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert_eq!(config.data_dir(), None);
        assert_eq!(config.resamples(), DEFAULT_RESAMPLES);
        assert_eq!(config.output_format(), "table");
        assert_eq!(config.max_iterations(), None);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("QTM_SPEC_TEST_DATA_ROOT", "/srv/qtm");

        let toml_content = r#"
[data]
dir = "${QTM_SPEC_TEST_DATA_ROOT}/data"

[analysis]
seed = 1
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.data_dir(), Some("/srv/qtm/data"));

        std::env::remove_var("QTM_SPEC_TEST_DATA_ROOT");
    }

    #[test]
    fn test_unset_env_var_is_kept() {
        let config =
            TomlConfig::from_toml_str("[data]\ndir = \"${QTM_SPEC_SURELY_UNSET_VAR}\"\n").unwrap();
        assert_eq!(config.data_dir(), Some("${QTM_SPEC_SURELY_UNSET_VAR}"));
    }

    #[test]
    fn test_config_validation() {
        let config = TomlConfig::from_toml_str("[output]\nformat = \"xml\"\n").unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[analysis]\nresamples = 1\n").unwrap();
        assert!(config.validate().is_err());

        let config = TomlConfig::from_toml_str("[data]\ndir = \"\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        let err = TomlConfig::from_toml_str("[analysis\nresamples = 1").unwrap_err();
        assert!(matches!(err, SpecError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[monitoring]\nenabled = true\njson_logs = true\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert!(config.monitoring_enabled());
        assert!(config.json_logs());
    }
}
