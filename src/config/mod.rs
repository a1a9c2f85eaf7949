#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::adapters::LocalStorage;
use crate::core::analysis::DEFAULT_RESAMPLES;
use crate::core::fit::MAX_ITERATIONS_LIMIT;
use crate::core::report::OutputFormat;
use crate::core::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};

/// 合併後的最終設定 (命令列 > 設定檔 > 環境變數 > 內附資料)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: Option<String>,
    pub resamples: usize,
    pub seed: Option<u64>,
    pub max_iterations: Option<usize>,
    pub format: String,
    pub monitor: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: None,
            resamples: DEFAULT_RESAMPLES,
            seed: None,
            max_iterations: None,
            format: "table".to_string(),
            monitor: false,
        }
    }
}

impl Settings {
    pub fn from_provider<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self {
            data_dir: config.data_dir().map(str::to_string),
            resamples: config.resamples(),
            seed: config.seed(),
            max_iterations: config.max_iterations(),
            format: config.output_format().to_string(),
            monitor: false,
        }
    }

    pub fn storage(&self) -> LocalStorage {
        match &self.data_dir {
            Some(dir) => LocalStorage::new(dir),
            None => LocalStorage::bundled(),
        }
    }

    pub fn output_format(&self) -> Result<OutputFormat> {
        self.format.parse()
    }
}

impl ConfigProvider for Settings {
    fn data_dir(&self) -> Option<&str> {
        self.data_dir.as_deref()
    }

    fn resamples(&self) -> usize {
        self.resamples
    }

    fn seed(&self) -> Option<u64> {
        self.seed
    }

    fn output_format(&self) -> &str {
        &self.format
    }

    fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.data_dir {
            validation::validate_path("data_dir", dir)?;
        }
        validation::validate_min("resamples", self.resamples, 2)?;
        if let Some(max_iterations) = self.max_iterations {
            validation::validate_range("max_iterations", max_iterations, 1, MAX_ITERATIONS_LIMIT)?;
        }
        validation::validate_one_of("format", &self.format, &OutputFormat::NAMES)?;
        Ok(())
    }
}
