pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::LocalStorage;
pub use config::{toml_config::TomlConfig, Settings};
pub use crate::core::analysis::{AnalysisOptions, AnalysisResult, GroupEstimate};
pub use crate::core::loader::{load_path, SpecLoader};
pub use crate::core::report::{OutputFormat, Report};
pub use domain::model::{ExperimentData, Selector, SpecRecord, SpecTable};
pub use utils::error::{Result, SpecError};

/// 使用內附資料 (或 `QTM_SPEC_DATA_DIR`) 的載入器
pub fn bundled() -> SpecLoader<LocalStorage> {
    SpecLoader::new(LocalStorage::bundled())
}

/// 載入一個 selector，例如 `qtm_spec::load("H1-1/2024_01_15/SPAM")`
pub fn load(selector: &str) -> Result<SpecTable> {
    bundled().load_str(selector)
}

