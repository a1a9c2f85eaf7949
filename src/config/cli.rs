use crate::config::toml_config::TomlConfig;
use crate::config::Settings;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::{Parser, Subcommand};

#[derive(Debug, Clone, Parser)]
#[command(name = "qtm-spec")]
#[command(about = "Browse and analyze bundled hardware specification data")]
pub struct CliConfig {
    /// Data directory (defaults to $QTM_SPEC_DATA_DIR, then the bundled data)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Path to a TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Output format: table, csv or json
    #[arg(long, global = true)]
    pub format: Option<String>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log process resource usage")]
    pub monitor: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// List available selectors (machine/date/experiment)
    List {
        #[arg(long)]
        machine: Option<String>,
    },
    /// Print the records of one data file
    Show { selector: String },
    /// Fit an experiment and print its per-zone report
    Analyze {
        selector: String,
        #[arg(long)]
        resamples: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Summarize several experiments of one machine and date
    Combined {
        machine: String,
        date: String,
        #[arg(required = true, value_delimiter = ',')]
        tests: Vec<String>,
        #[arg(long)]
        resamples: Option<usize>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl CliConfig {
    /// 讀取並驗證 `--config` 指定的設定檔，沒有指定時使用預設值
    pub fn file_config(&self) -> Result<TomlConfig> {
        let Some(path) = &self.config else {
            return Ok(TomlConfig::default());
        };
        let file_config = TomlConfig::from_file(path)?;
        file_config.validate()?;
        Ok(file_config)
    }

    pub fn resolve(&self) -> Result<Settings> {
        self.resolve_with(&self.file_config()?)
    }

    /// 設定檔為基礎，再套用命令列覆蓋；資料目錄都沒有指定時才輪到環境變數
    pub fn resolve_with(&self, file_config: &TomlConfig) -> Result<Settings> {
        let mut settings = Settings::from_provider(file_config);
        settings.monitor = self.monitor || file_config.monitoring_enabled();

        if let Some(dir) = &self.data_dir {
            settings.data_dir = Some(dir.clone());
        }
        if let Some(format) = &self.format {
            settings.format = format.clone();
        }
        match &self.command {
            Command::Analyze {
                resamples, seed, ..
            }
            | Command::Combined {
                resamples, seed, ..
            } => {
                if let Some(resamples) = resamples {
                    settings.resamples = *resamples;
                }
                if let Some(seed) = seed {
                    settings.seed = Some(*seed);
                }
            }
            Command::List { .. } | Command::Show { .. } => {}
        }

        Ok(settings)
    }
}
